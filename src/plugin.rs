// Copyright 2018-2024 the Deno authors. MIT license.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use thiserror::Error;

use crate::cache::ResolutionCache;
use crate::resolver::Resolver;
use crate::resolver::ResolverSettings;
use crate::source::FileSystem;
use crate::source::Fetcher;
use crate::source::RealFileSystem;
use crate::strategy::CdnProvider;
use crate::strategy::CdnStrategy;
use crate::strategy::CompoundStrategy;
use crate::strategy::ConfigurationError;
use crate::strategy::FsStrategy;
use crate::strategy::ResolveError;
use crate::text_encoding::DecodeError;
use crate::uri::Uri;

pub const PLUGIN_NAME: &str = "velcro";

/// Identifiers starting with this are owned by another plugin.
const VIRTUAL_MODULE_PREFIX: char = '\0';

#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PluginOptions {
  /// The CDN serving bare specifiers, `jsDelivr` or `unpkg` in any casing.
  pub cdn: String,
  pub debug: bool,
  pub extensions: Vec<String>,
  pub package_main: Vec<String>,
  /// Defaults to the real file system.
  #[serde(skip)]
  pub fs: Option<Arc<dyn FileSystem>>,
}

impl Default for PluginOptions {
  fn default() -> Self {
    let settings = ResolverSettings::default();
    Self {
      cdn: CdnProvider::default().name().to_string(),
      debug: settings.debug,
      extensions: settings.extensions,
      package_main: settings.package_main,
      fs: None,
    }
  }
}

impl PluginOptions {
  pub fn settings(&self) -> ResolverSettings {
    ResolverSettings {
      debug: self.debug,
      extensions: self.extensions.clone(),
      package_main: self.package_main.clone(),
    }
  }
}

#[derive(Debug, Error, deno_error::JsError)]
pub enum PluginError {
  #[class(inherit)]
  #[error(transparent)]
  Resolve(#[from] ResolveError),
  #[class(inherit)]
  #[error(transparent)]
  Decode(#[from] DecodeError),
}

/// The hooks a bundler calls while building its module graph. `Ok(None)`
/// leaves the request to the next plugin.
#[async_trait(?Send)]
pub trait BundlerPlugin {
  fn name(&self) -> &str;

  async fn resolve_id(
    &self,
    specifier: &str,
    importer: Option<&str>,
  ) -> Result<Option<String>, PluginError>;

  async fn load(&self, id: &str) -> Result<Option<String>, PluginError>;
}

/// Resolves bare specifiers from a CDN and everything else from the file
/// system, remembering every resolution for the lifetime of the build.
#[derive(Debug)]
pub struct VelcroPlugin {
  resolver: Resolver,
  cache: ResolutionCache,
}

impl VelcroPlugin {
  /// Creates the plugin with a real http client.
  #[cfg(feature = "http")]
  pub fn new(options: PluginOptions) -> Result<Self, ConfigurationError> {
    let fetcher = crate::source::ReqwestFetcher::new()
      .map_err(|err| ConfigurationError::HttpClient(err.to_string()))?;
    Self::with_fetcher(options, Arc::new(fetcher))
  }

  pub fn with_fetcher(
    options: PluginOptions,
    fetcher: Arc<dyn Fetcher>,
  ) -> Result<Self, ConfigurationError> {
    let provider = options.cdn.parse::<CdnProvider>()?;
    let fs = options
      .fs
      .clone()
      .unwrap_or_else(|| Arc::new(RealFileSystem));
    let strategy = CompoundStrategy::new(vec![
      CdnStrategy::for_provider(provider, fetcher).into(),
      FsStrategy::new(fs).into(),
    ])?;
    if options.debug {
      log::debug!("Using {} for bare module specifiers", provider.name());
    }
    Ok(Self {
      resolver: Resolver::new(strategy, options.settings()),
      cache: Default::default(),
    })
  }

  pub fn resolver(&self) -> &Resolver {
    &self.resolver
  }

  pub fn cache(&self) -> &ResolutionCache {
    &self.cache
  }
}

#[async_trait(?Send)]
impl BundlerPlugin for VelcroPlugin {
  fn name(&self) -> &str {
    PLUGIN_NAME
  }

  async fn resolve_id(
    &self,
    specifier: &str,
    importer: Option<&str>,
  ) -> Result<Option<String>, PluginError> {
    let Some(importer) = importer else {
      return Ok(None);
    };
    if specifier.starts_with(VIRTUAL_MODULE_PREFIX)
      || importer.starts_with(VIRTUAL_MODULE_PREFIX)
    {
      return Ok(None);
    }
    if let Some(uri) = self
      .cache
      .get_identifier(specifier)
      .or_else(|| self.cache.get_request(specifier, importer))
    {
      return Ok(Some(uri.to_string()));
    }
    let importer_uri = match Uri::parse(importer) {
      Ok(uri) => uri,
      Err(err) => {
        if self.resolver.settings().debug {
          log::debug!("Deferring \"{}\": {:#}", specifier, err);
        }
        return Ok(None);
      }
    };
    let Some(resolved) = self.resolver.resolve(specifier, &importer_uri).await?
    else {
      return Ok(None);
    };
    let uri = self.cache.insert(specifier, importer, resolved.uri);
    Ok(Some(uri.to_string()))
  }

  async fn load(&self, id: &str) -> Result<Option<String>, PluginError> {
    let Some(uri) = self.cache.get_identifier(id) else {
      return Ok(None);
    };
    let file = self.resolver.read_file_content(&uri).await?;
    let text = self.resolver.decode(&file.content)?;
    Ok(Some(text))
  }
}
