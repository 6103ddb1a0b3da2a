// Copyright 2018-2024 the Deno authors. MIT license.

use std::sync::Arc;

use deno_error::JsErrorBox;
use futures::future::LocalBoxFuture;
use futures::FutureExt;
use thiserror::Error;

use crate::resolver::ResolverSettings;
use crate::specifier::BareModuleParseError;
use crate::specifier::SpecifierKind;
use crate::uri::JoinedUri;
use crate::uri::Uri;
use crate::uri::UriParseError;

mod cdn;
mod compound;
mod fs;

pub use cdn::CdnProvider;
pub use cdn::CdnStrategy;
pub use compound::CompoundStrategy;
pub use fs::FsStrategy;

#[derive(Debug, Clone, Error, deno_error::JsError)]
pub enum ConfigurationError {
  #[class(type)]
  #[error("An unexpected value for the \"cdn\" option was provided: \"{0}\"")]
  UnknownCdn(String),
  #[class(type)]
  #[error("More than one strategy is rooted at \"{0}\".")]
  DuplicateRoot(Uri),
  #[class(type)]
  #[error("The strategy roots \"{first}\" and \"{second}\" overlap.")]
  OverlappingRoots { first: Uri, second: Uri },
  #[class(type)]
  #[error("More than one strategy accepts bare module specifiers.")]
  AmbiguousBareStrategy,
  #[class(type)]
  #[error("The strategy rooted at \"{root}\" was selected for \"{specifier}\" but did not handle it.")]
  StrategyDeclined { root: Uri, specifier: String },
  #[class(type)]
  #[error("No strategy is configured for \"{0}\".")]
  NoStrategyForUri(Uri),
  #[class(generic)]
  #[error("Failed creating the http client: {0}")]
  HttpClient(String),
}

#[derive(Debug, Error, deno_error::JsError)]
pub enum ResolveError {
  #[class("NotFound")]
  #[error("Module not found \"{0}\".")]
  NotFound(String),
  #[class(generic)]
  #[error("Failed fetching \"{url}\": {source}")]
  Transport {
    url: Uri,
    #[source]
    source: JsErrorBox,
  },
  #[class(generic)]
  #[error("Failed reading \"{uri}\": {source}")]
  Io {
    uri: Uri,
    #[source]
    source: std::io::Error,
  },
  #[class(type)]
  #[error("Invalid package.json \"{uri}\": {source}")]
  InvalidPackageJson {
    uri: Uri,
    #[source]
    source: serde_json::Error,
  },
  #[class(inherit)]
  #[error(transparent)]
  InvalidBareModule(#[from] BareModuleParseError),
  #[class(inherit)]
  #[error(transparent)]
  InvalidUrl(#[from] UriParseError),
  #[class(inherit)]
  #[error(transparent)]
  Configuration(#[from] ConfigurationError),
}

impl ResolveError {
  pub fn is_not_found(&self) -> bool {
    matches!(self, ResolveError::NotFound(_))
  }
}

/// A single resolution as handed to a strategy.
#[derive(Debug, Clone, Copy)]
pub struct ResolveRequest<'a> {
  pub specifier: &'a str,
  pub kind: SpecifierKind,
  /// The module containing the specifier. `None` for entrypoints.
  pub referrer: Option<&'a Uri>,
  pub settings: &'a ResolverSettings,
}

impl<'a> ResolveRequest<'a> {
  /// The location the specifier points at before any probing.
  pub fn target(&self) -> Result<JoinedUri, UriParseError> {
    match self.referrer {
      Some(referrer) => referrer.join(self.specifier),
      None if self.kind.is_bare() => Ok(JoinedUri::Bare),
      None => Uri::parse(self.specifier).map(JoinedUri::Uri),
    }
  }

  pub(crate) fn trace(&self, message: std::fmt::Arguments) {
    if self.settings.debug {
      log::debug!("[{}] {}", self.specifier, message);
    }
  }
}

/// A canonical location along with the strategy that produced it.
#[derive(Debug, Clone)]
pub struct ResolvedUri<'a> {
  pub uri: Uri,
  pub strategy: &'a Strategy,
}

impl<'a> ResolvedUri<'a> {
  pub async fn read_file_content(&self) -> Result<FileContent, ResolveError> {
    self.strategy.read_file_content(&self.uri).await
  }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileContent {
  pub uri: Uri,
  pub content: Arc<[u8]>,
}

pub type ResolveResult<'a> = Result<Option<ResolvedUri<'a>>, ResolveError>;

/// A resolution backend bound to a root uri.
///
/// `Ok(None)` from [`Strategy::resolve`] means the strategy does not handle
/// the request.
#[derive(Debug)]
pub enum Strategy {
  Cdn(CdnStrategy),
  Fs(FsStrategy),
  Compound(CompoundStrategy),
}

impl Strategy {
  pub fn root_uri(&self) -> &Uri {
    match self {
      Strategy::Cdn(strategy) => strategy.root_uri(),
      Strategy::Fs(strategy) => strategy.root_uri(),
      Strategy::Compound(strategy) => strategy.root_uri(),
    }
  }

  /// The roots of the non-compound strategies reachable from this one.
  pub fn leaf_roots(&self) -> Vec<&Uri> {
    match self {
      Strategy::Cdn(_) | Strategy::Fs(_) => vec![self.root_uri()],
      Strategy::Compound(strategy) => strategy
        .strategies()
        .iter()
        .flat_map(|s| s.leaf_roots())
        .collect(),
    }
  }

  /// Whether bare module specifiers are routed to this strategy.
  pub fn handles_bare(&self) -> bool {
    match self {
      Strategy::Cdn(_) => true,
      Strategy::Fs(_) => false,
      Strategy::Compound(strategy) => strategy.handles_bare(),
    }
  }

  /// Whether `uri` belongs to this strategy's namespace.
  pub fn owns(&self, uri: &Uri) -> bool {
    match self {
      Strategy::Cdn(_) | Strategy::Fs(_) => uri.is_under(self.root_uri()),
      Strategy::Compound(strategy) => strategy.owns(uri),
    }
  }

  pub fn resolve<'a, 'b>(
    &'a self,
    request: ResolveRequest<'b>,
  ) -> LocalBoxFuture<'b, ResolveResult<'a>>
  where
    'a: 'b,
  {
    match self {
      Strategy::Cdn(strategy) => async move {
        let uri = strategy.resolve(request).await?;
        Ok(uri.map(|uri| ResolvedUri {
          uri,
          strategy: self,
        }))
      }
      .boxed_local(),
      Strategy::Fs(strategy) => async move {
        let uri = strategy.resolve(request).await?;
        Ok(uri.map(|uri| ResolvedUri {
          uri,
          strategy: self,
        }))
      }
      .boxed_local(),
      Strategy::Compound(strategy) => strategy.resolve(request),
    }
  }

  pub fn read_file_content<'a>(
    &'a self,
    uri: &'a Uri,
  ) -> LocalBoxFuture<'a, Result<FileContent, ResolveError>> {
    match self {
      Strategy::Cdn(strategy) => strategy.read_file_content(uri).boxed_local(),
      Strategy::Fs(strategy) => strategy.read_file_content(uri).boxed_local(),
      Strategy::Compound(strategy) => strategy.read_file_content(uri),
    }
  }
}

impl From<CdnStrategy> for Strategy {
  fn from(strategy: CdnStrategy) -> Self {
    Strategy::Cdn(strategy)
  }
}

impl From<FsStrategy> for Strategy {
  fn from(strategy: FsStrategy) -> Self {
    Strategy::Fs(strategy)
  }
}

impl From<CompoundStrategy> for Strategy {
  fn from(strategy: CompoundStrategy) -> Self {
    Strategy::Compound(strategy)
  }
}
