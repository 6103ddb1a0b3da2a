// Copyright 2018-2024 the Deno authors. MIT license.

use std::collections::HashMap;
use std::str::FromStr;
use std::sync::Arc;

use once_cell::sync::Lazy;
use parking_lot::Mutex;

use super::ConfigurationError;
use super::FileContent;
use super::ResolveError;
use super::ResolveRequest;
use crate::packages::PackageJson;
use crate::resolution::file_candidates;
use crate::resolution::has_known_extension;
use crate::source::FetchOptions;
use crate::source::FetchResponse;
use crate::source::Fetcher;
use crate::specifier::BareModule;
use crate::specifier::SpecifierKind;
use crate::uri::JoinedUri;
use crate::uri::Uri;

static JS_DELIVR_URL: Lazy<Uri> =
  Lazy::new(|| Uri::parse("https://cdn.jsdelivr.net/npm/").unwrap());
static UNPKG_URL: Lazy<Uri> =
  Lazy::new(|| Uri::parse("https://unpkg.com/").unwrap());

/// A CDN serving npm packages at `<base><name>@<range>/<path>`.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CdnProvider {
  #[default]
  JsDelivr,
  Unpkg,
}

impl CdnProvider {
  pub fn name(&self) -> &'static str {
    match self {
      CdnProvider::JsDelivr => "jsDelivr",
      CdnProvider::Unpkg => "unpkg",
    }
  }

  pub fn base_url(&self) -> &'static Uri {
    match self {
      CdnProvider::JsDelivr => &JS_DELIVR_URL,
      CdnProvider::Unpkg => &UNPKG_URL,
    }
  }
}

impl FromStr for CdnProvider {
  type Err = ConfigurationError;

  fn from_str(text: &str) -> Result<Self, Self::Err> {
    match text.to_ascii_lowercase().as_str() {
      "jsdelivr" => Ok(CdnProvider::JsDelivr),
      "unpkg" => Ok(CdnProvider::Unpkg),
      _ => Err(ConfigurationError::UnknownCdn(text.to_string())),
    }
  }
}

/// Resolves bare specifiers to packages on a CDN and canonicalizes urls by
/// following redirects.
#[derive(Debug)]
pub struct CdnStrategy {
  root: Uri,
  fetcher: Arc<dyn Fetcher>,
  /// Descriptors keyed by `name@version`. `None` when the descriptor could
  /// not be read.
  package_jsons: Mutex<HashMap<String, Option<Arc<PackageJson>>>>,
  /// Bodies downloaded while canonicalizing, keyed by canonical uri.
  contents: Mutex<HashMap<Uri, Arc<[u8]>>>,
}

impl CdnStrategy {
  pub fn new(root: Uri, fetcher: Arc<dyn Fetcher>) -> Self {
    Self {
      root: root.as_directory(),
      fetcher,
      package_jsons: Default::default(),
      contents: Default::default(),
    }
  }

  pub fn for_provider(provider: CdnProvider, fetcher: Arc<dyn Fetcher>) -> Self {
    Self::new(provider.base_url().clone(), fetcher)
  }

  pub fn for_js_delivr(fetcher: Arc<dyn Fetcher>) -> Self {
    Self::for_provider(CdnProvider::JsDelivr, fetcher)
  }

  pub fn for_unpkg(fetcher: Arc<dyn Fetcher>) -> Self {
    Self::for_provider(CdnProvider::Unpkg, fetcher)
  }

  pub fn root_uri(&self) -> &Uri {
    &self.root
  }

  pub async fn resolve(
    &self,
    request: ResolveRequest<'_>,
  ) -> Result<Option<Uri>, ResolveError> {
    if request.kind.is_bare() {
      return self.resolve_bare(request).await.map(Some);
    }
    let target = match request.target()? {
      JoinedUri::Uri(target) => target,
      JoinedUri::Bare => return Ok(None),
    };
    if !target.is_under(&self.root) {
      return Ok(None);
    }
    let probe = request.kind == SpecifierKind::Relative;
    self.canonicalize(target, probe, request).await.map(Some)
  }

  async fn resolve_bare(
    &self,
    request: ResolveRequest<'_>,
  ) -> Result<Uri, ResolveError> {
    let mut module = BareModule::from_str(request.specifier)?;
    if module.range.is_none() {
      if let Some(referrer) = request.referrer {
        if let Some(range) =
          self.infer_range(referrer, &module.name, request).await
        {
          request.trace(format_args!(
            "using range \"{}\" declared by {}",
            range, referrer
          ));
          module = module.with_range(range);
        }
      }
    }
    let url = self.root.join_path(&module.to_string())?;
    let probe = module.sub_path.is_some();
    self.canonicalize(url, probe, request).await
  }

  /// Fetches `url`, trying the configured extensions when `probe` is set and
  /// the url itself does not exist, and answers with the final url after
  /// redirects.
  async fn canonicalize(
    &self,
    url: Uri,
    probe: bool,
    request: ResolveRequest<'_>,
  ) -> Result<Uri, ResolveError> {
    let extensions = &request.settings.extensions;
    let candidates = if probe && !has_known_extension(&url, extensions) {
      file_candidates(&url, extensions)
    } else {
      vec![url.clone()]
    };
    for candidate in candidates {
      request.trace(format_args!("fetching {}", candidate));
      let response = self.fetch(&candidate).await?;
      if response.is_success() {
        request.trace(format_args!(
          "{} canonicalized to {}",
          candidate, response.url
        ));
        let canonical = response.url.clone();
        self
          .contents
          .lock()
          .entry(canonical.clone())
          .or_insert(response.content);
        return Ok(canonical);
      }
      request.trace(format_args!(
        "{} responded with status {}",
        candidate, response.status
      ));
    }
    Err(ResolveError::NotFound(url.to_string()))
  }

  /// The range the package containing `referrer` declares for `name`.
  async fn infer_range(
    &self,
    referrer: &Uri,
    name: &str,
    request: ResolveRequest<'_>,
  ) -> Option<String> {
    let relative = referrer.relative_to(&self.root)?;
    let importer = BareModule::from_str(relative).ok()?;
    let version = importer.range.clone()?;
    // a package importing itself stays on its own version
    if importer.name == name {
      return Some(version);
    }
    let package_json = self.package_json(&importer, request).await?;
    package_json.dependency_range(name).map(|range| range.to_string())
  }

  async fn package_json(
    &self,
    package: &BareModule,
    request: ResolveRequest<'_>,
  ) -> Option<Arc<PackageJson>> {
    let key = package.package_path();
    if let Some(package_json) = self.package_jsons.lock().get(&key) {
      return package_json.clone();
    }
    let loaded = match self.load_package_json(&key).await {
      Ok(package_json) => Some(Arc::new(package_json)),
      Err(err) => {
        log::warn!(
          "Failed reading the package.json of {}, resolving its dependencies to the latest version: {:#}",
          key,
          err
        );
        None
      }
    };
    request.trace(format_args!("loaded package.json of {}", key));
    self
      .package_jsons
      .lock()
      .entry(key)
      .or_insert(loaded)
      .clone()
  }

  async fn load_package_json(
    &self,
    package_path: &str,
  ) -> Result<PackageJson, ResolveError> {
    let url = self
      .root
      .join_path(&format!("{}/package.json", package_path))?;
    let response = self.fetch(&url).await?;
    if !response.is_success() {
      return Err(ResolveError::NotFound(url.to_string()));
    }
    PackageJson::from_slice(&response.content)
      .map_err(|source| ResolveError::InvalidPackageJson { uri: url, source })
  }

  async fn fetch(&self, url: &Uri) -> Result<FetchResponse, ResolveError> {
    self
      .fetcher
      .fetch(url, FetchOptions::follow())
      .await
      .map_err(|source| ResolveError::Transport {
        url: url.clone(),
        source,
      })
  }

  pub async fn read_file_content(
    &self,
    uri: &Uri,
  ) -> Result<FileContent, ResolveError> {
    if !uri.is_under(&self.root) {
      return Err(ConfigurationError::NoStrategyForUri(uri.clone()).into());
    }
    if let Some(content) = self.contents.lock().get(uri).cloned() {
      return Ok(FileContent {
        uri: uri.clone(),
        content,
      });
    }
    let response = self.fetch(uri).await?;
    if !response.is_success() {
      return Err(ResolveError::NotFound(uri.to_string()));
    }
    let content = self
      .contents
      .lock()
      .entry(uri.clone())
      .or_insert(response.content)
      .clone();
    Ok(FileContent {
      uri: uri.clone(),
      content,
    })
  }
}

#[cfg(test)]
mod test {
  use pretty_assertions::assert_eq;

  use super::*;
  use crate::resolver::ResolverSettings;
  use crate::source::MemoryFetcher;

  const BASE: &str = "https://cdn.jsdelivr.net/npm/";

  fn uri(text: &str) -> Uri {
    Uri::parse(text).unwrap()
  }

  fn request<'a>(
    specifier: &'a str,
    referrer: Option<&'a Uri>,
    settings: &'a ResolverSettings,
  ) -> ResolveRequest<'a> {
    ResolveRequest {
      specifier,
      kind: SpecifierKind::classify(specifier),
      referrer,
      settings,
    }
  }

  fn strategy(fetcher: MemoryFetcher) -> (CdnStrategy, Arc<MemoryFetcher>) {
    let fetcher = Arc::new(fetcher);
    (CdnStrategy::for_js_delivr(fetcher.clone()), fetcher)
  }

  #[test]
  fn providers() {
    assert_eq!(
      "JSDELIVR".parse::<CdnProvider>().unwrap(),
      CdnProvider::JsDelivr
    );
    assert_eq!("unpkg".parse::<CdnProvider>().unwrap(), CdnProvider::Unpkg);
    assert_eq!(CdnProvider::Unpkg.base_url().as_str(), "https://unpkg.com/");
    let err = "foo".parse::<CdnProvider>().unwrap_err();
    assert_eq!(
      err.to_string(),
      "An unexpected value for the \"cdn\" option was provided: \"foo\""
    );
  }

  #[tokio::test]
  async fn bare_specifier_follows_redirects() {
    let mut fetcher = MemoryFetcher::default();
    fetcher.add_redirect(
      format!("{BASE}left-pad"),
      format!("{BASE}left-pad@1.3.0/index.js"),
    );
    fetcher.add_source(format!("{BASE}left-pad@1.3.0/index.js"), "module.exports = leftPad;");
    let (strategy, fetcher) = strategy(fetcher);
    let settings = ResolverSettings::default();
    let importer = uri("file:///project/index.js");

    let resolved = strategy
      .resolve(request("left-pad", Some(&importer), &settings))
      .await
      .unwrap();
    assert_eq!(
      resolved,
      Some(uri("https://cdn.jsdelivr.net/npm/left-pad@1.3.0/index.js"))
    );

    // served from the body kept while canonicalizing
    let content = strategy
      .read_file_content(&resolved.unwrap())
      .await
      .unwrap();
    assert_eq!(&*content.content, b"module.exports = leftPad;");
    assert_eq!(fetcher.request_count(), 1);
  }

  #[tokio::test]
  async fn explicit_range_and_sub_path() {
    let mut fetcher = MemoryFetcher::default();
    fetcher.add_source(format!("{BASE}@scope/pkg@^2/lib/util.js"), "");
    let (strategy, fetcher) = strategy(fetcher);
    let settings = ResolverSettings::default();

    let resolved = strategy
      .resolve(request("@scope/pkg@^2/lib/util", None, &settings))
      .await
      .unwrap();
    assert_eq!(
      resolved,
      Some(uri("https://cdn.jsdelivr.net/npm/@scope/pkg@^2/lib/util.js"))
    );
    assert_eq!(
      fetcher.requests(),
      vec![
        uri("https://cdn.jsdelivr.net/npm/@scope/pkg@^2/lib/util"),
        uri("https://cdn.jsdelivr.net/npm/@scope/pkg@^2/lib/util.js"),
      ]
    );
  }

  #[tokio::test]
  async fn relative_specifier_inside_package() {
    let mut fetcher = MemoryFetcher::default();
    fetcher.add_source(format!("{BASE}pkg@1.0.0/lib/b.js"), "");
    let (strategy, _) = strategy(fetcher);
    let settings = ResolverSettings::default();
    let importer = uri("https://cdn.jsdelivr.net/npm/pkg@1.0.0/lib/a.js");

    let resolved = strategy
      .resolve(request("./b", Some(&importer), &settings))
      .await
      .unwrap();
    assert_eq!(
      resolved,
      Some(uri("https://cdn.jsdelivr.net/npm/pkg@1.0.0/lib/b.js"))
    );

    let local = uri("file:///project/a.js");
    assert_eq!(
      strategy
        .resolve(request("./b", Some(&local), &settings))
        .await
        .unwrap(),
      None
    );
  }

  #[tokio::test]
  async fn infers_range_from_importing_package() {
    let mut fetcher = MemoryFetcher::default();
    fetcher.add_source(
      format!("{BASE}react-dom@18.2.0/package.json"),
      r#"{ "name": "react-dom", "peerDependencies": { "react": "^18.2.0" } }"#,
    );
    fetcher.add_redirect(
      format!("{BASE}react@^18.2.0"),
      format!("{BASE}react@18.3.1/index.js"),
    );
    fetcher.add_source(format!("{BASE}react@18.3.1/index.js"), "");
    fetcher.add_source(format!("{BASE}scheduler"), "");
    let (strategy, fetcher) = strategy(fetcher);
    let settings = ResolverSettings::default();
    let importer = uri("https://cdn.jsdelivr.net/npm/react-dom@18.2.0/index.js");

    let resolved = strategy
      .resolve(request("react", Some(&importer), &settings))
      .await
      .unwrap();
    assert_eq!(
      resolved,
      Some(uri("https://cdn.jsdelivr.net/npm/react@18.3.1/index.js"))
    );
    // undeclared dependencies fall back to the latest version and the
    // descriptor is not downloaded twice
    let resolved = strategy
      .resolve(request("scheduler", Some(&importer), &settings))
      .await
      .unwrap();
    assert_eq!(resolved, Some(uri("https://cdn.jsdelivr.net/npm/scheduler")));
    assert_eq!(fetcher.request_count(), 3);
  }

  #[tokio::test]
  async fn self_import_keeps_importer_version() {
    let mut fetcher = MemoryFetcher::default();
    fetcher.add_source(format!("{BASE}@babel/runtime@7.0.0/helpers/a.js"), "");
    fetcher.add_source(format!("{BASE}@babel/runtime/helpers/a.js"), "");
    let (strategy, fetcher) = strategy(fetcher);
    let settings = ResolverSettings::default();
    let importer =
      uri("https://cdn.jsdelivr.net/npm/@babel/runtime@7.0.0/helpers/b.js");

    let resolved = strategy
      .resolve(request("@babel/runtime/helpers/a", Some(&importer), &settings))
      .await
      .unwrap();
    assert_eq!(
      resolved,
      Some(uri(
        "https://cdn.jsdelivr.net/npm/@babel/runtime@7.0.0/helpers/a.js"
      ))
    );
    // no package.json is needed to pin the version
    assert_eq!(
      fetcher.requests(),
      vec![
        uri("https://cdn.jsdelivr.net/npm/@babel/runtime@7.0.0/helpers/a"),
        uri("https://cdn.jsdelivr.net/npm/@babel/runtime@7.0.0/helpers/a.js"),
      ]
    );
  }

  #[tokio::test]
  async fn missing_package_json_falls_back_to_latest() {
    let mut fetcher = MemoryFetcher::default();
    fetcher.add_source(format!("{BASE}react"), "");
    let (strategy, _) = strategy(fetcher);
    let settings = ResolverSettings::default();
    let importer = uri("https://cdn.jsdelivr.net/npm/react-dom@18.2.0/index.js");

    let resolved = strategy
      .resolve(request("react", Some(&importer), &settings))
      .await
      .unwrap();
    assert_eq!(resolved, Some(uri("https://cdn.jsdelivr.net/npm/react")));
  }

  #[tokio::test]
  async fn failures() {
    let mut fetcher = MemoryFetcher::default();
    fetcher.add_status(format!("{BASE}gone"), 410);
    fetcher.add_error(format!("{BASE}down"), "connection reset");
    let (strategy, _) = strategy(fetcher);
    let settings = ResolverSettings::default();

    let err = strategy
      .resolve(request("gone", None, &settings))
      .await
      .unwrap_err();
    assert!(err.is_not_found());
    assert_eq!(
      err.to_string(),
      "Module not found \"https://cdn.jsdelivr.net/npm/gone\"."
    );
    let err = strategy
      .resolve(request("down", None, &settings))
      .await
      .unwrap_err();
    assert!(matches!(err, ResolveError::Transport { .. }));
    let err = strategy
      .resolve(request("@scope", None, &settings))
      .await
      .unwrap_err();
    assert!(matches!(err, ResolveError::InvalidBareModule(_)));
    let err = strategy
      .read_file_content(&uri("file:///a.js"))
      .await
      .unwrap_err();
    assert!(matches!(err, ResolveError::Configuration(_)));
  }
}
