// Copyright 2018-2024 the Deno authors. MIT license.

use serde::Deserialize;
use serde::Serialize;

use crate::specifier::SpecifierKind;
use crate::strategy::FileContent;
use crate::strategy::ResolveError;
use crate::strategy::ResolveRequest;
use crate::strategy::ResolveResult;
use crate::strategy::Strategy;
use crate::text_encoding::decode_utf8;
use crate::text_encoding::DecodeError;
use crate::uri::Uri;

/// The knobs that shape how candidates are generated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ResolverSettings {
  /// Emit a trace of every resolution step at the debug log level.
  pub debug: bool,
  /// Extensions appended to extension-less references, in probing order.
  pub extensions: Vec<String>,
  /// The `package.json` fields naming a package's entry, in priority order.
  pub package_main: Vec<String>,
}

impl Default for ResolverSettings {
  fn default() -> Self {
    Self {
      debug: false,
      extensions: [".js", ".json", ".mjs", ".cjs"]
        .into_iter()
        .map(String::from)
        .collect(),
      package_main: ["module", "main"].into_iter().map(String::from).collect(),
    }
  }
}

/// Resolves specifiers to canonical uris through a single strategy, usually
/// a [`crate::strategy::CompoundStrategy`].
#[derive(Debug)]
pub struct Resolver {
  strategy: Strategy,
  settings: ResolverSettings,
}

impl Resolver {
  pub fn new(strategy: impl Into<Strategy>, settings: ResolverSettings) -> Self {
    Self {
      strategy: strategy.into(),
      settings,
    }
  }

  pub fn strategy(&self) -> &Strategy {
    &self.strategy
  }

  pub fn settings(&self) -> &ResolverSettings {
    &self.settings
  }

  /// Resolves `specifier` as imported by `referrer`.
  ///
  /// `Ok(None)` means that no strategy handles the specifier and the caller
  /// should leave it to someone else.
  pub async fn resolve(
    &self,
    specifier: &str,
    referrer: &Uri,
  ) -> ResolveResult<'_> {
    self.resolve_request(specifier, Some(referrer)).await
  }

  /// Resolves a specifier that has no importer, such as a build entrypoint.
  pub async fn resolve_entrypoint(&self, specifier: &str) -> ResolveResult<'_> {
    self.resolve_request(specifier, None).await
  }

  async fn resolve_request(
    &self,
    specifier: &str,
    referrer: Option<&Uri>,
  ) -> ResolveResult<'_> {
    let request = ResolveRequest {
      specifier,
      kind: SpecifierKind::classify(specifier),
      referrer,
      settings: &self.settings,
    };
    let result = self.strategy.resolve(request).await;
    if self.settings.debug {
      let from = referrer.map(|r| r.as_str()).unwrap_or("<entrypoint>");
      match &result {
        Ok(Some(resolved)) => {
          log::debug!("Resolved \"{}\" from {} to {}", specifier, from, resolved.uri)
        }
        Ok(None) => log::debug!("Unhandled \"{}\" from {}", specifier, from),
        Err(err) => {
          log::debug!("Failed resolving \"{}\" from {}: {:#}", specifier, from, err)
        }
      }
    }
    result
  }

  pub async fn read_file_content(
    &self,
    uri: &Uri,
  ) -> Result<FileContent, ResolveError> {
    self.strategy.read_file_content(uri).await
  }

  pub fn decode(&self, bytes: &[u8]) -> Result<String, DecodeError> {
    decode_utf8(bytes)
  }
}
