// Copyright 2018-2024 the Deno authors. MIT license.

use futures::future::LocalBoxFuture;
use futures::FutureExt;
use once_cell::sync::Lazy;

use super::ConfigurationError;
use super::FileContent;
use super::ResolveError;
use super::ResolveRequest;
use super::ResolveResult;
use super::Strategy;
use crate::uri::JoinedUri;
use crate::uri::Uri;

static COMPOUND_ROOT: Lazy<Uri> =
  Lazy::new(|| Uri::parse("compound:///").unwrap());

/// Routes each request to one of its child strategies.
///
/// Bare specifiers go to the first child that accepts them. Anything else is
/// joined onto the referrer and goes to the first child whose root contains
/// the result. A selected child that does not handle the request is an error
/// rather than a reason to try the next child.
#[derive(Debug)]
pub struct CompoundStrategy {
  root: Uri,
  strategies: Vec<Strategy>,
}

impl CompoundStrategy {
  pub fn new(strategies: Vec<Strategy>) -> Result<Self, ConfigurationError> {
    let roots = strategies
      .iter()
      .flat_map(|s| s.leaf_roots())
      .collect::<Vec<_>>();
    for (i, first) in roots.iter().enumerate() {
      for second in &roots[i + 1..] {
        if first == second {
          return Err(ConfigurationError::DuplicateRoot((*first).clone()));
        }
        if first.is_comparable(second) {
          return Err(ConfigurationError::OverlappingRoots {
            first: (*first).clone(),
            second: (*second).clone(),
          });
        }
      }
    }
    let bare_count = strategies.iter().filter(|s| s.handles_bare()).count();
    if bare_count > 1 {
      return Err(ConfigurationError::AmbiguousBareStrategy);
    }
    Ok(Self {
      root: COMPOUND_ROOT.clone(),
      strategies,
    })
  }

  pub fn root_uri(&self) -> &Uri {
    &self.root
  }

  pub fn strategies(&self) -> &[Strategy] {
    &self.strategies
  }

  pub fn handles_bare(&self) -> bool {
    self.strategies.iter().any(|s| s.handles_bare())
  }

  pub fn owns(&self, uri: &Uri) -> bool {
    self.strategy_for(uri).is_some()
  }

  /// The child responsible for `uri`.
  pub fn strategy_for(&self, uri: &Uri) -> Option<&Strategy> {
    self.strategies.iter().find(|s| s.owns(uri))
  }

  fn bare_strategy(&self) -> Option<&Strategy> {
    self.strategies.iter().find(|s| s.handles_bare())
  }

  fn select(
    &self,
    request: ResolveRequest<'_>,
  ) -> Result<Option<&Strategy>, ResolveError> {
    if request.kind.is_bare() {
      return Ok(self.bare_strategy());
    }
    match request.target()? {
      JoinedUri::Uri(target) => Ok(self.strategy_for(&target)),
      JoinedUri::Bare => Ok(self.bare_strategy()),
    }
  }

  pub fn resolve<'a, 'b>(
    &'a self,
    request: ResolveRequest<'b>,
  ) -> LocalBoxFuture<'b, ResolveResult<'a>>
  where
    'a: 'b,
  {
    async move {
      let Some(strategy) = self.select(request)? else {
        request.trace(format_args!("no strategy handles the request"));
        return Ok(None);
      };
      request.trace(format_args!(
        "routed to the strategy rooted at {}",
        strategy.root_uri()
      ));
      match strategy.resolve(request).await? {
        Some(resolved) => Ok(Some(resolved)),
        None => Err(
          ConfigurationError::StrategyDeclined {
            root: strategy.root_uri().clone(),
            specifier: request.specifier.to_string(),
          }
          .into(),
        ),
      }
    }
    .boxed_local()
  }

  pub fn read_file_content<'a>(
    &'a self,
    uri: &'a Uri,
  ) -> LocalBoxFuture<'a, Result<FileContent, ResolveError>> {
    async move {
      match self.strategy_for(uri) {
        Some(strategy) => strategy.read_file_content(uri).await,
        None => Err(ConfigurationError::NoStrategyForUri(uri.clone()).into()),
      }
    }
    .boxed_local()
  }
}
