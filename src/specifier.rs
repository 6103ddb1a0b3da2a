// Copyright 2018-2024 the Deno authors. MIT license.

use std::fmt;
use std::path::Path;

use thiserror::Error;
use url::Url;

pub use import_map::specifier::resolve_import;
pub use import_map::specifier::SpecifierError;

/// The syntactic form of a specifier as written in source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SpecifierKind {
  /// A package name, optionally with a version range and sub path
  /// (ex. `react`, `@scope/pkg@^1/sub`).
  Bare,
  /// A path relative to the importer or to its root (`./`, `../`, `/`).
  Relative,
  /// A specifier with its own scheme (ex. `https://...`).
  Absolute,
}

impl SpecifierKind {
  pub fn classify(specifier: &str) -> Self {
    if is_relative(specifier) {
      SpecifierKind::Relative
    } else if has_scheme(specifier) || Path::new(specifier).is_absolute() {
      SpecifierKind::Absolute
    } else {
      SpecifierKind::Bare
    }
  }

  pub fn is_bare(&self) -> bool {
    *self == SpecifierKind::Bare
  }
}

fn is_relative(specifier: &str) -> bool {
  matches!(specifier, "." | "..")
    || specifier.starts_with("./")
    || specifier.starts_with("../")
    || specifier.starts_with('/')
}

fn has_scheme(specifier: &str) -> bool {
  // a single letter scheme is a windows drive letter
  Url::parse(specifier)
    .map(|url| url.scheme().len() > 1)
    .unwrap_or(false)
}

#[derive(Debug, Clone, Error, deno_error::JsError)]
#[class(type)]
#[error("Invalid bare module specifier '{text}'. {message}")]
pub struct BareModuleParseError {
  message: String,
  text: String,
}

/// A bare specifier split into its package name, version range and sub path.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BareModule {
  pub name: String,
  pub range: Option<String>,
  pub sub_path: Option<String>,
}

impl BareModule {
  #[allow(clippy::should_implement_trait)]
  pub fn from_str(text: &str) -> Result<Self, BareModuleParseError> {
    monch::with_failure_handling(parse_bare_module)(text).map_err(|err| {
      BareModuleParseError {
        message: format!("{err:#}"),
        text: text.to_string(),
      }
    })
  }

  pub fn scope(&self) -> Option<&str> {
    if self.name.starts_with('@') && self.name.contains('/') {
      self.name.split('/').next()
    } else {
      None
    }
  }

  /// The package portion, `name` or `name@range`.
  pub fn package_path(&self) -> String {
    match &self.range {
      Some(range) => format!("{}@{}", self.name, range),
      None => self.name.clone(),
    }
  }

  pub fn with_range(self, range: impl Into<String>) -> Self {
    Self {
      range: Some(range.into()),
      ..self
    }
  }
}

impl fmt::Display for BareModule {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.package_path())?;
    if let Some(sub_path) = &self.sub_path {
      write!(f, "/{}", sub_path)?;
    }
    Ok(())
  }
}

fn parse_bare_module(input: &str) -> monch::ParseResult<BareModule> {
  use monch::*;

  fn parse_scope(input: &str) -> ParseResult<&str> {
    let (input, _) = ch('@')(input)?;
    let (input, scope) = if_not_empty(take_while(|c| c != '/'))(input)?;
    let (input, _) = ch('/')(input)?;
    Ok((input, scope))
  }

  fn parse_name(input: &str) -> ParseResult<&str> {
    substring(|input| {
      let (input, _) = maybe(parse_scope)(input)?;
      if_not_empty(take_while(|c| !matches!(c, '@' | '/')))(input)
    })(input)
  }

  fn parse_range(input: &str) -> ParseResult<&str> {
    let (input, _) = ch('@')(input)?;
    if_not_empty(take_while(|c| c != '/'))(input)
  }

  fn parse_sub_path(input: &str) -> ParseResult<&str> {
    let (input, _) = ch('/')(input)?;
    Ok(("", input))
  }

  let (input, name) = parse_name(input)?;
  let (input, range) = maybe(parse_range)(input)?;
  let (input, sub_path) = maybe(parse_sub_path)(input)?;
  Ok((
    input,
    BareModule {
      name: name.to_string(),
      range: range.map(ToOwned::to_owned),
      sub_path: sub_path
        .filter(|sub_path| !sub_path.is_empty())
        .map(ToOwned::to_owned),
    },
  ))
}
