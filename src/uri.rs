// Copyright 2018-2024 the Deno authors. MIT license.

use std::fmt;
use std::path::Path;
use std::path::PathBuf;
use std::str::FromStr;

use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;
use url::Position;
use url::Url;

use crate::specifier::resolve_import;
use crate::specifier::SpecifierError;

#[derive(Debug, Clone, Error, deno_error::JsError)]
pub enum UriParseError {
  #[class(type)]
  #[error("Invalid URL \"{text}\": {source}")]
  InvalidUrl {
    text: String,
    #[source]
    source: url::ParseError,
  },
  #[class(type)]
  #[error("Invalid specifier \"{text}\": {source}")]
  InvalidSpecifier {
    text: String,
    #[source]
    source: SpecifierError,
  },
  #[class(type)]
  #[error("\"{0}\" is neither a URL nor a file path.")]
  NotAUri(String),
  #[class(type)]
  #[error("Failed converting path \"{}\" to a URL.", .0.display())]
  InvalidPath(PathBuf),
}

/// The outcome of joining a specifier onto a base [`Uri`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JoinedUri {
  Uri(Uri),
  /// The specifier is a bare module name and can only be turned into a
  /// location by a strategy that understands packages.
  Bare,
}

/// A normalized, immutable location of a resolvable resource.
///
/// Equality and ordering are defined over the serialized form, so two `Uri`s
/// are equal exactly when their strings are.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Uri(Url);

impl Uri {
  /// Parses a URL, an absolute file path, or a `./`/`../` path relative to
  /// the current working directory.
  pub fn parse(text: &str) -> Result<Self, UriParseError> {
    let path = Path::new(text);
    if path.is_absolute() {
      return Self::from_file_path(path);
    }
    if text.starts_with("./") || text.starts_with("../") {
      let cwd = std::env::current_dir()
        .map_err(|_| UriParseError::NotAUri(text.to_string()))?;
      return Self::from_file_path(&cwd.join(path));
    }
    match Url::parse(text) {
      Ok(url) => Ok(Self(url)),
      Err(url::ParseError::RelativeUrlWithoutBase) => {
        Err(UriParseError::NotAUri(text.to_string()))
      }
      Err(source) => Err(UriParseError::InvalidUrl {
        text: text.to_string(),
        source,
      }),
    }
  }

  pub fn from_file_path(path: &Path) -> Result<Self, UriParseError> {
    let url = Url::from_file_path(path)
      .map_err(|()| UriParseError::InvalidPath(path.to_path_buf()))?;
    Self::normalized(url)
  }

  pub fn from_directory_path(path: &Path) -> Result<Self, UriParseError> {
    let url = Url::from_directory_path(path)
      .map_err(|()| UriParseError::InvalidPath(path.to_path_buf()))?;
    Self::normalized(url)
  }

  // paths may carry `.` and `..` components that only collapse on a re-parse
  fn normalized(url: Url) -> Result<Self, UriParseError> {
    Url::parse(url.as_str()).map(Self).map_err(|source| {
      UriParseError::InvalidUrl {
        text: url.to_string(),
        source,
      }
    })
  }

  /// Joins a specifier as written in source onto this uri.
  pub fn join(&self, specifier: &str) -> Result<JoinedUri, UriParseError> {
    let specifier = match specifier {
      "." => "./",
      ".." => "../",
      specifier => specifier,
    };
    match resolve_import(specifier, &self.0) {
      Ok(url) => Ok(JoinedUri::Uri(Self(url))),
      Err(SpecifierError::ImportPrefixMissing { .. }) => Ok(JoinedUri::Bare),
      Err(source) => Err(UriParseError::InvalidSpecifier {
        text: specifier.to_string(),
        source,
      }),
    }
  }

  /// Joins a path that is known to be relative (ex. a `package.json` main
  /// field) without treating it as a module specifier.
  pub fn join_path(&self, path: &str) -> Result<Self, UriParseError> {
    self.0.join(path).map(Self).map_err(|source| {
      UriParseError::InvalidUrl {
        text: path.to_string(),
        source,
      }
    })
  }

  pub fn as_str(&self) -> &str {
    self.0.as_str()
  }

  pub fn as_url(&self) -> &Url {
    &self.0
  }

  pub fn into_url(self) -> Url {
    self.0
  }

  pub fn scheme(&self) -> &str {
    self.0.scheme()
  }

  pub fn path(&self) -> &str {
    self.0.path()
  }

  pub fn is_directory(&self) -> bool {
    self.0.path().ends_with('/')
  }

  /// Whether this uri lives in the namespace rooted at `root`, meaning both
  /// share a scheme and authority and `root`'s path is a prefix of this one.
  pub fn is_under(&self, root: &Uri) -> bool {
    self.0[..Position::BeforePath] == root.0[..Position::BeforePath]
      && self.0.path().starts_with(root.0.path())
  }

  /// Whether either uri is under the other.
  pub fn is_comparable(&self, other: &Uri) -> bool {
    self.is_under(other) || other.is_under(self)
  }

  /// The text following `root`, if this uri is under it.
  pub fn relative_to<'a>(&'a self, root: &Uri) -> Option<&'a str> {
    if !self.is_under(root) {
      return None;
    }
    self.as_str().strip_prefix(root.as_str())
  }

  /// This uri with a trailing slash on the path.
  pub fn as_directory(&self) -> Uri {
    if self.is_directory() {
      return self.clone();
    }
    let mut url = self.0.clone();
    let path = format!("{}/", url.path());
    url.set_path(&path);
    Self(url)
  }

  /// The directory containing this resource. For a directory uri this is its
  /// parent and the root is its own parent.
  pub fn parent(&self) -> Uri {
    let relative = if self.is_directory() { "../" } else { "./" };
    match self.0.join(relative) {
      Ok(url) => Self(url),
      Err(_) => self.clone(),
    }
  }

  /// This uri with `extension` appended to the last path segment.
  pub fn with_appended_extension(&self, extension: &str) -> Uri {
    let mut url = self.0.clone();
    let path = format!("{}{}", url.path(), extension);
    url.set_path(&path);
    Self(url)
  }

  /// The decoded name of the last path segment of a `file:` uri.
  pub fn file_name(&self) -> Option<String> {
    let path = self.to_file_path()?;
    Some(path.file_name()?.to_str()?.to_string())
  }

  pub fn to_file_path(&self) -> Option<PathBuf> {
    self.0.to_file_path().ok()
  }
}

impl From<Url> for Uri {
  fn from(url: Url) -> Self {
    Self(url)
  }
}

impl FromStr for Uri {
  type Err = UriParseError;

  fn from_str(text: &str) -> Result<Self, Self::Err> {
    Self::parse(text)
  }
}

impl fmt::Display for Uri {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.0.as_str())
  }
}

impl fmt::Debug for Uri {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "Uri({:?})", self.0.as_str())
  }
}

impl AsRef<str> for Uri {
  fn as_ref(&self) -> &str {
    self.as_str()
  }
}
