// Copyright 2018-2024 the Deno authors. MIT license.

use std::collections::HashSet;
use std::io;
use std::sync::Arc;

use once_cell::sync::Lazy;

use super::ConfigurationError;
use super::FileContent;
use super::ResolveError;
use super::ResolveRequest;
use crate::packages::PackageJson;
use crate::resolution::file_candidates;
use crate::resolution::index_file_names;
use crate::source::FileStat;
use crate::source::FileSystem;
use crate::uri::JoinedUri;
use crate::uri::Uri;

static FILE_ROOT: Lazy<Uri> = Lazy::new(|| Uri::parse("file:///").unwrap());

const PACKAGE_JSON: &str = "package.json";

/// Resolves relative and `file:` specifiers against a file system, probing
/// extensions, package main fields and directory indexes.
#[derive(Debug)]
pub struct FsStrategy {
  root: Uri,
  fs: Arc<dyn FileSystem>,
}

impl FsStrategy {
  pub fn new(fs: Arc<dyn FileSystem>) -> Self {
    Self {
      root: FILE_ROOT.clone(),
      fs,
    }
  }

  pub fn root_uri(&self) -> &Uri {
    &self.root
  }

  pub async fn resolve(
    &self,
    request: ResolveRequest<'_>,
  ) -> Result<Option<Uri>, ResolveError> {
    if request.kind.is_bare() {
      return Ok(None);
    }
    let target = match request.target()? {
      JoinedUri::Uri(target) => target,
      JoinedUri::Bare => return Ok(None),
    };
    if !target.is_under(&self.root) {
      return Ok(None);
    }
    if let Some(found) = self.find_file(&target, request).await? {
      return Ok(Some(found));
    }
    if let Some(found) = self.find_in_directory(&target, request).await? {
      return Ok(Some(found));
    }
    Err(ResolveError::NotFound(target.to_string()))
  }

  /// `target` itself or `target` with one of the extensions appended.
  async fn find_file(
    &self,
    target: &Uri,
    request: ResolveRequest<'_>,
  ) -> Result<Option<Uri>, ResolveError> {
    let candidates = file_candidates(target, &request.settings.extensions);
    if candidates.is_empty() {
      return Ok(None);
    }
    self.first_existing_file(&target.parent(), candidates, request).await
  }

  /// The package main entries of the directory at `target`, then its index
  /// files.
  async fn find_in_directory(
    &self,
    target: &Uri,
    request: ResolveRequest<'_>,
  ) -> Result<Option<Uri>, ResolveError> {
    let dir = target.as_directory();
    let Some(entries) = self.read_dir(&dir).await? else {
      return Ok(None);
    };
    if entries.contains(PACKAGE_JSON) {
      let package_json = self.read_package_json(&dir).await?;
      for entry in package_json.main_entries(&request.settings.package_main) {
        request.trace(format_args!("trying main entry \"{}\" of {}", entry, dir));
        let main = dir.join_path(entry)?;
        if let Some(found) = self.find_file(&main, request).await? {
          return Ok(Some(found));
        }
        if let Some(found) = self.find_index(&main.as_directory(), request).await?
        {
          return Ok(Some(found));
        }
      }
    }
    self.find_index(&dir, request).await
  }

  async fn find_index(
    &self,
    dir: &Uri,
    request: ResolveRequest<'_>,
  ) -> Result<Option<Uri>, ResolveError> {
    let candidates = index_file_names(&request.settings.extensions)
      .iter()
      .map(|name| dir.join_path(name))
      .collect::<Result<Vec<_>, _>>()?;
    self.first_existing_file(dir, candidates, request).await
  }

  /// The first candidate that is listed in `dir` and is a file. All
  /// candidates are direct children of `dir`.
  async fn first_existing_file(
    &self,
    dir: &Uri,
    candidates: Vec<Uri>,
    request: ResolveRequest<'_>,
  ) -> Result<Option<Uri>, ResolveError> {
    let Some(entries) = self.read_dir(dir).await? else {
      return Ok(None);
    };
    for candidate in candidates {
      let listed = candidate
        .file_name()
        .map(|name| entries.contains(&name))
        .unwrap_or(true);
      if !listed {
        continue;
      }
      request.trace(format_args!("checking {}", candidate));
      if let Some(stat) = self.stat(&candidate).await? {
        if stat.is_file() {
          return Ok(Some(candidate));
        }
      }
    }
    Ok(None)
  }

  async fn read_package_json(
    &self,
    dir: &Uri,
  ) -> Result<PackageJson, ResolveError> {
    let uri = dir.join_path(PACKAGE_JSON)?;
    let bytes = self
      .fs
      .read_file(&uri)
      .await
      .map_err(|source| io_error(&uri, source))?;
    PackageJson::from_slice(&bytes)
      .map_err(|source| ResolveError::InvalidPackageJson { uri, source })
  }

  async fn stat(&self, uri: &Uri) -> Result<Option<FileStat>, ResolveError> {
    match self.fs.stat(uri).await {
      Ok(stat) => Ok(Some(stat)),
      Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
      Err(source) => Err(io_error(uri, source)),
    }
  }

  /// The entry names of a directory, `None` when it does not exist.
  async fn read_dir(
    &self,
    dir: &Uri,
  ) -> Result<Option<HashSet<String>>, ResolveError> {
    match self.fs.read_dir(dir).await {
      Ok(names) => Ok(Some(names.into_iter().collect())),
      Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
      Err(source) => Err(io_error(dir, source)),
    }
  }

  pub async fn read_file_content(
    &self,
    uri: &Uri,
  ) -> Result<FileContent, ResolveError> {
    if !uri.is_under(&self.root) {
      return Err(ConfigurationError::NoStrategyForUri(uri.clone()).into());
    }
    let bytes = self
      .fs
      .read_file(uri)
      .await
      .map_err(|source| io_error(uri, source))?;
    Ok(FileContent {
      uri: uri.clone(),
      content: Arc::from(bytes),
    })
  }
}

fn io_error(uri: &Uri, source: io::Error) -> ResolveError {
  if source.kind() == io::ErrorKind::NotFound {
    ResolveError::NotFound(uri.to_string())
  } else {
    ResolveError::Io {
      uri: uri.clone(),
      source,
    }
  }
}
