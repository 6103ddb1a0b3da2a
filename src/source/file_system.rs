// Copyright 2018-2023 the Deno authors. All rights reserved. MIT license.

use std::collections::HashMap;
use std::fmt;
use std::io;
use std::path::PathBuf;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;
use std::sync::Arc;

use async_trait::async_trait;
use indexmap::IndexSet;

use crate::uri::Uri;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileStat {
  pub is_directory: bool,
}

impl FileStat {
  pub fn is_file(&self) -> bool {
    !self.is_directory
  }
}

/// The filesystem capability a filesystem strategy reads through. All
/// locations are `file:` uris.
#[async_trait(?Send)]
pub trait FileSystem: fmt::Debug {
  async fn read_file(&self, uri: &Uri) -> io::Result<Vec<u8>>;
  async fn stat(&self, uri: &Uri) -> io::Result<FileStat>;
  /// The names of the entries in a directory.
  async fn read_dir(&self, uri: &Uri) -> io::Result<Vec<String>>;
}

fn not_found(uri: &Uri) -> io::Error {
  io::Error::new(io::ErrorKind::NotFound, format!("Not found: {uri}"))
}

#[derive(Debug, Clone, Default)]
pub struct NullFileSystem;

#[async_trait(?Send)]
impl FileSystem for NullFileSystem {
  async fn read_file(&self, uri: &Uri) -> io::Result<Vec<u8>> {
    Err(not_found(uri))
  }

  async fn stat(&self, uri: &Uri) -> io::Result<FileStat> {
    Err(not_found(uri))
  }

  async fn read_dir(&self, uri: &Uri) -> io::Result<Vec<String>> {
    Err(not_found(uri))
  }
}

/// An in-memory file system that also counts the operations performed on
/// it.
#[derive(Debug, Default)]
pub struct MemoryFileSystem {
  directories: HashMap<Uri, IndexSet<String>>,
  files: HashMap<Uri, Arc<[u8]>>,
  operations: AtomicUsize,
}

impl MemoryFileSystem {
  pub fn add_file(&mut self, url: impl AsRef<str>, content: impl AsRef<[u8]>) {
    let uri = Uri::parse(url.as_ref()).unwrap();
    assert_eq!(uri.scheme(), "file");
    self.add_parents(&uri);
    self.files.insert(uri, Arc::from(content.as_ref()));
  }

  pub fn add_dir(&mut self, url: impl AsRef<str>) {
    let uri = Uri::parse(url.as_ref()).unwrap().as_directory();
    assert_eq!(uri.scheme(), "file");
    self.add_parents(&uri);
    self.directories.entry(uri).or_default();
  }

  fn add_parents(&mut self, uri: &Uri) {
    let mut child = uri.clone();
    loop {
      let parent = child.parent();
      if parent == child {
        break;
      }
      if let Some(name) = child.file_name() {
        self.directories.entry(parent.clone()).or_default().insert(name);
      }
      child = parent;
    }
  }

  /// The number of reads, stats and directory listings performed so far.
  pub fn operation_count(&self) -> usize {
    self.operations.load(Ordering::SeqCst)
  }

  fn record(&self) {
    self.operations.fetch_add(1, Ordering::SeqCst);
  }
}

#[async_trait(?Send)]
impl FileSystem for MemoryFileSystem {
  async fn read_file(&self, uri: &Uri) -> io::Result<Vec<u8>> {
    self.record();
    match self.files.get(uri) {
      Some(content) => Ok(content.to_vec()),
      None if self.directories.contains_key(&uri.as_directory()) => {
        Err(io::Error::other(format!("Is a directory: {uri}")))
      }
      None => Err(not_found(uri)),
    }
  }

  async fn stat(&self, uri: &Uri) -> io::Result<FileStat> {
    self.record();
    if self.files.contains_key(uri) {
      Ok(FileStat {
        is_directory: false,
      })
    } else if self.directories.contains_key(&uri.as_directory()) {
      Ok(FileStat { is_directory: true })
    } else {
      Err(not_found(uri))
    }
  }

  async fn read_dir(&self, uri: &Uri) -> io::Result<Vec<String>> {
    self.record();
    match self.directories.get(&uri.as_directory()) {
      Some(entries) => Ok(entries.iter().cloned().collect()),
      None => Err(not_found(uri)),
    }
  }
}

#[derive(Debug, Clone, Default)]
pub struct RealFileSystem;

fn to_file_path(uri: &Uri) -> io::Result<PathBuf> {
  uri.to_file_path().ok_or_else(|| {
    io::Error::new(
      io::ErrorKind::InvalidInput,
      format!("Failed converting url to path: {uri}"),
    )
  })
}

#[async_trait(?Send)]
impl FileSystem for RealFileSystem {
  async fn read_file(&self, uri: &Uri) -> io::Result<Vec<u8>> {
    std::fs::read(to_file_path(uri)?)
  }

  async fn stat(&self, uri: &Uri) -> io::Result<FileStat> {
    let metadata = std::fs::metadata(to_file_path(uri)?)?;
    Ok(FileStat {
      is_directory: metadata.is_dir(),
    })
  }

  async fn read_dir(&self, uri: &Uri) -> io::Result<Vec<String>> {
    let mut names = Vec::new();
    for entry in std::fs::read_dir(to_file_path(uri)?)? {
      let entry = match entry {
        Ok(entry) => entry,
        Err(err) if err.kind() == io::ErrorKind::PermissionDenied => continue,
        Err(err) => return Err(err),
      };
      // names that are not utf-8 can never match a specifier
      if let Ok(name) = entry.file_name().into_string() {
        names.push(name);
      }
    }
    Ok(names)
  }
}
