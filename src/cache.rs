// Copyright 2018-2024 the Deno authors. MIT license.

use std::collections::HashMap;

use indexmap::IndexMap;
use parking_lot::Mutex;

use crate::uri::Uri;

#[derive(Debug, Default)]
struct CacheInner {
  /// Canonical identifiers handed out to the host.
  identifiers: IndexMap<String, Uri>,
  /// `(specifier, importer)` pairs already resolved.
  requests: HashMap<(String, String), Uri>,
}

/// The resolutions made during one build.
///
/// Entries are never replaced or evicted. When two resolutions of the same
/// request race, the first one to finish is kept and handed to both.
#[derive(Debug, Default)]
pub struct ResolutionCache {
  inner: Mutex<CacheInner>,
}

impl ResolutionCache {
  pub fn get_identifier(&self, id: &str) -> Option<Uri> {
    self.inner.lock().identifiers.get(id).cloned()
  }

  pub fn contains_identifier(&self, id: &str) -> bool {
    self.inner.lock().identifiers.contains_key(id)
  }

  pub fn get_request(&self, specifier: &str, importer: &str) -> Option<Uri> {
    self
      .inner
      .lock()
      .requests
      .get(&(specifier.to_string(), importer.to_string()))
      .cloned()
  }

  /// Records that `specifier` imported by `importer` resolved to `uri` and
  /// returns the uri stored for the request.
  pub fn insert(&self, specifier: &str, importer: &str, uri: Uri) -> Uri {
    let mut inner = self.inner.lock();
    let uri = inner
      .requests
      .entry((specifier.to_string(), importer.to_string()))
      .or_insert(uri)
      .clone();
    inner
      .identifiers
      .entry(uri.to_string())
      .or_insert_with(|| uri.clone());
    uri
  }

  /// The number of distinct identifiers.
  pub fn len(&self) -> usize {
    self.inner.lock().identifiers.len()
  }

  pub fn is_empty(&self) -> bool {
    self.len() == 0
  }

  /// Every identifier in the order it was first resolved.
  pub fn identifiers(&self) -> Vec<Uri> {
    self.inner.lock().identifiers.values().cloned().collect()
  }
}
