// Copyright 2018-2024 the Deno authors. MIT license.

//! Candidate generation shared by the strategies. A strategy asks for the
//! ordered list of locations a reference may stand for and confirms the
//! first one that exists using its own backing source.

use crate::uri::Uri;

/// The reference itself followed by the reference with each extension
/// appended. Directory references have no file candidates.
pub(crate) fn file_candidates(target: &Uri, extensions: &[String]) -> Vec<Uri> {
  if target.is_directory() {
    return Vec::new();
  }
  let mut candidates = Vec::with_capacity(extensions.len() + 1);
  candidates.push(target.clone());
  candidates.extend(
    extensions
      .iter()
      .map(|extension| target.with_appended_extension(extension)),
  );
  candidates
}

/// Whether the last segment of `target` already ends with one of the
/// extensions.
pub(crate) fn has_known_extension(target: &Uri, extensions: &[String]) -> bool {
  let path = target.path();
  extensions
    .iter()
    .any(|extension| !extension.is_empty() && path.ends_with(extension.as_str()))
}

/// The `index.<ext>` file names to look for in a directory.
pub(crate) fn index_file_names(extensions: &[String]) -> Vec<String> {
  extensions
    .iter()
    .map(|extension| format!("index{extension}"))
    .collect()
}
