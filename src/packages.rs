// Copyright 2018-2024 the Deno authors. MIT license.

use indexmap::IndexMap;
use serde::Deserialize;
use serde::Serialize;

/// The parts of a `package.json` consulted while resolving.
///
/// Unknown fields are kept in `fields` so that any configured main field
/// (ex. `module`, `browser`, `main`) can be looked up by name.
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PackageJson {
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub name: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub version: Option<String>,
  // values are kept loose because published manifests are not always valid
  #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
  pub dependencies: IndexMap<String, serde_json::Value>,
  #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
  pub peer_dependencies: IndexMap<String, serde_json::Value>,
  #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
  pub optional_dependencies: IndexMap<String, serde_json::Value>,
  #[serde(flatten)]
  pub fields: serde_json::Map<String, serde_json::Value>,
}

impl PackageJson {
  pub fn from_slice(bytes: &[u8]) -> Result<Self, serde_json::Error> {
    serde_json::from_slice(bytes)
  }

  /// The non-empty string values of `main_fields`, in priority order.
  pub fn main_entries<'a>(
    &'a self,
    main_fields: &'a [String],
  ) -> impl Iterator<Item = &'a str> + 'a {
    main_fields.iter().filter_map(|field| {
      self
        .fields
        .get(field)
        .and_then(|value| value.as_str())
        .filter(|entry| !entry.is_empty())
    })
  }

  /// The version range this package declares for `name`.
  pub fn dependency_range(&self, name: &str) -> Option<&str> {
    [
      &self.dependencies,
      &self.peer_dependencies,
      &self.optional_dependencies,
    ]
    .into_iter()
    .find_map(|deps| deps.get(name).and_then(|value| value.as_str()))
  }
}
