// Copyright 2018-2024 the Deno authors. MIT license.

mod test_builder;

pub use test_builder::*;

pub const JS_DELIVR: &str = "https://cdn.jsdelivr.net/npm/";

pub fn init_logger() {
  let _ = env_logger::builder().is_test(true).try_init();
}

/// Publishes a package on the in-memory CDN. The unversioned url redirects to
/// the entry of the given version, like the real CDN does.
pub fn add_package(
  fetcher: &mut velcro_resolver::source::MemoryFetcher,
  name: &str,
  version: &str,
  package_json: serde_json::Value,
  files: &[(&str, &str)],
) {
  let versioned = format!("{JS_DELIVR}{name}@{version}");
  let entry = package_json
    .get("main")
    .and_then(|main| main.as_str())
    .unwrap_or("index.js")
    .trim_start_matches("./")
    .to_string();
  fetcher.add_redirect(format!("{JS_DELIVR}{name}"), format!("{versioned}/{entry}"));
  fetcher.add_redirect(&versioned, format!("{versioned}/{entry}"));
  fetcher.add_source(format!("{versioned}/package.json"), package_json.to_string());
  for (path, text) in files {
    fetcher.add_source(format!("{versioned}/{path}"), text);
  }
}
