// Copyright 2018-2024 the Deno authors. MIT license.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use deno_error::JsErrorBox;
use parking_lot::Mutex;

use crate::uri::Uri;

mod file_system;
#[cfg(feature = "http")]
mod http;

pub use file_system::FileStat;
pub use file_system::FileSystem;
pub use file_system::MemoryFileSystem;
pub use file_system::NullFileSystem;
pub use file_system::RealFileSystem;
#[cfg(feature = "http")]
pub use http::ReqwestFetcher;

/// How a [`Fetcher`] should treat http 3XX responses.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
pub enum RedirectMode {
  /// Follow redirects and respond with the final location.
  #[default]
  Follow,
  /// Respond with the redirect itself.
  Manual,
}

#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
pub struct FetchOptions {
  pub redirect: RedirectMode,
}

impl FetchOptions {
  pub fn follow() -> Self {
    Self {
      redirect: RedirectMode::Follow,
    }
  }
}

/// The response that is expected from a fetcher's `.fetch()` method.
///
/// Non-2XX responses are still responses. Only a failure to talk to the
/// remote at all is an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchResponse {
  /// The url of the response. When redirects are followed this is the final
  /// url and can differ from the requested one.
  pub url: Uri,
  pub status: u16,
  pub content: Arc<[u8]>,
}

impl FetchResponse {
  pub fn is_success(&self) -> bool {
    (200..300).contains(&self.status)
  }

  pub fn is_redirect(&self) -> bool {
    (300..400).contains(&self.status)
  }
}

pub type FetchResult = Result<FetchResponse, JsErrorBox>;

/// The http transport. This is the only way the crate reaches the network,
/// so tests can swap in a [`MemoryFetcher`].
#[async_trait(?Send)]
pub trait Fetcher: fmt::Debug {
  /// The maximum number of redirects followed.
  fn max_redirects(&self) -> usize {
    10
  }

  async fn fetch(&self, url: &Uri, options: FetchOptions) -> FetchResult;
}

#[derive(Debug, Clone)]
enum MemorySource {
  Response { status: u16, content: Arc<[u8]> },
  Redirect(Uri),
  Err(String),
}

/// A fetcher where the responses are provided ahead of time. This is useful
/// for testing or for serving an offline snapshot of a CDN.
#[derive(Debug, Default)]
pub struct MemoryFetcher {
  sources: HashMap<Uri, MemorySource>,
  requests: Mutex<Vec<Uri>>,
}

impl MemoryFetcher {
  pub fn add_source(&mut self, url: impl AsRef<str>, content: impl AsRef<str>) {
    self.add_bytes_source(url, content.as_ref().as_bytes().to_vec());
  }

  pub fn add_bytes_source(&mut self, url: impl AsRef<str>, content: Vec<u8>) {
    self.insert(
      url,
      MemorySource::Response {
        status: 200,
        content: Arc::from(content),
      },
    );
  }

  pub fn add_redirect(&mut self, from: impl AsRef<str>, to: impl AsRef<str>) {
    let to = Uri::parse(to.as_ref()).unwrap();
    self.insert(from, MemorySource::Redirect(to));
  }

  pub fn add_status(&mut self, url: impl AsRef<str>, status: u16) {
    self.insert(
      url,
      MemorySource::Response {
        status,
        content: Arc::from(Vec::new()),
      },
    );
  }

  pub fn add_error(&mut self, url: impl AsRef<str>, message: impl AsRef<str>) {
    self.insert(url, MemorySource::Err(message.as_ref().to_string()));
  }

  fn insert(&mut self, url: impl AsRef<str>, source: MemorySource) {
    let url = Uri::parse(url.as_ref()).unwrap();
    self.sources.insert(url, source);
  }

  /// Every url requested so far, in order.
  pub fn requests(&self) -> Vec<Uri> {
    self.requests.lock().clone()
  }

  pub fn request_count(&self) -> usize {
    self.requests.lock().len()
  }
}

#[async_trait(?Send)]
impl Fetcher for MemoryFetcher {
  async fn fetch(&self, url: &Uri, options: FetchOptions) -> FetchResult {
    self.requests.lock().push(url.clone());
    let mut current = url.clone();
    for _ in 0..=self.max_redirects() {
      match self.sources.get(&current) {
        Some(MemorySource::Response { status, content }) => {
          return Ok(FetchResponse {
            url: current,
            status: *status,
            content: content.clone(),
          });
        }
        Some(MemorySource::Redirect(to)) => {
          if options.redirect == RedirectMode::Manual {
            return Ok(FetchResponse {
              url: current,
              status: 302,
              content: Arc::from(Vec::new()),
            });
          }
          current = to.clone();
        }
        Some(MemorySource::Err(message)) => {
          return Err(JsErrorBox::generic(message.clone()));
        }
        None => {
          return Ok(FetchResponse {
            url: current,
            status: 404,
            content: Arc::from(Vec::new()),
          });
        }
      }
    }
    Err(JsErrorBox::generic(format!(
      "Too many redirects while fetching \"{}\".",
      url
    )))
  }
}
