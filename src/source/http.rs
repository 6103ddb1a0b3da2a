// Copyright 2018-2024 the Deno authors. MIT license.

use std::sync::Arc;

use async_trait::async_trait;
use deno_error::JsErrorBox;
use once_cell::sync::OnceCell;

use super::FetchOptions;
use super::FetchResponse;
use super::FetchResult;
use super::Fetcher;
use super::RedirectMode;
use crate::uri::Uri;

const MAX_REDIRECTS: usize = 10;

/// A [`Fetcher`] that performs real http requests.
///
/// Resolution only ever follows redirects. The client that leaves 3XX
/// responses alone is created on the first [`RedirectMode::Manual`] request
/// from a caller using the fetcher directly.
#[derive(Debug, Clone)]
pub struct ReqwestFetcher {
  following: reqwest::Client,
  manual: OnceCell<reqwest::Client>,
}

impl ReqwestFetcher {
  pub fn new() -> Result<Self, reqwest::Error> {
    let following = reqwest::Client::builder()
      .redirect(reqwest::redirect::Policy::limited(MAX_REDIRECTS))
      .build()?;
    Ok(Self {
      following,
      manual: OnceCell::new(),
    })
  }

  fn manual_client(&self) -> Result<&reqwest::Client, reqwest::Error> {
    self.manual.get_or_try_init(|| {
      reqwest::Client::builder()
        .redirect(reqwest::redirect::Policy::none())
        .build()
    })
  }
}

#[async_trait(?Send)]
impl Fetcher for ReqwestFetcher {
  fn max_redirects(&self) -> usize {
    MAX_REDIRECTS
  }

  async fn fetch(&self, url: &Uri, options: FetchOptions) -> FetchResult {
    let client = match options.redirect {
      RedirectMode::Follow => &self.following,
      RedirectMode::Manual => self
        .manual_client()
        .map_err(|err| JsErrorBox::generic(err.to_string()))?,
    };
    let response = client
      .get(url.as_url().clone())
      .send()
      .await
      .map_err(|err| JsErrorBox::generic(err.to_string()))?;
    let status = response.status().as_u16();
    let final_url = Uri::from(response.url().clone());
    let content = response
      .bytes()
      .await
      .map_err(|err| JsErrorBox::generic(err.to_string()))?;
    Ok(FetchResponse {
      url: final_url,
      status,
      content: Arc::from(content.as_ref()),
    })
  }
}
