use std::sync::Arc;

use velcro_resolver::source::FetchOptions;
use velcro_resolver::source::FetchResult;
use velcro_resolver::source::Fetcher;
use velcro_resolver::source::MemoryFetcher;
use velcro_resolver::source::MemoryFileSystem;
use velcro_resolver::Uri;
use velcro_resolver::ConfigurationError;
use velcro_resolver::PluginOptions;
use velcro_resolver::VelcroPlugin;

pub struct TestPlugin {
  pub plugin: VelcroPlugin,
  pub fetcher: Arc<MemoryFetcher>,
  pub fs: Arc<MemoryFileSystem>,
}

impl TestPlugin {
  /// Requests made to the CDN plus operations performed on the file system.
  pub fn io_count(&self) -> usize {
    self.fetcher.request_count() + self.fs.operation_count()
  }
}

/// Hands control back to the executor before every request so concurrent
/// resolutions interleave.
#[derive(Debug)]
struct YieldingFetcher(Arc<MemoryFetcher>);

#[async_trait::async_trait(?Send)]
impl Fetcher for YieldingFetcher {
  async fn fetch(&self, url: &Uri, options: FetchOptions) -> FetchResult {
    tokio::task::yield_now().await;
    self.0.fetch(url, options).await
  }
}

pub struct TestBuilder {
  fetcher: MemoryFetcher,
  fs: MemoryFileSystem,
  options: PluginOptions,
  yield_on_fetch: bool,
}

impl TestBuilder {
  pub fn new() -> Self {
    super::init_logger();
    Self {
      fetcher: Default::default(),
      fs: Default::default(),
      options: Default::default(),
      yield_on_fetch: false,
    }
  }

  pub fn yield_on_fetch(&mut self) -> &mut Self {
    self.yield_on_fetch = true;
    self
  }

  pub fn with_fetcher(
    &mut self,
    mut action: impl FnMut(&mut MemoryFetcher),
  ) -> &mut Self {
    action(&mut self.fetcher);
    self
  }

  pub fn with_fs(
    &mut self,
    mut action: impl FnMut(&mut MemoryFileSystem),
  ) -> &mut Self {
    action(&mut self.fs);
    self
  }

  pub fn with_options(
    &mut self,
    mut action: impl FnMut(&mut PluginOptions),
  ) -> &mut Self {
    action(&mut self.options);
    self
  }

  pub fn try_build(&mut self) -> Result<TestPlugin, ConfigurationError> {
    let fetcher = Arc::new(std::mem::take(&mut self.fetcher));
    let fs = Arc::new(std::mem::take(&mut self.fs));
    let mut options = self.options.clone();
    options.fs = Some(fs.clone());
    let plugin = if self.yield_on_fetch {
      VelcroPlugin::with_fetcher(
        options,
        Arc::new(YieldingFetcher(fetcher.clone())),
      )?
    } else {
      VelcroPlugin::with_fetcher(options, fetcher.clone())?
    };
    Ok(TestPlugin {
      plugin,
      fetcher,
      fs,
    })
  }

  pub fn build(&mut self) -> TestPlugin {
    self.try_build().unwrap()
  }
}
