// Copyright 2018-2024 the Deno authors. All rights reserved. MIT license.

#![deny(clippy::print_stderr)]
#![deny(clippy::print_stdout)]

mod cache;
pub mod packages;
mod plugin;
mod resolution;
mod resolver;
pub mod source;
pub mod specifier;
pub mod strategy;
mod text_encoding;
mod uri;

pub use cache::ResolutionCache;
pub use plugin::BundlerPlugin;
pub use plugin::PluginError;
pub use plugin::PluginOptions;
pub use plugin::VelcroPlugin;
pub use plugin::PLUGIN_NAME;
pub use resolver::Resolver;
pub use resolver::ResolverSettings;
pub use strategy::CdnProvider;
pub use strategy::CdnStrategy;
pub use strategy::CompoundStrategy;
pub use strategy::ConfigurationError;
pub use strategy::FileContent;
pub use strategy::FsStrategy;
pub use strategy::ResolveError;
pub use strategy::ResolveRequest;
pub use strategy::ResolvedUri;
pub use strategy::Strategy;
pub use text_encoding::decode_utf8;
pub use text_encoding::strip_bom;
pub use text_encoding::DecodeError;
pub use uri::JoinedUri;
pub use uri::Uri;
pub use uri::UriParseError;
