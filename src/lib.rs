//! Dashboard Strategy Loader
//!
//! Cache-tagged module loading for smart-home dashboard strategies.
//!
//! This library provides:
//! - Cache-busting tag discovery from the loader URL, module scripts, or page URL
//! - Path resolution that carries the tag onto every submodule exactly once
//! - Tagged dynamic import over a host import facility
//! - Sequential loading of the strategy's submodule manifest
//! - A browser host and `import()` binding when built for wasm32

pub mod config;
pub mod host;
pub mod import;
pub mod loader;
pub mod resolver;
pub mod tag;
pub mod version;

#[cfg(target_arch = "wasm32")]
pub mod web;

pub use config::{LoaderConfig, TagSettings};
pub use host::{HostEnvironment, StaticHost};
pub use import::{ModuleImporter, TaggedImporter};
pub use loader::{LoadError, Loaded, ManifestLoader};
pub use resolver::ModuleResolver;
pub use tag::Tag;
