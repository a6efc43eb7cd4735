//! Tagged dynamic import.
//!
//! [`ModuleImporter`] is the host's dynamic-import facility. [`TaggedImporter`]
//! resolves each path through a shared [`ModuleResolver`] and hands the result
//! to the importer; whatever the importer returns, success or failure, comes
//! back to the caller as-is.

use std::sync::Arc;

use async_trait::async_trait;

use crate::host::HostEnvironment;
use crate::resolver::ModuleResolver;

/// Host facility that loads a module from a specifier
#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
pub trait ModuleImporter {
    /// Loaded module (exported bindings, source text, ...)
    type Module;
    /// Host failure (network, syntax, missing module)
    type Error;

    async fn import(&self, specifier: &str) -> Result<Self::Module, Self::Error>;
}

pub struct TaggedImporter<H, I> {
    resolver: Arc<ModuleResolver<H>>,
    importer: I,
}

impl<H: HostEnvironment, I: ModuleImporter> TaggedImporter<H, I> {
    pub fn new(resolver: Arc<ModuleResolver<H>>, importer: I) -> Self {
        Self { resolver, importer }
    }

    pub fn resolver(&self) -> &Arc<ModuleResolver<H>> {
        &self.resolver
    }

    pub fn importer(&self) -> &I {
        &self.importer
    }

    /// Resolve `path` and import it. Import failures are not retried or wrapped.
    pub async fn import_tagged(&self, path: &str) -> Result<I::Module, I::Error> {
        self.import_resolving(path).await.1
    }

    /// Like [`import_tagged`](Self::import_tagged), also returning the
    /// specifier the importer was given
    pub async fn import_resolving(&self, path: &str) -> (String, Result<I::Module, I::Error>) {
        let specifier = self.resolver.resolve(path, None);
        tracing::debug!("Importing {}", specifier);
        let result = self.importer.import(&specifier).await;
        (specifier, result)
    }
}

#[cfg(all(feature = "cli", not(target_arch = "wasm32")))]
pub use fs::FsImporter;

#[cfg(all(feature = "cli", not(target_arch = "wasm32")))]
mod fs {
    use std::io;
    use std::path::{Component, Path, PathBuf};

    use async_trait::async_trait;
    use url::Url;

    use super::ModuleImporter;

    /// Loads modules from a built bundle on disk.
    ///
    /// A specifier's URL path is stripped of `mount` (the path the bundle is
    /// served under) and looked up below `root`. The module is the file's
    /// source text.
    #[derive(Debug, Clone)]
    pub struct FsImporter {
        root: PathBuf,
        mount: String,
    }

    impl FsImporter {
        pub fn new(root: impl Into<PathBuf>) -> Self {
            Self {
                root: root.into(),
                mount: "/".to_string(),
            }
        }

        pub fn with_mount(mut self, mount: impl Into<String>) -> Self {
            let mut mount = mount.into();
            if !mount.ends_with('/') {
                mount.push('/');
            }
            self.mount = mount;
            self
        }

        /// Map a specifier onto a file below `root`
        pub fn locate(&self, specifier: &str) -> io::Result<PathBuf> {
            let url_path = match Url::parse(specifier) {
                Ok(url) => url.path().to_string(),
                Err(_) => specifier
                    .split(['?', '#'])
                    .next()
                    .unwrap_or(specifier)
                    .to_string(),
            };

            let relative = if let Some(rest) = url_path.strip_prefix(self.mount.as_str()) {
                rest.to_string()
            } else if url_path.starts_with('/') {
                return Err(io::Error::new(
                    io::ErrorKind::NotFound,
                    format!("{} is outside bundle mount {}", url_path, self.mount),
                ));
            } else {
                url_path
            };

            let decoded = urlencoding::decode(&relative)
                .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;

            let mut path = self.root.clone();
            for component in Path::new(decoded.as_ref()).components() {
                match component {
                    Component::Normal(part) => path.push(part),
                    Component::CurDir => {}
                    _ => {
                        return Err(io::Error::new(
                            io::ErrorKind::PermissionDenied,
                            format!("{} escapes the bundle root", specifier),
                        ))
                    }
                }
            }
            Ok(path)
        }
    }

    #[async_trait]
    impl ModuleImporter for FsImporter {
        type Module = String;
        type Error = io::Error;

        async fn import(&self, specifier: &str) -> io::Result<String> {
            let path = self.locate(specifier)?;
            tracing::trace!("Reading {} from {}", specifier, path.display());
            tokio::fs::read_to_string(&path).await
        }
    }
}

#[cfg(target_arch = "wasm32")]
pub use dynamic::DynamicImport;

#[cfg(target_arch = "wasm32")]
mod dynamic {
    use async_trait::async_trait;
    use wasm_bindgen::prelude::*;
    use wasm_bindgen_futures::JsFuture;

    use super::ModuleImporter;

    #[wasm_bindgen(inline_js = "export function dynamic_import(specifier) { return import(specifier); }")]
    extern "C" {
        #[wasm_bindgen(catch)]
        fn dynamic_import(specifier: &str) -> Result<js_sys::Promise, JsValue>;
    }

    /// The browser's `import()` expression.
    ///
    /// Relative specifiers resolve against the glue snippet, not the loader,
    /// so callers should pass resolved absolute URLs.
    #[derive(Debug, Default, Clone, Copy)]
    pub struct DynamicImport;

    #[async_trait(?Send)]
    impl ModuleImporter for DynamicImport {
        type Module = JsValue;
        type Error = JsValue;

        async fn import(&self, specifier: &str) -> Result<JsValue, JsValue> {
            let promise = dynamic_import(specifier)?;
            JsFuture::from(promise).await
        }
    }
}
