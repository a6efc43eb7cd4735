//! Sequential manifest loading.
//!
//! The strategy bundle is split into submodules that must evaluate in a fixed
//! order (version info before helpers, helpers before cards and views).
//! [`ManifestLoader`] imports them one at a time through a [`TaggedImporter`],
//! awaiting each before issuing the next.

use std::fmt;

use thiserror::Error;

use crate::host::HostEnvironment;
use crate::import::{ModuleImporter, TaggedImporter};

#[derive(Debug, Error)]
pub enum LoadError<E: fmt::Debug> {
    #[error("manifest is empty")]
    EmptyManifest,

    #[error("failed to import {path} ({specifier}): {error:?}")]
    Import {
        path: String,
        specifier: String,
        error: E,
    },
}

impl<E: fmt::Debug> LoadError<E> {
    /// The host's own import failure, if that is what stopped loading
    pub fn into_host_error(self) -> Option<E> {
        match self {
            LoadError::Import { error, .. } => Some(error),
            LoadError::EmptyManifest => None,
        }
    }
}

/// One successfully imported manifest entry
#[derive(Debug, Clone)]
pub struct Loaded<M> {
    pub path: String,
    pub specifier: String,
    pub module: M,
}

pub struct ManifestLoader<H, I> {
    importer: TaggedImporter<H, I>,
    manifest: Vec<String>,
}

impl<H, I> ManifestLoader<H, I>
where
    H: HostEnvironment,
    I: ModuleImporter,
    I::Error: fmt::Debug,
{
    pub fn new(importer: TaggedImporter<H, I>, manifest: Vec<String>) -> Self {
        Self { importer, manifest }
    }

    pub fn manifest(&self) -> &[String] {
        &self.manifest
    }

    /// Specifiers the manifest resolves to, in load order
    pub fn resolved(&self) -> Vec<String> {
        self.manifest
            .iter()
            .map(|path| self.importer.resolver().resolve(path, None))
            .collect()
    }

    /// Import every manifest entry in order, stopping at the first failure
    pub async fn load_all(&self) -> Result<Vec<Loaded<I::Module>>, LoadError<I::Error>> {
        if self.manifest.is_empty() {
            return Err(LoadError::EmptyManifest);
        }

        let mut loaded = Vec::with_capacity(self.manifest.len());
        for path in &self.manifest {
            let (specifier, result) = self.importer.import_resolving(path).await;
            match result {
                Ok(module) => {
                    tracing::debug!("Loaded {}", specifier);
                    loaded.push(Loaded {
                        path: path.clone(),
                        specifier,
                        module,
                    });
                }
                Err(error) => {
                    tracing::warn!("Failed to load {} ({}): {:?}", path, specifier, error);
                    return Err(LoadError::Import {
                        path: path.clone(),
                        specifier,
                        error,
                    });
                }
            }
        }

        tracing::info!("Loaded {} strategy modules", loaded.len());
        Ok(loaded)
    }
}
