//! Browser entry point.

use std::sync::Arc;

use wasm_bindgen::prelude::*;

use crate::config::LoaderConfig;
use crate::host::BrowserHost;
use crate::import::{DynamicImport, TaggedImporter};
use crate::loader::{LoadError, ManifestLoader};
use crate::resolver::ModuleResolver;

/// Load the strategy's submodules in manifest order.
///
/// `config` may be `undefined` for defaults. `module_url` is the loader's
/// `import.meta.url`. Resolves to the array of module namespaces; a failed
/// import rejects with the browser's own error.
#[wasm_bindgen(js_name = loadStrategy)]
pub async fn load_strategy(config: JsValue, module_url: String) -> Result<js_sys::Array, JsValue> {
    let config: LoaderConfig = if config.is_undefined() || config.is_null() {
        LoaderConfig::default()
    } else {
        serde_wasm_bindgen::from_value(config)?
    };

    let host = BrowserHost::new(Some(module_url));
    let resolver = ModuleResolver::from_config(host, &config)
        .map_err(|e| JsValue::from_str(&e.to_string()))?;
    let loader = ManifestLoader::new(
        TaggedImporter::new(Arc::new(resolver), DynamicImport),
        config.manifest.clone(),
    );

    match loader.load_all().await {
        Ok(loaded) => Ok(loaded.into_iter().map(|l| l.module).collect()),
        Err(LoadError::Import { error, .. }) => Err(error),
        Err(e) => Err(JsValue::from_str(&e.to_string())),
    }
}
