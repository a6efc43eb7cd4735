//! Host environment capability.
//!
//! The resolver only ever reads three things from its host: the URL of the
//! module doing the resolving, the `src` of every `<script type="module">` in
//! the document, and the page location. [`HostEnvironment`] exposes exactly
//! those, so resolution can run against a real browser ([`BrowserHost`], wasm
//! only) or a recorded [`StaticHost`] snapshot.

use serde::{Deserialize, Serialize};

/// Read-only view of the environment the loader executes in
pub trait HostEnvironment {
    /// Resolved URL of the executing loader module, if known
    fn module_url(&self) -> Option<String>;

    /// Source URLs of all module-typed script elements, in document order
    fn module_scripts(&self) -> Vec<String>;

    /// Top-level page URL
    fn page_url(&self) -> Option<String>;
}

impl<H: HostEnvironment + ?Sized> HostEnvironment for &H {
    fn module_url(&self) -> Option<String> {
        (**self).module_url()
    }

    fn module_scripts(&self) -> Vec<String> {
        (**self).module_scripts()
    }

    fn page_url(&self) -> Option<String> {
        (**self).page_url()
    }
}

impl<H: HostEnvironment + ?Sized> HostEnvironment for std::sync::Arc<H> {
    fn module_url(&self) -> Option<String> {
        (**self).module_url()
    }

    fn module_scripts(&self) -> Vec<String> {
        (**self).module_scripts()
    }

    fn page_url(&self) -> Option<String> {
        (**self).page_url()
    }
}

/// Recorded host snapshot, as written by the CLI's `<host.json>` argument
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StaticHost {
    #[serde(default)]
    pub module_url: Option<String>,
    #[serde(default)]
    pub scripts: Vec<String>,
    #[serde(default)]
    pub page_url: Option<String>,
}

impl StaticHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_module_url(mut self, url: impl Into<String>) -> Self {
        self.module_url = Some(url.into());
        self
    }

    pub fn with_script(mut self, src: impl Into<String>) -> Self {
        self.scripts.push(src.into());
        self
    }

    pub fn with_page_url(mut self, url: impl Into<String>) -> Self {
        self.page_url = Some(url.into());
        self
    }
}

impl HostEnvironment for StaticHost {
    fn module_url(&self) -> Option<String> {
        self.module_url.clone()
    }

    fn module_scripts(&self) -> Vec<String> {
        self.scripts.clone()
    }

    fn page_url(&self) -> Option<String> {
        self.page_url.clone()
    }
}

#[cfg(target_arch = "wasm32")]
pub use browser::BrowserHost;

#[cfg(target_arch = "wasm32")]
mod browser {
    use super::HostEnvironment;
    use wasm_bindgen::JsCast;

    /// Live browser host backed by `window` and `document`.
    ///
    /// `import.meta.url` is only visible to the JS glue of the bundle that
    /// owns it, so the module URL is handed in at construction.
    pub struct BrowserHost {
        module_url: Option<String>,
    }

    impl BrowserHost {
        pub fn new(module_url: Option<String>) -> Self {
            Self { module_url }
        }
    }

    impl HostEnvironment for BrowserHost {
        fn module_url(&self) -> Option<String> {
            self.module_url.clone().filter(|u| !u.is_empty())
        }

        fn module_scripts(&self) -> Vec<String> {
            let Some(document) = web_sys::window().and_then(|w| w.document()) else {
                return Vec::new();
            };
            let Ok(nodes) = document.query_selector_all(r#"script[type="module"]"#) else {
                return Vec::new();
            };
            (0..nodes.length())
                .filter_map(|i| nodes.item(i))
                .filter_map(|node| node.dyn_into::<web_sys::HtmlScriptElement>().ok())
                .map(|script| script.src())
                .filter(|src| !src.is_empty())
                .collect()
        }

        fn page_url(&self) -> Option<String> {
            web_sys::window().and_then(|w| w.location().href().ok())
        }
    }
}
