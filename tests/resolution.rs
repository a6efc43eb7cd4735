//! End-to-end resolution scenarios against fake hosts
//!
//! Each host here is a plain snapshot or a shared one whose scripts change
//! between calls, so discovery memoization is observable from outside.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use dashboard_strategy_loader::{
    HostEnvironment, LoadError, LoaderConfig, ManifestLoader, ModuleImporter, ModuleResolver,
    StaticHost, Tag, TagSettings, TaggedImporter,
};

/// Host whose script list can be swapped while a resolver holds it
#[derive(Default)]
struct ChangingHost {
    scripts: Mutex<Vec<String>>,
    reads: Mutex<usize>,
}

impl ChangingHost {
    fn set_scripts(&self, scripts: &[&str]) {
        *self.scripts.lock().unwrap() = scripts.iter().map(|s| s.to_string()).collect();
    }
}

impl HostEnvironment for ChangingHost {
    fn module_url(&self) -> Option<String> {
        None
    }

    fn module_scripts(&self) -> Vec<String> {
        *self.reads.lock().unwrap() += 1;
        self.scripts.lock().unwrap().clone()
    }

    fn page_url(&self) -> Option<String> {
        None
    }
}

fn key_v() -> TagSettings {
    TagSettings::with_key("v").unwrap()
}

#[test]
fn scenario_tag_applied_to_relative_path() {
    let host = StaticHost::new().with_module_url("http://ha.local/hacsfiles/s/loader.js?v=42");
    let resolver = ModuleResolver::new(host, key_v());
    assert_eq!(
        resolver.resolve("./a.js", None),
        "http://ha.local/hacsfiles/s/a.js?v=42"
    );

    let bare = ModuleResolver::with_tag(StaticHost::new(), key_v(), Tag::new("42"));
    assert_eq!(bare.resolve("./a.js", None), "./a.js?v=42");
}

#[test]
fn scenario_no_tag_anywhere() {
    let host = StaticHost::new()
        .with_module_url("http://ha.local/hacsfiles/s/loader.js")
        .with_script("http://ha.local/hacsfiles/s/loader.js")
        .with_page_url("http://ha.local/lovelace/0");
    let resolver = ModuleResolver::new(host, key_v());
    assert_eq!(resolver.tag(), None);
    assert_eq!(resolver.resolve("./a.js", None), "./a.js");
}

#[test]
fn scenario_already_tagged_not_doubled() {
    let resolver = ModuleResolver::with_tag(
        StaticHost::new().with_module_url("http://ha.local/hacsfiles/s/loader.js"),
        key_v(),
        Tag::new("7"),
    );
    assert_eq!(resolver.resolve("./a.js?v=7", None), "./a.js?v=7");
}

#[test]
fn scenario_bare_specifier_fallback() {
    let resolver = ModuleResolver::with_tag(StaticHost::new(), key_v(), Tag::new("1"));
    assert_eq!(resolver.resolve("a.js", None), "./a.js?v=1");
}

#[test]
fn scenario_discovery_memoized_across_script_changes() {
    let host = Arc::new(ChangingHost::default());
    host.set_scripts(&["http://ha.local/hacsfiles/s/loader.js?v=first"]);

    let resolver = ModuleResolver::new(host.clone(), key_v());
    assert_eq!(resolver.tag(), Tag::new("first").as_ref());

    host.set_scripts(&["http://ha.local/hacsfiles/s/loader.js?v=second"]);
    assert_eq!(resolver.tag(), Tag::new("first").as_ref());
    assert_eq!(resolver.resolve("a.js", None), "./a.js?v=first");
    assert_eq!(*host.reads.lock().unwrap(), 1);
}

#[test]
fn entry_script_discovered_from_document() {
    let host = StaticHost::new()
        .with_script("http://ha.local/frontend_latest/core.js")
        .with_script("http://ha.local/hacsfiles/s/dashboard-strategy.js?hacstag=1700000000")
        .with_page_url("http://ha.local/lovelace/0");
    let resolver = ModuleResolver::from_config(host, &LoaderConfig::default()).unwrap();
    assert_eq!(
        resolver.resolve("/hacsfiles/s/cards.js", Some("http://ha.local/")),
        "http://ha.local/hacsfiles/s/cards.js?hacstag=1700000000"
    );
}

#[test]
fn full_url_is_never_rebased() {
    let resolver = ModuleResolver::with_tag(
        StaticHost::new().with_module_url("http://ha.local/hacsfiles/s/loader.js"),
        key_v(),
        Tag::new("3"),
    );
    let resolved = resolver.resolve("https://cdn.example/x.js?lang=en", Some("http://other/"));
    assert!(resolved.starts_with("https://cdn.example/"));
    assert_eq!(resolved, "https://cdn.example/x.js?lang=en&v=3");
}

struct EchoImporter;

#[async_trait]
impl ModuleImporter for EchoImporter {
    type Module = String;
    type Error = String;

    async fn import(&self, specifier: &str) -> Result<String, String> {
        if specifier.contains("missing") {
            Err(format!("TypeError: Failed to fetch dynamically imported module: {}", specifier))
        } else {
            Ok(specifier.to_string())
        }
    }
}

#[tokio::test]
async fn default_manifest_loads_tagged() {
    let config = LoaderConfig::default();
    let host = StaticHost::new()
        .with_module_url("http://ha.local/hacsfiles/dashboard-strategy/loader.js?hacstag=99");
    let resolver = Arc::new(ModuleResolver::from_config(host, &config).unwrap());
    let loader = ManifestLoader::new(
        TaggedImporter::new(resolver, EchoImporter),
        config.manifest.clone(),
    );

    let loaded = loader.load_all().await.unwrap();
    let specifiers: Vec<_> = loaded.into_iter().map(|l| l.module).collect();
    assert_eq!(
        specifiers,
        vec![
            "http://ha.local/hacsfiles/dashboard-strategy/version.js?hacstag=99",
            "http://ha.local/hacsfiles/dashboard-strategy/helpers.js?hacstag=99",
            "http://ha.local/hacsfiles/dashboard-strategy/cards.js?hacstag=99",
            "http://ha.local/hacsfiles/dashboard-strategy/views.js?hacstag=99",
            "http://ha.local/hacsfiles/dashboard-strategy/strategy.js?hacstag=99",
        ]
    );
}

#[tokio::test]
async fn import_failure_reaches_caller() {
    let resolver = Arc::new(ModuleResolver::with_tag(
        StaticHost::new(),
        key_v(),
        Tag::new("2"),
    ));
    let tagged = TaggedImporter::new(resolver.clone(), EchoImporter);
    assert_eq!(
        tagged.import_tagged("missing.js").await,
        Err("TypeError: Failed to fetch dynamically imported module: ./missing.js?v=2".to_string())
    );

    let loader = ManifestLoader::new(
        TaggedImporter::new(resolver, EchoImporter),
        vec!["./ok.js".into(), "./missing.js".into()],
    );
    let err = loader.load_all().await.unwrap_err();
    assert!(matches!(err, LoadError::Import { ref path, .. } if path == "./missing.js"));
}
