//! Cache-busting tag discovery.
//!
//! The tag is looked up by an ordered chain of probes. Each probe reads the
//! host, returns `Some` when it finds a non-empty value for the tag key, and
//! treats unparseable input as "not here". The first hit wins; a miss on all
//! probes simply disables cache-busting.

use std::fmt;
use std::sync::OnceLock;

use url::Url;

use crate::config::TagSettings;
use crate::host::HostEnvironment;

/// Opaque cache-busting token assigned by the front-end package manager
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Tag(String);

impl Tag {
    /// Empty values carry no version information and are rejected
    pub fn new(value: impl Into<String>) -> Option<Self> {
        let value = value.into();
        if value.is_empty() {
            None
        } else {
            Some(Self(value))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A single discovery strategy
pub type Probe = fn(&dyn HostEnvironment, &TagSettings) -> Option<Tag>;

/// Discovery strategies in priority order
pub const PROBES: &[(&str, Probe)] = &[
    ("module_url", probe_module_url),
    ("module_scripts", probe_module_scripts),
    ("page_url", probe_page_url),
];

/// Run `attempt` over `candidates` in order and keep the first `Some`
pub fn first_success<I, T, F>(candidates: I, attempt: F) -> Option<T>
where
    I: IntoIterator,
    F: FnMut(I::Item) -> Option<T>,
{
    candidates.into_iter().find_map(attempt)
}

/// Run every probe against `host` and return the first tag found
pub fn discover(host: &dyn HostEnvironment, settings: &TagSettings) -> Option<Tag> {
    let found = first_success(PROBES, |(name, probe)| {
        let tag = probe(host, settings);
        match &tag {
            Some(tag) => tracing::debug!("Tag probe {} found {}={}", name, settings.key, tag),
            None => tracing::debug!("Tag probe {} found nothing", name),
        }
        tag
    });

    match &found {
        Some(tag) => tracing::info!("Cache-busting enabled: {}={}", settings.key, tag),
        None => tracing::info!(
            "No {} tag found; modules will load without cache-busting",
            settings.key
        ),
    }
    found
}

/// Extract `key` from the query string of an absolute URL
pub fn tag_from_url(url: &str, key: &str) -> Option<Tag> {
    match Url::parse(url) {
        Ok(parsed) => tag_from_parsed(&parsed, key),
        Err(e) => {
            tracing::debug!("Skipping unparseable URL {:?}: {}", url, e);
            None
        }
    }
}

fn tag_from_parsed(url: &Url, key: &str) -> Option<Tag> {
    url.query_pairs()
        .find(|(k, _)| k == key)
        .and_then(|(_, v)| Tag::new(v.into_owned()))
}

fn probe_module_url(host: &dyn HostEnvironment, settings: &TagSettings) -> Option<Tag> {
    host.module_url()
        .and_then(|url| tag_from_url(&url, &settings.key))
}

fn probe_module_scripts(host: &dyn HostEnvironment, settings: &TagSettings) -> Option<Tag> {
    let scripts = host.module_scripts();
    let selected = scripts
        .iter()
        .find(|src| settings.entry.is_match(source_path(src)))
        .or_else(|| {
            scripts
                .iter()
                .find(|src| settings.loader.is_match(source_path(src)))
        })?;

    tracing::debug!("Selected module script {}", selected);

    // `src` reflects an absolute URL in browsers; recorded snapshots may hold
    // the raw attribute, which is relative to the page.
    match Url::parse(selected) {
        Ok(url) => tag_from_parsed(&url, &settings.key),
        Err(url::ParseError::RelativeUrlWithoutBase) => {
            let page = host.page_url()?;
            let joined = Url::parse(&page).and_then(|base| base.join(selected));
            match joined {
                Ok(url) => tag_from_parsed(&url, &settings.key),
                Err(e) => {
                    tracing::debug!("Cannot resolve script {:?} against page: {}", selected, e);
                    None
                }
            }
        }
        Err(e) => {
            tracing::debug!("Skipping unparseable script src {:?}: {}", selected, e);
            None
        }
    }
}

fn probe_page_url(host: &dyn HostEnvironment, settings: &TagSettings) -> Option<Tag> {
    host.page_url()
        .and_then(|url| tag_from_url(&url, &settings.key))
}

/// Path portion of a script source, without query or fragment
fn source_path(src: &str) -> &str {
    src.split(['?', '#']).next().unwrap_or(src)
}

/// Write-once holder for the discovery result.
///
/// A miss is cached as well, so the host is scanned at most once.
#[derive(Debug, Default)]
pub struct TagCache {
    cell: OnceLock<Option<Tag>>,
}

impl TagCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cache pre-seeded with a known result; discovery never runs
    pub fn preset(tag: Option<Tag>) -> Self {
        let cell = OnceLock::new();
        let _ = cell.set(tag);
        Self { cell }
    }

    pub fn get_or_discover(
        &self,
        host: &dyn HostEnvironment,
        settings: &TagSettings,
    ) -> Option<&Tag> {
        self.cell.get_or_init(|| discover(host, settings)).as_ref()
    }

    /// `None` until discovery has run
    pub fn peek(&self) -> Option<Option<&Tag>> {
        self.cell.get().map(Option::as_ref)
    }
}
