//! Cache-tagged path resolution.
//!
//! [`ModuleResolver`] turns a module reference into the specifier handed to
//! the host's dynamic import, carrying the discovered tag as a query
//! parameter exactly once. Tag discovery happens on first use and is
//! remembered for the life of the resolver.

use url::Url;

use crate::config::{ConfigError, LoaderConfig, TagSettings};
use crate::host::HostEnvironment;
use crate::tag::{Tag, TagCache};

pub struct ModuleResolver<H> {
    host: H,
    settings: TagSettings,
    /// Default base when a call supplies no override
    base_url: Option<String>,
    tag: TagCache,
}

impl<H: HostEnvironment> ModuleResolver<H> {
    pub fn new(host: H, settings: TagSettings) -> Self {
        Self {
            host,
            settings,
            base_url: None,
            tag: TagCache::new(),
        }
    }

    pub fn from_config(host: H, config: &LoaderConfig) -> Result<Self, ConfigError> {
        let mut resolver = Self::new(host, config.compile()?);
        resolver.base_url = config.base_url.clone().filter(|b| !b.is_empty());
        Ok(resolver)
    }

    /// Resolver whose tag is already known; the host is never probed for one
    pub fn with_tag(host: H, settings: TagSettings, tag: Option<Tag>) -> Self {
        Self {
            tag: TagCache::preset(tag),
            ..Self::new(host, settings)
        }
    }

    pub fn tag_key(&self) -> &str {
        &self.settings.key
    }

    /// Discovered tag, probing the host on the first call only
    pub fn tag(&self) -> Option<&Tag> {
        self.tag.get_or_discover(&self.host, &self.settings)
    }

    /// Resolve `path` into a specifier carrying the tag.
    ///
    /// Returns `path` untouched when no tag exists or when `path` already
    /// mentions the tag key. Relative paths are rebased onto `base_override`,
    /// the configured base, or the module's own URL, in that order; if none
    /// of those yields an absolute URL the tag is appended textually.
    pub fn resolve(&self, path: &str, base_override: Option<&str>) -> String {
        let Some(tag) = self.tag() else {
            return path.to_string();
        };
        let key = self.settings.key.as_str();
        if path.contains(key) {
            tracing::trace!("{} already tagged", path);
            return path.to_string();
        }

        let base = base_override
            .map(str::to_string)
            .or_else(|| self.base_url.clone())
            .or_else(|| self.host.module_url());

        match absolute_url(path, base.as_deref()) {
            Ok(mut url) => {
                append_param(&mut url, key, tag);
                tracing::trace!("Resolved {} -> {}", path, url);
                url.into()
            }
            Err(e) => {
                let resolved = concat_param(path, key, tag);
                tracing::debug!(
                    "Cannot resolve {} against {:?} ({}); using {}",
                    path,
                    base,
                    e,
                    resolved
                );
                resolved
            }
        }
    }
}

/// Parse `path` as-is when it has a scheme, otherwise join it onto `base`
fn absolute_url(path: &str, base: Option<&str>) -> Result<Url, url::ParseError> {
    match Url::parse(path) {
        Ok(url) => Ok(url),
        Err(url::ParseError::RelativeUrlWithoutBase) => {
            let base = base.ok_or(url::ParseError::RelativeUrlWithoutBase)?;
            Url::parse(base)?.join(path)
        }
        Err(e) => Err(e),
    }
}

fn encoded_pair(key: &str, tag: &Tag) -> String {
    format!(
        "{}={}",
        urlencoding::encode(key),
        urlencoding::encode(tag.as_str())
    )
}

/// Append the pair after any existing query, leaving existing pairs verbatim
fn append_param(url: &mut Url, key: &str, tag: &Tag) {
    let pair = encoded_pair(key, tag);
    let query = match url.query() {
        Some(q) if !q.is_empty() => format!("{}&{}", q, pair),
        _ => pair,
    };
    url.set_query(Some(&query));
}

fn concat_param(path: &str, key: &str, tag: &Tag) -> String {
    let (head, fragment) = match path.find('#') {
        Some(i) => path.split_at(i),
        None => (path, ""),
    };
    let head = if is_bare_specifier(head) {
        format!("./{}", head)
    } else {
        head.to_string()
    };
    let separator = if head.contains('?') { '&' } else { '?' };
    format!("{}{}{}{}", head, separator, encoded_pair(key, tag), fragment)
}

/// A relative reference with no `./`, `../` or `/` prefix and no scheme
fn is_bare_specifier(path: &str) -> bool {
    !(path.starts_with("./")
        || path.starts_with("../")
        || path.starts_with('/')
        || path == "."
        || path == ".."
        || has_scheme(path))
}

fn has_scheme(path: &str) -> bool {
    match path.split_once(':') {
        Some((scheme, _)) => {
            let mut chars = scheme.chars();
            chars.next().is_some_and(|c| c.is_ascii_alphabetic())
                && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
        }
        None => false,
    }
}
