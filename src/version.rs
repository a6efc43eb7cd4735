//! Build-time version information.

/// Version string injected by `build.rs`.
pub const VERSION: &str = env!("STRATEGY_LOADER_VERSION");

/// Short git SHA injected by `build.rs`.
pub const GIT_SHA: &str = env!("STRATEGY_LOADER_GIT_SHA");

/// Human-readable version, e.g. `1.4.0 (a1b2c3d)`.
pub fn version_string() -> String {
    format!("{} ({})", VERSION, GIT_SHA)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_string_includes_sha() {
        let v = version_string();
        assert!(v.starts_with(VERSION));
        assert!(v.ends_with(&format!("({})", GIT_SHA)));
    }
}
