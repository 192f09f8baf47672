//! Utility functions

use serde::{Deserialize, Serialize};
use url::Url;

/// Version information for deploy-pilot
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VersionInfo {
    pub version: String,
    pub git_hash: String,
    pub build_time: String,
}

/// Get version information
pub fn version_info() -> VersionInfo {
    VersionInfo {
        version: env!("CARGO_PKG_VERSION").to_string(),
        git_hash: option_env!("GIT_HASH").unwrap_or("unknown").to_string(),
        build_time: option_env!("BUILD_TIME").unwrap_or("unknown").to_string(),
    }
}

/// Resolve `path` under `base` as if `base` named a directory. The
/// query and fragment of `base` are dropped.
pub fn join_url(base: &str, path: &str) -> Option<Url> {
    let mut base = Url::parse(base).ok()?;
    if !base.path().ends_with('/') {
        let dir = format!("{}/", base.path());
        base.set_path(&dir);
    }
    base.join(path.trim_start_matches('/')).ok()
}
