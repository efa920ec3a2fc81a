use mime::Mime;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;

use crate::observability::Verbosity;
use crate::relay::RelayKeys;

/// Top-level configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub app: AppConfig,
    #[serde(default)]
    pub relay: RelayConfig,
    #[serde(default)]
    pub extract: ExtractConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Host application identity
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct AppConfig {
    /// Bundle identifier; the app group is `group.<bundle_id>`
    #[serde(default)]
    pub bundle_id: String,
}

/// Shared-storage relay configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RelayConfig {
    /// Directory holding one subdirectory per provisioned app group
    #[serde(default = "default_groups_root")]
    pub groups_root: PathBuf,
    #[serde(default = "default_url_key")]
    pub url_key: String,
    #[serde(default = "default_content_key")]
    pub content_key: String,
    #[serde(default = "default_content_type_key")]
    pub content_type_key: String,
    /// How often a running receiver re-checks the relay for other producers
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            groups_root: default_groups_root(),
            url_key: default_url_key(),
            content_key: default_content_key(),
            content_type_key: default_content_type_key(),
            poll_interval_ms: default_poll_interval_ms(),
        }
    }
}

impl RelayConfig {
    pub fn keys(&self) -> RelayKeys {
        RelayKeys {
            url: self.url_key.clone(),
            content: self.content_key.clone(),
            content_type: self.content_type_key.clone(),
        }
    }
}

fn default_groups_root() -> PathBuf {
    PathBuf::from("data/groups")
}

fn default_url_key() -> String {
    "OpenWithURL".to_string()
}

fn default_content_key() -> String {
    "SharedContent".to_string()
}

fn default_content_type_key() -> String {
    "SharedContentType".to_string()
}

fn default_poll_interval_ms() -> u64 {
    1000
}

/// Classification and extraction settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ExtractConfig {
    /// Upper bound on a single resource read
    #[serde(default = "default_read_timeout_ms")]
    pub read_timeout_ms: u64,
    /// Extra extension -> MIME mappings, e.g. `md = "text/markdown"`
    #[serde(default)]
    pub extra_types: BTreeMap<String, String>,
}

impl Default for ExtractConfig {
    fn default() -> Self {
        Self {
            read_timeout_ms: default_read_timeout_ms(),
            extra_types: BTreeMap::new(),
        }
    }
}

impl ExtractConfig {
    /// Parsed `extra_types`; entries that are not valid MIME types are skipped
    pub fn type_overrides(&self) -> HashMap<String, Mime> {
        self.extra_types
            .iter()
            .filter_map(|(ext, essence)| essence.parse().ok().map(|mime| (ext.clone(), mime)))
            .collect()
    }
}

fn default_read_timeout_ms() -> u64 {
    2000
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct LoggingConfig {
    #[serde(default)]
    pub verbosity: Verbosity,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert!(config.app.bundle_id.is_empty());
        assert_eq!(config.relay.groups_root, PathBuf::from("data/groups"));
        assert_eq!(config.relay.keys(), RelayKeys::default());
        assert_eq!(config.extract.read_timeout_ms, 2000);
        assert_eq!(config.relay.poll_interval_ms, 1000);
        assert_eq!(config.logging.verbosity, Verbosity::Info);
    }

    #[test]
    fn test_type_overrides() {
        let mut extract = ExtractConfig::default();
        extract
            .extra_types
            .insert("md".to_string(), "text/markdown".to_string());
        extract
            .extra_types
            .insert("bad".to_string(), "not a mime".to_string());

        let overrides = extract.type_overrides();
        assert_eq!(overrides.len(), 1);
        assert_eq!(overrides["md"].essence_str(), "text/markdown");
    }
}
