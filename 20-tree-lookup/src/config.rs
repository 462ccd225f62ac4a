//! Node configuration.
//!
//! A node's seed data is chosen by name from a [`PresetCatalog`]. The catalog
//! is an explicit value handed to [`NodeConfig::from_preset`], so an unknown
//! name is reported once at startup instead of aborting mid-flight.

use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

use thiserror::Error;

/// How long a node waits for its parent before giving up on a lookup.
pub const DEFAULT_PARENT_TIMEOUT: Duration = Duration::from_secs(5);

/// Maximum number of escalations a single lookup may travel.
pub const DEFAULT_MAX_HOPS: u32 = 32;

/// Seed data for one node: key → value.
pub type SeedData = BTreeMap<String, String>;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("unknown preset '{name}' (known presets: {})", .known.join(", "))]
    UnknownPreset { name: String, known: Vec<String> },

    #[error("node {addr} cannot be its own parent")]
    SelfParent { addr: String },

    #[error("parent timeout must be greater than zero")]
    ZeroTimeout,

    #[error("failed to read preset file: {0}")]
    ReadPresets(#[from] std::io::Error),

    #[error("failed to parse preset file: {0}")]
    ParsePresets(#[from] serde_json::Error),
}

/// Named seed presets a node can be started with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PresetCatalog {
    presets: BTreeMap<String, SeedData>,
}

impl PresetCatalog {
    pub fn new(presets: BTreeMap<String, SeedData>) -> Self {
        Self { presets }
    }

    /// The three presets of the demo chain: `one` holds `a`, `b`, `c`,
    /// `two` holds `a`, `b` and `three` holds only `a`.
    pub fn builtin() -> Self {
        let presets = [
            ("one", vec!["a", "b", "c"]),
            ("two", vec!["a", "b"]),
            ("three", vec!["a"]),
        ]
        .into_iter()
        .map(|(name, keys)| {
            let seed = keys
                .iter()
                .map(|key| (key.to_string(), format!("{key} value")))
                .collect();
            (name.to_string(), seed)
        })
        .collect();
        Self { presets }
    }

    /// Parses a catalog from a JSON object of objects,
    /// e.g. `{"root": {"a": "a value"}}`.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let presets: BTreeMap<String, SeedData> = serde_json::from_str(json)?;
        Ok(Self { presets })
    }

    pub fn from_json_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_json_str(&contents)
    }

    pub fn seed_for(&self, name: &str) -> Result<&SeedData, ConfigError> {
        self.presets
            .get(name)
            .ok_or_else(|| ConfigError::UnknownPreset {
                name: name.to_string(),
                known: self.names().map(str::to_string).collect(),
            })
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.presets.keys().map(String::as_str)
    }
}

/// Everything a [`Node`](crate::node::Node) needs at construction.
#[derive(Debug, Clone)]
pub struct NodeConfig {
    /// Preset name; also the name of the node's store bucket.
    pub name: String,
    /// Address this node is reachable at, e.g. `127.0.0.1:8001`.
    pub self_addr: String,
    /// Parent address, `None` for a root.
    pub parent_addr: Option<String>,
    pub parent_timeout: Duration,
    pub max_hops: u32,
    pub seed: SeedData,
}

impl NodeConfig {
    /// Builds a configuration from a preset, validating the name and the
    /// parent link.
    pub fn from_preset(
        name: &str,
        self_addr: impl Into<String>,
        parent_addr: Option<String>,
        catalog: &PresetCatalog,
    ) -> Result<Self, ConfigError> {
        let seed = catalog.seed_for(name)?.clone();
        let self_addr = self_addr.into();

        if parent_addr.as_deref() == Some(self_addr.as_str()) {
            return Err(ConfigError::SelfParent { addr: self_addr });
        }

        Ok(Self {
            name: name.to_string(),
            self_addr,
            parent_addr,
            parent_timeout: DEFAULT_PARENT_TIMEOUT,
            max_hops: DEFAULT_MAX_HOPS,
            seed,
        })
    }

    pub fn with_parent_timeout(mut self, timeout: Duration) -> Result<Self, ConfigError> {
        if timeout.is_zero() {
            return Err(ConfigError::ZeroTimeout);
        }
        self.parent_timeout = timeout;
        Ok(self)
    }

    pub fn with_max_hops(mut self, max_hops: u32) -> Self {
        self.max_hops = max_hops;
        self
    }

    pub fn is_root(&self) -> bool {
        self.parent_addr.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_presets_match_demo_chain() {
        let catalog = PresetCatalog::builtin();
        assert_eq!(catalog.names().collect::<Vec<_>>(), vec!["one", "three", "two"]);

        let one = catalog.seed_for("one").unwrap();
        assert_eq!(one.len(), 3);
        assert_eq!(one.get("c").map(String::as_str), Some("c value"));

        let three = catalog.seed_for("three").unwrap();
        assert_eq!(three.keys().collect::<Vec<_>>(), vec!["a"]);
    }

    #[test]
    fn unknown_preset_lists_known_names() {
        let err = PresetCatalog::builtin().seed_for("four").unwrap_err();
        assert!(matches!(&err, ConfigError::UnknownPreset { name, .. } if name == "four"));
        assert_eq!(
            err.to_string(),
            "unknown preset 'four' (known presets: one, three, two)"
        );
    }

    #[test]
    fn catalog_loads_from_json() {
        let catalog =
            PresetCatalog::from_json_str(r#"{"edge": {"k": "v", "blank": ""}}"#).unwrap();
        let edge = catalog.seed_for("edge").unwrap();
        assert_eq!(edge.get("k").map(String::as_str), Some("v"));
        assert_eq!(edge.get("blank").map(String::as_str), Some(""));
    }

    #[test]
    fn catalog_rejects_non_string_values() {
        let result = PresetCatalog::from_json_str(r#"{"edge": {"k": 1}}"#);
        assert!(matches!(result, Err(ConfigError::ParsePresets(_))));
    }

    #[test]
    fn from_preset_applies_defaults() {
        let config =
            NodeConfig::from_preset("two", "127.0.0.1:8001", None, &PresetCatalog::builtin())
                .unwrap();
        assert!(config.is_root());
        assert_eq!(config.parent_timeout, DEFAULT_PARENT_TIMEOUT);
        assert_eq!(config.max_hops, DEFAULT_MAX_HOPS);
        assert_eq!(config.seed.len(), 2);
    }

    #[test]
    fn node_cannot_be_its_own_parent() {
        let result = NodeConfig::from_preset(
            "one",
            "127.0.0.1:8000",
            Some("127.0.0.1:8000".to_string()),
            &PresetCatalog::builtin(),
        );
        assert!(matches!(result, Err(ConfigError::SelfParent { .. })));
    }

    #[test]
    fn zero_parent_timeout_is_rejected() {
        let config =
            NodeConfig::from_preset("one", "127.0.0.1:8000", None, &PresetCatalog::builtin())
                .unwrap();
        assert!(matches!(
            config.with_parent_timeout(Duration::ZERO),
            Err(ConfigError::ZeroTimeout)
        ));
    }
}
