use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::aggregate::Unmatched;

const DEFAULT_CONFIG: &str = include_str!("../config.toml");

#[derive(Deserialize, Default)]
struct ConfigFile {
    #[serde(default)]
    protocol: ProtocolConfig,
    #[serde(default)]
    aggregation: AggregationConfig,
}

#[derive(Deserialize, Default, Clone, Debug)]
struct ProtocolConfig {
    uuid_namespace: Option<String>,
    class_name_command: Option<String>,
    idle_command: Option<String>,
    max_idle_batches: Option<usize>,
}

#[derive(Deserialize, Default, Clone, Debug)]
struct AggregationConfig {
    unmatched: Option<Unmatched>,
}

#[derive(Clone, Debug)]
pub struct Config {
    protocol: ProtocolConfig,
    aggregation: AggregationConfig,
}

impl Default for Config {
    fn default() -> Self {
        let base: ConfigFile = toml::from_str(DEFAULT_CONFIG).unwrap_or_default();
        Config {
            protocol: base.protocol,
            aggregation: base.aggregation,
        }
    }
}

impl Config {
    /// Embedded defaults merged with the user's config file, if present.
    pub fn load() -> Self {
        match user_config_path() {
            Some(path) => Self::load_from(&path),
            None => Self::default(),
        }
    }

    /// Embedded defaults merged with the file at `path`. A missing or
    /// malformed file leaves the defaults in place.
    pub fn load_from(path: &Path) -> Self {
        let mut config = Self::default();
        if !path.exists() {
            return config;
        }
        match std::fs::read_to_string(path) {
            Ok(contents) => match toml::from_str::<ConfigFile>(&contents) {
                Ok(user) => config.merge(user),
                Err(e) => {
                    log::warn!(target: "config", "ignoring malformed config {}: {}", path.display(), e)
                }
            },
            Err(e) => {
                log::warn!(target: "config", "could not read config {}: {}", path.display(), e)
            }
        }
        config
    }

    /// Embedded defaults merged with a TOML document.
    pub fn from_toml_str(contents: &str) -> Result<Self, toml::de::Error> {
        let user: ConfigFile = toml::from_str(contents)?;
        let mut config = Self::default();
        config.merge(user);
        Ok(config)
    }

    fn merge(&mut self, user: ConfigFile) {
        let p = user.protocol;
        if p.uuid_namespace.is_some() {
            self.protocol.uuid_namespace = p.uuid_namespace;
        }
        if p.class_name_command.is_some() {
            self.protocol.class_name_command = p.class_name_command;
        }
        if p.idle_command.is_some() {
            self.protocol.idle_command = p.idle_command;
        }
        if p.max_idle_batches.is_some() {
            self.protocol.max_idle_batches = p.max_idle_batches;
        }
        if user.aggregation.unmatched.is_some() {
            self.aggregation.unmatched = user.aggregation.unmatched;
        }
    }

    /// Path segment prefixing identity-addressed commands.
    pub fn uuid_namespace(&self) -> &str {
        self.protocol.uuid_namespace.as_deref().unwrap_or("/doc/uuid")
    }

    pub fn class_name_command(&self) -> &str {
        self.protocol
            .class_name_command
            .as_deref()
            .unwrap_or("/get_class_name")
    }

    pub fn idle_command(&self) -> &str {
        self.protocol.idle_command.as_deref().unwrap_or("/on_idle")
    }

    /// Drain commands per idle call (clamped to 1..=1024).
    pub fn max_idle_batches(&self) -> usize {
        self.protocol.max_idle_batches.unwrap_or(16).clamp(1, 1024)
    }

    pub fn unmatched(&self) -> Unmatched {
        self.aggregation.unmatched.unwrap_or_default()
    }

    pub fn set_unmatched(&mut self, policy: Unmatched) {
        self.aggregation.unmatched = Some(policy);
    }
}

fn user_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("boxwire").join("config.toml"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_embedded_defaults() {
        let c = Config::default();
        assert_eq!(c.uuid_namespace(), "/doc/uuid");
        assert_eq!(c.class_name_command(), "/get_class_name");
        assert_eq!(c.idle_command(), "/on_idle");
        assert_eq!(c.max_idle_batches(), 16);
        assert_eq!(c.unmatched(), Unmatched::Absorb);
    }

    #[test]
    fn test_partial_override_keeps_other_defaults() {
        let c = Config::from_toml_str(
            "[protocol]\nuuid_namespace = \"/obj\"\n[aggregation]\nunmatched = \"drop\"\n",
        )
        .unwrap();
        assert_eq!(c.uuid_namespace(), "/obj");
        assert_eq!(c.idle_command(), "/on_idle");
        assert_eq!(c.unmatched(), Unmatched::Drop);
    }

    #[test]
    fn test_idle_batches_are_clamped() {
        let c = Config::from_toml_str("[protocol]\nmax_idle_batches = 0\n").unwrap();
        assert_eq!(c.max_idle_batches(), 1);
        let c = Config::from_toml_str("[protocol]\nmax_idle_batches = 100000\n").unwrap();
        assert_eq!(c.max_idle_batches(), 1024);
    }

    #[test]
    fn test_rejects_unknown_policy() {
        assert!(Config::from_toml_str("[aggregation]\nunmatched = \"explode\"\n").is_err());
    }

    #[test]
    fn test_load_from_file_merges_and_ignores_garbage() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");

        std::fs::write(&path, "[protocol]\nidle_command = \"/drain\"\n").unwrap();
        assert_eq!(Config::load_from(&path).idle_command(), "/drain");

        std::fs::write(&path, "this is not toml [[[").unwrap();
        assert_eq!(Config::load_from(&path).idle_command(), "/on_idle");

        let missing = dir.path().join("missing.toml");
        assert_eq!(Config::load_from(&missing).uuid_namespace(), "/doc/uuid");
    }
}
