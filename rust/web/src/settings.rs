use holdem_engine::table::TableConfig;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::server::ServerConfig;

/// Upper bound on seats per room.
pub const MAX_SEATS: usize = 10;

/// Server settings, resolved from defaults, then an optional TOML file, then
/// `HOLDEM_*` environment variables.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AppSettings {
    pub host: String,
    pub port: u16,
    /// Emit logs as JSON lines instead of human-readable text
    pub log_json: bool,
    /// Fixed deck seed for reproducible sessions
    pub deck_seed: Option<u64>,
    pub table: TableConfig,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            log_json: false,
            deck_seed: None,
            table: TableConfig::default(),
        }
    }
}

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse settings file: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid settings: {0}")]
    InvalidValue(String),
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct FileSettings {
    host: Option<String>,
    port: Option<u16>,
    log_json: Option<bool>,
    deck_seed: Option<u64>,
    #[serde(default)]
    table: FileTable,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct FileTable {
    starting_balance: Option<u32>,
    small_blind: Option<u32>,
    big_blind: Option<u32>,
    max_players: Option<usize>,
    min_players: Option<usize>,
}

impl AppSettings {
    /// Resolve settings from the process environment. An explicit path wins
    /// over `HOLDEM_CONFIG`.
    pub fn load(config_path: Option<&Path>) -> Result<Self, SettingsError> {
        Self::resolve(config_path, |key| std::env::var(key).ok())
    }

    /// Same as [`AppSettings::load`] with an injectable environment lookup.
    pub fn resolve(
        config_path: Option<&Path>,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, SettingsError> {
        let lookup = |key: &str| env(key).filter(|v| !v.trim().is_empty());
        let mut settings = Self::default();

        let path = config_path
            .map(Path::to_path_buf)
            .or_else(|| lookup("HOLDEM_CONFIG").map(PathBuf::from));
        if let Some(path) = path {
            let raw = fs::read_to_string(&path).map_err(|source| SettingsError::Io {
                path: path.clone(),
                source,
            })?;
            settings.apply_file(toml::from_str(&raw)?);
        }

        if let Some(host) = lookup("HOLDEM_HOST") {
            settings.host = host;
        }
        if let Some(port) = lookup("HOLDEM_PORT") {
            settings.port = parse_env("HOLDEM_PORT", &port)?;
        }
        if let Some(json) = lookup("HOLDEM_LOG_JSON") {
            settings.log_json = parse_bool(&json).ok_or_else(|| {
                SettingsError::InvalidValue(format!("HOLDEM_LOG_JSON: `{json}` is not a boolean"))
            })?;
        }
        if let Some(seed) = lookup("HOLDEM_DECK_SEED") {
            settings.deck_seed = Some(parse_env("HOLDEM_DECK_SEED", &seed)?);
        }
        if let Some(v) = lookup("HOLDEM_STARTING_BALANCE") {
            settings.table.starting_balance = parse_env("HOLDEM_STARTING_BALANCE", &v)?;
        }
        if let Some(v) = lookup("HOLDEM_SMALL_BLIND") {
            settings.table.small_blind = parse_env("HOLDEM_SMALL_BLIND", &v)?;
        }
        if let Some(v) = lookup("HOLDEM_BIG_BLIND") {
            settings.table.big_blind = parse_env("HOLDEM_BIG_BLIND", &v)?;
        }
        if let Some(v) = lookup("HOLDEM_MAX_PLAYERS") {
            settings.table.max_players = parse_env("HOLDEM_MAX_PLAYERS", &v)?;
        }
        if let Some(v) = lookup("HOLDEM_MIN_PLAYERS") {
            settings.table.min_players = parse_env("HOLDEM_MIN_PLAYERS", &v)?;
        }

        settings.validate()?;
        Ok(settings)
    }

    fn apply_file(&mut self, file: FileSettings) {
        if let Some(v) = file.host {
            self.host = v;
        }
        if let Some(v) = file.port {
            self.port = v;
        }
        if let Some(v) = file.log_json {
            self.log_json = v;
        }
        if file.deck_seed.is_some() {
            self.deck_seed = file.deck_seed;
        }
        let table = file.table;
        if let Some(v) = table.starting_balance {
            self.table.starting_balance = v;
        }
        if let Some(v) = table.small_blind {
            self.table.small_blind = v;
        }
        if let Some(v) = table.big_blind {
            self.table.big_blind = v;
        }
        if let Some(v) = table.max_players {
            self.table.max_players = v;
        }
        if let Some(v) = table.min_players {
            self.table.min_players = v;
        }
    }

    pub fn validate(&self) -> Result<(), SettingsError> {
        let invalid = |msg: &str| Err(SettingsError::InvalidValue(msg.to_string()));
        let table = &self.table;

        if self.host.trim().is_empty() {
            return invalid("host cannot be empty");
        }
        if table.small_blind == 0 {
            return invalid("small_blind must be greater than 0");
        }
        if table.big_blind < table.small_blind {
            return invalid("big_blind must be at least small_blind");
        }
        if table.starting_balance < table.big_blind {
            return invalid("starting_balance must cover the big blind");
        }
        if table.min_players < 2 {
            return invalid("min_players must be at least 2");
        }
        if table.max_players < table.min_players || table.max_players > MAX_SEATS {
            return Err(SettingsError::InvalidValue(format!(
                "max_players must be between min_players and {MAX_SEATS}"
            )));
        }
        if table.chip_capacity().is_none() {
            return invalid("starting_balance times max_players must fit in 32 bits");
        }
        Ok(())
    }

    pub fn server_config(&self) -> ServerConfig {
        ServerConfig::new(self.host.clone(), self.port)
    }
}

fn parse_env<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, SettingsError> {
    value
        .trim()
        .parse()
        .map_err(|_| SettingsError::InvalidValue(format!("{key}: cannot parse `{value}`")))
}

fn parse_bool(s: &str) -> Option<bool> {
    match s.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "on" | "yes" => Some(true),
        "0" | "false" | "off" | "no" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_are_valid() {
        let settings = AppSettings::resolve(None, env(&[])).expect("defaults");
        assert_eq!(settings, AppSettings::default());
        assert_eq!(settings.table.big_blind, 2);
    }

    #[test]
    fn env_overrides_defaults() {
        let settings = AppSettings::resolve(
            None,
            env(&[
                ("HOLDEM_PORT", "9000"),
                ("HOLDEM_BIG_BLIND", "10"),
                ("HOLDEM_SMALL_BLIND", "5"),
                ("HOLDEM_LOG_JSON", "yes"),
                ("HOLDEM_HOST", ""),
            ]),
        )
        .expect("env");
        assert_eq!(settings.port, 9000);
        assert_eq!(settings.table.small_blind, 5);
        assert_eq!(settings.table.big_blind, 10);
        assert!(settings.log_json);
        // blank values are ignored
        assert_eq!(settings.host, "127.0.0.1");
    }

    #[test]
    fn unparsable_env_is_rejected() {
        let err = AppSettings::resolve(None, env(&[("HOLDEM_PORT", "eighty")]))
            .expect_err("bad port");
        assert!(matches!(err, SettingsError::InvalidValue(msg) if msg.contains("HOLDEM_PORT")));
    }

    #[test]
    fn validation_catches_inconsistent_tables() {
        let mut settings = AppSettings::default();
        settings.table.big_blind = 0;
        assert!(settings.validate().is_err());

        let mut settings = AppSettings::default();
        settings.table.max_players = MAX_SEATS + 1;
        assert!(settings.validate().is_err());

        let mut settings = AppSettings::default();
        settings.table.min_players = 1;
        assert!(settings.validate().is_err());
    }

    #[test]
    fn oversized_stacks_are_rejected() {
        let mut settings = AppSettings::default();
        settings.table.starting_balance = 2_000_000_000;
        settings.table.max_players = 3;
        assert!(matches!(
            settings.validate(),
            Err(SettingsError::InvalidValue(msg)) if msg.contains("starting_balance")
        ));
        settings.table.max_players = 2;
        settings.table.min_players = 2;
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn parse_bool_accepts_common_spellings() {
        assert_eq!(parse_bool("ON"), Some(true));
        assert_eq!(parse_bool("0"), Some(false));
        assert_eq!(parse_bool("maybe"), None);
    }
}
