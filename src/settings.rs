use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use crate::error::SettingsError;

// Environment keys, named after the upstream services they authenticate against.
pub const STATS_API_KEY: &str = "X-RAPID-API-KEY";
pub const STATS_API_HOST: &str = "X-RAPID-API-HOST";
pub const SEARCH_API_KEY: &str = "TAVILY_API_KEY";
pub const OPENAI_API_KEY: &str = "OPENAI_API_KEY";

pub const MODEL: &str = "WICKETWIRE_MODEL";
pub const LITE_MODEL: &str = "WICKETWIRE_LITE_MODEL";
pub const DATA_DIR: &str = "WICKETWIRE_DATA_DIR";
pub const BIND_ADDR: &str = "WICKETWIRE_BIND_ADDR";
pub const MAX_CONCURRENT_RUNS: &str = "WICKETWIRE_MAX_CONCURRENT_RUNS";
pub const REQUEST_TIMEOUT_SECS: &str = "WICKETWIRE_REQUEST_TIMEOUT_SECS";
pub const DRAFT_TIMEOUT_SECS: &str = "WICKETWIRE_DRAFT_TIMEOUT_SECS";

/// Keys that must be present before any workflow is allowed to start.
pub const REQUIRED_KEYS: [&str; 4] = [STATS_API_KEY, STATS_API_HOST, SEARCH_API_KEY, OPENAI_API_KEY];

// Define a structure to hold application settings with serialization and deserialization capabilities.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    pub stats_api_key: String,  // Key for the statistics provider API.
    pub stats_api_host: String, // Host header expected by the statistics provider.
    pub search_api_key: String, // Key for the web-search collaborator.
    pub openai_api_key: String, // Key for the drafting and narration models.
    pub model: String,          // Model used by the drafting agents.
    pub lite_model: String,     // Cheaper model used for identifier extraction.
    pub data_dir: PathBuf,
    pub bind_addr: SocketAddr,
    pub max_concurrent_runs: usize,
    pub request_timeout: Duration,
    pub draft_timeout: Duration,
}

impl Settings {
    /// Loads settings from the process environment, failing fast with the full
    /// list of missing required keys before any workflow starts.
    pub fn from_env() -> Result<Self, SettingsError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, SettingsError> {
        let mut missing = Vec::new();
        let mut required = |key: &str| match lookup(key) {
            Some(value) if !value.trim().is_empty() => value,
            _ => {
                missing.push(key.to_string());
                String::new()
            }
        };

        let stats_api_key = required(STATS_API_KEY);
        let stats_api_host = required(STATS_API_HOST);
        let search_api_key = required(SEARCH_API_KEY);
        let openai_api_key = required(OPENAI_API_KEY);

        if !missing.is_empty() {
            return Err(SettingsError::MissingKeys(missing));
        }

        let model = lookup(MODEL).unwrap_or_else(|| "gpt-4o".to_string());
        let lite_model = lookup(LITE_MODEL).unwrap_or_else(|| "gpt-4o-mini".to_string());
        let data_dir = PathBuf::from(lookup(DATA_DIR).unwrap_or_else(|| "./data".to_string()));

        let bind_addr = parse(&lookup, BIND_ADDR, "127.0.0.1:8000", |raw| raw.parse().ok())?;
        let max_concurrent_runs = parse(&lookup, MAX_CONCURRENT_RUNS, "4", |raw| {
            raw.parse().ok().filter(|n: &usize| *n > 0)
        })?;
        let request_timeout = parse(&lookup, REQUEST_TIMEOUT_SECS, "30", parse_secs)?;
        let draft_timeout = parse(&lookup, DRAFT_TIMEOUT_SECS, "120", parse_secs)?;

        Ok(Settings {
            stats_api_key,
            stats_api_host,
            search_api_key,
            openai_api_key,
            model,
            lite_model,
            data_dir,
            bind_addr,
            max_concurrent_runs,
            request_timeout,
            draft_timeout,
        })
    }

    pub fn reports_dir(&self) -> PathBuf {
        self.data_dir.join("reports")
    }

    pub fn audio_dir(&self) -> PathBuf {
        self.data_dir.join("audio")
    }

    pub fn log_dir(&self) -> PathBuf {
        self.data_dir.join("logs")
    }
}

fn parse_secs(raw: &str) -> Option<Duration> {
    raw.parse().ok().filter(|n| *n > 0).map(Duration::from_secs)
}

fn parse<T>(
    lookup: impl Fn(&str) -> Option<String>,
    key: &str,
    default: &str,
    convert: impl Fn(&str) -> Option<T>,
) -> Result<T, SettingsError> {
    let raw = lookup(key).unwrap_or_else(|| default.to_string());
    convert(raw.trim()).ok_or_else(|| SettingsError::InvalidValue {
        key: key.to_string(),
        reason: format!("could not parse {raw:?}"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn base_env() -> HashMap<&'static str, &'static str> {
        HashMap::from([
            (STATS_API_KEY, "stats-key"),
            (STATS_API_HOST, "cricket.example.com"),
            (SEARCH_API_KEY, "search-key"),
            (OPENAI_API_KEY, "sk-test"),
        ])
    }

    fn settings_from(env: &HashMap<&str, &str>) -> Result<Settings, SettingsError> {
        Settings::from_lookup(|key| env.get(key).map(|v| v.to_string()))
    }

    #[test]
    fn loads_with_defaults_when_only_required_keys_present() {
        let settings = settings_from(&base_env()).expect("settings should load");
        assert_eq!(settings.model, "gpt-4o");
        assert_eq!(settings.lite_model, "gpt-4o-mini");
        assert_eq!(settings.max_concurrent_runs, 4);
        assert_eq!(settings.request_timeout, Duration::from_secs(30));
        assert_eq!(settings.reports_dir(), PathBuf::from("./data/reports"));
    }

    #[test]
    fn reports_every_missing_required_key_at_once() {
        let err = settings_from(&HashMap::new()).expect_err("must fail fast");
        match err {
            SettingsError::MissingKeys(keys) => {
                for key in REQUIRED_KEYS {
                    assert!(keys.contains(&key.to_string()), "missing {key}");
                }
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn blank_required_value_counts_as_missing() {
        let mut env = base_env();
        env.insert(SEARCH_API_KEY, "   ");
        let err = settings_from(&env).expect_err("blank key must fail");
        match err {
            SettingsError::MissingKeys(keys) => {
                assert_eq!(keys, vec![SEARCH_API_KEY.to_string()]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn rejects_unparseable_optional_values() {
        let mut env = base_env();
        env.insert(MAX_CONCURRENT_RUNS, "zero");
        let err = settings_from(&env).expect_err("bad integer must fail");
        assert!(matches!(err, SettingsError::InvalidValue { ref key, .. } if key == MAX_CONCURRENT_RUNS));

        let mut env = base_env();
        env.insert(REQUEST_TIMEOUT_SECS, "0");
        let err = settings_from(&env).expect_err("zero timeout must fail");
        assert!(matches!(err, SettingsError::InvalidValue { ref key, .. } if key == REQUEST_TIMEOUT_SECS));
    }
}
