use serde::Deserialize;

const ENV_PREFIX: &str = "CDM";

/// Runtime settings, read from `CDM_*` environment variables.
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,

    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    #[serde(default = "default_base_backoff_ms")]
    pub base_backoff_ms: u64,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

fn default_concurrency() -> usize {
    10
}
fn default_max_retries() -> u32 {
    3
}
fn default_base_backoff_ms() -> u64 {
    2000
}
fn default_timeout_secs() -> u64 {
    30
}
fn default_user_agent() -> String {
    format!("cdm_scraper/{}", env!("CARGO_PKG_VERSION"))
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            concurrency: default_concurrency(),
            max_retries: default_max_retries(),
            base_backoff_ms: default_base_backoff_ms(),
            timeout_secs: default_timeout_secs(),
            user_agent: default_user_agent(),
        }
    }
}

impl Settings {
    /// Load settings from `CDM_*` environment variables. Unset values take
    /// their defaults; a value that fails to parse is an error rather than a
    /// silent reset.
    pub fn load() -> Result<Self, config::ConfigError> {
        Self::from_environment(config::Environment::with_prefix(ENV_PREFIX))
    }

    fn from_environment(env: config::Environment) -> Result<Self, config::ConfigError> {
        config::Config::builder()
            .add_source(env.try_parsing(true))
            .build()?
            .try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    #[test]
    fn defaults() {
        let s = Settings::default();
        assert_eq!(s.concurrency, 10);
        assert_eq!(s.max_retries, 3);
        assert_eq!(s.base_backoff_ms, 2000);
        assert!(s.user_agent.starts_with("cdm_scraper/"));
    }

    fn env(vars: &[(&str, &str)]) -> config::Environment {
        let map: HashMap<String, String> =
            vars.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        config::Environment::with_prefix(ENV_PREFIX).source(Some(map))
    }

    #[test]
    fn environment_overrides_single_values() {
        let s = Settings::from_environment(env(&[("CDM_CONCURRENCY", "4")])).unwrap();
        assert_eq!(s.concurrency, 4);
        assert_eq!(s.max_retries, 3);
    }

    #[test]
    fn bad_value_is_an_error_not_a_reset() {
        let result = Settings::from_environment(env(&[
            ("CDM_CONCURRENCY", "4"),
            ("CDM_MAX_RETRIES", "lots"),
        ]));
        assert!(result.is_err());
    }

    #[test]
    fn empty_source_deserializes_to_defaults() {
        let s: Settings = config::Config::builder()
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();
        assert_eq!(s.concurrency, 10);
        assert_eq!(s.timeout_secs, 30);
    }
}
