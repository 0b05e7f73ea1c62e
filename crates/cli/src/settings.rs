//! Configuration loading
//!
//! Layers, lowest precedence first:
//! 1. built-in defaults (`ConsoleConfig::default()`)
//! 2. `testdeck.toml` in the working directory, or the file given by `--config`
//! 3. `TESTDECK__*` environment variables (`TESTDECK__CLIENT__BASE_URL`, ...)
//! 4. command-line flags

use anyhow::{Context, Result};
use config::{Config, Environment, File};
use std::path::Path;
use testdeck_core::ConsoleConfig;

const DEFAULT_FILE: &str = "testdeck";
const ENV_PREFIX: &str = "TESTDECK";

/// Values given on the command line
#[derive(Debug, Default, Clone)]
pub struct Overrides {
    pub base_url: Option<String>,
    pub timeout_ms: Option<u64>,
    pub max_retries: Option<u32>,
}

impl Overrides {
    fn apply(&self, config: &mut ConsoleConfig) {
        if let Some(url) = &self.base_url {
            config.client.base_url = url.clone();
        }
        if let Some(timeout) = self.timeout_ms {
            config.client.timeout_ms = timeout;
        }
        if let Some(retries) = self.max_retries {
            config.client.max_retries = retries;
        }
    }
}

/// Load and validate the console configuration
pub fn load(path: Option<&Path>, overrides: &Overrides) -> Result<ConsoleConfig> {
    let file = match path {
        Some(path) => File::from(path).required(true),
        None => File::with_name(DEFAULT_FILE).required(false),
    };

    let builder = Config::builder()
        .add_source(file)
        .add_source(environment(None));

    finish(builder, overrides)
}

fn environment(source: Option<config::Map<String, String>>) -> Environment {
    Environment::with_prefix(ENV_PREFIX)
        .separator("__")
        .try_parsing(true)
        .source(source)
}

fn finish(
    builder: config::ConfigBuilder<config::builder::DefaultState>,
    overrides: &Overrides,
) -> Result<ConsoleConfig> {
    let mut config: ConsoleConfig = builder
        .build()
        .context("Failed to read configuration")?
        .try_deserialize()
        .context("Invalid configuration")?;

    overrides.apply(&mut config);
    config.validate().context("Invalid configuration")?;
    Ok(config)
}

/// Same layering with an inline TOML document and explicit environment map
#[cfg(test)]
fn load_from(
    toml: &str,
    env: config::Map<String, String>,
    overrides: &Overrides,
) -> Result<ConsoleConfig> {
    let builder = Config::builder()
        .add_source(File::from_str(toml, config::FileFormat::Toml))
        .add_source(environment(Some(env)));
    finish(builder, overrides)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env(pairs: &[(&str, &str)]) -> config::Map<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_defaults_when_nothing_is_set() {
        let config = load_from("", env(&[]), &Overrides::default()).unwrap();
        assert_eq!(config, ConsoleConfig::default());
    }

    #[test]
    fn test_file_values_are_partial() {
        let toml = r#"
            [client]
            base_url = "https://qa.example.com/api"
            max_retries = 5

            [polling]
            batch_interval_ms = 10000
        "#;

        let config = load_from(toml, env(&[]), &Overrides::default()).unwrap();

        assert_eq!(config.client.base_url, "https://qa.example.com/api");
        assert_eq!(config.client.max_retries, 5);
        assert_eq!(config.client.timeout_ms, 10_000);
        assert_eq!(config.polling.batch_interval_ms, 10_000);
        assert_eq!(config.polling.single_interval_ms, 3_000);
    }

    #[test]
    fn test_env_beats_file_and_flags_beat_env() {
        let toml = r#"
            [client]
            base_url = "https://file.example.com/api"
            timeout_ms = 2000
        "#;
        let vars = env(&[
            ("TESTDECK__CLIENT__BASE_URL", "https://env.example.com/api"),
            ("TESTDECK__CLIENT__TIMEOUT_MS", "4000"),
            ("TESTDECK__NOTIFICATIONS__MAX_VISIBLE", "2"),
        ]);
        let overrides = Overrides {
            timeout_ms: Some(8000),
            ..Overrides::default()
        };

        let config = load_from(toml, vars, &overrides).unwrap();

        assert_eq!(config.client.base_url, "https://env.example.com/api");
        assert_eq!(config.client.timeout_ms, 8000);
        assert_eq!(config.notifications.max_visible, 2);
    }

    #[test]
    fn test_invalid_result_is_rejected() {
        let overrides = Overrides {
            max_retries: Some(0),
            ..Overrides::default()
        };
        assert!(load_from("", env(&[]), &overrides).is_err());

        let toml = r#"
            [client]
            base_url = "ftp://files.example.com"
        "#;
        assert!(load_from(toml, env(&[]), &Overrides::default()).is_err());
    }
}
