use ::config::{Config, Environment};
use serde::Deserialize;
use std::env;

use crate::errors::ConfigError;
use crate::providers::configs::{OpenAiProviderConfig, DEFAULT_BASE_URL, DEFAULT_MODEL};

pub const ENV_PREFIX: &str = "POLYGLOT";
pub const DEFAULT_API_KEY_ENV: &str = "GEMINI_API_KEY";
pub const DEFAULT_MAX_TURNS: usize = 10;

/// Which agent starts each turn after the first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunPolicy {
    /// Every turn starts at the triage agent
    ReTriage,
    /// Every turn starts at whichever agent answered the previous one
    StickToLastAgent,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_model")]
    pub model: String,
    /// Name of the environment variable holding the API key
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
    #[serde(default = "default_re_triage")]
    pub re_triage_per_turn: bool,
    #[serde(default = "default_max_turns")]
    pub max_turns: usize,
    #[serde(default)]
    pub temperature: Option<f32>,
    #[serde(default)]
    pub max_tokens: Option<i32>,
}

/// Values given on the command line; they win over everything else.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub model: Option<String>,
    pub base_url: Option<String>,
    pub stick_to_last_agent: bool,
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        Self::load(&Overrides::default())
    }

    pub fn load(overrides: &Overrides) -> Result<Self, ConfigError> {
        let mut builder = Config::builder()
            .set_default("base_url", default_base_url())?
            .set_default("model", default_model())?
            .set_default("api_key_env", default_api_key_env())?
            .set_default("re_triage_per_turn", default_re_triage())?
            .set_default("max_turns", default_max_turns() as u64)?
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .set_override_option("model", overrides.model.clone())?
            .set_override_option("base_url", overrides.base_url.clone())?;

        if overrides.stick_to_last_agent {
            builder = builder.set_override("re_triage_per_turn", false)?;
        }

        Ok(builder.build()?.try_deserialize()?)
    }

    pub fn run_policy(&self) -> RunPolicy {
        if self.re_triage_per_turn {
            RunPolicy::ReTriage
        } else {
            RunPolicy::StickToLastAgent
        }
    }

    pub fn provider_config(&self, api_key: String) -> OpenAiProviderConfig {
        OpenAiProviderConfig {
            host: self.base_url.clone(),
            api_key,
            model: self.model.clone(),
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        }
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            model: default_model(),
            api_key_env: default_api_key_env(),
            re_triage_per_turn: default_re_triage(),
            max_turns: default_max_turns(),
            temperature: None,
            max_tokens: None,
        }
    }
}

/// Reads the API key, failing when it is absent or blank.
pub fn load_api_key(env_var: &str) -> Result<String, ConfigError> {
    match env::var(env_var) {
        Ok(value) if !value.trim().is_empty() => Ok(value),
        _ => Err(ConfigError::MissingEnvVar {
            env_var: env_var.to_string(),
        }),
    }
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_model() -> String {
    DEFAULT_MODEL.to_string()
}

fn default_api_key_env() -> String {
    DEFAULT_API_KEY_ENV.to_string()
}

fn default_re_triage() -> bool {
    true
}

fn default_max_turns() -> usize {
    DEFAULT_MAX_TURNS
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    fn clean_env() {
        for (key, _) in env::vars() {
            if key.starts_with("POLYGLOT_") {
                env::remove_var(&key);
            }
        }
    }

    #[test]
    #[serial]
    fn test_default_settings() {
        clean_env();

        let settings = Settings::new().unwrap();
        assert_eq!(
            settings.base_url,
            "https://generativelanguage.googleapis.com/v1beta/openai/"
        );
        assert_eq!(settings.model, "gemini-2.0-flash");
        assert_eq!(settings.api_key_env, "GEMINI_API_KEY");
        assert_eq!(settings.max_turns, 10);
        assert_eq!(settings.temperature, None);
        assert_eq!(settings.max_tokens, None);
        assert_eq!(settings.run_policy(), RunPolicy::ReTriage);
    }

    #[test]
    #[serial]
    fn test_environment_override() {
        clean_env();
        env::set_var("POLYGLOT_MODEL", "gemini-1.5-pro");
        env::set_var("POLYGLOT_BASE_URL", "http://localhost:8080/v1");
        env::set_var("POLYGLOT_RE_TRIAGE_PER_TURN", "false");
        env::set_var("POLYGLOT_MAX_TURNS", "4");
        env::set_var("POLYGLOT_TEMPERATURE", "0.5");

        let settings = Settings::new().unwrap();
        assert_eq!(settings.model, "gemini-1.5-pro");
        assert_eq!(settings.base_url, "http://localhost:8080/v1");
        assert_eq!(settings.max_turns, 4);
        assert_eq!(settings.temperature, Some(0.5));
        assert_eq!(settings.run_policy(), RunPolicy::StickToLastAgent);

        clean_env();
    }

    #[test]
    #[serial]
    fn test_cli_overrides_win() {
        clean_env();
        env::set_var("POLYGLOT_MODEL", "from-env");

        let settings = Settings::load(&Overrides {
            model: Some("from-cli".to_string()),
            base_url: None,
            stick_to_last_agent: true,
        })
        .unwrap();
        assert_eq!(settings.model, "from-cli");
        assert_eq!(settings.base_url, DEFAULT_BASE_URL);
        assert_eq!(settings.run_policy(), RunPolicy::StickToLastAgent);

        clean_env();
    }

    #[test]
    #[serial]
    fn test_malformed_value_is_a_config_error() {
        clean_env();
        env::set_var("POLYGLOT_MAX_TURNS", "lots");

        let result = Settings::new();
        assert!(matches!(result, Err(ConfigError::Other(_))));

        clean_env();
    }

    #[test]
    #[serial]
    fn test_load_api_key() {
        env::set_var("POLYGLOT_TEST_KEY", "abc123");
        assert_eq!(load_api_key("POLYGLOT_TEST_KEY").unwrap(), "abc123");

        env::set_var("POLYGLOT_TEST_KEY", "   ");
        assert!(matches!(
            load_api_key("POLYGLOT_TEST_KEY"),
            Err(ConfigError::MissingEnvVar { env_var }) if env_var == "POLYGLOT_TEST_KEY"
        ));

        env::remove_var("POLYGLOT_TEST_KEY");
        assert!(load_api_key("POLYGLOT_TEST_KEY").is_err());
    }

    #[test]
    fn test_provider_config_carries_settings() {
        let settings = Settings {
            max_tokens: Some(256),
            ..Settings::default()
        };
        let config = settings.provider_config("key".to_string());
        assert_eq!(config.host, DEFAULT_BASE_URL);
        assert_eq!(config.model, DEFAULT_MODEL);
        assert_eq!(config.api_key, "key");
        assert_eq!(config.max_tokens, Some(256));
    }
}
