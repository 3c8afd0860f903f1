use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("{env_var} is not set. Please ensure it is defined in your environment or .env file.")]
    MissingEnvVar { env_var: String },

    #[error("Configuration error: {0}")]
    Other(#[from] ::config::ConfigError),
}

#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RunError {
    #[error("Agent not found: {0}")]
    UnknownAgent(String),

    #[error("Agent registered twice: {0}")]
    DuplicateAgent(String),

    #[error("Model requested an unknown handoff: {0}")]
    UnknownHandoff(String),

    #[error("Max turns ({0}) exceeded")]
    MaxTurnsExceeded(usize),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_env_var_message_names_the_variable() {
        let err = ConfigError::MissingEnvVar {
            env_var: "GEMINI_API_KEY".to_string(),
        };
        assert!(err.to_string().starts_with("GEMINI_API_KEY is not set"));
    }
}
