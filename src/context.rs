use anyhow::Result;

use crate::agents::AgentRegistry;
use crate::config::{load_api_key, RunPolicy, Settings};
use crate::providers::base::Provider;
use crate::providers::openai::OpenAiProvider;
use crate::providers::types::objectid::ConversationId;
use crate::runner::RunConfig;

/// Everything a session needs, built once at startup.
pub struct AppContext {
    settings: Settings,
    provider: Box<dyn Provider>,
    registry: AgentRegistry,
    conversation_id: ConversationId,
}

impl AppContext {
    /// Loads the credential and builds the HTTP client.
    ///
    /// Fails before any network activity when the key is missing.
    pub fn from_settings(settings: Settings) -> Result<Self> {
        let api_key = load_api_key(&settings.api_key_env)?;
        let provider = OpenAiProvider::new(settings.provider_config(api_key))?;
        tracing::debug!(model = provider.model(), base_url = %settings.base_url, "client ready");
        Self::new(settings, Box::new(provider))
    }

    pub fn new(settings: Settings, provider: Box<dyn Provider>) -> Result<Self> {
        Ok(Self {
            settings,
            provider,
            registry: AgentRegistry::translation()?,
            conversation_id: ConversationId::new(),
        })
    }

    pub fn provider(&self) -> &dyn Provider {
        self.provider.as_ref()
    }

    pub fn registry(&self) -> &AgentRegistry {
        &self.registry
    }

    pub fn conversation_id(&self) -> &ConversationId {
        &self.conversation_id
    }

    pub fn run_policy(&self) -> RunPolicy {
        self.settings.run_policy()
    }

    pub fn run_config(&self) -> RunConfig {
        RunConfig {
            max_turns: self.settings.max_turns,
            group_id: self.conversation_id.clone(),
        }
    }

    /// Releases the client and its connection pool.
    pub fn close(self) {
        tracing::debug!(conversation_id = %self.conversation_id, "closing context");
        drop(self.provider);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ConfigError;
    use serial_test::serial;
    use std::env;
    use wiremock::matchers::any;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const KEY_VAR: &str = "POLYGLOT_CONTEXT_TEST_KEY";

    fn settings_for(server: &MockServer) -> Settings {
        Settings {
            base_url: server.uri(),
            api_key_env: KEY_VAR.to_string(),
            ..Settings::default()
        }
    }

    #[tokio::test]
    #[serial]
    async fn test_missing_credential_fails_without_network() {
        let server = MockServer::start().await;
        Mock::given(any())
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        env::remove_var(KEY_VAR);
        let err = AppContext::from_settings(settings_for(&server))
            .err()
            .expect("context must not build without a key");

        match err.downcast_ref::<ConfigError>() {
            Some(ConfigError::MissingEnvVar { env_var }) => assert_eq!(env_var, KEY_VAR),
            other => panic!("unexpected error: {:?}", other),
        }
        server.verify().await;
    }

    #[tokio::test]
    #[serial]
    async fn test_context_from_settings() -> Result<()> {
        let server = MockServer::start().await;
        env::set_var(KEY_VAR, "test-key");

        let settings = Settings {
            max_turns: 3,
            ..settings_for(&server)
        };
        let context = AppContext::from_settings(settings)?;
        env::remove_var(KEY_VAR);

        assert_eq!(context.registry().len(), 4);
        assert_eq!(context.run_policy(), RunPolicy::ReTriage);

        let run_config = context.run_config();
        assert_eq!(run_config.max_turns, 3);
        assert_eq!(&run_config.group_id, context.conversation_id());

        context.close();
        Ok(())
    }
}
