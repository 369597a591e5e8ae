//! LLM Router
//!
//! Orders the configured providers (default first), applies a per-attempt
//! timeout, and fails over to the next provider on error or timeout.
//! `complete_json` adds the structured-output contract every stage relies
//! on: the reply must contain JSON that deserializes into the caller's type.

use super::{extract_json, GenerationOptions, LLMError, LLMProvider, Message};
use crate::config::LLMConfig;
use crate::secrets::{SecretCache, OPENAI_API_KEY};
use sdk::errors::EngineError;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::Duration;

/// LLM Router with ordered failover
pub struct LLMRouter {
    /// Providers in attempt order
    providers: Vec<Box<dyn LLMProvider>>,

    /// Per-attempt timeout
    timeout: Duration,
}

impl LLMRouter {
    /// Create a router, moving the configured default provider to the front
    pub fn new(providers: Vec<Box<dyn LLMProvider>>, config: &LLMConfig) -> Self {
        let mut providers = providers;
        // Stable sort keeps the caller's order among non-default providers
        providers.sort_by_key(|p| p.name() != config.default_provider);
        Self {
            providers,
            timeout: Duration::from_secs(config.timeout_secs),
        }
    }

    /// Create a router with an explicit timeout, keeping the given order
    pub fn with_timeout(providers: Vec<Box<dyn LLMProvider>>, timeout: Duration) -> Self {
        Self { providers, timeout }
    }

    /// Names of the providers in attempt order
    pub fn provider_names(&self) -> Vec<&str> {
        self.providers.iter().map(|p| p.name()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }

    /// Call LLM providers with automatic failover
    ///
    /// Returns the raw completion text and the name of the provider that produced it.
    pub async fn call(
        &self,
        messages: &[Message],
        options: &GenerationOptions,
    ) -> super::Result<(String, String)> {
        if self.providers.is_empty() {
            return Err(LLMError::ProviderUnavailable(
                "No LLM providers configured".to_string(),
            ));
        }

        let mut last_error = None;
        for provider in &self.providers {
            tracing::debug!(
                "Attempting provider: {} (timeout: {}s)",
                provider.name(),
                self.timeout.as_secs()
            );

            match tokio::time::timeout(self.timeout, provider.generate(messages, options)).await {
                Ok(Ok(content)) => {
                    tracing::debug!("Provider {} succeeded", provider.name());
                    return Ok((content, provider.name().to_string()));
                }
                Ok(Err(e)) => {
                    tracing::warn!("Provider {} failed: {}", provider.name(), e);
                    last_error = Some(e);
                }
                Err(_) => {
                    tracing::warn!(
                        "Provider {} timed out after {}s",
                        provider.name(),
                        self.timeout.as_secs()
                    );
                    last_error = Some(LLMError::Timeout);
                }
            }
        }

        // A single provider's error is more useful to the caller than a generic one
        match last_error {
            Some(e) if self.providers.len() == 1 => Err(e),
            _ => Err(LLMError::ProviderUnavailable(
                "All LLM providers failed".to_string(),
            )),
        }
    }

    /// Call the model and deserialize the JSON found in its reply
    pub async fn complete_json<T: DeserializeOwned>(
        &self,
        system: &str,
        user: &str,
        options: &GenerationOptions,
    ) -> super::Result<T> {
        let messages = [Message::system(system), Message::user(user)];
        let (content, _provider) = self.call(&messages, options).await?;

        let value = extract_json(&content).ok_or_else(|| {
            LLMError::ParseError(format!(
                "No JSON found in model output ({} chars)",
                content.len()
            ))
        })?;

        serde_json::from_value(value).map_err(|e| LLMError::InvalidShape(e.to_string()))
    }

    /// Check the health of all registered providers
    pub async fn check_health(&self) -> Vec<(&str, bool)> {
        let mut results = Vec::new();
        for provider in &self.providers {
            let is_healthy = provider.check_health().await;
            results.push((provider.name(), is_healthy));
        }
        results
    }
}

/// Build the router from configuration.
///
/// OpenAI is registered only when its key resolves. Ollama is registered
/// when it is the configured default. A router with no providers means the
/// run has no way to reach a model, which is fatal at startup.
///
/// # Errors
/// `EngineError::MissingCredential` when the default is OpenAI and no key is
/// configured; `EngineError::AllProvidersExhausted` if nothing could be built.
pub fn build_router(
    config: &LLMConfig,
    secrets: Arc<SecretCache>,
) -> Result<LLMRouter, EngineError> {
    let mut providers: Vec<Box<dyn LLMProvider>> = Vec::new();

    if secrets.lookup(OPENAI_API_KEY).is_some() {
        providers.push(Box::new(super::openai::OpenAIProvider::new(
            config.openai.clone(),
            Arc::clone(&secrets),
        )));
    } else {
        tracing::warn!("{} not configured; OpenAI provider disabled", OPENAI_API_KEY);
    }

    if config.default_provider == "ollama" {
        providers.push(Box::new(super::ollama::OllamaProvider::new(
            config.ollama.base_url.clone(),
            config.ollama.model.clone(),
        )));
    }

    if providers.is_empty() {
        return Err(if config.default_provider == "openai" {
            EngineError::MissingCredential(OPENAI_API_KEY.to_string())
        } else {
            EngineError::AllProvidersExhausted
        });
    }

    let router = LLMRouter::new(providers, config);
    tracing::info!("LLM providers: {}", router.provider_names().join(", "));
    Ok(router)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::secrets::SecretManager;
    use async_trait::async_trait;
    use serde::Deserialize;

    struct MockProvider {
        name: String,
        reply: Option<String>,
        delay: Duration,
    }

    impl MockProvider {
        fn ok(name: &str, reply: &str) -> Self {
            Self {
                name: name.to_string(),
                reply: Some(reply.to_string()),
                delay: Duration::ZERO,
            }
        }

        fn failing(name: &str) -> Self {
            Self {
                name: name.to_string(),
                reply: None,
                delay: Duration::ZERO,
            }
        }
    }

    #[async_trait]
    impl LLMProvider for MockProvider {
        fn name(&self) -> &str {
            &self.name
        }

        fn is_local(&self) -> bool {
            false
        }

        async fn generate(
            &self,
            _messages: &[Message],
            _options: &GenerationOptions,
        ) -> super::super::Result<String> {
            tokio::time::sleep(self.delay).await;
            self.reply
                .clone()
                .ok_or_else(|| LLMError::NetworkError("boom".to_string()))
        }
    }

    fn config(default: &str) -> LLMConfig {
        LLMConfig {
            default_provider: default.to_string(),
            timeout_secs: 5,
            ..Default::default()
        }
    }

    #[test]
    fn test_default_provider_first() {
        let router = LLMRouter::new(
            vec![
                Box::new(MockProvider::ok("openai", "{}")),
                Box::new(MockProvider::ok("ollama", "{}")),
            ],
            &config("ollama"),
        );
        assert_eq!(router.provider_names(), vec!["ollama", "openai"]);
    }

    #[tokio::test]
    async fn test_failover_to_second_provider() {
        let router = LLMRouter::with_timeout(
            vec![
                Box::new(MockProvider::failing("openai")),
                Box::new(MockProvider::ok("ollama", r#"{"ok": true}"#)),
            ],
            Duration::from_secs(5),
        );

        let (content, provider) = router
            .call(&[Message::user("hi")], &GenerationOptions::structured(0.0))
            .await
            .unwrap();
        assert_eq!(provider, "ollama");
        assert_eq!(content, r#"{"ok": true}"#);
    }

    #[tokio::test]
    async fn test_timeout_then_failover() {
        let mut slow = MockProvider::ok("openai", "{}");
        slow.delay = Duration::from_millis(500);
        let router = LLMRouter::with_timeout(
            vec![
                Box::new(slow),
                Box::new(MockProvider::ok("ollama", r#"{"n": 1}"#)),
            ],
            Duration::from_millis(50),
        );

        let (_, provider) = router
            .call(&[Message::user("hi")], &GenerationOptions::structured(0.0))
            .await
            .unwrap();
        assert_eq!(provider, "ollama");
    }

    #[tokio::test]
    async fn test_single_provider_error_is_preserved() {
        let router = LLMRouter::with_timeout(
            vec![Box::new(MockProvider::failing("openai"))],
            Duration::from_secs(1),
        );
        let err = router
            .call(&[Message::user("hi")], &GenerationOptions::structured(0.0))
            .await
            .unwrap_err();
        assert!(matches!(err, LLMError::NetworkError(_)));
    }

    #[tokio::test]
    async fn test_empty_router_errors() {
        let router = LLMRouter::with_timeout(vec![], Duration::from_secs(1));
        assert!(router.is_empty());
        let err = router
            .call(&[Message::user("hi")], &GenerationOptions::structured(0.0))
            .await
            .unwrap_err();
        assert!(matches!(err, LLMError::ProviderUnavailable(_)));
    }

    #[derive(Debug, Deserialize)]
    struct Scored {
        score: i64,
    }

    #[tokio::test]
    async fn test_complete_json_shapes() {
        let router = LLMRouter::with_timeout(
            vec![Box::new(MockProvider::ok(
                "openai",
                "```json\n{\"score\": 81}\n```",
            ))],
            Duration::from_secs(1),
        );
        let scored: Scored = router
            .complete_json("sys", "user", &GenerationOptions::structured(0.3))
            .await
            .unwrap();
        assert_eq!(scored.score, 81);

        let router = LLMRouter::with_timeout(
            vec![Box::new(MockProvider::ok("openai", r#"{"points": 81}"#))],
            Duration::from_secs(1),
        );
        let err = router
            .complete_json::<Scored>("sys", "user", &GenerationOptions::structured(0.3))
            .await
            .unwrap_err();
        assert!(matches!(err, LLMError::InvalidShape(_)));

        let router = LLMRouter::with_timeout(
            vec![Box::new(MockProvider::ok("openai", "I cannot help"))],
            Duration::from_secs(1),
        );
        let err = router
            .complete_json::<Scored>("sys", "user", &GenerationOptions::structured(0.3))
            .await
            .unwrap_err();
        assert!(matches!(err, LLMError::ParseError(_)));
    }

    #[test]
    fn test_build_router_without_key_is_fatal() {
        let secrets = Arc::new(SecretCache::new(Arc::new(SecretManager::fixed(
            Vec::<(String, String)>::new(),
        ))));
        let err = build_router(&config("openai"), secrets).err().unwrap();
        assert!(matches!(err, EngineError::MissingCredential(ref k) if k == OPENAI_API_KEY));
    }

    #[test]
    fn test_build_router_with_ollama_default_needs_no_key() {
        let secrets = Arc::new(SecretCache::new(Arc::new(SecretManager::fixed(
            Vec::<(String, String)>::new(),
        ))));
        let router = build_router(&config("ollama"), secrets).unwrap();
        assert_eq!(router.provider_names(), vec!["ollama"]);
    }

    #[test]
    fn test_build_router_with_key() {
        let secrets = Arc::new(SecretCache::new(Arc::new(SecretManager::fixed([(
            OPENAI_API_KEY,
            "sk-test",
        )]))));
        let router = build_router(&config("openai"), secrets).unwrap();
        assert_eq!(router.provider_names(), vec!["openai"]);
    }
}
