//! Clause text suggestions
//!
//! Lookup order for a (clause, context) pair:
//! 1. the suggestion cache
//! 2. the external generator, when one is configured
//! 3. the catalog template for the clause
//! 4. a generic placeholder
//!
//! Whatever is produced is cached, so the generator runs at most once per key.
//! Generator failures are logged and otherwise invisible to callers.

pub mod cache;
pub mod generator;

use std::sync::Arc;
use std::time::Duration;

use shared_types::{Suggestion, SuggestionSource};
use tracing::{debug, warn};

use crate::catalog::ClauseCatalog;
pub use cache::{cache_key, CachedText, SuggestionCache};
pub use generator::{
    ClauseGenerator, GenerationError, GenerationPrompt, GeneratorConfig, OpenAiGenerator,
};

/// Default per-attempt timeout for the generator
pub const DEFAULT_GENERATION_TIMEOUT_MS: u64 = 15_000;

/// Text used when a clause has no template
pub fn placeholder_text(clause: &str) -> String {
    format!(
        "Suggested clause for {}: please review and adapt to your jurisdiction.",
        clause
    )
}

/// Bounds on the external generation call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GenerationPolicy {
    pub timeout: Duration,
    /// Make one extra attempt before falling back
    pub retry_once: bool,
}

impl Default for GenerationPolicy {
    fn default() -> Self {
        Self {
            timeout: Duration::from_millis(DEFAULT_GENERATION_TIMEOUT_MS),
            retry_once: false,
        }
    }
}

/// Returns clause language for a clause name and optional context
pub struct ClauseTextProvider {
    catalog: Arc<ClauseCatalog>,
    cache: Arc<SuggestionCache>,
    generator: Option<Arc<dyn ClauseGenerator>>,
    policy: GenerationPolicy,
}

impl ClauseTextProvider {
    /// Template-only provider
    pub fn new(catalog: Arc<ClauseCatalog>, cache: Arc<SuggestionCache>) -> Self {
        Self {
            catalog,
            cache,
            generator: None,
            policy: GenerationPolicy::default(),
        }
    }

    pub fn with_generator(mut self, generator: Arc<dyn ClauseGenerator>) -> Self {
        self.generator = Some(generator);
        self
    }

    pub fn with_policy(mut self, policy: GenerationPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn has_generator(&self) -> bool {
        self.generator.is_some()
    }

    pub fn policy(&self) -> GenerationPolicy {
        self.policy
    }

    pub fn cache(&self) -> &Arc<SuggestionCache> {
        &self.cache
    }

    /// Clause text for `clause`. Never fails.
    pub async fn provide(&self, clause: &str, context: Option<&str>) -> Suggestion {
        let key = cache_key(clause, context);
        let (value, cached) = self
            .cache
            .get_or_fill(&key, || self.produce(clause, context))
            .await;

        if cached {
            debug!(clause, source = ?value.source, "Suggestion cache hit");
        }

        Suggestion {
            clause: clause.to_string(),
            text: value.text,
            source: value.source,
            cached,
        }
    }

    async fn produce(&self, clause: &str, context: Option<&str>) -> CachedText {
        match self.generate(clause, context).await {
            Ok(text) => CachedText {
                text,
                source: SuggestionSource::Generated,
            },
            Err(GenerationError::NotConfigured) => self.fallback(clause),
            Err(err) => {
                warn!(clause, error = %err, "Clause generation failed, using template");
                self.fallback(clause)
            }
        }
    }

    async fn generate(&self, clause: &str, context: Option<&str>) -> Result<String, GenerationError> {
        let generator = self.generator.as_ref().ok_or(GenerationError::NotConfigured)?;
        let prompt = GenerationPrompt::new(clause, context);

        let attempts = if self.policy.retry_once { 2 } else { 1 };
        let mut last_error = GenerationError::NotConfigured;
        for attempt in 1..=attempts {
            match self.attempt(generator.as_ref(), &prompt).await {
                Ok(text) => return Ok(text),
                Err(err) => {
                    debug!(clause, attempt, error = %err, "Generation attempt failed");
                    last_error = err;
                }
            }
        }

        Err(last_error)
    }

    async fn attempt(
        &self,
        generator: &dyn ClauseGenerator,
        prompt: &GenerationPrompt,
    ) -> Result<String, GenerationError> {
        match tokio::time::timeout(self.policy.timeout, generator.generate(prompt)).await {
            Ok(result) => result,
            Err(_) => Err(GenerationError::Timeout(self.policy.timeout.as_millis() as u64)),
        }
    }

    fn fallback(&self, clause: &str) -> CachedText {
        match self.catalog.get(clause).and_then(|c| c.template()) {
            Some(template) => CachedText {
                text: template.to_string(),
                source: SuggestionSource::Template,
            },
            None => CachedText {
                text: placeholder_text(clause),
                source: SuggestionSource::Placeholder,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use pretty_assertions::assert_eq;
    use std::sync::atomic::{AtomicUsize, Ordering};

    enum Behavior {
        Succeed(&'static str),
        Fail,
        FailOnce(&'static str),
        Hang,
    }

    struct FakeGenerator {
        behavior: Behavior,
        calls: AtomicUsize,
        delay: Duration,
    }

    impl FakeGenerator {
        fn new(behavior: Behavior) -> Arc<Self> {
            Arc::new(Self {
                behavior,
                calls: AtomicUsize::new(0),
                delay: Duration::ZERO,
            })
        }

        fn slow(behavior: Behavior, delay: Duration) -> Arc<Self> {
            Arc::new(Self {
                behavior,
                calls: AtomicUsize::new(0),
                delay,
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl ClauseGenerator for FakeGenerator {
        async fn generate(&self, prompt: &GenerationPrompt) -> Result<String, GenerationError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            match self.behavior {
                Behavior::Succeed(text) => Ok(format!("{} for {}", text, prompt.clause)),
                Behavior::Fail => Err(GenerationError::Status(503)),
                Behavior::FailOnce(text) if call > 0 => Ok(text.to_string()),
                Behavior::FailOnce(_) => Err(GenerationError::Transport("reset".into())),
                Behavior::Hang => {
                    tokio::time::sleep(Duration::from_secs(30)).await;
                    Ok("too late".to_string())
                }
            }
        }
    }

    fn provider() -> ClauseTextProvider {
        ClauseTextProvider::new(
            ClauseCatalog::builtin(),
            Arc::new(SuggestionCache::unbounded()),
        )
    }

    #[tokio::test]
    async fn test_template_without_generator() {
        let provider = provider();
        assert!(!provider.has_generator());

        let suggestion = provider.provide("Breach Notification", None).await;
        assert_eq!(suggestion.source, SuggestionSource::Template);
        assert!(suggestion.text.starts_with("Breach Notification:"));
        assert!(!suggestion.cached);
    }

    #[tokio::test]
    async fn test_placeholder_for_unknown_clause() {
        let suggestion = provider().provide("Force Majeure", None).await;
        assert_eq!(suggestion.source, SuggestionSource::Placeholder);
        assert_eq!(suggestion.text, placeholder_text("Force Majeure"));
        assert!(suggestion.text.contains("Force Majeure"));
    }

    #[tokio::test]
    async fn test_generated_text_is_cached() {
        let generator = FakeGenerator::new(Behavior::Succeed("Drafted"));
        let provider = provider().with_generator(generator.clone());

        let first = provider.provide("HIPAA", Some("clinic")).await;
        let second = provider.provide("HIPAA", Some("clinic")).await;

        assert_eq!(first.source, SuggestionSource::Generated);
        assert_eq!(first.text, "Drafted for HIPAA");
        assert_eq!(second.text, first.text);
        assert!(!first.cached);
        assert!(second.cached);
        assert_eq!(generator.calls(), 1);
    }

    #[tokio::test]
    async fn test_context_is_part_of_the_key() {
        let generator = FakeGenerator::new(Behavior::Succeed("Drafted"));
        let provider = provider().with_generator(generator.clone());

        provider.provide("HIPAA", Some("clinic")).await;
        provider.provide("HIPAA", Some("insurer")).await;
        provider.provide("HIPAA", None).await;

        assert_eq!(generator.calls(), 3);
        assert_eq!(provider.cache().len().await, 3);
    }

    #[tokio::test]
    async fn test_failure_falls_back_and_is_not_retried_later() {
        let generator = FakeGenerator::new(Behavior::Fail);
        let provider = provider().with_generator(generator.clone());

        let first = provider.provide("GDPR Compliance", None).await;
        let second = provider.provide("GDPR Compliance", None).await;

        assert_eq!(first.source, SuggestionSource::Template);
        assert_eq!(second.text, first.text);
        assert!(second.cached);
        assert_eq!(generator.calls(), 1);
    }

    #[tokio::test]
    async fn test_timeout_falls_back_to_template() {
        let generator = FakeGenerator::new(Behavior::Hang);
        let provider = provider()
            .with_generator(generator.clone())
            .with_policy(GenerationPolicy {
                timeout: Duration::from_millis(20),
                retry_once: false,
            });

        let suggestion = provider.provide("HIPAA", None).await;
        assert_eq!(suggestion.source, SuggestionSource::Template);
        assert_eq!(generator.calls(), 1);
    }

    #[tokio::test]
    async fn test_single_retry_recovers() {
        let generator = FakeGenerator::new(Behavior::FailOnce("Second time lucky"));
        let provider = provider()
            .with_generator(generator.clone())
            .with_policy(GenerationPolicy {
                timeout: Duration::from_secs(1),
                retry_once: true,
            });

        let suggestion = provider.provide("HIPAA", None).await;
        assert_eq!(suggestion.source, SuggestionSource::Generated);
        assert_eq!(suggestion.text, "Second time lucky");
        assert_eq!(generator.calls(), 2);
    }

    #[tokio::test]
    async fn test_retry_is_bounded() {
        let generator = FakeGenerator::new(Behavior::Fail);
        let provider = provider()
            .with_generator(generator.clone())
            .with_policy(GenerationPolicy {
                timeout: Duration::from_secs(1),
                retry_once: true,
            });

        let suggestion = provider.provide("HIPAA", None).await;
        assert_eq!(suggestion.source, SuggestionSource::Template);
        assert_eq!(generator.calls(), 2);
    }

    #[tokio::test]
    async fn test_cached_clause_is_served_while_another_generates() {
        let generator = FakeGenerator::slow(Behavior::Succeed("Drafted"), Duration::from_millis(500));
        let provider = Arc::new(provider().with_generator(generator.clone()));
        provider
            .cache()
            .get_or_fill(&cache_key("HIPAA", None), || async {
                CachedText {
                    text: "Stored HIPAA clause".to_string(),
                    source: SuggestionSource::Generated,
                }
            })
            .await;

        let slow = {
            let provider = Arc::clone(&provider);
            tokio::spawn(async move { provider.provide("Slow", None).await })
        };
        while generator.calls() == 0 {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }

        let hit = tokio::time::timeout(Duration::from_millis(200), provider.provide("HIPAA", None))
            .await
            .expect("cache hit waited for an unrelated generation");
        assert!(hit.cached);
        assert_eq!(hit.text, "Stored HIPAA clause");

        let slow = slow.await.unwrap();
        assert_eq!(slow.text, "Drafted for Slow");
        assert_eq!(generator.calls(), 1);
    }

    #[tokio::test]
    async fn test_concurrent_requests_generate_once() {
        let generator = FakeGenerator::slow(Behavior::Succeed("Drafted"), Duration::from_millis(20));
        let provider = Arc::new(provider().with_generator(generator.clone()));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let provider = Arc::clone(&provider);
                tokio::spawn(async move { provider.provide("HIPAA", Some("clinic")).await })
            })
            .collect();

        let mut texts = Vec::new();
        for handle in handles {
            texts.push(handle.await.unwrap().text);
        }

        assert!(texts.iter().all(|t| t == "Drafted for HIPAA"));
        assert_eq!(generator.calls(), 1);
    }
}
