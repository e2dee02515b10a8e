//! Topic generation.
//!
//! Asks the topic model for a short scene description under a freshly
//! sampled theme. This stage never fails: any model problem yields a fixed
//! fallback topic so the rest of the cycle can still run.

use crate::history::TopicHistory;
use crate::model::{generate_with_timeout, ModelError, TextModel};
use crate::theme::{build_theme_instruction, ThemeMode};
use rand::Rng;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Topic used when the topic model can't deliver one.
pub const FALLBACK_TOPIC: &str = "neon cat in dark alley";

/// Style paired with [`FALLBACK_TOPIC`].
pub const FALLBACK_STYLE: &str = "Cyberpunk";

/// A topic plus the visual style it was sampled under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedTopic {
    pub topic: String,
    pub style: Option<String>,
    /// True when the model failed and the fallback was substituted.
    pub from_fallback: bool,
}

impl GeneratedTopic {
    pub fn fallback() -> Self {
        Self {
            topic: FALLBACK_TOPIC.to_string(),
            style: Some(FALLBACK_STYLE.to_string()),
            from_fallback: true,
        }
    }
}

/// Produces topics from the topic model.
#[derive(Clone)]
pub struct TopicGenerator {
    model: Arc<dyn TextModel>,
    mode: ThemeMode,
    timeout: Duration,
}

impl TopicGenerator {
    pub fn new(model: Arc<dyn TextModel>) -> Self {
        Self {
            model,
            mode: ThemeMode::default(),
            timeout: Duration::from_secs(90),
        }
    }

    pub fn with_mode(mut self, mode: ThemeMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Generate a topic, recording it in `history` on success.
    ///
    /// On failure the fallback is returned and `history` is left untouched.
    pub async fn generate<R: Rng + Send + ?Sized>(
        &self,
        history: &mut TopicHistory,
        rng: &mut R,
    ) -> GeneratedTopic {
        let instruction = build_theme_instruction(history, self.mode, rng);
        debug!(theme = %instruction.theme(), model = self.model.name(), "requesting topic");

        match self.request_topic(&instruction.text).await {
            Ok(topic) => {
                history.push(topic.clone());
                GeneratedTopic {
                    topic,
                    style: instruction.style().map(str::to_string),
                    from_fallback: false,
                }
            }
            Err(e) => {
                warn!(error = %e, fallback = FALLBACK_TOPIC, "topic generation failed");
                GeneratedTopic::fallback()
            }
        }
    }

    async fn request_topic(&self, prompt: &str) -> Result<String, ModelError> {
        let text = generate_with_timeout(self.model.as_ref(), prompt, self.timeout).await?;
        let topic = text.trim();
        if topic.is_empty() {
            return Err(ModelError::EmptyResponse);
        }
        Ok(topic.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockModel;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn generator(model: MockModel) -> TopicGenerator {
        TopicGenerator::new(Arc::new(model))
    }

    #[tokio::test]
    async fn test_topic_is_trimmed_and_recorded() {
        let topics = generator(MockModel::new("topic").respond("  pixel frog in sewers \n"));
        let mut history = TopicHistory::new();
        let mut rng = StdRng::seed_from_u64(5);

        let generated = topics.generate(&mut history, &mut rng).await;

        assert_eq!(generated.topic, "pixel frog in sewers");
        assert!(!generated.from_fallback);
        assert!(generated.style.is_some());
        assert_eq!(history.latest(), Some("pixel frog in sewers"));
    }

    #[tokio::test]
    async fn test_failure_returns_fallback_without_touching_history() {
        let topics = generator(MockModel::new("topic").fail("503 overloaded"));
        let mut history = TopicHistory::new();
        history.push("earlier topic");
        let mut rng = StdRng::seed_from_u64(5);

        let generated = topics.generate(&mut history, &mut rng).await;

        assert_eq!(generated, GeneratedTopic::fallback());
        assert_eq!(history.len(), 1);
        assert_eq!(history.latest(), Some("earlier topic"));
    }

    #[tokio::test]
    async fn test_blank_reply_takes_fallback_path() {
        let topics = generator(MockModel::new("topic").respond("   "));
        let mut history = TopicHistory::new();

        let generated = topics
            .generate(&mut history, &mut StdRng::seed_from_u64(1))
            .await;

        assert!(generated.from_fallback);
        assert!(history.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_takes_fallback_path() {
        let model = MockModel::new("topic")
            .with_delay(Duration::from_secs(600))
            .respond("never seen");
        let topics = generator(model).with_timeout(Duration::from_secs(10));
        let mut history = TopicHistory::new();

        let generated = topics
            .generate(&mut history, &mut StdRng::seed_from_u64(1))
            .await;

        assert!(generated.from_fallback);
        assert!(history.is_empty());
    }

    #[tokio::test]
    async fn test_history_stays_bounded_and_excluded_in_prompt() {
        let model = Arc::new(MockModel::new("topic").respond_with(|n| format!("scene number {n}")));
        let topics = TopicGenerator::new(model.clone());
        let mut history = TopicHistory::new();
        let mut rng = StdRng::seed_from_u64(9);

        for _ in 0..55 {
            topics.generate(&mut history, &mut rng).await;
            assert!(history.len() <= 50);
        }

        assert_eq!(history.latest(), Some("scene number 54"));
        let last_prompt = model.prompts().pop().unwrap();
        assert!(last_prompt.contains("scene number 53"));
        assert!(!last_prompt.contains("scene number 3,"));
    }
}
