//! Buffer maintenance: startup backfill and scheduled top-ups.
//!
//! Every generation cycle runs topic -> script -> save under a single async
//! mutex that owns the mutable generation state (topic history and RNG), so
//! the backfill loop and the schedule can share one maintainer without ever
//! overlapping writes or eviction passes. Failures never escape a cycle; they
//! come back as a [`CycleOutcome`] and the next trigger simply tries again.

use crate::config::PipelineConfig;
use crate::history::TopicHistory;
use crate::model::TextModel;
use crate::script::{ScriptError, ScriptGenerator};
use crate::store::{Artifact, ArtifactStore, StoreError};
use crate::topic::{GeneratedTopic, TopicGenerator};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{error, info, warn};

/// Shortest period the schedule will tick at.
pub const MIN_SCHEDULE_INTERVAL: Duration = Duration::from_secs(1);

/// State serialized behind the generation gate.
struct GenerationState {
    history: TopicHistory,
    rng: StdRng,
}

/// Result of one generation cycle.
#[derive(Debug)]
pub enum CycleOutcome {
    /// A script was generated, validated and stored.
    Saved {
        artifact: Artifact,
        topic: GeneratedTopic,
    },
    /// The code model failed or its output was rejected; nothing was stored.
    Rejected {
        topic: GeneratedTopic,
        reason: ScriptError,
    },
    /// A valid script could not be written.
    StorageFailed {
        topic: GeneratedTopic,
        reason: StoreError,
    },
}

impl CycleOutcome {
    pub fn is_saved(&self) -> bool {
        matches!(self, CycleOutcome::Saved { .. })
    }

    pub fn artifact(&self) -> Option<&Artifact> {
        match self {
            CycleOutcome::Saved { artifact, .. } => Some(artifact),
            _ => None,
        }
    }
}

/// Summary of a backfill run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BackfillReport {
    /// Artifacts present before the run.
    pub initial: usize,
    /// Cycles run.
    pub attempted: usize,
    /// Cycles that stored an artifact.
    pub saved: usize,
}

/// Keeps the artifact buffer stocked.
pub struct BufferMaintainer {
    topics: TopicGenerator,
    scripts: ScriptGenerator,
    store: ArtifactStore,
    state: Mutex<GenerationState>,
    backfill_delay: Duration,
}

impl BufferMaintainer {
    /// Create a maintainer from its stages, with default delay and entropy-seeded RNG.
    pub fn new(topics: TopicGenerator, scripts: ScriptGenerator, store: ArtifactStore) -> Self {
        Self {
            topics,
            scripts,
            store,
            state: Mutex::new(GenerationState {
                history: TopicHistory::new(),
                rng: StdRng::from_entropy(),
            }),
            backfill_delay: crate::config::BACKFILL_DELAY,
        }
    }

    /// Wire up a maintainer from config, opening the artifact store.
    pub async fn from_config(
        config: &PipelineConfig,
        topic_model: Arc<dyn TextModel>,
        script_model: Arc<dyn TextModel>,
    ) -> Result<Self, StoreError> {
        let store = ArtifactStore::open(&config.gen_dir)
            .await?
            .with_retention_cap(config.retention_cap);

        let topics = TopicGenerator::new(topic_model)
            .with_mode(config.theme_mode)
            .with_timeout(config.model_timeout);

        let scripts = ScriptGenerator::new(script_model)
            .with_caption(config.caption)
            .with_timeout(config.model_timeout);

        Ok(Self::new(topics, scripts, store)
            .with_history(TopicHistory::with_capacity(config.history_size))
            .with_backfill_delay(config.backfill_delay))
    }

    /// Use a deterministic RNG for theme sampling.
    pub fn with_rng(mut self, rng: StdRng) -> Self {
        self.state.get_mut().rng = rng;
        self
    }

    /// Replace the topic history.
    pub fn with_history(mut self, history: TopicHistory) -> Self {
        self.state.get_mut().history = history;
        self
    }

    pub fn with_backfill_delay(mut self, delay: Duration) -> Self {
        self.backfill_delay = delay;
        self
    }

    pub fn store(&self) -> &ArtifactStore {
        &self.store
    }

    /// Snapshot of the recent topics, oldest first.
    pub async fn recent_topics(&self) -> Vec<String> {
        let state = self.state.lock().await;
        state.history.iter().map(str::to_string).collect()
    }

    /// Run exactly one topic -> script -> save pass.
    pub async fn run_generation_cycle(&self) -> CycleOutcome {
        let mut guard = self.state.lock().await;
        let state = &mut *guard;

        let topic = self.topics.generate(&mut state.history, &mut state.rng).await;
        info!(topic = %topic.topic, style = ?topic.style, "generating animation");

        let script = match self.scripts.generate(&topic).await {
            Ok(script) => script,
            Err(reason) => {
                warn!(topic = %topic.topic, error = %reason, "generation cycle skipped");
                return CycleOutcome::Rejected { topic, reason };
            }
        };

        match self.store.save(&script).await {
            Ok(artifact) => CycleOutcome::Saved { artifact, topic },
            Err(reason) => {
                error!(topic = %topic.topic, error = %reason, "failed to store artifact");
                CycleOutcome::StorageFailed { topic, reason }
            }
        }
    }

    /// Fill the buffer up to `target` artifacts.
    ///
    /// Runs one cycle per missing artifact, pausing after each. A cycle that
    /// fails is not retried here; the schedule picks up the slack.
    pub async fn ensure_minimum_buffer(&self, target: usize) -> BackfillReport {
        let initial = match self.store.count().await {
            Ok(count) => count,
            Err(e) => {
                error!(error = %e, "could not count artifacts, skipping backfill");
                return BackfillReport::default();
            }
        };
        info!(count = initial, target, "current animation count");

        let needed = target.saturating_sub(initial);
        let mut report = BackfillReport {
            initial,
            ..Default::default()
        };
        if needed == 0 {
            return report;
        }

        info!(needed, "filling animation buffer");
        for _ in 0..needed {
            if self.run_generation_cycle().await.is_saved() {
                report.saved += 1;
            }
            report.attempted += 1;
            tokio::time::sleep(self.backfill_delay).await;
        }
        info!(saved = report.saved, attempted = report.attempted, "buffer fill finished");

        report
    }

    /// Run one cycle every `interval` until `shutdown` resolves.
    ///
    /// The first cycle fires one full interval after start. A cycle in flight
    /// when shutdown arrives is allowed to finish. Intervals shorter than
    /// [`MIN_SCHEDULE_INTERVAL`] are raised to it.
    pub async fn run_schedule<F>(&self, interval: Duration, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        let interval = interval.max(MIN_SCHEDULE_INTERVAL);
        let mut ticker = tokio::time::interval_at(Instant::now() + interval, interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut shutdown = std::pin::pin!(shutdown);

        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    info!("generation schedule stopped");
                    break;
                }
                _ = ticker.tick() => {
                    info!("running scheduled animation generation");
                    self.run_generation_cycle().await;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{MockModel, StepClock, SAMPLE_SCRIPT};
    use tempfile::TempDir;

    async fn maintainer(
        dir: &TempDir,
        topic_model: MockModel,
        script_model: Arc<MockModel>,
    ) -> BufferMaintainer {
        let store = ArtifactStore::open(dir.path())
            .await
            .unwrap()
            .with_clock(Arc::new(StepClock::starting_at_millis(1_700_000_000_000)));
        BufferMaintainer::new(
            TopicGenerator::new(Arc::new(topic_model)),
            ScriptGenerator::new(script_model),
            store,
        )
        .with_rng(StdRng::seed_from_u64(1))
        .with_backfill_delay(Duration::ZERO)
    }

    #[tokio::test]
    async fn test_cycle_saves_valid_script() {
        let temp = TempDir::new().unwrap();
        let code = Arc::new(MockModel::new("code").respond(SAMPLE_SCRIPT));
        let m = maintainer(&temp, MockModel::new("topic").respond("ufo over desert temple"), code).await;

        let outcome = m.run_generation_cycle().await;

        let artifact = outcome.artifact().expect("cycle should save");
        assert_eq!(m.store().ids().await.unwrap(), vec![artifact.id.clone()]);
        assert_eq!(m.recent_topics().await, vec!["ufo over desert temple"]);
    }

    #[tokio::test]
    async fn test_rejected_script_never_reaches_store() {
        let temp = TempDir::new().unwrap();
        let code = Arc::new(MockModel::new("code").respond("console.log('no entry point')"));
        let m = maintainer(&temp, MockModel::new("topic").respond("ghost in dev room"), code).await;

        let outcome = m.run_generation_cycle().await;

        assert!(matches!(
            outcome,
            CycleOutcome::Rejected {
                reason: ScriptError::MissingEntryPoint,
                ..
            }
        ));
        assert_eq!(m.store().count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_topic_failure_still_generates_with_fallback() {
        let temp = TempDir::new().unwrap();
        let code = Arc::new(MockModel::new("code").respond(SAMPLE_SCRIPT));
        let m = maintainer(&temp, MockModel::new("topic").fail("quota"), code.clone()).await;

        let outcome = m.run_generation_cycle().await;

        assert!(outcome.is_saved());
        assert!(m.recent_topics().await.is_empty());
        assert!(code.prompts()[0].contains(crate::topic::FALLBACK_TOPIC));
        assert!(code.prompts()[0].contains(crate::topic::FALLBACK_STYLE));
    }

    #[tokio::test]
    async fn test_backfill_attempts_only_missing_count_without_retry() {
        let temp = TempDir::new().unwrap();
        let code = Arc::new(
            MockModel::new("code")
                .respond(SAMPLE_SCRIPT)
                .respond("not javascript at all")
                .respond(SAMPLE_SCRIPT),
        );
        let topics = MockModel::new("topic").respond_with(|n| format!("topic {n}"));
        let m = maintainer(&temp, topics, code.clone()).await;

        let report = m.ensure_minimum_buffer(3).await;

        assert_eq!(
            report,
            BackfillReport {
                initial: 0,
                attempted: 3,
                saved: 2
            }
        );
        assert_eq!(code.call_count(), 3);
        assert_eq!(m.store().count().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_backfill_noop_when_full() {
        let temp = TempDir::new().unwrap();
        let code = Arc::new(MockModel::new("code").respond_with(|_| SAMPLE_SCRIPT.to_string()));
        let topics = MockModel::new("topic").respond_with(|n| format!("topic {n}"));
        let m = maintainer(&temp, topics, code.clone()).await;
        m.ensure_minimum_buffer(2).await;

        let report = m.ensure_minimum_buffer(2).await;

        assert_eq!(report.initial, 2);
        assert_eq!(report.attempted, 0);
        assert_eq!(code.call_count(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_backfill_pauses_between_cycles() {
        let temp = TempDir::new().unwrap();
        let code = Arc::new(MockModel::new("code").respond_with(|_| SAMPLE_SCRIPT.to_string()));
        let topics = MockModel::new("topic").respond_with(|n| format!("topic {n}"));
        let m = maintainer(&temp, topics, code)
            .await
            .with_backfill_delay(Duration::from_secs(2));

        let start = Instant::now();
        m.ensure_minimum_buffer(3).await;

        assert!(start.elapsed() >= Duration::from_secs(6));
    }

    #[tokio::test(start_paused = true)]
    async fn test_schedule_runs_one_cycle_per_tick_until_shutdown() {
        let temp = TempDir::new().unwrap();
        let code = Arc::new(MockModel::new("code").respond_with(|_| SAMPLE_SCRIPT.to_string()));
        let topics = MockModel::new("topic").respond_with(|n| format!("topic {n}"));
        let m = maintainer(&temp, topics, code.clone()).await;

        let interval = Duration::from_secs(300);
        let shutdown = tokio::time::sleep(interval * 3 + Duration::from_secs(1));
        m.run_schedule(interval, shutdown).await;

        assert_eq!(code.call_count(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_interval_is_raised_to_minimum() {
        let temp = TempDir::new().unwrap();
        let code = Arc::new(MockModel::new("code").respond_with(|_| SAMPLE_SCRIPT.to_string()));
        let topics = MockModel::new("topic").respond_with(|n| format!("topic {n}"));
        let m = maintainer(&temp, topics, code.clone()).await;

        let shutdown = tokio::time::sleep(MIN_SCHEDULE_INTERVAL * 2 + Duration::from_millis(500));
        m.run_schedule(Duration::ZERO, shutdown).await;

        assert_eq!(code.call_count(), 2);
    }

    #[tokio::test]
    async fn test_concurrent_cycles_are_serialized() {
        let temp = TempDir::new().unwrap();
        let code = Arc::new(
            MockModel::new("code")
                .with_delay(Duration::from_millis(20))
                .respond_with(|_| SAMPLE_SCRIPT.to_string()),
        );
        let topics = MockModel::new("topic").respond_with(|n| format!("topic {n}"));
        let m = Arc::new(maintainer(&temp, topics, code).await);

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let m = m.clone();
                tokio::spawn(async move { m.run_generation_cycle().await.is_saved() })
            })
            .collect();
        for handle in handles {
            assert!(handle.await.unwrap());
        }

        assert_eq!(m.store().count().await.unwrap(), 4);
        assert_eq!(m.recent_topics().await.len(), 4);
    }
}
