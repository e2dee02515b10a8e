//! Pipeline configuration.

use crate::history::MAX_RECENT_TOPICS;
use crate::store::RETENTION_CAP;
use crate::theme::ThemeMode;
use std::path::PathBuf;
use std::time::Duration;

/// Default number of artifacts the startup backfill aims for.
pub const BUFFER_TARGET: usize = 20;

/// Pause after each backfill cycle, to stay under model rate limits.
pub const BACKFILL_DELAY: Duration = Duration::from_secs(2);

/// Cadence of the steady-state generation schedule.
pub const SCHEDULE_INTERVAL: Duration = Duration::from_secs(5 * 60);

/// Deadline for a single model call.
pub const MODEL_TIMEOUT: Duration = Duration::from_secs(90);

/// Configuration for the generation pipeline.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Directory holding the generated scripts.
    pub gen_dir: PathBuf,

    /// Artifacts kept on disk after each save.
    pub retention_cap: usize,

    /// Artifact count the startup backfill fills up to.
    pub buffer_target: usize,

    /// Pause after each backfill cycle.
    pub backfill_delay: Duration,

    /// Time between scheduled cycles.
    pub schedule_interval: Duration,

    /// Deadline for each model call.
    pub model_timeout: Duration,

    /// How theme axes are sampled for the topic prompt.
    pub theme_mode: ThemeMode,

    /// Ask for the topic caption on the canvas.
    pub caption: bool,

    /// Recent topics fed back as exclusions.
    pub history_size: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            gen_dir: PathBuf::from("public").join("gen"),
            retention_cap: RETENTION_CAP,
            buffer_target: BUFFER_TARGET,
            backfill_delay: BACKFILL_DELAY,
            schedule_interval: SCHEDULE_INTERVAL,
            model_timeout: MODEL_TIMEOUT,
            theme_mode: ThemeMode::default(),
            caption: true,
            history_size: MAX_RECENT_TOPICS,
        }
    }
}

impl PipelineConfig {
    /// Create a config storing artifacts under `gen_dir`.
    pub fn new(gen_dir: impl Into<PathBuf>) -> Self {
        Self {
            gen_dir: gen_dir.into(),
            ..Self::default()
        }
    }

    pub fn with_retention_cap(mut self, cap: usize) -> Self {
        self.retention_cap = cap;
        self
    }

    pub fn with_buffer_target(mut self, target: usize) -> Self {
        self.buffer_target = target;
        self
    }

    pub fn with_backfill_delay(mut self, delay: Duration) -> Self {
        self.backfill_delay = delay;
        self
    }

    pub fn with_schedule_interval(mut self, interval: Duration) -> Self {
        self.schedule_interval = interval;
        self
    }

    pub fn with_model_timeout(mut self, timeout: Duration) -> Self {
        self.model_timeout = timeout;
        self
    }

    pub fn with_theme_mode(mut self, mode: ThemeMode) -> Self {
        self.theme_mode = mode;
        self
    }

    pub fn with_caption(mut self, caption: bool) -> Self {
        self.caption = caption;
        self
    }

    pub fn with_history_size(mut self, size: usize) -> Self {
        self.history_size = size;
        self
    }
}
