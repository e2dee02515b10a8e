//! Testing utilities for the generation pipeline.
//!
//! This module provides tools for deterministic tests without API calls:
//! - `MockModel`, a scripted [`TextModel`] that records every prompt
//! - `StepClock`, a [`Clock`] that advances a fixed step per reading
//! - `FailingRemover`, a [`FileRemover`] that refuses to delete chosen files
//! - Sample scripts and small filesystem helpers

use crate::model::{ModelError, TextModel};
use crate::script::Script;
use crate::store::{Clock, FileRemover, FsRemover};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::{HashSet, VecDeque};
use std::path::Path;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Mutex;
use std::time::{Duration, SystemTime};

/// A minimal script that passes entry-point validation.
pub const SAMPLE_SCRIPT: &str = "function draw(ctx, frame) {\n  \
    ctx.fillStyle = '#000';\n  \
    ctx.fillRect(0, 0, 192, 108);\n  \
    ctx.fillStyle = '#ff0';\n  \
    ctx.fillRect(frame % 192, 50, 4, 4);\n\
}";

/// A scripted reply from the mock model.
#[derive(Debug, Clone)]
pub enum MockReply {
    Text(String),
    Fail(String),
}

type ReplyFn = Box<dyn Fn(usize) -> String + Send + Sync>;

/// A model that returns scripted replies in order.
///
/// Once the queue is empty it falls back to the `respond_with` generator if
/// one is set, and otherwise fails every call.
pub struct MockModel {
    name: String,
    replies: Mutex<VecDeque<MockReply>>,
    generator: Option<ReplyFn>,
    prompts: Mutex<Vec<String>>,
    delay: Option<Duration>,
}

impl MockModel {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            replies: Mutex::new(VecDeque::new()),
            generator: None,
            prompts: Mutex::new(Vec::new()),
            delay: None,
        }
    }

    /// Queue a successful reply.
    pub fn respond(self, text: impl Into<String>) -> Self {
        self.queue(MockReply::Text(text.into()))
    }

    /// Queue a failed call.
    pub fn fail(self, message: impl Into<String>) -> Self {
        self.queue(MockReply::Fail(message.into()))
    }

    /// Answer calls past the queue with `f(call_index)`.
    pub fn respond_with(mut self, f: impl Fn(usize) -> String + Send + Sync + 'static) -> Self {
        self.generator = Some(Box::new(f));
        self
    }

    /// Sleep before answering each call.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    fn queue(self, reply: MockReply) -> Self {
        lock(&self.replies).push_back(reply);
        self
    }

    /// Every prompt received, in call order.
    pub fn prompts(&self) -> Vec<String> {
        lock(&self.prompts).clone()
    }

    pub fn call_count(&self) -> usize {
        lock(&self.prompts).len()
    }
}

#[async_trait]
impl TextModel for MockModel {
    async fn generate(&self, prompt: &str) -> Result<String, ModelError> {
        let index = {
            let mut prompts = lock(&self.prompts);
            prompts.push(prompt.to_string());
            prompts.len() - 1
        };

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let scripted = lock(&self.replies).pop_front();
        match scripted {
            Some(MockReply::Text(text)) => Ok(text),
            Some(MockReply::Fail(message)) => Err(ModelError::Unavailable(message)),
            None => match &self.generator {
                Some(f) => Ok(f(index)),
                None => Err(ModelError::Unavailable(
                    "no scripted response left".to_string(),
                )),
            },
        }
    }

    fn name(&self) -> &str {
        &self.name
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// A clock that advances by a fixed step every time it is read.
pub struct StepClock {
    next_millis: AtomicI64,
    step_millis: i64,
}

impl StepClock {
    /// Start at `millis`, advancing one second per reading.
    pub fn starting_at_millis(millis: i64) -> Self {
        Self::with_step(millis, 1_000)
    }

    /// Always report `millis`.
    pub fn frozen_at_millis(millis: i64) -> Self {
        Self::with_step(millis, 0)
    }

    pub fn with_step(start_millis: i64, step_millis: i64) -> Self {
        Self {
            next_millis: AtomicI64::new(start_millis),
            step_millis,
        }
    }
}

impl Clock for StepClock {
    fn now(&self) -> DateTime<Utc> {
        let millis = self.next_millis.fetch_add(self.step_millis, Ordering::SeqCst);
        DateTime::from_timestamp_millis(millis).unwrap_or_default()
    }
}

/// Deletes like [`FsRemover`], except for the named files, which fail with
/// `PermissionDenied` and stay on disk.
pub struct FailingRemover {
    stuck: HashSet<String>,
}

impl FailingRemover {
    pub fn new(ids: impl IntoIterator<Item = String>) -> Self {
        Self {
            stuck: ids.into_iter().collect(),
        }
    }
}

#[async_trait]
impl FileRemover for FailingRemover {
    async fn remove(&self, path: &Path) -> std::io::Result<()> {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        if self.stuck.contains(&name) {
            return Err(std::io::Error::new(
                std::io::ErrorKind::PermissionDenied,
                format!("{name} is locked"),
            ));
        }
        FsRemover.remove(path).await
    }
}

/// A valid script, distinguishable by `n`.
pub fn sample_script(n: usize) -> Script {
    Script::new(format!("// sample {n}\n{SAMPLE_SCRIPT}"))
        .expect("sample script declares the draw entry point")
}

/// Set a file's modification time.
pub fn set_modified(path: impl AsRef<Path>, time: SystemTime) -> std::io::Result<()> {
    std::fs::File::options()
        .write(true)
        .open(path)?
        .set_modified(time)
}

/// Assert that script text is free of markdown fences and declares `draw`.
#[track_caller]
pub fn assert_clean_script(content: &str) {
    assert!(
        !content.contains("```"),
        "Expected no markdown fences in:\n{content}"
    );
    assert!(
        content.contains(crate::script::ENTRY_POINT_MARKER),
        "Expected a draw entry point in:\n{content}"
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_model_replays_in_order() {
        let model = MockModel::new("mock").respond("one").fail("boom").respond("two");

        assert_eq!(model.generate("a").await.unwrap(), "one");
        assert!(matches!(
            model.generate("b").await,
            Err(ModelError::Unavailable(m)) if m == "boom"
        ));
        assert_eq!(model.generate("c").await.unwrap(), "two");
        assert!(model.generate("d").await.is_err());

        assert_eq!(model.prompts(), vec!["a", "b", "c", "d"]);
    }

    #[tokio::test]
    async fn test_mock_model_generator_after_queue() {
        let model = MockModel::new("mock")
            .respond("scripted")
            .respond_with(|n| format!("generated {n}"));

        assert_eq!(model.generate("x").await.unwrap(), "scripted");
        assert_eq!(model.generate("y").await.unwrap(), "generated 1");
        assert_eq!(model.call_count(), 2);
    }

    #[test]
    fn test_step_clock() {
        let clock = StepClock::with_step(1_000, 5);
        assert_eq!(clock.now().timestamp_millis(), 1_000);
        assert_eq!(clock.now().timestamp_millis(), 1_005);

        let frozen = StepClock::frozen_at_millis(7);
        assert_eq!(frozen.now(), frozen.now());
    }

    #[test]
    fn test_sample_scripts_differ() {
        assert_ne!(sample_script(1), sample_script(2));
        assert_clean_script(sample_script(3).content());
    }
}
