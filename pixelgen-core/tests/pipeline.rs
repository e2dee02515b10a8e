//! End-to-end scenarios for the generation pipeline.
//!
//! Everything runs against `MockModel` and a temporary directory, so these
//! tests need no API key and no network.

use pixelgen_core::testing::{assert_clean_script, set_modified, MockModel, StepClock, SAMPLE_SCRIPT};
use pixelgen_core::topic::{FALLBACK_TOPIC, GeneratedTopic};
use pixelgen_core::{
    ArtifactStore, BufferMaintainer, CycleOutcome, Gallery, PipelineConfig, ScriptGenerator,
    TopicGenerator, TopicHistory,
};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use tempfile::TempDir;

fn topic_model() -> MockModel {
    MockModel::new("topic").respond_with(|n| format!("slime number {n} in loot cave"))
}

fn code_model() -> MockModel {
    MockModel::new("code").respond_with(|_| SAMPLE_SCRIPT.to_string())
}

async fn build(temp: &TempDir, topics: MockModel, code: Arc<MockModel>) -> BufferMaintainer {
    let store = ArtifactStore::open(temp.path())
        .await
        .unwrap()
        .with_clock(Arc::new(StepClock::starting_at_millis(1_800_000_000_000)));
    BufferMaintainer::new(
        TopicGenerator::new(Arc::new(topics)),
        ScriptGenerator::new(code),
        store,
    )
    .with_rng(StdRng::seed_from_u64(2024))
    .with_backfill_delay(Duration::ZERO)
}

// =============================================================================
// Backfill from empty storage
// =============================================================================

#[tokio::test]
async fn test_backfill_from_empty_fills_buffer() {
    let temp = TempDir::new().unwrap();
    let m = build(&temp, topic_model(), Arc::new(code_model())).await;

    let report = m.ensure_minimum_buffer(20).await;

    assert_eq!(report.saved, 20);
    let ids = m.store().ids().await.unwrap();
    assert_eq!(ids.len(), 20);
    for id in &ids {
        let content = m.store().read(id).await.unwrap();
        assert_clean_script(&content);
    }
}

// =============================================================================
// Retention over a pre-populated directory
// =============================================================================

#[tokio::test]
async fn test_save_over_full_directory_evicts_six_oldest() {
    let temp = TempDir::new().unwrap();
    let now = SystemTime::now();
    for i in 1..=25u64 {
        let path = temp.path().join(format!("anim_{i}.js"));
        std::fs::write(&path, SAMPLE_SCRIPT).unwrap();
        set_modified(&path, now - Duration::from_secs(3_600 - i * 60)).unwrap();
    }
    let m = build(&temp, topic_model(), Arc::new(code_model())).await;

    let outcome = m.run_generation_cycle().await;
    let new_id = outcome.artifact().unwrap().id.clone();

    let ids = m.store().ids().await.unwrap();
    assert_eq!(ids.len(), 20);
    assert_eq!(ids[0], new_id);
    for i in 1..=6 {
        let evicted = format!("anim_{i}.js");
        assert!(!ids.contains(&evicted));
        assert!(!temp.path().join(&evicted).exists());
    }
    for i in 7..=25 {
        assert!(ids.contains(&format!("anim_{i}.js")));
    }
}

#[tokio::test]
async fn test_listing_never_exceeds_cap_after_save() {
    let temp = TempDir::new().unwrap();
    let m = build(&temp, topic_model(), Arc::new(code_model())).await;

    for _ in 0..30 {
        let outcome = m.run_generation_cycle().await;
        let ids = m.store().ids().await.unwrap();
        assert!(ids.len() <= 20);
        assert_eq!(&ids[0], &outcome.artifact().unwrap().id);
    }

    let report = m.store().enforce_retention(20).await.unwrap();
    assert!(report.deleted.is_empty());
}

// =============================================================================
// Sanitization and validation
// =============================================================================

#[tokio::test]
async fn test_fenced_output_is_stored_without_fences() {
    let temp = TempDir::new().unwrap();
    let code = Arc::new(
        MockModel::new("code").respond(format!("```javascript\n{SAMPLE_SCRIPT}\n```\n")),
    );
    let m = build(&temp, topic_model(), code).await;

    let outcome = m.run_generation_cycle().await;

    let id = &outcome.artifact().unwrap().id;
    let stored = m.store().read(id).await.unwrap();
    assert!(!stored.contains("```"));
    assert_eq!(stored, SAMPLE_SCRIPT);
}

#[tokio::test]
async fn test_rejected_generations_write_nothing() {
    let temp = TempDir::new().unwrap();
    let code = Arc::new(
        MockModel::new("code")
            .respond("```javascript\nconst draw = () => {};\n```")
            .fail("502 bad gateway")
            .respond("Here is your animation!"),
    );
    let m = build(&temp, topic_model(), code).await;

    for _ in 0..3 {
        let outcome = m.run_generation_cycle().await;
        assert!(matches!(outcome, CycleOutcome::Rejected { .. }));
    }

    assert_eq!(m.store().count().await.unwrap(), 0);
    assert_eq!(std::fs::read_dir(temp.path()).unwrap().count(), 0);
}

// =============================================================================
// Topic failure fallback
// =============================================================================

#[tokio::test]
async fn test_topic_failure_returns_fallback_and_keeps_history() {
    let topics = TopicGenerator::new(Arc::new(MockModel::new("topic").fail("network down")));
    let mut history = TopicHistory::new();
    for i in 0..10 {
        history.push(format!("earlier {i}"));
    }

    let generated = topics
        .generate(&mut history, &mut StdRng::seed_from_u64(0))
        .await;

    assert_eq!(generated, GeneratedTopic::fallback());
    assert_eq!(generated.topic, FALLBACK_TOPIC);
    assert_eq!(history.len(), 10);
}

// =============================================================================
// Gallery over a live buffer
// =============================================================================

#[tokio::test]
async fn test_gallery_sees_what_the_maintainer_saved() {
    let temp = TempDir::new().unwrap();
    let config = PipelineConfig::new(temp.path().join("gen"))
        .with_retention_cap(3)
        .with_backfill_delay(Duration::from_millis(5));
    let m = BufferMaintainer::from_config(
        &config,
        Arc::new(topic_model()),
        Arc::new(code_model()),
    )
    .await
    .unwrap();
    let gallery = Gallery::new(m.store().clone());

    m.ensure_minimum_buffer(5).await;

    let response = gallery.list_available().await;
    assert!(response.is_success());
    assert_eq!(response.artifacts.len(), 3);
    for id in &response.artifacts {
        assert_clean_script(&gallery.artifact(id).await.unwrap());
    }
}
