//! AI pixel-art animation pipeline with a rolling artifact buffer.
//!
//! This crate provides:
//! - Themed topic prompts with a bounded exclusion history
//! - Script generation against a fixed `draw(ctx, frame)` canvas contract
//! - A flat-directory artifact store with oldest-first retention
//! - Startup backfill and scheduled top-ups, serialized behind one gate
//! - A transport-agnostic gallery listing
//!
//! Generated scripts are never executed here. The viewer evaluates them on
//! the client, which is the trust boundary for AI-authored code.
//!
//! # Quick Start
//!
//! ```ignore
//! use pixelgen_core::{BufferMaintainer, ClaudeModel, ModelConfig, PipelineConfig};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = claude::Claude::from_env()?;
//!     let topics = Arc::new(ClaudeModel::new(client.clone(), ModelConfig::topic()));
//!     let scripts = Arc::new(ClaudeModel::new(client, ModelConfig::script()));
//!
//!     let config = PipelineConfig::new("public/gen");
//!     let maintainer = BufferMaintainer::from_config(&config, topics, scripts).await?;
//!
//!     maintainer.ensure_minimum_buffer(config.buffer_target).await;
//!     let shutdown = async {
//!         let _ = tokio::signal::ctrl_c().await;
//!     };
//!     maintainer.run_schedule(config.schedule_interval, shutdown).await;
//!     Ok(())
//! }
//! ```

pub mod buffer;
pub mod config;
pub mod gallery;
pub mod history;
pub mod model;
pub mod script;
pub mod store;
pub mod testing;
pub mod theme;
pub mod topic;

// Primary public API
pub use buffer::{BackfillReport, BufferMaintainer, CycleOutcome};
pub use config::PipelineConfig;
pub use gallery::{Gallery, GalleryResponse};
pub use history::TopicHistory;
pub use model::{ClaudeModel, ModelConfig, ModelError, TextModel};
pub use script::{Script, ScriptError, ScriptGenerator};
pub use store::{
    Artifact, ArtifactStore, ArtifactSummary, FileRemover, RetentionReport, StoreError,
};
pub use theme::{ThemeAxis, ThemeMode};
pub use topic::{GeneratedTopic, TopicGenerator};
