//! Command-line arguments.
//!
//! Every setting can also come from a `PIXELGEN_*` environment variable,
//! which is how the `.env` file feeds in.

use clap::{Args, Parser, Subcommand};
use pixelgen_core::{ModelConfig, PipelineConfig, ThemeMode};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Parser)]
#[command(
    name = "pixelgen",
    version,
    about = "Rolling gallery of AI-generated pixel-art animations"
)]
pub struct Cli {
    /// Increase verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(flatten)]
    pub pipeline: PipelineArgs,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Serve the gallery, fill the buffer, then generate on a schedule until Ctrl-C
    Run(ServeArgs),
    /// Run a single generation cycle
    Generate,
    /// Print the gallery listing as JSON
    List,
    /// Print liveness and buffer state
    Status,
}

#[derive(Args)]
pub struct ServeArgs {
    /// Address the gallery listens on
    #[arg(long, env = "PIXELGEN_HOST", default_value_t = IpAddr::V4(Ipv4Addr::UNSPECIFIED))]
    pub host: IpAddr,

    /// Port the gallery listens on
    #[arg(long, env = "PIXELGEN_PORT", default_value_t = 8080)]
    pub port: u16,
}

impl ServeArgs {
    pub fn addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

#[derive(Args)]
pub struct PipelineArgs {
    /// Directory holding generated scripts
    #[arg(long, global = true, env = "PIXELGEN_GEN_DIR", default_value = "public/gen")]
    pub gen_dir: PathBuf,

    /// Model for topic prompts
    #[arg(long, global = true, env = "PIXELGEN_TOPIC_MODEL")]
    pub topic_model: Option<String>,

    /// Model for script generation (defaults to the topic model)
    #[arg(long, global = true, env = "PIXELGEN_SCRIPT_MODEL")]
    pub script_model: Option<String>,

    /// Artifacts kept on disk
    #[arg(long, global = true, env = "PIXELGEN_RETENTION_CAP", default_value_t = 20)]
    pub retention_cap: usize,

    /// Artifact count the startup backfill fills up to
    #[arg(long, global = true, env = "PIXELGEN_BUFFER_TARGET", default_value_t = 20)]
    pub buffer_target: usize,

    /// Seconds between scheduled generations
    #[arg(long, global = true, env = "PIXELGEN_INTERVAL_SECS", default_value_t = 300)]
    pub interval_secs: u64,

    /// Pause after each backfill generation, in milliseconds
    #[arg(long, global = true, env = "PIXELGEN_BACKFILL_DELAY_MS", default_value_t = 2000)]
    pub backfill_delay_ms: u64,

    /// Deadline for each model call, in seconds
    #[arg(long, global = true, env = "PIXELGEN_MODEL_TIMEOUT_SECS", default_value_t = 90)]
    pub model_timeout_secs: u64,

    /// Sample a single theme axis instead of style plus one other
    #[arg(long, global = true, env = "PIXELGEN_SINGLE_AXIS")]
    pub single_axis: bool,

    /// Don't ask for the topic caption on the canvas
    #[arg(long, global = true, env = "PIXELGEN_NO_CAPTION")]
    pub no_caption: bool,
}

impl PipelineArgs {
    pub fn pipeline_config(&self) -> PipelineConfig {
        let theme_mode = if self.single_axis {
            ThemeMode::SingleAxis
        } else {
            ThemeMode::StylePlusSecondary
        };

        PipelineConfig::new(&self.gen_dir)
            .with_retention_cap(self.retention_cap)
            .with_buffer_target(self.buffer_target)
            .with_schedule_interval(Duration::from_secs(self.interval_secs.max(1)))
            .with_backfill_delay(Duration::from_millis(self.backfill_delay_ms))
            .with_model_timeout(Duration::from_secs(self.model_timeout_secs.max(1)))
            .with_theme_mode(theme_mode)
            .with_caption(!self.no_caption)
    }

    pub fn topic_model_config(&self) -> ModelConfig {
        let config = ModelConfig::topic();
        match &self.topic_model {
            Some(model) => config.with_model(model),
            None => config,
        }
    }

    pub fn script_model_config(&self) -> ModelConfig {
        let config = ModelConfig::script();
        match self.script_model.as_ref().or(self.topic_model.as_ref()) {
            Some(model) => config.with_model(model),
            None => config,
        }
    }
}
