//! Pixel-art animation generator service.
//!
//! Keeps a rolling buffer of AI-written canvas animations on disk and serves
//! the gallery (listing, scripts, liveness) over HTTP while it generates.
//!
//! ```bash
//! ANTHROPIC_API_KEY=... cargo run -p pixelgen -- run
//! cargo run -p pixelgen -- list
//! ```

mod cli;
mod server;

use anyhow::{Context, Result};
use clap::Parser;
use claude::Claude;
use pixelgen_core::{ArtifactStore, BufferMaintainer, ClaudeModel, CycleOutcome, Gallery};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, EnvFilter};

use cli::{Cli, Command, PipelineArgs, ServeArgs};

fn init_tracing(verbose: u8) {
    let filter = match verbose {
        0 => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        1 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };
    fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Command::Run(serve) => run(&cli.pipeline, &serve).await,
        Command::Generate => generate(&cli.pipeline).await,
        Command::List => list(&cli.pipeline).await,
        Command::Status => status(&cli.pipeline).await,
    }
}

async fn build_maintainer(args: &PipelineArgs) -> Result<BufferMaintainer> {
    let config = args.pipeline_config();
    let client = Claude::from_env()
        .context("ANTHROPIC_API_KEY must be set (in the environment or a .env file)")?
        .with_timeout(config.model_timeout + Duration::from_secs(5));

    let topic_model = Arc::new(ClaudeModel::new(client.clone(), args.topic_model_config()));
    let script_model = Arc::new(ClaudeModel::new(client, args.script_model_config()));

    BufferMaintainer::from_config(&config, topic_model, script_model)
        .await
        .with_context(|| format!("opening {}", config.gen_dir.display()))
}

async fn open_store(args: &PipelineArgs) -> Result<ArtifactStore> {
    let config = args.pipeline_config();
    let store = ArtifactStore::open(&config.gen_dir)
        .await
        .with_context(|| format!("opening {}", config.gen_dir.display()))?;
    Ok(store.with_retention_cap(config.retention_cap))
}

async fn run(args: &PipelineArgs, serve: &ServeArgs) -> Result<()> {
    let config = args.pipeline_config();
    let maintainer = Arc::new(build_maintainer(args).await?);
    let listener = TcpListener::bind(serve.addr())
        .await
        .with_context(|| format!("binding {}", serve.addr()))?;
    info!(
        dir = %config.gen_dir.display(),
        target = config.buffer_target,
        interval_secs = config.schedule_interval.as_secs(),
        "pixel art generator started"
    );

    let (stop_server, server_stopped) = oneshot::channel::<()>();
    let server = tokio::spawn(server::serve(
        listener,
        Gallery::new(maintainer.store().clone()),
        async move {
            let _ = server_stopped.await;
        },
    ));

    let backfill = {
        let maintainer = maintainer.clone();
        let target = config.buffer_target;
        tokio::spawn(async move { maintainer.ensure_minimum_buffer(target).await })
    };

    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };
    maintainer
        .run_schedule(config.schedule_interval, shutdown)
        .await;

    backfill.abort();
    let _ = stop_server.send(());
    match server.await {
        Ok(result) => result.context("gallery server failed"),
        Err(e) => {
            error!(error = %e, "gallery server task panicked");
            Ok(())
        }
    }
}

async fn generate(args: &PipelineArgs) -> Result<()> {
    let maintainer = build_maintainer(args).await?;

    match maintainer.run_generation_cycle().await {
        CycleOutcome::Saved { artifact, topic } => {
            println!("{} ({})", artifact.id, topic.topic);
            Ok(())
        }
        CycleOutcome::Rejected { topic, reason } => {
            anyhow::bail!("generation for '{}' rejected: {reason}", topic.topic)
        }
        CycleOutcome::StorageFailed { topic, reason } => {
            anyhow::bail!("could not store script for '{}': {reason}", topic.topic)
        }
    }
}

async fn list(args: &PipelineArgs) -> Result<()> {
    let gallery = Gallery::new(open_store(args).await?);
    let response = gallery.list_available().await;
    println!("{}", response.to_json());

    if !response.is_success() {
        anyhow::bail!("listing failed with status {}", response.status);
    }
    Ok(())
}

async fn status(args: &PipelineArgs) -> Result<()> {
    let store = open_store(args).await?;
    let gallery = Gallery::new(store.clone());
    let count = store.count().await?;

    println!("{}", gallery.health());
    println!("directory: {}", store.dir().display());
    println!("artifacts: {count}/{}", store.retention_cap());
    if let Some(newest) = gallery.list_available().await.artifacts.first() {
        println!("newest:    {newest}");
    }
    Ok(())
}
