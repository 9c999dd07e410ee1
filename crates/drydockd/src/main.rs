use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use drydock_core::config::split_command;
use drydock_core::{notifier_from_token, CiConfig, Pipeline, ProcessRunner};
use drydock_store::{BuildLedger, FsBuildHistory};

pub mod api;

/// Minimal continuous-integration server: listens for push webhooks,
/// builds and tests each pushed commit, and reports the commit status.
#[derive(Parser, Debug)]
#[command(name = "drydockd", version)]
struct Args {
    /// Address to listen on
    #[arg(long)]
    bind_addr: Option<String>,

    /// Base directory for per-commit build workspaces
    #[arg(long)]
    workspace_dir: Option<PathBuf>,

    /// Directory holding build history records
    #[arg(long)]
    history_dir: Option<PathBuf>,

    /// Compile command (whitespace-separated)
    #[arg(long)]
    compile_cmd: Option<String>,

    /// Test command (whitespace-separated)
    #[arg(long)]
    test_cmd: Option<String>,
}

impl Args {
    /// Resolve configuration once: environment first, CLI flags win.
    fn into_config(self) -> CiConfig {
        let mut config = CiConfig::from_env();
        if let Some(bind_addr) = self.bind_addr {
            config.bind_addr = bind_addr;
        }
        if let Some(workspace_dir) = self.workspace_dir {
            config.workspace_dir = workspace_dir;
        }
        if let Some(history_dir) = self.history_dir {
            config.history_dir = history_dir;
        }
        if let Some(compile_cmd) = self.compile_cmd {
            config.compile_command = split_command(&compile_cmd);
        }
        if let Some(test_cmd) = self.test_cmd {
            config.test_command = split_command(&test_cmd);
        }
        config
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "drydockd=info,drydock_core=info,drydock_store=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Args::parse().into_config();

    let runner = Arc::new(ProcessRunner::with_timeout(config.command_timeout));
    let notifier = notifier_from_token(config.github_token.as_deref());
    if !notifier.is_live() {
        tracing::warn!("GITHUB_TOKEN not set, commit statuses stay in memory");
    }

    let history: Arc<dyn BuildLedger> = Arc::new(FsBuildHistory::new(&config.history_dir)?);
    let pipeline = Arc::new(Pipeline::from_config(
        &config,
        runner,
        notifier,
        history.clone(),
    ));

    let app = api::create_router(api::AppState { pipeline, history });

    tracing::info!(addr = %config.bind_addr, "drydockd listening");
    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
