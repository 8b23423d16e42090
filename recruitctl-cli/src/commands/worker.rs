//! Coach import worker command

use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use recruitctl_core::RecruitConfig;
use recruitctl_server::http::shutdown_signal;
use recruitctl_server::ImportWorker;
use tokio_util::sync::CancellationToken;

#[derive(Parser, Debug)]
pub struct WorkerArgs {
    /// Database URL (overrides config/environment)
    #[arg(long, env = "DATABASE_URL")]
    pub database_url: Option<String>,

    /// Seconds between polls when the queue is empty
    #[arg(long)]
    pub poll_interval: Option<u64>,

    /// Process pending jobs, then exit
    #[arg(long)]
    pub once: bool,
}

pub async fn run_worker(args: WorkerArgs, mut config: RecruitConfig) -> Result<()> {
    let pool = super::connect_and_migrate(args.database_url, &mut config).await?;
    let interval = args
        .poll_interval
        .unwrap_or(config.worker.poll_interval_secs)
        .max(1);
    let worker = ImportWorker::new(pool, Duration::from_secs(interval));

    if args.once {
        let mut processed = 0usize;
        while let Some(outcome) = worker.run_once().await? {
            processed += 1;
            println!("{}", serde_json::json!({
                "jobId": outcome.job_id,
                "status": outcome.status,
                "successRows": outcome.progress.success_rows,
                "errorRows": outcome.progress.error_rows,
            }));
        }
        tracing::info!(processed, "import queue drained");
        return Ok(());
    }

    let shutdown = CancellationToken::new();
    tokio::spawn(shutdown_signal(shutdown.clone()));
    worker.run(shutdown).await;
    Ok(())
}
