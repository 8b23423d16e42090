//! Discord invite matcher command

use anyhow::{Context, Result};
use clap::Parser;
use recruitctl_core::RecruitConfig;
use recruitctl_server::http::shutdown_signal;
use tokio_util::sync::CancellationToken;

#[derive(Parser, Debug)]
pub struct BotArgs {
    /// Database URL (overrides config/environment)
    #[arg(long, env = "DATABASE_URL")]
    pub database_url: Option<String>,

    /// Guild to watch (overrides DISCORD_GUILD_ID)
    #[arg(long)]
    pub guild_id: Option<String>,

    /// Seconds between member polls
    #[arg(long)]
    pub poll_interval: Option<u64>,
}

pub async fn run_bot(args: BotArgs, mut config: RecruitConfig) -> Result<()> {
    if args.guild_id.is_some() {
        config.discord.guild_id = args.guild_id;
    }
    if let Some(secs) = args.poll_interval {
        config.discord.poll_interval_secs = secs;
    }
    let pool = super::connect(args.database_url, &mut config).await?;

    let shutdown = CancellationToken::new();
    tokio::spawn(shutdown_signal(shutdown.clone()));
    recruitctl_bot::run_bot(&config, pool, shutdown)
        .await
        .context("Invite matcher failed")?;
    Ok(())
}
