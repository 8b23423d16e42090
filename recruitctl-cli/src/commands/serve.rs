//! HTTP server command

use std::net::SocketAddr;

use anyhow::{Context, Result};
use clap::Parser;
use recruitctl_core::RecruitConfig;
use recruitctl_server::{run_server, ServerConfig};
use tokio_util::sync::CancellationToken;

#[derive(Parser, Debug)]
pub struct ServeArgs {
    /// Address to bind to (default from config: 127.0.0.1:3030)
    #[arg(long, short = 'b')]
    pub bind: Option<SocketAddr>,

    /// Allow permissive CORS (all origins) - use with caution
    #[arg(long)]
    pub cors_permissive: bool,

    /// Database URL (overrides config/environment)
    #[arg(long, env = "DATABASE_URL")]
    pub database_url: Option<String>,

    /// Skip applying migrations on startup
    #[arg(long)]
    pub no_migrate: bool,
}

pub async fn run_serve(args: ServeArgs, mut config: RecruitConfig) -> Result<()> {
    let mut server = ServerConfig::try_from(&config.server).context("Invalid [server] config")?;
    if let Some(bind) = args.bind {
        server.bind_addr = bind;
    }
    server.cors_permissive |= args.cors_permissive;

    let pool = if args.no_migrate {
        super::connect(args.database_url, &mut config).await?
    } else {
        super::connect_and_migrate(args.database_url, &mut config).await?
    };

    tracing::info!("Starting recruitctl server on {}", server.bind_addr);
    run_server(pool, server, CancellationToken::new())
        .await
        .context("Server error")?;

    Ok(())
}
