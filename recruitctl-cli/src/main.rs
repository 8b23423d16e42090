//! recruitctl CLI - recruiting back office services and tools
//!
//! - `serve`: HTTP API over the Postgres store
//! - `worker`: coach sheet import worker
//! - `bot`: Discord invite matcher
//! - `import`: check a sheet offline and print the normalized rows
//! - `config`: manage `~/.recruitctl/config.toml`

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use recruitctl_core::RecruitConfig;

mod commands;
mod tracing_setup;

#[derive(Parser, Debug)]
#[command(
    name = "recruitctl",
    author,
    version,
    about = "Back office for an athletic recruiting agency",
    long_about = "Runs the recruiting API, the coach import worker and the Discord invite \
                  matcher, and checks import sheets offline."
)]
struct Cli {
    /// Debug logging (RUST_LOG still wins)
    #[arg(long, global = true)]
    debug: bool,

    /// Export traces over OTLP (needs the telemetry feature)
    #[arg(long, global = true)]
    otel: bool,

    /// Config file (default: ~/.recruitctl/config.toml)
    #[arg(long, global = true, env = "RECRUITCTL_CONFIG", value_name = "PATH")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the HTTP API server
    Serve(commands::serve::ServeArgs),
    /// Process pending coach import jobs
    Worker(commands::worker::WorkerArgs),
    /// Run the Discord invite matcher
    Bot(commands::bot::BotArgs),
    /// Normalize a CSV sheet and print the report (no database)
    Import(commands::import::ImportArgs),
    /// Manage recruitctl configuration (init, path, show)
    Config(commands::config::ConfigArgs),
    /// Generate shell completion scripts
    Completions(CompletionsArgs),
}

#[derive(Parser, Debug)]
struct CompletionsArgs {
    /// Shell to generate completions for
    #[arg(value_enum)]
    shell: Shell,
}

#[derive(ValueEnum, Debug, Clone, Copy)]
#[allow(clippy::enum_variant_names)] // PowerShell is a proper noun, not a suffix
enum Shell {
    Bash,
    Zsh,
    Fish,
    PowerShell,
    Elvish,
}

fn load_config(path: Option<&PathBuf>) -> Result<RecruitConfig> {
    let config = match path {
        Some(path) => RecruitConfig::load_from(path),
        None => RecruitConfig::load(),
    };
    config.context("Failed to load configuration")
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    tracing_setup::init(&tracing_setup::TracingConfig {
        debug: cli.debug,
        otel: cli.otel,
    })
    .ok();

    let result = match cli.command {
        Commands::Serve(args) => {
            let config = load_config(cli.config.as_ref())?;
            commands::serve::run_serve(args, config).await
        }
        Commands::Worker(args) => {
            let config = load_config(cli.config.as_ref())?;
            commands::worker::run_worker(args, config).await
        }
        Commands::Bot(args) => {
            let config = load_config(cli.config.as_ref())?;
            commands::bot::run_bot(args, config).await
        }
        Commands::Import(args) => commands::import::run_import(args),
        Commands::Config(args) => commands::config::run_config(args, cli.config),
        Commands::Completions(args) => run_completions(args),
    };

    tracing_setup::shutdown_otel();
    result
}

fn run_completions(args: CompletionsArgs) -> Result<()> {
    use clap::CommandFactory;
    use clap_complete::{generate, Shell as CompletionShell};
    use std::io;

    let mut cmd = Cli::command();
    let bin_name = cmd.get_name().to_string();

    let shell = match args.shell {
        Shell::Bash => CompletionShell::Bash,
        Shell::Zsh => CompletionShell::Zsh,
        Shell::Fish => CompletionShell::Fish,
        Shell::PowerShell => CompletionShell::PowerShell,
        Shell::Elvish => CompletionShell::Elvish,
    };

    generate(shell, &mut cmd, bin_name, &mut io::stdout());

    Ok(())
}
