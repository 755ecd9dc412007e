use anyhow::Result;
use clap::Parser;
use scrumscribe::{
    app,
    cli::{handle_analyze_command, handle_export_command, Cli, CliCommand},
    config::Config,
};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let log_level = if cli.verbose { "debug" } else { "info" };
    let env_filter = EnvFilter::try_new(log_level).unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    match cli.command {
        Some(CliCommand::Version) => {
            println!("ScrumScribe {}", env!("CARGO_PKG_VERSION"));
            return Ok(());
        }
        Some(CliCommand::Analyze(args)) => {
            let config = Config::load()?;
            handle_analyze_command(args, &config).await?;
            return Ok(());
        }
        Some(CliCommand::Export(args)) => {
            let config = Config::load()?;
            handle_export_command(args, &config).await?;
            return Ok(());
        }
        None => {}
    }

    let config = Config::load()?;
    app::run_service(config).await
}
