use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use carwatch::app;

#[derive(Parser, Debug)]
#[command(name = "carwatch")]
#[command(about = "Rate-limited telemetry poller for connected vehicles")]
struct Args {
    /// Path to the configuration file
    #[arg(short, long, default_value = "carwatch.toml")]
    config: PathBuf,

    /// Refresh every channel once, print the read model as JSON and exit
    #[arg(long)]
    once: bool,

    /// Export the read model to this file (overrides export.path)
    #[arg(short, long)]
    export: Option<PathBuf>,

    /// Log filter used when RUST_LOG is unset (e.g. "debug", "carwatch=trace")
    #[arg(long, default_value = "carwatch=info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&args.log_level))
        .context("invalid log filter")?;
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let app = app::from_config_file(&args.config, args.export)?;

    if args.once {
        let view = app.run_once().await;
        println!("{}", serde_json::to_string_pretty(&view)?);
        return Ok(());
    }

    app.run(async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %err, "cannot listen for ctrl-c");
        }
    })
    .await
}
