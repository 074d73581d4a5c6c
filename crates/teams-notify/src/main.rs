use std::error::Error as StdError;

use clap::Parser;
use owo_colors::OwoColorize;
use tokio::runtime::Runtime;
use tracing_subscriber::EnvFilter;

use teams_notify::cli::{Cli, Commands};
use teams_notify::config::Config;
use teams_notify::notifier::Notifier;
use teams_notify::orchestrator::run_send;

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Err(err) = run(cli) {
        report_error(&err);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let rt = Runtime::new()?;
    rt.block_on(async {
        match cli.command {
            Commands::Send(args) => {
                let config = Config::load(cli.config.clone())?;
                let notifier = Notifier::http(config.timeout())?;
                run_send(&args, &config, |name| std::env::var(name).ok(), &notifier).await?;
            }
            Commands::Version { json } => {
                if json {
                    let info = serde_json::json!({
                        "version": env!("CARGO_PKG_VERSION"),
                        "commit": option_env!("GIT_SHA").unwrap_or("unknown"),
                        "build_date": option_env!("BUILD_DATE").unwrap_or("unknown"),
                    });
                    println!("{}", serde_json::to_string_pretty(&info)?);
                } else {
                    println!(
                        "teams-notify {} (commit: {}, built: {})",
                        env!("CARGO_PKG_VERSION"),
                        option_env!("GIT_SHA").unwrap_or("unknown"),
                        option_env!("BUILD_DATE").unwrap_or("unknown"),
                    );
                }
            }
        }
        Ok(())
    })
}

/// Logs go to stderr; stdout carries the card.
fn init_tracing(verbose: u8) {
    let default_level = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn report_error(err: &anyhow::Error) {
    // Workflow command: marks the step failed with the message as annotation.
    if std::env::var("GITHUB_ACTIONS").is_ok_and(|v| v == "true") {
        let message = format!("{err:#}")
            .replace('%', "%25")
            .replace('\r', "%0D")
            .replace('\n', "%0A");
        println!("::error::{message}");
        return;
    }

    eprintln!("{} {err}", "error:".red().bold());
    let mut source: Option<&dyn StdError> = err.source();
    while let Some(cause) = source {
        eprintln!("  caused by: {cause}");
        source = cause.source();
    }
}
