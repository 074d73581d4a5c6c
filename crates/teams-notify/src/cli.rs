use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// teams-notify – post workflow run status to a Microsoft Teams channel
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Activate verbose output (-v, -vv, etc.)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Sets a custom config file
    #[arg(short, long, value_name = "FILE", global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Build the card for this run and send it
    Send(SendArgs),
    /// Print build information
    Version {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

/// Action inputs. Each falls back to the `INPUT_<NAME>` variable GitHub
/// Actions sets for `with:` entries.
#[derive(Args, Debug, Default, Clone)]
pub struct SendArgs {
    /// Incoming webhook URL (MSTEAMS_WEBHOOK takes precedence)
    #[arg(long, env = "INPUT_WEBHOOK_URL", hide_env_values = true)]
    pub webhook_url: Option<String>,

    /// JSON of the `job` context
    #[arg(long, env = "INPUT_JOB")]
    pub job: Option<String>,

    /// JSON of the `steps` context
    #[arg(long, env = "INPUT_STEPS")]
    pub steps: Option<String>,

    /// JSON of the `needs` context
    #[arg(long, env = "INPUT_NEEDS")]
    pub needs: Option<String>,

    /// Card title
    #[arg(long, env = "INPUT_TITLE")]
    pub title: Option<String>,

    /// Comma-separated emails to mention
    #[arg(long, env = "INPUT_MSTEAMS_EMAILS")]
    pub msteams_emails: Option<String>,

    /// Pre-built card JSON, sent instead of the generated one
    #[arg(long, env = "INPUT_RAW")]
    pub raw: Option<String>,

    /// Build and print the card without sending it
    #[arg(
        long,
        env = "INPUT_DRY_RUN",
        value_name = "BOOL",
        num_args = 0..=1,
        default_missing_value = "true"
    )]
    pub dry_run: Option<String>,
}

impl SendArgs {
    /// Anything other than empty or `false` skips the send.
    pub fn is_dry_run(&self) -> bool {
        match self.dry_run.as_deref().map(str::trim) {
            None | Some("") | Some("false") => false,
            Some(_) => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn send_args(args: &[&str]) -> SendArgs {
        let cli = Cli::try_parse_from(["teams-notify", "send"].iter().chain(args)).unwrap();
        match cli.command {
            Commands::Send(args) => args,
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn dry_run_values() {
        assert!(!send_args(&[]).is_dry_run());
        assert!(send_args(&["--dry-run"]).is_dry_run());
        assert!(!send_args(&["--dry-run=false"]).is_dry_run());
        assert!(send_args(&["--dry-run=yes"]).is_dry_run());
    }

    #[test]
    fn parses_inputs() {
        let args = send_args(&["--title", "Test Title", "--needs", "{}"]);
        assert_eq!(args.title.as_deref(), Some("Test Title"));
        assert_eq!(args.needs.as_deref(), Some("{}"));
    }

    #[test]
    fn cli_is_well_formed() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
