use anyhow::{bail, Context, Result};
use serde_json::Value;
use tabled::settings::object::{Columns, Rows};
use tabled::settings::{Alignment, Modify, Padding, Style};
use tabled::{Table, Tabled};
use tracing::{debug, info};

use crate::cli::SendArgs;
use crate::config::Config;
use crate::context::{parse_context, WorkflowContext};
use crate::metadata::RunMetadata;
use crate::notifier::Notifier;
use crate::payload::{merge_raw, NotificationPayload, PayloadBuilder};

pub const MISSING_WEBHOOK_MESSAGE: &str = "Missing Microsoft Teams Incoming Webhooks URL.\n\
     Please configure \"MSTEAMS_WEBHOOK\" as environment variable or\n\
     specify the key called \"webhook_url\" in \"with\" section.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Sent,
    DryRun,
}

/// The document to send, plus the typed card when it was generated here.
#[derive(Debug)]
pub struct Prepared {
    pub payload: Value,
    pub card: Option<NotificationPayload>,
}

/// Build the card (or take the raw override) from the action inputs.
pub fn prepare(args: &SendArgs, config: &Config, metadata: &RunMetadata) -> Result<Prepared> {
    if let Some(raw) = non_blank(args.raw.clone()) {
        let payload = merge_raw(&raw).context("Parsing raw payload")?;
        return Ok(Prepared {
            payload,
            card: None,
        });
    }

    let job = parse_context("job", args.job.as_deref());
    let steps = parse_context("steps", args.steps.as_deref());
    let needs = parse_context("needs", args.needs.as_deref());
    debug!(%job, %steps, %needs, "Parsed contexts");

    let context = WorkflowContext::from_values(&job, &steps, &needs, metadata.job_name.as_deref())
        .with_title(non_blank(args.title.clone()).or_else(|| config.title.clone()))
        .with_mention_emails(
            non_blank(args.msteams_emails.clone()).or_else(|| config.msteams_emails.clone()),
        );

    let card = PayloadBuilder::new(metadata.clone()).build(&context);
    let payload = card.to_value().context("Serializing card")?;
    Ok(Prepared {
        payload,
        card: Some(card),
    })
}

/// Run the `send` command end to end.
pub async fn run_send<F>(
    args: &SendArgs,
    config: &Config,
    lookup: F,
    notifier: &Notifier,
) -> Result<Outcome>
where
    F: Fn(&str) -> Option<String>,
{
    let webhook_url = config.webhook_url(args.webhook_url.as_deref(), &lookup);
    if webhook_url.is_none() {
        bail!(MISSING_WEBHOOK_MESSAGE);
    }
    let dry_run = args.is_dry_run();

    info!(
        webhook_url = "***",
        title = ?args.title,
        msteams_emails = ?args.msteams_emails,
        raw = args.raw.is_some(),
        dry_run,
        "Parsed params"
    );

    let metadata = RunMetadata::from_env(&lookup);
    let prepared = prepare(args, config, &metadata)?;
    debug!(payload = %prepared.payload, "Generated payload for Microsoft Teams");
    print_summary(&prepared)?;

    if dry_run {
        info!("Dry run - skipping notification send. Done.");
        return Ok(Outcome::DryRun);
    }

    notifier
        .notify(webhook_url.as_deref(), Some(&prepared.payload))
        .await
        .context("Sending card to Microsoft Teams")?;
    info!("Sent message to Microsoft Teams");
    Ok(Outcome::Sent)
}

fn print_summary(prepared: &Prepared) -> Result<()> {
    if let Some(card) = &prepared.card {
        #[derive(Tabled)]
        struct Row {
            #[tabled(rename = "section")]
            section: &'static str,
            #[tabled(rename = "name")]
            name: String,
            #[tabled(rename = "status")]
            status: String,
        }

        let rows: Vec<Row> = card
            .sections
            .iter()
            .flat_map(|s| {
                s.facts.iter().map(move |f| Row {
                    section: s.kind.title(),
                    name: f.name.clone(),
                    status: f.value.lines().next().unwrap_or_default().trim_end().to_string(),
                })
            })
            .collect();

        if !rows.is_empty() {
            let mut table = Table::new(rows);
            table
                .with(Style::modern())
                .with(Modify::new(Columns::single(0)).with(Alignment::left()))
                .with(Modify::new(Rows::new(0..)).with(Padding::new(1, 1, 0, 0)));
            println!("{}", table);
        }
    }

    println!("{}", serde_json::to_string_pretty(&prepared.payload)?);
    Ok(())
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}
