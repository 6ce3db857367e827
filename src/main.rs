use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, bail};
use futures::StreamExt;

use contact_blast::classify::email_columns;
use contact_blast::config::{CampaignConfig, IngestConfig, SmtpConfig};
use contact_blast::dispatch::{
    AttachmentPayload, Campaign, CampaignEvent, EmailTemplate, Mailer, SmtpMailer,
};
use contact_blast::ingest::spreadsheet::SPREADSHEET_EXTENSIONS;
use contact_blast::ingest::{CanonicalTable, ContactSource, normalize_source, read_uri_list};
use contact_blast::validate::validate_with_sample;

const USAGE: &str = "usage: contact-blast <contacts.xlsx|urls.txt> <email-column> <attachment.txt|.pdf>";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Install rustls crypto provider before any TLS usage
    rustls::crypto::ring::default_provider()
        .install_default()
        .map_err(|_| anyhow::anyhow!("Failed to install rustls crypto provider"))?;

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let [source, email_column, attachment_path] = args.as_slice() else {
        bail!(USAGE);
    };

    let ingest_config = IngestConfig::from_env()?;
    let campaign_config = CampaignConfig::from_env()?;
    let smtp_config = SmtpConfig::from_env()?;

    eprintln!("📬 contact-blast v{}", env!("CARGO_PKG_VERSION"));
    eprintln!("   Source: {source}");
    eprintln!("   SMTP: {}:{}", smtp_config.host, smtp_config.port);
    eprintln!("   Send delay: {:?}", campaign_config.send_delay);

    // ── Ingestion ───────────────────────────────────────────────────────
    let table = load_table(Path::new(source), &ingest_config).await?;
    eprintln!(
        "   Contacts: {} rows, {} columns",
        table.len(),
        table.headers().len()
    );

    let suggested = email_columns(table.headers());
    if !suggested.is_empty() {
        eprintln!("   Suggested email columns: {}", suggested.join(", "));
    }

    let report = validate_with_sample(&table, email_column, campaign_config.sample_size);
    eprintln!(
        "   Valid recipients in {email_column:?}: {} of {} (e.g. {})",
        report.valid_count,
        report.total_rows,
        report.sample_addresses.join(", ")
    );

    // ── Message ─────────────────────────────────────────────────────────
    let attachment = AttachmentPayload::from_path(Path::new(attachment_path))?;
    let template = EmailTemplate {
        from_address: smtp_config.from_address.clone(),
        subject: std::env::var("CAMPAIGN_SUBJECT").context("CAMPAIGN_SUBJECT not set")?,
        body_text: load_body()?,
    };

    // ── Dispatch ────────────────────────────────────────────────────────
    let mailer: Arc<dyn Mailer> = Arc::new(SmtpMailer::new(&smtp_config)?);
    let mut campaign = Campaign::new(mailer, campaign_config);
    let mut events = campaign.subscribe();

    let cancel = campaign.cancel_handle();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            eprintln!("\n   Cancelling after the current send...");
            cancel.cancel();
        }
    });

    let printer = tokio::spawn(async move {
        while let Some(event) = events.next().await {
            match event {
                CampaignEvent::Started { total, .. } => {
                    eprintln!("   Sending to {total} recipients\n");
                }
                CampaignEvent::Progress(p) => {
                    let eta = p
                        .eta
                        .map(|d| format!(", ~{}m {}s left", d.as_secs() / 60, d.as_secs() % 60))
                        .unwrap_or_default();
                    eprintln!(
                        "   [{}/{}] {} {}{}",
                        p.processed, p.total, p.result.outcome, p.result.address, eta
                    );
                }
                CampaignEvent::Finished { state, .. } => {
                    eprintln!("\n   Campaign {state}");
                }
            }
        }
    });

    let outcome = campaign
        .run_recipients(&report.valid_recipients, email_column, &template, Some(&attachment))
        .await;
    printer.await.ok();

    eprintln!("   {}", outcome.summary.message());
    for error in &outcome.summary.error_messages {
        eprintln!("   - {error}");
    }

    if let Ok(path) = std::env::var("CAMPAIGN_REPORT_PATH") {
        let file = std::fs::File::create(&path).with_context(|| format!("creating {path}"))?;
        outcome.report().write_csv(file)?;
        eprintln!("   Report: {path}");
    }

    if !outcome.summary.success {
        std::process::exit(1);
    }
    Ok(())
}

/// Spreadsheet extensions go through the tabular path, anything else is
/// read as a list of source URLs.
async fn load_table(path: &Path, config: &IngestConfig) -> anyhow::Result<CanonicalTable> {
    let is_spreadsheet = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| SPREADSHEET_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()));

    let table = if is_spreadsheet {
        let file_name = path.file_name().and_then(|n| n.to_str()).unwrap_or_default();
        let bytes = std::fs::read(path).with_context(|| format!("reading {}", path.display()))?;
        normalize_source(ContactSource::Spreadsheet { file_name, bytes: &bytes }, config).await?
    } else {
        let uris = read_uri_list(path)?;
        normalize_source(ContactSource::Uris(&uris), config).await?
    };
    Ok(table)
}

fn load_body() -> anyhow::Result<String> {
    if let Ok(path) = std::env::var("CAMPAIGN_BODY_FILE") {
        let path = PathBuf::from(path);
        return std::fs::read_to_string(&path)
            .with_context(|| format!("reading {}", path.display()));
    }
    std::env::var("CAMPAIGN_BODY").context("set CAMPAIGN_BODY or CAMPAIGN_BODY_FILE")
}
