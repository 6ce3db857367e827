//! Campaign result reporter — summary statistics and an exportable table.

use std::io::Write;

use serde::Serialize;

use crate::dispatch::{DispatchOutcome, DispatchResult};
use crate::error::ReportError;

/// Aggregate counts for one campaign.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CampaignSummary {
    pub sent_count: usize,
    pub failed_count: usize,
    pub total_count: usize,
    /// Per-recipient failures and abort reasons, in order.
    pub error_messages: Vec<String>,
    /// True when at least one message went out.
    pub success: bool,
}

impl CampaignSummary {
    /// Aggregate a result sequence.
    pub fn from_results(results: &[DispatchResult]) -> Self {
        let mut summary = Self::default();
        for result in results {
            match result.outcome {
                DispatchOutcome::Sent => summary.sent_count += 1,
                DispatchOutcome::Failed => {
                    summary.failed_count += 1;
                    summary.error_messages.push(format!(
                        "Failed to send to {}: {}",
                        result.address,
                        result.error_detail.as_deref().unwrap_or("unknown error")
                    ));
                }
            }
        }
        summary.total_count = summary.sent_count + summary.failed_count;
        summary.success = summary.sent_count > 0;
        summary
    }

    /// `round(sent / (sent + failed) * 100)`, or 0 when nothing was attempted.
    pub fn success_rate_percent(&self) -> u8 {
        let attempted = self.sent_count + self.failed_count;
        if attempted == 0 {
            return 0;
        }
        ((self.sent_count as f64 / attempted as f64) * 100.0).round() as u8
    }

    /// One-line human summary.
    pub fn message(&self) -> String {
        if self.success {
            format!(
                "Successfully sent {} emails ({}% success rate)",
                self.sent_count,
                self.success_rate_percent()
            )
        } else {
            format!("Failed to send emails. {} failures.", self.failed_count)
        }
    }
}

/// One exported line per dispatch result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReportRow {
    pub address: String,
    pub outcome: String,
    pub error: String,
    pub timestamp: String,
}

impl From<&DispatchResult> for ReportRow {
    fn from(result: &DispatchResult) -> Self {
        Self {
            address: result.address.clone(),
            outcome: result.outcome.to_string(),
            error: result.error_detail.clone().unwrap_or_default(),
            timestamp: result.timestamp_utc.to_rfc3339(),
        }
    }
}

/// Summary plus the row-per-result table, for offline inspection.
#[derive(Debug, Clone, Serialize)]
pub struct CampaignReport {
    pub summary: CampaignSummary,
    pub success_rate_percent: u8,
    pub rows: Vec<ReportRow>,
}

impl CampaignReport {
    pub fn from_results(results: &[DispatchResult]) -> Self {
        let summary = CampaignSummary::from_results(results);
        Self {
            success_rate_percent: summary.success_rate_percent(),
            summary,
            rows: results.iter().map(ReportRow::from).collect(),
        }
    }

    /// Write the table as CSV with an `Email,Status,Error,Timestamp` header.
    pub fn write_csv<W: Write>(&self, writer: W) -> Result<(), ReportError> {
        let mut csv = csv::WriterBuilder::new()
            .quote_style(csv::QuoteStyle::Always)
            .from_writer(writer);
        csv.write_record(["Email", "Status", "Error", "Timestamp"])?;
        for row in &self.rows {
            csv.write_record([&row.address, &row.outcome, &row.error, &row.timestamp])?;
        }
        csv.flush()?;
        Ok(())
    }

    pub fn to_csv_string(&self) -> Result<String, ReportError> {
        let mut buf = Vec::new();
        self.write_csv(&mut buf)?;
        Ok(String::from_utf8_lossy(&buf).into_owned())
    }

    pub fn to_json(&self) -> Result<String, ReportError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
