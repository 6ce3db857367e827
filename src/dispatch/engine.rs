//! Dispatch engine — sequential, self-throttled bulk sending.
//!
//! One campaign sends one message per validated recipient, strictly one at a
//! time and in validator order, pausing a fixed delay between sends. Send
//! failures are recorded, never retried and never fatal. The only early
//! exits are the pre-flight checks and cooperative cancellation.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio_stream::wrappers::UnboundedReceiverStream;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::mailer::Mailer;
use super::message::{AttachmentPayload, EmailTemplate, OutgoingEmail};
use super::state::{CampaignState, StateTracker};
use crate::config::CampaignConfig;
use crate::error::CampaignError;
use crate::ingest::CanonicalTable;
use crate::report::{CampaignReport, CampaignSummary};
use crate::validate::{Recipient, validate_with_sample};

/// Per-recipient outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DispatchOutcome {
    Sent,
    Failed,
}

impl std::fmt::Display for DispatchOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sent => f.write_str("sent"),
            Self::Failed => f.write_str("failed"),
        }
    }
}

/// Record of one send attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatchResult {
    pub address: String,
    pub outcome: DispatchOutcome,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_detail: Option<String>,
    pub timestamp_utc: DateTime<Utc>,
}

/// Incremental progress after each processed recipient.
#[derive(Debug, Clone)]
pub struct Progress {
    pub processed: usize,
    pub total: usize,
    pub result: DispatchResult,
    /// Remaining time from the running average of per-item elapsed time.
    pub eta: Option<Duration>,
}

impl Progress {
    pub fn percent(&self) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        self.processed as f64 / self.total as f64 * 100.0
    }
}

/// Events streamed to an observer while a campaign runs.
#[derive(Debug, Clone)]
pub enum CampaignEvent {
    Started { campaign_id: Uuid, total: usize },
    Progress(Progress),
    Finished {
        campaign_id: Uuid,
        state: CampaignState,
        summary: CampaignSummary,
    },
}

/// Cooperative cancellation flag, checked between recipients.
#[derive(Debug, Clone, Default)]
pub struct CancelHandle(Arc<AtomicBool>);

impl CancelHandle {
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Everything a finished (or aborted) campaign produced.
#[derive(Debug, Clone)]
pub struct CampaignOutcome {
    pub campaign_id: Uuid,
    pub state: CampaignState,
    pub results: Vec<DispatchResult>,
    pub summary: CampaignSummary,
    /// Why the campaign stopped early, if it did.
    pub abort_reason: Option<CampaignError>,
    pub history: StateTracker,
    pub elapsed: Duration,
}

impl CampaignOutcome {
    pub fn report(&self) -> CampaignReport {
        CampaignReport::from_results(&self.results)
    }
}

/// A single bulk-send run over one mailer session.
pub struct Campaign {
    id: Uuid,
    mailer: Arc<dyn Mailer>,
    config: CampaignConfig,
    cancel: CancelHandle,
    events: Option<mpsc::UnboundedSender<CampaignEvent>>,
    tracker: StateTracker,
}

impl Campaign {
    pub fn new(mailer: Arc<dyn Mailer>, config: CampaignConfig) -> Self {
        Self {
            id: Uuid::new_v4(),
            mailer,
            config,
            cancel: CancelHandle::default(),
            events: None,
            tracker: StateTracker::new(),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn state(&self) -> CampaignState {
        self.tracker.state()
    }

    /// Handle that stops the run before its next send.
    pub fn cancel_handle(&self) -> CancelHandle {
        self.cancel.clone()
    }

    /// Stream of progress events for this campaign.
    pub fn subscribe(&mut self) -> UnboundedReceiverStream<CampaignEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.events = Some(tx);
        UnboundedReceiverStream::new(rx)
    }

    /// Validate `email_column` of `table` and send to every valid row.
    pub async fn run(
        self,
        table: &CanonicalTable,
        email_column: &str,
        template: &EmailTemplate,
        attachment: Option<&AttachmentPayload>,
    ) -> CampaignOutcome {
        let report = validate_with_sample(table, email_column, self.config.sample_size);
        self.run_recipients(&report.valid_recipients, email_column, template, attachment)
            .await
    }

    /// Send to an already validated recipient list.
    pub async fn run_recipients(
        mut self,
        recipients: &[Recipient],
        email_column: &str,
        template: &EmailTemplate,
        attachment: Option<&AttachmentPayload>,
    ) -> CampaignOutcome {
        let started = Instant::now();
        let total = recipients.len();

        info!(campaign_id = %self.id, recipients = total, "Starting campaign");

        if let Err(e) = self.mailer.verify_connection().await {
            warn!(campaign_id = %self.id, error = %e, "Mailer verification failed");
            return self.abort(CampaignError::AuthenticationFailed(e.to_string()), Vec::new(), started);
        }

        if recipients.is_empty() {
            return self.abort(
                CampaignError::NoValidRecipients {
                    column: email_column.to_string(),
                },
                Vec::new(),
                started,
            );
        }

        self.transition(CampaignState::Running, None);
        self.emit(CampaignEvent::Started {
            campaign_id: self.id,
            total,
        });

        let mut results = Vec::with_capacity(total);
        for (i, recipient) in recipients.iter().enumerate() {
            if self.cancel.is_cancelled() {
                info!(campaign_id = %self.id, processed = i, total, "Campaign cancelled");
                return self.abort(
                    CampaignError::Cancelled { processed: i, total },
                    results,
                    started,
                );
            }

            let result = self.send_one(recipient, template, attachment).await;
            results.push(result.clone());

            let processed = i + 1;
            let eta = estimate_remaining(started.elapsed(), processed, total);
            self.emit(CampaignEvent::Progress(Progress {
                processed,
                total,
                result,
                eta,
            }));

            if processed < total {
                tokio::time::sleep(self.config.send_delay).await;
            }
        }

        self.transition(CampaignState::Completed, None);
        let summary = CampaignSummary::from_results(&results);
        info!(
            campaign_id = %self.id,
            sent = summary.sent_count,
            failed = summary.failed_count,
            rate = summary.success_rate_percent(),
            "Campaign completed"
        );
        self.finish(results, summary, None, started)
    }

    async fn send_one(
        &self,
        recipient: &Recipient,
        template: &EmailTemplate,
        attachment: Option<&AttachmentPayload>,
    ) -> DispatchResult {
        let email = OutgoingEmail::compose(&recipient.address, template, attachment);
        match self.mailer.send(&email).await {
            Ok(()) => {
                debug!(to = %recipient.address, "Sent");
                DispatchResult {
                    address: recipient.address.clone(),
                    outcome: DispatchOutcome::Sent,
                    error_detail: None,
                    timestamp_utc: Utc::now(),
                }
            }
            Err(e) => {
                warn!(to = %recipient.address, error = %e, "Send failed");
                DispatchResult {
                    address: recipient.address.clone(),
                    outcome: DispatchOutcome::Failed,
                    error_detail: Some(e.to_string()),
                    timestamp_utc: Utc::now(),
                }
            }
        }
    }

    fn abort(
        mut self,
        reason: CampaignError,
        results: Vec<DispatchResult>,
        started: Instant,
    ) -> CampaignOutcome {
        self.transition(CampaignState::Aborted, Some(reason.to_string()));
        let mut summary = CampaignSummary::from_results(&results);
        summary.error_messages.push(reason.to_string());
        self.finish(results, summary, Some(reason), started)
    }

    fn finish(
        self,
        results: Vec<DispatchResult>,
        summary: CampaignSummary,
        abort_reason: Option<CampaignError>,
        started: Instant,
    ) -> CampaignOutcome {
        self.emit(CampaignEvent::Finished {
            campaign_id: self.id,
            state: self.tracker.state(),
            summary: summary.clone(),
        });
        CampaignOutcome {
            campaign_id: self.id,
            state: self.tracker.state(),
            results,
            summary,
            abort_reason,
            history: self.tracker,
            elapsed: started.elapsed(),
        }
    }

    fn transition(&mut self, to: CampaignState, reason: Option<String>) {
        // Every call site follows the Idle → Running → terminal order.
        if let Err(e) = self.tracker.transition_to(to, reason) {
            warn!(campaign_id = %self.id, error = %e, "Ignoring invalid state transition");
        }
    }

    fn emit(&self, event: CampaignEvent) {
        if let Some(tx) = &self.events {
            // Observer may have gone away.
            let _ = tx.send(event);
        }
    }
}

/// Remaining time from the average per-item time so far.
fn estimate_remaining(elapsed: Duration, processed: usize, total: usize) -> Option<Duration> {
    if processed == 0 || processed >= total {
        return None;
    }
    let per_item = elapsed / processed as u32;
    Some(per_item * (total - processed) as u32)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn eta_uses_running_average() {
        let eta = estimate_remaining(Duration::from_secs(4), 2, 5).unwrap();
        assert_eq!(eta, Duration::from_secs(6));
    }

    #[test]
    fn eta_is_none_when_done_or_not_started() {
        assert_eq!(estimate_remaining(Duration::from_secs(1), 0, 3), None);
        assert_eq!(estimate_remaining(Duration::from_secs(3), 3, 3), None);
    }

    #[test]
    fn progress_percent() {
        let progress = Progress {
            processed: 1,
            total: 4,
            result: DispatchResult {
                address: "a@x.com".into(),
                outcome: DispatchOutcome::Sent,
                error_detail: None,
                timestamp_utc: Utc::now(),
            },
            eta: None,
        };
        assert_eq!(progress.percent(), 25.0);
    }

    #[test]
    fn cancel_handle_is_shared() {
        let handle = CancelHandle::default();
        let clone = handle.clone();
        clone.cancel();
        assert!(handle.is_cancelled());
    }

    #[test]
    fn outcome_display() {
        assert_eq!(DispatchOutcome::Sent.to_string(), "sent");
        assert_eq!(DispatchOutcome::Failed.to_string(), "failed");
    }
}
