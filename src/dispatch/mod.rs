//! Bulk dispatch: campaign state machine, mailer capability, send loop.

pub mod engine;
pub mod mailer;
pub mod message;
pub mod state;

pub use engine::{
    Campaign, CampaignEvent, CampaignOutcome, CancelHandle, DispatchOutcome, DispatchResult,
    Progress,
};
pub use mailer::{Mailer, SmtpMailer};
pub use message::{AttachmentPayload, EmailTemplate, OutgoingEmail};
pub use state::{CampaignState, StateTracker};
