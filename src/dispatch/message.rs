//! Message content for a campaign: template, attachment, composed email.

use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::CampaignError;

/// Upper bound on attachment size.
pub const MAX_ATTACHMENT_BYTES: usize = 5 * 1024 * 1024;

/// Fixed message content, identical for every recipient.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmailTemplate {
    pub from_address: String,
    pub subject: String,
    pub body_text: String,
}

/// Immutable attachment shared by every send of one campaign.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttachmentPayload {
    bytes: Arc<[u8]>,
    filename: String,
    content_type: String,
}

impl AttachmentPayload {
    pub fn new(
        bytes: impl Into<Arc<[u8]>>,
        filename: impl Into<String>,
        content_type: impl Into<String>,
    ) -> Self {
        Self {
            bytes: bytes.into(),
            filename: filename.into(),
            content_type: content_type.into(),
        }
    }

    /// Build a payload from a named upload, enforcing the size cap and the
    /// plain-text / PDF restriction. The content type follows the extension.
    pub fn from_upload(filename: &str, bytes: Vec<u8>) -> Result<Self, CampaignError> {
        if bytes.len() > MAX_ATTACHMENT_BYTES {
            return Err(CampaignError::InvalidAttachment(format!(
                "{filename} is {} bytes, limit is {MAX_ATTACHMENT_BYTES}",
                bytes.len()
            )));
        }
        let content_type = content_type_for(filename).ok_or_else(|| {
            CampaignError::InvalidAttachment(format!("{filename} must be a .txt or .pdf file"))
        })?;
        Ok(Self::new(bytes, filename, content_type))
    }

    /// Read an attachment from disk via [`from_upload`](Self::from_upload).
    pub fn from_path(path: &Path) -> Result<Self, CampaignError> {
        let filename = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| CampaignError::InvalidAttachment(format!("bad path {}", path.display())))?
            .to_string();
        let bytes = std::fs::read(path)
            .map_err(|e| CampaignError::InvalidAttachment(format!("{filename}: {e}")))?;
        Self::from_upload(&filename, bytes)
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn filename(&self) -> &str {
        &self.filename
    }

    pub fn content_type(&self) -> &str {
        &self.content_type
    }
}

fn content_type_for(filename: &str) -> Option<&'static str> {
    let (_, ext) = filename.rsplit_once('.')?;
    match ext.to_ascii_lowercase().as_str() {
        "txt" => Some("text/plain"),
        "pdf" => Some("application/pdf"),
        _ => None,
    }
}

/// One fully composed message, ready for a mailer.
#[derive(Debug, Clone)]
pub struct OutgoingEmail {
    pub to: String,
    pub from: String,
    pub subject: String,
    pub body_text: String,
    pub attachment: Option<AttachmentPayload>,
}

impl OutgoingEmail {
    /// Compose the campaign message for one recipient.
    pub fn compose(
        to: &str,
        template: &EmailTemplate,
        attachment: Option<&AttachmentPayload>,
    ) -> Self {
        Self {
            to: to.to_string(),
            from: template.from_address.clone(),
            subject: template.subject.clone(),
            body_text: template.body_text.clone(),
            attachment: attachment.cloned(),
        }
    }
}
