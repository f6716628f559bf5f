//! Captured message data structures

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A message captured by the SMTP sink
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    /// Unique identifier, assigned when the connection is accepted
    pub id: String,

    /// When the connection carrying this message was accepted
    #[serde(rename = "time")]
    pub received_at: DateTime<Utc>,

    /// String form of the client's network endpoint
    #[serde(rename = "srcIp")]
    pub source_addr: String,

    /// Authenticated username, empty until AUTH LOGIN succeeds
    pub user: String,

    /// Envelope sender from MAIL FROM
    pub from: String,

    /// Envelope recipients from RCPT TO, in command order
    pub rcpt: Vec<String>,

    /// Multipart boundary token discovered while capturing the body
    pub boundary: String,

    /// Full message text as transmitted, newline-joined
    pub data: String,
}

impl Message {
    /// Create a message shell for a freshly accepted connection
    pub fn new(source_addr: &str) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            received_at: Utc::now(),
            source_addr: source_addr.to_owned(),
            user: String::new(),
            from: String::new(),
            rcpt: Vec::new(),
            boundary: String::new(),
            data: String::new(),
        }
    }

    /// Check if this message was sent to a specific recipient
    pub fn has_recipient(&self, recipient: &str) -> bool {
        self.rcpt.iter().any(|addr| addr == recipient)
    }

    /// Get the size of the captured data in bytes
    pub fn data_size(&self) -> usize {
        self.data.len()
    }

    /// Get the subject line from the message headers (if present)
    pub fn subject(&self) -> Option<&str> {
        for line in self.data.lines() {
            if line.is_empty() {
                // End of headers
                break;
            }
            if let Some(subject) = line.strip_prefix("Subject: ") {
                return Some(subject);
            }
            if let Some(subject) = line.strip_prefix("subject: ") {
                return Some(subject);
            }
        }
        None
    }

    pub fn summary(&self) -> MessageSummary {
        MessageSummary {
            id: self.id.clone(),
            received_at: self.received_at,
            source_addr: self.source_addr.clone(),
            user: self.user.clone(),
            from: self.from.clone(),
            rcpt: self.rcpt.clone(),
            subject: self.subject().unwrap_or_default().to_owned(),
            boundary: self.boundary.clone(),
        }
    }
}

/// The listing view of a message: every field except the raw data
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageSummary {
    pub id: String,
    #[serde(rename = "time")]
    pub received_at: DateTime<Utc>,
    #[serde(rename = "srcIp")]
    pub source_addr: String,
    pub user: String,
    pub from: String,
    pub rcpt: Vec<String>,
    pub subject: String,
    pub boundary: String,
}
