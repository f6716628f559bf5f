//! SMTP session state management

use std::sync::LazyLock;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use regex::Regex;

use crate::message::Message;
use crate::smtp::error::SmtpError;

static MULTIPART_HEADER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^Content-Type: multipart/[[:alpha:]]+; boundary=")
        .unwrap_or_else(|e| panic!("invalid multipart header pattern: {e}"))
});

/// Represents the current state of an SMTP session
#[derive(Debug, Clone, PartialEq)]
pub enum SessionState {
    /// Connection accepted, greeting sent, no EHLO yet
    Start,
    /// Ready for the next command
    Idle,
    /// AUTH LOGIN issued, waiting for the base64 username
    AuthUsername,
    /// Username received, waiting for the (ignored) password
    AuthPassword,
    /// DATA acknowledged, accumulating message lines
    Capturing,
    /// QUIT received or a violation ended the session
    Terminated,
}

/// Per-connection state: one in-progress message built command by command
#[derive(Debug)]
pub struct Session {
    /// Current state of the session
    pub state: SessionState,
    /// The message under construction
    pub message: Message,
    /// Whether an AUTH LOGIN exchange has completed
    pub authenticated: bool,
    /// Line accumulator for the capture phase
    buffer: String,
}

impl Session {
    /// Create a session for a freshly accepted connection
    pub fn new(source_addr: &str) -> Self {
        Self {
            state: SessionState::Start,
            message: Message::new(source_addr),
            authenticated: false,
            buffer: String::new(),
        }
    }

    /// Record that the client has introduced itself
    pub fn greet(&mut self) {
        self.state = SessionState::Idle;
    }

    /// Enter the AUTH LOGIN exchange
    pub fn begin_auth(&mut self) {
        self.state = SessionState::AuthUsername;
    }

    /// Decode the base64 username response of an AUTH LOGIN exchange
    pub fn accept_username(&mut self, line: &str) -> Result<(), SmtpError> {
        let decoded = BASE64
            .decode(line.trim())
            .map_err(|_| SmtpError::InvalidBase64)?;
        self.message.user = String::from_utf8_lossy(&decoded).into_owned();
        self.state = SessionState::AuthPassword;
        Ok(())
    }

    /// Consume the password response. The content is discarded: the sink
    /// never verifies credentials, authentication is only a gate.
    pub fn accept_password(&mut self, _line: &str) {
        self.authenticated = true;
        self.state = SessionState::Idle;
    }

    /// Set the envelope sender. A repeated MAIL FROM overwrites.
    pub fn set_sender(&mut self, addr: &str) {
        self.message.from = addr.to_owned();
    }

    /// Append an envelope recipient
    pub fn add_recipient(&mut self, addr: &str) {
        self.message.rcpt.push(addr.to_owned());
    }

    /// Enter the capture phase
    pub fn start_capture(&mut self) {
        self.buffer.clear();
        self.state = SessionState::Capturing;
    }

    /// Accumulate one line of message data, sniffing the multipart
    /// boundary from the first matching Content-Type header
    pub fn capture_line(&mut self, line: &str) {
        if self.message.boundary.is_empty()
            && MULTIPART_HEADER.is_match(line)
            && let Some((_, token)) = line.split_once("boundary=")
        {
            self.message.boundary = token.replace('"', "");
        }
        self.buffer.push_str(line);
        self.buffer.push('\n');
    }

    /// Seal the accumulated buffer into the message and hand back the
    /// finished copy. The session returns to Idle.
    pub fn finish_capture(&mut self) -> Message {
        self.message.data = std::mem::take(&mut self.buffer);
        self.state = SessionState::Idle;
        self.message.clone()
    }

    /// End the session
    pub fn terminate(&mut self) {
        self.state = SessionState::Terminated;
    }
}
