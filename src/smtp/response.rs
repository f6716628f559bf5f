//! SMTP response handling

/// Represents an SMTP response that can be sent to a client
#[derive(Debug, Clone)]
pub struct SmtpResponse {
    /// The SMTP response code (e.g., "250", "354", "535")
    pub code: String,
    /// The human-readable message
    pub message: String,
    /// Optional multiline messages for EHLO responses
    pub multiline: Option<Vec<String>>,
}

impl SmtpResponse {
    /// Create a new SMTP response
    pub fn new(code: &str, message: &str) -> Self {
        Self {
            code: code.to_string(),
            message: message.to_string(),
            multiline: None,
        }
    }

    /// Create a new multiline SMTP response
    pub fn new_multiline(code: &str, message: &str, lines: Vec<String>) -> Self {
        Self {
            code: code.to_owned(),
            message: message.to_owned(),
            multiline: Some(lines),
        }
    }

    /// Create a greeting response (220)
    pub fn greeting(hostname: &str) -> Self {
        Self::new("220", &format!("{hostname} mailsink service"))
    }

    /// Create an EHLO response (250) advertising the AUTH capability
    pub fn ehlo_with_auth(hostname: &str) -> Self {
        Self::new_multiline("250", hostname, vec!["AUTH PLAIN LOGIN".to_owned()])
    }

    /// Create an EHLO response (250) when authentication is disabled
    pub fn ehlo(hostname: &str) -> Self {
        Self::new("250", &format!("{hostname} Authentication disabled"))
    }

    /// Create a success response (250 2.1.0 OK)
    pub fn ok() -> Self {
        Self::new("250", "2.1.0 OK")
    }

    /// Create the base64 "Username:" challenge (334)
    pub fn username_challenge() -> Self {
        Self::new("334", "VXNlcm5hbWU6")
    }

    /// Create the base64 "Password:" challenge (334)
    pub fn password_challenge() -> Self {
        Self::new("334", "UGFzc3dvcmQ6")
    }

    /// Create an authentication success response (235)
    pub fn auth_ok() -> Self {
        Self::new("235", "Authentication succeeded")
    }

    /// Create a DATA intermediate response (354)
    pub fn data_start() -> Self {
        Self::new("354", "Start mail input; end with <CRLF>.<CRLF>")
    }

    /// Create the queued-confirmation response carrying the message id (250)
    pub fn queued(id: &str) -> Self {
        Self::new("250", &format!("2.0.0 Ok: queued as {id}"))
    }

    /// Create a QUIT response (221)
    pub fn quit() -> Self {
        Self::new("221", "2.0.0 Bye")
    }

    /// Create a too-many-connections response (421)
    pub fn too_busy(hostname: &str) -> Self {
        Self::new("421", &format!("{hostname} Too many connections"))
    }

    /// Create an error response
    pub fn error(code: &str, message: &str) -> Self {
        Self::new(code, message)
    }

    /// Format the response for sending over the wire
    pub fn format(&self) -> String {
        if let Some(ref lines) = self.multiline {
            let mut result = format!("{}-{}\r\n", self.code, self.message);
            for (i, line) in lines.iter().enumerate() {
                if i == lines.len() - 1 {
                    // Last line uses space instead of dash
                    result.push_str(&format!("{} {}\r\n", self.code, line));
                } else {
                    result.push_str(&format!("{}-{}\r\n", self.code, line));
                }
            }
            result
        } else {
            format!("{} {}\r\n", self.code, self.message)
        }
    }

    /// Check if this is a success response (2xx)
    pub fn is_success(&self) -> bool {
        self.code.starts_with('2')
    }

    /// Check if this is an error response (4xx or 5xx)
    pub fn is_error(&self) -> bool {
        self.code.starts_with('4') || self.code.starts_with('5')
    }
}
