//! Implementation of SMTP commands

use crate::smtp::error::SmtpError;
use crate::smtp::response::SmtpResponse;
use crate::smtp::session::{Session, SessionState};

/// Handles SMTP command lines and returns appropriate responses
#[derive(Debug, Clone)]
pub struct CommandHandler {
    hostname: String,
    auth_required: bool,
}

impl CommandHandler {
    /// Create a new command handler
    pub fn new(hostname: &str, auth_required: bool) -> Self {
        Self {
            hostname: hostname.to_owned(),
            auth_required,
        }
    }

    /// Process a command line and return a response.
    ///
    /// Any error returned here ends the session: the server sends the
    /// mapped error response and closes the connection.
    pub fn process_command(
        &self,
        line: &str,
        session: &mut Session,
    ) -> Result<SmtpResponse, SmtpError> {
        let mut fields = line.split_whitespace();
        let Some(verb) = fields.next() else {
            // A line with zero tokens is not a command
            return Err(SmtpError::ProtocolViolation(line.to_owned()));
        };

        match verb.to_uppercase().as_str() {
            "EHLO" => Ok(self.handle_ehlo(session)),
            "DATA" => self.handle_data(session),
            "QUIT" => {
                session.terminate();
                Ok(SmtpResponse::quit())
            }
            _ => self.handle_extended(line, session),
        }
    }

    /// Handle the colon-form commands and AUTH LOGIN, which cannot be
    /// dispatched on the first whitespace token alone
    fn handle_extended(
        &self,
        line: &str,
        session: &mut Session,
    ) -> Result<SmtpResponse, SmtpError> {
        let (keyword, value) = match line.split_once(':') {
            Some((keyword, value)) => (keyword.trim(), Some(value.trim())),
            None => (line.trim(), None),
        };

        match keyword.to_uppercase().as_str() {
            "AUTH LOGIN" => {
                session.begin_auth();
                Ok(SmtpResponse::username_challenge())
            }
            "MAIL FROM" => {
                // A malformed line is a violation even before the gate
                let value = Self::required(value, line)?;
                self.check_auth(session)?;
                session.set_sender(&Self::strip_angles(value));
                Ok(SmtpResponse::ok())
            }
            "RCPT TO" => {
                let value = Self::required(value, line)?;
                self.check_auth(session)?;
                session.add_recipient(&Self::strip_angles(value));
                Ok(SmtpResponse::ok())
            }
            _ => Err(SmtpError::ProtocolViolation(line.to_owned())),
        }
    }

    /// Handle EHLO: advertise AUTH only when the gate is configured on
    fn handle_ehlo(&self, session: &mut Session) -> SmtpResponse {
        session.greet();
        if self.auth_required {
            SmtpResponse::ehlo_with_auth(&self.hostname)
        } else {
            SmtpResponse::ehlo(&self.hostname)
        }
    }

    /// Handle DATA: acknowledge and switch to line accumulation
    fn handle_data(&self, session: &mut Session) -> Result<SmtpResponse, SmtpError> {
        self.check_auth(session)?;
        session.start_capture();
        debug_assert_eq!(session.state, SessionState::Capturing);
        Ok(SmtpResponse::data_start())
    }

    /// Authentication gate for MAIL, RCPT and DATA
    fn check_auth(&self, session: &Session) -> Result<(), SmtpError> {
        if self.auth_required && !session.authenticated {
            return Err(SmtpError::AuthRequired);
        }
        Ok(())
    }

    /// A colon-form command without its value part is unrecognized
    fn required<'a>(value: Option<&'a str>, line: &str) -> Result<&'a str, SmtpError> {
        value.ok_or_else(|| SmtpError::ProtocolViolation(line.to_owned()))
    }

    fn strip_angles(addr: &str) -> String {
        addr.replace('<', "").replace('>', "")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn open_handler() -> CommandHandler {
        CommandHandler::new("sink.local", false)
    }

    fn gated_handler() -> CommandHandler {
        CommandHandler::new("sink.local", true)
    }

    #[test]
    fn test_ehlo_command() {
        let handler = open_handler();
        let mut session = Session::new("127.0.0.1:1");

        let response = handler.process_command("EHLO client.local", &mut session).unwrap();
        assert_eq!(response.code, "250");
        assert_eq!(session.state, SessionState::Idle);
    }

    #[test]
    fn test_ehlo_advertises_auth_when_required() {
        let mut session = Session::new("127.0.0.1:1");

        let response = gated_handler().process_command("EHLO x", &mut session).unwrap();
        assert!(response.format().contains("AUTH PLAIN LOGIN"));

        let response = open_handler().process_command("EHLO x", &mut session).unwrap();
        assert!(!response.format().contains("AUTH"));
    }

    #[test]
    fn test_mail_from() {
        let handler = open_handler();
        let mut session = Session::new("127.0.0.1:1");

        let response = handler
            .process_command("MAIL FROM:<sender@example.com>", &mut session)
            .unwrap();
        assert_eq!(response.code, "250");
        assert_eq!(session.message.from, "sender@example.com");
    }

    #[test]
    fn test_mail_from_twice_overwrites() {
        let handler = open_handler();
        let mut session = Session::new("127.0.0.1:1");

        handler.process_command("MAIL FROM:<a@example.com>", &mut session).unwrap();
        handler.process_command("MAIL FROM:<b@example.com>", &mut session).unwrap();
        assert_eq!(session.message.from, "b@example.com");
    }

    #[test]
    fn test_rcpt_to_repeats() {
        let handler = open_handler();
        let mut session = Session::new("127.0.0.1:1");

        handler.process_command("RCPT TO:<one@example.com>", &mut session).unwrap();
        handler.process_command("RCPT TO:<two@example.com>", &mut session).unwrap();
        assert_eq!(session.message.rcpt, vec!["one@example.com", "two@example.com"]);
    }

    #[test]
    fn test_data_starts_capture() {
        let handler = open_handler();
        let mut session = Session::new("127.0.0.1:1");

        let response = handler.process_command("DATA", &mut session).unwrap();
        assert_eq!(response.code, "354");
        assert_eq!(session.state, SessionState::Capturing);
    }

    #[test]
    fn test_quit() {
        let handler = open_handler();
        let mut session = Session::new("127.0.0.1:1");

        let response = handler.process_command("QUIT", &mut session).unwrap();
        assert_eq!(response.code, "221");
        assert_eq!(session.state, SessionState::Terminated);
    }

    #[test]
    fn test_auth_login_challenge() {
        let handler = gated_handler();
        let mut session = Session::new("127.0.0.1:1");

        let response = handler.process_command("AUTH LOGIN", &mut session).unwrap();
        assert_eq!(response.code, "334");
        assert_eq!(session.state, SessionState::AuthUsername);
    }

    #[test]
    fn test_gated_commands_require_auth() {
        let handler = gated_handler();
        let mut session = Session::new("127.0.0.1:1");

        for command in ["MAIL FROM:<a@b.c>", "RCPT TO:<a@b.c>", "DATA"] {
            let result = handler.process_command(command, &mut session);
            assert!(matches!(result, Err(SmtpError::AuthRequired)), "{command}");
        }
    }

    #[test]
    fn test_gate_opens_after_auth() {
        let handler = gated_handler();
        let mut session = Session::new("127.0.0.1:1");

        handler.process_command("AUTH LOGIN", &mut session).unwrap();
        session.accept_username("dXNlcg==").unwrap();
        session.accept_password("whatever");

        let response = handler
            .process_command("MAIL FROM:<a@b.c>", &mut session)
            .unwrap();
        assert_eq!(response.code, "250");
    }

    #[test]
    fn test_unknown_command() {
        let handler = open_handler();
        let mut session = Session::new("127.0.0.1:1");

        let result = handler.process_command("VRFY nobody", &mut session);
        assert!(matches!(result, Err(SmtpError::ProtocolViolation(_))));
    }

    #[test]
    fn test_blank_line_is_violation() {
        let handler = open_handler();
        let mut session = Session::new("127.0.0.1:1");

        let result = handler.process_command("   ", &mut session);
        assert!(matches!(result, Err(SmtpError::ProtocolViolation(_))));
    }

    #[test]
    fn test_rcpt_without_colon_is_violation() {
        let handler = open_handler();
        let mut session = Session::new("127.0.0.1:1");

        let result = handler.process_command("RCPT TO", &mut session);
        assert!(matches!(result, Err(SmtpError::ProtocolViolation(_))));
    }

    #[test]
    fn test_missing_value_is_violation_even_when_gated() {
        let handler = gated_handler();
        let mut session = Session::new("127.0.0.1:1");

        // Unrecognized beats unauthenticated for a malformed line
        for command in ["MAIL FROM", "RCPT TO"] {
            let result = handler.process_command(command, &mut session);
            assert!(matches!(result, Err(SmtpError::ProtocolViolation(_))), "{command}");
        }
    }

    #[test]
    fn test_lowercase_verbs_accepted() {
        let handler = open_handler();
        let mut session = Session::new("127.0.0.1:1");

        assert!(handler.process_command("ehlo client", &mut session).is_ok());
        assert!(handler.process_command("mail from:<a@b.c>", &mut session).is_ok());
    }
}
