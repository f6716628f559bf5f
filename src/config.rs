//! Server configuration

use std::path::PathBuf;
use std::time::Duration;

/// Tunables for the sink. `Default` carries the values the reference
/// deployment shipped with.
#[derive(Debug, Clone)]
pub struct Config {
    /// Address the SMTP listener binds to
    pub addr: String,
    /// Hostname announced in the greeting and EHLO response
    pub hostname: String,
    /// Whether MAIL/RCPT/DATA require a prior AUTH LOGIN exchange
    pub auth_required: bool,
    /// How long a captured message stays in the store
    pub message_ttl: Duration,
    /// How often the sweeper removes expired messages
    pub sweep_interval: Duration,
    /// Where the store snapshot is written
    pub snapshot_path: PathBuf,
    /// Cap on simultaneously active sessions; excess connections are
    /// turned away with a 421
    pub max_sessions: usize,
    /// Per-session read timeout; `None` blocks indefinitely
    pub session_timeout: Option<Duration>,
}

/// Default message time-to-live
pub const DEFAULT_TTL: Duration = Duration::from_secs(8 * 60 * 60);

impl Default for Config {
    fn default() -> Self {
        Self {
            addr: "127.0.0.1:10025".to_string(),
            hostname: "mailsink.local".to_string(),
            auth_required: false,
            message_ttl: DEFAULT_TTL,
            // Sweep at twice the TTL, like the reference deployment
            sweep_interval: DEFAULT_TTL * 2,
            snapshot_path: PathBuf::from("./mailsink.json"),
            max_sessions: 128,
            session_timeout: Some(Duration::from_secs(300)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert!(!config.auth_required);
        assert_eq!(config.message_ttl, Duration::from_secs(8 * 3600));
        assert_eq!(config.sweep_interval, config.message_ttl * 2);
        assert!(config.session_timeout.is_some());
    }
}
