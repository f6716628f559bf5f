//! # mailsink
//!
//! mailsink is a developer-testing SMTP sink: it accepts SMTP
//! connections, captures every submitted message without delivering
//! anything, holds the captures in a time-bounded persistent store and
//! lets you inspect them afterwards.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use std::thread;
//! use mailsink::{Config, Filter, MessageStore, SmtpServer, api};
//!
//! let config = Config {
//!     addr: "127.0.0.1:2525".to_string(),
//!     ..Config::default()
//! };
//! let store = Arc::new(MessageStore::new(&config.snapshot_path));
//! let server = SmtpServer::new(config, Arc::clone(&store));
//!
//! thread::spawn(move || server.start().expect("server start failed"));
//!
//! // Application under test submits mail to localhost:2525
//! // ...
//!
//! // Inspect what was captured
//! for summary in api::list_messages(&store, &Filter::default()) {
//!     println!("from {} at {}", summary.from, summary.received_at);
//! }
//! ```
//!
//! ## Supported SMTP commands
//!
//! - `EHLO` - Identify the client
//! - `AUTH LOGIN` - Two-step base64 exchange; any credentials pass
//! - `MAIL FROM` - Envelope sender
//! - `RCPT TO` - Envelope recipient (repeatable)
//! - `DATA` - Message text, terminated by a lone "."
//! - `QUIT` - Close connection
//!
//! Anything else ends the session with an error response. When
//! authentication is configured on, MAIL/RCPT/DATA are gated behind a
//! completed AUTH LOGIN exchange; credentials are never verified.
//!
//! ## Inspection
//!
//! Captured messages are queried through [`api`]: regex filters over
//! the client endpoint and envelope sender, exact match on the
//! authenticated user, listings sorted most recent first. Retrieval of
//! a single message decodes quoted-printable MIME parts into plain
//! text. Messages expire after a configurable time-to-live; every
//! capture is snapshotted to disk and reloaded on restart.
//!
//! ## Notes
//!
//! - Not a real mail server: no TLS, no pipelining, no relaying, and
//!   only the command subset listed above.
//! - Authentication is a gate, not a check: any username is accepted
//!   and recorded, the password is discarded.

pub mod api;
mod config;
mod message;
pub mod parser;
mod query;
mod smtp;
mod store;

pub use config::{Config, DEFAULT_TTL};
pub use message::{Message, MessageSummary};
pub use query::{Filter, query};
pub use smtp::{CommandHandler, Session, SessionState, SmtpError, SmtpResponse, SmtpServer};
pub use store::{MessageStore, StoreError};
