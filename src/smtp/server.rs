//! SMTP listener and per-connection session loop

use std::io::{BufRead, BufReader, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;
use std::time::Duration;

use log::{debug, error, info, warn};

use crate::config::Config;
use crate::smtp::commands::CommandHandler;
use crate::smtp::error::SmtpError;
use crate::smtp::response::SmtpResponse;
use crate::smtp::session::{Session, SessionState};
use crate::store::MessageStore;

/// SMTP sink server: accepts connections and captures submitted mail
/// into the shared store
#[derive(Debug)]
pub struct SmtpServer {
    config: Config,
    store: Arc<MessageStore>,
    active: Arc<AtomicUsize>,
}

impl SmtpServer {
    /// Create a server over a shared store
    pub fn new(config: Config, store: Arc<MessageStore>) -> Self {
        Self {
            config,
            store,
            active: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Bind the configured address and serve (blocking). Bind failure
    /// is the only fatal error.
    pub fn start(&self) -> Result<(), SmtpError> {
        let listener = TcpListener::bind(&self.config.addr)?;
        self.serve(listener)
    }

    /// Serve connections from an existing listener (blocking). Each
    /// connection gets its own session thread; once `max_sessions` are
    /// active, further clients are turned away with a 421.
    pub fn serve(&self, listener: TcpListener) -> Result<(), SmtpError> {
        info!("SMTP sink listening on {}", listener.local_addr()?);

        let handler = CommandHandler::new(&self.config.hostname, self.config.auth_required);

        for stream in listener.incoming() {
            match stream {
                Ok(mut stream) => {
                    // Reserve a session slot atomically so the cap is exact
                    let max_sessions = self.config.max_sessions;
                    let admitted = self
                        .active
                        .fetch_update(Ordering::AcqRel, Ordering::Acquire, |active| {
                            (active < max_sessions).then_some(active + 1)
                        })
                        .is_ok();
                    if !admitted {
                        warn!("session limit reached, turning client away");
                        let _ = stream
                            .write_all(SmtpResponse::too_busy(&self.config.hostname).format().as_bytes());
                        continue;
                    }

                    let active = Arc::clone(&self.active);
                    let store = Arc::clone(&self.store);
                    let handler = handler.clone();
                    let hostname = self.config.hostname.clone();
                    let ttl = self.config.message_ttl;
                    let timeout = self.config.session_timeout;

                    thread::spawn(move || {
                        if let Err(e) =
                            handle_connection(stream, &hostname, &handler, &store, ttl, timeout)
                        {
                            warn!("session ended with error: {e}");
                        }
                        active.fetch_sub(1, Ordering::AcqRel);
                    });
                }
                Err(e) => {
                    warn!("error accepting connection: {e}");
                }
            }
        }

        Ok(())
    }
}

/// Drive one SMTP session to completion
fn handle_connection(
    mut stream: TcpStream,
    hostname: &str,
    handler: &CommandHandler,
    store: &MessageStore,
    ttl: Duration,
    timeout: Option<Duration>,
) -> Result<(), SmtpError> {
    let peer = stream.peer_addr()?.to_string();
    stream.set_read_timeout(timeout)?;

    let mut session = Session::new(&peer);
    debug!("client {peer} connected, message id {}", session.message.id);

    send_response(&mut stream, &SmtpResponse::greeting(hostname))?;

    let mut reader = BufReader::new(stream.try_clone()?);
    let mut line_buffer = Vec::new();

    loop {
        line_buffer.clear();
        match reader.read_until(b'\n', &mut line_buffer) {
            Ok(0) => break, // Connection closed
            Ok(_) => {
                let raw = String::from_utf8_lossy(&line_buffer);
                let line = raw.trim_end_matches(['\r', '\n']);

                match session.state {
                    SessionState::Capturing => {
                        if line == "." {
                            if !finish_capture(&mut stream, &mut session, store, ttl)? {
                                break;
                            }
                        } else {
                            session.capture_line(line);
                        }
                    }
                    SessionState::AuthUsername => match session.accept_username(line) {
                        Ok(()) => {
                            send_response(&mut stream, &SmtpResponse::password_challenge())?;
                        }
                        Err(e) => {
                            send_error(&mut stream, &e)?;
                            break;
                        }
                    },
                    SessionState::AuthPassword => {
                        session.accept_password(line);
                        send_response(&mut stream, &SmtpResponse::auth_ok())?;
                    }
                    _ => match handler.process_command(line, &mut session) {
                        Ok(response) => {
                            send_response(&mut stream, &response)?;
                            if session.state == SessionState::Terminated {
                                break;
                            }
                        }
                        Err(e) => {
                            // One violation ends the connection
                            info!("client {peer}: {e}");
                            send_error(&mut stream, &e)?;
                            break;
                        }
                    },
                }
            }
            Err(e) => {
                debug!("client {peer} read failed: {e}");
                break;
            }
        }
    }

    debug!("client {peer} disconnected");
    Ok(())
}

/// Seal the captured message into the store. The snapshot write must
/// succeed before the client sees its confirmation; on failure the
/// session ends unconfirmed. Returns whether the session continues.
fn finish_capture(
    stream: &mut TcpStream,
    session: &mut Session,
    store: &MessageStore,
    ttl: Duration,
) -> Result<bool, SmtpError> {
    let message = session.finish_capture();
    let id = message.id.clone();

    match serde_json::to_string(&message.summary()) {
        Ok(json) => info!("captured {json}"),
        Err(e) => warn!("could not render capture log line: {e}"),
    }

    if let Err(e) = store.insert(message, Some(ttl)) {
        error!("could not persist message {id}: {e}");
        let e = SmtpError::from(e);
        send_error(stream, &e)?;
        return Ok(false);
    }

    send_response(stream, &SmtpResponse::queued(&id))?;
    Ok(true)
}

fn send_response(stream: &mut TcpStream, response: &SmtpResponse) -> Result<(), SmtpError> {
    stream.write_all(response.format().as_bytes())?;
    stream.flush()?;
    Ok(())
}

fn send_error(stream: &mut TcpStream, error: &SmtpError) -> Result<(), SmtpError> {
    let response = SmtpResponse::error(error.to_response_code(), &error.to_response_message());
    send_response(stream, &response)
}
