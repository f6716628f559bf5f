use std::path::PathBuf;
use std::process;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use log::{error, info, warn};

use mailsink::{Config, MessageStore, SmtpServer};

/// Developer SMTP sink: captures mail, delivers nothing
#[derive(Debug, Parser)]
#[command(about, version)]
struct Args {
    /// Address the SMTP listener binds to
    #[arg(long, default_value = "127.0.0.1:10025")]
    addr: String,

    /// Hostname announced to clients
    #[arg(long, default_value = "mailsink.local")]
    hostname: String,

    /// Require an AUTH LOGIN exchange before MAIL/RCPT/DATA
    #[arg(long)]
    auth: bool,

    /// Hours a captured message stays available
    #[arg(long, default_value_t = 8)]
    ttl_hours: u64,

    /// Where the store snapshot is kept
    #[arg(long, default_value = "./mailsink.json")]
    snapshot: PathBuf,

    /// Maximum simultaneously active sessions
    #[arg(long, default_value_t = 128)]
    max_sessions: usize,

    /// Per-session read timeout in seconds; 0 disables it
    #[arg(long, default_value_t = 300)]
    timeout_secs: u64,
}

fn main() {
    env_logger::init();
    let args = Args::parse();

    let message_ttl = Duration::from_secs(args.ttl_hours * 3600);
    let config = Config {
        addr: args.addr,
        hostname: args.hostname,
        auth_required: args.auth,
        message_ttl,
        sweep_interval: message_ttl * 2,
        snapshot_path: args.snapshot,
        max_sessions: args.max_sessions,
        session_timeout: (args.timeout_secs > 0).then(|| Duration::from_secs(args.timeout_secs)),
    };

    let store = Arc::new(MessageStore::new(&config.snapshot_path));
    match store.load() {
        Ok(0) => {}
        Ok(count) => info!(
            "loaded {count} message(s) from {}",
            config.snapshot_path.display()
        ),
        Err(e) => {
            warn!("could not load snapshot ({e}), purging and starting empty");
            let _ = std::fs::remove_file(&config.snapshot_path);
        }
    }
    store.spawn_sweeper(config.sweep_interval);

    let server = SmtpServer::new(config, store);
    if let Err(e) = server.start() {
        error!("failed to start server: {e}");
        process::exit(1);
    }
}
