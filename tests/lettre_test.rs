use std::error::Error;
use std::net::TcpListener;
use std::sync::Arc;
use std::thread;

use lettre::message::{Mailbox, Message};
use lettre::transport::smtp::authentication::{Credentials, Mechanism};
use lettre::{SmtpTransport, Transport};
use mailsink::{Config, Filter, MessageStore, SmtpServer, api};

fn start_sink(auth_required: bool) -> (u16, Arc<MessageStore>, tempfile::TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(MessageStore::new(dir.path().join("snapshot.json")));
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();

    let config = Config {
        auth_required,
        hostname: "sink.test".to_string(),
        snapshot_path: dir.path().join("snapshot.json"),
        ..Config::default()
    };
    let server = SmtpServer::new(config, Arc::clone(&store));
    thread::spawn(move || {
        let _ = server.serve(listener);
    });

    (port, store, dir)
}

#[test]
fn basic_lettre_send() -> Result<(), Box<dyn Error>> {
    let (port, store, _dir) = start_sink(false);

    let message = Message::builder()
        .from("花子 <hanako@example.com>".parse::<Mailbox>()?)
        .to("太郎 <tarou@example.com>".parse::<Mailbox>()?)
        .subject("件名")
        .body("本文".to_owned())?;

    let mailer = SmtpTransport::builder_dangerous("127.0.0.1")
        .port(port)
        .build();
    mailer.send(&message)?;

    let listing = api::list_messages(&store, &Filter::default());
    assert_eq!(listing.len(), 1);
    assert_eq!(listing[0].from, "hanako@example.com");
    assert_eq!(listing[0].rcpt, vec!["tarou@example.com"]);

    let stored = store.get(&listing[0].id).unwrap();
    assert!(stored.data.contains("Subject:"));

    Ok(())
}

#[test]
fn lettre_login_auth_send() -> Result<(), Box<dyn Error>> {
    let (port, store, _dir) = start_sink(true);

    let message = Message::builder()
        .from("hanako@example.com".parse::<Mailbox>()?)
        .to("tarou@example.com".parse::<Mailbox>()?)
        .subject("authenticated")
        .body("hello".to_owned())?;

    // Any LOGIN credentials pass; the username is recorded on capture
    let mailer = SmtpTransport::builder_dangerous("127.0.0.1")
        .port(port)
        .credentials(Credentials::new("hanako".to_owned(), "ignored".to_owned()))
        .authentication(vec![Mechanism::Login])
        .build();
    mailer.send(&message)?;

    let listing = api::list_messages(&store, &Filter::default());
    assert_eq!(listing.len(), 1);
    assert_eq!(listing[0].user, "hanako");

    Ok(())
}
