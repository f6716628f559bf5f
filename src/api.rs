//! Query/read boundary
//!
//! The operations an inspection frontend (an HTTP layer, a test
//! harness) consumes. Summaries are JSON-serializable; raw data is
//! only reachable through [`message_text`], already decoded.

use crate::message::MessageSummary;
use crate::parser;
use crate::query::{self, Filter};
use crate::store::{MessageStore, StoreError};

/// List the non-expired messages matching `filter`, most recent first
pub fn list_messages(store: &MessageStore, filter: &Filter) -> Vec<MessageSummary> {
    query::query(store.list(), filter)
        .iter()
        .map(|message| message.summary())
        .collect()
}

/// Decoded plaintext of a single message, or an explicit NotFound
pub fn message_text(store: &MessageStore, id: &str) -> Result<String, StoreError> {
    parser::retrieve(store, id)
}

/// Clear the store and return the resulting count (always zero)
pub fn flush_messages(store: &MessageStore) -> usize {
    store.flush();
    store.count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::Message;
    use regex::Regex;

    fn test_store() -> (MessageStore, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let store = MessageStore::new(dir.path().join("snapshot.json"));
        (store, dir)
    }

    fn captured(store: &MessageStore, source: &str, from: &str) -> String {
        let mut message = Message::new(source);
        message.from = from.to_string();
        message.data = "Subject: x\n\nbody\n".to_string();
        let id = message.id.clone();
        store.insert(message, None).unwrap();
        id
    }

    #[test]
    fn test_list_returns_summaries() {
        let (store, _dir) = test_store();
        captured(&store, "10.0.0.1:1", "a@example.com");
        captured(&store, "10.0.0.2:2", "b@example.com");

        let listing = list_messages(&store, &Filter::default());
        assert_eq!(listing.len(), 2);

        let json = serde_json::to_value(&listing).unwrap();
        assert!(json[0].get("data").is_none());
    }

    #[test]
    fn test_list_applies_filter() {
        let (store, _dir) = test_store();
        captured(&store, "10.0.0.1:1", "a@example.com");
        captured(&store, "10.0.0.2:2", "b@example.com");

        let filter = Filter {
            sender: vec![Regex::new("^a@").unwrap()],
            ..Filter::default()
        };
        let listing = list_messages(&store, &filter);
        assert_eq!(listing.len(), 1);
        assert_eq!(listing[0].from, "a@example.com");
    }

    #[test]
    fn test_message_text_not_found() {
        let (store, _dir) = test_store();
        assert!(matches!(
            message_text(&store, "missing"),
            Err(StoreError::NotFound)
        ));
    }

    #[test]
    fn test_flush_returns_zero() {
        let (store, _dir) = test_store();
        captured(&store, "10.0.0.1:1", "a@example.com");
        assert_eq!(flush_messages(&store), 0);
        assert!(list_messages(&store, &Filter::default()).is_empty());
    }
}
