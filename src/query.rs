//! Filter and sort over store snapshots

use regex::Regex;

use crate::message::Message;

/// Optional filter over a listing. Within a dimension the patterns OR
/// together; across dimensions the matches AND. An empty dimension
/// matches everything.
#[derive(Debug, Default, Clone)]
pub struct Filter {
    /// Patterns matched against the client endpoint string
    pub source: Vec<Regex>,
    /// Patterns matched against the envelope sender
    pub sender: Vec<Regex>,
    /// Exact match against the authenticated user
    pub user: Option<String>,
}

impl Filter {
    pub fn is_empty(&self) -> bool {
        self.source.is_empty() && self.sender.is_empty() && self.user.is_none()
    }

    fn matches(&self, message: &Message) -> bool {
        if !self.source.is_empty() && !self.source.iter().any(|re| re.is_match(&message.source_addr))
        {
            return false;
        }
        if !self.sender.is_empty() && !self.sender.iter().any(|re| re.is_match(&message.from)) {
            return false;
        }
        if let Some(user) = &self.user
            && user != &message.user
        {
            return false;
        }
        true
    }
}

/// Select the matching subset of a snapshot, most recent first.
///
/// Equal timestamps fall back to the message id so the order is
/// deterministic for a fixed input.
pub fn query(mut snapshot: Vec<Message>, filter: &Filter) -> Vec<Message> {
    snapshot.retain(|message| filter.matches(message));
    snapshot.sort_by(|a, b| {
        b.received_at
            .cmp(&a.received_at)
            .then_with(|| a.id.cmp(&b.id))
    });
    snapshot
}
