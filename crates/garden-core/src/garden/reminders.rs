//! Reminder digests. Building one is pure; dispatching it is up to the caller.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{Idea, Section};

/// Titles listed per group when rendering.
const MAX_LISTED: usize = 10;

/// What a user should be nudged about.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReminderDigest {
    /// Mature ideas waiting to be finalized.
    pub ready_to_finalize: Vec<String>,
    /// Active ideas nobody touched for a while.
    pub needs_attention: Vec<String>,
}

impl ReminderDigest {
    /// Build a digest from a user's active ideas.
    pub fn build(active: &[Idea], now: DateTime<Utc>, stale_after: Duration) -> Self {
        let ready_to_finalize = active
            .iter()
            .filter(|idea| idea.section == Section::Mature)
            .map(|idea| idea.title.clone())
            .collect();

        let needs_attention = active
            .iter()
            .filter(|idea| idea.is_active() && now - idea.updated_at >= stale_after)
            .map(|idea| idea.title.clone())
            .collect();

        Self {
            ready_to_finalize,
            needs_attention,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.ready_to_finalize.is_empty() && self.needs_attention.is_empty()
    }

    /// Plain-text message suitable for a chat front-end.
    pub fn render(&self) -> String {
        let mut message = String::from("Your garden update:\n\n");

        for (heading, titles) in [
            ("Ready to finalize", &self.ready_to_finalize),
            ("Needs attention", &self.needs_attention),
        ] {
            if titles.is_empty() {
                continue;
            }
            message.push_str(&format!("{} ({})\n", heading, titles.len()));
            for title in titles.iter().take(MAX_LISTED) {
                message.push_str(&format!("  • {}\n", title));
            }
            message.push('\n');
        }

        if self.is_empty() {
            message.push_str("Your garden looks happy today.\n\n");
        }
        message.push_str("Send /garden to see the full view.");
        message
    }
}
