//! Optimistic echo
//!
//! A sent prompt is shown before the ledger acknowledges it. The speculative
//! entry predicts its own order and is swapped for the ledger's message once
//! that shows up; it is never merged with it.

use std::collections::HashMap;

use strand_types::{MessageDoc, MessageRole, OrderKey};
use tracing::debug;

use crate::docs::ui_messages_from_docs;
use crate::ui::{UiMessage, UiSource, UiStatus};

const LOCAL_ID_PREFIX: &str = "optimistic-";

#[derive(Debug, Clone)]
struct Speculative {
    thread_id: String,
    order: u64,
}

/// Speculative entries of a newest-first page
#[derive(Debug, Default)]
pub struct OptimisticEcho {
    pending: HashMap<String, Speculative>,
}

impl OptimisticEcho {
    pub fn new() -> Self {
        Self::default()
    }

    /// Show `prompt` at the top of `page` and return the inserted entry.
    ///
    /// The predicted order is one past the highest order among non-stream
    /// entries, 0 on an empty page.
    pub fn send(&mut self, page: &mut Vec<UiMessage>, thread_id: &str, prompt: impl Into<String>) -> UiMessage {
        let order = page
            .iter()
            .filter(|m| m.source != UiSource::Stream)
            .map(|m| m.order)
            .max()
            .map(|o| o + 1)
            .unwrap_or(0);

        let local_id = format!("{}{}", LOCAL_ID_PREFIX, uuid::Uuid::new_v4());
        let mut message = UiMessage::new(
            local_id.clone(),
            thread_id,
            OrderKey::new(order, 0),
            MessageRole::User,
            UiStatus::Pending,
            UiSource::Optimistic,
        );
        message.push_text(&prompt.into());

        page.insert(0, message.clone());
        self.pending.insert(
            local_id.clone(),
            Speculative {
                thread_id: thread_id.to_string(),
                order,
            },
        );
        debug!(local_id = %local_id, thread_id = %thread_id, order, "echoed prompt");
        message
    }

    /// Replace each speculative entry once the ledger holds the user prompt
    /// for the same thread and order. Later steps of that order (the answer)
    /// never stand in for it. If the prompt is already on the page the
    /// speculative entry is just dropped. Returns how many entries resolved.
    pub fn reconcile(&mut self, page: &mut Vec<UiMessage>, docs: &[MessageDoc]) -> usize {
        let mut resolved = Vec::new();

        for (local_id, guess) in &self.pending {
            let Some(doc) = docs
                .iter()
                .filter(|d| d.thread_id == guess.thread_id && d.order == guess.order && d.id != *local_id)
                .filter(|d| d.role() == MessageRole::User)
                .min_by_key(|d| d.step_order)
            else {
                continue;
            };
            resolved.push(local_id.clone());

            let Some(pos) = page.iter().position(|m| m.id == *local_id) else {
                continue;
            };
            if page.iter().any(|m| m.id == doc.id) {
                page.remove(pos);
            } else if let Some(authoritative) = ui_messages_from_docs(std::slice::from_ref(doc)).pop() {
                page[pos] = authoritative;
            }
        }

        for local_id in &resolved {
            self.pending.remove(local_id);
        }
        resolved.len()
    }

    /// Remove a speculative entry, e.g. after the send failed.
    pub fn discard(&mut self, page: &mut Vec<UiMessage>, local_id: &str) -> bool {
        if self.pending.remove(local_id).is_none() {
            return false;
        }
        let before = page.len();
        page.retain(|m| m.id != local_id);
        page.len() != before
    }

    pub fn is_pending(&self, local_id: &str) -> bool {
        self.pending.contains_key(local_id)
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}
