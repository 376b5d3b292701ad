//! services/inbound_mailbox.rs
//! Holds inbound messages until a client collects them.

use std::collections::{HashMap, VecDeque};
use std::time::Duration;

use tokio::sync::{Mutex, Notify};
use tokio::time::Instant;

use crate::errors::CallbackError;
use crate::models::inbound_model::InboundMessage;

pub const DEFAULT_INBOUND_CAPACITY: usize = 1000;

const FAR_FUTURE: Duration = Duration::from_secs(60 * 60 * 24 * 365);

#[derive(Default)]
struct Slots {
    messages: HashMap<String, InboundMessage>,
    /// Arrival order, oldest first, for eviction.
    order: VecDeque<String>,
}

/// Bounded, process-local mailbox keyed by the provider's `message_uuid`.
/// Each message is handed out once; the oldest uncollected one is dropped
/// when the mailbox is full.
pub struct InboundMailbox {
    slots: Mutex<Slots>,
    arrivals: Notify,
    capacity: usize,
}

impl Default for InboundMailbox {
    fn default() -> Self {
        Self::new(DEFAULT_INBOUND_CAPACITY)
    }
}

impl InboundMailbox {
    pub fn new(capacity: usize) -> Self {
        Self {
            slots: Mutex::new(Slots::default()),
            arrivals: Notify::new(),
            capacity: capacity.max(1),
        }
    }

    /// Parses and stores one inbound webhook body. A redelivery of the same
    /// `message_uuid` replaces the earlier copy.
    pub async fn deliver(&self, raw: &[u8]) -> Result<InboundMessage, CallbackError> {
        let message = InboundMessage::parse(raw)?;
        log::info!(
            "(deliver) Inbound {} message {} from {}",
            message.channel.as_deref().unwrap_or("?"),
            message.message_uuid,
            message.from.as_deref().unwrap_or("?")
        );

        {
            let mut slots = self.slots.lock().await;
            let id = message.message_uuid.clone();
            if slots.messages.insert(id.clone(), message.clone()).is_none() {
                slots.order.push_back(id);
            }
            while slots.messages.len() > self.capacity {
                match slots.order.pop_front() {
                    Some(oldest) => {
                        if slots.messages.remove(&oldest).is_some() {
                            log::warn!("(deliver) Mailbox full, dropped inbound {}", oldest);
                        }
                    }
                    None => break,
                }
            }
        }

        self.arrivals.notify_waiters();
        Ok(message)
    }

    /// Messages not yet collected, oldest first.
    pub async fn pending(&self) -> Vec<InboundMessage> {
        let slots = self.slots.lock().await;
        slots
            .order
            .iter()
            .filter_map(|id| slots.messages.get(id).cloned())
            .collect()
    }

    /// Removes and returns the message with `message_uuid`, waiting up to
    /// `timeout` for it to arrive.
    pub async fn take(&self, message_uuid: &str, timeout: Duration) -> Option<InboundMessage> {
        let now = Instant::now();
        let deadline = now
            .checked_add(timeout)
            .unwrap_or_else(|| now + FAR_FUTURE);

        loop {
            let notified = self.arrivals.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            {
                let mut slots = self.slots.lock().await;
                if let Some(message) = slots.messages.remove(message_uuid) {
                    slots.order.retain(|id| id != message_uuid);
                    return Some(message);
                }
            }

            if tokio::time::timeout_at(deadline, notified).await.is_err() {
                return None;
            }
        }
    }
}
