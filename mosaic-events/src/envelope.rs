//! Event envelopes and response slots

use crate::address::EventAddress;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;
use tokio::sync::Notify;
use uuid::Uuid;

/// The published unit: an address, a payload and a response slot.
///
/// The bus never inspects the payload. Clones share the response slot, so
/// a reply written by a listener is visible to the publisher and to the
/// copy retained by the sink.
#[derive(Clone)]
pub struct Envelope<P> {
    /// Unique envelope ID
    pub id: Uuid,

    /// Destination
    pub address: EventAddress,

    /// Opaque payload
    pub payload: P,

    /// Timestamp when the envelope was created
    pub timestamp: DateTime<Utc>,

    response: ResponseSlot<P>,
}

impl<P> Envelope<P> {
    /// Create a new envelope with an empty response slot
    pub fn new(address: EventAddress, payload: P) -> Self {
        Self {
            id: Uuid::new_v4(),
            address,
            payload,
            timestamp: Utc::now(),
            response: ResponseSlot::new(),
        }
    }

    /// Reply to the publisher. Only the first reply is kept.
    ///
    /// Returns `false` if a response was already written.
    pub fn respond(&self, value: P) -> bool {
        self.response.fill(value)
    }

    /// Whether a listener has replied.
    pub fn has_response(&self) -> bool {
        self.response.is_filled()
    }

    /// The shared response slot.
    pub fn response_slot(&self) -> &ResponseSlot<P> {
        &self.response
    }
}

impl<P: Clone> Envelope<P> {
    /// Current response, if any listener replied.
    pub fn response(&self) -> Option<P> {
        self.response.get()
    }

    /// Wait until a listener replies.
    ///
    /// Resolves immediately when the reply was written during dispatch.
    pub async fn wait_response(&self) -> P {
        self.response.wait().await
    }
}

impl<P: fmt::Debug> fmt::Debug for Envelope<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Envelope")
            .field("id", &self.id)
            .field("address", &self.address)
            .field("payload", &self.payload)
            .field("timestamp", &self.timestamp)
            .field("responded", &self.response.is_filled())
            .finish()
    }
}

/// Write-once reply cell shared by every clone of an envelope.
pub struct ResponseSlot<P> {
    inner: Arc<SlotInner<P>>,
}

struct SlotInner<P> {
    value: Mutex<Option<P>>,
    notify: Notify,
}

impl<P> ResponseSlot<P> {
    fn new() -> Self {
        Self {
            inner: Arc::new(SlotInner {
                value: Mutex::new(None),
                notify: Notify::new(),
            }),
        }
    }

    /// Store a value unless one is already present.
    pub fn fill(&self, value: P) -> bool {
        {
            let mut slot = self.inner.value.lock();
            if slot.is_some() {
                return false;
            }
            *slot = Some(value);
        }
        self.inner.notify.notify_waiters();
        true
    }

    pub fn is_filled(&self) -> bool {
        self.inner.value.lock().is_some()
    }
}

impl<P: Clone> ResponseSlot<P> {
    pub fn get(&self) -> Option<P> {
        self.inner.value.lock().clone()
    }

    /// Wait for the slot to be filled.
    pub async fn wait(&self) -> P {
        loop {
            // Registered before the check so a fill in between still wakes us.
            let notified = self.inner.notify.notified();
            if let Some(value) = self.get() {
                return value;
            }
            notified.await;
        }
    }
}

impl<P> Clone for ResponseSlot<P> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}
