//! Last-value cache per address

use crate::address::EventAddress;
use crate::envelope::Envelope;
use dashmap::DashMap;
use std::sync::Arc;

/// Remembers the most recent envelope published to each address.
///
/// Late readers use [`EventSink::peek`] to fetch the last value without
/// subscribing. There is no history: every record overwrites the previous
/// entry, and entries are only dropped by [`EventSink::clear`] at teardown.
pub struct EventSink<P> {
    last: Arc<DashMap<EventAddress, Envelope<P>>>,
}

impl<P> Clone for EventSink<P> {
    fn clone(&self) -> Self {
        Self {
            last: Arc::clone(&self.last),
        }
    }
}

impl<P: Clone> EventSink<P> {
    pub fn new() -> Self {
        Self {
            last: Arc::new(DashMap::new()),
        }
    }

    /// Overwrite the cached value for the envelope's address.
    pub fn record(&self, envelope: &Envelope<P>) {
        self.last.insert(envelope.address.clone(), envelope.clone());
    }

    /// Last payload published to `address`, or `None` if nothing was.
    pub fn peek(&self, address: &EventAddress) -> Option<P> {
        self.last.get(address).map(|entry| entry.payload.clone())
    }

    /// Last full envelope, including its response slot.
    pub fn peek_envelope(&self, address: &EventAddress) -> Option<Envelope<P>> {
        self.last.get(address).map(|entry| entry.value().clone())
    }

    pub fn contains(&self, address: &EventAddress) -> bool {
        self.last.contains_key(address)
    }

    /// Addresses that have been published to at least once.
    pub fn addresses(&self) -> Vec<EventAddress> {
        self.last.iter().map(|entry| entry.key().clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.last.len()
    }

    pub fn is_empty(&self) -> bool {
        self.last.is_empty()
    }

    pub fn clear(&self) {
        self.last.clear();
    }
}

impl<P: Clone> Default for EventSink<P> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn address(topic: &str) -> EventAddress {
        EventAddress::new("cart", topic).unwrap()
    }

    #[test]
    fn test_peek_absent() {
        let sink: EventSink<i32> = EventSink::new();
        assert_eq!(sink.peek(&address("updated")), None);
        assert!(sink.is_empty());
    }

    #[test]
    fn test_record_overwrites() {
        let sink = EventSink::new();
        sink.record(&Envelope::new(address("updated"), 1));
        sink.record(&Envelope::new(address("updated"), 2));

        assert_eq!(sink.peek(&address("updated")), Some(2));
        assert_eq!(sink.len(), 1);
    }

    #[test]
    fn test_addresses_are_independent() {
        let sink = EventSink::new();
        sink.record(&Envelope::new(address("a"), "first"));
        sink.record(&Envelope::new(address("b"), "second"));

        assert_eq!(sink.peek(&address("a")), Some("first"));
        assert_eq!(sink.peek(&address("b")), Some("second"));

        let mut addresses = sink.addresses();
        addresses.sort();
        assert_eq!(addresses, vec![address("a"), address("b")]);
    }

    #[test]
    fn test_peek_envelope_shares_response() {
        let sink = EventSink::new();
        let envelope = Envelope::new(address("query"), "ping");
        sink.record(&envelope);

        envelope.respond("pong");
        let cached = sink.peek_envelope(&address("query")).unwrap();
        assert_eq!(cached.response(), Some("pong"));
    }

    #[test]
    fn test_clear() {
        let sink = EventSink::new();
        sink.record(&Envelope::new(address("a"), 1));
        sink.clear();
        assert!(!sink.contains(&address("a")));
    }
}
