//! Scoped bus handle owned by one view instance

use crate::error::{Result, ViewError};
use mosaic_events::{Envelope, EventAddress, EventBus, Listener, Subscription};
use parking_lot::Mutex;
use serde_json::Value;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::debug;

struct Tracked<P> {
    subscription: Subscription,
    listener: Listener<P>,
}

/// Per-instance view of the shared bus.
///
/// Every registration made through the handle is tracked so that
/// [`BusHandle::dispose`] can release all of them, whether or not the
/// owning code unsubscribed manually. Registrations made by other handles
/// on the same addresses are never touched. Dropping the handle disposes it.
pub struct BusHandle<P: Clone = Value> {
    bus: EventBus<P>,
    owner: String,
    registry: Mutex<Vec<Tracked<P>>>,
    disposed: AtomicBool,
}

impl<P: Clone> BusHandle<P> {
    pub fn new(bus: EventBus<P>, owner: impl Into<String>) -> Self {
        Self {
            bus,
            owner: owner.into(),
            registry: Mutex::new(Vec::new()),
            disposed: AtomicBool::new(false),
        }
    }

    /// Subscribe a persistent listener through this handle.
    pub fn subscribe(&self, address: &EventAddress, listener: Listener<P>) -> Result<Subscription> {
        self.track(listener, |l| self.bus.subscribe(address, l))
    }

    /// Subscribe a one-shot listener through this handle.
    pub fn subscribe_once(
        &self,
        address: &EventAddress,
        listener: Listener<P>,
    ) -> Result<Subscription> {
        self.track(listener, |l| self.bus.subscribe_once(address, l))
    }

    /// Validate `channel` and `topic`, then subscribe.
    pub fn subscribe_to(
        &self,
        channel: &str,
        topic: &str,
        listener: Listener<P>,
    ) -> Result<Subscription> {
        let address = EventAddress::new(channel, topic)?;
        self.subscribe(&address, listener)
    }

    fn track(
        &self,
        listener: Listener<P>,
        register: impl FnOnce(Listener<P>) -> Subscription,
    ) -> Result<Subscription> {
        if self.is_disposed() {
            return Err(ViewError::Disposed(self.owner.clone()));
        }

        let subscription = register(listener.clone());

        let mut registry = self.registry.lock();
        registry.retain(|t| t.subscription.is_active());
        registry.push(Tracked {
            subscription: subscription.clone(),
            listener,
        });

        Ok(subscription)
    }

    /// Remove the registrations of `listener` on `address` made through
    /// this handle. Returns how many were removed.
    pub fn unsubscribe(&self, address: &EventAddress, listener: &Listener<P>) -> usize {
        let mut removed = 0;
        let mut registry = self.registry.lock();

        registry.retain(|t| {
            let matches = t.subscription.address == *address && t.listener.same(listener);
            if matches && self.bus.remove(address, t.subscription.id) {
                removed += 1;
            }
            !matches
        });

        removed
    }

    /// Release every registration this handle made.
    ///
    /// Idempotent: the second call returns 0 and does nothing.
    pub fn dispose(&self) -> usize {
        if self.disposed.swap(true, Ordering::AcqRel) {
            return 0;
        }

        let tracked = std::mem::take(&mut *self.registry.lock());
        let released = tracked
            .iter()
            .filter(|t| self.bus.remove(&t.subscription.address, t.subscription.id))
            .count();

        if self.bus.config().enable_logging {
            debug!(
                "Disposed bus handle for {} ({} listener(s) released)",
                self.owner, released
            );
        }

        released
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::Acquire)
    }

    /// Live registrations held by this handle.
    pub fn registered_count(&self) -> usize {
        let mut registry = self.registry.lock();
        registry.retain(|t| t.subscription.is_active());
        registry.len()
    }

    pub fn owner(&self) -> &str {
        &self.owner
    }

    pub fn bus(&self) -> &EventBus<P> {
        &self.bus
    }

    pub fn to_all(&self, payload: P, topic: Option<&str>) -> Result<Envelope<P>> {
        Ok(self.bus.to_all(payload, topic)?)
    }

    pub fn to_components(&self, payload: P, topic: Option<&str>) -> Result<Envelope<P>> {
        Ok(self.bus.to_components(payload, topic)?)
    }

    pub fn to_blueprint(&self, payload: P, topic: Option<&str>) -> Result<Envelope<P>> {
        Ok(self.bus.to_blueprint(payload, topic)?)
    }

    pub fn publish(&self, address: EventAddress, payload: P) -> Envelope<P> {
        self.bus.publish(address, payload)
    }

    pub fn peek(&self, address: &EventAddress) -> Option<P> {
        self.bus.peek(address)
    }
}

impl<P: Clone> Drop for BusHandle<P> {
    fn drop(&mut self) {
        self.dispose();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::atomic::AtomicUsize;
    use std::sync::Arc;

    fn counter() -> (Arc<AtomicUsize>, Listener<Value>) {
        let count = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&count);
        (
            count,
            Listener::infallible(move |_| {
                seen.fetch_add(1, Ordering::SeqCst);
            }),
        )
    }

    #[test]
    fn test_dispose_releases_everything() {
        let bus: EventBus = EventBus::new();
        let handle = BusHandle::new(bus.clone(), "cart");
        let (count, listener) = counter();
        let a = EventAddress::all("global").unwrap();
        let b = EventAddress::new("cart", "updated").unwrap();

        handle.subscribe(&a, listener.clone()).unwrap();
        handle.subscribe(&b, listener.clone()).unwrap();
        handle.subscribe_once(&b, listener).unwrap();
        assert_eq!(handle.registered_count(), 3);

        assert_eq!(handle.dispose(), 3);
        assert_eq!(handle.dispose(), 0);

        bus.publish(a.clone(), json!(1));
        bus.publish(b.clone(), json!(1));
        assert_eq!(count.load(Ordering::SeqCst), 0);
        assert_eq!(bus.listener_count(&a), 0);
        assert_eq!(bus.listener_count(&b), 0);
    }

    #[test]
    fn test_unsubscribe_only_touches_own_registrations() {
        let bus: EventBus = EventBus::new();
        let mine = BusHandle::new(bus.clone(), "mine");
        let theirs = BusHandle::new(bus.clone(), "theirs");
        let (count, shared) = counter();
        let a = EventAddress::all("global").unwrap();

        mine.subscribe(&a, shared.clone()).unwrap();
        theirs.subscribe(&a, shared.clone()).unwrap();

        assert_eq!(mine.unsubscribe(&a, &shared), 1);
        bus.publish(a.clone(), json!(1));
        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert_eq!(theirs.registered_count(), 1);
    }

    #[test]
    fn test_spent_once_pruned() {
        let bus: EventBus = EventBus::new();
        let handle = BusHandle::new(bus.clone(), "modal");
        let (_, listener) = counter();
        let a = EventAddress::new("modal", "closed").unwrap();

        handle.subscribe_once(&a, listener).unwrap();
        bus.publish(a, json!(null));

        assert_eq!(handle.registered_count(), 0);
        assert_eq!(handle.dispose(), 0);
    }

    #[test]
    fn test_subscribe_after_dispose_rejected() {
        let bus: EventBus = EventBus::new();
        let handle = BusHandle::new(bus.clone(), "late");
        let (_, listener) = counter();
        handle.dispose();

        let result = handle.subscribe(&EventAddress::all("global").unwrap(), listener);
        assert!(matches!(result, Err(ViewError::Disposed(owner)) if owner == "late"));
        assert_eq!(bus.listener_count(&EventAddress::all("global").unwrap()), 0);
    }

    #[test]
    fn test_drop_disposes() {
        let bus: EventBus = EventBus::new();
        let a = EventAddress::all("global").unwrap();
        let (count, listener) = counter();

        {
            let handle = BusHandle::new(bus.clone(), "scoped");
            handle.subscribe(&a, listener).unwrap();
            assert_eq!(bus.listener_count(&a), 1);
        }

        assert_eq!(bus.listener_count(&a), 0);
        bus.publish(a, json!(1));
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_invalid_subscribe_to() {
        let bus: EventBus = EventBus::new();
        let handle = BusHandle::new(bus, "bad");
        let (_, listener) = counter();

        assert!(matches!(
            handle.subscribe_to("component", "", listener),
            Err(ViewError::Event(_))
        ));
        assert_eq!(handle.registered_count(), 0);
    }
}
