//! Listener registration and fan-out

use crate::address::EventAddress;
use crate::config::EventBusConfig;
use crate::envelope::Envelope;
use crate::error::{ListenerError, ListenerFailure};
use dashmap::DashMap;
use std::any::Any;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use tracing::{debug, error, trace};

type ListenerFn<P> = dyn Fn(&Envelope<P>) -> Result<(), ListenerError> + Send + Sync;

/// A shared listener callback.
///
/// Clones of a `Listener` are the same listener: [`EventEmitter::off`]
/// removes every registration made with any clone of it. Two listeners
/// created from identical closures are distinct.
pub struct Listener<P> {
    callback: Arc<ListenerFn<P>>,
}

impl<P> Listener<P> {
    /// Wrap a fallible callback
    pub fn new<F>(callback: F) -> Self
    where
        F: Fn(&Envelope<P>) -> Result<(), ListenerError> + Send + Sync + 'static,
    {
        Self {
            callback: Arc::new(callback),
        }
    }

    /// Wrap a callback that cannot fail
    pub fn infallible<F>(callback: F) -> Self
    where
        F: Fn(&Envelope<P>) + Send + Sync + 'static,
        P: 'static,
    {
        Self::new(move |envelope| {
            callback(envelope);
            Ok(())
        })
    }

    /// Whether both values are clones of the same listener.
    pub fn same(&self, other: &Self) -> bool {
        std::ptr::addr_eq(Arc::as_ptr(&self.callback), Arc::as_ptr(&other.callback))
    }

    fn call(&self, envelope: &Envelope<P>) -> Result<(), ListenerError> {
        (self.callback)(envelope)
    }
}

impl<P> Clone for Listener<P> {
    fn clone(&self) -> Self {
        Self {
            callback: Arc::clone(&self.callback),
        }
    }
}

impl<P> PartialEq for Listener<P> {
    fn eq(&self, other: &Self) -> bool {
        self.same(other)
    }
}

impl<P> Eq for Listener<P> {}

impl<P> fmt::Debug for Listener<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Listener({:p})", Arc::as_ptr(&self.callback) as *const ())
    }
}

/// Unique ID of one registration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RegistrationId(pub u64);

impl fmt::Display for RegistrationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// How often a registration is delivered to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// Every emit until removed
    Persistent,
    /// The first emit only
    Once,
}

/// Token for a single registration.
///
/// Returned by [`EventEmitter::register`]; scoped handles keep these to
/// release exactly what they registered.
#[derive(Debug, Clone)]
pub struct Subscription {
    pub address: EventAddress,
    pub id: RegistrationId,
    pub delivery: Delivery,
    live: Arc<AtomicBool>,
}

impl Subscription {
    /// False once the registration was removed or a one-shot has fired.
    pub fn is_active(&self) -> bool {
        self.live.load(Ordering::Acquire)
    }
}

struct Registration<P> {
    id: RegistrationId,
    listener: Listener<P>,
    delivery: Delivery,
    live: Arc<AtomicBool>,
}

impl<P> Clone for Registration<P> {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            listener: self.listener.clone(),
            delivery: self.delivery,
            live: Arc::clone(&self.live),
        }
    }
}

/// Low-level fan-out: registers listeners per address and dispatches
/// envelopes to them synchronously, in registration order.
///
/// The registration table is never locked while a listener runs, so
/// listeners may register, remove and emit from inside a dispatch.
/// Registrations added during a dispatch are first seen by the next emit;
/// registrations removed during a dispatch are skipped for the rest of it.
pub struct EventEmitter<P> {
    registrations: Arc<DashMap<EventAddress, Vec<Registration<P>>>>,
    next_id: Arc<AtomicU64>,
    config: Arc<EventBusConfig>,
}

impl<P> Clone for EventEmitter<P> {
    fn clone(&self) -> Self {
        Self {
            registrations: Arc::clone(&self.registrations),
            next_id: Arc::clone(&self.next_id),
            config: Arc::clone(&self.config),
        }
    }
}

impl<P> EventEmitter<P> {
    pub fn new() -> Self {
        Self::with_config(Arc::new(EventBusConfig::default()))
    }

    pub fn with_config(config: Arc<EventBusConfig>) -> Self {
        Self {
            registrations: Arc::new(DashMap::new()),
            next_id: Arc::new(AtomicU64::new(1)),
            config,
        }
    }

    /// Register a persistent listener.
    ///
    /// Registering the same listener twice delivers to it twice.
    pub fn on(&self, address: &EventAddress, listener: Listener<P>) {
        self.register(address, listener, Delivery::Persistent);
    }

    /// Register a listener that is removed after its first delivery.
    pub fn once(&self, address: &EventAddress, listener: Listener<P>) {
        self.register(address, listener, Delivery::Once);
    }

    /// Register a listener and return its token.
    pub fn register(
        &self,
        address: &EventAddress,
        listener: Listener<P>,
        delivery: Delivery,
    ) -> Subscription {
        let id = RegistrationId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let live = Arc::new(AtomicBool::new(true));

        self.registrations
            .entry(address.clone())
            .or_default()
            .push(Registration {
                id,
                listener,
                delivery,
                live: Arc::clone(&live),
            });

        if self.config.enable_logging {
            debug!("Registered listener #{} on {} ({:?})", id, address, delivery);
        }

        Subscription {
            address: address.clone(),
            id,
            delivery,
            live,
        }
    }

    /// Remove every registration of `listener` under `address`.
    ///
    /// Returns how many registrations were removed; zero is not an error.
    pub fn off(&self, address: &EventAddress, listener: &Listener<P>) -> usize {
        let removed = self.remove_where(address, |r| r.listener.same(listener));

        if self.config.enable_logging && removed > 0 {
            debug!("Removed {} registration(s) from {}", removed, address);
        }

        removed
    }

    /// Remove a single registration by ID.
    pub fn remove(&self, address: &EventAddress, id: RegistrationId) -> bool {
        self.remove_where(address, |r| r.id == id) > 0
    }

    fn remove_where(
        &self,
        address: &EventAddress,
        matches: impl Fn(&Registration<P>) -> bool,
    ) -> usize {
        let removed = match self.registrations.get_mut(address) {
            Some(mut entry) => {
                let before = entry.len();
                entry.retain(|r| {
                    if matches(r) {
                        r.live.store(false, Ordering::Release);
                        false
                    } else {
                        true
                    }
                });
                before - entry.len()
            }
            None => return 0,
        };

        self.registrations.remove_if(address, |_, list| list.is_empty());
        removed
    }

    /// Dispatch an envelope to every listener on its address.
    ///
    /// Returns the number of listeners invoked. Listener failures are
    /// reported, never returned.
    pub fn emit(&self, envelope: &Envelope<P>) -> usize {
        let address = &envelope.address;
        let snapshot = match self.registrations.get(address) {
            Some(entry) => entry.value().clone(),
            None => {
                trace!("No listeners registered on {}", address);
                return 0;
            }
        };

        let mut delivered = 0;

        for registration in &snapshot {
            let claimed = match registration.delivery {
                Delivery::Persistent => registration.live.load(Ordering::Acquire),
                // Spent before the call so reentrant emits skip it.
                Delivery::Once => registration.live.swap(false, Ordering::AcqRel),
            };
            if !claimed {
                continue;
            }

            delivered += 1;

            if let Err(error) = self.invoke(&registration.listener, envelope) {
                self.report(ListenerFailure {
                    address: address.clone(),
                    registration: registration.id,
                    error,
                });
            }

            if registration.delivery == Delivery::Once {
                self.remove(address, registration.id);
            }
        }

        trace!("Dispatched {} to {} listener(s)", address, delivered);
        delivered
    }

    fn invoke(&self, listener: &Listener<P>, envelope: &Envelope<P>) -> Result<(), ListenerError> {
        match panic::catch_unwind(AssertUnwindSafe(|| listener.call(envelope))) {
            Ok(result) => result,
            Err(payload) => Err(ListenerError::Panicked(panic_message(payload.as_ref()))),
        }
    }

    fn report(&self, failure: ListenerFailure) {
        error!(
            address = %failure.address,
            registration = failure.registration.0,
            "Listener failed: {}",
            failure.error
        );

        if let Some(reporter) = &self.config.failure_reporter {
            if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(|| reporter(&failure))) {
                error!("Failure reporter panicked: {}", panic_message(payload.as_ref()));
            }
        }
    }

    /// Number of live registrations on `address`.
    pub fn listener_count(&self, address: &EventAddress) -> usize {
        self.registrations
            .get(address)
            .map(|entry| {
                entry
                    .iter()
                    .filter(|r| r.live.load(Ordering::Acquire))
                    .count()
            })
            .unwrap_or(0)
    }

    /// Whether the registration is still in the table.
    pub fn contains(&self, address: &EventAddress, id: RegistrationId) -> bool {
        self.registrations
            .get(address)
            .map(|entry| entry.iter().any(|r| r.id == id))
            .unwrap_or(false)
    }

    /// Drop every registration on every address.
    pub fn clear(&self) {
        for entry in self.registrations.iter() {
            for registration in entry.value() {
                registration.live.store(false, Ordering::Release);
            }
        }
        self.registrations.clear();

        if self.config.enable_logging {
            debug!("Cleared all listeners");
        }
    }

    pub fn config(&self) -> &EventBusConfig {
        &self.config
    }
}

impl<P> Default for EventEmitter<P> {
    fn default() -> Self {
        Self::new()
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
