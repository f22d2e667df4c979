//! Event Bus facade

use crate::address::{CHANNEL_ALL, CHANNEL_BLUEPRINT, CHANNEL_COMPONENT, EventAddress};
use crate::config::{EventBusConfig, FailureReporter};
use crate::emitter::{Delivery, EventEmitter, Listener, RegistrationId, Subscription};
use crate::envelope::Envelope;
use crate::error::{EventError, ListenerFailure, Result};
use crate::sink::EventSink;
use once_cell::sync::Lazy;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::Arc;
use tracing::{trace, warn};

static GLOBAL: Lazy<EventBus> = Lazy::new(|| {
    let config = EventBusConfig::from_env().unwrap_or_else(|e| {
        warn!("Ignoring bus environment configuration: {}", e);
        EventBusConfig::default()
    });
    EventBus::with_config(config)
});

/// Event bus composing the last-value sink and the emitter.
///
/// Cloning is cheap and every clone shares the same tables. The process
/// wide instance is [`EventBus::global`]; tests and hosts that want
/// isolation create their own and inject it into views.
pub struct EventBus<P = Value> {
    sink: EventSink<P>,
    emitter: EventEmitter<P>,
    config: Arc<EventBusConfig>,
}

impl<P> Clone for EventBus<P> {
    fn clone(&self) -> Self {
        Self {
            sink: self.sink.clone(),
            emitter: self.emitter.clone(),
            config: Arc::clone(&self.config),
        }
    }
}

impl EventBus<Value> {
    /// The process-wide bus, created on first use.
    ///
    /// Its configuration is read from `MOSAIC_BUS_*` environment variables
    /// when it is first touched. It lives until the process exits; call
    /// [`EventBus::clear`] at page teardown.
    pub fn global() -> &'static EventBus {
        &GLOBAL
    }

    /// Start building a bus. Use [`EventBusBuilder::build`] directly for
    /// payload types other than `Value`.
    pub fn builder() -> EventBusBuilder {
        EventBusBuilder::new()
    }

    /// Serialise a value and publish it.
    pub fn publish_json<T: Serialize>(
        &self,
        address: EventAddress,
        payload: &T,
    ) -> Result<Envelope<Value>> {
        let payload =
            serde_json::to_value(payload).map_err(|e| EventError::Payload(e.to_string()))?;
        Ok(self.publish(address, payload))
    }

    /// Deserialise the last value published to `address`.
    pub fn peek_as<T: DeserializeOwned>(&self, address: &EventAddress) -> Result<Option<T>> {
        self.peek(address)
            .map(|value| {
                serde_json::from_value(value).map_err(|e| EventError::Payload(e.to_string()))
            })
            .transpose()
    }
}

impl<P: Clone> EventBus<P> {
    /// Create a new event bus
    pub fn new() -> Self {
        Self::with_config(EventBusConfig::default())
    }

    /// Create an event bus with custom config
    pub fn with_config(config: EventBusConfig) -> Self {
        let config = Arc::new(config);
        Self {
            sink: EventSink::new(),
            emitter: EventEmitter::with_config(Arc::clone(&config)),
            config,
        }
    }

    /// Broadcast to every component and blueprint.
    ///
    /// `topic` defaults to the configured default topic.
    ///
    /// ```
    /// use mosaic_events::{EventAddress, EventBus};
    /// use serde_json::json;
    ///
    /// let bus = EventBus::new();
    /// bus.to_all(json!({"status": "ready"}), None).unwrap();
    ///
    /// let address = EventAddress::all("global").unwrap();
    /// assert_eq!(bus.peek(&address), Some(json!({"status": "ready"})));
    /// ```
    pub fn to_all(&self, payload: P, topic: Option<&str>) -> Result<Envelope<P>> {
        self.broadcast(CHANNEL_ALL, payload, topic)
    }

    /// Broadcast to components.
    pub fn to_components(&self, payload: P, topic: Option<&str>) -> Result<Envelope<P>> {
        self.broadcast(CHANNEL_COMPONENT, payload, topic)
    }

    /// Broadcast to the page blueprint.
    pub fn to_blueprint(&self, payload: P, topic: Option<&str>) -> Result<Envelope<P>> {
        self.broadcast(CHANNEL_BLUEPRINT, payload, topic)
    }

    fn broadcast(&self, channel: &str, payload: P, topic: Option<&str>) -> Result<Envelope<P>> {
        let address = self.address_on(channel, topic)?;
        Ok(self.publish(address, payload))
    }

    /// Address on `channel`, using the default topic when `topic` is `None`.
    pub fn address_on(&self, channel: &str, topic: Option<&str>) -> Result<EventAddress> {
        EventAddress::new(channel, topic.unwrap_or(&self.config.default_topic))
    }

    /// Record and dispatch a payload on any address.
    pub fn publish(&self, address: EventAddress, payload: P) -> Envelope<P> {
        self.publish_envelope(Envelope::new(address, payload))
    }

    /// Record and dispatch a prebuilt envelope.
    ///
    /// The envelope is returned so the publisher can read its response.
    pub fn publish_envelope(&self, envelope: Envelope<P>) -> Envelope<P> {
        if self.config.enable_logging {
            trace!("Publishing to {} (id: {})", envelope.address, envelope.id);
        }

        self.sink.record(&envelope);
        self.emitter.emit(&envelope);
        envelope
    }

    /// Register a persistent listener.
    pub fn subscribe(&self, address: &EventAddress, listener: Listener<P>) -> Subscription {
        self.emitter.register(address, listener, Delivery::Persistent)
    }

    /// Register a listener for the next publish only.
    pub fn subscribe_once(&self, address: &EventAddress, listener: Listener<P>) -> Subscription {
        self.emitter.register(address, listener, Delivery::Once)
    }

    /// Validate `channel` and `topic`, then subscribe.
    pub fn subscribe_to(
        &self,
        channel: &str,
        topic: &str,
        listener: Listener<P>,
    ) -> Result<Subscription> {
        let address = EventAddress::new(channel, topic)?;
        Ok(self.subscribe(&address, listener))
    }

    /// Remove every registration of `listener` on `address`.
    pub fn unsubscribe(&self, address: &EventAddress, listener: &Listener<P>) -> usize {
        self.emitter.off(address, listener)
    }

    /// Validate `channel` and `topic`, then unsubscribe.
    pub fn unsubscribe_from(
        &self,
        channel: &str,
        topic: &str,
        listener: &Listener<P>,
    ) -> Result<usize> {
        let address = EventAddress::new(channel, topic)?;
        Ok(self.unsubscribe(&address, listener))
    }

    /// Remove one registration.
    pub fn remove(&self, address: &EventAddress, id: RegistrationId) -> bool {
        self.emitter.remove(address, id)
    }

    /// Last payload published to `address`.
    pub fn peek(&self, address: &EventAddress) -> Option<P> {
        self.sink.peek(address)
    }

    /// Last envelope published to `address`.
    pub fn peek_envelope(&self, address: &EventAddress) -> Option<Envelope<P>> {
        self.sink.peek_envelope(address)
    }

    pub fn listener_count(&self, address: &EventAddress) -> usize {
        self.emitter.listener_count(address)
    }

    /// Drop every listener and cached value. Page teardown only.
    pub fn clear(&self) {
        self.emitter.clear();
        self.sink.clear();
    }

    pub fn config(&self) -> &EventBusConfig {
        &self.config
    }

    pub fn sink(&self) -> &EventSink<P> {
        &self.sink
    }

    pub fn emitter(&self) -> &EventEmitter<P> {
        &self.emitter
    }
}

impl<P: Clone> Default for EventBus<P> {
    fn default() -> Self {
        Self::new()
    }
}

/// Event bus builder
pub struct EventBusBuilder {
    config: EventBusConfig,
}

impl EventBusBuilder {
    /// Create new event bus builder
    pub fn new() -> Self {
        Self {
            config: EventBusConfig::default(),
        }
    }

    /// Start from an existing configuration
    pub fn config(mut self, config: EventBusConfig) -> Self {
        self.config = config;
        self
    }

    /// Topic used when a broadcast omits one
    pub fn default_topic(mut self, topic: impl Into<String>) -> Self {
        self.config.default_topic = topic.into();
        self
    }

    /// Channels views subscribe to on mount
    pub fn default_channels<I, S>(mut self, channels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.default_channels = channels.into_iter().map(Into::into).collect();
        self
    }

    /// Enable/disable logging
    pub fn enable_logging(mut self, enabled: bool) -> Self {
        self.config.enable_logging = enabled;
        self
    }

    /// Receive listener failures
    pub fn on_listener_failure<F>(mut self, reporter: F) -> Self
    where
        F: Fn(&ListenerFailure) + Send + Sync + 'static,
    {
        let reporter: FailureReporter = Arc::new(reporter);
        self.config.failure_reporter = Some(reporter);
        self
    }

    /// Build the event bus
    pub fn build<P: Clone>(self) -> EventBus<P> {
        EventBus::with_config(self.config)
    }

    /// Validate the configuration, then build
    pub fn try_build<P: Clone>(self) -> Result<EventBus<P>> {
        self.config.validate()?;
        Ok(self.build())
    }
}

impl Default for EventBusBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ListenerError;
    use parking_lot::Mutex;
    use serde::Deserialize;
    use serde_json::json;

    fn recorder() -> (Arc<Mutex<Vec<Value>>>, Listener<Value>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let listener = Listener::infallible(move |envelope: &Envelope<Value>| {
            sink.lock().push(envelope.payload.clone())
        });
        (seen, listener)
    }

    #[test]
    fn test_publish_then_peek() {
        let bus = EventBus::new();
        let address = EventAddress::new("cart", "updated").unwrap();

        assert_eq!(bus.peek(&address), None);
        bus.publish(address.clone(), json!({"items": 3}));
        assert_eq!(bus.peek(&address), Some(json!({"items": 3})));
    }

    #[test]
    fn test_reserved_channels_are_separate() {
        let bus = EventBus::new();
        let (seen, listener) = recorder();

        bus.subscribe_to("blueprint", "nav", listener).unwrap();

        bus.to_components(json!({"x": 1}), Some("nav")).unwrap();
        assert!(seen.lock().is_empty());

        bus.to_blueprint(json!({"x": 1}), Some("nav")).unwrap();
        assert_eq!(*seen.lock(), vec![json!({"x": 1})]);
    }

    #[test]
    fn test_default_topic() {
        let bus: EventBus<Value> = EventBus::builder().default_topic("page").build();
        let envelope = bus.to_all(json!(1), None).unwrap();

        assert_eq!(envelope.address.channel(), "all");
        assert_eq!(envelope.address.topic(), "page");
    }

    #[test]
    fn test_empty_topic_rejected_and_not_recorded() {
        let bus = EventBus::new();
        let result = bus.to_all(json!({"status": "ready"}), Some(""));

        assert!(matches!(
            result,
            Err(EventError::InvalidAddress { field: "topic", .. })
        ));
        assert!(bus.sink().is_empty());
    }

    #[test]
    fn test_unsubscribe_from() {
        let bus = EventBus::new();
        let (seen, listener) = recorder();

        bus.subscribe_to("cart", "updated", listener.clone()).unwrap();
        assert_eq!(bus.unsubscribe_from("cart", "updated", &listener).unwrap(), 1);
        assert!(bus.unsubscribe_from("", "updated", &listener).is_err());

        bus.publish(EventAddress::new("cart", "updated").unwrap(), json!(1));
        assert!(seen.lock().is_empty());
    }

    #[test]
    fn test_request_response() {
        let bus = EventBus::new();
        let address = EventAddress::new("pricing", "quote").unwrap();

        bus.subscribe(
            &address,
            Listener::infallible(|envelope: &Envelope<Value>| {
                let qty = envelope.payload["qty"].as_u64().unwrap_or(0);
                envelope.respond(json!({"total": qty * 5}));
            }),
        );

        let envelope = bus.publish(address.clone(), json!({"qty": 4}));
        assert_eq!(envelope.response(), Some(json!({"total": 20})));
        assert!(bus.peek_envelope(&address).unwrap().has_response());
    }

    #[test]
    fn test_failure_reported_not_propagated() {
        let failures = Arc::new(Mutex::new(0));
        let counted = Arc::clone(&failures);
        let bus: EventBus<Value> = EventBus::builder()
            .on_listener_failure(move |_| *counted.lock() += 1)
            .build();
        let (seen, listener) = recorder();

        bus.subscribe_to("all", "global", Listener::new(|_| Err(ListenerError::failed("x"))))
            .unwrap();
        bus.subscribe_to("all", "global", listener).unwrap();

        assert!(bus.to_all(json!("hi"), None).is_ok());
        assert_eq!(*failures.lock(), 1);
        assert_eq!(seen.lock().len(), 1);
    }

    #[test]
    fn test_json_helpers() {
        #[derive(Debug, Serialize, Deserialize, PartialEq)]
        struct Status {
            status: String,
        }

        let bus: EventBus = EventBus::new();
        let address = EventAddress::all("status").unwrap();
        let status = Status {
            status: "ready".to_string(),
        };

        bus.publish_json(address.clone(), &status).unwrap();
        assert_eq!(bus.peek_as::<Status>(&address).unwrap(), Some(status));

        let missing = EventAddress::all("missing").unwrap();
        assert_eq!(bus.peek_as::<Status>(&missing).unwrap(), None);

        assert!(matches!(
            bus.peek_as::<u32>(&address),
            Err(EventError::Payload(_))
        ));
    }

    #[test]
    fn test_clear() {
        let bus = EventBus::new();
        let (seen, listener) = recorder();
        let address = EventAddress::all("global").unwrap();

        bus.subscribe(&address, listener);
        bus.to_all(json!(1), None).unwrap();
        bus.clear();

        assert_eq!(bus.peek(&address), None);
        assert_eq!(bus.listener_count(&address), 0);
        bus.to_all(json!(2), None).unwrap();
        assert_eq!(seen.lock().len(), 1);
    }

    #[test]
    fn test_try_build_validates() {
        let result = EventBus::builder().default_topic("").try_build::<Value>();
        assert!(matches!(result, Err(EventError::Config(_))));
    }

    #[test]
    fn test_global_is_shared() {
        let a = EventBus::global();
        let b = EventBus::global();
        let address = EventAddress::new("global-test", "shared").unwrap();

        a.publish(address.clone(), json!("value"));
        assert_eq!(b.peek(&address), Some(json!("value")));
    }
}
