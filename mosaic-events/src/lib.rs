//! Cross-component event bus for Mosaic
//!
//! Independently rendered fragments (components and blueprints) exchange
//! messages through addressed channels without holding references to one
//! another.
//!
//! ## Features
//!
//! - **Addressed** - every message goes to a `(channel, topic)` pair
//! - **Broadcast channels** - `all`, `component` and `blueprint` are built in
//! - **Peek** - the last value per address is cached for late readers
//! - **One-shot listeners** - delivered at most once
//! - **Failure isolation** - a failing listener never stops the others
//! - **Request/response** - listeners can reply through the envelope
//!
//! ## Quick Start
//!
//! ```rust
//! use mosaic_events::*;
//! use serde_json::json;
//!
//! let bus: EventBus = EventBus::new();
//! let address = EventAddress::all("global").unwrap();
//!
//! bus.subscribe(&address, Listener::infallible(|envelope: &Envelope<serde_json::Value>| {
//!     println!("received {}", envelope.payload);
//! }));
//!
//! bus.to_all(json!({"status": "ready"}), None).unwrap();
//! assert_eq!(bus.peek(&address), Some(json!({"status": "ready"})));
//! ```
//!
//! ## One-shot listeners
//!
//! ```rust
//! use mosaic_events::*;
//! use serde_json::json;
//!
//! let bus: EventBus = EventBus::new();
//! let address = EventAddress::new("session", "expired").unwrap();
//!
//! bus.subscribe_once(&address, Listener::infallible(|_| println!("logging out")));
//!
//! bus.publish(address.clone(), json!(null));
//! bus.publish(address.clone(), json!(null));
//! assert_eq!(bus.listener_count(&address), 0);
//! ```
//!
//! ## Configuration
//!
//! ```rust
//! use mosaic_events::*;
//! use serde_json::Value;
//!
//! let bus: EventBus<Value> = EventBusBuilder::new()
//!     .default_topic("page")
//!     .enable_logging(false)
//!     .on_listener_failure(|failure| eprintln!("{}", failure))
//!     .build();
//! ```

pub mod address;
pub mod bus;
pub mod config;
pub mod emitter;
pub mod envelope;
pub mod error;
pub mod sink;

pub use address::{
    is_reserved_channel, EventAddress, CHANNEL_ALL, CHANNEL_BLUEPRINT, CHANNEL_COMPONENT,
    DEFAULT_TOPIC, RESERVED_CHANNELS,
};
pub use bus::{EventBus, EventBusBuilder};
pub use config::{EventBusConfig, FailureReporter};
pub use emitter::{Delivery, EventEmitter, Listener, RegistrationId, Subscription};
pub use envelope::{Envelope, ResponseSlot};
pub use error::{EventError, ListenerError, ListenerFailure, Result};
