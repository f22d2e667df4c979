//! Event addresses
//!
//! An address is the `(channel, topic)` pair a message is delivered to.
//! Three channels are reserved by the framework:
//!
//! - [`CHANNEL_ALL`] - every component and every blueprint
//! - [`CHANNEL_COMPONENT`] - sibling and child components
//! - [`CHANNEL_BLUEPRINT`] - the page-level blueprint
//!
//! When a broadcast omits its topic, [`DEFAULT_TOPIC`] is used.

use crate::error::{EventError, Result};
use serde::Serialize;
use std::fmt;
use std::sync::Arc;

/// Broadcast to every component and blueprint
pub const CHANNEL_ALL: &str = "all";

/// Broadcast to components only
pub const CHANNEL_COMPONENT: &str = "component";

/// Broadcast to the page blueprint only
pub const CHANNEL_BLUEPRINT: &str = "blueprint";

/// Topic used when a broadcast does not name one
pub const DEFAULT_TOPIC: &str = "global";

/// The reserved channels, in the order views subscribe to them.
pub const RESERVED_CHANNELS: [&str; 3] = [CHANNEL_ALL, CHANNEL_COMPONENT, CHANNEL_BLUEPRINT];

/// Immutable `(channel, topic)` destination.
///
/// Equality and hashing are structural. Cloning is cheap.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct EventAddress {
    channel: Arc<str>,
    topic: Arc<str>,
}

impl EventAddress {
    /// Create an address.
    ///
    /// Fails with [`EventError::InvalidAddress`] when either part is empty
    /// or only whitespace.
    ///
    /// ```
    /// use mosaic_events::EventAddress;
    ///
    /// let address = EventAddress::new("cart", "updated").unwrap();
    /// assert_eq!(address.channel(), "cart");
    /// assert!(EventAddress::new("cart", "").is_err());
    /// ```
    pub fn new(channel: impl AsRef<str>, topic: impl AsRef<str>) -> Result<Self> {
        let channel = channel.as_ref();
        let topic = topic.as_ref();

        if channel.trim().is_empty() {
            return Err(EventError::invalid_address("channel", channel));
        }
        if topic.trim().is_empty() {
            return Err(EventError::invalid_address("topic", topic));
        }

        Ok(Self {
            channel: Arc::from(channel),
            topic: Arc::from(topic),
        })
    }

    /// Address on the `all` channel
    pub fn all(topic: impl AsRef<str>) -> Result<Self> {
        Self::new(CHANNEL_ALL, topic)
    }

    /// Address on the `component` channel
    pub fn component(topic: impl AsRef<str>) -> Result<Self> {
        Self::new(CHANNEL_COMPONENT, topic)
    }

    /// Address on the `blueprint` channel
    pub fn blueprint(topic: impl AsRef<str>) -> Result<Self> {
        Self::new(CHANNEL_BLUEPRINT, topic)
    }

    pub fn channel(&self) -> &str {
        &self.channel
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    /// Whether the channel is one of the framework's reserved channels.
    pub fn is_reserved(&self) -> bool {
        is_reserved_channel(&self.channel)
    }
}

impl fmt::Display for EventAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.channel, self.topic)
    }
}

impl TryFrom<(&str, &str)> for EventAddress {
    type Error = EventError;

    fn try_from((channel, topic): (&str, &str)) -> Result<Self> {
        Self::new(channel, topic)
    }
}

/// Check whether a channel name is reserved.
pub fn is_reserved_channel(channel: &str) -> bool {
    RESERVED_CHANNELS.contains(&channel)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_structural_equality() {
        let a = EventAddress::new("cart", "updated").unwrap();
        let b = EventAddress::new(String::from("cart"), String::from("updated")).unwrap();
        assert_eq!(a, b);

        let mut set = HashSet::new();
        set.insert(a);
        assert!(set.contains(&b));
    }

    #[test]
    fn test_rejects_empty_parts() {
        assert_eq!(
            EventAddress::new("", "nav"),
            Err(EventError::InvalidAddress {
                field: "channel",
                value: String::new(),
            })
        );
        assert_eq!(
            EventAddress::new("all", "   "),
            Err(EventError::InvalidAddress {
                field: "topic",
                value: "   ".to_string(),
            })
        );
    }

    #[test]
    fn test_reserved_helpers() {
        assert_eq!(EventAddress::all("x").unwrap().channel(), CHANNEL_ALL);
        assert_eq!(
            EventAddress::component("x").unwrap().channel(),
            CHANNEL_COMPONENT
        );
        assert_eq!(
            EventAddress::blueprint("x").unwrap().channel(),
            CHANNEL_BLUEPRINT
        );

        assert!(EventAddress::all("x").unwrap().is_reserved());
        assert!(!EventAddress::new("cart", "x").unwrap().is_reserved());
    }

    #[test]
    fn test_display_and_try_from() {
        let address = EventAddress::try_from(("blueprint", "nav")).unwrap();
        assert_eq!(address.to_string(), "blueprint/nav");
        assert!(EventAddress::try_from(("", "nav")).is_err());
    }
}
