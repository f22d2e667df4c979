//! View instance lifecycle: mount, implicit subscriptions, dispose
//!
//! ```
//! use mosaic_events::{Envelope, EventBus, ListenerError};
//! use mosaic_view::{MemoryHost, View, ViewContext, ViewInstance};
//! use serde_json::{json, Value};
//!
//! struct Banner;
//!
//! impl View for Banner {
//!     fn on_message(&self, envelope: &Envelope<Value>) -> Result<(), ListenerError> {
//!         println!("banner got {}", envelope.payload);
//!         Ok(())
//!     }
//! }
//!
//! let bus: EventBus = EventBus::new();
//! let host = MemoryHost::new().with_element("banner");
//! let ctx = ViewContext::new("banner", "home", "banner").with_data(json!({}));
//!
//! let mut banner = ViewInstance::with_bus(ctx, Banner, bus.clone());
//! banner.mount(&host).unwrap();
//!
//! bus.to_all(json!({"status": "ready"}), None).unwrap();
//! banner.dispose();
//! ```

use crate::context::ViewContext;
use crate::error::{MissingPrecondition, Result, ViewError};
use crate::handle::BusHandle;
use crate::host::{ElementRef, RenderHost};
use mosaic_events::{Envelope, EventAddress, EventBus, Listener, ListenerError};
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, warn};

/// Behaviour of a component or blueprint.
pub trait View<P: Clone = Value>: Send + Sync + 'static {
    /// Called for every message on the channels the view is subscribed to.
    fn on_message(&self, envelope: &Envelope<P>) -> std::result::Result<(), ListenerError>;

    /// Called once, after the root element and data are resolved and the
    /// implicit subscriptions are in place.
    fn mounted(&self, _ctx: &ViewContext, _bus: &BusHandle<P>) {}

    /// Called once before the instance's subscriptions are released.
    fn disposing(&self, _ctx: &ViewContext) {}
}

/// Per-instance overrides of the bus defaults.
#[derive(Debug, Clone)]
pub struct ViewOptions {
    /// Subscribe to the default channels on mount
    pub implicit_subscriptions: bool,

    /// Channels to subscribe to instead of the bus's `default_channels`
    pub channels: Option<Vec<String>>,
}

impl ViewOptions {
    /// Opt out of implicit subscriptions
    pub fn without_implicit_subscriptions(mut self) -> Self {
        self.implicit_subscriptions = false;
        self
    }

    /// Replace the default channel list
    pub fn with_channels<I, S>(mut self, channels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.channels = Some(channels.into_iter().map(Into::into).collect());
        self
    }
}

impl Default for ViewOptions {
    fn default() -> Self {
        Self {
            implicit_subscriptions: true,
            channels: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewState {
    Created,
    Mounted,
    /// Mount preconditions failed; mounting may be retried
    Failed,
    Disposed,
}

/// A mounted (or mountable) component or blueprint.
///
/// Owns exactly one [`BusHandle`]. All subscriptions, implicit or made by
/// the view itself through the handle, are released by
/// [`ViewInstance::dispose`] or when the instance is dropped.
pub struct ViewInstance<P: Clone + Send + Sync + 'static = Value> {
    context: ViewContext,
    view: Arc<dyn View<P>>,
    handle: BusHandle<P>,
    options: ViewOptions,
    root: Option<ElementRef>,
    state: ViewState,
}

impl ViewInstance<Value> {
    /// Bind a view to the process-wide bus.
    pub fn new(context: ViewContext, view: impl View<Value>) -> Self {
        Self::with_bus(context, view, EventBus::global().clone())
    }
}

impl<P: Clone + Send + Sync + 'static> ViewInstance<P> {
    /// Bind a view to an injected bus.
    pub fn with_bus(context: ViewContext, view: impl View<P>, bus: EventBus<P>) -> Self {
        let handle = BusHandle::new(bus, context.label());
        Self {
            context,
            view: Arc::new(view),
            handle,
            options: ViewOptions::default(),
            root: None,
            state: ViewState::Created,
        }
    }

    pub fn with_options(mut self, options: ViewOptions) -> Self {
        self.options = options;
        self
    }

    /// Resolve the root element and initial data, subscribe to the default
    /// channels and fire [`View::mounted`].
    ///
    /// Fails with [`ViewError::MountPrecondition`] when the host has no
    /// root element for the instance or no initial data is available; in
    /// that case nothing is subscribed. Mounting a mounted instance is a
    /// no-op.
    pub fn mount(&mut self, host: &dyn RenderHost) -> Result<()> {
        match self.state {
            ViewState::Mounted => {
                debug!("{} is already mounted", self.context.label());
                return Ok(());
            }
            ViewState::Disposed => return Err(ViewError::Disposed(self.context.label())),
            ViewState::Created | ViewState::Failed => {}
        }

        if let Err(missing) = self.resolve(host) {
            self.state = ViewState::Failed;
            warn!("Mount of {} failed: {}", self.context.label(), missing);
            return Err(ViewError::MountPrecondition {
                view: self.context.label(),
                missing,
            });
        }

        let addresses = self.implicit_addresses()?;
        let view = Arc::clone(&self.view);
        let listener = Listener::new(move |envelope: &Envelope<P>| view.on_message(envelope));

        for address in &addresses {
            self.handle.subscribe(address, listener.clone())?;
        }

        self.state = ViewState::Mounted;
        debug!(
            "Mounted {} ({}, {} implicit subscription(s))",
            self.context.label(),
            self.context.kind(),
            addresses.len()
        );

        self.view.mounted(&self.context, &self.handle);
        Ok(())
    }

    fn resolve(&mut self, host: &dyn RenderHost) -> std::result::Result<(), MissingPrecondition> {
        let root = host
            .root_element(&self.context.id)
            .ok_or(MissingPrecondition::RootElement)?;

        if self.context.data.is_null() {
            self.context.data = host
                .initial_data(&self.context.id)
                .ok_or(MissingPrecondition::InitialData)?;
        }

        self.root = Some(root);
        Ok(())
    }

    /// Validated before subscribing so a bad channel name subscribes nothing.
    fn implicit_addresses(&self) -> Result<Vec<EventAddress>> {
        if !self.options.implicit_subscriptions {
            return Ok(Vec::new());
        }

        let bus = self.handle.bus();
        let channels = self
            .options
            .channels
            .as_ref()
            .unwrap_or(&bus.config().default_channels);

        channels
            .iter()
            .map(|channel| bus.address_on(channel, None).map_err(ViewError::from))
            .collect()
    }

    /// Fire [`View::disposing`] (if mounted) and release every
    /// subscription. Idempotent; returns how many listeners were released.
    pub fn dispose(&mut self) -> usize {
        if self.state == ViewState::Disposed {
            return 0;
        }

        if self.state == ViewState::Mounted {
            self.view.disposing(&self.context);
        }

        self.state = ViewState::Disposed;
        self.root = None;
        self.handle.dispose()
    }

    pub fn context(&self) -> &ViewContext {
        &self.context
    }

    pub fn handle(&self) -> &BusHandle<P> {
        &self.handle
    }

    pub fn root(&self) -> Option<&ElementRef> {
        self.root.as_ref()
    }

    pub fn state(&self) -> ViewState {
        self.state
    }

    pub fn is_mounted(&self) -> bool {
        self.state == ViewState::Mounted
    }
}

impl<P: Clone + Send + Sync + 'static> Drop for ViewInstance<P> {
    fn drop(&mut self) {
        self.dispose();
    }
}
