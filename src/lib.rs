// Mosaic - cross-component messaging for component-based pages
//
// Components and page blueprints rendered side by side on one page talk to
// each other through an addressed publish/subscribe bus without holding
// references to each other.

pub mod logging;

// Re-export the bus
pub use mosaic_events::*;

// Re-export the view lifecycle binding
#[cfg(feature = "view")]
pub use mosaic_view::{
    BusHandle, DeviceType, ElementRef, MemoryHost, MissingPrecondition, Page, RenderHost, View,
    ViewContext, ViewError, ViewInstance, ViewKind, ViewOptions, ViewState,
};

#[cfg(feature = "view")]
pub use mosaic_view;

pub use mosaic_events;

// Prelude for common imports
pub mod prelude {
    pub use crate::{
        Envelope, EventAddress, EventBus, EventBusBuilder, EventBusConfig, Listener,
        ListenerError, Subscription,
    };
    pub use serde_json::{Value, json};

    #[cfg(feature = "view")]
    pub use crate::{BusHandle, Page, RenderHost, View, ViewContext, ViewInstance, ViewOptions};
}
