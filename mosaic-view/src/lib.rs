//! View lifecycle binding for the Mosaic event bus.
//!
//! Every mounted component or blueprint owns one [`BusHandle`] onto the
//! shared [`mosaic_events::EventBus`]. Mounting checks that the rendering
//! layer produced a root element and initial data, then subscribes the
//! view to the default broadcast channels. Disposing (or dropping) the
//! instance releases every listener the handle registered.
//!
//! ## Mounting a page
//!
//! ```
//! use mosaic_events::{Envelope, EventBus, ListenerError};
//! use mosaic_view::{MemoryHost, Page, View, ViewContext};
//! use serde_json::{json, Value};
//!
//! struct Nav;
//!
//! impl View for Nav {
//!     fn on_message(&self, envelope: &Envelope<Value>) -> Result<(), ListenerError> {
//!         println!("nav received {}", envelope.payload);
//!         Ok(())
//!     }
//! }
//!
//! let host = MemoryHost::new().with_element("nav");
//! let mut page: Page = Page::new(EventBus::new());
//! page.add(ViewContext::new("nav", "home", "nav").with_data(json!({})), Nav);
//!
//! assert!(page.mount_all(&host).is_empty());
//! page.bus().to_components(json!({"open": true}), None).unwrap();
//! page.teardown();
//! ```

mod context;
mod error;
mod handle;
mod host;
mod lifecycle;
mod page;

pub use context::{DeviceType, ViewContext, ViewKind};
pub use error::{MissingPrecondition, Result, ViewError};
pub use handle::BusHandle;
pub use host::{ElementRef, MemoryHost, RenderHost};
pub use lifecycle::{View, ViewInstance, ViewOptions, ViewState};
pub use page::Page;
