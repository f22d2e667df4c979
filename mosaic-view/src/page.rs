//! Page-level set of view instances sharing one bus

use crate::context::ViewContext;
use crate::error::ViewError;
use crate::host::RenderHost;
use crate::lifecycle::{View, ViewInstance, ViewOptions};
use mosaic_events::EventBus;
use serde_json::Value;
use tracing::{info, warn};

/// The blueprint and components rendered into one page.
///
/// A mount failure only affects the instance that failed; the rest of the
/// page still mounts. Teardown disposes instances in reverse order of
/// addition and then clears the bus.
pub struct Page<P: Clone + Send + Sync + 'static = Value> {
    bus: EventBus<P>,
    instances: Vec<ViewInstance<P>>,
}

impl Page<Value> {
    /// Page bound to the process-wide bus
    pub fn global() -> Self {
        Self::new(EventBus::global().clone())
    }
}

impl<P: Clone + Send + Sync + 'static> Page<P> {
    pub fn new(bus: EventBus<P>) -> Self {
        Self {
            bus,
            instances: Vec::new(),
        }
    }

    /// Add a view bound to this page's bus.
    pub fn add(&mut self, context: ViewContext, view: impl View<P>) -> &mut ViewInstance<P> {
        self.add_with_options(context, view, ViewOptions::default())
    }

    pub fn add_with_options(
        &mut self,
        context: ViewContext,
        view: impl View<P>,
        options: ViewOptions,
    ) -> &mut ViewInstance<P> {
        let instance =
            ViewInstance::with_bus(context, view, self.bus.clone()).with_options(options);
        self.instances.push(instance);
        let last = self.instances.len() - 1;
        &mut self.instances[last]
    }

    /// Mount every instance that is not mounted yet.
    ///
    /// Returns the failures; instances that failed stay in the page and can
    /// be mounted again later.
    pub fn mount_all(&mut self, host: &dyn RenderHost) -> Vec<ViewError> {
        let mut failures = Vec::new();

        for instance in self.instances.iter_mut().filter(|i| !i.is_mounted()) {
            if let Err(e) = instance.mount(host) {
                failures.push(e);
            }
        }

        if !failures.is_empty() {
            warn!(
                "{} of {} view(s) failed to mount",
                failures.len(),
                self.instances.len()
            );
        }

        failures
    }

    /// Dispose and remove the instance with DOM ID `id`.
    pub fn remove(&mut self, id: &str) -> Option<usize> {
        let position = self.instances.iter().position(|i| i.context().id == id)?;
        let mut instance = self.instances.remove(position);
        Some(instance.dispose())
    }

    pub fn get(&self, id: &str) -> Option<&ViewInstance<P>> {
        self.instances.iter().find(|i| i.context().id == id)
    }

    pub fn get_mut(&mut self, id: &str) -> Option<&mut ViewInstance<P>> {
        self.instances.iter_mut().find(|i| i.context().id == id)
    }

    /// Dispose every instance (last added first) and clear the bus.
    ///
    /// Returns the number of listeners released by the instances.
    pub fn teardown(&mut self) -> usize {
        let mut released = 0;
        while let Some(mut instance) = self.instances.pop() {
            released += instance.dispose();
        }
        self.bus.clear();

        info!("Page torn down ({} listener(s) released)", released);
        released
    }

    pub fn bus(&self) -> &EventBus<P> {
        &self.bus
    }

    pub fn len(&self) -> usize {
        self.instances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }

    pub fn mounted_count(&self) -> usize {
        self.instances.iter().filter(|i| i.is_mounted()).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::MemoryHost;
    use mosaic_events::{Envelope, EventAddress, ListenerError};
    use serde_json::json;

    struct Silent;

    impl View for Silent {
        fn on_message(&self, _envelope: &Envelope<Value>) -> Result<(), ListenerError> {
            Ok(())
        }
    }

    #[test]
    fn test_failed_mount_does_not_block_siblings() {
        let mut page: Page = Page::new(EventBus::new());
        let host = MemoryHost::new().with_element("ok-1").with_element("ok-2");

        page.add(ViewContext::new("ok-1", "home", "a").with_data(json!({})), Silent);
        page.add(ViewContext::new("missing", "home", "b").with_data(json!({})), Silent);
        page.add(ViewContext::new("ok-2", "home", "c").with_data(json!({})), Silent);

        let failures = page.mount_all(&host);
        assert_eq!(failures.len(), 1);
        assert_eq!(page.mounted_count(), 2);

        host.insert_element("missing");
        assert!(page.mount_all(&host).is_empty());
        assert_eq!(page.mounted_count(), 3);
    }

    #[test]
    fn test_remove_and_teardown() {
        let mut page: Page = Page::new(EventBus::new());
        let host = MemoryHost::new().with_element("a").with_element("b");
        let address = EventAddress::all("global").unwrap();

        page.add(ViewContext::new("a", "home", "a").with_data(json!({})), Silent);
        page.add(ViewContext::new("b", "home", "b").with_data(json!({})), Silent);
        page.mount_all(&host);
        assert_eq!(page.bus().listener_count(&address), 2);

        assert_eq!(page.remove("a"), Some(3));
        assert_eq!(page.remove("a"), None);
        assert_eq!(page.bus().listener_count(&address), 1);

        page.bus().to_all(json!("cached"), None).unwrap();
        assert_eq!(page.teardown(), 3);
        assert!(page.is_empty());
        assert_eq!(page.bus().peek(&address), None);
    }
}
