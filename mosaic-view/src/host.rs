//! Rendering adapter seam

use parking_lot::RwLock;
use serde_json::Value;
use std::collections::HashMap;

/// Opaque reference to a rendered root element.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ElementRef(pub String);

impl ElementRef {
    pub fn id(&self) -> &str {
        &self.0
    }
}

/// What the rendering layer exposes to the lifecycle binding.
pub trait RenderHost {
    /// Root element rendered for the instance `id`, if any
    fn root_element(&self, id: &str) -> Option<ElementRef>;

    /// Initial data shipped with the page for instance `id`
    fn initial_data(&self, _id: &str) -> Option<Value> {
        None
    }
}

/// In-memory host, for tests and for pages assembled without a renderer.
#[derive(Debug, Default)]
pub struct MemoryHost {
    elements: RwLock<HashMap<String, ElementRef>>,
    data: RwLock<HashMap<String, Value>>,
}

impl MemoryHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_element(self, id: impl Into<String>) -> Self {
        self.insert_element(id);
        self
    }

    pub fn with_data(self, id: impl Into<String>, data: Value) -> Self {
        self.insert_data(id, data);
        self
    }

    pub fn insert_element(&self, id: impl Into<String>) {
        let id = id.into();
        self.elements.write().insert(id.clone(), ElementRef(id));
    }

    pub fn insert_data(&self, id: impl Into<String>, data: Value) {
        self.data.write().insert(id.into(), data);
    }

    /// Simulate the element being torn out of the page.
    pub fn remove_element(&self, id: &str) -> bool {
        self.elements.write().remove(id).is_some()
    }
}

impl RenderHost for MemoryHost {
    fn root_element(&self, id: &str) -> Option<ElementRef> {
        self.elements.read().get(id).cloned()
    }

    fn initial_data(&self, id: &str) -> Option<Value> {
        self.data.read().get(id).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_memory_host() {
        let host = MemoryHost::new()
            .with_element("nav")
            .with_data("nav", json!({"links": 3}));

        assert_eq!(host.root_element("nav"), Some(ElementRef("nav".to_string())));
        assert_eq!(host.initial_data("nav"), Some(json!({"links": 3})));
        assert_eq!(host.root_element("footer"), None);

        assert!(host.remove_element("nav"));
        assert_eq!(host.root_element("nav"), None);
    }
}
