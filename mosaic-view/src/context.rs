//! Render context handed over by the rendering adapter

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Device class the page is rendered for
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceType {
    #[default]
    Desktop,
    Tablet,
    Mobile,
}

/// Whether an instance is a nested component or the page blueprint
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewKind {
    Component,
    Blueprint,
}

impl fmt::Display for ViewKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ViewKind::Component => write!(f, "component"),
            ViewKind::Blueprint => write!(f, "blueprint"),
        }
    }
}

/// Resolved per-instance context.
///
/// The rendering layer builds this and passes it in at mount time; the
/// field names follow the payload it serialises into the page
/// (`viewName`, `nestLevel`, ...).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewContext {
    /// DOM ID of the instance's root element
    pub id: String,

    /// View the instance belongs to
    pub view_name: String,

    /// Component name within the view
    pub component_name: String,

    /// Initial data; `null` means the host must supply it
    #[serde(default)]
    pub data: Value,

    /// Route or query parameters
    #[serde(default)]
    pub params: Map<String, Value>,

    #[serde(default)]
    pub device_type: DeviceType,

    /// Nesting depth; the blueprint is level 0
    #[serde(default)]
    pub nest_level: u32,

    #[serde(default)]
    pub render_as_blueprint: bool,

    /// Base URL of the server that rendered the page
    #[serde(default)]
    pub server_url: Option<String>,
}

impl ViewContext {
    pub fn new(
        id: impl Into<String>,
        view_name: impl Into<String>,
        component_name: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            view_name: view_name.into(),
            component_name: component_name.into(),
            data: Value::Null,
            params: Map::new(),
            device_type: DeviceType::default(),
            nest_level: 0,
            render_as_blueprint: false,
            server_url: None,
        }
    }

    pub fn with_data(mut self, data: Value) -> Self {
        self.data = data;
        self
    }

    pub fn with_param(mut self, key: impl Into<String>, value: Value) -> Self {
        self.params.insert(key.into(), value);
        self
    }

    pub fn with_device_type(mut self, device_type: DeviceType) -> Self {
        self.device_type = device_type;
        self
    }

    pub fn with_nest_level(mut self, level: u32) -> Self {
        self.nest_level = level;
        self
    }

    pub fn as_blueprint(mut self, blueprint: bool) -> Self {
        self.render_as_blueprint = blueprint;
        self
    }

    pub fn with_server_url(mut self, url: impl Into<String>) -> Self {
        self.server_url = Some(url.into());
        self
    }

    pub fn kind(&self) -> ViewKind {
        if self.render_as_blueprint {
            ViewKind::Blueprint
        } else {
            ViewKind::Component
        }
    }

    /// `view/component#id`, used in logs and errors.
    pub fn label(&self) -> String {
        format!("{}/{}#{}", self.view_name, self.component_name, self.id)
    }
}
