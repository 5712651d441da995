// Hosts the vendor embedding widget
use crate::client::surface::PageSurface;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub const DEFAULT_CONTAINER: &str = "#dashboard-container";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoaderStyle {
    pub spinner_color: String,
    pub spinner_background: String,
    pub font_color: String,
}

impl Default for LoaderStyle {
    fn default() -> Self {
        Self {
            spinner_color: "#004CB7".to_string(),
            spinner_background: "#DCDCDC".to_string(),
            font_color: "#FFFFFF".to_string(),
        }
    }
}

/// Options handed to the widget's `addDashboard`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardOptions {
    pub dashboard_id: String,
    pub container: String,
    pub loader: LoaderStyle,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
}

impl DashboardOptions {
    pub fn is_authorized(&self) -> bool {
        self.key.is_some() && self.token.is_some()
    }
}

pub trait EmbedWidget: Send {
    fn add_dashboard(&mut self, options: &DashboardOptions);

    fn remove_dashboard(&mut self, container: &str);
}

/// A message posted by the widget to the hosting window
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct WidgetMessage {
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    #[serde(flatten)]
    pub payload: Map<String, Value>,
}

impl WidgetMessage {
    /// Non-object message data is not from the widget and yields `None`
    pub fn from_value(data: &Value) -> Option<Self> {
        if !data.is_object() {
            return None;
        }
        serde_json::from_value(data.clone()).ok()
    }

    pub fn is_init(&self) -> bool {
        self.kind.as_deref() == Some("init")
    }
}

pub struct DashboardHost<W> {
    widget: W,
}

impl<W: EmbedWidget> DashboardHost<W> {
    pub fn new(widget: W) -> Self {
        Self { widget }
    }

    pub fn widget(&self) -> &W {
        &self.widget
    }

    /// Unmounts whatever sits in the default container, then mounts `dashboard_id`.
    /// Without both `key` and `token` the widget runs in its public mode.
    pub fn load_dashboard(
        &mut self,
        dashboard_id: &str,
        key: Option<&str>,
        token: Option<&str>,
        container: Option<&str>,
        language: Option<&str>,
    ) -> DashboardOptions {
        self.widget.remove_dashboard(DEFAULT_CONTAINER);

        let (key, token) = match (key, token) {
            (Some(key), Some(token)) => (Some(key.to_string()), Some(token.to_string())),
            _ => (None, None),
        };

        let options = DashboardOptions {
            dashboard_id: dashboard_id.to_string(),
            container: container.unwrap_or(DEFAULT_CONTAINER).to_string(),
            loader: LoaderStyle::default(),
            key,
            token,
            language: language.map(str::to_string),
        };

        if let Ok(logged) = serde_json::to_string_pretty(&options) {
            tracing::debug!(options = %logged, "Adding dashboard");
        }
        self.widget.add_dashboard(&options);
        options
    }

    /// Reveals the default container once the widget signals `init`.
    /// Returns whether the message was acted on.
    pub fn handle_message<S: PageSurface + ?Sized>(&self, data: &Value, surface: &mut S) -> bool {
        match WidgetMessage::from_value(data) {
            Some(message) if message.is_init() => {
                surface.set_container_hidden(DEFAULT_CONTAINER, false);
                true
            }
            _ => false,
        }
    }
}
