// Page surface: the DOM operations the navigation controller needs
use reqwest::Url;

pub const EMPTY_TABS_PLACEHOLDER: &str = "a list of dashboards will appear here";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tab {
    /// `None` for the placeholder shown when no dashboards are available
    pub dashboard_id: Option<String>,
    pub label: String,
    pub active: bool,
}

impl Tab {
    pub fn placeholder() -> Self {
        Self {
            dashboard_id: None,
            label: EMPTY_TABS_PLACEHOLDER.to_string(),
            active: true,
        }
    }
}

pub trait PageSurface: Send {
    fn render_tabs(&mut self, tabs: &[Tab]);

    fn set_active_tab(&mut self, dashboard_id: &str);

    fn set_container_hidden(&mut self, container: &str, hidden: bool);

    fn set_user_details(&mut self, name: Option<&str>, picture: Option<&str>);

    fn set_active_language(&mut self, language: &str);

    fn reveal_gated_content(&mut self);

    /// Sidebar and overlay
    fn set_menu_open(&mut self, open: bool);

    fn show_error(&mut self, message: &str);

    fn clear_error(&mut self);

    /// Full-page navigation (login/logout redirects)
    fn navigate(&mut self, url: &Url);

    /// Rewrites the visible address without reloading
    fn replace_address(&mut self, url: &Url);
}
