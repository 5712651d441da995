// Tab navigation state machine: Unfetched -> Authorizing -> Loaded
use crate::client::error::ClientError;
use crate::client::identity::{has_redirect_params, IdentityProvider, UserProfile};
use crate::client::portal_api::PortalApi;
use crate::client::surface::{PageSurface, Tab};
use crate::client::widget_host::{DashboardHost, EmbedWidget, DEFAULT_CONTAINER};
use crate::domain::authorization::DashboardAuthorization;
use crate::domain::dashboard::DashboardSummary;
use reqwest::Url;
use serde_json::Value;

pub const LOAD_FAILED_MESSAGE: &str = "Could not load the dashboard. Please try again.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoadState {
    #[default]
    Unfetched,
    Authorizing,
    Loaded,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DashboardEntry {
    pub summary: DashboardSummary,
    pub state: LoadState,
}

impl DashboardEntry {
    pub fn id(&self) -> &str {
        &self.summary.id
    }

    pub fn is_loaded(&self) -> bool {
        self.state == LoadState::Loaded
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionSource {
    /// The user clicked a tab
    TabClick,
    /// Initial load or a language switch
    Programmatic,
}

/// An in-flight selection
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadTicket {
    dashboard_id: String,
    container: Option<String>,
    /// `None` for secondary containers, which never go stale
    generation: Option<u64>,
}

impl LoadTicket {
    pub fn dashboard_id(&self) -> &str {
        &self.dashboard_id
    }

    pub fn container(&self) -> Option<&str> {
        self.container.as_deref()
    }

    pub fn is_primary(&self) -> bool {
        self.container.is_none()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion {
    Loaded,
    Failed,
    Stale,
}

#[derive(Debug, Clone, Default)]
pub struct UiState {
    dashboards: Vec<DashboardEntry>,
    selected: Option<String>,
    active_tab: Option<String>,
    language: Option<String>,
    generation: u64,
    last_error: Option<String>,
}

impl UiState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the whole collection; the first dashboard becomes the active tab
    pub fn replace_dashboards(&mut self, dashboards: Vec<DashboardSummary>) -> Vec<Tab> {
        self.dashboards = dashboards
            .into_iter()
            .map(|summary| DashboardEntry {
                summary,
                state: LoadState::Unfetched,
            })
            .collect();
        self.selected = self.dashboards.first().map(|d| d.id().to_string());
        self.active_tab = self.selected.clone();
        self.generation += 1;

        if self.dashboards.is_empty() {
            return vec![Tab::placeholder()];
        }

        self.dashboards
            .iter()
            .enumerate()
            .map(|(index, entry)| Tab {
                dashboard_id: Some(entry.id().to_string()),
                label: entry.summary.label(index),
                active: index == 0,
            })
            .collect()
    }

    pub fn dashboards(&self) -> &[DashboardEntry] {
        &self.dashboards
    }

    pub fn dashboard(&self, id: &str) -> Option<&DashboardEntry> {
        self.dashboards.iter().find(|d| d.id() == id)
    }

    fn dashboard_mut(&mut self, id: &str) -> Option<&mut DashboardEntry> {
        self.dashboards.iter_mut().find(|d| d.id() == id)
    }

    pub fn selected(&self) -> Option<&str> {
        self.selected.as_deref()
    }

    pub fn language(&self) -> Option<&str> {
        self.language.as_deref()
    }

    pub fn set_language(&mut self, language: &str) {
        self.language = Some(language.to_string());
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn loaded_dashboards(&self) -> Vec<&str> {
        self.dashboards
            .iter()
            .filter(|d| d.is_loaded())
            .map(DashboardEntry::id)
            .collect()
    }

    pub fn mark_unfetched(&mut self, id: &str) {
        if let Some(entry) = self.dashboard_mut(id) {
            entry.state = LoadState::Unfetched;
        }
    }

    /// Starts loading `id`, or returns `None` when nothing needs to happen:
    /// unknown id, a click on the active tab while it is still authorizing, or
    /// an already loaded dashboard.
    pub fn begin_selection(
        &mut self,
        id: &str,
        source: SelectionSource,
        container: Option<&str>,
    ) -> Option<LoadTicket> {
        let entry = self.dashboard(id)?;
        let already_loaded = entry.is_loaded();
        let in_flight = entry.state == LoadState::Authorizing;
        let tab_active = self.active_tab.as_deref() == Some(id);

        if container.is_none() {
            self.selected = Some(id.to_string());
            if source == SelectionSource::TabClick {
                self.active_tab = Some(id.to_string());
            }
        }

        if already_loaded || (source == SelectionSource::TabClick && tab_active && in_flight) {
            return None;
        }

        let Some(container) = container else {
            self.generation += 1;
            self.active_tab = Some(id.to_string());
            for entry in &mut self.dashboards {
                entry.state = if entry.summary.id == id {
                    LoadState::Authorizing
                } else {
                    LoadState::Unfetched
                };
            }
            return Some(LoadTicket {
                dashboard_id: id.to_string(),
                container: None,
                generation: Some(self.generation),
            });
        };

        Some(LoadTicket {
            dashboard_id: id.to_string(),
            container: Some(container.to_string()),
            generation: None,
        })
    }

    /// Whether a ticket's result may still be applied
    pub fn is_current(&self, ticket: &LoadTicket) -> bool {
        match ticket.generation {
            Some(generation) => {
                generation == self.generation && self.selected() == Some(ticket.dashboard_id())
            }
            None => self.dashboard(ticket.dashboard_id()).is_some(),
        }
    }

    pub fn complete_selection(&mut self, ticket: &LoadTicket, outcome: Result<(), String>) -> Completion {
        if !self.is_current(ticket) {
            return Completion::Stale;
        }

        if !ticket.is_primary() {
            return match outcome {
                Ok(()) => Completion::Loaded,
                Err(_) => Completion::Failed,
            };
        }

        match outcome {
            Ok(()) => {
                for entry in &mut self.dashboards {
                    entry.state = LoadState::Unfetched;
                }
                self.mark_loaded(ticket.dashboard_id());
                self.last_error = None;
                Completion::Loaded
            }
            Err(message) => {
                self.mark_unfetched(ticket.dashboard_id());
                self.last_error = Some(message);
                Completion::Failed
            }
        }
    }

    fn mark_loaded(&mut self, id: &str) {
        if let Some(entry) = self.dashboard_mut(id) {
            entry.state = LoadState::Loaded;
        }
    }
}

pub struct NavigationController<I, P, W, S> {
    identity: I,
    api: P,
    host: DashboardHost<W>,
    surface: S,
    namespace: String,
}

impl<I, P, W, S> NavigationController<I, P, W, S>
where
    I: IdentityProvider,
    P: PortalApi,
    W: EmbedWidget,
    S: PageSurface,
{
    pub fn new(identity: I, api: P, widget: W, surface: S, namespace: String) -> Self {
        Self {
            identity,
            api,
            host: DashboardHost::new(widget),
            surface,
            namespace,
        }
    }

    pub fn identity(&self) -> &I {
        &self.identity
    }

    pub fn api(&self) -> &P {
        &self.api
    }

    pub fn host(&self) -> &DashboardHost<W> {
        &self.host
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    /// Page load: resume a session, finish a login redirect, or send the user to log in
    pub async fn start(&mut self, current_url: &Url) -> Result<UiState, ClientError> {
        if self.identity.is_authenticated().await {
            return self.init_ui().await;
        }

        if has_redirect_params(current_url) {
            let cleaned = match self.identity.handle_redirect_callback(current_url).await {
                Ok(cleaned) => cleaned,
                Err(err) => {
                    tracing::warn!(error = %err, "Login callback failed");
                    self.redirect_to_login().await;
                    return Err(err.into());
                }
            };
            let state = self.init_ui().await;
            self.surface.replace_address(&cleaned);
            return state;
        }

        self.init_ui().await
    }

    pub async fn init_ui(&mut self) -> Result<UiState, ClientError> {
        let mut state = UiState::new();
        if !self.identity.is_authenticated().await {
            self.redirect_to_login().await;
            return Ok(state);
        }

        self.fetch_dashboards(&mut state).await?;
        if let Some(user) = self.identity.get_user().await {
            self.set_user_details(&mut state, &user);
        }
        self.surface.reveal_gated_content();
        self.load_selected(&mut state).await;
        Ok(state)
    }

    /// Fetches the dashboard list and rebuilds the tabs from scratch
    pub async fn fetch_dashboards(&mut self, state: &mut UiState) -> Result<(), ClientError> {
        let bearer = self.bearer().await?;
        let dashboards = match self.api.list_dashboards(&bearer).await {
            Ok(dashboards) => dashboards,
            Err(err @ ClientError::Auth(_)) => {
                self.on_rejected_token(&err).await;
                return Err(err);
            }
            Err(err) => {
                tracing::error!(error = %err, "Could not fetch dashboards");
                self.surface.show_error("Could not retrieve the list of dashboards.");
                return Err(err);
            }
        };

        let tabs = state.replace_dashboards(dashboards);
        self.surface.render_tabs(&tabs);
        Ok(())
    }

    pub async fn load_selected(&mut self, state: &mut UiState) -> Option<Completion> {
        let selected = state.selected()?.to_string();
        self.select_dashboard(state, &selected, SelectionSource::Programmatic)
            .await
    }

    pub async fn select_dashboard(
        &mut self,
        state: &mut UiState,
        id: &str,
        source: SelectionSource,
    ) -> Option<Completion> {
        let ticket = self.begin_selection(state, id, source, None)?;
        let result = self.authorize(&ticket).await;
        Some(self.finish_selection(state, &ticket, result))
    }

    /// Loads a dashboard into another container; tab state and load flags are untouched
    pub async fn select_dashboard_into(
        &mut self,
        state: &mut UiState,
        id: &str,
        container: &str,
    ) -> Option<Completion> {
        let ticket = self.begin_selection(state, id, SelectionSource::Programmatic, Some(container))?;
        let result = self.authorize(&ticket).await;
        Some(self.finish_selection(state, &ticket, result))
    }

    pub fn begin_selection(
        &mut self,
        state: &mut UiState,
        id: &str,
        source: SelectionSource,
        container: Option<&str>,
    ) -> Option<LoadTicket> {
        let ticket = state.begin_selection(id, source, container);
        if container.is_none() && state.dashboard(id).is_some() {
            if ticket.is_some() {
                self.surface.set_container_hidden(DEFAULT_CONTAINER, true);
            }
            self.surface.set_active_tab(id);
        }
        ticket
    }

    pub async fn authorize(&mut self, ticket: &LoadTicket) -> Result<DashboardAuthorization, ClientError> {
        let bearer = self.bearer().await?;
        let result = self
            .api
            .authorize_dashboard(&bearer, ticket.dashboard_id())
            .await;
        if let Err(err @ ClientError::Auth(_)) = &result {
            self.on_rejected_token(err).await;
        }
        result
    }

    pub fn finish_selection(
        &mut self,
        state: &mut UiState,
        ticket: &LoadTicket,
        result: Result<DashboardAuthorization, ClientError>,
    ) -> Completion {
        if !state.is_current(ticket) {
            tracing::debug!(dashboard_id = ticket.dashboard_id(), "Dropping superseded dashboard load");
            return Completion::Stale;
        }

        match result {
            Ok(authorization) => {
                self.host.load_dashboard(
                    ticket.dashboard_id(),
                    Some(authorization.id.as_str()),
                    Some(authorization.token.as_str()),
                    ticket.container(),
                    state.language(),
                );
                self.surface.clear_error();
                state.complete_selection(ticket, Ok(()))
            }
            Err(err) => {
                tracing::error!(error = %err, dashboard_id = ticket.dashboard_id(), "Could not retrieve dashboard authorization token");
                self.surface.show_error(LOAD_FAILED_MESSAGE);
                state.complete_selection(ticket, Err(err.to_string()))
            }
        }
    }

    /// Re-renders the selected dashboard in `language`
    pub async fn change_language(&mut self, state: &mut UiState, language: &str) -> Option<Completion> {
        self.surface.set_active_language(language);
        self.toggle_menu(false);
        state.set_language(language);

        let selected = state.selected()?.to_string();
        state.mark_unfetched(&selected);
        self.select_dashboard(state, &selected, SelectionSource::Programmatic)
            .await
    }

    pub fn toggle_menu(&mut self, open: bool) {
        self.surface.set_menu_open(open);
    }

    /// Routes a window message from the embedded widget
    pub fn on_widget_message(&mut self, data: &Value) -> bool {
        self.host.handle_message(data, &mut self.surface)
    }

    pub async fn logout(&mut self) {
        let url = self.identity.logout().await;
        self.surface.navigate(&url);
    }

    fn set_user_details(&mut self, state: &mut UiState, user: &UserProfile) {
        if let Some(language) = user.preferred_language(&self.namespace) {
            self.surface.set_active_language(language);
            state.set_language(language);
        }
        self.surface
            .set_user_details(user.display_name(&self.namespace), user.picture.as_deref());
    }

    async fn bearer(&mut self) -> Result<String, ClientError> {
        match self.identity.get_token_silently().await {
            Ok(token) => Ok(token),
            Err(err) => {
                tracing::warn!(error = %err, "Silent token retrieval failed, forcing login");
                self.redirect_to_login().await;
                Err(err.into())
            }
        }
    }

    async fn on_rejected_token(&mut self, err: &ClientError) {
        tracing::warn!(error = %err, "Portal rejected the bearer token, forcing login");
        self.redirect_to_login().await;
    }

    async fn redirect_to_login(&mut self) {
        let url = self.identity.login().await;
        self.surface.navigate(&url);
    }
}
