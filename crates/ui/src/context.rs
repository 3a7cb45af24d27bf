use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tracing::{info, warn};

use clientdesk_api::CustomerApi;
use clientdesk_core::config::UiConfig;

use crate::notifications::{NotificationCenter, Severity};
use crate::search::PendingSearch;
use crate::table::TableRenderer;

pub const LIST_FAILED_MESSAGE: &str = "Could not load customers. Check that the API is reachable.";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct UiSettings {
    pub notification_ttl: Duration,
    pub search_debounce: Duration,
}

impl Default for UiSettings {
    fn default() -> Self {
        Self {
            notification_ttl: Duration::from_millis(5_000),
            search_debounce: Duration::from_millis(300),
        }
    }
}

impl From<&UiConfig> for UiSettings {
    fn from(config: &UiConfig) -> Self {
        Self {
            notification_ttl: Duration::from_millis(config.notification_ttl_ms),
            search_debounce: Duration::from_millis(config.search_debounce_ms),
        }
    }
}

/// State shared by every controller: the backend, the rendered table, the
/// notification area, the search input and the loading indicator.
pub struct DeskContext {
    api: Arc<dyn CustomerApi>,
    table: TableRenderer,
    notifications: NotificationCenter,
    search_term: Mutex<String>,
    pending_search: Mutex<Option<PendingSearch>>,
    loading: AtomicUsize,
    settings: UiSettings,
}

impl DeskContext {
    pub fn new(api: Arc<dyn CustomerApi>, settings: UiSettings) -> Arc<Self> {
        Arc::new(Self {
            api,
            table: TableRenderer::new(),
            notifications: NotificationCenter::new(settings.notification_ttl),
            search_term: Mutex::new(String::new()),
            pending_search: Mutex::new(None),
            loading: AtomicUsize::new(0),
            settings,
        })
    }

    pub fn api(&self) -> &dyn CustomerApi {
        self.api.as_ref()
    }

    pub fn table(&self) -> &TableRenderer {
        &self.table
    }

    pub fn notifications(&self) -> &NotificationCenter {
        &self.notifications
    }

    pub fn settings(&self) -> UiSettings {
        self.settings
    }

    /// Raw contents of the search input.
    pub fn search_term(&self) -> String {
        self.search_term.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub(crate) fn set_search_term(&self, raw: &str) {
        *self.search_term.lock().unwrap_or_else(PoisonError::into_inner) = raw.to_owned();
    }

    /// Empties the search input and drops a debounced search that has not
    /// fired yet; returns whether the input held a term.
    pub fn clear_search_term(&self) -> bool {
        self.abort_pending_search();
        let mut term = self.search_term.lock().unwrap_or_else(PoisonError::into_inner);
        let had_term = !term.trim().is_empty();
        term.clear();
        had_term
    }

    pub(crate) fn replace_pending_search(&self, pending: PendingSearch) {
        self.abort_pending_search();
        *self.lock_pending_search() = Some(pending);
    }

    pub(crate) fn take_pending_search(&self) -> Option<PendingSearch> {
        self.lock_pending_search().take()
    }

    pub(crate) fn has_pending_search(&self) -> bool {
        self.lock_pending_search().as_ref().is_some_and(PendingSearch::is_running)
    }

    /// A search already past its delay is left to finish; the ticket guard
    /// orders its render against later ones.
    pub(crate) fn abort_pending_search(&self) {
        if let Some(previous) = self.take_pending_search() {
            previous.abort_if_unfired();
        }
    }

    fn lock_pending_search(&self) -> std::sync::MutexGuard<'_, Option<PendingSearch>> {
        self.pending_search.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn is_loading(&self) -> bool {
        self.loading.load(Ordering::SeqCst) > 0
    }

    pub(crate) fn begin_loading(&self) -> LoadingGuard<'_> {
        self.loading.fetch_add(1, Ordering::SeqCst);
        LoadingGuard { loading: &self.loading }
    }

    /// Fetches the full list and renders it. On failure the table falls back
    /// to an empty list. Returns the number of customers rendered.
    pub async fn refresh_list(&self) -> Option<usize> {
        let ticket = self.table.issue_ticket();
        let _busy = self.begin_loading();

        match self.api.list_all().await {
            Ok(customers) => {
                if self.table.render_tagged(ticket, &customers) {
                    info!(
                        event_name = "desk.list.rendered",
                        ticket = ticket.0,
                        count = customers.len(),
                        "customer list rendered"
                    );
                    self.notifications.notify(
                        format!("Loaded {} customers", customers.len()),
                        Severity::Success,
                    );
                }
                Some(customers.len())
            }
            Err(error) => {
                warn!(event_name = "desk.list.failed", ticket = ticket.0, error = %error, "customer list fetch failed");
                self.notifications.notify(LIST_FAILED_MESSAGE, Severity::Error);
                self.table.render_tagged(ticket, &[]);
                None
            }
        }
    }
}

pub(crate) struct LoadingGuard<'a> {
    loading: &'a AtomicUsize,
}

impl Drop for LoadingGuard<'_> {
    fn drop(&mut self) {
        self.loading.fetch_sub(1, Ordering::SeqCst);
    }
}
