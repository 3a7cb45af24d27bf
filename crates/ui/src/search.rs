use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use clientdesk_core::search::{filter_customers, normalize_term};

use crate::context::DeskContext;
use crate::notifications::Severity;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SearchOutcome {
    /// The term was empty; the full list was requested instead.
    ShowingAll(Option<usize>),
    Matched(usize),
    /// A newer render landed first; this result was dropped.
    Superseded,
    Failed,
}

/// The single debounced search slot, held by the shared context so any flow
/// that clears the search input also drops it.
pub(crate) struct PendingSearch {
    handle: JoinHandle<SearchOutcome>,
    fired: Arc<AtomicBool>,
}

impl PendingSearch {
    pub(crate) fn is_running(&self) -> bool {
        !self.handle.is_finished()
    }

    pub(crate) fn abort_if_unfired(self) {
        if !self.fired.load(Ordering::SeqCst) {
            self.handle.abort();
        }
    }
}

/// Debounced client-side search over the full customer list.
pub struct SearchController {
    ctx: Arc<DeskContext>,
}

impl SearchController {
    pub fn new(ctx: Arc<DeskContext>) -> Self {
        Self { ctx }
    }

    /// Records a keystroke. The search runs once the debounce delay passes
    /// without further input; a search that already started is left to finish.
    ///
    /// Must be called from within a tokio runtime.
    pub fn on_input(&self, raw: &str) {
        self.ctx.set_search_term(raw);

        let ctx = Arc::clone(&self.ctx);
        let fired = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&fired);
        let term = raw.to_owned();
        let delay = ctx.settings().search_debounce;

        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            flag.store(true, Ordering::SeqCst);
            run_search(&ctx, &term).await
        });

        self.ctx.replace_pending_search(PendingSearch { handle, fired });
    }

    /// Escape gesture: drops the pending search, empties the input and shows
    /// the full list without waiting for the debounce.
    pub async fn cancel(&self) -> Option<usize> {
        self.ctx.clear_search_term();
        debug!(event_name = "desk.search.cancelled", "search cancelled");
        self.ctx.refresh_list().await
    }

    /// Waits for the pending search, if any, and returns its outcome.
    pub async fn settle(&self) -> Option<SearchOutcome> {
        let pending = self.ctx.take_pending_search()?;
        pending.handle.await.ok()
    }

    pub fn is_pending(&self) -> bool {
        self.ctx.has_pending_search()
    }
}

async fn run_search(ctx: &DeskContext, raw: &str) -> SearchOutcome {
    let term = normalize_term(raw);
    if term.is_empty() {
        return SearchOutcome::ShowingAll(ctx.refresh_list().await);
    }

    let ticket = ctx.table().issue_ticket();
    let _busy = ctx.begin_loading();

    let customers = match ctx.api().list_all().await {
        Ok(customers) => customers,
        Err(error) => {
            warn!(event_name = "desk.search.failed", term = %term, error = %error, "search fetch failed");
            ctx.notifications()
                .notify(format!("Search failed: {}", error.user_message()), Severity::Error);
            return SearchOutcome::Failed;
        }
    };

    let found = filter_customers(customers, &term);
    if !ctx.table().render_tagged(ticket, &found) {
        return SearchOutcome::Superseded;
    }

    info!(event_name = "desk.search.rendered", term = %term, matches = found.len(), "search rendered");
    if found.is_empty() {
        ctx.notifications().notify(format!("No customers match \"{term}\""), Severity::Warning);
    } else {
        ctx.notifications().notify(format!("Found {} customers", found.len()), Severity::Info);
    }
    SearchOutcome::Matched(found.len())
}
