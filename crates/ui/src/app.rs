use std::sync::Arc;

use chrono::NaiveDate;
use tracing::{debug, info, warn};

use clientdesk_core::domain::customer::{Customer, CustomerId};
use clientdesk_core::errors::ApiError;
use clientdesk_core::export::{customers_to_csv, export_file_name};

use crate::context::DeskContext;
use crate::export::ExportSink;
use crate::form::FormController;
use crate::notifications::Severity;
use crate::search::SearchController;

pub const STARTED_MESSAGE: &str = "Customer desk started";
pub const DELETE_NOT_FOUND_MESSAGE: &str = "Customer not found; it may already have been deleted";

/// Asks the user a yes/no question before a destructive action.
pub trait ConfirmPrompt: Send + Sync {
    fn confirm(&self, message: &str) -> bool;
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DeleteOutcome {
    Deleted,
    Declined,
    NotFound,
    Failed(ApiError),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ExportOutcome {
    Saved { file_name: String, location: String, rows: usize },
    Failed,
}

/// Top-level wiring: page load, list, delete, export and connectivity,
/// plus the form and search controllers sharing the same context.
pub struct AppController {
    ctx: Arc<DeskContext>,
    form: FormController,
    search: SearchController,
    prompt: Arc<dyn ConfirmPrompt>,
    sink: Arc<dyn ExportSink>,
}

impl AppController {
    pub fn new(
        ctx: Arc<DeskContext>,
        prompt: Arc<dyn ConfirmPrompt>,
        sink: Arc<dyn ExportSink>,
    ) -> Self {
        Self {
            form: FormController::new(Arc::clone(&ctx)),
            search: SearchController::new(Arc::clone(&ctx)),
            ctx,
            prompt,
            sink,
        }
    }

    pub fn context(&self) -> &Arc<DeskContext> {
        &self.ctx
    }

    pub fn form(&self) -> &FormController {
        &self.form
    }

    pub fn search(&self) -> &SearchController {
        &self.search
    }

    pub async fn start(&self) -> Option<usize> {
        info!(event_name = "desk.started", "customer desk started");
        self.ctx.notifications().notify(STARTED_MESSAGE, Severity::Info);
        self.list_customers().await
    }

    pub async fn list_customers(&self) -> Option<usize> {
        self.ctx.refresh_list().await
    }

    /// Confirms with the user, then deletes. The confirmation names the
    /// customer when it can be loaded and falls back to a generic question
    /// otherwise.
    pub async fn request_delete(&self, id: CustomerId) -> DeleteOutcome {
        let question = match self.ctx.api().get_by_id(id).await {
            Ok(customer) => detailed_confirmation(&customer),
            Err(error) => {
                debug!(event_name = "desk.delete.preview_failed", customer_id = %id, error = %error, "falling back to generic confirmation");
                generic_confirmation()
            }
        };

        if !self.prompt.confirm(&question) {
            info!(event_name = "desk.delete.declined", customer_id = %id, "delete declined");
            return DeleteOutcome::Declined;
        }

        match self.ctx.api().delete_by_id(id).await {
            Ok(()) => {
                info!(event_name = "desk.delete.completed", customer_id = %id, "customer deleted");
                self.ctx.clear_search_term();
                self.ctx.refresh_list().await;
                self.ctx.notifications().notify("Customer deleted", Severity::Success);
                DeleteOutcome::Deleted
            }
            Err(ApiError::NotFound) => {
                warn!(event_name = "desk.delete.missing", customer_id = %id, "customer already gone");
                self.ctx.notifications().notify(DELETE_NOT_FOUND_MESSAGE, Severity::Error);
                DeleteOutcome::NotFound
            }
            Err(error) => {
                warn!(event_name = "desk.delete.failed", customer_id = %id, error = %error, "delete failed");
                self.ctx.notifications().notify(error.user_message(), Severity::Error);
                DeleteOutcome::Failed(error)
            }
        }
    }

    pub async fn export_csv(&self) -> ExportOutcome {
        self.export_csv_dated(chrono::Utc::now().date_naive()).await
    }

    /// Exports the full list under the file name for `date`.
    pub async fn export_csv_dated(&self, date: NaiveDate) -> ExportOutcome {
        let customers = {
            let _busy = self.ctx.begin_loading();
            self.ctx.api().list_all().await
        };
        let customers = match customers {
            Ok(customers) => customers,
            Err(error) => {
                warn!(event_name = "desk.export.fetch_failed", error = %error, "export fetch failed");
                self.ctx
                    .notifications()
                    .notify(format!("Export failed: {}", error.user_message()), Severity::Error);
                return ExportOutcome::Failed;
            }
        };

        let file_name = export_file_name(date);
        let contents = customers_to_csv(&customers);
        match self.sink.deliver(&file_name, &contents).await {
            Ok(location) => {
                info!(
                    event_name = "desk.export.saved",
                    file_name = %file_name,
                    rows = customers.len(),
                    "csv export saved"
                );
                self.ctx.notifications().notify("CSV export saved", Severity::Success);
                ExportOutcome::Saved { file_name, location, rows: customers.len() }
            }
            Err(error) => {
                warn!(event_name = "desk.export.failed", file_name = %file_name, error = %error, "csv export failed");
                self.ctx.notifications().notify(format!("Export failed: {error}"), Severity::Error);
                ExportOutcome::Failed
            }
        }
    }

    pub fn connectivity_changed(&self, online: bool) {
        if online {
            info!(event_name = "desk.connectivity", online, "connection restored");
            self.ctx.notifications().notify("Connection restored", Severity::Success);
        } else {
            warn!(event_name = "desk.connectivity", online, "connection lost");
            self.ctx.notifications().notify("Connection lost; working offline", Severity::Warning);
        }
    }
}

fn detailed_confirmation(customer: &Customer) -> String {
    format!(
        "Delete this customer?\n\nCustomer: {}\nNational ID: {}\nContact: {}\n\nThis action cannot be undone.",
        customer.full_name(),
        customer.national_id,
        customer.contact
    )
}

fn generic_confirmation() -> String {
    "Delete this customer?\n\nThis action cannot be undone.".to_owned()
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;
    use chrono::NaiveDate;

    use clientdesk_api::{ApiCall, InMemoryCustomerApi};
    use clientdesk_core::domain::customer::{Customer, CustomerId};
    use clientdesk_core::errors::ApiError;

    use super::{AppController, ConfirmPrompt, DeleteOutcome, ExportOutcome, DELETE_NOT_FOUND_MESSAGE};
    use crate::context::{DeskContext, UiSettings};
    use crate::export::{ExportError, ExportSink};
    use crate::notifications::Severity;

    struct ScriptedPrompt {
        answer: bool,
        asked: Mutex<Vec<String>>,
    }

    impl ScriptedPrompt {
        fn answering(answer: bool) -> Arc<Self> {
            Arc::new(Self { answer, asked: Mutex::new(Vec::new()) })
        }

        fn asked(&self) -> Vec<String> {
            self.asked.lock().expect("prompt lock").clone()
        }
    }

    impl ConfirmPrompt for ScriptedPrompt {
        fn confirm(&self, message: &str) -> bool {
            self.asked.lock().expect("prompt lock").push(message.to_owned());
            self.answer
        }
    }

    #[derive(Default)]
    struct RecordingSink {
        files: Mutex<Vec<(String, String)>>,
        refuse: bool,
    }

    #[async_trait]
    impl ExportSink for RecordingSink {
        async fn deliver(&self, file_name: &str, contents: &str) -> Result<String, ExportError> {
            if self.refuse {
                return Err(ExportError::Rejected("disk full".to_owned()));
            }
            self.files.lock().expect("sink lock").push((file_name.to_owned(), contents.to_owned()));
            Ok(format!("memory://{file_name}"))
        }
    }

    fn seeded() -> Arc<InMemoryCustomerApi> {
        Arc::new(InMemoryCustomerApi::with_customers([
            Customer::new("1700000001", "Ana", "Pérez", "ana@correo.ec").with_id(CustomerId(3)),
            Customer::new("1700000002", "Luis", "Mora", "0991112222").with_id(CustomerId(7)),
        ]))
    }

    fn app(
        api: Arc<InMemoryCustomerApi>,
        prompt: Arc<ScriptedPrompt>,
        sink: Arc<RecordingSink>,
    ) -> AppController {
        AppController::new(DeskContext::new(api, UiSettings::default()), prompt, sink)
    }

    #[tokio::test]
    async fn start_announces_and_lists() {
        let app = app(seeded(), ScriptedPrompt::answering(true), Arc::default());

        assert_eq!(app.start().await, Some(2));

        let messages: Vec<_> =
            app.context().notifications().drain().into_iter().map(|n| n.message).collect();
        assert_eq!(messages, vec!["Customer desk started", "Loaded 2 customers"]);
    }

    #[tokio::test]
    async fn confirmed_delete_removes_row() {
        let api = seeded();
        let prompt = ScriptedPrompt::answering(true);
        let app = app(api.clone(), prompt.clone(), Arc::default());
        app.list_customers().await;
        app.context().notifications().drain();

        assert_eq!(app.request_delete(CustomerId(7)).await, DeleteOutcome::Deleted);

        let calls = api.calls().await;
        assert!(calls.contains(&ApiCall::Delete(CustomerId(7))));
        let delete = calls.iter().find(|call| call.method() == "DELETE").expect("delete sent");
        assert_eq!(delete.path(), "/customers/7");

        let view = app.context().table().view();
        assert!(view.find_row(CustomerId(7)).is_none());
        assert!(view.find_row(CustomerId(3)).is_some());

        let asked = prompt.asked();
        assert!(asked[0].contains("Luis Mora"));
        assert!(asked[0].contains("1700000002"));

        let notes = app.context().notifications().drain();
        assert_eq!(notes.last().map(|n| n.message.as_str()), Some("Customer deleted"));
    }

    #[tokio::test]
    async fn declined_delete_sends_nothing() {
        let api = seeded();
        let app = app(api.clone(), ScriptedPrompt::answering(false), Arc::default());

        assert_eq!(app.request_delete(CustomerId(7)).await, DeleteOutcome::Declined);
        assert_eq!(api.calls().await, vec![ApiCall::Get(CustomerId(7))]);
        assert_eq!(api.snapshot().await.len(), 2);
    }

    #[tokio::test]
    async fn delete_of_missing_customer_reports_not_found() {
        let api = seeded();
        let prompt = ScriptedPrompt::answering(true);
        let app = app(api.clone(), prompt.clone(), Arc::default());

        assert_eq!(app.request_delete(CustomerId(99)).await, DeleteOutcome::NotFound);
        assert!(!prompt.asked()[0].contains("Customer:"));

        let notes = app.context().notifications().drain();
        assert_eq!(notes[0].message, DELETE_NOT_FOUND_MESSAGE);
        assert_eq!(notes[0].severity, Severity::Error);
    }

    #[tokio::test]
    async fn delete_server_error_is_reported() {
        let api = seeded();
        let app = app(api.clone(), ScriptedPrompt::answering(true), Arc::default());
        api.fail_next(ApiError::NetworkUnavailable).await;
        api.fail_next(ApiError::from_status(500, "Internal Server Error")).await;

        let outcome = app.request_delete(CustomerId(3)).await;
        assert_eq!(
            outcome,
            DeleteOutcome::Failed(ApiError::RequestFailed {
                status_code: 500,
                status_text: "Internal Server Error".to_owned()
            })
        );
        assert_eq!(app.context().notifications().drain()[0].message, "Error 500: Internal Server Error");
    }

    #[tokio::test]
    async fn export_writes_dated_csv() {
        let sink = Arc::new(RecordingSink::default());
        let app = app(seeded(), ScriptedPrompt::answering(true), sink.clone());
        let date = NaiveDate::from_ymd_opt(2024, 5, 1).expect("valid date");

        let outcome = app.export_csv_dated(date).await;
        assert_eq!(
            outcome,
            ExportOutcome::Saved {
                file_name: "customers_2024-05-01.csv".to_owned(),
                location: "memory://customers_2024-05-01.csv".to_owned(),
                rows: 2,
            }
        );

        let files = sink.files.lock().expect("sink lock").clone();
        assert_eq!(
            files[0].1,
            "ID,NationalId,FirstName,LastName,Contact\n\
             3,1700000001,Ana,Pérez,ana@correo.ec\n\
             7,1700000002,Luis,Mora,0991112222"
        );
        assert_eq!(app.context().notifications().drain()[0].message, "CSV export saved");
    }

    #[tokio::test]
    async fn export_failures_notify() {
        let api = seeded();
        let refusing = Arc::new(RecordingSink { refuse: true, ..RecordingSink::default() });
        let app = app(api.clone(), ScriptedPrompt::answering(true), refusing);

        let date = NaiveDate::from_ymd_opt(2024, 5, 1).expect("valid date");
        assert_eq!(app.export_csv_dated(date).await, ExportOutcome::Failed);

        api.fail_next(ApiError::NetworkUnavailable).await;
        assert_eq!(app.export_csv_dated(date).await, ExportOutcome::Failed);

        let notes = app.context().notifications().drain();
        assert_eq!(notes.len(), 2);
        assert!(notes.iter().all(|n| n.severity == Severity::Error && n.message.starts_with("Export failed")));
    }

    #[tokio::test]
    async fn connectivity_changes_are_announced() {
        let app = app(seeded(), ScriptedPrompt::answering(true), Arc::default());
        app.connectivity_changed(false);
        app.connectivity_changed(true);

        let notes = app.context().notifications().drain();
        assert_eq!(notes[0].severity, Severity::Warning);
        assert_eq!(notes[1].message, "Connection restored");
    }

    #[tokio::test(start_paused = true)]
    async fn delete_drops_pending_search_before_relisting() {
        let app = app(seeded(), ScriptedPrompt::answering(true), Arc::default());
        app.list_customers().await;

        app.search().on_input("ana");
        assert_eq!(app.request_delete(CustomerId(3)).await, DeleteOutcome::Deleted);
        assert_eq!(app.context().table().view().row_count(), 1);

        tokio::time::sleep(std::time::Duration::from_millis(400)).await;
        assert_eq!(app.context().search_term(), "");
        assert!(!app.search().is_pending());
        let view = app.context().table().view();
        assert_eq!(view.row_count(), 1);
        assert!(view.find_row(CustomerId(7)).is_some());
    }

    #[tokio::test]
    async fn export_names_file_by_utc_date() {
        let sink = Arc::new(RecordingSink::default());
        let app = app(seeded(), ScriptedPrompt::answering(true), sink.clone());

        let today = chrono::Utc::now().date_naive();
        let outcome = app.export_csv().await;

        let ExportOutcome::Saved { file_name, rows, .. } = outcome else {
            panic!("export should succeed: {outcome:?}");
        };
        assert_eq!(rows, 2);
        // A run straddling UTC midnight may observe the next day.
        let tomorrow = today.succ_opt().unwrap_or(today);
        assert!(
            file_name == clientdesk_core::export::export_file_name(today)
                || file_name == clientdesk_core::export::export_file_name(tomorrow),
            "{file_name}"
        );
    }
}
