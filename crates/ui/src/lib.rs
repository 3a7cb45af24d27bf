//! Presentation controllers for the customer desk.
//!
//! Everything here is front-end agnostic: controllers mutate a shared
//! [`DeskContext`] (rendered table, notification area, search input, loading
//! indicator) and a front end such as the `clientdesk` binary reads it back.
//! Backend failures never escape as `Err`; they become notifications and the
//! controllers return small outcome enums instead.

pub mod app;
pub mod context;
pub mod export;
pub mod form;
pub mod notifications;
pub mod search;
pub mod table;

pub use app::{AppController, ConfirmPrompt, DeleteOutcome, ExportOutcome};
pub use context::{DeskContext, UiSettings};
pub use export::{DirectoryExportSink, ExportError, ExportSink};
pub use form::{FieldMarker, FormController, FormState, SubmitControl, SubmitOutcome};
pub use notifications::{Notification, NotificationCenter, NotificationId, Severity};
pub use search::{SearchController, SearchOutcome};
pub use table::{RowAction, TableRenderer, TableRow, TableView};
