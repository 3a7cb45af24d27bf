use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::ValueEnum;
use clientdesk_api::{CustomerApi, HttpCustomerApi, InMemoryCustomerApi};
use clientdesk_core::config::{ConfigError, DeskConfig, LoadOptions};
use clientdesk_core::domain::customer::{CustomerField, CustomerId};
use clientdesk_ui::{
    AppController, ConfirmPrompt, DeleteOutcome, DeskContext, DirectoryExportSink, ExportOutcome,
    FieldMarker, SearchOutcome, Severity, SubmitOutcome, UiSettings,
};

use crate::commands::CommandResult;
use crate::prompt::{AutoConfirm, StdinPrompt};
use crate::{init_logging, GlobalArgs};

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum Backend {
    /// The REST customer service at `api.base_url`.
    Http,
    /// An empty in-process store; nothing survives the command.
    Memory,
}

/// Field values supplied on the command line. `None` leaves the form value
/// as it is.
#[derive(Clone, Debug, Default)]
pub struct FieldInput {
    pub national_id: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub contact: Option<String>,
}

impl FieldInput {
    fn entries(&self) -> [(CustomerField, Option<&str>); 4] {
        [
            (CustomerField::NationalId, self.national_id.as_deref()),
            (CustomerField::FirstName, self.first_name.as_deref()),
            (CustomerField::LastName, self.last_name.as_deref()),
            (CustomerField::Contact, self.contact.as_deref()),
        ]
    }
}

#[derive(Clone, Debug)]
pub enum CustomerAction {
    List,
    Search(String),
    Show(CustomerId),
    Create(FieldInput),
    Update(CustomerId, FieldInput),
    Delete(CustomerId),
    Export(Option<PathBuf>),
}

impl CustomerAction {
    fn name(&self) -> &'static str {
        match self {
            Self::List => "list",
            Self::Search(_) => "search",
            Self::Show(_) => "show",
            Self::Create(_) => "create",
            Self::Update(..) => "update",
            Self::Delete(_) => "delete",
            Self::Export(_) => "export",
        }
    }
}

pub fn build_api(config: &DeskConfig, backend: Backend) -> Result<Arc<dyn CustomerApi>, String> {
    match backend {
        Backend::Http => HttpCustomerApi::from_config(&config.api)
            .map(|api| Arc::new(api) as Arc<dyn CustomerApi>)
            .map_err(|error| format!("failed to build http client: {error}")),
        Backend::Memory => Ok(Arc::new(InMemoryCustomerApi::new())),
    }
}

pub fn build_app(
    config: &DeskConfig,
    api: Arc<dyn CustomerApi>,
    prompt: Arc<dyn ConfirmPrompt>,
) -> AppController {
    let ctx = DeskContext::new(api, UiSettings::from(&config.ui));
    let sink = Arc::new(DirectoryExportSink::new(config.export.directory.clone()));
    AppController::new(ctx, prompt, sink)
}

struct Session {
    config: DeskConfig,
    api: Arc<dyn CustomerApi>,
    runtime: tokio::runtime::Runtime,
}

fn bootstrap(options: LoadOptions, backend: Backend) -> anyhow::Result<Session> {
    let config = DeskConfig::load(options).context("configuration did not load")?;
    init_logging(&config);

    let api = build_api(&config, backend).map_err(anyhow::Error::msg)?;
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to initialize async runtime")?;

    Ok(Session { config, api, runtime })
}

pub fn run(global: &GlobalArgs, action: CustomerAction, assume_yes: bool) -> CommandResult {
    let command = action.name();

    let mut options = global.load_options();
    if let CustomerAction::Export(Some(dir)) = &action {
        options.overrides.export_directory = Some(dir.clone());
    }

    let session = match bootstrap(options, global.backend) {
        Ok(session) => session,
        Err(error) => {
            let error_class = if error.downcast_ref::<ConfigError>().is_some() {
                "config_validation"
            } else {
                "bootstrap"
            };
            return CommandResult::failure(command, error_class, format!("{error:#}"), 2);
        }
    };

    tracing::debug!(
        event_name = "desk.cli.command",
        command,
        backend = ?global.backend,
        base_url = %session.config.api.base_url,
        "running customer command"
    );

    let prompt: Arc<dyn ConfirmPrompt> =
        if assume_yes { Arc::new(AutoConfirm) } else { Arc::new(StdinPrompt) };
    let app = build_app(&session.config, session.api, prompt);
    session.runtime.block_on(execute(&app, action))
}

/// Runs one action against `app` and renders what a user would see: the
/// table or form, then every notification raised along the way.
pub async fn execute(app: &AppController, action: CustomerAction) -> CommandResult {
    let mut lines = Vec::new();
    let mut failed = false;

    match action {
        CustomerAction::List => {
            app.start().await;
            lines.push(app.context().table().view().to_text());
        }
        CustomerAction::Search(term) => {
            app.search().on_input(&term);
            if app.search().settle().await == Some(SearchOutcome::Failed) {
                failed = true;
            }
            lines.push(app.context().table().view().to_text());
        }
        CustomerAction::Show(id) => {
            if app.form().open_for_edit(id).await {
                lines.push(format!("{} #{id}", app.form().title()));
                for field in CustomerField::ALL {
                    lines.push(format!("{}: {}", field.label(), app.form().field_value(field)));
                }
                app.form().close();
            } else {
                failed = true;
            }
        }
        CustomerAction::Create(input) => {
            app.form().open_for_create();
            apply_input(app, &input);
            failed = !submit(app, &mut lines).await;
        }
        CustomerAction::Update(id, input) => {
            if app.form().open_for_edit(id).await {
                apply_input(app, &input);
                failed = !submit(app, &mut lines).await;
            } else {
                failed = true;
            }
        }
        CustomerAction::Delete(id) => match app.request_delete(id).await {
            DeleteOutcome::Deleted => lines.push(app.context().table().view().to_text()),
            DeleteOutcome::Declined => lines.push("Delete cancelled".to_owned()),
            DeleteOutcome::NotFound | DeleteOutcome::Failed(_) => failed = true,
        },
        CustomerAction::Export(_) => match app.export_csv().await {
            ExportOutcome::Saved { location, rows, .. } => {
                lines.push(format!("Wrote {rows} customers to {location}"));
            }
            ExportOutcome::Failed => failed = true,
        },
    }

    for notification in app.context().notifications().drain() {
        failed |= notification.severity == Severity::Error;
        lines.push(format!("[{}] {}", notification.severity, notification.message));
    }

    CommandResult::text(u8::from(failed), lines.join("\n"))
}

fn apply_input(app: &AppController, input: &FieldInput) {
    for (field, value) in input.entries() {
        if let Some(value) = value {
            app.form().set_field(field, value);
        }
    }
}

/// Submits the open form; returns whether the customer was saved.
async fn submit(app: &AppController, lines: &mut Vec<String>) -> bool {
    match app.form().submit().await {
        SubmitOutcome::Created(_) | SubmitOutcome::Updated(_) => {
            lines.push(app.context().table().view().to_text());
            true
        }
        SubmitOutcome::Rejected => {
            for field in CustomerField::ALL {
                if let FieldMarker::Invalid(reason) = app.form().marker(field) {
                    lines.push(format!("{}: {reason}", field.label()));
                }
            }
            false
        }
        SubmitOutcome::Failed(_) | SubmitOutcome::NotOpen => false,
    }
}
