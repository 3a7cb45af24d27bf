use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::{info, warn};

use clientdesk_core::domain::customer::{Customer, CustomerField, CustomerId};
use clientdesk_core::errors::ApiError;
use clientdesk_core::validation::{validate_field, validate_form, FieldVerdict};

use crate::context::DeskContext;
use crate::notifications::Severity;

pub const CREATE_TITLE: &str = "New customer";
pub const EDIT_TITLE: &str = "Edit customer";
pub const SUBMIT_LABEL: &str = "Save";
pub const SUBMIT_BUSY_LABEL: &str = "Saving customer...";
pub const INVALID_FORM_MESSAGE: &str = "Please correct the errors in the form";

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum FormState {
    #[default]
    Closed,
    OpenForCreate,
    OpenForEdit(CustomerId),
    Submitting,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum FieldMarker {
    #[default]
    Unmarked,
    Valid,
    Invalid(String),
}

impl From<&FieldVerdict> for FieldMarker {
    fn from(verdict: &FieldVerdict) -> Self {
        if verdict.valid {
            Self::Valid
        } else {
            Self::Invalid(verdict.message.clone())
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SubmitControl {
    pub enabled: bool,
    pub label: String,
}

impl Default for SubmitControl {
    fn default() -> Self {
        Self { enabled: true, label: SUBMIT_LABEL.to_owned() }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// Submit was requested while the form was closed or already in flight.
    NotOpen,
    /// Validation failed; no request was sent.
    Rejected,
    Created(Customer),
    Updated(Customer),
    Failed(ApiError),
}

#[derive(Default)]
struct FormData {
    state: FormState,
    title: &'static str,
    editing: Option<CustomerId>,
    values: BTreeMap<CustomerField, String>,
    markers: BTreeMap<CustomerField, FieldMarker>,
}

impl FormData {
    fn reset(&mut self) {
        self.values.clear();
        self.markers.clear();
        self.editing = None;
        self.title = "";
    }

    fn draft(&self) -> Customer {
        let value = |field: CustomerField| {
            self.values.get(&field).map(|value| value.trim().to_owned()).unwrap_or_default()
        };
        Customer::new(
            value(CustomerField::NationalId),
            value(CustomerField::FirstName),
            value(CustomerField::LastName),
            value(CustomerField::Contact),
        )
    }

    fn open_state(&self) -> FormState {
        match self.editing {
            Some(id) => FormState::OpenForEdit(id),
            None => FormState::OpenForCreate,
        }
    }
}

/// Disables the submit control for as long as it lives. On drop the control
/// is restored and a form still marked `Submitting` is reopened, so a save
/// that fails or is abandoned mid-request leaves the form usable.
struct SubmitGuard<'a> {
    form: &'a FormController,
}

impl<'a> SubmitGuard<'a> {
    fn engage(form: &'a FormController) -> Self {
        let mut control = form.submit.lock().unwrap_or_else(PoisonError::into_inner);
        control.enabled = false;
        control.label = SUBMIT_BUSY_LABEL.to_owned();
        Self { form }
    }
}

impl Drop for SubmitGuard<'_> {
    fn drop(&mut self) {
        *self.form.submit.lock().unwrap_or_else(PoisonError::into_inner) = SubmitControl::default();

        let mut data = self.form.lock();
        if data.state == FormState::Submitting {
            let reopened = data.open_state();
            data.state = reopened;
        }
    }
}

/// The create/edit form: field values, validation markers and the submit
/// control.
pub struct FormController {
    ctx: Arc<DeskContext>,
    data: Mutex<FormData>,
    submit: Mutex<SubmitControl>,
}

impl FormController {
    pub fn new(ctx: Arc<DeskContext>) -> Self {
        Self {
            ctx,
            data: Mutex::new(FormData::default()),
            submit: Mutex::new(SubmitControl::default()),
        }
    }

    pub fn state(&self) -> FormState {
        self.lock().state
    }

    pub fn is_open(&self) -> bool {
        self.state() != FormState::Closed
    }

    /// Heading shown above the form; empty while closed.
    pub fn title(&self) -> &'static str {
        self.lock().title
    }

    pub fn submit_control(&self) -> SubmitControl {
        self.submit.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub fn open_for_create(&self) {
        let mut data = self.lock();
        data.reset();
        data.title = CREATE_TITLE;
        data.state = FormState::OpenForCreate;
    }

    /// Loads the customer and opens the form populated with it. On failure an
    /// error notification is raised and the form stays as it was.
    pub async fn open_for_edit(&self, id: CustomerId) -> bool {
        let customer = match self.ctx.api().get_by_id(id).await {
            Ok(customer) => customer,
            Err(ApiError::NotFound) => {
                warn!(event_name = "desk.form.edit_missing", customer_id = %id, "customer to edit not found");
                self.ctx.notifications().notify("Customer not found", Severity::Error);
                return false;
            }
            Err(error) => {
                warn!(event_name = "desk.form.edit_failed", customer_id = %id, error = %error, "loading customer failed");
                self.ctx.notifications().notify(
                    format!("Error loading customer: {}", error.user_message()),
                    Severity::Error,
                );
                return false;
            }
        };

        let mut data = self.lock();
        data.reset();
        for field in CustomerField::ALL {
            data.values.insert(field, customer.value_of(field).to_owned());
        }
        data.editing = Some(id);
        data.title = EDIT_TITLE;
        data.state = FormState::OpenForEdit(id);
        true
    }

    /// Stores input for `field`. A field already marked invalid is
    /// revalidated so the marker clears as soon as the input is fixed.
    pub fn set_field(&self, field: CustomerField, value: impl Into<String>) {
        let mut data = self.lock();
        let value = value.into();
        if matches!(data.markers.get(&field), Some(FieldMarker::Invalid(_))) {
            let verdict = validate_field(field, &value);
            data.markers.insert(field, FieldMarker::from(&verdict));
        }
        data.values.insert(field, value);
    }

    pub fn field_value(&self, field: CustomerField) -> String {
        self.lock().values.get(&field).cloned().unwrap_or_default()
    }

    pub fn marker(&self, field: CustomerField) -> FieldMarker {
        self.lock().markers.get(&field).cloned().unwrap_or_default()
    }

    /// Validates a single field (on blur) and updates only its marker.
    pub fn revalidate(&self, field: CustomerField) -> FieldVerdict {
        let mut data = self.lock();
        let raw = data.values.get(&field).cloned().unwrap_or_default();
        let verdict = validate_field(field, &raw);
        data.markers.insert(field, FieldMarker::from(&verdict));
        verdict
    }

    pub fn close(&self) {
        let mut data = self.lock();
        data.reset();
        data.state = FormState::Closed;
    }

    /// True while the form is open with any non-blank input.
    pub fn has_unsaved_input(&self) -> bool {
        let data = self.lock();
        data.state != FormState::Closed && data.values.values().any(|value| !value.trim().is_empty())
    }

    pub async fn submit(&self) -> SubmitOutcome {
        let (draft, editing) = {
            let mut data = self.lock();
            if !matches!(data.state, FormState::OpenForCreate | FormState::OpenForEdit(_)) {
                return SubmitOutcome::NotOpen;
            }

            let draft = data.draft();
            let verdict = validate_form(&draft);
            for (field, field_verdict) in verdict.iter() {
                data.markers.insert(field, FieldMarker::from(field_verdict));
            }
            if !verdict.is_valid() {
                drop(data);
                info!(
                    event_name = "desk.form.rejected",
                    invalid_fields = verdict.errors().len(),
                    "form failed validation"
                );
                self.ctx.notifications().notify(INVALID_FORM_MESSAGE, Severity::Warning);
                return SubmitOutcome::Rejected;
            }

            data.state = FormState::Submitting;
            (draft, data.editing)
        };

        let guard = SubmitGuard::engage(self);
        let result = match editing {
            Some(id) => self.ctx.api().update(id, &draft).await,
            None => self.ctx.api().create(&draft).await,
        };

        match result {
            Ok(saved) => {
                info!(
                    event_name = "desk.form.submitted",
                    customer_id = ?saved.id,
                    update = editing.is_some(),
                    "customer saved"
                );
                self.close();
                self.ctx.clear_search_term();
                self.ctx.refresh_list().await;
                if editing.is_some() {
                    self.ctx.notifications().notify("Customer updated", Severity::Success);
                    SubmitOutcome::Updated(saved)
                } else {
                    self.ctx.notifications().notify("Customer created", Severity::Success);
                    SubmitOutcome::Created(saved)
                }
            }
            Err(error) => {
                warn!(event_name = "desk.form.submit_failed", error = %error, "saving customer failed");
                drop(guard);
                self.ctx.notifications().notify(error.user_message(), Severity::Error);
                SubmitOutcome::Failed(error)
            }
        }
    }

    fn lock(&self) -> MutexGuard<'_, FormData> {
        self.data.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
