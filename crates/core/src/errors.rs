use thiserror::Error;

use crate::domain::customer::CustomerField;

/// Outcome of a backend call that did not produce the expected payload.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ApiError {
    #[error("customer not found")]
    NotFound,
    #[error("a customer with that national id already exists")]
    DuplicateIdentifier,
    #[error("customer data rejected by the backend")]
    InvalidData,
    #[error("request failed with status {status_code} {status_text}")]
    RequestFailed { status_code: u16, status_text: String },
    #[error("backend is unreachable")]
    NetworkUnavailable,
    #[error("backend returned an unreadable payload: {0}")]
    InvalidResponse(String),
}

impl ApiError {
    /// Maps a non-success HTTP status to its domain outcome.
    pub fn from_status(status_code: u16, status_text: impl Into<String>) -> Self {
        match status_code {
            400 => Self::InvalidData,
            404 => Self::NotFound,
            409 => Self::DuplicateIdentifier,
            _ => Self::RequestFailed { status_code, status_text: status_text.into() },
        }
    }

    pub fn user_message(&self) -> String {
        match self {
            Self::NotFound => "Customer not found".to_owned(),
            Self::DuplicateIdentifier => {
                "A customer with that national ID already exists".to_owned()
            }
            Self::InvalidData => {
                "Customer data is invalid. Check the information entered.".to_owned()
            }
            Self::RequestFailed { status_code, status_text } => {
                format!("Error {status_code}: {status_text}")
            }
            Self::NetworkUnavailable => {
                "Could not reach the customer service. Check that the API is running.".to_owned()
            }
            Self::InvalidResponse(_) => "The customer service sent an unexpected response".to_owned(),
        }
    }
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum DeskError {
    #[error(transparent)]
    Api(#[from] ApiError),
    #[error("validation failed for `{field}`: {reason}")]
    ValidationFailed { field: CustomerField, reason: String },
}

impl DeskError {
    pub fn user_message(&self) -> String {
        match self {
            Self::Api(error) => error.user_message(),
            Self::ValidationFailed { field, reason } => format!("{}: {reason}", field.label()),
        }
    }
}
