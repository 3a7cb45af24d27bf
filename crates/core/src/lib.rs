//! Domain layer of the customer desk: the `Customer` record, the error
//! taxonomy shared by every crate, field validation, the client-side search
//! filter, CSV export, and layered configuration.
//!
//! Nothing here performs I/O beyond reading the config file.

pub mod config;
pub mod domain;
pub mod errors;
pub mod export;
pub mod search;
pub mod validation;

pub use config::{ConfigError, DeskConfig, LoadOptions};
pub use domain::customer::{Customer, CustomerField, CustomerId};
pub use errors::{ApiError, DeskError};
pub use validation::{validate_field, validate_form, FieldVerdict, FormVerdict};
