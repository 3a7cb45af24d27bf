//! Backend access for the customer desk.
//!
//! [`CustomerApi`] is the seam every controller talks through. Two
//! implementations ship with the crate:
//!
//! - [`HttpCustomerApi`] - REST over HTTP with `reqwest`
//! - [`InMemoryCustomerApi`] - the same REST semantics held in memory, with a
//!   call log and failure injection for tests and offline demos
//!
//! Every failure is returned as an [`ApiError`]; nothing is retried.

use async_trait::async_trait;

use clientdesk_core::domain::customer::{Customer, CustomerId};
use clientdesk_core::errors::ApiError;

pub mod http;
pub mod memory;

pub use http::HttpCustomerApi;
pub use memory::{ApiCall, InMemoryCustomerApi};

#[async_trait]
pub trait CustomerApi: Send + Sync {
    async fn list_all(&self) -> Result<Vec<Customer>, ApiError>;

    async fn get_by_id(&self, id: CustomerId) -> Result<Customer, ApiError>;

    /// Sends the customer's fields (never its id) and returns the persisted
    /// record with its server-assigned id.
    async fn create(&self, customer: &Customer) -> Result<Customer, ApiError>;

    async fn update(&self, id: CustomerId, customer: &Customer) -> Result<Customer, ApiError>;

    async fn delete_by_id(&self, id: CustomerId) -> Result<(), ApiError>;
}
