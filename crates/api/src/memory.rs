use std::collections::{BTreeMap, VecDeque};

use async_trait::async_trait;
use tokio::sync::Mutex;

use clientdesk_core::domain::customer::{Customer, CustomerId};
use clientdesk_core::errors::ApiError;

use crate::CustomerApi;

/// A request as the backend would have seen it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ApiCall {
    List,
    Get(CustomerId),
    Create(Customer),
    Update(CustomerId, Customer),
    Delete(CustomerId),
}

impl ApiCall {
    pub fn method(&self) -> &'static str {
        match self {
            Self::List | Self::Get(_) => "GET",
            Self::Create(_) => "POST",
            Self::Update(..) => "PUT",
            Self::Delete(_) => "DELETE",
        }
    }

    /// Path relative to the customers endpoint, e.g. `/customers/7`.
    pub fn path(&self) -> String {
        match self {
            Self::List | Self::Create(_) => "/customers".to_owned(),
            Self::Get(id) | Self::Update(id, _) | Self::Delete(id) => format!("/customers/{id}"),
        }
    }
}

#[derive(Default)]
struct MemoryState {
    customers: BTreeMap<CustomerId, Customer>,
    next_id: i64,
    calls: Vec<ApiCall>,
    queued_failures: VecDeque<ApiError>,
}

impl MemoryState {
    fn record(&mut self, call: ApiCall) -> Result<(), ApiError> {
        self.calls.push(call);
        match self.queued_failures.pop_front() {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    fn national_id_taken(&self, national_id: &str, except: Option<CustomerId>) -> bool {
        self.customers
            .values()
            .any(|existing| existing.national_id == national_id && existing.id != except)
    }
}

/// In-process backend with conventional REST semantics: sequential ids,
/// 409 on a duplicate national id, 404 on unknown ids, 400 on blank fields.
#[derive(Default)]
pub struct InMemoryCustomerApi {
    state: Mutex<MemoryState>,
}

impl InMemoryCustomerApi {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds the store. Customers without an id are assigned the next one.
    pub fn with_customers(customers: impl IntoIterator<Item = Customer>) -> Self {
        let mut state = MemoryState::default();
        for customer in customers {
            let id = customer.id.unwrap_or(CustomerId(state.next_id + 1));
            state.next_id = state.next_id.max(id.0);
            state.customers.insert(id, customer.with_id(id));
        }
        Self { state: Mutex::new(state) }
    }

    /// Makes the next call fail with `error`; queued failures are consumed in order.
    pub async fn fail_next(&self, error: ApiError) {
        self.state.lock().await.queued_failures.push_back(error);
    }

    pub async fn calls(&self) -> Vec<ApiCall> {
        self.state.lock().await.calls.clone()
    }

    pub async fn snapshot(&self) -> Vec<Customer> {
        self.state.lock().await.customers.values().cloned().collect()
    }
}

fn has_blank_field(customer: &Customer) -> bool {
    [&customer.national_id, &customer.first_name, &customer.last_name, &customer.contact]
        .iter()
        .any(|value| value.trim().is_empty())
}

#[async_trait]
impl CustomerApi for InMemoryCustomerApi {
    async fn list_all(&self) -> Result<Vec<Customer>, ApiError> {
        let mut state = self.state.lock().await;
        state.record(ApiCall::List)?;
        Ok(state.customers.values().cloned().collect())
    }

    async fn get_by_id(&self, id: CustomerId) -> Result<Customer, ApiError> {
        let mut state = self.state.lock().await;
        state.record(ApiCall::Get(id))?;
        state.customers.get(&id).cloned().ok_or(ApiError::NotFound)
    }

    async fn create(&self, customer: &Customer) -> Result<Customer, ApiError> {
        let body = customer.fields_only();
        let mut state = self.state.lock().await;
        state.record(ApiCall::Create(body.clone()))?;

        if has_blank_field(&body) {
            return Err(ApiError::InvalidData);
        }
        if state.national_id_taken(&body.national_id, None) {
            return Err(ApiError::DuplicateIdentifier);
        }

        state.next_id += 1;
        let id = CustomerId(state.next_id);
        let stored = body.with_id(id);
        state.customers.insert(id, stored.clone());
        Ok(stored)
    }

    async fn update(&self, id: CustomerId, customer: &Customer) -> Result<Customer, ApiError> {
        let body = customer.fields_only();
        let mut state = self.state.lock().await;
        state.record(ApiCall::Update(id, body.clone()))?;

        if !state.customers.contains_key(&id) {
            return Err(ApiError::NotFound);
        }
        if has_blank_field(&body) {
            return Err(ApiError::InvalidData);
        }
        if state.national_id_taken(&body.national_id, Some(id)) {
            return Err(ApiError::DuplicateIdentifier);
        }

        let stored = body.with_id(id);
        state.customers.insert(id, stored.clone());
        Ok(stored)
    }

    async fn delete_by_id(&self, id: CustomerId) -> Result<(), ApiError> {
        let mut state = self.state.lock().await;
        state.record(ApiCall::Delete(id))?;
        state.customers.remove(&id).map(|_| ()).ok_or(ApiError::NotFound)
    }
}
