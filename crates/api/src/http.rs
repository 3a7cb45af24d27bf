use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use clientdesk_core::config::ApiConfig;
use clientdesk_core::domain::customer::{Customer, CustomerId};
use clientdesk_core::errors::ApiError;

use crate::CustomerApi;

#[derive(Clone, Debug)]
pub struct HttpCustomerApi {
    client: Client,
    base_url: String,
}

impl HttpCustomerApi {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(timeout).build()?;
        let base_url = base_url.into().trim_end_matches('/').to_owned();
        Ok(Self { client, base_url })
    }

    pub fn from_config(config: &ApiConfig) -> Result<Self, reqwest::Error> {
        Self::new(config.base_url.clone(), Duration::from_secs(config.timeout_secs))
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, id: Option<CustomerId>) -> String {
        match id {
            Some(id) => format!("{}/{id}", self.base_url),
            None => self.base_url.clone(),
        }
    }

    fn request(&self, method: Method, id: Option<CustomerId>) -> (RequestBuilder, String) {
        let url = self.url(id);
        (self.client.request(method, &url), url)
    }

    async fn send(
        &self,
        method: &'static str,
        url: &str,
        request: RequestBuilder,
    ) -> Result<Response, ApiError> {
        let started = Instant::now();
        let response = match request.send().await {
            Ok(response) => response,
            Err(error) => {
                warn!(
                    event_name = "desk.api.unreachable",
                    method,
                    url,
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    error = %error,
                    "customer backend request produced no response"
                );
                return Err(ApiError::NetworkUnavailable);
            }
        };

        let status = response.status();
        debug!(
            event_name = "desk.api.request",
            method,
            url,
            status = status.as_u16(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "customer backend request completed"
        );

        if status.is_success() {
            return Ok(response);
        }

        let status_text = status.canonical_reason().unwrap_or_default();
        Err(ApiError::from_status(status.as_u16(), status_text))
    }
}

async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, ApiError> {
    response.json::<T>().await.map_err(|error| ApiError::InvalidResponse(error.to_string()))
}

#[async_trait]
impl CustomerApi for HttpCustomerApi {
    async fn list_all(&self) -> Result<Vec<Customer>, ApiError> {
        let (request, url) = self.request(Method::GET, None);
        let response = self.send("GET", &url, request).await?;
        decode(response).await
    }

    async fn get_by_id(&self, id: CustomerId) -> Result<Customer, ApiError> {
        let (request, url) = self.request(Method::GET, Some(id));
        let response = self.send("GET", &url, request).await?;
        decode(response).await
    }

    async fn create(&self, customer: &Customer) -> Result<Customer, ApiError> {
        let (request, url) = self.request(Method::POST, None);
        let response = self.send("POST", &url, request.json(&customer.fields_only())).await?;
        decode(response).await
    }

    async fn update(&self, id: CustomerId, customer: &Customer) -> Result<Customer, ApiError> {
        let (request, url) = self.request(Method::PUT, Some(id));
        let response = self.send("PUT", &url, request.json(&customer.fields_only())).await?;
        decode(response).await
    }

    async fn delete_by_id(&self, id: CustomerId) -> Result<(), ApiError> {
        let (request, url) = self.request(Method::DELETE, Some(id));
        self.send("DELETE", &url, request).await?;
        Ok(())
    }
}
