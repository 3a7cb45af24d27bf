use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{header, HeaderMap, Method, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::Router;
use serde_json::{json, Value};

use clientdesk_api::{CustomerApi, HttpCustomerApi};
use clientdesk_core::domain::customer::{Customer, CustomerId};
use clientdesk_core::errors::ApiError;

#[derive(Clone, Debug)]
struct RecordedRequest {
    method: String,
    path: String,
    content_type: Option<String>,
    body: Option<Value>,
}

#[derive(Default)]
struct FakeState {
    requests: Vec<RecordedRequest>,
    routes: HashMap<(String, String), (u16, String)>,
}

#[derive(Clone, Default)]
struct FakeBackend {
    inner: Arc<Mutex<FakeState>>,
}

impl FakeBackend {
    fn respond(&self, method: &str, path: &str, status: u16, body: Value) {
        let body = if body.is_null() { String::new() } else { body.to_string() };
        self.inner
            .lock()
            .expect("fake backend lock")
            .routes
            .insert((method.to_owned(), path.to_owned()), (status, body));
    }

    fn requests(&self) -> Vec<RecordedRequest> {
        self.inner.lock().expect("fake backend lock").requests.clone()
    }
}

async fn handle(
    State(backend): State<FakeBackend>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let path = uri.path().to_owned();
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .map(str::to_owned);
    let parsed_body = serde_json::from_slice::<Value>(&body).ok();

    let mut state = backend.inner.lock().expect("fake backend lock");
    state.requests.push(RecordedRequest {
        method: method.to_string(),
        path: path.clone(),
        content_type,
        body: parsed_body,
    });

    match state.routes.get(&(method.to_string(), path)) {
        Some((status, body)) => {
            let status = StatusCode::from_u16(*status).expect("valid status code");
            (status, [(header::CONTENT_TYPE, "application/json")], body.clone()).into_response()
        }
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

async fn spawn_backend() -> (FakeBackend, HttpCustomerApi) {
    let backend = FakeBackend::default();
    let app = Router::new().fallback(handle).with_state(backend.clone());
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.expect("bind fake backend");
    let addr = listener.local_addr().expect("fake backend addr");
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });

    let api = HttpCustomerApi::new(format!("http://{addr}/api/customers"), Duration::from_secs(5))
        .expect("http client builds");
    (backend, api)
}

fn customer_json(id: i64, national_id: &str, first: &str, last: &str, contact: &str) -> Value {
    json!({
        "id": id,
        "nationalId": national_id,
        "firstName": first,
        "lastName": last,
        "contact": contact,
    })
}

#[tokio::test]
async fn list_all_decodes_customers_in_order() {
    let (backend, api) = spawn_backend().await;
    backend.respond(
        "GET",
        "/api/customers",
        200,
        json!([
            customer_json(2, "1700000002", "Luis", "Mora", "0991112222"),
            customer_json(1, "1700000001", "Ana", "Pérez", "ana@correo.ec"),
        ]),
    );

    let customers = api.list_all().await.expect("list succeeds");

    let ids: Vec<_> = customers.iter().filter_map(|customer| customer.id).collect();
    assert_eq!(ids, vec![CustomerId(2), CustomerId(1)]);
    assert_eq!(customers[1].last_name, "Pérez");
}

#[tokio::test]
async fn create_posts_json_fields_without_id() {
    let (backend, api) = spawn_backend().await;
    backend.respond(
        "POST",
        "/api/customers",
        201,
        customer_json(11, "1700000001", "Ana", "Pérez", "ana@correo.ec"),
    );

    let draft = Customer::new("1700000001", "Ana", "Pérez", "ana@correo.ec");
    let created = api.create(&draft).await.expect("create succeeds");
    assert_eq!(created.id, Some(CustomerId(11)));

    let requests = backend.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].method, "POST");
    assert_eq!(requests[0].content_type.as_deref(), Some("application/json"));
    let body = requests[0].body.clone().expect("json body");
    assert!(body.get("id").is_none());
    assert_eq!(body["nationalId"], "1700000001");
    assert_eq!(body["contact"], "ana@correo.ec");
}

#[tokio::test]
async fn update_puts_to_id_path() {
    let (backend, api) = spawn_backend().await;
    backend.respond(
        "PUT",
        "/api/customers/7",
        200,
        customer_json(7, "1700000001", "Ana", "Pérez", "0990000000"),
    );

    let existing =
        Customer::new("1700000001", "Ana", "Pérez", "0990000000").with_id(CustomerId(7));
    let updated = api.update(CustomerId(7), &existing).await.expect("update succeeds");
    assert_eq!(updated, existing);

    let requests = backend.requests();
    assert_eq!(requests[0].method, "PUT");
    assert_eq!(requests[0].path, "/api/customers/7");
    assert!(requests[0].body.as_ref().is_some_and(|body| body.get("id").is_none()));
}

#[tokio::test]
async fn delete_targets_id_path_and_accepts_no_content() {
    let (backend, api) = spawn_backend().await;
    backend.respond("DELETE", "/api/customers/7", 204, Value::Null);

    api.delete_by_id(CustomerId(7)).await.expect("delete succeeds");

    let requests = backend.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].method, "DELETE");
    assert_eq!(requests[0].path, "/api/customers/7");
}

#[tokio::test]
async fn statuses_map_to_domain_errors() {
    let (backend, api) = spawn_backend().await;
    backend.respond("POST", "/api/customers", 409, json!({"error": "duplicate"}));
    backend.respond("PUT", "/api/customers/3", 400, json!({"error": "invalid"}));
    backend.respond("GET", "/api/customers/4", 404, Value::Null);
    backend.respond("GET", "/api/customers", 503, Value::Null);

    let draft = Customer::new("1700000001", "Ana", "Pérez", "ana@correo.ec");
    assert_eq!(api.create(&draft).await.expect_err("409"), ApiError::DuplicateIdentifier);
    assert_eq!(api.update(CustomerId(3), &draft).await.expect_err("400"), ApiError::InvalidData);
    assert_eq!(api.get_by_id(CustomerId(4)).await.expect_err("404"), ApiError::NotFound);
    assert_eq!(
        api.list_all().await.expect_err("503"),
        ApiError::RequestFailed { status_code: 503, status_text: "Service Unavailable".to_owned() }
    );
}

#[tokio::test]
async fn malformed_success_body_is_an_invalid_response() {
    let (backend, api) = spawn_backend().await;
    backend.respond("GET", "/api/customers/1", 200, json!({"unexpected": true}));

    let error = api.get_by_id(CustomerId(1)).await.expect_err("undecodable body");
    assert!(matches!(error, ApiError::InvalidResponse(_)));
}

#[tokio::test]
async fn closed_port_is_network_unavailable() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    drop(listener);

    let api = HttpCustomerApi::new(format!("http://{addr}/api/customers"), Duration::from_secs(2))
        .expect("http client builds");

    assert_eq!(api.list_all().await.expect_err("no listener"), ApiError::NetworkUnavailable);
}
