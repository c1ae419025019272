//! Demo "widgets" application.
//!
//! A minimal axum app with the access semantics the kit's defaults describe:
//! every request without a simulated identity is forbidden, authenticated
//! requests can list widgets and create them with a valid body, and all other
//! methods are not allowed.
//!
//! | Method | Anonymous | Authenticated |
//! |--------|-----------|---------------|
//! | GET /widgets | 403 | 200 |
//! | POST /widgets | 403 | 400 without a `name`, 201 with one |
//! | PUT/PATCH/DELETE /widgets | 403 | 405 |

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, RwLock};

use api_testkit::{ApiClient, ApiResponse, AxumTestClient, ListFixture, TEST_USER_HEADER};
use async_trait::async_trait;
use axum::extract::{Request, State};
use axum::http::StatusCode;
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Json, Response};
use axum::routing::get;
use axum::Router;
use serde_json::{json, Value};

/// Shared widget store backing the demo app.
pub type WidgetStore = Arc<RwLock<Vec<Value>>>;

/// Builds an empty store. Also installs the test tracing subscriber, since
/// every scenario starts here.
pub fn widget_store() -> WidgetStore {
    super::init_tracing();
    Arc::new(RwLock::new(Vec::new()))
}

/// Builds the demo app: identity required for everything.
pub fn widgets_app(store: WidgetStore) -> Router {
    open_widgets_app(store).layer(middleware::from_fn(require_identity))
}

/// Builds the demo app without the identity gate. Used to provoke
/// status-mismatch failures.
pub fn open_widgets_app(store: WidgetStore) -> Router {
    Router::new()
        .route("/widgets", get(list_widgets).post(create_widget))
        .with_state(store)
}

/// Client factory for a harness driving the demo app.
pub fn widgets_client(store: WidgetStore) -> impl Fn() -> Box<dyn ApiClient> + Send + Sync {
    move || Box::new(AxumTestClient::new(widgets_app(Arc::clone(&store))))
}

async fn require_identity(request: Request, next: Next) -> Response {
    if request.headers().contains_key(TEST_USER_HEADER) {
        next.run(request).await
    } else {
        (StatusCode::FORBIDDEN, "identity required").into_response()
    }
}

async fn list_widgets(State(store): State<WidgetStore>) -> Json<Value> {
    let widgets = store.read().expect("widget store lock poisoned").clone();
    Json(json!({ "widgets": widgets }))
}

async fn create_widget(
    State(store): State<WidgetStore>,
    body: Option<Json<Value>>,
) -> Response {
    match body {
        Some(Json(widget)) if widget.get("name").and_then(Value::as_str).is_some() => {
            store
                .write()
                .expect("widget store lock poisoned")
                .push(widget.clone());
            (StatusCode::CREATED, Json(widget)).into_response()
        }
        _ => (StatusCode::BAD_REQUEST, "a widget needs a name").into_response(),
    }
}

/// List fixture seeding the widget store and verifying the listing shape.
/// Invocation counters let tests assert when the obligations ran.
pub struct WidgetFixture {
    store: WidgetStore,
    /// Times `setup_list_data` ran.
    pub seeds: AtomicUsize,
    /// Times a shape assertion ran.
    pub shape_asserts: AtomicUsize,
}

impl WidgetFixture {
    /// Creates a fixture over the given store.
    pub fn new(store: WidgetStore) -> Self {
        Self {
            store,
            seeds: AtomicUsize::new(0),
            shape_asserts: AtomicUsize::new(0),
        }
    }

    fn assert_shape(&self, response: &ApiResponse) {
        self.shape_asserts.fetch_add(1, Ordering::SeqCst);
        let body: Value = response.json().expect("list response is not JSON");
        let widgets = body["widgets"].as_array().expect("missing widgets array");
        assert_eq!(widgets.len(), 2);
        assert_eq!(widgets[0]["name"], "anvil");
        assert_eq!(widgets[1]["name"], "sprocket");
    }
}

#[async_trait]
impl ListFixture for WidgetFixture {
    async fn setup_list_data(&self) {
        self.seeds.fetch_add(1, Ordering::SeqCst);
        let mut widgets = self.store.write().expect("widget store lock poisoned");
        widgets.clear();
        widgets.push(json!({"name": "anvil"}));
        widgets.push(json!({"name": "sprocket"}));
    }

    fn assert_list_response_anonymous(&self, response: &ApiResponse) {
        self.assert_shape(response);
    }

    fn assert_list_response_authenticated(&self, response: &ApiResponse) {
        self.assert_shape(response);
    }
}
