//! The HTTP test client seam.
//!
//! The harness never talks to `axum-test` directly; it goes through the
//! object-safe [`ApiClient`] trait so concrete test suites can substitute any
//! client that can issue the five methods and bind a simulated identity.
//! [`AxumTestClient`] is the in-tree implementation over
//! [`axum_test::TestServer`].
//!
//! # Identity binding
//!
//! [`AxumTestClient::force_authenticate`] binds a [`TestUser`] by attaching
//! the [`TEST_USER_HEADER`] (`x-test-user`) header, carrying the username, to
//! every subsequent request. The application under test decides what that
//! header means; the demo apps in this crate's integration tests treat its
//! presence as an authenticated session. Because the username travels as a
//! header value it must stay within visible ASCII; binding a user whose name
//! is not a valid header value panics.

use async_trait::async_trait;
use axum::Router;
use axum_test::TestServer;
use http::{HeaderMap, HeaderName, HeaderValue, StatusCode};
use serde_json::Value;

use crate::status::Method;
use crate::users::TestUser;

/// Header carrying the simulated identity on authenticated requests.
pub const TEST_USER_HEADER: HeaderName = HeaderName::from_static("x-test-user");

/// Request body encoding for issued checks.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ReturnFormat {
    /// JSON-encoded bodies (`application/json`).
    #[default]
    Json,
    /// Form-encoded bodies (`application/x-www-form-urlencoded`).
    Form,
}

impl ReturnFormat {
    /// The token used in the `RETURN_FORMAT` setting.
    pub fn as_str(&self) -> &'static str {
        match self {
            ReturnFormat::Json => "json",
            ReturnFormat::Form => "form",
        }
    }
}

impl std::fmt::Display for ReturnFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ReturnFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "json" => Ok(ReturnFormat::Json),
            "form" => Ok(ReturnFormat::Form),
            other => Err(format!("unrecognized return format '{other}'")),
        }
    }
}

/// A response as the harness sees it: status, headers, and the raw body.
#[derive(Clone, Debug)]
pub struct ApiResponse {
    status: StatusCode,
    headers: HeaderMap,
    body: String,
}

impl ApiResponse {
    /// Builds a response; useful for [`ApiClient`] implementations outside
    /// this crate.
    pub fn new(status: StatusCode, headers: HeaderMap, body: String) -> Self {
        Self {
            status,
            headers,
            body,
        }
    }

    /// The response status.
    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// The response status as a bare integer.
    pub fn status_code(&self) -> u16 {
        self.status.as_u16()
    }

    /// The response headers.
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// The response body as text.
    pub fn text(&self) -> &str {
        &self.body
    }

    /// Deserializes the response body as JSON.
    pub fn json<T: serde::de::DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_str(&self.body)
    }
}

/// An HTTP test client the harness can drive.
///
/// Implementations must be able to issue the five checked methods against a
/// path, optionally carrying a body in the configured format, and must offer
/// a way to bind a simulated authenticated identity that all subsequent
/// requests carry.
#[async_trait]
pub trait ApiClient: Send + Sync {
    /// Issues a request.
    async fn send(
        &self,
        method: Method,
        path: &str,
        data: Option<&Value>,
        format: ReturnFormat,
    ) -> ApiResponse;

    /// Binds a simulated identity to this client. Every request issued after
    /// this call is treated as authenticated as `user`.
    fn force_authenticate(&mut self, user: &TestUser);

    /// Issues a GET request.
    async fn get(&self, path: &str, format: ReturnFormat) -> ApiResponse {
        self.send(Method::Get, path, None, format).await
    }

    /// Issues a POST request.
    async fn post(&self, path: &str, data: Option<&Value>, format: ReturnFormat) -> ApiResponse {
        self.send(Method::Post, path, data, format).await
    }

    /// Issues a PUT request.
    async fn put(&self, path: &str, data: Option<&Value>, format: ReturnFormat) -> ApiResponse {
        self.send(Method::Put, path, data, format).await
    }

    /// Issues a PATCH request.
    async fn patch(&self, path: &str, data: Option<&Value>, format: ReturnFormat) -> ApiResponse {
        self.send(Method::Patch, path, data, format).await
    }

    /// Issues a DELETE request.
    async fn delete(&self, path: &str, format: ReturnFormat) -> ApiResponse {
        self.send(Method::Delete, path, None, format).await
    }
}

/// [`ApiClient`] implementation over [`axum_test::TestServer`].
pub struct AxumTestClient {
    server: TestServer,
    identity: Option<HeaderValue>,
}

impl AxumTestClient {
    /// Starts a test server for the given router and wraps it.
    pub fn new(router: Router) -> Self {
        Self::from_server(TestServer::new(router).expect("failed to create test server"))
    }

    /// Wraps an already-configured test server.
    pub fn from_server(server: TestServer) -> Self {
        Self {
            server,
            identity: None,
        }
    }
}

#[async_trait]
impl ApiClient for AxumTestClient {
    async fn send(
        &self,
        method: Method,
        path: &str,
        data: Option<&Value>,
        format: ReturnFormat,
    ) -> ApiResponse {
        let mut request = self.server.method(method.to_http(), path);
        if let Some(identity) = &self.identity {
            request = request.add_header(TEST_USER_HEADER, identity.clone());
        }
        if let Some(body) = data {
            request = match format {
                ReturnFormat::Json => request.json(body),
                ReturnFormat::Form => request.form(body),
            };
        }
        let response = request.await;
        ApiResponse::new(
            response.status_code(),
            response.headers().clone(),
            response.text(),
        )
    }

    fn force_authenticate(&mut self, user: &TestUser) {
        self.identity = Some(
            HeaderValue::from_str(&user.username)
                .expect("username is not a valid header value"),
        );
    }
}
