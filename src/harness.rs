//! The API test harness.
//!
//! [`ApiTestHarness`] packages the repetitive part of endpoint testing: issue
//! a request as one of two identities (anonymous, authenticated) with one of
//! five methods, and assert that the response status matches the configured
//! expectation table. One harness instance serves one test-case execution; it
//! owns at most one anonymous client, one authenticated client, and one test
//! user, each created on first use and reused for the rest of the instance's
//! life.
//!
//! # Example
//!
//! ```rust,ignore
//! use api_testkit::{ApiTestHarness, AxumTestClient};
//!
//! #[tokio::test]
//! async fn widgets_endpoint_statuses() {
//!     let app = build_app();
//!     let harness = ApiTestHarness::for_list(move || Box::new(AxumTestClient::new(app.clone())))
//!         .unwrap()
//!         .with_api_url("/widgets");
//!
//!     harness.check_all_status_codes().await;
//! }
//! ```

use http::StatusCode;
use once_cell::sync::OnceCell;
use serde_json::Value;

use crate::client::{ApiClient, ApiResponse, ReturnFormat};
use crate::error::{ConfigError, TestKitError, TestKitResult};
use crate::settings::{self, SettingKey};
use crate::status::{expected_status, Method, StatusTable};
use crate::users::{TestUser, UserFactory};

/// Produces a fresh, unauthenticated client for the application under test.
pub type ClientFactory = Box<dyn Fn() -> Box<dyn ApiClient> + Send + Sync>;

/// Reusable status-code checks for one endpoint.
///
/// Construction reads the process-wide settings once; later settings reloads
/// do not affect an already-built harness. Defaults can be overridden
/// per-instance through the `with_*` builders.
pub struct ApiTestHarness {
    api_url: Option<String>,
    return_format: ReturnFormat,
    status_anonymous: StatusTable,
    status_authenticated: StatusTable,
    only_custom: bool,
    user_factory: UserFactory,
    make_client: ClientFactory,
    anonymous: OnceCell<Box<dyn ApiClient>>,
    authenticated: OnceCell<Box<dyn ApiClient>>,
    user: OnceCell<TestUser>,
}

impl ApiTestHarness {
    /// Creates a harness with the base status tables
    /// (`DEFAULT_STATUS_BASE_*`).
    pub fn new(
        make_client: impl Fn() -> Box<dyn ApiClient> + Send + Sync + 'static,
    ) -> Result<Self, ConfigError> {
        Self::from_settings(
            Box::new(make_client),
            SettingKey::StatusBaseAnonymous,
            SettingKey::StatusBaseAuthenticated,
        )
    }

    /// Creates a harness with the list status tables
    /// (`DEFAULT_STATUS_LIST_*`): authenticated GET expects 200.
    pub fn for_list(
        make_client: impl Fn() -> Box<dyn ApiClient> + Send + Sync + 'static,
    ) -> Result<Self, ConfigError> {
        Self::from_settings(
            Box::new(make_client),
            SettingKey::StatusListAnonymous,
            SettingKey::StatusListAuthenticated,
        )
    }

    /// Creates a harness with the create status tables
    /// (`DEFAULT_STATUS_CREATE_*`): authenticated bodyless POST expects 400.
    pub fn for_create(
        make_client: impl Fn() -> Box<dyn ApiClient> + Send + Sync + 'static,
    ) -> Result<Self, ConfigError> {
        Self::from_settings(
            Box::new(make_client),
            SettingKey::StatusCreateAnonymous,
            SettingKey::StatusCreateAuthenticated,
        )
    }

    fn from_settings(
        make_client: ClientFactory,
        anonymous_key: SettingKey,
        authenticated_key: SettingKey,
    ) -> Result<Self, ConfigError> {
        let settings = settings::settings();
        Ok(Self {
            api_url: None,
            return_format: settings.return_format()?,
            status_anonymous: settings.status_table(anonymous_key)?,
            status_authenticated: settings.status_table(authenticated_key)?,
            only_custom: false,
            user_factory: settings.user_factory()?,
            make_client,
            anonymous: OnceCell::new(),
            authenticated: OnceCell::new(),
            user: OnceCell::new(),
        })
    }

    /// Sets the endpoint path the checks are issued against.
    pub fn with_api_url(mut self, api_url: impl Into<String>) -> Self {
        self.api_url = Some(api_url.into());
        self
    }

    /// Replaces the anonymous status table.
    pub fn with_status_anonymous(mut self, table: StatusTable) -> Self {
        self.status_anonymous = table;
        self
    }

    /// Replaces the authenticated status table.
    pub fn with_status_authenticated(mut self, table: StatusTable) -> Self {
        self.status_authenticated = table;
        self
    }

    /// Replaces the request body format.
    pub fn with_return_format(mut self, format: ReturnFormat) -> Self {
        self.return_format = format;
        self
    }

    /// When set, every standard check becomes a no-op so a suite can run only
    /// its custom tests.
    pub fn with_only_custom(mut self, only_custom: bool) -> Self {
        self.only_custom = only_custom;
        self
    }

    /// Replaces the user factory resolved from settings.
    pub fn with_user_factory(
        mut self,
        factory: impl Fn() -> TestUser + Send + Sync + 'static,
    ) -> Self {
        self.user_factory = std::sync::Arc::new(factory);
        self
    }

    /// The configured endpoint path.
    ///
    /// Fails with [`TestKitError::MissingApiUrl`] when the concrete test
    /// never configured one.
    pub fn api_url(&self) -> TestKitResult<&str> {
        self.api_url.as_deref().ok_or(TestKitError::MissingApiUrl)
    }

    pub(crate) fn require_api_url(&self) -> &str {
        match self.api_url() {
            Ok(path) => path,
            Err(err) => panic!("{err}"),
        }
    }

    /// The anonymous status table in effect.
    pub fn status_codes_anonymous(&self) -> &StatusTable {
        &self.status_anonymous
    }

    /// The authenticated status table in effect.
    pub fn status_codes_authenticated(&self) -> &StatusTable {
        &self.status_authenticated
    }

    /// The request body format in effect.
    pub fn return_format(&self) -> ReturnFormat {
        self.return_format
    }

    /// Whether standard checks are disabled.
    pub fn only_custom(&self) -> bool {
        self.only_custom
    }

    /// The authenticated identity, constructed via the configured user
    /// factory on first call and cached for the harness lifetime.
    pub fn user(&self) -> &TestUser {
        self.user.get_or_init(|| {
            let user = (self.user_factory)();
            tracing::debug!(username = %user.username, "constructed test user");
            user
        })
    }

    /// The unauthenticated client, constructed on first call.
    pub fn anonymous_client(&self) -> &dyn ApiClient {
        self.anonymous
            .get_or_init(|| {
                tracing::debug!("constructing anonymous client");
                (self.make_client)()
            })
            .as_ref()
    }

    /// The authenticated client, constructed on first call and bound to
    /// [`user`](Self::user).
    pub fn authenticated_client(&self) -> &dyn ApiClient {
        self.authenticated
            .get_or_init(|| {
                tracing::debug!("constructing authenticated client");
                let mut client = (self.make_client)();
                client.force_authenticate(self.user());
                client
            })
            .as_ref()
    }

    /// Checks a response status against a table, returning the mismatch as a
    /// value instead of panicking.
    pub fn verify_status_code(
        &self,
        response: &ApiResponse,
        table: &StatusTable,
        method: Method,
        status_override: Option<StatusCode>,
    ) -> TestKitResult<()> {
        let expected = expected_status(table, method, status_override)?;
        if response.status() != expected {
            return Err(TestKitError::StatusMismatch {
                method,
                path: self.api_url()?.to_string(),
                actual: response.status_code(),
                expected: expected.as_u16(),
            });
        }
        Ok(())
    }

    /// Checks a response status against a table, panicking with a
    /// descriptive message on mismatch or configuration error.
    pub fn assert_status_code(
        &self,
        response: &ApiResponse,
        table: &StatusTable,
        method: Method,
        status_override: Option<StatusCode>,
    ) {
        if let Err(err) = self.verify_status_code(response, table, method, status_override) {
            panic!("{err}");
        }
    }

    /// Checks the status of an anonymous GET request.
    pub async fn check_status_on_anonymous_get(&self, status_override: Option<StatusCode>) {
        if self.only_custom {
            return;
        }
        let response = self
            .anonymous_client()
            .get(self.require_api_url(), self.return_format)
            .await;
        self.assert_status_code(&response, &self.status_anonymous, Method::Get, status_override);
    }

    /// Checks the status of an anonymous DELETE request.
    pub async fn check_status_on_anonymous_delete(&self, status_override: Option<StatusCode>) {
        if self.only_custom {
            return;
        }
        let response = self
            .anonymous_client()
            .delete(self.require_api_url(), self.return_format)
            .await;
        self.assert_status_code(
            &response,
            &self.status_anonymous,
            Method::Delete,
            status_override,
        );
    }

    /// Checks the status of an anonymous POST request.
    pub async fn check_status_on_anonymous_post(&self, status_override: Option<StatusCode>) {
        if self.only_custom {
            return;
        }
        let response = self
            .anonymous_client()
            .post(self.require_api_url(), None, self.return_format)
            .await;
        self.assert_status_code(
            &response,
            &self.status_anonymous,
            Method::Post,
            status_override,
        );
    }

    /// Checks the status of an anonymous PATCH request.
    pub async fn check_status_on_anonymous_patch(&self, status_override: Option<StatusCode>) {
        if self.only_custom {
            return;
        }
        let response = self
            .anonymous_client()
            .patch(self.require_api_url(), None, self.return_format)
            .await;
        self.assert_status_code(
            &response,
            &self.status_anonymous,
            Method::Patch,
            status_override,
        );
    }

    /// Checks the status of an anonymous PUT request.
    pub async fn check_status_on_anonymous_put(&self, status_override: Option<StatusCode>) {
        if self.only_custom {
            return;
        }
        let response = self
            .anonymous_client()
            .put(self.require_api_url(), None, self.return_format)
            .await;
        self.assert_status_code(&response, &self.status_anonymous, Method::Put, status_override);
    }

    /// Checks the status of an authenticated GET request.
    pub async fn check_status_on_authenticated_get(&self, status_override: Option<StatusCode>) {
        if self.only_custom {
            return;
        }
        let response = self
            .authenticated_client()
            .get(self.require_api_url(), self.return_format)
            .await;
        self.assert_status_code(
            &response,
            &self.status_authenticated,
            Method::Get,
            status_override,
        );
    }

    /// Checks the status of an authenticated DELETE request.
    pub async fn check_status_on_authenticated_delete(&self, status_override: Option<StatusCode>) {
        if self.only_custom {
            return;
        }
        let response = self
            .authenticated_client()
            .delete(self.require_api_url(), self.return_format)
            .await;
        self.assert_status_code(
            &response,
            &self.status_authenticated,
            Method::Delete,
            status_override,
        );
    }

    /// Checks the status of an authenticated POST request, optionally
    /// carrying a body.
    pub async fn check_status_on_authenticated_post(
        &self,
        status_override: Option<StatusCode>,
        data: Option<Value>,
    ) {
        if self.only_custom {
            return;
        }
        let response = self
            .authenticated_client()
            .post(self.require_api_url(), data.as_ref(), self.return_format)
            .await;
        self.assert_status_code(
            &response,
            &self.status_authenticated,
            Method::Post,
            status_override,
        );
    }

    /// Checks the status of an authenticated PATCH request, optionally
    /// carrying a body.
    pub async fn check_status_on_authenticated_patch(
        &self,
        status_override: Option<StatusCode>,
        data: Option<Value>,
    ) {
        if self.only_custom {
            return;
        }
        let response = self
            .authenticated_client()
            .patch(self.require_api_url(), data.as_ref(), self.return_format)
            .await;
        self.assert_status_code(
            &response,
            &self.status_authenticated,
            Method::Patch,
            status_override,
        );
    }

    /// Checks the status of an authenticated PUT request, optionally
    /// carrying a body.
    pub async fn check_status_on_authenticated_put(
        &self,
        status_override: Option<StatusCode>,
        data: Option<Value>,
    ) {
        if self.only_custom {
            return;
        }
        let response = self
            .authenticated_client()
            .put(self.require_api_url(), data.as_ref(), self.return_format)
            .await;
        self.assert_status_code(
            &response,
            &self.status_authenticated,
            Method::Put,
            status_override,
        );
    }

    /// Runs all ten standard checks with no overrides and no request bodies.
    pub async fn check_all_status_codes(&self) {
        self.check_status_on_anonymous_get(None).await;
        self.check_status_on_anonymous_delete(None).await;
        self.check_status_on_anonymous_post(None).await;
        self.check_status_on_anonymous_patch(None).await;
        self.check_status_on_anonymous_put(None).await;
        self.check_status_on_authenticated_get(None).await;
        self.check_status_on_authenticated_delete(None).await;
        self.check_status_on_authenticated_post(None, None).await;
        self.check_status_on_authenticated_patch(None, None).await;
        self.check_status_on_authenticated_put(None, None).await;
    }
}
