//! # api-testkit — HTTP status assertion harness for API tests
//!
//! This crate packages the repetitive part of endpoint testing: for a given
//! endpoint, issue a request as one of two identities (anonymous,
//! authenticated) with each of the five mutating-and-reading HTTP methods,
//! and assert that the response status code matches a configured expectation
//! table. It is built for [`axum`] applications tested through
//! [`axum-test`](https://docs.rs/axum-test), but any client implementing the
//! [`ApiClient`] trait works.
//!
//! ## Status expectation tables
//!
//! A [`StatusTable`] maps HTTP methods to expected status codes, with an
//! `ALL` wildcard fallback. The kit ships defaults for three endpoint kinds:
//!
//! | Table | Anonymous | Authenticated |
//! |-------|-----------|---------------|
//! | base | `{ALL: 403}` | `{ALL: 405}` |
//! | list | `{ALL: 403}` | `{ALL: 405, GET: 200}` |
//! | create | `{ALL: 403}` | `{ALL: 405, POST: 400}` |
//!
//! ## Quick start
//!
//! ```rust,ignore
//! use api_testkit::{ApiTestHarness, AxumTestClient};
//!
//! #[tokio::test]
//! async fn widget_list_statuses() {
//!     let harness = ApiTestHarness::for_list(|| Box::new(AxumTestClient::new(build_app())))
//!         .unwrap()
//!         .with_api_url("/widgets");
//!
//!     harness.check_all_status_codes().await;
//! }
//! ```
//!
//! ## Configuration
//!
//! All settings live under the `API_TESTKIT` key of the host configuration
//! and fall back to built-in defaults; see [`settings`] for the recognized
//! names and [`settings::reload`] for swapping configuration at runtime.
//! User factories are registered by id with
//! [`register_user_factory`](users::register_user_factory) and referenced
//! from the `USER_FACTORY` setting.
//!
//! ## Error handling
//!
//! Configuration problems ([`ConfigError`]) and forgotten test-class setup
//! ([`TestKitError::MissingApiUrl`]) are fatal and never retried. A status
//! mismatch is the one expected failure mode; the `check_*` and `assert_*`
//! entry points panic with a message naming the method, path, actual code,
//! and expected code, so a failing test reads naturally in the runner
//! output.
//!
//! ## Architecture
//!
//! - [`error`] - Error taxonomy and result alias
//! - [`status`] - HTTP methods and status expectation tables
//! - [`settings`] - Settings resolution with defaults, overrides, and the
//!   process-wide singleton
//! - [`users`] - Test users and the user-factory registry
//! - [`client`] - The HTTP test client seam and the axum-test implementation
//! - [`harness`] - The per-test-case harness and its ten standard checks
//! - [`list`] - List-endpoint checks and the [`ListFixture`] obligations

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod client;
pub mod error;
pub mod harness;
pub mod list;
pub mod settings;
pub mod status;
pub mod users;

// Re-export commonly used types
pub use client::{ApiClient, ApiResponse, AxumTestClient, ReturnFormat, TEST_USER_HEADER};
pub use error::{ConfigError, TestKitError, TestKitResult};
pub use harness::ApiTestHarness;
pub use list::ListFixture;
pub use settings::{SettingKey, Settings};
pub use status::{expected_status, Method, StatusTable};
pub use users::{register_user_factory, TestUser, UserFactory, DEFAULT_USER_FACTORY};
