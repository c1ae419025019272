//! List-endpoint checks.
//!
//! List endpoints get two extra checks on top of the status-code ones: seed
//! backing data so the listing is non-empty, issue a GET, and verify the
//! response shape. Seeding and shape verification are things only the
//! concrete test suite can do, so they are expressed as the [`ListFixture`]
//! capability trait; the compiler enforces the obligations.
//!
//! Both checks run only when the resolved expected status for GET is 200 —
//! any other expectation means the listing is not reachable for that
//! identity, and only the plain status checks apply.

use async_trait::async_trait;
use http::StatusCode;

use crate::client::{ApiClient, ApiResponse};
use crate::harness::ApiTestHarness;
use crate::status::{expected_status, Method};

/// What a concrete list-endpoint test must supply.
#[async_trait]
pub trait ListFixture: Sync {
    /// Seeds backing data so a list response is non-empty.
    async fn setup_list_data(&self);

    /// Verifies the shape and content of an anonymous list response.
    fn assert_list_response_anonymous(&self, response: &ApiResponse);

    /// Verifies the shape and content of an authenticated list response.
    fn assert_list_response_authenticated(&self, response: &ApiResponse);
}

impl ApiTestHarness {
    /// Seeds data and verifies the anonymous GET response shape, provided the
    /// anonymous table expects a 200 for GET.
    pub async fn check_list_on_anonymous_get<F: ListFixture>(&self, fixture: &F) {
        if self.only_custom() {
            return;
        }
        let expected = match expected_status(self.status_codes_anonymous(), Method::Get, None) {
            Ok(code) => code,
            Err(err) => panic!("{err}"),
        };
        if expected != StatusCode::OK {
            return;
        }

        fixture.setup_list_data().await;
        let response = self
            .anonymous_client()
            .get(self.require_api_url(), self.return_format())
            .await;
        fixture.assert_list_response_anonymous(&response);
    }

    /// Seeds data and verifies the authenticated GET response shape, provided
    /// the authenticated table expects a 200 for GET.
    pub async fn check_list_on_authenticated_get<F: ListFixture>(&self, fixture: &F) {
        if self.only_custom() {
            return;
        }
        let expected = match expected_status(self.status_codes_authenticated(), Method::Get, None) {
            Ok(code) => code,
            Err(err) => panic!("{err}"),
        };
        if expected != StatusCode::OK {
            return;
        }

        fixture.setup_list_data().await;
        let response = self
            .authenticated_client()
            .get(self.require_api_url(), self.return_format())
            .await;
        fixture.assert_list_response_authenticated(&response);
    }
}
