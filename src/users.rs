//! Test users and the user-factory registry.
//!
//! The `USER_FACTORY` setting names a factory by string id. Instead of
//! resolving such strings dynamically at runtime, the kit keeps an explicit
//! process-wide registry from id to constructor, populated at startup with
//! [`register_user_factory`]. A built-in factory is pre-registered under
//! [`DEFAULT_USER_FACTORY`] so the defaults resolve without any setup.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use once_cell::sync::Lazy;
use uuid::Uuid;

use crate::error::ConfigError;

/// The simulated identity a harness authenticates with.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TestUser {
    /// Stable identifier for the user.
    pub id: Uuid,
    /// Username carried on authenticated requests.
    ///
    /// [`AxumTestClient`](crate::client::AxumTestClient) transports it as an
    /// HTTP header value, so it must stay within visible ASCII when the user
    /// is bound to that client.
    pub username: String,
}

impl TestUser {
    /// Creates a user with the given username and a random id.
    pub fn new(username: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            username: username.into(),
        }
    }

    /// Replaces the random id with a fixed one.
    pub fn with_id(mut self, id: Uuid) -> Self {
        self.id = id;
        self
    }
}

/// A zero-argument constructor producing a fresh test user.
pub type UserFactory = Arc<dyn Fn() -> TestUser + Send + Sync>;

/// Registry id of the built-in factory.
pub const DEFAULT_USER_FACTORY: &str = "api_testkit.users.default";

static REGISTRY: Lazy<RwLock<HashMap<String, UserFactory>>> = Lazy::new(|| {
    let mut map: HashMap<String, UserFactory> = HashMap::new();
    map.insert(
        DEFAULT_USER_FACTORY.to_string(),
        Arc::new(|| TestUser::new("testkit-user")),
    );
    RwLock::new(map)
});

/// Registers a user factory under the given id, replacing any previous
/// registration.
///
/// Call this once at test startup, before harnesses resolve the
/// `USER_FACTORY` setting.
pub fn register_user_factory(path: impl Into<String>, factory: impl Fn() -> TestUser + Send + Sync + 'static) {
    let path = path.into();
    tracing::debug!(path = %path, "registering user factory");
    REGISTRY
        .write()
        .expect("user factory registry lock poisoned")
        .insert(path, Arc::new(factory));
}

/// Looks up a registered factory. `key` names the setting being resolved and
/// is only used in error messages.
pub(crate) fn resolve_user_factory(key: &str, path: &str) -> Result<UserFactory, ConfigError> {
    REGISTRY
        .read()
        .expect("user factory registry lock poisoned")
        .get(path)
        .cloned()
        .ok_or_else(|| ConfigError::UnknownUserFactory {
            key: key.to_string(),
            path: path.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_factory_is_registered() {
        let factory = resolve_user_factory("USER_FACTORY", DEFAULT_USER_FACTORY).unwrap();
        let user = factory();
        assert_eq!(user.username, "testkit-user");
    }

    #[test]
    fn test_each_call_produces_a_fresh_user() {
        let factory = resolve_user_factory("USER_FACTORY", DEFAULT_USER_FACTORY).unwrap();
        assert_ne!(factory().id, factory().id);
    }

    #[test]
    fn test_registered_factory_resolves() {
        register_user_factory("tests.users.alice", || TestUser::new("alice"));
        let factory = resolve_user_factory("USER_FACTORY", "tests.users.alice").unwrap();
        assert_eq!(factory().username, "alice");
    }

    #[test]
    fn test_unregistered_path_names_key_and_path() {
        let err = resolve_user_factory("USER_FACTORY", "no.such.factory").err().unwrap();
        let msg = err.to_string();
        assert!(msg.contains("USER_FACTORY"));
        assert!(msg.contains("no.such.factory"));
    }
}
