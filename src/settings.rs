//! Settings resolution for the test kit.
//!
//! All kit settings live in a single host-configuration namespace block keyed
//! by [`NAMESPACE`]. Resolution prefers the user-supplied override mapping and
//! falls back to the built-in defaults:
//!
//! ```json
//! {
//!     "API_TESTKIT": {
//!         "RETURN_FORMAT": "json",
//!         "USER_FACTORY": "api_testkit.users.default",
//!         "DEFAULT_STATUS_BASE_ANONYMOUS": {"ALL": 403},
//!         "DEFAULT_STATUS_BASE_AUTHENTICATED": {"ALL": 405},
//!         "DEFAULT_STATUS_LIST_ANONYMOUS": {"ALL": 403},
//!         "DEFAULT_STATUS_LIST_AUTHENTICATED": {"ALL": 405, "GET": 200},
//!         "DEFAULT_STATUS_CREATE_ANONYMOUS": {"ALL": 403},
//!         "DEFAULT_STATUS_CREATE_AUTHENTICATED": {"ALL": 405, "POST": 400}
//!     }
//! }
//! ```
//!
//! Each value is resolved at most once per [`Settings`] instance and cached.
//! The process-wide instance behind [`settings`] is replaced wholesale by
//! [`reload`] when host configuration changes; holders of the old `Arc` keep
//! their already-resolved values.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::{Arc, RwLock};

use once_cell::sync::Lazy;
use serde_json::Value;

use crate::client::ReturnFormat;
use crate::error::ConfigError;
use crate::status::StatusTable;
use crate::users::{self, UserFactory, DEFAULT_USER_FACTORY};

/// The host-configuration key the kit's settings block lives under.
pub const NAMESPACE: &str = "API_TESTKIT";

/// Settings that existed in earlier releases and have since been retired.
/// Their presence in an override mapping is an error at construction time.
const REMOVED_SETTINGS: [&str; 2] = ["DEFAULT_STATUS_ANONYMOUS", "DEFAULT_STATUS_AUTHENTICATED"];

/// The recognized setting names.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SettingKey {
    /// Request body format for issued checks.
    ReturnFormat,
    /// Registry id(s) of the user factory.
    UserFactory,
    /// Default table for anonymous requests on plain endpoints.
    StatusBaseAnonymous,
    /// Default table for authenticated requests on plain endpoints.
    StatusBaseAuthenticated,
    /// Default table for anonymous requests on list endpoints.
    StatusListAnonymous,
    /// Default table for authenticated requests on list endpoints.
    StatusListAuthenticated,
    /// Default table for anonymous requests on create endpoints.
    StatusCreateAnonymous,
    /// Default table for authenticated requests on create endpoints.
    StatusCreateAuthenticated,
}

impl SettingKey {
    /// Every recognized key.
    pub const ALL: [SettingKey; 8] = [
        SettingKey::ReturnFormat,
        SettingKey::UserFactory,
        SettingKey::StatusBaseAnonymous,
        SettingKey::StatusBaseAuthenticated,
        SettingKey::StatusListAnonymous,
        SettingKey::StatusListAuthenticated,
        SettingKey::StatusCreateAnonymous,
        SettingKey::StatusCreateAuthenticated,
    ];

    /// The name used in the host-configuration block.
    pub fn name(&self) -> &'static str {
        match self {
            SettingKey::ReturnFormat => "RETURN_FORMAT",
            SettingKey::UserFactory => "USER_FACTORY",
            SettingKey::StatusBaseAnonymous => "DEFAULT_STATUS_BASE_ANONYMOUS",
            SettingKey::StatusBaseAuthenticated => "DEFAULT_STATUS_BASE_AUTHENTICATED",
            SettingKey::StatusListAnonymous => "DEFAULT_STATUS_LIST_ANONYMOUS",
            SettingKey::StatusListAuthenticated => "DEFAULT_STATUS_LIST_AUTHENTICATED",
            SettingKey::StatusCreateAnonymous => "DEFAULT_STATUS_CREATE_ANONYMOUS",
            SettingKey::StatusCreateAuthenticated => "DEFAULT_STATUS_CREATE_AUTHENTICATED",
        }
    }

    /// Parses a host-configuration name into a key.
    pub fn from_name(name: &str) -> Option<Self> {
        SettingKey::ALL.into_iter().find(|key| key.name() == name)
    }
}

impl fmt::Display for SettingKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A resolved setting value.
#[derive(Clone)]
pub enum SettingValue {
    /// A resolved `RETURN_FORMAT`.
    Format(ReturnFormat),
    /// A resolved `USER_FACTORY` sequence.
    UserFactories(Vec<UserFactory>),
    /// A resolved status table.
    Table(StatusTable),
}

impl fmt::Debug for SettingValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SettingValue::Format(format) => write!(f, "Format({format})"),
            SettingValue::UserFactories(factories) => {
                write!(f, "UserFactories(len={})", factories.len())
            }
            SettingValue::Table(table) => write!(f, "Table({table})"),
        }
    }
}

/// Resolves setting names to effective values.
///
/// Resolution order per key: explicit per-call override (never cached), then
/// the user override mapping this instance was constructed with, then the
/// built-in default. The first override-mapping-or-default resolution per key
/// is memoized for the lifetime of the instance.
#[derive(Debug)]
pub struct Settings {
    overrides: serde_json::Map<String, Value>,
    cache: RwLock<HashMap<SettingKey, SettingValue>>,
}

impl Settings {
    /// Builds a resolver from an override mapping (the namespace block).
    ///
    /// `overrides` must be a JSON object or `null` (no overrides). Retired
    /// setting names in the mapping are rejected outright; unrecognized names
    /// are logged and ignored — they only fail when requested through
    /// [`get`](Self::get).
    pub fn new(overrides: Value) -> Result<Self, ConfigError> {
        let overrides = match overrides {
            Value::Null => serde_json::Map::new(),
            Value::Object(map) => map,
            other => {
                return Err(ConfigError::InvalidValue {
                    key: NAMESPACE.to_string(),
                    message: format!("expected a settings mapping, got {other}"),
                })
            }
        };

        for name in overrides.keys() {
            if REMOVED_SETTINGS.contains(&name.as_str()) {
                return Err(ConfigError::RemovedSetting { key: name.clone() });
            }
            if SettingKey::from_name(name).is_none() {
                tracing::warn!(setting = %name, "ignoring unrecognized setting override");
            }
        }

        Ok(Self {
            overrides,
            cache: RwLock::new(HashMap::new()),
        })
    }

    /// Resolves a setting by its host-configuration name.
    pub fn get(&self, name: &str) -> Result<SettingValue, ConfigError> {
        let key = SettingKey::from_name(name).ok_or_else(|| ConfigError::UnknownSetting {
            key: name.to_string(),
        })?;
        self.resolve(key, None)
    }

    /// Resolves a setting, optionally preferring an explicit per-call value.
    ///
    /// A per-call value takes precedence over both the override mapping and
    /// the defaults, and is never cached.
    pub fn resolve(
        &self,
        key: SettingKey,
        value_override: Option<&Value>,
    ) -> Result<SettingValue, ConfigError> {
        if let Some(value) = value_override {
            return Self::parse(key, value);
        }

        if let Some(hit) = self
            .cache
            .read()
            .expect("settings cache lock poisoned")
            .get(&key)
        {
            return Ok(hit.clone());
        }

        let resolved = match self.overrides.get(key.name()) {
            Some(value) => Self::parse(key, value)?,
            None => Self::default_for(key)?,
        };
        tracing::debug!(setting = %key, value = ?resolved, "resolved setting");
        self.cache
            .write()
            .expect("settings cache lock poisoned")
            .insert(key, resolved.clone());
        Ok(resolved)
    }

    /// The configured request body format.
    pub fn return_format(&self) -> Result<ReturnFormat, ConfigError> {
        match self.resolve(SettingKey::ReturnFormat, None)? {
            SettingValue::Format(format) => Ok(format),
            _ => unreachable!("RETURN_FORMAT always resolves to a format"),
        }
    }

    /// The configured user factories, in declaration order.
    pub fn user_factories(&self) -> Result<Vec<UserFactory>, ConfigError> {
        match self.resolve(SettingKey::UserFactory, None)? {
            SettingValue::UserFactories(factories) => Ok(factories),
            _ => unreachable!("USER_FACTORY always resolves to factories"),
        }
    }

    /// The first configured user factory.
    pub fn user_factory(&self) -> Result<UserFactory, ConfigError> {
        self.user_factories()?
            .into_iter()
            .next()
            .ok_or_else(|| ConfigError::InvalidValue {
                key: SettingKey::UserFactory.name().to_string(),
                message: "the factory sequence is empty".to_string(),
            })
    }

    /// A configured status table.
    ///
    /// Fails with [`ConfigError::InvalidValue`] when `key` does not name a
    /// status table setting.
    pub fn status_table(&self, key: SettingKey) -> Result<StatusTable, ConfigError> {
        match self.resolve(key, None)? {
            SettingValue::Table(table) => Ok(table),
            _ => Err(ConfigError::InvalidValue {
                key: key.name().to_string(),
                message: "setting is not a status table".to_string(),
            }),
        }
    }

    fn parse(key: SettingKey, value: &Value) -> Result<SettingValue, ConfigError> {
        match key {
            SettingKey::ReturnFormat => {
                let raw = value.as_str().ok_or_else(|| ConfigError::InvalidValue {
                    key: key.name().to_string(),
                    message: format!("expected a format string, got {value}"),
                })?;
                let format =
                    ReturnFormat::from_str(raw).map_err(|message| ConfigError::InvalidValue {
                        key: key.name().to_string(),
                        message,
                    })?;
                Ok(SettingValue::Format(format))
            }
            SettingKey::UserFactory => {
                let paths: Vec<&str> = match value {
                    Value::String(path) => vec![path.as_str()],
                    Value::Array(items) => items
                        .iter()
                        .map(|item| {
                            item.as_str().ok_or_else(|| ConfigError::InvalidValue {
                                key: key.name().to_string(),
                                message: format!("expected a factory path string, got {item}"),
                            })
                        })
                        .collect::<Result<_, _>>()?,
                    other => {
                        return Err(ConfigError::InvalidValue {
                            key: key.name().to_string(),
                            message: format!(
                                "expected a factory path or sequence of paths, got {other}"
                            ),
                        })
                    }
                };
                let factories = paths
                    .into_iter()
                    .map(|path| users::resolve_user_factory(key.name(), path))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(SettingValue::UserFactories(factories))
            }
            _ => Ok(SettingValue::Table(StatusTable::from_value(
                key.name(),
                value,
            )?)),
        }
    }

    fn default_for(key: SettingKey) -> Result<SettingValue, ConfigError> {
        use http::StatusCode;

        let table = |t: StatusTable| Ok(SettingValue::Table(t));
        match key {
            SettingKey::ReturnFormat => Ok(SettingValue::Format(ReturnFormat::Json)),
            SettingKey::UserFactory => Ok(SettingValue::UserFactories(vec![
                users::resolve_user_factory(key.name(), DEFAULT_USER_FACTORY)?,
            ])),
            SettingKey::StatusBaseAnonymous
            | SettingKey::StatusListAnonymous
            | SettingKey::StatusCreateAnonymous => table(StatusTable::all(StatusCode::FORBIDDEN)),
            SettingKey::StatusBaseAuthenticated => {
                table(StatusTable::all(StatusCode::METHOD_NOT_ALLOWED))
            }
            SettingKey::StatusListAuthenticated => table(
                StatusTable::all(StatusCode::METHOD_NOT_ALLOWED)
                    .with(crate::status::Method::Get, StatusCode::OK),
            ),
            SettingKey::StatusCreateAuthenticated => table(
                StatusTable::all(StatusCode::METHOD_NOT_ALLOWED)
                    .with(crate::status::Method::Post, StatusCode::BAD_REQUEST),
            ),
        }
    }
}

static GLOBAL: Lazy<RwLock<Arc<Settings>>> = Lazy::new(|| {
    RwLock::new(Arc::new(
        Settings::new(Value::Null).expect("built-in defaults are valid"),
    ))
});

/// Returns the current process-wide settings resolver.
///
/// The returned `Arc` is a snapshot: a later [`reload`] swaps the shared
/// reference but does not touch instances already handed out.
pub fn settings() -> Arc<Settings> {
    Arc::clone(&GLOBAL.read().expect("settings singleton lock poisoned"))
}

/// Installs the settings namespace block as the process-wide configuration.
pub fn init(namespace: Value) -> Result<(), ConfigError> {
    reload(namespace)
}

/// Replaces the process-wide resolver with one built from the given namespace
/// block. The old resolver and its caches are discarded, not merged.
pub fn reload(namespace: Value) -> Result<(), ConfigError> {
    let fresh = Arc::new(Settings::new(namespace)?);
    *GLOBAL.write().expect("settings singleton lock poisoned") = fresh;
    tracing::debug!("settings reloaded");
    Ok(())
}

/// Extracts the [`NAMESPACE`] block from a host configuration document and
/// installs it. A missing block means all defaults.
pub fn init_from_host(host: &Value) -> Result<(), ConfigError> {
    reload(host.get(NAMESPACE).cloned().unwrap_or(Value::Null))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::status::Method;
    use http::StatusCode;
    use serde_json::json;

    #[test]
    fn test_defaults_resolve_without_overrides() {
        let settings = Settings::new(Value::Null).unwrap();
        assert_eq!(settings.return_format().unwrap(), ReturnFormat::Json);

        let table = settings
            .status_table(SettingKey::StatusListAuthenticated)
            .unwrap();
        assert_eq!(table.entry(Method::Get), Some(StatusCode::OK));
        assert_eq!(
            table.entry(Method::Delete),
            Some(StatusCode::METHOD_NOT_ALLOWED)
        );
    }

    #[test]
    fn test_create_defaults_match_create_semantics() {
        let settings = Settings::new(Value::Null).unwrap();
        let anonymous = settings
            .status_table(SettingKey::StatusCreateAnonymous)
            .unwrap();
        let authenticated = settings
            .status_table(SettingKey::StatusCreateAuthenticated)
            .unwrap();
        assert_eq!(anonymous.entry(Method::Post), Some(StatusCode::FORBIDDEN));
        assert_eq!(
            authenticated.entry(Method::Post),
            Some(StatusCode::BAD_REQUEST)
        );
    }

    #[test]
    fn test_override_beats_default() {
        let settings = Settings::new(json!({
            "RETURN_FORMAT": "form",
            "DEFAULT_STATUS_BASE_ANONYMOUS": {"ALL": 401},
        }))
        .unwrap();
        assert_eq!(settings.return_format().unwrap(), ReturnFormat::Form);
        let table = settings
            .status_table(SettingKey::StatusBaseAnonymous)
            .unwrap();
        assert_eq!(table.entry(Method::Get), Some(StatusCode::UNAUTHORIZED));
    }

    #[test]
    fn test_per_call_override_is_not_cached() {
        let settings = Settings::new(Value::Null).unwrap();
        let value = settings
            .resolve(SettingKey::ReturnFormat, Some(&json!("form")))
            .unwrap();
        assert!(matches!(value, SettingValue::Format(ReturnFormat::Form)));
        // The cached path still sees the default.
        assert_eq!(settings.return_format().unwrap(), ReturnFormat::Json);
    }

    #[test]
    fn test_status_table_rejects_non_table_keys() {
        let settings = Settings::new(Value::Null).unwrap();
        let err = settings.status_table(SettingKey::ReturnFormat).unwrap_err();
        assert!(err.to_string().contains("not a status table"));
    }

    #[test]
    fn test_unknown_setting_fails_on_request() {
        let settings = Settings::new(json!({"NOT_A_SETTING": 1})).unwrap();
        let err = settings.get("NOT_A_SETTING").unwrap_err();
        assert!(matches!(err, ConfigError::UnknownSetting { .. }));
    }

    #[test]
    fn test_removed_setting_fails_at_construction() {
        let err = Settings::new(json!({"DEFAULT_STATUS_ANONYMOUS": {"ALL": 403}})).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("DEFAULT_STATUS_ANONYMOUS"));
        assert!(msg.contains("removed"));
    }

    #[test]
    fn test_non_object_namespace_is_rejected() {
        let err = Settings::new(json!(["RETURN_FORMAT"])).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { .. }));
    }

    #[test]
    fn test_user_factory_string_resolves_through_registry() {
        crate::users::register_user_factory("tests.users.staff", || {
            crate::users::TestUser::new("staff")
        });
        let settings = Settings::new(json!({"USER_FACTORY": "tests.users.staff"})).unwrap();
        let factory = settings.user_factory().unwrap();
        assert_eq!(factory().username, "staff");
    }

    #[test]
    fn test_user_factory_sequence_resolves_in_order() {
        crate::users::register_user_factory("tests.users.first", || {
            crate::users::TestUser::new("first")
        });
        crate::users::register_user_factory("tests.users.second", || {
            crate::users::TestUser::new("second")
        });
        let settings = Settings::new(json!({
            "USER_FACTORY": ["tests.users.first", "tests.users.second"],
        }))
        .unwrap();
        let factories = settings.user_factories().unwrap();
        assert_eq!(factories.len(), 2);
        assert_eq!(factories[0]().username, "first");
        assert_eq!(factories[1]().username, "second");
    }

    #[test]
    fn test_unresolved_factory_path_names_key_and_path() {
        let settings = Settings::new(json!({"USER_FACTORY": "missing.factory"})).unwrap();
        let err = settings.user_factory().err().unwrap();
        let msg = err.to_string();
        assert!(msg.contains("USER_FACTORY"));
        assert!(msg.contains("missing.factory"));
    }

    #[test]
    fn test_resolution_is_memoized_per_instance() {
        // Re-registering the factory after first resolution must not change
        // the cached value.
        crate::users::register_user_factory("tests.users.memo", || {
            crate::users::TestUser::new("before")
        });
        let settings = Settings::new(json!({"USER_FACTORY": "tests.users.memo"})).unwrap();
        assert_eq!(settings.user_factory().unwrap()().username, "before");

        crate::users::register_user_factory("tests.users.memo", || {
            crate::users::TestUser::new("after")
        });
        assert_eq!(settings.user_factory().unwrap()().username, "before");
    }
}
