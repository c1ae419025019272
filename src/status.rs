//! HTTP methods and status expectation tables.
//!
//! A [`StatusTable`] maps each HTTP method an endpoint supports to the status
//! code a request is expected to produce, with an `ALL` wildcard fallback for
//! every method not listed individually. Resolution always yields exactly one
//! code per (table, method) pair or fails with a configuration error.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use http::StatusCode;
use serde_json::Value;

use crate::error::ConfigError;

/// The HTTP methods the kit issues checks for.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Method {
    /// HTTP GET.
    Get,
    /// HTTP POST.
    Post,
    /// HTTP PUT.
    Put,
    /// HTTP PATCH.
    Patch,
    /// HTTP DELETE.
    Delete,
}

impl Method {
    /// All methods, in the order tables are rendered and checks are run.
    pub const ALL: [Method; 5] = [
        Method::Get,
        Method::Post,
        Method::Put,
        Method::Patch,
        Method::Delete,
    ];

    /// The uppercase token used in tables and messages.
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Patch => "PATCH",
            Method::Delete => "DELETE",
        }
    }

    /// The equivalent `http` crate method.
    pub fn to_http(self) -> http::Method {
        match self {
            Method::Get => http::Method::GET,
            Method::Post => http::Method::POST,
            Method::Put => http::Method::PUT,
            Method::Patch => http::Method::PATCH,
            Method::Delete => http::Method::DELETE,
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Method {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "GET" => Ok(Method::Get),
            "POST" => Ok(Method::Post),
            "PUT" => Ok(Method::Put),
            "PATCH" => Ok(Method::Patch),
            "DELETE" => Ok(Method::Delete),
            other => Err(format!("unrecognized HTTP method token '{other}'")),
        }
    }
}

/// Token for the wildcard entry in table configuration.
const ALL_TOKEN: &str = "ALL";

/// Per-method expected status codes with an `ALL` wildcard fallback.
///
/// # Example
///
/// ```rust
/// use api_testkit::{Method, StatusTable};
/// use http::StatusCode;
///
/// let table = StatusTable::all(StatusCode::METHOD_NOT_ALLOWED)
///     .with(Method::Get, StatusCode::OK);
///
/// assert_eq!(table.entry(Method::Get), Some(StatusCode::OK));
/// assert_eq!(table.entry(Method::Delete), Some(StatusCode::METHOD_NOT_ALLOWED));
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct StatusTable {
    entries: HashMap<Method, StatusCode>,
    fallback: Option<StatusCode>,
}

impl StatusTable {
    /// Creates an empty table. Lookups against it always fail; useful only as
    /// a base for [`with`](Self::with).
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a table whose wildcard entry covers every method.
    pub fn all(code: StatusCode) -> Self {
        Self {
            entries: HashMap::new(),
            fallback: Some(code),
        }
    }

    /// Adds or replaces a method-specific entry.
    pub fn with(mut self, method: Method, code: StatusCode) -> Self {
        self.entries.insert(method, code);
        self
    }

    /// Looks up the expected code for a method: the method-specific entry if
    /// present, else the `ALL` wildcard.
    pub fn entry(&self, method: Method) -> Option<StatusCode> {
        self.entries.get(&method).copied().or(self.fallback)
    }

    /// Parses the host-configuration shape, e.g. `{"ALL": 403, "GET": 200}`.
    ///
    /// `key` names the setting being parsed and is only used in error
    /// messages.
    pub fn from_value(key: &str, value: &Value) -> Result<Self, ConfigError> {
        let map = value.as_object().ok_or_else(|| ConfigError::InvalidValue {
            key: key.to_string(),
            message: format!("expected a method-to-status mapping, got {value}"),
        })?;

        let mut table = StatusTable::new();
        for (token, raw) in map {
            let code = parse_status_code(key, raw)?;
            if token == ALL_TOKEN {
                table.fallback = Some(code);
            } else {
                let method = Method::from_str(token).map_err(|message| {
                    ConfigError::InvalidValue {
                        key: key.to_string(),
                        message,
                    }
                })?;
                table.entries.insert(method, code);
            }
        }
        Ok(table)
    }
}

impl fmt::Display for StatusTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts: Vec<String> = Method::ALL
            .iter()
            .filter_map(|m| {
                self.entries
                    .get(m)
                    .map(|code| format!("{m}: {}", code.as_u16()))
            })
            .collect();
        if let Some(code) = self.fallback {
            parts.push(format!("{ALL_TOKEN}: {}", code.as_u16()));
        }
        write!(f, "{{{}}}", parts.join(", "))
    }
}

fn parse_status_code(key: &str, raw: &Value) -> Result<StatusCode, ConfigError> {
    let invalid = |message: String| ConfigError::InvalidValue {
        key: key.to_string(),
        message,
    };
    let number = raw
        .as_u64()
        .ok_or_else(|| invalid(format!("expected an integer status code, got {raw}")))?;
    let number = u16::try_from(number)
        .map_err(|_| invalid(format!("status code {number} is out of range")))?;
    StatusCode::from_u16(number)
        .map_err(|_| invalid(format!("status code {number} is out of range")))
}

/// Resolves the expected status code for a method against a table.
///
/// Resolution order: the explicit `status_override` if given, then the
/// method-specific entry, then the `ALL` wildcard. A table carrying neither
/// entry for the method is an unrecoverable configuration error.
pub fn expected_status(
    table: &StatusTable,
    method: Method,
    status_override: Option<StatusCode>,
) -> Result<StatusCode, ConfigError> {
    if let Some(code) = status_override {
        return Ok(code);
    }
    table
        .entry(method)
        .ok_or_else(|| ConfigError::MissingStatus {
            table: table.to_string(),
            method,
        })
}
