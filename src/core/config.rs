/// Connection Configuration
///
/// Configuration arrives as a raw JSON object (from the environment, or from
/// HTTP query parameters) and is validated once per connection into an
/// immutable [`Config`]. Every configuration source goes through
/// [`Config::validate`] so the rules live in one place.
///
/// Raw keys:
/// - gitlabApiUrl: GitLab API base URL (optional, default: "https://gitlab.com/api/v4")
/// - gitlabPersonalAccessToken: personal access token (required, non-empty)

use serde_json::{Map, Value};
use std::collections::HashMap;
use std::fmt;

use crate::core::error::{ConfigValidationError, FieldIssue};
use crate::core::utils;

pub const DEFAULT_API_URL: &str = "https://gitlab.com/api/v4";

pub const API_URL_KEY: &str = "gitlabApiUrl";
pub const TOKEN_KEY: &str = "gitlabPersonalAccessToken";

/// Environment variables feeding the raw configuration keys.
pub const API_URL_ENV: &str = "GITLAB_API_URL";
pub const TOKEN_ENV: &str = "GITLAB_PERSONAL_ACCESS_TOKEN";

/// Validated, immutable configuration for one connection.
///
/// Shared read-only with tool handlers, typically behind an `Arc`.
#[derive(Clone, PartialEq, Eq)]
pub struct Config {
    api_base_url: String,
    access_token: String,
}

// The token is a secret; keep it out of logs and panics.
impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("api_base_url", &self.api_base_url)
            .field("access_token", &"<redacted>")
            .finish()
    }
}

impl Config {
    /// Validate a raw configuration object.
    ///
    /// Fails when the token is missing or empty, when a supplied API URL is
    /// empty, or when either value is not a string. A missing (or `null`) API
    /// URL falls back to [`DEFAULT_API_URL`]. All failing fields are reported.
    pub fn validate(raw: &Value) -> Result<Config, ConfigValidationError> {
        let Some(object) = raw.as_object() else {
            return Err(ConfigValidationError {
                issues: vec![FieldIssue::new(TOKEN_KEY, "missing")],
            });
        };

        let mut issues = Vec::new();

        let api_base_url = match non_empty_string(object, API_URL_KEY) {
            Ok(Some(url)) => url,
            Ok(None) => DEFAULT_API_URL.to_string(),
            Err(issue) => {
                issues.push(issue);
                String::new()
            }
        };

        let access_token = match non_empty_string(object, TOKEN_KEY) {
            Ok(Some(token)) => token,
            Ok(None) => {
                issues.push(FieldIssue::new(TOKEN_KEY, "missing"));
                String::new()
            }
            Err(issue) => {
                issues.push(issue);
                String::new()
            }
        };

        if !issues.is_empty() {
            return Err(ConfigValidationError { issues });
        }

        Ok(Config {
            api_base_url,
            access_token,
        })
    }

    /// Validate the configuration supplied through the process environment.
    pub fn from_env() -> Result<Config, ConfigValidationError> {
        Self::validate(&raw_from_env())
    }

    pub fn api_base_url(&self) -> &str {
        &self.api_base_url
    }

    pub fn access_token(&self) -> &str {
        &self.access_token
    }
}

/// Read `key` as a non-empty string. `Ok(None)` means absent or `null`.
fn non_empty_string(object: &Map<String, Value>, key: &'static str) -> Result<Option<String>, FieldIssue> {
    match object.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) if s.is_empty() => Err(FieldIssue::new(key, "must not be empty")),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(_) => Err(FieldIssue::new(key, "expected string")),
    }
}

/// Assemble the raw configuration object from environment variables.
///
/// Unset variables are left out so the validator applies its defaults.
pub fn raw_from_env() -> Value {
    raw_from_lookup(utils::env_var)
}

/// Assemble the raw configuration object using an arbitrary variable lookup.
pub fn raw_from_lookup<F>(lookup: F) -> Value
where
    F: Fn(&str) -> Option<String>,
{
    let mut raw = Map::new();
    for (env_key, config_key) in [(API_URL_ENV, API_URL_KEY), (TOKEN_ENV, TOKEN_KEY)] {
        if let Some(value) = lookup(env_key) {
            raw.insert(config_key.to_string(), Value::String(value));
        }
    }
    Value::Object(raw)
}

/// Overlay connection-supplied values (e.g. HTTP query parameters) on top of
/// a raw configuration object. Only known configuration keys are copied.
pub fn with_overrides(mut raw: Value, params: &HashMap<String, String>) -> Value {
    if !raw.is_object() {
        raw = Value::Object(Map::new());
    }
    if let Value::Object(object) = &mut raw {
        for key in [API_URL_KEY, TOKEN_KEY] {
            if let Some(value) = params.get(key) {
                object.insert(key.to_string(), Value::String(value.clone()));
            }
        }
    }
    raw
}
