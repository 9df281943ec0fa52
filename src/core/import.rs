//! Import String Codec
//!
//! Credential state is only ever created from a flat `key=value,key=value`
//! import string. Values cannot contain `,` and keys cannot contain `=`;
//! there is no escaping.

use secrecy::{ExposeSecret, SecretString};
use std::collections::BTreeMap;

use crate::error::{ConfigurationError, TppError, TppResult};
use crate::types::{CredentialState, DEFAULT_CLIENT_ID, DEFAULT_REFRESH_WINDOW_DAYS};

pub const FIELD_URL: &str = "url";
pub const FIELD_USERNAME: &str = "username";
pub const FIELD_PASSWORD: &str = "password";
pub const FIELD_P12_CERT: &str = "p12_cert_filename";
pub const FIELD_P12_PASSWORD: &str = "p12_cert_password";
pub const FIELD_ACCESS_TOKEN: &str = "access_token";
pub const FIELD_REFRESH_TOKEN: &str = "refresh_token";
pub const FIELD_CLIENT_ID: &str = "client_id";
pub const FIELD_EXPIRATION: &str = "expiration";
pub const FIELD_TRUST_BUNDLE: &str = "trust_bundle";
pub const FIELD_REFRESH_WINDOW: &str = "refresh_window";

/// Every key understood by `apply_defaults`.
pub const RECOGNIZED_FIELDS: [&str; 11] = [
    FIELD_URL,
    FIELD_USERNAME,
    FIELD_PASSWORD,
    FIELD_P12_CERT,
    FIELD_P12_PASSWORD,
    FIELD_ACCESS_TOKEN,
    FIELD_REFRESH_TOKEN,
    FIELD_CLIENT_ID,
    FIELD_EXPIRATION,
    FIELD_TRUST_BUNDLE,
    FIELD_REFRESH_WINDOW,
];

/// Split an import string into its key/value map.
///
/// Each entry is split on its first `=`. Unknown keys are kept; later
/// duplicates overwrite earlier ones.
pub fn parse_import_key(raw: &str) -> TppResult<BTreeMap<String, String>> {
    let mut values = BTreeMap::new();

    for entry in raw.split(',') {
        let (key, value) = entry
            .split_once('=')
            .ok_or_else(|| TppError::MalformedImportString {
                entry: entry.to_string(),
            })?;
        tracing::debug!(field = key, "credential field found");
        values.insert(key.to_string(), value.to_string());
    }

    Ok(values)
}

/// Build credential state from an import map, filling in defaults.
pub fn apply_defaults(values: &BTreeMap<String, String>) -> TppResult<CredentialState> {
    let text = |key: &str| values.get(key).cloned();
    let secret = |key: &str| values.get(key).map(|v| SecretString::new(v.clone()));

    let url = text(FIELD_URL).ok_or_else(|| {
        TppError::Configuration(ConfigurationError::MissingRequired {
            field: FIELD_URL.to_string(),
        })
    })?;

    let refresh_window = match values.get(FIELD_REFRESH_WINDOW) {
        Some(raw) => raw
            .trim()
            .parse::<i64>()
            .map_err(|_| TppError::InvalidRefreshWindow { value: raw.clone() })?,
        None => DEFAULT_REFRESH_WINDOW_DAYS,
    };

    let expiration_date = match values.get(FIELD_EXPIRATION) {
        Some(raw) => Some(raw.trim().parse::<i64>().map_err(|_| {
            TppError::Configuration(ConfigurationError::InvalidConfig {
                message: format!("{} must be a Unix timestamp, got: {}", FIELD_EXPIRATION, raw),
            })
        })?),
        None => None,
    };

    let unknown: Vec<&str> = values
        .keys()
        .map(String::as_str)
        .filter(|k| !RECOGNIZED_FIELDS.contains(k))
        .collect();
    if !unknown.is_empty() {
        tracing::debug!(fields = ?unknown, "ignoring unrecognized import fields");
    }

    Ok(CredentialState {
        url,
        username: text(FIELD_USERNAME),
        password: secret(FIELD_PASSWORD),
        p12_certificate: text(FIELD_P12_CERT),
        p12_password: secret(FIELD_P12_PASSWORD),
        access_token: secret(FIELD_ACCESS_TOKEN),
        refresh_token: secret(FIELD_REFRESH_TOKEN),
        client_id: text(FIELD_CLIENT_ID).unwrap_or_else(|| DEFAULT_CLIENT_ID.to_string()),
        expiration_date,
        trust_bundle: text(FIELD_TRUST_BUNDLE),
        refresh_window,
    })
}

/// Parse an import string straight into credential state.
pub fn import_state(raw: &str) -> TppResult<CredentialState> {
    apply_defaults(&parse_import_key(raw)?)
}

/// Render credential state back into its import map.
pub fn to_import_map(state: &CredentialState) -> BTreeMap<String, String> {
    let mut values = BTreeMap::new();
    let mut put = |key: &str, value: Option<String>| {
        if let Some(value) = value {
            values.insert(key.to_string(), value);
        }
    };
    let expose = |secret: &Option<SecretString>| secret.as_ref().map(|s| s.expose_secret().clone());

    put(FIELD_URL, Some(state.url.clone()));
    put(FIELD_USERNAME, state.username.clone());
    put(FIELD_PASSWORD, expose(&state.password));
    put(FIELD_P12_CERT, state.p12_certificate.clone());
    put(FIELD_P12_PASSWORD, expose(&state.p12_password));
    put(FIELD_ACCESS_TOKEN, expose(&state.access_token));
    put(FIELD_REFRESH_TOKEN, expose(&state.refresh_token));
    put(FIELD_CLIENT_ID, Some(state.client_id.clone()));
    put(FIELD_EXPIRATION, state.expiration_date.map(|e| e.to_string()));
    put(FIELD_TRUST_BUNDLE, state.trust_bundle.clone());
    put(FIELD_REFRESH_WINDOW, Some(state.refresh_window.to_string()));

    values
}

/// Render credential state as an import string.
pub fn to_import_string(state: &CredentialState) -> String {
    to_import_map(state)
        .into_iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect::<Vec<_>>()
        .join(",")
}
