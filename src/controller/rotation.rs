//! Rotation Decision
//!
//! When a credential's token pair has to be replaced, and what a planned
//! rotation will change.

use crate::types::CredentialState;

const SECONDS_PER_DAY: i64 = 86_400;

/// Attributes whose values become unknown when a rotation is planned.
pub const ROTATED_ATTRIBUTES: [&str; 3] = [
    crate::core::import::FIELD_ACCESS_TOKEN,
    crate::core::import::FIELD_REFRESH_TOKEN,
    crate::core::import::FIELD_EXPIRATION,
];

/// Decide whether a token must be rotated, using the current time.
pub fn decide_rotation(expired: bool, expiration_date: Option<i64>, refresh_window_days: i64) -> bool {
    decide_rotation_at(
        expired,
        expiration_date,
        refresh_window_days,
        chrono::Utc::now().timestamp(),
    )
}

/// Decide whether a token must be rotated at `now` (Unix seconds).
///
/// True when the server reported the token expired, or when
/// `expiration_date < now - refresh_window_days * 86400`. An absent
/// expiration date counts as zero.
///
/// With a positive window this threshold lies in the past, so the window
/// alone never triggers rotation before expiry; a token is rotated ahead of
/// time only when server-side verification fails. Keep the comparison as is.
pub fn decide_rotation_at(
    expired: bool,
    expiration_date: Option<i64>,
    refresh_window_days: i64,
    now: i64,
) -> bool {
    if expired {
        return true;
    }
    let threshold = now.saturating_sub(refresh_window_days.saturating_mul(SECONDS_PER_DAY));
    expiration_date.unwrap_or(0) < threshold
}

/// Why an observation did or did not call for rotation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RotationReason {
    /// No access token is stored.
    MissingAccessToken,
    /// The server did not accept the access token.
    Expired,
    /// The expiration date crossed the refresh window threshold.
    WithinRefreshWindow,
    /// No rotation needed.
    Valid,
}

impl RotationReason {
    pub fn needs_rotation(&self) -> bool {
        !matches!(self, Self::Valid)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MissingAccessToken => "missing_access_token",
            Self::Expired => "expired",
            Self::WithinRefreshWindow => "within_refresh_window",
            Self::Valid => "valid",
        }
    }
}

impl std::fmt::Display for RotationReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of observing a credential.
#[derive(Clone, Debug)]
pub struct Observation {
    pub state: CredentialState,
    pub needs_rotation: bool,
    pub reason: RotationReason,
}

impl Observation {
    pub(crate) fn new(state: CredentialState, reason: RotationReason) -> Self {
        Self {
            state,
            needs_rotation: reason.needs_rotation(),
            reason,
        }
    }
}

/// Plan-time view of a pending rotation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RotationPlan {
    pub needs_rotation: bool,
    pub reason: RotationReason,
    /// Attributes that will only be known once the rotation runs.
    pub unknown_attributes: Vec<&'static str>,
}

impl RotationPlan {
    pub fn from_observation(observation: &Observation) -> Self {
        let unknown_attributes = if observation.needs_rotation {
            ROTATED_ATTRIBUTES.to_vec()
        } else {
            Vec::new()
        };

        Self {
            needs_rotation: observation.needs_rotation,
            reason: observation.reason,
            unknown_attributes,
        }
    }

    /// Human readable plan. Sensitive values are never shown.
    pub fn summary(&self) -> String {
        if !self.needs_rotation {
            return "No changes. Token pair is valid.".to_string();
        }

        let mut lines = vec![format!("Token pair will be rotated ({})", self.reason)];
        for attribute in &self.unknown_attributes {
            let value = if CredentialState::SENSITIVE_FIELDS.contains(attribute) {
                "(sensitive value)"
            } else {
                "(known after apply)"
            };
            lines.push(format!("  ~ {} = {}", attribute, value));
        }
        lines.join("\n")
    }
}
