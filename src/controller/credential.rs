//! Credential Controller
//!
//! Lifecycle operations for stored TPP credentials. All rotation happens on
//! read; update is a no-op and delete revokes before forgetting the state.

use std::sync::Arc;
use tracing::instrument;

use crate::auth::TokenAuthenticator;
use crate::controller::rotation::{decide_rotation, Observation, RotationPlan, RotationReason};
use crate::controller::store::{load_required, CredentialStore};
use crate::core::{import_state, to_import_string};
use crate::error::{ConfigurationError, StorageError, TppError, TppResult};
use crate::types::CredentialState;

/// Credential lifecycle controller.
pub struct CredentialController<A: TokenAuthenticator, S: CredentialStore> {
    authenticator: Arc<A>,
    store: Arc<S>,
}

impl<A: TokenAuthenticator, S: CredentialStore> CredentialController<A, S> {
    /// Create new controller.
    pub fn new(authenticator: Arc<A>, store: Arc<S>) -> Self {
        Self {
            authenticator,
            store,
        }
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// Credentials can only be imported.
    pub fn create(&self) -> TppResult<CredentialState> {
        Err(TppError::Configuration(ConfigurationError::CreateRejected))
    }

    /// Import a credential from its `key=value,...` import string.
    #[instrument(skip_all, fields(id = %id))]
    pub async fn import(&self, id: &str, raw: &str) -> TppResult<CredentialState> {
        if self.store.load(id).await?.is_some() {
            return Err(TppError::Storage(StorageError::AlreadyExists {
                id: id.to_string(),
            }));
        }

        let state = import_state(raw)?;
        self.store.save(id, state.clone()).await?;

        tracing::info!(
            has_access_token = state.has_access_token(),
            refresh_window = state.refresh_window,
            "credential imported"
        );
        Ok(state)
    }

    /// Decide whether a state needs rotation.
    ///
    /// A missing access token needs rotation without any network call.
    pub async fn observe(&self, state: CredentialState) -> Observation {
        if !state.has_access_token() {
            return Observation::new(state, RotationReason::MissingAccessToken);
        }

        let expired = self.authenticator.verify_expired(&state).await;
        let reason = if expired {
            RotationReason::Expired
        } else if decide_rotation(false, state.expiration_date, state.refresh_window) {
            RotationReason::WithinRefreshWindow
        } else {
            RotationReason::Valid
        };

        Observation::new(state, reason)
    }

    /// Read a credential, rotating and persisting its token pair when needed.
    #[instrument(skip_all, fields(id = %id))]
    pub async fn read(&self, id: &str) -> TppResult<CredentialState> {
        let state = load_required(self.store.as_ref(), id).await?;
        let observation = self.observe(state).await;

        if !observation.needs_rotation {
            tracing::debug!("token pair is valid");
            return Ok(observation.state);
        }

        tracing::info!(reason = %observation.reason, "rotating token pair");
        self.rotate_and_save(id, &observation.state).await
    }

    /// Plan-time view: what a read would change. Never mutates state.
    #[instrument(skip_all, fields(id = %id))]
    pub async fn plan(&self, id: &str) -> TppResult<RotationPlan> {
        let state = load_required(self.store.as_ref(), id).await?;
        let plan = RotationPlan::from_observation(&self.observe(state).await);

        tracing::debug!(
            needs_rotation = plan.needs_rotation,
            reason = %plan.reason,
            "rotation planned"
        );
        Ok(plan)
    }

    /// Rotate the token pair unconditionally.
    #[instrument(skip_all, fields(id = %id))]
    pub async fn rotate(&self, id: &str) -> TppResult<CredentialState> {
        let state = load_required(self.store.as_ref(), id).await?;
        self.rotate_and_save(id, &state).await
    }

    /// Update is a no-op; the stored state is returned unchanged.
    pub async fn update(&self, id: &str) -> TppResult<CredentialState> {
        load_required(self.store.as_ref(), id).await
    }

    /// Revoke the access token, then forget the credential.
    ///
    /// A failed revocation leaves the stored state in place.
    #[instrument(skip_all, fields(id = %id))]
    pub async fn delete(&self, id: &str) -> TppResult<()> {
        let state = load_required(self.store.as_ref(), id).await?;

        if let Err(e) = self.authenticator.revoke(&state).await {
            tracing::error!(
                error = %e,
                cause = %cause_of(&e),
                error_code = e.error_code(),
                "revocation failed"
            );
            return Err(e);
        }

        self.store.remove(id).await?;
        tracing::info!("credential removed");
        Ok(())
    }

    /// Render a stored credential back into its import string.
    pub async fn export(&self, id: &str) -> TppResult<String> {
        let state = load_required(self.store.as_ref(), id).await?;
        Ok(to_import_string(&state))
    }

    async fn rotate_and_save(&self, id: &str, state: &CredentialState) -> TppResult<CredentialState> {
        let pair = self.authenticator.rotate(state).await.map_err(|e| {
            tracing::error!(
                error = %e,
                cause = %cause_of(&e),
                error_code = e.error_code(),
                "rotation failed"
            );
            e
        })?;

        let rotated = state.with_rotation(pair);
        self.store.save(id, rotated.clone()).await?;

        tracing::info!(expiration = rotated.expiration_date, "token pair rotated");
        Ok(rotated)
    }
}

fn cause_of(error: &TppError) -> String {
    std::error::Error::source(error)
        .map(ToString::to_string)
        .unwrap_or_default()
}
