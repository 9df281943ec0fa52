//! Credential Store
//!
//! Persisted credential state keyed by resource id.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;

use crate::error::{StorageError, TppError, TppResult};
use crate::types::CredentialState;

/// Credential store interface.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Load the state for `id`.
    async fn load(&self, id: &str) -> TppResult<Option<CredentialState>>;

    /// Save the state for `id`, replacing any previous state.
    async fn save(&self, id: &str, state: CredentialState) -> TppResult<()>;

    /// Remove the state for `id`. Returns whether anything was removed.
    async fn remove(&self, id: &str) -> TppResult<bool>;

    /// List stored resource ids.
    async fn list_ids(&self) -> TppResult<Vec<String>>;
}

/// Load the state for `id`, failing when it is absent.
pub async fn load_required<S: CredentialStore + ?Sized>(
    store: &S,
    id: &str,
) -> TppResult<CredentialState> {
    store.load(id).await?.ok_or_else(|| {
        TppError::Storage(StorageError::NotFound { id: id.to_string() })
    })
}

/// In-memory credential store implementation.
pub struct InMemoryCredentialStore {
    states: Mutex<HashMap<String, CredentialState>>,
}

impl InMemoryCredentialStore {
    /// Create new in-memory credential store.
    pub fn new() -> Self {
        Self {
            states: Mutex::new(HashMap::new()),
        }
    }

    /// Number of stored credentials.
    pub fn len(&self) -> usize {
        self.states.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for InMemoryCredentialStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CredentialStore for InMemoryCredentialStore {
    async fn load(&self, id: &str) -> TppResult<Option<CredentialState>> {
        let states = self.states.lock().unwrap_or_else(|e| e.into_inner());
        Ok(states.get(id).cloned())
    }

    async fn save(&self, id: &str, state: CredentialState) -> TppResult<()> {
        self.states
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(id.to_string(), state);
        Ok(())
    }

    async fn remove(&self, id: &str) -> TppResult<bool> {
        Ok(self
            .states
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(id)
            .is_some())
    }

    async fn list_ids(&self) -> TppResult<Vec<String>> {
        let states = self.states.lock().unwrap_or_else(|e| e.into_inner());
        let mut ids: Vec<String> = states.keys().cloned().collect();
        ids.sort();
        Ok(ids)
    }
}
