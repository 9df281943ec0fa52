//! Credential Controller
//!
//! Rotation decisions, the credential store and lifecycle operations.

pub mod credential;
pub mod rotation;
pub mod store;

pub use credential::CredentialController;
pub use rotation::{
    decide_rotation, decide_rotation_at, Observation, RotationPlan, RotationReason,
    ROTATED_ATTRIBUTES,
};
pub use store::{load_required, CredentialStore, InMemoryCredentialStore};
