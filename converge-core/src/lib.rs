//! Converge core library — domain types, versioned snapshots, declarations,
//! settings, errors.
//!
//! - [`types`] — identifiers, linked-collection items, share scopes
//! - [`model`] — the current workspace model and the remote workspace record
//! - [`snapshot`] — per-version snapshot structs and the persisted envelope
//! - [`declared`] — user-authored workspace declarations
//! - [`settings`] — `~/.converge/config.yaml`
//! - [`error`] — [`CoreError`]

pub mod declared;
pub mod error;
pub mod model;
pub mod settings;
pub mod snapshot;
pub mod types;

pub use declared::{DeclaredConfiguration, DeclaredProviderConfiguration};
pub use error::CoreError;
pub use model::{
    AutoQueueRuns, EnvironmentType, ExecutionMode, Hooks, IacPlatform, ProviderConfigurationLink,
    RemoteWorkspace, Terragrunt, User, VcsRepo, WorkspaceModel,
};
pub use settings::Settings;
pub use snapshot::{PersistedSnapshot, WorkspaceSnapshot, CURRENT_VERSION};
pub use types::{AccountId, IdentityKey, LinkedItem, ShareScope, WorkspaceId, WILDCARD};
