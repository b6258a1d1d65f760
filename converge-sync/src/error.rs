//! Error types for converge-sync.

use std::path::PathBuf;

use thiserror::Error;

use converge_core::{CoreError, ExecutionMode, WorkspaceId};
use converge_remote::RemoteError;

/// A declaration that cannot be reconciled as written.
///
/// Raised by the desired-state extractor before any remote call; retrying
/// without changing the declaration cannot succeed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{field}: \"*\" must be the only entry when sharing with every workspace")]
    WildcardMixed { field: &'static str },

    #[error("{field}: ids must not be empty")]
    EmptyId { field: &'static str },

    #[error("{first} and {second} cannot both be set")]
    Conflict {
        first: &'static str,
        second: &'static str,
    },

    #[error("vcs_repo requires vcs_provider_id or vcs_provider_name")]
    RepoWithoutProvider,

    #[error("a VCS provider is set but vcs_repo is missing")]
    ProviderWithoutRepo,

    #[error("operations = {operations} contradicts execution_mode = {execution_mode}")]
    ExecutionModeConflict {
        operations: bool,
        execution_mode: ExecutionMode,
    },

    #[error("no account_id declared and no default account configured")]
    MissingAccount,
}

/// All errors that can arise from reconciliation and migration.
#[derive(Debug, Error)]
pub enum SyncError {
    /// The workspace no longer exists on the remote.
    #[error("workspace {workspace} not found on the remote")]
    NotFound { workspace: WorkspaceId },

    #[error("invalid declaration: {0}")]
    Validation(#[from] ValidationError),

    /// A read failed; `field` names the collection (or `workspace`).
    #[error("reading {field} failed: {source}")]
    RemoteRead {
        field: &'static str,
        #[source]
        source: RemoteError,
    },

    /// A mutating call failed; `item` is the identity key when per-item.
    #[error("writing {field}{} failed: {source}", .item.as_deref().map(|i| format!(" ({i})")).unwrap_or_default())]
    RemoteWrite {
        field: &'static str,
        item: Option<String>,
        #[source]
        source: RemoteError,
    },

    /// A migration step could not read the remote state it needs.
    #[error("migrating snapshot from version {from} to {to} failed: {source}")]
    Migration {
        from: u32,
        to: u32,
        #[source]
        source: Box<SyncError>,
    },

    /// The declared change cannot be made in place.
    #[error("changing {field} requires replacing the workspace")]
    ReplaceRequired { field: &'static str },

    /// Looking up a VCS provider by name did not yield exactly one match.
    #[error("VCS provider {name:?}: {reason}")]
    VcsProvider { name: String, reason: String },

    #[error(transparent)]
    Core(#[from] CoreError),

    /// An I/O error, with annotated path for context.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A workspace id that cannot name a file inside the snapshot store.
    #[error("workspace id {id:?} cannot be used as a snapshot file name")]
    InvalidWorkspaceId { id: String },

    /// JSON serialization/deserialization error (snapshot store).
    #[error("snapshot store JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl SyncError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, SyncError::NotFound { .. })
    }

    /// Wrap a read failure, keeping not-found distinct.
    pub(crate) fn read(workspace: &WorkspaceId, field: &'static str, source: RemoteError) -> Self {
        if source.is_not_found() {
            SyncError::NotFound {
                workspace: workspace.clone(),
            }
        } else {
            SyncError::RemoteRead { field, source }
        }
    }
}

/// Convenience constructor for [`SyncError::Io`].
pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> SyncError {
    SyncError::Io {
        path: path.into(),
        source,
    }
}
