//! # converge-sync
//!
//! Converges a remote workspace to its declaration and upgrades persisted
//! snapshots to the current schema.
//!
//! Call [`reconcile`] to converge one workspace, or [`load_and_migrate`] to
//! bring a stored snapshot up to [`converge_core::CURRENT_VERSION`].
//!
//! - [`reader`] — remote state reader (paged, canonical sets)
//! - [`desired`] — desired state extractor and declaration validation
//! - [`reconcile`](mod@reconcile) — set/scope/singleton diffs and the ordered plan
//! - [`apply`](mod@apply) — fail-fast apply executor
//! - [`migrate`] — the `V0 → … → V4` snapshot pipeline
//! - [`snapshot_store`] — `~/.converge/snapshots/<id>.json`

pub mod apply;
pub mod assemble;
pub mod desired;
pub mod error;
pub mod migrate;
pub mod pipeline;
pub mod reader;
pub mod reconcile;
pub mod snapshot_store;

pub use apply::ActionOutcome;
pub use desired::{DesiredState, DesiredStateExtractor, VcsProviderRef};
pub use error::{SyncError, ValidationError};
pub use migrate::{load_and_migrate, MigrationOutcome};
pub use pipeline::{plan, reconcile, to_snapshot, Planned, ReconcileOptions, ReconcileOutcome};
pub use reader::{RemoteObjectState, RemoteStateReader};
pub use reconcile::{
    diff_scope, diff_sets, Action, ReconciliationDelta, ScopeDelta, SingletonAction,
    WorkspacePlan,
};
pub use snapshot_store::WriteResult;
