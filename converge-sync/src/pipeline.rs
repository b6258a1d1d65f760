//! Reconcile entry points used by the CLI.
//!
//! `extract → read → plan → apply → re-read`. The declaration is validated
//! before any remote call; the remote is always read fresh.

use chrono::{DateTime, Utc};

use converge_core::{
    DeclaredConfiguration, PersistedSnapshot, WorkspaceId, WorkspaceModel, WorkspaceSnapshot,
};
use converge_remote::RemoteApi;

use crate::apply::{apply, ActionOutcome};
use crate::assemble::workspace_model;
use crate::desired::{DesiredState, DesiredStateExtractor, VcsProviderRef};
use crate::error::SyncError;
use crate::reader::{RemoteObjectState, RemoteStateReader, DEFAULT_PAGE_SIZE};
use crate::reconcile::{self, WorkspacePlan};

/// Options for a reconcile run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconcileOptions {
    pub dry_run: bool,
    pub page_size: u32,
}

impl Default for ReconcileOptions {
    fn default() -> Self {
        Self {
            dry_run: false,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

/// A computed plan together with the states it was computed from.
#[derive(Debug, Clone)]
pub struct Planned {
    pub desired: DesiredState,
    pub actual: RemoteObjectState,
    pub plan: WorkspacePlan,
}

/// Result of [`reconcile`].
#[derive(Debug, Clone)]
pub struct ReconcileOutcome {
    pub plan: WorkspacePlan,
    pub outcomes: Vec<ActionOutcome>,
    /// The converged model, read back after applying. `None` in dry-run.
    pub model: Option<WorkspaceModel>,
}

/// Validate the declaration, read the workspace, and compute the plan.
///
/// A VCS provider declared by name is resolved here.
pub fn plan<A: RemoteApi + ?Sized>(
    api: &A,
    extractor: &DesiredStateExtractor,
    declared: &DeclaredConfiguration,
    id: &WorkspaceId,
    page_size: u32,
) -> Result<Planned, SyncError> {
    let mut desired = extractor.extract(declared)?;
    let reader = RemoteStateReader::new(api).with_page_size(page_size);
    let actual = reader.read(id)?;
    if let Some(VcsProviderRef::Name(name)) = &desired.vcs_provider {
        let resolved = reader.resolve_vcs_provider(name, &desired.account_id)?;
        tracing::debug!("VCS provider {name:?} resolved to {resolved}");
        desired.vcs_provider = Some(VcsProviderRef::Id(resolved));
    }
    let plan = reconcile::plan(&desired, &actual)?;
    Ok(Planned {
        desired,
        actual,
        plan,
    })
}

/// Converge workspace `id` to `declared`.
///
/// Returns [`SyncError::NotFound`] when the workspace is gone so the caller
/// can treat the declaration as orphaned.
pub fn reconcile<A: RemoteApi + ?Sized>(
    api: &A,
    extractor: &DesiredStateExtractor,
    declared: &DeclaredConfiguration,
    id: &WorkspaceId,
    options: ReconcileOptions,
) -> Result<ReconcileOutcome, SyncError> {
    let Planned {
        desired,
        actual,
        plan,
    } = plan(api, extractor, declared, id, options.page_size)?;
    let had_hooks = desired.hooks.is_some();

    if plan.is_empty() {
        tracing::info!("{id}: already converged");
    }
    let outcomes = apply(api, &plan, options.dry_run)?;

    let model = if options.dry_run {
        None
    } else if plan.is_empty() {
        Some(workspace_model(&actual, had_hooks))
    } else {
        let reader = RemoteStateReader::new(api).with_page_size(options.page_size);
        Some(workspace_model(&reader.read(id)?, had_hooks))
    };
    Ok(ReconcileOutcome {
        plan,
        outcomes,
        model,
    })
}

/// Wrap a model into the current-version snapshot envelope.
pub fn to_snapshot(
    model: &WorkspaceModel,
    applied_at: DateTime<Utc>,
) -> Result<PersistedSnapshot, SyncError> {
    Ok(WorkspaceSnapshot::V4(model.clone()).encode(Some(applied_at))?)
}
