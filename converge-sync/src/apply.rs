//! Apply executor.
//!
//! Issues a plan's actions in order and stops at the first failure. Calls
//! that already succeeded stay applied; there is no rollback.

use converge_core::WorkspaceId;
use converge_remote::{RemoteApi, RemoteError};

use crate::error::SyncError;
use crate::reconcile::{Action, WorkspacePlan};

/// Result of one action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionOutcome {
    /// The call was issued and succeeded.
    Applied(Action),
    /// Dry run: the call would have been issued.
    WouldApply(Action),
}

impl ActionOutcome {
    pub fn action(&self) -> &Action {
        match self {
            ActionOutcome::Applied(a) | ActionOutcome::WouldApply(a) => a,
        }
    }
}

/// Execute `plan` against the remote, or with `dry_run` only report what
/// would be issued.
pub fn apply<A: RemoteApi + ?Sized>(
    api: &A,
    plan: &WorkspacePlan,
    dry_run: bool,
) -> Result<Vec<ActionOutcome>, SyncError> {
    let id = &plan.workspace_id;
    let mut outcomes = Vec::new();
    for action in plan.actions() {
        if dry_run {
            tracing::info!("[dry-run] {id}: would {action}");
            outcomes.push(ActionOutcome::WouldApply(action));
            continue;
        }
        tracing::info!("{id}: {action}");
        execute(api, id, &action).map_err(|source| write_error(id, &action, source))?;
        outcomes.push(ActionOutcome::Applied(action));
    }
    Ok(outcomes)
}

/// A 404 from a call addressed to the workspace itself means the workspace
/// is gone; a 404 on a single link stays a write failure.
fn write_error(id: &WorkspaceId, action: &Action, source: RemoteError) -> SyncError {
    let workspace_level = matches!(
        action,
        Action::UpdateWorkspace(_)
            | Action::SetShareFlag(_)
            | Action::SetSshKey(_)
            | Action::ClearSshKey
    );
    if workspace_level && source.is_not_found() {
        return SyncError::NotFound {
            workspace: id.clone(),
        };
    }
    SyncError::RemoteWrite {
        field: action.field(),
        item: action.item(),
        source,
    }
}

fn execute<A: RemoteApi + ?Sized>(
    api: &A,
    id: &WorkspaceId,
    action: &Action,
) -> Result<(), RemoteError> {
    match action {
        Action::UpdateWorkspace(patch) => api.update_workspace(id, patch),
        Action::BulkRemove(collection, items) => api.bulk_remove(id, *collection, items),
        Action::Delete(collection, item) => api.delete_link(id, *collection, item),
        Action::ClearSshKey => api.clear_ssh_key(id),
        Action::SetShareFlag(shared) => api.set_share_flag(id, *shared),
        Action::BulkAdd(collection, items) => api.bulk_add(id, *collection, items),
        Action::Create(collection, item) => api.create_link(id, *collection, item),
        Action::SetSshKey(key) => api.set_ssh_key(id, key),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
