//! Schema migration pipeline.
//!
//! A persisted snapshot is decoded by its version, then upgraded one version
//! at a time (`V0 → V1 → V2 → V3 → V4`). Every step re-reads the workspace
//! from the remote and is a pure function of `(old snapshot, remote state)`.
//! Nothing is written here; the caller persists the outcome.

use converge_core::snapshot::{
    is_human_id, SnapshotV0, SnapshotV1, SnapshotV2, SnapshotV3, VcsRepoV1,
};
use converge_core::{
    AutoQueueRuns, ExecutionMode, PersistedSnapshot, ProviderConfigurationLink, VcsRepo,
    WorkspaceId, WorkspaceModel, WorkspaceSnapshot, CURRENT_VERSION,
};
use converge_remote::RemoteApi;

use crate::assemble::{normalise_hooks, workspace_model};
use crate::error::SyncError;
use crate::reader::{RemoteObjectState, RemoteStateReader};

/// What loading a snapshot produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MigrationOutcome {
    /// Already at the current version; no remote call was made.
    Current(WorkspaceModel),
    /// Upgraded. `path` lists every version reached after `from`, in order.
    Migrated {
        from: u32,
        path: Vec<u32>,
        model: WorkspaceModel,
    },
    /// The workspace no longer exists; the snapshot should be cleared.
    Deleted { workspace: WorkspaceId },
}

/// Decode `persisted` and upgrade it to [`CURRENT_VERSION`].
///
/// A remote read failure aborts the whole pipeline with
/// [`SyncError::Migration`]; not-found ends it with
/// [`MigrationOutcome::Deleted`].
pub fn load_and_migrate<A: RemoteApi + ?Sized>(
    api: &A,
    persisted: &PersistedSnapshot,
) -> Result<MigrationOutcome, SyncError> {
    let reader = RemoteStateReader::new(api);
    let mut snapshot = WorkspaceSnapshot::decode(persisted)?;
    let from = snapshot.version();
    let mut path = Vec::new();

    loop {
        let snapshot_version = snapshot.version();
        snapshot = match snapshot {
            WorkspaceSnapshot::V4(model) if path.is_empty() => {
                return Ok(MigrationOutcome::Current(model))
            }
            WorkspaceSnapshot::V4(model) => {
                return Ok(MigrationOutcome::Migrated { from, path, model })
            }
            older => {
                let id = older.workspace_id();
                let to = snapshot_version + 1;
                let remote = match reader.read(&id) {
                    Ok(remote) => remote,
                    Err(e) if e.is_not_found() => {
                        tracing::info!(
                            "workspace {id} is gone; snapshot v{snapshot_version} dropped"
                        );
                        return Ok(MigrationOutcome::Deleted { workspace: id });
                    }
                    Err(e) => {
                        return Err(SyncError::Migration {
                            from: snapshot_version,
                            to,
                            source: Box::new(e),
                        })
                    }
                };
                tracing::info!("{id}: migrating snapshot v{snapshot_version} -> v{to}");
                let next = step(older, &remote);
                debug_assert_eq!(next.version(), to);
                path.push(to);
                next
            }
        };
        debug_assert!(snapshot.version() <= CURRENT_VERSION);
    }
}

/// Upgrade exactly one version. `V4` is returned unchanged.
pub fn step(snapshot: WorkspaceSnapshot, remote: &RemoteObjectState) -> WorkspaceSnapshot {
    match snapshot {
        WorkspaceSnapshot::V0(s) => WorkspaceSnapshot::V1(v0_to_v1(s, remote)),
        WorkspaceSnapshot::V1(s) => WorkspaceSnapshot::V2(v1_to_v2(s, remote)),
        WorkspaceSnapshot::V2(s) => WorkspaceSnapshot::V3(v2_to_v3(s, remote)),
        WorkspaceSnapshot::V3(s) => WorkspaceSnapshot::V4(v3_to_v4(s, remote)),
        current @ WorkspaceSnapshot::V4(_) => current,
    }
}

/// `organization`, `external_id` and `ssh_key_id` are dropped; the
/// environment and queue setting come from the remote.
pub fn v0_to_v1(old: SnapshotV0, remote: &RemoteObjectState) -> SnapshotV1 {
    let id = match old.external_id {
        Some(external) if is_human_id(&old.id) && !external.is_empty() => external,
        _ => old.id,
    };
    SnapshotV1 {
        id: WorkspaceId::from(id),
        auto_apply: old.auto_apply,
        created_by: old.created_by,
        environment_id: remote.workspace.environment_id.clone(),
        name: old.name,
        operations: old.operations,
        queue_all_runs: remote.workspace.auto_queue_runs == AutoQueueRuns::Always,
        terraform_version: old.terraform_version,
        vcs_repo: old.vcs_repo.map(|repo| VcsRepoV1 {
            identifier: repo.identifier,
            branch: repo.branch,
            path: repo.path.unwrap_or_default(),
            trigger_prefixes: Vec::new(),
            dry_runs_enabled: true,
            ingress_submodules: repo.ingress_submodules,
            oauth_token_id: repo.oauth_token_id.unwrap_or_default(),
        }),
        working_directory: old.working_directory.unwrap_or_default(),
    }
}

/// The provider token moves out of the repo block into `vcs_provider_id`.
pub fn v1_to_v2(old: SnapshotV1, remote: &RemoteObjectState) -> SnapshotV2 {
    let vcs_provider_id = match &old.vcs_repo {
        Some(repo) if !repo.oauth_token_id.is_empty() => Some(repo.oauth_token_id.clone()),
        _ => remote.workspace.vcs_provider_id.clone(),
    };
    SnapshotV2 {
        id: old.id,
        auto_apply: old.auto_apply,
        created_by: old.created_by,
        environment_id: old.environment_id,
        name: old.name,
        operations: old.operations,
        terraform_version: old.terraform_version,
        vcs_provider_id,
        vcs_repo: old.vcs_repo.map(|repo| VcsRepo {
            identifier: repo.identifier,
            branch: repo.branch,
            path: repo.path,
            trigger_prefixes: repo.trigger_prefixes,
            trigger_patterns: String::new(),
            dry_runs_enabled: repo.dry_runs_enabled,
            ingress_submodules: repo.ingress_submodules,
        }),
        working_directory: old.working_directory,
    }
}

pub fn v2_to_v3(old: SnapshotV2, remote: &RemoteObjectState) -> SnapshotV3 {
    let ws = &remote.workspace;
    SnapshotV3 {
        id: old.id,
        agent_pool_id: ws.agent_pool_id.clone(),
        auto_apply: old.auto_apply,
        created_by: old.created_by,
        environment_id: old.environment_id,
        has_resources: ws.has_resources,
        hooks: normalise_hooks(ws.hooks.as_ref(), false),
        module_version_id: ws.module_version_id.clone(),
        name: old.name,
        operations: old.operations,
        provider_configuration: remote
            .provider_configurations
            .iter()
            .map(ProviderConfigurationLink::from)
            .collect(),
        run_operation_timeout: ws.run_operation_timeout,
        terraform_version: old.terraform_version,
        vcs_provider_id: old.vcs_provider_id,
        vcs_repo: old.vcs_repo,
        var_files: ws.var_files.clone(),
        working_directory: old.working_directory,
    }
}

/// Retained scalars win; the execution mode follows the retained
/// `operations`; everything else is taken from the remote.
pub fn v3_to_v4(old: SnapshotV3, remote: &RemoteObjectState) -> WorkspaceModel {
    let mut model = workspace_model(remote, old.hooks.is_some());
    model.id = old.id;
    model.name = old.name;
    model.environment_id = old.environment_id;
    model.auto_apply = old.auto_apply;
    model.operations = old.operations;
    model.execution_mode = ExecutionMode::from_operations(old.operations);
    model.working_directory = old.working_directory;
    model.terraform_version = old.terraform_version;
    model
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
