//! Assemble the current [`WorkspaceModel`] from a remote read.

use converge_core::{Hooks, ProviderConfigurationLink, WorkspaceModel};

use crate::reader::RemoteObjectState;

/// Hooks as they should be recorded.
///
/// The remote reports "no hooks" either as nothing or as an all-empty block.
/// Both read back as an all-empty block when the previous model had one, and
/// as no block otherwise, so neither side produces a perpetual diff.
pub fn normalise_hooks(remote: Option<&Hooks>, had_block: bool) -> Option<Hooks> {
    match remote {
        Some(hooks) if hooks != &Hooks::default() => Some(hooks.clone()),
        _ if had_block => Some(Hooks::default()),
        _ => None,
    }
}

/// Build the model from remote state. `had_hooks` says whether the previous
/// model (or declaration) carried a hooks block.
pub fn workspace_model(state: &RemoteObjectState, had_hooks: bool) -> WorkspaceModel {
    let ws = &state.workspace;
    WorkspaceModel {
        id: ws.id.clone(),
        name: ws.name.clone(),
        environment_id: ws.environment_id.clone(),
        agent_pool_id: ws.agent_pool_id.clone(),
        auto_apply: ws.auto_apply,
        auto_queue_runs: ws.auto_queue_runs,
        created_by: ws.created_by.clone(),
        deletion_protection_enabled: ws.deletion_protection_enabled,
        execution_mode: ws.execution_mode,
        force_latest_run: ws.force_latest_run,
        has_resources: ws.has_resources,
        hooks: normalise_hooks(ws.hooks.as_ref(), had_hooks),
        iac_platform: ws.iac_platform,
        module_version_id: ws.module_version_id.clone(),
        operations: ws.operations,
        provider_configuration: state
            .provider_configurations
            .iter()
            .map(ProviderConfigurationLink::from)
            .collect(),
        remote_state_consumers: state.remote_state_consumers.to_ids(),
        run_operation_timeout: ws.run_operation_timeout,
        ssh_key_id: ws.ssh_key_id.clone(),
        tag_ids: state.tags.iter().map(|t| t.id.clone()).collect(),
        terraform_version: ws.terraform_version.clone(),
        terragrunt: ws.terragrunt.clone(),
        environment_type: ws.environment_type,
        vcs_provider_id: ws.vcs_provider_id.clone(),
        vcs_repo: ws.vcs_repo.clone(),
        var_files: ws.var_files.clone(),
        working_directory: ws.working_directory.clone(),
    }
}
