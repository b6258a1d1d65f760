//! The operations consumed from the remote control plane.

use std::fmt;

use serde::{Deserialize, Serialize};

use converge_core::{
    AccountId, AutoQueueRuns, EnvironmentType, ExecutionMode, Hooks, IacPlatform, LinkedItem,
    RemoteWorkspace, Terragrunt, VcsRepo, WorkspaceId,
};

use crate::error::RemoteError;
use crate::page::Page;

// ---------------------------------------------------------------------------
// Collections
// ---------------------------------------------------------------------------

/// A linked collection attached to a workspace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Collection {
    Tags,
    ProviderConfigurations,
    RemoteStateConsumers,
}

impl Collection {
    pub const ALL: [Collection; 3] = [
        Collection::Tags,
        Collection::ProviderConfigurations,
        Collection::RemoteStateConsumers,
    ];

    /// Field name of the collection in a declaration.
    pub fn field(self) -> &'static str {
        match self {
            Collection::Tags => "tag_ids",
            Collection::ProviderConfigurations => "provider_configuration",
            Collection::RemoteStateConsumers => "remote_state_consumers",
        }
    }

    /// Whether the remote offers batched add/remove for this collection.
    ///
    /// Provider-configuration links are created and deleted one at a time.
    pub fn supports_bulk(self) -> bool {
        !matches!(self, Collection::ProviderConfigurations)
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.field())
    }
}

/// Paging parameters for one listing request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListOptions {
    pub page_number: u32,
    pub page_size: u32,
}

// ---------------------------------------------------------------------------
// VCS providers
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VcsProvider {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub vcs_type: String,
    /// Accounts the provider is shared with.
    #[serde(default)]
    pub account_ids: Vec<AccountId>,
}

/// Filter for listing VCS providers. `name` is an exact match; `query`
/// matches any provider whose name contains it.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct VcsProviderFilter {
    pub account_id: Option<AccountId>,
    pub name: Option<String>,
    pub query: Option<String>,
}

impl VcsProviderFilter {
    pub fn matches(&self, provider: &VcsProvider) -> bool {
        if let Some(account) = &self.account_id {
            if !provider.account_ids.contains(account) {
                return false;
            }
        }
        if let Some(name) = &self.name {
            if &provider.name != name {
                return false;
            }
        }
        if let Some(query) = &self.query {
            if !provider.name.contains(query.as_str()) {
                return false;
            }
        }
        true
    }
}

// ---------------------------------------------------------------------------
// Workspace patch
// ---------------------------------------------------------------------------

/// A partial update of a workspace's own attributes.
///
/// `None` leaves the attribute untouched. For nullable relationships and
/// blocks, `Some(None)` clears the remote value.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct WorkspacePatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auto_apply: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auto_queue_runs: Option<AutoQueueRuns>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deletion_protection_enabled: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub execution_mode: Option<ExecutionMode>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub force_latest_run: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub iac_platform: Option<IacPlatform>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub operations: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub terraform_version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub working_directory: Option<String>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub environment_type: Option<EnvironmentType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub var_files: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub run_operation_timeout: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub agent_pool_id: Option<Option<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub module_version_id: Option<Option<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vcs_provider_id: Option<Option<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vcs_repo: Option<Option<VcsRepo>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hooks: Option<Option<Hooks>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub terragrunt: Option<Option<Terragrunt>>,
}

impl WorkspacePatch {
    pub fn is_empty(&self) -> bool {
        self == &WorkspacePatch::default()
    }

    /// Names of the attributes this patch touches, in declaration order.
    pub fn fields(&self) -> Vec<&'static str> {
        let mut out = Vec::new();
        macro_rules! touched {
            ($($field:ident => $name:literal),* $(,)?) => {
                $(if self.$field.is_some() { out.push($name); })*
            };
        }
        touched!(
            name => "name",
            auto_apply => "auto_apply",
            auto_queue_runs => "auto_queue_runs",
            deletion_protection_enabled => "deletion_protection_enabled",
            execution_mode => "execution_mode",
            force_latest_run => "force_latest_run",
            iac_platform => "iac_platform",
            operations => "operations",
            terraform_version => "terraform_version",
            working_directory => "working_directory",
            environment_type => "type",
            var_files => "var_files",
            run_operation_timeout => "run_operation_timeout",
            agent_pool_id => "agent_pool_id",
            module_version_id => "module_version_id",
            vcs_provider_id => "vcs_provider_id",
            vcs_repo => "vcs_repo",
            hooks => "hooks",
            terragrunt => "terragrunt",
        );
        out
    }

    /// Apply the patch to a workspace record in place.
    pub fn apply_to(&self, ws: &mut RemoteWorkspace) {
        macro_rules! set {
            ($($field:ident),* $(,)?) => {
                $(if let Some(value) = &self.$field { ws.$field = value.clone(); })*
            };
        }
        set!(
            name,
            auto_apply,
            auto_queue_runs,
            deletion_protection_enabled,
            execution_mode,
            force_latest_run,
            iac_platform,
            operations,
            working_directory,
            environment_type,
            var_files,
            agent_pool_id,
            module_version_id,
            vcs_provider_id,
            vcs_repo,
            hooks,
            terragrunt,
        );
        if let Some(version) = &self.terraform_version {
            ws.terraform_version = Some(version.clone());
        }
        if let Some(timeout) = self.run_operation_timeout {
            ws.run_operation_timeout = Some(timeout);
        }
    }
}

// ---------------------------------------------------------------------------
// Trait
// ---------------------------------------------------------------------------

/// Blocking client for the remote control plane.
///
/// Every method is one request/response round trip. Implementations return
/// [`RemoteError::NotFound`] for a missing workspace and never retry.
pub trait RemoteApi {
    /// Full workspace read.
    fn get_workspace(&self, id: &WorkspaceId) -> Result<RemoteWorkspace, RemoteError>;

    /// One page of a linked collection.
    fn list_page(
        &self,
        id: &WorkspaceId,
        collection: Collection,
        options: ListOptions,
    ) -> Result<Page<LinkedItem>, RemoteError>;

    /// Link a single item (collections without bulk primitives).
    fn create_link(
        &self,
        id: &WorkspaceId,
        collection: Collection,
        item: &LinkedItem,
    ) -> Result<(), RemoteError>;

    /// Unlink a single item; `item.link_id` addresses the link when set.
    fn delete_link(
        &self,
        id: &WorkspaceId,
        collection: Collection,
        item: &LinkedItem,
    ) -> Result<(), RemoteError>;

    fn bulk_add(
        &self,
        id: &WorkspaceId,
        collection: Collection,
        items: &[LinkedItem],
    ) -> Result<(), RemoteError>;

    fn bulk_remove(
        &self,
        id: &WorkspaceId,
        collection: Collection,
        items: &[LinkedItem],
    ) -> Result<(), RemoteError>;

    /// Toggle "shared with every workspace" for remote state.
    fn set_share_flag(&self, id: &WorkspaceId, shared: bool) -> Result<(), RemoteError>;

    fn set_ssh_key(&self, id: &WorkspaceId, key_id: &str) -> Result<(), RemoteError>;

    fn clear_ssh_key(&self, id: &WorkspaceId) -> Result<(), RemoteError>;

    fn update_workspace(&self, id: &WorkspaceId, patch: &WorkspacePatch)
        -> Result<(), RemoteError>;

    fn list_vcs_providers(
        &self,
        filter: &VcsProviderFilter,
        options: ListOptions,
    ) -> Result<Page<VcsProvider>, RemoteError>;
}
