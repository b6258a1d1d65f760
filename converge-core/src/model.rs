//! The current workspace model (schema version 4) and the workspace record as
//! the remote system reports it.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::types::{LinkedItem, WorkspaceId};

// ---------------------------------------------------------------------------
// Enums
// ---------------------------------------------------------------------------

/// Where runs of the workspace execute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionMode {
    #[default]
    Remote,
    Local,
}

impl ExecutionMode {
    /// `operations` is the deprecated boolean spelling of the execution mode.
    pub fn from_operations(operations: bool) -> Self {
        if operations {
            ExecutionMode::Remote
        } else {
            ExecutionMode::Local
        }
    }

    pub fn operations(self) -> bool {
        self == ExecutionMode::Remote
    }
}

impl fmt::Display for ExecutionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExecutionMode::Remote => write!(f, "remote"),
            ExecutionMode::Local => write!(f, "local"),
        }
    }
}

/// When runs are queued automatically on configuration upload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum AutoQueueRuns {
    #[default]
    SkipFirst,
    Always,
    Never,
}

impl fmt::Display for AutoQueueRuns {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AutoQueueRuns::SkipFirst => write!(f, "skip_first"),
            AutoQueueRuns::Always => write!(f, "always"),
            AutoQueueRuns::Never => write!(f, "never"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum IacPlatform {
    #[default]
    Terraform,
    Opentofu,
}

impl fmt::Display for IacPlatform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IacPlatform::Terraform => write!(f, "terraform"),
            IacPlatform::Opentofu => write!(f, "opentofu"),
        }
    }
}

/// Environment classification of a workspace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum EnvironmentType {
    Production,
    Staging,
    Testing,
    #[default]
    Unmapped,
}

impl fmt::Display for EnvironmentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EnvironmentType::Production => write!(f, "production"),
            EnvironmentType::Staging => write!(f, "staging"),
            EnvironmentType::Testing => write!(f, "testing"),
            EnvironmentType::Unmapped => write!(f, "unmapped"),
        }
    }
}

// ---------------------------------------------------------------------------
// Nested blocks
// ---------------------------------------------------------------------------

/// VCS repository settings of a workspace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct VcsRepo {
    pub identifier: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub branch: Option<String>,
    #[serde(default)]
    pub path: String,
    #[serde(default)]
    pub trigger_prefixes: Vec<String>,
    #[serde(default)]
    pub trigger_patterns: String,
    #[serde(default = "default_true")]
    pub dry_runs_enabled: bool,
    #[serde(default)]
    pub ingress_submodules: bool,
}

/// Custom commands run around each run phase.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Hooks {
    #[serde(default)]
    pub pre_init: String,
    #[serde(default)]
    pub pre_plan: String,
    #[serde(default)]
    pub post_plan: String,
    #[serde(default)]
    pub pre_apply: String,
    #[serde(default)]
    pub post_apply: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Terragrunt {
    pub version: String,
    #[serde(default)]
    pub use_run_all: bool,
    #[serde(default)]
    pub include_external_dependencies: bool,
}

/// The user that created a workspace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct User {
    pub username: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub full_name: String,
}

fn default_true() -> bool {
    true
}

// ---------------------------------------------------------------------------
// Remote workspace record
// ---------------------------------------------------------------------------

/// A workspace exactly as the remote reports it from a single `Get`.
///
/// Linked collections are not part of this record; they are paged separately.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteWorkspace {
    pub id: WorkspaceId,
    pub name: String,
    pub environment_id: String,
    #[serde(default)]
    pub auto_apply: bool,
    #[serde(default)]
    pub auto_queue_runs: AutoQueueRuns,
    #[serde(default)]
    pub deletion_protection_enabled: bool,
    #[serde(default)]
    pub execution_mode: ExecutionMode,
    #[serde(default)]
    pub force_latest_run: bool,
    #[serde(default)]
    pub has_resources: bool,
    #[serde(default)]
    pub iac_platform: IacPlatform,
    #[serde(default = "default_true")]
    pub operations: bool,
    #[serde(default)]
    pub terraform_version: Option<String>,
    #[serde(default)]
    pub working_directory: String,
    #[serde(default, rename = "type")]
    pub environment_type: EnvironmentType,
    #[serde(default)]
    pub var_files: Vec<String>,
    #[serde(default)]
    pub run_operation_timeout: Option<u32>,
    #[serde(default)]
    pub remote_state_sharing: bool,
    #[serde(default)]
    pub agent_pool_id: Option<String>,
    #[serde(default)]
    pub module_version_id: Option<String>,
    #[serde(default)]
    pub vcs_provider_id: Option<String>,
    #[serde(default)]
    pub ssh_key_id: Option<String>,
    #[serde(default)]
    pub vcs_repo: Option<VcsRepo>,
    #[serde(default)]
    pub hooks: Option<Hooks>,
    #[serde(default)]
    pub terragrunt: Option<Terragrunt>,
    #[serde(default)]
    pub created_by: Option<User>,
}

impl RemoteWorkspace {
    /// A record with server defaults, as returned right after creation.
    pub fn new(id: impl Into<WorkspaceId>, name: &str, environment_id: &str) -> Self {
        Self {
            id: id.into(),
            name: name.to_owned(),
            environment_id: environment_id.to_owned(),
            auto_apply: false,
            auto_queue_runs: AutoQueueRuns::default(),
            deletion_protection_enabled: false,
            execution_mode: ExecutionMode::default(),
            force_latest_run: false,
            has_resources: false,
            iac_platform: IacPlatform::default(),
            operations: true,
            terraform_version: None,
            working_directory: String::new(),
            environment_type: EnvironmentType::default(),
            var_files: Vec::new(),
            run_operation_timeout: None,
            remote_state_sharing: false,
            agent_pool_id: None,
            module_version_id: None,
            vcs_provider_id: None,
            ssh_key_id: None,
            vcs_repo: None,
            hooks: None,
            terragrunt: None,
            created_by: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Current model (schema version 4)
// ---------------------------------------------------------------------------

/// A provider-configuration link as persisted in a snapshot.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ProviderConfigurationLink {
    pub id: String,
    #[serde(default)]
    pub alias: String,
}

impl From<&LinkedItem> for ProviderConfigurationLink {
    fn from(item: &LinkedItem) -> Self {
        Self {
            id: item.id.clone(),
            alias: item.alias().to_owned(),
        }
    }
}

impl From<&ProviderConfigurationLink> for LinkedItem {
    fn from(link: &ProviderConfigurationLink) -> Self {
        LinkedItem::with_alias(link.id.clone(), link.alias.clone())
    }
}

/// Full workspace model at the current schema version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkspaceModel {
    pub id: WorkspaceId,
    pub name: String,
    pub environment_id: String,
    #[serde(default)]
    pub agent_pool_id: Option<String>,
    pub auto_apply: bool,
    pub auto_queue_runs: AutoQueueRuns,
    #[serde(default)]
    pub created_by: Option<User>,
    pub deletion_protection_enabled: bool,
    pub execution_mode: ExecutionMode,
    pub force_latest_run: bool,
    pub has_resources: bool,
    #[serde(default)]
    pub hooks: Option<Hooks>,
    pub iac_platform: IacPlatform,
    #[serde(default)]
    pub module_version_id: Option<String>,
    pub operations: bool,
    #[serde(default)]
    pub provider_configuration: BTreeSet<ProviderConfigurationLink>,
    /// Explicit consumer ids, or `["*"]` when shared with everyone.
    #[serde(default)]
    pub remote_state_consumers: BTreeSet<String>,
    #[serde(default)]
    pub run_operation_timeout: Option<u32>,
    #[serde(default)]
    pub ssh_key_id: Option<String>,
    #[serde(default)]
    pub tag_ids: BTreeSet<String>,
    #[serde(default)]
    pub terraform_version: Option<String>,
    #[serde(default)]
    pub terragrunt: Option<Terragrunt>,
    #[serde(rename = "type")]
    pub environment_type: EnvironmentType,
    #[serde(default)]
    pub vcs_provider_id: Option<String>,
    #[serde(default)]
    pub vcs_repo: Option<VcsRepo>,
    #[serde(default)]
    pub var_files: Vec<String>,
    #[serde(default)]
    pub working_directory: String,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
