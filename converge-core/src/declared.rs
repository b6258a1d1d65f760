//! User-authored workspace declarations.
//!
//! A declaration is a YAML document. Scalar fields left out are not managed
//! (the remote value is kept); linked collections and singleton links left
//! out are declared empty.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{io_err, CoreError};
use crate::model::{
    AutoQueueRuns, EnvironmentType, ExecutionMode, Hooks, IacPlatform, Terragrunt, VcsRepo,
};
use crate::types::{AccountId, WorkspaceId};

/// A provider-configuration link as written by the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeclaredProviderConfiguration {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,
}

/// Desired configuration of one managed workspace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct DeclaredConfiguration {
    /// Target workspace; may instead be given on the command line.
    #[serde(default)]
    pub id: Option<WorkspaceId>,
    pub name: String,
    #[serde(default)]
    pub environment_id: Option<String>,
    #[serde(default)]
    pub account_id: Option<AccountId>,

    // Scalars
    #[serde(default)]
    pub auto_apply: Option<bool>,
    #[serde(default)]
    pub auto_queue_runs: Option<AutoQueueRuns>,
    #[serde(default)]
    pub deletion_protection_enabled: Option<bool>,
    #[serde(default)]
    pub execution_mode: Option<ExecutionMode>,
    #[serde(default)]
    pub force_latest_run: Option<bool>,
    #[serde(default)]
    pub iac_platform: Option<IacPlatform>,
    #[serde(default)]
    pub operations: Option<bool>,
    #[serde(default)]
    pub terraform_version: Option<String>,
    #[serde(default)]
    pub working_directory: Option<String>,
    #[serde(default, rename = "type")]
    pub environment_type: Option<EnvironmentType>,
    #[serde(default)]
    pub var_files: Option<Vec<String>>,
    #[serde(default)]
    pub run_operation_timeout: Option<u32>,

    // Relationships and nested blocks
    #[serde(default)]
    pub agent_pool_id: Option<String>,
    #[serde(default)]
    pub module_version_id: Option<String>,
    #[serde(default)]
    pub vcs_provider_id: Option<String>,
    /// Resolved to an id against the remote at reconcile time.
    #[serde(default)]
    pub vcs_provider_name: Option<String>,
    #[serde(default)]
    pub vcs_repo: Option<VcsRepo>,
    #[serde(default)]
    pub hooks: Option<Hooks>,
    #[serde(default)]
    pub terragrunt: Option<Terragrunt>,

    // Singleton link
    #[serde(default)]
    pub ssh_key_id: Option<String>,

    // Linked collections
    #[serde(default)]
    pub tag_ids: Vec<String>,
    #[serde(default)]
    pub provider_configuration: Vec<DeclaredProviderConfiguration>,
    #[serde(default)]
    pub remote_state_consumers: Vec<String>,
}

impl DeclaredConfiguration {
    /// A declaration with only a name; everything else unmanaged or empty.
    pub fn named(name: &str) -> Self {
        Self {
            name: name.to_owned(),
            ..Self::default()
        }
    }
}

/// Load a declaration from a YAML file.
///
/// Returns `CoreError::DeclarationNotFound` if absent,
/// `CoreError::Parse` (with path + line context) if malformed YAML.
pub fn load_at(path: &Path) -> Result<DeclaredConfiguration, CoreError> {
    if !path.exists() {
        return Err(CoreError::DeclarationNotFound {
            path: path.to_path_buf(),
        });
    }
    let contents = std::fs::read_to_string(path).map_err(|e| io_err(path, e))?;
    serde_yaml::from_str(&contents).map_err(|e| CoreError::Parse {
        path: path.to_path_buf(),
        source: e,
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
