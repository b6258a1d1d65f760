//! Versioned workspace snapshots.
//!
//! On disk a snapshot is the untyped envelope [`PersistedSnapshot`]
//! (`{version, applied_at, fields}`). The `version` is read first and selects
//! exactly one typed schema struct; field shape is never used to guess it.
//!
//! | Version | Struct |
//! |---|---|
//! | 0 | [`SnapshotV0`] — human-form ids, `organization` |
//! | 1 | [`SnapshotV1`] — `environment_id`, `queue_all_runs` |
//! | 2 | [`SnapshotV2`] — `vcs_provider_id` split out of `vcs_repo` |
//! | 3 | [`SnapshotV3`] — hooks, provider configurations, agent pool |
//! | 4 | [`WorkspaceModel`] |

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::model::{Hooks, ProviderConfigurationLink, User, VcsRepo, WorkspaceModel};
use crate::types::WorkspaceId;

/// Schema version written by this build.
pub const CURRENT_VERSION: u32 = 4;

// ---------------------------------------------------------------------------
// Envelope
// ---------------------------------------------------------------------------

/// The persisted record, keyed externally by workspace id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersistedSnapshot {
    pub version: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub applied_at: Option<DateTime<Utc>>,
    pub fields: serde_json::Value,
}

// ---------------------------------------------------------------------------
// Historical schemas
// ---------------------------------------------------------------------------

/// VCS repository block of schema 0.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VcsRepoV0 {
    pub identifier: String,
    #[serde(default)]
    pub branch: Option<String>,
    #[serde(default)]
    pub ingress_submodules: bool,
    #[serde(default)]
    pub oauth_token_id: Option<String>,
    #[serde(default)]
    pub path: Option<String>,
}

/// VCS repository block of schema 1, still carrying the provider token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VcsRepoV1 {
    pub identifier: String,
    #[serde(default)]
    pub branch: Option<String>,
    #[serde(default)]
    pub path: String,
    #[serde(default)]
    pub trigger_prefixes: Vec<String>,
    #[serde(default = "default_true")]
    pub dry_runs_enabled: bool,
    #[serde(default)]
    pub ingress_submodules: bool,
    pub oauth_token_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotV0 {
    /// Either an opaque id or the human form `<org>/<name>` / `<name>|<org>`.
    pub id: String,
    #[serde(default)]
    pub external_id: Option<String>,
    pub name: String,
    #[serde(default)]
    pub organization: String,
    #[serde(default)]
    pub auto_apply: bool,
    #[serde(default = "default_true")]
    pub operations: bool,
    #[serde(default)]
    pub ssh_key_id: Option<String>,
    #[serde(default)]
    pub terraform_version: Option<String>,
    #[serde(default)]
    pub working_directory: Option<String>,
    #[serde(default)]
    pub created_by: Option<User>,
    #[serde(default)]
    pub vcs_repo: Option<VcsRepoV0>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotV1 {
    pub id: WorkspaceId,
    #[serde(default)]
    pub auto_apply: bool,
    #[serde(default)]
    pub created_by: Option<User>,
    pub environment_id: String,
    pub name: String,
    #[serde(default = "default_true")]
    pub operations: bool,
    #[serde(default)]
    pub queue_all_runs: bool,
    #[serde(default)]
    pub terraform_version: Option<String>,
    #[serde(default)]
    pub vcs_repo: Option<VcsRepoV1>,
    #[serde(default)]
    pub working_directory: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotV2 {
    pub id: WorkspaceId,
    #[serde(default)]
    pub auto_apply: bool,
    #[serde(default)]
    pub created_by: Option<User>,
    pub environment_id: String,
    pub name: String,
    #[serde(default = "default_true")]
    pub operations: bool,
    #[serde(default)]
    pub terraform_version: Option<String>,
    #[serde(default)]
    pub vcs_provider_id: Option<String>,
    #[serde(default)]
    pub vcs_repo: Option<VcsRepo>,
    #[serde(default)]
    pub working_directory: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotV3 {
    pub id: WorkspaceId,
    #[serde(default)]
    pub agent_pool_id: Option<String>,
    #[serde(default)]
    pub auto_apply: bool,
    #[serde(default)]
    pub created_by: Option<User>,
    pub environment_id: String,
    #[serde(default)]
    pub has_resources: bool,
    #[serde(default)]
    pub hooks: Option<Hooks>,
    #[serde(default)]
    pub module_version_id: Option<String>,
    pub name: String,
    #[serde(default = "default_true")]
    pub operations: bool,
    #[serde(default)]
    pub provider_configuration: BTreeSet<ProviderConfigurationLink>,
    #[serde(default)]
    pub run_operation_timeout: Option<u32>,
    #[serde(default)]
    pub terraform_version: Option<String>,
    #[serde(default)]
    pub vcs_provider_id: Option<String>,
    #[serde(default)]
    pub vcs_repo: Option<VcsRepo>,
    #[serde(default)]
    pub var_files: Vec<String>,
    #[serde(default)]
    pub working_directory: String,
}

fn default_true() -> bool {
    true
}

/// Whether a schema-0 id is in one of the human forms rather than opaque.
pub fn is_human_id(id: &str) -> bool {
    id.contains('/') || id.contains('|')
}

// ---------------------------------------------------------------------------
// Discriminated union
// ---------------------------------------------------------------------------

/// A snapshot decoded into the struct of its schema version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkspaceSnapshot {
    V0(SnapshotV0),
    V1(SnapshotV1),
    V2(SnapshotV2),
    V3(SnapshotV3),
    V4(WorkspaceModel),
}

impl WorkspaceSnapshot {
    /// Decode the envelope according to its `version`.
    pub fn decode(persisted: &PersistedSnapshot) -> Result<Self, CoreError> {
        let version = persisted.version;
        let fields = persisted.fields.clone();
        let wrap = |source| CoreError::SnapshotFields { version, source };
        Ok(match version {
            0 => WorkspaceSnapshot::V0(serde_json::from_value(fields).map_err(wrap)?),
            1 => WorkspaceSnapshot::V1(serde_json::from_value(fields).map_err(wrap)?),
            2 => WorkspaceSnapshot::V2(serde_json::from_value(fields).map_err(wrap)?),
            3 => WorkspaceSnapshot::V3(serde_json::from_value(fields).map_err(wrap)?),
            4 => WorkspaceSnapshot::V4(serde_json::from_value(fields).map_err(wrap)?),
            other => {
                return Err(CoreError::UnsupportedVersion {
                    version: other,
                    current: CURRENT_VERSION,
                })
            }
        })
    }

    /// Encode back into the envelope.
    pub fn encode(
        &self,
        applied_at: Option<DateTime<Utc>>,
    ) -> Result<PersistedSnapshot, CoreError> {
        let version = self.version();
        let wrap = |source| CoreError::SnapshotFields { version, source };
        let fields = match self {
            WorkspaceSnapshot::V0(s) => serde_json::to_value(s),
            WorkspaceSnapshot::V1(s) => serde_json::to_value(s),
            WorkspaceSnapshot::V2(s) => serde_json::to_value(s),
            WorkspaceSnapshot::V3(s) => serde_json::to_value(s),
            WorkspaceSnapshot::V4(s) => serde_json::to_value(s),
        }
        .map_err(wrap)?;
        Ok(PersistedSnapshot {
            version,
            applied_at,
            fields,
        })
    }

    pub fn version(&self) -> u32 {
        match self {
            WorkspaceSnapshot::V0(_) => 0,
            WorkspaceSnapshot::V1(_) => 1,
            WorkspaceSnapshot::V2(_) => 2,
            WorkspaceSnapshot::V3(_) => 3,
            WorkspaceSnapshot::V4(_) => 4,
        }
    }

    /// The opaque workspace id retained in this snapshot.
    ///
    /// Schema 0 may hold a human-form id; the opaque one is then in `external_id`.
    pub fn workspace_id(&self) -> WorkspaceId {
        match self {
            WorkspaceSnapshot::V0(s) => match &s.external_id {
                Some(external) if is_human_id(&s.id) && !external.is_empty() => {
                    WorkspaceId::from(external.as_str())
                }
                _ => WorkspaceId::from(s.id.as_str()),
            },
            WorkspaceSnapshot::V1(s) => s.id.clone(),
            WorkspaceSnapshot::V2(s) => s.id.clone(),
            WorkspaceSnapshot::V3(s) => s.id.clone(),
            WorkspaceSnapshot::V4(s) => s.id.clone(),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn envelope(version: u32, fields: serde_json::Value) -> PersistedSnapshot {
        PersistedSnapshot {
            version,
            applied_at: None,
            fields,
        }
    }

    #[test]
    fn v0_human_id_resolves_to_external_id() {
        let snap = WorkspaceSnapshot::decode(&envelope(
            0,
            json!({"id": "my-org/test", "external_id": "ws-123", "name": "test"}),
        ))
        .expect("decode");
        assert_eq!(snap.version(), 0);
        assert_eq!(snap.workspace_id(), WorkspaceId::from("ws-123"));
    }

    #[test]
    fn v0_opaque_id_is_used_directly() {
        let snap = WorkspaceSnapshot::decode(&envelope(
            0,
            json!({"id": "ws-9", "external_id": "ws-other", "name": "test"}),
        ))
        .expect("decode");
        assert_eq!(snap.workspace_id(), WorkspaceId::from("ws-9"));
    }

    #[test]
    fn version_selects_schema_even_when_fields_look_newer() {
        // A v1 envelope carrying an extra v2-only field still decodes as v1.
        let snap = WorkspaceSnapshot::decode(&envelope(
            1,
            json!({"id": "ws-1", "environment_id": "env-1", "name": "a", "vcs_provider_id": "vcs-1"}),
        ))
        .expect("decode");
        assert!(matches!(snap, WorkspaceSnapshot::V1(_)));
    }

    #[test]
    fn unknown_version_is_rejected() {
        let err = WorkspaceSnapshot::decode(&envelope(9, json!({}))).unwrap_err();
        assert!(matches!(
            err,
            CoreError::UnsupportedVersion { version: 9, current: 4 }
        ));
    }

    #[test]
    fn mismatched_fields_report_version() {
        let err = WorkspaceSnapshot::decode(&envelope(2, json!({"id": 5}))).unwrap_err();
        assert!(matches!(err, CoreError::SnapshotFields { version: 2, .. }));
    }

    #[test]
    fn encode_preserves_version() {
        let snap = WorkspaceSnapshot::V2(SnapshotV2 {
            id: WorkspaceId::from("ws-2"),
            auto_apply: true,
            created_by: None,
            environment_id: "env-1".into(),
            name: "two".into(),
            operations: true,
            terraform_version: None,
            vcs_provider_id: Some("vcs-1".into()),
            vcs_repo: None,
            working_directory: String::new(),
        });
        let persisted = snap.encode(None).expect("encode");
        assert_eq!(persisted.version, 2);
        assert_eq!(WorkspaceSnapshot::decode(&persisted).expect("decode"), snap);
    }
}
