//! Desired state extractor.
//!
//! Turns a [`DeclaredConfiguration`] into the canonical, order-independent
//! shapes produced by the remote state reader, rejecting declarations that
//! break identity or exclusivity rules before anything touches the remote.

use std::collections::BTreeSet;

use converge_core::{
    AccountId, AutoQueueRuns, DeclaredConfiguration, EnvironmentType, ExecutionMode, Hooks,
    IacPlatform, LinkedItem, ShareScope, Terragrunt, VcsRepo, WorkspaceId, WILDCARD,
};

use crate::error::ValidationError;

/// How the declaration names its VCS provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VcsProviderRef {
    Id(String),
    /// Resolved by [`crate::reader::RemoteStateReader::resolve_vcs_provider`].
    Name(String),
}

/// Canonical desired state of one workspace.
///
/// Scalar `Option`s are `None` when unmanaged. Relationship `Option`s
/// (`agent_pool_id`, `module_version_id`, `vcs_provider`, `vcs_repo`,
/// `ssh_key_id`) are absolute: `None` means "must be absent".
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DesiredState {
    pub id: Option<WorkspaceId>,
    pub account_id: AccountId,
    pub name: String,
    pub environment_id: Option<String>,

    pub auto_apply: Option<bool>,
    pub auto_queue_runs: Option<AutoQueueRuns>,
    pub deletion_protection_enabled: Option<bool>,
    pub execution_mode: Option<ExecutionMode>,
    pub operations: Option<bool>,
    pub force_latest_run: Option<bool>,
    pub iac_platform: Option<IacPlatform>,
    pub terraform_version: Option<String>,
    pub working_directory: Option<String>,
    pub environment_type: Option<EnvironmentType>,
    pub var_files: Option<Vec<String>>,
    pub run_operation_timeout: Option<u32>,
    pub hooks: Option<Hooks>,
    pub terragrunt: Option<Terragrunt>,

    pub agent_pool_id: Option<String>,
    pub module_version_id: Option<String>,
    pub vcs_provider: Option<VcsProviderRef>,
    pub vcs_repo: Option<VcsRepo>,
    pub ssh_key_id: Option<String>,

    pub tags: BTreeSet<LinkedItem>,
    pub provider_configurations: BTreeSet<LinkedItem>,
    pub remote_state_consumers: ShareScope,
}

impl DesiredState {
    /// The provider id, once any name reference has been resolved.
    pub fn vcs_provider_id(&self) -> Option<&str> {
        match &self.vcs_provider {
            Some(VcsProviderRef::Id(id)) => Some(id),
            _ => None,
        }
    }
}

/// Builds [`DesiredState`] values. The default account is injected here
/// rather than looked up from the environment.
#[derive(Debug, Clone, Default)]
pub struct DesiredStateExtractor {
    default_account_id: Option<AccountId>,
}

impl DesiredStateExtractor {
    pub fn new(default_account_id: Option<AccountId>) -> Self {
        Self { default_account_id }
    }

    pub fn extract(
        &self,
        declared: &DeclaredConfiguration,
    ) -> Result<DesiredState, ValidationError> {
        let account_id = declared
            .account_id
            .clone()
            .filter(|a| !a.0.is_empty())
            .or_else(|| self.default_account_id.clone())
            .ok_or(ValidationError::MissingAccount)?;

        if declared.name.is_empty() {
            return Err(ValidationError::EmptyId { field: "name" });
        }
        if declared.ssh_key_id.as_deref() == Some("") {
            return Err(ValidationError::EmptyId {
                field: "ssh_key_id",
            });
        }

        let vcs_provider = match (&declared.vcs_provider_id, &declared.vcs_provider_name) {
            (Some(_), Some(_)) => {
                return Err(ValidationError::Conflict {
                    first: "vcs_provider_id",
                    second: "vcs_provider_name",
                })
            }
            (Some(id), None) => Some(VcsProviderRef::Id(id.clone())),
            (None, Some(name)) => Some(VcsProviderRef::Name(name.clone())),
            (None, None) => None,
        };
        if declared.module_version_id.is_some() {
            if declared.vcs_repo.is_some() {
                return Err(ValidationError::Conflict {
                    first: "module_version_id",
                    second: "vcs_repo",
                });
            }
            if vcs_provider.is_some() {
                return Err(ValidationError::Conflict {
                    first: "module_version_id",
                    second: "vcs_provider_id",
                });
            }
        }
        match (&declared.vcs_repo, &vcs_provider) {
            (Some(_), None) => return Err(ValidationError::RepoWithoutProvider),
            (None, Some(_)) => return Err(ValidationError::ProviderWithoutRepo),
            _ => {}
        }

        let (execution_mode, operations) =
            execution_settings(declared.operations, declared.execution_mode)?;

        Ok(DesiredState {
            id: declared.id.clone(),
            account_id,
            name: declared.name.clone(),
            environment_id: declared.environment_id.clone(),
            auto_apply: declared.auto_apply,
            auto_queue_runs: declared.auto_queue_runs,
            deletion_protection_enabled: declared.deletion_protection_enabled,
            execution_mode,
            operations,
            force_latest_run: declared.force_latest_run,
            iac_platform: declared.iac_platform,
            terraform_version: declared.terraform_version.clone(),
            working_directory: declared.working_directory.clone(),
            environment_type: declared.environment_type,
            var_files: declared.var_files.clone(),
            run_operation_timeout: declared.run_operation_timeout,
            hooks: declared.hooks.clone(),
            terragrunt: declared.terragrunt.clone(),
            agent_pool_id: declared.agent_pool_id.clone(),
            module_version_id: declared.module_version_id.clone(),
            vcs_provider,
            vcs_repo: declared.vcs_repo.clone(),
            ssh_key_id: declared.ssh_key_id.clone(),
            tags: plain_ids("tag_ids", &declared.tag_ids)?,
            provider_configurations: provider_links(declared)?,
            remote_state_consumers: share_scope(
                "remote_state_consumers",
                &declared.remote_state_consumers,
            )?,
        })
    }
}

/// `operations` alone dictates the execution mode; otherwise the execution
/// mode dictates `operations`. Both set must agree.
fn execution_settings(
    operations: Option<bool>,
    execution_mode: Option<ExecutionMode>,
) -> Result<(Option<ExecutionMode>, Option<bool>), ValidationError> {
    match (operations, execution_mode) {
        (Some(op), Some(mode)) if mode.operations() != op => {
            Err(ValidationError::ExecutionModeConflict {
                operations: op,
                execution_mode: mode,
            })
        }
        (Some(op), _) => Ok((Some(ExecutionMode::from_operations(op)), Some(op))),
        (None, Some(mode)) => Ok((Some(mode), Some(mode.operations()))),
        (None, None) => Ok((None, None)),
    }
}

fn plain_ids(field: &'static str, ids: &[String]) -> Result<BTreeSet<LinkedItem>, ValidationError> {
    ids.iter()
        .map(|id| {
            if id.is_empty() {
                Err(ValidationError::EmptyId { field })
            } else {
                Ok(LinkedItem::new(id.clone()))
            }
        })
        .collect()
}

/// Provider links keyed by `(id, alias)`, alias normalised to `""`.
fn provider_links(
    declared: &DeclaredConfiguration,
) -> Result<BTreeSet<LinkedItem>, ValidationError> {
    declared
        .provider_configuration
        .iter()
        .map(|link| {
            if link.id.is_empty() {
                Err(ValidationError::EmptyId {
                    field: "provider_configuration",
                })
            } else {
                Ok(LinkedItem::with_alias(
                    link.id.clone(),
                    link.alias.clone().unwrap_or_default(),
                ))
            }
        })
        .collect()
}

/// `{"*"}` is the wildcard scope; `"*"` next to any concrete id is rejected.
fn share_scope(field: &'static str, ids: &[String]) -> Result<ShareScope, ValidationError> {
    let items = plain_ids(field, ids)?;
    if !items.iter().any(|i| i.id == WILDCARD) {
        return Ok(ShareScope::Explicit(items));
    }
    if items.len() == 1 {
        Ok(ShareScope::All)
    } else {
        Err(ValidationError::WildcardMixed { field })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use converge_core::DeclaredProviderConfiguration;
    use rstest::rstest;

    use super::*;

    fn extractor() -> DesiredStateExtractor {
        DesiredStateExtractor::new(Some(AccountId::from("acc-default")))
    }

    fn declared() -> DeclaredConfiguration {
        DeclaredConfiguration::named("core")
    }

    fn link(id: &str, alias: Option<&str>) -> DeclaredProviderConfiguration {
        DeclaredProviderConfiguration {
            id: id.into(),
            alias: alias.map(str::to_owned),
        }
    }

    #[test]
    fn wildcard_alone_is_all_scope() {
        let mut decl = declared();
        decl.remote_state_consumers = vec!["*".into()];
        let desired = extractor().extract(&decl).expect("extract");
        assert_eq!(desired.remote_state_consumers, ShareScope::All);
    }

    #[test]
    fn wildcard_mixed_with_ids_is_rejected() {
        let mut decl = declared();
        decl.remote_state_consumers = vec!["*".into(), "env-1".into()];
        assert_eq!(
            extractor().extract(&decl).unwrap_err(),
            ValidationError::WildcardMixed {
                field: "remote_state_consumers"
            }
        );
    }

    #[test]
    fn absent_consumers_are_explicit_empty() {
        let desired = extractor().extract(&declared()).expect("extract");
        assert_eq!(desired.remote_state_consumers, ShareScope::default());
        assert!(desired.tags.is_empty());
    }

    #[test]
    fn provider_links_differing_by_alias_are_distinct() {
        let mut decl = declared();
        decl.provider_configuration = vec![
            link("pcfg-1", None),
            link("pcfg-1", Some("")),
            link("pcfg-1", Some("east")),
        ];
        let desired = extractor().extract(&decl).expect("extract");
        assert_eq!(
            desired.provider_configurations,
            BTreeSet::from([
                LinkedItem::new("pcfg-1"),
                LinkedItem::with_alias("pcfg-1", "east")
            ])
        );
    }

    #[test]
    fn duplicate_tags_collapse() {
        let mut decl = declared();
        decl.tag_ids = vec!["t1".into(), "t1".into(), "t2".into()];
        let desired = extractor().extract(&decl).expect("extract");
        assert_eq!(desired.tags.len(), 2);
    }

    #[test]
    fn declared_account_wins_over_default() {
        let mut decl = declared();
        decl.account_id = Some(AccountId::from("acc-own"));
        let desired = extractor().extract(&decl).expect("extract");
        assert_eq!(desired.account_id, AccountId::from("acc-own"));
    }

    #[test]
    fn missing_account_is_validation_error() {
        let err = DesiredStateExtractor::new(None)
            .extract(&declared())
            .unwrap_err();
        assert_eq!(err, ValidationError::MissingAccount);
    }

    #[rstest]
    #[case(Some(false), None, Some(ExecutionMode::Local), Some(false))]
    #[case(Some(true), None, Some(ExecutionMode::Remote), Some(true))]
    #[case(None, Some(ExecutionMode::Local), Some(ExecutionMode::Local), Some(false))]
    #[case(Some(false), Some(ExecutionMode::Local), Some(ExecutionMode::Local), Some(false))]
    #[case(None, None, None, None)]
    fn execution_mode_follows_operations(
        #[case] operations: Option<bool>,
        #[case] mode: Option<ExecutionMode>,
        #[case] expected_mode: Option<ExecutionMode>,
        #[case] expected_operations: Option<bool>,
    ) {
        let mut decl = declared();
        decl.operations = operations;
        decl.execution_mode = mode;
        let desired = extractor().extract(&decl).expect("extract");
        assert_eq!(desired.execution_mode, expected_mode);
        assert_eq!(desired.operations, expected_operations);
    }

    #[rstest]
    #[case(false, ExecutionMode::Remote)]
    #[case(true, ExecutionMode::Local)]
    fn conflicting_operations_rejected(#[case] operations: bool, #[case] mode: ExecutionMode) {
        let mut decl = declared();
        decl.operations = Some(operations);
        decl.execution_mode = Some(mode);
        assert!(matches!(
            extractor().extract(&decl),
            Err(ValidationError::ExecutionModeConflict { .. })
        ));
    }

    #[test]
    fn empty_ids_rejected() {
        let mut decl = declared();
        decl.tag_ids = vec!["".into()];
        assert_eq!(
            extractor().extract(&decl).unwrap_err(),
            ValidationError::EmptyId { field: "tag_ids" }
        );

        let mut decl = declared();
        decl.ssh_key_id = Some(String::new());
        assert_eq!(
            extractor().extract(&decl).unwrap_err(),
            ValidationError::EmptyId {
                field: "ssh_key_id"
            }
        );
    }

    #[test]
    fn vcs_repo_and_provider_required_together() {
        let mut decl = declared();
        decl.vcs_repo = Some(VcsRepo {
            identifier: "org/repo".into(),
            ..VcsRepo::default()
        });
        assert_eq!(
            extractor().extract(&decl).unwrap_err(),
            ValidationError::RepoWithoutProvider
        );

        let mut decl = declared();
        decl.vcs_provider_name = Some("github".into());
        assert_eq!(
            extractor().extract(&decl).unwrap_err(),
            ValidationError::ProviderWithoutRepo
        );
    }

    #[test]
    fn module_version_excludes_vcs() {
        let mut decl = declared();
        decl.module_version_id = Some("modver-1".into());
        decl.vcs_provider_id = Some("vcs-1".into());
        decl.vcs_repo = Some(VcsRepo::default());
        assert!(matches!(
            extractor().extract(&decl),
            Err(ValidationError::Conflict {
                first: "module_version_id",
                ..
            })
        ));
    }

    #[test]
    fn vcs_provider_by_name_is_kept_for_resolution() {
        let mut decl = declared();
        decl.vcs_provider_name = Some("github".into());
        decl.vcs_repo = Some(VcsRepo {
            identifier: "org/repo".into(),
            ..VcsRepo::default()
        });
        let desired = extractor().extract(&decl).expect("extract");
        assert_eq!(desired.vcs_provider, Some(VcsProviderRef::Name("github".into())));
        assert_eq!(desired.vcs_provider_id(), None);
    }
}
