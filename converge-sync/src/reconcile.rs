//! Reconciler — minimal deltas between desired and actual state.
//!
//! Collections are diffed by identity key only; the wildcard scope is merged
//! as a single share-flag toggle; singleton links become set/clear actions;
//! scalar attributes become one [`WorkspacePatch`].

use std::collections::BTreeSet;

use converge_core::{Hooks, LinkedItem, ShareScope, WorkspaceId};
use converge_remote::{Collection, WorkspacePatch};

use crate::desired::DesiredState;
use crate::error::SyncError;
use crate::reader::RemoteObjectState;

// ---------------------------------------------------------------------------
// Set difference
// ---------------------------------------------------------------------------

/// Items to add and remove for one collection. The two sets are disjoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconciliationDelta<T: Ord> {
    pub to_add: BTreeSet<T>,
    pub to_remove: BTreeSet<T>,
}

impl<T: Ord> Default for ReconciliationDelta<T> {
    fn default() -> Self {
        Self {
            to_add: BTreeSet::new(),
            to_remove: BTreeSet::new(),
        }
    }
}

impl<T: Ord> ReconciliationDelta<T> {
    pub fn is_empty(&self) -> bool {
        self.to_add.is_empty() && self.to_remove.is_empty()
    }
}

/// `to_add = desired \ actual`, `to_remove = actual \ desired`.
///
/// Removed items are taken from `actual`, so remote-only attributes (such as
/// a link handle) survive into the delete call.
pub fn diff_sets<T: Ord + Clone>(
    desired: &BTreeSet<T>,
    actual: &BTreeSet<T>,
) -> ReconciliationDelta<T> {
    ReconciliationDelta {
        to_add: desired.difference(actual).cloned().collect(),
        to_remove: actual.difference(desired).cloned().collect(),
    }
}

/// Delta for a collection that may be shared with everyone.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ScopeDelta {
    /// `Some(true)` turns sharing on, `Some(false)` turns it off.
    pub share_flag: Option<bool>,
    pub items: ReconciliationDelta<LinkedItem>,
}

impl ScopeDelta {
    pub fn is_empty(&self) -> bool {
        self.share_flag.is_none() && self.items.is_empty()
    }
}

/// Wildcard-aware merge.
///
/// Going to `All` removes every explicit member and sets the flag; nothing is
/// added per item. Leaving `All` clears the flag and adds the declared
/// members.
pub fn diff_scope(desired: &ShareScope, actual: &ShareScope) -> ScopeDelta {
    match (desired, actual) {
        (ShareScope::All, ShareScope::All) => ScopeDelta::default(),
        (ShareScope::All, ShareScope::Explicit(actual)) => ScopeDelta {
            share_flag: Some(true),
            items: ReconciliationDelta {
                to_add: BTreeSet::new(),
                to_remove: actual.clone(),
            },
        },
        (ShareScope::Explicit(desired), ShareScope::All) => ScopeDelta {
            share_flag: Some(false),
            items: ReconciliationDelta {
                to_add: desired.clone(),
                to_remove: BTreeSet::new(),
            },
        },
        (ShareScope::Explicit(desired), ShareScope::Explicit(actual)) => ScopeDelta {
            share_flag: None,
            items: diff_sets(desired, actual),
        },
    }
}

// ---------------------------------------------------------------------------
// Singleton links
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SingletonAction {
    #[default]
    Keep,
    Set(String),
    Clear,
}

/// Clear only what was present; set whenever the declared value is new.
pub fn singleton_action(desired: Option<&str>, actual: Option<&str>) -> SingletonAction {
    match (desired, actual) {
        (Some(d), Some(a)) if d == a => SingletonAction::Keep,
        (Some(d), _) => SingletonAction::Set(d.to_owned()),
        (None, Some(_)) => SingletonAction::Clear,
        (None, None) => SingletonAction::Keep,
    }
}

// ---------------------------------------------------------------------------
// Ordered actions
// ---------------------------------------------------------------------------

/// One remote call the apply executor will issue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    UpdateWorkspace(WorkspacePatch),
    BulkRemove(Collection, Vec<LinkedItem>),
    Delete(Collection, LinkedItem),
    ClearSshKey,
    SetShareFlag(bool),
    BulkAdd(Collection, Vec<LinkedItem>),
    Create(Collection, LinkedItem),
    SetSshKey(String),
}

impl Action {
    /// The declaration field the action converges.
    pub fn field(&self) -> &'static str {
        match self {
            Action::UpdateWorkspace(_) => "workspace",
            Action::BulkRemove(c, _)
            | Action::Delete(c, _)
            | Action::BulkAdd(c, _)
            | Action::Create(c, _) => c.field(),
            Action::ClearSshKey | Action::SetSshKey(_) => "ssh_key_id",
            Action::SetShareFlag(_) => Collection::RemoteStateConsumers.field(),
        }
    }

    /// The item key for per-item actions.
    pub fn item(&self) -> Option<String> {
        match self {
            Action::Delete(_, item) | Action::Create(_, item) => Some(item.key().to_string()),
            Action::SetSshKey(key) => Some(key.clone()),
            _ => None,
        }
    }
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        fn ids(items: &[LinkedItem]) -> String {
            items
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(", ")
        }
        match self {
            Action::UpdateWorkspace(patch) => {
                write!(f, "update workspace ({})", patch.fields().join(", "))
            }
            Action::BulkRemove(c, items) => write!(f, "remove {c}: {}", ids(items)),
            Action::Delete(c, item) => write!(f, "remove {c}: {item}"),
            Action::ClearSshKey => write!(f, "clear ssh_key_id"),
            Action::SetShareFlag(shared) => write!(f, "set remote state sharing = {shared}"),
            Action::BulkAdd(c, items) => write!(f, "add {c}: {}", ids(items)),
            Action::Create(c, item) => write!(f, "add {c}: {item}"),
            Action::SetSshKey(key) => write!(f, "set ssh_key_id = {key}"),
        }
    }
}

// ---------------------------------------------------------------------------
// Plan
// ---------------------------------------------------------------------------

/// Everything needed to converge one workspace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkspacePlan {
    pub workspace_id: WorkspaceId,
    pub patch: WorkspacePatch,
    pub tags: ReconciliationDelta<LinkedItem>,
    pub provider_configurations: ReconciliationDelta<LinkedItem>,
    pub remote_state_consumers: ScopeDelta,
    pub ssh_key: SingletonAction,
}

impl WorkspacePlan {
    pub fn is_empty(&self) -> bool {
        self.patch.is_empty()
            && self.tags.is_empty()
            && self.provider_configurations.is_empty()
            && self.remote_state_consumers.is_empty()
            && self.ssh_key == SingletonAction::Keep
    }

    /// Remote calls in execution order: patch, removals, share flag,
    /// additions.
    pub fn actions(&self) -> Vec<Action> {
        let mut actions = Vec::new();
        if !self.patch.is_empty() {
            actions.push(Action::UpdateWorkspace(self.patch.clone()));
        }

        push_removals(&mut actions, Collection::Tags, &self.tags.to_remove);
        push_removals(
            &mut actions,
            Collection::ProviderConfigurations,
            &self.provider_configurations.to_remove,
        );
        push_removals(
            &mut actions,
            Collection::RemoteStateConsumers,
            &self.remote_state_consumers.items.to_remove,
        );
        if self.ssh_key == SingletonAction::Clear {
            actions.push(Action::ClearSshKey);
        }

        if let Some(shared) = self.remote_state_consumers.share_flag {
            actions.push(Action::SetShareFlag(shared));
        }

        push_additions(&mut actions, Collection::Tags, &self.tags.to_add);
        push_additions(
            &mut actions,
            Collection::ProviderConfigurations,
            &self.provider_configurations.to_add,
        );
        push_additions(
            &mut actions,
            Collection::RemoteStateConsumers,
            &self.remote_state_consumers.items.to_add,
        );
        if let SingletonAction::Set(key) = &self.ssh_key {
            actions.push(Action::SetSshKey(key.clone()));
        }
        actions
    }
}

fn push_removals(
    actions: &mut Vec<Action>,
    collection: Collection,
    items: &BTreeSet<LinkedItem>,
) {
    if items.is_empty() {
        return;
    }
    if collection.supports_bulk() {
        actions.push(Action::BulkRemove(collection, items.iter().cloned().collect()));
    } else {
        actions.extend(items.iter().cloned().map(|i| Action::Delete(collection, i)));
    }
}

fn push_additions(
    actions: &mut Vec<Action>,
    collection: Collection,
    items: &BTreeSet<LinkedItem>,
) {
    if items.is_empty() {
        return;
    }
    if collection.supports_bulk() {
        actions.push(Action::BulkAdd(collection, items.iter().cloned().collect()));
    } else {
        actions.extend(items.iter().cloned().map(|i| Action::Create(collection, i)));
    }
}

/// Compute the plan that converges `actual` to `desired`.
///
/// A declared `environment_id` that differs from the remote one cannot be
/// changed in place and yields [`SyncError::ReplaceRequired`].
pub fn plan(
    desired: &DesiredState,
    actual: &RemoteObjectState,
) -> Result<WorkspacePlan, SyncError> {
    if let Some(env) = &desired.environment_id {
        if env != &actual.workspace.environment_id {
            return Err(SyncError::ReplaceRequired {
                field: "environment_id",
            });
        }
    }
    Ok(WorkspacePlan {
        workspace_id: actual.id().clone(),
        patch: scalar_patch(desired, actual),
        tags: diff_sets(&desired.tags, &actual.tags),
        provider_configurations: diff_sets(
            &desired.provider_configurations,
            &actual.provider_configurations,
        ),
        remote_state_consumers: diff_scope(
            &desired.remote_state_consumers,
            &actual.remote_state_consumers,
        ),
        ssh_key: singleton_action(desired.ssh_key_id.as_deref(), actual.ssh_key_id()),
    })
}

/// `Some(desired)` when managed and different from `actual`.
fn changed<T: PartialEq + Clone>(desired: &Option<T>, actual: &T) -> Option<T> {
    desired.as_ref().filter(|d| *d != actual).cloned()
}

/// `Some(desired)` when the absolute value differs from `actual`.
fn replaced<T: PartialEq + Clone>(desired: &Option<T>, actual: &Option<T>) -> Option<Option<T>> {
    (desired != actual).then(|| desired.clone())
}

fn hooks_equal(desired: &Hooks, actual: Option<&Hooks>) -> bool {
    match actual {
        Some(actual) => desired == actual,
        None => desired == &Hooks::default(),
    }
}

fn scalar_patch(desired: &DesiredState, actual: &RemoteObjectState) -> WorkspacePatch {
    let ws = &actual.workspace;
    WorkspacePatch {
        name: changed(&Some(desired.name.clone()), &ws.name),
        auto_apply: changed(&desired.auto_apply, &ws.auto_apply),
        auto_queue_runs: changed(&desired.auto_queue_runs, &ws.auto_queue_runs),
        deletion_protection_enabled: changed(
            &desired.deletion_protection_enabled,
            &ws.deletion_protection_enabled,
        ),
        execution_mode: changed(&desired.execution_mode, &ws.execution_mode),
        force_latest_run: changed(&desired.force_latest_run, &ws.force_latest_run),
        iac_platform: changed(&desired.iac_platform, &ws.iac_platform),
        operations: changed(&desired.operations, &ws.operations),
        terraform_version: desired
            .terraform_version
            .as_ref()
            .filter(|v| ws.terraform_version.as_ref() != Some(*v))
            .cloned(),
        working_directory: changed(&desired.working_directory, &ws.working_directory),
        environment_type: changed(&desired.environment_type, &ws.environment_type),
        var_files: changed(&desired.var_files, &ws.var_files),
        run_operation_timeout: desired
            .run_operation_timeout
            .filter(|t| ws.run_operation_timeout != Some(*t)),
        agent_pool_id: replaced(&desired.agent_pool_id, &ws.agent_pool_id),
        module_version_id: replaced(&desired.module_version_id, &ws.module_version_id),
        vcs_provider_id: replaced(
            &desired.vcs_provider_id().map(str::to_owned),
            &ws.vcs_provider_id,
        ),
        vcs_repo: replaced(&desired.vcs_repo, &ws.vcs_repo),
        hooks: desired
            .hooks
            .as_ref()
            .filter(|h| !hooks_equal(h, ws.hooks.as_ref()))
            .map(|h| Some(h.clone())),
        terragrunt: desired
            .terragrunt
            .as_ref()
            .filter(|t| ws.terragrunt.as_ref() != Some(*t))
            .map(|t| Some(t.clone())),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use converge_core::{AccountId, DeclaredConfiguration, ExecutionMode, RemoteWorkspace};

    use super::*;
    use crate::desired::DesiredStateExtractor;

    fn set(ids: &[&str]) -> BTreeSet<LinkedItem> {
        ids.iter().map(|id| LinkedItem::new(*id)).collect()
    }

    fn actual() -> RemoteObjectState {
        RemoteObjectState {
            workspace: RemoteWorkspace::new("ws-1", "core", "env-1"),
            tags: BTreeSet::new(),
            provider_configurations: BTreeSet::new(),
            remote_state_consumers: ShareScope::default(),
        }
    }

    fn desired(decl: DeclaredConfiguration) -> DesiredState {
        DesiredStateExtractor::new(Some(AccountId::from("acc-1")))
            .extract(&decl)
            .expect("extract")
    }

    #[test]
    fn tag_scenario() {
        let delta = diff_sets(&set(&["t2", "t3"]), &set(&["t1", "t2"]));
        assert_eq!(delta.to_add, set(&["t3"]));
        assert_eq!(delta.to_remove, set(&["t1"]));
    }

    #[test]
    fn alias_change_is_remove_then_add() {
        let actual = BTreeSet::from([LinkedItem::new("cfgA")]);
        let desired = BTreeSet::from([LinkedItem::with_alias("cfgA", "x")]);
        let delta = diff_sets(&desired, &actual);
        assert_eq!(delta.to_remove, actual);
        assert_eq!(delta.to_add, desired);
    }

    #[test]
    fn removals_keep_remote_link_handle() {
        let actual = BTreeSet::from([LinkedItem::new("pcfg-1").with_link_id("l-7")]);
        let delta = diff_sets(&BTreeSet::new(), &actual);
        let removed = delta.to_remove.iter().next().expect("one");
        assert_eq!(removed.link_id.as_deref(), Some("l-7"));
    }

    #[test]
    fn explicit_to_wildcard_sets_flag_and_removes_members() {
        let delta = diff_scope(
            &ShareScope::All,
            &ShareScope::Explicit(set(&["ws-1", "ws-2"])),
        );
        assert_eq!(delta.share_flag, Some(true));
        assert_eq!(delta.items.to_remove, set(&["ws-1", "ws-2"]));
        assert!(delta.items.to_add.is_empty());
    }

    #[test]
    fn wildcard_to_explicit_clears_flag_and_adds_members() {
        let delta = diff_scope(&ShareScope::Explicit(set(&["ws-3"])), &ShareScope::All);
        assert_eq!(delta.share_flag, Some(false));
        assert_eq!(delta.items.to_add, set(&["ws-3"]));
        assert!(delta.items.to_remove.is_empty());
    }

    #[test]
    fn wildcard_on_both_sides_is_empty() {
        assert!(diff_scope(&ShareScope::All, &ShareScope::All).is_empty());
    }

    #[test]
    fn singleton_rules() {
        assert_eq!(singleton_action(None, None), SingletonAction::Keep);
        assert_eq!(singleton_action(None, Some("k1")), SingletonAction::Clear);
        assert_eq!(singleton_action(Some("k1"), Some("k1")), SingletonAction::Keep);
        assert_eq!(
            singleton_action(Some("k2"), Some("k1")),
            SingletonAction::Set("k2".into())
        );
        assert_eq!(
            singleton_action(Some("k1"), None),
            SingletonAction::Set("k1".into())
        );
    }

    #[test]
    fn matching_state_yields_empty_plan() {
        let plan = plan(&desired(DeclaredConfiguration::named("core")), &actual()).expect("plan");
        assert!(plan.is_empty());
        assert!(plan.actions().is_empty());
    }

    #[test]
    fn environment_change_requires_replace() {
        let mut decl = DeclaredConfiguration::named("core");
        decl.environment_id = Some("env-2".into());
        let err = plan(&desired(decl), &actual()).unwrap_err();
        assert!(matches!(
            err,
            SyncError::ReplaceRequired {
                field: "environment_id"
            }
        ));
    }

    #[test]
    fn patch_contains_only_changed_managed_fields() {
        let mut decl = DeclaredConfiguration::named("core");
        decl.auto_apply = Some(true);
        decl.working_directory = Some(String::new());
        decl.execution_mode = Some(ExecutionMode::Local);
        let mut actual = actual();
        actual.workspace.agent_pool_id = Some("pool-1".into());
        let plan = plan(&desired(decl), &actual).expect("plan");
        assert_eq!(
            plan.patch.fields(),
            vec![
                "auto_apply",
                "execution_mode",
                "operations",
                "agent_pool_id"
            ]
        );
        assert_eq!(plan.patch.agent_pool_id, Some(None));
    }

    #[test]
    fn empty_hooks_block_matches_absent_remote_hooks() {
        let mut decl = DeclaredConfiguration::named("core");
        decl.hooks = Some(Hooks::default());
        let plan = plan(&desired(decl), &actual()).expect("plan");
        assert!(plan.patch.hooks.is_none());
    }

    #[test]
    fn actions_are_ordered_removals_flag_additions() {
        let mut decl = DeclaredConfiguration::named("renamed");
        decl.tag_ids = vec!["t2".into()];
        decl.provider_configuration = vec![converge_core::DeclaredProviderConfiguration {
            id: "cfgA".into(),
            alias: Some("x".into()),
        }];
        decl.remote_state_consumers = vec!["*".into()];
        decl.ssh_key_id = Some("key-2".into());
        let mut actual = actual();
        actual.tags = set(&["t1"]);
        actual.provider_configurations = set(&["cfgA"]);
        actual.remote_state_consumers = ShareScope::Explicit(set(&["ws-9"]));
        actual.workspace.ssh_key_id = Some("key-1".into());

        let actions = plan(&desired(decl), &actual).expect("plan").actions();
        assert_eq!(
            actions,
            vec![
                Action::UpdateWorkspace(WorkspacePatch {
                    name: Some("renamed".into()),
                    ..WorkspacePatch::default()
                }),
                Action::BulkRemove(Collection::Tags, vec![LinkedItem::new("t1")]),
                Action::Delete(Collection::ProviderConfigurations, LinkedItem::new("cfgA")),
                Action::BulkRemove(
                    Collection::RemoteStateConsumers,
                    vec![LinkedItem::new("ws-9")]
                ),
                Action::SetShareFlag(true),
                Action::BulkAdd(Collection::Tags, vec![LinkedItem::new("t2")]),
                Action::Create(
                    Collection::ProviderConfigurations,
                    LinkedItem::with_alias("cfgA", "x")
                ),
                Action::SetSshKey("key-2".into()),
            ]
        );
    }
}
