//! End-to-end reconciliation against the in-memory remote.

use std::collections::BTreeSet;

use converge_core::{
    AccountId, DeclaredConfiguration, DeclaredProviderConfiguration, LinkedItem, RemoteWorkspace,
    VcsRepo, WorkspaceId,
};
use converge_remote::{
    CallKind, Collection, InMemoryRemote, RemoteCall, RemoteFixture, VcsProvider, WorkspaceRecord,
};
use converge_sync::{
    reconcile, ActionOutcome, DesiredStateExtractor, ReconcileOptions, ReconcileOutcome,
    RemoteStateReader, SyncError,
};

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn ws_id() -> WorkspaceId {
    WorkspaceId::from("ws-1")
}

fn extractor() -> DesiredStateExtractor {
    DesiredStateExtractor::new(Some(AccountId::from("acc-1")))
}

fn record() -> WorkspaceRecord {
    WorkspaceRecord::new(RemoteWorkspace::new("ws-1", "core", "env-1"))
}

fn ids(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

fn run(
    remote: &InMemoryRemote,
    decl: &DeclaredConfiguration,
) -> Result<ReconcileOutcome, SyncError> {
    reconcile(remote, &extractor(), decl, &ws_id(), ReconcileOptions::default())
}

#[test]
fn tags_converge_with_one_bulk_call_each_way() {
    init_logging();
    let mut record = record();
    record.tags = vec![LinkedItem::new("t1"), LinkedItem::new("t2")];
    let remote = InMemoryRemote::with_workspace(record);
    let mut decl = DeclaredConfiguration::named("core");
    decl.tag_ids = ids(&["t2", "t3"]);

    let outcome = run(&remote, &decl).expect("reconcile");

    assert_eq!(
        remote.mutations(),
        vec![
            RemoteCall::BulkRemove(Collection::Tags, vec![LinkedItem::new("t1")]),
            RemoteCall::BulkAdd(Collection::Tags, vec![LinkedItem::new("t3")]),
        ]
    );
    let model = outcome.model.expect("model");
    assert_eq!(model.tag_ids, BTreeSet::from(["t2".to_owned(), "t3".to_owned()]));
}

#[test]
fn consumers_to_wildcard_toggle_flag_and_remove_members() {
    init_logging();
    let mut record = record();
    record.remote_state_consumers = vec![LinkedItem::new("ws-1"), LinkedItem::new("ws-2")];
    let remote = InMemoryRemote::with_workspace(record);
    let mut decl = DeclaredConfiguration::named("core");
    decl.remote_state_consumers = ids(&["*"]);

    let outcome = run(&remote, &decl).expect("reconcile");

    assert_eq!(
        remote.mutations(),
        vec![
            RemoteCall::BulkRemove(
                Collection::RemoteStateConsumers,
                vec![LinkedItem::new("ws-1"), LinkedItem::new("ws-2")]
            ),
            RemoteCall::SetShareFlag(true),
        ]
    );
    let model = outcome.model.expect("model");
    assert_eq!(model.remote_state_consumers, BTreeSet::from(["*".to_owned()]));
}

#[test]
fn leaving_wildcard_clears_flag_before_adding() {
    let mut record = record();
    record.workspace.remote_state_sharing = true;
    let remote = InMemoryRemote::with_workspace(record);
    let mut decl = DeclaredConfiguration::named("core");
    decl.remote_state_consumers = ids(&["ws-7"]);

    run(&remote, &decl).expect("reconcile");

    assert_eq!(
        remote.mutations(),
        vec![
            RemoteCall::SetShareFlag(false),
            RemoteCall::BulkAdd(
                Collection::RemoteStateConsumers,
                vec![LinkedItem::new("ws-7")]
            ),
        ]
    );
}

#[test]
fn alias_change_deletes_old_link_before_creating_new() {
    let mut record = record();
    record.provider_configurations = vec![LinkedItem::new("cfgA").with_link_id("l-1")];
    let remote = InMemoryRemote::with_workspace(record);
    let mut decl = DeclaredConfiguration::named("core");
    decl.provider_configuration = vec![DeclaredProviderConfiguration {
        id: "cfgA".into(),
        alias: Some("x".into()),
    }];

    let outcome = run(&remote, &decl).expect("reconcile");

    let mutations = remote.mutations();
    assert_eq!(mutations.len(), 2);
    assert!(matches!(
        &mutations[0],
        RemoteCall::Delete(Collection::ProviderConfigurations, item) if item.alias().is_empty()
    ));
    assert_eq!(
        mutations[1],
        RemoteCall::Create(
            Collection::ProviderConfigurations,
            LinkedItem::with_alias("cfgA", "x")
        )
    );
    let model = outcome.model.expect("model");
    let links: Vec<_> = model
        .provider_configuration
        .iter()
        .map(|l| (l.id.as_str(), l.alias.as_str()))
        .collect();
    assert_eq!(links, vec![("cfgA", "x")]);
}

#[test]
fn provider_links_are_issued_one_call_per_item() {
    let remote = InMemoryRemote::with_workspace(record());
    let mut decl = DeclaredConfiguration::named("core");
    decl.provider_configuration = ["p1", "p2", "p3"]
        .iter()
        .map(|id| DeclaredProviderConfiguration {
            id: (*id).into(),
            alias: None,
        })
        .collect();

    run(&remote, &decl).expect("reconcile");

    let creates = remote
        .mutations()
        .into_iter()
        .filter(|c| matches!(c, RemoteCall::Create(Collection::ProviderConfigurations, _)))
        .count();
    assert_eq!(creates, 3);
}

#[test]
fn second_run_issues_no_mutations() {
    let mut record = record();
    record.tags = vec![LinkedItem::new("t1")];
    record.workspace.ssh_key_id = Some("key-old".into());
    let remote = InMemoryRemote::with_workspace(record);
    let mut decl = DeclaredConfiguration::named("renamed");
    decl.tag_ids = ids(&["t2"]);
    decl.remote_state_consumers = ids(&["*"]);
    decl.ssh_key_id = Some("key-new".into());
    decl.auto_apply = Some(true);

    run(&remote, &decl).expect("first");
    remote.clear_calls();
    let outcome = run(&remote, &decl).expect("second");

    assert!(outcome.plan.is_empty());
    assert!(remote.mutations().is_empty());
}

#[test]
fn ssh_key_cleared_when_declared_absent() {
    let mut record = record();
    record.workspace.ssh_key_id = Some("key-1".into());
    let remote = InMemoryRemote::with_workspace(record);

    run(&remote, &DeclaredConfiguration::named("core")).expect("reconcile");

    assert_eq!(remote.mutations(), vec![RemoteCall::ClearSshKey]);
}

#[test]
fn removals_precede_additions_across_collections() {
    let mut record = record();
    record.tags = vec![LinkedItem::new("t-old")];
    record.remote_state_consumers = vec![LinkedItem::new("ws-old")];
    let remote = InMemoryRemote::with_workspace(record);
    let mut decl = DeclaredConfiguration::named("core");
    decl.tag_ids = ids(&["t-new"]);
    decl.remote_state_consumers = ids(&["ws-new"]);

    run(&remote, &decl).expect("reconcile");

    let kinds: Vec<&str> = remote
        .mutations()
        .iter()
        .map(|c| match c {
            RemoteCall::BulkRemove(..) | RemoteCall::Delete(..) => "remove",
            RemoteCall::BulkAdd(..) | RemoteCall::Create(..) => "add",
            _ => "other",
        })
        .collect();
    assert_eq!(kinds, vec!["remove", "remove", "add", "add"]);
}

#[test]
fn failed_write_stops_and_leaves_earlier_changes() {
    let mut record = record();
    record.tags = vec![LinkedItem::new("t1")];
    let remote = InMemoryRemote::with_workspace(record);
    remote.fail_on(CallKind::BulkAdd(Collection::Tags), 500);
    let mut decl = DeclaredConfiguration::named("core");
    decl.tag_ids = ids(&["t2"]);
    decl.ssh_key_id = Some("key-1".into());

    let err = run(&remote, &decl).unwrap_err();

    assert!(matches!(err, SyncError::RemoteWrite { field: "tag_ids", .. }));
    let mutations = remote.mutations();
    assert_eq!(mutations.len(), 2, "remove succeeded, add failed, ssh never tried");
    let state = RemoteStateReader::new(&remote).read(&ws_id()).expect("read");
    assert!(state.tags.is_empty());
    assert_eq!(state.ssh_key_id(), None);
}

#[test]
fn missing_workspace_surfaces_not_found() {
    let remote = InMemoryRemote::new(RemoteFixture::default());
    let err = run(&remote, &DeclaredConfiguration::named("core")).unwrap_err();
    assert!(err.is_not_found());
}

#[test]
fn vcs_provider_name_is_resolved_before_patching() {
    let mut fixture = RemoteFixture::default();
    fixture.workspaces.insert(ws_id(), record());
    fixture.vcs_providers = vec![VcsProvider {
        id: "vcs-9".into(),
        name: "github-enterprise".into(),
        vcs_type: "github".into(),
        account_ids: vec![AccountId::from("acc-1")],
    }];
    let remote = InMemoryRemote::new(fixture);
    let mut decl = DeclaredConfiguration::named("core");
    decl.vcs_provider_name = Some("github".into());
    decl.vcs_repo = Some(VcsRepo {
        identifier: "org/repo".into(),
        dry_runs_enabled: true,
        ..VcsRepo::default()
    });

    let outcome = run(&remote, &decl).expect("reconcile");

    assert_eq!(outcome.plan.patch.vcs_provider_id, Some(Some("vcs-9".into())));
    let model = outcome.model.expect("model");
    assert_eq!(model.vcs_provider_id.as_deref(), Some("vcs-9"));
    assert_eq!(model.vcs_repo.map(|r| r.identifier), Some("org/repo".into()));
}

#[test]
fn dry_run_reports_actions_in_apply_order() {
    let mut record = record();
    record.tags = vec![LinkedItem::new("t1")];
    let remote = InMemoryRemote::with_workspace(record);
    let mut decl = DeclaredConfiguration::named("core");
    decl.tag_ids = ids(&["t2"]);

    let outcome = reconcile(
        &remote,
        &extractor(),
        &decl,
        &ws_id(),
        ReconcileOptions {
            dry_run: true,
            ..ReconcileOptions::default()
        },
    )
    .expect("reconcile");

    let rendered: Vec<String> = outcome
        .outcomes
        .iter()
        .map(|o| {
            assert!(matches!(o, ActionOutcome::WouldApply(_)));
            o.action().to_string()
        })
        .collect();
    assert_eq!(rendered, vec!["remove tag_ids: t1", "add tag_ids: t2"]);
    assert!(remote.mutations().is_empty());
}
