//! Remote state reader.
//!
//! Fetches a workspace and every linked collection, normalising them into the
//! canonical shapes the reconciler diffs against. Reads only; nothing here
//! is cached between invocations.

use std::collections::BTreeSet;

use converge_core::{AccountId, LinkedItem, RemoteWorkspace, ShareScope, WorkspaceId};
use converge_remote::{
    collect_all, Collection, ListOptions, RemoteApi, VcsProvider, VcsProviderFilter,
};

use crate::error::SyncError;

/// Page size requested when the caller does not configure one.
pub const DEFAULT_PAGE_SIZE: u32 = 100;

/// Current state of one workspace as read from the remote.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteObjectState {
    pub workspace: RemoteWorkspace,
    pub tags: BTreeSet<LinkedItem>,
    pub provider_configurations: BTreeSet<LinkedItem>,
    /// `All` when remote-state sharing is on.
    pub remote_state_consumers: ShareScope,
}

impl RemoteObjectState {
    pub fn id(&self) -> &WorkspaceId {
        &self.workspace.id
    }

    pub fn ssh_key_id(&self) -> Option<&str> {
        self.workspace.ssh_key_id.as_deref()
    }
}

pub struct RemoteStateReader<'a, A: RemoteApi + ?Sized> {
    api: &'a A,
    page_size: u32,
}

impl<'a, A: RemoteApi + ?Sized> RemoteStateReader<'a, A> {
    pub fn new(api: &'a A) -> Self {
        Self {
            api,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }

    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    /// Read the workspace and all of its linked collections.
    ///
    /// A missing workspace (at any point during the read) is reported as
    /// [`SyncError::NotFound`], never as an empty collection.
    pub fn read(&self, id: &WorkspaceId) -> Result<RemoteObjectState, SyncError> {
        tracing::debug!("reading workspace {id}");
        let workspace = self
            .api
            .get_workspace(id)
            .map_err(|e| SyncError::read(id, "workspace", e))?;
        let tags = self.list(id, Collection::Tags)?;
        let provider_configurations = self.list(id, Collection::ProviderConfigurations)?;
        let remote_state_consumers = if workspace.remote_state_sharing {
            ShareScope::All
        } else {
            ShareScope::Explicit(self.list(id, Collection::RemoteStateConsumers)?)
        };
        Ok(RemoteObjectState {
            workspace,
            tags,
            provider_configurations,
            remote_state_consumers,
        })
    }

    /// Every item of one linked collection, keyed by identity.
    pub fn list(
        &self,
        id: &WorkspaceId,
        collection: Collection,
    ) -> Result<BTreeSet<LinkedItem>, SyncError> {
        let items = collect_all(|page_number| {
            self.api.list_page(
                id,
                collection,
                ListOptions {
                    page_number,
                    page_size: self.page_size,
                },
            )
        })
        .map_err(|e| SyncError::read(id, collection.field(), e))?;
        tracing::debug!("{id}: {} {collection} item(s)", items.len());
        Ok(items.into_iter().collect())
    }

    /// Resolve a VCS provider name to its id within `account`.
    ///
    /// An exact-name listing is tried first. Only when it returns nothing is
    /// the name retried as a substring query. More than one match at either
    /// stage is an error. No other lookup falls back this way.
    pub fn resolve_vcs_provider(
        &self,
        name: &str,
        account: &AccountId,
    ) -> Result<String, SyncError> {
        let exact = self.list_vcs_providers(VcsProviderFilter {
            account_id: Some(account.clone()),
            name: Some(name.to_owned()),
            query: None,
        })?;
        let candidates = if exact.is_empty() {
            tracing::debug!("no VCS provider named {name:?}; retrying as substring query");
            self.list_vcs_providers(VcsProviderFilter {
                account_id: Some(account.clone()),
                name: None,
                query: Some(name.to_owned()),
            })?
        } else {
            exact
        };
        match candidates.as_slice() {
            [only] => Ok(only.id.clone()),
            [] => Err(SyncError::VcsProvider {
                name: name.to_owned(),
                reason: format!("no provider found in account {account}"),
            }),
            many => Err(SyncError::VcsProvider {
                name: name.to_owned(),
                reason: format!("{} providers match; use vcs_provider_id", many.len()),
            }),
        }
    }

    fn list_vcs_providers(&self, filter: VcsProviderFilter) -> Result<Vec<VcsProvider>, SyncError> {
        collect_all(|page_number| {
            self.api.list_vcs_providers(
                &filter,
                ListOptions {
                    page_number,
                    page_size: self.page_size,
                },
            )
        })
        .map_err(|source| SyncError::RemoteRead {
            field: "vcs_provider_id",
            source,
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use converge_remote::{CallKind, InMemoryRemote, RemoteCall, RemoteFixture, WorkspaceRecord};

    use super::*;

    fn record() -> WorkspaceRecord {
        let mut record = WorkspaceRecord::new(RemoteWorkspace::new("ws-1", "core", "env-1"));
        record.tags = vec![LinkedItem::new("tag-2"), LinkedItem::new("tag-1")];
        record.provider_configurations = vec![
            LinkedItem::new("pcfg-1").with_link_id("l-1"),
            LinkedItem::with_alias("pcfg-1", "east").with_link_id("l-2"),
        ];
        record.remote_state_consumers = vec![LinkedItem::new("ws-9")];
        record
    }

    fn provider(id: &str, name: &str) -> VcsProvider {
        VcsProvider {
            id: id.into(),
            name: name.into(),
            vcs_type: "github".into(),
            account_ids: vec![AccountId::from("acc-1")],
        }
    }

    #[test]
    fn reads_all_collections_across_pages() {
        let remote = InMemoryRemote::with_workspace(record()).with_page_size(1);
        let state = RemoteStateReader::new(&remote)
            .read(&WorkspaceId::from("ws-1"))
            .expect("read");
        assert_eq!(state.tags.len(), 2);
        assert_eq!(state.provider_configurations.len(), 2);
        assert_eq!(
            state.remote_state_consumers,
            ShareScope::Explicit(BTreeSet::from([LinkedItem::new("ws-9")]))
        );
    }

    #[test]
    fn sharing_flag_reads_as_wildcard_without_listing_consumers() {
        let mut record = record();
        record.workspace.remote_state_sharing = true;
        let remote = InMemoryRemote::with_workspace(record);
        let state = RemoteStateReader::new(&remote)
            .read(&WorkspaceId::from("ws-1"))
            .expect("read");
        assert!(state.remote_state_consumers.is_all());
        assert!(!remote
            .calls()
            .contains(&RemoteCall::List(Collection::RemoteStateConsumers, 1)));
    }

    #[test]
    fn missing_workspace_is_not_found() {
        let remote = InMemoryRemote::new(RemoteFixture::default());
        let err = RemoteStateReader::new(&remote)
            .read(&WorkspaceId::from("ws-1"))
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn failed_listing_names_the_collection() {
        let remote = InMemoryRemote::with_workspace(record());
        remote.fail_on(CallKind::List(Collection::ProviderConfigurations), 500);
        let err = RemoteStateReader::new(&remote)
            .read(&WorkspaceId::from("ws-1"))
            .unwrap_err();
        assert!(matches!(
            err,
            SyncError::RemoteRead {
                field: "provider_configuration",
                ..
            }
        ));
    }

    #[test]
    fn vcs_provider_exact_match_wins_over_substring() {
        let mut fixture = RemoteFixture::default();
        fixture.vcs_providers = vec![provider("vcs-1", "github"), provider("vcs-2", "github-old")];
        let remote = InMemoryRemote::new(fixture);
        let id = RemoteStateReader::new(&remote)
            .resolve_vcs_provider("github", &AccountId::from("acc-1"))
            .expect("resolve");
        assert_eq!(id, "vcs-1");
    }

    #[test]
    fn vcs_provider_falls_back_to_substring() {
        let mut fixture = RemoteFixture::default();
        fixture.vcs_providers = vec![provider("vcs-2", "github-old")];
        let remote = InMemoryRemote::new(fixture);
        let id = RemoteStateReader::new(&remote)
            .resolve_vcs_provider("github", &AccountId::from("acc-1"))
            .expect("resolve");
        assert_eq!(id, "vcs-2");
        assert_eq!(
            remote.calls(),
            vec![RemoteCall::ListVcsProviders(1), RemoteCall::ListVcsProviders(1)]
        );
    }

    #[test]
    fn vcs_provider_ambiguous_substring_is_error() {
        let mut fixture = RemoteFixture::default();
        fixture.vcs_providers = vec![provider("vcs-2", "github-a"), provider("vcs-3", "github-b")];
        let remote = InMemoryRemote::new(fixture);
        let err = RemoteStateReader::new(&remote)
            .resolve_vcs_provider("github", &AccountId::from("acc-1"))
            .unwrap_err();
        assert!(matches!(err, SyncError::VcsProvider { .. }));
    }

    #[test]
    fn vcs_provider_in_other_account_is_not_found() {
        let mut fixture = RemoteFixture::default();
        fixture.vcs_providers = vec![provider("vcs-1", "github")];
        let remote = InMemoryRemote::new(fixture);
        let err = RemoteStateReader::new(&remote)
            .resolve_vcs_provider("github", &AccountId::from("acc-2"))
            .unwrap_err();
        assert!(matches!(err, SyncError::VcsProvider { .. }));
    }
}
