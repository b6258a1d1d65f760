//! In-memory remote.
//!
//! Holds a [`RemoteFixture`] (loadable from JSON) and records every call in
//! order so callers can assert on exactly what was issued. Used by the test
//! suites and by `converge --offline`.

use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use converge_core::{LinkedItem, RemoteWorkspace, WorkspaceId};

use crate::api::{
    Collection, ListOptions, RemoteApi, VcsProvider, VcsProviderFilter, WorkspacePatch,
};
use crate::error::RemoteError;
use crate::page::Page;

// ---------------------------------------------------------------------------
// Fixture
// ---------------------------------------------------------------------------

/// A workspace together with its linked collections.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkspaceRecord {
    #[serde(flatten)]
    pub workspace: RemoteWorkspace,
    #[serde(default)]
    pub tags: Vec<LinkedItem>,
    #[serde(default)]
    pub provider_configurations: Vec<LinkedItem>,
    #[serde(default)]
    pub remote_state_consumers: Vec<LinkedItem>,
}

impl WorkspaceRecord {
    pub fn new(workspace: RemoteWorkspace) -> Self {
        Self {
            workspace,
            tags: Vec::new(),
            provider_configurations: Vec::new(),
            remote_state_consumers: Vec::new(),
        }
    }

    fn items(&self, collection: Collection) -> &Vec<LinkedItem> {
        match collection {
            Collection::Tags => &self.tags,
            Collection::ProviderConfigurations => &self.provider_configurations,
            Collection::RemoteStateConsumers => &self.remote_state_consumers,
        }
    }

    fn items_mut(&mut self, collection: Collection) -> &mut Vec<LinkedItem> {
        match collection {
            Collection::Tags => &mut self.tags,
            Collection::ProviderConfigurations => &mut self.provider_configurations,
            Collection::RemoteStateConsumers => &mut self.remote_state_consumers,
        }
    }
}

/// Full state of an in-memory remote.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteFixture {
    #[serde(default)]
    pub workspaces: BTreeMap<WorkspaceId, WorkspaceRecord>,
    #[serde(default)]
    pub vcs_providers: Vec<VcsProvider>,
}

// ---------------------------------------------------------------------------
// Call log
// ---------------------------------------------------------------------------

/// One recorded call, in the order issued.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteCall {
    Get(WorkspaceId),
    List(Collection, u32),
    Create(Collection, LinkedItem),
    Delete(Collection, LinkedItem),
    BulkAdd(Collection, Vec<LinkedItem>),
    BulkRemove(Collection, Vec<LinkedItem>),
    SetShareFlag(bool),
    SetSshKey(String),
    ClearSshKey,
    Update(WorkspacePatch),
    ListVcsProviders(u32),
}

impl RemoteCall {
    /// Whether the call changes remote state.
    pub fn is_mutation(&self) -> bool {
        !matches!(
            self,
            RemoteCall::Get(_) | RemoteCall::List(..) | RemoteCall::ListVcsProviders(_)
        )
    }

    fn kind(&self) -> CallKind {
        match self {
            RemoteCall::Get(_) => CallKind::Get,
            RemoteCall::List(c, _) => CallKind::List(*c),
            RemoteCall::Create(c, _) => CallKind::Create(*c),
            RemoteCall::Delete(c, _) => CallKind::Delete(*c),
            RemoteCall::BulkAdd(c, _) => CallKind::BulkAdd(*c),
            RemoteCall::BulkRemove(c, _) => CallKind::BulkRemove(*c),
            RemoteCall::SetShareFlag(_) => CallKind::SetShareFlag,
            RemoteCall::SetSshKey(_) => CallKind::SetSshKey,
            RemoteCall::ClearSshKey => CallKind::ClearSshKey,
            RemoteCall::Update(_) => CallKind::Update,
            RemoteCall::ListVcsProviders(_) => CallKind::ListVcsProviders,
        }
    }
}

/// Selector for failure injection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallKind {
    Get,
    List(Collection),
    Create(Collection),
    Delete(Collection),
    BulkAdd(Collection),
    BulkRemove(Collection),
    SetShareFlag,
    SetSshKey,
    ClearSshKey,
    Update,
    ListVcsProviders,
}

// ---------------------------------------------------------------------------
// Remote
// ---------------------------------------------------------------------------

/// Single-threaded in-memory [`RemoteApi`].
#[derive(Debug)]
pub struct InMemoryRemote {
    state: RefCell<RemoteFixture>,
    calls: RefCell<Vec<RemoteCall>>,
    failures: RefCell<Vec<(CallKind, u16)>>,
    page_size: u32,
    next_link: Cell<u64>,
}

impl InMemoryRemote {
    pub fn new(fixture: RemoteFixture) -> Self {
        Self {
            state: RefCell::new(fixture),
            calls: RefCell::new(Vec::new()),
            failures: RefCell::new(Vec::new()),
            page_size: 20,
            next_link: Cell::new(1),
        }
    }

    /// Override the page size used for listings (minimum 1).
    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    /// Convenience: a remote holding a single workspace.
    pub fn with_workspace(record: WorkspaceRecord) -> Self {
        let mut fixture = RemoteFixture::default();
        fixture
            .workspaces
            .insert(record.workspace.id.clone(), record);
        Self::new(fixture)
    }

    /// Make every subsequent call of `kind` fail with status `code`.
    pub fn fail_on(&self, kind: CallKind, code: u16) {
        self.failures.borrow_mut().push((kind, code));
    }

    pub fn calls(&self) -> Vec<RemoteCall> {
        self.calls.borrow().clone()
    }

    /// Recorded calls that change remote state.
    pub fn mutations(&self) -> Vec<RemoteCall> {
        self.calls
            .borrow()
            .iter()
            .filter(|c| c.is_mutation())
            .cloned()
            .collect()
    }

    pub fn clear_calls(&self) {
        self.calls.borrow_mut().clear();
    }

    pub fn fixture(&self) -> RemoteFixture {
        self.state.borrow().clone()
    }

    pub fn remove_workspace(&self, id: &WorkspaceId) {
        self.state.borrow_mut().workspaces.remove(id);
    }

    fn record(&self, call: RemoteCall) -> Result<(), RemoteError> {
        let kind = call.kind();
        self.calls.borrow_mut().push(call);
        match self.failures.borrow().iter().find(|(k, _)| *k == kind) {
            Some((_, code)) => Err(RemoteError::Status {
                code: *code,
                message: format!("injected failure for {kind:?}"),
            }),
            None => Ok(()),
        }
    }

    fn with_record<R>(
        &self,
        id: &WorkspaceId,
        f: impl FnOnce(&mut WorkspaceRecord) -> Result<R, RemoteError>,
    ) -> Result<R, RemoteError> {
        let mut state = self.state.borrow_mut();
        let record = state
            .workspaces
            .get_mut(id)
            .ok_or_else(|| RemoteError::NotFound {
                resource: format!("workspace {id}"),
            })?;
        f(record)
    }

    fn require_bulk(collection: Collection, operation: &'static str) -> Result<(), RemoteError> {
        if collection.supports_bulk() {
            Ok(())
        } else {
            Err(RemoteError::Unsupported {
                collection: collection.field(),
                operation,
            })
        }
    }

    fn link_id(&self) -> String {
        let n = self.next_link.get();
        self.next_link.set(n + 1);
        format!("link-{n}")
    }
}

fn paginate<T: Clone>(all: &[T], options: ListOptions) -> Page<T> {
    let size = options.page_size.max(1) as usize;
    let total_pages = all.len().div_ceil(size) as u32;
    let current = options.page_number.max(1);
    let start = ((current - 1) as usize).saturating_mul(size).min(all.len());
    let end = (start + size).min(all.len());
    Page {
        items: all[start..end].to_vec(),
        current_page: current,
        total_pages,
        next_page: (current < total_pages).then_some(current + 1),
    }
}

impl RemoteApi for InMemoryRemote {
    fn get_workspace(&self, id: &WorkspaceId) -> Result<RemoteWorkspace, RemoteError> {
        self.record(RemoteCall::Get(id.clone()))?;
        self.with_record(id, |r| Ok(r.workspace.clone()))
    }

    fn list_page(
        &self,
        id: &WorkspaceId,
        collection: Collection,
        options: ListOptions,
    ) -> Result<Page<LinkedItem>, RemoteError> {
        self.record(RemoteCall::List(collection, options.page_number))?;
        let options = ListOptions {
            page_size: options.page_size.min(self.page_size),
            ..options
        };
        self.with_record(id, |r| Ok(paginate(r.items(collection), options)))
    }

    fn create_link(
        &self,
        id: &WorkspaceId,
        collection: Collection,
        item: &LinkedItem,
    ) -> Result<(), RemoteError> {
        self.record(RemoteCall::Create(collection, item.clone()))?;
        let link_id = self.link_id();
        self.with_record(id, |r| {
            let items = r.items_mut(collection);
            if items.contains(item) {
                return Err(RemoteError::Status {
                    code: 409,
                    message: format!("{item} is already linked"),
                });
            }
            items.push(item.clone().with_link_id(link_id));
            Ok(())
        })
    }

    fn delete_link(
        &self,
        id: &WorkspaceId,
        collection: Collection,
        item: &LinkedItem,
    ) -> Result<(), RemoteError> {
        self.record(RemoteCall::Delete(collection, item.clone()))?;
        self.with_record(id, |r| {
            let items = r.items_mut(collection);
            let before = items.len();
            items.retain(|existing| existing != item);
            if items.len() == before {
                return Err(RemoteError::NotFound {
                    resource: format!("{collection} link {item}"),
                });
            }
            Ok(())
        })
    }

    fn bulk_add(
        &self,
        id: &WorkspaceId,
        collection: Collection,
        items: &[LinkedItem],
    ) -> Result<(), RemoteError> {
        self.record(RemoteCall::BulkAdd(collection, items.to_vec()))?;
        Self::require_bulk(collection, "bulk add")?;
        self.with_record(id, |r| {
            let existing = r.items_mut(collection);
            for item in items {
                if !existing.contains(item) {
                    existing.push(item.clone());
                }
            }
            Ok(())
        })
    }

    fn bulk_remove(
        &self,
        id: &WorkspaceId,
        collection: Collection,
        items: &[LinkedItem],
    ) -> Result<(), RemoteError> {
        self.record(RemoteCall::BulkRemove(collection, items.to_vec()))?;
        Self::require_bulk(collection, "bulk remove")?;
        self.with_record(id, |r| {
            r.items_mut(collection).retain(|e| !items.contains(e));
            Ok(())
        })
    }

    fn set_share_flag(&self, id: &WorkspaceId, shared: bool) -> Result<(), RemoteError> {
        self.record(RemoteCall::SetShareFlag(shared))?;
        self.with_record(id, |r| {
            r.workspace.remote_state_sharing = shared;
            Ok(())
        })
    }

    fn set_ssh_key(&self, id: &WorkspaceId, key_id: &str) -> Result<(), RemoteError> {
        self.record(RemoteCall::SetSshKey(key_id.to_owned()))?;
        self.with_record(id, |r| {
            r.workspace.ssh_key_id = Some(key_id.to_owned());
            Ok(())
        })
    }

    fn clear_ssh_key(&self, id: &WorkspaceId) -> Result<(), RemoteError> {
        self.record(RemoteCall::ClearSshKey)?;
        self.with_record(id, |r| {
            r.workspace.ssh_key_id = None;
            Ok(())
        })
    }

    fn update_workspace(
        &self,
        id: &WorkspaceId,
        patch: &WorkspacePatch,
    ) -> Result<(), RemoteError> {
        self.record(RemoteCall::Update(patch.clone()))?;
        self.with_record(id, |r| {
            patch.apply_to(&mut r.workspace);
            Ok(())
        })
    }

    fn list_vcs_providers(
        &self,
        filter: &VcsProviderFilter,
        options: ListOptions,
    ) -> Result<Page<VcsProvider>, RemoteError> {
        self.record(RemoteCall::ListVcsProviders(options.page_number))?;
        let matching: Vec<VcsProvider> = self
            .state
            .borrow()
            .vcs_providers
            .iter()
            .filter(|p| filter.matches(p))
            .cloned()
            .collect();
        let options = ListOptions {
            page_size: options.page_size.min(self.page_size),
            ..options
        };
        Ok(paginate(&matching, options))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
