//! Blocking HTTP client for the control-plane API (JSON:API documents).
//!
//! Endpoints, relative to `https://<hostname>/api/iacp/v3`:
//!
//! | Operation | Request |
//! |---|---|
//! | get workspace | `GET /workspaces/{id}` |
//! | list tags / consumers | `GET /workspaces/{id}/relationships/{rel}` |
//! | bulk add / remove | `POST` / `DELETE /workspaces/{id}/relationships/{rel}` |
//! | list provider links | `GET /workspaces/{id}/provider-configuration-links` |
//! | create provider link | `POST /workspaces/{id}/provider-configuration-links` |
//! | delete provider link | `DELETE /provider-configuration-links/{link_id}` |
//! | share flag, patch | `PATCH /workspaces/{id}` |
//! | ssh key | `POST` / `DELETE /workspaces/{id}/ssh-key-links` |
//! | vcs providers | `GET /vcs-providers` |

use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use converge_core::{
    AutoQueueRuns, EnvironmentType, ExecutionMode, Hooks, IacPlatform, LinkedItem,
    RemoteWorkspace, Terragrunt, User, VcsRepo, WorkspaceId,
};

use crate::api::{
    Collection, ListOptions, RemoteApi, VcsProvider, VcsProviderFilter, WorkspacePatch,
};
use crate::error::RemoteError;
use crate::page::Page;

const API_PREFIX: &str = "api/iacp/v3";
const CONTENT_TYPE: &str = "application/vnd.api+json";

/// HTTP implementation of [`RemoteApi`].
pub struct HttpRemote {
    agent: ureq::Agent,
    base: String,
    token: String,
}

impl HttpRemote {
    pub fn new(hostname: &str, token: &str) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout(Duration::from_secs(30))
            .build();
        let hostname = hostname.trim_end_matches('/');
        let base = if hostname.starts_with("http://") || hostname.starts_with("https://") {
            format!("{hostname}/{API_PREFIX}")
        } else {
            format!("https://{hostname}/{API_PREFIX}")
        };
        Self {
            agent,
            base,
            token: token.to_owned(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base, path.trim_start_matches('/'))
    }

    fn request(&self, method: &str, path: &str) -> ureq::Request {
        self.agent
            .request(method, &self.url(path))
            .set("Authorization", &format!("Bearer {}", self.token))
            .set("Accept", CONTENT_TYPE)
            .set("Content-Type", CONTENT_TYPE)
    }

    fn get_json(&self, path: &str, query: &[(&str, String)]) -> Result<Value, RemoteError> {
        tracing::debug!("GET {path}");
        let mut req = self.request("GET", path);
        for (key, value) in query {
            req = req.query(key, value);
        }
        let response = req.call()?;
        response
            .into_json()
            .map_err(|e| RemoteError::Decode(e.to_string()))
    }

    fn send(&self, method: &str, path: &str, body: Option<Value>) -> Result<(), RemoteError> {
        tracing::debug!("{method} {path}");
        let req = self.request(method, path);
        match body {
            Some(body) => req.send_json(body)?,
            None => req.call()?,
        };
        Ok(())
    }

    fn workspace_path(id: &WorkspaceId) -> String {
        format!("workspaces/{id}")
    }

    fn collection_path(id: &WorkspaceId, collection: Collection) -> String {
        match collection {
            Collection::Tags => format!("workspaces/{id}/relationships/tags"),
            Collection::RemoteStateConsumers => {
                format!("workspaces/{id}/relationships/remote-state-consumers")
            }
            Collection::ProviderConfigurations => {
                format!("workspaces/{id}/provider-configuration-links")
            }
        }
    }

    fn patch_attributes(&self, id: &WorkspaceId, attributes: Value, relationships: Value)
        -> Result<(), RemoteError>
    {
        let body = json!({
            "data": {
                "type": "workspaces",
                "id": id.0,
                "attributes": attributes,
                "relationships": relationships,
            }
        });
        self.send("PATCH", &Self::workspace_path(id), Some(body))
    }
}

// ---------------------------------------------------------------------------
// Wire documents
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct Document<T> {
    data: T,
    #[serde(default)]
    meta: Option<Meta>,
}

#[derive(Debug, Deserialize)]
struct Meta {
    pagination: Pagination,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct Pagination {
    current_page: u32,
    total_pages: u32,
    #[serde(default)]
    next_page: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct Resource {
    id: String,
    #[serde(default)]
    attributes: Map<String, Value>,
    #[serde(default)]
    relationships: Map<String, Value>,
}

impl Resource {
    fn attr<T: serde::de::DeserializeOwned>(&self, key: &str) -> Option<T> {
        self.attributes
            .get(key)
            .filter(|v| !v.is_null())
            .and_then(|v| serde_json::from_value(v.clone()).ok())
    }

    fn related_id(&self, key: &str) -> Option<String> {
        self.relationships
            .get(key)
            .and_then(|rel| rel.get("data"))
            .and_then(|data| data.get("id"))
            .and_then(Value::as_str)
            .map(str::to_owned)
    }
}

fn decode<T: serde::de::DeserializeOwned>(value: Value) -> Result<T, RemoteError> {
    serde_json::from_value(value).map_err(|e| RemoteError::Decode(e.to_string()))
}

fn page_of<T>(items: Vec<T>, meta: Option<Meta>) -> Page<T> {
    match meta {
        Some(Meta { pagination }) => Page {
            items,
            current_page: pagination.current_page,
            total_pages: pagination.total_pages,
            next_page: pagination.next_page,
        },
        None => Page::single(items),
    }
}

fn list_query(options: ListOptions) -> Vec<(&'static str, String)> {
    vec![
        ("page[number]", options.page_number.to_string()),
        ("page[size]", options.page_size.to_string()),
    ]
}

fn workspace_from_resource(res: &Resource) -> Result<RemoteWorkspace, RemoteError> {
    let environment_id = res
        .related_id("environment")
        .ok_or_else(|| RemoteError::Decode(format!("workspace {} has no environment", res.id)))?;
    let name: String = res
        .attr("name")
        .ok_or_else(|| RemoteError::Decode(format!("workspace {} has no name", res.id)))?;
    let mut ws = RemoteWorkspace::new(res.id.as_str(), &name, &environment_id);
    ws.auto_apply = res.attr("auto-apply").unwrap_or(false);
    ws.auto_queue_runs = res.attr::<AutoQueueRuns>("auto-queue-runs").unwrap_or_default();
    ws.deletion_protection_enabled = res.attr("deletion-protection-enabled").unwrap_or(false);
    ws.execution_mode = res.attr::<ExecutionMode>("execution-mode").unwrap_or_default();
    ws.force_latest_run = res.attr("force-latest-run").unwrap_or(false);
    ws.has_resources = res.attr("has-resources").unwrap_or(false);
    ws.iac_platform = res.attr::<IacPlatform>("iac-platform").unwrap_or_default();
    ws.operations = ws.execution_mode.operations();
    ws.terraform_version = res.attr("terraform-version");
    ws.working_directory = res.attr("working-directory").unwrap_or_default();
    ws.environment_type = res
        .attr::<EnvironmentType>("environment-type")
        .unwrap_or_default();
    ws.var_files = res.attr("var-files").unwrap_or_default();
    ws.run_operation_timeout = res.attr("run-operation-timeout");
    ws.remote_state_sharing = res.attr("remote-state-sharing").unwrap_or(false);
    ws.agent_pool_id = res.related_id("agent-pool");
    ws.module_version_id = res.related_id("module-version");
    ws.vcs_provider_id = res.related_id("vcs-provider");
    ws.ssh_key_id = res.related_id("ssh-key");
    ws.vcs_repo = res.attr::<Value>("vcs-repo").map(vcs_repo_from_wire).transpose()?;
    ws.hooks = res.attr::<Value>("hooks").map(hooks_from_wire).transpose()?;
    ws.terragrunt = res.attr::<Value>("terragrunt").map(terragrunt_from_wire).transpose()?;
    ws.created_by = res.attr::<User>("created-by");
    Ok(ws)
}

// Nested attribute blocks use kebab-case keys in both directions.

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct VcsRepoWire {
    identifier: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    branch: Option<String>,
    #[serde(default)]
    path: Option<String>,
    #[serde(default)]
    trigger_prefixes: Vec<String>,
    #[serde(default)]
    trigger_patterns: Option<String>,
    #[serde(default)]
    dry_runs_enabled: Option<bool>,
    #[serde(default)]
    ingress_submodules: bool,
}

impl From<&VcsRepo> for VcsRepoWire {
    fn from(repo: &VcsRepo) -> Self {
        Self {
            identifier: repo.identifier.clone(),
            branch: repo.branch.clone(),
            path: Some(repo.path.clone()),
            trigger_prefixes: repo.trigger_prefixes.clone(),
            trigger_patterns: Some(repo.trigger_patterns.clone()),
            dry_runs_enabled: Some(repo.dry_runs_enabled),
            ingress_submodules: repo.ingress_submodules,
        }
    }
}

impl From<VcsRepoWire> for VcsRepo {
    fn from(wire: VcsRepoWire) -> Self {
        Self {
            identifier: wire.identifier,
            branch: wire.branch,
            path: wire.path.unwrap_or_default(),
            trigger_prefixes: wire.trigger_prefixes,
            trigger_patterns: wire.trigger_patterns.unwrap_or_default(),
            dry_runs_enabled: wire.dry_runs_enabled.unwrap_or(true),
            ingress_submodules: wire.ingress_submodules,
        }
    }
}

#[derive(Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case", default)]
struct HooksWire {
    pre_init: Option<String>,
    pre_plan: Option<String>,
    post_plan: Option<String>,
    pre_apply: Option<String>,
    post_apply: Option<String>,
}

impl From<&Hooks> for HooksWire {
    fn from(hooks: &Hooks) -> Self {
        Self {
            pre_init: Some(hooks.pre_init.clone()),
            pre_plan: Some(hooks.pre_plan.clone()),
            post_plan: Some(hooks.post_plan.clone()),
            pre_apply: Some(hooks.pre_apply.clone()),
            post_apply: Some(hooks.post_apply.clone()),
        }
    }
}

impl From<HooksWire> for Hooks {
    fn from(wire: HooksWire) -> Self {
        Self {
            pre_init: wire.pre_init.unwrap_or_default(),
            pre_plan: wire.pre_plan.unwrap_or_default(),
            post_plan: wire.post_plan.unwrap_or_default(),
            pre_apply: wire.pre_apply.unwrap_or_default(),
            post_apply: wire.post_apply.unwrap_or_default(),
        }
    }
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct TerragruntWire {
    version: String,
    #[serde(default)]
    use_run_all: bool,
    #[serde(default)]
    include_external_dependencies: bool,
}

impl From<&Terragrunt> for TerragruntWire {
    fn from(tg: &Terragrunt) -> Self {
        Self {
            version: tg.version.clone(),
            use_run_all: tg.use_run_all,
            include_external_dependencies: tg.include_external_dependencies,
        }
    }
}

impl From<TerragruntWire> for Terragrunt {
    fn from(wire: TerragruntWire) -> Self {
        Self {
            version: wire.version,
            use_run_all: wire.use_run_all,
            include_external_dependencies: wire.include_external_dependencies,
        }
    }
}

fn vcs_repo_from_wire(value: Value) -> Result<VcsRepo, RemoteError> {
    decode::<VcsRepoWire>(value).map(VcsRepo::from)
}

fn hooks_from_wire(value: Value) -> Result<Hooks, RemoteError> {
    decode::<HooksWire>(value).map(Hooks::from)
}

fn terragrunt_from_wire(value: Value) -> Result<Terragrunt, RemoteError> {
    decode::<TerragruntWire>(value).map(Terragrunt::from)
}

fn encode<T: Serialize>(value: &T) -> Result<Value, RemoteError> {
    serde_json::to_value(value).map_err(|e| RemoteError::Decode(e.to_string()))
}

/// Encodes a nested block set or cleared by a patch; `None` when untouched.
fn nested_attribute<M, W: Serialize>(
    field: &Option<Option<M>>,
    wire: impl Fn(&M) -> W,
) -> Result<Option<Value>, RemoteError> {
    match field {
        None => Ok(None),
        Some(None) => Ok(Some(Value::Null)),
        Some(Some(model)) => encode(&wire(model)).map(Some),
    }
}

fn linked_item_from_resource(collection: Collection, res: &Resource) -> LinkedItem {
    match collection {
        Collection::ProviderConfigurations => {
            let config_id = res
                .related_id("provider-configuration")
                .unwrap_or_else(|| res.id.clone());
            let alias: String = res.attr("alias").unwrap_or_default();
            LinkedItem::with_alias(config_id, alias).with_link_id(res.id.clone())
        }
        Collection::Tags | Collection::RemoteStateConsumers => LinkedItem::new(res.id.clone()),
    }
}

fn resource_type(collection: Collection) -> &'static str {
    match collection {
        Collection::Tags => "tags",
        Collection::RemoteStateConsumers => "workspaces",
        Collection::ProviderConfigurations => "provider-configuration-links",
    }
}

fn identifiers(collection: Collection, items: &[LinkedItem]) -> Value {
    let data: Vec<Value> = items
        .iter()
        .map(|i| json!({"type": resource_type(collection), "id": i.id}))
        .collect();
    json!({ "data": data })
}

fn patch_document(patch: &WorkspacePatch) -> Result<(Value, Value), RemoteError> {
    let flat = encode(patch)?;
    let mut attributes = Map::new();
    let mut relationships = Map::new();
    if let Value::Object(fields) = flat {
        for (key, value) in fields {
            let relation = match key.as_str() {
                "agent_pool_id" => Some("agent-pool"),
                "module_version_id" => Some("module-version"),
                "vcs_provider_id" => Some("vcs-provider"),
                _ => None,
            };
            match relation {
                Some(rel) => {
                    let data = match value.as_str() {
                        Some(id) => json!({"type": format!("{rel}s"), "id": id}),
                        None => Value::Null,
                    };
                    relationships.insert(rel.to_owned(), json!({ "data": data }));
                }
                None => {
                    let key = match key.as_str() {
                        "type" => "environment-type".to_owned(),
                        other => other.replace('_', "-"),
                    };
                    attributes.insert(key, value);
                }
            }
        }
    }
    let nested = [
        ("vcs-repo", nested_attribute(&patch.vcs_repo, |r| VcsRepoWire::from(r))?),
        ("hooks", nested_attribute(&patch.hooks, |h| HooksWire::from(h))?),
        ("terragrunt", nested_attribute(&patch.terragrunt, |t| TerragruntWire::from(t))?),
    ];
    for (key, value) in nested {
        if let Some(value) = value {
            attributes.insert(key.to_owned(), value);
        }
    }
    Ok((Value::Object(attributes), Value::Object(relationships)))
}

// ---------------------------------------------------------------------------
// RemoteApi
// ---------------------------------------------------------------------------

impl RemoteApi for HttpRemote {
    fn get_workspace(&self, id: &WorkspaceId) -> Result<RemoteWorkspace, RemoteError> {
        let doc: Document<Resource> = decode(self.get_json(&Self::workspace_path(id), &[])?)?;
        workspace_from_resource(&doc.data)
    }

    fn list_page(
        &self,
        id: &WorkspaceId,
        collection: Collection,
        options: ListOptions,
    ) -> Result<Page<LinkedItem>, RemoteError> {
        let value = self.get_json(&Self::collection_path(id, collection), &list_query(options))?;
        let doc: Document<Vec<Resource>> = decode(value)?;
        let items = doc
            .data
            .iter()
            .map(|r| linked_item_from_resource(collection, r))
            .collect();
        Ok(page_of(items, doc.meta))
    }

    fn create_link(
        &self,
        id: &WorkspaceId,
        collection: Collection,
        item: &LinkedItem,
    ) -> Result<(), RemoteError> {
        if collection.supports_bulk() {
            return self.bulk_add(id, collection, std::slice::from_ref(item));
        }
        let body = json!({
            "data": {
                "type": "provider-configuration-links",
                "attributes": { "alias": item.alias() },
                "relationships": {
                    "provider-configuration": {
                        "data": {"type": "provider-configurations", "id": item.id}
                    }
                }
            }
        });
        self.send("POST", &Self::collection_path(id, collection), Some(body))
    }

    fn delete_link(
        &self,
        id: &WorkspaceId,
        collection: Collection,
        item: &LinkedItem,
    ) -> Result<(), RemoteError> {
        if collection.supports_bulk() {
            return self.bulk_remove(id, collection, std::slice::from_ref(item));
        }
        let link_id = item.link_id.as_deref().ok_or_else(|| RemoteError::NotFound {
            resource: format!("link for {item}"),
        })?;
        self.send(
            "DELETE",
            &format!("provider-configuration-links/{link_id}"),
            None,
        )
    }

    fn bulk_add(
        &self,
        id: &WorkspaceId,
        collection: Collection,
        items: &[LinkedItem],
    ) -> Result<(), RemoteError> {
        if !collection.supports_bulk() {
            return Err(RemoteError::Unsupported {
                collection: collection.field(),
                operation: "bulk add",
            });
        }
        self.send(
            "POST",
            &Self::collection_path(id, collection),
            Some(identifiers(collection, items)),
        )
    }

    fn bulk_remove(
        &self,
        id: &WorkspaceId,
        collection: Collection,
        items: &[LinkedItem],
    ) -> Result<(), RemoteError> {
        if !collection.supports_bulk() {
            return Err(RemoteError::Unsupported {
                collection: collection.field(),
                operation: "bulk remove",
            });
        }
        self.send(
            "DELETE",
            &Self::collection_path(id, collection),
            Some(identifiers(collection, items)),
        )
    }

    fn set_share_flag(&self, id: &WorkspaceId, shared: bool) -> Result<(), RemoteError> {
        self.patch_attributes(id, json!({"remote-state-sharing": shared}), json!({}))
    }

    fn set_ssh_key(&self, id: &WorkspaceId, key_id: &str) -> Result<(), RemoteError> {
        let body = json!({
            "data": {
                "type": "ssh-key-links",
                "relationships": {"ssh-key": {"data": {"type": "ssh-keys", "id": key_id}}}
            }
        });
        self.send("POST", &format!("workspaces/{id}/ssh-key-links"), Some(body))
    }

    fn clear_ssh_key(&self, id: &WorkspaceId) -> Result<(), RemoteError> {
        self.send("DELETE", &format!("workspaces/{id}/ssh-key-links"), None)
    }

    fn update_workspace(
        &self,
        id: &WorkspaceId,
        patch: &WorkspacePatch,
    ) -> Result<(), RemoteError> {
        let (attributes, relationships) = patch_document(patch)?;
        self.patch_attributes(id, attributes, relationships)
    }

    fn list_vcs_providers(
        &self,
        filter: &VcsProviderFilter,
        options: ListOptions,
    ) -> Result<Page<VcsProvider>, RemoteError> {
        let mut query = list_query(options);
        if let Some(account) = &filter.account_id {
            query.push(("filter[account]", account.0.clone()));
        }
        if let Some(name) = &filter.name {
            query.push(("filter[name]", name.clone()));
        }
        if let Some(q) = &filter.query {
            query.push(("query", q.clone()));
        }
        let doc: Document<Vec<Resource>> = decode(self.get_json("vcs-providers", &query)?)?;
        let items = doc
            .data
            .iter()
            .map(|r| VcsProvider {
                id: r.id.clone(),
                name: r.attr("name").unwrap_or_default(),
                vcs_type: r.attr("vcs-type").unwrap_or_default(),
                account_ids: filter.account_id.iter().cloned().collect(),
            })
            .collect();
        Ok(page_of(items, doc.meta))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resource(value: Value) -> Resource {
        serde_json::from_value(value).expect("resource")
    }

    #[test]
    fn base_url_accepts_bare_hostname_and_scheme() {
        assert_eq!(
            HttpRemote::new("example.io", "t").url("workspaces/ws-1"),
            "https://example.io/api/iacp/v3/workspaces/ws-1"
        );
        assert_eq!(
            HttpRemote::new("http://localhost:8080/", "t").url("/vcs-providers"),
            "http://localhost:8080/api/iacp/v3/vcs-providers"
        );
    }

    #[test]
    fn decodes_workspace_resource() {
        let res = resource(json!({
            "id": "ws-1",
            "attributes": {
                "name": "core",
                "auto-apply": true,
                "execution-mode": "local",
                "remote-state-sharing": true,
                "vcs-repo": {"identifier": "org/repo", "branch": "main"},
                "hooks": {"pre-plan": "echo hi", "post-apply": null}
            },
            "relationships": {
                "environment": {"data": {"type": "environments", "id": "env-1"}},
                "agent-pool": {"data": null},
                "vcs-provider": {"data": {"type": "vcs-providers", "id": "vcs-1"}}
            }
        }));
        let ws = workspace_from_resource(&res).expect("decode");
        assert_eq!(ws.environment_id, "env-1");
        assert!(ws.auto_apply);
        assert_eq!(ws.execution_mode, ExecutionMode::Local);
        assert!(!ws.operations);
        assert!(ws.remote_state_sharing);
        assert_eq!(ws.agent_pool_id, None);
        assert_eq!(ws.vcs_provider_id.as_deref(), Some("vcs-1"));
        let repo = ws.vcs_repo.expect("repo");
        assert!(repo.dry_runs_enabled);
        let hooks = ws.hooks.expect("hooks");
        assert_eq!(hooks.pre_plan, "echo hi");
        assert_eq!(hooks.post_apply, "");
    }

    #[test]
    fn provider_link_resource_keeps_alias_and_link_id() {
        let res = resource(json!({
            "id": "pcfgl-9",
            "attributes": {"alias": "east"},
            "relationships": {
                "provider-configuration": {"data": {"type": "provider-configurations", "id": "pcfg-1"}}
            }
        }));
        let item = linked_item_from_resource(Collection::ProviderConfigurations, &res);
        assert_eq!(item, LinkedItem::with_alias("pcfg-1", "east"));
        assert_eq!(item.link_id.as_deref(), Some("pcfgl-9"));
    }

    #[test]
    fn nested_blocks_read_back_as_written() {
        let repo = VcsRepo {
            identifier: "org/repo".into(),
            branch: Some("main".into()),
            path: "modules".into(),
            trigger_prefixes: vec!["infra/".into()],
            trigger_patterns: "*.tf".into(),
            dry_runs_enabled: false,
            ingress_submodules: true,
        };
        let hooks = Hooks {
            pre_init: "make init".into(),
            post_apply: "notify".into(),
            ..Hooks::default()
        };
        let terragrunt = Terragrunt {
            version: "0.50".into(),
            use_run_all: true,
            include_external_dependencies: true,
        };
        let patch = WorkspacePatch {
            vcs_repo: Some(Some(repo.clone())),
            hooks: Some(Some(hooks.clone())),
            terragrunt: Some(Some(terragrunt.clone())),
            ..WorkspacePatch::default()
        };

        let (attributes, _) = patch_document(&patch).expect("doc");
        assert_eq!(attributes["vcs-repo"]["trigger-prefixes"], json!(["infra/"]));
        assert_eq!(attributes["vcs-repo"]["dry-runs-enabled"], json!(false));
        assert_eq!(attributes["hooks"]["pre-init"], json!("make init"));
        assert_eq!(attributes["terragrunt"]["use-run-all"], json!(true));

        let res = resource(json!({
            "id": "ws-1",
            "attributes": {
                "name": "core",
                "vcs-repo": attributes["vcs-repo"].clone(),
                "hooks": attributes["hooks"].clone(),
                "terragrunt": attributes["terragrunt"].clone()
            },
            "relationships": {
                "environment": {"data": {"type": "environments", "id": "env-1"}}
            }
        }));
        let ws = workspace_from_resource(&res).expect("decode");
        assert_eq!(ws.vcs_repo, Some(repo));
        assert_eq!(ws.hooks, Some(hooks));
        assert_eq!(ws.terragrunt, Some(terragrunt));
    }

    #[test]
    fn cleared_nested_block_is_sent_as_null() {
        let patch = WorkspacePatch {
            vcs_repo: Some(None),
            ..WorkspacePatch::default()
        };
        let (attributes, _) = patch_document(&patch).expect("doc");
        assert_eq!(attributes, json!({"vcs-repo": null}));
    }

    #[test]
    fn patch_document_splits_relationships() {
        let patch = WorkspacePatch {
            working_directory: Some("infra".into()),
            environment_type: Some(EnvironmentType::Staging),
            agent_pool_id: Some(None),
            vcs_provider_id: Some(Some("vcs-2".into())),
            ..WorkspacePatch::default()
        };
        let (attributes, relationships) = patch_document(&patch).expect("doc");
        assert_eq!(
            attributes,
            json!({"working-directory": "infra", "environment-type": "staging"})
        );
        assert_eq!(
            relationships,
            json!({
                "agent-pool": {"data": null},
                "vcs-provider": {"data": {"type": "vcs-providers", "id": "vcs-2"}}
            })
        );
    }
}
