// Copyright 2025 The Karmada Authors.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! 非结构化资源 (CRD 等), 通过 API discovery 解析类型

use axum::{
    Json,
    extract::{Query, State},
};
use chrono::{Duration, Utc};
use kube::{
    Api, Client, ResourceExt,
    api::{ApiResource, DeleteParams, DynamicObject, ListParams, Patch, PatchParams, PostParams},
    core::GroupVersionKind,
    discovery::{self, ApiCapabilities, ApiGroup, Discovery, Scope as DiscoveryScope},
};
use serde::{Deserialize, Serialize};
use snafu::ResultExt;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::console::{
    dataselect::DataSelectQuery,
    error::{self, Error, Result},
    extract::ResourcePath,
    models::common::{ActionResponse, Envelope, ObjectMeta, ResourceItem, ResourceList, TypeMeta},
    models::resource::{ApplyRequest, ApplyResult},
    state::{AppState, DiscoveredResources},
};
use crate::context::Target;

pub const FIELD_MANAGER: &str = "karmada-dashboard";

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RawSummary {
    pub api_version: String,
    pub namespaced: bool,
}

/// discovery 结果的缓存时长, 过期或找不到类型时重新 discovery
const DISCOVERY_TTL_MINUTES: i64 = 5;

/// 按 kind (大小写不敏感, 含单数小写名) 或复数名匹配, 可用 `plural.group` 限定组.
/// 多个组同名时核心组优先, 其余按组名字母序取第一个.
pub fn find_resource<C>(
    resources: impl IntoIterator<Item = (ApiResource, C)>,
    kind: &str,
) -> Option<(ApiResource, C)> {
    let (name, group) = match kind.split_once('.') {
        Some((name, group)) => (name, Some(group)),
        None => (kind, None),
    };

    let mut matches = resources.into_iter().filter(|(ar, _)| {
        (ar.kind.eq_ignore_ascii_case(name) || ar.plural.eq_ignore_ascii_case(name))
            && group.is_none_or(|g| ar.group.eq_ignore_ascii_case(g))
    });

    let first = matches.next()?;
    if first.0.group.is_empty() {
        return Some(first);
    }
    Some(matches.find(|(ar, _)| ar.group.is_empty()).unwrap_or(first))
}

/// 按组名字母序展开首选版本的资源, 核心组 "" 排在最前
pub fn preferred_resources<'a>(
    groups: impl IntoIterator<Item = &'a ApiGroup>,
) -> Vec<(ApiResource, ApiCapabilities)> {
    groups
        .into_iter()
        .flat_map(|g| g.recommended_resources())
        .collect()
}

async fn discovered(
    state: &AppState,
    client: &Client,
    target: &Target,
    refresh: bool,
) -> Result<(DiscoveredResources, bool)> {
    let key = target.to_string();
    if !refresh {
        if let Some(cached) = state.discovery.get(&key).await {
            return Ok((cached, true));
        }
    }

    let discovery = Discovery::new(client.clone())
        .run()
        .await
        .context(error::KubeApiSnafu)?;
    let resources = Arc::new(preferred_resources(discovery.groups_alphabetical()));
    debug!("discovered {} resources on {}", resources.len(), target);

    state
        .discovery
        .insert(
            key,
            resources.clone(),
            Utc::now() + Duration::minutes(DISCOVERY_TTL_MINUTES),
        )
        .await;
    Ok((resources, false))
}

async fn resolve(
    state: &AppState,
    client: &Client,
    target: &Target,
    kind: &str,
) -> Result<(ApiResource, ApiCapabilities)> {
    let (resources, cached) = discovered(state, client, target, false).await?;
    if let Some(found) = find_resource(resources.iter().cloned(), kind) {
        return Ok(found);
    }

    // 新安装的 CRD 不在缓存里
    if cached {
        let (resources, _) = discovered(state, client, target, true).await?;
        if let Some(found) = find_resource(resources.iter().cloned(), kind) {
            return Ok(found);
        }
    }

    Err(Error::NotFound {
        resource: format!("resource kind '{}'", kind),
    })
}

fn api_for(
    client: Client,
    ar: &ApiResource,
    caps: &ApiCapabilities,
    namespace: Option<&str>,
) -> Api<DynamicObject> {
    match (&caps.scope, namespace) {
        (DiscoveryScope::Namespaced, Some(ns)) => Api::namespaced_with(client, ns, ar),
        _ => Api::all_with(client, ar),
    }
}

struct Resolved {
    client: Client,
    ar: ApiResource,
    caps: ApiCapabilities,
}

async fn resolved(state: &AppState, rp: &ResourcePath) -> Result<Resolved> {
    let client = state.context.client(&rp.target, rp.token())?;
    let (ar, caps) = resolve(state, &client, &rp.target, rp.param("kind")?).await?;
    Ok(Resolved { client, ar, caps })
}

fn to_raw_item(obj: &DynamicObject, ar: &ApiResource, namespaced: bool) -> ResourceItem<RawSummary> {
    ResourceItem {
        object_meta: ObjectMeta::from(&obj.metadata),
        type_meta: TypeMeta {
            kind: ar.kind.to_lowercase(),
            scalable: false,
            restartable: false,
        },
        summary: RawSummary {
            api_version: ar.api_version.clone(),
            namespaced,
        },
    }
}

/// `GET /_raw/{kind}` 与 `GET /_raw/{kind}/namespace/{namespace}`
pub async fn list(
    State(state): State<AppState>,
    rp: ResourcePath,
    Query(query): Query<DataSelectQuery>,
) -> Result<Json<Envelope<ResourceList<ResourceItem<RawSummary>>>>> {
    let Resolved { client, ar, caps } = resolved(&state, &rp).await?;
    let namespaced = matches!(caps.scope, DiscoveryScope::Namespaced);
    let api = api_for(client, &ar, &caps, rp.namespace.as_deref());

    let objects = api
        .list(&ListParams::default())
        .await
        .context(error::KubeApiSnafu)?;
    let items = objects
        .items
        .iter()
        .map(|obj| to_raw_item(obj, &ar, namespaced))
        .collect();

    Ok(Json(Envelope::ok(ResourceList::select(items, &query, Vec::new()))))
}

pub async fn get(
    State(state): State<AppState>,
    rp: ResourcePath,
) -> Result<Json<Envelope<DynamicObject>>> {
    let Resolved { client, ar, caps } = resolved(&state, &rp).await?;
    let api = api_for(client, &ar, &caps, rp.namespace.as_deref());
    let obj = api.get(rp.name()?).await.context(error::KubeApiSnafu)?;
    Ok(Json(Envelope::ok(obj)))
}

/// 整体替换对象
pub async fn update(
    State(state): State<AppState>,
    rp: ResourcePath,
    Json(obj): Json<DynamicObject>,
) -> Result<Json<Envelope<DynamicObject>>> {
    let name = rp.name()?;
    if obj.name_any() != name {
        return Err(Error::BadRequest {
            message: format!("object name '{}' does not match '{}'", obj.name_any(), name),
        });
    }

    let Resolved { client, ar, caps } = resolved(&state, &rp).await?;
    let api = api_for(client, &ar, &caps, rp.namespace.as_deref());
    let updated = api
        .replace(name, &PostParams::default(), &obj)
        .await
        .context(error::KubeApiSnafu)?;

    info!("updated {} {} on {}", ar.kind, name, rp.target);
    Ok(Json(Envelope::ok(updated)))
}

pub async fn delete(
    State(state): State<AppState>,
    rp: ResourcePath,
) -> Result<Json<Envelope<ActionResponse>>> {
    let name = rp.name()?;
    let Resolved { client, ar, caps } = resolved(&state, &rp).await?;
    let api = api_for(client, &ar, &caps, rp.namespace.as_deref());
    api.delete(name, &DeleteParams::background())
        .await
        .context(error::KubeApiSnafu)?;

    info!("deleted {} {} on {}", ar.kind, name, rp.target);
    Ok(Json(Envelope::ok(ActionResponse::done(format!(
        "{} {} deleted",
        ar.kind, name
    )))))
}

/// 解析多文档 YAML (JSON 亦为合法 YAML), 跳过空文档
pub fn parse_documents(content: &str) -> Result<Vec<DynamicObject>> {
    let mut objects = Vec::new();
    for doc in serde_yaml_ng::Deserializer::from_str(content) {
        let value = serde_json::Value::deserialize(doc).context(error::YamlSnafu)?;
        if value.is_null() {
            continue;
        }
        objects.push(serde_json::from_value(value).context(error::JsonSnafu)?);
    }
    Ok(objects)
}

async fn apply_one(
    state: &AppState,
    client: &Client,
    target: &Target,
    obj: &DynamicObject,
) -> Result<()> {
    let types = obj.types.as_ref().ok_or_else(|| Error::BadRequest {
        message: "apiVersion and kind are required".to_string(),
    })?;
    let gvk = GroupVersionKind::try_from(types).map_err(|e| Error::BadRequest {
        message: e.to_string(),
    })?;
    let (resources, _) = discovered(state, client, target, false).await?;
    let cached = resources.iter().find(|(ar, _)| {
        ar.group == gvk.group && ar.version == gvk.version && ar.kind == gvk.kind
    });
    let (ar, caps) = match cached {
        Some(found) => found.clone(),
        // 非首选版本只查询该 group/version
        None => discovery::pinned_kind(client, &gvk)
            .await
            .context(error::KubeApiSnafu)?,
    };

    let namespace = match caps.scope {
        DiscoveryScope::Namespaced => Some(obj.namespace().unwrap_or_else(|| "default".to_string())),
        DiscoveryScope::Cluster => None,
    };
    let api = api_for(client.clone(), &ar, &caps, namespace.as_deref());
    api.patch(
        &obj.name_any(),
        &PatchParams::apply(FIELD_MANAGER).force(),
        &Patch::Apply(obj),
    )
    .await
    .context(error::KubeApiSnafu)?;
    Ok(())
}

/// `POST /_raw/apply`, 逐个文档 server-side apply
pub async fn apply(
    State(state): State<AppState>,
    rp: ResourcePath,
    Json(req): Json<ApplyRequest>,
) -> Result<Json<Envelope<Vec<ApplyResult>>>> {
    let objects = parse_documents(&req.content)?;
    if objects.is_empty() {
        return Err(Error::BadRequest {
            message: "no documents to apply".to_string(),
        });
    }

    let client = state.context.client(&rp.target, rp.token())?;
    let mut results = Vec::with_capacity(objects.len());
    for obj in &objects {
        let outcome = apply_one(&state, &client, &rp.target, obj).await;
        if let Err(e) = &outcome {
            warn!("apply of {} failed: {}", obj.name_any(), e);
        }
        results.push(ApplyResult {
            kind: obj.types.as_ref().map(|t| t.kind.clone()).unwrap_or_default(),
            name: obj.name_any(),
            namespace: obj.namespace(),
            success: outcome.is_ok(),
            error: outcome.err().map(|e| e.to_string()),
        });
    }

    info!("applied {} documents on {}", results.len(), rp.target);
    Ok(Json(Envelope::ok(results)))
}
