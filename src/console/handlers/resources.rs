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

//! 类型化资源处理器
//!
//! 同一组处理器服务于 karmada, mgmt 与 member 三个前缀, 目标集群由
//! [`ResourcePath`] 决定.

use axum::{
    Json,
    extract::{Query, State},
};
use k8s_openapi::NamespaceResourceScope;
use k8s_openapi::api::core::v1 as corev1;
use kube::{
    Api, Client, Resource,
    api::{DeleteParams, ListParams, LogParams, Patch, PatchParams},
};
use serde_json::json;
use snafu::ResultExt;
use tracing::info;

use crate::console::{
    dataselect::DataSelectQuery,
    error::{self, Error, Result},
    extract::ResourcePath,
    kinds::{ResourceKind, cluster::EventItem, to_detail, to_item},
    models::common::{ActionResponse, Envelope, ResourceDetail, ResourceItem, ResourceList},
    models::resource::{LogQuery, PodLogs, ScaleRequest},
    state::AppState,
};

const RESTARTED_AT_ANNOTATION: &str = "kubectl.kubernetes.io/restartedAt";

pub type ListResponse<S> = Json<Envelope<ResourceList<ResourceItem<S>>>>;
pub type DetailResponse<S, K> = Json<Envelope<ResourceDetail<S, K>>>;

fn client(state: &AppState, rp: &ResourcePath) -> Result<Client> {
    Ok(state.context.client(&rp.target, rp.token())?)
}

fn list_response<K: ResourceKind>(objects: Vec<K>, query: &DataSelectQuery) -> ListResponse<K::Summary> {
    let items = objects.iter().map(to_item).collect();
    Json(Envelope::ok(ResourceList::select(items, query, Vec::new())))
}

/// 列出命名空间级资源, 未指定命名空间时列出全部
pub async fn list_namespaced<K>(
    State(state): State<AppState>,
    rp: ResourcePath,
    Query(query): Query<DataSelectQuery>,
) -> Result<ListResponse<K::Summary>>
where
    K: ResourceKind + Resource<Scope = NamespaceResourceScope>,
{
    let client = client(&state, &rp)?;
    let api: Api<K> = match &rp.namespace {
        Some(ns) => Api::namespaced(client, ns),
        None => Api::all(client),
    };

    let list = api
        .list(&ListParams::default())
        .await
        .context(error::KubeApiSnafu)?;
    Ok(list_response(list.items, &query))
}

/// 获取命名空间级资源详情
pub async fn get_namespaced<K>(
    State(state): State<AppState>,
    rp: ResourcePath,
) -> Result<DetailResponse<K::Summary, K>>
where
    K: ResourceKind + Resource<Scope = NamespaceResourceScope>,
{
    let api: Api<K> = Api::namespaced(client(&state, &rp)?, rp.namespace()?);
    let obj = api.get(rp.name()?).await.context(error::KubeApiSnafu)?;
    Ok(Json(Envelope::ok(to_detail(obj))))
}

pub async fn delete_namespaced<K>(
    State(state): State<AppState>,
    rp: ResourcePath,
) -> Result<Json<Envelope<ActionResponse>>>
where
    K: ResourceKind + Resource<Scope = NamespaceResourceScope>,
{
    let (namespace, name) = (rp.namespace()?, rp.name()?);
    let api: Api<K> = Api::namespaced(client(&state, &rp)?, namespace);
    api.delete(name, &DeleteParams::background())
        .await
        .context(error::KubeApiSnafu)?;

    info!("deleted {} {}/{} on {}", K::kind(&()), namespace, name, rp.target);
    Ok(Json(Envelope::ok(ActionResponse::done(format!(
        "{} {}/{} deleted",
        K::kind(&()),
        namespace,
        name
    )))))
}

/// 列出集群级资源
pub async fn list_cluster<K: ResourceKind>(
    State(state): State<AppState>,
    rp: ResourcePath,
    Query(query): Query<DataSelectQuery>,
) -> Result<ListResponse<K::Summary>> {
    let api: Api<K> = Api::all(client(&state, &rp)?);
    let list = api
        .list(&ListParams::default())
        .await
        .context(error::KubeApiSnafu)?;
    Ok(list_response(list.items, &query))
}

pub async fn get_cluster<K: ResourceKind>(
    State(state): State<AppState>,
    rp: ResourcePath,
) -> Result<DetailResponse<K::Summary, K>> {
    let api: Api<K> = Api::all(client(&state, &rp)?);
    let obj = api.get(rp.name()?).await.context(error::KubeApiSnafu)?;
    Ok(Json(Envelope::ok(to_detail(obj))))
}

pub async fn delete_cluster<K: ResourceKind>(
    State(state): State<AppState>,
    rp: ResourcePath,
) -> Result<Json<Envelope<ActionResponse>>> {
    let name = rp.name()?;
    let api: Api<K> = Api::all(client(&state, &rp)?);
    api.delete(name, &DeleteParams::background())
        .await
        .context(error::KubeApiSnafu)?;

    info!("deleted {} {} on {}", K::kind(&()), name, rp.target);
    Ok(Json(Envelope::ok(ActionResponse::done(format!(
        "{} {} deleted",
        K::kind(&()),
        name
    )))))
}

/// 调整副本数
pub async fn scale<K>(
    State(state): State<AppState>,
    rp: ResourcePath,
    Json(req): Json<ScaleRequest>,
) -> Result<Json<Envelope<ActionResponse>>>
where
    K: ResourceKind + Resource<Scope = NamespaceResourceScope>,
{
    if !K::SCALABLE {
        return Err(Error::BadRequest {
            message: format!("{} cannot be scaled", K::kind(&())),
        });
    }
    if req.replicas < 0 {
        return Err(Error::BadRequest {
            message: "replicas must not be negative".to_string(),
        });
    }

    let (namespace, name) = (rp.namespace()?, rp.name()?);
    let api: Api<K> = Api::namespaced(client(&state, &rp)?, namespace);
    let patch = json!({ "spec": { "replicas": req.replicas } });
    api.patch(name, &PatchParams::default(), &Patch::Merge(&patch))
        .await
        .context(error::KubeApiSnafu)?;

    info!("scaled {} {}/{} to {}", K::kind(&()), namespace, name, req.replicas);
    Ok(Json(Envelope::ok(ActionResponse::done(format!(
        "{}/{} scaled to {}",
        namespace, name, req.replicas
    )))))
}

/// 滚动重启: 更新 Pod 模板上的 restartedAt 注解
pub async fn restart<K>(
    State(state): State<AppState>,
    rp: ResourcePath,
) -> Result<Json<Envelope<ActionResponse>>>
where
    K: ResourceKind + Resource<Scope = NamespaceResourceScope>,
{
    if !K::RESTARTABLE {
        return Err(Error::BadRequest {
            message: format!("{} cannot be restarted", K::kind(&())),
        });
    }

    let (namespace, name) = (rp.namespace()?, rp.name()?);
    let api: Api<K> = Api::namespaced(client(&state, &rp)?, namespace);
    let patch = restart_patch(&chrono::Utc::now().to_rfc3339());
    api.patch(name, &PatchParams::default(), &Patch::Merge(&patch))
        .await
        .context(error::KubeApiSnafu)?;

    info!("restarted {} {}/{}", K::kind(&()), namespace, name);
    Ok(Json(Envelope::ok(ActionResponse::done(format!(
        "{}/{} restarted",
        namespace, name
    )))))
}

fn restart_patch(at: &str) -> serde_json::Value {
    json!({
        "spec": {
            "template": {
                "metadata": {
                    "annotations": { RESTARTED_AT_ANNOTATION: at }
                }
            }
        }
    })
}

/// 列出与某个对象相关的 Events
pub async fn object_events<K>(
    State(state): State<AppState>,
    rp: ResourcePath,
    Query(query): Query<DataSelectQuery>,
) -> Result<ListResponse<EventItem>>
where
    K: ResourceKind + Resource<Scope = NamespaceResourceScope>,
{
    let (namespace, name) = (rp.namespace()?, rp.name()?);
    let api: Api<corev1::Event> = Api::namespaced(client(&state, &rp)?, namespace);

    let events = api
        .list(&ListParams::default().fields(&format!(
            "involvedObject.name={},involvedObject.kind={}",
            name,
            K::kind(&())
        )))
        .await
        .context(error::KubeApiSnafu)?;

    Ok(list_response(events.items, &query))
}

/// 获取 Pod 日志
pub async fn pod_logs(
    State(state): State<AppState>,
    rp: ResourcePath,
    Query(query): Query<LogQuery>,
) -> Result<Json<Envelope<PodLogs>>> {
    let (namespace, name) = (rp.namespace()?, rp.name()?);
    let api: Api<corev1::Pod> = Api::namespaced(client(&state, &rp)?, namespace);

    let params = LogParams {
        container: query.container.clone(),
        tail_lines: query.tail_lines.or(Some(500)),
        previous: query.previous,
        ..Default::default()
    };
    let logs = api.logs(name, &params).await.context(error::KubeApiSnafu)?;

    Ok(Json(Envelope::ok(PodLogs {
        pod: name.to_string(),
        container: query.container,
        logs: logs.lines().map(str::to_string).collect(),
    })))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_restart_patch() {
        let patch = restart_patch("2025-01-01T00:00:00+00:00");
        assert_eq!(
            patch["spec"]["template"]["metadata"]["annotations"][RESTARTED_AT_ANNOTATION],
            "2025-01-01T00:00:00+00:00"
        );
    }

    #[test]
    fn test_list_response_selects() {
        let deployments = vec![
            crate::tests::create_test_deployment("web", "prod", 2, 2),
            crate::tests::create_test_deployment("api", "prod", 1, 0),
        ];
        let query = DataSelectQuery {
            items_per_page: Some(1),
            page: Some(2),
            ..Default::default()
        };
        let Json(envelope) = list_response(deployments, &query);
        let list = envelope.data.unwrap();
        assert_eq!(list.list_meta.total_items, 2);
        assert_eq!(list.items.len(), 1);
        assert_eq!(list.items[0].object_meta.name, "web");
    }
}
