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

use axum::{
    Json,
    extract::{Query, State},
};
use k8s_openapi::NamespaceResourceScope;
use kube::{Api, Resource};

use crate::console::{
    aggregate,
    dataselect::DataSelectQuery,
    error::Result,
    extract::ResourcePath,
    kinds::ResourceKind,
    models::common::{ClusterItem, Envelope, ResourceItem, ResourceList},
    state::AppState,
};

pub type AggregatedResponse<S> = Json<Envelope<ResourceList<ClusterItem<ResourceItem<S>>>>>;

/// 跨所有就绪成员集群列出命名空间级资源
pub async fn list_namespaced<K>(
    State(state): State<AppState>,
    rp: ResourcePath,
    Query(query): Query<DataSelectQuery>,
) -> Result<AggregatedResponse<K::Summary>>
where
    K: ResourceKind + Resource<Scope = NamespaceResourceScope>,
{
    let namespace = rp.namespace.clone();
    let (items, errors) = aggregate::list_across::<K, _>(&state, rp.token(), |client| {
        match &namespace {
            Some(ns) => Api::namespaced(client, ns),
            None => Api::all(client),
        }
    })
    .await?;

    Ok(Json(Envelope::ok(ResourceList::select(items, &query, errors))))
}

/// 跨所有就绪成员集群列出集群级资源
pub async fn list_cluster<K: ResourceKind>(
    State(state): State<AppState>,
    rp: ResourcePath,
    Query(query): Query<DataSelectQuery>,
) -> Result<AggregatedResponse<K::Summary>> {
    let (items, errors) = aggregate::list_across::<K, _>(&state, rp.token(), Api::all).await?;
    Ok(Json(Envelope::ok(ResourceList::select(items, &query, errors))))
}
