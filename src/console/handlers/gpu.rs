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

use axum::{Extension, Json, extract::State};
use k8s_openapi::api::core::v1 as corev1;
use kube::{Api, api::ListParams};
use tracing::debug;

use crate::console::{
    aggregate::{fan_out, ready_cluster_names},
    error::{Error, Result},
    models::common::Envelope,
    models::gpu::{ClusterGpu, GpuInventory, gpu_node},
    state::{AppState, Claims},
};
use crate::context::Target;

/// 各就绪成员集群的 GPU 节点
pub async fn inventory(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<Envelope<GpuInventory>>> {
    let token = claims.token();
    let clusters = ready_cluster_names(&state, token).await?;
    let config = state.dashboard.clone();
    let state = &state;

    let fanned = fan_out(clusters, move |cluster| {
        let client = state.context.client(&Target::Member(cluster), token);
        async move {
            let api: Api<corev1::Node> = Api::all(client?);
            let nodes = api.list(&ListParams::default()).await?;
            Ok::<_, Error>(nodes.items)
        }
    })
    .await;

    let clusters: Vec<ClusterGpu> = fanned
        .results
        .into_iter()
        .map(|(cluster, nodes)| {
            let gpus = nodes
                .iter()
                .filter_map(|n| gpu_node(n, &config.gpu_resource_names, &config.gpu_product_label))
                .collect();
            ClusterGpu::new(cluster, gpus)
        })
        .collect();
    debug!("gpu inventory over {} clusters", clusters.len());

    Ok(Json(Envelope::ok(GpuInventory::new(clusters, fanned.errors))))
}
