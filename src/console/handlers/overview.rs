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
use kube::{Api, Client, Resource, api::ListParams};
use serde::de::DeserializeOwned;
use std::fmt::Debug;
use tracing::warn;

use crate::console::{
    error::Result,
    models::common::Envelope,
    models::overview::{KarmadaInfo, Overview, PolicyCounts, summarize},
    state::{AppState, Claims},
};
use crate::context::Target;
use crate::types::v1alpha1::policy::{
    ClusterOverridePolicy, ClusterPropagationPolicy, OverridePolicy, PropagationPolicy,
};

/// 统计资源数量, 失败时记录日志并返回 0
async fn count<K>(client: Client) -> usize
where
    K: Resource<DynamicType = ()> + Clone + Debug + DeserializeOwned,
{
    let api: Api<K> = Api::all(client);
    match api.list_metadata(&ListParams::default()).await {
        Ok(list) => list.items.len(),
        Err(e) => {
            warn!("failed to count {}: {}", K::kind(&()), e);
            0
        }
    }
}

/// 控制面概览
pub async fn overview(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<Envelope<Overview>>> {
    let token = claims.token();

    let karmada = match state.context.server_version(&Target::Karmada, token).await {
        Ok(info) => KarmadaInfo {
            version: Some(info.git_version),
            status: "running".to_string(),
        },
        Err(e) => {
            warn!("karmada-apiserver version check failed: {}", e);
            KarmadaInfo {
                version: None,
                status: "unknown".to_string(),
            }
        }
    };

    let clusters = state.context.clusters(token).await?;
    let client = state.context.client(&Target::Karmada, token)?;
    let (pp, cpp, op, cop) = tokio::join!(
        count::<PropagationPolicy>(client.clone()),
        count::<ClusterPropagationPolicy>(client.clone()),
        count::<OverridePolicy>(client.clone()),
        count::<ClusterOverridePolicy>(client),
    );

    Ok(Json(Envelope::ok(Overview {
        karmada,
        totals: summarize(&clusters),
        policies: PolicyCounts {
            propagation_policies: pp,
            cluster_propagation_policies: cpp,
            override_policies: op,
            cluster_override_policies: cop,
        },
    })))
}
