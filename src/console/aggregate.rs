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

//! Fan-out over member clusters.
//!
//! A cluster that fails is logged and skipped; its error is reported back to
//! the caller next to the results of the healthy clusters.

use futures::{StreamExt, stream};
use kube::api::ListParams;
use kube::{Api, Client, ResourceExt};
use std::fmt::Display;
use std::future::Future;
use tracing::{debug, warn};

use crate::console::error::Result;
use crate::console::kinds::{ResourceKind, to_item};
use crate::console::models::common::{ClusterItem, ResourceItem};
use crate::console::state::AppState;
use crate::context::Target;

/// Member clusters queried at the same time.
pub const MAX_CONCURRENCY: usize = 8;

#[derive(Debug)]
pub struct FanOut<T> {
    /// Per-cluster results ordered by cluster name.
    pub results: Vec<(String, T)>,
    /// `cluster: error` for every skipped cluster.
    pub errors: Vec<String>,
}

pub async fn fan_out<T, E, F, Fut>(clusters: Vec<String>, f: F) -> FanOut<T>
where
    E: Display,
    F: Fn(String) -> Fut,
    Fut: Future<Output = std::result::Result<T, E>>,
{
    let outcomes: Vec<(String, std::result::Result<T, E>)> = stream::iter(clusters)
        .map(|cluster| {
            let fut = f(cluster.clone());
            async move { (cluster, fut.await) }
        })
        .buffer_unordered(MAX_CONCURRENCY)
        .collect()
        .await;

    let mut results = Vec::with_capacity(outcomes.len());
    let mut errors = Vec::new();
    for (cluster, outcome) in outcomes {
        match outcome {
            Ok(value) => results.push((cluster, value)),
            Err(e) => {
                warn!("skipping member cluster {}: {}", cluster, e);
                errors.push(format!("{}: {}", cluster, e));
            }
        }
    }
    results.sort_by(|a, b| a.0.cmp(&b.0));
    errors.sort();

    FanOut { results, errors }
}

/// Names of the ready member clusters.
pub async fn ready_cluster_names(state: &AppState, token: Option<&str>) -> Result<Vec<String>> {
    let clusters = state.context.ready_clusters(token).await?;
    Ok(clusters.iter().map(|c| c.name_any()).collect())
}

/// Lists `K` in every ready member cluster and tags each item with its cluster.
pub async fn list_across<K, F>(
    state: &AppState,
    token: Option<&str>,
    api: F,
) -> Result<(Vec<ClusterItem<ResourceItem<K::Summary>>>, Vec<String>)>
where
    K: ResourceKind,
    F: Fn(Client) -> Api<K>,
{
    let clusters = ready_cluster_names(state, token).await?;
    debug!("listing {} across {} clusters", K::kind(&()), clusters.len());

    let api = &api;
    let fanned = fan_out(clusters, move |cluster| {
        let client = state.context.client(&Target::Member(cluster), token);
        async move {
            let list = api(client?).list(&ListParams::default()).await?;
            Ok::<_, crate::console::error::Error>(list.items)
        }
    })
    .await;

    let items = fanned
        .results
        .into_iter()
        .flat_map(|(cluster, objects)| {
            objects.into_iter().map(move |obj| ClusterItem {
                cluster: cluster.clone(),
                item: to_item(&obj),
            })
        })
        .collect();

    Ok((items, fanned.errors))
}
