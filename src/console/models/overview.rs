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

use serde::Serialize;

use crate::console::kinds::cluster::ResourceUsage;
use crate::types::v1alpha1::cluster::Cluster;
use crate::utils::quantity;

/// karmada-apiserver 状态
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct KarmadaInfo {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    /// `running` 或 `unknown`
    pub status: String,
}

#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct Count {
    pub total: u32,
    pub ready: u32,
}

/// 策略数量, 统计失败时为 0
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PolicyCounts {
    pub propagation_policies: usize,
    pub cluster_propagation_policies: usize,
    pub override_policies: usize,
    pub cluster_override_policies: usize,
}

/// 成员集群资源汇总
#[derive(Debug, Clone, Default, Serialize)]
pub struct ClusterTotals {
    pub clusters: Count,
    pub nodes: Count,
    pub cpu: ResourceUsage,
    pub memory: ResourceUsage,
    pub pods: ResourceUsage,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Overview {
    pub karmada: KarmadaInfo,
    #[serde(flatten)]
    pub totals: ClusterTotals,
    pub policies: PolicyCounts,
}

/// 汇总 `Cluster.status` 中的节点数与资源量
pub fn summarize(clusters: &[Cluster]) -> ClusterTotals {
    let mut totals = ClusterTotals::default();
    let mut allocatable = [0.0f64; 3];
    let mut allocated = [0.0f64; 3];

    for cluster in clusters {
        totals.clusters.total += 1;
        if cluster.is_ready() {
            totals.clusters.ready += 1;
        }

        let Some(status) = cluster.status.as_ref() else {
            continue;
        };
        if let Some(nodes) = &status.node_summary {
            totals.nodes.total += nodes.total_num.max(0) as u32;
            totals.nodes.ready += nodes.ready_num.max(0) as u32;
        }
        if let Some(summary) = &status.resource_summary {
            for (i, name) in ["cpu", "memory", "pods"].iter().enumerate() {
                allocatable[i] += quantity::value_of(summary.allocatable.as_ref(), name);
                allocated[i] += quantity::value_of(summary.allocated.as_ref(), name);
            }
        }
    }

    totals.cpu = ResourceUsage::new(allocatable[0], allocated[0]);
    totals.memory = ResourceUsage::new(allocatable[1], allocated[1]);
    totals.pods = ResourceUsage::new(allocatable[2], allocated[2]);
    totals
}
