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

use k8s_openapi::api::core::v1 as corev1;
use kube::ResourceExt;
use serde::Serialize;

use crate::console::kinds::cluster::node_ready;
use crate::utils::quantity;

/// 带 GPU 的节点
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GpuNode {
    pub name: String,
    pub ready: bool,
    /// 命中的扩展资源名, 如 `nvidia.com/gpu`
    pub resource_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub product: Option<String>,
    pub capacity: u64,
    pub allocatable: u64,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ClusterGpu {
    pub cluster: String,
    pub nodes: Vec<GpuNode>,
    pub capacity: u64,
    pub allocatable: u64,
}

impl ClusterGpu {
    pub fn new(cluster: impl Into<String>, nodes: Vec<GpuNode>) -> Self {
        Self {
            cluster: cluster.into(),
            capacity: nodes.iter().map(|n| n.capacity).sum(),
            allocatable: nodes.iter().map(|n| n.allocatable).sum(),
            nodes,
        }
    }
}

/// 所有就绪成员集群的 GPU 清单
#[derive(Debug, Clone, Default, Serialize)]
pub struct GpuInventory {
    pub clusters: Vec<ClusterGpu>,
    pub capacity: u64,
    pub allocatable: u64,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<String>,
}

impl GpuInventory {
    pub fn new(clusters: Vec<ClusterGpu>, errors: Vec<String>) -> Self {
        Self {
            capacity: clusters.iter().map(|c| c.capacity).sum(),
            allocatable: clusters.iter().map(|c| c.allocatable).sum(),
            clusters,
            errors,
        }
    }
}

/// 节点的 GPU 信息, 不含任何 GPU 资源时返回 None
///
/// 按 `resource_names` 顺序取第一个容量大于 0 的资源.
pub fn gpu_node(node: &corev1::Node, resource_names: &[String], product_label: &str) -> Option<GpuNode> {
    let status = node.status.as_ref()?;

    resource_names.iter().find_map(|name| {
        let capacity = quantity::value_of(status.capacity.as_ref(), name).max(0.0) as u64;
        if capacity == 0 {
            return None;
        }
        Some(GpuNode {
            name: node.name_any(),
            ready: node_ready(node),
            resource_name: name.clone(),
            product: node.labels().get(product_label).cloned(),
            capacity,
            allocatable: quantity::value_of(status.allocatable.as_ref(), name).max(0.0) as u64,
        })
    })
}
