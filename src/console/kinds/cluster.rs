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
use k8s_openapi::apimachinery::pkg::api::resource::Quantity;
use serde::Serialize;
use std::collections::BTreeMap;

use super::ResourceKind;
use crate::console::models::common::timestamp;
use crate::types::v1alpha1::cluster::{Cluster, NodeSummary};
use crate::utils::quantity;

const SKIP_AUTO_PROPAGATION_LABEL: &str = "namespace.karmada.io/skip-auto-propagation";
const NODE_ROLE_PREFIX: &str = "node-role.kubernetes.io/";

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NamespaceSummary {
    pub phase: String,
    /// Karmada 不会自动把该命名空间分发到成员集群
    pub skip_auto_propagation: bool,
}

impl ResourceKind for corev1::Namespace {
    type Summary = NamespaceSummary;

    fn summary(&self) -> NamespaceSummary {
        NamespaceSummary {
            phase: self
                .status
                .as_ref()
                .and_then(|s| s.phase.clone())
                .unwrap_or_else(|| "Active".to_string()),
            skip_auto_propagation: self
                .metadata
                .labels
                .as_ref()
                .and_then(|l| l.get(SKIP_AUTO_PROPAGATION_LABEL))
                .is_some_and(|v| v == "true"),
        }
    }
}

/// 节点信息
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeInfo {
    pub ready: bool,
    pub roles: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kubelet_version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub internal_ip: Option<String>,
    pub cpu_capacity: String,
    pub memory_capacity: String,
    pub cpu_allocatable: String,
    pub memory_allocatable: String,
    pub unschedulable: bool,
}

fn resource(list: Option<&BTreeMap<String, Quantity>>, name: &str) -> String {
    list.and_then(|l| l.get(name))
        .map(|q| q.0.clone())
        .unwrap_or_default()
}

pub fn node_ready(node: &corev1::Node) -> bool {
    node.status
        .as_ref()
        .and_then(|s| s.conditions.as_ref())
        .and_then(|conds| conds.iter().find(|c| c.type_ == "Ready"))
        .is_some_and(|c| c.status == "True")
}

impl ResourceKind for corev1::Node {
    type Summary = NodeInfo;

    fn summary(&self) -> NodeInfo {
        let status = self.status.as_ref();
        let capacity = status.and_then(|s| s.capacity.as_ref());
        let allocatable = status.and_then(|s| s.allocatable.as_ref());

        let mut roles: Vec<String> = self
            .metadata
            .labels
            .as_ref()
            .map(|labels| {
                labels
                    .keys()
                    .filter_map(|k| k.strip_prefix(NODE_ROLE_PREFIX))
                    .filter(|role| !role.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();
        roles.sort();

        NodeInfo {
            ready: node_ready(self),
            roles,
            kubelet_version: status
                .and_then(|s| s.node_info.as_ref())
                .map(|i| i.kubelet_version.clone()),
            internal_ip: status
                .and_then(|s| s.addresses.as_ref())
                .and_then(|addrs| addrs.iter().find(|a| a.type_ == "InternalIP"))
                .map(|a| a.address.clone()),
            cpu_capacity: resource(capacity, "cpu"),
            memory_capacity: resource(capacity, "memory"),
            cpu_allocatable: resource(allocatable, "cpu"),
            memory_allocatable: resource(allocatable, "memory"),
            unschedulable: self
                .spec
                .as_ref()
                .and_then(|s| s.unschedulable)
                .unwrap_or(false),
        }
    }
}

/// 事件信息
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventItem {
    pub event_type: String,
    pub reason: String,
    pub message: String,
    pub involved_object: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_timestamp: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_timestamp: Option<String>,
    pub count: i32,
}

impl ResourceKind for corev1::Event {
    type Summary = EventItem;

    fn summary(&self) -> EventItem {
        EventItem {
            event_type: self.type_.clone().unwrap_or_default(),
            reason: self.reason.clone().unwrap_or_default(),
            message: self.message.clone().unwrap_or_default(),
            involved_object: format!(
                "{}/{}",
                self.involved_object.kind.clone().unwrap_or_default(),
                self.involved_object.name.clone().unwrap_or_default()
            ),
            source: self
                .source
                .as_ref()
                .and_then(|s| s.component.clone())
                .or_else(|| self.reporting_component.clone()),
            first_timestamp: self.first_timestamp.as_ref().and_then(timestamp),
            last_timestamp: self.last_timestamp.as_ref().and_then(timestamp),
            count: self.count.unwrap_or(1),
        }
    }
}

/// 资源用量, 已分配/可分配
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceUsage {
    pub allocatable: f64,
    pub allocated: f64,
    /// 0-100
    pub fraction: f64,
}

impl ResourceUsage {
    pub fn new(allocatable: f64, allocated: f64) -> Self {
        let fraction = if allocatable > 0.0 {
            (allocated / allocatable * 100.0).clamp(0.0, 100.0)
        } else {
            0.0
        };
        Self {
            allocatable,
            allocated,
            fraction,
        }
    }

    pub fn of(cluster: &Cluster, resource: &str) -> Self {
        let summary = cluster
            .status
            .as_ref()
            .and_then(|s| s.resource_summary.as_ref());
        Self::new(
            quantity::value_of(summary.and_then(|s| s.allocatable.as_ref()), resource),
            quantity::value_of(summary.and_then(|s| s.allocated.as_ref()), resource),
        )
    }
}

/// 成员集群信息
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterSummary {
    pub ready: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kubernetes_version: Option<String>,
    pub sync_mode: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_endpoint: Option<String>,
    pub node_summary: NodeSummary,
    pub cpu: ResourceUsage,
    pub memory: ResourceUsage,
}

impl ResourceKind for Cluster {
    type Summary = ClusterSummary;

    fn summary(&self) -> ClusterSummary {
        ClusterSummary {
            ready: self.is_ready(),
            kubernetes_version: self.kubernetes_version().map(str::to_string),
            sync_mode: self.spec.sync_mode.to_string(),
            api_endpoint: self.spec.api_endpoint.clone(),
            node_summary: self
                .status
                .as_ref()
                .and_then(|s| s.node_summary.clone())
                .unwrap_or_default(),
            cpu: ResourceUsage::of(self, "cpu"),
            memory: ResourceUsage::of(self, "memory"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::{create_test_cluster, create_test_node};

    #[test]
    fn test_node_summary() {
        let node = create_test_node("worker-1", true, "8", "32Gi", Some(2));
        let info = node.summary();
        assert!(info.ready);
        assert_eq!(info.roles, vec!["worker"]);
        assert_eq!(info.cpu_capacity, "8");
        assert_eq!(info.memory_allocatable, "32Gi");
        assert_eq!(info.internal_ip.as_deref(), Some("192.168.1.10"));
    }

    #[test]
    fn test_namespace_skip_auto_propagation() {
        let mut ns = corev1::Namespace::default();
        assert!(!ns.summary().skip_auto_propagation);

        ns.metadata.labels = Some(
            [(SKIP_AUTO_PROPAGATION_LABEL.to_string(), "true".to_string())]
                .into_iter()
                .collect(),
        );
        let summary = ns.summary();
        assert!(summary.skip_auto_propagation);
        assert_eq!(summary.phase, "Active");
    }

    #[test]
    fn test_cluster_summary_usage() {
        let cluster = create_test_cluster("member1", true);
        let summary = cluster.summary();
        assert!(summary.ready);
        assert_eq!(summary.sync_mode, "Push");
        assert_eq!(summary.node_summary.total_num, 3);
        assert_eq!(summary.cpu.allocatable, 12.0);
        assert_eq!(summary.cpu.allocated, 3.0);
        assert_eq!(summary.cpu.fraction, 25.0);
    }

    #[test]
    fn test_resource_usage_without_capacity() {
        let usage = ResourceUsage::new(0.0, 5.0);
        assert_eq!(usage.fraction, 0.0);
    }
}
