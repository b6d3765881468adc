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

use super::ResourceKind;
use crate::types::v1alpha1::policy::{
    ClusterOverridePolicy, ClusterPropagationPolicy, OverridePolicy, OverrideSpec,
    PropagationPolicy, PropagationSpec,
};

/// 分发策略摘要
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PropagationSummary {
    pub resource_selectors: Vec<String>,
    pub cluster_names: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scheduling_type: Option<String>,
    pub priority: i32,
    pub preemption: String,
    pub conflict_resolution: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scheduler_name: Option<String>,
}

impl From<&PropagationSpec> for PropagationSummary {
    fn from(spec: &PropagationSpec) -> Self {
        let affinity = spec.placement.cluster_affinity.as_ref();
        Self {
            resource_selectors: spec.resource_selectors.iter().map(|s| s.display()).collect(),
            cluster_names: affinity.map(|a| a.cluster_names.clone()).unwrap_or_default(),
            scheduling_type: spec
                .placement
                .replica_scheduling
                .as_ref()
                .and_then(|r| r.replica_scheduling_type.clone()),
            priority: spec.priority.unwrap_or(0),
            preemption: spec.preemption.clone().unwrap_or_else(|| "Never".to_string()),
            conflict_resolution: spec
                .conflict_resolution
                .clone()
                .unwrap_or_else(|| "Abort".to_string()),
            scheduler_name: spec.scheduler_name.clone(),
        }
    }
}

impl ResourceKind for PropagationPolicy {
    type Summary = PropagationSummary;

    fn summary(&self) -> PropagationSummary {
        PropagationSummary::from(&self.spec.inner)
    }
}

impl ResourceKind for ClusterPropagationPolicy {
    type Summary = PropagationSummary;

    fn summary(&self) -> PropagationSummary {
        PropagationSummary::from(&self.spec.inner)
    }
}

/// 差异化策略摘要
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OverrideSummary {
    pub resource_selectors: Vec<String>,
    pub rule_count: usize,
    /// 所有规则指向的集群, 去重后排序
    pub target_clusters: Vec<String>,
}

impl From<&OverrideSpec> for OverrideSummary {
    fn from(spec: &OverrideSpec) -> Self {
        let mut target_clusters: Vec<String> = spec
            .override_rules
            .iter()
            .filter_map(|r| r.target_cluster.as_ref())
            .flat_map(|t| t.cluster_names.iter().cloned())
            .collect();
        target_clusters.sort();
        target_clusters.dedup();

        Self {
            resource_selectors: spec.resource_selectors.iter().map(|s| s.display()).collect(),
            rule_count: spec.override_rules.len(),
            target_clusters,
        }
    }
}

impl ResourceKind for OverridePolicy {
    type Summary = OverrideSummary;

    fn summary(&self) -> OverrideSummary {
        OverrideSummary::from(&self.spec.inner)
    }
}

impl ResourceKind for ClusterOverridePolicy {
    type Summary = OverrideSummary;

    fn summary(&self) -> OverrideSummary {
        OverrideSummary::from(&self.spec.inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_propagation_summary() {
        let policy: PropagationPolicy = serde_json::from_value(serde_json::json!({
            "apiVersion": "policy.karmada.io/v1alpha1",
            "kind": "PropagationPolicy",
            "metadata": { "name": "nginx", "namespace": "default" },
            "spec": {
                "resourceSelectors": [
                    { "apiVersion": "apps/v1", "kind": "Deployment", "name": "nginx" }
                ],
                "placement": {
                    "clusterAffinity": { "clusterNames": ["member1", "member2"] },
                    "replicaScheduling": { "replicaSchedulingType": "Divided" }
                },
                "priority": 10
            }
        }))
        .unwrap();

        let summary = policy.summary();
        assert_eq!(summary.resource_selectors, vec!["Deployment/nginx"]);
        assert_eq!(summary.cluster_names, vec!["member1", "member2"]);
        assert_eq!(summary.scheduling_type.as_deref(), Some("Divided"));
        assert_eq!(summary.priority, 10);
        assert_eq!(summary.preemption, "Never");
        assert_eq!(summary.conflict_resolution, "Abort");
    }

    #[test]
    fn test_override_summary_dedups_clusters() {
        let policy: ClusterOverridePolicy = serde_json::from_value(serde_json::json!({
            "apiVersion": "policy.karmada.io/v1alpha1",
            "kind": "ClusterOverridePolicy",
            "metadata": { "name": "images" },
            "spec": {
                "resourceSelectors": [{ "apiVersion": "apps/v1", "kind": "Deployment" }],
                "overrideRules": [
                    { "targetCluster": { "clusterNames": ["member2"] }, "overriders": {} },
                    { "targetCluster": { "clusterNames": ["member1", "member2"] }, "overriders": {} }
                ]
            }
        }))
        .unwrap();

        let summary = policy.summary();
        assert_eq!(summary.rule_count, 2);
        assert_eq!(summary.target_clusters, vec!["member1", "member2"]);
        assert_eq!(summary.resource_selectors, vec!["Deployment/*"]);
    }
}
