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

//! `policy.karmada.io/v1alpha1` propagation and override policies.
//!
//! Only the fields the dashboard summarises are typed; overriders and spread
//! constraints are kept as raw JSON so unknown fields survive a round trip.

use k8s_openapi::apimachinery::pkg::apis::meta::v1 as metav1;
use k8s_openapi::schemars::JsonSchema;
use kube::{CustomResource, KubeSchema};
use serde::{Deserialize, Serialize};

#[derive(Deserialize, Serialize, Clone, Debug, JsonSchema, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ResourceSelector {
    pub api_version: String,
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label_selector: Option<metav1::LabelSelector>,
}

impl ResourceSelector {
    /// `Deployment/default/nginx`, `Deployment/*` when no name is given.
    pub fn display(&self) -> String {
        let mut out = self.kind.clone();
        if let Some(ns) = &self.namespace {
            out.push('/');
            out.push_str(ns);
        }
        out.push('/');
        out.push_str(self.name.as_deref().unwrap_or("*"));
        out
    }
}

#[derive(Deserialize, Serialize, Clone, Debug, JsonSchema, Default)]
#[serde(rename_all = "camelCase")]
pub struct ClusterAffinity {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub cluster_names: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub exclude: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label_selector: Option<metav1::LabelSelector>,
}

#[derive(Deserialize, Serialize, Clone, Debug, JsonSchema, Default)]
#[serde(rename_all = "camelCase")]
pub struct ReplicaScheduling {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub replica_scheduling_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub replica_division_preference: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weight_preference: Option<serde_json::Value>,
}

#[derive(Deserialize, Serialize, Clone, Debug, JsonSchema, Default)]
#[serde(rename_all = "camelCase")]
pub struct Placement {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cluster_affinity: Option<ClusterAffinity>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub cluster_tolerations: Vec<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub spread_constraints: Vec<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub replica_scheduling: Option<ReplicaScheduling>,
}

/// Fields shared by PropagationPolicy and ClusterPropagationPolicy.
#[derive(Deserialize, Serialize, Clone, Debug, JsonSchema, Default)]
#[serde(rename_all = "camelCase")]
pub struct PropagationSpec {
    pub resource_selectors: Vec<ResourceSelector>,
    #[serde(default)]
    pub placement: Placement,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preemption: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conflict_resolution: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scheduler_name: Option<String>,
}

#[derive(CustomResource, Deserialize, Serialize, Clone, Debug, KubeSchema, Default)]
#[kube(
    group = "policy.karmada.io",
    version = "v1alpha1",
    kind = "PropagationPolicy",
    namespaced,
    plural = "propagationpolicies",
    singular = "propagationpolicy",
    crates(serde_json = "k8s_openapi::serde_json")
)]
pub struct PropagationPolicySpec {
    #[serde(flatten)]
    pub inner: PropagationSpec,
}

#[derive(CustomResource, Deserialize, Serialize, Clone, Debug, KubeSchema, Default)]
#[kube(
    group = "policy.karmada.io",
    version = "v1alpha1",
    kind = "ClusterPropagationPolicy",
    plural = "clusterpropagationpolicies",
    singular = "clusterpropagationpolicy",
    crates(serde_json = "k8s_openapi::serde_json")
)]
pub struct ClusterPropagationPolicySpec {
    #[serde(flatten)]
    pub inner: PropagationSpec,
}

#[derive(Deserialize, Serialize, Clone, Debug, JsonSchema, Default)]
#[serde(rename_all = "camelCase")]
pub struct TargetCluster {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub cluster_names: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub exclude: Vec<String>,
}

#[derive(Deserialize, Serialize, Clone, Debug, JsonSchema, Default)]
#[serde(rename_all = "camelCase")]
pub struct OverrideRule {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_cluster: Option<TargetCluster>,
    #[serde(default)]
    pub overriders: serde_json::Value,
}

/// Fields shared by OverridePolicy and ClusterOverridePolicy.
#[derive(Deserialize, Serialize, Clone, Debug, JsonSchema, Default)]
#[serde(rename_all = "camelCase")]
pub struct OverrideSpec {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub resource_selectors: Vec<ResourceSelector>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub override_rules: Vec<OverrideRule>,
}

#[derive(CustomResource, Deserialize, Serialize, Clone, Debug, KubeSchema, Default)]
#[kube(
    group = "policy.karmada.io",
    version = "v1alpha1",
    kind = "OverridePolicy",
    namespaced,
    plural = "overridepolicies",
    singular = "overridepolicy",
    crates(serde_json = "k8s_openapi::serde_json")
)]
pub struct OverridePolicySpec {
    #[serde(flatten)]
    pub inner: OverrideSpec,
}

#[derive(CustomResource, Deserialize, Serialize, Clone, Debug, KubeSchema, Default)]
#[kube(
    group = "policy.karmada.io",
    version = "v1alpha1",
    kind = "ClusterOverridePolicy",
    plural = "clusteroverridepolicies",
    singular = "clusteroverridepolicy",
    crates(serde_json = "k8s_openapi::serde_json")
)]
pub struct ClusterOverridePolicySpec {
    #[serde(flatten)]
    pub inner: OverrideSpec,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_selector_display() {
        let selector = ResourceSelector {
            api_version: "apps/v1".to_string(),
            kind: "Deployment".to_string(),
            namespace: Some("default".to_string()),
            name: Some("nginx".to_string()),
            label_selector: None,
        };
        assert_eq!(selector.display(), "Deployment/default/nginx");

        let any = ResourceSelector {
            api_version: "v1".to_string(),
            kind: "ConfigMap".to_string(),
            ..Default::default()
        };
        assert_eq!(any.display(), "ConfigMap/*");
    }

    #[test]
    fn test_flattened_spec_round_trip() {
        let policy: PropagationPolicy = serde_json::from_value(serde_json::json!({
            "apiVersion": "policy.karmada.io/v1alpha1",
            "kind": "PropagationPolicy",
            "metadata": { "name": "nginx-propagation", "namespace": "default" },
            "spec": {
                "resourceSelectors": [{ "apiVersion": "apps/v1", "kind": "Deployment", "name": "nginx" }],
                "placement": { "clusterAffinity": { "clusterNames": ["member1", "member2"] } },
                "preemption": "Never"
            }
        }))
        .unwrap();

        let spec = &policy.spec.inner;
        assert_eq!(spec.resource_selectors.len(), 1);
        assert_eq!(
            spec.placement
                .cluster_affinity
                .as_ref()
                .map(|a| a.cluster_names.clone()),
            Some(vec!["member1".to_string(), "member2".to_string()])
        );

        let value = serde_json::to_value(&policy).unwrap();
        assert_eq!(value["spec"]["preemption"], "Never");
        assert!(value["spec"].get("inner").is_none());
    }
}
