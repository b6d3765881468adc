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

//! `cluster.karmada.io/v1alpha1` Cluster, the registration of a member cluster.

use k8s_openapi::api::core::v1 as corev1;
use k8s_openapi::apimachinery::pkg::api::resource::Quantity;
use k8s_openapi::apimachinery::pkg::apis::meta::v1 as metav1;
use k8s_openapi::schemars::JsonSchema;
use kube::{CustomResource, KubeSchema};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use strum::Display;

pub const GROUP: &str = "cluster.karmada.io";
pub const VERSION: &str = "v1alpha1";

/// Path prefix of the Karmada aggregated proxy for member clusters.
pub const PROXY_PREFIX: &str = const_str::concat!("/apis/", GROUP, "/", VERSION, "/clusters/");

/// How Karmada talks to the member cluster.
/// - Push: the control plane reaches the member apiserver directly
/// - Pull: an agent in the member cluster pulls work from the control plane
#[derive(Default, Deserialize, Serialize, Clone, Debug, JsonSchema, Display, PartialEq, Eq)]
pub enum SyncMode {
    #[strum(to_string = "Push")]
    #[default]
    Push,

    #[strum(to_string = "Pull")]
    Pull,
}

#[derive(CustomResource, Deserialize, Serialize, Clone, Debug, KubeSchema, Default)]
#[kube(
    group = "cluster.karmada.io",
    version = "v1alpha1",
    kind = "Cluster",
    status = "ClusterStatus",
    plural = "clusters",
    singular = "cluster",
    crates(serde_json = "k8s_openapi::serde_json")
)]
#[serde(rename_all = "camelCase")]
pub struct ClusterSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    #[serde(default)]
    pub sync_mode: SyncMode,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_endpoint: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secret_ref: Option<LocalSecretReference>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub impersonator_secret_ref: Option<LocalSecretReference>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub insecure_skip_tls_verification: Option<bool>,

    #[serde(default, rename = "proxyURL", skip_serializing_if = "Option::is_none")]
    pub proxy_url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub zones: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub taints: Vec<corev1::Taint>,
}

#[derive(Deserialize, Serialize, Clone, Debug, JsonSchema, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct LocalSecretReference {
    pub namespace: String,
    pub name: String,
}

#[derive(Deserialize, Serialize, Clone, Debug, JsonSchema, Default)]
#[serde(rename_all = "camelCase")]
pub struct ClusterStatus {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kubernetes_version: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conditions: Vec<metav1::Condition>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node_summary: Option<NodeSummary>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_summary: Option<ResourceSummary>,
}

#[derive(Deserialize, Serialize, Clone, Debug, JsonSchema, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct NodeSummary {
    #[serde(default)]
    pub total_num: i32,
    #[serde(default)]
    pub ready_num: i32,
}

#[derive(Deserialize, Serialize, Clone, Debug, JsonSchema, Default)]
#[serde(rename_all = "camelCase")]
pub struct ResourceSummary {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allocatable: Option<BTreeMap<String, Quantity>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allocating: Option<BTreeMap<String, Quantity>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allocated: Option<BTreeMap<String, Quantity>>,
}

impl Cluster {
    /// A cluster is ready when its `Ready` condition is `True`.
    pub fn is_ready(&self) -> bool {
        self.status.as_ref().is_some_and(|s| {
            s.conditions
                .iter()
                .any(|c| c.type_ == "Ready" && c.status == "True")
        })
    }

    pub fn kubernetes_version(&self) -> Option<&str> {
        self.status
            .as_ref()
            .and_then(|s| s.kubernetes_version.as_deref())
    }
}

#[cfg(test)]
mod tests {
    use crate::tests::create_test_cluster;

    #[test]
    fn test_proxy_prefix() {
        assert_eq!(
            super::PROXY_PREFIX,
            "/apis/cluster.karmada.io/v1alpha1/clusters/"
        );
    }

    #[test]
    fn test_is_ready() {
        assert!(create_test_cluster("member1", true).is_ready());
        assert!(!create_test_cluster("member2", false).is_ready());

        let mut no_status = create_test_cluster("member3", true);
        no_status.status = None;
        assert!(!no_status.is_ready());
    }

    #[test]
    fn test_deserialize_cluster() {
        let cluster: super::Cluster = serde_json::from_value(serde_json::json!({
            "apiVersion": "cluster.karmada.io/v1alpha1",
            "kind": "Cluster",
            "metadata": { "name": "member1" },
            "spec": {
                "syncMode": "Pull",
                "apiEndpoint": "https://172.18.0.3:6443",
                "proxyURL": "http://proxy:3128"
            },
            "status": {
                "kubernetesVersion": "v1.30.0",
                "nodeSummary": { "totalNum": 3, "readyNum": 2 }
            }
        }))
        .unwrap();

        assert_eq!(cluster.spec.sync_mode, super::SyncMode::Pull);
        assert_eq!(cluster.spec.proxy_url.as_deref(), Some("http://proxy:3128"));
        assert_eq!(cluster.kubernetes_version(), Some("v1.30.0"));
        assert!(!cluster.is_ready());
    }
}
