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
use k8s_openapi::api::networking::v1 as networkingv1;
use k8s_openapi::apimachinery::pkg::util::intstr::IntOrString;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

use super::ResourceKind;

/// Service 端口信息
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ServicePort {
    pub name: String,
    pub port: i32,
    pub protocol: String,
    pub target_port: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub node_port: Option<i32>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceSummary {
    pub service_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cluster_ip: Option<String>,
    pub ports: Vec<ServicePort>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub external_endpoints: Vec<String>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub selector: BTreeMap<String, String>,
}

impl ResourceKind for corev1::Service {
    type Summary = ServiceSummary;

    fn summary(&self) -> ServiceSummary {
        let spec = self.spec.as_ref();
        let ports = spec
            .and_then(|s| s.ports.as_ref())
            .map(|ports| {
                ports
                    .iter()
                    .map(|p| ServicePort {
                        name: p.name.clone().unwrap_or_default(),
                        port: p.port,
                        protocol: p.protocol.clone().unwrap_or_else(|| "TCP".to_string()),
                        target_port: p
                            .target_port
                            .as_ref()
                            .map(|tp| match tp {
                                IntOrString::Int(i) => i.to_string(),
                                IntOrString::String(s) => s.clone(),
                            })
                            .unwrap_or_else(|| p.port.to_string()),
                        node_port: p.node_port,
                    })
                    .collect()
            })
            .unwrap_or_default();

        let external_endpoints = self
            .status
            .as_ref()
            .and_then(|s| s.load_balancer.as_ref())
            .and_then(|lb| lb.ingress.as_ref())
            .map(|ingress| {
                ingress
                    .iter()
                    .filter_map(|i| i.ip.clone().or_else(|| i.hostname.clone()))
                    .collect()
            })
            .unwrap_or_default();

        ServiceSummary {
            service_type: spec
                .and_then(|s| s.type_.clone())
                .unwrap_or_else(|| "ClusterIP".to_string()),
            cluster_ip: spec.and_then(|s| s.cluster_ip.clone()),
            ports,
            external_endpoints,
            selector: spec.and_then(|s| s.selector.clone()).unwrap_or_default(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IngressSummary {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ingress_class: Option<String>,
    pub hosts: Vec<String>,
    pub endpoints: Vec<String>,
}

impl ResourceKind for networkingv1::Ingress {
    type Summary = IngressSummary;

    fn summary(&self) -> IngressSummary {
        let spec = self.spec.as_ref();
        let hosts: BTreeSet<String> = spec
            .and_then(|s| s.rules.as_ref())
            .map(|rules| rules.iter().filter_map(|r| r.host.clone()).collect())
            .unwrap_or_default();

        IngressSummary {
            ingress_class: spec.and_then(|s| s.ingress_class_name.clone()),
            hosts: hosts.into_iter().collect(),
            endpoints: self
                .status
                .as_ref()
                .and_then(|s| s.load_balancer.as_ref())
                .and_then(|lb| lb.ingress.as_ref())
                .map(|ingress| {
                    ingress
                        .iter()
                        .filter_map(|i| i.ip.clone().or_else(|| i.hostname.clone()))
                        .collect()
                })
                .unwrap_or_default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_service_summary() {
        let svc: corev1::Service = serde_json::from_value(serde_json::json!({
            "apiVersion": "v1",
            "kind": "Service",
            "metadata": { "name": "web", "namespace": "default" },
            "spec": {
                "type": "LoadBalancer",
                "clusterIP": "10.96.0.10",
                "selector": { "app": "web" },
                "ports": [
                    { "name": "http", "port": 80, "targetPort": 8080, "nodePort": 30080 },
                    { "port": 443, "targetPort": "https", "protocol": "TCP" }
                ]
            },
            "status": { "loadBalancer": { "ingress": [{ "ip": "203.0.113.7" }] } }
        }))
        .unwrap();

        let summary = svc.summary();
        assert_eq!(summary.service_type, "LoadBalancer");
        assert_eq!(summary.ports[0].target_port, "8080");
        assert_eq!(summary.ports[0].node_port, Some(30080));
        assert_eq!(summary.ports[1].target_port, "https");
        assert_eq!(summary.external_endpoints, vec!["203.0.113.7"]);
        assert_eq!(summary.selector.get("app").map(String::as_str), Some("web"));
    }

    #[test]
    fn test_ingress_summary() {
        let ingress: networkingv1::Ingress = serde_json::from_value(serde_json::json!({
            "apiVersion": "networking.k8s.io/v1",
            "kind": "Ingress",
            "metadata": { "name": "web", "namespace": "default" },
            "spec": {
                "ingressClassName": "nginx",
                "rules": [{ "host": "web.example.com" }, { "host": "web.example.com" }]
            }
        }))
        .unwrap();

        let summary = ingress.summary();
        assert_eq!(summary.ingress_class.as_deref(), Some("nginx"));
        assert_eq!(summary.hosts, vec!["web.example.com"]);
        assert!(summary.endpoints.is_empty());
    }

    #[test]
    fn test_ingress_hosts_are_unique() {
        let ingress: networkingv1::Ingress = serde_json::from_value(serde_json::json!({
            "apiVersion": "networking.k8s.io/v1",
            "kind": "Ingress",
            "metadata": { "name": "shop", "namespace": "default" },
            "spec": {
                "rules": [
                    { "host": "b.example.com" },
                    { "host": "a.example.com" },
                    { "host": "b.example.com" },
                    {}
                ]
            }
        }))
        .unwrap();

        let summary = ingress.summary();
        assert_eq!(summary.hosts, vec!["a.example.com", "b.example.com"]);
    }
}
