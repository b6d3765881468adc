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

//! Per-kind list summaries.
//!
//! Every resource served by the typed routes implements [`ResourceKind`], which
//! turns a Kubernetes object into the compact summary the list pages render.

use k8s_openapi::api::core::v1 as corev1;
use kube::Resource;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::fmt::Debug;

use crate::console::models::common::{ObjectMeta, ResourceDetail, ResourceItem, TypeMeta};

pub mod cluster;
pub mod config;
pub mod network;
pub mod policy;
pub mod workload;

pub trait ResourceKind:
    Resource<DynamicType = ()> + Clone + Debug + Serialize + DeserializeOwned + Send + Sync + 'static
{
    type Summary: Serialize + Send + Sync + 'static;

    /// Supports `PUT .../scale`.
    const SCALABLE: bool = false;

    /// Supports `PUT .../restart`.
    const RESTARTABLE: bool = false;

    fn summary(&self) -> Self::Summary;
}

pub fn type_meta<K: ResourceKind>() -> TypeMeta {
    TypeMeta {
        kind: K::kind(&()).to_lowercase(),
        scalable: K::SCALABLE,
        restartable: K::RESTARTABLE,
    }
}

pub fn to_item<K: ResourceKind>(obj: &K) -> ResourceItem<K::Summary> {
    ResourceItem {
        object_meta: ObjectMeta::from(obj.meta()),
        type_meta: type_meta::<K>(),
        summary: obj.summary(),
    }
}

pub fn to_detail<K: ResourceKind>(obj: K) -> ResourceDetail<K::Summary, K> {
    ResourceDetail {
        object_meta: ObjectMeta::from(obj.meta()),
        type_meta: type_meta::<K>(),
        summary: obj.summary(),
        object: obj,
    }
}

/// Images of the regular and init containers of a pod template.
#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Images {
    pub container_images: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub init_container_images: Vec<String>,
}

impl Images {
    pub fn of(spec: Option<&corev1::PodSpec>) -> Self {
        let Some(spec) = spec else {
            return Self::default();
        };
        let images = |containers: &[corev1::Container]| {
            containers
                .iter()
                .filter_map(|c| c.image.clone())
                .collect::<Vec<_>>()
        };
        Self {
            container_images: images(&spec.containers),
            init_container_images: spec
                .init_containers
                .as_deref()
                .map(images)
                .unwrap_or_default(),
        }
    }

    pub fn of_template(template: Option<&corev1::PodTemplateSpec>) -> Self {
        Self::of(template.and_then(|t| t.spec.as_ref()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::create_test_deployment;
    use k8s_openapi::api::apps::v1 as appsv1;

    #[test]
    fn test_type_meta() {
        let meta = type_meta::<appsv1::Deployment>();
        assert_eq!(meta.kind, "deployment");
        assert!(meta.scalable);
        assert!(meta.restartable);

        let meta = type_meta::<corev1::ConfigMap>();
        assert_eq!(meta.kind, "configmap");
        assert!(!meta.scalable);
    }

    #[test]
    fn test_item_serialization() {
        let item = to_item(&create_test_deployment("nginx", "default", 3, 2));
        let value = serde_json::to_value(&item).unwrap();

        assert_eq!(value["objectMeta"]["name"], "nginx");
        assert_eq!(value["typeMeta"]["kind"], "deployment");
        assert_eq!(value["pods"]["desired"], 3);
        assert_eq!(value["containerImages"], serde_json::json!(["nginx:1.25"]));
    }
}
