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

use k8s_openapi::apimachinery::pkg::apis::meta::v1 as metav1;
use serde::Serialize;
use std::collections::BTreeMap;

use crate::console::dataselect::{DataCell, DataSelectQuery};

/// 统一响应信封 `{code, message, data}`
#[derive(Debug, Serialize)]
pub struct Envelope<T> {
    pub code: u16,
    pub message: String,
    pub data: Option<T>,
}

impl<T> Envelope<T> {
    pub fn ok(data: T) -> Self {
        Self {
            code: 200,
            message: "success".to_string(),
            data: Some(data),
        }
    }

    pub fn fail(code: u16, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            data: None,
        }
    }
}

/// RFC 3339 form of a Kubernetes timestamp.
pub fn timestamp(time: &metav1::Time) -> Option<String> {
    serde_json::to_value(time)
        .ok()
        .and_then(|v| v.as_str().map(str::to_owned))
}

/// 对象元数据
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectMeta {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uid: Option<String>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub annotations: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub creation_timestamp: Option<String>,
}

impl From<&metav1::ObjectMeta> for ObjectMeta {
    fn from(meta: &metav1::ObjectMeta) -> Self {
        Self {
            name: meta.name.clone().unwrap_or_default(),
            namespace: meta.namespace.clone(),
            uid: meta.uid.clone(),
            labels: meta.labels.clone().unwrap_or_default(),
            annotations: meta
                .annotations
                .clone()
                .unwrap_or_default()
                .into_iter()
                // 过大的注解没有展示价值
                .filter(|(k, _)| k != "kubectl.kubernetes.io/last-applied-configuration")
                .collect(),
            creation_timestamp: meta.creation_timestamp.as_ref().and_then(timestamp),
        }
    }
}

/// 类型元数据
#[derive(Debug, Clone, Serialize)]
pub struct TypeMeta {
    pub kind: String,
    pub scalable: bool,
    pub restartable: bool,
}

/// 列表元数据
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ListMeta {
    pub total_items: usize,
}

/// 列表项: 元数据 + 各资源类型的摘要
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceItem<S> {
    pub object_meta: ObjectMeta,
    pub type_meta: TypeMeta,
    #[serde(flatten)]
    pub summary: S,
}

impl<S> DataCell for ResourceItem<S> {
    fn name(&self) -> &str {
        &self.object_meta.name
    }

    fn namespace(&self) -> Option<&str> {
        self.object_meta.namespace.as_deref()
    }

    fn creation_timestamp(&self) -> Option<&str> {
        self.object_meta.creation_timestamp.as_deref()
    }
}

/// 详情: 列表项内容 + 原始对象
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceDetail<S, K> {
    pub object_meta: ObjectMeta,
    pub type_meta: TypeMeta,
    #[serde(flatten)]
    pub summary: S,
    pub object: K,
}

/// 聚合列表项, 带来源集群
#[derive(Debug, Clone, Serialize)]
pub struct ClusterItem<T> {
    pub cluster: String,
    #[serde(flatten)]
    pub item: T,
}

impl<T: DataCell> DataCell for ClusterItem<T> {
    fn name(&self) -> &str {
        self.item.name()
    }

    fn namespace(&self) -> Option<&str> {
        self.item.namespace()
    }

    fn creation_timestamp(&self) -> Option<&str> {
        self.item.creation_timestamp()
    }

    fn cluster(&self) -> Option<&str> {
        Some(&self.cluster)
    }
}

/// 资源列表响应
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceList<T> {
    pub list_meta: ListMeta,
    pub items: Vec<T>,
    /// 聚合时失败的集群, 格式 `cluster: error`
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<String>,
}

impl<T: DataCell> ResourceList<T> {
    /// 过滤, 排序, 分页后组装列表
    pub fn select(items: Vec<T>, query: &DataSelectQuery, errors: Vec<String>) -> Self {
        let (items, total_items) = query.apply(items);
        Self {
            list_meta: ListMeta { total_items },
            items,
            errors,
        }
    }
}

/// 通用操作结果
#[derive(Debug, Serialize)]
pub struct ActionResponse {
    pub success: bool,
    pub message: String,
}

impl ActionResponse {
    pub fn done(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_object_meta_from_kube() {
        let meta = metav1::ObjectMeta {
            name: Some("nginx".to_string()),
            namespace: Some("default".to_string()),
            annotations: Some(
                [
                    (
                        "kubectl.kubernetes.io/last-applied-configuration".to_string(),
                        "{...}".to_string(),
                    ),
                    ("owner".to_string(), "team-a".to_string()),
                ]
                .into_iter()
                .collect(),
            ),
            creation_timestamp: Some(
                serde_json::from_value(serde_json::json!("2024-05-01T08:00:00Z")).unwrap(),
            ),
            ..Default::default()
        };

        let dto = ObjectMeta::from(&meta);
        assert_eq!(dto.name, "nginx");
        assert_eq!(dto.annotations.len(), 1);
        assert_eq!(dto.creation_timestamp.as_deref(), Some("2024-05-01T08:00:00Z"));
    }

    #[test]
    fn test_envelope_serialization() {
        let ok = serde_json::to_value(Envelope::ok(vec![1, 2])).unwrap();
        assert_eq!(ok["code"], 200);
        assert_eq!(ok["message"], "success");
        assert_eq!(ok["data"], serde_json::json!([1, 2]));

        let fail = serde_json::to_value(Envelope::<()>::fail(500, "boom")).unwrap();
        assert_eq!(fail["code"], 500);
        assert!(fail["data"].is_null());
    }

    #[test]
    fn test_cluster_item_flattens() {
        #[derive(Serialize)]
        struct Inner {
            name: &'static str,
        }

        let value = serde_json::to_value(ClusterItem {
            cluster: "member1".to_string(),
            item: Inner { name: "nginx" },
        })
        .unwrap();
        assert_eq!(value, serde_json::json!({"cluster": "member1", "name": "nginx"}));
    }
}
