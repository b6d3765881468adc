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
use serde::Serialize;

use super::ResourceKind;

#[derive(Debug, Clone, Serialize)]
pub struct ConfigMapSummary {
    pub keys: Vec<String>,
}

impl ResourceKind for corev1::ConfigMap {
    type Summary = ConfigMapSummary;

    fn summary(&self) -> ConfigMapSummary {
        let mut keys: Vec<String> = self
            .data
            .iter()
            .flat_map(|d| d.keys().cloned())
            .chain(self.binary_data.iter().flat_map(|d| d.keys().cloned()))
            .collect();
        keys.sort();
        ConfigMapSummary { keys }
    }
}

/// Secret 摘要, 只包含键名
#[derive(Debug, Clone, Serialize)]
pub struct SecretSummary {
    #[serde(rename = "type")]
    pub type_: String,
    pub keys: Vec<String>,
}

impl ResourceKind for corev1::Secret {
    type Summary = SecretSummary;

    fn summary(&self) -> SecretSummary {
        let mut keys: Vec<String> = self
            .data
            .iter()
            .flat_map(|d| d.keys().cloned())
            .chain(self.string_data.iter().flat_map(|d| d.keys().cloned()))
            .collect();
        keys.sort();
        keys.dedup();
        SecretSummary {
            type_: self.type_.clone().unwrap_or_else(|| "Opaque".to_string()),
            keys,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistentVolumeClaimSummary {
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub volume: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub capacity: Option<String>,
    pub access_modes: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub storage_class: Option<String>,
}

impl ResourceKind for corev1::PersistentVolumeClaim {
    type Summary = PersistentVolumeClaimSummary;

    fn summary(&self) -> PersistentVolumeClaimSummary {
        let spec = self.spec.as_ref();
        let status = self.status.as_ref();
        PersistentVolumeClaimSummary {
            status: status
                .and_then(|s| s.phase.clone())
                .unwrap_or_else(|| "Pending".to_string()),
            volume: spec.and_then(|s| s.volume_name.clone()),
            capacity: status
                .and_then(|s| s.capacity.as_ref())
                .and_then(|c| c.get("storage"))
                .map(|q| q.0.clone()),
            access_modes: spec
                .and_then(|s| s.access_modes.clone())
                .unwrap_or_default(),
            storage_class: spec.and_then(|s| s.storage_class_name.clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use k8s_openapi::ByteString;

    #[test]
    fn test_secret_summary_never_exposes_values() {
        let secret = corev1::Secret {
            type_: Some("kubernetes.io/basic-auth".to_string()),
            data: Some(
                [
                    ("username".to_string(), ByteString(b"admin".to_vec())),
                    ("password".to_string(), ByteString(b"hunter2".to_vec())),
                ]
                .into_iter()
                .collect(),
            ),
            ..Default::default()
        };

        let summary = secret.summary();
        assert_eq!(summary.keys, vec!["password", "username"]);
        let value = serde_json::to_string(&summary).unwrap();
        assert!(!value.contains("hunter2"));
        assert!(value.contains("\"type\":\"kubernetes.io/basic-auth\""));
    }

    #[test]
    fn test_configmap_keys_sorted() {
        let cm = corev1::ConfigMap {
            data: Some(
                [
                    ("z.conf".to_string(), String::new()),
                    ("a.conf".to_string(), String::new()),
                ]
                .into_iter()
                .collect(),
            ),
            ..Default::default()
        };
        assert_eq!(cm.summary().keys, vec!["a.conf", "z.conf"]);
    }
}
