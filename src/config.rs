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

use clap::Args;
use serde::{Deserialize, Serialize};
use snafu::{ResultExt, Snafu};
use std::net::IpAddr;
use std::path::{Path, PathBuf};

pub const DEV_JWT_SECRET: &str = "karmada-dashboard-secret-change-me-in-production";

#[derive(Debug, Snafu)]
pub enum Error {
    #[snafu(display("failed to read dashboard config {}: {}", path.display(), source))]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[snafu(display("failed to parse dashboard config {}: {}", path.display(), source))]
    Parse {
        path: PathBuf,
        source: serde_yaml_ng::Error,
    },
}

/// Flags of the `serve` command. Every flag can also be set through its environment variable.
#[derive(Args, Debug, Clone)]
pub struct ServeArgs {
    /// Address the HTTP server binds to
    #[arg(long, env = "DASHBOARD_BIND_ADDRESS", default_value = "0.0.0.0")]
    pub bind_address: IpAddr,

    /// Port the HTTP server listens on
    #[arg(long, env = "DASHBOARD_PORT", default_value_t = 8000)]
    pub port: u16,

    /// Kubeconfig of the karmada-apiserver
    #[arg(long, env = "KARMADA_KUBECONFIG")]
    pub karmada_kubeconfig: Option<PathBuf>,

    /// Context to use from the karmada kubeconfig
    #[arg(long, env = "KARMADA_CONTEXT")]
    pub karmada_context: Option<String>,

    /// Kubeconfig of the management cluster, in-cluster config when unset
    #[arg(long, env = "KUBECONFIG")]
    pub kubeconfig: Option<PathBuf>,

    /// Context to use from the management kubeconfig
    #[arg(long, env = "KUBE_CONTEXT")]
    pub context: Option<String>,

    /// HMAC secret for session tokens
    #[arg(long, env = "JWT_SECRET", hide_env_values = true)]
    pub jwt_secret: Option<String>,

    /// Lifetime of a session token in hours
    #[arg(long, env = "DASHBOARD_SESSION_TTL_HOURS", default_value_t = 12)]
    pub session_ttl_hours: u32,

    /// Origin allowed to call the API with credentials
    #[arg(long, env = "DASHBOARD_CORS_ORIGIN", default_value = "http://localhost:3000")]
    pub cors_origin: String,

    /// etcd JSON gateway endpoint of the user store, in-memory store when unset
    #[arg(long, env = "DASHBOARD_ETCD_ENDPOINT")]
    pub etcd_endpoint: Option<String>,

    /// Key prefix of user records in etcd
    #[arg(long, env = "DASHBOARD_ETCD_PREFIX", default_value = "/karmada-dashboard/users/")]
    pub etcd_prefix: String,

    /// Name of the bootstrap administrator
    #[arg(long, env = "DASHBOARD_ADMIN_USERNAME", default_value = "admin")]
    pub admin_username: String,

    /// Password of the bootstrap administrator, created on first login
    #[arg(long, env = "DASHBOARD_ADMIN_PASSWORD", hide_env_values = true)]
    pub admin_password: Option<String>,

    /// Keycloak base URL, enables Keycloak token validation
    #[arg(long, env = "KEYCLOAK_URL")]
    pub keycloak_url: Option<String>,

    #[arg(long, env = "KEYCLOAK_REALM", default_value = "karmada")]
    pub keycloak_realm: String,

    /// Keycloak group whose members are dashboard administrators
    #[arg(long, env = "KEYCLOAK_ADMIN_GROUP", default_value = "karmada-admin")]
    pub keycloak_admin_group: String,

    /// OpenFGA API URL, enables fine-grained admin checks
    #[arg(long, env = "OPENFGA_API_URL")]
    pub openfga_url: Option<String>,

    #[arg(long, env = "OPENFGA_STORE_ID")]
    pub openfga_store_id: Option<String>,

    #[arg(long, env = "OPENFGA_MODEL_ID")]
    pub openfga_model_id: Option<String>,

    /// ArgoCD server URL, enables the ArgoCD proxy
    #[arg(long, env = "ARGOCD_URL")]
    pub argocd_url: Option<String>,

    #[arg(long, env = "ARGOCD_TOKEN", hide_env_values = true)]
    pub argocd_token: Option<String>,

    /// Namespace of the service account used for Porch requests
    #[arg(long, env = "PORCH_NAMESPACE", default_value = "porch-system")]
    pub porch_namespace: String,

    #[arg(long, env = "PORCH_SERVICE_ACCOUNT", default_value = "porch-server")]
    pub porch_service_account: String,

    /// YAML file with monitoring dashboards and GPU settings
    #[arg(long, env = "DASHBOARD_CONFIG")]
    pub dashboard_config: Option<PathBuf>,
}

/// An external monitoring page embedded as an iframe.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct MonitoringDashboard {
    pub name: String,
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DashboardConfig {
    pub monitoring: Vec<MonitoringDashboard>,
    pub gpu_resource_names: Vec<String>,
    pub gpu_product_label: String,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            monitoring: Vec::new(),
            gpu_resource_names: vec!["nvidia.com/gpu".to_string(), "amd.com/gpu".to_string()],
            gpu_product_label: "nvidia.com/gpu.product".to_string(),
        }
    }
}

impl DashboardConfig {
    pub async fn load(path: Option<&Path>) -> Result<Self, Error> {
        let Some(path) = path else {
            return Ok(Self::default());
        };

        let raw = tokio::fs::read_to_string(path)
            .await
            .context(ReadSnafu { path })?;
        Self::parse(&raw).context(ParseSnafu { path })
    }

    pub fn parse(raw: &str) -> Result<Self, serde_yaml_ng::Error> {
        serde_yaml_ng::from_str(raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_dashboard_config() {
        let config = DashboardConfig::parse(
            r#"
monitoring:
  - name: Grafana
    url: https://grafana.example.com/d/karmada
  - name: Prometheus
    url: https://prometheus.example.com
    description: raw metrics
gpuResourceNames: ["nvidia.com/gpu"]
"#,
        )
        .unwrap();

        assert_eq!(config.monitoring.len(), 2);
        assert_eq!(config.monitoring[1].description.as_deref(), Some("raw metrics"));
        assert_eq!(config.gpu_resource_names, vec!["nvidia.com/gpu"]);
        // Unset fields keep their defaults.
        assert_eq!(config.gpu_product_label, "nvidia.com/gpu.product");
    }

    #[tokio::test]
    async fn test_load_without_path() {
        let config = DashboardConfig::load(None).await.unwrap();
        assert!(config.monitoring.is_empty());
        assert_eq!(config.gpu_resource_names.len(), 2);
    }
}
