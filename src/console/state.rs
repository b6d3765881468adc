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

use chrono::Duration;
use kube::{api::ApiResource, discovery::ApiCapabilities};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use strum::Display;
use tracing::warn;

use crate::auth::{Keycloak, OpenFga};
use crate::config::{DEV_JWT_SECRET, DashboardConfig, ServeArgs};
use crate::context::Context;
use crate::users::{EtcdUserStore, MemoryUserStore, Role, UserStore};
use crate::utils::cache::TtlCache;

/// Porch 代理使用的 ServiceAccount 及其 token 缓存
pub struct PorchSettings {
    pub namespace: String,
    pub service_account: String,
    /// key: `namespace/serviceaccount`
    pub tokens: TtlCache<String, String>,
}

impl PorchSettings {
    pub fn new(namespace: &str, service_account: &str) -> Self {
        Self {
            namespace: namespace.to_string(),
            service_account: service_account.to_string(),
            // 过期前 60 秒即刷新
            tokens: TtlCache::new(Duration::seconds(60)),
        }
    }
}

/// 某个目标集群上 discovery 得到的首选资源, 核心组在前
pub type DiscoveredResources = Arc<Vec<(ApiResource, ApiCapabilities)>>;

pub struct ArgoCdSettings {
    pub url: String,
    pub token: Option<String>,
}

/// 引导管理员, 首次登录时创建
#[derive(Clone)]
pub struct BootstrapAdmin {
    pub username: String,
    pub password: Option<String>,
}

/// Console 应用状态
#[derive(Clone)]
pub struct AppState {
    /// JWT 签名密钥
    pub jwt_secret: Arc<String>,
    pub session_ttl: Duration,
    pub context: Arc<Context>,
    pub users: Arc<dyn UserStore>,
    pub admin: Arc<BootstrapAdmin>,
    pub keycloak: Option<Arc<Keycloak>>,
    pub openfga: Option<Arc<OpenFga>>,
    pub dashboard: Arc<DashboardConfig>,
    pub porch: Arc<PorchSettings>,
    pub argocd: Option<Arc<ArgoCdSettings>>,
    /// key: 目标集群, 如 `member/member1`
    pub discovery: Arc<TtlCache<String, DiscoveredResources>>,
    pub http: reqwest::Client,
}

impl AppState {
    /// 创建新的应用状态, 可选集成全部关闭
    pub fn new(jwt_secret: String, context: Context, users: Arc<dyn UserStore>) -> Self {
        Self {
            jwt_secret: Arc::new(jwt_secret),
            session_ttl: Duration::hours(12),
            context: Arc::new(context),
            users,
            admin: Arc::new(BootstrapAdmin {
                username: "admin".to_string(),
                password: None,
            }),
            keycloak: None,
            openfga: None,
            dashboard: Arc::new(DashboardConfig::default()),
            porch: Arc::new(PorchSettings::new("porch-system", "porch-server")),
            argocd: None,
            discovery: Arc::new(TtlCache::new(Duration::zero())),
            http: reqwest::Client::new(),
        }
    }

    /// 根据命令行参数装配状态
    pub fn from_args(args: &ServeArgs, context: Context, dashboard: DashboardConfig) -> Self {
        let http = reqwest::Client::new();

        let jwt_secret = args.jwt_secret.clone().unwrap_or_else(|| {
            warn!("no JWT secret configured, using the development default");
            DEV_JWT_SECRET.to_string()
        });

        let users: Arc<dyn UserStore> = match &args.etcd_endpoint {
            Some(endpoint) => Arc::new(EtcdUserStore::new(
                http.clone(),
                endpoint,
                &args.etcd_prefix,
            )),
            None => {
                warn!("no etcd endpoint configured, users are kept in memory");
                Arc::new(MemoryUserStore::new())
            }
        };

        let keycloak = args.keycloak_url.as_deref().map(|url| {
            Arc::new(Keycloak::new(
                http.clone(),
                url,
                &args.keycloak_realm,
                &args.keycloak_admin_group,
            ))
        });

        let openfga = match (&args.openfga_url, &args.openfga_store_id) {
            (Some(url), Some(store)) => Some(Arc::new(OpenFga::new(
                http.clone(),
                url,
                store,
                args.openfga_model_id.clone(),
            ))),
            (Some(_), None) => {
                warn!("OpenFGA url set without a store id, fine-grained checks disabled");
                None
            }
            _ => None,
        };

        let argocd = args.argocd_url.as_ref().map(|url| {
            Arc::new(ArgoCdSettings {
                url: url.trim_end_matches('/').to_string(),
                token: args.argocd_token.clone(),
            })
        });

        Self {
            jwt_secret: Arc::new(jwt_secret),
            session_ttl: Duration::hours(i64::from(args.session_ttl_hours)),
            context: Arc::new(context),
            users,
            admin: Arc::new(BootstrapAdmin {
                username: args.admin_username.clone(),
                password: args.admin_password.clone(),
            }),
            keycloak,
            openfga,
            dashboard: Arc::new(dashboard),
            porch: Arc::new(PorchSettings::new(
                &args.porch_namespace,
                &args.porch_service_account,
            )),
            argocd,
            discovery: Arc::new(TtlCache::new(Duration::zero())),
            http,
        }
    }
}

/// 登录方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum AuthMethod {
    /// Kubernetes bearer token
    Token,
    /// 用户名密码
    Password,
    Keycloak,
}

/// JWT Claims
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// 用户名, token 登录时为 token 对应的身份
    pub sub: String,
    pub role: Role,
    /// Kubernetes bearer token, 仅 token 登录时存在
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub k8s_token: Option<String>,
    pub auth: AuthMethod,
    /// Token 过期时间 (Unix timestamp)
    pub exp: usize,
    /// Token 签发时间
    pub iat: usize,
}

impl Claims {
    pub fn new(
        sub: impl Into<String>,
        role: Role,
        k8s_token: Option<String>,
        auth: AuthMethod,
        ttl: Duration,
    ) -> Self {
        let now = chrono::Utc::now().timestamp().max(0) as usize;
        Self {
            sub: sub.into(),
            role,
            k8s_token,
            auth,
            iat: now,
            exp: now + ttl.num_seconds().max(0) as usize,
        }
    }

    /// 访问集群时使用的 bearer token
    pub fn token(&self) -> Option<&str> {
        self.k8s_token.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_claims_lifetime() {
        let claims = Claims::new("alice", Role::Admin, None, AuthMethod::Password, Duration::hours(2));
        assert_eq!(claims.exp - claims.iat, 7200);
        assert!(claims.token().is_none());

        let value = serde_json::to_value(&claims).unwrap();
        assert_eq!(value["role"], "admin");
        assert_eq!(value["auth"], "password");
        assert!(value.get("k8s_token").is_none());
    }
}
