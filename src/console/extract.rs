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

use axum::extract::{FromRequestParts, Path};
use axum::http::request::Parts;
use std::collections::HashMap;

use crate::console::error::Error;
use crate::console::state::Claims;
use crate::context::Target;

/// 路由前缀对应的集群范围, 由各前缀的路由层注入请求扩展
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    /// `/api/v1`
    Karmada,
    /// `/api/v1/mgmt`
    Mgmt,
    /// `/api/v1/member/{clustername}`
    Member,
}

/// 从路由中解析出的目标集群, 命名空间, 名称及调用者 token
#[derive(Debug, Clone)]
pub struct ResourcePath {
    pub target: Target,
    pub namespace: Option<String>,
    pub name: Option<String>,
    pub claims: Option<Claims>,
    params: HashMap<String, String>,
}

impl ResourcePath {
    pub fn token(&self) -> Option<&str> {
        self.claims.as_ref().and_then(Claims::token)
    }

    /// 必填的命名空间
    pub fn namespace(&self) -> Result<&str, Error> {
        self.namespace.as_deref().ok_or_else(|| Error::BadRequest {
            message: "namespace is required".to_string(),
        })
    }

    /// 必填的资源名称
    pub fn name(&self) -> Result<&str, Error> {
        self.name.as_deref().ok_or_else(|| Error::BadRequest {
            message: "name is required".to_string(),
        })
    }

    /// 其余路径参数, 例如 `kind` 或 `container`
    pub fn param(&self, key: &str) -> Result<&str, Error> {
        self.params
            .get(key)
            .map(String::as_str)
            .ok_or_else(|| Error::BadRequest {
                message: format!("missing path parameter '{}'", key),
            })
    }
}

impl<S> FromRequestParts<S> for ResourcePath
where
    S: Send + Sync,
{
    type Rejection = Error;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let scope = parts
            .extensions
            .get::<Scope>()
            .copied()
            .unwrap_or(Scope::Karmada);

        let mut params = Path::<HashMap<String, String>>::from_request_parts(parts, state)
            .await
            .map(|Path(p)| p)
            .unwrap_or_default();

        let target = match scope {
            Scope::Karmada => Target::Karmada,
            Scope::Mgmt => Target::Mgmt,
            Scope::Member => {
                let cluster = params.remove("clustername").ok_or_else(|| Error::BadRequest {
                    message: "cluster name is required".to_string(),
                })?;
                Target::Member(cluster)
            }
        };

        Ok(Self {
            target,
            namespace: params.remove("namespace"),
            name: params.remove("name"),
            claims: parts.extensions.get::<Claims>().cloned(),
            params,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    async fn extract(uri: &str, scope: Option<Scope>) -> Result<ResourcePath, Error> {
        let mut req = Request::builder().uri(uri).body(()).unwrap();
        if let Some(scope) = scope {
            req.extensions_mut().insert(scope);
        }
        let (mut parts, _) = req.into_parts();
        ResourcePath::from_request_parts(&mut parts, &()).await
    }

    #[tokio::test]
    async fn test_defaults_to_karmada_without_params() {
        let rp = extract("/api/v1/deployment", None).await.unwrap();
        assert_eq!(rp.target, Target::Karmada);
        assert!(rp.namespace.is_none());
        assert!(rp.name().is_err());
        assert!(rp.token().is_none());
    }

    #[tokio::test]
    async fn test_member_scope_requires_cluster() {
        let err = extract("/api/v1/member/deployment", Some(Scope::Member))
            .await
            .unwrap_err();
        assert_eq!(err.code(), 400);
    }

    #[tokio::test]
    async fn test_mgmt_scope() {
        let rp = extract("/api/v1/mgmt/pod", Some(Scope::Mgmt)).await.unwrap();
        assert_eq!(rp.target, Target::Mgmt);
    }
}
