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

//! Porch API 代理
//!
//! 请求以 Porch ServiceAccount 的短期 token 转发到管理集群.

use axum::{
    Json,
    body::Bytes,
    extract::{Path, RawQuery, State},
    http::{HeaderMap, HeaderValue, Method, Request, header::CONTENT_TYPE},
};
use chrono::{DateTime, Duration, Utc};
use k8s_openapi::api::authentication::v1::{TokenRequest, TokenRequestSpec};
use k8s_openapi::api::core::v1 as corev1;
use kube::{Api, api::PostParams};
use serde_json::Value;
use tracing::{debug, info};

use crate::console::{
    error::{Error, Result},
    models::common::{Envelope, timestamp},
    state::{AppState, PorchSettings},
};
use crate::context::{Context, Target};

pub const PORCH_API_PREFIX: &str = "/apis/porch.kpt.dev/v1alpha1/";

/// 申请的 token 有效期
const TOKEN_EXPIRATION_SECONDS: i64 = 3600;

/// 转发路径, 拒绝跳出 Porch API 前缀的路径
pub fn upstream_path(path: &str, query: Option<&str>) -> Result<String> {
    let path = path.trim_start_matches('/');
    if path.split('/').any(|segment| segment == "..") {
        return Err(Error::BadRequest {
            message: format!("invalid porch path '{}'", path),
        });
    }

    Ok(match query.filter(|q| !q.is_empty()) {
        Some(query) => format!("{}{}?{}", PORCH_API_PREFIX, path, query),
        None => format!("{}{}", PORCH_API_PREFIX, path),
    })
}

/// 缓存中的 token, 过期前 60 秒重新申请
async fn service_account_token(context: &Context, porch: &PorchSettings) -> Result<String> {
    let key = format!("{}/{}", porch.namespace, porch.service_account);
    if let Some(token) = porch.tokens.get(&key).await {
        return Ok(token);
    }

    let api: Api<corev1::ServiceAccount> =
        Api::namespaced(context.client(&Target::Mgmt, None)?, &porch.namespace);
    let request = TokenRequest {
        spec: TokenRequestSpec {
            expiration_seconds: Some(TOKEN_EXPIRATION_SECONDS),
            ..Default::default()
        },
        ..Default::default()
    };
    let issued_at = Utc::now();
    let response = api
        .create_token_request(&porch.service_account, &PostParams::default(), &request)
        .await?;

    let status = response.status.ok_or_else(|| Error::InternalServer {
        message: format!("TokenRequest for {} returned no status", key),
    })?;
    let expires_at = timestamp(&status.expiration_timestamp)
        .and_then(|ts| DateTime::parse_from_rfc3339(&ts).ok())
        .map(|ts| ts.with_timezone(&Utc))
        .unwrap_or_else(|| issued_at + Duration::seconds(TOKEN_EXPIRATION_SECONDS));

    info!("issued porch token for {}, expires at {}", key, expires_at);
    porch.tokens.insert(key, status.token.clone(), expires_at).await;
    Ok(status.token)
}

/// 构造转发请求, 沿用客户端的 Content-Type (merge-patch, json-patch 等),
/// 缺省时按 JSON 发送
pub fn upstream_request(
    method: Method,
    uri: &str,
    headers: &HeaderMap,
    body: Bytes,
) -> Result<Request<Vec<u8>>> {
    let mut builder = Request::builder().method(method).uri(uri);
    if !body.is_empty() {
        let content_type = headers
            .get(CONTENT_TYPE)
            .cloned()
            .unwrap_or_else(|| HeaderValue::from_static("application/json"));
        builder = builder.header(CONTENT_TYPE, content_type);
    }
    builder.body(body.to_vec()).map_err(|e| Error::BadRequest {
        message: e.to_string(),
    })
}

/// `ANY /api/v1/porch/{*path}`
pub async fn proxy(
    State(state): State<AppState>,
    method: Method,
    Path(path): Path<String>,
    RawQuery(query): RawQuery,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<Envelope<Value>>> {
    let uri = upstream_path(&path, query.as_deref())?;
    let token = service_account_token(&state.context, &state.porch).await?;
    let client = state.context.client(&Target::Mgmt, Some(&token))?;

    debug!("porch {} {}", method, uri);
    let request = upstream_request(method, &uri, &headers, body)?;

    let text = client.request_text(request).await?;
    let value = serde_json::from_str(&text).unwrap_or(Value::String(text));
    Ok(Json(Envelope::ok(value)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upstream_path() {
        assert_eq!(
            upstream_path("namespaces/default/packagerevisions", None).unwrap(),
            "/apis/porch.kpt.dev/v1alpha1/namespaces/default/packagerevisions"
        );
        assert_eq!(
            upstream_path("/repositories", Some("limit=10")).unwrap(),
            "/apis/porch.kpt.dev/v1alpha1/repositories?limit=10"
        );
        assert_eq!(
            upstream_path("repositories", Some("")).unwrap(),
            "/apis/porch.kpt.dev/v1alpha1/repositories"
        );
    }

    #[test]
    fn test_upstream_path_rejects_traversal() {
        let err = upstream_path("../../api/v1/secrets", None).unwrap_err();
        assert_eq!(err.code(), 400);
    }

    #[test]
    fn test_upstream_request_keeps_content_type() {
        let mut headers = HeaderMap::new();
        headers.insert(
            CONTENT_TYPE,
            HeaderValue::from_static("application/merge-patch+json"),
        );

        let request = upstream_request(
            Method::PATCH,
            "/apis/porch.kpt.dev/v1alpha1/namespaces/default/packagerevisions/blueprint",
            &headers,
            Bytes::from_static(br#"{"spec":{"lifecycle":"Proposed"}}"#),
        )
        .unwrap();

        assert_eq!(request.method(), Method::PATCH);
        assert_eq!(
            request.headers().get(CONTENT_TYPE).unwrap(),
            "application/merge-patch+json"
        );
        assert_eq!(request.body().as_slice(), br#"{"spec":{"lifecycle":"Proposed"}}"#);
    }

    #[test]
    fn test_upstream_request_defaults_to_json() {
        let request = upstream_request(
            Method::POST,
            "/apis/porch.kpt.dev/v1alpha1/namespaces/default/packagerevisions",
            &HeaderMap::new(),
            Bytes::from_static(b"{}"),
        )
        .unwrap();
        assert_eq!(request.headers().get(CONTENT_TYPE).unwrap(), "application/json");

        let request = upstream_request(
            Method::GET,
            "/apis/porch.kpt.dev/v1alpha1/repositories",
            &HeaderMap::new(),
            Bytes::new(),
        )
        .unwrap();
        assert!(request.headers().get(CONTENT_TYPE).is_none());
    }

    #[tokio::test]
    async fn test_cached_token_skips_token_request() {
        let karmada = kube::Config::new("https://127.0.0.1:1".parse().unwrap());
        let context = Context::new(karmada.clone(), karmada);
        let porch = PorchSettings::new("porch-system", "porch-server");
        porch
            .tokens
            .insert(
                "porch-system/porch-server".to_string(),
                "cached".to_string(),
                Utc::now() + Duration::hours(1),
            )
            .await;

        let token = service_account_token(&context, &porch).await.unwrap();
        assert_eq!(token, "cached");
    }
}
