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

use axum::{
    Json,
    extract::{Request, State},
    http::{HeaderMap, Method, StatusCode, header},
    middleware::Next,
    response::{IntoResponse, Response},
};
use chrono::Duration;
use jsonwebtoken::{DecodingKey, Validation, decode};
use tracing::{debug, warn};

use crate::console::error::Error;
use crate::console::models::common::Envelope;
use crate::console::state::{AppState, AuthMethod, Claims};
use crate::users::Role;

/// Keycloak 会话的 claims 只在单个请求内有效
const KEYCLOAK_CLAIMS_TTL_SECONDS: i64 = 60;

fn is_public(path: &str) -> bool {
    matches!(
        path,
        "/healthz" | "/readyz" | "/api/v1/login" | "/api/v1/logout" | "/api/v1/version"
    ) || path.starts_with("/api/v1/login/")
}

/// JWT 认证中间件
///
/// 从 `Authorization: Bearer` 或 Cookie 中提取 Token, 验证后将 Claims 注入到请求扩展中.
/// 未认证的请求直接返回 HTTP 401.
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    // 跳过公开路径
    if is_public(request.uri().path()) {
        return next.run(request).await;
    }

    let Some(token) = request_token(request.headers()) else {
        return unauthorized("missing credentials");
    };

    match authenticate(&state, &token).await {
        Some(claims) => {
            // 将 Claims 注入请求扩展
            request.extensions_mut().insert(claims);
            next.run(request).await
        }
        None => unauthorized("invalid or expired session"),
    }
}

fn unauthorized(message: &str) -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(Envelope::<()>::fail(401, message)),
    )
        .into_response()
}

fn request_token(headers: &HeaderMap) -> Option<String> {
    let bearer = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string);

    bearer.or_else(|| {
        let cookies = headers
            .get(header::COOKIE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("");
        parse_session_cookie(cookies)
    })
}

/// 验证 Dashboard 签发的 JWT, 过期时间由 `Validation` 检查
pub fn decode_session(secret: &str, token: &str) -> Result<Claims, jsonwebtoken::errors::Error> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
}

async fn authenticate(state: &AppState, token: &str) -> Option<Claims> {
    match decode_session(&state.jwt_secret, token) {
        Ok(claims) => return Some(claims),
        Err(e) => debug!("not a dashboard session: {}", e),
    }

    let keycloak = state.keycloak.as_ref()?;
    match keycloak.verify(token).await {
        Ok(Some(identity)) => Some(Claims::new(
            identity.username,
            if identity.admin { Role::Admin } else { Role::User },
            None,
            AuthMethod::Keycloak,
            Duration::seconds(KEYCLOAK_CLAIMS_TTL_SECONDS),
        )),
        Ok(None) => None,
        Err(e) => {
            warn!("Keycloak validation failed: {}", e);
            None
        }
    }
}

/// 会话当前的角色. 密码会话以用户存储为准, 用户已删除时为 `None`
async fn current_role(state: &AppState, claims: &Claims) -> Option<Role> {
    if claims.auth != AuthMethod::Password {
        return Some(claims.role);
    }
    match state.users.get(&claims.sub).await {
        Ok(Some(user)) => Some(user.role),
        Ok(None) => {
            debug!("session user {} no longer exists", claims.sub);
            None
        }
        Err(e) => {
            warn!("failed to load user {}: {}", claims.sub, e);
            None
        }
    }
}

/// 管理员判定: 当前角色为 admin, 或 OpenFGA 授予了 admin 关系
pub async fn is_admin(state: &AppState, claims: &Claims) -> bool {
    match current_role(state, claims).await {
        Some(Role::Admin) => return true,
        Some(Role::User) => {}
        None => return false,
    }
    let Some(openfga) = &state.openfga else {
        return false;
    };
    match openfga.is_admin(&claims.sub).await {
        Ok(allowed) => allowed,
        Err(e) => {
            warn!("OpenFGA check for {} failed: {}", claims.sub, e);
            false
        }
    }
}

/// 仅管理员可访问的路由
pub async fn require_admin(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let Some(claims) = request.extensions().get::<Claims>().cloned() else {
        return unauthorized("missing session");
    };
    if !is_admin(&state, &claims).await {
        return Error::Forbidden {
            message: format!("{} is not an administrator", claims.sub),
        }
        .into_response();
    }
    next.run(request).await
}

/// 管理集群: 携带 Kubernetes token 的会话由集群 RBAC 约束, 其余会话使用服务自身凭据, 需要管理员
pub async fn require_mgmt_access(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let Some(claims) = request.extensions().get::<Claims>().cloned() else {
        return unauthorized("missing session");
    };
    if claims.token().is_none() && !is_admin(&state, &claims).await {
        return Error::Forbidden {
            message: "management cluster access requires an administrator".to_string(),
        }
        .into_response();
    }
    next.run(request).await
}

/// 无 Kubernetes token 的普通用户可执行的请求: 只读, 且不涉及 Secret, 终端和非结构化资源
pub fn tokenless_user_allowed(method: &Method, path: &str) -> bool {
    matches!(*method, Method::GET | Method::HEAD)
        && !path
            .split('/')
            .any(|segment| matches!(segment, "secret" | "shell" | "_raw"))
}

/// karmada-apiserver 与成员集群: 无 Kubernetes token 的会话使用服务自身凭据,
/// 普通用户只能只读浏览, 其余操作需要管理员
pub async fn require_cluster_access(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let Some(claims) = request.extensions().get::<Claims>().cloned() else {
        return unauthorized("missing session");
    };
    if claims.token().is_some() || tokenless_user_allowed(request.method(), request.uri().path())
    {
        return next.run(request).await;
    }
    if !is_admin(&state, &claims).await {
        return Error::Forbidden {
            message: format!(
                "{} {} requires an administrator or a Kubernetes token",
                request.method(),
                request.uri().path()
            ),
        }
        .into_response();
    }
    next.run(request).await
}

/// 从 Cookie 字符串中解析 session token
pub fn parse_session_cookie(cookies: &str) -> Option<String> {
    cookies.split(';').find_map(|cookie| {
        let (name, value) = cookie.trim().split_once('=')?;
        (name == "session" && !value.is_empty()).then(|| value.to_string())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;
    use jsonwebtoken::{EncodingKey, Header, encode};

    #[test]
    fn test_parse_session_cookie() {
        let cookies = "session=test_token; other=value";
        assert_eq!(parse_session_cookie(cookies), Some("test_token".to_string()));

        let cookies = "other=value";
        assert_eq!(parse_session_cookie(cookies), None);

        assert_eq!(parse_session_cookie("session="), None);
    }

    #[test]
    fn test_bearer_header_wins_over_cookie() {
        let mut headers = HeaderMap::new();
        headers.insert(header::COOKIE, HeaderValue::from_static("session=from-cookie"));
        assert_eq!(request_token(&headers).as_deref(), Some("from-cookie"));

        headers.insert(
            header::AUTHORIZATION,
            HeaderValue::from_static("Bearer from-header"),
        );
        assert_eq!(request_token(&headers).as_deref(), Some("from-header"));
    }

    #[test]
    fn test_public_paths() {
        assert!(is_public("/healthz"));
        assert!(is_public("/api/v1/login"));
        assert!(is_public("/api/v1/login/password"));
        assert!(is_public("/api/v1/logout"));
        assert!(!is_public("/api/v1/loginx"));
        assert!(!is_public("/api/v1/deployment"));
    }

    #[test]
    fn test_tokenless_user_allowed() {
        assert!(tokenless_user_allowed(&Method::GET, "/deployment/default/web"));
        assert!(tokenless_user_allowed(&Method::GET, "/pod/default/web-0/logs"));
        assert!(!tokenless_user_allowed(&Method::DELETE, "/deployment/default/web"));
        assert!(!tokenless_user_allowed(&Method::PUT, "/deployment/default/web/scale"));
        assert!(!tokenless_user_allowed(&Method::GET, "/secret"));
        assert!(!tokenless_user_allowed(&Method::GET, "/secret/default/db-credentials"));
        assert!(!tokenless_user_allowed(&Method::GET, "/pod/default/web-0/shell/web"));
        assert!(!tokenless_user_allowed(&Method::GET, "/_raw/secrets/namespace/default"));
        assert!(!tokenless_user_allowed(&Method::POST, "/_raw/apply"));
    }

    #[test]
    fn test_decode_session() {
        let claims = Claims::new("alice", Role::User, None, AuthMethod::Password, Duration::hours(1));
        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(b"secret"),
        )
        .unwrap();

        let decoded = decode_session("secret", &token).unwrap();
        assert_eq!(decoded.sub, "alice");
        assert!(decode_session("other-secret", &token).is_err());

        let expired = Claims {
            exp: 1,
            iat: 0,
            ..claims
        };
        let token = encode(
            &Header::default(),
            &expired,
            &EncodingKey::from_secret(b"secret"),
        )
        .unwrap();
        assert!(decode_session("secret", &token).is_err());
    }
}
