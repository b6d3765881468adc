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
    Router,
    extract::State,
    http::{HeaderValue, Method, StatusCode, header},
    middleware,
    response::IntoResponse,
    routing::get,
};
use std::net::SocketAddr;
use tower_http::{compression::CompressionLayer, cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};

use crate::config::ServeArgs;
use crate::console::{routes, state::AppState};
use crate::context::Target;

const DEFAULT_CORS_ORIGIN: &str = "http://localhost:3000";

/// 启动 Dashboard HTTP Server
pub async fn run(args: &ServeArgs, state: AppState) -> Result<(), Box<dyn std::error::Error>> {
    let app = build_router(state, &args.cors_origin);

    // 启动服务器
    let addr = SocketAddr::new(args.bind_address, args.port);
    let listener = tokio::net::TcpListener::bind(addr).await?;

    info!("Karmada dashboard listening on http://{}", addr);
    info!("API endpoints:");
    info!("  - POST /api/v1/login");
    info!("  - GET  /api/v1/cluster");
    info!("  - GET  /api/v1/member/{{clustername}}/...");
    info!("  - GET  /api/v1/aggregated/...");
    info!("  - GET  /healthz");

    axum::serve(listener, app).await?;

    Ok(())
}

fn cors_layer(origin: &str) -> CorsLayer {
    let origin = origin.parse::<HeaderValue>().unwrap_or_else(|e| {
        warn!("invalid CORS origin '{}': {}, using {}", origin, e, DEFAULT_CORS_ORIGIN);
        HeaderValue::from_static(DEFAULT_CORS_ORIGIN)
    });

    CorsLayer::new()
        .allow_origin(origin)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION, header::COOKIE])
        .allow_credentials(true)
}

/// 构建应用
pub fn build_router(state: AppState, cors_origin: &str) -> Router {
    Router::new()
        // 健康检查 (无需认证)
        .route("/healthz", get(health_check))
        .route("/readyz", get(ready_check))
        // API v1 路由
        .nest("/api/v1", api_routes(&state))
        // 应用状态
        .with_state(state.clone())
        // 应用中间件层 (从内到外)
        .layer(middleware::from_fn_with_state(
            state,
            crate::console::middleware::auth::auth_middleware,
        ))
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new())
        .layer(cors_layer(cors_origin))
}

/// API 路由组合
fn api_routes(state: &AppState) -> Router<AppState> {
    Router::new()
        .merge(routes::auth_routes())
        .merge(routes::user_routes(state))
        .merge(routes::widget_routes())
        .merge(routes::proxy_routes())
        .merge(routes::karmada_routes(state))
        .nest("/mgmt", routes::mgmt_routes(state))
        .nest("/member/{clustername}", routes::member_routes(state))
        .nest("/aggregated", routes::aggregated_routes(state))
}

/// 健康检查
async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}

/// 就绪检查: karmada-apiserver 可达
async fn ready_check(State(state): State<AppState>) -> impl IntoResponse {
    match state.context.server_version(&Target::Karmada, None).await {
        Ok(_) => (StatusCode::OK, "Ready"),
        Err(e) => {
            warn!("readiness check failed: {}", e);
            (StatusCode::SERVICE_UNAVAILABLE, "karmada-apiserver unreachable")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use serde_json::{Value, json};
    use std::sync::Arc;
    use tower::ServiceExt;

    use crate::console::state::BootstrapAdmin;
    use crate::context::Context;
    use crate::users::{MemoryUserStore, Role, User};

    const ADMIN_PASSWORD: &str = "admin-password";

    fn test_state() -> AppState {
        let _ = rustls::crypto::ring::default_provider().install_default();
        // 不可达的 apiserver, 访问集群的请求立即失败
        let config = kube::Config::new("https://127.0.0.1:1".parse().unwrap());
        let mut state = AppState::new(
            "test-secret".to_string(),
            Context::new(config.clone(), config),
            Arc::new(MemoryUserStore::new()),
        );
        state.admin = Arc::new(BootstrapAdmin {
            username: "admin".to_string(),
            password: Some(ADMIN_PASSWORD.to_string()),
        });
        state
    }

    fn app(state: AppState) -> Router {
        build_router(state, DEFAULT_CORS_ORIGIN)
    }

    async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&body).unwrap_or(Value::Null))
    }

    fn get(uri: &str, token: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder().uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        builder.body(Body::empty()).unwrap()
    }

    fn post_json(uri: &str, token: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method(Method::POST)
            .uri(uri)
            .header(header::AUTHORIZATION, format!("Bearer {}", token))
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn login_token(state: &AppState, username: &str, password: &str) -> String {
        let (_, body) = password_login(state, username, password).await;
        assert_eq!(body["code"], 200, "login of {} failed: {}", username, body);
        body["data"]["token"].as_str().unwrap().to_string()
    }

    async fn user_token(state: &AppState) -> String {
        let user = User::new("alice", "alice-password", None, Role::User).unwrap();
        state.users.create(user).await.unwrap();
        login_token(state, "alice", "alice-password").await
    }

    async fn password_login(state: &AppState, username: &str, password: &str) -> (StatusCode, Value) {
        let request = Request::builder()
            .method(Method::POST)
            .uri("/api/v1/login/password")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(
                json!({ "username": username, "password": password }).to_string(),
            ))
            .unwrap();
        send(app(state.clone()), request).await
    }

    #[tokio::test]
    async fn test_health_is_public() {
        let (status, _) = send(app(test_state()), get("/healthz", None)).await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_version_is_public() {
        let (status, body) = send(app(test_state()), get("/api/v1/version", None)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["code"], 200);
        assert_eq!(body["data"]["version"], env!("CARGO_PKG_VERSION"));
    }

    #[tokio::test]
    async fn test_requires_session() {
        let (status, body) = send(app(test_state()), get("/api/v1/overview", None)).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["code"], 401);

        let (status, _) = send(
            app(test_state()),
            get("/api/v1/member/member1/deployment", Some("not-a-jwt")),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_bootstrap_admin_login() {
        let state = test_state();

        let (status, body) = password_login(&state, "admin", "wrong-password").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["code"], 401);
        assert!(state.users.get("admin").await.unwrap().is_none());

        let (_, body) = password_login(&state, "admin", ADMIN_PASSWORD).await;
        assert_eq!(body["code"], 200);
        assert_eq!(body["data"]["role"], "admin");
        let token = body["data"]["token"].as_str().unwrap().to_string();

        // 首次登录后管理员已写入用户存储
        let stored = state.users.get("admin").await.unwrap().unwrap();
        assert_eq!(stored.role, Role::Admin);

        let (_, me) = send(app(state.clone()), get("/api/v1/me", Some(&token))).await;
        assert_eq!(me["data"]["username"], "admin");
        assert_eq!(me["data"]["isAdmin"], true);
        assert_eq!(me["data"]["auth"], "password");

        let (_, users) = send(app(state), get("/api/v1/users", Some(&token))).await;
        assert_eq!(users["code"], 200);
        assert_eq!(users["data"][0]["username"], "admin");
        assert!(users["data"][0].get("passwordHash").is_none());
    }

    #[tokio::test]
    async fn test_admin_guards() {
        let state = test_state();
        let user = User::new("alice", "alice-password", None, Role::User).unwrap();
        state.users.create(user).await.unwrap();

        let (_, body) = password_login(&state, "alice", "alice-password").await;
        assert_eq!(body["code"], 200);
        let token = body["data"]["token"].as_str().unwrap().to_string();

        let (status, body) = send(app(state.clone()), get("/api/v1/users", Some(&token))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["code"], 403);

        // 无 Kubernetes token 的普通用户不能访问管理集群
        let (_, body) = send(app(state), get("/api/v1/mgmt/pod", Some(&token))).await;
        assert_eq!(body["code"], 403);
    }

    #[tokio::test]
    async fn test_tokenless_user_is_read_only_on_clusters() {
        let state = test_state();
        let token = user_token(&state).await;

        let (status, body) = send(
            app(state.clone()),
            get("/api/v1/member/member1/secret", Some(&token)),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["code"], 403);

        let (_, body) = send(
            app(state.clone()),
            get("/api/v1/member/member1/pod/default/web-0/shell/web", Some(&token)),
        )
        .await;
        assert_eq!(body["code"], 403);

        let delete = Request::builder()
            .method(Method::DELETE)
            .uri("/api/v1/deployment/default/web")
            .header(header::AUTHORIZATION, format!("Bearer {}", token))
            .body(Body::empty())
            .unwrap();
        let (_, body) = send(app(state.clone()), delete).await;
        assert_eq!(body["code"], 403);

        let (_, body) = send(
            app(state.clone()),
            post_json(
                "/api/v1/member/member1/_raw/apply",
                &token,
                json!({ "content": "apiVersion: v1\nkind: Namespace\nmetadata:\n  name: demo\n" }),
            ),
        )
        .await;
        assert_eq!(body["code"], 403);

        // 只读浏览仍然放行, 失败来自不可达的集群
        let (_, body) = send(
            app(state),
            get("/api/v1/member/member1/deployment", Some(&token)),
        )
        .await;
        assert_ne!(body["code"], 403);
    }

    #[tokio::test]
    async fn test_admin_role_is_rechecked_against_user_store() {
        let state = test_state();
        let bob = User::new("bob", "bob-password", None, Role::Admin).unwrap();
        state.users.create(bob).await.unwrap();
        let token = login_token(&state, "bob", "bob-password").await;

        let (_, body) = send(app(state.clone()), get("/api/v1/users", Some(&token))).await;
        assert_eq!(body["code"], 200);

        // 降级为普通用户
        state.users.delete("bob").await.unwrap();
        let bob = User::new("bob", "bob-password", None, Role::User).unwrap();
        state.users.create(bob).await.unwrap();
        let (_, body) = send(app(state.clone()), get("/api/v1/users", Some(&token))).await;
        assert_eq!(body["code"], 403);

        // 已删除
        state.users.delete("bob").await.unwrap();
        let (_, body) = send(app(state), get("/api/v1/users", Some(&token))).await;
        assert_eq!(body["code"], 403);
    }

    #[tokio::test]
    async fn test_aggregated_routes() {
        let state = test_state();
        let admin = login_token(&state, "admin", ADMIN_PASSWORD).await;

        let (status, body) = send(
            app(state.clone()),
            get("/api/v1/aggregated/deployment/default", Some(&admin)),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["code"], 500, "cluster list must fail: {}", body);

        let (status, _) = send(
            app(state.clone()),
            get("/api/v1/aggregated/unknownkind", Some(&admin)),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let user = user_token(&state).await;
        let (_, body) = send(app(state), get("/api/v1/aggregated/secret", Some(&user))).await;
        assert_eq!(body["code"], 403);
    }

    #[tokio::test]
    async fn test_raw_apply_rejects_bad_documents() {
        let state = test_state();
        let admin = login_token(&state, "admin", ADMIN_PASSWORD).await;

        let (status, body) = send(
            app(state.clone()),
            post_json("/api/v1/_raw/apply", &admin, json!({ "content": "kind: [unclosed" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["code"], 400);

        let (_, body) = send(
            app(state),
            post_json(
                "/api/v1/member/member1/_raw/apply",
                &admin,
                json!({ "content": "---\n---\n" }),
            ),
        )
        .await;
        assert_eq!(body["code"], 400);
        assert_eq!(body["message"], "Bad request: no documents to apply");
    }

    fn logout(cookie: &str) -> Request<Body> {
        Request::builder()
            .method(Method::POST)
            .uri("/api/v1/logout")
            .header(header::COOKIE, cookie)
            .body(Body::empty())
            .unwrap()
    }

    fn cleared_cookie(response: &axum::response::Response) -> bool {
        response
            .headers()
            .get(header::SET_COOKIE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| v.starts_with("session=;") && v.contains("Max-Age=0"))
    }

    #[tokio::test]
    async fn test_logout_with_session_clears_cookie() {
        let state = test_state();
        let token = login_token(&state, "admin", ADMIN_PASSWORD).await;

        let response = app(state)
            .oneshot(logout(&format!("session={}", token)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(cleared_cookie(&response));
    }

    #[tokio::test]
    async fn test_logout_with_stale_cookie_clears_it() {
        let response = app(test_state())
            .oneshot(logout("session=whatever"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(cleared_cookie(&response));
    }
}
