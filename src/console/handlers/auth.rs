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

use axum::{Extension, Json, extract::State, http::header, response::IntoResponse};
use jsonwebtoken::{EncodingKey, Header, encode};
use k8s_openapi::api::authentication::v1::SelfSubjectReview;
use kube::{
    Api, Client,
    api::{ListParams, PostParams},
};
use snafu::ResultExt;
use tracing::{info, warn};

use crate::console::{
    error::{self, Error, Result},
    middleware::auth::is_admin,
    models::auth::{ChangePasswordRequest, LoginRequest, LoginResponse, MeResponse, PasswordLoginRequest},
    models::common::{ActionResponse, Envelope},
    state::{AppState, AuthMethod, Claims},
};
use crate::context::Target;
use crate::types::v1alpha1::cluster::Cluster;
use crate::users::{self, Role, User, password};

const TOKEN_USER: &str = "token-user";

fn invalid_credentials() -> Error {
    Error::Unauthorized {
        message: "invalid username or password".to_string(),
    }
}

/// 签发 JWT, 同时设置 HttpOnly Cookie
fn issue_session(state: &AppState, claims: Claims) -> Result<impl IntoResponse + use<>> {
    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(state.jwt_secret.as_bytes()),
    )
    .context(error::JwtSnafu)?;

    let cookie = format!(
        "session={}; Path=/; HttpOnly; SameSite=Strict; Max-Age={}",
        token,
        state.session_ttl.num_seconds()
    );

    Ok((
        [(header::SET_COOKIE, cookie)],
        Json(Envelope::ok(LoginResponse {
            token,
            username: claims.sub,
            role: claims.role,
        })),
    ))
}

/// token 对应的用户名, 失败时不影响登录
async fn token_identity(client: Client) -> String {
    let api: Api<SelfSubjectReview> = Api::all(client);
    match api
        .create(&PostParams::default(), &SelfSubjectReview::default())
        .await
    {
        Ok(review) => review
            .status
            .and_then(|s| s.user_info)
            .and_then(|u| u.username)
            .unwrap_or_else(|| TOKEN_USER.to_string()),
        Err(e) => {
            warn!("SelfSubjectReview failed: {}", e);
            TOKEN_USER.to_string()
        }
    }
}

/// 登录处理
///
/// 验证 Kubernetes Token 并生成 Dashboard Session Token
pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<impl IntoResponse> {
    let token = req.token.trim().to_string();
    if token.is_empty() {
        return Err(Error::BadRequest {
            message: "token is required".to_string(),
        });
    }

    let client = state.context.client(&Target::Karmada, Some(&token))?;

    // 测试权限 - 尝试列出 Cluster (limit 1)
    let api: Api<Cluster> = Api::all(client.clone());
    api.list(&ListParams::default().limit(1)).await.map_err(|e| {
        warn!("token rejected by karmada-apiserver: {}", e);
        Error::Unauthorized {
            message: "Invalid or insufficient permissions".to_string(),
        }
    })?;

    let username = token_identity(client).await;
    info!("token login as {}", username);

    let claims = Claims::new(
        username,
        Role::User,
        Some(token),
        AuthMethod::Token,
        state.session_ttl,
    );
    issue_session(&state, claims)
}

/// 查找用户, 引导管理员首次登录时自动创建
async fn find_or_bootstrap(state: &AppState, req: &PasswordLoginRequest) -> Result<Option<User>> {
    if let Some(user) = state.users.get(&req.username).await? {
        return Ok(Some(user));
    }

    let bootstrap = state.admin.username == req.username
        && state.admin.password.as_deref() == Some(req.password.as_str());
    if !bootstrap {
        return Ok(None);
    }

    info!("creating bootstrap administrator {}", req.username);
    let user = User::new(&req.username, &req.password, None, Role::Admin)?;
    match state.users.create(user.clone()).await {
        Ok(()) => {}
        // 并发登录时另一个请求已创建
        Err(users::Error::AlreadyExists { .. }) => return Ok(state.users.get(&req.username).await?),
        Err(e) => return Err(e.into()),
    }

    if let Some(openfga) = &state.openfga {
        if let Err(e) = openfga.grant_admin(&user.username).await {
            warn!("failed to write OpenFGA admin tuple: {}", e);
        }
    }
    Ok(Some(user))
}

/// 用户名密码登录
pub async fn login_password(
    State(state): State<AppState>,
    Json(req): Json<PasswordLoginRequest>,
) -> Result<impl IntoResponse> {
    if !users::valid_username(&req.username) || req.password.is_empty() {
        return Err(invalid_credentials());
    }

    let user = find_or_bootstrap(&state, &req)
        .await?
        .ok_or_else(invalid_credentials)?;
    if !user.verify_password(&req.password) {
        warn!("password login failed for {}", req.username);
        return Err(invalid_credentials());
    }

    info!("password login as {}", user.username);
    let claims = Claims::new(
        user.username,
        user.role,
        None,
        AuthMethod::Password,
        state.session_ttl,
    );
    issue_session(&state, claims)
}

/// 登出处理
pub async fn logout() -> impl IntoResponse {
    // 清除 Cookie
    let cookie = "session=; Path=/; HttpOnly; SameSite=Strict; Max-Age=0";
    let headers = [(header::SET_COOKIE, cookie)];

    (
        headers,
        Json(Envelope::ok(ActionResponse::done("Logout successful"))),
    )
}

/// 当前会话
pub async fn me(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Json<Envelope<MeResponse>> {
    let expires_at =
        chrono::DateTime::from_timestamp(claims.exp as i64, 0).map(|dt| dt.to_rfc3339());
    let is_admin = is_admin(&state, &claims).await;

    Json(Envelope::ok(MeResponse {
        username: claims.sub,
        role: claims.role,
        is_admin,
        auth: claims.auth,
        expires_at,
    }))
}

/// 修改自己的密码, 仅限密码登录的会话
pub async fn change_password(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<ChangePasswordRequest>,
) -> Result<Json<Envelope<ActionResponse>>> {
    if claims.auth != AuthMethod::Password {
        return Err(Error::BadRequest {
            message: format!("{} sessions have no dashboard password", claims.auth),
        });
    }
    super::users::validate_password(&req.new_password)?;

    let user = state
        .users
        .get(&claims.sub)
        .await?
        .ok_or_else(|| Error::NotFound {
            resource: format!("user {}", claims.sub),
        })?;
    if !user.verify_password(&req.current_password) {
        return Err(Error::Forbidden {
            message: "current password is incorrect".to_string(),
        });
    }

    state
        .users
        .update_password(&claims.sub, password::hash(&req.new_password)?)
        .await?;
    info!("{} changed their password", claims.sub);
    Ok(Json(Envelope::ok(ActionResponse::done("Password updated"))))
}
