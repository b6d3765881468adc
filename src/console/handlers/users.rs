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

//! 用户管理, 仅管理员可用

use axum::{
    Extension, Json,
    extract::{Path, State},
};
use tracing::{info, warn};

use crate::console::{
    error::{Error, Result},
    models::common::{ActionResponse, Envelope},
    models::user::{CreateUserRequest, SetPasswordRequest, UserInfo},
    state::{AppState, Claims},
};
use crate::users::{self, Role, User, password};

const MIN_PASSWORD_LEN: usize = 8;

pub fn validate_password(password: &str) -> Result<()> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(Error::BadRequest {
            message: format!("password must be at least {} characters", MIN_PASSWORD_LEN),
        });
    }
    Ok(())
}

pub async fn list_users(State(state): State<AppState>) -> Result<Json<Envelope<Vec<UserInfo>>>> {
    let users = state.users.list().await?;
    Ok(Json(Envelope::ok(users.iter().map(UserInfo::from).collect())))
}

pub async fn create_user(
    State(state): State<AppState>,
    Json(req): Json<CreateUserRequest>,
) -> Result<Json<Envelope<UserInfo>>> {
    if !users::valid_username(&req.username) {
        return Err(Error::BadRequest {
            message: format!("invalid username '{}'", req.username),
        });
    }
    validate_password(&req.password)?;

    let user = User::new(&req.username, &req.password, req.email, req.role)?;
    state.users.create(user.clone()).await?;
    info!("created user {} ({})", user.username, user.role);

    if let (Role::Admin, Some(openfga)) = (user.role, &state.openfga) {
        if let Err(e) = openfga.grant_admin(&user.username).await {
            warn!("failed to write OpenFGA admin tuple for {}: {}", user.username, e);
        }
    }

    Ok(Json(Envelope::ok(UserInfo::from(&user))))
}

pub async fn set_password(
    State(state): State<AppState>,
    Path(username): Path<String>,
    Json(req): Json<SetPasswordRequest>,
) -> Result<Json<Envelope<ActionResponse>>> {
    validate_password(&req.password)?;
    state
        .users
        .update_password(&username, password::hash(&req.password)?)
        .await?;

    info!("password of {} reset", username);
    Ok(Json(Envelope::ok(ActionResponse::done(format!(
        "password of {} updated",
        username
    )))))
}

pub async fn delete_user(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(username): Path<String>,
) -> Result<Json<Envelope<ActionResponse>>> {
    if claims.sub == username {
        return Err(Error::BadRequest {
            message: "cannot delete the current user".to_string(),
        });
    }

    state.users.delete(&username).await?;
    info!("deleted user {}", username);

    if let Some(openfga) = &state.openfga {
        // 用户可能本就没有 admin 关系
        if let Err(e) = openfga.revoke_admin(&username).await {
            warn!("failed to delete OpenFGA admin tuple for {}: {}", username, e);
        }
    }

    Ok(Json(Envelope::ok(ActionResponse::done(format!(
        "user {} deleted",
        username
    )))))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_password() {
        assert!(validate_password("short").is_err());
        assert!(validate_password("long-enough").is_ok());
    }
}
