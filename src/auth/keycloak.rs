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

use chrono::{Duration, Utc};
use serde::Deserialize;
use sha2::{Digest, Sha256};
use snafu::ResultExt;
use tracing::debug;

use super::{Error, RequestSnafu};
use crate::utils::cache::TtlCache;

const SERVICE: &str = "keycloak";
const CACHE_TTL_SECONDS: i64 = 60;

/// Identity resolved from a Keycloak access token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub username: String,
    pub email: Option<String>,
    pub admin: bool,
}

#[derive(Debug, Deserialize)]
struct UserInfo {
    sub: String,
    #[serde(default)]
    preferred_username: Option<String>,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    groups: Vec<String>,
}

/// Validates bearer tokens against the realm's userinfo endpoint.
pub struct Keycloak {
    client: reqwest::Client,
    userinfo_url: String,
    admin_group: String,
    cache: TtlCache<String, Identity>,
}

impl Keycloak {
    pub fn new(client: reqwest::Client, base_url: &str, realm: &str, admin_group: &str) -> Self {
        Self {
            client,
            userinfo_url: format!(
                "{}/realms/{}/protocol/openid-connect/userinfo",
                base_url.trim_end_matches('/'),
                realm
            ),
            admin_group: admin_group.to_string(),
            cache: TtlCache::new(Duration::zero()),
        }
    }

    /// `Ok(None)` when Keycloak rejects the token.
    pub async fn verify(&self, token: &str) -> Result<Option<Identity>, Error> {
        let key = hex::encode(Sha256::digest(token.as_bytes()));
        if let Some(identity) = self.cache.get(&key).await {
            return Ok(Some(identity));
        }

        let response = self
            .client
            .get(&self.userinfo_url)
            .bearer_auth(token)
            .send()
            .await
            .context(RequestSnafu { service: SERVICE })?;

        if matches!(
            response.status(),
            reqwest::StatusCode::UNAUTHORIZED | reqwest::StatusCode::FORBIDDEN
        ) {
            debug!("keycloak rejected token");
            return Ok(None);
        }

        let info: UserInfo = response
            .error_for_status()
            .context(RequestSnafu { service: SERVICE })?
            .json()
            .await
            .context(RequestSnafu { service: SERVICE })?;

        let identity = self.identity(info);
        self.cache
            .insert(
                key,
                identity.clone(),
                Utc::now() + Duration::seconds(CACHE_TTL_SECONDS),
            )
            .await;
        Ok(Some(identity))
    }

    fn identity(&self, info: UserInfo) -> Identity {
        // group paths may be reported with or without the leading slash
        let admin = info
            .groups
            .iter()
            .any(|g| g.trim_start_matches('/') == self.admin_group);
        Identity {
            username: info.preferred_username.unwrap_or(info.sub),
            email: info.email,
            admin,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keycloak() -> Keycloak {
        Keycloak::new(
            reqwest::Client::new(),
            "https://sso.example.com/",
            "karmada",
            "karmada-admin",
        )
    }

    #[test]
    fn test_userinfo_url() {
        assert_eq!(
            keycloak().userinfo_url,
            "https://sso.example.com/realms/karmada/protocol/openid-connect/userinfo"
        );
    }

    #[test]
    fn test_identity_from_userinfo() {
        let info: UserInfo = serde_json::from_value(serde_json::json!({
            "sub": "f3b1",
            "preferred_username": "alice",
            "groups": ["/karmada-admin", "/dev"]
        }))
        .unwrap();
        let identity = keycloak().identity(info);
        assert_eq!(identity.username, "alice");
        assert!(identity.admin);

        let info: UserInfo = serde_json::from_value(serde_json::json!({ "sub": "f3b2" })).unwrap();
        let identity = keycloak().identity(info);
        assert_eq!(identity.username, "f3b2");
        assert!(!identity.admin);
    }
}
