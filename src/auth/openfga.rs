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

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use snafu::ResultExt;
use tracing::info;

use super::{Error, RequestSnafu};

const SERVICE: &str = "openfga";
pub const ADMIN_RELATION: &str = "admin";
pub const DASHBOARD_OBJECT: &str = "dashboard:karmada";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TupleKey {
    pub user: String,
    pub relation: String,
    pub object: String,
}

impl TupleKey {
    /// `user:{username} admin dashboard:karmada`
    pub fn admin(username: &str) -> Self {
        Self {
            user: format!("user:{}", username),
            relation: ADMIN_RELATION.to_string(),
            object: DASHBOARD_OBJECT.to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct CheckResponse {
    #[serde(default)]
    allowed: bool,
}

pub struct OpenFga {
    client: reqwest::Client,
    store_url: String,
    model_id: Option<String>,
}

impl OpenFga {
    pub fn new(
        client: reqwest::Client,
        api_url: &str,
        store_id: &str,
        model_id: Option<String>,
    ) -> Self {
        Self {
            client,
            store_url: format!("{}/stores/{}", api_url.trim_end_matches('/'), store_id),
            model_id,
        }
    }

    fn body(&self, mut body: Value) -> Value {
        if let (Some(model), Some(obj)) = (&self.model_id, body.as_object_mut()) {
            obj.insert("authorization_model_id".to_string(), json!(model));
        }
        body
    }

    async fn post(&self, api: &str, body: Value) -> Result<reqwest::Response, Error> {
        self.client
            .post(format!("{}/{}", self.store_url, api))
            .json(&self.body(body))
            .send()
            .await
            .context(RequestSnafu { service: SERVICE })?
            .error_for_status()
            .context(RequestSnafu { service: SERVICE })
    }

    pub async fn check(&self, tuple: &TupleKey) -> Result<bool, Error> {
        let resp: CheckResponse = self
            .post("check", json!({ "tuple_key": tuple }))
            .await?
            .json()
            .await
            .context(RequestSnafu { service: SERVICE })?;
        Ok(resp.allowed)
    }

    pub async fn is_admin(&self, username: &str) -> Result<bool, Error> {
        self.check(&TupleKey::admin(username)).await
    }

    pub async fn grant_admin(&self, username: &str) -> Result<(), Error> {
        info!("granting dashboard admin to {}", username);
        self.post(
            "write",
            json!({ "writes": { "tuple_keys": [TupleKey::admin(username)] } }),
        )
        .await
        .map(|_| ())
    }

    pub async fn revoke_admin(&self, username: &str) -> Result<(), Error> {
        info!("revoking dashboard admin from {}", username);
        self.post(
            "write",
            json!({ "deletes": { "tuple_keys": [TupleKey::admin(username)] } }),
        )
        .await
        .map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_admin_tuple() {
        let value = serde_json::to_value(TupleKey::admin("alice")).unwrap();
        assert_eq!(
            value,
            json!({ "user": "user:alice", "relation": "admin", "object": "dashboard:karmada" })
        );
    }

    #[test]
    fn test_request_body_carries_model() {
        let fga = OpenFga::new(
            reqwest::Client::new(),
            "http://openfga:8080/",
            "01HSTORE",
            Some("01HMODEL".to_string()),
        );
        assert_eq!(fga.store_url, "http://openfga:8080/stores/01HSTORE");

        let body = fga.body(json!({ "tuple_key": TupleKey::admin("bob") }));
        assert_eq!(body["authorization_model_id"], "01HMODEL");
        assert_eq!(body["tuple_key"]["user"], "user:bob");
    }
}
