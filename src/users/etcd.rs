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

//! User store on top of the etcd v3 JSON gateway.
//!
//! Each user is one key `{prefix}{username}` holding the JSON encoded
//! [`User`]. The gateway expects keys and values base64 encoded and reports
//! int64 fields as strings.

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use chrono::Utc;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use snafu::ResultExt;
use tracing::debug;

use super::{DecodeSnafu, Error, EtcdSnafu, RecordSnafu, User, UserStore};

pub struct EtcdUserStore {
    client: reqwest::Client,
    endpoint: String,
    prefix: String,
}

#[derive(Debug, Default, Deserialize)]
struct RangeResponse {
    #[serde(default)]
    kvs: Vec<KeyValue>,
}

#[derive(Debug, Deserialize)]
struct KeyValue {
    #[serde(default)]
    value: String,
}

#[derive(Debug, Default, Deserialize)]
struct TxnResponse {
    #[serde(default)]
    succeeded: bool,
}

#[derive(Debug, Default, Deserialize)]
struct DeleteRangeResponse {
    #[serde(default)]
    deleted: Value,
}

/// Smallest key greater than every key starting with `prefix`.
fn prefix_end(prefix: &[u8]) -> Vec<u8> {
    let mut end = prefix.to_vec();
    while let Some(last) = end.pop() {
        if last < 0xff {
            end.push(last + 1);
            return end;
        }
    }
    // every byte was 0xff: range to the end of the keyspace
    vec![0]
}

fn encode(bytes: &[u8]) -> String {
    STANDARD.encode(bytes)
}

/// int64 fields arrive as JSON strings from the gateway.
fn as_count(value: &Value) -> i64 {
    match value {
        Value::String(s) => s.parse().unwrap_or(0),
        Value::Number(n) => n.as_i64().unwrap_or(0),
        _ => 0,
    }
}

fn decode_user(kv: &KeyValue) -> Result<User, Error> {
    let raw = STANDARD.decode(&kv.value).context(DecodeSnafu)?;
    serde_json::from_slice(&raw).context(RecordSnafu)
}

impl EtcdUserStore {
    pub fn new(client: reqwest::Client, endpoint: &str, prefix: &str) -> Self {
        Self {
            client,
            endpoint: endpoint.trim_end_matches('/').to_string(),
            prefix: prefix.to_string(),
        }
    }

    fn key(&self, username: &str) -> String {
        format!("{}{}", self.prefix, username)
    }

    async fn call<T: DeserializeOwned>(&self, api: &str, body: Value) -> Result<T, Error> {
        debug!("etcd {}", api);
        self.client
            .post(format!("{}/v3/kv/{}", self.endpoint, api))
            .json(&body)
            .send()
            .await
            .context(EtcdSnafu)?
            .error_for_status()
            .context(EtcdSnafu)?
            .json::<T>()
            .await
            .context(EtcdSnafu)
    }

    async fn put(&self, user: &User) -> Result<(), Error> {
        let value = serde_json::to_vec(user).context(RecordSnafu)?;
        let _: Value = self
            .call(
                "put",
                json!({
                    "key": encode(self.key(&user.username).as_bytes()),
                    "value": encode(&value),
                }),
            )
            .await?;
        Ok(())
    }
}

#[async_trait]
impl UserStore for EtcdUserStore {
    async fn get(&self, username: &str) -> Result<Option<User>, Error> {
        let resp: RangeResponse = self
            .call("range", json!({ "key": encode(self.key(username).as_bytes()) }))
            .await?;
        resp.kvs.first().map(decode_user).transpose()
    }

    async fn list(&self) -> Result<Vec<User>, Error> {
        let resp: RangeResponse = self
            .call(
                "range",
                json!({
                    "key": encode(self.prefix.as_bytes()),
                    "range_end": encode(&prefix_end(self.prefix.as_bytes())),
                }),
            )
            .await?;
        // etcd returns keys in byte order, which is username order under one prefix
        resp.kvs.iter().map(decode_user).collect()
    }

    async fn create(&self, user: User) -> Result<(), Error> {
        let key = encode(self.key(&user.username).as_bytes());
        let value = serde_json::to_vec(&user).context(RecordSnafu)?;
        let resp: TxnResponse = self
            .call(
                "txn",
                json!({
                    "compare": [{
                        "key": key,
                        "target": "CREATE",
                        "result": "EQUAL",
                        "create_revision": "0",
                    }],
                    "success": [{
                        "request_put": { "key": key, "value": encode(&value) }
                    }],
                }),
            )
            .await?;

        if !resp.succeeded {
            return Err(Error::AlreadyExists {
                username: user.username,
            });
        }
        Ok(())
    }

    async fn update_password(&self, username: &str, password_hash: String) -> Result<(), Error> {
        let mut user = self.get(username).await?.ok_or_else(|| Error::NotFound {
            username: username.to_string(),
        })?;
        user.password_hash = password_hash;
        user.updated_at = Utc::now();
        self.put(&user).await
    }

    async fn delete(&self, username: &str) -> Result<(), Error> {
        let resp: DeleteRangeResponse = self
            .call(
                "deleterange",
                json!({ "key": encode(self.key(username).as_bytes()) }),
            )
            .await?;
        if as_count(&resp.deleted) == 0 {
            return Err(Error::NotFound {
                username: username.to_string(),
            });
        }
        Ok(())
    }
}
