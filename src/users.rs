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

//! Dashboard user accounts.
//!
//! Users are plain records keyed by username. The production store lives in
//! etcd; an in-memory store backs development setups and tests.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use snafu::Snafu;
use strum::{Display, EnumString};

pub mod etcd;
pub mod memory;
pub mod password;

pub use etcd::EtcdUserStore;
pub use memory::MemoryUserStore;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum Error {
    #[snafu(display("user '{}' not found", username))]
    NotFound { username: String },

    #[snafu(display("user '{}' already exists", username))]
    AlreadyExists { username: String },

    #[snafu(display("password hashing failed: {}", message))]
    Hash { message: String },

    #[snafu(display("etcd request failed: {}", source))]
    Etcd { source: reqwest::Error },

    #[snafu(display("failed to decode user record: {}", source))]
    Decode { source: base64::DecodeError },

    #[snafu(display("malformed user record: {}", source))]
    Record { source: serde_json::Error },
}

#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Role {
    Admin,
    #[default]
    User,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub username: String,
    pub password_hash: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default)]
    pub role: Role,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Builds a new record, hashing `password`.
    pub fn new(
        username: impl Into<String>,
        password: &str,
        email: Option<String>,
        role: Role,
    ) -> Result<Self, Error> {
        let now = Utc::now();
        Ok(Self {
            username: username.into(),
            password_hash: password::hash(password)?,
            email,
            role,
            created_at: now,
            updated_at: now,
        })
    }

    pub fn verify_password(&self, password: &str) -> bool {
        password::verify(password, &self.password_hash)
    }
}

/// Usernames end up in etcd keys, so only a conservative character set is accepted.
pub fn valid_username(username: &str) -> bool {
    !username.is_empty()
        && username.len() <= 64
        && username
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | '@'))
}

#[async_trait]
pub trait UserStore: Send + Sync {
    async fn get(&self, username: &str) -> Result<Option<User>, Error>;

    /// All users ordered by username.
    async fn list(&self) -> Result<Vec<User>, Error>;

    /// Fails with [`Error::AlreadyExists`] when the username is taken.
    async fn create(&self, user: User) -> Result<(), Error>;

    async fn update_password(&self, username: &str, password_hash: String) -> Result<(), Error>;

    async fn delete(&self, username: &str) -> Result<(), Error>;
}
