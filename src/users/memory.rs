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

use async_trait::async_trait;
use chrono::Utc;
use std::collections::BTreeMap;
use tokio::sync::RwLock;

use super::{Error, User, UserStore};

/// Process-local user store. Contents are lost on restart.
#[derive(Default)]
pub struct MemoryUserStore {
    users: RwLock<BTreeMap<String, User>>,
}

impl MemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn get(&self, username: &str) -> Result<Option<User>, Error> {
        Ok(self.users.read().await.get(username).cloned())
    }

    async fn list(&self) -> Result<Vec<User>, Error> {
        Ok(self.users.read().await.values().cloned().collect())
    }

    async fn create(&self, user: User) -> Result<(), Error> {
        let mut users = self.users.write().await;
        if users.contains_key(&user.username) {
            return Err(Error::AlreadyExists {
                username: user.username,
            });
        }
        users.insert(user.username.clone(), user);
        Ok(())
    }

    async fn update_password(&self, username: &str, password_hash: String) -> Result<(), Error> {
        let mut users = self.users.write().await;
        let user = users.get_mut(username).ok_or_else(|| Error::NotFound {
            username: username.to_string(),
        })?;
        user.password_hash = password_hash;
        user.updated_at = Utc::now();
        Ok(())
    }

    async fn delete(&self, username: &str) -> Result<(), Error> {
        self.users
            .write()
            .await
            .remove(username)
            .map(|_| ())
            .ok_or_else(|| Error::NotFound {
                username: username.to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::users::{Role, password};

    #[tokio::test]
    async fn test_crud() {
        let store = MemoryUserStore::new();
        store
            .create(User::new("bob", "pw1", None, Role::User).unwrap())
            .await
            .unwrap();
        store
            .create(User::new("alice", "pw2", None, Role::Admin).unwrap())
            .await
            .unwrap();

        let names: Vec<String> = store
            .list()
            .await
            .unwrap()
            .into_iter()
            .map(|u| u.username)
            .collect();
        assert_eq!(names, vec!["alice", "bob"]);

        let err = store
            .create(User::new("bob", "again", None, Role::User).unwrap())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::AlreadyExists { .. }));

        store
            .update_password("bob", password::hash("pw3").unwrap())
            .await
            .unwrap();
        assert!(store.get("bob").await.unwrap().unwrap().verify_password("pw3"));

        store.delete("bob").await.unwrap();
        assert!(store.get("bob").await.unwrap().is_none());
        assert!(matches!(
            store.delete("bob").await,
            Err(Error::NotFound { .. })
        ));
    }
}
