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

use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::hash::Hash;
use tokio::sync::Mutex;

/// A small map of short-lived values such as service account tokens.
///
/// Expiry is checked on read. Expired entries are dropped lazily when they are
/// looked up or when a new value is inserted.
pub struct TtlCache<K, V> {
    entries: Mutex<HashMap<K, (V, DateTime<Utc>)>>,
    /// Entries are treated as expired this long before their real deadline.
    skew: Duration,
}

impl<K, V> TtlCache<K, V>
where
    K: Eq + Hash,
    V: Clone,
{
    pub fn new(skew: Duration) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            skew,
        }
    }

    pub async fn get(&self, key: &K) -> Option<V> {
        self.get_at(key, Utc::now()).await
    }

    async fn get_at(&self, key: &K, now: DateTime<Utc>) -> Option<V> {
        let mut entries = self.entries.lock().await;
        match entries.get(key) {
            Some((value, expires_at)) if *expires_at - self.skew > now => Some(value.clone()),
            Some(_) => {
                entries.remove(key);
                None
            }
            None => None,
        }
    }

    pub async fn insert(&self, key: K, value: V, expires_at: DateTime<Utc>) {
        let now = Utc::now();
        let mut entries = self.entries.lock().await;
        entries.retain(|_, (_, exp)| *exp - self.skew > now);
        entries.insert(key, (value, expires_at));
    }

    pub async fn remove(&self, key: &K) {
        self.entries.lock().await.remove(key);
    }

    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_get_before_and_after_expiry() {
        let cache = TtlCache::new(Duration::seconds(60));
        let expires_at = Utc::now() + Duration::minutes(10);
        cache.insert("sa", "token".to_string(), expires_at).await;

        assert_eq!(cache.get(&"sa").await, Some("token".to_string()));
        assert_eq!(
            cache.get_at(&"sa", expires_at - Duration::seconds(30)).await,
            None,
            "entry inside the skew window must be treated as expired"
        );
        assert_eq!(cache.len().await, 0);
    }

    #[tokio::test]
    async fn test_insert_drops_expired_entries() {
        let cache = TtlCache::new(Duration::zero());
        cache
            .insert("old", 1, Utc::now() - Duration::seconds(1))
            .await;
        cache
            .insert("new", 2, Utc::now() + Duration::minutes(1))
            .await;

        assert_eq!(cache.len().await, 1);
        assert_eq!(cache.get(&"new").await, Some(2));

        cache.remove(&"new").await;
        assert_eq!(cache.get(&"new").await, None);
    }
}
