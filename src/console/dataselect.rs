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

//! Filtering, sorting and paging of list responses.
//!
//! Query parameters follow the dashboard frontend conventions:
//! `sortBy=d,creationTimestamp,a,name`, `filterBy=name,nginx`,
//! `itemsPerPage=10&page=2`.

use serde::Deserialize;
use std::cmp::Ordering;
use strum::EnumString;

/// Fields a list item exposes to data selection.
pub trait DataCell {
    fn name(&self) -> &str;

    fn namespace(&self) -> Option<&str>;

    fn creation_timestamp(&self) -> Option<&str>;

    fn cluster(&self) -> Option<&str> {
        None
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumString)]
#[strum(serialize_all = "camelCase")]
enum Property {
    Name,
    Namespace,
    CreationTimestamp,
    Cluster,
}

impl Property {
    fn value<'a, T: DataCell>(self, item: &'a T) -> &'a str {
        match self {
            Property::Name => item.name(),
            Property::Namespace => item.namespace().unwrap_or_default(),
            Property::CreationTimestamp => item.creation_timestamp().unwrap_or_default(),
            Property::Cluster => item.cluster().unwrap_or_default(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataSelectQuery {
    pub items_per_page: Option<usize>,
    pub page: Option<usize>,
    pub sort_by: Option<String>,
    pub filter_by: Option<String>,
}

/// Parses `a,name,d,creationTimestamp` into (ascending, property) pairs; unknown properties are dropped.
fn sort_keys(raw: &str) -> Vec<(bool, Property)> {
    let parts: Vec<&str> = raw.split(',').map(str::trim).collect();
    parts
        .chunks(2)
        .filter_map(|pair| match pair {
            [order, prop] => {
                let property = prop.parse::<Property>().ok()?;
                Some((*order != "d", property))
            }
            _ => None,
        })
        .collect()
}

fn filter_terms(raw: &str) -> Vec<(Property, String)> {
    let parts: Vec<&str> = raw.split(',').map(str::trim).collect();
    parts
        .chunks(2)
        .filter_map(|pair| match pair {
            [prop, value] if !value.is_empty() => {
                Some((prop.parse::<Property>().ok()?, value.to_lowercase()))
            }
            _ => None,
        })
        .collect()
}

impl DataSelectQuery {
    /// Applies filter, sort and paging. Returns the selected page and the
    /// number of items that matched the filter.
    pub fn apply<T: DataCell>(&self, mut items: Vec<T>) -> (Vec<T>, usize) {
        if let Some(raw) = &self.filter_by {
            let terms = filter_terms(raw);
            items.retain(|item| {
                terms
                    .iter()
                    .all(|(prop, value)| prop.value(item).to_lowercase().contains(value.as_str()))
            });
        }

        let mut keys = self.sort_by.as_deref().map(sort_keys).unwrap_or_default();
        if keys.is_empty() {
            keys.push((true, Property::Name));
        }
        // Ties fall back to a stable, fully determined order.
        for tie in [Property::Name, Property::Namespace, Property::Cluster] {
            if !keys.iter().any(|(_, p)| *p == tie) {
                keys.push((true, tie));
            }
        }

        items.sort_by(|a, b| {
            keys.iter()
                .map(|(ascending, prop)| {
                    let ord = prop.value(a).cmp(prop.value(b));
                    if *ascending { ord } else { ord.reverse() }
                })
                .find(|ord| *ord != Ordering::Equal)
                .unwrap_or(Ordering::Equal)
        });

        let total = items.len();
        let items = match self.items_per_page {
            Some(per_page) if per_page > 0 => {
                let page = self.page.unwrap_or(1).max(1);
                items
                    .into_iter()
                    .skip((page - 1).saturating_mul(per_page))
                    .take(per_page)
                    .collect()
            }
            _ => items,
        };

        (items, total)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    struct Row {
        name: &'static str,
        namespace: &'static str,
        created: &'static str,
        cluster: &'static str,
    }

    impl DataCell for Row {
        fn name(&self) -> &str {
            self.name
        }
        fn namespace(&self) -> Option<&str> {
            Some(self.namespace)
        }
        fn creation_timestamp(&self) -> Option<&str> {
            Some(self.created)
        }
        fn cluster(&self) -> Option<&str> {
            Some(self.cluster)
        }
    }

    fn rows() -> Vec<Row> {
        vec![
            Row { name: "web", namespace: "prod", created: "2024-03-01T00:00:00Z", cluster: "member2" },
            Row { name: "api", namespace: "prod", created: "2024-01-01T00:00:00Z", cluster: "member1" },
            Row { name: "web", namespace: "prod", created: "2024-02-01T00:00:00Z", cluster: "member1" },
            Row { name: "cache", namespace: "dev", created: "2024-04-01T00:00:00Z", cluster: "member1" },
        ]
    }

    fn names(rows: &[Row]) -> Vec<(&str, &str)> {
        rows.iter().map(|r| (r.name, r.cluster)).collect()
    }

    #[test]
    fn test_default_sorts_by_name_then_cluster() {
        let (items, total) = DataSelectQuery::default().apply(rows());
        assert_eq!(total, 4);
        assert_eq!(
            names(&items),
            vec![("api", "member1"), ("cache", "member1"), ("web", "member1"), ("web", "member2")]
        );
    }

    #[test]
    fn test_sort_descending_by_creation() {
        let query = DataSelectQuery {
            sort_by: Some("d,creationTimestamp".to_string()),
            ..Default::default()
        };
        let (items, _) = query.apply(rows());
        assert_eq!(items[0].name, "cache");
        assert_eq!(items[3].name, "api");
    }

    #[test]
    fn test_filter_and_paginate() {
        let query = DataSelectQuery {
            filter_by: Some("namespace,PROD".to_string()),
            items_per_page: Some(2),
            page: Some(2),
            ..Default::default()
        };
        let (items, total) = query.apply(rows());
        assert_eq!(total, 3, "total counts filtered items before paging");
        assert_eq!(names(&items), vec![("web", "member2")]);
    }

    #[test]
    fn test_page_past_end_is_empty() {
        let query = DataSelectQuery {
            items_per_page: Some(10),
            page: Some(3),
            ..Default::default()
        };
        let (items, total) = query.apply(rows());
        assert!(items.is_empty());
        assert_eq!(total, 4);
    }

    #[test]
    fn test_unknown_sort_and_filter_properties_are_ignored() {
        let query = DataSelectQuery {
            sort_by: Some("a,color".to_string()),
            filter_by: Some("color,red".to_string()),
            ..Default::default()
        };
        let (items, total) = query.apply(rows());
        assert_eq!(total, 4);
        assert_eq!(items[0].name, "api");
    }
}
