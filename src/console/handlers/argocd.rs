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
    Json,
    body::Bytes,
    extract::{Path, RawQuery, State},
    http::Method,
};
use serde_json::Value;
use snafu::ResultExt;
use tracing::debug;

use crate::console::{
    error::{self, Error, Result},
    models::common::Envelope,
    state::{AppState, ArgoCdSettings},
};

const SERVICE: &str = "argocd";

pub fn upstream_url(argocd: &ArgoCdSettings, path: &str, query: Option<&str>) -> String {
    let path = path.trim_start_matches('/');
    match query.filter(|q| !q.is_empty()) {
        Some(query) => format!("{}/api/v1/{}?{}", argocd.url, path, query),
        None => format!("{}/api/v1/{}", argocd.url, path),
    }
}

/// `ANY /api/v1/argocd/{*path}`
pub async fn proxy(
    State(state): State<AppState>,
    method: Method,
    Path(path): Path<String>,
    RawQuery(query): RawQuery,
    body: Bytes,
) -> Result<Json<Envelope<Value>>> {
    let Some(argocd) = state.argocd.as_ref() else {
        return Err(Error::NotFound {
            resource: "argocd integration is not configured".to_string(),
        });
    };
    if path.split('/').any(|segment| segment == "..") {
        return Err(Error::BadRequest {
            message: format!("invalid argocd path '{}'", path),
        });
    }

    let url = upstream_url(argocd, &path, query.as_deref());
    debug!("argocd {} {}", method, url);

    let mut request = state.http.request(method, url);
    if let Some(token) = &argocd.token {
        request = request.bearer_auth(token);
    }
    if !body.is_empty() {
        request = request
            .header(http::header::CONTENT_TYPE, "application/json")
            .body(body);
    }

    let response = request
        .send()
        .await
        .and_then(|r| r.error_for_status())
        .context(error::ProxySnafu { service: SERVICE })?;
    let text = response
        .text()
        .await
        .context(error::ProxySnafu { service: SERVICE })?;

    let value = if text.is_empty() {
        Value::Null
    } else {
        serde_json::from_str(&text).unwrap_or(Value::String(text))
    };
    Ok(Json(Envelope::ok(value)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upstream_url() {
        let argocd = ArgoCdSettings {
            url: "https://argocd.example.com".to_string(),
            token: None,
        };
        assert_eq!(
            upstream_url(&argocd, "applications", Some("project=default")),
            "https://argocd.example.com/api/v1/applications?project=default"
        );
        assert_eq!(
            upstream_url(&argocd, "/applications/guestbook", None),
            "https://argocd.example.com/api/v1/applications/guestbook"
        );
    }
}
