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
    response::{IntoResponse, Response},
};
use snafu::Snafu;

use crate::console::models::common::Envelope;
use crate::{auth, context, users};

/// Console API 错误类型
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum Error {
    #[snafu(display("Unauthorized: {}", message))]
    Unauthorized { message: String },

    #[snafu(display("Forbidden: {}", message))]
    Forbidden { message: String },

    #[snafu(display("Not found: {}", resource))]
    NotFound { resource: String },

    #[snafu(display("Bad request: {}", message))]
    BadRequest { message: String },

    #[snafu(display("Internal server error: {}", message))]
    InternalServer { message: String },

    #[snafu(display("Kubernetes API error: {}", source))]
    KubeApi { source: kube::Error },

    #[snafu(display("Cluster access error: {}", source))]
    Context { source: context::Error },

    #[snafu(display("JWT error: {}", source))]
    Jwt { source: jsonwebtoken::errors::Error },

    #[snafu(display("JSON serialization error: {}", source))]
    Json { source: serde_json::Error },

    #[snafu(display("YAML parse error: {}", source))]
    Yaml { source: serde_yaml_ng::Error },

    #[snafu(display("User store error: {}", source))]
    UserStore { source: users::Error },

    #[snafu(display("Upstream error: {}", source))]
    Upstream { source: auth::Error },

    #[snafu(display("{} proxy error: {}", service, source))]
    Proxy {
        service: &'static str,
        source: reqwest::Error,
    },
}

impl From<context::Error> for Error {
    fn from(source: context::Error) -> Self {
        Error::Context { source }
    }
}

impl From<users::Error> for Error {
    fn from(source: users::Error) -> Self {
        Error::UserStore { source }
    }
}

impl From<kube::Error> for Error {
    fn from(source: kube::Error) -> Self {
        Error::KubeApi { source }
    }
}

fn kube_code(source: &kube::Error) -> u16 {
    match source {
        kube::Error::Api(status) => status.code,
        _ => 500,
    }
}

impl Error {
    /// 信封中的错误码
    pub fn code(&self) -> u16 {
        match self {
            Error::Unauthorized { .. } | Error::Jwt { .. } => 401,
            Error::Forbidden { .. } => 403,
            Error::NotFound { .. } => 404,
            Error::BadRequest { .. } | Error::Json { .. } | Error::Yaml { .. } => 400,
            Error::InternalServer { .. } => 500,
            Error::KubeApi { source } => kube_code(source),
            Error::Context { source } => match source {
                context::Error::Kube { source } => kube_code(source),
                context::Error::InvalidClusterName { .. } => 400,
                _ => 500,
            },
            Error::UserStore { source } => match source {
                users::Error::NotFound { .. } => 404,
                users::Error::AlreadyExists { .. } => 409,
                _ => 500,
            },
            Error::Upstream { .. } => 502,
            // 上游返回的状态码原样透传
            Error::Proxy { source, .. } => source.status().map_or(502, |s| s.as_u16()),
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let code = self.code();
        if code >= 500 {
            tracing::error!("request failed: {}", self);
        } else {
            tracing::debug!("request rejected: {}", self);
        }

        // 失败同样返回 HTTP 200, 由信封中的 code 区分
        Json(Envelope::<()>::fail(code, self.to_string())).into_response()
    }
}

/// Result type for Console API
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert_eq!(
            Error::NotFound {
                resource: "deployment/nginx".to_string()
            }
            .code(),
            404
        );
        assert_eq!(
            Error::from(users::Error::AlreadyExists {
                username: "alice".to_string()
            })
            .code(),
            409
        );
        assert_eq!(
            Error::from(context::Error::InvalidClusterName {
                cluster: "../x".to_string()
            })
            .code(),
            400
        );
    }

    #[tokio::test]
    async fn test_error_is_enveloped_with_http_200() {
        let response = Error::Forbidden {
            message: "admin only".to_string(),
        }
        .into_response();
        assert_eq!(response.status(), axum::http::StatusCode::OK);

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let value: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(value["code"], 403);
        assert_eq!(value["message"], "Forbidden: admin only");
        assert!(value["data"].is_null());
    }
}
