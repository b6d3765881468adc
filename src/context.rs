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

use crate::config::ServeArgs;
use crate::types::v1alpha1::cluster::{Cluster, PROXY_PREFIX};
use kube::api::ListParams;
use kube::config::{KubeConfigOptions, Kubeconfig};
use kube::{Api, Client, Config, ResourceExt};
use snafu::{ResultExt, Snafu};
use snafu::futures::TryFutureExt;
use std::fmt;
use std::path::Path;
use tracing::{debug, info};

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum Error {
    #[snafu(display("Kubernetes API error: {}", source))]
    Kube { source: kube::Error },

    #[snafu(display("failed to infer kube config: {}", source))]
    Infer { source: kube::config::InferConfigError },

    #[snafu(display("failed to load kubeconfig {}: {}", path, source))]
    Kubeconfig {
        path: String,
        source: kube::config::KubeconfigError,
    },

    #[snafu(display("invalid member cluster url for '{}': {}", cluster, source))]
    ClusterUrl {
        cluster: String,
        source: http::uri::InvalidUri,
    },

    #[snafu(display("invalid cluster name '{}'", cluster))]
    InvalidClusterName { cluster: String },
}

/// The cluster an API request is served from.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Target {
    /// The karmada-apiserver (resource templates, policies, clusters).
    Karmada,
    /// The host cluster running the Karmada control plane.
    Mgmt,
    /// A member cluster reached through the Karmada cluster proxy.
    Member(String),
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Target::Karmada => write!(f, "karmada"),
            Target::Mgmt => write!(f, "mgmt"),
            Target::Member(name) => write!(f, "member/{}", name),
        }
    }
}

/// Connection settings of the karmada-apiserver and the management cluster.
///
/// Clients are built per request so the caller's bearer token, when present,
/// replaces the credentials of the kubeconfig.
pub struct Context {
    karmada: Config,
    mgmt: Config,
}

impl Context {
    pub fn new(karmada: Config, mgmt: Config) -> Self {
        Self { karmada, mgmt }
    }

    pub async fn load(args: &ServeArgs) -> Result<Self, Error> {
        let mgmt = load_config(args.kubeconfig.as_deref(), args.context.clone()).await?;
        let karmada = match &args.karmada_kubeconfig {
            Some(path) => load_config(Some(path), args.karmada_context.clone()).await?,
            None => mgmt.clone(),
        };

        info!("karmada-apiserver: {}", karmada.cluster_url);
        info!("management cluster: {}", mgmt.cluster_url);

        Ok(Self::new(karmada, mgmt))
    }

    /// Connection settings for the target, with `token` replacing the kubeconfig credentials.
    pub fn config(&self, target: &Target, token: Option<&str>) -> Result<Config, Error> {
        let mut config = match target {
            Target::Karmada => self.karmada.clone(),
            Target::Mgmt => self.mgmt.clone(),
            Target::Member(name) => {
                let mut config = self.karmada.clone();
                config.cluster_url = member_url(&self.karmada.cluster_url, name)?;
                config
            }
        };

        if let Some(token) = token {
            // A bearer token wins over whatever the kubeconfig carries.
            config.auth_info.token = Some(token.to_string().into());
            config.auth_info.token_file = None;
            config.auth_info.client_certificate = None;
            config.auth_info.client_certificate_data = None;
            config.auth_info.client_key = None;
            config.auth_info.client_key_data = None;
            config.auth_info.username = None;
            config.auth_info.password = None;
            config.auth_info.exec = None;
            config.auth_info.auth_provider = None;
        }

        Ok(config)
    }

    pub fn client(&self, target: &Target, token: Option<&str>) -> Result<Client, Error> {
        let config = self.config(target, token)?;
        debug!("building client for {}", target);
        Client::try_from(config).context(KubeSnafu)
    }

    /// Member clusters whose `Ready` condition is `True`, sorted by name.
    pub async fn ready_clusters(&self, token: Option<&str>) -> Result<Vec<Cluster>, Error> {
        let mut clusters = self.clusters(token).await?;
        clusters.retain(Cluster::is_ready);
        Ok(clusters)
    }

    pub async fn clusters(&self, token: Option<&str>) -> Result<Vec<Cluster>, Error> {
        let api: Api<Cluster> = Api::all(self.client(&Target::Karmada, token)?);
        let mut clusters = api
            .list(&ListParams::default())
            .context(KubeSnafu)
            .await?
            .items;
        clusters.sort_by_key(|c| c.name_any());
        Ok(clusters)
    }

    pub async fn server_version(
        &self,
        target: &Target,
        token: Option<&str>,
    ) -> Result<k8s_openapi::apimachinery::pkg::version::Info, Error> {
        self.client(target, token)?
            .apiserver_version()
            .context(KubeSnafu)
            .await
    }
}

async fn load_config(path: Option<&Path>, context: Option<String>) -> Result<Config, Error> {
    let Some(path) = path else {
        return Config::infer().context(InferSnafu).await;
    };

    let kubeconfig = Kubeconfig::read_from(path).context(KubeconfigSnafu {
        path: path.display().to_string(),
    })?;
    let options = KubeConfigOptions {
        context,
        ..Default::default()
    };

    Config::from_custom_kubeconfig(kubeconfig, &options)
        .context(KubeconfigSnafu {
            path: path.display().to_string(),
        })
        .await
}

/// `{karmada}/apis/cluster.karmada.io/v1alpha1/clusters/{name}/proxy`
pub fn member_url(karmada: &http::Uri, cluster: &str) -> Result<http::Uri, Error> {
    let valid = !cluster.is_empty()
        && !cluster.starts_with('.')
        && cluster
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' || c == '.');
    if !valid {
        return InvalidClusterNameSnafu { cluster }.fail();
    }

    let base = karmada.to_string();
    format!(
        "{}{}{}/proxy",
        base.trim_end_matches('/'),
        PROXY_PREFIX,
        cluster
    )
    .parse::<http::Uri>()
    .context(ClusterUrlSnafu { cluster })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_context() -> Context {
        let karmada = Config::new("https://karmada-apiserver:5443".parse().unwrap());
        let mgmt = Config::new("https://10.0.0.1:6443".parse().unwrap());
        Context::new(karmada, mgmt)
    }

    #[test]
    fn test_member_url() {
        let base: http::Uri = "https://karmada-apiserver:5443/".parse().unwrap();
        let url = member_url(&base, "member1").unwrap();
        assert_eq!(
            url.to_string(),
            "https://karmada-apiserver:5443/apis/cluster.karmada.io/v1alpha1/clusters/member1/proxy"
        );
    }

    #[test]
    fn test_member_url_rejects_path_injection() {
        let base: http::Uri = "https://karmada-apiserver:5443".parse().unwrap();
        assert!(matches!(
            member_url(&base, "../secrets"),
            Err(Error::InvalidClusterName { .. })
        ));
        assert!(member_url(&base, "").is_err());
    }

    #[test]
    fn test_config_per_target() {
        let ctx = test_context();

        let karmada = ctx.config(&Target::Karmada, None).unwrap();
        assert_eq!(karmada.cluster_url.host(), Some("karmada-apiserver"));
        assert!(karmada.auth_info.token.is_none());

        let mgmt = ctx.config(&Target::Mgmt, Some("abc")).unwrap();
        assert_eq!(mgmt.cluster_url.host(), Some("10.0.0.1"));
        assert!(mgmt.auth_info.token.is_some());

        let member = ctx
            .config(&Target::Member("member2".to_string()), None)
            .unwrap();
        assert_eq!(
            member.cluster_url.path(),
            "/apis/cluster.karmada.io/v1alpha1/clusters/member2/proxy"
        );
    }

    #[test]
    fn test_target_display() {
        assert_eq!(Target::Karmada.to_string(), "karmada");
        assert_eq!(Target::Member("m1".to_string()).to_string(), "member/m1");
    }
}
