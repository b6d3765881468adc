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

use serde::Serialize;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::config::{DashboardConfig, ServeArgs};
use crate::console::state::AppState;
use crate::context::Context;

pub mod auth;
pub mod config;
pub mod console;
pub mod context;
pub mod types;
pub mod users;
pub mod utils;


shadow_rs::shadow!(build);

/// Version and build metadata of this binary.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildInfo {
    pub version: &'static str,
    pub commit: &'static str,
    pub branch: &'static str,
    pub build_time: &'static str,
    pub rust_version: &'static str,
}

impl BuildInfo {
    pub fn current() -> Self {
        Self {
            version: build::PKG_VERSION,
            commit: build::SHORT_COMMIT,
            branch: build::BRANCH,
            build_time: build::BUILD_TIME,
            rust_version: build::RUST_VERSION,
        }
    }
}

pub async fn run(args: ServeArgs) -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_level(true)
        .with_file(true)
        .with_line_number(true)
        .with_target(true)
        .init();

    if rustls::crypto::ring::default_provider()
        .install_default()
        .is_err()
    {
        warn!("a rustls crypto provider is already installed");
    }

    let build = BuildInfo::current();
    info!("karmada-dashboard {} ({})", build.version, build.commit);

    let context = Context::load(&args).await?;
    let dashboard = DashboardConfig::load(args.dashboard_config.as_deref()).await?;
    info!(
        "{} monitoring dashboards configured, gpu resources {:?}",
        dashboard.monitoring.len(),
        dashboard.gpu_resource_names
    );

    let state = AppState::from_args(&args, context, dashboard);
    console::server::run(&args, state).await
}
