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

use axum::{Json, extract::State};

use crate::config::MonitoringDashboard;
use crate::console::{models::common::Envelope, state::AppState};

/// 配置文件中的监控面板
pub async fn dashboards(State(state): State<AppState>) -> Json<Envelope<Vec<MonitoringDashboard>>> {
    Json(Envelope::ok(state.dashboard.monitoring.clone()))
}
