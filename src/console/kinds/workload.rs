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

use k8s_openapi::api::apps::v1 as appsv1;
use k8s_openapi::api::batch::v1 as batchv1;
use k8s_openapi::api::core::v1 as corev1;
use serde::Serialize;
use strum::Display;

use super::{Images, ResourceKind};
use crate::console::models::common::timestamp;
use crate::utils::cron;

/// 副本状态
#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct PodInfo {
    pub current: i32,
    pub desired: i32,
    pub ready: i32,
    pub available: i32,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeploymentSummary {
    pub pods: PodInfo,
    #[serde(flatten)]
    pub images: Images,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub strategy: Option<String>,
}

impl ResourceKind for appsv1::Deployment {
    type Summary = DeploymentSummary;
    const SCALABLE: bool = true;
    const RESTARTABLE: bool = true;

    fn summary(&self) -> DeploymentSummary {
        let spec = self.spec.as_ref();
        let status = self.status.as_ref();
        DeploymentSummary {
            pods: PodInfo {
                current: status.and_then(|s| s.replicas).unwrap_or_default(),
                desired: spec.and_then(|s| s.replicas).unwrap_or(1),
                ready: status.and_then(|s| s.ready_replicas).unwrap_or_default(),
                available: status.and_then(|s| s.available_replicas).unwrap_or_default(),
            },
            images: Images::of_template(spec.map(|s| &s.template)),
            strategy: spec
                .and_then(|s| s.strategy.as_ref())
                .and_then(|s| s.type_.clone()),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatefulSetSummary {
    pub pods: PodInfo,
    #[serde(flatten)]
    pub images: Images,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub update_strategy: Option<String>,
}

impl ResourceKind for appsv1::StatefulSet {
    type Summary = StatefulSetSummary;
    const SCALABLE: bool = true;
    const RESTARTABLE: bool = true;

    fn summary(&self) -> StatefulSetSummary {
        let spec = self.spec.as_ref();
        let status = self.status.as_ref();
        StatefulSetSummary {
            pods: PodInfo {
                current: status.map(|s| s.replicas).unwrap_or_default(),
                desired: spec.and_then(|s| s.replicas).unwrap_or(1),
                ready: status.and_then(|s| s.ready_replicas).unwrap_or_default(),
                available: status.and_then(|s| s.available_replicas).unwrap_or_default(),
            },
            images: Images::of_template(spec.map(|s| &s.template)),
            update_strategy: spec
                .and_then(|s| s.update_strategy.as_ref())
                .and_then(|s| s.type_.clone()),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DaemonSetSummary {
    pub pods: PodInfo,
    #[serde(flatten)]
    pub images: Images,
}

impl ResourceKind for appsv1::DaemonSet {
    type Summary = DaemonSetSummary;
    const RESTARTABLE: bool = true;

    fn summary(&self) -> DaemonSetSummary {
        let status = self.status.as_ref();
        DaemonSetSummary {
            pods: PodInfo {
                current: status.map(|s| s.current_number_scheduled).unwrap_or_default(),
                desired: status.map(|s| s.desired_number_scheduled).unwrap_or_default(),
                ready: status.map(|s| s.number_ready).unwrap_or_default(),
                available: status.and_then(|s| s.number_available).unwrap_or_default(),
            },
            images: Images::of_template(self.spec.as_ref().map(|s| &s.template)),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Display, PartialEq, Eq)]
pub enum JobState {
    Running,
    Complete,
    Failed,
    Suspended,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobSummary {
    pub state: JobState,
    pub completions: i32,
    pub active: i32,
    pub succeeded: i32,
    pub failed: i32,
    #[serde(flatten)]
    pub images: Images,
}

fn job_state(job: &batchv1::Job) -> JobState {
    let has_condition = |type_: &str| {
        job.status
            .as_ref()
            .and_then(|s| s.conditions.as_ref())
            .is_some_and(|conds| conds.iter().any(|c| c.type_ == type_ && c.status == "True"))
    };

    if has_condition("Failed") {
        JobState::Failed
    } else if has_condition("Complete") {
        JobState::Complete
    } else if job.spec.as_ref().and_then(|s| s.suspend).unwrap_or(false) {
        JobState::Suspended
    } else {
        JobState::Running
    }
}

impl ResourceKind for batchv1::Job {
    type Summary = JobSummary;

    fn summary(&self) -> JobSummary {
        let status = self.status.as_ref();
        JobSummary {
            state: job_state(self),
            completions: self
                .spec
                .as_ref()
                .and_then(|s| s.completions)
                .unwrap_or(1),
            active: status.and_then(|s| s.active).unwrap_or_default(),
            succeeded: status.and_then(|s| s.succeeded).unwrap_or_default(),
            failed: status.and_then(|s| s.failed).unwrap_or_default(),
            images: Images::of_template(self.spec.as_ref().map(|s| &s.template)),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CronJobSummary {
    pub schedule: String,
    /// 可读的调度描述, 表达式无法解析时为空
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schedule_description: Option<String>,
    pub suspend: bool,
    pub active: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_schedule: Option<String>,
    #[serde(flatten)]
    pub images: Images,
}

impl ResourceKind for batchv1::CronJob {
    type Summary = CronJobSummary;

    fn summary(&self) -> CronJobSummary {
        let spec = self.spec.as_ref();
        let schedule = spec.map(|s| s.schedule.clone()).unwrap_or_default();
        let schedule_description = match cron::describe(&schedule) {
            Ok(text) => Some(text),
            Err(e) => {
                tracing::debug!("cannot describe schedule '{}': {}", schedule, e);
                None
            }
        };

        CronJobSummary {
            schedule_description,
            schedule,
            suspend: spec.and_then(|s| s.suspend).unwrap_or(false),
            active: self
                .status
                .as_ref()
                .and_then(|s| s.active.as_ref())
                .map(Vec::len)
                .unwrap_or_default(),
            last_schedule: self
                .status
                .as_ref()
                .and_then(|s| s.last_schedule_time.as_ref())
                .and_then(timestamp),
            images: Images::of(
                spec.and_then(|s| s.job_template.spec.as_ref())
                    .and_then(|s| s.template.spec.as_ref()),
            ),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PodSummary {
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub node_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pod_ip: Option<String>,
    pub restarts: i32,
    /// `ready/total`
    pub ready: String,
    #[serde(flatten)]
    pub images: Images,
}

/// Display status of a pod, following what `kubectl get pods` shows.
pub fn pod_status(pod: &corev1::Pod) -> String {
    if pod.metadata.deletion_timestamp.is_some() {
        return "Terminating".to_string();
    }

    let status = pod.status.as_ref();
    let container_reason = status
        .and_then(|s| s.container_statuses.as_ref())
        .and_then(|statuses| {
            statuses.iter().find_map(|cs| {
                let state = cs.state.as_ref()?;
                if let Some(waiting) = &state.waiting {
                    return waiting.reason.clone();
                }
                match &state.terminated {
                    Some(t) if t.exit_code != 0 || t.reason.is_some() => t
                        .reason
                        .clone()
                        .or_else(|| Some(format!("ExitCode:{}", t.exit_code))),
                    _ => None,
                }
            })
        });

    container_reason
        .or_else(|| status.and_then(|s| s.reason.clone()))
        .or_else(|| status.and_then(|s| s.phase.clone()))
        .unwrap_or_else(|| "Unknown".to_string())
}

impl ResourceKind for corev1::Pod {
    type Summary = PodSummary;

    fn summary(&self) -> PodSummary {
        let status = self.status.as_ref();
        let statuses = status
            .and_then(|s| s.container_statuses.as_deref())
            .unwrap_or_default();
        let total = self
            .spec
            .as_ref()
            .map(|s| s.containers.len())
            .unwrap_or(statuses.len());

        PodSummary {
            status: pod_status(self),
            node_name: self.spec.as_ref().and_then(|s| s.node_name.clone()),
            pod_ip: status.and_then(|s| s.pod_ip.clone()),
            restarts: statuses.iter().map(|cs| cs.restart_count).sum(),
            ready: format!("{}/{}", statuses.iter().filter(|cs| cs.ready).count(), total),
            images: Images::of(self.spec.as_ref()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::{create_test_deployment, create_test_pod};

    #[test]
    fn test_deployment_summary() {
        let summary = create_test_deployment("nginx", "default", 3, 2).summary();
        assert_eq!(
            summary.pods,
            PodInfo {
                current: 3,
                desired: 3,
                ready: 2,
                available: 2,
            }
        );
        assert_eq!(summary.images.container_images, vec!["nginx:1.25"]);
    }

    #[test]
    fn test_pod_status_prefers_container_reason() {
        let pod = create_test_pod(
            "web-0",
            serde_json::json!({
                "phase": "Running",
                "containerStatuses": [{
                    "name": "web", "image": "nginx", "imageID": "", "ready": false, "restartCount": 4,
                    "state": { "waiting": { "reason": "CrashLoopBackOff" } }
                }]
            }),
        );
        assert_eq!(pod_status(&pod), "CrashLoopBackOff");

        let summary = pod.summary();
        assert_eq!(summary.restarts, 4);
        assert_eq!(summary.ready, "0/1");
    }

    #[test]
    fn test_pod_status_falls_back_to_phase() {
        let pod = create_test_pod(
            "web-1",
            serde_json::json!({
                "phase": "Running",
                "containerStatuses": [{
                    "name": "web", "image": "nginx", "imageID": "", "ready": true, "restartCount": 0,
                    "state": { "running": {} }
                }]
            }),
        );
        assert_eq!(pod_status(&pod), "Running");
        assert_eq!(pod.summary().ready, "1/1");
    }

    #[test]
    fn test_job_state() {
        let mut job = batchv1::Job::default();
        assert_eq!(job_state(&job), JobState::Running);

        job.status = Some(
            serde_json::from_value(serde_json::json!({
                "conditions": [{ "type": "Complete", "status": "True" }],
                "succeeded": 1
            }))
            .unwrap(),
        );
        assert_eq!(job_state(&job), JobState::Complete);
        assert_eq!(job.summary().succeeded, 1);
    }

    #[test]
    fn test_cronjob_summary_describes_schedule() {
        let cronjob: batchv1::CronJob = serde_json::from_value(serde_json::json!({
            "apiVersion": "batch/v1",
            "kind": "CronJob",
            "metadata": { "name": "backup", "namespace": "default" },
            "spec": {
                "schedule": "*/15 * * * *",
                "jobTemplate": { "spec": { "template": { "spec": {
                    "containers": [{ "name": "backup", "image": "busybox" }]
                }}}}
            }
        }))
        .unwrap();

        let summary = cronjob.summary();
        assert_eq!(summary.schedule_description.as_deref(), Some("Every 15 minutes"));
        assert_eq!(summary.images.container_images, vec!["busybox"]);
        assert!(!summary.suspend);
    }
}
