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
    Extension, Router, middleware,
    routing::{any, get, post, put},
};
use k8s_openapi::NamespaceResourceScope;
use k8s_openapi::api::{
    apps::v1 as appsv1, batch::v1 as batchv1, core::v1 as corev1, networking::v1 as networkingv1,
};
use kube::Resource;

use crate::console::{
    extract::Scope,
    handlers::{
        aggregated, argocd, auth, gpu, monitoring, overview, porch, raw, resources, terminal, users,
        version,
    },
    kinds::ResourceKind,
    middleware::auth::{require_admin, require_cluster_access, require_mgmt_access},
    state::AppState,
};
use crate::types::v1alpha1::cluster::Cluster;
use crate::types::v1alpha1::policy::{
    ClusterOverridePolicy, ClusterPropagationPolicy, OverridePolicy, PropagationPolicy,
};

/// 路由中的资源名, 如 `deployment`
fn kind_path<K: ResourceKind>() -> String {
    K::kind(&()).to_lowercase()
}

/// 按资源类型注册 typed 路由
trait KindRoutes {
    /// `/{kind}`, `/{kind}/{namespace}`, `/{kind}/{namespace}/{name}`
    fn namespaced<K>(self) -> Self
    where
        K: ResourceKind + Resource<Scope = NamespaceResourceScope>;

    /// `/{kind}`, `/{kind}/{name}`
    fn cluster_scoped<K: ResourceKind>(self) -> Self;

    /// 命名空间级资源加上 scale, restart, event
    fn workload<K>(self) -> Self
    where
        K: ResourceKind + Resource<Scope = NamespaceResourceScope>;

    fn aggregated_namespaced<K>(self) -> Self
    where
        K: ResourceKind + Resource<Scope = NamespaceResourceScope>;

    fn aggregated_cluster_scoped<K: ResourceKind>(self) -> Self;
}

impl KindRoutes for Router<AppState> {
    fn namespaced<K>(self) -> Self
    where
        K: ResourceKind + Resource<Scope = NamespaceResourceScope>,
    {
        let kind = kind_path::<K>();
        self.route(&format!("/{}", kind), get(resources::list_namespaced::<K>))
            .route(
                &format!("/{}/{{namespace}}", kind),
                get(resources::list_namespaced::<K>),
            )
            .route(
                &format!("/{}/{{namespace}}/{{name}}", kind),
                get(resources::get_namespaced::<K>).delete(resources::delete_namespaced::<K>),
            )
    }

    fn cluster_scoped<K: ResourceKind>(self) -> Self {
        let kind = kind_path::<K>();
        self.route(&format!("/{}", kind), get(resources::list_cluster::<K>))
            .route(
                &format!("/{}/{{name}}", kind),
                get(resources::get_cluster::<K>).delete(resources::delete_cluster::<K>),
            )
    }

    fn workload<K>(self) -> Self
    where
        K: ResourceKind + Resource<Scope = NamespaceResourceScope>,
    {
        let kind = kind_path::<K>();
        self.namespaced::<K>()
            .route(
                &format!("/{}/{{namespace}}/{{name}}/scale", kind),
                put(resources::scale::<K>),
            )
            .route(
                &format!("/{}/{{namespace}}/{{name}}/restart", kind),
                put(resources::restart::<K>),
            )
            .route(
                &format!("/{}/{{namespace}}/{{name}}/event", kind),
                get(resources::object_events::<K>),
            )
    }

    fn aggregated_namespaced<K>(self) -> Self
    where
        K: ResourceKind + Resource<Scope = NamespaceResourceScope>,
    {
        let kind = kind_path::<K>();
        self.route(&format!("/{}", kind), get(aggregated::list_namespaced::<K>))
            .route(
                &format!("/{}/{{namespace}}", kind),
                get(aggregated::list_namespaced::<K>),
            )
    }

    fn aggregated_cluster_scoped<K: ResourceKind>(self) -> Self {
        self.route(
            &format!("/{}", kind_path::<K>()),
            get(aggregated::list_cluster::<K>),
        )
    }
}

/// 各范围共有的 Kubernetes 原生资源
fn common_kinds() -> Router<AppState> {
    Router::new()
        .cluster_scoped::<corev1::Namespace>()
        .workload::<appsv1::Deployment>()
        .workload::<appsv1::StatefulSet>()
        .workload::<appsv1::DaemonSet>()
        .namespaced::<batchv1::Job>()
        .namespaced::<batchv1::CronJob>()
        .namespaced::<corev1::Service>()
        .namespaced::<networkingv1::Ingress>()
        .namespaced::<corev1::ConfigMap>()
        .namespaced::<corev1::Secret>()
        .namespaced::<corev1::PersistentVolumeClaim>()
        .namespaced::<corev1::Event>()
}

/// 自定义资源, 通过 API discovery 解析类型
fn raw_routes() -> Router<AppState> {
    Router::new()
        .route("/_raw/apply", post(raw::apply))
        .route("/_raw/{kind}", get(raw::list))
        .route("/_raw/{kind}/namespace/{namespace}", get(raw::list))
        .route(
            "/_raw/{kind}/namespace/{namespace}/name/{name}",
            get(raw::get).put(raw::update).delete(raw::delete),
        )
        .route(
            "/_raw/{kind}/name/{name}",
            get(raw::get).put(raw::update).delete(raw::delete),
        )
}

/// karmada-apiserver: 资源模板, 策略, 成员集群
pub fn karmada_routes(state: &AppState) -> Router<AppState> {
    common_kinds()
        .cluster_scoped::<Cluster>()
        .namespaced::<PropagationPolicy>()
        .cluster_scoped::<ClusterPropagationPolicy>()
        .namespaced::<OverridePolicy>()
        .cluster_scoped::<ClusterOverridePolicy>()
        .merge(raw_routes())
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            require_cluster_access,
        ))
        .layer(Extension(Scope::Karmada))
}

/// 管理集群与成员集群: 原生资源加 Pod 和 Node
fn cluster_routes(scope: Scope) -> Router<AppState> {
    common_kinds()
        .namespaced::<corev1::Pod>()
        .route("/pod/{namespace}/{name}/logs", get(resources::pod_logs))
        .route(
            "/pod/{namespace}/{name}/shell/{container}",
            get(terminal::shell),
        )
        .cluster_scoped::<corev1::Node>()
        .merge(raw_routes())
        .layer(Extension(scope))
}

/// `/api/v1/mgmt`, 无 Kubernetes token 的会话需要管理员
pub fn mgmt_routes(state: &AppState) -> Router<AppState> {
    cluster_routes(Scope::Mgmt).route_layer(middleware::from_fn_with_state(
        state.clone(),
        require_mgmt_access,
    ))
}

/// `/api/v1/member/{clustername}`, 无 Kubernetes token 的普通用户只读
pub fn member_routes(state: &AppState) -> Router<AppState> {
    cluster_routes(Scope::Member).route_layer(middleware::from_fn_with_state(
        state.clone(),
        require_cluster_access,
    ))
}

/// `/api/v1/aggregated`, 跨所有就绪成员集群
pub fn aggregated_routes(state: &AppState) -> Router<AppState> {
    Router::new()
        .aggregated_cluster_scoped::<corev1::Namespace>()
        .aggregated_namespaced::<appsv1::Deployment>()
        .aggregated_namespaced::<appsv1::StatefulSet>()
        .aggregated_namespaced::<appsv1::DaemonSet>()
        .aggregated_namespaced::<batchv1::Job>()
        .aggregated_namespaced::<batchv1::CronJob>()
        .aggregated_namespaced::<corev1::Pod>()
        .aggregated_namespaced::<corev1::Service>()
        .aggregated_namespaced::<networkingv1::Ingress>()
        .aggregated_namespaced::<corev1::ConfigMap>()
        .aggregated_namespaced::<corev1::Secret>()
        .aggregated_namespaced::<corev1::PersistentVolumeClaim>()
        .aggregated_namespaced::<corev1::Event>()
        .aggregated_cluster_scoped::<corev1::Node>()
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            require_cluster_access,
        ))
}

/// 认证路由
pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/login", post(auth::login))
        .route("/login/password", post(auth::login_password))
        .route("/logout", post(auth::logout))
        .route("/me", get(auth::me))
        .route("/me/password", put(auth::change_password))
}

/// 用户管理路由, 仅管理员
pub fn user_routes(state: &AppState) -> Router<AppState> {
    Router::new()
        .route("/users", get(users::list_users).post(users::create_user))
        .route("/users/{username}", axum::routing::delete(users::delete_user))
        .route("/users/{username}/password", put(users::set_password))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_admin))
}

/// 概览, GPU, 监控等面板
pub fn widget_routes() -> Router<AppState> {
    Router::new()
        .route("/overview", get(overview::overview))
        .route("/gpu", get(gpu::inventory))
        .route("/monitoring/dashboards", get(monitoring::dashboards))
        .route("/version", get(version::version))
}

/// Porch 与 ArgoCD 代理
pub fn proxy_routes() -> Router<AppState> {
    Router::new()
        .route("/porch/{*path}", any(porch::proxy))
        .route("/argocd/{*path}", any(argocd::proxy))
}
