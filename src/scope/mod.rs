//! Namespace-bound entry point for locating pods and talking to them
//!
//! A `Scope` pairs a [`ClusterApi`] handle with the namespace every query
//! runs in. Each operation re-lists the cluster; nothing is cached between
//! calls, and no failure is retried.
//!
//! # Errors
//!
//! All fallible methods in this module return `ScopeError`:
//! - `NotFound` when a selector matched nothing
//! - `QueryFailed` when a list call to the API server failed
//! - `StreamFailed` when an exec or log connection failed
//! - `InvalidSelector` when a reference could not be parsed
//! - `ClientError` when the Kubernetes client could not be built

#![allow(clippy::missing_errors_doc)]

mod exec;
mod logs;
mod parsing;
mod resolve;
pub mod types;

pub use parsing::parse_selector;
pub use types::{ExecRequest, LogRequest, PodRef, ResourceKind, Selector, ServiceRef};

use crate::client::{self, ClusterApi, KubeApi};
use crate::config::ClusterConfig;
use std::fmt;
use tracing::info;

/// Cluster handle bound to a namespace
///
/// # Example
///
/// ```ignore
/// use podreach::{ClusterConfig, Scope, Selector};
///
/// let scope = Scope::connect(&ClusterConfig::new().namespace("ingress-nginx")).await?;
/// let conf = scope
///     .exec(&Selector::ingress_controller(), &["cat", "/etc/nginx/nginx.conf"])
///     .await?;
/// ```
pub struct Scope<C = KubeApi> {
    api: C,
    namespace: String,
}

/// Errors from Scope operations
#[derive(Debug, thiserror::Error)]
pub enum ScopeError {
    #[error("Failed to create Kubernetes client: {0}")]
    ClientError(String),

    #[error("{}", not_found_message(.kind, .name, .namespace))]
    NotFound {
        kind: ResourceKind,
        name: String,
        namespace: String,
    },

    #[error("Failed to list {} in namespace {namespace}: {message}", .kind.plural())]
    QueryFailed {
        kind: ResourceKind,
        namespace: String,
        message: String,
    },

    #[error("Failed to {operation} pod {pod} in namespace {namespace}: {message}")]
    StreamFailed {
        operation: StreamOperation,
        pod: String,
        namespace: String,
        message: String,
        /// Stdout received before the failure
        captured: String,
    },

    #[error("Invalid selector: {0}")]
    InvalidSelector(String),
}

impl ScopeError {
    /// Stdout an exec delivered before failing; empty for other errors
    #[must_use]
    pub fn captured_stdout(&self) -> &str {
        match self {
            Self::StreamFailed { captured, .. } => captured,
            _ => "",
        }
    }

    pub(crate) fn not_found(kind: ResourceKind, name: &str, namespace: &str) -> Self {
        Self::NotFound {
            kind,
            name: name.to_string(),
            namespace: namespace.to_string(),
        }
    }
}

/// Which subresource connection failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamOperation {
    Exec,
    Logs,
}

impl fmt::Display for StreamOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exec => f.write_str("exec in"),
            Self::Logs => f.write_str("stream logs from"),
        }
    }
}

fn not_found_message(kind: &ResourceKind, name: &str, namespace: &str) -> String {
    match kind {
        ResourceKind::Pod => format!("Pod {name} not found in namespace {namespace}"),
        ResourceKind::Deployment => {
            format!("No pods for deployment {name} found in namespace {namespace}")
        }
        ResourceKind::Service => format!("Could not find service {name} in namespace {namespace}"),
        ResourceKind::Ingress => format!("Ingress {name} not found in namespace {namespace}"),
    }
}

impl<C: ClusterApi> Scope<C> {
    /// Bind an existing client to a namespace
    pub fn new(api: C, namespace: impl Into<String>) -> Self {
        Self {
            api,
            namespace: namespace.into(),
        }
    }

    /// Namespace every query runs in
    #[must_use]
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// The underlying client
    #[must_use]
    pub fn api(&self) -> &C {
        &self.api
    }
}

impl Scope<KubeApi> {
    /// Connect using kubeconfig settings from `config`
    ///
    /// The namespace comes from `config`, falling back to the namespace of
    /// the selected kubeconfig context.
    pub async fn connect(config: &ClusterConfig) -> Result<Self, ScopeError> {
        let (api, default_namespace) = client::connect(config).await?;
        let namespace = config.namespace.clone().unwrap_or(default_namespace);

        info!(namespace = %namespace, "Connected to cluster");

        Ok(Self::new(api, namespace))
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use k8s_openapi::api::core::v1::{Container, Pod, PodSpec, Service};
    use kube::api::ObjectMeta;

    pub(crate) const NAMESPACE: &str = "ingress-nginx";

    pub(crate) fn pod(name: &str, container: &str) -> Pod {
        Pod {
            metadata: ObjectMeta {
                name: Some(name.to_string()),
                namespace: Some(NAMESPACE.to_string()),
                ..Default::default()
            },
            spec: Some(PodSpec {
                containers: vec![Container {
                    name: container.to_string(),
                    ..Default::default()
                }],
                ..Default::default()
            }),
            ..Default::default()
        }
    }

    pub(crate) fn service(name: &str) -> Service {
        Service {
            metadata: ObjectMeta {
                name: Some(name.to_string()),
                namespace: Some(NAMESPACE.to_string()),
                ..Default::default()
            },
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::MockClusterApi;

    #[test]
    fn test_not_found_messages() {
        let err = ScopeError::not_found(ResourceKind::Pod, "x", "default");
        assert_eq!(err.to_string(), "Pod x not found in namespace default");

        let err = ScopeError::not_found(ResourceKind::Deployment, "backend", "apps");
        assert_eq!(
            err.to_string(),
            "No pods for deployment backend found in namespace apps"
        );

        let err = ScopeError::not_found(ResourceKind::Service, "ingress-nginx", "kube-system");
        assert_eq!(
            err.to_string(),
            "Could not find service ingress-nginx in namespace kube-system"
        );
    }

    #[test]
    fn test_query_failed_keeps_transport_message() {
        let err = ScopeError::QueryFailed {
            kind: ResourceKind::Pod,
            namespace: "default".to_string(),
            message: "pods is forbidden: User \"dev\" cannot list resource".to_string(),
        };

        let msg = err.to_string();
        assert!(msg.starts_with("Failed to list pods in namespace default"));
        assert!(msg.contains("pods is forbidden"));
    }

    #[test]
    fn test_captured_stdout() {
        let err = ScopeError::StreamFailed {
            operation: StreamOperation::Exec,
            pod: "web-0".to_string(),
            namespace: "default".to_string(),
            message: "command terminated with non-zero exit code".to_string(),
            captured: "partial".to_string(),
        };
        assert_eq!(err.captured_stdout(), "partial");
        assert!(err.to_string().contains("Failed to exec in pod web-0"));

        let err = ScopeError::InvalidSelector("bad".to_string());
        assert_eq!(err.captured_stdout(), "");
    }

    #[test]
    fn test_scope_new_keeps_namespace() {
        let scope = Scope::new(MockClusterApi::new(), "team-a");
        assert_eq!(scope.namespace(), "team-a");
    }

    // ============================================================
    // Integration tests (require cluster)
    // ============================================================

    #[tokio::test]
    #[ignore] // Requires real cluster
    async fn test_connect_uses_explicit_namespace() {
        let scope = Scope::connect(&ClusterConfig::new().namespace("kube-system"))
            .await
            .expect("Should connect");

        assert_eq!(scope.namespace(), "kube-system");
    }
}
