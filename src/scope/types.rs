use crate::config::DEFAULT_INGRESS_DEPLOYMENT_NAME;
use k8s_openapi::api::core::v1::{Pod, Service};
use std::fmt;

/// Which pod an operation targets
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Selector {
    /// A pod with exactly this name
    ByName(String),
    /// Any pod whose primary container is named after the workload
    ByWorkload(String),
}

impl Selector {
    /// Select a pod by name
    pub fn name(name: impl Into<String>) -> Self {
        Self::ByName(name.into())
    }

    /// Select a pod belonging to a workload (deployment)
    pub fn workload(workload: impl Into<String>) -> Self {
        Self::ByWorkload(workload.into())
    }

    /// Select a pod of the default ingress controller deployment
    #[must_use]
    pub fn ingress_controller() -> Self {
        Self::workload(DEFAULT_INGRESS_DEPLOYMENT_NAME)
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ByName(name) => write!(f, "pod/{name}"),
            Self::ByWorkload(workload) => write!(f, "deployment/{workload}"),
        }
    }
}

/// Kinds of cluster resources the locator touches
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceKind {
    Pod,
    Deployment,
    Service,
    Ingress,
}

impl ResourceKind {
    /// Lowercase plural, as used in API paths
    #[must_use]
    pub fn plural(self) -> &'static str {
        match self {
            Self::Pod => "pods",
            Self::Deployment => "deployments",
            Self::Service => "services",
            Self::Ingress => "ingresses",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self {
            Self::Pod => "pod",
            Self::Deployment => "deployment",
            Self::Service => "service",
            Self::Ingress => "ingress",
        };
        f.write_str(kind)
    }
}

/// A resolved pod
///
/// Only produced by the resolver, from a pod that was present in the
/// listing at resolution time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PodRef {
    name: String,
    namespace: String,
    container: String,
}

impl PodRef {
    pub(crate) fn from_pod(pod: &Pod, namespace: &str) -> Self {
        Self {
            name: pod.metadata.name.clone().unwrap_or_default(),
            namespace: pod
                .metadata
                .namespace
                .clone()
                .unwrap_or_else(|| namespace.to_string()),
            container: primary_container(pod).unwrap_or_default().to_string(),
        }
    }

    /// Pod name
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Namespace the pod lives in
    #[must_use]
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Name of the first container in the pod spec, empty if there is none
    #[must_use]
    pub fn container(&self) -> &str {
        &self.container
    }
}

impl fmt::Display for PodRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)
    }
}

/// A resolved service
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceRef {
    pub name: String,
    pub namespace: String,
}

impl ServiceRef {
    pub(crate) fn from_service(service: &Service, namespace: &str) -> Self {
        Self {
            name: service.metadata.name.clone().unwrap_or_default(),
            namespace: service
                .metadata
                .namespace
                .clone()
                .unwrap_or_else(|| namespace.to_string()),
        }
    }
}

/// A command to run in a pod
///
/// The stream wiring is fixed: only stdout is attached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecRequest {
    pod: PodRef,
    command: Vec<String>,
}

impl ExecRequest {
    pub const STDIN: bool = false;
    pub const STDOUT: bool = true;
    pub const STDERR: bool = false;
    pub const TTY: bool = false;

    pub fn new(pod: PodRef, command: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            pod,
            command: command.into_iter().map(Into::into).collect(),
        }
    }

    #[must_use]
    pub fn pod(&self) -> &PodRef {
        &self.pod
    }

    #[must_use]
    pub fn command(&self) -> &[String] {
        &self.command
    }
}

/// A log read from a pod
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogRequest {
    pod: PodRef,
    follow: bool,
}

impl LogRequest {
    /// `follow = false` reads what is available now, `true` keeps streaming
    #[must_use]
    pub fn new(pod: PodRef, follow: bool) -> Self {
        Self { pod, follow }
    }

    #[must_use]
    pub fn pod(&self) -> &PodRef {
        &self.pod
    }

    #[must_use]
    pub fn follow(&self) -> bool {
        self.follow
    }
}

/// Name of the first container in the pod spec
pub(crate) fn primary_container(pod: &Pod) -> Option<&str> {
    pod.spec
        .as_ref()
        .and_then(|spec| spec.containers.first())
        .map(|container| container.name.as_str())
}
