use super::types::primary_container;
use super::{PodRef, ResourceKind, Scope, ScopeError, Selector, ServiceRef};
use crate::client::ClusterApi;
use k8s_openapi::api::core::v1::{Pod, Service};
use k8s_openapi::api::networking::v1::Ingress;
use tracing::{debug, warn};

/// First pod with exactly this name
fn pod_named<'a>(pods: &'a [Pod], name: &str) -> Option<&'a Pod> {
    pods.iter()
        .find(|pod| pod.metadata.name.as_deref() == Some(name))
}

/// Pods whose primary container is named after the workload, in listing order
fn workload_members<'a>(pods: &'a [Pod], workload: &str) -> Vec<&'a Pod> {
    pods.iter()
        .filter(|pod| primary_container(pod) == Some(workload))
        .collect()
}

fn service_named<'a>(services: &'a [Service], name: &str) -> Option<&'a Service> {
    services
        .iter()
        .find(|svc| svc.metadata.name.as_deref() == Some(name))
}

impl<C: ClusterApi> Scope<C> {
    /// List pods in the scope's namespace
    pub async fn list_pods(&self) -> Result<Vec<Pod>, ScopeError> {
        self.api.list_pods(&self.namespace).await
    }

    /// List services in the scope's namespace
    pub async fn list_services(&self) -> Result<Vec<Service>, ScopeError> {
        self.api.list_services(&self.namespace).await
    }

    /// List ingress definitions
    ///
    /// Takes its own namespace rather than the scope's so callers can look
    /// across namespaces; an empty string lists all of them.
    pub async fn list_ingresses(&self, namespace: &str) -> Result<Vec<Ingress>, ScopeError> {
        self.api.list_ingresses(namespace).await
    }

    /// Resolve a selector to exactly one pod
    pub async fn resolve(&self, selector: &Selector) -> Result<PodRef, ScopeError> {
        match selector {
            Selector::ByName(name) => self.resolve_by_name(name).await,
            Selector::ByWorkload(workload) => self.resolve_by_workload(workload).await,
        }
    }

    /// Find the pod with the given name
    pub async fn resolve_by_name(&self, name: &str) -> Result<PodRef, ScopeError> {
        let pods = self.list_pods().await?;

        let pod = pod_named(&pods, name)
            .ok_or_else(|| ScopeError::not_found(ResourceKind::Pod, name, &self.namespace))?;

        debug!(namespace = %self.namespace, pod = %name, "Resolved pod by name");

        Ok(PodRef::from_pod(pod, &self.namespace))
    }

    /// Find a pod belonging to a workload
    ///
    /// A pod belongs to the workload when its first container is named after
    /// it. With several replicas the first pod in listing order wins; the API
    /// server does not guarantee that order, so repeated calls may pick
    /// different replicas.
    pub async fn resolve_by_workload(&self, workload: &str) -> Result<PodRef, ScopeError> {
        let pods = self.list_pods().await?;
        let members = workload_members(&pods, workload);

        let Some(first) = members.first() else {
            return Err(ScopeError::not_found(
                ResourceKind::Deployment,
                workload,
                &self.namespace,
            ));
        };

        let pod = PodRef::from_pod(first, &self.namespace);

        if members.len() > 1 {
            warn!(
                namespace = %self.namespace,
                workload = %workload,
                candidates = members.len(),
                pod = %pod.name(),
                "Multiple pods match workload, using the first listed"
            );
        } else {
            debug!(
                namespace = %self.namespace,
                workload = %workload,
                pod = %pod.name(),
                "Resolved pod by workload"
            );
        }

        Ok(pod)
    }

    /// All pods belonging to a workload, in listing order
    ///
    /// An empty result is not an error here.
    pub async fn workload_pods(&self, workload: &str) -> Result<Vec<PodRef>, ScopeError> {
        let pods = self.list_pods().await?;

        Ok(workload_members(&pods, workload)
            .into_iter()
            .map(|pod| PodRef::from_pod(pod, &self.namespace))
            .collect())
    }

    /// Find a service by exact name
    ///
    /// Pass `prefetched` to look the name up in an earlier listing instead
    /// of querying again; handy when resolving many names from one snapshot.
    pub async fn find_service(
        &self,
        name: &str,
        prefetched: Option<&[Service]>,
    ) -> Result<Service, ScopeError> {
        let fetched;
        let services: &[Service] = match prefetched {
            Some(services) => services,
            None => {
                fetched = self.list_services().await?;
                &fetched
            }
        };

        let service = service_named(services, name)
            .ok_or_else(|| ScopeError::not_found(ResourceKind::Service, name, &self.namespace))?;

        debug!(namespace = %self.namespace, service = %name, "Resolved service");

        Ok(service.clone())
    }

    /// Like [`find_service`](Self::find_service), returning only name and namespace
    pub async fn resolve_service(
        &self,
        name: &str,
        prefetched: Option<&[Service]>,
    ) -> Result<ServiceRef, ScopeError> {
        let service = self.find_service(name, prefetched).await?;
        Ok(ServiceRef::from_service(&service, &self.namespace))
    }
}
