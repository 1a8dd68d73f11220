//! Connection configuration for podreach
//!
//! Build it programmatically - no config files needed. Credentials are
//! always taken from the kubeconfig that the `kube` client resolves.
//!
//! # Example
//!
//! ```
//! use podreach::config::ClusterConfig;
//!
//! let config = ClusterConfig::new()
//!     .kubeconfig("~/.kube/staging")
//!     .context("staging")
//!     .namespace("ingress-nginx");
//! ```

/// Container name of the ingress controller deployment
pub const DEFAULT_INGRESS_DEPLOYMENT_NAME: &str = "nginx-ingress-controller";

/// Service fronting the ingress controller
pub const DEFAULT_INGRESS_SERVICE_NAME: &str = "ingress-nginx";

/// Cluster connection configuration
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClusterConfig {
    /// Kubeconfig path (defaults to `KUBECONFIG` / `~/.kube/config`)
    ///
    /// A leading `~/` is expanded to the home directory on connect.
    pub kubeconfig: Option<String>,

    /// Kubeconfig context (defaults to the current context)
    pub context: Option<String>,

    /// Namespace for operations (defaults to the context's namespace)
    pub namespace: Option<String>,
}

impl ClusterConfig {
    /// Create a config that uses the ambient kubeconfig
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set kubeconfig path
    #[must_use]
    pub fn kubeconfig(mut self, path: impl Into<String>) -> Self {
        self.kubeconfig = Some(path.into());
        self
    }

    /// Set kubeconfig context
    #[must_use]
    pub fn context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }

    /// Set namespace
    #[must_use]
    pub fn namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cluster_config_defaults() {
        let config = ClusterConfig::new();

        assert_eq!(config.kubeconfig, None);
        assert_eq!(config.context, None);
        assert_eq!(config.namespace, None);
    }

    #[test]
    fn test_cluster_config_builder() {
        let config = ClusterConfig::new()
            .kubeconfig("~/.kube/prod")
            .context("prod-context")
            .namespace("ingress-nginx");

        assert_eq!(config.kubeconfig, Some("~/.kube/prod".to_string()));
        assert_eq!(config.context, Some("prod-context".to_string()));
        assert_eq!(config.namespace, Some("ingress-nginx".to_string()));
    }
}
