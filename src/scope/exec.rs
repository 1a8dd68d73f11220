use super::{ExecRequest, PodRef, Scope, ScopeError, Selector};
use crate::client::ClusterApi;
use tracing::debug;

impl<C: ClusterApi> Scope<C> {
    /// Execute a command in the pod a selector resolves to
    ///
    /// Runs the command in the pod's first container and returns its stdout.
    /// Only stdout is attached; stderr is discarded and no stdin is sent.
    /// The whole output is held in memory, so this suits commands with
    /// bounded output such as reading a config file.
    ///
    /// A non-zero exit status is reported as `ScopeError::StreamFailed`;
    /// whatever stdout arrived before the failure is available from
    /// [`ScopeError::captured_stdout`].
    ///
    /// # Example
    ///
    /// ```ignore
    /// let conf = scope
    ///     .exec(&Selector::ingress_controller(), &["cat", "/etc/nginx/nginx.conf"])
    ///     .await?;
    /// assert!(conf.contains("http {"));
    /// ```
    pub async fn exec(&self, selector: &Selector, command: &[&str]) -> Result<String, ScopeError> {
        let pod = self.resolve(selector).await?;
        self.exec_pod(&pod, command).await
    }

    /// Execute a command in an already resolved pod
    ///
    /// The command is passed through as is, including an empty one.
    pub async fn exec_pod(&self, pod: &PodRef, command: &[&str]) -> Result<String, ScopeError> {
        debug!(
            namespace = %pod.namespace(),
            pod = %pod.name(),
            command = ?command,
            "Executing command in pod"
        );

        let request = ExecRequest::new(pod.clone(), command.iter().copied());
        self.api.exec(&request).await
    }
}
