use super::{LogRequest, PodRef, Scope, ScopeError, Selector};
use crate::client::ClusterApi;
use crate::logstream::LogStream;
use tracing::debug;

impl<C: ClusterApi> Scope<C> {
    /// Open the logs of the pod a selector resolves to
    ///
    /// With `follow = false` the stream ends after the output the pod has
    /// produced so far. With `follow = true` it stays open, like
    /// `kubectl logs -f`, until the pod terminates or the stream is dropped.
    ///
    /// # Example
    ///
    /// ```ignore
    /// use futures::TryStreamExt;
    ///
    /// let mut stream = scope.logs(&Selector::ingress_controller(), true).await?;
    /// while let Some(chunk) = stream.try_next().await? {
    ///     print!("{}", String::from_utf8_lossy(&chunk));
    /// }
    /// ```
    pub async fn logs(&self, selector: &Selector, follow: bool) -> Result<LogStream, ScopeError> {
        let pod = self.resolve(selector).await?;
        self.logs_pod(&pod, follow).await
    }

    /// Open the logs of an already resolved pod
    pub async fn logs_pod(&self, pod: &PodRef, follow: bool) -> Result<LogStream, ScopeError> {
        debug!(
            namespace = %pod.namespace(),
            pod = %pod.name(),
            follow,
            "Opening log stream"
        );

        self.api.logs(&LogRequest::new(pod.clone(), follow)).await
    }
}
