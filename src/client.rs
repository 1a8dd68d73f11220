//! Kubernetes API access
//!
//! [`ClusterApi`] is the capability set the locator needs from the control
//! plane: list pods, services and ingresses, and open `exec` and `log`
//! subresource connections. [`KubeApi`] implements it over `kube::Client`;
//! tests substitute a mock.

use crate::config::ClusterConfig;
use crate::logstream::{self, LogStream};
use crate::scope::{ExecRequest, LogRequest, PodRef, ResourceKind, ScopeError, StreamOperation};
use async_trait::async_trait;
use k8s_openapi::api::core::v1::{Pod, Service};
use k8s_openapi::api::networking::v1::Ingress;
use kube::api::{Api, AttachParams, ListParams, LogParams};
use kube::config::{KubeConfigOptions, Kubeconfig};
use kube::{Client, Config};
use serde::Serialize;
use std::path::PathBuf;
use tokio::io::AsyncReadExt;
use tokio::sync::oneshot;
use tracing::{debug, info};

#[cfg(test)]
use mockall::automock;

/// Operations against the Kubernetes control plane
///
/// Every list method issues exactly one list request and returns the first
/// page as the server sent it. Errors are never retried.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait ClusterApi: Send + Sync {
    /// List pods in a namespace
    async fn list_pods(&self, namespace: &str) -> Result<Vec<Pod>, ScopeError>;

    /// List services in a namespace
    async fn list_services(&self, namespace: &str) -> Result<Vec<Service>, ScopeError>;

    /// List ingresses in a namespace, or in all namespaces when empty
    async fn list_ingresses(&self, namespace: &str) -> Result<Vec<Ingress>, ScopeError>;

    /// Run a command and collect its stdout
    ///
    /// Blocks until the remote stream closes. On failure the stdout read
    /// so far is carried in `ScopeError::StreamFailed::captured`.
    async fn exec(&self, request: &ExecRequest) -> Result<String, ScopeError>;

    /// Open a log stream
    ///
    /// Returns as soon as the connection is established.
    async fn logs(&self, request: &LogRequest) -> Result<LogStream, ScopeError>;
}

/// `ClusterApi` backed by a `kube::Client`
#[derive(Clone)]
pub struct KubeApi {
    client: Client,
}

impl KubeApi {
    #[must_use]
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Get the raw kube client
    #[must_use]
    pub fn client(&self) -> &Client {
        &self.client
    }
}

impl From<Client> for KubeApi {
    fn from(client: Client) -> Self {
        Self::new(client)
    }
}

/// Build a client from `config`
///
/// Returns the client and the default namespace of the selected context.
/// A kubeconfig path starting with `~/` is taken relative to the home
/// directory.
pub async fn connect(config: &ClusterConfig) -> Result<(KubeApi, String), ScopeError> {
    let options = KubeConfigOptions {
        context: config.context.clone(),
        ..Default::default()
    };

    let kube_config = match (&config.kubeconfig, &config.context) {
        (Some(path), _) => {
            let kubeconfig = Kubeconfig::read_from(expand_home(path, dirs::home_dir()))
                .map_err(|e| ScopeError::ClientError(format!("{path}: {e}")))?;
            Config::from_custom_kubeconfig(kubeconfig, &options)
                .await
                .map_err(|e| ScopeError::ClientError(e.to_string()))?
        }
        (None, Some(_)) => Config::from_kubeconfig(&options)
            .await
            .map_err(|e| ScopeError::ClientError(e.to_string()))?,
        (None, None) => Config::infer()
            .await
            .map_err(|e| ScopeError::ClientError(e.to_string()))?,
    };

    let namespace = kube_config.default_namespace.clone();
    debug!(
        cluster_url = %kube_config.cluster_url,
        namespace = %namespace,
        "Loaded kubeconfig"
    );

    let client =
        Client::try_from(kube_config).map_err(|e| ScopeError::ClientError(e.to_string()))?;

    Ok((KubeApi::new(client), namespace))
}

/// Resolve a leading `~` against `home`
///
/// Paths without one, and every path when no home directory is known, are
/// returned unchanged.
fn expand_home(path: &str, home: Option<PathBuf>) -> PathBuf {
    let rest = if path == "~" {
        Some("")
    } else {
        path.strip_prefix("~/")
    };

    match (rest, home) {
        (Some(rest), Some(home)) => home.join(rest),
        _ => PathBuf::from(path),
    }
}

fn query_failed(kind: ResourceKind, namespace: &str, err: &kube::Error) -> ScopeError {
    ScopeError::QueryFailed {
        kind,
        namespace: namespace.to_string(),
        message: err.to_string(),
    }
}

fn stream_failed(
    operation: StreamOperation,
    pod: &PodRef,
    message: String,
    captured: String,
) -> ScopeError {
    ScopeError::StreamFailed {
        operation,
        pod: pod.name().to_string(),
        namespace: pod.namespace().to_string(),
        message,
        captured,
    }
}

/// Message of a remote command status that reports failure
///
/// The exec status channel carries a `metav1.Status`; a non-zero exit code
/// arrives as `status: "Failure"`.
fn failure_message<S: Serialize>(status: &S) -> Option<String> {
    let value = serde_json::to_value(status).ok()?;
    if value.get("status").and_then(serde_json::Value::as_str) != Some("Failure") {
        return None;
    }

    let message = value
        .get("message")
        .and_then(serde_json::Value::as_str)
        .filter(|m| !m.is_empty())
        .unwrap_or("command terminated with non-zero exit code");
    Some(message.to_string())
}

/// Fold the pieces of a finished exec session into its result
///
/// A local read error wins over a broken session, which wins over a
/// failure reported by the remote command. Stdout read so far is kept in
/// every error.
fn exec_outcome(
    pod: &PodRef,
    stdout: &[u8],
    read_result: std::io::Result<()>,
    joined: Result<(), String>,
    remote_failure: Option<String>,
) -> Result<String, ScopeError> {
    let captured = String::from_utf8_lossy(stdout).into_owned();

    let failure = match (read_result, joined, remote_failure) {
        (Err(e), _, _) => e.to_string(),
        (Ok(()), Err(message), _) | (Ok(()), Ok(()), Some(message)) => message,
        (Ok(()), Ok(()), None) => return Ok(captured),
    };

    Err(stream_failed(StreamOperation::Exec, pod, failure, captured))
}

fn attach_params(pod: &PodRef) -> AttachParams {
    let params = AttachParams {
        stdin: ExecRequest::STDIN,
        stdout: ExecRequest::STDOUT,
        stderr: ExecRequest::STDERR,
        tty: ExecRequest::TTY,
        ..Default::default()
    };

    if pod.container().is_empty() {
        params
    } else {
        params.container(pod.container())
    }
}

fn log_params(request: &LogRequest) -> LogParams {
    let container = request.pod().container();
    LogParams {
        follow: request.follow(),
        container: (!container.is_empty()).then(|| container.to_string()),
        ..Default::default()
    }
}

#[async_trait]
impl ClusterApi for KubeApi {
    async fn list_pods(&self, namespace: &str) -> Result<Vec<Pod>, ScopeError> {
        let pods: Api<Pod> = Api::namespaced(self.client.clone(), namespace);
        let list = pods
            .list(&ListParams::default())
            .await
            .map_err(|e| query_failed(ResourceKind::Pod, namespace, &e))?;

        debug!(namespace = %namespace, count = list.items.len(), "Listed pods");

        Ok(list.items)
    }

    async fn list_services(&self, namespace: &str) -> Result<Vec<Service>, ScopeError> {
        let services: Api<Service> = Api::namespaced(self.client.clone(), namespace);
        let list = services
            .list(&ListParams::default())
            .await
            .map_err(|e| query_failed(ResourceKind::Service, namespace, &e))?;

        debug!(namespace = %namespace, count = list.items.len(), "Listed services");

        Ok(list.items)
    }

    async fn list_ingresses(&self, namespace: &str) -> Result<Vec<Ingress>, ScopeError> {
        let ingresses: Api<Ingress> = if namespace.is_empty() {
            Api::all(self.client.clone())
        } else {
            Api::namespaced(self.client.clone(), namespace)
        };
        let list = ingresses
            .list(&ListParams::default())
            .await
            .map_err(|e| query_failed(ResourceKind::Ingress, namespace, &e))?;

        debug!(namespace = %namespace, count = list.items.len(), "Listed ingresses");

        Ok(list.items)
    }

    async fn exec(&self, request: &ExecRequest) -> Result<String, ScopeError> {
        let pod = request.pod();
        let pods: Api<Pod> = Api::namespaced(self.client.clone(), pod.namespace());

        let mut attached = pods
            .exec(pod.name(), request.command().to_vec(), &attach_params(pod))
            .await
            .map_err(|e| stream_failed(StreamOperation::Exec, pod, e.to_string(), String::new()))?;

        let status = attached.take_status();

        let mut stdout_bytes = Vec::new();
        let read_result = match attached.stdout() {
            Some(mut stdout) => stdout.read_to_end(&mut stdout_bytes).await.map(|_| ()),
            None => Ok(()),
        };

        let remote_failure = match status {
            Some(status) => status.await.as_ref().and_then(failure_message),
            None => None,
        };
        let joined = attached.join().await.map_err(|e| e.to_string());

        let captured = exec_outcome(pod, &stdout_bytes, read_result, joined, remote_failure)?;

        info!(
            namespace = %pod.namespace(),
            pod = %pod.name(),
            command = ?request.command(),
            bytes = captured.len(),
            "Executed command in pod"
        );

        Ok(captured)
    }

    async fn logs(&self, request: &LogRequest) -> Result<LogStream, ScopeError> {
        let pod = request.pod();
        let pods: Api<Pod> = Api::namespaced(self.client.clone(), pod.namespace());
        let params = log_params(request);
        let pod_name = pod.name().to_string();

        let (opened_tx, opened_rx) = oneshot::channel::<Result<(), String>>();
        let (chunk_tx, stream) = LogStream::channel();

        // The log connection borrows its Api, so the task owns both
        tokio::spawn(async move {
            match pods.log_stream(&pod_name, &params).await {
                Ok(reader) => {
                    if opened_tx.send(Ok(())).is_ok() {
                        logstream::forward(reader, chunk_tx).await;
                    }
                }
                Err(e) => {
                    let _ = opened_tx.send(Err(e.to_string()));
                }
            }
        });

        match opened_rx.await {
            Ok(Ok(())) => {
                info!(
                    namespace = %pod.namespace(),
                    pod = %pod.name(),
                    follow = request.follow(),
                    "Opened log stream"
                );
                Ok(stream)
            }
            Ok(Err(message)) => Err(stream_failed(
                StreamOperation::Logs,
                pod,
                message,
                String::new(),
            )),
            Err(_) => Err(stream_failed(
                StreamOperation::Logs,
                pod,
                "log stream task ended before the connection opened".to_string(),
                String::new(),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scope::fixtures::{pod, NAMESPACE};
    use serde_json::json;
    use std::path::Path;

    fn pod_ref() -> PodRef {
        PodRef::from_pod(&pod("controller-abc12", "nginx-ingress-controller"), NAMESPACE)
    }

    #[test]
    fn test_attach_params_fixed_policy() {
        let params = attach_params(&pod_ref());

        assert!(!params.stdin);
        assert!(params.stdout);
        assert!(!params.stderr);
        assert!(!params.tty);
        assert_eq!(params.container.as_deref(), Some("nginx-ingress-controller"));
    }

    #[test]
    fn test_attach_params_without_container() {
        let bare = PodRef::from_pod(&Pod::default(), NAMESPACE);
        let params = attach_params(&bare);

        assert_eq!(params.container, None);
    }

    #[test]
    fn test_log_params_follow_flag() {
        let snapshot = log_params(&LogRequest::new(pod_ref(), false));
        assert!(!snapshot.follow);
        assert_eq!(
            snapshot.container.as_deref(),
            Some("nginx-ingress-controller")
        );

        let follow = log_params(&LogRequest::new(pod_ref(), true));
        assert!(follow.follow);
    }

    #[test]
    fn test_expand_home_kubeconfig_path() {
        let home = Some(PathBuf::from("/home/ops"));

        assert_eq!(
            expand_home("~/.kube/staging", home.clone()),
            Path::new("/home/ops/.kube/staging")
        );
        assert_eq!(expand_home("~", home.clone()), Path::new("/home/ops"));
        assert_eq!(
            expand_home("/etc/kubernetes/admin.conf", home.clone()),
            Path::new("/etc/kubernetes/admin.conf")
        );
        // Another user's home is left alone
        assert_eq!(expand_home("~root/config", home), Path::new("~root/config"));
    }

    #[test]
    fn test_expand_home_without_home_dir() {
        assert_eq!(
            expand_home("~/.kube/config", None),
            Path::new("~/.kube/config")
        );
    }

    #[test]
    fn test_failure_message_on_non_zero_exit() {
        let status = json!({
            "status": "Failure",
            "message": "command terminated with non-zero exit code: exit status 2",
            "reason": "NonZeroExitCode"
        });

        assert_eq!(
            failure_message(&status).as_deref(),
            Some("command terminated with non-zero exit code: exit status 2")
        );
    }

    #[test]
    fn test_failure_message_without_text() {
        let status = json!({ "status": "Failure" });

        assert_eq!(
            failure_message(&status).as_deref(),
            Some("command terminated with non-zero exit code")
        );
    }

    #[test]
    fn test_failure_message_ignores_success() {
        assert_eq!(failure_message(&json!({ "status": "Success" })), None);
        assert_eq!(failure_message(&json!({})), None);
    }

    #[test]
    fn test_exec_outcome_success_returns_stdout() {
        let output = exec_outcome(
            &pod_ref(),
            b"worker_processes auto;\n",
            Ok(()),
            Ok(()),
            None,
        )
        .unwrap();

        assert_eq!(output, "worker_processes auto;\n");
    }

    #[test]
    fn test_exec_outcome_remote_failure_keeps_partial_stdout() {
        let err = exec_outcome(
            &pod_ref(),
            b"nginx: configuration file test is successful\n",
            Ok(()),
            Ok(()),
            Some("command terminated with non-zero exit code: exit status 1".to_string()),
        )
        .unwrap_err();

        assert!(matches!(
            err,
            ScopeError::StreamFailed {
                operation: StreamOperation::Exec,
                ..
            }
        ));
        assert!(err.to_string().contains("exit status 1"));
        assert_eq!(
            err.captured_stdout(),
            "nginx: configuration file test is successful\n"
        );
    }

    #[test]
    fn test_exec_outcome_read_error_wins() {
        let err = exec_outcome(
            &pod_ref(),
            b"partial",
            Err(std::io::Error::new(
                std::io::ErrorKind::UnexpectedEof,
                "websocket closed",
            )),
            Err("session task panicked".to_string()),
            Some("command terminated with non-zero exit code".to_string()),
        )
        .unwrap_err();

        assert!(err.to_string().contains("websocket closed"));
        assert_eq!(err.captured_stdout(), "partial");
    }

    #[test]
    fn test_exec_outcome_broken_session_wins_over_exit_status() {
        let err = exec_outcome(
            &pod_ref(),
            b"",
            Ok(()),
            Err("session task panicked".to_string()),
            Some("command terminated with non-zero exit code".to_string()),
        )
        .unwrap_err();

        assert!(err.to_string().contains("session task panicked"));
        assert_eq!(err.captured_stdout(), "");
    }

    #[test]
    fn test_exec_outcome_decodes_invalid_utf8_lossily() {
        let output = exec_outcome(&pod_ref(), b"ok \xff\n", Ok(()), Ok(()), None).unwrap();

        assert_eq!(output, "ok \u{fffd}\n");
    }

    #[test]
    fn test_query_failed_names_kind_and_namespace() {
        let err = ScopeError::QueryFailed {
            kind: ResourceKind::Ingress,
            namespace: String::new(),
            message: "connection refused".to_string(),
        };
        assert!(err.to_string().starts_with("Failed to list ingresses"));
    }

    // ============================================================
    // Integration tests (require cluster)
    // ============================================================

    #[tokio::test]
    #[ignore] // Requires real cluster
    async fn test_list_pods_in_kube_system() {
        let (api, _) = connect(&ClusterConfig::new())
            .await
            .expect("requires kubeconfig");

        let pods = api.list_pods("kube-system").await.expect("Should list pods");
        assert!(!pods.is_empty(), "kube-system should have pods");
    }

    #[tokio::test]
    #[ignore] // Requires real cluster
    async fn test_exec_against_missing_pod_captures_nothing() {
        let (api, _) = connect(&ClusterConfig::new())
            .await
            .expect("requires kubeconfig");
        let missing = PodRef::from_pod(&pod("does-not-exist-7f3a", "app"), "default");

        let err = api
            .exec(&ExecRequest::new(missing, ["true"]))
            .await
            .expect_err("exec against a missing pod should fail");

        assert!(matches!(err, ScopeError::StreamFailed { .. }));
        assert_eq!(err.captured_stdout(), "");
    }
}
