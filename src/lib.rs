//! podreach - find a pod, run a command in it, read its logs
//!
//! Resolves a namespace plus a pod name or workload name to exactly one
//! running pod, then either executes a command in it and captures stdout,
//! or opens a snapshot or follow stream of its logs.
//!
//! # Example
//!
//! ```no_run
//! use podreach::{ClusterConfig, Scope, Selector};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let scope = Scope::connect(&ClusterConfig::new().namespace("ingress-nginx")).await?;
//!
//!     // Dump the rendered nginx config of one controller replica
//!     let conf = scope
//!         .exec(&Selector::ingress_controller(), &["cat", "/etc/nginx/nginx.conf"])
//!         .await?;
//!     println!("{conf}");
//!
//!     // Snapshot of a named pod's logs
//!     let logs = scope
//!         .logs(&"pod/default-http-backend-0".parse()?, false)
//!         .await?
//!         .read_to_string()
//!         .await?;
//!     println!("{logs}");
//!
//!     Ok(())
//! }
//! ```

pub mod client;
pub mod config;
pub mod logstream;
pub mod scope;
pub mod telemetry;

// Re-export commonly used types
pub use client::{ClusterApi, KubeApi};
pub use config::{ClusterConfig, DEFAULT_INGRESS_DEPLOYMENT_NAME, DEFAULT_INGRESS_SERVICE_NAME};
pub use logstream::LogStream;
pub use scope::{
    parse_selector, ExecRequest, LogRequest, PodRef, ResourceKind, Scope, ScopeError, Selector,
    ServiceRef, StreamOperation,
};
