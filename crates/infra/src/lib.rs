//! Infrastructure-control collaborator seam.
//!
//! The remediation orchestrator acts on the platform exclusively through
//! the [`InfraControl`] trait: deployment restarts, replica changes,
//! replica probes, templated HTTP calls, and external process spawning.
//! [`RestInfraClient`] speaks to a cluster-orchestrator REST API;
//! [`MemoryInfra`] is the scripted in-memory double used by tests.

pub mod error;
pub mod memory;
pub mod rest;

pub use error::{InfraError, Result};
pub use memory::{InfraCall, MemoryInfra};
pub use rest::RestInfraClient;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

/// An outbound HTTP request issued by a webhook step.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpRequest {
    /// Target URL.
    pub url: String,

    /// HTTP method, e.g. `POST`.
    pub method: String,

    /// Request headers.
    pub headers: BTreeMap<String, String>,

    /// JSON body, if any.
    pub body: Option<serde_json::Value>,

    /// Whole-request timeout.
    pub timeout: Duration,
}

impl HttpRequest {
    pub fn new(url: impl Into<String>, method: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            method: method.into(),
            headers: BTreeMap::new(),
            body: None,
            timeout: Duration::from_secs(30),
        }
    }
}

/// Response to an [`HttpRequest`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpResponse {
    /// Status code.
    pub status: u16,

    /// Response body, truncated by the implementation if oversized.
    pub body: String,
}

impl HttpResponse {
    /// Webhook steps treat 2xx and 3xx as success.
    pub fn is_success(&self) -> bool {
        (200..400).contains(&self.status)
    }
}

/// Output of a spawned process.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessOutput {
    /// Exit code; `None` if terminated by signal.
    pub exit_code: Option<i32>,

    /// Captured stdout.
    pub stdout: String,

    /// Captured stderr.
    pub stderr: String,
}

impl ProcessOutput {
    /// Script steps treat a zero exit as success.
    pub fn is_success(&self) -> bool {
        self.exit_code == Some(0)
    }
}

/// Control operations against the platform.
#[async_trait]
pub trait InfraControl: Send + Sync {
    /// Trigger a rolling restart of a deployment.
    async fn restart_deployment(&self, service: &str) -> Result<()>;

    /// Set the replica count of a deployment.
    async fn scale_deployment(&self, service: &str, replicas: u32) -> Result<()>;

    /// Currently observed replica count of a deployment.
    async fn current_replicas(&self, service: &str) -> Result<u32>;

    /// Issue an HTTP call.
    async fn http_call(&self, request: HttpRequest) -> Result<HttpResponse>;

    /// Spawn an external process and wait for it.
    async fn execute_process(&self, command: &str, args: &[String]) -> Result<ProcessOutput>;
}
