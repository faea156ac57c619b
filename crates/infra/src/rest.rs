//! REST-backed infrastructure client.
//!
//! Talks to a cluster-orchestrator API:
//!
//! - `POST {base}/deployments/{service}/restart`
//! - `PUT  {base}/deployments/{service}/scale` with `{"replicas": n}`
//! - `GET  {base}/deployments/{service}` returning `{"replicas": n}`
//!
//! Scripts are spawned locally via `tokio::process`.

use async_trait::async_trait;
use reqwest::Method;
use serde::Deserialize;
use serde_json::json;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, warn};

use crate::error::{InfraError, Result};
use crate::{HttpRequest, HttpResponse, InfraControl, ProcessOutput};

/// Default timeout for cluster API calls.
const API_TIMEOUT: Duration = Duration::from_secs(15);

/// Default timeout for spawned scripts.
const SCRIPT_TIMEOUT: Duration = Duration::from_secs(300);

#[derive(Debug, Deserialize)]
struct DeploymentInfo {
    replicas: u32,
}

/// [`InfraControl`] implementation over a cluster REST API.
pub struct RestInfraClient {
    base_url: String,
    client: reqwest::Client,
}

impl RestInfraClient {
    /// Create a client for the given API base URL.
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(API_TIMEOUT).build()?;
        let mut base_url = base_url.into();
        while base_url.ends_with('/') {
            base_url.pop();
        }
        Ok(Self { base_url, client })
    }

    fn deployment_url(&self, service: &str) -> String {
        format!("{}/deployments/{}", self.base_url, service)
    }
}

#[async_trait]
impl InfraControl for RestInfraClient {
    async fn restart_deployment(&self, service: &str) -> Result<()> {
        let url = format!("{}/restart", self.deployment_url(service));
        let response = self.client.post(&url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(InfraError::ApiStatus {
                operation: format!("restart {}", service),
                status: status.as_u16(),
            });
        }
        debug!(service = service, "deployment restart requested");
        Ok(())
    }

    async fn scale_deployment(&self, service: &str, replicas: u32) -> Result<()> {
        let url = format!("{}/scale", self.deployment_url(service));
        let response = self
            .client
            .put(&url)
            .json(&json!({ "replicas": replicas }))
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            return Err(InfraError::ApiStatus {
                operation: format!("scale {} to {}", service, replicas),
                status: status.as_u16(),
            });
        }
        debug!(service = service, replicas = replicas, "deployment scaled");
        Ok(())
    }

    async fn current_replicas(&self, service: &str) -> Result<u32> {
        let response = self.client.get(self.deployment_url(service)).send().await?;
        let status = response.status();
        if status.as_u16() == 404 {
            return Err(InfraError::UnknownDeployment(service.to_string()));
        }
        if !status.is_success() {
            return Err(InfraError::ApiStatus {
                operation: format!("inspect {}", service),
                status: status.as_u16(),
            });
        }
        let info: DeploymentInfo = response.json().await?;
        Ok(info.replicas)
    }

    async fn http_call(&self, request: HttpRequest) -> Result<HttpResponse> {
        let method =
            Method::from_bytes(request.method.to_uppercase().as_bytes()).unwrap_or(Method::POST);
        let mut builder = self
            .client
            .request(method, &request.url)
            .timeout(request.timeout);
        for (key, value) in &request.headers {
            builder = builder.header(key, value);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder.send().await?;
        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();
        Ok(HttpResponse { status, body })
    }

    async fn execute_process(&self, command: &str, args: &[String]) -> Result<ProcessOutput> {
        let child = Command::new(command)
            .args(args)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()?;

        let output = match tokio::time::timeout(SCRIPT_TIMEOUT, child.wait_with_output()).await {
            Ok(output) => output?,
            Err(_) => {
                warn!(command = command, "script timed out");
                return Err(InfraError::Timeout(SCRIPT_TIMEOUT));
            }
        };

        Ok(ProcessOutput {
            exit_code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}
