//! In-memory infrastructure double for tests.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;

use crate::error::{InfraError, Result};
use crate::{HttpRequest, HttpResponse, InfraControl, ProcessOutput};

/// A recorded infrastructure call.
#[derive(Debug, Clone, PartialEq)]
pub enum InfraCall {
    Restart { service: String },
    Scale { service: String, replicas: u32 },
    Http { url: String, method: String },
    Process { command: String, args: Vec<String> },
}

/// Scripted, recording [`InfraControl`] implementation.
pub struct MemoryInfra {
    replicas: Mutex<HashMap<String, u32>>,
    calls: Mutex<Vec<InfraCall>>,
    http_status: Mutex<u16>,
    process_exit: Mutex<i32>,
    fail_restarts: Mutex<bool>,
}

impl MemoryInfra {
    pub fn new() -> Self {
        Self {
            replicas: Mutex::new(HashMap::new()),
            calls: Mutex::new(Vec::new()),
            http_status: Mutex::new(200),
            process_exit: Mutex::new(0),
            fail_restarts: Mutex::new(false),
        }
    }

    /// Seed the observed replica count for a service.
    pub fn set_replicas(&self, service: impl Into<String>, replicas: u32) {
        self.replicas.lock().insert(service.into(), replicas);
    }

    /// Status returned by subsequent `http_call`s.
    pub fn set_http_status(&self, status: u16) {
        *self.http_status.lock() = status;
    }

    /// Exit code returned by subsequent `execute_process` calls.
    pub fn set_process_exit(&self, code: i32) {
        *self.process_exit.lock() = code;
    }

    /// Make restarts fail with an API error.
    pub fn set_fail_restarts(&self, fail: bool) {
        *self.fail_restarts.lock() = fail;
    }

    /// All recorded calls, in order.
    pub fn calls(&self) -> Vec<InfraCall> {
        self.calls.lock().clone()
    }

    /// Observed replica count for a service.
    pub fn replicas(&self, service: &str) -> Option<u32> {
        self.replicas.lock().get(service).copied()
    }
}

impl Default for MemoryInfra {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl InfraControl for MemoryInfra {
    async fn restart_deployment(&self, service: &str) -> Result<()> {
        self.calls.lock().push(InfraCall::Restart {
            service: service.to_string(),
        });
        if *self.fail_restarts.lock() {
            return Err(InfraError::ApiStatus {
                operation: format!("restart {}", service),
                status: 503,
            });
        }
        Ok(())
    }

    async fn scale_deployment(&self, service: &str, replicas: u32) -> Result<()> {
        self.calls.lock().push(InfraCall::Scale {
            service: service.to_string(),
            replicas,
        });
        self.replicas.lock().insert(service.to_string(), replicas);
        Ok(())
    }

    async fn current_replicas(&self, service: &str) -> Result<u32> {
        self.replicas
            .lock()
            .get(service)
            .copied()
            .ok_or_else(|| InfraError::UnknownDeployment(service.to_string()))
    }

    async fn http_call(&self, request: HttpRequest) -> Result<HttpResponse> {
        self.calls.lock().push(InfraCall::Http {
            url: request.url.clone(),
            method: request.method.clone(),
        });
        Ok(HttpResponse {
            status: *self.http_status.lock(),
            body: String::new(),
        })
    }

    async fn execute_process(&self, command: &str, args: &[String]) -> Result<ProcessOutput> {
        self.calls.lock().push(InfraCall::Process {
            command: command.to_string(),
            args: args.to_vec(),
        });
        Ok(ProcessOutput {
            exit_code: Some(*self.process_exit.lock()),
            stdout: String::new(),
            stderr: String::new(),
        })
    }
}
