//! Shared test support: an in-memory container engine double.

use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use berth::app::options::AppOptions;
use berth::engine::ContainerEngine;
use berth::errors::ServiceError;

/// In-memory engine recording every call, with injectable failures.
#[derive(Default)]
pub struct MockEngine {
    pub fail_build: bool,
    pub fail_start: bool,
    calls: Mutex<Vec<String>>,
    containers: Mutex<HashSet<String>>,
}

impl MockEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_build() -> Self {
        Self {
            fail_build: true,
            ..Self::default()
        }
    }

    pub fn failing_start() -> Self {
        Self {
            fail_start: true,
            ..Self::default()
        }
    }

    /// Number of recorded calls whose label starts with `prefix`.
    pub fn call_count(&self, prefix: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|call| call.starts_with(prefix))
            .count()
    }

    /// Containers created and not yet removed.
    pub fn container_count(&self) -> usize {
        self.containers.lock().unwrap().len()
    }

    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait]
impl ContainerEngine for MockEngine {
    async fn build_image(&self, _context: Vec<u8>, tag: &str) -> Result<(), ServiceError> {
        self.record(format!("build:{tag}"));
        if self.fail_build {
            return Err(ServiceError::BuildFailed("base image unavailable".to_string()));
        }
        Ok(())
    }

    async fn create_container(
        &self,
        _tag: &str,
        name: &str,
        _internal_port: u16,
        _host_port: u16,
    ) -> Result<String, ServiceError> {
        self.record(format!("create:{name}"));
        let id = format!("ctr-{name}");
        self.containers.lock().unwrap().insert(id.clone());
        Ok(id)
    }

    async fn start_container(&self, container: &str) -> Result<(), ServiceError> {
        self.record(format!("start:{container}"));
        if self.fail_start {
            return Err(ServiceError::LaunchFailed("entrypoint exited".to_string()));
        }
        Ok(())
    }

    async fn stop_container(&self, container: &str) -> Result<(), ServiceError> {
        self.record(format!("stop:{container}"));
        Ok(())
    }

    async fn remove_container(&self, container: &str) -> Result<(), ServiceError> {
        self.record(format!("remove:{container}"));
        self.containers.lock().unwrap().remove(container);
        Ok(())
    }
}

/// Options with a compact, test-local port range and a short TTL.
pub fn test_options(range_low: u16, range_high: u16, ttl: Duration) -> AppOptions {
    let mut options = AppOptions::default();
    options.deploy.port_range_low = range_low;
    options.deploy.port_range_high = range_high;
    options.deploy.ttl = ttl;
    options.deploy.build_timeout = Duration::from_secs(5);
    options.deploy.launch_timeout = Duration::from_secs(5);
    options
}

/// Write a throwaway artifact file and return its path.
pub fn write_artifact(hint: &str) -> PathBuf {
    let path = std::env::temp_dir().join(format!(
        "berth-test-{}-{}",
        hint,
        uuid::Uuid::new_v4()
    ));
    std::fs::write(&path, b"artifact-bytes").unwrap();
    path
}
