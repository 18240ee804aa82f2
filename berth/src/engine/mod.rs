//! Container engine abstraction

pub mod docker;

pub use docker::DockerEngine;

use async_trait::async_trait;

use crate::errors::ServiceError;

/// The engine operations the deployment pipeline needs.
///
/// `stop_container` and `remove_container` treat a container that is already
/// stopped or already gone as satisfied, so teardown stays idempotent even
/// when something outside this process reaped the container first.
#[async_trait]
pub trait ContainerEngine: Send + Sync {
    /// Build an image from an in-memory tar context and tag it.
    async fn build_image(&self, context: Vec<u8>, tag: &str) -> Result<(), ServiceError>;

    /// Create a container from `tag` with `internal_port` in the container
    /// bound to `host_port` on the host. Returns the container id.
    async fn create_container(
        &self,
        tag: &str,
        name: &str,
        internal_port: u16,
        host_port: u16,
    ) -> Result<String, ServiceError>;

    /// Start a created container.
    async fn start_container(&self, container: &str) -> Result<(), ServiceError>;

    /// Stop a running container.
    async fn stop_container(&self, container: &str) -> Result<(), ServiceError>;

    /// Remove a container.
    async fn remove_container(&self, container: &str) -> Result<(), ServiceError>;
}
