//! Application state management

use std::sync::Arc;

use tracing::info;

use crate::app::options::AppOptions;
use crate::deploy::builder::ImageBuilder;
use crate::deploy::launcher::ContainerLauncher;
use crate::deploy::lifecycle::LifecycleManager;
use crate::deploy::ports::PortAllocator;
use crate::deploy::service::DeploymentService;
use crate::engine::{ContainerEngine, DockerEngine};
use crate::errors::ServiceError;

/// Main application state
pub struct AppState {
    /// Deployment orchestrator
    pub service: Arc<DeploymentService>,

    /// Registry and teardown owner
    pub lifecycle: Arc<LifecycleManager>,

    /// Host port allocator
    pub ports: Arc<PortAllocator>,
}

impl AppState {
    /// Initialize application state against the configured Docker endpoint.
    pub fn init(options: &AppOptions) -> Result<Self, ServiceError> {
        let engine: Arc<dyn ContainerEngine> =
            Arc::new(DockerEngine::connect(&options.engine.docker_socket)?);
        Ok(Self::with_engine(engine, options))
    }

    /// Assemble the component graph on top of any engine implementation.
    pub fn with_engine(engine: Arc<dyn ContainerEngine>, options: &AppOptions) -> Self {
        info!("Initializing application state...");

        let ports = Arc::new(PortAllocator::new(
            options.deploy.port_range_low..=options.deploy.port_range_high,
            options.deploy.port_probe_limit,
        ));

        let lifecycle = Arc::new(LifecycleManager::new(engine.clone(), ports.clone()));

        let builder = ImageBuilder::new(
            engine.clone(),
            options.deploy.base_image.clone(),
            options.deploy.build_timeout,
        );

        let launcher = ContainerLauncher::new(
            engine,
            options.deploy.service_port,
            options.deploy.launch_timeout,
        );

        let service = Arc::new(DeploymentService::new(
            builder,
            launcher,
            ports.clone(),
            lifecycle.clone(),
            options.deploy.ttl,
        ));

        Self {
            service,
            lifecycle,
            ports,
        }
    }
}
