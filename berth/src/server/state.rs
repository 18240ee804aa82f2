//! Server state

use std::path::PathBuf;
use std::sync::Arc;

use crate::deploy::lifecycle::LifecycleManager;
use crate::deploy::ports::PortAllocator;
use crate::deploy::service::DeploymentService;

/// Server state shared across handlers
pub struct ServerState {
    pub service: Arc<DeploymentService>,
    pub lifecycle: Arc<LifecycleManager>,
    pub ports: Arc<PortAllocator>,
    pub upload_dir: PathBuf,
}

impl ServerState {
    pub fn new(
        service: Arc<DeploymentService>,
        lifecycle: Arc<LifecycleManager>,
        ports: Arc<PortAllocator>,
        upload_dir: PathBuf,
    ) -> Self {
        Self {
            service,
            lifecycle,
            ports,
            upload_dir,
        }
    }
}
