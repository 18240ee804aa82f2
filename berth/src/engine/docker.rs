//! Docker engine client backed by bollard

use std::collections::HashMap;

use async_trait::async_trait;
use bollard::container::{
    Config, CreateContainerOptions, RemoveContainerOptions, StartContainerOptions,
    StopContainerOptions,
};
use bollard::errors::Error as EngineApiError;
use bollard::image::BuildImageOptions;
use bollard::models::{HostConfig, PortBinding};
use bollard::{Docker, API_DEFAULT_VERSION};
use futures::StreamExt;
use tracing::{debug, info, warn};

use crate::engine::ContainerEngine;
use crate::errors::ServiceError;

/// Docker Engine API client
pub struct DockerEngine {
    docker: Docker,
}

impl DockerEngine {
    /// Connect over the unix socket at `socket_path`.
    pub fn connect(socket_path: &str) -> Result<Self, ServiceError> {
        let docker = Docker::connect_with_socket(socket_path, 120, API_DEFAULT_VERSION)?;
        info!("Connected to container engine at {}", socket_path);
        Ok(Self { docker })
    }
}

/// 304: container already stopped; 404: container already gone.
fn already_satisfied(err: &EngineApiError) -> bool {
    matches!(
        err,
        EngineApiError::DockerResponseServerError {
            status_code: 304 | 404,
            ..
        }
    )
}

#[async_trait]
impl ContainerEngine for DockerEngine {
    async fn build_image(&self, context: Vec<u8>, tag: &str) -> Result<(), ServiceError> {
        let options = BuildImageOptions {
            dockerfile: "Dockerfile".to_string(),
            t: tag.to_string(),
            rm: true,
            ..Default::default()
        };

        let mut progress =
            self.docker
                .build_image(options, None, Some(context.into()));

        while let Some(event) = progress.next().await {
            let update = event.map_err(|e| ServiceError::BuildFailed(e.to_string()))?;
            if let Some(message) = update.error {
                return Err(ServiceError::BuildFailed(message));
            }
            if let Some(line) = update.stream {
                let line = line.trim_end();
                if !line.is_empty() {
                    debug!("build {}: {}", tag, line);
                }
            }
        }

        info!("Built image {}", tag);
        Ok(())
    }

    async fn create_container(
        &self,
        tag: &str,
        name: &str,
        internal_port: u16,
        host_port: u16,
    ) -> Result<String, ServiceError> {
        let service_port = format!("{}/tcp", internal_port);

        let mut port_bindings = HashMap::new();
        port_bindings.insert(
            service_port.clone(),
            Some(vec![PortBinding {
                host_ip: None,
                host_port: Some(host_port.to_string()),
            }]),
        );

        let mut exposed_ports = HashMap::new();
        exposed_ports.insert(service_port, HashMap::new());

        let config = Config {
            image: Some(tag.to_string()),
            exposed_ports: Some(exposed_ports),
            host_config: Some(HostConfig {
                port_bindings: Some(port_bindings),
                ..Default::default()
            }),
            ..Default::default()
        };

        let options = CreateContainerOptions {
            name: name.to_string(),
            platform: None,
        };

        let created = self.docker.create_container(Some(options), config).await?;
        for warning in &created.warnings {
            warn!("create {}: {}", name, warning);
        }

        Ok(created.id)
    }

    async fn start_container(&self, container: &str) -> Result<(), ServiceError> {
        self.docker
            .start_container(container, None::<StartContainerOptions<String>>)
            .await?;
        Ok(())
    }

    async fn stop_container(&self, container: &str) -> Result<(), ServiceError> {
        match self
            .docker
            .stop_container(container, Some(StopContainerOptions { t: 10 }))
            .await
        {
            Ok(()) => Ok(()),
            Err(e) if already_satisfied(&e) => {
                debug!("Container {} already stopped", container);
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn remove_container(&self, container: &str) -> Result<(), ServiceError> {
        let options = RemoveContainerOptions {
            force: true,
            ..Default::default()
        };

        match self.docker.remove_container(container, Some(options)).await {
            Ok(()) => Ok(()),
            Err(e) if already_satisfied(&e) => {
                debug!("Container {} already removed", container);
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }
}
