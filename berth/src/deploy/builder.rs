//! Image build orchestration

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info};

use crate::deploy::context::{build_context, render_descriptor};
use crate::engine::ContainerEngine;
use crate::errors::ServiceError;

/// Builds disposable images from uploaded artifacts.
///
/// Every deployment gets a fresh tag; a failed build leaves no tag safe for
/// reuse, so tags are never recycled.
pub struct ImageBuilder {
    engine: Arc<dyn ContainerEngine>,
    base_image: String,
    build_timeout: Duration,
}

impl ImageBuilder {
    pub fn new(engine: Arc<dyn ContainerEngine>, base_image: String, build_timeout: Duration) -> Self {
        Self {
            engine,
            base_image,
            build_timeout,
        }
    }

    /// Synthesize the build context for the artifact and drive the engine
    /// build for `tag` to completion. A timeout surfaces as `BuildFailed`,
    /// same as an engine-reported failure.
    pub async fn build(&self, artifact_path: &Path, tag: &str) -> Result<(), ServiceError> {
        let artifact = tokio::fs::read(artifact_path).await?;
        debug!(
            "Read artifact {} ({} bytes)",
            artifact_path.display(),
            artifact.len()
        );

        let descriptor = render_descriptor(&self.base_image);
        let context = build_context(&descriptor, &artifact)?;

        info!("Building image {} from {}", tag, artifact_path.display());
        match tokio::time::timeout(self.build_timeout, self.engine.build_image(context, tag)).await
        {
            Ok(result) => result,
            Err(_) => Err(ServiceError::BuildFailed(format!(
                "build timed out after {:?}",
                self.build_timeout
            ))),
        }
    }
}
