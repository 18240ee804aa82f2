//! HTTP request handlers

use std::path::PathBuf;
use std::sync::Arc;

use axum::{
    extract::{Multipart, Path, State},
    http::{header, HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{error, info};
use uuid::Uuid;

use crate::errors::ServiceError;
use crate::models::deployment::DeploymentState;
use crate::server::state::ServerState;
use crate::telemetry::collect_metrics;
use crate::utils::version_info;

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub service: String,
    pub version: String,
}

/// Health check handler
pub async fn health_handler() -> impl IntoResponse {
    let version = version_info();
    Json(HealthResponse {
        status: "healthy".to_string(),
        service: "berth".to_string(),
        version: version.version,
    })
}

/// Version response
#[derive(Debug, Serialize)]
pub struct VersionResponse {
    pub version: String,
    pub git_hash: String,
    pub build_time: String,
}

/// Version handler
pub async fn version_handler() -> impl IntoResponse {
    let version = version_info();
    Json(VersionResponse {
        version: version.version,
        git_hash: version.git_hash,
        build_time: version.build_time,
    })
}

/// Deploy response; field names are part of the public API
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeployResponse {
    pub url: String,
    pub expires_in_minutes: u64,
}

/// Deploy handler
///
/// Accepts a multipart upload with a single `artifact` field, stores the
/// bytes under the upload directory and hands the file path to the
/// deployment service. Stage failures are logged with their specific cause
/// and reported to the caller as a generic failure.
pub async fn deploy_handler(
    State(state): State<Arc<ServerState>>,
    headers: HeaderMap,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let artifact_path = match save_artifact(&state, &mut multipart).await {
        Ok(path) => path,
        Err(e) => {
            error!("Upload rejected: {}", e);
            return Err((
                StatusCode::BAD_REQUEST,
                "missing or unreadable artifact".to_string(),
            ));
        }
    };

    let host = request_host(&headers);
    match state.service.deploy(artifact_path, &host).await {
        Ok(receipt) => Ok(Json(DeployResponse {
            url: receipt.url,
            expires_in_minutes: receipt.expires_in_minutes,
        })),
        Err(e) => {
            error!("Deploy failed: {}", e);
            Err((
                StatusCode::INTERNAL_SERVER_ERROR,
                "deployment failed".to_string(),
            ))
        }
    }
}

async fn save_artifact(
    state: &ServerState,
    multipart: &mut Multipart,
) -> Result<PathBuf, ServiceError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ServiceError::UploadInvalid(e.to_string()))?
    {
        if field.name() != Some("artifact") {
            continue;
        }

        let data = field
            .bytes()
            .await
            .map_err(|e| ServiceError::UploadInvalid(e.to_string()))?;
        if data.is_empty() {
            return Err(ServiceError::UploadInvalid("artifact field is empty".to_string()));
        }

        let path = state.upload_dir.join(format!("upload-{}", Uuid::new_v4()));
        tokio::fs::write(&path, &data).await?;
        info!("Stored artifact upload ({} bytes) at {}", data.len(), path.display());
        return Ok(path);
    }

    Err(ServiceError::UploadInvalid("no artifact field in upload".to_string()))
}

/// Host identity for URL construction: the Host header minus any port.
fn request_host(headers: &HeaderMap) -> String {
    headers
        .get(header::HOST)
        .and_then(|value| value.to_str().ok())
        .and_then(|host| host.split(':').next())
        .filter(|host| !host.is_empty())
        .unwrap_or("localhost")
        .to_string()
}

/// Active deployment summary
#[derive(Debug, Serialize)]
pub struct DeploymentInfo {
    pub id: Uuid,
    pub state: DeploymentState,
    pub host_port: Option<u16>,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

/// Deployments response
#[derive(Debug, Serialize)]
pub struct DeploymentsResponse {
    pub deployments: Vec<DeploymentInfo>,
    pub total: usize,
}

/// Deployments handler
pub async fn deployments_handler(State(state): State<Arc<ServerState>>) -> impl IntoResponse {
    let deployments: Vec<DeploymentInfo> = state
        .lifecycle
        .list()
        .await
        .into_iter()
        .map(|d| DeploymentInfo {
            id: d.id,
            state: d.state,
            host_port: d.host_port,
            created_at: d.created_at,
            expires_at: d.expires_at,
        })
        .collect();
    let total = deployments.len();

    Json(DeploymentsResponse { deployments, total })
}

/// Cancel response
#[derive(Debug, Serialize)]
pub struct CancelResponse {
    pub cancelled: bool,
}

/// Cancel handler: immediate teardown of a registered deployment
pub async fn cancel_handler(
    State(state): State<Arc<ServerState>>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, StatusCode> {
    if state.lifecycle.cancel(id).await {
        Ok(Json(CancelResponse { cancelled: true }))
    } else {
        Err(StatusCode::NOT_FOUND)
    }
}

/// Metrics response
#[derive(Debug, Serialize)]
pub struct MetricsResponse {
    pub cpu_usage: f32,
    pub memory_used: u64,
    pub memory_total: u64,
    pub memory_percent: f32,
    pub uptime_secs: u64,
    pub hostname: String,
    pub active_deployments: usize,
    pub claimed_ports: usize,
}

/// Metrics handler
pub async fn metrics_handler(State(state): State<Arc<ServerState>>) -> impl IntoResponse {
    let metrics = collect_metrics();

    Json(MetricsResponse {
        cpu_usage: metrics.cpu_usage,
        memory_used: metrics.memory_used,
        memory_total: metrics.memory_total,
        memory_percent: metrics.memory_percent,
        uptime_secs: metrics.uptime_secs,
        hostname: metrics.hostname,
        active_deployments: state.lifecycle.active_count().await,
        claimed_ports: state.ports.claimed_count().await,
    })
}
