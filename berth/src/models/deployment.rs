//! Deployment entity and its state machine

use std::path::PathBuf;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Deployment state
///
/// States only move forward; `Cleaned` and `Failed` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeploymentState {
    /// Image build in progress
    Building,

    /// Host port claimed
    PortAllocated,

    /// Container create/start in progress
    Launching,

    /// Container running and reachable
    Running,

    /// Teardown claimed, cleanup steps running
    ExpiringSoon,

    /// All resources reclaimed
    Cleaned,

    /// Construction aborted
    Failed,
}

impl DeploymentState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, DeploymentState::Cleaned | DeploymentState::Failed)
    }
}

/// One deployment per deploy request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Deployment {
    /// Unique deployment ID, generated at request time
    pub id: Uuid,

    /// Image tag, derived from the deployment ID; never reused
    pub image_tag: String,

    /// Uploaded artifact, owned by this deployment until cleanup deletes it
    pub artifact_path: PathBuf,

    /// Engine container id, set once launch succeeds
    pub container_ref: Option<String>,

    /// Externally reachable port, set once allocation succeeds
    pub host_port: Option<u16>,

    /// Current state
    pub state: DeploymentState,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,

    /// Expiry timestamp: `created_at` + TTL
    pub expires_at: DateTime<Utc>,
}

impl Deployment {
    /// Create a new deployment in `Building` state with a fresh identity.
    pub fn new(artifact_path: PathBuf, ttl: Duration) -> Self {
        let id = Uuid::new_v4();
        let created_at = Utc::now();
        let expires_at = created_at + chrono::Duration::milliseconds(ttl.as_millis() as i64);

        Self {
            id,
            image_tag: format!("berth-app-{}", id),
            artifact_path,
            container_ref: None,
            host_port: None,
            state: DeploymentState::Building,
            created_at,
            expires_at,
        }
    }

    /// Unique container name derived from the deployment identity.
    pub fn container_name(&self) -> String {
        format!("berth-{}", self.id)
    }

    /// Advance to `next`, validating the transition.
    ///
    /// The state graph is a DAG: construction stages move strictly forward,
    /// teardown passes through `ExpiringSoon` exactly once, and terminal
    /// states accept no further transitions.
    pub fn advance(&mut self, next: DeploymentState) -> Result<(), String> {
        use DeploymentState::*;

        match (self.state, next) {
            (Building, PortAllocated)
            | (PortAllocated, Launching)
            | (Launching, Running)
            | (Running, ExpiringSoon)
            | (ExpiringSoon, Cleaned) => {
                self.state = next;
                Ok(())
            }
            (Building | PortAllocated | Launching, Failed) => {
                self.state = Failed;
                Ok(())
            }
            (state, next) => Err(format!("invalid transition: {:?} -> {:?}", state, next)),
        }
    }

    /// Mark a construction-stage failure terminal.
    pub fn fail(&mut self) {
        if !self.state.is_terminal() {
            self.state = DeploymentState::Failed;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn deployment() -> Deployment {
        Deployment::new(PathBuf::from("/tmp/artifact"), Duration::from_secs(1800))
    }

    #[test]
    fn test_identity_derivation() {
        let d = deployment();
        assert_eq!(d.image_tag, format!("berth-app-{}", d.id));
        assert_eq!(d.container_name(), format!("berth-{}", d.id));
        assert_eq!(d.state, DeploymentState::Building);
        assert!(d.expires_at > d.created_at);
    }

    #[test]
    fn test_forward_flow() {
        let mut d = deployment();

        d.advance(DeploymentState::PortAllocated).unwrap();
        d.advance(DeploymentState::Launching).unwrap();
        d.advance(DeploymentState::Running).unwrap();
        d.advance(DeploymentState::ExpiringSoon).unwrap();
        d.advance(DeploymentState::Cleaned).unwrap();

        assert!(d.state.is_terminal());
    }

    #[test]
    fn test_no_stage_skipping() {
        let mut d = deployment();
        assert!(d.advance(DeploymentState::Running).is_err());
        assert!(d.advance(DeploymentState::Cleaned).is_err());
        assert_eq!(d.state, DeploymentState::Building);
    }

    #[test]
    fn test_failure_is_terminal() {
        let mut d = deployment();
        d.advance(DeploymentState::Failed).unwrap();
        assert!(d.state.is_terminal());
        assert!(d.advance(DeploymentState::PortAllocated).is_err());
    }

    #[test]
    fn test_running_cannot_fail_directly() {
        let mut d = deployment();
        d.advance(DeploymentState::PortAllocated).unwrap();
        d.advance(DeploymentState::Launching).unwrap();
        d.advance(DeploymentState::Running).unwrap();
        assert!(d.advance(DeploymentState::Failed).is_err());
    }

    #[test]
    fn test_teardown_claim_is_single_use() {
        let mut d = deployment();
        d.advance(DeploymentState::PortAllocated).unwrap();
        d.advance(DeploymentState::Launching).unwrap();
        d.advance(DeploymentState::Running).unwrap();

        d.advance(DeploymentState::ExpiringSoon).unwrap();
        assert!(d.advance(DeploymentState::ExpiringSoon).is_err());
    }
}
