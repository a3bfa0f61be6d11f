//! Simulated model deployments.
//!
//! A deployment starts as `deploying` and flips to `ready` after a configured
//! delay on a background task. `failed` is part of the status set for real
//! provisioning backends; the simulated flow never produces it.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::RwLock;

use crate::gateway::RoundRobin;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DeploymentStatus {
    Deploying,
    Ready,
    Failed,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Deployment {
    pub id: String,
    pub name: String,
    pub status: DeploymentStatus,
    pub worker_id: String,
    pub created_at: DateTime<Utc>,
}

/// Registry of deployments with its own worker rotation.
pub struct DeploymentRegistry {
    deployments: Arc<RwLock<HashMap<String, Deployment>>>,
    rotation: RoundRobin,
    ready_delay: Duration,
}

impl DeploymentRegistry {
    pub fn new(worker_count: usize, ready_delay: Duration) -> Self {
        Self {
            deployments: Arc::new(RwLock::new(HashMap::new())),
            rotation: RoundRobin::new(worker_count),
            ready_delay,
        }
    }

    /// Register a deployment and schedule its transition to `ready`.
    ///
    /// Returns the record as created, still `deploying`.
    pub async fn create(&self, name: &str) -> Deployment {
        let deployment = Deployment {
            id: uuid::Uuid::new_v4().to_string(),
            name: name.to_string(),
            status: DeploymentStatus::Deploying,
            worker_id: self.rotation.next_worker_id(),
            created_at: Utc::now(),
        };

        self.deployments
            .write()
            .await
            .insert(deployment.id.clone(), deployment.clone());

        tracing::info!(
            deployment_id = %deployment.id,
            name = %deployment.name,
            worker_id = %deployment.worker_id,
            "Deployment created"
        );

        let deployments = self.deployments.clone();
        let id = deployment.id.clone();
        let delay = self.ready_delay;
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if let Some(d) = deployments.write().await.get_mut(&id) {
                if d.status == DeploymentStatus::Deploying {
                    d.status = DeploymentStatus::Ready;
                    tracing::info!(deployment_id = %id, "Deployment ready");
                }
            }
        });

        deployment
    }

    /// All deployments, oldest first.
    pub async fn list(&self) -> Vec<Deployment> {
        let mut list: Vec<Deployment> = self.deployments.read().await.values().cloned().collect();
        list.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        list
    }

    /// Names of deployments that finished deploying.
    pub async fn ready_model_names(&self) -> Vec<String> {
        self.list()
            .await
            .into_iter()
            .filter(|d| d.status == DeploymentStatus::Ready)
            .map(|d| d.name)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_create_starts_deploying_then_becomes_ready() {
        let registry = DeploymentRegistry::new(2, Duration::from_millis(20));
        let created = registry.create("llama-sim").await;

        assert_eq!(created.status, DeploymentStatus::Deploying);
        assert!(registry.ready_model_names().await.is_empty());

        tokio::time::sleep(Duration::from_millis(80)).await;

        let current = registry.list().await;
        assert_eq!(current.len(), 1);
        assert_eq!(current[0].id, created.id);
        assert_eq!(current[0].status, DeploymentStatus::Ready);
        assert_eq!(registry.ready_model_names().await, vec!["llama-sim".to_string()]);
    }

    #[tokio::test]
    async fn test_worker_assignment_rotates() {
        let registry = DeploymentRegistry::new(2, Duration::from_millis(0));
        let a = registry.create("a").await;
        let b = registry.create("b").await;
        let c = registry.create("c").await;

        assert_eq!(a.worker_id, "worker-0");
        assert_eq!(b.worker_id, "worker-1");
        assert_eq!(c.worker_id, "worker-0");
        let ids: Vec<String> = registry.list().await.into_iter().map(|d| d.id).collect();
        assert_eq!(ids, vec![a.id, b.id, c.id]);
    }

    #[test]
    fn test_status_serialization() {
        assert_eq!(serde_json::to_string(&DeploymentStatus::Deploying).unwrap(), r#""deploying""#);
        assert_eq!(serde_json::to_string(&DeploymentStatus::Failed).unwrap(), r#""failed""#);
    }
}
