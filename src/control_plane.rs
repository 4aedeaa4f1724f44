use anyhow::Result;
use async_trait::async_trait;
use serde::Serialize;
use serde_json::{Map, Value};

use crate::service::Service;
use crate::task_definition::{ContainerDefinition, TaskDefinition};

/// Request to register a new task definition revision.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterTaskDefinition {
    pub family: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub task_role_arn: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub execution_role_arn: Option<String>,
    pub container_definitions: Vec<ContainerDefinition>,
    pub volumes: Vec<Value>,
    /// Network mode, compatibilities, task-level cpu and memory, ...
    #[serde(flatten)]
    pub task_settings: Map<String, Value>,
}

/// The cluster manager operations the updater relies on.
///
/// Implementations must not retry on their own: retry budgets are owned by
/// the trigger and the watcher.
#[async_trait]
pub trait ControlPlane: Send + Sync {
    /// Returns `None` when the service does not exist in the cluster.
    async fn describe_service(&self, cluster: &str, service_id: &str) -> Result<Option<Service>>;

    async fn describe_task_definition(&self, task_definition_id: &str) -> Result<TaskDefinition>;

    /// Returns the raw response. The new revision's identifier is found at
    /// `taskDefinition/taskDefinitionArn`.
    async fn register_task_definition(&self, request: &RegisterTaskDefinition) -> Result<Value>;

    async fn update_service(
        &self,
        cluster: &str,
        service_id: &str,
        task_definition_id: &str,
    ) -> Result<Service>;
}
