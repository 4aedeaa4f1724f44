use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use tokio::process::Command;
use tracing::debug;

use crate::control_plane::{ControlPlane, RegisterTaskDefinition};
use crate::service::Service;
use crate::task_definition::TaskDefinition;

/// Talks to ECS through the `aws` command line tool, which takes care of
/// credential and profile resolution.
#[derive(Debug, Clone, Default)]
pub struct AwsCli {
    profile: Option<String>,
}

#[derive(Debug, Deserialize)]
struct DescribeServicesOutput {
    #[serde(default)]
    services: Vec<Service>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DescribeTaskDefinitionOutput {
    task_definition: TaskDefinition,
}

#[derive(Debug, Deserialize)]
struct UpdateServiceOutput {
    service: Service,
}

impl AwsCli {
    pub fn new(profile: Option<String>) -> Self {
        Self { profile }
    }

    #[tracing::instrument(name = "AwsCli::ecs", skip_all, fields(
        operation = %operation
    ))]
    async fn ecs(&self, operation: &str, args: &[&str]) -> Result<Value> {
        let mut command = Command::new("aws");
        if let Some(profile) = &self.profile {
            command.arg("--profile").arg(profile);
        }
        command
            .arg("ecs")
            .arg(operation)
            .args(args)
            .arg("--output")
            .arg("json");

        debug!(?command, "running aws cli");

        let output = command
            .output()
            .await
            .with_context(|| format!("spawning aws ecs {operation}"))?;

        if !output.status.success() {
            anyhow::bail!(
                "aws ecs {} failed ({}): {}",
                operation,
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            );
        }

        serde_json::from_slice(&output.stdout)
            .with_context(|| format!("parsing aws ecs {operation} output"))
    }
}

#[async_trait]
impl ControlPlane for AwsCli {
    async fn describe_service(&self, cluster: &str, service_id: &str) -> Result<Option<Service>> {
        let output = self
            .ecs(
                "describe-services",
                &["--cluster", cluster, "--services", service_id],
            )
            .await?;

        let output: DescribeServicesOutput =
            serde_json::from_value(output).context("decoding describe-services output")?;

        Ok(output.services.into_iter().next())
    }

    async fn describe_task_definition(&self, task_definition_id: &str) -> Result<TaskDefinition> {
        let output = self
            .ecs(
                "describe-task-definition",
                &["--task-definition", task_definition_id],
            )
            .await?;

        let output: DescribeTaskDefinitionOutput = serde_json::from_value(output)
            .context("decoding describe-task-definition output")?;

        Ok(output.task_definition)
    }

    async fn register_task_definition(&self, request: &RegisterTaskDefinition) -> Result<Value> {
        let input = serde_json::to_string(request)?;

        self.ecs("register-task-definition", &["--cli-input-json", input.as_str()])
            .await
    }

    async fn update_service(
        &self,
        cluster: &str,
        service_id: &str,
        task_definition_id: &str,
    ) -> Result<Service> {
        let output = self
            .ecs(
                "update-service",
                &[
                    "--cluster",
                    cluster,
                    "--service",
                    service_id,
                    "--task-definition",
                    task_definition_id,
                ],
            )
            .await?;

        let output: UpdateServiceOutput =
            serde_json::from_value(output).context("decoding update-service output")?;

        Ok(output.service)
    }
}
