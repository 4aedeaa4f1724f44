use anyhow::Context;
use serde::Deserialize;
use serde_json::Value;
use std::path::Path;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::control_plane::{ControlPlane, RegisterTaskDefinition};
use crate::error::{Result, UpdateError};
use crate::path_access::PathAccess;
use crate::service::Service;
use crate::task_definition::{EnvUpdateMode, EnvironmentUpdate, Overrides};
use crate::trigger::{self, RetryPolicy, DEFAULT_RETRY_COUNT};
use crate::watcher::{self, WaitConfig, WaitOutcome, DEFAULT_WAIT_TIMEOUT};

const TASK_DEFINITION_ARN_PATH: &str = "taskDefinition/taskDefinitionArn";

/// Everything needed to roll a service forward to a new task definition.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct UpdateRequest {
    pub cluster: String,
    #[serde(alias = "service")]
    pub service_id: String,
    #[serde(default, alias = "image")]
    pub image_name: Option<String>,
    /// Credentials profile, consumed by the control plane client.
    #[serde(default)]
    pub profile: Option<String>,
    #[serde(default)]
    pub memory: Option<u32>,
    #[serde(default)]
    pub cpu: Option<u32>,
    #[serde(default)]
    pub env_vars: Option<EnvironmentUpdate>,
    #[serde(default)]
    pub env_update_mode: EnvUpdateMode,
    #[serde(default)]
    pub wait: bool,
    #[serde(default = "default_wait_timeout_secs")]
    pub wait_timeout_secs: u64,
    #[serde(default = "default_wait_retry_count")]
    pub wait_retry_count: u32,
    #[serde(default)]
    pub log_options: Option<Value>,
    #[serde(default)]
    pub cmd: Option<String>,
    /// Existing task definition to deploy as is. Skips mutation and registration.
    #[serde(default, alias = "task_definition")]
    pub name: Option<String>,
    #[serde(default)]
    pub hide_events: bool,
    #[serde(default)]
    pub container_name: Option<String>,
}

fn default_wait_timeout_secs() -> u64 {
    DEFAULT_WAIT_TIMEOUT.as_secs()
}

fn default_wait_retry_count() -> u32 {
    DEFAULT_RETRY_COUNT
}

impl UpdateRequest {
    pub fn new(cluster: impl Into<String>, service_id: impl Into<String>) -> Self {
        Self {
            cluster: cluster.into(),
            service_id: service_id.into(),
            image_name: None,
            profile: None,
            memory: None,
            cpu: None,
            env_vars: None,
            env_update_mode: EnvUpdateMode::default(),
            wait: false,
            wait_timeout_secs: default_wait_timeout_secs(),
            wait_retry_count: default_wait_retry_count(),
            log_options: None,
            cmd: None,
            name: None,
            hide_events: false,
            container_name: None,
        }
    }

    #[tracing::instrument(name = "UpdateRequest::from_file", skip_all, fields(
        file_path = ?file_path.as_ref()
    ))]
    pub async fn from_file(file_path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let file_contents = tokio::fs::read_to_string(file_path.as_ref())
            .await
            .with_context(|| format!("reading {}", file_path.as_ref().display()))?;

        let request: UpdateRequest = serde_yaml::from_str(&file_contents)?;

        Ok(request)
    }

    pub fn overrides(&self) -> Overrides {
        Overrides {
            image: self.image_name.clone(),
            memory: self.memory,
            cpu: self.cpu,
            environment: self.env_vars.clone(),
            env_update_mode: self.env_update_mode,
            log_configuration: self.log_options.clone(),
            command: self.cmd.clone(),
        }
    }

    pub fn wait_config(&self) -> WaitConfig {
        WaitConfig {
            timeout: Duration::from_secs(self.wait_timeout_secs),
            retry: RetryPolicy::new(self.wait_retry_count),
            hide_events: self.hide_events,
            ..WaitConfig::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct UpdateOutcome {
    pub task_definition_id: String,
    /// The service as returned by the update call.
    pub service: Service,
    /// Present when the request asked to wait for the deployment.
    pub wait: Option<WaitOutcome>,
}

/// Rolls the service forward: builds and registers a new task definition
/// revision (unless one is named explicitly), points the service at it and,
/// when asked to, waits for the previous deployments to drain.
#[tracing::instrument(name = "updater::update_service", skip_all, fields(
    cluster = %request.cluster,
    service_id = %request.service_id
))]
pub async fn update_service(
    control_plane: &dyn ControlPlane,
    request: &UpdateRequest,
    cancel: &CancellationToken,
) -> Result<UpdateOutcome> {
    update_service_with(control_plane, request, request.wait_config(), cancel).await
}

/// Same as [`update_service`] with explicit wait tunables.
pub async fn update_service_with(
    control_plane: &dyn ControlPlane,
    request: &UpdateRequest,
    wait_config: WaitConfig,
    cancel: &CancellationToken,
) -> Result<UpdateOutcome> {
    let current =
        trigger::check_service(control_plane, &request.cluster, &request.service_id).await?;

    let task_definition_id = match &request.name {
        Some(name) => name.clone(),
        None => register_revision(control_plane, &current, request).await?,
    };

    let service = trigger::trigger_update(
        control_plane,
        &request.cluster,
        &request.service_id,
        &task_definition_id,
        RetryPolicy {
            attempts: request.wait_retry_count,
            delay: wait_config.retry.delay,
        },
    )
    .await?;

    let wait = if request.wait {
        Some(
            watcher::wait_for_deployment(
                control_plane,
                &request.cluster,
                &request.service_id,
                &service,
                &wait_config,
                cancel,
            )
            .await?,
        )
    } else {
        None
    };

    Ok(UpdateOutcome {
        task_definition_id,
        service,
        wait,
    })
}

/// Registers a copy of the service's current task definition with the
/// request's overrides applied and returns the new revision's identifier.
#[tracing::instrument(name = "updater::register_revision", skip_all, fields(
    current_task_definition = %service.task_definition
))]
async fn register_revision(
    control_plane: &dyn ControlPlane,
    service: &Service,
    request: &UpdateRequest,
) -> Result<String> {
    let task_definition = control_plane
        .describe_task_definition(&service.task_definition)
        .await?;

    let container_definitions =
        task_definition.apply_overrides(request.container_name.as_deref(), &request.overrides())?;

    let registration = RegisterTaskDefinition {
        family: task_definition.family.clone(),
        task_role_arn: task_definition.task_role_arn.clone(),
        execution_role_arn: task_definition.execution_role_arn.clone(),
        container_definitions,
        volumes: task_definition.volumes.clone(),
        task_settings: task_definition.registerable_fields(),
    };

    info!(family = %registration.family, "registering task definition revision");

    let response = PathAccess::new(
        control_plane
            .register_task_definition(&registration)
            .await?,
    );

    response
        .get(TASK_DEFINITION_ARN_PATH)
        .and_then(Value::as_str)
        .map(str::to_owned)
        .ok_or_else(|| {
            UpdateError::NotFound(format!(
                "registered task definition for family {} has no {}",
                registration.family, TASK_DEFINITION_ARN_PATH
            ))
        })
}
