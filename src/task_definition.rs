use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use tracing::{info, warn};

use crate::error::UpdateError;

pub type ContainerName = String;
pub type EnvironmentUpdate = BTreeMap<String, String>;

/// Task-level fields carried over verbatim when a new revision is registered.
/// Read-only fields such as `revision`, `status` or `registeredAt` are left out.
pub const REGISTERABLE_FIELDS: &[&str] = &[
    "networkMode",
    "requiresCompatibilities",
    "cpu",
    "memory",
    "placementConstraints",
    "pidMode",
    "ipcMode",
    "proxyConfiguration",
    "inferenceAccelerators",
    "ephemeralStorage",
    "runtimePlatform",
];

/// A registered task definition revision, as returned by the control plane.
///
/// Fields this crate does not model are kept in `extra`; the registerable
/// ones are forwarded by [`TaskDefinition::registerable_fields`].
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskDefinition {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_definition_arn: Option<String>,
    pub family: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_role_arn: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub execution_role_arn: Option<String>,
    #[serde(default)]
    pub container_definitions: Vec<ContainerDefinition>,
    #[serde(default)]
    pub volumes: Vec<Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContainerDefinition {
    pub name: ContainerName,
    #[serde(default)]
    pub image: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub memory: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cpu: Option<u32>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub environment: Vec<EnvironmentVariable>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_configuration: Option<Value>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub command: Vec<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvironmentVariable {
    pub name: String,
    pub value: String,
}

impl EnvironmentVariable {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// How an environment update is applied to a container.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EnvUpdateMode {
    /// Replace the whole environment with the update.
    #[default]
    All,
    /// Overwrite only the variables the container already defines.
    Merge,
}

/// The fields to change in every selected container. `None` leaves the field as is.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Overrides {
    pub image: Option<String>,
    pub memory: Option<u32>,
    pub cpu: Option<u32>,
    pub environment: Option<EnvironmentUpdate>,
    pub env_update_mode: EnvUpdateMode,
    pub log_configuration: Option<Value>,
    pub command: Option<String>,
}

impl TaskDefinition {
    /// The identifier used in error messages: the ARN when known, the family otherwise.
    pub fn id(&self) -> &str {
        self.task_definition_arn.as_deref().unwrap_or(&self.family)
    }

    /// The unmodelled task-level settings a new revision must inherit.
    pub fn registerable_fields(&self) -> Map<String, Value> {
        self.extra
            .iter()
            .filter(|(key, _)| REGISTERABLE_FIELDS.contains(&key.as_str()))
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect()
    }

    /// Applies `overrides` to the containers matching `container_name`
    /// (every container when no filter is given) and returns the resulting
    /// container definitions. `self` is left untouched.
    #[tracing::instrument(name = "TaskDefinition::apply_overrides", skip_all, fields(
        task_definition = %self.id(),
        container_name = ?container_name
    ))]
    pub fn apply_overrides(
        &self,
        container_name: Option<&str>,
        overrides: &Overrides,
    ) -> Result<Vec<ContainerDefinition>, UpdateError> {
        let mut containers = self.container_definitions.clone();
        let mut container_found = false;

        for container in containers
            .iter_mut()
            .filter(|container| container_name.map_or(true, |name| name == container.name))
        {
            container_found = true;
            info!(container = %container.name, "applying overrides to container");
            container.apply(overrides);
        }

        if !container_found {
            let message = match container_name {
                Some(name) => format!(
                    "container {} not found in task definition {}",
                    name,
                    self.id()
                ),
                None => format!("no containers found in task definition {}", self.id()),
            };
            return Err(UpdateError::NotFound(message));
        }

        Ok(containers)
    }
}

impl ContainerDefinition {
    fn apply(&mut self, overrides: &Overrides) {
        if let Some(image) = overrides.image.as_ref().filter(|image| !image.is_empty()) {
            self.image = image.clone();
        }
        if let Some(memory) = overrides.memory {
            self.memory = Some(memory);
        }
        if let Some(cpu) = overrides.cpu {
            self.cpu = Some(cpu);
        }
        if let Some(update) = &overrides.environment {
            self.update_environment(update, overrides.env_update_mode);
        }
        if let Some(log_configuration) = overrides
            .log_configuration
            .as_ref()
            .filter(|config| !config.is_null())
        {
            self.log_configuration = Some(log_configuration.clone());
        }
        if let Some(command) = overrides.command.as_ref().filter(|cmd| !cmd.is_empty()) {
            self.command = vec![command.clone()];
        }
    }

    fn update_environment(&mut self, update: &EnvironmentUpdate, mode: EnvUpdateMode) {
        if mode == EnvUpdateMode::All || self.environment.is_empty() {
            self.environment = update
                .iter()
                .map(|(name, value)| EnvironmentVariable::new(name, value))
                .collect();
            return;
        }

        for variable in self.environment.iter_mut() {
            if let Some(value) = update.get(&variable.name) {
                variable.value = value.clone();
            }
        }

        // Keys without a matching variable are not appended in merge mode.
        let ignored: Vec<_> = update
            .keys()
            .filter(|name| !self.environment.iter().any(|v| &&v.name == name))
            .collect();
        if !ignored.is_empty() {
            warn!(container = %self.name, ?ignored, "merge mode ignored variables the container does not define");
        }
    }
}
