use std::time::Duration;
use tracing::{info, warn};

use crate::control_plane::ControlPlane;
use crate::error::{Result, UpdateError};
use crate::service::Service;

pub const DEFAULT_RETRY_COUNT: u32 = 10;
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(1);

/// How many times a control plane call is attempted, first attempt included,
/// and how long to sleep between attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub attempts: u32,
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: DEFAULT_RETRY_COUNT,
            delay: DEFAULT_RETRY_DELAY,
        }
    }
}

impl RetryPolicy {
    pub fn new(attempts: u32) -> Self {
        Self {
            attempts,
            ..Self::default()
        }
    }

    /// True once `failures` consecutive failures used up the budget.
    /// A budget of zero still allows the first attempt.
    pub fn exhausted(&self, failures: u32) -> bool {
        failures >= self.attempts.max(1)
    }
}

/// Fetches the service and makes sure it can accept an update.
#[tracing::instrument(name = "trigger::check_service", skip_all, fields(
    cluster = %cluster,
    service_id = %service_id
))]
pub async fn check_service(
    control_plane: &dyn ControlPlane,
    cluster: &str,
    service_id: &str,
) -> Result<Service> {
    let service = control_plane
        .describe_service(cluster, service_id)
        .await?
        .ok_or_else(|| {
            UpdateError::NotFound(format!(
                "service {service_id} not found in cluster {cluster}"
            ))
        })?;

    if !service.is_active() {
        return Err(UpdateError::InvalidState {
            service: service_id.to_owned(),
            cluster: cluster.to_owned(),
            status: service.status,
        });
    }

    Ok(service)
}

/// Points the service at `task_definition_id`, retrying failed calls.
///
/// Once the budget is spent the last control plane error is returned as is.
#[tracing::instrument(name = "trigger::trigger_update", skip_all, fields(
    cluster = %cluster,
    service_id = %service_id,
    task_definition_id = %task_definition_id
))]
pub async fn trigger_update(
    control_plane: &dyn ControlPlane,
    cluster: &str,
    service_id: &str,
    task_definition_id: &str,
    policy: RetryPolicy,
) -> Result<Service> {
    info!("Task definition name: {task_definition_id}");

    let mut failures = 0;
    let service = loop {
        match control_plane
            .update_service(cluster, service_id, task_definition_id)
            .await
        {
            Ok(service) => break service,
            Err(error) => {
                failures += 1;
                warn!(failures, "Service update failed: {error:#}");

                if policy.exhausted(failures) {
                    return Err(UpdateError::RetryExhausted(error));
                }

                tokio::time::sleep(policy.delay).await;
                info!("Retrying...");
            }
        }
    };

    info!("updated service {service_id} in cluster {cluster}");

    Ok(service)
}
