use chrono::{DateTime, Utc};
use std::collections::HashSet;
use std::time::Duration;
use tokio::select;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::control_plane::ControlPlane;
use crate::error::{Result, UpdateError};
use crate::service::{DeploymentId, Event, EventId, Service};
use crate::trigger::RetryPolicy;

pub const DEFAULT_WAIT_TIMEOUT: Duration = Duration::from_secs(120);
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WaitConfig {
    pub timeout: Duration,
    /// Budget for failed polls over the whole wait.
    pub retry: RetryPolicy,
    pub hide_events: bool,
    pub poll_interval: Duration,
}

impl Default for WaitConfig {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_WAIT_TIMEOUT,
            retry: RetryPolicy::default(),
            hide_events: false,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct WaitOutcome {
    /// Number of times the service was fetched, failed fetches included.
    pub polls: u32,
    /// Events reported while waiting, oldest first.
    pub events: Vec<Event>,
}

/// Tracks the deployments that were active when the update was triggered
/// and the service events already reported.
#[derive(Debug, Clone, PartialEq)]
pub struct DeploymentWatcher {
    /// The deployment is complete once none of these is active anymore.
    monitored: HashSet<DeploymentId>,
    /// Events older than the oldest non-active deployment belong to earlier rollouts.
    baseline: Option<DateTime<Utc>>,
    last_event_id: Option<EventId>,
}

impl DeploymentWatcher {
    pub fn new(snapshot: &Service) -> Self {
        let mut monitored = HashSet::new();
        let mut baseline: Option<DateTime<Utc>> = None;

        for deployment in snapshot.deployments.iter() {
            if deployment.is_active() {
                info!("Monitoring active deployment: {}", deployment.id);
                monitored.insert(deployment.id.clone());
            } else if baseline.map_or(true, |date| deployment.created_at < date) {
                baseline = Some(deployment.created_at);
            }
        }

        Self {
            monitored,
            baseline,
            last_event_id: None,
        }
    }

    pub fn is_done(&self, service: &Service) -> bool {
        !service
            .active_deployments()
            .any(|deployment| self.monitored.contains(&deployment.id))
    }

    /// Returns the events not reported yet, oldest first.
    pub fn new_events(&mut self, service: &Service) -> Vec<Event> {
        let mut events = Vec::new();

        // The feed is newest first: stop at the newest event seen in a previous poll.
        for event in service.events.iter() {
            if self.last_event_id.as_ref() == Some(&event.id) {
                break;
            }
            if self.baseline.map_or(true, |date| event.created_at >= date) {
                events.push(event.clone());
            }
        }

        if let Some(newest) = events.first() {
            self.last_event_id = Some(newest.id.clone());
        }

        events.reverse();
        events
    }
}

/// Polls the service until every deployment active in `snapshot` is gone.
#[tracing::instrument(name = "watcher::wait_for_deployment", skip_all, fields(
    cluster = %cluster,
    service_id = %service_id,
    timeout_secs = config.timeout.as_secs()
))]
pub async fn wait_for_deployment(
    control_plane: &dyn ControlPlane,
    cluster: &str,
    service_id: &str,
    snapshot: &Service,
    config: &WaitConfig,
    cancel: &CancellationToken,
) -> Result<WaitOutcome> {
    info!("Waiting for ECS to complete the deployment");

    let mut watcher = DeploymentWatcher::new(snapshot);
    let mut outcome = WaitOutcome::default();
    let mut failures = 0;
    let start = Instant::now();

    loop {
        if cancel.is_cancelled() {
            return Err(UpdateError::Cancelled);
        }

        let elapsed = start.elapsed();
        info!(
            "Waiting for ECS to complete the deployment {} second(s)...",
            elapsed.as_secs()
        );
        if elapsed > config.timeout {
            return Err(UpdateError::Timeout { waited: elapsed });
        }

        outcome.polls += 1;
        let service = match control_plane.describe_service(cluster, service_id).await {
            Ok(Some(service)) => service,
            Ok(None) => {
                return Err(UpdateError::NotFound(format!(
                    "service {service_id} does not exist"
                )))
            }
            Err(error) => {
                failures += 1;
                warn!(failures, "{error:#}");
                if config.retry.exhausted(failures) {
                    return Err(UpdateError::RetryExhausted(error));
                }
                pause(config.retry.delay, cancel).await?;
                continue;
            }
        };

        if watcher.is_done(&service) {
            info!("Deployed successfully!");
            return Ok(outcome);
        }

        if !config.hide_events {
            for event in watcher.new_events(&service) {
                info!("Event {}   {}:   {}", event.id, event.created_at, event.message);
                outcome.events.push(event);
            }
        }

        pause(config.poll_interval, cancel).await?;
    }
}

async fn pause(duration: Duration, cancel: &CancellationToken) -> Result<()> {
    select! {
        _ = cancel.cancelled() => Err(UpdateError::Cancelled),
        _ = tokio::time::sleep(duration) => Ok(()),
    }
}
