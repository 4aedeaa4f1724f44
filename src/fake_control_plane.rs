use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use serde_json::{json, Value};
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use crate::control_plane::{ControlPlane, RegisterTaskDefinition};
use crate::service::{Deployment, Event, Service};
use crate::task_definition::TaskDefinition;

pub type Scripted<T> = std::result::Result<T, String>;

/// In-memory control plane that replays scripted responses and records calls.
///
/// The last scripted `describe_service` response is repeated once the
/// script runs out.
#[derive(Default)]
pub struct FakeControlPlane {
    describe_service_responses: Mutex<VecDeque<Scripted<Option<Service>>>>,
    update_service_responses: Mutex<VecDeque<Scripted<Service>>>,
    task_definitions: Mutex<HashMap<String, TaskDefinition>>,
    pub describe_service_calls: Mutex<u32>,
    pub registered: Mutex<Vec<RegisterTaskDefinition>>,
    pub update_calls: Mutex<Vec<(String, String, String)>>,
}

impl FakeControlPlane {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn describe_service_returns(self, response: Scripted<Option<Service>>) -> Self {
        self.describe_service_responses
            .lock()
            .unwrap()
            .push_back(response);
        self
    }

    pub fn update_service_returns(self, response: Scripted<Service>) -> Self {
        self.update_service_responses
            .lock()
            .unwrap()
            .push_back(response);
        self
    }

    pub fn with_task_definition(self, id: &str, task_definition: TaskDefinition) -> Self {
        self.task_definitions
            .lock()
            .unwrap()
            .insert(id.to_owned(), task_definition);
        self
    }

    pub fn describe_service_count(&self) -> u32 {
        *self.describe_service_calls.lock().unwrap()
    }

    pub fn update_count(&self) -> usize {
        self.update_calls.lock().unwrap().len()
    }
}

#[async_trait]
impl ControlPlane for FakeControlPlane {
    async fn describe_service(&self, _cluster: &str, _service_id: &str) -> Result<Option<Service>> {
        *self.describe_service_calls.lock().unwrap() += 1;

        let mut responses = self.describe_service_responses.lock().unwrap();
        let response = if responses.len() > 1 {
            responses.pop_front().unwrap()
        } else {
            responses.front().cloned().unwrap_or(Ok(None))
        };

        response.map_err(|message| anyhow!(message))
    }

    async fn describe_task_definition(&self, task_definition_id: &str) -> Result<TaskDefinition> {
        self.task_definitions
            .lock()
            .unwrap()
            .get(task_definition_id)
            .cloned()
            .ok_or_else(|| anyhow!("unable to describe task definition {task_definition_id}"))
    }

    async fn register_task_definition(&self, request: &RegisterTaskDefinition) -> Result<Value> {
        let mut registered = self.registered.lock().unwrap();
        registered.push(request.clone());

        let arn = format!(
            "arn:aws:ecs:eu-west-1:123456789012:task-definition/{}:{}",
            request.family,
            registered.len()
        );

        Ok(json!({ "taskDefinition": { "taskDefinitionArn": arn, "family": request.family } }))
    }

    async fn update_service(
        &self,
        cluster: &str,
        service_id: &str,
        task_definition_id: &str,
    ) -> Result<Service> {
        self.update_calls.lock().unwrap().push((
            cluster.to_owned(),
            service_id.to_owned(),
            task_definition_id.to_owned(),
        ));

        match self.update_service_responses.lock().unwrap().pop_front() {
            Some(response) => response.map_err(|message| anyhow!(message)),
            None => Ok(service(
                task_definition_id,
                vec![deployment("primary", "PRIMARY", 100)],
                vec![],
            )),
        }
    }
}

pub fn at(seconds: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(1_700_000_000 + seconds, 0).unwrap()
}

pub fn service(task_definition: &str, deployments: Vec<Deployment>, events: Vec<Event>) -> Service {
    Service {
        service_name: "s1".to_owned(),
        status: "ACTIVE".to_owned(),
        task_definition: task_definition.to_owned(),
        deployments,
        events,
    }
}

pub fn deployment(id: &str, status: &str, created_at: i64) -> Deployment {
    Deployment {
        id: id.to_owned(),
        status: status.to_owned(),
        created_at: at(created_at),
    }
}

pub fn event(id: &str, created_at: i64) -> Event {
    Event {
        id: id.to_owned(),
        created_at: at(created_at),
        message: format!("message {id}"),
    }
}
