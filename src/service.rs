use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub type DeploymentId = String;
pub type EventId = String;

pub const STATUS_ACTIVE: &str = "ACTIVE";

/// Snapshot of a service as reported by the cluster manager.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Service {
    #[serde(default)]
    pub service_name: String,
    pub status: String,
    #[serde(default)]
    pub task_definition: String,
    #[serde(default)]
    pub deployments: Vec<Deployment>,
    /// Newest first.
    #[serde(default)]
    pub events: Vec<Event>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Deployment {
    pub id: DeploymentId,
    pub status: String,
    #[serde(with = "timestamp")]
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    pub id: EventId,
    #[serde(with = "timestamp")]
    pub created_at: DateTime<Utc>,
    pub message: String,
}

impl Service {
    pub fn is_active(&self) -> bool {
        self.status == STATUS_ACTIVE
    }

    pub fn active_deployments(&self) -> impl Iterator<Item = &Deployment> {
        self.deployments.iter().filter(|deployment| deployment.is_active())
    }
}

impl Deployment {
    pub fn is_active(&self) -> bool {
        self.status == STATUS_ACTIVE
    }
}

/// Timestamps come either as RFC 3339 strings or as epoch seconds with a
/// fractional part, depending on the cli's `cli_timestamp_format`.
mod timestamp {
    use chrono::{DateTime, TimeZone, Utc};
    use serde::{de::Error, Deserialize, Deserializer, Serialize, Serializer};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Text(DateTime<Utc>),
        Seconds(f64),
    }

    pub fn serialize<S: Serializer>(value: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
        value.serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
        match Raw::deserialize(deserializer)? {
            Raw::Text(value) => Ok(value),
            Raw::Seconds(seconds) => {
                let whole = seconds.floor();
                // Whole microseconds: an f64 epoch cannot hold more precision.
                let micros = ((seconds - whole) * 1e6).round().min(999_999.0) as u32;
                Utc.timestamp_opt(whole as i64, micros * 1_000)
                    .single()
                    .ok_or_else(|| D::Error::custom(format!("timestamp {seconds} is out of range")))
            }
        }
    }
}
