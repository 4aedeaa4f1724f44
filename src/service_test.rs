use anyhow::Result;
use serde_json::json;

#[cfg(test)]
mod service_decoding_tests {
    use crate::service::Service;

    use super::*;

    fn describe_output(created_at: serde_json::Value) -> serde_json::Value {
        json!({
            "serviceName": "s1",
            "status": "ACTIVE",
            "taskDefinition": "arn:td:2",
            "deployments": [{ "id": "d1", "status": "PRIMARY", "createdAt": created_at }],
            "events": [{ "id": "e1", "createdAt": created_at, "message": "steady state" }]
        })
    }

    #[test]
    fn decodes_epoch_seconds_with_fraction() -> Result<()> {
        let service: Service = serde_json::from_value(describe_output(json!(1700000000.123)))?;

        assert_eq!(1_700_000_000_123, service.deployments[0].created_at.timestamp_millis());
        assert_eq!(1_700_000_000_123, service.events[0].created_at.timestamp_millis());

        Ok(())
    }

    #[test]
    fn decodes_whole_epoch_seconds() -> Result<()> {
        let service: Service = serde_json::from_value(describe_output(json!(1700000000)))?;

        assert_eq!(1_700_000_000, service.deployments[0].created_at.timestamp());

        Ok(())
    }

    #[test]
    fn decodes_rfc3339_strings() -> Result<()> {
        let service: Service =
            serde_json::from_value(describe_output(json!("2023-11-14T22:13:20.123000+00:00")))?;

        assert_eq!(1_700_000_000_123, service.deployments[0].created_at.timestamp_millis());

        Ok(())
    }

    #[test]
    fn rejects_other_timestamp_shapes() {
        assert!(serde_json::from_value::<Service>(describe_output(json!(true))).is_err());
    }
}
