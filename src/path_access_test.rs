use anyhow::Result;
use serde_json::json;

#[cfg(test)]
mod path_access_tests {
    use crate::path_access::{PathAccess, PathError};

    use super::*;

    #[test]
    fn gets_nested_value() {
        let access = PathAccess::new(json!({
            "taskDefinition": { "taskDefinitionArn": "arn:td:1" }
        }));

        assert_eq!(
            Some(&json!("arn:td:1")),
            access.get("taskDefinition/taskDefinitionArn")
        );
        assert!(access.exists("taskDefinition"));
    }

    #[test]
    fn missing_intermediate_segment_is_absent() {
        let access = PathAccess::new(json!({ "a": { "b": 1 } }));

        assert_eq!(None, access.get("a/x/y"));
        assert_eq!(None, access.get("a/b/c"));
        assert!(!access.exists("x"));
    }

    #[test]
    fn walks_into_arrays_by_index() {
        let access = PathAccess::new(json!({ "services": [{ "status": "ACTIVE" }] }));

        assert_eq!(Some(&json!("ACTIVE")), access.get("services/0/status"));
        assert_eq!(None, access.get("services/1/status"));
    }

    #[test]
    fn set_without_create_fails_on_missing_segment() {
        let mut access = PathAccess::new(json!({ "a": {} }));

        let error = access.set("a/b/c", json!(1), false).unwrap_err();

        assert_eq!(PathError::NotFound("b".to_owned()), error);
        assert!(!access.exists("a/b"));
    }

    #[test]
    fn set_with_create_builds_intermediate_mappings() -> Result<()> {
        let mut access = PathAccess::new(json!({}));

        access.set("a/b/c", json!("value"), true)?;

        assert_eq!(Some(&json!("value")), access.get("a/b/c"));
        assert_eq!(json!({ "a": { "b": { "c": "value" } } }), access.into_inner());

        Ok(())
    }

    #[test]
    fn set_overwrites_existing_value() -> Result<()> {
        let mut access = PathAccess::new(json!({ "a": { "b": 1, "keep": true } }));

        access.set("a/b", json!(2), false)?;

        assert_eq!(Some(&json!(2)), access.get("a/b"));
        assert_eq!(Some(&json!(true)), access.get("a/keep"));

        Ok(())
    }

    #[test]
    fn set_through_scalar_fails() {
        let mut access = PathAccess::new(json!({ "a": 1 }));

        assert_eq!(
            PathError::NotAMapping("a".to_owned()),
            access.set("a/b", json!(2), true).unwrap_err()
        );
    }

    #[test]
    fn exists_is_false_for_unset_path() {
        let access = PathAccess::new(json!({ "a": null }));

        assert!(!access.exists("b"));
        assert!(access.exists("a"));
    }
}
