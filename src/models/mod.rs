pub mod task;
pub mod user;

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::AppError;

pub use task::{
    NewTask, SortBy, SortDirection, SortField, Task, TaskFilter, TaskListQuery, TaskUpdate,
    TASK_UPDATE_FIELDS,
};
pub use user::{NewUser, PublicUser, User, UserUpdate, USER_UPDATE_FIELDS};

/// Parses a partial update, rejecting the whole body if any key falls outside
/// `allowed`. The rejected keys are reported sorted.
pub fn parse_update<T: DeserializeOwned>(body: Value, allowed: &[&str]) -> Result<T, AppError> {
    let map = match body {
        Value::Object(map) => map,
        _ => return Err(AppError::BadRequest("Update body must be a JSON object".into())),
    };

    let mut rejected: Vec<String> = map
        .keys()
        .filter(|key| !allowed.contains(&key.as_str()))
        .cloned()
        .collect();
    if !rejected.is_empty() {
        rejected.sort();
        return Err(AppError::InvalidUpdate(rejected));
    }

    serde_json::from_value(Value::Object(map))
        .map_err(|e| AppError::BadRequest(format!("Invalid update: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_update_rejects_whole_body() {
        let result: Result<TaskUpdate, _> = parse_update(
            json!({ "description": "x", "owner": "other", "_id": "1" }),
            TASK_UPDATE_FIELDS,
        );
        match result {
            Err(AppError::InvalidUpdate(fields)) => assert_eq!(fields, vec!["_id", "owner"]),
            other => panic!("expected InvalidUpdate, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_update_accepts_listed_fields() {
        let update: TaskUpdate =
            parse_update(json!({ "completed": true }), TASK_UPDATE_FIELDS).unwrap();
        assert_eq!(update.completed, Some(true));
        assert_eq!(update.description, None);
    }

    #[test]
    fn test_parse_update_rejects_wrong_types_and_non_objects() {
        let wrong_type: Result<TaskUpdate, _> =
            parse_update(json!({ "completed": "yes" }), TASK_UPDATE_FIELDS);
        assert!(matches!(wrong_type, Err(AppError::BadRequest(_))));

        let not_object: Result<UserUpdate, _> = parse_update(json!(["name"]), USER_UPDATE_FIELDS);
        assert!(matches!(not_object, Err(AppError::BadRequest(_))));
    }
}
