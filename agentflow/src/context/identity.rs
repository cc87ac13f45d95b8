//! Run identity for tracking pipeline executions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

/// Identifies one pipeline run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunIdentity {
    /// The unique ID for this pipeline run.
    pub pipeline_run_id: Uuid,

    /// The caller's request ID, when one request fans out into several runs.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<Uuid>,

    /// When the run started.
    pub started_at: DateTime<Utc>,
}

impl Default for RunIdentity {
    fn default() -> Self {
        Self::new()
    }
}

impl RunIdentity {
    /// Creates a new run identity with a generated pipeline run ID.
    #[must_use]
    pub fn new() -> Self {
        Self::with_pipeline_run_id(Uuid::new_v4())
    }

    /// Creates a run identity with a specific pipeline run ID.
    #[must_use]
    pub fn with_pipeline_run_id(pipeline_run_id: Uuid) -> Self {
        Self {
            pipeline_run_id,
            request_id: None,
            started_at: Utc::now(),
        }
    }

    /// Sets the request ID.
    #[must_use]
    pub fn with_request_id(mut self, request_id: Uuid) -> Self {
        self.request_id = Some(request_id);
        self
    }

    /// Converts to a dictionary with string values (or null).
    #[must_use]
    pub fn to_dict(&self) -> HashMap<String, serde_json::Value> {
        let mut map = HashMap::new();
        map.insert(
            "pipeline_run_id".to_string(),
            serde_json::json!(self.pipeline_run_id.to_string()),
        );
        map.insert(
            "request_id".to_string(),
            self.request_id
                .map_or(serde_json::Value::Null, |id| serde_json::json!(id.to_string())),
        );
        map.insert(
            "started_at".to_string(),
            serde_json::json!(self.started_at.to_rfc3339()),
        );
        map
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_identity_new_is_unique() {
        let a = RunIdentity::new();
        let b = RunIdentity::new();
        assert_ne!(a.pipeline_run_id, b.pipeline_run_id);
        assert_eq!(a.pipeline_run_id.get_version_num(), 4);
        assert!(a.request_id.is_none());
    }

    #[test]
    fn test_run_identity_to_dict() {
        let request_id = Uuid::new_v4();
        let identity = RunIdentity::new().with_request_id(request_id);
        let dict = identity.to_dict();

        assert_eq!(dict["request_id"], serde_json::json!(request_id.to_string()));
        assert!(!dict["pipeline_run_id"].is_null());
        assert!(dict["started_at"].as_str().is_some());
    }

    #[test]
    fn test_run_identity_serialization() {
        let identity = RunIdentity::new();
        let json = serde_json::to_string(&identity).unwrap();
        assert!(!json.contains("request_id"));

        let deserialized: RunIdentity = serde_json::from_str(&json).unwrap();
        assert_eq!(identity, deserialized);
    }
}
