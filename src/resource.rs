//! Request and result types of the host resource protocol.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::job::JobId;

/// Verb a progress result belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Operation {
    Create,
    Update,
    Delete,
    CheckStatus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OperationStatus {
    InProgress,
    Success,
    Failure,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OperationErrorCode {
    NotFound,
    InvalidRequest,
    InternalFailure,
}

/// Outcome of Create, Update, Delete and Status.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressResult {
    pub operation: Operation,
    pub operation_status: OperationStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_id: Option<JobId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub native_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_properties: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_code: Option<OperationErrorCode>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status_message: Option<String>,
}

impl ProgressResult {
    fn with_status(operation: Operation, operation_status: OperationStatus) -> Self {
        Self {
            operation,
            operation_status,
            request_id: None,
            native_id: None,
            resource_properties: None,
            error_code: None,
            status_message: None,
        }
    }

    pub fn in_progress(operation: Operation) -> Self {
        Self::with_status(operation, OperationStatus::InProgress)
    }

    pub fn success(operation: Operation) -> Self {
        Self::with_status(operation, OperationStatus::Success)
    }

    pub fn failure(operation: Operation, code: OperationErrorCode, message: impl Into<String>) -> Self {
        let mut result = Self::with_status(operation, OperationStatus::Failure);
        result.error_code = Some(code);
        let message = message.into();
        if !message.is_empty() {
            result.status_message = Some(message);
        }
        result
    }

    pub fn request_id(mut self, id: JobId) -> Self {
        self.request_id = Some(id);
        self
    }

    pub fn native_id(mut self, id: impl Into<String>) -> Self {
        self.native_id = Some(id.into());
        self
    }

    pub fn properties(mut self, props: serde_json::Value) -> Self {
        self.resource_properties = Some(props);
        self
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CreateRequest {
    pub resource_type: String,
    pub label: String,
    pub properties: serde_json::Value,
    pub target_config: serde_json::Value,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ReadRequest {
    pub resource_type: String,
    pub native_id: String,
    pub target_config: serde_json::Value,
}

/// Read never fails as a call; absence and errors are flagged in `error_code`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadResult {
    pub resource_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub properties: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_code: Option<OperationErrorCode>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UpdateRequest {
    pub resource_type: String,
    pub native_id: String,
    pub prior_properties: serde_json::Value,
    pub desired_properties: serde_json::Value,
    pub target_config: serde_json::Value,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DeleteRequest {
    pub resource_type: String,
    pub native_id: String,
    pub target_config: serde_json::Value,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StatusRequest {
    pub resource_type: String,
    pub request_id: String,
    pub target_config: serde_json::Value,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ListRequest {
    pub resource_type: String,
    pub target_config: serde_json::Value,
    pub additional_properties: HashMap<String, String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListResult {
    pub native_ids: Vec<String>,
    pub next_page_token: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RateLimitScope {
    Namespace,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RateLimitConfig {
    pub scope: RateLimitScope,
    pub max_requests_per_second_for_namespace: u32,
}

/// Excludes discovered resources whose properties match `query`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchFilter {
    pub query: String,
}

/// Where to find a human-readable label in discovered properties.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LabelConfig {
    pub default_query: String,
}

/// One line on the serve channel.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "verb", rename_all = "snake_case")]
pub enum Request {
    Create(CreateRequest),
    Read(ReadRequest),
    Update(UpdateRequest),
    Delete(DeleteRequest),
    Status(StatusRequest),
    List(ListRequest),
}

#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum Response {
    Progress(ProgressResult),
    Read(ReadResult),
    List(ListResult),
    Error { error: String },
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn request_lines_decode_by_verb() {
        let line = json!({
            "verb": "delete",
            "nativeId": "/upload/a.txt",
            "targetConfig": {"url": "sftp://localhost:2222"}
        });
        match serde_json::from_value::<Request>(line).unwrap() {
            Request::Delete(req) => {
                assert_eq!(req.native_id, "/upload/a.txt");
                assert_eq!(req.target_config["url"], "sftp://localhost:2222");
            }
            other => panic!("unexpected request: {other:?}"),
        }
    }

    #[test]
    fn failure_omits_empty_fields() {
        let result = ProgressResult::failure(Operation::Delete, OperationErrorCode::NotFound, "")
            .native_id("/upload/missing.txt");
        let json = serde_json::to_value(Response::Progress(result)).unwrap();
        assert_eq!(
            json,
            json!({
                "operation": "Delete",
                "operationStatus": "Failure",
                "nativeId": "/upload/missing.txt",
                "errorCode": "NotFound"
            })
        );
    }

    #[test]
    fn list_result_always_has_page_token() {
        let json = serde_json::to_value(ListResult::default()).unwrap();
        assert_eq!(json, json!({"nativeIds": [], "nextPageToken": null}));
    }
}
