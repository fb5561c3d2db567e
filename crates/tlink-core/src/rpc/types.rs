//! Wire types exchanged with the TestLink API.
//!
//! TestLink is loose about JSON types: ids arrive as strings or numbers and
//! flags as `"0"`/`"1"`, so the numeric fields go through lenient
//! deserializers.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// A test project.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TestProject {
    #[serde(deserialize_with = "de_id")]
    pub id: u64,
    pub name: String,
    /// Prefix of the project's test case external ids.
    #[serde(default)]
    pub prefix: String,
}

/// A test plan of a project.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TestPlan {
    #[serde(deserialize_with = "de_id")]
    pub id: u64,
    pub name: String,
}

/// A platform linked to a test plan.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Platform {
    #[serde(deserialize_with = "de_id")]
    pub id: u64,
    pub name: String,
}

/// A build of a test plan.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Build {
    #[serde(deserialize_with = "de_id")]
    pub id: u64,
    pub name: String,
    #[serde(default = "yes", deserialize_with = "de_flag")]
    pub active: bool,
    #[serde(default = "yes", deserialize_with = "de_flag")]
    pub is_open: bool,
}

/// A test suite, either first level in a project or nested.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TestSuite {
    #[serde(deserialize_with = "de_id")]
    pub id: u64,
    pub name: String,
}

/// A test case found by name.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TestCaseRef {
    #[serde(deserialize_with = "de_id")]
    pub id: u64,
    /// Id of the suite the test case lives in.
    #[serde(deserialize_with = "de_id")]
    pub parent_id: u64,
    #[serde(default)]
    pub name: String,
}

/// Extra data returned when a test case is created.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct AdditionalInfo {
    #[serde(default, deserialize_with = "de_id")]
    pub id: u64,
    #[serde(default, deserialize_with = "de_id")]
    pub external_id: u64,
    #[serde(default, deserialize_with = "de_id")]
    pub version_number: u64,
}

/// Outcome of a write operation.
///
/// A `status` of `false` is a business-level rejection by the server, not a
/// transport failure.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct GeneralResult {
    #[serde(default, deserialize_with = "de_flag")]
    pub status: bool,
    #[serde(default)]
    pub message: String,
    #[serde(default, deserialize_with = "de_id")]
    pub id: u64,
    #[serde(default, rename = "additionalInfo")]
    pub additional_info: Option<AdditionalInfo>,
}

impl GeneralResult {
    /// A successful result carrying `id`.
    pub fn ok(id: u64) -> Self {
        Self {
            status: true,
            message: "Success!".to_string(),
            id,
            additional_info: None,
        }
    }

    /// A failed result produced locally, without asking the server.
    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            status: false,
            message: message.into(),
            ..Self::default()
        }
    }
}

/// Verdict recorded for one execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExecutionStatus {
    #[serde(rename = "p")]
    Pass,
    #[serde(rename = "f")]
    Fail,
    #[serde(rename = "b")]
    Blocked,
}

impl ExecutionStatus {
    /// Single-letter code used by the API.
    pub fn code(&self) -> &'static str {
        match self {
            ExecutionStatus::Pass => "p",
            ExecutionStatus::Fail => "f",
            ExecutionStatus::Blocked => "b",
        }
    }
}

impl std::fmt::Display for ExecutionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ExecutionStatus::Pass => "Pass",
            ExecutionStatus::Fail => "Fail",
            ExecutionStatus::Blocked => "Blocked",
        };
        f.write_str(name)
    }
}

/// What the server does when a created test case name already exists in
/// the suite.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionOnDuplicate {
    Block,
    GenerateNew,
    CreateNewVersion,
}

/// A single step of a test case.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TestStep {
    pub step_number: u32,
    pub actions: String,
    pub expected_results: String,
}

/// Request to create a test suite.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTestSuite {
    pub project_id: u64,
    pub name: String,
    pub details: String,
    /// `None` creates a first-level suite directly under the project.
    pub parent_id: Option<u64>,
}

/// Request to create a test case.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTestCase {
    pub author_login: String,
    pub suite_id: u64,
    pub name: String,
    pub project_id: u64,
    pub summary: String,
    pub steps: Vec<TestStep>,
    pub preconditions: String,
    pub importance: u8,
    pub execution_type: u8,
    pub check_duplicated_name: bool,
    pub action_on_duplicated_name: ActionOnDuplicate,
}

/// Request to link a test case version into a test plan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlanAssignment {
    pub project_id: u64,
    pub plan_id: u64,
    /// `"<prefix>-<external id>"`.
    pub external_id: String,
    pub version: u64,
    pub platform_id: u64,
}

/// An execution result to record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionReport {
    pub test_case_id: u64,
    pub plan_id: u64,
    pub status: ExecutionStatus,
    pub platform_name: String,
    pub notes: String,
    pub build_id: u64,
}

fn yes() -> bool {
    true
}

/// Accepts an id as a number or a numeric string.
pub(crate) fn de_id<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::Number(n) => n
            .as_u64()
            .ok_or_else(|| serde::de::Error::custom(format!("invalid id: {n}"))),
        Value::String(s) if s.is_empty() => Ok(0),
        Value::String(s) => s
            .parse()
            .map_err(|_| serde::de::Error::custom(format!("invalid id: {s:?}"))),
        Value::Null => Ok(0),
        other => Err(serde::de::Error::custom(format!("invalid id: {other}"))),
    }
}

/// Accepts a flag as a bool, a number, or a string such as `"1"`.
pub(crate) fn de_flag<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::Bool(b) => Ok(b),
        Value::Number(n) => Ok(n.as_i64().unwrap_or(0) != 0),
        Value::String(s) => Ok(matches!(s.as_str(), "1" | "true" | "True")),
        Value::Null => Ok(false),
        other => Err(serde::de::Error::custom(format!("invalid flag: {other}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_lenient_ids_and_flags() {
        let build: Build = serde_json::from_value(json!({
            "id": "17",
            "name": "1.0.3",
            "active": "1",
            "is_open": 0
        }))
        .unwrap();
        assert_eq!(build.id, 17);
        assert!(build.active);
        assert!(!build.is_open);
    }

    #[test]
    fn test_build_flags_default_to_usable() {
        let build: Build = serde_json::from_value(json!({"id": 3, "name": "nightly"})).unwrap();
        assert!(build.active && build.is_open);
    }

    #[test]
    fn test_general_result_with_additional_info() {
        let result: GeneralResult = serde_json::from_value(json!({
            "status": true,
            "message": "Success!",
            "id": "88",
            "additionalInfo": {"id": "88", "external_id": "12", "version_number": "1"}
        }))
        .unwrap();
        assert!(result.status);
        let info = result.additional_info.unwrap();
        assert_eq!(info.external_id, 12);
        assert_eq!(info.version_number, 1);
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(ExecutionStatus::Pass.code(), "p");
        assert_eq!(ExecutionStatus::Blocked.to_string(), "Blocked");
        assert_eq!(serde_json::to_value(ExecutionStatus::Fail).unwrap(), json!("f"));
    }
}
