use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use tracing::{debug, instrument, warn};

use super::types::de_id;
use super::xmlrpc;
use super::{
    Build, ExecutionReport, GeneralResult, NewTestCase, NewTestSuite, PlanAssignment, Platform,
    RpcError, TestCaseRef, TestManagement, TestPlan, TestProject, TestSuite,
};
use crate::config::DEFAULT_TIMEOUT_SECS;

/// `getTestProjectByName`: no project with that name.
const TESTPROJECTNAME_DOESNOT_EXIST: i64 = 7011;
/// `getFirstLevelTestSuitesForTestProject`: project has no suites yet.
const TESTPROJECT_IS_EMPTY: i64 = 7008;
/// `getTestPlanPlatforms`: plan has no platforms linked.
const NO_PLATFORMS_LINKED_TO_TESTPLAN: i64 = 3041;
/// `getTestCaseIDByName`: no test case with that name.
const NO_TESTCASE_BY_THIS_NAME: i64 = 5030;

/// TestLink API client speaking XML-RPC over HTTP.
///
/// Every request carries the developer key as the `devKey` parameter.
pub struct TestLinkClient {
    client: Client,
    url: String,
    dev_key: String,
}

impl TestLinkClient {
    /// Creates a client with the default timeout.
    ///
    /// # Arguments
    /// * `url` - The API endpoint (e.g., "http://host/testlink/lib/api/xmlrpc/v1/xmlrpc.php")
    /// * `dev_key` - The personal API key of the TestLink user
    pub fn new(url: impl Into<String>, dev_key: impl Into<String>) -> Result<Self, RpcError> {
        Self::with_timeout(url, dev_key, Duration::from_secs(DEFAULT_TIMEOUT_SECS))
    }

    /// Creates a client whose calls give up after `timeout`.
    pub fn with_timeout(
        url: impl Into<String>,
        dev_key: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, RpcError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            url: url.into(),
            dev_key: dev_key.into(),
        })
    }

    /// The endpoint this client talks to.
    pub fn url(&self) -> &str {
        &self.url
    }

    #[instrument(skip(self, params), fields(url = %self.url))]
    async fn call(&self, method: &str, params: Value) -> Result<Value, RpcError> {
        let mut params = match params {
            Value::Object(map) => map,
            Value::Null => Map::new(),
            other => {
                return Err(RpcError::Protocol(format!(
                    "params for {method} must be an object, got {other}"
                )))
            }
        };
        params.insert("devKey".to_string(), Value::String(self.dev_key.clone()));

        let body = xmlrpc::encode_call(method, &Value::Object(params))?;

        debug!("sending request");
        let response = self
            .client
            .post(&self.url)
            .header(CONTENT_TYPE, "text/xml")
            .body(body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(RpcError::HttpStatus {
                status: status.as_u16(),
                message,
            });
        }

        let body = response.text().await?;
        let result = xmlrpc::decode_response(&body)?;
        match embedded_error(&result) {
            Some(error) => Err(error),
            None => Ok(result),
        }
    }

    async fn call_list<T: DeserializeOwned>(
        &self,
        method: &str,
        params: Value,
        empty_code: i64,
    ) -> Result<Vec<T>, RpcError> {
        match self.call(method, params).await {
            Ok(value) => list(value),
            Err(RpcError::ApiError { code, .. }) if code == empty_code => Ok(Vec::new()),
            Err(e) => Err(e),
        }
    }

    /// Calls a write method, turning a server-side refusal into a failed
    /// [`GeneralResult`].
    async fn call_write(&self, method: &str, params: Value) -> Result<GeneralResult, RpcError> {
        match self.call(method, params).await {
            Ok(value) => Ok(serde_json::from_value(first(value))?),
            Err(RpcError::ApiError { code, message }) => {
                warn!(method, code, %message, "server rejected request");
                Ok(GeneralResult::failed(message))
            }
            Err(e) => Err(e),
        }
    }
}

#[async_trait]
impl TestManagement for TestLinkClient {
    async fn ping(&self) -> Result<(), RpcError> {
        self.call("tl.ping", Value::Null).await.map(|_| ())
    }

    async fn test_project_by_name(&self, name: &str) -> Result<Option<TestProject>, RpcError> {
        let params = json!({ "testprojectname": name });
        match self.call("tl.getTestProjectByName", params).await {
            Ok(value) => match first(value) {
                Value::Null => Ok(None),
                project => Ok(Some(serde_json::from_value(project)?)),
            },
            Err(RpcError::ApiError { code, .. }) if code == TESTPROJECTNAME_DOESNOT_EXIST => {
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    async fn project_test_plans(&self, project_id: u64) -> Result<Vec<TestPlan>, RpcError> {
        let value = self
            .call("tl.getProjectTestPlans", json!({ "testprojectid": project_id }))
            .await?;
        list(value)
    }

    async fn test_plan_platforms(&self, plan_id: u64) -> Result<Vec<Platform>, RpcError> {
        self.call_list(
            "tl.getTestPlanPlatforms",
            json!({ "testplanid": plan_id }),
            NO_PLATFORMS_LINKED_TO_TESTPLAN,
        )
        .await
    }

    async fn builds_for_test_plan(&self, plan_id: u64) -> Result<Vec<Build>, RpcError> {
        let value = self
            .call("tl.getBuildsForTestPlan", json!({ "testplanid": plan_id }))
            .await?;
        list(value)
    }

    async fn first_level_test_suites(&self, project_id: u64) -> Result<Vec<TestSuite>, RpcError> {
        self.call_list(
            "tl.getFirstLevelTestSuitesForTestProject",
            json!({ "testprojectid": project_id }),
            TESTPROJECT_IS_EMPTY,
        )
        .await
    }

    async fn test_suites_for_test_suite(&self, suite_id: u64) -> Result<Vec<TestSuite>, RpcError> {
        let value = self
            .call("tl.getTestSuitesForTestSuite", json!({ "testsuiteid": suite_id }))
            .await?;
        list(value)
    }

    async fn create_test_suite(&self, suite: &NewTestSuite) -> Result<GeneralResult, RpcError> {
        let mut params = json!({
            "testprojectid": suite.project_id,
            "testsuitename": suite.name,
            "details": suite.details,
        });
        if let Some(parent_id) = suite.parent_id {
            params["parentid"] = json!(parent_id);
        }
        self.call_write("tl.createTestSuite", params).await
    }

    async fn test_case_ids_by_name(&self, name: &str) -> Result<Vec<TestCaseRef>, RpcError> {
        self.call_list(
            "tl.getTestCaseIDByName",
            json!({ "testcasename": name }),
            NO_TESTCASE_BY_THIS_NAME,
        )
        .await
    }

    async fn create_test_case(&self, test_case: &NewTestCase) -> Result<GeneralResult, RpcError> {
        let params = json!({
            "authorlogin": test_case.author_login,
            "testsuiteid": test_case.suite_id,
            "testcasename": test_case.name,
            "testprojectid": test_case.project_id,
            "summary": test_case.summary,
            "steps": test_case.steps,
            "preconditions": test_case.preconditions,
            "importance": test_case.importance,
            "executiontype": test_case.execution_type,
            "checkduplicatedname": test_case.check_duplicated_name,
            "actiononduplicatedname": test_case.action_on_duplicated_name,
        });
        self.call_write("tl.createTestCase", params).await
    }

    async fn add_test_case_to_test_plan(
        &self,
        assignment: &PlanAssignment,
    ) -> Result<u64, RpcError> {
        let params = json!({
            "testprojectid": assignment.project_id,
            "testplanid": assignment.plan_id,
            "testcaseexternalid": assignment.external_id,
            "version": assignment.version,
            "platformid": assignment.platform_id,
        });
        match self.call("tl.addTestCaseToTestPlan", params).await {
            Ok(value) => {
                let feature: FeatureResponse = serde_json::from_value(first(value))?;
                Ok(feature.feature_id)
            }
            Err(RpcError::ApiError { code, message }) => {
                warn!(code, %message, "server refused to add test case to plan");
                Ok(0)
            }
            Err(e) => Err(e),
        }
    }

    async fn report_test_case_result(
        &self,
        report: &ExecutionReport,
    ) -> Result<GeneralResult, RpcError> {
        let mut params = json!({
            "testcaseid": report.test_case_id,
            "testplanid": report.plan_id,
            "status": report.status.code(),
            "notes": report.notes,
            "buildid": report.build_id,
            "guess": false,
        });
        if !report.platform_name.is_empty() {
            params["platformname"] = json!(report.platform_name);
        }
        self.call_write("tl.reportTCResult", params).await
    }
}

#[derive(Debug, Deserialize)]
struct FeatureResponse {
    #[serde(default, deserialize_with = "de_id")]
    feature_id: u64,
}

/// TestLink reports API errors inside a successful response as
/// `[{"code": .., "message": ..}]`.
fn embedded_error(value: &Value) -> Option<RpcError> {
    let entry = value.as_array()?.first()?.as_object()?;
    if entry.contains_key("status") {
        return None;
    }
    let code = match entry.get("code")? {
        Value::Number(n) => n.as_i64()?,
        Value::String(s) => s.parse().ok()?,
        _ => return None,
    };
    let message = entry
        .get("message")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();
    Some(RpcError::ApiError { code, message })
}

/// Unwraps single-element arrays.
fn first(value: Value) -> Value {
    match value {
        Value::Array(items) => items.into_iter().next().unwrap_or(Value::Null),
        other => other,
    }
}

/// Normalises the shapes TestLink uses for collections: a plain array, a
/// map keyed by id, a single bare object, or an empty string/null.
fn list<T: DeserializeOwned>(value: Value) -> Result<Vec<T>, RpcError> {
    match value {
        Value::Array(items) => Ok(serde_json::from_value(Value::Array(items))?),
        Value::Object(map) if map.contains_key("id") => {
            Ok(vec![serde_json::from_value(Value::Object(map))?])
        }
        Value::Object(map) => map
            .into_iter()
            .map(|(_, item)| serde_json::from_value(item).map_err(RpcError::from))
            .collect(),
        Value::Null => Ok(Vec::new()),
        Value::String(s) if s.is_empty() => Ok(Vec::new()),
        other => Err(RpcError::ParseError(format!("expected a list, got {other}"))),
    }
}
