mod client;
mod error;
mod types;
mod xmlrpc;

pub use client::TestLinkClient;
pub use error::RpcError;
pub use types::*;

use std::time::Duration;

use async_trait::async_trait;

use crate::adaptor::ConnectionParameters;
use crate::config::DEFAULT_TIMEOUT_SECS;

/// Operations the exporter needs from a test management server.
///
/// Every method maps one-to-one onto a remote call. Errors are transport or
/// protocol failures; "not found" lookups return `None` or an empty list.
///
/// # Example
///
/// ```ignore
/// use tlink_core::rpc::{TestLinkClient, TestManagement};
///
/// let client = TestLinkClient::new("http://tl.example.com/api", "dev-key")?;
/// client.ping().await?;
/// let project = client.test_project_by_name("Demo").await?;
/// ```
#[async_trait]
pub trait TestManagement: Send + Sync {
    /// Cheap liveness check.
    async fn ping(&self) -> Result<(), RpcError>;

    async fn test_project_by_name(&self, name: &str) -> Result<Option<TestProject>, RpcError>;

    /// Test plans of a project, in server order.
    async fn project_test_plans(&self, project_id: u64) -> Result<Vec<TestPlan>, RpcError>;

    async fn test_plan_platforms(&self, plan_id: u64) -> Result<Vec<Platform>, RpcError>;

    /// Builds of a test plan, in server order (oldest first).
    async fn builds_for_test_plan(&self, plan_id: u64) -> Result<Vec<Build>, RpcError>;

    async fn first_level_test_suites(&self, project_id: u64) -> Result<Vec<TestSuite>, RpcError>;

    /// Direct children of a test suite.
    async fn test_suites_for_test_suite(&self, suite_id: u64) -> Result<Vec<TestSuite>, RpcError>;

    async fn create_test_suite(&self, suite: &NewTestSuite) -> Result<GeneralResult, RpcError>;

    /// Test cases with this name anywhere on the server.
    async fn test_case_ids_by_name(&self, name: &str) -> Result<Vec<TestCaseRef>, RpcError>;

    async fn create_test_case(&self, test_case: &NewTestCase) -> Result<GeneralResult, RpcError>;

    /// Links a test case into a plan. Returns the feature id, 0 on failure.
    async fn add_test_case_to_test_plan(
        &self,
        assignment: &PlanAssignment,
    ) -> Result<u64, RpcError>;

    async fn report_test_case_result(
        &self,
        report: &ExecutionReport,
    ) -> Result<GeneralResult, RpcError>;
}

/// Blanket implementation for boxed trait objects.
#[async_trait]
impl TestManagement for Box<dyn TestManagement> {
    async fn ping(&self) -> Result<(), RpcError> {
        (**self).ping().await
    }

    async fn test_project_by_name(&self, name: &str) -> Result<Option<TestProject>, RpcError> {
        (**self).test_project_by_name(name).await
    }

    async fn project_test_plans(&self, project_id: u64) -> Result<Vec<TestPlan>, RpcError> {
        (**self).project_test_plans(project_id).await
    }

    async fn test_plan_platforms(&self, plan_id: u64) -> Result<Vec<Platform>, RpcError> {
        (**self).test_plan_platforms(plan_id).await
    }

    async fn builds_for_test_plan(&self, plan_id: u64) -> Result<Vec<Build>, RpcError> {
        (**self).builds_for_test_plan(plan_id).await
    }

    async fn first_level_test_suites(&self, project_id: u64) -> Result<Vec<TestSuite>, RpcError> {
        (**self).first_level_test_suites(project_id).await
    }

    async fn test_suites_for_test_suite(&self, suite_id: u64) -> Result<Vec<TestSuite>, RpcError> {
        (**self).test_suites_for_test_suite(suite_id).await
    }

    async fn create_test_suite(&self, suite: &NewTestSuite) -> Result<GeneralResult, RpcError> {
        (**self).create_test_suite(suite).await
    }

    async fn test_case_ids_by_name(&self, name: &str) -> Result<Vec<TestCaseRef>, RpcError> {
        (**self).test_case_ids_by_name(name).await
    }

    async fn create_test_case(&self, test_case: &NewTestCase) -> Result<GeneralResult, RpcError> {
        (**self).create_test_case(test_case).await
    }

    async fn add_test_case_to_test_plan(
        &self,
        assignment: &PlanAssignment,
    ) -> Result<u64, RpcError> {
        (**self).add_test_case_to_test_plan(assignment).await
    }

    async fn report_test_case_result(
        &self,
        report: &ExecutionReport,
    ) -> Result<GeneralResult, RpcError> {
        (**self).report_test_case_result(report).await
    }
}

/// Produces a client handle for a set of connection parameters.
///
/// The adaptor asks for a new handle whenever the parameters change, so a
/// handle never outlives the credentials it was built with.
pub trait Connector {
    fn connect(&self, params: &ConnectionParameters) -> Result<Box<dyn TestManagement>, RpcError>;
}

/// Connector for [`TestLinkClient`] over HTTP.
#[derive(Debug, Clone)]
pub struct HttpConnector {
    timeout: Duration,
}

impl HttpConnector {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

impl Default for HttpConnector {
    fn default() -> Self {
        Self::new(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
    }
}

impl Connector for HttpConnector {
    fn connect(&self, params: &ConnectionParameters) -> Result<Box<dyn TestManagement>, RpcError> {
        let client = TestLinkClient::with_timeout(&params.url, &params.dev_key, self.timeout)?;
        Ok(Box::new(client))
    }
}
