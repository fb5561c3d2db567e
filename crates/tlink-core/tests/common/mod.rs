#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use tlink_core::rpc::{
    AdditionalInfo, Build, Connector, ExecutionReport, GeneralResult, NewTestCase, NewTestSuite,
    PlanAssignment, Platform, RpcError, TestCaseRef, TestManagement, TestPlan, TestProject,
    TestSuite,
};
use tlink_core::{Adaptor, ConnectionParameters, HierarchySelection};

pub const UNREACHABLE_URL: &str = "http://unreachable.invalid/api";

pub const PROJECT_ID: u64 = 1;
pub const RELEASE1_ID: u64 = 10;
pub const RELEASE2_ID: u64 = 11;
pub const LINUX_ID: u64 = 20;
pub const BUILD_10_ID: u64 = 30;
pub const BUILD_11_ID: u64 = 31;
pub const BUILD_20_ID: u64 = 32;
pub const ROOT_SUITE_ID: u64 = 100;
pub const OTHER_SUITE_ID: u64 = 101;

#[derive(Debug, Clone)]
pub struct SuiteRecord {
    pub id: u64,
    pub name: String,
    pub project_id: u64,
    pub parent_id: Option<u64>,
}

#[derive(Debug, Clone)]
pub struct TestCaseRecord {
    pub id: u64,
    pub name: String,
    pub parent_id: u64,
}

/// State of the fake server, shared between all handles.
#[derive(Debug, Default)]
pub struct Server {
    pub projects: Vec<TestProject>,
    pub plans: HashMap<u64, Vec<TestPlan>>,
    pub platforms: HashMap<u64, Vec<Platform>>,
    pub builds: HashMap<u64, Vec<Build>>,
    pub suites: Vec<SuiteRecord>,
    pub test_cases: Vec<TestCaseRecord>,

    pub created_suites: Vec<NewTestSuite>,
    pub created_test_cases: Vec<NewTestCase>,
    pub assignments: Vec<PlanAssignment>,
    pub reports: Vec<ExecutionReport>,
    pub connects: Vec<ConnectionParameters>,

    pub calls: HashMap<&'static str, usize>,
    pub next_id: u64,

    pub down: bool,
    pub reject_suite_names: HashSet<String>,
    pub reject_test_case_names: HashSet<String>,
    pub refuse_plan_links: bool,
    pub reject_reports: bool,
    pub omit_additional_info: bool,
    /// Operations that fail as if the connection dropped mid-call.
    pub failing: HashSet<&'static str>,
}

impl Server {
    fn hit(&mut self, operation: &'static str) -> Result<(), RpcError> {
        *self.calls.entry(operation).or_default() += 1;
        if self.failing.contains(operation) {
            return Err(RpcError::Network("connection reset".to_string()));
        }
        Ok(())
    }

    fn new_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }

    fn suites_where(&self, keep: impl Fn(&SuiteRecord) -> bool) -> Vec<TestSuite> {
        self.suites
            .iter()
            .filter(|suite| keep(suite))
            .map(|suite| TestSuite {
                id: suite.id,
                name: suite.name.clone(),
            })
            .collect()
    }
}

fn build(id: u64, name: &str) -> Build {
    Build {
        id,
        name: name.to_string(),
        active: true,
        is_open: true,
    }
}

/// In-memory test management server.
#[derive(Debug, Clone, Default)]
pub struct FakeTestLink {
    server: Arc<Mutex<Server>>,
}

impl FakeTestLink {
    /// Project "Demo" (prefix DM) with plans Release1 and Release2, platform
    /// Linux on Release1, builds 1.0 and 1.1 on Release1, 2.0 on Release2,
    /// and top-level suites Root and Other.
    pub fn demo() -> Self {
        let fake = Self::default();
        fake.with(|server| {
            server.next_id = 1000;
            server.projects.push(TestProject {
                id: PROJECT_ID,
                name: "Demo".to_string(),
                prefix: "DM".to_string(),
            });
            server.plans.insert(
                PROJECT_ID,
                vec![
                    TestPlan {
                        id: RELEASE1_ID,
                        name: "Release1".to_string(),
                    },
                    TestPlan {
                        id: RELEASE2_ID,
                        name: "Release2".to_string(),
                    },
                ],
            );
            server.platforms.insert(
                RELEASE1_ID,
                vec![Platform {
                    id: LINUX_ID,
                    name: "Linux".to_string(),
                }],
            );
            server
                .builds
                .insert(RELEASE1_ID, vec![build(BUILD_10_ID, "1.0"), build(BUILD_11_ID, "1.1")]);
            server.builds.insert(RELEASE2_ID, vec![build(BUILD_20_ID, "2.0")]);
            for (id, name) in [(ROOT_SUITE_ID, "Root"), (OTHER_SUITE_ID, "Other")] {
                server.suites.push(SuiteRecord {
                    id,
                    name: name.to_string(),
                    project_id: PROJECT_ID,
                    parent_id: None,
                });
            }
        });
        fake
    }

    pub fn with<R>(&self, f: impl FnOnce(&mut Server) -> R) -> R {
        f(&mut self.lock())
    }

    fn lock(&self) -> MutexGuard<'_, Server> {
        self.server.lock().unwrap()
    }

    pub fn calls(&self, operation: &str) -> usize {
        self.lock().calls.get(operation).copied().unwrap_or(0)
    }

    pub fn total_calls(&self) -> usize {
        self.lock().calls.values().sum()
    }

    pub fn reset_calls(&self) {
        self.lock().calls.clear();
    }

    pub fn connector(&self) -> FakeConnector {
        FakeConnector { fake: self.clone() }
    }

    pub fn add_test_case(&self, name: &str, parent_id: u64) -> u64 {
        self.with(|server| {
            let id = server.new_id();
            server.test_cases.push(TestCaseRecord {
                id,
                name: name.to_string(),
                parent_id,
            });
            id
        })
    }
}

#[async_trait]
impl TestManagement for FakeTestLink {
    async fn ping(&self) -> Result<(), RpcError> {
        let mut server = self.lock();
        server.hit("ping")?;
        if server.down {
            return Err(RpcError::Network("connection refused".to_string()));
        }
        Ok(())
    }

    async fn test_project_by_name(&self, name: &str) -> Result<Option<TestProject>, RpcError> {
        let mut server = self.lock();
        server.hit("test_project_by_name")?;
        Ok(server.projects.iter().find(|p| p.name == name).cloned())
    }

    async fn project_test_plans(&self, project_id: u64) -> Result<Vec<TestPlan>, RpcError> {
        let mut server = self.lock();
        server.hit("project_test_plans")?;
        Ok(server.plans.get(&project_id).cloned().unwrap_or_default())
    }

    async fn test_plan_platforms(&self, plan_id: u64) -> Result<Vec<Platform>, RpcError> {
        let mut server = self.lock();
        server.hit("test_plan_platforms")?;
        Ok(server.platforms.get(&plan_id).cloned().unwrap_or_default())
    }

    async fn builds_for_test_plan(&self, plan_id: u64) -> Result<Vec<Build>, RpcError> {
        let mut server = self.lock();
        server.hit("builds_for_test_plan")?;
        Ok(server.builds.get(&plan_id).cloned().unwrap_or_default())
    }

    async fn first_level_test_suites(&self, project_id: u64) -> Result<Vec<TestSuite>, RpcError> {
        let mut server = self.lock();
        server.hit("first_level_test_suites")?;
        Ok(server.suites_where(|s| s.project_id == project_id && s.parent_id.is_none()))
    }

    async fn test_suites_for_test_suite(&self, suite_id: u64) -> Result<Vec<TestSuite>, RpcError> {
        let mut server = self.lock();
        server.hit("test_suites_for_test_suite")?;
        Ok(server.suites_where(|s| s.parent_id == Some(suite_id)))
    }

    async fn create_test_suite(&self, suite: &NewTestSuite) -> Result<GeneralResult, RpcError> {
        let mut server = self.lock();
        server.hit("create_test_suite")?;
        server.created_suites.push(suite.clone());
        if server.reject_suite_names.contains(&suite.name) {
            return Ok(GeneralResult::failed("suite name not allowed"));
        }
        let id = server.new_id();
        server.suites.push(SuiteRecord {
            id,
            name: suite.name.clone(),
            project_id: suite.project_id,
            parent_id: suite.parent_id,
        });
        Ok(GeneralResult::ok(id))
    }

    async fn test_case_ids_by_name(&self, name: &str) -> Result<Vec<TestCaseRef>, RpcError> {
        let mut server = self.lock();
        server.hit("test_case_ids_by_name")?;
        Ok(server
            .test_cases
            .iter()
            .filter(|tc| tc.name == name)
            .map(|tc| TestCaseRef {
                id: tc.id,
                parent_id: tc.parent_id,
                name: tc.name.clone(),
            })
            .collect())
    }

    async fn create_test_case(&self, test_case: &NewTestCase) -> Result<GeneralResult, RpcError> {
        let mut server = self.lock();
        server.hit("create_test_case")?;
        server.created_test_cases.push(test_case.clone());
        if server.reject_test_case_names.contains(&test_case.name) {
            return Ok(GeneralResult::failed("duplicate test case name"));
        }
        let id = server.new_id();
        let external_id = server.test_cases.len() as u64 + 1;
        server.test_cases.push(TestCaseRecord {
            id,
            name: test_case.name.clone(),
            parent_id: test_case.suite_id,
        });
        let additional_info = (!server.omit_additional_info).then_some(AdditionalInfo {
            id,
            external_id,
            version_number: 1,
        });
        Ok(GeneralResult {
            status: true,
            message: "Success!".to_string(),
            id,
            additional_info,
        })
    }

    async fn add_test_case_to_test_plan(
        &self,
        assignment: &PlanAssignment,
    ) -> Result<u64, RpcError> {
        let mut server = self.lock();
        server.hit("add_test_case_to_test_plan")?;
        if server.refuse_plan_links {
            return Ok(0);
        }
        server.assignments.push(assignment.clone());
        Ok(server.new_id())
    }

    async fn report_test_case_result(
        &self,
        report: &ExecutionReport,
    ) -> Result<GeneralResult, RpcError> {
        let mut server = self.lock();
        server.hit("report_test_case_result")?;
        if server.reject_reports {
            return Ok(GeneralResult::failed("build is closed"));
        }
        server.reports.push(report.clone());
        let id = server.new_id();
        Ok(GeneralResult::ok(id))
    }
}

/// Hands out handles to one [`FakeTestLink`], refusing [`UNREACHABLE_URL`].
#[derive(Debug, Clone)]
pub struct FakeConnector {
    fake: FakeTestLink,
}

impl Connector for FakeConnector {
    fn connect(&self, params: &ConnectionParameters) -> Result<Box<dyn TestManagement>, RpcError> {
        self.fake.with(|server| server.connects.push(params.clone()));
        if params.url == UNREACHABLE_URL {
            return Err(RpcError::Network("dns error".to_string()));
        }
        Ok(Box::new(self.fake.clone()))
    }
}

pub fn params() -> ConnectionParameters {
    ConnectionParameters::new("http://tl.example.com/api", "dev-key", "automation")
}

pub fn selection(suite: &str) -> HierarchySelection {
    HierarchySelection {
        project: "Demo".to_string(),
        test_plan: "Release1".to_string(),
        test_suite: suite.to_string(),
        platform: "Linux".to_string(),
        build: "1.0".to_string(),
    }
}

/// An adaptor already connected to `fake` with `selection("Root")`.
pub async fn connected(fake: &FakeTestLink) -> Adaptor<FakeConnector> {
    let mut adaptor = Adaptor::new(fake.connector());
    assert!(adaptor.set_connection(params()).await);
    adaptor.set_hierarchy(selection("Root")).await.unwrap();
    fake.reset_calls();
    adaptor
}
