use tracing::{debug, error, info};

use super::{Adaptor, AdaptorError};
use crate::rpc::{ActionOnDuplicate, Connector, NewTestCase, PlanAssignment};

impl<C: Connector> Adaptor<C> {
    /// Returns the id of the test case `name` in the suite at `suite_path`,
    /// creating it and linking it into the current test plan if needed.
    ///
    /// Test case names are only unique within a suite, so among the
    /// server's matches the one whose parent is the resolved suite wins.
    pub async fn ensure_test_case(
        &mut self,
        name: &str,
        description: &str,
        suite_path: &str,
    ) -> Result<u64, AdaptorError> {
        let result = self.find_or_create(name, description, suite_path).await;
        self.track_transport(result)
    }

    async fn find_or_create(
        &mut self,
        name: &str,
        description: &str,
        suite_path: &str,
    ) -> Result<u64, AdaptorError> {
        if !self.connection_valid() {
            return Err(AdaptorError::InvalidConnection);
        }
        let ids = self
            .resolved
            .clone()
            .ok_or(AdaptorError::InvalidConnection)?;
        let author_login = self
            .state
            .params
            .as_ref()
            .map(|params| params.user.clone())
            .unwrap_or_default();
        let client = self
            .client
            .as_deref()
            .ok_or(AdaptorError::InvalidConnection)?;

        let suite_id = self
            .suites
            .resolve_or_create(
                client,
                ids.project_id,
                suite_path,
                self.settings.create_missing_suites,
            )
            .await?;

        let existing = client
            .test_case_ids_by_name(name)
            .await?
            .into_iter()
            .find(|test_case| test_case.parent_id == suite_id);
        if let Some(test_case) = existing {
            debug!(test_case = name, id = test_case.id, suite_id, "found test case");
            return Ok(test_case.id);
        }

        let request = NewTestCase {
            author_login,
            suite_id,
            name: name.to_string(),
            project_id: ids.project_id,
            summary: description.to_string(),
            steps: Vec::new(),
            preconditions: String::new(),
            importance: self.settings.test_case_importance,
            execution_type: self.settings.execution_type,
            check_duplicated_name: true,
            action_on_duplicated_name: ActionOnDuplicate::Block,
        };
        let created = client.create_test_case(&request).await?;
        if !created.status {
            error!(test_case = name, message = %created.message, "failed to create test case");
            return Err(AdaptorError::Rejected {
                operation: "createTestCase",
                message: created.message,
            });
        }

        // Linking needs the external id; without it the case can never be reported.
        let info = match created.additional_info {
            Some(info) if info.external_id != 0 => info,
            _ => {
                error!(test_case = name, "server returned no external id for created test case");
                return Err(AdaptorError::Rejected {
                    operation: "createTestCase",
                    message: format!("no external id returned for test case '{name}'"),
                });
            }
        };
        let test_case_id = if info.id != 0 { info.id } else { created.id };

        // A new test case can't take results until it is part of the plan.
        let assignment = PlanAssignment {
            project_id: ids.project_id,
            plan_id: ids.test_plan_id,
            external_id: format!("{}-{}", ids.project_prefix, info.external_id),
            version: info.version_number,
            platform_id: ids.platform_id,
        };
        let feature_id = client.add_test_case_to_test_plan(&assignment).await?;
        if feature_id == 0 {
            error!(test_case = name, external_id = %assignment.external_id, "failed to add test case to test plan");
            return Err(AdaptorError::Rejected {
                operation: "addTestCaseToTestPlan",
                message: format!("test case '{name}' could not be added to the test plan"),
            });
        }

        info!(test_case = name, id = test_case_id, external_id = %assignment.external_id, "created test case");
        Ok(test_case_id)
    }
}
