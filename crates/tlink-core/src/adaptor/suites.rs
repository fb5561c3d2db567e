use std::collections::HashMap;

use tracing::{debug, error, info};

use super::{Adaptor, AdaptorError};
use crate::rpc::{Connector, NewTestSuite, TestManagement};

/// Dotted suite path to suite id, per project.
///
/// Every prefix of a walked path is cached as well, so siblings created
/// later start from the deepest known parent.
#[derive(Debug, Default)]
pub struct SuiteCache {
    paths: HashMap<(u64, String), u64>,
}

impl SuiteCache {
    pub fn clear(&mut self) {
        self.paths.clear();
    }

    pub fn get(&self, project_id: u64, path: &str) -> Option<u64> {
        self.paths.get(&(project_id, path.to_string())).copied()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    /// Finds the suite at `path` under the project, creating missing
    /// segments when `create` is set.
    pub(crate) async fn resolve_or_create(
        &mut self,
        client: &dyn TestManagement,
        project_id: u64,
        path: &str,
        create: bool,
    ) -> Result<u64, AdaptorError> {
        if let Some(id) = self.get(project_id, path) {
            return Ok(id);
        }

        let segments: Vec<&str> = path.split('.').collect();
        if segments.iter().any(|segment| segment.is_empty()) {
            return Err(AdaptorError::InvalidSuitePath(path.to_string()));
        }

        // Start below the deepest prefix we already know.
        let mut parent = None;
        let mut start = 0;
        for depth in (1..segments.len()).rev() {
            if let Some(id) = self.get(project_id, &segments[..depth].join(".")) {
                parent = Some(id);
                start = depth;
                break;
            }
        }

        for (index, segment) in segments.iter().enumerate().skip(start) {
            let siblings = match parent {
                None => client.first_level_test_suites(project_id).await?,
                Some(parent_id) => client.test_suites_for_test_suite(parent_id).await?,
            };

            let id = match siblings.iter().find(|suite| suite.name == *segment) {
                Some(suite) => suite.id,
                None if create => {
                    let request = NewTestSuite {
                        project_id,
                        name: segment.to_string(),
                        details: String::new(),
                        parent_id: parent,
                    };
                    let result = client.create_test_suite(&request).await?;
                    if !result.status {
                        error!(suite = segment, path, message = %result.message, "failed to create test suite");
                        return Err(AdaptorError::Rejected {
                            operation: "createTestSuite",
                            message: result.message,
                        });
                    }
                    info!(suite = segment, path, id = result.id, "created test suite");
                    result.id
                }
                None => {
                    return Err(AdaptorError::SuiteNotFound {
                        path: path.to_string(),
                        segment: segment.to_string(),
                    })
                }
            };

            let prefix = segments[..=index].join(".");
            debug!(suite = %prefix, id, "resolved test suite");
            self.paths.insert((project_id, prefix), id);
            parent = Some(id);
        }

        parent.ok_or_else(|| AdaptorError::InvalidSuitePath(path.to_string()))
    }
}

impl<C: Connector> Adaptor<C> {
    /// Resolves a dotted suite path in the current project.
    ///
    /// Missing segments are created, each parented to the previous one,
    /// when `create_if_missing` is set.
    pub async fn resolve_or_create_suite(
        &mut self,
        path: &str,
        create_if_missing: bool,
    ) -> Result<u64, AdaptorError> {
        let result = self.walk_suite_path(path, create_if_missing).await;
        self.track_transport(result)
    }

    async fn walk_suite_path(
        &mut self,
        path: &str,
        create_if_missing: bool,
    ) -> Result<u64, AdaptorError> {
        if !self.connection_valid() {
            return Err(AdaptorError::InvalidConnection);
        }
        let project_id = self
            .resolved
            .as_ref()
            .map(|ids| ids.project_id)
            .ok_or(AdaptorError::InvalidConnection)?;
        let client = self
            .client
            .as_deref()
            .ok_or(AdaptorError::InvalidConnection)?;

        self.suites
            .resolve_or_create(client, project_id, path, create_if_missing)
            .await
    }

    /// Cached suite id for `path` in the current project, without any
    /// remote call.
    pub fn cached_suite(&self, path: &str) -> Option<u64> {
        let project_id = self.resolved.as_ref()?.project_id;
        self.suites.get(project_id, path)
    }
}
