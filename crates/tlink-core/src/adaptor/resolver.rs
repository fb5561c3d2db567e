use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::{debug, error, warn};

use super::{Adaptor, AdaptorError};
use crate::config::NO_PLATFORM_ID;
use crate::rpc::{Connector, TestManagement};

/// Names identifying where results go.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HierarchySelection {
    pub project: String,
    pub test_plan: String,
    /// Dotted path of nested suite names, e.g. `"Acme.Login.Smoke"`.
    pub test_suite: String,
    /// Empty means no platform.
    pub platform: String,
    /// Empty means the latest build of the plan.
    pub build: String,
}

/// Server ids for a resolved [`HierarchySelection`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ResolvedIds {
    pub project_id: u64,
    pub project_prefix: String,
    pub test_plan_id: u64,
    pub platform_id: u64,
    pub build_id: u64,
    pub test_suite_id: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct ProjectEntry {
    id: u64,
    prefix: String,
}

/// Name to id memo for projects, plans, platforms and builds.
///
/// Plans are scoped to their project, platforms and builds to their plan.
/// Entries are never revalidated against the server; the whole cache is
/// dropped when the connection changes.
#[derive(Debug, Default)]
pub struct EntityCache {
    projects: HashMap<String, ProjectEntry>,
    plans: HashMap<(u64, String), u64>,
    platforms: HashMap<(u64, String), u64>,
    builds: HashMap<(u64, String), u64>,
}

impl EntityCache {
    pub fn clear(&mut self) {
        self.projects.clear();
        self.plans.clear();
        self.platforms.clear();
        self.builds.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.projects.is_empty()
            && self.plans.is_empty()
            && self.platforms.is_empty()
            && self.builds.is_empty()
    }

    async fn project(
        &mut self,
        client: &dyn TestManagement,
        name: &str,
    ) -> Result<ProjectEntry, AdaptorError> {
        if let Some(entry) = self.projects.get(name) {
            return Ok(entry.clone());
        }

        let project = client
            .test_project_by_name(name)
            .await?
            .ok_or_else(|| AdaptorError::ProjectNotFound(name.to_string()))?;

        debug!(project = name, id = project.id, "resolved test project");
        let entry = ProjectEntry {
            id: project.id,
            prefix: project.prefix,
        };
        self.projects.insert(name.to_string(), entry.clone());
        Ok(entry)
    }

    async fn test_plan(
        &mut self,
        client: &dyn TestManagement,
        project_id: u64,
        selection: &HierarchySelection,
    ) -> Result<u64, AdaptorError> {
        let key = (project_id, selection.test_plan.clone());
        if let Some(&id) = self.plans.get(&key) {
            return Ok(id);
        }

        let id = client
            .project_test_plans(project_id)
            .await?
            .into_iter()
            .find(|plan| plan.name == selection.test_plan)
            .map(|plan| plan.id)
            .ok_or_else(|| AdaptorError::TestPlanNotFound {
                project: selection.project.clone(),
                plan: selection.test_plan.clone(),
            })?;

        debug!(plan = %selection.test_plan, id, "resolved test plan");
        self.plans.insert(key, id);
        Ok(id)
    }

    async fn platform(
        &mut self,
        client: &dyn TestManagement,
        plan_id: u64,
        selection: &HierarchySelection,
    ) -> Result<u64, AdaptorError> {
        if selection.platform.is_empty() {
            return Ok(NO_PLATFORM_ID);
        }

        let key = (plan_id, selection.platform.clone());
        if let Some(&id) = self.platforms.get(&key) {
            return Ok(id);
        }

        let id = client
            .test_plan_platforms(plan_id)
            .await?
            .into_iter()
            .find(|platform| platform.name == selection.platform)
            .map(|platform| platform.id)
            .ok_or_else(|| AdaptorError::PlatformNotFound {
                plan: selection.test_plan.clone(),
                platform: selection.platform.clone(),
            })?;

        debug!(platform = %selection.platform, id, "resolved platform");
        self.platforms.insert(key, id);
        Ok(id)
    }

    async fn build(
        &mut self,
        client: &dyn TestManagement,
        plan_id: u64,
        selection: &HierarchySelection,
    ) -> Result<u64, AdaptorError> {
        let key = (plan_id, selection.build.clone());
        if let Some(&id) = self.builds.get(&key) {
            return Ok(id);
        }

        let mut builds = client.builds_for_test_plan(plan_id).await?;
        if builds.is_empty() {
            return Err(AdaptorError::NoBuilds(selection.test_plan.clone()));
        }

        // The server lists builds oldest first.
        let chosen = if selection.build.is_empty() {
            builds.pop()
        } else {
            builds.into_iter().find(|build| build.name == selection.build)
        };
        let build = chosen.ok_or_else(|| AdaptorError::BuildNotFound {
            plan: selection.test_plan.clone(),
            build: selection.build.clone(),
        })?;

        if !build.active || !build.is_open {
            warn!(build = %build.name, active = build.active, open = build.is_open, "build is not usable");
            return Err(AdaptorError::BuildNotUsable(build.name));
        }

        debug!(build = %build.name, id = build.id, "resolved build");
        self.builds.insert(key, build.id);
        Ok(build.id)
    }
}

impl<C: Connector> Adaptor<C> {
    /// Resolves `selection` to server ids.
    ///
    /// Works in dependency order (project, test plan, platform, build, then
    /// the suite path) and stops at the first failure. Names resolved before
    /// are served from the cache without a remote call; a failure leaves
    /// cached entries for other names untouched.
    pub async fn set_hierarchy(
        &mut self,
        selection: HierarchySelection,
    ) -> Result<ResolvedIds, AdaptorError> {
        if !self.state.basic_valid {
            self.state.project_data_valid = false;
            return Err(AdaptorError::InvalidConnection);
        }

        if self.state.project_data_valid && self.selection.as_ref() == Some(&selection) {
            if let Some(resolved) = &self.resolved {
                return Ok(resolved.clone());
            }
        }

        self.state.project_data_valid = false;
        self.selection = None;
        self.resolved = None;

        let result = self.resolve(&selection).await;
        let resolved = match self.track_transport(result) {
            Ok(resolved) => resolved,
            Err(e) => {
                error!(
                    project = %selection.project,
                    plan = %selection.test_plan,
                    error = %e,
                    "failed to resolve test hierarchy"
                );
                return Err(e);
            }
        };

        self.selection = Some(selection);
        self.resolved = Some(resolved.clone());
        self.state.project_data_valid = true;
        Ok(resolved)
    }

    async fn resolve(&mut self, selection: &HierarchySelection) -> Result<ResolvedIds, AdaptorError> {
        let client = self
            .client
            .as_deref()
            .ok_or(AdaptorError::InvalidConnection)?;

        let project = self.cache.project(client, &selection.project).await?;
        let test_plan_id = self.cache.test_plan(client, project.id, selection).await?;
        let platform_id = self.cache.platform(client, test_plan_id, selection).await?;
        let build_id = self.cache.build(client, test_plan_id, selection).await?;
        let test_suite_id = self
            .suites
            .resolve_or_create(
                client,
                project.id,
                &selection.test_suite,
                self.settings.create_missing_suites,
            )
            .await?;

        Ok(ResolvedIds {
            project_id: project.id,
            project_prefix: project.prefix,
            test_plan_id,
            platform_id,
            build_id,
            test_suite_id,
        })
    }

    /// Ids of the currently accepted selection.
    pub fn resolved(&self) -> Option<&ResolvedIds> {
        self.resolved.as_ref()
    }

    /// The currently accepted selection.
    pub fn selection(&self) -> Option<&HierarchySelection> {
        self.selection.as_ref()
    }
}
