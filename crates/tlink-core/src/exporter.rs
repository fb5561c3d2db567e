use std::fmt;

use serde::Serialize;
use tracing::{debug, error, info, warn};

use crate::adaptor::{Adaptor, AdaptorError, Outcome};
use crate::config::{Config, FixtureConfig};
use crate::results::{build_notes, TestResultNode};
use crate::rpc::Connector;

/// Counts of what happened to the leaves of one run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ExportSummary {
    /// Results accepted by the server.
    pub reported: usize,
    /// Results that could not be recorded.
    pub failed: usize,
    /// Leaves of fixtures with export disabled.
    pub disabled: usize,
    /// Leaves of fixtures without any configuration.
    pub unconfigured: usize,
}

impl ExportSummary {
    pub fn total(&self) -> usize {
        self.reported + self.failed + self.disabled + self.unconfigured
    }
}

impl fmt::Display for ExportSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} reported, {} failed, {} disabled, {} without configuration",
            self.reported, self.failed, self.disabled, self.unconfigured
        )
    }
}

/// Sends the results of a finished run to the server, fixture by fixture.
///
/// Feed it the run's events: [`test_started`](Self::test_started) and
/// [`test_output`](Self::test_output) while tests execute, then
/// [`run_finished`](Self::run_finished) with the result tree.
pub struct ResultExporter<C: Connector> {
    adaptor: Adaptor<C>,
    config: Config,
    current_output: Option<String>,
}

impl<C: Connector> ResultExporter<C> {
    pub fn new(connector: C, config: Config) -> Self {
        Self {
            adaptor: Adaptor::with_settings(connector, config.export.clone()),
            config,
            current_output: None,
        }
    }

    pub fn adaptor(&self) -> &Adaptor<C> {
        &self.adaptor
    }

    pub fn test_started(&mut self) {
        self.current_output = None;
    }

    /// Captured output; kept for the next leaf that completes.
    pub fn test_output(&mut self, text: impl Into<String>) {
        self.current_output = Some(text.into());
    }

    /// Walks the result tree depth first and reports every leaf.
    ///
    /// A failing leaf is logged and counted; it never stops the walk.
    pub async fn run_finished(&mut self, root: &TestResultNode) -> ExportSummary {
        info!(tests = root.leaf_count(), "test execution finished, starting export");

        let mut summary = ExportSummary::default();
        let mut pending = vec![root];
        while let Some(node) = pending.pop() {
            debug!(node = %node.full_name, "processing results");
            if node.is_leaf() {
                self.export_leaf(node, &mut summary).await;
            } else {
                pending.extend(node.children.iter().rev());
            }
        }

        info!(%summary, "export finished");
        summary
    }

    async fn export_leaf(&mut self, leaf: &TestResultNode, summary: &mut ExportSummary) {
        // The buffered output belongs to this leaf even when it carries its own.
        let buffered = self.current_output.take();
        let output = leaf.output.clone().or(buffered);
        let fixture = leaf.fixture_name();

        let Some(fixture_config) = self.config.fixture(fixture) else {
            debug!(test = %leaf.full_name, fixture, "no configuration for fixture");
            summary.unconfigured += 1;
            return;
        };

        if !fixture_config.is_enabled() {
            warn!(test = %leaf.full_name, "export skipped as enabled is false or missing");
            summary.disabled += 1;
            return;
        }

        if let Err(e) = fixture_config.validate() {
            error!(fixture, error = %e, "unable to export results");
            summary.failed += 1;
            return;
        }

        match self.report_leaf(leaf, &fixture_config, fixture, output).await {
            Ok(true) => summary.reported += 1,
            Ok(false) => summary.failed += 1,
            Err(e) => {
                warn!(test = %leaf.full_name, error = %e, "failed to export result");
                summary.failed += 1;
            }
        }
    }

    async fn report_leaf(
        &mut self,
        leaf: &TestResultNode,
        fixture_config: &FixtureConfig,
        fixture: &str,
        output: Option<String>,
    ) -> Result<bool, AdaptorError> {
        if !self.adaptor.set_connection(fixture_config.connection()).await {
            return Err(AdaptorError::InvalidConnection);
        }

        let selection = fixture_config.hierarchy(fixture);
        let suite_path = selection.test_suite.clone();
        self.adaptor.set_hierarchy(selection).await?;

        let name = leaf.test_case_name();
        let description = leaf.description.as_deref().unwrap_or_default();
        let test_case_id = self
            .adaptor
            .ensure_test_case(&name, description, &suite_path)
            .await?;

        let notes = build_notes(leaf.message.as_deref(), output.as_deref());
        let outcome = Outcome::from_state(leaf.state, notes, self.adaptor.settings());
        let result = self.adaptor.report(test_case_id, &outcome).await?;
        if !result.status {
            warn!(test = %name, message = %result.message, "failed to export result");
        }
        Ok(result.status)
    }
}
