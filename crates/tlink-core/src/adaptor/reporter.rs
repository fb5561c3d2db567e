use tracing::{info, warn};

use super::{Adaptor, AdaptorError};
use crate::config::ExportConfig;
use crate::results::ResultState;
use crate::rpc::{Connector, ExecutionReport, ExecutionStatus, GeneralResult};

/// Verdict and notes to record for one test case.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outcome {
    pub status: ExecutionStatus,
    pub notes: String,
}

impl Outcome {
    pub fn new(status: ExecutionStatus, notes: impl Into<String>) -> Self {
        Self {
            status,
            notes: notes.into(),
        }
    }

    /// Maps a framework result state onto the three server verdicts.
    ///
    /// | state                | status  | marker          |
    /// |----------------------|---------|-----------------|
    /// | success              | Pass    |                 |
    /// | failure, error       | Fail    |                 |
    /// | skipped              | Blocked | `skip_marker`   |
    /// | ignored              | Blocked | `ignore_marker` |
    /// | not runnable         | Blocked |                 |
    pub fn from_state(state: ResultState, notes: impl Into<String>, markers: &ExportConfig) -> Self {
        let mut notes = notes.into();
        let status = match state {
            ResultState::Success => ExecutionStatus::Pass,
            ResultState::Failure | ResultState::Error => ExecutionStatus::Fail,
            ResultState::Skipped => {
                push_line(&mut notes, &markers.skip_marker);
                ExecutionStatus::Blocked
            }
            ResultState::Ignored => {
                push_line(&mut notes, &markers.ignore_marker);
                ExecutionStatus::Blocked
            }
            ResultState::NotRunnable => ExecutionStatus::Blocked,
        };
        Self { status, notes }
    }
}

fn push_line(notes: &mut String, line: &str) {
    if !notes.is_empty() && !notes.ends_with('\n') {
        notes.push('\n');
    }
    notes.push_str(line);
    notes.push('\n');
}

impl<C: Connector> Adaptor<C> {
    /// Records `outcome` for a test case in the current plan, build and
    /// platform.
    ///
    /// Without a valid connection, or for test case id 0, a failed result is
    /// returned and nothing is sent. A refusal by the server is a failed
    /// result too; only transport failures are errors, and they drop the
    /// connection.
    pub async fn report(
        &mut self,
        test_case_id: u64,
        outcome: &Outcome,
    ) -> Result<GeneralResult, AdaptorError> {
        let result = self.send_report(test_case_id, outcome).await;
        self.track_transport(result)
    }

    async fn send_report(
        &self,
        test_case_id: u64,
        outcome: &Outcome,
    ) -> Result<GeneralResult, AdaptorError> {
        let (client, ids, selection) = match (&self.client, &self.resolved, &self.selection) {
            (Some(client), Some(ids), Some(selection)) if self.connection_valid() => {
                (client, ids, selection)
            }
            _ => return Ok(GeneralResult::failed("Invalid Connection")),
        };
        if test_case_id == 0 {
            return Ok(GeneralResult::failed("No test case to report against"));
        }

        let report = ExecutionReport {
            test_case_id,
            plan_id: ids.test_plan_id,
            status: outcome.status,
            platform_name: selection.platform.clone(),
            notes: outcome.notes.clone(),
            build_id: ids.build_id,
        };
        let result = client.report_test_case_result(&report).await?;

        if result.status {
            info!(test_case_id, plan = %selection.test_plan, status = %outcome.status, "reported result");
        } else {
            warn!(test_case_id, message = %result.message, "server did not accept result");
        }
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_success_is_pass_with_unchanged_notes() {
        let outcome = Outcome::from_state(ResultState::Success, "all good", &ExportConfig::default());
        assert_eq!(outcome.status, ExecutionStatus::Pass);
        assert_eq!(outcome.notes, "all good");
    }

    #[test]
    fn test_failure_and_error_are_fail() {
        let markers = ExportConfig::default();
        assert_eq!(
            Outcome::from_state(ResultState::Failure, "", &markers).status,
            ExecutionStatus::Fail
        );
        assert_eq!(
            Outcome::from_state(ResultState::Error, "", &markers).status,
            ExecutionStatus::Fail
        );
    }

    #[test]
    fn test_skipped_and_ignored_are_blocked_with_marker() {
        let markers = ExportConfig::default();

        let skipped = Outcome::from_state(ResultState::Skipped, "reason", &markers);
        assert_eq!(skipped.status, ExecutionStatus::Blocked);
        assert_eq!(skipped.notes, format!("reason\n{}\n", markers.skip_marker));

        let ignored = Outcome::from_state(ResultState::Ignored, "", &markers);
        assert_eq!(ignored.status, ExecutionStatus::Blocked);
        assert!(ignored.notes.contains("IGNORED"));
    }

    #[test]
    fn test_not_runnable_is_blocked_without_marker() {
        let outcome = Outcome::from_state(ResultState::NotRunnable, "bad signature", &ExportConfig::default());
        assert_eq!(outcome.status, ExecutionStatus::Blocked);
        assert_eq!(outcome.notes, "bad signature");
    }
}
