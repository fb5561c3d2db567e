use thiserror::Error;

use crate::rpc::RpcError;

/// Errors that can occur while resolving the hierarchy or preparing a
/// test case.
#[derive(Debug, Error)]
pub enum AdaptorError {
    #[error("No valid connection to the test management server")]
    InvalidConnection,

    #[error("Test project '{0}' was not found")]
    ProjectNotFound(String),

    #[error("Test plan '{plan}' was not found in project '{project}'")]
    TestPlanNotFound { project: String, plan: String },

    #[error("Platform '{platform}' is not assigned to test plan '{plan}'")]
    PlatformNotFound { plan: String, platform: String },

    #[error("No builds available for test plan '{0}'")]
    NoBuilds(String),

    #[error("Build '{build}' was not found in test plan '{plan}'")]
    BuildNotFound { plan: String, build: String },

    #[error("Build '{0}' is not active/open")]
    BuildNotUsable(String),

    #[error("Invalid test suite path '{0}'")]
    InvalidSuitePath(String),

    #[error("Test suite '{segment}' of '{path}' was not found")]
    SuiteNotFound { path: String, segment: String },

    #[error("{operation} was rejected: {message}")]
    Rejected {
        operation: &'static str,
        message: String,
    },

    #[error("Remote call failed: {0}")]
    Rpc(#[from] RpcError),
}

impl AdaptorError {
    /// The transport failure behind this error, if any.
    ///
    /// API errors answered by the server are not transport failures.
    pub fn transport_error(&self) -> Option<&RpcError> {
        match self {
            AdaptorError::Rpc(e) if e.is_transport() => Some(e),
            _ => None,
        }
    }
}
