pub mod adaptor;
pub mod config;
pub mod exporter;
pub mod results;
pub mod rpc;

pub use adaptor::{
    Adaptor, AdaptorError, ConnectionParameters, HierarchySelection, Outcome, ResolvedIds,
};
pub use config::{Config, ConfigError, ExportConfig, FixtureConfig};
pub use exporter::{ExportSummary, ResultExporter};
pub use results::{ResultState, ResultsError, TestResultNode};
pub use rpc::{
    Connector, ExecutionStatus, GeneralResult, HttpConnector, RpcError, TestLinkClient,
    TestManagement,
};
