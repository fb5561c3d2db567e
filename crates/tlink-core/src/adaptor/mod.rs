//! Translation of human-readable hierarchy names into server ids.
//!
//! The [`Adaptor`] owns one client handle plus every cache built on top of
//! it. Typical use, once per finished test:
//!
//! ```ignore
//! let mut adaptor = Adaptor::new(HttpConnector::default());
//! if adaptor.set_connection(params).await {
//!     adaptor.set_hierarchy(selection).await?;
//!     let id = adaptor.ensure_test_case("Login", "", "Acme.Login").await?;
//!     adaptor.report(id, &Outcome::new(ExecutionStatus::Pass, "")).await?;
//! }
//! ```
//!
//! The adaptor is meant for one caller at a time; every operation finishes
//! its remote calls before returning.

mod connection;
mod error;
mod reporter;
mod resolver;
mod suites;
mod test_case;

pub use connection::{ConnectionParameters, ConnectionState};
pub use error::AdaptorError;
pub use reporter::Outcome;
pub use resolver::{EntityCache, HierarchySelection, ResolvedIds};
pub use suites::SuiteCache;

use crate::config::ExportConfig;
use crate::rpc::{Connector, TestManagement};

/// Stateful bridge between test results and the test management server.
pub struct Adaptor<C: Connector> {
    connector: C,
    client: Option<Box<dyn TestManagement>>,
    state: ConnectionState,
    cache: EntityCache,
    suites: SuiteCache,
    selection: Option<HierarchySelection>,
    resolved: Option<ResolvedIds>,
    settings: ExportConfig,
}

impl<C: Connector> Adaptor<C> {
    /// Creates an adaptor with default export settings.
    pub fn new(connector: C) -> Self {
        Self::with_settings(connector, ExportConfig::default())
    }

    pub fn with_settings(connector: C, settings: ExportConfig) -> Self {
        Self {
            connector,
            client: None,
            state: ConnectionState::default(),
            cache: EntityCache::default(),
            suites: SuiteCache::default(),
            selection: None,
            resolved: None,
            settings,
        }
    }

    pub fn settings(&self) -> &ExportConfig {
        &self.settings
    }

    /// Forgets every resolved id. Used when the connection changes.
    fn reset_resolutions(&mut self) {
        self.cache.clear();
        self.suites.clear();
        self.selection = None;
        self.resolved = None;
        self.state.project_data_valid = false;
    }

    /// True when nothing has been resolved since the last reset.
    pub fn caches_empty(&self) -> bool {
        self.cache.is_empty() && self.suites.is_empty()
    }
}
