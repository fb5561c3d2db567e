use serde::{Deserialize, Serialize};
use tracing::{error, info};

use super::{Adaptor, AdaptorError};
use crate::rpc::{Connector, RpcError};

/// Where and as whom to talk to the server.
///
/// Compared by value: any difference means a new connection.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionParameters {
    pub url: String,
    pub dev_key: String,
    pub user: String,
}

impl ConnectionParameters {
    pub fn new(
        url: impl Into<String>,
        dev_key: impl Into<String>,
        user: impl Into<String>,
    ) -> Self {
        Self {
            url: url.into(),
            dev_key: dev_key.into(),
            user: user.into(),
        }
    }
}

/// Validity flags of the current connection.
///
/// Results can only be recorded when the server answered (`basic`) and
/// the hierarchy selection resolved (`project_data`).
#[derive(Debug, Default)]
pub struct ConnectionState {
    pub(crate) params: Option<ConnectionParameters>,
    pub(crate) basic_valid: bool,
    pub(crate) project_data_valid: bool,
    pub(crate) last_error: Option<RpcError>,
}

impl ConnectionState {
    pub fn is_valid(&self) -> bool {
        self.basic_valid && self.project_data_valid
    }
}

impl<C: Connector> Adaptor<C> {
    /// Switches to `params`, checking liveness if they changed.
    ///
    /// Identical parameters make no remote call and keep the previous
    /// verdict. New parameters drop the client handle and every cached
    /// resolution, so the hierarchy has to be set again afterwards.
    pub async fn set_connection(&mut self, params: ConnectionParameters) -> bool {
        if self.state.params.as_ref() == Some(&params) {
            return self.state.basic_valid;
        }

        info!(url = %params.url, user = %params.user, "connecting to test management server");
        self.reset_resolutions();
        self.client = None;
        self.state.last_error = None;

        let attempt = match self.connector.connect(&params) {
            Ok(client) => {
                let alive = client.ping().await;
                alive.map(|()| client)
            }
            Err(e) => Err(e),
        };

        self.state.basic_valid = match attempt {
            Ok(client) => {
                self.client = Some(client);
                true
            }
            Err(e) => {
                error!(url = %params.url, error = %e, "failed to connect");
                self.state.last_error = Some(e);
                false
            }
        };
        self.state.params = Some(params);
        self.state.basic_valid
    }

    /// Drops the connection when `result` failed at the transport level.
    ///
    /// Nothing is sent to the server afterwards until `set_connection`
    /// succeeds again, and the same parameters count as a new attempt.
    pub(crate) fn track_transport<T>(
        &mut self,
        result: Result<T, AdaptorError>,
    ) -> Result<T, AdaptorError> {
        if let Some(e) = result.as_ref().err().and_then(AdaptorError::transport_error) {
            let url = self.state.params.as_ref().map(|p| p.url.clone()).unwrap_or_default();
            error!(url = %url, error = %e, "lost connection to test management server");
            self.client = None;
            self.state.basic_valid = false;
            self.state.project_data_valid = false;
            self.state.params = None;
            self.state.last_error = Some(e.clone());
        }
        result
    }

    /// Whether results can be recorded right now.
    pub fn connection_valid(&self) -> bool {
        self.state.is_valid()
    }

    pub fn basic_connection_valid(&self) -> bool {
        self.state.basic_valid
    }

    pub fn project_data_valid(&self) -> bool {
        self.state.project_data_valid
    }

    /// Why the last connection attempt failed.
    pub fn last_error(&self) -> Option<&RpcError> {
        self.state.last_error.as_ref()
    }

    /// Current connection parameters, if any were set.
    pub fn connection_parameters(&self) -> Option<&ConnectionParameters> {
        self.state.params.as_ref()
    }
}
