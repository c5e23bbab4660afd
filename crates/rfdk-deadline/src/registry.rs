use std::collections::HashSet;

use snafu::{Snafu, ensure};

use crate::connection::Connection;

#[derive(Debug, PartialEq, Eq, Snafu)]
pub enum Error {
    #[snafu(display("Only one configuration object is allowed per scheduler endpoint."))]
    EndpointAlreadyConfigured { endpoint: String },
}

/// The render queue endpoints a Spot Event Plugin configuration was created
/// for during one synthesis run.
///
/// Each endpoint can only be configured once, a second configuration would
/// overwrite the first when deployed.
#[derive(Debug, Default)]
pub struct EndpointRegistry {
    endpoints: HashSet<String>,
}

impl EndpointRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claims the endpoint of `connection`. Fails if it was claimed before,
    /// in which case the registry is left unchanged.
    pub fn register(&mut self, connection: &Connection) -> Result<(), Error> {
        let endpoint = connection.endpoint();
        ensure!(
            !self.endpoints.contains(&endpoint),
            EndpointAlreadyConfiguredSnafu { endpoint }
        );

        tracing::debug!(%endpoint, "registered scheduler endpoint");
        self.endpoints.insert(endpoint);
        Ok(())
    }

    pub fn contains(&self, connection: &Connection) -> bool {
        self.endpoints.contains(&connection.endpoint())
    }

    pub fn len(&self) -> usize {
        self.endpoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.endpoints.is_empty()
    }
}
