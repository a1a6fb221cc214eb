use async_trait::async_trait;

use presentia_application::IdentityProvider;
use presentia_core::{AppResult, OperatorIdentity};

/// Identity provider fed from device configuration.
///
/// A kiosk is a single-operator device: the identity is established once
/// when the device is provisioned and handed to every login. An
/// interactive provider would slot in behind the same port.
pub struct StaticIdentityProvider {
    identity: OperatorIdentity,
}

impl StaticIdentityProvider {
    /// Creates a provider that always returns the given identity.
    #[must_use]
    pub fn new(identity: OperatorIdentity) -> Self {
        Self { identity }
    }
}

#[async_trait]
impl IdentityProvider for StaticIdentityProvider {
    async fn authenticate(&self) -> AppResult<OperatorIdentity> {
        Ok(self.identity.clone())
    }
}
