//! Fleet directory backed by settings and the environment.

use crate::application::ports::RelayDirectory;
use crate::domain::config::FleetConfig;

/// Environment variable overriding `fleet.bastion_host`.
pub const BASTION_ENV: &str = "HOSTEXEC_BASTION_HOST";

/// Default relay host from `HOSTEXEC_BASTION_HOST`, else from settings.
pub struct ConfiguredFleet {
    bastion_host: String,
}

impl ConfiguredFleet {
    #[must_use]
    pub fn new(config: &FleetConfig) -> Self {
        let bastion_host = std::env::var(BASTION_ENV).unwrap_or_else(|_| config.bastion_host.clone());
        Self { bastion_host }
    }
}

impl RelayDirectory for ConfiguredFleet {
    fn default_relay_host(&self) -> Option<String> {
        let host = self.bastion_host.trim();
        (!host.is_empty()).then(|| host.to_string())
    }
}
