//! Environment-level configuration for the distributed backend.

use std::env;

/// Connection and identity settings for a distributed bus instance.
///
/// `service_name` is the logical service identity: it scopes subscription
/// names, so two processes configured with the same name compete for
/// messages while differently named services each see every event.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BusConfig {
    /// Transport service address, e.g. `pulsar://localhost:6650` or
    /// `memory://local` for the included broker.
    pub service_url: String,
    /// Logical service identity used to build subscription names.
    pub service_name: String,
    /// Flat namespace prefixed to every topic name.
    pub namespace: String,
}

impl Default for BusConfig {
    fn default() -> Self {
        Self {
            service_url: "memory://local".to_string(),
            service_name: "choreo".to_string(),
            namespace: "events".to_string(),
        }
    }
}

impl BusConfig {
    pub fn new(service_name: impl Into<String>) -> Self {
        Self {
            service_name: service_name.into(),
            ..Self::default()
        }
    }

    /// Load configuration from `BUS_SERVICE_URL`, `BUS_SERVICE_NAME` and
    /// `BUS_NAMESPACE`, falling back to the defaults for unset variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            service_url: env::var("BUS_SERVICE_URL").unwrap_or(defaults.service_url),
            service_name: env::var("BUS_SERVICE_NAME").unwrap_or(defaults.service_name),
            namespace: env::var("BUS_NAMESPACE").unwrap_or(defaults.namespace),
        }
    }

    pub fn with_service_url(mut self, url: impl Into<String>) -> Self {
        self.service_url = url.into();
        self
    }

    pub fn with_service_name(mut self, name: impl Into<String>) -> Self {
        self.service_name = name.into();
        self
    }

    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = namespace.into();
        self
    }
}
