//! Environment probes for the save gate

use keyward_core::EnvironmentProbe;
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Environment variable naming the deployment environment
pub const ENVIRONMENT_VAR: &str = "KEYWARD_ENVIRONMENT";

/// Deployment environment of the running process
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Production,
    Development,
    Offline,
    Studio,
}

impl Environment {
    pub fn is_non_production(self) -> bool {
        !matches!(self, Self::Production)
    }

    /// Parse an environment name, case-insensitively
    pub fn parse(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "production" | "prod" => Some(Self::Production),
            "development" | "dev" => Some(Self::Development),
            "offline" => Some(Self::Offline),
            "studio" => Some(Self::Studio),
            _ => None,
        }
    }
}

/// Probe with a fixed answer
#[derive(Debug, Clone, Copy)]
pub struct StaticEnvironment(pub Environment);

impl StaticEnvironment {
    pub fn production() -> Self {
        Self(Environment::Production)
    }

    pub fn development() -> Self {
        Self(Environment::Development)
    }
}

impl EnvironmentProbe for StaticEnvironment {
    fn is_non_production(&self) -> bool {
        self.0.is_non_production()
    }
}

/// Probe reading [`ENVIRONMENT_VAR`] once at construction
///
/// An unset variable means production. An unrecognised value is treated as
/// development, so writes stay gated rather than reaching a live store.
#[derive(Debug, Clone, Copy)]
pub struct EnvVarEnvironment {
    environment: Environment,
}

impl EnvVarEnvironment {
    pub fn from_env() -> Self {
        let environment = match std::env::var(ENVIRONMENT_VAR) {
            Err(_) => Environment::Production,
            Ok(raw) => Environment::parse(&raw).unwrap_or_else(|| {
                warn!(value = %raw, "Unrecognised {ENVIRONMENT_VAR}, treating as development");
                Environment::Development
            }),
        };
        Self { environment }
    }

    pub fn environment(&self) -> Environment {
        self.environment
    }
}

impl EnvironmentProbe for EnvVarEnvironment {
    fn is_non_production(&self) -> bool {
        self.environment.is_non_production()
    }
}
