//! Server configuration loaded from `AGENTXMAP_*` environment variables.

use std::env;
use std::str::FromStr;
use std::time::Duration;

use agentxmap_auth::IdentityConfig;
use agentxmap_auth::config::MAX_INVITATION_LIFETIME_SECS;
use agentxmap_db::DbConfig;
use tracing::debug;

const DEFAULT_ORGANIZATION: &str = "Default Organization";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid value for {var}: {reason}")]
    Invalid { var: &'static str, reason: String },

    #[error("{set} is set but {missing} is not")]
    Incomplete {
        set: &'static str,
        missing: &'static str,
    },
}

/// Credentials for the admin account provisioned at start-up.
#[derive(Clone)]
pub struct InitialAdmin {
    pub email: String,
    pub password: String,
    pub organization: String,
}

impl std::fmt::Debug for InitialAdmin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InitialAdmin")
            .field("email", &self.email)
            .field("organization", &self.organization)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone, Default)]
pub struct ServerConfig {
    pub db: DbConfig,
    pub identity: IdentityConfig,
    pub initial_admin: Option<InitialAdmin>,
}

impl ServerConfig {
    /// Load configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        debug!("Loading configuration from environment variables");
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build configuration from an arbitrary variable source. Unset
    /// variables keep their defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        // Database
        if let Some(url) = lookup("AGENTXMAP_DB_URL") {
            config.db.url = url;
        }
        if let Some(namespace) = lookup("AGENTXMAP_DB_NAMESPACE") {
            config.db.namespace = namespace;
        }
        if let Some(database) = lookup("AGENTXMAP_DB_DATABASE") {
            config.db.database = database;
        }
        if let Some(username) = lookup("AGENTXMAP_DB_USERNAME") {
            config.db.username = username;
        }
        if let Some(password) = lookup("AGENTXMAP_DB_PASSWORD") {
            config.db.password = password;
        }
        if let Some(secs) = parse_var(&lookup, "AGENTXMAP_DB_CONNECT_TIMEOUT_SECS")? {
            config.db.connect_timeout = Duration::from_secs(secs);
        }

        // Identity
        config.identity.pepper = lookup("AGENTXMAP_PEPPER").filter(|p| !p.is_empty());
        if let Some(secs) = parse_var(&lookup, "AGENTXMAP_INVITATION_LIFETIME_SECS")? {
            if secs == 0 || secs > MAX_INVITATION_LIFETIME_SECS {
                return Err(ConfigError::Invalid {
                    var: "AGENTXMAP_INVITATION_LIFETIME_SECS",
                    reason: format!("must be between 1 and {MAX_INVITATION_LIFETIME_SECS}"),
                });
            }
            config.identity.invitation_lifetime_secs = secs;
        }
        if let Some(kib) = parse_var(&lookup, "AGENTXMAP_PASSWORD_MEMORY_KIB")? {
            config.identity.password_memory_kib = kib;
        }
        if let Some(iterations) = parse_var(&lookup, "AGENTXMAP_PASSWORD_ITERATIONS")? {
            config.identity.password_iterations = iterations;
        }

        // Bootstrap account
        let email = lookup("AGENTXMAP_INITIAL_ADMIN_EMAIL");
        let password = lookup("AGENTXMAP_INITIAL_ADMIN_PASSWORD");
        config.initial_admin = match (email, password) {
            (Some(email), Some(password)) => Some(InitialAdmin {
                email,
                password,
                organization: lookup("AGENTXMAP_INITIAL_ADMIN_ORGANIZATION")
                    .unwrap_or_else(|| DEFAULT_ORGANIZATION.into()),
            }),
            (Some(_), None) => {
                return Err(ConfigError::Incomplete {
                    set: "AGENTXMAP_INITIAL_ADMIN_EMAIL",
                    missing: "AGENTXMAP_INITIAL_ADMIN_PASSWORD",
                });
            }
            (None, Some(_)) => {
                return Err(ConfigError::Incomplete {
                    set: "AGENTXMAP_INITIAL_ADMIN_PASSWORD",
                    missing: "AGENTXMAP_INITIAL_ADMIN_EMAIL",
                });
            }
            (None, None) => None,
        };

        Ok(config)
    }
}

fn parse_var<F, T>(lookup: &F, var: &'static str) -> Result<Option<T>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    lookup(var)
        .map(|raw| {
            raw.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
                var,
                reason: e.to_string(),
            })
        })
        .transpose()
}
