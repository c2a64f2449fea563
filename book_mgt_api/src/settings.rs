use std::collections::HashMap;

use anyhow::Context;
use config::{Config, Environment};
use serde::Deserialize;

use crate::auth::AdminCredentials;
use crate::books_repository::PostgresBooksRepositoryConfig;

/// Runtime settings of the service, read from environment variables
/// (`DB_USERNAME`, `DB_PASSWORD`, `DB_ENDPOINT`, `DB_NAME`, `USE_IN_MEMORY_DB`,
/// `API_HOST`, `API_PORT`, `ADMIN_USERNAME`, `ADMIN_PASSWORD`, `JAEGER_ENABLED`)
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct Settings {
    pub db_username: String,
    pub db_password: String,
    pub db_endpoint: String,
    pub db_name: String,
    pub use_in_memory_db: bool,
    pub api_host: String,
    pub api_port: u16,
    pub admin_username: String,
    pub admin_password: String,
    pub jaeger_enabled: bool,
}

impl Settings {
    /// Loads settings from the process environment
    pub fn load() -> anyhow::Result<Self> {
        Self::from_environment(Environment::default())
    }

    /// Loads settings from an explicit set of variables, used instead of the process environment
    pub fn from_variables(variables: HashMap<String, String>) -> anyhow::Result<Self> {
        Self::from_environment(Environment::default().source(Some(variables)))
    }

    fn from_environment(environment: Environment) -> anyhow::Result<Self> {
        Config::builder()
            .set_default("db_username", "postgres")?
            .set_default("db_password", "postgres")?
            .set_default("db_endpoint", "127.0.0.1:5432")?
            .set_default("db_name", "postgres")?
            .set_default("use_in_memory_db", false)?
            .set_default("api_host", "0.0.0.0")?
            .set_default("api_port", 8000)?
            .set_default("admin_username", "admin")?
            .set_default("admin_password", "password")?
            .set_default("jaeger_enabled", true)?
            .add_source(environment)
            .build()
            .context("Failed to read configuration")?
            .try_deserialize()
            .context("Invalid configuration")
    }

    pub fn postgres_config(&self) -> PostgresBooksRepositoryConfig {
        PostgresBooksRepositoryConfig {
            endpoint: self.db_endpoint.clone(),
            username: self.db_username.clone(),
            password: self.db_password.clone(),
            database: self.db_name.clone(),
        }
    }

    pub fn admin_credentials(&self) -> AdminCredentials {
        AdminCredentials::new(&self.admin_username, &self.admin_password)
    }
}
