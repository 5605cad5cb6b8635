//! Configuration for Products API

use core_config::{
    app_info, database::DatabaseConfig, env_optional, env_or_default, server::ServerConfig,
    uploads::UploadConfig, AppInfo, FromEnv,
};

pub use core_config::Environment;

const DEFAULT_API_PREFIX: &str = "/api/v1";

/// Application configuration
#[derive(Clone, Debug)]
pub struct Config {
    pub app: AppInfo,
    pub database: DatabaseConfig,
    pub server: ServerConfig,
    pub uploads: UploadConfig,
    pub environment: Environment,
    /// Path every product route is nested under
    pub api_prefix: String,
    /// Largest `limit` accepted by the list endpoint; unbounded when unset
    pub max_page_limit: Option<u64>,
}

impl Config {
    pub fn from_env() -> eyre::Result<Self> {
        let environment = Environment::from_env();
        let database = DatabaseConfig::from_env()?; // Required - will fail if not set
        let server = ServerConfig::from_env()?;
        let uploads = UploadConfig::from_env()?;

        Ok(Self {
            app: app_info!(),
            database,
            server,
            uploads,
            environment,
            api_prefix: normalize_prefix(&env_or_default("API_PREFIX", DEFAULT_API_PREFIX)),
            max_page_limit: env_optional("PRODUCTS_MAX_PAGE_LIMIT")?,
        })
    }
}

/// `api/v1/` and `/api/v1` both become `/api/v1`.
fn normalize_prefix(raw: &str) -> String {
    let trimmed = raw.trim().trim_matches('/');
    if trimmed.is_empty() {
        DEFAULT_API_PREFIX.to_string()
    } else {
        format!("/{}", trimmed)
    }
}
