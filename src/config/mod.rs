use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::env;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub environment: Environment,
    pub server: ServerConfig,
    pub identity: IdentityConfig,
    pub database: DatabaseConfig,
    pub pagination: PaginationConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Environment {
    Development,
    Staging,
    Production,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdentityConfig {
    /// Token-verification endpoint of the external identity provider
    pub verify_url: String,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub max_connections: u32,
    pub connect_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaginationConfig {
    pub default_per_page: i64,
    pub max_per_page: i64,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let environment = match env::var("APP_ENV").as_deref() {
            Ok("production") | Ok("prod") => Environment::Production,
            Ok("staging") | Ok("stage") => Environment::Staging,
            _ => Environment::Development,
        };

        // Set defaults based on environment, then override with specific env vars
        match environment {
            Environment::Production => Self::production(),
            Environment::Staging => Self::staging(),
            Environment::Development => Self::development(),
        }
        .with_env_overrides()
    }

    fn with_env_overrides(mut self) -> Self {
        if let Ok(v) = env::var("SERVER_PORT") {
            self.server.port = v.parse().unwrap_or(self.server.port);
        }

        if let Ok(v) = env::var("IDENTITY_VERIFY_URL") {
            self.identity.verify_url = v;
        }
        if let Ok(v) = env::var("IDENTITY_TIMEOUT_SECS") {
            self.identity.timeout_secs = v.parse().unwrap_or(self.identity.timeout_secs);
        }

        if let Ok(v) = env::var("DATABASE_MAX_CONNECTIONS") {
            self.database.max_connections = v.parse().unwrap_or(self.database.max_connections);
        }
        if let Ok(v) = env::var("DATABASE_CONNECT_TIMEOUT_SECS") {
            self.database.connect_timeout_secs =
                v.parse().unwrap_or(self.database.connect_timeout_secs);
        }

        if let Ok(v) = env::var("PAGINATION_DEFAULT_PER_PAGE") {
            self.pagination.default_per_page =
                v.parse().unwrap_or(self.pagination.default_per_page);
        }
        if let Ok(v) = env::var("PAGINATION_MAX_PER_PAGE") {
            self.pagination.max_per_page = v.parse().unwrap_or(self.pagination.max_per_page);
        }

        self
    }

    fn development() -> Self {
        Self {
            environment: Environment::Development,
            server: ServerConfig { port: 3000 },
            identity: IdentityConfig {
                verify_url: "http://localhost:9099/v1/verify".to_string(),
                timeout_secs: 10,
            },
            database: DatabaseConfig {
                max_connections: 10,
                connect_timeout_secs: 30,
            },
            pagination: PaginationConfig {
                default_per_page: 10,
                max_per_page: 100,
            },
        }
    }

    fn staging() -> Self {
        Self {
            environment: Environment::Staging,
            server: ServerConfig { port: 3000 },
            identity: IdentityConfig {
                verify_url: "https://identity.staging.example.com/v1/verify".to_string(),
                timeout_secs: 10,
            },
            database: DatabaseConfig {
                max_connections: 20,
                connect_timeout_secs: 10,
            },
            pagination: PaginationConfig {
                default_per_page: 10,
                max_per_page: 100,
            },
        }
    }

    fn production() -> Self {
        Self {
            environment: Environment::Production,
            server: ServerConfig { port: 3000 },
            identity: IdentityConfig {
                verify_url: "https://identity.example.com/v1/verify".to_string(),
                timeout_secs: 5,
            },
            database: DatabaseConfig {
                max_connections: 50,
                connect_timeout_secs: 5,
            },
            pagination: PaginationConfig {
                default_per_page: 10,
                max_per_page: 50,
            },
        }
    }
}

// Global singleton config - initialized once at startup
pub static CONFIG: Lazy<AppConfig> = Lazy::new(AppConfig::from_env);

// Convenience function for accessing config
pub fn config() -> &'static AppConfig {
    &CONFIG
}
