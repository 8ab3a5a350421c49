use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::env;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub environment: Environment,
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
    pub llm: LlmConfig,
    pub security: SecurityConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Environment {
    Development,
    Staging,
    Production,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    /// Seconds to wait for a pooled connection
    pub connection_timeout: u64,
}

/// Identity provider settings. A configured user pool selects Cognito
/// verification; otherwise a shared secret enables HS256 tokens.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AuthConfig {
    pub user_pool_id: Option<String>,
    pub region: Option<String>,
    pub client_id: Option<String>,
    #[serde(skip_serializing)]
    pub jwt_secret: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
    pub base_url: String,
    pub chat_model: String,
    pub nft_model: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityConfig {
    pub enable_cors: bool,
    /// Empty means any origin
    pub cors_origins: Vec<String>,
    pub max_request_size_bytes: usize,
}

fn non_empty(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.trim().is_empty())
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
        // Server overrides
        if let Ok(v) = env::var("HOST") {
            self.server.host = v;
        }
        if let Ok(v) = env::var("PORT") {
            self.server.port = v.parse().unwrap_or(self.server.port);
        }

        // Database overrides
        if let Some(v) = non_empty("DATABASE_URL") {
            self.database.url = v;
        }
        if let Ok(v) = env::var("DATABASE_MAX_CONNECTIONS") {
            self.database.max_connections = v.parse().unwrap_or(self.database.max_connections);
        }
        if let Ok(v) = env::var("DATABASE_CONNECTION_TIMEOUT") {
            self.database.connection_timeout =
                v.parse().unwrap_or(self.database.connection_timeout);
        }

        // Auth overrides
        self.auth.user_pool_id = non_empty("USER_POOL_ID").or(self.auth.user_pool_id);
        self.auth.region = non_empty("REGION")
            .or_else(|| non_empty("AWS_REGION"))
            .or(self.auth.region);
        self.auth.client_id = non_empty("CLIENT_ID").or(self.auth.client_id);
        self.auth.jwt_secret = non_empty("AUTH_JWT_SECRET").or(self.auth.jwt_secret);

        // LLM overrides
        self.llm.api_key = non_empty("OPENAI_API_KEY").or(self.llm.api_key);
        if let Some(v) = non_empty("OPENAI_BASE_URL") {
            self.llm.base_url = v;
        }
        if let Some(v) = non_empty("LLM_CHAT_MODEL") {
            self.llm.chat_model = v;
        }
        if let Some(v) = non_empty("LLM_NFT_MODEL") {
            self.llm.nft_model = v;
        }

        // Security overrides
        if let Ok(v) = env::var("SECURITY_ENABLE_CORS") {
            self.security.enable_cors = v.parse().unwrap_or(self.security.enable_cors);
        }
        if let Ok(v) = env::var("SECURITY_CORS_ORIGINS") {
            self.security.cors_origins = v
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect();
        }
        if let Ok(v) = env::var("API_MAX_REQUEST_SIZE_BYTES") {
            self.security.max_request_size_bytes =
                v.parse().unwrap_or(self.security.max_request_size_bytes);
        }

        self
    }

    fn base(environment: Environment) -> Self {
        Self {
            environment,
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 8080,
            },
            database: DatabaseConfig {
                url: "sqlite://todos.db?mode=rwc".to_string(),
                max_connections: 5,
                connection_timeout: 30,
            },
            auth: AuthConfig::default(),
            llm: LlmConfig {
                api_key: None,
                base_url: "https://api.openai.com/v1".to_string(),
                chat_model: "gpt-4o-mini".to_string(),
                nft_model: "gpt-4o-mini-2024-07-18".to_string(),
            },
            security: SecurityConfig {
                enable_cors: true,
                cors_origins: Vec::new(),
                max_request_size_bytes: 1024 * 1024, // 1MB
            },
        }
    }

    pub fn development() -> Self {
        Self::base(Environment::Development)
    }

    pub fn staging() -> Self {
        let mut config = Self::base(Environment::Staging);
        config.database.max_connections = 10;
        config.database.connection_timeout = 10;
        config
    }

    pub fn production() -> Self {
        let mut config = Self::base(Environment::Production);
        config.database.max_connections = 20;
        config.database.connection_timeout = 5;
        config.security.max_request_size_bytes = 256 * 1024;
        config
    }
}

// Global singleton config - initialized once at startup
pub static CONFIG: Lazy<AppConfig> = Lazy::new(AppConfig::from_env);

// Convenience function for accessing config
pub fn config() -> &'static AppConfig {
    &CONFIG
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_development_config() {
        let config = AppConfig::development();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.llm.chat_model, "gpt-4o-mini");
        assert_eq!(config.llm.nft_model, "gpt-4o-mini-2024-07-18");
        assert!(config.security.cors_origins.is_empty());
        assert!(config.auth.user_pool_id.is_none());
    }

    #[test]
    fn test_default_production_config() {
        let config = AppConfig::production();
        assert_eq!(config.environment, Environment::Production);
        assert_eq!(config.database.connection_timeout, 5);
        assert!(
            config.security.max_request_size_bytes
                < AppConfig::development().security.max_request_size_bytes
        );
    }

    #[test]
    fn secrets_are_not_serialized() {
        let mut config = AppConfig::development();
        config.auth.jwt_secret = Some("hunter2".into());
        config.llm.api_key = Some("sk-test".into());
        let text = serde_json::to_string(&config).unwrap();
        assert!(!text.contains("hunter2"));
        assert!(!text.contains("sk-test"));
    }
}
