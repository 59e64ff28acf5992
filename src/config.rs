use anyhow::{anyhow, Result};
use serde::Deserialize;
use std::env;
use tracing::{info, warn};

use crate::ai_provider::AiProviderKind;

// Import logging macros
use crate::{log_system_event, log_validation};

/// Complete application configuration loaded from environment variables
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub database: DatabaseConfig,
    pub ai: AiConfig,
    pub server: ServerConfig,
    pub upload: UploadConfig,
    pub logging: LoggingConfig,
}

/// Database connection configuration
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
}

/// Generative AI completion endpoint configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AiConfig {
    pub api_key: String,
    pub base_url: Option<String>,
    pub provider: AiProviderKind,
    pub model: Option<String>,
}

/// HTTP server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub port: u16,
    pub host: String,
}

/// Document upload handling configuration
#[derive(Debug, Clone, Deserialize)]
pub struct UploadConfig {
    pub directory: String,
    pub max_file_bytes: usize,
}

/// Logging system configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    pub file_enabled: bool,
    pub log_directory: String,
}

impl Config {
    /// Load configuration from environment variables with sensible defaults
    pub fn from_env() -> Result<Self> {
        log_system_event!(config, "Loading application configuration from environment variables");

        let config = Config {
            database: DatabaseConfig::from_env()?,
            ai: AiConfig::from_env()?,
            server: ServerConfig::from_env()?,
            upload: UploadConfig::from_env()?,
            logging: LoggingConfig::from_env()?,
        };

        log_system_event!(config, "Configuration loaded successfully");
        config.log_configuration_summary();

        Ok(config)
    }

    /// Log a summary of loaded configuration (without sensitive data)
    fn log_configuration_summary(&self) {
        info!(
            database_url_masked = %mask_sensitive_data(&self.database.url),
            ai_provider = ?self.ai.provider,
            ai_model = ?self.ai.model,
            server_address = %format!("{}:{}", self.server.host, self.server.port),
            upload_directory = %self.upload.directory,
            log_level = %self.logging.level,
            "Configuration summary"
        );
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if !self.database.url.contains("sqlite:") && !self.database.url.contains("postgres://") {
            return Err(anyhow!(
                "DATABASE_URL must start with 'sqlite:' or 'postgres://'"
            ));
        }

        if self.server.port == 0 {
            return Err(anyhow!("Server port must be greater than 0"));
        }

        if self.upload.max_file_bytes == 0 {
            return Err(anyhow!("MAX_UPLOAD_BYTES must be greater than 0"));
        }

        if !self.ai.is_usable() {
            warn!("AI API key appears to be placeholder or empty - generation features will be disabled");
        }

        if !["trace", "debug", "info", "warn", "error"]
            .contains(&self.logging.level.to_lowercase().as_str())
        {
            warn!(
                "Invalid log level '{}', using 'info' as fallback",
                self.logging.level
            );
        }

        log_validation!(success, "configuration", "Configuration validation completed successfully");
        Ok(())
    }
}

impl DatabaseConfig {
    fn from_env() -> Result<Self> {
        let url = env::var("DATABASE_URL").unwrap_or_else(|_| "sqlite:intellexa.db".to_string());

        Ok(DatabaseConfig { url })
    }
}

impl AiConfig {
    fn from_env() -> Result<Self> {
        let api_key = env::var("AI_API_KEY")
            .or_else(|_| env::var("GOOGLE_API_KEY"))
            .unwrap_or_default();

        let base_url = env::var("AI_BASE_URL").ok();

        let provider_str = env::var("AI_PROVIDER").unwrap_or_else(|_| "gemini".to_string());
        let provider = match provider_str.to_lowercase().as_str() {
            "openai" | "chatgpt" | "gpt" => AiProviderKind::OpenAi,
            "gemini" | "google" => AiProviderKind::Gemini,
            _ => {
                info!(
                    "Unknown AI provider '{}', defaulting to Gemini",
                    provider_str
                );
                AiProviderKind::Gemini
            }
        };

        let model = env::var("AI_MODEL").ok();

        Ok(AiConfig {
            api_key,
            base_url,
            provider,
            model,
        })
    }

    /// Whether the key looks real enough to attempt requests with
    pub fn is_usable(&self) -> bool {
        !self.api_key.is_empty() && self.api_key != "your-api-key"
    }
}

impl ServerConfig {
    fn from_env() -> Result<Self> {
        let port_str = env::var("PORT").unwrap_or_else(|_| "5000".to_string());

        let port = port_str.parse::<u16>().map_err(|_| {
            anyhow!(
                "Invalid PORT value: '{}'. Must be a number between 1-65535",
                port_str
            )
        })?;

        let host = env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string());

        Ok(ServerConfig { port, host })
    }
}

impl UploadConfig {
    fn from_env() -> Result<Self> {
        let directory = env::var("UPLOAD_DIRECTORY").unwrap_or_else(|_| "uploads".to_string());

        let max_file_bytes = env::var("MAX_UPLOAD_BYTES")
            .ok()
            .and_then(|v| v.parse::<usize>().ok())
            .unwrap_or(50 * 1024 * 1024);

        Ok(UploadConfig {
            directory,
            max_file_bytes,
        })
    }
}

impl LoggingConfig {
    /// Public so logging can be initialized before the rest of the
    /// configuration is loaded (and its loading logged)
    pub fn from_env() -> Result<Self> {
        let level = env::var("RUST_LOG").unwrap_or_else(|_| "info,intellexa=debug".to_string());

        let file_enabled = env::var("LOG_FILE_ENABLED")
            .unwrap_or_else(|_| "true".to_string())
            .parse::<bool>()
            .unwrap_or(true);

        let log_directory = env::var("LOG_DIRECTORY").unwrap_or_else(|_| "logs".to_string());

        Ok(LoggingConfig {
            level,
            file_enabled,
            log_directory,
        })
    }
}

/// Mask sensitive data in configuration for safe logging
fn mask_sensitive_data(data: &str) -> String {
    if data.len() <= 8 {
        "*".repeat(data.len())
    } else {
        format!("{}***{}", &data[..4], &data[data.len() - 4..])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;

    #[test]
    fn test_mask_sensitive_data() {
        assert_eq!(mask_sensitive_data("short"), "*****");
        assert_eq!(mask_sensitive_data("sqlite:intellexa.db"), "sqli***a.db");
        assert_eq!(mask_sensitive_data("sk-1234567890abcdef"), "sk-1***cdef");
    }

    #[test]
    fn test_database_config_defaults() {
        unsafe { env::remove_var("DATABASE_URL") };

        let config = DatabaseConfig::from_env().unwrap();
        assert_eq!(config.url, "sqlite:intellexa.db");
    }

    #[test]
    fn test_server_config_defaults() {
        unsafe {
            env::remove_var("PORT");
            env::remove_var("HOST");
        }

        let config = ServerConfig::from_env().unwrap();
        assert_eq!(config.port, 5000);
        assert_eq!(config.host, "0.0.0.0");
    }

    #[test]
    fn test_upload_config_defaults() {
        unsafe {
            env::remove_var("UPLOAD_DIRECTORY");
            env::remove_var("MAX_UPLOAD_BYTES");
        }

        let config = UploadConfig::from_env().unwrap();
        assert_eq!(config.directory, "uploads");
        assert_eq!(config.max_file_bytes, 50 * 1024 * 1024);
    }

    #[test]
    fn test_ai_provider_parsing() {
        let test_cases = vec![
            ("gemini", AiProviderKind::Gemini),
            ("Google", AiProviderKind::Gemini),
            ("openai", AiProviderKind::OpenAi),
            ("chatgpt", AiProviderKind::OpenAi),
            ("gpt", AiProviderKind::OpenAi),
            ("unknown", AiProviderKind::Gemini), // defaults to Gemini
        ];

        for (input, expected) in test_cases {
            unsafe { env::set_var("AI_PROVIDER", input) };
            let config = AiConfig::from_env().unwrap();
            assert_eq!(
                config.provider, expected,
                "Input '{}' should map to {:?}",
                input, expected
            );
        }

        unsafe { env::remove_var("AI_PROVIDER") };
    }

    #[test]
    fn test_ai_key_usability() {
        let mut config = AiConfig {
            api_key: String::new(),
            base_url: None,
            provider: AiProviderKind::Gemini,
            model: None,
        };
        assert!(!config.is_usable());

        config.api_key = "your-api-key".to_string();
        assert!(!config.is_usable());

        config.api_key = "real-key".to_string();
        assert!(config.is_usable());
    }

    #[test]
    fn test_config_validation() {
        let config = Config {
            database: DatabaseConfig {
                url: "sqlite:test.db".to_string(),
            },
            ai: AiConfig {
                api_key: "sk-valid-key".to_string(),
                base_url: None,
                provider: AiProviderKind::Gemini,
                model: None,
            },
            server: ServerConfig {
                port: 5000,
                host: "0.0.0.0".to_string(),
            },
            upload: UploadConfig {
                directory: "uploads".to_string(),
                max_file_bytes: 50 * 1024 * 1024,
            },
            logging: LoggingConfig {
                level: "info".to_string(),
                file_enabled: true,
                log_directory: "logs".to_string(),
            },
        };

        assert!(config.validate().is_ok());

        let mut invalid_config = config.clone();
        invalid_config.server.port = 0;
        assert!(invalid_config.validate().is_err());

        let mut invalid_config = config.clone();
        invalid_config.database.url = "mysql://nope".to_string();
        assert!(invalid_config.validate().is_err());
    }

    #[test]
    fn test_invalid_port_parsing() {
        unsafe { env::set_var("PORT", "not-a-number") };
        let result = ServerConfig::from_env();
        assert!(result.is_err());

        unsafe { env::remove_var("PORT") };
    }
}
