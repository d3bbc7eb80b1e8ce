use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::env;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub environment: Environment,
    pub database: DatabaseConfig,
    pub api: ApiConfig,
    pub security: SecurityConfig,
    pub auth: AuthConfig,
    pub ai: AiConfig,
    pub email: EmailConfig,
    pub jobs: JobsConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Environment {
    Development,
    Staging,
    Production,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub max_connections: u32,
    pub connection_timeout: u64,
    pub run_migrations: bool,
    pub enable_query_logging: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    pub default_page_size: i64,
    pub max_page_size: i64,
    pub enable_request_logging: bool,
    pub max_request_size_bytes: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityConfig {
    pub enable_cors: bool,
    pub cors_origins: Vec<String>,
    /// Shared secret that gates the /internal/cron routes. Empty means the
    /// routes refuse every caller.
    pub cron_secret: String,
    pub invitation_expiry_days: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// HS256 secret shared with the identity provider. Tokens are verified
    /// here, never issued.
    pub jwt_secret: String,
    pub jwt_audience: String,
    pub leeway_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AiConfig {
    pub enabled: bool,
    pub base_url: String,
    pub api_key: String,
    pub model: String,
    pub timeout_secs: u64,
    pub max_suggestions: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailConfig {
    pub enabled: bool,
    pub base_url: String,
    pub api_key: String,
    pub from_address: String,
    /// Base URL the accept link in invitation emails points at. The raw
    /// token is appended as the final path segment.
    pub invite_link_base: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobsConfig {
    pub weekly_report_enabled: bool,
    pub okr_analysis_enabled: bool,
    /// Objectives examined per company in one analysis run.
    pub analysis_batch_size: i64,
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
        // Database overrides
        if let Ok(v) = env::var("DATABASE_MAX_CONNECTIONS") {
            self.database.max_connections = v.parse().unwrap_or(self.database.max_connections);
        }
        if let Ok(v) = env::var("DATABASE_CONNECTION_TIMEOUT") {
            self.database.connection_timeout = v.parse().unwrap_or(self.database.connection_timeout);
        }
        if let Ok(v) = env::var("DATABASE_RUN_MIGRATIONS") {
            self.database.run_migrations = v.parse().unwrap_or(self.database.run_migrations);
        }
        if let Ok(v) = env::var("DATABASE_ENABLE_QUERY_LOGGING") {
            self.database.enable_query_logging = v.parse().unwrap_or(self.database.enable_query_logging);
        }

        // API overrides
        if let Ok(v) = env::var("API_DEFAULT_PAGE_SIZE") {
            self.api.default_page_size = v.parse().unwrap_or(self.api.default_page_size);
        }
        if let Ok(v) = env::var("API_MAX_PAGE_SIZE") {
            self.api.max_page_size = v.parse().unwrap_or(self.api.max_page_size);
        }
        if let Ok(v) = env::var("API_ENABLE_REQUEST_LOGGING") {
            self.api.enable_request_logging = v.parse().unwrap_or(self.api.enable_request_logging);
        }
        if let Ok(v) = env::var("API_MAX_REQUEST_SIZE_BYTES") {
            self.api.max_request_size_bytes = v.parse().unwrap_or(self.api.max_request_size_bytes);
        }

        // Security overrides
        if let Ok(v) = env::var("SECURITY_ENABLE_CORS") {
            self.security.enable_cors = v.parse().unwrap_or(self.security.enable_cors);
        }
        if let Ok(v) = env::var("SECURITY_CORS_ORIGINS") {
            self.security.cors_origins = v.split(',').map(|s| s.trim().to_string()).collect();
        }
        if let Ok(v) = env::var("CRON_SECRET") {
            self.security.cron_secret = v;
        }
        if let Ok(v) = env::var("SECURITY_INVITATION_EXPIRY_DAYS") {
            self.security.invitation_expiry_days =
                v.parse().unwrap_or(self.security.invitation_expiry_days);
        }

        // Auth overrides
        if let Ok(v) = env::var("AUTH_JWT_SECRET") {
            self.auth.jwt_secret = v;
        }
        if let Ok(v) = env::var("AUTH_JWT_AUDIENCE") {
            self.auth.jwt_audience = v;
        }
        if let Ok(v) = env::var("AUTH_JWT_LEEWAY_SECS") {
            self.auth.leeway_secs = v.parse().unwrap_or(self.auth.leeway_secs);
        }

        // AI overrides
        if let Ok(v) = env::var("AI_ENABLED") {
            self.ai.enabled = v.parse().unwrap_or(self.ai.enabled);
        }
        if let Ok(v) = env::var("AI_BASE_URL") {
            self.ai.base_url = v;
        }
        if let Ok(v) = env::var("AI_API_KEY") {
            self.ai.api_key = v;
        }
        if let Ok(v) = env::var("AI_MODEL") {
            self.ai.model = v;
        }
        if let Ok(v) = env::var("AI_TIMEOUT_SECS") {
            self.ai.timeout_secs = v.parse().unwrap_or(self.ai.timeout_secs);
        }
        if let Ok(v) = env::var("AI_MAX_SUGGESTIONS") {
            self.ai.max_suggestions = v.parse().unwrap_or(self.ai.max_suggestions);
        }

        // Email overrides
        if let Ok(v) = env::var("EMAIL_ENABLED") {
            self.email.enabled = v.parse().unwrap_or(self.email.enabled);
        }
        if let Ok(v) = env::var("EMAIL_BASE_URL") {
            self.email.base_url = v;
        }
        if let Ok(v) = env::var("EMAIL_API_KEY") {
            self.email.api_key = v;
        }
        if let Ok(v) = env::var("EMAIL_FROM_ADDRESS") {
            self.email.from_address = v;
        }
        if let Ok(v) = env::var("EMAIL_INVITE_LINK_BASE") {
            self.email.invite_link_base = v;
        }

        // Job overrides
        if let Ok(v) = env::var("JOBS_WEEKLY_REPORT_ENABLED") {
            self.jobs.weekly_report_enabled = v.parse().unwrap_or(self.jobs.weekly_report_enabled);
        }
        if let Ok(v) = env::var("JOBS_OKR_ANALYSIS_ENABLED") {
            self.jobs.okr_analysis_enabled = v.parse().unwrap_or(self.jobs.okr_analysis_enabled);
        }
        if let Ok(v) = env::var("JOBS_ANALYSIS_BATCH_SIZE") {
            self.jobs.analysis_batch_size = v.parse().unwrap_or(self.jobs.analysis_batch_size);
        }

        self
    }

    fn development() -> Self {
        Self {
            environment: Environment::Development,
            database: DatabaseConfig {
                max_connections: 10,
                connection_timeout: 30,
                run_migrations: true,
                enable_query_logging: true,
            },
            api: ApiConfig {
                default_page_size: 50,
                max_page_size: 200,
                enable_request_logging: true,
                max_request_size_bytes: 1024 * 1024, // 1MB
            },
            security: SecurityConfig {
                enable_cors: true,
                cors_origins: vec![
                    "http://localhost:3000".to_string(),
                    "http://localhost:5173".to_string(),
                ],
                cron_secret: String::new(),
                invitation_expiry_days: 7,
            },
            auth: AuthConfig {
                jwt_secret: String::new(),
                jwt_audience: "authenticated".to_string(),
                leeway_secs: 60,
            },
            ai: AiConfig {
                enabled: false,
                base_url: "https://api.openai.com/v1".to_string(),
                api_key: String::new(),
                model: "gpt-4o-mini".to_string(),
                timeout_secs: 30,
                max_suggestions: 5,
            },
            email: EmailConfig {
                enabled: false,
                base_url: "https://api.resend.com".to_string(),
                api_key: String::new(),
                from_address: "Compass <no-reply@localhost>".to_string(),
                invite_link_base: "http://localhost:5173/invitations".to_string(),
            },
            jobs: JobsConfig {
                weekly_report_enabled: false,
                okr_analysis_enabled: false,
                analysis_batch_size: 10,
            },
        }
    }

    fn staging() -> Self {
        Self {
            environment: Environment::Staging,
            database: DatabaseConfig {
                max_connections: 20,
                connection_timeout: 10,
                run_migrations: true,
                enable_query_logging: true,
            },
            api: ApiConfig {
                default_page_size: 50,
                max_page_size: 200,
                enable_request_logging: true,
                max_request_size_bytes: 1024 * 1024, // 1MB
            },
            security: SecurityConfig {
                enable_cors: true,
                cors_origins: vec!["https://staging.example.com".to_string()],
                cron_secret: String::new(),
                invitation_expiry_days: 7,
            },
            auth: AuthConfig {
                jwt_secret: String::new(),
                jwt_audience: "authenticated".to_string(),
                leeway_secs: 60,
            },
            ai: AiConfig {
                enabled: false,
                base_url: "https://api.openai.com/v1".to_string(),
                api_key: String::new(),
                model: "gpt-4o-mini".to_string(),
                timeout_secs: 30,
                max_suggestions: 5,
            },
            email: EmailConfig {
                enabled: true,
                base_url: "https://api.resend.com".to_string(),
                api_key: String::new(),
                from_address: "Compass <no-reply@staging.example.com>".to_string(),
                invite_link_base: "https://staging.example.com/invitations".to_string(),
            },
            jobs: JobsConfig {
                weekly_report_enabled: true,
                okr_analysis_enabled: true,
                analysis_batch_size: 10,
            },
        }
    }

    fn production() -> Self {
        Self {
            environment: Environment::Production,
            database: DatabaseConfig {
                max_connections: 50,
                connection_timeout: 5,
                run_migrations: true,
                enable_query_logging: false,
            },
            api: ApiConfig {
                default_page_size: 50,
                max_page_size: 100,
                enable_request_logging: false,
                max_request_size_bytes: 512 * 1024, // 512KB
            },
            security: SecurityConfig {
                enable_cors: true,
                cors_origins: vec!["https://app.example.com".to_string()],
                cron_secret: String::new(),
                invitation_expiry_days: 7,
            },
            auth: AuthConfig {
                jwt_secret: String::new(),
                jwt_audience: "authenticated".to_string(),
                leeway_secs: 60,
            },
            ai: AiConfig {
                enabled: false,
                base_url: "https://api.openai.com/v1".to_string(),
                api_key: String::new(),
                model: "gpt-4o-mini".to_string(),
                timeout_secs: 30,
                max_suggestions: 5,
            },
            email: EmailConfig {
                enabled: true,
                base_url: "https://api.resend.com".to_string(),
                api_key: String::new(),
                from_address: "Compass <no-reply@example.com>".to_string(),
                invite_link_base: "https://app.example.com/invitations".to_string(),
            },
            jobs: JobsConfig {
                weekly_report_enabled: true,
                okr_analysis_enabled: true,
                analysis_batch_size: 25,
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

// Helper macros for common checks
#[macro_export]
macro_rules! is_development {
    () => {
        matches!($crate::config::CONFIG.environment, $crate::config::Environment::Development)
    };
}

#[macro_export]
macro_rules! is_production {
    () => {
        matches!($crate::config::CONFIG.environment, $crate::config::Environment::Production)
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_development_config() {
        let config = AppConfig::development();
        assert!(!config.ai.enabled);
        assert!(!config.jobs.weekly_report_enabled);
        assert!(config.security.cron_secret.is_empty());
        assert_eq!(config.api.default_page_size, 50);
        assert_eq!(config.security.invitation_expiry_days, 7);
    }

    #[test]
    fn test_default_production_config() {
        let config = AppConfig::production();
        assert!(config.jobs.weekly_report_enabled);
        assert!(config.jobs.okr_analysis_enabled);
        assert!(!config.api.enable_request_logging);
        assert_eq!(config.auth.jwt_audience, "authenticated");
    }

    #[test]
    fn test_page_size_caps_tighten_in_production() {
        let dev = AppConfig::development();
        let prod = AppConfig::production();
        assert!(prod.api.max_page_size <= dev.api.max_page_size);
        assert!(prod.api.max_request_size_bytes <= dev.api.max_request_size_bytes);
    }
}
