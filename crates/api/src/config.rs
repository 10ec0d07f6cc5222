use std::path::PathBuf;

use crate::auth::jwt::JwtConfig;

/// Server configuration loaded from environment variables.
///
/// All fields have defaults suitable for local development except the
/// secrets. In production, override via environment variables.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `3000`).
    pub port: u16,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS` env var.
    pub cors_origins: Vec<String>,
    /// HTTP request timeout in seconds (default: `30`).
    pub request_timeout_secs: u64,
    /// Access-token verification settings.
    pub jwt: JwtConfig,
    pub payment: PaymentConfig,
    /// Case content cache lifetime in seconds (default: `300`).
    pub case_cache_ttl_secs: u64,
    /// Directory for the persisted case snapshot; `None` disables that tier.
    pub case_cache_dir: Option<PathBuf>,
    /// `production` hides configuration hints from error bodies.
    pub app_env: String,
}

/// Payment gateway settings.
#[derive(Debug, Clone)]
pub struct PaymentConfig {
    pub api_url: String,
    /// `None` leaves payment completion unconfigured.
    pub api_secret: Option<String>,
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                | Default                    |
    /// |------------------------|----------------------------|
    /// | `HOST`                 | `0.0.0.0`                  |
    /// | `PORT`                 | `3000`                     |
    /// | `CORS_ORIGINS`         | `http://localhost:3000`    |
    /// | `REQUEST_TIMEOUT_SECS` | `30`                       |
    /// | `PAYMENT_API_URL`      | `https://api.portone.io`   |
    /// | `PAYMENT_API_SECRET`   | unset                      |
    /// | `CASE_CACHE_TTL_SECS`  | `300`                      |
    /// | `CASE_CACHE_DIR`       | unset                      |
    /// | `APP_ENV`              | `development`              |
    pub fn from_env() -> Self {
        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into());

        let port: u16 = std::env::var("PORT")
            .unwrap_or_else(|_| "3000".into())
            .parse()
            .expect("PORT must be a valid u16");

        let cors_origins: Vec<String> = std::env::var("CORS_ORIGINS")
            .unwrap_or_else(|_| "http://localhost:3000".into())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let request_timeout_secs: u64 = std::env::var("REQUEST_TIMEOUT_SECS")
            .unwrap_or_else(|_| "30".into())
            .parse()
            .expect("REQUEST_TIMEOUT_SECS must be a valid u64");

        let payment = PaymentConfig {
            api_url: std::env::var("PAYMENT_API_URL")
                .unwrap_or_else(|_| sleuth_payments::DEFAULT_API_URL.into()),
            api_secret: std::env::var("PAYMENT_API_SECRET")
                .ok()
                .filter(|s| !s.is_empty()),
        };

        let case_cache_ttl_secs: u64 = std::env::var("CASE_CACHE_TTL_SECS")
            .unwrap_or_else(|_| "300".into())
            .parse()
            .expect("CASE_CACHE_TTL_SECS must be a valid u64");

        let case_cache_dir = std::env::var("CASE_CACHE_DIR")
            .ok()
            .filter(|s| !s.is_empty())
            .map(PathBuf::from);

        let app_env = std::env::var("APP_ENV").unwrap_or_else(|_| "development".into());

        let jwt = JwtConfig::from_env();

        Self {
            host,
            port,
            cors_origins,
            request_timeout_secs,
            jwt,
            payment,
            case_cache_ttl_secs,
            case_cache_dir,
            app_env,
        }
    }

    pub fn is_production(&self) -> bool {
        self.app_env.eq_ignore_ascii_case("production")
    }
}
