//! Application configuration loaded from environment variables.

use crate::error::{AppError, Result};
use std::env;

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Database connection URL
    pub database_url: String,

    /// Server bind address (host:port)
    pub bind_address: String,

    /// Log level
    pub log_level: String,

    /// Filesystem storage path for uploaded note files
    pub storage_path: String,

    /// JWT secret key for signing tokens
    pub jwt_secret: String,

    /// JWT access token expiry in minutes
    pub jwt_access_token_expiry_minutes: i64,

    /// JWT refresh token expiry in days
    pub jwt_refresh_token_expiry_days: i64,

    /// Payment gateway key id (Razorpay-style basic auth user)
    pub gateway_key_id: String,

    /// Payment gateway key secret (basic auth password, HMAC signing secret)
    pub gateway_key_secret: String,

    /// Payment gateway API base URL
    pub gateway_api_url: String,

    /// UPI gateway order-status URL (optional alternate gateway)
    pub upi_gateway_url: Option<String>,

    /// UPI gateway merchant token (optional)
    pub upi_gateway_token: Option<String>,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            database_url: env::var("DATABASE_URL")
                .map_err(|_| AppError::Config("DATABASE_URL not set".into()))?,
            bind_address: env::var("BIND_ADDRESS").unwrap_or_else(|_| "0.0.0.0:8080".into()),
            log_level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".into()),
            storage_path: env::var("STORAGE_PATH")
                .unwrap_or_else(|_| "/var/lib/notevault/files".into()),
            jwt_secret: env::var("JWT_SECRET")
                .map_err(|_| AppError::Config("JWT_SECRET not set".into()))?,
            jwt_access_token_expiry_minutes: env::var("JWT_ACCESS_TOKEN_EXPIRY_MINUTES")
                .unwrap_or_else(|_| "30".into())
                .parse()
                .unwrap_or(30),
            jwt_refresh_token_expiry_days: env::var("JWT_REFRESH_TOKEN_EXPIRY_DAYS")
                .unwrap_or_else(|_| "7".into())
                .parse()
                .unwrap_or(7),
            gateway_key_id: env::var("GATEWAY_KEY_ID")
                .map_err(|_| AppError::Config("GATEWAY_KEY_ID not set".into()))?,
            gateway_key_secret: env::var("GATEWAY_KEY_SECRET")
                .map_err(|_| AppError::Config("GATEWAY_KEY_SECRET not set".into()))?,
            gateway_api_url: env::var("GATEWAY_API_URL")
                .unwrap_or_else(|_| "https://api.razorpay.com/v1".into()),
            upi_gateway_url: env::var("UPI_GATEWAY_URL").ok(),
            upi_gateway_token: env::var("UPI_GATEWAY_TOKEN").ok(),
        })
    }
}
