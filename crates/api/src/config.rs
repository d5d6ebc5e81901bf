//! Application configuration loaded from environment variables.

/// Server configuration with sensible defaults.
///
/// Reads from environment variables:
/// - `HOST` — bind address (default: `"0.0.0.0"`)
/// - `PRODUCT_SERVICE_URL` — base URL of the product service (default:
///   derived from the registered product-service port)
/// - `RUST_LOG` — tracing filter directive (default: `"info"`)
///
/// The listen port is not configured here: it comes from the service-port
/// resolver at startup.
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub product_service_url: Option<String>,
    pub log_level: String,
}

impl Config {
    /// Loads configuration from environment variables, falling back to
    /// defaults.
    pub fn from_env() -> Self {
        Self {
            host: std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            product_service_url: std::env::var("PRODUCT_SERVICE_URL").ok(),
            log_level: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
        }
    }

    /// Returns the `"host:port"` bind address string.
    pub fn addr(&self, port: u16) -> String {
        format!("{}:{}", self.host, port)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            product_service_url: None,
            log_level: "info".to_string(),
        }
    }
}
