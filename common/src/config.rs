//! Service configuration.
//!
//! Configuration is read from environment variables, with an optional `.env`
//! file in the working directory applied first (variables already set in the
//! environment win).

/// Runtime configuration shared by the bridge binaries.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Name of the service loading this config (used in logs and envelopes).
    pub service_name: String,
    /// Bind host. The bridge is a local companion process, so the default
    /// stays on loopback.
    pub host: String,
    /// Bind port.
    pub port: u16,
    /// Maximum pooled connections per database.
    pub max_connections: u32,
    /// Timeout for establishing or acquiring a connection, in seconds.
    pub connect_timeout_secs: u64,
}

impl AppConfig {
    /// Loads configuration for the given service name.
    ///
    /// Reads `SERVER_HOST`, `SERVER_PORT`, `MAX_POOL_SIZE` and
    /// `CONNECT_TIMEOUT_SECS`, falling back to defaults suitable for a
    /// desktop companion process.
    pub fn load_with_service(service_name: &str) -> Self {
        load_dotenv();

        Self {
            service_name: service_name.to_string(),
            host: std::env::var("SERVER_HOST").unwrap_or_else(|_| "127.0.0.1".to_string()),
            port: std::env::var("SERVER_PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(8089),
            max_connections: std::env::var("MAX_POOL_SIZE")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(5),
            connect_timeout_secs: std::env::var("CONNECT_TIMEOUT_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(15),
        }
    }
}

/// Load .env file from the working directory (best-effort, no error if missing).
fn load_dotenv() {
    let env_path = std::path::Path::new(".env");
    if env_path.exists() {
        if let Ok(content) = std::fs::read_to_string(env_path) {
            for line in content.lines() {
                let line = line.trim();
                if line.is_empty() || line.starts_with('#') {
                    continue;
                }
                if let Some((key, value)) = line.split_once('=') {
                    let key = key.trim();
                    let value = value.trim();
                    // Only set if not already set by the environment
                    if std::env::var(key).is_err() {
                        std::env::set_var(key, value);
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_bind_loopback() {
        let config = AppConfig::load_with_service("bridge-service");
        assert_eq!(config.service_name, "bridge-service");
        assert_eq!(config.host, "127.0.0.1");
        assert!(config.max_connections >= 1);
    }
}
