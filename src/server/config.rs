use serde::Deserialize;
use std::fs;
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq)]
pub struct ServerConfig {
    pub listen_addr: String,
    pub definitions_file: String,
    /// Namespace the definitions are loaded into and the evaluator watches.
    pub namespace: String,
    pub evaluation_interval_seconds: u64,
    pub max_body_bytes: usize,
    pub webhook_timeout_seconds: u64,
    pub log_dir: String,
}

// Partial config for layering
#[derive(Deserialize, Default, Debug)]
struct PartialServerConfig {
    listen_addr: Option<String>,
    definitions_file: Option<String>,
    namespace: Option<String>,
    evaluation_interval_seconds: Option<u64>,
    max_body_bytes: Option<usize>,
    webhook_timeout_seconds: Option<u64>,
    log_dir: Option<String>,
}

fn default_listen_addr() -> String {
    "0.0.0.0:8000".to_string()
}

fn default_definitions_file() -> String {
    "data/dogs.json".to_string()
}

fn default_namespace() -> String {
    "dog".to_string()
}

fn default_evaluation_interval_seconds() -> u64 {
    60
}

fn default_max_body_bytes() -> usize {
    64 * 1024
}

fn default_webhook_timeout_seconds() -> u64 {
    10
}

fn default_log_dir() -> String {
    "logs".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self::merge(PartialServerConfig::default(), PartialServerConfig::default())
    }
}

impl ServerConfig {
    /// Loads the optional TOML file at `config_path`, then lets `DOGWATCH_`-prefixed
    /// environment variables (e.g. `DOGWATCH_LISTEN_ADDR`) override it.
    pub fn load(config_path: Option<&str>) -> Result<Self, String> {
        dotenv::dotenv().ok();

        let env_config: PartialServerConfig = envy::prefixed("DOGWATCH_")
            .from_env::<PartialServerConfig>()
            .map_err(|e| format!("Failed to load config from environment: {e}"))?;

        Self::load_layered(config_path, env_config)
    }

    fn load_layered(
        config_path: Option<&str>,
        env_config: PartialServerConfig,
    ) -> Result<Self, String> {
        let file_config: PartialServerConfig = match config_path {
            Some(path_str) => {
                let path = Path::new(path_str);
                if !path.exists() {
                    return Err(format!("Config file not found at {path:?}"));
                }
                let contents = fs::read_to_string(path)
                    .map_err(|e| format!("Failed to read config file at {path:?}: {e}"))?;
                toml::from_str(&contents)
                    .map_err(|e| format!("Failed to parse TOML from config file at {path:?}: {e}"))?
            }
            None => PartialServerConfig::default(),
        };

        let config = Self::merge(env_config, file_config);
        config.validate()?;
        Ok(config)
    }

    // Environment overrides file.
    fn merge(env_config: PartialServerConfig, file_config: PartialServerConfig) -> Self {
        ServerConfig {
            listen_addr: env_config
                .listen_addr
                .or(file_config.listen_addr)
                .unwrap_or_else(default_listen_addr),
            definitions_file: env_config
                .definitions_file
                .or(file_config.definitions_file)
                .unwrap_or_else(default_definitions_file),
            namespace: env_config
                .namespace
                .or(file_config.namespace)
                .unwrap_or_else(default_namespace),
            evaluation_interval_seconds: env_config
                .evaluation_interval_seconds
                .or(file_config.evaluation_interval_seconds)
                .unwrap_or_else(default_evaluation_interval_seconds),
            max_body_bytes: env_config
                .max_body_bytes
                .or(file_config.max_body_bytes)
                .unwrap_or_else(default_max_body_bytes),
            webhook_timeout_seconds: env_config
                .webhook_timeout_seconds
                .or(file_config.webhook_timeout_seconds)
                .unwrap_or_else(default_webhook_timeout_seconds),
            log_dir: env_config
                .log_dir
                .or(file_config.log_dir)
                .unwrap_or_else(default_log_dir),
        }
    }

    fn validate(&self) -> Result<(), String> {
        if self.evaluation_interval_seconds == 0 {
            return Err("DOGWATCH_EVALUATION_INTERVAL_SECONDS must be greater than zero".to_string());
        }
        if self.max_body_bytes == 0 {
            return Err("DOGWATCH_MAX_BODY_BYTES must be greater than zero".to_string());
        }
        if self.webhook_timeout_seconds == 0 {
            return Err("DOGWATCH_WEBHOOK_TIMEOUT_SECONDS must be greater than zero".to_string());
        }
        if self.namespace.is_empty() {
            return Err("DOGWATCH_NAMESPACE must not be empty".to_string());
        }
        Ok(())
    }

    pub fn evaluation_interval(&self) -> Duration {
        Duration::from_secs(self.evaluation_interval_seconds)
    }

    pub fn webhook_timeout(&self) -> Duration {
        Duration::from_secs(self.webhook_timeout_seconds)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_defaults() {
        let config = ServerConfig::default();
        assert_eq!(config.namespace, "dog");
        assert_eq!(config.evaluation_interval(), Duration::from_secs(60));
        assert_eq!(config.max_body_bytes, 65536);
        assert_eq!(config.definitions_file, "data/dogs.json");
    }

    #[test]
    fn test_env_overrides_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            "listen_addr = \"127.0.0.1:9000\"\nevaluation_interval_seconds = 30\nnamespace = \"svc\""
        )
        .unwrap();
        let env = PartialServerConfig {
            evaluation_interval_seconds: Some(5),
            ..Default::default()
        };

        let config =
            ServerConfig::load_layered(Some(file.path().to_str().unwrap()), env).unwrap();

        assert_eq!(config.listen_addr, "127.0.0.1:9000");
        assert_eq!(config.namespace, "svc");
        assert_eq!(config.evaluation_interval_seconds, 5);
        assert_eq!(config.webhook_timeout_seconds, 10);
    }

    #[test]
    fn test_rejects_zero_interval() {
        let env = PartialServerConfig {
            evaluation_interval_seconds: Some(0),
            ..Default::default()
        };
        assert!(ServerConfig::load_layered(None, env).is_err());
    }

    #[test]
    fn test_missing_config_file() {
        let result = ServerConfig::load_layered(Some("/nonexistent/dogwatch.toml"), PartialServerConfig::default());
        assert!(result.is_err());
    }
}
