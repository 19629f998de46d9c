//! Agent configuration
//!
//! Loaded once at startup with figment: compiled defaults, then a YAML or
//! JSON settings file, then `UNIGATE_`-prefixed environment variables.
//! Configuration failures are the only fatal startup errors besides explicit
//! operator shutdown.

use errors::{GatewayError, GatewayResult};
use figment::providers::{Env, Format, Json, Serialized, Yaml};
use figment::Figment;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Register to poll on an industrial protocol
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterConfig {
    /// Series name the decoded value is stored and published under
    pub name: String,
    /// Holding-register start address
    pub address: u16,
    /// Data type string, e.g. "uint16", "int32", "float32"
    pub data_type: String,
}

/// Out-of-range alert threshold for one series
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThresholdConfig {
    pub series: String,
    pub min: f64,
    pub max: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IndustrialConfig {
    pub enabled: bool,
    /// Protocol names to open, e.g. ["modbus_tcp"]
    pub protocols: Vec<String>,
    pub host: String,
    pub port: u16,
    pub unit_id: u8,
    /// Fixed inter-poll delay in seconds
    pub poll_interval_secs: u64,
    pub registers: Vec<RegisterConfig>,
}

impl Default for IndustrialConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            protocols: vec!["modbus_tcp".to_string()],
            host: "127.0.0.1".to_string(),
            port: 502,
            unit_id: 1,
            poll_interval_secs: 10,
            registers: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MeshConfig {
    pub enabled: bool,
    /// Streaming protocol names, e.g. ["lora"]
    pub protocols: Vec<String>,
    pub port: String,
    pub baud: u32,
    /// Listener receive poll interval; also bounds shutdown latency
    pub poll_interval_ms: u64,
}

impl Default for MeshConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            protocols: vec!["lora".to_string()],
            port: "/dev/ttyUSB0".to_string(),
            baud: 9600,
            poll_interval_ms: 100,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IntegrationsConfig {
    pub enabled: bool,
    pub host: String,
    pub port: u16,
    pub username: Option<String>,
    pub password: Option<String>,
    /// Topics to subscribe to on connect
    pub topics: Vec<String>,
    /// Prefix for outbound telemetry topics
    pub topic_prefix: String,
    pub connect_timeout_secs: u64,
}

impl Default for IntegrationsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            host: "127.0.0.1".to_string(),
            port: 1883,
            username: None,
            password: None,
            topics: Vec::new(),
            topic_prefix: "sensors".to_string(),
            connect_timeout_secs: 10,
        }
    }
}

/// Where series history lives
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    Memory,
    File,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitoringConfig {
    pub enabled: bool,
    pub data_storage: StorageBackend,
    pub storage_path: String,
    pub thresholds: Vec<ThresholdConfig>,
}

impl Default for MonitoringConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            data_storage: StorageBackend::Memory,
            storage_path: "./data".to_string(),
            thresholds: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BusinessConfig {
    pub enabled: bool,
    pub backup_storage: String,
}

impl Default for BusinessConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            backup_storage: "./backups".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Default time-to-live for cached values, seconds
    pub max_age_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self { max_age_secs: 300 }
    }
}

/// Top-level agent configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    pub log_level: String,
    pub industrial: IndustrialConfig,
    pub mesh: MeshConfig,
    pub integrations: IntegrationsConfig,
    pub monitoring: MonitoringConfig,
    pub business: BusinessConfig,
    pub cache: CacheConfig,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            industrial: IndustrialConfig::default(),
            mesh: MeshConfig::default(),
            integrations: IntegrationsConfig::default(),
            monitoring: MonitoringConfig::default(),
            business: BusinessConfig::default(),
            cache: CacheConfig::default(),
        }
    }
}

impl AgentConfig {
    /// Load configuration, merging defaults, the settings file and
    /// `UNIGATE_`-prefixed environment variables (fatal on any error).
    pub fn load(path: &Path) -> GatewayResult<Self> {
        if !path.exists() {
            return Err(GatewayError::MissingConfig(path.display().to_string()));
        }

        let figment = Figment::from(Serialized::defaults(AgentConfig::default()));
        let figment = match path.extension().and_then(|e| e.to_str()) {
            Some("json") => figment.merge(Json::file(path)),
            _ => figment.merge(Yaml::file(path)),
        };
        let config: AgentConfig = figment
            .merge(Env::prefixed("UNIGATE_").split("__"))
            .extract()
            .map_err(|e| GatewayError::Configuration(e.to_string()))?;

        config.validate()?;
        Ok(config)
    }

    /// Defaults merged with environment only; used by tests and demo runs
    pub fn from_defaults() -> GatewayResult<Self> {
        let config: AgentConfig = Figment::from(Serialized::defaults(AgentConfig::default()))
            .merge(Env::prefixed("UNIGATE_").split("__"))
            .extract()
            .map_err(|e| GatewayError::Configuration(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub(crate) fn validate(&self) -> GatewayResult<()> {
        if self.industrial.enabled {
            if self.industrial.protocols.is_empty() {
                return Err(GatewayError::InvalidConfig {
                    field: "industrial.protocols".to_string(),
                    reason: "industrial polling enabled with no protocols".to_string(),
                });
            }
            if self.industrial.registers.is_empty() {
                return Err(GatewayError::InvalidConfig {
                    field: "industrial.registers".to_string(),
                    reason: "industrial polling enabled with no registers".to_string(),
                });
            }
            if self.industrial.poll_interval_secs == 0 {
                return Err(GatewayError::InvalidConfig {
                    field: "industrial.poll_interval_secs".to_string(),
                    reason: "poll interval must be at least 1 second".to_string(),
                });
            }
        }
        if self.mesh.enabled && self.mesh.poll_interval_ms == 0 {
            return Err(GatewayError::InvalidConfig {
                field: "mesh.poll_interval_ms".to_string(),
                reason: "listener poll interval must be non-zero".to_string(),
            });
        }
        for t in &self.monitoring.thresholds {
            if t.min > t.max {
                return Err(GatewayError::InvalidConfig {
                    field: format!("monitoring.thresholds.{}", t.series),
                    reason: format!("min {} exceeds max {}", t.min, t.max),
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::disallowed_methods)] // Test code - unwrap is acceptable
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_are_valid() {
        let config = AgentConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.cache.max_age_secs, 300);
        assert_eq!(config.industrial.poll_interval_secs, 10);
        assert_eq!(config.mesh.poll_interval_ms, 100);
    }

    #[test]
    fn test_missing_file_is_fatal() {
        let err = AgentConfig::load(Path::new("/no/such/settings.yaml")).unwrap_err();
        assert!(matches!(err, GatewayError::MissingConfig(_)));
    }

    #[test]
    fn test_load_yaml_file() {
        let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        writeln!(
            file,
            "industrial:\n  enabled: true\n  registers:\n    - name: temperature\n      address: 100\n      data_type: float32\ncache:\n  max_age_secs: 60\n"
        )
        .unwrap();

        let config = AgentConfig::load(file.path()).unwrap();
        assert!(config.industrial.enabled);
        assert_eq!(config.industrial.registers[0].name, "temperature");
        assert_eq!(config.industrial.registers[0].address, 100);
        assert_eq!(config.cache.max_age_secs, 60);
        // Untouched sections keep their defaults
        assert_eq!(config.integrations.topic_prefix, "sensors");
    }

    #[test]
    fn test_enabled_without_registers_is_invalid() {
        let mut config = AgentConfig::default();
        config.industrial.enabled = true;
        let err = config.validate().unwrap_err();
        assert!(matches!(err, GatewayError::InvalidConfig { .. }));
    }

    #[test]
    fn test_inverted_threshold_is_invalid() {
        let mut config = AgentConfig::default();
        config.monitoring.thresholds.push(ThresholdConfig {
            series: "temperature".to_string(),
            min: 50.0,
            max: 10.0,
        });
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_storage_backend_parses_lowercase() {
        let backend: StorageBackend = serde_json::from_str("\"file\"").unwrap();
        assert_eq!(backend, StorageBackend::File);
    }
}
