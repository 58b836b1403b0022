use registry::config::FunctionStoreConfig;
use serde::Deserialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ValidationError {
    #[error("Listener host cannot be empty")]
    EmptyHost,

    #[error("Filesystem store base_dir cannot be empty")]
    EmptyBaseDir,
}

/// Fake Lambda API configuration
#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
pub struct Config {
    /// Address the API listens on
    #[serde(default)]
    pub listener: Listener,
    /// Where cached function lists are read from and written to
    #[serde(default)]
    pub store: FunctionStoreConfig,
    /// Seed the registry from the store before the listener starts
    #[serde(default)]
    pub seed_on_start: bool,
}

impl Config {
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.listener.validate()?;

        if let FunctionStoreConfig::Filesystem { base_dir, .. } = &self.store
            && base_dir.is_empty()
        {
            return Err(ValidationError::EmptyBaseDir);
        }

        Ok(())
    }
}

/// Network listener configuration
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct Listener {
    /// Host address to bind to (e.g., "localhost" or "0.0.0.0")
    pub host: String,
    /// Port number to listen on. 0 picks a free port.
    #[serde(default)]
    pub port: u16,
}

impl Default for Listener {
    fn default() -> Self {
        Listener {
            host: "localhost".into(),
            port: 0,
        }
    }
}

impl Listener {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.host.is_empty() {
            return Err(ValidationError::EmptyHost);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use registry::config::Compression;

    #[test]
    fn test_parse_valid_config() {
        let yaml = r#"
listener:
    host: "127.0.0.1"
    port: 4000
store:
    type: filesystem
    base_dir: /var/lib/fake-lambda
    compression: zstd1
seed_on_start: true
"#;

        let config: Config = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.listener.host, "127.0.0.1");
        assert_eq!(config.listener.port, 4000);
        assert_eq!(
            config.store,
            FunctionStoreConfig::Filesystem {
                base_dir: "/var/lib/fake-lambda".into(),
                compression: Compression::Zstd1,
            }
        );
        assert!(config.seed_on_start);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_defaults() {
        let config: Config = serde_yaml::from_str("{}").unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.listener.host, "localhost");
        assert_eq!(config.listener.port, 0);
        assert_eq!(config.store, FunctionStoreConfig::Noop);
        assert!(!config.seed_on_start);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validation() {
        let mut config = Config::default();
        config.listener.host = String::new();
        assert!(matches!(config.validate(), Err(ValidationError::EmptyHost)));

        let config = Config {
            store: FunctionStoreConfig::Filesystem {
                base_dir: String::new(),
                compression: Compression::None,
            },
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ValidationError::EmptyBaseDir)
        ));
    }
}
