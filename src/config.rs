use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::dataset::LoadOptions;
use crate::logging::LogConfig;
use crate::training::TrainingConfig;

/// Main application configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Application metadata
    pub metadata: ConfigMetadata,

    /// Dataset and model artifact locations
    pub paths: PathSettings,

    /// Dataset loading behaviour
    pub data: DataSettings,

    /// Split and boosting settings used by `train`
    pub training: TrainingConfig,

    /// Logging output
    pub logging: LogConfig,
}

/// Configuration metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfigMetadata {
    /// Configuration format version
    pub version: String,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,

    /// Last modification timestamp
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PathSettings {
    /// Historical athlete CSV
    pub dataset: PathBuf,

    /// Trained classifier artifact (JSON)
    pub model: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DataSettings {
    /// Drop malformed rows with a warning instead of failing the load
    pub skip_invalid_rows: bool,
}

impl Default for ConfigMetadata {
    fn default() -> Self {
        let now = Utc::now();
        ConfigMetadata {
            version: "1.0".to_string(),
            created_at: now,
            updated_at: now,
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            metadata: ConfigMetadata::default(),
            paths: PathSettings::default(),
            data: DataSettings::default(),
            training: TrainingConfig::default(),
            logging: LogConfig::default(),
        }
    }
}

impl Default for PathSettings {
    fn default() -> Self {
        PathSettings {
            dataset: PathBuf::from("data/raw/athlete_health_data.csv"),
            model: PathBuf::from("models/injury_risk_model.json"),
        }
    }
}

impl DataSettings {
    pub fn load_options(&self) -> LoadOptions {
        LoadOptions {
            skip_invalid_rows: self.skip_invalid_rows,
        }
    }
}

/// Configuration management implementation
impl AppConfig {
    /// Load configuration from TOML file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

        let config: AppConfig = toml::from_str(&content)
            .with_context(|| "Failed to parse TOML configuration")?;

        config.training.params.validate()?;
        config.training.split.validate()?;
        Ok(config)
    }

    /// Save configuration to TOML file
    pub fn save_to_file<P: AsRef<Path>>(&mut self, path: P) -> Result<()> {
        self.metadata.updated_at = Utc::now();

        if let Some(parent) = path.as_ref().parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create config directory: {}", parent.display()))?;
        }

        let toml_content = toml::to_string_pretty(self)
            .with_context(|| "Failed to serialize configuration to TOML")?;

        fs::write(&path, toml_content)
            .with_context(|| format!("Failed to write config file: {}", path.as_ref().display()))?;

        Ok(())
    }

    /// Get default configuration file path
    pub fn default_config_path() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".athlete-risk")
            .join("config.toml")
    }

    /// Load an explicit file, or the default location with fallback to defaults.
    ///
    /// An explicitly named file must exist and parse.
    pub fn resolve(explicit: Option<&Path>) -> Result<Self> {
        match explicit {
            Some(path) => Self::load_from_file(path),
            None => Ok(Self::load_or_default()),
        }
    }

    /// Load configuration with fallback to defaults
    pub fn load_or_default() -> Self {
        let config_path = Self::default_config_path();
        if !config_path.exists() {
            return Self::default();
        }

        match Self::load_from_file(&config_path) {
            Ok(config) => config,
            Err(err) => {
                eprintln!(
                    "Ignoring unreadable config {} ({:#}), using defaults",
                    config_path.display(),
                    err
                );
                Self::default()
            }
        }
    }

    /// Save configuration to default location
    pub fn save_default(&mut self) -> Result<PathBuf> {
        let config_path = Self::default_config_path();
        self.save_to_file(&config_path)?;
        Ok(config_path)
    }

    /// Write a default configuration file, never overwriting an existing one
    pub fn init(explicit: Option<&Path>) -> Result<PathBuf> {
        let target = explicit
            .map(Path::to_path_buf)
            .unwrap_or_else(Self::default_config_path);
        if target.exists() {
            bail!("Config file already exists: {}", target.display());
        }

        let mut config = Self::default();
        match explicit {
            Some(path) => {
                config.save_to_file(path)?;
                Ok(target)
            }
            None => config.save_default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_config_serialization() {
        let config = AppConfig::default();
        let toml_str = toml::to_string(&config).unwrap();
        let deserialized: AppConfig = toml::from_str(&toml_str).unwrap();

        assert_eq!(config.metadata.version, deserialized.metadata.version);
        assert_eq!(config.paths, deserialized.paths);
        assert_eq!(config.training, deserialized.training);
        assert_eq!(config.logging, deserialized.logging);
    }

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.training.split.seed, 42);
        assert_eq!(config.training.split.test_fraction, 0.2);
        assert_eq!(config.training.params.n_estimators, 300);
        assert!(!config.data.skip_invalid_rows);
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let config: AppConfig = toml::from_str(
            r#"
            [paths]
            model = "out/model.json"

            [data]
            skip_invalid_rows = true
            "#,
        )
        .unwrap();

        assert_eq!(config.paths.model, PathBuf::from("out/model.json"));
        assert_eq!(
            config.paths.dataset,
            PathBuf::from("data/raw/athlete_health_data.csv")
        );
        assert!(config.data.load_options().skip_invalid_rows);
        assert_eq!(config.training.params.max_depth, 5);
    }

    #[test]
    fn test_config_file_io() {
        let temp_dir = tempdir().unwrap();
        let config_path = temp_dir.path().join("nested").join("config.toml");

        let mut original_config = AppConfig::default();
        original_config.training.params.n_estimators = 50;
        original_config.save_to_file(&config_path).unwrap();

        let loaded_config = AppConfig::load_from_file(&config_path).unwrap();
        assert_eq!(loaded_config.training.params.n_estimators, 50);
    }

    #[test]
    fn test_invalid_training_settings_are_rejected() {
        let temp_dir = tempdir().unwrap();
        let config_path = temp_dir.path().join("config.toml");
        fs::write(&config_path, "[training.params]\nlearning_rate = 0.0\n").unwrap();

        assert!(AppConfig::load_from_file(&config_path).is_err());
    }

    #[test]
    fn test_init_refuses_to_overwrite() {
        let temp_dir = tempdir().unwrap();
        let config_path = temp_dir.path().join("athlete-risk").join("config.toml");

        let written = AppConfig::init(Some(&config_path)).unwrap();
        assert_eq!(written, config_path);
        assert_eq!(
            AppConfig::load_from_file(&config_path).unwrap().training.split.seed,
            42
        );

        assert!(AppConfig::init(Some(&config_path)).is_err());
    }

    #[test]
    fn test_explicit_missing_file_fails() {
        let temp_dir = tempdir().unwrap();
        assert!(AppConfig::resolve(Some(&temp_dir.path().join("absent.toml"))).is_err());
    }
}
