use crate::config::ConfigBuilder;
use crate::error::{HushmixError, IntoHushmixError, Result};
use crate::masker::CensorStrategy;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tokio::fs;

/// Settings shared by the top level of a config file and its profiles
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProfileConfig {
    pub strategy: Option<String>,
    pub fade_ms: Option<f64>,
    pub pre_margin_ms: Option<f64>,
    pub post_margin_ms: Option<f64>,
    pub fade_shape: Option<String>,
    pub tone_frequency_hz: Option<f32>,
    pub reverse_gain: Option<f32>,
    pub companion_boost: Option<f32>,
    pub compensate: Option<bool>,
    pub vocals_gain: Option<f32>,
    pub instrumental_gain: Option<f32>,
    pub preserve_energy: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl ProfileConfig {
    /// Apply every value that is set onto the builder
    pub fn apply(&self, mut builder: ConfigBuilder) -> Result<ConfigBuilder> {
        if let Some(ref strategy) = self.strategy {
            let strategy: CensorStrategy = strategy.parse()?;
            builder = builder.strategy(strategy);
        }
        if let Some(fade) = self.fade_ms {
            builder = builder.fade_ms(fade)?;
        }
        if let Some(margin) = self.pre_margin_ms {
            builder = builder.pre_margin_ms(margin)?;
        }
        if let Some(margin) = self.post_margin_ms {
            builder = builder.post_margin_ms(margin)?;
        }
        if let Some(ref shape) = self.fade_shape {
            builder = builder.fade_shape(shape.parse()?);
        }
        if let Some(frequency) = self.tone_frequency_hz {
            builder = builder.tone_frequency_hz(frequency)?;
        }
        if let Some(gain) = self.reverse_gain {
            builder = builder.reverse_gain(gain)?;
        }
        if let Some(boost) = self.companion_boost {
            builder = builder.companion_boost(boost)?;
        }
        if let Some(compensate) = self.compensate {
            builder = builder.compensate(compensate);
        }
        if let Some(gain) = self.vocals_gain {
            builder = builder.primary_gain(gain)?;
        }
        if let Some(gain) = self.instrumental_gain {
            builder = builder.companion_gain(gain)?;
        }
        if let Some(preserve) = self.preserve_energy {
            builder = builder.preserve_energy(preserve);
        }
        Ok(builder)
    }
}

/// Configuration file format that can be serialized to YAML/JSON
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigFile {
    /// Base settings applied before any profile
    #[serde(flatten)]
    pub defaults: ProfileConfig,
    /// Named profiles
    pub profiles: Option<HashMap<String, ProfileConfig>>,
}

impl Default for ConfigFile {
    fn default() -> Self {
        let mut profiles = HashMap::new();

        profiles.insert("broadcast".to_string(), ProfileConfig {
            strategy: Some("mute".to_string()),
            fade_ms: Some(25.0),
            pre_margin_ms: Some(50.0),
            post_margin_ms: Some(50.0),
            description: Some("Hard mute with wide margins for broadcast edits".to_string()),
            ..Default::default()
        });

        profiles.insert("radio".to_string(), ProfileConfig {
            strategy: Some("tone".to_string()),
            fade_ms: Some(10.0),
            tone_frequency_hz: Some(1000.0),
            description: Some("Classic 1kHz bleep over each word".to_string()),
            ..Default::default()
        });

        profiles.insert("subtle".to_string(), ProfileConfig {
            strategy: Some("reverse".to_string()),
            reverse_gain: Some(0.3),
            companion_boost: Some(1.4),
            compensate: Some(true),
            description: Some(
                "Reversed vocals with instrumental compensation, keeps the music flowing".to_string(),
            ),
            ..Default::default()
        });

        Self {
            defaults: ProfileConfig {
                strategy: Some("mute".to_string()),
                fade_ms: Some(25.0),
                pre_margin_ms: Some(0.0),
                post_margin_ms: Some(25.0),
                ..Default::default()
            },
            profiles: Some(profiles),
        }
    }
}

fn parse_error(format: &str, e: impl std::fmt::Display) -> HushmixError {
    HushmixError::Config {
        field: "config_file".to_string(),
        message: format!("Failed to parse {} config: {}", format, e),
    }
}

fn serialize_error(format: &str, e: impl std::fmt::Display) -> HushmixError {
    HushmixError::Config {
        field: "config_file".to_string(),
        message: format!("Failed to serialize config to {}: {}", format, e),
    }
}

impl ConfigFile {
    async fn read(path: &Path) -> Result<String> {
        fs::read_to_string(path).await.with_path(path.to_path_buf())
    }

    async fn write(path: &Path, contents: String) -> Result<()> {
        fs::write(path, contents).await.with_path(path.to_path_buf())
    }

    /// Load configuration from a YAML file
    pub async fn load_yaml<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = Self::read(path.as_ref()).await?;
        serde_yaml::from_str(&contents).map_err(|e| parse_error("YAML", e))
    }

    /// Load configuration from a JSON file
    pub async fn load_json<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = Self::read(path.as_ref()).await?;
        serde_json::from_str(&contents).map_err(|e| parse_error("JSON", e))
    }

    /// Auto-detect and load configuration file based on extension
    pub async fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        match path.as_ref().extension().and_then(|s| s.to_str()) {
            Some("yaml") | Some("yml") => Self::load_yaml(path).await,
            Some("json") => Self::load_json(path).await,
            Some(ext) => Err(HushmixError::UnsupportedFormat {
                extension: ext.to_string(),
                supported: vec!["yaml".to_string(), "yml".to_string(), "json".to_string()],
            }),
            None => Err(HushmixError::Config {
                field: "config_file".to_string(),
                message: "Config file must have .yaml, .yml, or .json extension".to_string(),
            }),
        }
    }

    /// Save configuration to YAML file
    pub async fn save_yaml<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let yaml_content = serde_yaml::to_string(self).map_err(|e| serialize_error("YAML", e))?;
        Self::write(path.as_ref(), yaml_content).await
    }

    /// Save configuration to JSON file
    pub async fn save_json<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let json_content =
            serde_json::to_string_pretty(self).map_err(|e| serialize_error("JSON", e))?;
        Self::write(path.as_ref(), json_content).await
    }

    /// Get default config file paths to search
    pub fn default_config_paths() -> Vec<PathBuf> {
        vec![
            PathBuf::from(".hushmix.yaml"),
            PathBuf::from(".hushmix.yml"),
            PathBuf::from(".hushmix.json"),
            dirs::config_dir().unwrap_or_else(|| PathBuf::from("."))
                .join("hushmix").join("config.yaml"),
            dirs::home_dir().unwrap_or_else(|| PathBuf::from("."))
                .join(".config").join("hushmix.yaml"),
        ]
    }

    /// Try to load configuration from default locations
    pub async fn load_from_default_locations() -> Option<Self> {
        for path in Self::default_config_paths() {
            if path.exists() {
                match Self::load(&path).await {
                    Ok(config) => {
                        log::info!("Loaded configuration from: {}", path.display());
                        return Some(config);
                    }
                    Err(e) => {
                        log::warn!("Failed to load config from {}: {}", path.display(), e);
                    }
                }
            }
        }
        None
    }

    /// Apply the base settings of this file to a ConfigBuilder
    pub fn apply_to_builder(&self, builder: ConfigBuilder) -> Result<ConfigBuilder> {
        self.defaults.apply(builder)
    }

    /// Apply base settings, then a named profile on top
    pub fn apply_profile_to_builder(&self, profile_name: &str, builder: ConfigBuilder) -> Result<ConfigBuilder> {
        let profile = self.profile(profile_name)?;
        let builder = self.apply_to_builder(builder)?;
        profile.apply(builder)
    }

    pub fn profile(&self, profile_name: &str) -> Result<&ProfileConfig> {
        let profiles = self.profiles.as_ref().ok_or_else(|| HushmixError::Config {
            field: "profiles".to_string(),
            message: "No profiles defined".to_string(),
        })?;

        profiles.get(profile_name).ok_or_else(|| HushmixError::Config {
            field: "profile".to_string(),
            message: format!("Profile '{}' not found", profile_name),
        })
    }

    /// List available profiles, sorted by name
    pub fn list_profiles(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .profiles
            .as_ref()
            .map(|p| p.keys().cloned().collect())
            .unwrap_or_default();
        names.sort();
        names
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_config_file_yaml_roundtrip() {
        let temp_dir = tempdir().unwrap();
        let config_path = temp_dir.path().join("test.yaml");

        let original_config = ConfigFile::default();

        original_config.save_yaml(&config_path).await.unwrap();
        let loaded_config = ConfigFile::load(&config_path).await.unwrap();

        assert_eq!(original_config.defaults, loaded_config.defaults);
        assert_eq!(original_config.list_profiles(), loaded_config.list_profiles());
    }

    #[tokio::test]
    async fn test_config_file_json_roundtrip() {
        let temp_dir = tempdir().unwrap();
        let config_path = temp_dir.path().join("test.json");

        let original_config = ConfigFile::default();

        original_config.save_json(&config_path).await.unwrap();
        let loaded_config = ConfigFile::load(&config_path).await.unwrap();

        assert_eq!(original_config.defaults.fade_ms, loaded_config.defaults.fade_ms);
        assert_eq!(
            original_config.profile("subtle").unwrap(),
            loaded_config.profile("subtle").unwrap()
        );
    }

    #[tokio::test]
    async fn test_unknown_extension_rejected() {
        let result = ConfigFile::load("settings.toml").await;
        assert!(matches!(result, Err(HushmixError::UnsupportedFormat { .. })));
    }

    #[test]
    fn test_profile_listing() {
        let config = ConfigFile::default();
        assert_eq!(config.list_profiles(), vec!["broadcast", "radio", "subtle"]);
    }

    #[test]
    fn test_apply_profile_overrides_base() {
        let config = ConfigFile::default()
            .apply_profile_to_builder("subtle", ConfigBuilder::new())
            .unwrap()
            .build()
            .unwrap();

        assert_eq!(config.censor.strategy, CensorStrategy::Reverse);
        assert_eq!(config.censor.post_margin_ms, 25.0);
        assert!(config.censor.compensate);
    }

    #[test]
    fn test_missing_profile_is_config_error() {
        let config = ConfigFile::default();
        let result = config.apply_profile_to_builder("nope", ConfigBuilder::new());
        assert!(matches!(result, Err(HushmixError::Config { .. })));
    }

    #[test]
    fn test_bad_strategy_in_file_rejected() {
        let file: ConfigFile = serde_yaml::from_str("strategy: warble\n").unwrap();
        assert!(file.apply_to_builder(ConfigBuilder::new()).is_err());
    }
}
