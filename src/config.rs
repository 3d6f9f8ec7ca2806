use anyhow::Context;
use chartanalyst::{
    api::{DashboardBuilder, DataSourceKind},
    ask_ai::{DEFAULT_OLLAMA_URL, DEFAULT_VISION_MODEL},
    chart::render::{DEFAULT_HEIGHT, DEFAULT_WIDTH},
    services::YAHOO_BASE_URL,
};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

// YAML-serializable configuration structure; every key is optional
#[derive(Serialize, Deserialize, Debug, Default)]
#[serde(default)]
pub struct ConfigYaml {
    pub node_name: Option<String>,
    pub environment: Option<String>,
    pub port: Option<u16>,
    pub data_source: Option<DataSourceKind>,
    pub csv_data_dir: Option<PathBuf>,
    pub yahoo_base_url: Option<String>,
    pub ollama_url: Option<String>,
    pub ollama_model: Option<String>,
    pub model_timeout_secs: Option<u64>,
    pub chart_width: Option<u32>,
    pub chart_height: Option<u32>,
    pub analyze_per_minute: Option<u32>,
}

pub type SharedConfig = Arc<AppConfig>;

// Holds application-wide settings
#[derive(Clone, Debug)]
pub struct AppConfig {
    pub node_name: String,
    pub environment: String,
    pub port: u16,
    pub data_source: DataSourceKind,
    pub csv_data_dir: PathBuf,
    pub yahoo_base_url: String,
    pub ollama_url: String,
    pub ollama_model: String,
    pub model_timeout: Duration,
    pub chart_width: u32,
    pub chart_height: u32,
    pub analyze_per_minute: u32,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self::from_yaml_config(ConfigYaml::default())
    }
}

impl AppConfig {
    // Load configuration from YAML file or environment variables
    pub fn load() -> anyhow::Result<Self> {
        if let Ok(config_file) = env::var("CONFIG_FILE") {
            Self::from_yaml(&config_file)
        } else {
            Self::from_env()
        }
    }

    pub fn from_yaml(file_path: &str) -> anyhow::Result<Self> {
        let yaml_content = fs::read_to_string(file_path)
            .with_context(|| format!("Failed to read config file {}", file_path))?;

        let yaml_config: ConfigYaml = serde_yaml::from_str(&yaml_content)
            .with_context(|| format!("Failed to parse YAML config {}", file_path))?;

        Ok(Self::from_yaml_config(yaml_config))
    }

    fn from_yaml_config(yaml: ConfigYaml) -> Self {
        Self {
            node_name: yaml.node_name.unwrap_or_else(|| "chartanalyst-dashboard".to_string()),
            environment: yaml.environment.unwrap_or_else(|| "development".to_string()),
            port: yaml.port.unwrap_or(8888),
            data_source: yaml.data_source.unwrap_or_default(),
            csv_data_dir: yaml.csv_data_dir.unwrap_or_else(|| PathBuf::from("./market_data")),
            yahoo_base_url: yaml.yahoo_base_url.unwrap_or_else(|| YAHOO_BASE_URL.to_string()),
            ollama_url: yaml.ollama_url.unwrap_or_else(|| DEFAULT_OLLAMA_URL.to_string()),
            ollama_model: yaml.ollama_model.unwrap_or_else(|| DEFAULT_VISION_MODEL.to_string()),
            model_timeout: Duration::from_secs(yaml.model_timeout_secs.unwrap_or(120)),
            chart_width: yaml.chart_width.unwrap_or(DEFAULT_WIDTH),
            chart_height: yaml.chart_height.unwrap_or(DEFAULT_HEIGHT),
            analyze_per_minute: yaml.analyze_per_minute.unwrap_or(6).max(1),
        }
    }

    // Load all configuration from environment variables
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok(); // Load .env file if present
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from any key lookup; unset keys fall back to defaults, set but
    /// unparsable ones are errors.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        fn parsed<T: std::str::FromStr>(
            lookup: &impl Fn(&str) -> Option<String>,
            key: &str,
        ) -> anyhow::Result<Option<T>>
        where
            T::Err: std::fmt::Display,
        {
            lookup(key)
                .filter(|v| !v.trim().is_empty())
                .map(|v| v.trim().parse::<T>().map_err(|e| anyhow::anyhow!("{} has invalid value '{}': {}", key, v, e)))
                .transpose()
        }

        let yaml = ConfigYaml {
            node_name: lookup("NODE_NAME"),
            environment: lookup("ENVIRONMENT"),
            port: parsed(&lookup, "PORT")?,
            data_source: parsed(&lookup, "DATA_SOURCE")?,
            csv_data_dir: lookup("CSV_DATA_DIR").map(PathBuf::from),
            yahoo_base_url: lookup("YAHOO_BASE_URL"),
            ollama_url: lookup("OLLAMA_URL"),
            ollama_model: lookup("OLLAMA_MODEL"),
            model_timeout_secs: parsed(&lookup, "MODEL_TIMEOUT_SECS")?,
            chart_width: parsed(&lookup, "CHART_WIDTH")?,
            chart_height: parsed(&lookup, "CHART_HEIGHT")?,
            analyze_per_minute: parsed(&lookup, "ANALYZE_PER_MINUTE")?,
        };

        Ok(Self::from_yaml_config(yaml))
    }

    /// Dashboard wired to the configured collaborators.
    pub fn dashboard_builder(&self) -> DashboardBuilder {
        DashboardBuilder::new()
            .with_data_source(self.data_source)
            .with_yahoo_base_url(self.yahoo_base_url.clone())
            .with_csv_dir(self.csv_data_dir.clone())
            .with_ollama_url(self.ollama_url.clone())
            .with_ollama_model(self.ollama_model.clone())
            .with_model_timeout(self.model_timeout)
            .with_chart_size(self.chart_width, self.chart_height)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults() {
        let config = AppConfig::from_lookup(|_| None).unwrap();
        assert_eq!(config.port, 8888);
        assert_eq!(config.data_source, DataSourceKind::Yahoo);
        assert_eq!(config.ollama_url, "http://localhost:11434");
        assert_eq!(config.ollama_model, "llama3.2-vision");
        assert_eq!(config.model_timeout, Duration::from_secs(120));
        assert_eq!((config.chart_width, config.chart_height), (1280, 720));
        assert_eq!(config.analyze_per_minute, 6);
    }

    #[test]
    fn test_env_overrides() {
        let vars: HashMap<&str, &str> = HashMap::from([
            ("PORT", "9000"),
            ("DATA_SOURCE", "csv"),
            ("CSV_DATA_DIR", "/srv/prices"),
            ("OLLAMA_MODEL", "llava"),
            ("MODEL_TIMEOUT_SECS", "30"),
        ]);
        let config = AppConfig::from_lookup(|k| vars.get(k).map(|v| v.to_string())).unwrap();
        assert_eq!(config.port, 9000);
        assert_eq!(config.data_source, DataSourceKind::Csv);
        assert_eq!(config.csv_data_dir, PathBuf::from("/srv/prices"));
        assert_eq!(config.ollama_model, "llava");
        assert_eq!(config.model_timeout, Duration::from_secs(30));
    }

    #[test]
    fn test_invalid_env_value_is_error() {
        let result = AppConfig::from_lookup(|k| (k == "PORT").then(|| "eighty".to_string()));
        assert!(result.is_err());
    }

    #[test]
    fn test_from_yaml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yml");
        fs::write(
            &path,
            "node_name: analyst-1\nport: 8080\ndata_source: csv\nanalyze_per_minute: 2\n",
        )
        .unwrap();

        let config = AppConfig::from_yaml(path.to_str().unwrap()).unwrap();
        assert_eq!(config.node_name, "analyst-1");
        assert_eq!(config.port, 8080);
        assert_eq!(config.data_source, DataSourceKind::Csv);
        assert_eq!(config.analyze_per_minute, 2);
        assert_eq!(config.environment, "development");
    }

    #[test]
    fn test_missing_yaml_is_error() {
        assert!(AppConfig::from_yaml("/nonexistent/config.yml").is_err());
    }
}
