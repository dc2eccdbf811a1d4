use crate::{
    Args,
    alerting::{channel::NewChannel, rule::NewRule},
};
use anyhow::Result;
use serde::Deserialize;
use std::path::{Path, PathBuf};

impl Config {
    /// Fold command line arguments into the loaded configuration
    pub fn with_cli(mut self, args: &Args) -> Self {
        self.cli = Cli {
            config_path: args.config.clone(),
            interval: args.interval,
            disable_alerting: args.disable_alerting,
        };
        self
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub kibana: Kibana,
    pub http: Http,
    #[serde(default)]
    pub alerting: Alerting,
    #[serde(skip)]
    pub cli: Cli,
}

#[derive(Debug, Clone, Default)]
pub struct Cli {
    pub config_path: PathBuf,
    pub interval: u64,
    pub disable_alerting: bool,
}

#[derive(Debug, Clone)]
pub struct Kibana {
    pub base_url: String,
    pub cluster_id: String,
    pub username: String,
    pub password: String,
    pub version: String,
    pub build_number: String,
    pub insecure: bool,
    pub connect_timeout: u64,
    pub read_timeout: u64,
    pub slow_call_threshold_ms: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct Http {
    pub host: String,
    pub port: u16,
}

/// Seed data for the alerting stores
#[derive(Debug, Deserialize, Clone, Default)]
pub struct Alerting {
    #[serde(default)]
    pub rules: Vec<NewRule>,
    #[serde(default)]
    pub channels: Vec<SeedChannel>,
}

/// A channel declared in the config file, with a fixed id so rules can refer to it
#[derive(Debug, Deserialize, Clone)]
pub struct SeedChannel {
    pub id: String,
    #[serde(flatten)]
    pub channel: NewChannel,
}

impl Config {
    /// Load configuration from a file
    pub fn from_file(path: &Path) -> Result<Self> {
        tracing::info!("Loading config from file");

        let config = std::fs::read_to_string(path)?;
        Self::from_yaml(&config)
    }

    /// Parse configuration from a YAML document
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        Ok(serde_norway::from_str(yaml)?)
    }
}

impl Kibana {
    /// Resolve the password from an environment variable when it is not given inline
    pub fn resolve_password(
        password: Option<String>,
        password_from: Option<String>,
    ) -> anyhow::Result<String> {
        match (password, password_from) {
            (Some(password), _) => Ok(password),
            (None, Some(var)) => std::env::var(&var)
                .map_err(|e| anyhow::anyhow!("Unable to read password from '{}': {}", var, e)),
            (None, None) => Ok(String::new()),
        }
    }
}

impl<'de> Deserialize<'de> for Kibana {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(rename_all = "camelCase")]
        struct KibanaRaw {
            base_url: String,
            cluster_id: String,
            #[serde(default)]
            username: String,
            password: Option<String>,
            password_from: Option<String>,
            version: String,
            build_number: String,
            #[serde(default)]
            insecure: Option<bool>,
            connect_timeout: Option<u64>,
            read_timeout: Option<u64>,
            slow_call_threshold_ms: Option<u64>,
        }

        let raw = KibanaRaw::deserialize(deserializer)?;
        let password = Kibana::resolve_password(raw.password, raw.password_from)
            .map_err(serde::de::Error::custom)?;

        Ok(Kibana {
            base_url: raw.base_url.trim_end_matches('/').to_string(),
            cluster_id: raw.cluster_id,
            username: raw.username,
            password,
            version: raw.version,
            build_number: raw.build_number,
            insecure: raw.insecure.unwrap_or(false),
            connect_timeout: raw.connect_timeout.unwrap_or(10),
            read_timeout: raw.read_timeout.unwrap_or(30),
            slow_call_threshold_ms: raw.slow_call_threshold_ms.unwrap_or(2000),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"
kibana:
  baseUrl: http://kibana:5601/
  clusterId: abc123
  username: elastic
  password: changeme
  version: 8.11.0
  buildNumber: "68000"
http:
  host: 0.0.0.0
  port: 8080
"#;

    #[test]
    fn parses_minimal_config_with_defaults() {
        let config = Config::from_yaml(MINIMAL).unwrap();

        assert_eq!(config.kibana.base_url, "http://kibana:5601");
        assert_eq!(config.kibana.password, "changeme");
        assert_eq!(config.kibana.connect_timeout, 10);
        assert_eq!(config.kibana.read_timeout, 30);
        assert_eq!(config.kibana.slow_call_threshold_ms, 2000);
        assert!(!config.kibana.insecure);
        assert_eq!(config.http.port, 8080);
        assert!(config.alerting.rules.is_empty());
    }

    #[test]
    fn missing_password_env_var_is_an_error() {
        let yaml = MINIMAL.replace(
            "password: changeme",
            "passwordFrom: ES_MANAGE_TEST_PASSWORD_THAT_IS_NOT_SET",
        );

        let err = Config::from_yaml(&yaml).unwrap_err();
        assert!(err.to_string().contains("ES_MANAGE_TEST_PASSWORD_THAT_IS_NOT_SET"));
    }

    #[test]
    fn parses_alerting_seed() {
        let yaml = format!(
            "{}{}",
            MINIMAL,
            r#"
alerting:
  channels:
    - id: ops-webhook
      name: Ops webhook
      type: webhook
      enabled: true
      config:
        type: webhook
        url: http://hooks.local/alerts
        method: POST
  rules:
    - name: Heap pressure
      metric: node_heap
      operator: gt
      threshold: 85
      duration: 180
      severity: critical
      notificationChannels: [ops-webhook]
      cooldown: 300
"#
        );

        let config = Config::from_yaml(&yaml).unwrap();

        assert_eq!(config.alerting.channels.len(), 1);
        assert_eq!(config.alerting.channels[0].id, "ops-webhook");
        assert_eq!(config.alerting.rules.len(), 1);
        assert_eq!(config.alerting.rules[0].threshold, 85.0);
        assert!(config.alerting.rules[0].enabled);
    }
}
