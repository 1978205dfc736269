use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{CounterError, Result};
use crate::rate_limiter::QuotaCost;

pub const ENV_FUNCTION_NAME: &str = "GCLOUD_FUNCTION_NAME";
pub const ENV_LABEL_NAME: &str = "GMAIL_LABEL_NAME";
pub const ENV_OAUTH2_TOKEN: &str = "GCLOUD_OAUTH2_TOKEN";
pub const ENV_WEBHOOK_URL: &str = "DISCORD_WEBHOOK_URL";

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub trigger: TriggerConfig,
    #[serde(default)]
    pub gmail: GmailConfig,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub parser: ParserConfig,
    #[serde(default)]
    pub notifier: NotifierConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TriggerConfig {
    #[serde(default)]
    pub function_name: String,
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,
}

impl Default for TriggerConfig {
    fn default() -> Self {
        Self {
            function_name: String::new(),
            interval_secs: default_interval_secs(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GmailConfig {
    #[serde(default)]
    pub label_name: String,
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent_requests: usize,
    #[serde(default = "default_quota_units_per_second")]
    pub quota_units_per_second: u32,
    #[serde(default = "default_quota_burst_units")]
    pub quota_burst_units: u32,
}

impl Default for GmailConfig {
    fn default() -> Self {
        Self {
            label_name: String::new(),
            max_concurrent_requests: default_max_concurrent(),
            quota_units_per_second: default_quota_units_per_second(),
            quota_burst_units: default_quota_burst_units(),
        }
    }
}

/// Where the authorized-user OAuth2 token comes from.
///
/// The inline token is never written back out by [`Config::save`].
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AuthConfig {
    #[serde(default, skip_serializing)]
    pub token: Option<String>,
    #[serde(default)]
    pub token_path: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParserConfig {
    #[serde(default = "default_section_marker")]
    pub section_marker: String,
    #[serde(default = "default_name_line")]
    pub name_line: usize,
    #[serde(default = "default_location_line")]
    pub location_line: usize,
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            section_marker: default_section_marker(),
            name_line: default_name_line(),
            location_line: default_location_line(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotifierConfig {
    #[serde(default)]
    pub webhook_url: String,
    #[serde(default = "default_ticket_capacity")]
    pub ticket_capacity: u64,
}

impl Default for NotifierConfig {
    fn default() -> Self {
        Self {
            webhook_url: String::new(),
            ticket_capacity: default_ticket_capacity(),
        }
    }
}

fn default_interval_secs() -> u64 {
    900
}

fn default_max_concurrent() -> usize {
    10
}

fn default_quota_units_per_second() -> u32 {
    250
}

fn default_quota_burst_units() -> u32 {
    500
}

fn default_section_marker() -> String {
    "Billing Information".to_string()
}

fn default_name_line() -> usize {
    6
}

fn default_location_line() -> usize {
    10
}

fn default_ticket_capacity() -> u64 {
    200
}

impl Config {
    /// Load from a TOML file, overlay the environment and validate
    pub async fn load(path: &Path) -> Result<Self> {
        let mut config = Self::load_file(path).await?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Read the TOML file only. A missing file yields the defaults.
    pub async fn load_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::warn!("Config file not found at {:?}, using defaults", path);
            return Ok(Self::default());
        }

        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| CounterError::ConfigError(format!("Failed to read config file: {}", e)))?;

        let config: Self = toml::from_str(&content)
            .map_err(|e| CounterError::ConfigError(format!("Failed to parse config file: {}", e)))?;

        tracing::info!("Loaded configuration from {:?}", path);
        Ok(config)
    }

    pub async fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(|e| {
                CounterError::ConfigError(format!("Failed to create config directory: {}", e))
            })?;
        }

        let content = toml::to_string_pretty(self)
            .map_err(|e| CounterError::ConfigError(format!("Failed to serialize config: {}", e)))?;

        tokio::fs::write(path, content)
            .await
            .map_err(|e| CounterError::ConfigError(format!("Failed to write config file: {}", e)))?;

        tracing::info!("Saved configuration to {:?}", path);
        Ok(())
    }

    /// Environment variables win over file values when set and non-empty
    pub fn apply_env_overrides(&mut self) {
        if let Some(value) = env_value(ENV_FUNCTION_NAME) {
            self.trigger.function_name = value;
        }
        if let Some(value) = env_value(ENV_LABEL_NAME) {
            self.gmail.label_name = value;
        }
        if let Some(value) = env_value(ENV_OAUTH2_TOKEN) {
            self.auth.token = Some(value);
        }
        if let Some(value) = env_value(ENV_WEBHOOK_URL) {
            self.notifier.webhook_url = value;
        }
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        let mut missing = Vec::new();
        if self.trigger.function_name.trim().is_empty() {
            missing.push(format!("trigger.function_name ({})", ENV_FUNCTION_NAME));
        }
        if self.gmail.label_name.trim().is_empty() {
            missing.push(format!("gmail.label_name ({})", ENV_LABEL_NAME));
        }
        let has_inline_token = self
            .auth
            .token
            .as_deref()
            .is_some_and(|t| !t.trim().is_empty());
        if !has_inline_token && self.auth.token_path.is_none() {
            missing.push(format!("auth.token or auth.token_path ({})", ENV_OAUTH2_TOKEN));
        }
        if self.notifier.webhook_url.trim().is_empty() {
            missing.push(format!("notifier.webhook_url ({})", ENV_WEBHOOK_URL));
        }
        if !missing.is_empty() {
            return Err(CounterError::ConfigError(format!(
                "Missing required settings: {}",
                missing.join(", ")
            )));
        }

        // 50 concurrent messages.get calls already cost the whole default quota
        if self.gmail.max_concurrent_requests == 0 {
            return Err(CounterError::ConfigError(
                "gmail.max_concurrent_requests must be at least 1".to_string(),
            ));
        }
        if self.gmail.max_concurrent_requests > 50 {
            return Err(CounterError::ConfigError(
                "gmail.max_concurrent_requests cannot exceed 50".to_string(),
            ));
        }
        if self.gmail.quota_units_per_second == 0 {
            return Err(CounterError::ConfigError(
                "gmail.quota_units_per_second must be greater than 0".to_string(),
            ));
        }
        if self.gmail.quota_burst_units < QuotaCost::MessagesGet.units() {
            return Err(CounterError::ConfigError(format!(
                "gmail.quota_burst_units must be at least {} (one messages.get)",
                QuotaCost::MessagesGet.units()
            )));
        }

        if self.parser.section_marker.is_empty() {
            return Err(CounterError::ConfigError(
                "parser.section_marker cannot be empty".to_string(),
            ));
        }
        if self.parser.name_line == self.parser.location_line {
            return Err(CounterError::ConfigError(
                "parser.name_line and parser.location_line must differ".to_string(),
            ));
        }

        if !self.notifier.webhook_url.starts_with("https://")
            && !self.notifier.webhook_url.starts_with("http://")
        {
            return Err(CounterError::ConfigError(
                "notifier.webhook_url must be an http(s) URL".to_string(),
            ));
        }
        if self.notifier.ticket_capacity == 0 {
            return Err(CounterError::ConfigError(
                "notifier.ticket_capacity must be greater than 0".to_string(),
            ));
        }
        if self.trigger.interval_secs == 0 {
            return Err(CounterError::ConfigError(
                "trigger.interval_secs must be greater than 0".to_string(),
            ));
        }

        tracing::debug!("Configuration validation passed");
        Ok(())
    }

    /// Create an example configuration file
    pub async fn create_example(path: &Path) -> Result<()> {
        let mut config = Self::default();
        config.trigger.function_name = "count-tickets".to_string();
        config.gmail.label_name = "Ticket Sales".to_string();
        config.auth.token_path = Some(PathBuf::from("token.json"));
        config.notifier.webhook_url = "https://discord.com/api/webhooks/ID/TOKEN".to_string();
        config.save(path).await
    }
}

fn env_value(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use tempfile::NamedTempFile;

    fn complete_config() -> Config {
        let mut config = Config::default();
        config.trigger.function_name = "count-tickets".to_string();
        config.gmail.label_name = "Ticket Sales".to_string();
        config.auth.token = Some("{}".to_string());
        config.notifier.webhook_url = "https://discord.com/api/webhooks/1/abc".to_string();
        config
    }

    fn clear_env() {
        for name in [ENV_FUNCTION_NAME, ENV_LABEL_NAME, ENV_OAUTH2_TOKEN, ENV_WEBHOOK_URL] {
            std::env::remove_var(name);
        }
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();

        assert_eq!(config.trigger.interval_secs, 900);
        assert_eq!(config.gmail.max_concurrent_requests, 10);
        assert_eq!(config.gmail.quota_units_per_second, 250);
        assert_eq!(config.gmail.quota_burst_units, 500);
        assert_eq!(config.parser.section_marker, "Billing Information");
        assert_eq!(config.parser.name_line, 6);
        assert_eq!(config.parser.location_line, 10);
        assert_eq!(config.notifier.ticket_capacity, 200);
        assert!(config.auth.token.is_none());
    }

    #[test]
    fn test_defaults_are_incomplete() {
        let result = Config::default().validate();
        let message = result.unwrap_err().to_string();
        assert!(message.contains("trigger.function_name"));
        assert!(message.contains("gmail.label_name"));
        assert!(message.contains("auth.token"));
        assert!(message.contains("notifier.webhook_url"));
    }

    #[test]
    fn test_complete_config_is_valid() {
        assert!(complete_config().validate().is_ok());
    }

    #[test]
    fn test_token_path_satisfies_auth() {
        let mut config = complete_config();
        config.auth.token = None;
        config.auth.token_path = Some(PathBuf::from("token.json"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_blank_token_is_missing() {
        let mut config = complete_config();
        config.auth.token = Some("   ".to_string());
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_max_concurrent_bounds() {
        let mut config = complete_config();
        config.gmail.max_concurrent_requests = 0;
        assert!(config.validate().unwrap_err().to_string().contains("at least 1"));

        config.gmail.max_concurrent_requests = 51;
        assert!(config.validate().unwrap_err().to_string().contains("cannot exceed 50"));

        config.gmail.max_concurrent_requests = 1;
        assert!(config.validate().is_ok());
        config.gmail.max_concurrent_requests = 50;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parser_validation() {
        let mut config = complete_config();
        config.parser.section_marker = String::new();
        assert!(config.validate().is_err());

        let mut config = complete_config();
        config.parser.location_line = config.parser.name_line;
        assert!(config.validate().unwrap_err().to_string().contains("must differ"));
    }

    #[test]
    fn test_webhook_url_must_be_http() {
        let mut config = complete_config();
        config.notifier.webhook_url = "discord.com/api/webhooks/1".to_string();
        assert!(config.validate().unwrap_err().to_string().contains("http(s)"));
    }

    #[test]
    #[serial]
    fn test_env_overrides() {
        clear_env();
        std::env::set_var(ENV_FUNCTION_NAME, "count-tickets-prod");
        std::env::set_var(ENV_LABEL_NAME, "Sales/Tickets");
        std::env::set_var(ENV_OAUTH2_TOKEN, r#"{"type":"authorized_user"}"#);
        std::env::set_var(ENV_WEBHOOK_URL, "https://discord.com/api/webhooks/2/xyz");

        let mut config = Config::default();
        config.apply_env_overrides();

        assert_eq!(config.trigger.function_name, "count-tickets-prod");
        assert_eq!(config.gmail.label_name, "Sales/Tickets");
        assert_eq!(config.auth.token.as_deref(), Some(r#"{"type":"authorized_user"}"#));
        assert_eq!(config.notifier.webhook_url, "https://discord.com/api/webhooks/2/xyz");
        assert!(config.validate().is_ok());

        clear_env();
    }

    #[test]
    #[serial]
    fn test_empty_env_does_not_override() {
        clear_env();
        std::env::set_var(ENV_LABEL_NAME, "");

        let mut config = complete_config();
        config.apply_env_overrides();
        assert_eq!(config.gmail.label_name, "Ticket Sales");

        clear_env();
    }

    #[tokio::test]
    #[serial]
    async fn test_load_merges_file_and_env() {
        clear_env();
        let temp_file = NamedTempFile::new().unwrap();
        let contents = r#"
[trigger]
function_name = "count-tickets"

[gmail]
label_name = "Ticket Sales"
max_concurrent_requests = 4

[notifier]
webhook_url = "https://discord.com/api/webhooks/1/abc"
"#;
        tokio::fs::write(temp_file.path(), contents).await.unwrap();

        // Without a token the file alone is rejected
        assert!(Config::load(temp_file.path()).await.is_err());

        std::env::set_var(ENV_OAUTH2_TOKEN, "{}");
        let config = Config::load(temp_file.path()).await.unwrap();
        assert_eq!(config.gmail.max_concurrent_requests, 4);
        assert_eq!(config.parser.name_line, 6);
        assert_eq!(config.auth.token.as_deref(), Some("{}"));

        clear_env();
    }

    #[tokio::test]
    async fn test_load_file_invalid_toml() {
        let temp_file = NamedTempFile::new().unwrap();
        tokio::fs::write(temp_file.path(), "this is not valid toml {[}]")
            .await
            .unwrap();

        let result = Config::load_file(temp_file.path()).await;
        assert!(result
            .unwrap_err()
            .to_string()
            .contains("Failed to parse config file"));
    }

    #[tokio::test]
    async fn test_load_file_nonexistent_returns_default() {
        let path = Path::new("/tmp/nonexistent-ticket-counter-config-12345.toml");
        let config = Config::load_file(path).await.unwrap();
        assert_eq!(config.gmail.max_concurrent_requests, 10);
    }

    #[tokio::test]
    async fn test_save_skips_inline_token() {
        let temp_file = NamedTempFile::new().unwrap();
        let config = complete_config();
        config.save(temp_file.path()).await.unwrap();

        let written = tokio::fs::read_to_string(temp_file.path()).await.unwrap();
        assert!(!written.contains("token ="));

        let loaded = Config::load_file(temp_file.path()).await.unwrap();
        assert_eq!(loaded.gmail.label_name, "Ticket Sales");
        assert!(loaded.auth.token.is_none());
    }

    #[tokio::test]
    async fn test_create_example_is_valid() {
        let temp_file = NamedTempFile::new().unwrap();
        Config::create_example(temp_file.path()).await.unwrap();

        let config = Config::load_file(temp_file.path()).await.unwrap();
        assert!(config.validate().is_ok());
        assert_eq!(config.auth.token_path, Some(PathBuf::from("token.json")));
    }
}
