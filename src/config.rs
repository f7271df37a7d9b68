use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::Path;

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub slack: Option<SlackConfig>,
    #[serde(default)]
    pub order_service: OrderServiceConfig,
    #[serde(default)]
    pub chat: ChatConfig,
    #[serde(default)]
    pub catalog: CatalogConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SlackConfig {
    pub bot_token: String,
    pub app_token: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct OrderServiceConfig {
    #[serde(default = "default_order_service_url")]
    pub base_url: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ChatConfig {
    #[serde(default = "default_chat_url")]
    pub base_url: String,
    #[serde(default = "default_checkout_path")]
    pub checkout_path: String,
    #[serde(default = "default_redirect_delay_ms")]
    pub redirect_delay_ms: u64,
    #[serde(default = "default_greeting")]
    pub greeting: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct CatalogConfig {
    #[serde(default = "default_products")]
    pub products: Vec<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    #[serde(default = "default_log_filter")]
    pub filter: String,
}

impl Default for OrderServiceConfig {
    fn default() -> Self {
        Self {
            base_url: default_order_service_url(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            base_url: default_chat_url(),
            checkout_path: default_checkout_path(),
            redirect_delay_ms: default_redirect_delay_ms(),
            greeting: default_greeting(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            products: default_products(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: default_log_filter(),
        }
    }
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("failed to read config: {}", path.display()))?;
        let cfg: Config = toml::from_str(&content).context("failed to parse config toml")?;

        if let Some(slack) = &cfg.slack {
            if slack.bot_token.trim().is_empty() || slack.app_token.trim().is_empty() {
                bail!("slack.bot_token and slack.app_token are required");
            }
        }
        if cfg.catalog.products.iter().any(|p| p.trim().is_empty()) {
            bail!("catalog.products must not contain empty names");
        }
        Ok(cfg)
    }

    /// Loads `path` if it exists; `None` means the caller should use defaults.
    pub fn load_optional(path: &Path) -> Result<Option<Self>> {
        if !path.exists() {
            return Ok(None);
        }
        Self::load(path).map(Some)
    }

    pub fn require_slack(&self) -> Result<&SlackConfig> {
        self.slack
            .as_ref()
            .context("[slack] section with bot_token and app_token is required for serve")
    }
}

fn default_order_service_url() -> String {
    "http://127.0.0.1:5000/api".to_string()
}

fn default_chat_url() -> String {
    "http://127.0.0.1:5000".to_string()
}

fn default_checkout_path() -> String {
    "/checkout".to_string()
}

fn default_redirect_delay_ms() -> u64 {
    1_500
}

fn default_greeting() -> String {
    "Hello! I'm your shopping assistant. How can I help you today?".to_string()
}

fn default_timeout_secs() -> u64 {
    10
}

fn default_products() -> Vec<String> {
    [
        "idli mix",
        "dosa mix",
        "upma mix",
        "poha mix",
        "cake mix",
        "thandai",
        "sambar",
        "rasam",
        "badam milk",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

fn default_log_filter() -> String {
    "info".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_config(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().expect("tempfile");
        file.write_all(content.as_bytes()).expect("write config");
        file
    }

    #[test]
    fn empty_file_yields_defaults() {
        let file = write_config("");
        let cfg = Config::load(file.path()).unwrap();
        assert!(cfg.slack.is_none());
        assert_eq!(cfg.order_service.base_url, "http://127.0.0.1:5000/api");
        assert_eq!(cfg.chat.redirect_delay_ms, 1_500);
        assert_eq!(cfg.catalog.products.first().map(String::as_str), Some("idli mix"));
        assert!(cfg.require_slack().is_err());
    }

    #[test]
    fn sections_override_defaults() {
        let file = write_config(
            r#"
[slack]
bot_token = "xoxb-1"
app_token = "xapp-1"

[chat]
checkout_path = "/cart/checkout"

[catalog]
products = ["thandai"]
"#,
        );
        let cfg = Config::load(file.path()).unwrap();
        assert_eq!(cfg.require_slack().unwrap().bot_token, "xoxb-1");
        assert_eq!(cfg.chat.checkout_path, "/cart/checkout");
        assert_eq!(cfg.chat.base_url, "http://127.0.0.1:5000");
        assert_eq!(cfg.catalog.products, vec!["thandai".to_string()]);
    }

    #[test]
    fn blank_slack_tokens_are_rejected() {
        let file = write_config("[slack]\nbot_token = \"\"\napp_token = \"x\"\n");
        assert!(Config::load(file.path()).is_err());
    }

    #[test]
    fn missing_file_loads_as_none() {
        let dir = tempfile::tempdir().expect("tempdir");
        let cfg = Config::load_optional(&dir.path().join("absent.toml")).unwrap();
        assert!(cfg.is_none());
        let cfg = cfg.unwrap_or_default();
        assert_eq!(cfg.logging.filter, "info");
    }
}
