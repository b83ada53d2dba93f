use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{AnaError, Result};
use crate::types::{PersonaConfig, Tone};

/// Top-level configuration for Ana.
///
/// Loaded from `~/.ana/config.toml` by default. Every section falls back to
/// its defaults when absent.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AnaConfig {
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub assistant: AssistantConfig,
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub storage: StorageConfig,
}

impl AnaConfig {
    /// Load configuration from a TOML file.
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: AnaConfig = toml::from_str(&content)?;
        info!("Configuration loaded from {}", path.display());
        Ok(config)
    }

    /// Load configuration from a TOML file, falling back to defaults if the
    /// file does not exist or cannot be parsed.
    pub fn load_or_default(path: &Path) -> Self {
        match Self::load(path) {
            Ok(config) => config,
            Err(e) => {
                warn!(
                    "Failed to load config from {}: {}. Using defaults.",
                    path.display(),
                    e
                );
                Self::default()
            }
        }
    }

    /// Save the current configuration to a TOML file.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self).map_err(|e| AnaError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        info!("Configuration saved to {}", path.display());
        Ok(())
    }
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Log level: trace, debug, info, warn, error.
    pub log_level: String,
    /// Address the API server binds to.
    pub host: String,
    /// API server port.
    pub port: u16,
    /// Data directory for the SQLite session store.
    pub data_dir: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            host: "127.0.0.1".to_string(),
            port: 10000,
            data_dir: "~/.ana/data".to_string(),
        }
    }
}

impl GeneralConfig {
    /// Data directory with a leading `~/` expanded to the home directory.
    pub fn resolved_data_dir(&self) -> PathBuf {
        if let Some(rest) = self
            .data_dir
            .strip_prefix("~/")
            .or_else(|| self.data_dir.strip_prefix("~\\"))
        {
            #[cfg(target_os = "windows")]
            let home = std::env::var("USERPROFILE").unwrap_or_else(|_| ".".to_string());
            #[cfg(not(target_os = "windows"))]
            let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
            return PathBuf::from(home).join(rest);
        }
        PathBuf::from(&self.data_dir)
    }
}

/// Persona and greeting settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AssistantConfig {
    /// Display name of the assistant.
    pub name: String,
    /// "professional", "friendly" or "strict".
    pub tone: Tone,
    /// Contact identifier, e.g. a WhatsApp number. Informational only.
    pub contact: String,
    /// Name of the person the assistant works for. Empty to omit.
    pub client_name: String,
    /// First assistant message of a new session. `None` uses a built-in greeting.
    pub greeting: Option<String>,
}

impl Default for AssistantConfig {
    fn default() -> Self {
        Self {
            name: "Ana".to_string(),
            tone: Tone::Friendly,
            contact: String::new(),
            client_name: String::new(),
            greeting: None,
        }
    }
}

impl AssistantConfig {
    pub fn persona(&self) -> PersonaConfig {
        PersonaConfig {
            name: self.name.clone(),
            tone: self.tone,
            contact: self.contact.clone(),
        }
    }

    /// The greeting that opens a new chat session.
    pub fn greeting_text(&self) -> String {
        if let Some(ref greeting) = self.greeting {
            if !greeting.trim().is_empty() {
                return greeting.clone();
            }
        }
        if self.client_name.trim().is_empty() {
            "Oi! 🙋‍♀️ Sou sua secretária. O que você gastou hoje?".to_string()
        } else {
            format!(
                "Oi {}! 🙋‍♀️ Sou sua secretária. O que você gastou hoje?",
                self.client_name.trim()
            )
        }
    }
}

/// Generative-language backend settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Base URL of the Gemini REST API.
    pub api_base: String,
    /// Model identifier.
    pub model: String,
    /// API key injected by the hosting process. Takes precedence over the environment.
    pub api_key: Option<String>,
    /// Environment variable holding the API key.
    pub api_key_env: String,
    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
    /// Number of prior turns forwarded with each message. `None` forwards all.
    pub history_window: Option<usize>,
    /// Whether reminders are requested in the response schema.
    pub extract_reminders: bool,
    /// Locale used for the date in the instruction text.
    pub locale: String,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_base: "https://generativelanguage.googleapis.com/v1beta".to_string(),
            model: "gemini-3-flash-preview".to_string(),
            api_key: None,
            api_key_env: "API_KEY".to_string(),
            timeout_secs: 30,
            history_window: Some(6),
            extract_reminders: true,
            locale: "pt-BR".to_string(),
        }
    }
}

/// Session store backend.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StorageBackend {
    #[default]
    Sqlite,
    Memory,
}

/// Session storage configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub backend: StorageBackend,
}
