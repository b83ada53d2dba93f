//! API key resolution.
//!
//! The key is looked up on every call so a value exported after startup is
//! picked up without a restart.

use std::fmt;
use std::sync::Arc;

use ana_core::config::LlmConfig;

use crate::error::InterpreterError;

/// Secondary environment variable consulted after the configured one.
pub const FALLBACK_ENV_VAR: &str = "GEMINI_API_KEY";

/// Reads a variable by name; the process environment unless replaced.
type EnvLookup = Arc<dyn Fn(&str) -> Option<String> + Send + Sync>;

/// Where the API key comes from.
#[derive(Clone)]
pub struct CredentialSource {
    /// Value injected by the hosting process (config file or CLI flag).
    injected: Option<String>,
    /// Environment variable holding the key.
    env_var: String,
    lookup: EnvLookup,
}

impl fmt::Debug for CredentialSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialSource")
            .field("injected", &self.injected.as_ref().map(|_| "<redacted>"))
            .field("env_var", &self.env_var)
            .finish()
    }
}

impl CredentialSource {
    pub fn new(injected: Option<String>, env_var: impl Into<String>) -> Self {
        Self {
            injected,
            env_var: env_var.into(),
            lookup: Arc::new(|name: &str| std::env::var(name).ok()),
        }
    }

    /// Read variables through `lookup` instead of the process environment.
    pub fn with_lookup<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String> + Send + Sync + 'static,
    {
        self.lookup = Arc::new(lookup);
        self
    }

    pub fn from_config(config: &LlmConfig) -> Self {
        Self::new(config.api_key.clone(), config.api_key_env.clone())
    }

    /// A source that only yields the given key. Used by tests and one-shot tools.
    pub fn fixed(key: impl Into<String>) -> Self {
        Self::new(Some(key.into()), String::new())
    }

    pub fn env_var(&self) -> &str {
        &self.env_var
    }

    /// Resolve the key: injected value, then `env_var`, then `GEMINI_API_KEY`.
    ///
    /// Blank values count as missing.
    pub fn resolve(&self) -> Result<String, InterpreterError> {
        self.resolve_with(|name| (self.lookup)(name))
    }

    fn resolve_with<F>(&self, lookup: F) -> Result<String, InterpreterError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_blank = |v: &String| !v.trim().is_empty();

        if let Some(key) = self.injected.as_ref().filter(|v| non_blank(v)) {
            return Ok(key.trim().to_string());
        }

        let env_candidates = [self.env_var.as_str(), FALLBACK_ENV_VAR];
        for name in env_candidates.iter().filter(|n| !n.is_empty()) {
            if let Some(key) = lookup(*name).filter(non_blank) {
                return Ok(key.trim().to_string());
            }
        }

        Err(InterpreterError::CredentialMissing {
            env_var: if self.env_var.is_empty() {
                FALLBACK_ENV_VAR.to_string()
            } else {
                self.env_var.clone()
            },
        })
    }
}
