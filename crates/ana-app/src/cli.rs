//! CLI argument definitions for the Ana application.
//!
//! Priority resolution: CLI args > env vars > config file > defaults.

use clap::Parser;
use std::path::PathBuf;

use ana_core::config::AnaConfig;

/// Ana, a personal finance secretary you talk to in chat.
#[derive(Parser, Debug)]
#[command(name = "ana", version, about)]
pub struct CliArgs {
    /// Path to the configuration file.
    #[arg(short = 'c', long = "config")]
    pub config: Option<PathBuf>,

    /// API server port.
    #[arg(short = 'p', long = "port")]
    pub port: Option<u16>,

    /// Data directory for the SQLite session store.
    #[arg(short = 'd', long = "data-dir")]
    pub data_dir: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(short = 'l', long = "log-level")]
    pub log_level: Option<String>,

    /// API key for the generative backend. Takes precedence over the environment.
    #[arg(long = "api-key")]
    pub api_key: Option<String>,

    /// Send one message, print the reply and exit instead of serving.
    #[arg(long = "once", value_name = "MESSAGE")]
    pub once: Option<String>,
}

impl CliArgs {
    /// Resolve the configuration file path.
    ///
    /// Priority: --config flag > ANA_CONFIG env var > ~/.ana/config.toml.
    pub fn resolve_config_path(&self) -> PathBuf {
        if let Some(ref p) = self.config {
            return p.clone();
        }
        if let Ok(p) = std::env::var("ANA_CONFIG") {
            return PathBuf::from(p);
        }
        default_config_path()
    }

    /// Resolve the API server port.
    ///
    /// Priority: --port flag > ANA_PORT env var > config file value.
    pub fn resolve_port(&self, config_port: u16) -> u16 {
        if let Some(p) = self.port {
            return p;
        }
        if let Ok(val) = std::env::var("ANA_PORT") {
            if let Ok(p) = val.parse::<u16>() {
                return p;
            }
        }
        config_port
    }

    /// Apply every command-line override to `config`.
    pub fn apply_overrides(&self, config: &mut AnaConfig) {
        config.general.port = self.resolve_port(config.general.port);
        if let Some(ref dir) = self.data_dir {
            config.general.data_dir = dir.to_string_lossy().to_string();
        }
        if let Some(ref level) = self.log_level {
            config.general.log_level = level.clone();
        }
        if let Some(ref key) = self.api_key {
            config.llm.api_key = Some(key.clone());
        }
    }
}

/// Default config file path for the current platform.
fn default_config_path() -> PathBuf {
    #[cfg(target_os = "windows")]
    if let Ok(home) = std::env::var("USERPROFILE") {
        return PathBuf::from(home).join(".ana").join("config.toml");
    }
    #[cfg(not(target_os = "windows"))]
    if let Ok(home) = std::env::var("HOME") {
        return PathBuf::from(home).join(".ana").join("config.toml");
    }
    PathBuf::from("config.toml")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_flags() {
        let args = CliArgs::try_parse_from([
            "ana",
            "--config",
            "/tmp/ana.toml",
            "-p",
            "8080",
            "--api-key",
            "abc",
            "--once",
            "gastei 20 no pão",
        ])
        .unwrap();
        assert_eq!(args.resolve_config_path(), PathBuf::from("/tmp/ana.toml"));
        assert_eq!(args.port, Some(8080));
        assert_eq!(args.once.as_deref(), Some("gastei 20 no pão"));
    }

    #[test]
    fn test_overrides_applied() {
        let args = CliArgs::try_parse_from([
            "ana",
            "--port",
            "9000",
            "--data-dir",
            "/var/lib/ana",
            "--log-level",
            "debug",
            "--api-key",
            "secret",
        ])
        .unwrap();
        let mut config = AnaConfig::default();
        args.apply_overrides(&mut config);
        assert_eq!(config.general.port, 9000);
        assert_eq!(config.general.data_dir, "/var/lib/ana");
        assert_eq!(config.general.log_level, "debug");
        assert_eq!(config.llm.api_key.as_deref(), Some("secret"));
    }

    #[test]
    fn test_no_flags_keeps_config() {
        let args = CliArgs::try_parse_from(["ana"]).unwrap();
        let mut config = AnaConfig::default();
        config.general.data_dir = "/srv/ana".to_string();
        args.apply_overrides(&mut config);
        assert_eq!(config.general.data_dir, "/srv/ana");
        assert!(config.llm.api_key.is_none());
    }

    #[test]
    fn test_invalid_port_rejected() {
        assert!(CliArgs::try_parse_from(["ana", "--port", "99999"]).is_err());
    }
}
