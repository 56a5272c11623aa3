/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 17/10/26
******************************************************************************/

//! Bot configuration file.
//!
//! The file is JSON:
//!
//! ```json
//! {
//!   "irc": { "server": "irc.example.org", "channel": "#forkey", "nick": "forkey" },
//!   "apis": { "youtube": { "key": "..." } },
//!   "tls": { "verify_certificates": true }
//! }
//! ```
//!
//! `irc.port` and the whole `tls` section are optional.

use forkey_core::error::ConfigError;
use forkey_core::types::DEFAULT_PORT;
use forkey_session::config::SessionConfig;
use forkey_transport::tls::TlsPolicy;
use serde::Deserialize;
use std::fs;
use std::path::Path;

/// Default config file name, relative to the working directory.
pub const DEFAULT_CONFIG_PATH: &str = "config.json";

/// Environment variable overriding the config path.
pub const CONFIG_ENV: &str = "FORKEY_CONFIG";

/// IRC connection settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct IrcConfig {
    /// Server hostname.
    pub server: String,
    /// Channel joined after registration.
    pub channel: String,
    /// Nickname and user name.
    pub nick: String,
    /// Server port.
    #[serde(default = "default_port")]
    pub port: u16,
}

/// YouTube Data API settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct YoutubeConfig {
    /// API key.
    pub key: String,
}

/// External API settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ApisConfig {
    /// YouTube lookup settings.
    pub youtube: YoutubeConfig,
}

/// TLS settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TlsConfig {
    /// Whether the server certificate chain is validated.
    #[serde(default = "default_verify")]
    pub verify_certificates: bool,
}

impl Default for TlsConfig {
    fn default() -> Self {
        Self {
            verify_certificates: true,
        }
    }
}

/// Complete bot configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct BotConfig {
    /// IRC settings.
    pub irc: IrcConfig,
    /// API settings.
    pub apis: ApisConfig,
    /// TLS settings.
    #[serde(default)]
    pub tls: TlsConfig,
}

const fn default_port() -> u16 {
    DEFAULT_PORT
}

const fn default_verify() -> bool {
    true
}

impl BotConfig {
    /// Reads and validates the config file at `path`.
    ///
    /// # Errors
    /// Returns `ConfigError::Read` if the file cannot be read, or the
    /// parse/validation error otherwise.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        Self::from_json(&text)
    }

    /// Parses and validates a config document.
    ///
    /// # Errors
    /// Returns `ConfigError::Parse` for malformed JSON or missing keys, and
    /// `ConfigError::Invalid` for empty values.
    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        let config: Self =
            serde_json::from_str(text).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let required = [
            ("irc.server", &self.irc.server),
            ("irc.channel", &self.irc.channel),
            ("irc.nick", &self.irc.nick),
            ("apis.youtube.key", &self.apis.youtube.key),
        ];
        for (key, value) in required {
            if value.trim().is_empty() {
                return Err(ConfigError::Invalid {
                    key,
                    reason: "must not be empty".into(),
                });
            }
        }
        if self.irc.nick.contains(char::is_whitespace) {
            return Err(ConfigError::Invalid {
                key: "irc.nick",
                reason: "must not contain whitespace".into(),
            });
        }
        if self.irc.port == 0 {
            return Err(ConfigError::Invalid {
                key: "irc.port",
                reason: "must be non-zero".into(),
            });
        }
        Ok(())
    }

    /// Returns the session settings derived from this config.
    #[must_use]
    pub fn session_config(&self) -> SessionConfig {
        SessionConfig::new().with_port(self.irc.port)
    }

    /// Returns the TLS policy derived from this config.
    #[must_use]
    pub fn tls_policy(&self) -> TlsPolicy {
        TlsPolicy::new().with_verify_certificates(self.tls.verify_certificates)
    }
}

/// Picks the config path: first CLI argument, then `FORKEY_CONFIG`, then
/// [`DEFAULT_CONFIG_PATH`].
#[must_use]
pub fn resolve_config_path(arg: Option<String>, env: Option<String>) -> String {
    arg.or(env)
        .unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r##"{
        "irc": { "server": "irc.hostname.org", "channel": "#forkey", "nick": "forkey" },
        "apis": { "youtube": { "key": "secret" } }
    }"##;

    #[test]
    fn test_parse_minimal_config() {
        let config = BotConfig::from_json(SAMPLE).unwrap();
        assert_eq!(config.irc.server, "irc.hostname.org");
        assert_eq!(config.irc.channel, "#forkey");
        assert_eq!(config.irc.nick, "forkey");
        assert_eq!(config.irc.port, 6667);
        assert_eq!(config.apis.youtube.key, "secret");
        assert!(config.tls.verify_certificates);
    }

    #[test]
    fn test_session_and_tls_settings() {
        let config = BotConfig::from_json(
            r##"{
                "irc": { "server": "s", "channel": "#c", "nick": "n", "port": 6697 },
                "apis": { "youtube": { "key": "k" } },
                "tls": { "verify_certificates": false }
            }"##,
        )
        .unwrap();
        assert_eq!(config.session_config().port, 6697);
        assert!(!config.tls_policy().verify_certificates);
    }

    #[test]
    fn test_missing_key_is_parse_error() {
        let result = BotConfig::from_json(r#"{ "irc": { "server": "s" } }"#);
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_empty_nick_rejected() {
        let text = SAMPLE.replace("\"nick\": \"forkey\"", "\"nick\": \"\"");
        assert_eq!(
            BotConfig::from_json(&text),
            Err(ConfigError::Invalid {
                key: "irc.nick",
                reason: "must not be empty".into()
            })
        );
    }

    #[test]
    fn test_missing_file() {
        let result = BotConfig::load("/nonexistent/forkey/config.json");
        assert!(matches!(result, Err(ConfigError::Read { .. })));
    }

    #[test]
    fn test_resolve_config_path() {
        assert_eq!(resolve_config_path(None, None), "config.json");
        assert_eq!(
            resolve_config_path(None, Some("env.json".into())),
            "env.json"
        );
        assert_eq!(
            resolve_config_path(Some("arg.json".into()), Some("env.json".into())),
            "arg.json"
        );
    }
}
