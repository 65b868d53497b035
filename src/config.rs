//! Relay configuration, read once from the process environment at startup.

use secrecy::SecretString;

use crate::error::ConfigError;

pub const DEFAULT_SOURCE_CHANNEL: &str = "shemshineh";
pub const DEFAULT_DEST_CHANNEL: &str = "puzzlegold";
pub const DEFAULT_HTTP_PORT: u16 = 10000;
pub const DEFAULT_API_BASE: &str = "https://api.telegram.org";

/// Messaging-platform credentials. `API_ID`, `API_HASH` and `SESSION_STRING`
/// must all be set for the relay pipeline to run. The Bot API authenticates
/// with the session token alone, so the application secret is only checked
/// for presence and never held.
#[derive(Debug, Clone)]
pub struct Credentials {
    /// Application identifier.
    pub api_id: i64,
    /// Long-lived session token used to authenticate every API call.
    pub session: SecretString,
}

impl Credentials {
    /// `Ok(None)` when any credential is unset or empty; an error when they
    /// are present but malformed.
    pub fn from_lookup<F>(lookup: &F) -> Result<Option<Self>, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let (Some(api_id), Some(_api_hash), Some(session)) =
            (get("API_ID"), get("API_HASH"), get("SESSION_STRING"))
        else {
            return Ok(None);
        };

        let api_id = api_id
            .trim()
            .parse::<i64>()
            .ok()
            .filter(|id| *id > 0)
            .ok_or_else(|| ConfigError::InvalidValue {
                key: "API_ID".into(),
                message: format!("expected a positive integer, got {api_id:?}"),
            })?;

        Ok(Some(Self {
            api_id,
            session: SecretString::from(session),
        }))
    }
}

/// Process-wide relay settings, constructed once and passed explicitly.
#[derive(Debug, Clone)]
pub struct RelayConfig {
    /// `None` disables the relay; only the liveness endpoint runs.
    pub credentials: Option<Credentials>,
    /// Channel watched for new posts (no leading `@`).
    pub source_channel: String,
    /// Channel transformed posts are published to (no leading `@`).
    pub dest_channel: String,
    /// Liveness HTTP port.
    pub http_port: u16,
    /// Messaging API base URL.
    pub api_base: String,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            credentials: None,
            source_channel: DEFAULT_SOURCE_CHANNEL.to_string(),
            dest_channel: DEFAULT_DEST_CHANNEL.to_string(),
            http_port: DEFAULT_HTTP_PORT,
            api_base: DEFAULT_API_BASE.to_string(),
        }
    }
}

impl RelayConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key → value lookup. Malformed credentials disable the
    /// relay with a warning instead of failing startup.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let credentials = Credentials::from_lookup(&lookup).unwrap_or_else(|e| {
            tracing::warn!(error = %e, "Ignoring malformed credentials");
            None
        });

        let channel = |key: &str, default: &str| {
            lookup(key)
                .map(|v| v.trim().trim_start_matches('@').to_string())
                .filter(|v| !v.is_empty())
                .unwrap_or_else(|| default.to_string())
        };

        let http_port: u16 = lookup("PORT")
            .and_then(|s| s.trim().parse().ok())
            .unwrap_or(DEFAULT_HTTP_PORT);

        let api_base = lookup("TELEGRAM_API_BASE")
            .map(|s| s.trim().trim_end_matches('/').to_string())
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| DEFAULT_API_BASE.to_string());

        Self {
            credentials,
            source_channel: channel("SOURCE_CHANNEL", DEFAULT_SOURCE_CHANNEL),
            dest_channel: channel("DEST_CHANNEL", DEFAULT_DEST_CHANNEL),
            http_port,
            api_base,
        }
    }
}
