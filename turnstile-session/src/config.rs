//! Session configuration.

use serde::Deserialize;
use std::time::Duration;

use crate::cookie::{CookieSettings, is_valid_cookie_name};
use crate::engine::CookiePolicy;
use crate::error::{SessionError, SessionResult};

/// Lifetime of a new session in the store: 8 hours.
pub const DEFAULT_SESSION_TTL: Duration = Duration::from_secs(8 * 60 * 60);

/// Longest accepted session lifetime: 365 days.
pub const MAX_SESSION_TTL: Duration = Duration::from_secs(365 * 24 * 60 * 60);

/// Session configuration.
///
/// Deserializes from the `[session]` table:
///
/// ```toml
/// [session]
/// ttl_secs = 28800
/// namespace = "gate"
///
/// [session.cookie]
/// name = "sessionid"
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Store-side lifetime of a new session
    #[serde(rename = "ttl_secs", with = "duration_secs")]
    pub ttl: Duration,
    /// Key prefix; `None` stores sessions under the bare id
    pub namespace: Option<String>,
    /// Extra attempts for transient store failures
    pub max_retries: u32,
    /// What a stale cookie does to a request that also carries claims
    pub cookie_policy: CookiePolicy,
    pub cookie: CookieSettings,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            ttl: DEFAULT_SESSION_TTL,
            namespace: None,
            max_retries: 0,
            cookie_policy: CookiePolicy::default(),
            cookie: CookieSettings::default(),
        }
    }
}

impl SessionConfig {
    /// Set the session namespace/prefix.
    pub fn with_namespace(mut self, namespace: &str) -> Self {
        self.namespace = Some(namespace.to_string());
        self
    }

    /// Set the session TTL.
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn with_cookie_policy(mut self, policy: CookiePolicy) -> Self {
        self.cookie_policy = policy;
        self
    }

    pub fn validate(&self) -> SessionResult<()> {
        if self.ttl < Duration::from_secs(1) {
            return Err(SessionError::Config(
                "session ttl must be at least one second".to_string(),
            ));
        }

        if self.ttl > MAX_SESSION_TTL {
            return Err(SessionError::Config(format!(
                "session ttl must not exceed {} seconds",
                MAX_SESSION_TTL.as_secs()
            )));
        }

        if !is_valid_cookie_name(&self.cookie.name) {
            return Err(SessionError::Config(format!(
                "invalid cookie name: {:?}",
                self.cookie.name
            )));
        }

        if let Some(ns) = &self.namespace
            && (ns.is_empty() || ns.contains(char::is_whitespace))
        {
            return Err(SessionError::Config(format!("invalid namespace: {:?}", ns)));
        }

        Ok(())
    }
}

mod duration_secs {
    use serde::{Deserialize, Deserializer};
    use std::time::Duration;

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(Duration::from_secs(u64::deserialize(deserializer)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_reference_deployment() {
        let config = SessionConfig::default();
        assert_eq!(config.ttl, Duration::from_secs(28800));
        assert_eq!(config.namespace, None);
        assert_eq!(config.cookie.name, "sessionid");
        assert_eq!(config.cookie_policy, CookiePolicy::CookieTakesPrecedence);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_deserialize() {
        let config: SessionConfig = toml::from_str(
            r#"
            ttl_secs = 3600
            namespace = "gate"
            cookie_policy = "fall_back_to_claims"

            [cookie]
            name = "sid"
            same_site = "strict"
            "#,
        )
        .unwrap();

        assert_eq!(config.ttl, Duration::from_secs(3600));
        assert_eq!(config.namespace.as_deref(), Some("gate"));
        assert_eq!(config.cookie_policy, CookiePolicy::FallBackToClaims);
        assert_eq!(config.cookie.name, "sid");
        assert!(config.cookie.secure);
    }

    #[test]
    fn test_validate_rejects_zero_ttl() {
        let config = SessionConfig::default().with_ttl(Duration::ZERO);
        assert!(matches!(config.validate(), Err(SessionError::Config(_))));
    }

    #[test]
    fn test_validate_rejects_ttl_beyond_cap() {
        let config: SessionConfig = toml::from_str("ttl_secs = 18446744073709551615").unwrap();
        assert!(matches!(config.validate(), Err(SessionError::Config(_))));

        assert!(SessionConfig::default().with_ttl(MAX_SESSION_TTL).validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_cookie_name() {
        let mut config = SessionConfig::default();
        config.cookie.name = "session id".into();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_blank_namespace() {
        assert!(SessionConfig::default().with_namespace("").validate().is_err());
    }
}
