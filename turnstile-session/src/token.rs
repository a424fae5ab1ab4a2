//! Session token generation.
//!
//! A session id doubles as a bearer credential, so it comes straight from the
//! operating system CSPRNG: 128 bits, hex-encoded to 32 characters. If the
//! entropy source fails the request fails with it.

use rand::TryRngCore;
use rand::rngs::OsRng;
use std::fmt;

use crate::error::{SessionError, SessionResult};

/// Random bytes per session id.
pub const SESSION_ID_BYTES: usize = 16;

/// Length of the hex-encoded session id.
pub const SESSION_ID_LEN: usize = SESSION_ID_BYTES * 2;

/// Opaque session identifier, always 32 lowercase hex characters.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SessionId(String);

impl SessionId {
    /// Accept a cookie value only if it has the shape of an issued id.
    pub fn parse(value: &str) -> Option<Self> {
        let well_formed = value.len() == SESSION_ID_LEN
            && value
                .bytes()
                .all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b));

        well_formed.then(|| Self(value.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Prefix safe to put in logs.
    pub fn redacted(&self) -> &str {
        &self.0[..8]
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for SessionId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Source of fresh session ids.
pub trait TokenGenerator: Send + Sync {
    fn generate(&self) -> SessionResult<SessionId>;
}

/// Generator backed by the operating system CSPRNG.
#[derive(Debug, Clone, Copy, Default)]
pub struct OsTokenGenerator;

impl TokenGenerator for OsTokenGenerator {
    fn generate(&self) -> SessionResult<SessionId> {
        let mut bytes = [0u8; SESSION_ID_BYTES];
        OsRng
            .try_fill_bytes(&mut bytes)
            .map_err(|e| SessionError::TokenGeneration(e.to_string()))?;

        Ok(SessionId(hex::encode(bytes)))
    }
}

/// Generate a new session id from the OS CSPRNG.
pub fn generate_session_id() -> SessionResult<SessionId> {
    OsTokenGenerator.generate()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_generated_id_shape() {
        let sid = generate_session_id().unwrap();
        assert_eq!(sid.as_str().len(), SESSION_ID_LEN);
        assert!(SessionId::parse(sid.as_str()).is_some());
    }

    #[test]
    fn test_ten_thousand_ids_are_unique() {
        let generator = OsTokenGenerator;
        let ids: HashSet<String> = (0..10_000)
            .map(|_| generator.generate().unwrap().to_string())
            .collect();
        assert_eq!(ids.len(), 10_000);
    }

    #[test]
    fn test_parse_rejects_malformed_values() {
        assert!(SessionId::parse("abc123").is_none());
        assert!(SessionId::parse("").is_none());
        assert!(SessionId::parse("0123456789ABCDEF0123456789abcdef").is_none());
        assert!(SessionId::parse("0123456789abcdef0123456789abcdeg").is_none());
        assert!(SessionId::parse("0123456789abcdef0123456789abcdef0").is_none());
        assert!(SessionId::parse("0123456789abcdef0123456789abcdef").is_some());
    }

    #[test]
    fn test_redacted_prefix() {
        let sid = SessionId::parse("0123456789abcdef0123456789abcdef").unwrap();
        assert_eq!(sid.redacted(), "01234567");
    }
}
