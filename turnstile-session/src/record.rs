//! Identity claims and the session record persisted under a session id.

use serde::{Deserialize, Serialize};

use crate::error::StoreError;

/// Identity attributes asserted by the upstream token verifier.
///
/// Trusted as given; this crate performs no signature or expiry checks.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (`sub`)
    pub subject: Option<String>,
    /// Audience (`aud`), used as the user's directory
    pub audience: Option<String>,
}

impl Claims {
    pub fn new(subject: impl Into<String>, audience: impl Into<String>) -> Self {
        Self {
            subject: Some(subject.into()),
            audience: Some(audience.into()),
        }
    }

    pub fn from_parts(subject: Option<String>, audience: Option<String>) -> Self {
        Self { subject, audience }
    }

    /// Both fields present and non-empty.
    pub fn is_complete(&self) -> bool {
        let present = |field: &Option<String>| field.as_deref().is_some_and(|v| !v.is_empty());
        present(&self.subject) && present(&self.audience)
    }

    /// Build the record for a new session, `None` unless the claims are complete.
    pub fn to_record(&self) -> Option<SessionRecord> {
        match (&self.subject, &self.audience) {
            (Some(user), Some(dir)) if self.is_complete() => {
                Some(SessionRecord::new(user.clone(), dir.clone()))
            }
            _ => None,
        }
    }
}

/// Value stored under a session id.
///
/// Other readers of the store decode this, so the JSON shape
/// `{"user": ..., "dir": ...}` must stay stable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionRecord {
    pub user: String,
    pub dir: String,
}

impl SessionRecord {
    pub fn new(user: impl Into<String>, dir: impl Into<String>) -> Self {
        Self {
            user: user.into(),
            dir: dir.into(),
        }
    }

    pub fn to_json(&self) -> Result<String, StoreError> {
        serde_json::to_string(self).map_err(|e| StoreError::Serialization(e.to_string()))
    }

    pub fn from_json(json: &str) -> Result<Self, StoreError> {
        serde_json::from_str(json).map_err(|e| StoreError::Serialization(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_complete_claims() {
        let claims = Claims::new("alice", "teamA");
        assert!(claims.is_complete());
        assert_eq!(claims.to_record(), Some(SessionRecord::new("alice", "teamA")));
    }

    #[test]
    fn test_partial_claims_are_incomplete() {
        assert!(!Claims::from_parts(Some("alice".into()), None).is_complete());
        assert!(!Claims::from_parts(None, Some("teamA".into())).is_complete());
        assert!(!Claims::default().is_complete());
        assert!(!Claims::new("", "teamA").is_complete());
        assert!(!Claims::new("alice", "").is_complete());
        assert_eq!(Claims::new("", "teamA").to_record(), None);
    }

    #[test]
    fn test_record_wire_format() {
        let record = SessionRecord::new("alice", "teamA");
        assert_eq!(record.to_json().unwrap(), r#"{"user":"alice","dir":"teamA"}"#);
        assert_eq!(
            SessionRecord::from_json(r#"{"dir":"teamA","user":"alice"}"#).unwrap(),
            record
        );
    }

    #[test]
    fn test_record_decode_error() {
        assert!(matches!(
            SessionRecord::from_json("{\"user\":1}"),
            Err(StoreError::Serialization(_))
        ));
    }
}
