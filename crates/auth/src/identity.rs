//! The signed-in user's identity record and its stored form.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

use heritage_core::UserId;

use crate::Role;

/// The authenticated principal for the current session.
///
/// Only `id` and `role` are interpreted; everything else the backend returned
/// at login (username, email, avatar, ...) is carried as an opaque profile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IdentityRecord {
    pub id: UserId,
    pub role: Role,
    #[serde(flatten)]
    pub profile: Map<String, Value>,
}

impl IdentityRecord {
    pub fn new(id: UserId, role: Role) -> Self {
        Self {
            id,
            role,
            profile: Map::new(),
        }
    }

    pub fn with_profile_field(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.profile.insert(key.into(), value.into());
        self
    }

    pub fn profile_str(&self, key: &str) -> Option<&str> {
        self.profile.get(key).and_then(Value::as_str)
    }
}

/// Why a stored identity could not be used.
#[derive(Debug, Error)]
pub enum IdentityParseError {
    #[error("stored identity is empty")]
    Empty,

    #[error("stored identity is malformed: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// Parse the serialized form of an identity record.
pub fn parse_identity(raw: &str) -> Result<IdentityRecord, IdentityParseError> {
    if raw.trim().is_empty() {
        return Err(IdentityParseError::Empty);
    }
    Ok(serde_json::from_str(raw)?)
}

/// Serialized form written to storage.
pub fn serialize_identity(record: &IdentityRecord) -> Result<String, serde_json::Error> {
    serde_json::to_string(record)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_login_payload_with_profile() {
        let raw = r#"{"id":12,"username":"lin","role":"管理员","email":"lin@example.org"}"#;
        let record = parse_identity(raw).unwrap();
        assert_eq!(record.id.as_str(), "12");
        assert_eq!(record.role, Role::Admin);
        assert_eq!(record.profile_str("username"), Some("lin"));
        assert!(!record.profile.contains_key("id"));
    }

    #[test]
    fn round_trips_through_serialized_form() {
        let record = IdentityRecord::new(UserId::from(3), Role::SuperAdmin)
            .with_profile_field("username", "root");
        let raw = serialize_identity(&record).unwrap();
        assert_eq!(parse_identity(&raw).unwrap(), record);
    }

    #[test]
    fn structurally_invalid_content_is_an_error() {
        assert!(matches!(parse_identity(""), Err(IdentityParseError::Empty)));
        assert!(matches!(parse_identity("{not json"), Err(IdentityParseError::Malformed(_))));
        assert!(parse_identity(r#"{"id":1}"#).is_err());
        assert!(parse_identity(r#"{"id":1,"role":"guest"}"#).is_err());
        assert!(parse_identity("null").is_err());
    }
}
