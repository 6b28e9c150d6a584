//! Authenticated user identity as reported by the auth collaborator.

use serde::Deserialize;

/// A user's id/email/name tuple.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Identity {
    /// Read from `$id` to match the auth provider's account payload.
    #[serde(rename = "$id")]
    pub id: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub name: String,
}

impl Identity {
    pub fn new(id: impl Into<String>, email: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            email: email.into(),
            name: name.into(),
        }
    }

    /// Greeting name with the same fallback the home screen uses.
    pub fn display_name(&self) -> &str {
        if self.name.trim().is_empty() {
            "User"
        } else {
            self.name.as_str()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::Identity;

    #[test]
    fn deserializes_provider_account_payload() {
        let identity: Identity = serde_json::from_str(
            r#"{"$id":"u1","email":"a@x.com","name":"Ann","status":true,"labels":[]}"#,
        )
        .unwrap();
        assert_eq!(identity, Identity::new("u1", "a@x.com", "Ann"));
    }

    #[test]
    fn display_name_falls_back_for_blank_names() {
        assert_eq!(Identity::new("u1", "a@x.com", " ").display_name(), "User");
        assert_eq!(Identity::new("u1", "a@x.com", "Ann").display_name(), "Ann");
    }
}
