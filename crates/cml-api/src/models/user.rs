use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize, Serializer};

use super::null_default;

/// A controller user account.
///
/// `password` is write-only: it is sent on create/update and never read
/// back. `labs` is owned by the server and ignored on writes.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct User {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub id: String,
    #[serde(default)]
    pub username: String,
    #[serde(
        default,
        skip_deserializing,
        skip_serializing_if = "Option::is_none",
        serialize_with = "expose_password"
    )]
    pub password: Option<SecretString>,
    #[serde(default)]
    pub fullname: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub admin: bool,
    #[serde(default, deserialize_with = "null_default")]
    pub groups: Vec<String>,
    #[serde(default, deserialize_with = "null_default", skip_serializing)]
    pub labs: Vec<String>,
    #[serde(default)]
    pub opt_in: Option<bool>,
    #[serde(default)]
    pub resource_pool: Option<String>,
}

impl User {
    /// A user known only by id, as referenced from a lab's `owner`.
    pub fn reference(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Self::default()
        }
    }
}

fn expose_password<S: Serializer>(
    password: &Option<SecretString>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    match password {
        Some(secret) => serializer.serialize_str(secret.expose_secret()),
        None => serializer.serialize_none(),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn password_is_write_only() {
        let user: User = serde_json::from_value(json!({
            "id": "u1",
            "username": "alice",
            "password": "leaked",
            "labs": ["L1"]
        }))
        .expect("user");
        assert!(user.password.is_none());
        assert_eq!(user.labs, ["L1"]);

        let mut outgoing = user.clone();
        outgoing.password = Some(SecretString::from("s3cret"));
        let json = serde_json::to_value(&outgoing).expect("ser");
        assert_eq!(json["password"], "s3cret");
        assert!(json.get("labs").is_none());
    }
}
