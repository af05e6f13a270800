use serde::{Deserialize, Serialize};

use super::null_default;

/// A user group with lab permissions.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// User ids.
    #[serde(default, deserialize_with = "null_default")]
    pub members: Vec<String>,
    #[serde(default, deserialize_with = "null_default")]
    pub labs: Vec<GroupLab>,
}

/// A lab a group has access to.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupLab {
    pub id: String,
    pub permission: String,
}
