// CML API models
//
// Response and request types for the controller's JSON API. States are
// parsed into tagged enums on ingress; unknown states fail decoding.
// Collections serialize in a stable order: nodes by id, links by id,
// interfaces by slot.

pub mod definitions;
pub mod group;
pub mod interface;
pub mod lab;
pub mod link;
pub mod node;
pub mod user;

use serde::{Deserialize, Deserializer, Serialize};
use strum::Display;

pub use definitions::{ImageDefinition, NodeDefinition};
pub use group::{Group, GroupLab};
pub use interface::{Interface, InterfaceType, L3Interface, L3Node};
pub use lab::{ImportResponse, Lab, LabGroup, LabTile};
pub use link::{Link, LinkSpec};
pub use node::{Node, SerialDevice};
pub use user::User;

// ── States ───────────────────────────────────────────────────────────

/// Lifecycle state of a lab or node.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, Display)]
pub enum State {
    #[default]
    #[serde(rename = "DEFINED_ON_CORE", alias = "DEFINED_ON_CLUSTER")]
    #[strum(serialize = "DEFINED_ON_CORE")]
    Defined,
    #[serde(rename = "STOPPED")]
    #[strum(serialize = "STOPPED")]
    Stopped,
    #[serde(rename = "STARTED")]
    #[strum(serialize = "STARTED")]
    Started,
    #[serde(rename = "BOOTED")]
    #[strum(serialize = "BOOTED")]
    Booted,
}

impl State {
    /// The node has a VM (or the lab has running nodes).
    pub fn is_active(self) -> bool {
        matches!(self, Self::Started | Self::Booted)
    }
}

/// Lifecycle state of an interface or link.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, Display)]
pub enum LinkState {
    #[default]
    #[serde(rename = "DEFINED_ON_CORE", alias = "DEFINED_ON_CLUSTER")]
    #[strum(serialize = "DEFINED_ON_CORE")]
    Defined,
    #[serde(rename = "STOPPED")]
    #[strum(serialize = "STOPPED")]
    Stopped,
    #[serde(rename = "STARTED")]
    #[strum(serialize = "STARTED")]
    Started,
}

// ── Shared shapes ────────────────────────────────────────────────────

/// `{"id": "..."}` returned by create endpoints.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct IdResponse {
    pub id: String,
}

/// Treat an explicit JSON `null` like a missing field.
pub(crate) fn null_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn states_use_wire_names() {
        let s: State = serde_json::from_str("\"DEFINED_ON_CORE\"").expect("defined");
        assert_eq!(s, State::Defined);
        let s: State = serde_json::from_str("\"DEFINED_ON_CLUSTER\"").expect("alias");
        assert_eq!(s, State::Defined);
        assert_eq!(
            serde_json::to_string(&State::Booted).expect("ser"),
            "\"BOOTED\""
        );
        assert_eq!(State::Stopped.to_string(), "STOPPED");
    }

    #[test]
    fn unknown_state_is_rejected() {
        assert!(serde_json::from_str::<State>("\"EXPLODED\"").is_err());
        assert!(serde_json::from_str::<LinkState>("\"BOOTED\"").is_err());
    }
}
