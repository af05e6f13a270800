use serde::{Deserialize, Serialize};

use super::LinkState;

/// A point-to-point connection between two interfaces.
///
/// Interface and node ids are lookup references; `slot_a`/`slot_b` are
/// filled in by a deep fetch from the referenced interfaces.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Link {
    pub id: String,
    #[serde(default)]
    pub lab_id: String,
    #[serde(default)]
    pub state: LinkState,
    #[serde(default)]
    pub label: String,
    #[serde(default, rename = "link_capture_key")]
    pub capture_key: Option<String>,
    pub interface_a: String,
    pub interface_b: String,
    #[serde(default)]
    pub node_a: String,
    #[serde(default)]
    pub node_b: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slot_a: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slot_b: Option<u32>,
}

/// Input for [`Client::link_create`](crate::Client::link_create).
///
/// Each endpoint is either an interface id, or a node id with an optional
/// slot hint. Missing interfaces are discovered or created on the node.
#[derive(Debug, Clone, Default)]
pub struct LinkSpec {
    pub lab_id: String,
    pub src_interface: Option<String>,
    pub dst_interface: Option<String>,
    pub src_node: Option<String>,
    pub dst_node: Option<String>,
    pub src_slot: Option<u32>,
    pub dst_slot: Option<u32>,
}

impl LinkSpec {
    /// Link two nodes, letting the client pick or create the interfaces.
    pub fn between_nodes(
        lab_id: impl Into<String>,
        src: impl Into<String>,
        dst: impl Into<String>,
    ) -> Self {
        Self {
            lab_id: lab_id.into(),
            src_node: Some(src.into()),
            dst_node: Some(dst.into()),
            ..Self::default()
        }
    }

    /// Link two existing interfaces.
    pub fn between_interfaces(
        lab_id: impl Into<String>,
        src: impl Into<String>,
        dst: impl Into<String>,
    ) -> Self {
        Self {
            lab_id: lab_id.into(),
            src_interface: Some(src.into()),
            dst_interface: Some(dst.into()),
            ..Self::default()
        }
    }

    pub fn with_slots(mut self, src: u32, dst: u32) -> Self {
        self.src_slot = Some(src);
        self.dst_slot = Some(dst);
        self
    }
}

/// `POST labs/{lab}/links` body.
#[derive(Debug, Serialize)]
pub(crate) struct LinkCreate<'a> {
    pub src_int: &'a str,
    pub dst_int: &'a str,
}
