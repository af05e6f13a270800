use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::{LinkState, null_default};

/// Interface flavour.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InterfaceType {
    #[default]
    Physical,
    Loopback,
}

/// A network attachment point on a node, located at a numbered slot.
///
/// `node` is a lookup reference to the owning node's id.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Interface {
    pub id: String,
    #[serde(default)]
    pub lab_id: String,
    #[serde(default)]
    pub node: String,
    #[serde(default)]
    pub label: String,
    #[serde(default, deserialize_with = "null_default")]
    pub slot: u32,
    #[serde(rename = "type", default)]
    pub iface_type: InterfaceType,
    #[serde(default)]
    pub mac_address: Option<String>,
    #[serde(default)]
    pub is_connected: bool,
    #[serde(default)]
    pub state: LinkState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub src_udp_port: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dst_udp_port: Option<u16>,
    /// Layer-3 enrichment, filled by a deep lab fetch.
    #[serde(default, deserialize_with = "null_default")]
    pub ip4: Vec<String>,
    #[serde(default, deserialize_with = "null_default")]
    pub ip6: Vec<String>,
}

impl Interface {
    pub fn is_physical(&self) -> bool {
        self.iface_type == InterfaceType::Physical
    }
}

/// Sort interfaces by slot, ascending.
pub(crate) fn sort_by_slot(interfaces: &mut [Interface]) {
    interfaces.sort_by_key(|iface| iface.slot);
}

/// `POST labs/{lab}/interfaces` body.
#[derive(Debug, Serialize)]
pub(crate) struct InterfaceCreate<'a> {
    pub node: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub slot: Option<u32>,
}

// ── Layer 3 ──────────────────────────────────────────────────────────

/// One node's entry in `GET labs/{lab}/layer3_addresses`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct L3Node {
    #[serde(default)]
    pub name: String,
    /// Keyed by MAC address.
    #[serde(default, deserialize_with = "null_default")]
    pub interfaces: HashMap<String, L3Interface>,
}

/// Addresses learned for one interface.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct L3Interface {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub label: String,
    #[serde(default, deserialize_with = "null_default")]
    pub ip4: Vec<String>,
    #[serde(default, deserialize_with = "null_default")]
    pub ip6: Vec<String>,
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn decodes_server_payload() {
        let iface: Interface = serde_json::from_value(json!({
            "id": "i1",
            "lab_id": "L",
            "node": "n0",
            "label": "eth1",
            "slot": 1,
            "type": "physical",
            "mac_address": "52:54:00:00:00:01",
            "is_connected": false,
            "state": "STOPPED",
            "ip4": null
        }))
        .expect("interface");
        assert_eq!(iface.slot, 1);
        assert!(iface.is_physical());
        assert!(iface.ip4.is_empty());
    }

    #[test]
    fn loopback_with_null_slot() {
        let iface: Interface = serde_json::from_value(json!({
            "id": "lo0", "node": "n0", "slot": null, "type": "loopback"
        }))
        .expect("interface");
        assert_eq!(iface.slot, 0);
        assert!(!iface.is_physical());
    }
}
