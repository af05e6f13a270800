use serde::{Deserialize, Serialize};

use super::interface::{Interface, sort_by_slot};
use super::{State, null_default};

/// A virtual device (VM or container) within a lab.
///
/// `lab_id` is a lookup reference to the owning lab. `interfaces` are
/// kept ordered by slot.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node {
    pub id: String,
    #[serde(default)]
    pub lab_id: String,
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub x: i32,
    #[serde(default)]
    pub y: i32,
    #[serde(default)]
    pub node_definition: String,
    #[serde(default)]
    pub image_definition: Option<String>,
    #[serde(default)]
    pub configuration: Option<String>,
    #[serde(default)]
    pub cpus: Option<u32>,
    #[serde(default)]
    pub cpu_limit: Option<u32>,
    #[serde(default)]
    pub ram: Option<u32>,
    #[serde(default)]
    pub data_volume: Option<u32>,
    #[serde(default)]
    pub boot_disk_size: Option<u32>,
    #[serde(default)]
    pub state: State,
    #[serde(default, deserialize_with = "null_default")]
    pub tags: Vec<String>,
    #[serde(default, deserialize_with = "null_default")]
    pub interfaces: Vec<Interface>,
    #[serde(default)]
    pub compute_id: Option<String>,
    #[serde(default)]
    pub vnc_key: Option<String>,
    #[serde(default, deserialize_with = "null_default")]
    pub serial_devices: Vec<SerialDevice>,
}

/// A serial console attached to a node.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SerialDevice {
    pub console_key: String,
    pub device_number: u32,
}

impl Node {
    /// Copy the mutable fields of a freshly fetched node onto `self`.
    ///
    /// Label, position, tags and state always follow the server. The VM
    /// shape (cpu, ram, disk, image, configuration) only changes while the
    /// node is `DEFINED_ON_CORE`; once a VM exists the server freezes it.
    pub(crate) fn reconcile(&mut self, fetched: &Self) {
        self.label.clone_from(&fetched.label);
        self.x = fetched.x;
        self.y = fetched.y;
        self.tags.clone_from(&fetched.tags);
        self.state = fetched.state;
        self.compute_id.clone_from(&fetched.compute_id);
        self.vnc_key.clone_from(&fetched.vnc_key);
        self.serial_devices.clone_from(&fetched.serial_devices);

        if fetched.state == State::Defined {
            self.cpus = fetched.cpus;
            self.cpu_limit = fetched.cpu_limit;
            self.ram = fetched.ram;
            self.data_volume = fetched.data_volume;
            self.boot_disk_size = fetched.boot_disk_size;
            self.image_definition.clone_from(&fetched.image_definition);
            self.configuration.clone_from(&fetched.configuration);
        }
    }

    /// Insert or keep an interface, preserving slot order.
    ///
    /// Existing interfaces are immutable once created, so a known id is a no-op.
    pub(crate) fn upsert_interface(&mut self, iface: Interface) {
        if self.interfaces.iter().any(|i| i.id == iface.id) {
            return;
        }
        self.interfaces.push(iface);
        sort_by_slot(&mut self.interfaces);
    }
}

// ── Request bodies ───────────────────────────────────────────────────

/// Minimal `POST labs/{lab}/nodes` body. The server rejects the rest.
#[derive(Debug, Serialize)]
pub(crate) struct NodeCreate<'a> {
    pub label: &'a str,
    pub node_definition: &'a str,
    pub x: i32,
    pub y: i32,
}

/// `PATCH labs/{lab}/nodes/{id}` body with the fields the POST cannot carry.
#[derive(Debug, Serialize)]
pub(crate) struct NodePatch<'a> {
    pub label: &'a str,
    pub x: i32,
    pub y: i32,
    pub tags: &'a [String],
    #[serde(skip_serializing_if = "Option::is_none")]
    pub configuration: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_definition: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cpus: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cpu_limit: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ram: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_volume: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub boot_disk_size: Option<u32>,
}

impl<'a> NodePatch<'a> {
    pub(crate) fn from_node(node: &'a Node) -> Self {
        Self {
            label: &node.label,
            x: node.x,
            y: node.y,
            tags: &node.tags,
            configuration: node.configuration.as_deref(),
            image_definition: node.image_definition.as_deref(),
            cpus: node.cpus,
            cpu_limit: node.cpu_limit,
            ram: node.ram,
            data_volume: node.data_volume,
            boot_disk_size: node.boot_disk_size,
        }
    }

    /// A patch that only updates mutable-while-running fields.
    pub(crate) fn mutable_only(node: &'a Node) -> Self {
        let mut patch = Self::from_node(node);
        if node.state != State::Defined {
            patch.configuration = None;
            patch.image_definition = None;
            patch.cpus = None;
            patch.cpu_limit = None;
            patch.ram = None;
            patch.data_volume = None;
            patch.boot_disk_size = None;
        }
        patch
    }
}

/// `PATCH labs/{lab}/nodes/{id}` body for a configuration change.
#[derive(Debug, Serialize)]
pub(crate) struct NodeConfigPatch<'a> {
    pub configuration: &'a str,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(state: State, cpus: u32) -> Node {
        Node {
            id: "n0".into(),
            lab_id: "L".into(),
            label: "R1".into(),
            cpus: Some(cpus),
            state,
            ..Node::default()
        }
    }

    #[test]
    fn reconcile_discards_vm_shape_once_started() {
        let mut cached = node(State::Defined, 1);
        let mut fetched = node(State::Booted, 4);
        fetched.label = "R1-renamed".into();
        cached.reconcile(&fetched);
        assert_eq!(cached.cpus, Some(1));
        assert_eq!(cached.label, "R1-renamed");
        assert_eq!(cached.state, State::Booted);
    }

    #[test]
    fn reconcile_applies_vm_shape_while_defined() {
        let mut cached = node(State::Defined, 1);
        let fetched = node(State::Defined, 4);
        cached.reconcile(&fetched);
        assert_eq!(cached.cpus, Some(4));
    }

    #[test]
    fn tags_serialize_as_empty_array() {
        let json = serde_json::to_value(Node::default()).expect("ser");
        assert_eq!(json["tags"], serde_json::json!([]));
    }

    #[test]
    fn upsert_interface_keeps_slot_order() {
        let mut n = node(State::Defined, 1);
        for (id, slot) in [("i2", 2), ("i0", 0), ("i1", 1), ("i0", 0)] {
            n.upsert_interface(Interface {
                id: id.into(),
                slot,
                ..Interface::default()
            });
        }
        let ids: Vec<_> = n.interfaces.iter().map(|i| i.id.as_str()).collect();
        assert_eq!(ids, ["i0", "i1", "i2"]);
    }

    #[test]
    fn running_patch_omits_vm_shape() {
        let n = node(State::Booted, 2);
        let json = serde_json::to_value(NodePatch::mutable_only(&n)).expect("ser");
        assert!(json.get("cpus").is_none());
        assert_eq!(json["label"], "R1");
    }
}
