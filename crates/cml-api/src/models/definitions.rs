// Image and node definition catalogs
//
// Read-only. The payloads are large and vary between releases; only the
// identifiers and a few capability flags are modelled, the rest lands in
// `extra`.

use serde::{Deserialize, Serialize};

use super::null_default;

/// A disk image usable by one node definition.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ImageDefinition {
    pub id: String,
    #[serde(default)]
    pub node_definition_id: String,
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub read_only: bool,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// A class of virtual device, from `simplified_node_definitions`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NodeDefinition {
    pub id: String,
    #[serde(default, deserialize_with = "null_default")]
    pub image_definitions: Vec<String>,
    #[serde(default)]
    pub ui: NodeDefinitionUi,
    #[serde(default)]
    pub device: NodeDefinitionDevice,
    #[serde(default)]
    pub sim: NodeDefinitionSim,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NodeDefinitionUi {
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub visible: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NodeDefinitionDevice {
    #[serde(default)]
    pub interfaces: NodeDefinitionInterfaces,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NodeDefinitionInterfaces {
    #[serde(default)]
    pub serial_ports: u32,
    #[serde(default)]
    pub default_count: u32,
    #[serde(default, deserialize_with = "null_default")]
    pub physical: Vec<String>,
    #[serde(default)]
    pub has_loopback_zero: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NodeDefinitionSim {
    #[serde(default)]
    pub console: bool,
    #[serde(default)]
    pub vnc: bool,
}

impl NodeDefinition {
    pub fn has_vnc(&self) -> bool {
        self.sim.vnc
    }

    pub fn serial_ports(&self) -> u32 {
        self.device.interfaces.serial_ports
    }

    pub fn default_interface_count(&self) -> u32 {
        self.device.interfaces.default_count
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn capability_flags() {
        let def: NodeDefinition = serde_json::from_value(json!({
            "id": "iosv",
            "image_definitions": ["iosv-159-3"],
            "ui": { "label": "IOSv", "visible": true, "icon": "router" },
            "device": { "interfaces": { "serial_ports": 1, "default_count": 4 } },
            "sim": { "console": true, "vnc": false },
            "schema_version": "0.0.1"
        }))
        .expect("definition");
        assert_eq!(def.serial_ports(), 1);
        assert_eq!(def.default_interface_count(), 4);
        assert!(!def.has_vnc());
        assert!(def.extra.contains_key("schema_version"));
    }
}
