use std::collections::{BTreeMap, HashMap};

use serde::ser::SerializeSeq;
use serde::{Deserialize, Serialize, Serializer};

use super::link::Link;
use super::node::Node;
use super::user::User;
use super::{State, null_default};

/// A virtual network topology.
///
/// `nodes` is keyed by node id and every node's `lab_id` equals `id`.
/// Serialized, `nodes` becomes an array ordered by node id and `links`
/// an array ordered by link id.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(from = "LabWire")]
pub struct Lab {
    pub id: String,
    pub state: State,
    pub created: String,
    pub modified: String,
    #[serde(rename = "lab_title")]
    pub title: String,
    #[serde(rename = "lab_description")]
    pub description: String,
    #[serde(rename = "lab_notes")]
    pub notes: String,
    /// Only the id is set unless the lab was deep-fetched.
    pub owner: User,
    pub node_count: u32,
    pub link_count: u32,
    #[serde(serialize_with = "nodes_by_id")]
    pub nodes: BTreeMap<String, Node>,
    #[serde(serialize_with = "links_by_id")]
    pub links: Vec<Link>,
    pub groups: Vec<LabGroup>,
}

/// A group's permission on a lab.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabGroup {
    pub id: String,
    #[serde(default)]
    pub name: String,
    pub permission: String,
}

impl Lab {
    /// Find a node by label.
    pub fn node_by_label(&self, label: &str) -> Option<&Node> {
        self.nodes.values().find(|n| n.label == label)
    }

    /// Find an interface anywhere in the lab.
    pub fn interface(&self, id: &str) -> Option<&crate::models::Interface> {
        self.nodes
            .values()
            .flat_map(|n| n.interfaces.iter())
            .find(|i| i.id == id)
    }

    /// Copy the mutable fields of a freshly fetched lab onto `self`.
    ///
    /// `deep` fetches also carry nodes, links and the resolved owner.
    pub(crate) fn reconcile(&mut self, fetched: Self, deep: bool) {
        self.title = fetched.title;
        self.description = fetched.description;
        self.notes = fetched.notes;
        self.state = fetched.state;
        self.modified = fetched.modified;
        self.node_count = fetched.node_count;
        self.link_count = fetched.link_count;
        self.groups = fetched.groups;
        if deep {
            self.nodes = fetched.nodes;
            self.links = fetched.links;
            self.owner = fetched.owner;
        }
    }
}

fn nodes_by_id<S: Serializer>(
    nodes: &BTreeMap<String, Node>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    let mut seq = serializer.serialize_seq(Some(nodes.len()))?;
    for node in nodes.values() {
        seq.serialize_element(node)?;
    }
    seq.end()
}

fn links_by_id<S: Serializer>(links: &[Link], serializer: S) -> Result<S::Ok, S::Error> {
    let mut sorted: Vec<&Link> = links.iter().collect();
    sorted.sort_by(|a, b| a.id.cmp(&b.id));
    serializer.collect_seq(sorted)
}

// ── Wire shape ───────────────────────────────────────────────────────

/// The server sends `owner` as a bare id; a serialized [`Lab`] carries the
/// full user. Both decode.
#[derive(Deserialize)]
#[serde(untagged)]
enum OwnerField {
    Id(String),
    User(User),
}

#[derive(Deserialize)]
struct LabWire {
    id: String,
    #[serde(default)]
    state: State,
    #[serde(default, deserialize_with = "null_default")]
    created: String,
    #[serde(default, deserialize_with = "null_default")]
    modified: String,
    #[serde(default, rename = "lab_title", alias = "title")]
    title: String,
    #[serde(default, rename = "lab_description", alias = "description")]
    description: String,
    #[serde(default, rename = "lab_notes", alias = "notes")]
    notes: String,
    #[serde(default)]
    owner: Option<OwnerField>,
    #[serde(default)]
    node_count: u32,
    #[serde(default)]
    link_count: u32,
    #[serde(default, deserialize_with = "null_default")]
    nodes: Vec<Node>,
    #[serde(default, deserialize_with = "null_default")]
    links: Vec<Link>,
    #[serde(default, deserialize_with = "null_default")]
    groups: Vec<LabGroup>,
}

impl From<LabWire> for Lab {
    fn from(w: LabWire) -> Self {
        let owner = match w.owner {
            Some(OwnerField::Id(id)) => User::reference(id),
            Some(OwnerField::User(user)) => user,
            None => User::default(),
        };
        Self {
            nodes: w.nodes.into_iter().map(|n| (n.id.clone(), n)).collect(),
            id: w.id,
            state: w.state,
            created: w.created,
            modified: w.modified,
            title: w.title,
            description: w.description,
            notes: w.notes,
            owner,
            node_count: w.node_count,
            link_count: w.link_count,
            links: w.links,
            groups: w.groups,
        }
    }
}

// ── Other lab payloads ───────────────────────────────────────────────

/// `POST labs` / `PATCH labs/{id}` body.
#[derive(Debug, Serialize)]
pub(crate) struct LabCreate<'a> {
    #[serde(skip_serializing_if = "str::is_empty")]
    pub title: &'a str,
    #[serde(skip_serializing_if = "str::is_empty")]
    pub description: &'a str,
    #[serde(skip_serializing_if = "str::is_empty")]
    pub notes: &'a str,
    #[serde(skip_serializing_if = "no_groups")]
    pub groups: &'a [LabGroup],
}

fn no_groups(groups: &&[LabGroup]) -> bool {
    groups.is_empty()
}

impl<'a> LabCreate<'a> {
    pub(crate) fn from_lab(lab: &'a Lab) -> Self {
        Self {
            title: &lab.title,
            description: &lab.description,
            notes: &lab.notes,
            groups: &lab.groups,
        }
    }
}

/// `POST import` response.
#[derive(Debug, Clone, Deserialize)]
pub struct ImportResponse {
    pub id: String,
    #[serde(default, deserialize_with = "null_default")]
    pub warnings: Vec<serde_json::Value>,
}

/// A summary entry from `populate_lab_tiles`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LabTile {
    pub id: String,
    #[serde(default)]
    pub state: State,
    #[serde(default, rename = "lab_title")]
    pub title: String,
    #[serde(default, rename = "lab_description")]
    pub description: String,
    #[serde(default)]
    pub owner: String,
    #[serde(default)]
    pub owner_username: Option<String>,
    #[serde(default)]
    pub node_count: u32,
    #[serde(default)]
    pub link_count: u32,
    #[serde(default, deserialize_with = "null_default")]
    pub created: String,
    #[serde(default, deserialize_with = "null_default")]
    pub modified: String,
}

/// `GET populate_lab_tiles` response.
#[derive(Debug, Deserialize)]
pub(crate) struct LabTiles {
    #[serde(default, deserialize_with = "null_default")]
    pub lab_tiles: HashMap<String, LabTile>,
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;

    fn wire_lab() -> serde_json::Value {
        json!({
            "id": "L",
            "state": "STOPPED",
            "created": "2024-01-01T00:00:00+00:00",
            "modified": "2024-01-02T00:00:00+00:00",
            "lab_title": "core",
            "lab_description": "",
            "lab_notes": "",
            "owner": "u-admin",
            "node_count": 2,
            "link_count": 1,
            "groups": [{ "id": "g1", "permission": "read_only" }]
        })
    }

    #[test]
    fn decodes_owner_as_reference() {
        let lab: Lab = serde_json::from_value(wire_lab()).expect("lab");
        assert_eq!(lab.owner.id, "u-admin");
        assert_eq!(lab.state, State::Stopped);
        assert!(lab.nodes.is_empty());
        assert_eq!(lab.groups[0].permission, "read_only");
    }

    #[test]
    fn serializes_nodes_and_links_sorted_by_id() {
        let mut lab: Lab = serde_json::from_value(wire_lab()).expect("lab");
        for id in ["n2", "n0", "n1"] {
            lab.nodes.insert(
                id.into(),
                Node {
                    id: id.into(),
                    lab_id: "L".into(),
                    ..Node::default()
                },
            );
        }
        for id in ["l1", "l0"] {
            lab.links.push(Link {
                id: id.into(),
                ..Link::default()
            });
        }

        let json = serde_json::to_value(&lab).expect("ser");
        let node_ids: Vec<_> = json["nodes"]
            .as_array()
            .expect("nodes array")
            .iter()
            .map(|n| n["id"].as_str().unwrap_or_default().to_owned())
            .collect();
        assert_eq!(node_ids, ["n0", "n1", "n2"]);
        let link_ids: Vec<_> = json["links"]
            .as_array()
            .expect("links array")
            .iter()
            .map(|l| l["id"].as_str().unwrap_or_default().to_owned())
            .collect();
        assert_eq!(link_ids, ["l0", "l1"]);
    }

    #[test]
    fn serialized_lab_decodes_again() {
        let mut lab: Lab = serde_json::from_value(wire_lab()).expect("lab");
        lab.owner.username = "admin".into();
        let back: Lab = serde_json::from_value(serde_json::to_value(&lab).expect("ser"))
            .expect("round trip");
        assert_eq!(back.owner.username, "admin");
        assert_eq!(back.title, "core");
    }
}
