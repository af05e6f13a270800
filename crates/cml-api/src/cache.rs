// In-memory lab cache
//
// Maps lab id to `Lab`. Reads hand out clones under a shared lock; writes
// apply the reconcile rules under an exclusive lock. The lock is never
// held across network I/O: callers fetch first, then merge here.

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use tracing::trace;

use crate::models::{Interface, Lab, Link, Node};

#[derive(Debug, Default)]
pub(crate) struct LabCache {
    labs: RwLock<HashMap<String, Lab>>,
}

impl LabCache {
    fn read(&self) -> RwLockReadGuard<'_, HashMap<String, Lab>> {
        self.labs.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<String, Lab>> {
        self.labs.write().unwrap_or_else(PoisonError::into_inner)
    }

    // ── Labs ─────────────────────────────────────────────────────────

    pub(crate) fn lab(&self, id: &str) -> Option<Lab> {
        let lab = self.read().get(id).cloned();
        trace!(lab = id, hit = lab.is_some(), "lab cache lookup");
        lab
    }

    /// Merge a fetched lab and return the cached result.
    ///
    /// An unseen shallow lab is cached with an empty node map.
    pub(crate) fn upsert_lab(&self, mut fetched: Lab, deep: bool) -> Lab {
        let mut labs = self.write();
        if let Some(existing) = labs.get_mut(&fetched.id) {
            existing.reconcile(fetched, deep);
            return existing.clone();
        }
        if !deep {
            fetched.nodes.clear();
            fetched.links.clear();
        }
        labs.insert(fetched.id.clone(), fetched.clone());
        fetched
    }

    pub(crate) fn remove_lab(&self, id: &str) {
        self.write().remove(id);
    }

    // ── Nodes ────────────────────────────────────────────────────────

    pub(crate) fn node(&self, lab_id: &str, node_id: &str) -> Option<Node> {
        self.read()
            .get(lab_id)
            .and_then(|lab| lab.nodes.get(node_id))
            .cloned()
    }

    pub(crate) fn node_by_label(&self, lab_id: &str, label: &str) -> Option<Node> {
        self.read()
            .get(lab_id)
            .and_then(|lab| lab.node_by_label(label))
            .cloned()
    }

    /// Merge a fetched node. Returns the cached node when the lab is
    /// cached, otherwise `fetched` unchanged.
    pub(crate) fn upsert_node(&self, fetched: Node) -> Node {
        let mut labs = self.write();
        let Some(lab) = labs.get_mut(&fetched.lab_id) else {
            return fetched;
        };
        match lab.nodes.get_mut(&fetched.id) {
            Some(existing) => {
                existing.reconcile(&fetched);
                if existing.interfaces.is_empty() {
                    existing.interfaces.clone_from(&fetched.interfaces);
                }
                existing.clone()
            }
            None => {
                lab.nodes.insert(fetched.id.clone(), fetched.clone());
                fetched
            }
        }
    }

    /// Drop a node and every link touching it.
    pub(crate) fn remove_node(&self, lab_id: &str, node_id: &str) {
        let mut labs = self.write();
        if let Some(lab) = labs.get_mut(lab_id) {
            lab.nodes.remove(node_id);
            lab.links
                .retain(|l| l.node_a != node_id && l.node_b != node_id);
        }
    }

    // ── Interfaces ───────────────────────────────────────────────────

    /// Append an unseen interface to its cached node. Known interfaces
    /// are immutable and left alone.
    pub(crate) fn upsert_interface(&self, iface: &Interface) {
        let mut labs = self.write();
        if let Some(node) = labs
            .get_mut(&iface.lab_id)
            .and_then(|lab| lab.nodes.get_mut(&iface.node))
        {
            node.upsert_interface(iface.clone());
        }
    }

    // ── Links ────────────────────────────────────────────────────────

    pub(crate) fn upsert_link(&self, link: &Link) {
        let mut labs = self.write();
        let Some(lab) = labs.get_mut(&link.lab_id) else {
            return;
        };
        set_connected(lab, &[&link.interface_a, &link.interface_b], true);
        match lab.links.iter_mut().find(|l| l.id == link.id) {
            Some(existing) => existing.clone_from(link),
            None => lab.links.push(link.clone()),
        }
    }

    /// Drop a link and mark its interfaces unconnected.
    pub(crate) fn remove_link(&self, lab_id: &str, link_id: &str) {
        let mut labs = self.write();
        let Some(lab) = labs.get_mut(lab_id) else {
            return;
        };
        let Some(pos) = lab.links.iter().position(|l| l.id == link_id) else {
            return;
        };
        let link = lab.links.remove(pos);
        set_connected(lab, &[&link.interface_a, &link.interface_b], false);
    }
}

fn set_connected(lab: &mut Lab, ids: &[&str], connected: bool) {
    for iface in lab
        .nodes
        .values_mut()
        .flat_map(|n| n.interfaces.iter_mut())
        .filter(|i| ids.contains(&i.id.as_str()))
    {
        iface.is_connected = connected;
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::models::State;

    fn lab(id: &str) -> Lab {
        Lab {
            id: id.into(),
            title: "core".into(),
            ..Lab::default()
        }
    }

    fn node(id: &str, state: State, cpus: u32) -> Node {
        Node {
            id: id.into(),
            lab_id: "L".into(),
            label: id.to_uppercase(),
            state,
            cpus: Some(cpus),
            ..Node::default()
        }
    }

    fn iface(id: &str, node: &str, slot: u32) -> Interface {
        Interface {
            id: id.into(),
            lab_id: "L".into(),
            node: node.into(),
            slot,
            ..Interface::default()
        }
    }

    #[test]
    fn shallow_insert_starts_with_empty_nodes() {
        let cache = LabCache::default();
        let mut fetched = lab("L");
        fetched.nodes.insert("n0".into(), node("n0", State::Defined, 1));
        let cached = cache.upsert_lab(fetched, false);
        assert!(cached.nodes.is_empty());
    }

    #[test]
    fn shallow_refetch_keeps_cached_nodes() {
        let cache = LabCache::default();
        cache.upsert_lab(lab("L"), false);
        cache.upsert_node(node("n0", State::Defined, 1));

        let mut renamed = lab("L");
        renamed.title = "edge".into();
        let cached = cache.upsert_lab(renamed, false);
        assert_eq!(cached.title, "edge");
        assert!(cached.nodes.contains_key("n0"));
    }

    #[test]
    fn node_reconcile_respects_vm_state() {
        let cache = LabCache::default();
        cache.upsert_lab(lab("L"), false);
        cache.upsert_node(node("n0", State::Booted, 1));
        let merged = cache.upsert_node(node("n0", State::Booted, 8));
        assert_eq!(merged.cpus, Some(1));

        cache.upsert_node(node("n1", State::Defined, 1));
        let merged = cache.upsert_node(node("n1", State::Defined, 8));
        assert_eq!(merged.cpus, Some(8));
    }

    #[test]
    fn node_without_cached_lab_is_not_stored() {
        let cache = LabCache::default();
        cache.upsert_node(node("n0", State::Defined, 1));
        assert!(cache.node("L", "n0").is_none());
    }

    #[test]
    fn interfaces_are_appended_in_slot_order() {
        let cache = LabCache::default();
        cache.upsert_lab(lab("L"), false);
        cache.upsert_node(node("n0", State::Defined, 1));
        cache.upsert_interface(&iface("i2", "n0", 2));
        cache.upsert_interface(&iface("i0", "n0", 0));
        let slots: Vec<_> = cache
            .node("L", "n0")
            .expect("cached node")
            .interfaces
            .iter()
            .map(|i| i.slot)
            .collect();
        assert_eq!(slots, [0, 2]);
    }

    #[test]
    fn removing_a_node_drops_dangling_links() {
        let cache = LabCache::default();
        cache.upsert_lab(lab("L"), false);
        cache.upsert_node(node("a", State::Defined, 1));
        cache.upsert_node(node("b", State::Defined, 1));
        cache.upsert_link(&Link {
            id: "l0".into(),
            lab_id: "L".into(),
            interface_a: "ia".into(),
            interface_b: "ib".into(),
            node_a: "a".into(),
            node_b: "b".into(),
            ..Link::default()
        });

        cache.remove_node("L", "a");
        let cached = cache.lab("L").expect("lab");
        assert!(cached.links.is_empty());
        assert!(cached.nodes.contains_key("b"));
    }

    #[test]
    fn removing_a_link_frees_its_interfaces() {
        let cache = LabCache::default();
        cache.upsert_lab(lab("L"), false);
        cache.upsert_node(node("a", State::Defined, 1));
        cache.upsert_interface(&iface("ia", "a", 0));
        cache.upsert_link(&Link {
            id: "l0".into(),
            lab_id: "L".into(),
            interface_a: "ia".into(),
            interface_b: "ib".into(),
            ..Link::default()
        });
        assert!(cache.lab("L").expect("lab").interface("ia").expect("ia").is_connected);

        cache.remove_link("L", "l0");
        assert!(!cache.lab("L").expect("lab").interface("ia").expect("ia").is_connected);
    }
}
