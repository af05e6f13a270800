// Deep-fetch assembler
//
// Materializes a lab with owner, nodes, interfaces, layer-3 addresses and
// links. Four tasks run under one scoped group:
//
//   1. owner          users/{owner}
//   2. nodes          labs/{lab}/nodes?data=true, then interfaces per node
//   3. layer 3        labs/{lab}/layer3_addresses, merged after (2)
//   4. links          labs/{lab}/links, fetched one by one after (2)
//
// Tasks 3 and 4 issue their first read alongside task 2 and wait on a
// oneshot signal before their merge step. A failing task cancels the
// group; the waiting tasks then surface `Cancelled`.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, MutexGuard, PoisonError};

use futures_util::future::try_join_all;
use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::client::{Client, cancellable};
use crate::error::Error;
use crate::models::{L3Node, Lab, Node};

type Nodes = BTreeMap<String, Node>;

impl Client {
    pub(crate) async fn fetch_lab_deep(
        &self,
        cancel: &CancellationToken,
        lab_id: &str,
    ) -> Result<Lab, Error> {
        let mut lab: Lab = self.get(cancel, &format!("labs/{lab_id}")).await?;
        let owner_id = lab.owner.id.clone();
        debug!(lab = lab_id, "deep fetch");

        let group = cancel.child_token();
        let nodes: Mutex<Nodes> = Mutex::new(BTreeMap::new());
        let (l3_ready, l3_wait) = oneshot::channel::<()>();
        let (links_ready, links_wait) = oneshot::channel::<()>();

        let owner_task = scoped(&group, async {
            if owner_id.is_empty() {
                return Ok(None);
            }
            self.user_get(&group, &owner_id).await.map(Some)
        });

        let node_task = scoped(&group, async {
            let fetched = self.fetch_nodes_with_interfaces(&group, lab_id).await?;
            *lock(&nodes) = fetched;
            // A receiver is only gone when its task already failed.
            l3_ready.send(()).ok();
            links_ready.send(()).ok();
            Ok(())
        });

        let l3_task = scoped(&group, async {
            let l3: HashMap<String, L3Node> = self
                .get(&group, &format!("labs/{lab_id}/layer3_addresses"))
                .await?;
            rendezvous(&group, l3_wait).await?;
            merge_layer3(&mut lock(&nodes), &l3);
            Ok(())
        });

        let link_task = scoped(&group, async {
            let ids: Vec<String> = self
                .get(&group, &format!("labs/{lab_id}/links"))
                .await?;
            rendezvous(&group, links_wait).await?;
            let mut links =
                try_join_all(ids.iter().map(|id| self.fetch_link(&group, lab_id, id))).await?;
            let slots = slot_index(&lock(&nodes));
            for link in &mut links {
                link.slot_a = slots.get(&link.interface_a).copied();
                link.slot_b = slots.get(&link.interface_b).copied();
            }
            Ok(links)
        });

        let (owner, (), (), links) = tokio::try_join!(owner_task, node_task, l3_task, link_task)?;

        if let Some(owner) = owner {
            lab.owner = owner;
        }
        lab.nodes = nodes.into_inner().unwrap_or_else(PoisonError::into_inner);
        lab.links = links;
        Ok(lab)
    }

    /// Nodes of a lab keyed by id, each with its slot-ordered interfaces.
    async fn fetch_nodes_with_interfaces(
        &self,
        cancel: &CancellationToken,
        lab_id: &str,
    ) -> Result<Nodes, Error> {
        let mut nodes = self.nodes_for_lab(cancel, lab_id).await?;
        let interfaces = try_join_all(
            nodes
                .iter()
                .map(|n| self.fetch_interfaces(cancel, lab_id, &n.id)),
        )
        .await?;
        for (node, ifaces) in nodes.iter_mut().zip(interfaces) {
            node.interfaces = ifaces;
        }
        Ok(nodes.into_iter().map(|n| (n.id.clone(), n)).collect())
    }
}

/// Cancel the whole group when one member fails.
async fn scoped<T>(
    group: &CancellationToken,
    task: impl Future<Output = Result<T, Error>>,
) -> Result<T, Error> {
    let result = task.await;
    if result.is_err() {
        group.cancel();
    }
    result
}

/// Wait for the node task. A dropped sender means it failed.
async fn rendezvous(group: &CancellationToken, signal: oneshot::Receiver<()>) -> Result<(), Error> {
    cancellable(group, signal)
        .await?
        .map_err(|_| Error::Cancelled)
}

fn lock(nodes: &Mutex<Nodes>) -> MutexGuard<'_, Nodes> {
    nodes.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Copy layer-3 addresses onto interfaces, joined by MAC address.
fn merge_layer3(nodes: &mut Nodes, l3: &HashMap<String, L3Node>) {
    for (node_id, node) in nodes.iter_mut() {
        let Some(entry) = l3.get(node_id) else {
            continue;
        };
        for iface in &mut node.interfaces {
            let Some(addrs) = iface
                .mac_address
                .as_deref()
                .and_then(|mac| entry.interfaces.get(mac))
            else {
                continue;
            };
            iface.ip4.clone_from(&addrs.ip4);
            iface.ip6.clone_from(&addrs.ip6);
        }
    }
}

fn slot_index(nodes: &Nodes) -> HashMap<String, u32> {
    nodes
        .values()
        .flat_map(|n| n.interfaces.iter())
        .map(|i| (i.id.clone(), i.slot))
        .collect()
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::models::Interface;

    #[test]
    fn layer3_join_uses_mac_address() {
        let mut nodes: Nodes = BTreeMap::new();
        nodes.insert(
            "n0".into(),
            Node {
                id: "n0".into(),
                interfaces: vec![
                    Interface {
                        id: "i0".into(),
                        mac_address: Some("52:54:00:00:00:00".into()),
                        ..Interface::default()
                    },
                    Interface {
                        id: "i1".into(),
                        mac_address: Some("52:54:00:00:00:01".into()),
                        ..Interface::default()
                    },
                ],
                ..Node::default()
            },
        );
        let l3: HashMap<String, L3Node> = serde_json::from_value(json!({
            "n0": {
                "name": "R1",
                "interfaces": {
                    "52:54:00:00:00:01": {
                        "id": "i1", "label": "eth1",
                        "ip4": ["10.0.0.1"], "ip6": ["fe80::1"]
                    }
                }
            }
        }))
        .expect("l3 map");

        merge_layer3(&mut nodes, &l3);
        let ifaces = &nodes["n0"].interfaces;
        assert!(ifaces[0].ip4.is_empty());
        assert_eq!(ifaces[1].ip4, ["10.0.0.1"]);
        assert_eq!(ifaces[1].ip6, ["fe80::1"]);
    }

    #[tokio::test]
    async fn dropped_signal_surfaces_cancelled() {
        let group = CancellationToken::new();
        let (tx, rx) = oneshot::channel::<()>();
        drop(tx);
        assert!(matches!(rendezvous(&group, rx).await, Err(Error::Cancelled)));
    }

    #[tokio::test]
    async fn failing_member_cancels_group() {
        let group = CancellationToken::new();
        let result: Result<(), Error> = scoped(&group, async { Err(Error::Unauthorized) }).await;
        assert!(result.is_err());
        assert!(group.is_cancelled());
    }
}
