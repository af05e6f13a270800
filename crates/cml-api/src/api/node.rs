// Node endpoints
//
// The create POST only takes a minimal body, so creation is a POST
// followed by a PATCH. PATCH answers with a bare id, so updates refetch.

use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::client::Client;
use crate::error::Error;
use crate::models::node::{NodeConfigPatch, NodeCreate, NodePatch};
use crate::models::{IdResponse, Node};

impl Client {
    /// All nodes of a lab with their data inlined, without interfaces.
    ///
    /// `GET labs/{lab}/nodes?data=true`
    pub async fn nodes_for_lab(
        &self,
        cancel: &CancellationToken,
        lab_id: &str,
    ) -> Result<Vec<Node>, Error> {
        let mut nodes: Vec<Node> = self
            .get(cancel, &format!("labs/{lab_id}/nodes?data=true"))
            .await?;
        for node in &mut nodes {
            lab_id.clone_into(&mut node.lab_id);
        }
        Ok(nodes)
    }

    /// Fetch a node.
    ///
    /// Served from the cache unless `nocache` is set or the node is not
    /// cached. A fetched node is reconciled into a cached lab.
    pub async fn node_get(
        &self,
        cancel: &CancellationToken,
        lab_id: &str,
        id: &str,
        nocache: bool,
    ) -> Result<Node, Error> {
        if !nocache {
            if let Some(node) = self.cache().and_then(|c| c.node(lab_id, id)) {
                return Ok(node);
            }
        }
        let mut node: Node = self
            .get(cancel, &format!("labs/{lab_id}/nodes/{id}"))
            .await?;
        lab_id.clone_into(&mut node.lab_id);
        Ok(match self.cache() {
            Some(cache) => cache.upsert_node(node),
            None => node,
        })
    }

    /// Find a node by label.
    ///
    /// Checks the cache first, then lists the lab's nodes.
    pub async fn node_by_label(
        &self,
        cancel: &CancellationToken,
        lab_id: &str,
        label: &str,
    ) -> Result<Node, Error> {
        if let Some(node) = self.cache().and_then(|c| c.node_by_label(lab_id, label)) {
            return Ok(node);
        }
        let node = self
            .nodes_for_lab(cancel, lab_id)
            .await?
            .into_iter()
            .find(|n| n.label == label)
            .ok_or_else(|| Error::not_found("node", label))?;
        Ok(match self.cache() {
            Some(cache) => cache.upsert_node(node),
            None => node,
        })
    }

    /// Create a node with its default interfaces.
    ///
    /// `POST labs/{lab}/nodes?populate_interfaces=true` with the minimal
    /// body, then `PATCH` for the rest. A failed PATCH deletes the
    /// half-created node before the error is returned.
    pub async fn node_create(&self, cancel: &CancellationToken, node: &Node) -> Result<Node, Error> {
        let lab_id = &node.lab_id;
        debug!(lab = %lab_id, label = %node.label, "creating node");

        let minimal = NodeCreate {
            label: &node.label,
            node_definition: &node.node_definition,
            x: node.x,
            y: node.y,
        };
        let created: IdResponse = self
            .post(
                cancel,
                &format!("labs/{lab_id}/nodes?populate_interfaces=true"),
                Some(&minimal),
            )
            .await?;
        let path = format!("labs/{lab_id}/nodes/{}", created.id);

        let patched = self
            .patch::<String, _>(cancel, &path, &NodePatch::from_node(node))
            .await;
        if let Err(err) = patched {
            // The cleanup must still go out when `cancel` is what failed the PATCH.
            let cleanup_token = CancellationToken::new();
            if let Err(cleanup) = self.delete(&cleanup_token, &path).await {
                warn!(node = %created.id, error = %cleanup, "failed to remove partially created node");
            }
            return Err(err);
        }

        self.node_get(cancel, lab_id, &created.id, true).await
    }

    /// Push label, position and tags; the VM shape only while the node
    /// is still `DEFINED_ON_CORE`.
    ///
    /// `PATCH labs/{lab}/nodes/{id}`, then a fresh `node_get`.
    pub async fn node_update(&self, cancel: &CancellationToken, node: &Node) -> Result<Node, Error> {
        debug!(lab = %node.lab_id, id = %node.id, "updating node");
        let id: String = self
            .patch(
                cancel,
                &format!("labs/{}/nodes/{}", node.lab_id, node.id),
                &NodePatch::mutable_only(node),
            )
            .await?;
        self.node_get(cancel, &node.lab_id, &id, true).await
    }

    /// Replace a node's day-0 configuration.
    pub async fn node_set_config(
        &self,
        cancel: &CancellationToken,
        lab_id: &str,
        id: &str,
        configuration: &str,
    ) -> Result<Node, Error> {
        debug!(lab = lab_id, id, "setting node configuration");
        let id: String = self
            .patch(
                cancel,
                &format!("labs/{lab_id}/nodes/{id}"),
                &NodeConfigPatch { configuration },
            )
            .await?;
        self.node_get(cancel, lab_id, &id, true).await
    }

    /// `PUT labs/{lab}/nodes/{id}/state/start`
    pub async fn node_start(
        &self,
        cancel: &CancellationToken,
        lab_id: &str,
        id: &str,
    ) -> Result<(), Error> {
        self.put(cancel, &format!("labs/{lab_id}/nodes/{id}/state/start"))
            .await
    }

    /// `PUT labs/{lab}/nodes/{id}/state/stop`
    pub async fn node_stop(
        &self,
        cancel: &CancellationToken,
        lab_id: &str,
        id: &str,
    ) -> Result<(), Error> {
        self.put(cancel, &format!("labs/{lab_id}/nodes/{id}/state/stop"))
            .await
    }

    /// Destroy the node's VM disks. The node must be stopped.
    ///
    /// `PUT labs/{lab}/nodes/{id}/wipe_disks`
    pub async fn node_wipe(
        &self,
        cancel: &CancellationToken,
        lab_id: &str,
        id: &str,
    ) -> Result<(), Error> {
        self.put(cancel, &format!("labs/{lab_id}/nodes/{id}/wipe_disks"))
            .await
    }

    /// Delete a node, dropping it and its links from the cache.
    ///
    /// `DELETE labs/{lab}/nodes/{id}`
    pub async fn node_destroy(
        &self,
        cancel: &CancellationToken,
        lab_id: &str,
        id: &str,
    ) -> Result<(), Error> {
        debug!(lab = lab_id, id, "deleting node");
        self.delete(cancel, &format!("labs/{lab_id}/nodes/{id}"))
            .await?;
        if let Some(cache) = self.cache() {
            cache.remove_node(lab_id, id);
        }
        Ok(())
    }
}
