// Interface endpoints
//
// Interfaces are immutable once created: a fetch of a known interface
// leaves the cached copy untouched.

use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::client::Client;
use crate::error::Error;
use crate::models::Interface;
use crate::models::interface::{InterfaceCreate, sort_by_slot};

impl Client {
    /// Interfaces of one node, ordered by slot.
    ///
    /// `GET labs/{lab}/nodes/{node}/interfaces?data=true`
    pub async fn interfaces_for_node(
        &self,
        cancel: &CancellationToken,
        lab_id: &str,
        node_id: &str,
    ) -> Result<Vec<Interface>, Error> {
        let interfaces = self.fetch_interfaces(cancel, lab_id, node_id).await?;
        if let Some(cache) = self.cache() {
            for iface in &interfaces {
                cache.upsert_interface(iface);
            }
        }
        Ok(interfaces)
    }

    /// Fetch an interface, from the cache when the lab holds it.
    ///
    /// `GET labs/{lab}/interfaces/{id}`
    pub async fn interface_get(
        &self,
        cancel: &CancellationToken,
        lab_id: &str,
        id: &str,
    ) -> Result<Interface, Error> {
        let cached = self
            .cache()
            .and_then(|c| c.lab(lab_id))
            .and_then(|lab| lab.interface(id).cloned());
        if let Some(iface) = cached {
            return Ok(iface);
        }

        let mut iface: Interface = self
            .get(cancel, &format!("labs/{lab_id}/interfaces/{id}"))
            .await?;
        lab_id.clone_into(&mut iface.lab_id);
        if let Some(cache) = self.cache() {
            cache.upsert_interface(&iface);
        }
        Ok(iface)
    }

    /// Create an interface on a node.
    ///
    /// Without a slot the server picks the next free one and answers
    /// with a single interface. With a slot it back-fills every missing
    /// slot up to and including it and answers with the whole list; the
    /// last entry is the requested one and the others are cached.
    ///
    /// `POST labs/{lab}/interfaces`
    pub async fn interface_create(
        &self,
        cancel: &CancellationToken,
        lab_id: &str,
        node_id: &str,
        slot: Option<u32>,
    ) -> Result<Interface, Error> {
        debug!(lab = lab_id, node = node_id, ?slot, "creating interface");
        let path = format!("labs/{lab_id}/interfaces");
        let body = InterfaceCreate {
            node: node_id,
            slot,
        };

        let mut created: Vec<Interface> = if slot.is_some() {
            self.post(cancel, &path, Some(&body)).await?
        } else {
            vec![self.post(cancel, &path, Some(&body)).await?]
        };
        for iface in &mut created {
            lab_id.clone_into(&mut iface.lab_id);
        }
        sort_by_slot(&mut created);

        if let Some(cache) = self.cache() {
            for iface in &created {
                cache.upsert_interface(iface);
            }
        }
        created
            .pop()
            .ok_or_else(|| Error::not_found("interface", format!("{node_id} slot {slot:?}")))
    }

    /// Uncached interface listing shared with the deep-fetch assembler.
    pub(crate) async fn fetch_interfaces(
        &self,
        cancel: &CancellationToken,
        lab_id: &str,
        node_id: &str,
    ) -> Result<Vec<Interface>, Error> {
        let mut interfaces: Vec<Interface> = self
            .get(
                cancel,
                &format!("labs/{lab_id}/nodes/{node_id}/interfaces?data=true"),
            )
            .await?;
        for iface in &mut interfaces {
            lab_id.clone_into(&mut iface.lab_id);
            if iface.node.is_empty() {
                node_id.clone_into(&mut iface.node);
            }
        }
        sort_by_slot(&mut interfaces);
        Ok(interfaces)
    }
}
