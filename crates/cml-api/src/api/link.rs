// Link endpoints
//
// Links connect two interfaces. When a caller only names the nodes, the
// client picks a free physical interface on each side or creates one.

use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::client::Client;
use crate::error::Error;
use crate::models::link::LinkCreate;
use crate::models::{IdResponse, Interface, Link, LinkSpec};

impl Client {
    /// Link ids of a lab.
    ///
    /// `GET labs/{lab}/links`
    pub async fn links_for_lab(
        &self,
        cancel: &CancellationToken,
        lab_id: &str,
    ) -> Result<Vec<String>, Error> {
        self.get(cancel, &format!("labs/{lab_id}/links")).await
    }

    /// Fetch a link. `deep` also resolves both interfaces to fill in
    /// `slot_a`/`slot_b`.
    ///
    /// `GET labs/{lab}/links/{id}`
    pub async fn link_get(
        &self,
        cancel: &CancellationToken,
        lab_id: &str,
        id: &str,
        deep: bool,
    ) -> Result<Link, Error> {
        let mut link = self.fetch_link(cancel, lab_id, id).await?;
        if deep {
            let (a, b) = tokio::try_join!(
                self.interface_get(cancel, lab_id, &link.interface_a),
                self.interface_get(cancel, lab_id, &link.interface_b),
            )?;
            link.slot_a = Some(a.slot);
            link.slot_b = Some(b.slot);
            if link.node_a.is_empty() {
                link.node_a = a.node;
            }
            if link.node_b.is_empty() {
                link.node_b = b.node;
            }
        }
        if let Some(cache) = self.cache() {
            cache.upsert_link(&link);
        }
        Ok(link)
    }

    /// Create a link.
    ///
    /// Each endpoint is an interface id, or a node id with an optional
    /// slot. For a node, the first unconnected physical interface (at
    /// the requested slot, if any) is used; when none fits, a new
    /// interface is created. The link is then refetched with slots.
    ///
    /// `POST labs/{lab}/links`
    pub async fn link_create(
        &self,
        cancel: &CancellationToken,
        spec: &LinkSpec,
    ) -> Result<Link, Error> {
        let lab_id = &spec.lab_id;
        let src = self
            .resolve_endpoint(
                cancel,
                lab_id,
                Endpoint {
                    interface: spec.src_interface.as_deref(),
                    node: spec.src_node.as_deref(),
                    slot: spec.src_slot,
                },
                None,
            )
            .await?;
        let dst = self
            .resolve_endpoint(
                cancel,
                lab_id,
                Endpoint {
                    interface: spec.dst_interface.as_deref(),
                    node: spec.dst_node.as_deref(),
                    slot: spec.dst_slot,
                },
                Some(&src),
            )
            .await?;

        debug!(lab = %lab_id, %src, %dst, "creating link");
        let created: IdResponse = self
            .post(
                cancel,
                &format!("labs/{lab_id}/links"),
                Some(&LinkCreate {
                    src_int: &src,
                    dst_int: &dst,
                }),
            )
            .await?;
        self.link_get(cancel, lab_id, &created.id, true).await
    }

    /// Delete a link and free its interfaces in the cache.
    ///
    /// `DELETE labs/{lab}/links/{id}`
    pub async fn link_destroy(
        &self,
        cancel: &CancellationToken,
        lab_id: &str,
        id: &str,
    ) -> Result<(), Error> {
        debug!(lab = lab_id, id, "deleting link");
        self.delete(cancel, &format!("labs/{lab_id}/links/{id}"))
            .await?;
        if let Some(cache) = self.cache() {
            cache.remove_link(lab_id, id);
        }
        Ok(())
    }

    /// Uncached link fetch shared with the deep-fetch assembler.
    pub(crate) async fn fetch_link(
        &self,
        cancel: &CancellationToken,
        lab_id: &str,
        id: &str,
    ) -> Result<Link, Error> {
        let mut link: Link = self
            .get(cancel, &format!("labs/{lab_id}/links/{id}"))
            .await?;
        lab_id.clone_into(&mut link.lab_id);
        Ok(link)
    }

    /// Turn one side of a [`LinkSpec`] into an interface id. `taken` is
    /// the interface already chosen for the other side.
    async fn resolve_endpoint(
        &self,
        cancel: &CancellationToken,
        lab_id: &str,
        endpoint: Endpoint<'_>,
        taken: Option<&str>,
    ) -> Result<String, Error> {
        if let Some(id) = endpoint.interface {
            return Ok(id.to_owned());
        }
        let Some(node_id) = endpoint.node else {
            return Err(Error::not_found("link endpoint", "no interface or node given"));
        };

        let interfaces = self.interfaces_for_node(cancel, lab_id, node_id).await?;
        if let Some(iface) = pick_interface(&interfaces, endpoint.slot, taken) {
            return Ok(iface.id.clone());
        }
        let slot = mint_slot(&interfaces, endpoint.slot);
        let created = self
            .interface_create(cancel, lab_id, node_id, slot)
            .await?;
        Ok(created.id)
    }
}

#[derive(Debug, Clone, Copy)]
struct Endpoint<'a> {
    interface: Option<&'a str>,
    node: Option<&'a str>,
    slot: Option<u32>,
}

/// First unconnected physical interface, at `slot` when one is given.
fn pick_interface<'a>(
    interfaces: &'a [Interface],
    slot: Option<u32>,
    taken: Option<&str>,
) -> Option<&'a Interface> {
    interfaces.iter().find(|i| {
        i.is_physical()
            && !i.is_connected
            && taken != Some(i.id.as_str())
            && slot.is_none_or(|s| i.slot == s)
    })
}

/// Slot to request for a new interface: the requested slot while it is
/// free, otherwise the one after the highest physical slot.
fn mint_slot(interfaces: &[Interface], requested: Option<u32>) -> Option<u32> {
    let requested = requested?;
    let physical = interfaces.iter().filter(|i| i.is_physical());
    if physical.clone().any(|i| i.slot == requested) {
        physical.map(|i| i.slot).max().map(|max| max + 1)
    } else {
        Some(requested)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::InterfaceType;

    fn iface(id: &str, slot: u32, connected: bool) -> Interface {
        Interface {
            id: id.into(),
            slot,
            is_connected: connected,
            ..Interface::default()
        }
    }

    #[test]
    fn picks_first_free_physical_interface() {
        let mut lo = iface("lo0", 0, false);
        lo.iface_type = InterfaceType::Loopback;
        let list = [lo, iface("i0", 0, true), iface("i1", 1, false), iface("i2", 2, false)];
        assert_eq!(pick_interface(&list, None, None).map(|i| i.id.as_str()), Some("i1"));
        assert_eq!(pick_interface(&list, Some(2), None).map(|i| i.id.as_str()), Some("i2"));
        assert!(pick_interface(&list, Some(0), None).is_none());
    }

    #[test]
    fn skips_interface_taken_by_other_side() {
        let list = [iface("i0", 0, false), iface("i1", 1, false)];
        assert_eq!(
            pick_interface(&list, None, Some("i0")).map(|i| i.id.as_str()),
            Some("i1")
        );
    }

    #[test]
    fn mints_requested_slot_when_free() {
        let list = [iface("i0", 0, true)];
        assert_eq!(mint_slot(&list, Some(3)), Some(3));
    }

    #[test]
    fn mints_after_highest_slot_when_requested_is_occupied() {
        let list = [iface("i0", 0, true), iface("i1", 1, true)];
        assert_eq!(mint_slot(&list, Some(0)), Some(2));
        assert_eq!(mint_slot(&list, None), None);
    }
}
