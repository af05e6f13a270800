// Lab endpoints
//
// CRUD, lifecycle, tiles and topology import. Shallow reads are served
// from the cache when enabled; deep reads always hit the server.

use bytes::Bytes;
use reqwest::Method;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::client::{Client, decode};
use crate::error::Error;
use crate::models::lab::{LabCreate, LabTiles};
use crate::models::{ImportResponse, Lab, LabTile};

impl Client {
    /// List lab ids visible to the current user.
    ///
    /// `GET labs` (admins may pass `show_all` to include everyone's labs).
    pub async fn labs(
        &self,
        cancel: &CancellationToken,
        show_all: bool,
    ) -> Result<Vec<String>, Error> {
        let path = if show_all { "labs?show_all=true" } else { "labs" };
        self.get(cancel, path).await
    }

    /// Lab summaries, ordered by id.
    ///
    /// `GET populate_lab_tiles`
    pub async fn lab_tiles(&self, cancel: &CancellationToken) -> Result<Vec<LabTile>, Error> {
        let tiles: LabTiles = self.get(cancel, "populate_lab_tiles").await?;
        let mut tiles: Vec<LabTile> = tiles.lab_tiles.into_values().collect();
        tiles.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(tiles)
    }

    /// Fetch a lab.
    ///
    /// Shallow: the cached lab when present, otherwise `GET labs/{id}`.
    /// Deep: always refetches nodes, interfaces, links, layer-3 addresses
    /// and the owner (see the deep-fetch assembler).
    pub async fn lab_get(
        &self,
        cancel: &CancellationToken,
        id: &str,
        deep: bool,
    ) -> Result<Lab, Error> {
        if deep {
            let lab = self.fetch_lab_deep(cancel, id).await?;
            return Ok(match self.cache() {
                Some(cache) => cache.upsert_lab(lab, true),
                None => lab,
            });
        }

        if let Some(lab) = self.cache().and_then(|c| c.lab(id)) {
            return Ok(lab);
        }
        let lab: Lab = self.get(cancel, &format!("labs/{id}")).await?;
        Ok(self.cache_lab(lab))
    }

    /// Find a lab by title via the lab tiles, then fetch it.
    pub async fn lab_by_title(
        &self,
        cancel: &CancellationToken,
        title: &str,
        deep: bool,
    ) -> Result<Lab, Error> {
        let tiles = self.lab_tiles(cancel).await?;
        let tile = tiles
            .iter()
            .find(|t| t.title == title)
            .ok_or_else(|| Error::not_found("lab", title))?;
        self.lab_get(cancel, &tile.id, deep).await
    }

    /// Create an empty lab from title, description, notes and groups.
    ///
    /// `POST labs`
    pub async fn lab_create(&self, cancel: &CancellationToken, lab: &Lab) -> Result<Lab, Error> {
        debug!(title = %lab.title, "creating lab");
        let created: Lab = self
            .post(cancel, "labs", Some(&LabCreate::from_lab(lab)))
            .await?;
        Ok(self.cache_lab(created))
    }

    /// Update title, description, notes and groups.
    ///
    /// `PATCH labs/{id}`
    pub async fn lab_update(&self, cancel: &CancellationToken, lab: &Lab) -> Result<Lab, Error> {
        debug!(id = %lab.id, "updating lab");
        let updated: Lab = self
            .patch(cancel, &format!("labs/{}", lab.id), &LabCreate::from_lab(lab))
            .await?;
        Ok(self.cache_lab(updated))
    }

    /// Import a topology and return the fully materialized lab.
    ///
    /// `POST import` with the topology text as body, then a deep fetch.
    pub async fn lab_import(
        &self,
        cancel: &CancellationToken,
        topology: &str,
    ) -> Result<Lab, Error> {
        let body = Bytes::copy_from_slice(topology.as_bytes());
        let raw = self
            .send_raw(cancel, Method::POST, "import", Some(body))
            .await?;
        let imported: ImportResponse = decode(&raw)?;
        for warning in &imported.warnings {
            warn!(lab = %imported.id, %warning, "import warning");
        }
        debug!(lab = %imported.id, "imported lab");
        self.lab_get(cancel, &imported.id, true).await
    }

    /// Delete a lab. Its nodes, interfaces and links go with it.
    ///
    /// `DELETE labs/{id}`
    pub async fn lab_destroy(&self, cancel: &CancellationToken, id: &str) -> Result<(), Error> {
        debug!(id, "deleting lab");
        self.delete(cancel, &format!("labs/{id}")).await?;
        if let Some(cache) = self.cache() {
            cache.remove_lab(id);
        }
        Ok(())
    }

    /// `PUT labs/{id}/start`
    pub async fn lab_start(&self, cancel: &CancellationToken, id: &str) -> Result<(), Error> {
        debug!(id, "starting lab");
        self.put(cancel, &format!("labs/{id}/start")).await
    }

    /// `PUT labs/{id}/stop`
    pub async fn lab_stop(&self, cancel: &CancellationToken, id: &str) -> Result<(), Error> {
        debug!(id, "stopping lab");
        self.put(cancel, &format!("labs/{id}/stop")).await
    }

    /// Wipe all node disks. The lab must be stopped.
    ///
    /// `PUT labs/{id}/wipe`
    pub async fn lab_wipe(&self, cancel: &CancellationToken, id: &str) -> Result<(), Error> {
        debug!(id, "wiping lab");
        self.put(cancel, &format!("labs/{id}/wipe")).await
    }

    /// Whether every node in the lab has finished booting.
    ///
    /// `GET labs/{id}/check_if_converged`
    pub async fn lab_has_converged(
        &self,
        cancel: &CancellationToken,
        id: &str,
    ) -> Result<bool, Error> {
        self.get(cancel, &format!("labs/{id}/check_if_converged"))
            .await
    }

    fn cache_lab(&self, lab: Lab) -> Lab {
        match self.cache() {
            Some(cache) => cache.upsert_lab(lab, false),
            None => lab,
        }
    }
}
