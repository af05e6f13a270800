use tokio_util::sync::CancellationToken;
use tracing::debug;

use super::user::lookup_miss;
use crate::client::Client;
use crate::error::Error;
use crate::models::Group;

impl Client {
    /// List all groups.
    ///
    /// `GET groups`
    pub async fn groups(&self, cancel: &CancellationToken) -> Result<Vec<Group>, Error> {
        self.get(cancel, "groups").await
    }

    /// `GET groups/{id}`
    pub async fn group_get(&self, cancel: &CancellationToken, id: &str) -> Result<Group, Error> {
        self.get(cancel, &format!("groups/{id}")).await
    }

    /// Resolve a group name via `GET groups/{name}/id`.
    pub async fn group_by_name(
        &self,
        cancel: &CancellationToken,
        name: &str,
    ) -> Result<Group, Error> {
        let id: String = self
            .get(cancel, &format!("groups/{name}/id"))
            .await
            .map_err(|e| lookup_miss(e, "group", name))?;
        self.group_get(cancel, &id).await
    }

    /// `POST groups`
    pub async fn group_create(
        &self,
        cancel: &CancellationToken,
        group: &Group,
    ) -> Result<Group, Error> {
        debug!(name = %group.name, "creating group");
        self.post(cancel, "groups", Some(group)).await
    }

    /// `PATCH groups/{id}`
    pub async fn group_update(
        &self,
        cancel: &CancellationToken,
        group: &Group,
    ) -> Result<Group, Error> {
        debug!(id = %group.id, "updating group");
        self.patch(cancel, &format!("groups/{}", group.id), group)
            .await
    }

    /// `DELETE groups/{id}`
    pub async fn group_destroy(&self, cancel: &CancellationToken, id: &str) -> Result<(), Error> {
        debug!(id, "deleting group");
        self.delete(cancel, &format!("groups/{id}")).await
    }
}
