// User endpoints
//
// CRUD plus name→id lookup. Passwords are write-only and never come back.

use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::client::Client;
use crate::error::Error;
use crate::models::User;

impl Client {
    /// List all users.
    ///
    /// `GET users`
    pub async fn users(&self, cancel: &CancellationToken) -> Result<Vec<User>, Error> {
        self.get(cancel, "users").await
    }

    /// `GET users/{id}`
    pub async fn user_get(&self, cancel: &CancellationToken, id: &str) -> Result<User, Error> {
        self.get(cancel, &format!("users/{id}")).await
    }

    /// Resolve a username to a user.
    ///
    /// `GET users/{name}/id`, then `GET users/{id}`. A 404 on the lookup
    /// becomes [`Error::ElementNotFound`].
    pub async fn user_by_name(
        &self,
        cancel: &CancellationToken,
        username: &str,
    ) -> Result<User, Error> {
        let id: String = self
            .get(cancel, &format!("users/{username}/id"))
            .await
            .map_err(|e| lookup_miss(e, "user", username))?;
        self.user_get(cancel, &id).await
    }

    /// Create a user. `user.password` must be set.
    ///
    /// `POST users`
    pub async fn user_create(&self, cancel: &CancellationToken, user: &User) -> Result<User, Error> {
        debug!(username = %user.username, "creating user");
        self.post(cancel, "users", Some(user)).await
    }

    /// Update a user. The password is only sent when set.
    ///
    /// `PATCH users/{id}`
    pub async fn user_update(&self, cancel: &CancellationToken, user: &User) -> Result<User, Error> {
        debug!(id = %user.id, "updating user");
        self.patch(cancel, &format!("users/{}", user.id), user).await
    }

    /// `DELETE users/{id}`
    pub async fn user_destroy(&self, cancel: &CancellationToken, id: &str) -> Result<(), Error> {
        debug!(id, "deleting user");
        self.delete(cancel, &format!("users/{id}")).await
    }

    /// Ids of the groups a user belongs to.
    ///
    /// `GET users/{id}/groups`
    pub async fn user_groups(
        &self,
        cancel: &CancellationToken,
        id: &str,
    ) -> Result<Vec<String>, Error> {
        self.get(cancel, &format!("users/{id}/groups")).await
    }
}

/// Turn a 404 from a `{name}/id` lookup into `ElementNotFound`.
pub(super) fn lookup_miss(err: Error, kind: &'static str, key: &str) -> Error {
    match err {
        Error::ServerError { status: 404, .. } => Error::not_found(kind, key),
        other => other,
    }
}
