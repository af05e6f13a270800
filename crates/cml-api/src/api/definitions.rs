use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::client::Client;
use crate::error::Error;
use crate::models::{ImageDefinition, NodeDefinition};

impl Client {
    /// List all image definitions.
    ///
    /// `GET image_definitions`
    pub async fn image_definitions(
        &self,
        cancel: &CancellationToken,
    ) -> Result<Vec<ImageDefinition>, Error> {
        debug!("listing image definitions");
        self.get(cancel, "image_definitions").await
    }

    /// List all node definitions in their simplified form.
    ///
    /// `GET simplified_node_definitions`
    pub async fn node_definitions(
        &self,
        cancel: &CancellationToken,
    ) -> Result<Vec<NodeDefinition>, Error> {
        debug!("listing node definitions");
        self.get(cancel, "simplified_node_definitions").await
    }
}
