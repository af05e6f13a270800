//! Shared helpers for command handlers.

use cml_api::models::{Lab, Node};
use cml_api::{CancellationToken, Client};

use crate::error::CliError;

/// Whether `identifier` has the shape of a controller-issued UUID.
pub fn looks_like_id(identifier: &str) -> bool {
    identifier.len() == 36
        && identifier.char_indices().all(|(i, c)| match i {
            8 | 13 | 18 | 23 => c == '-',
            _ => c.is_ascii_hexdigit(),
        })
}

/// Resolve a lab by id or, failing the id shape, by title.
pub async fn resolve_lab(
    client: &Client,
    cancel: &CancellationToken,
    identifier: &str,
    deep: bool,
) -> Result<Lab, CliError> {
    if !looks_like_id(identifier) {
        return Ok(client.lab_by_title(cancel, identifier, deep).await?);
    }
    client
        .lab_get(cancel, identifier, deep)
        .await
        .map_err(|e| not_found_or(e, "lab", identifier, "labs list"))
}

/// Resolve a node of `lab_id` by id or label.
pub async fn resolve_node(
    client: &Client,
    cancel: &CancellationToken,
    lab_id: &str,
    identifier: &str,
) -> Result<Node, CliError> {
    if !looks_like_id(identifier) {
        return Ok(client.node_by_label(cancel, lab_id, identifier).await?);
    }
    client
        .node_get(cancel, lab_id, identifier, false)
        .await
        .map_err(|e| {
            not_found_or(e, "node", identifier, &format!("nodes list {lab_id}"))
        })
}

/// A 404 becomes a `NotFound` pointing at the list command.
fn not_found_or(err: cml_api::Error, kind: &str, identifier: &str, list_command: &str) -> CliError {
    if err.is_not_found() {
        CliError::not_found(kind, identifier, list_command)
    } else {
        err.into()
    }
}

/// Dash for empty or absent values in detail views.
pub fn or_dash(value: Option<impl ToString>) -> String {
    value.map_or_else(|| "-".into(), |v| v.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uuid_shape_is_recognized() {
        assert!(looks_like_id("90f84e38-a71c-4d57-8d90-00fa8a197385"));
        assert!(!looks_like_id("core lab"));
        assert!(!looks_like_id("90f84e38a71c4d578d9000fa8a197385"));
        assert!(!looks_like_id("90f84e38-a71c-4d57-8d90-00fa8a19738z"));
    }

    #[test]
    fn absent_values_render_as_dash() {
        assert_eq!(or_dash(None::<u32>), "-");
        assert_eq!(or_dash(Some(4)), "4");
    }
}
