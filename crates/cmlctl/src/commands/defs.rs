//! Node and image definition handlers.

use tabled::Tabled;

use cml_api::models::{ImageDefinition, NodeDefinition};
use cml_api::{CancellationToken, Client};

use crate::cli::{DefsArgs, DefsCommand, GlobalOpts};
use crate::error::CliError;
use crate::output;

#[derive(Tabled)]
struct ImageRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Node definition")]
    node_definition: String,
    #[tabled(rename = "Label")]
    label: String,
    #[tabled(rename = "Read-only")]
    read_only: bool,
}

impl From<&ImageDefinition> for ImageRow {
    fn from(d: &ImageDefinition) -> Self {
        Self {
            id: d.id.clone(),
            node_definition: d.node_definition_id.clone(),
            label: d.label.clone(),
            read_only: d.read_only,
        }
    }
}

#[derive(Tabled)]
struct NodeDefinitionRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Label")]
    label: String,
    #[tabled(rename = "Interfaces")]
    interfaces: u32,
    #[tabled(rename = "Images")]
    images: usize,
}

impl From<&NodeDefinition> for NodeDefinitionRow {
    fn from(d: &NodeDefinition) -> Self {
        Self {
            id: d.id.clone(),
            label: d.ui.label.clone(),
            interfaces: d.device.interfaces.default_count,
            images: d.image_definitions.len(),
        }
    }
}

pub async fn handle(
    client: &Client,
    cancel: &CancellationToken,
    args: DefsArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let out = match args.command {
        DefsCommand::Images => {
            let mut defs = client.image_definitions(cancel).await?;
            defs.sort_by(|a, b| a.id.cmp(&b.id));
            output::render_list(
                global.output,
                &defs,
                |d| ImageRow::from(d),
                |d| d.id.clone(),
            )
        }
        DefsCommand::Nodes => {
            let mut defs = client.node_definitions(cancel).await?;
            defs.sort_by(|a, b| a.id.cmp(&b.id));
            output::render_list(
                global.output,
                &defs,
                |d| NodeDefinitionRow::from(d),
                |d| d.id.clone(),
            )
        }
    };
    output::print_output(&out, global.quiet);
    Ok(())
}
