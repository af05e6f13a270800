//! Node command handlers.

use tabled::Tabled;
use tabled::settings::Style;

use cml_api::models::{Interface, Node};
use cml_api::{CancellationToken, Client};

use crate::cli::{GlobalOpts, NodesArgs, NodesCommand};
use crate::error::CliError;
use crate::output;

use super::util;

// ── Table rows ──────────────────────────────────────────────────────

#[derive(Tabled)]
struct NodeRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Label")]
    label: String,
    #[tabled(rename = "Definition")]
    definition: String,
    #[tabled(rename = "State")]
    state: String,
    #[tabled(rename = "CPUs")]
    cpus: String,
    #[tabled(rename = "RAM")]
    ram: String,
}

impl From<&Node> for NodeRow {
    fn from(n: &Node) -> Self {
        Self {
            id: n.id.clone(),
            label: n.label.clone(),
            definition: n.node_definition.clone(),
            state: n.state.to_string(),
            cpus: util::or_dash(n.cpus),
            ram: util::or_dash(n.ram),
        }
    }
}

#[derive(Tabled)]
struct InterfaceRow {
    #[tabled(rename = "Slot")]
    slot: u32,
    #[tabled(rename = "Label")]
    label: String,
    #[tabled(rename = "Connected")]
    connected: bool,
    #[tabled(rename = "MAC")]
    mac: String,
    #[tabled(rename = "IPv4")]
    ip4: String,
}

impl From<&Interface> for InterfaceRow {
    fn from(i: &Interface) -> Self {
        Self {
            slot: i.slot,
            label: i.label.clone(),
            connected: i.is_connected,
            mac: util::or_dash(i.mac_address.as_deref()),
            ip4: i.ip4.join(", "),
        }
    }
}

/// Node table, shared with the lab detail view.
pub fn table(nodes: &[Node]) -> String {
    let rows: Vec<NodeRow> = nodes.iter().map(NodeRow::from).collect();
    tabled::Table::new(rows).with(Style::rounded()).to_string()
}

fn detail(node: &Node, color: bool) -> String {
    let mut out = output::detail(&[
        ("ID", node.id.clone()),
        ("Label", node.label.clone()),
        ("Definition", node.node_definition.clone()),
        ("Image", util::or_dash(node.image_definition.as_deref())),
        ("State", output::state(node.state, color)),
        ("CPUs", util::or_dash(node.cpus)),
        ("RAM", util::or_dash(node.ram)),
        ("Position", format!("{}, {}", node.x, node.y)),
        ("Tags", node.tags.join(", ")),
    ]);
    if !node.interfaces.is_empty() {
        let rows: Vec<InterfaceRow> = node.interfaces.iter().map(InterfaceRow::from).collect();
        out.push_str("\n\n");
        out.push_str(&tabled::Table::new(rows).with(Style::rounded()).to_string());
    }
    out
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(
    client: &Client,
    cancel: &CancellationToken,
    args: NodesArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    match args.command {
        NodesCommand::List { lab } => {
            let lab = util::resolve_lab(client, cancel, &lab, false).await?;
            let mut nodes = client.nodes_for_lab(cancel, &lab.id).await?;
            nodes.sort_by(|a, b| a.label.cmp(&b.label));
            let out = output::render_list(
                global.output,
                &nodes,
                |n| NodeRow::from(n),
                |n| n.id.clone(),
            );
            output::print_output(&out, global.quiet);
            Ok(())
        }

        NodesCommand::Show { lab, node } => {
            let lab = util::resolve_lab(client, cancel, &lab, false).await?;
            let mut node = util::resolve_node(client, cancel, &lab.id, &node).await?;
            if node.interfaces.is_empty() {
                node.interfaces = client.interfaces_for_node(cancel, &lab.id, &node.id).await?;
            }
            let color = output::should_color(global.color);
            let out = output::render_single(
                global.output,
                &node,
                |n| detail(n, color),
                |n| n.id.clone(),
            );
            output::print_output(&out, global.quiet);
            Ok(())
        }
    }
}
