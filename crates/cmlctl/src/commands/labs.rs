//! Lab command handlers.

use tabled::Tabled;

use cml_api::models::{Lab, LabTile};
use cml_api::{CancellationToken, Client};

use crate::cli::{GlobalOpts, LabsArgs, LabsCommand};
use crate::error::CliError;
use crate::output;

use super::{nodes, util};

// ── Table row ───────────────────────────────────────────────────────

#[derive(Tabled)]
struct LabRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Title")]
    title: String,
    #[tabled(rename = "State")]
    state: String,
    #[tabled(rename = "Owner")]
    owner: String,
    #[tabled(rename = "Nodes")]
    nodes: u32,
    #[tabled(rename = "Links")]
    links: u32,
}

impl From<&LabTile> for LabRow {
    fn from(t: &LabTile) -> Self {
        Self {
            id: t.id.clone(),
            title: t.title.clone(),
            state: t.state.to_string(),
            owner: t.owner_username.clone().unwrap_or_else(|| t.owner.clone()),
            nodes: t.node_count,
            links: t.link_count,
        }
    }
}

/// Summary of a lab that the tiles did not cover.
fn tile_of(lab: &Lab) -> LabTile {
    LabTile {
        id: lab.id.clone(),
        state: lab.state,
        title: lab.title.clone(),
        description: lab.description.clone(),
        owner: lab.owner.id.clone(),
        owner_username: Some(lab.owner.username.clone()).filter(|u| !u.is_empty()),
        node_count: lab.node_count,
        link_count: lab.link_count,
        created: lab.created.clone(),
        modified: lab.modified.clone(),
    }
}

fn detail(lab: &Lab, color: bool) -> String {
    let owner = if lab.owner.username.is_empty() {
        lab.owner.id.clone()
    } else {
        lab.owner.username.clone()
    };
    let mut out = output::detail(&[
        ("ID", lab.id.clone()),
        ("Title", lab.title.clone()),
        ("State", output::state(lab.state, color)),
        ("Owner", owner),
        ("Description", lab.description.clone()),
        ("Nodes", lab.node_count.to_string()),
        ("Links", lab.link_count.to_string()),
        ("Created", lab.created.clone()),
        ("Modified", lab.modified.clone()),
    ]);
    if !lab.nodes.is_empty() {
        let nodes: Vec<_> = lab.nodes.values().cloned().collect();
        out.push_str("\n\n");
        out.push_str(&nodes::table(&nodes));
    }
    out
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(
    client: &Client,
    cancel: &CancellationToken,
    args: LabsArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let color = output::should_color(global.color);
    match args.command {
        LabsCommand::List { all } => {
            let mut tiles = client.lab_tiles(cancel).await?;
            if all {
                // Tiles only list the caller's labs.
                for id in client.labs(cancel, true).await? {
                    if tiles.iter().all(|t| t.id != id) {
                        tiles.push(tile_of(&client.lab_get(cancel, &id, false).await?));
                    }
                }
                tiles.sort_by(|a, b| a.id.cmp(&b.id));
            }
            let out = output::render_list(
                global.output,
                &tiles,
                |t| LabRow::from(t),
                |t| t.id.clone(),
            );
            output::print_output(&out, global.quiet);
            Ok(())
        }

        LabsCommand::Show { lab, deep } => {
            let lab = util::resolve_lab(client, cancel, &lab, deep).await?;
            let out = output::render_single(
                global.output,
                &lab,
                |l| detail(l, color),
                |l| l.id.clone(),
            );
            output::print_output(&out, global.quiet);
            Ok(())
        }

        LabsCommand::Import { file } => {
            let topology = std::fs::read_to_string(&file)?;
            let lab = client.lab_import(cancel, &topology).await?;
            let out = output::render_single(
                global.output,
                &lab,
                |l| detail(l, color),
                |l| l.id.clone(),
            );
            output::print_output(&out, global.quiet);
            Ok(())
        }

        LabsCommand::Start { lab } => {
            let lab = util::resolve_lab(client, cancel, &lab, false).await?;
            client.lab_start(cancel, &lab.id).await?;
            done(global, "Lab started");
            Ok(())
        }

        LabsCommand::Stop { lab } => {
            let lab = util::resolve_lab(client, cancel, &lab, false).await?;
            client.lab_stop(cancel, &lab.id).await?;
            done(global, "Lab stopped");
            Ok(())
        }

        LabsCommand::Wipe { lab } => {
            let lab = util::resolve_lab(client, cancel, &lab, false).await?;
            client.lab_wipe(cancel, &lab.id).await?;
            done(global, "Lab wiped");
            Ok(())
        }

        LabsCommand::Delete { lab } => {
            let lab = util::resolve_lab(client, cancel, &lab, false).await?;
            client.lab_destroy(cancel, &lab.id).await?;
            done(global, "Lab deleted");
            Ok(())
        }
    }
}

fn done(global: &GlobalOpts, message: &str) {
    if !global.quiet {
        eprintln!("{message}");
    }
}
