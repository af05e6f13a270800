//! Group command handlers.

use tabled::Tabled;

use cml_api::models::Group;
use cml_api::{CancellationToken, Client};

use crate::cli::{GlobalOpts, GroupsArgs, GroupsCommand};
use crate::error::CliError;
use crate::output;

#[derive(Tabled)]
struct GroupRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Members")]
    members: usize,
    #[tabled(rename = "Labs")]
    labs: usize,
    #[tabled(rename = "Description")]
    description: String,
}

impl From<&Group> for GroupRow {
    fn from(g: &Group) -> Self {
        Self {
            id: g.id.clone(),
            name: g.name.clone(),
            members: g.members.len(),
            labs: g.labs.len(),
            description: g.description.clone(),
        }
    }
}

pub async fn handle(
    client: &Client,
    cancel: &CancellationToken,
    args: GroupsArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    match args.command {
        GroupsCommand::List => {
            let mut groups = client.groups(cancel).await?;
            groups.sort_by(|a, b| a.name.cmp(&b.name));
            let out = output::render_list(
                global.output,
                &groups,
                |g| GroupRow::from(g),
                |g| g.name.clone(),
            );
            output::print_output(&out, global.quiet);
            Ok(())
        }
    }
}
