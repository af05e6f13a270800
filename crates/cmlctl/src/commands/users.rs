//! User command handlers.

use tabled::Tabled;

use cml_api::models::User;
use cml_api::{CancellationToken, Client};

use crate::cli::{GlobalOpts, UsersArgs, UsersCommand};
use crate::error::CliError;
use crate::output;

#[derive(Tabled)]
struct UserRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Username")]
    username: String,
    #[tabled(rename = "Full name")]
    fullname: String,
    #[tabled(rename = "Admin")]
    admin: bool,
    #[tabled(rename = "Groups")]
    groups: usize,
}

impl From<&User> for UserRow {
    fn from(u: &User) -> Self {
        Self {
            id: u.id.clone(),
            username: u.username.clone(),
            fullname: u.fullname.clone(),
            admin: u.admin,
            groups: u.groups.len(),
        }
    }
}

pub async fn handle(
    client: &Client,
    cancel: &CancellationToken,
    args: UsersArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    match args.command {
        UsersCommand::List => {
            let mut users = client.users(cancel).await?;
            users.sort_by(|a, b| a.username.cmp(&b.username));
            let out = output::render_list(
                global.output,
                &users,
                |u| UserRow::from(u),
                |u| u.username.clone(),
            );
            output::print_output(&out, global.quiet);
            Ok(())
        }
    }
}
