//! Command dispatch: bridges CLI args to `cml_api::Client` calls and output formatting.

pub mod defs;
pub mod groups;
pub mod labs;
pub mod nodes;
pub mod system;
pub mod users;
pub mod util;

use cml_api::{CancellationToken, Client};

use crate::cli::{Command, GlobalOpts};
use crate::error::CliError;

/// Dispatch a controller-bound command to the appropriate handler.
pub async fn dispatch(
    cmd: Command,
    client: &Client,
    cancel: &CancellationToken,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    match cmd {
        Command::Labs(args) => labs::handle(client, cancel, args, global).await,
        Command::Nodes(args) => nodes::handle(client, cancel, args, global).await,
        Command::Users(args) => users::handle(client, cancel, args, global).await,
        Command::Groups(args) => groups::handle(client, cancel, args, global).await,
        Command::Defs(args) => defs::handle(client, cancel, args, global).await,
        Command::System(args) => system::handle(client, cancel, args, global).await,
        // Completions are handled before dispatch
        Command::Completions(_) => unreachable!(),
    }
}
