//! System command handlers.

use cml_api::{CancellationToken, Client, VERSION_CONSTRAINT};

use crate::cli::{GlobalOpts, SystemArgs, SystemCommand};
use crate::error::CliError;
use crate::output;

pub async fn handle(
    client: &Client,
    cancel: &CancellationToken,
    args: SystemArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    match args.command {
        SystemCommand::Info => {
            let info = client.system_information(cancel).await?;
            let supported = cml_api::version::check_version(&info.version).is_ok();
            let out = output::render_single(
                global.output,
                &info,
                |i| {
                    output::detail(&[
                        ("Controller", client.base_url().to_string()),
                        ("Version", i.version.clone()),
                        ("Ready", i.ready.to_string()),
                        ("Supported", format!("{supported} ({VERSION_CONSTRAINT})")),
                    ])
                },
                |i| i.version.clone(),
            );
            output::print_output(&out, global.quiet);
            Ok(())
        }
    }
}
