//! Command dispatch: bridges CLI args -> core client calls -> output formatting.

pub mod config_cmd;
pub mod devices;
pub mod raw;
pub mod snapshot;
pub mod watch;

use wiser_core::WiserClient;

use crate::cli::{Command, GlobalOpts};
use crate::error::CliError;

/// Dispatch a hub-bound command to the appropriate handler.
pub async fn dispatch(
    cmd: Command,
    client: &WiserClient,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    match cmd {
        Command::Snapshot => snapshot::handle_snapshot(client, global).await,
        Command::Discover => snapshot::handle_discover(client, global).await,
        Command::Get(args) => devices::handle_get(client, args, global).await,
        Command::Light(args) => devices::handle_light(client, args, global).await,
        Command::Shutter(args) => devices::handle_shutter(client, args, global).await,
        Command::Action(args) => raw::handle_action(client, args, global).await,
        Command::Override(args) => raw::handle_override(client, args, global).await,
        Command::Watch(args) => watch::handle(client, args, global).await,
        // Config and Completions are handled before dispatch
        Command::Config(_) | Command::Completions(_) => Err(CliError::Internal {
            message: "command does not need a hub connection".into(),
        }),
    }
}
