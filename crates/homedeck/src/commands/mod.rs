//! Command dispatch: bridges CLI args -> core operations -> output formatting.

pub mod config_cmd;
pub mod control;
pub mod device;
pub mod devices;
pub mod rooms;
pub mod util;

use homedeck_core::Controller;

use crate::cli::{Command, GlobalOpts};
use crate::error::CliError;

/// Dispatch a server-bound command to the appropriate handler.
pub async fn dispatch(
    cmd: Command,
    controller: &Controller,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    match cmd {
        Command::Rooms(args) => rooms::handle(controller, args, global).await,
        Command::Devices(args) => devices::handle(controller, args, global).await,
        Command::Device(args) => device::handle(controller, args, global).await,
        Command::Control(args) => control::handle(controller, args, global).await,
        // Config and Completions are handled before dispatch
        Command::Config(_) | Command::Completions(_) => Ok(()),
    }
}
