//! Room command handlers.

use homedeck_core::{Controller, Room};
use tabled::Tabled;

use crate::cli::{GlobalOpts, RoomsArgs, RoomsCommand};
use crate::error::CliError;
use crate::output;

// ── Table row ───────────────────────────────────────────────────────

#[derive(Tabled)]
struct RoomRow {
    #[tabled(rename = "Room")]
    name: String,
    #[tabled(rename = "Devices")]
    count: usize,
    #[tabled(rename = "IDs")]
    ids: String,
}

impl From<&Room> for RoomRow {
    fn from(r: &Room) -> Self {
        Self {
            name: r.name.clone(),
            count: r.devices.len(),
            ids: r
                .devices
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(", "),
        }
    }
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(
    controller: &Controller,
    args: RoomsArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    match args.command {
        RoomsCommand::List => {
            let rooms = controller.list_rooms().await?;
            let out = output::render_list(global.output, &rooms, |r| RoomRow::from(r), |r| r.name.clone());
            output::print_output(&out, global.quiet);
            Ok(())
        }
    }
}
