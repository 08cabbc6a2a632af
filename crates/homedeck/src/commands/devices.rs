//! Room device listing.

use homedeck_core::{Controller, DeviceDescriptor};
use tabled::Tabled;

use crate::cli::{DevicesArgs, DevicesCommand, GlobalOpts};
use crate::error::CliError;
use crate::output;

// ── Table row ───────────────────────────────────────────────────────

#[derive(Tabled)]
struct DeviceRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Type")]
    dtype: String,
    #[tabled(rename = "Values")]
    values: String,
}

impl From<&DeviceDescriptor> for DeviceRow {
    fn from(d: &DeviceDescriptor) -> Self {
        Self {
            id: d.unique_id().to_string(),
            name: d.display_name().to_owned(),
            dtype: d.device_type().to_owned(),
            values: d
                .values()
                .iter()
                .map(|(k, v)| format!("{k}={v}"))
                .collect::<Vec<_>>()
                .join(" "),
        }
    }
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(
    controller: &Controller,
    args: DevicesArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    match args.command {
        DevicesCommand::List { room } => {
            let devices = controller.list_room_devices(&room).await.map_err(|e| match e {
                homedeck_core::CoreError::DeviceNotFound { .. } => CliError::NotFound {
                    resource_type: "room".into(),
                    identifier: room.clone(),
                    list_command: "rooms list".into(),
                },
                other => other.into(),
            })?;
            let out = output::render_list(global.output, &devices, |d| DeviceRow::from(d), |d| {
                d.unique_id().to_string()
            });
            output::print_output(&out, global.quiet);
            Ok(())
        }
    }
}
