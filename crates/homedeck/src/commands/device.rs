//! Single-device commands: inspect and one-shot writes.

use homedeck_core::{Characteristic, Controller, DeviceDescriptor, DeviceId};
use tabled::Tabled;

use crate::cli::{DeviceArgs, DeviceCommand, GlobalOpts};
use crate::error::CliError;
use crate::output::{self, Painter};

use super::util;

// ── Table row ───────────────────────────────────────────────────────

#[derive(Tabled)]
struct CharacteristicRow {
    #[tabled(rename = "Type")]
    kind: String,
    #[tabled(rename = "Value")]
    value: String,
    #[tabled(rename = "Access")]
    access: String,
    #[tabled(rename = "Range")]
    range: String,
    #[tabled(rename = "Step")]
    step: String,
    #[tabled(rename = "Unit")]
    unit: String,
}

impl From<&Characteristic> for CharacteristicRow {
    fn from(c: &Characteristic) -> Self {
        let access = match (c.can_read, c.can_write) {
            (true, true) => "rw",
            (true, false) => "r",
            (false, true) => "w",
            (false, false) => "-",
        };
        Self {
            kind: c.kind.clone(),
            value: c.value.map(|v| v.to_string()).unwrap_or_default(),
            access: access.into(),
            range: util::range_label(c.min_value, c.max_value),
            step: c.min_step.map(|s| s.to_string()).unwrap_or_default(),
            unit: c.unit.clone().unwrap_or_default(),
        }
    }
}

fn detail(d: &DeviceDescriptor, painter: Painter) -> String {
    let rows: Vec<CharacteristicRow> = d
        .characteristics()
        .iter()
        .map(CharacteristicRow::from)
        .collect();
    let mut lines = vec![
        painter.title(d.display_name()),
        format!("ID:    {}", d.unique_id()),
        format!("Type:  {}", d.device_type()),
    ];
    if let Some(human) = &d.human_type {
        lines.push(format!("Kind:  {human}"));
    }
    lines.push(output::render_table(&rows));
    lines.join("\n")
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(
    controller: &Controller,
    args: DeviceArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let painter = Painter::new(global.color);
    match args.command {
        DeviceCommand::Get { device } => {
            let descriptor = controller.load_device(&DeviceId::new(device)).await?;
            let out = output::render_single(
                global.output,
                &descriptor,
                |d| detail(d, painter),
                |d| d.unique_id().to_string(),
            );
            output::print_output(&out, global.quiet);
            Ok(())
        }

        DeviceCommand::Set { device, values } => {
            let fields = util::parse_assignments(&values)?;
            let id = DeviceId::new(device);
            let ack = controller.write_device(&id, &fields).await?;

            let written = if ack.updated.is_empty() {
                fields
            } else {
                ack.updated
            };
            let out = output::render_single(
                global.output,
                &written,
                |w| {
                    let summary = w
                        .iter()
                        .map(|(k, v)| format!("{k}={v}"))
                        .collect::<Vec<_>>()
                        .join(" ");
                    painter.ok(&format!("Updated {id}: {summary}"))
                },
                |w| w.keys().cloned().collect::<Vec<_>>().join("\n"),
            );
            output::print_output(&out, global.quiet);
            Ok(())
        }
    }
}
