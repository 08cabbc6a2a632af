//! Interactive control surface.
//!
//! Mounts the requested devices onto the terminal and reads edits from
//! stdin, one line per command:
//!
//! ```text
//! lamp-1 brightness=80 on=on
//! door-2 targetdoorstate=closed
//! show lamp-1
//! quit
//! ```
//!
//! Edits go through the controller, so they are debounced, merged and
//! protected from stale polls exactly like any other front-end.

use std::io::Write;
use std::sync::{Arc, Mutex};

use homedeck_core::{
    ControlInput, Controller, DeviceId, Fragment, InputValue, MountPoint, MountStatus, SyncEvent,
    Widget,
};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast;
use tracing::{debug, info};

use crate::cli::{ControlArgs, GlobalOpts};
use crate::error::CliError;
use crate::output::Painter;

use super::util;

const HELP: &str = "\
Commands:
  <device> <control>=<value> ...   edit controls (on/off, numbers, hue,sat, option label)
  show <device>                    print a device's controls
  list                             list mounted devices
  help                             show this help
  quit                             send pending edits and exit";

// ── Terminal mount point ────────────────────────────────────────────

/// Prints every presented fragment as a timestamped block.
pub struct TerminalMount {
    painter: Painter,
    quiet: bool,
    out: Mutex<()>,
}

impl TerminalMount {
    pub fn new(painter: Painter, quiet: bool) -> Self {
        Self {
            painter,
            quiet,
            out: Mutex::new(()),
        }
    }

    fn emit(&self, text: &str, to_stderr: bool) {
        let _guard = self.out.lock();
        let stamp = self.painter.dim(&chrono::Local::now().format("[%H:%M:%S]").to_string());
        if to_stderr {
            let _ = writeln!(std::io::stderr().lock(), "{stamp} {text}");
        } else {
            let _ = writeln!(std::io::stdout().lock(), "{stamp} {text}");
        }
    }
}

impl MountPoint for TerminalMount {
    fn present(&self, fragment: &Fragment) {
        if !self.quiet {
            self.emit(&render_fragment(fragment, self.painter), false);
        }
    }

    fn notice(&self, device: &DeviceId, message: &str) {
        self.emit(&self.painter.warn(&format!("{device}: {message}")), true);
    }

    fn detach(&self, device: &DeviceId) {
        if !self.quiet {
            self.emit(&self.painter.dim(&format!("{device}: unmounted")), false);
        }
    }
}

// ── Rendering ───────────────────────────────────────────────────────

/// Render a fragment as an indented block of `id  label  state` lines.
pub fn render_fragment(fragment: &Fragment, painter: Painter) -> String {
    let mut lines = vec![format!(
        "{} {}",
        painter.title(&fragment.title),
        painter.dim(&format!("({})", fragment.device))
    )];

    for control in &fragment.controls {
        let state = match &control.widget {
            Widget::Toggle { on, .. } => painter.on_off(*on),
            Widget::Slider {
                min, max, value, ..
            } => format!("{value} {}", painter.dim(&format!("({min}..{max})"))),
            Widget::ColorPicker {
                hue, saturation, ..
            } => format!("hue {hue}, saturation {saturation}"),
            Widget::Select {
                options, selected, ..
            } => options
                .iter()
                .map(|o| {
                    if Some(o.value) == *selected {
                        format!("[{}]", o.label)
                    } else {
                        o.label.clone()
                    }
                })
                .collect::<Vec<_>>()
                .join(" / "),
            Widget::Readout { text, .. } => text.clone(),
            Widget::Notice { text } => {
                lines.push(format!("  {}", painter.warn(&format!("! {text}"))));
                continue;
            }
            Widget::DebugTable { rows } => {
                lines.push(format!("  {}", painter.dim(&control.label)));
                for row in rows {
                    lines.push(format!(
                        "    {:<28} {:<24} {}",
                        row.field, row.description, row.value
                    ));
                }
                continue;
            }
        };
        let suffix = if control.enabled {
            String::new()
        } else {
            format!(" {}", painter.dim("(read-only)"))
        };
        lines.push(format!(
            "  {:<18} {:<18} {state}{suffix}",
            control.id, control.label
        ));
    }
    lines.join("\n")
}

// ── Input parsing ───────────────────────────────────────────────────

/// Translate `control=value` typed by the user into input for `fragment`.
pub fn parse_input(fragment: &Fragment, assignment: &str) -> Result<ControlInput, CliError> {
    let (key, raw) = util::split_assignment(assignment)?;
    let id = key.to_lowercase();
    let control = fragment.control(&id).ok_or_else(|| CliError::Validation {
        field: key.into(),
        reason: format!(
            "no such control on {}; available: {}",
            fragment.device,
            fragment
                .controls
                .iter()
                .filter(|c| !c.fields().is_empty())
                .map(|c| c.id.as_str())
                .collect::<Vec<_>>()
                .join(", ")
        ),
    })?;

    let invalid = |reason: String| CliError::Validation {
        field: id.clone(),
        reason,
    };

    let value = match &control.widget {
        Widget::Toggle { on, .. } => {
            let on = if raw.eq_ignore_ascii_case("toggle") {
                !on
            } else {
                util::parse_value(&id, raw)?.is_truthy()
            };
            InputValue::Toggle { on }
        }
        Widget::Slider { .. } => InputValue::Number {
            value: util::parse_value(&id, raw)?.as_f64(),
        },
        Widget::ColorPicker { .. } => {
            let (hue, saturation) = raw
                .split_once([',', '/'])
                .ok_or_else(|| invalid(format!("expected HUE,SATURATION, got '{raw}'")))?;
            InputValue::Color {
                hue: util::parse_value(&id, hue)?.as_f64(),
                saturation: util::parse_value(&id, saturation)?.as_f64(),
            }
        }
        Widget::Select { options, .. } => {
            let choice = options
                .iter()
                .find(|o| o.label.eq_ignore_ascii_case(raw))
                .map(|o| o.value)
                .or_else(|| raw.parse::<i64>().ok())
                .ok_or_else(|| {
                    invalid(format!(
                        "expected one of {}",
                        options
                            .iter()
                            .map(|o| o.label.as_str())
                            .collect::<Vec<_>>()
                            .join(", ")
                    ))
                })?;
            InputValue::Choice { value: choice }
        }
        Widget::Readout { .. } | Widget::Notice { .. } | Widget::DebugTable { .. } => {
            return Err(invalid("control is read-only".into()));
        }
    };
    Ok(ControlInput::new(id, value))
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(
    controller: &Controller,
    args: ControlArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let painter = Painter::new(global.color);
    let mount = Arc::new(TerminalMount::new(painter, global.quiet));

    let events = controller.subscribe();
    let event_task = tokio::spawn(report_events(events, Arc::clone(&mount), painter));

    for raw in &args.devices {
        let id = DeviceId::new(raw.as_str());
        let descriptor = controller.load_device(&id).await?;
        match controller.mount_device(descriptor, Arc::clone(&mount) as Arc<dyn MountPoint>)? {
            MountStatus::Bound => info!(device = %id, "mounted"),
            MountStatus::Unsupported { type_tag } => {
                info!(device = %id, type_tag = %type_tag, "mounted without controls");
            }
        }
    }

    if !global.quiet {
        eprintln!(
            "{}",
            painter.dim(&format!(
                "Polling every {}. Type 'help' for commands.",
                humantime::format_duration(controller.config().poll_interval)
            ))
        );
    }

    let result = input_loop(controller, &mount).await;

    controller.shutdown().await;
    event_task.abort();
    result
}

async fn input_loop(controller: &Controller, mount: &TerminalMount) -> Result<(), CliError> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        let line = tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            line = lines.next_line() => line?,
        };
        let Some(line) = line else { break };
        let mut words = line.split_whitespace();
        let Some(head) = words.next() else { continue };

        match head {
            "quit" | "exit" => break,
            "help" => eprintln!("{HELP}"),
            "list" => {
                for id in controller.mounted() {
                    let polling = if controller.is_polling(&id) { "polling" } else { "static" };
                    eprintln!("{id} ({polling})");
                }
            }
            "show" => {
                for id in words {
                    match controller.fragment(&DeviceId::new(id)) {
                        Some(fragment) => mount.present(&fragment),
                        None => mount.notice(&DeviceId::new(id), "not mounted"),
                    }
                }
            }
            device => {
                let id = DeviceId::new(device);
                let Some(fragment) = controller.fragment(&id) else {
                    mount.notice(&id, "not mounted (type 'list' to see mounted devices)");
                    continue;
                };
                for assignment in words {
                    match parse_input(&fragment, assignment) {
                        // Rejections are reported through the mount point.
                        Ok(input) => {
                            if let Err(e) = controller.handle_input(&id, &input) {
                                debug!(device = %id, error = %e, "edit rejected");
                            }
                        }
                        Err(e) => mount.notice(&id, &e.to_string()),
                    }
                }
            }
        }
    }
    Ok(())
}

async fn report_events(
    mut events: broadcast::Receiver<SyncEvent>,
    mount: Arc<TerminalMount>,
    painter: Painter,
) {
    loop {
        match events.recv().await {
            Ok(SyncEvent::WriteAcknowledged { device, fields }) => {
                if mount.quiet {
                    continue;
                }
                let summary = fields
                    .iter()
                    .map(|(k, v)| format!("{k}={v}"))
                    .collect::<Vec<_>>()
                    .join(" ");
                mount.emit(&painter.ok(&format!("{device}: saved {summary}")), false);
            }
            Ok(SyncEvent::SnapshotApplied {
                device, suppressed, ..
            }) if !suppressed.is_empty() => {
                debug!(device = %device, ?suppressed, "kept local values during write");
            }
            Ok(_) => {}
            Err(broadcast::error::RecvError::Lagged(n)) => {
                debug!(skipped = n, "event reporter lagged");
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::cli::ColorMode;
    use homedeck_core::{Control, SelectOption};

    fn fragment() -> Fragment {
        let mut f = Fragment::new("lamp-1".into(), "Desk Lamp");
        f.push(Control::new(
            "on",
            "Power",
            Widget::Toggle {
                field: "On".into(),
                on: true,
            },
        ));
        f.push(Control::new(
            "brightness",
            "Brightness",
            Widget::Slider {
                field: "Brightness".into(),
                min: 0.0,
                max: 100.0,
                step: 1.0,
                value: 40.0,
            },
        ));
        f.push(Control::new(
            "color",
            "Color",
            Widget::ColorPicker {
                hue_field: "Hue".into(),
                saturation_field: "Saturation".into(),
                hue: 0.0,
                saturation: 0.0,
            },
        ));
        f.push(Control::new(
            "targetdoorstate",
            "Target",
            Widget::Select {
                field: "TargetDoorState".into(),
                options: vec![
                    SelectOption {
                        value: 0,
                        label: "Open".into(),
                    },
                    SelectOption {
                        value: 1,
                        label: "Closed".into(),
                    },
                ],
                selected: Some(0),
            },
        ));
        f.push(
            Control::new(
                "currentdoorstate",
                "Current",
                Widget::Readout {
                    field: "CurrentDoorState".into(),
                    value: None,
                    text: "Open".into(),
                },
            )
            .enabled(false),
        );
        f
    }

    #[test]
    fn parses_each_widget_kind() {
        let f = fragment();
        assert_eq!(
            parse_input(&f, "Brightness=80").unwrap(),
            ControlInput::new("brightness", InputValue::Number { value: 80.0 })
        );
        assert_eq!(
            parse_input(&f, "on=toggle").unwrap().value,
            InputValue::Toggle { on: false }
        );
        assert_eq!(
            parse_input(&f, "color=120,50").unwrap().value,
            InputValue::Color {
                hue: 120.0,
                saturation: 50.0
            }
        );
        assert_eq!(
            parse_input(&f, "targetdoorstate=closed").unwrap().value,
            InputValue::Choice { value: 1 }
        );
    }

    #[test]
    fn rejects_unknown_and_read_only_controls() {
        let f = fragment();
        let err = parse_input(&f, "volume=3").unwrap_err().to_string();
        assert!(err.contains("brightness"), "{err}");
        assert!(parse_input(&f, "currentdoorstate=1").is_err());
        assert!(parse_input(&f, "targetdoorstate=ajar").is_err());
    }

    #[test]
    fn renders_controls_as_lines() {
        let text = render_fragment(&fragment(), Painter::new(ColorMode::Never));
        assert!(text.starts_with("Desk Lamp (lamp-1)"));
        assert!(text.contains("[Open] / Closed"));
        assert!(text.contains("40 (0..100)"));
        assert!(text.contains("(read-only)"));
    }
}
