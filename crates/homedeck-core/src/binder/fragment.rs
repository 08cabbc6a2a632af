// ── Control fragments ──
//
// A fragment is the typed tree of controls a binder renders for one
// device. Mount points present it however they like (terminal lines, a
// test recorder, ...); the engine only ever mutates control state.

use serde::Serialize;

use crate::model::{CharacteristicValue, DeviceId, FieldMap};

/// One option of a select control.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SelectOption {
    pub value: i64,
    pub label: String,
}

/// One row of the characteristic debug table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DebugRow {
    pub field: String,
    pub description: String,
    pub value: String,
}

/// The interactive or informational part of a control.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "widget", rename_all = "snake_case")]
pub enum Widget {
    Toggle {
        field: String,
        on: bool,
    },
    Slider {
        field: String,
        min: f64,
        max: f64,
        step: f64,
        value: f64,
    },
    /// Composite control writing Hue and Saturation together.
    ColorPicker {
        hue_field: String,
        saturation_field: String,
        hue: f64,
        saturation: f64,
    },
    Select {
        field: String,
        options: Vec<SelectOption>,
        selected: Option<i64>,
    },
    /// Read-only display of a characteristic value.
    Readout {
        field: String,
        value: Option<CharacteristicValue>,
        text: String,
    },
    Notice {
        text: String,
    },
    DebugTable {
        rows: Vec<DebugRow>,
    },
}

/// A labelled control inside a fragment.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Control {
    /// Stable identifier used to route input back to the control.
    pub id: String,
    pub label: String,
    /// Disabled controls are shown but reject input.
    pub enabled: bool,
    #[serde(flatten)]
    pub widget: Widget,
}

impl Control {
    pub fn new(id: impl Into<String>, label: impl Into<String>, widget: Widget) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            enabled: true,
            widget,
        }
    }

    pub fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Characteristic types this control reads and writes.
    pub fn fields(&self) -> Vec<&str> {
        match &self.widget {
            Widget::Toggle { field, .. }
            | Widget::Slider { field, .. }
            | Widget::Select { field, .. }
            | Widget::Readout { field, .. } => vec![field.as_str()],
            Widget::ColorPicker {
                hue_field,
                saturation_field,
                ..
            } => vec![hue_field.as_str(), saturation_field.as_str()],
            Widget::Notice { .. } | Widget::DebugTable { .. } => Vec::new(),
        }
    }

    /// Move the control to `value` for `field`. Returns `true` if the
    /// control state changed.
    #[allow(clippy::float_cmp)]
    pub fn apply(&mut self, field: &str, value: CharacteristicValue) -> bool {
        match &mut self.widget {
            Widget::Toggle { field: f, on } if f == field => {
                let next = value.is_truthy();
                std::mem::replace(on, next) != next
            }
            Widget::Slider { field: f, value: v, .. } if f == field => {
                let next = value.as_f64();
                std::mem::replace(v, next) != next
            }
            Widget::ColorPicker {
                hue_field,
                saturation_field,
                hue,
                saturation,
            } => {
                let slot = if hue_field == field {
                    hue
                } else if saturation_field == field {
                    saturation
                } else {
                    return false;
                };
                let next = value.as_f64();
                std::mem::replace(slot, next) != next
            }
            Widget::Select {
                field: f, selected, ..
            } if f == field => {
                let next = value.as_i64();
                std::mem::replace(selected, next) != next
            }
            Widget::Readout {
                field: f,
                value: v,
                text,
            } if f == field => {
                let changed = *v != Some(value);
                *v = Some(value);
                *text = value.to_string();
                changed
            }
            Widget::DebugTable { rows } => {
                let mut changed = false;
                for row in rows.iter_mut().filter(|r| r.field == field) {
                    let text = value.to_string();
                    if row.value != text {
                        row.value = text;
                        changed = true;
                    }
                }
                changed
            }
            _ => false,
        }
    }
}

/// Everything rendered for one mounted device.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Fragment {
    pub device: DeviceId,
    pub title: String,
    pub controls: Vec<Control>,
}

impl Fragment {
    pub fn new(device: DeviceId, title: impl Into<String>) -> Self {
        Self {
            device,
            title: title.into(),
            controls: Vec::new(),
        }
    }

    pub fn push(&mut self, control: Control) {
        self.controls.push(control);
    }

    pub fn control(&self, id: &str) -> Option<&Control> {
        self.controls.iter().find(|c| c.id == id)
    }

    pub fn control_mut(&mut self, id: &str) -> Option<&mut Control> {
        self.controls.iter_mut().find(|c| c.id == id)
    }

    /// Apply `fields` to every control bound to them. Returns `true` if any
    /// control changed.
    pub fn apply_fields(&mut self, fields: &FieldMap) -> bool {
        let mut changed = false;
        for (field, value) in fields {
            for control in &mut self.controls {
                changed |= control.apply(field, *value);
            }
        }
        changed
    }

    /// The first notice text, if any.
    pub fn notice(&self) -> Option<&str> {
        self.controls.iter().find_map(|c| match &c.widget {
            Widget::Notice { text } => Some(text.as_str()),
            _ => None,
        })
    }

    /// Replace the debug table rows, appending a table if there is none.
    pub fn set_debug_rows(&mut self, rows: Vec<DebugRow>) {
        if let Some(control) = self
            .controls
            .iter_mut()
            .find(|c| matches!(c.widget, Widget::DebugTable { .. }))
        {
            control.widget = Widget::DebugTable { rows };
        } else {
            self.push(Control::new(
                "debug",
                "Characteristics",
                Widget::DebugTable { rows },
            ));
        }
    }

    pub fn debug_rows(&self) -> Option<&[DebugRow]> {
        self.controls.iter().find_map(|c| match &c.widget {
            Widget::DebugTable { rows } => Some(rows.as_slice()),
            _ => None,
        })
    }
}
