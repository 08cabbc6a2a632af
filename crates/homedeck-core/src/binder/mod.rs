// ── Control binders ──
//
// A binder knows how one device type looks and behaves: it renders a
// fragment from a descriptor, turns user input on that fragment into field
// edits, and moves controls when a new snapshot arrives. Binders never
// talk to the network; edits leave through the `EditSink` handed to
// `bind`, which validates them and feeds the write coalescer.

pub mod debug;
pub mod fallback;
pub mod fragment;
pub mod garage_door;
pub mod lightbulb;
pub mod switch;

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

pub use fragment::{Control, DebugRow, Fragment, SelectOption, Widget};

use crate::error::CoreError;
use crate::model::{CharacteristicValue, DeviceDescriptor, FieldMap};

// ── Input ────────────────────────────────────────────────────────────

/// A value produced by interacting with a control.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum InputValue {
    Toggle { on: bool },
    Number { value: f64 },
    Color { hue: f64, saturation: f64 },
    Choice { value: i64 },
}

impl fmt::Display for InputValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Toggle { on } => write!(f, "toggle({on})"),
            Self::Number { value } => write!(f, "number({value})"),
            Self::Color { hue, saturation } => write!(f, "color({hue}, {saturation})"),
            Self::Choice { value } => write!(f, "choice({value})"),
        }
    }
}

/// User input addressed to one control of a mounted fragment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ControlInput {
    pub control: String,
    pub value: InputValue,
}

impl ControlInput {
    pub fn new(control: impl Into<String>, value: InputValue) -> Self {
        Self {
            control: control.into(),
            value,
        }
    }
}

// ── Edit sink ────────────────────────────────────────────────────────

type SubmitFn = dyn Fn(FieldMap) -> Result<(), CoreError> + Send + Sync;

/// Where a bound binder sends user edits. Rejects invalid edits
/// synchronously; accepted edits are queued for a coalesced write.
#[derive(Clone)]
pub struct EditSink {
    submit: Arc<SubmitFn>,
}

impl EditSink {
    pub fn new(submit: impl Fn(FieldMap) -> Result<(), CoreError> + Send + Sync + 'static) -> Self {
        Self {
            submit: Arc::new(submit),
        }
    }

    pub fn submit(&self, fields: FieldMap) -> Result<(), CoreError> {
        (self.submit)(fields)
    }
}

impl fmt::Debug for EditSink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EditSink").finish_non_exhaustive()
    }
}

// ── Binder contract ──────────────────────────────────────────────────

/// Behaviour of one device type.
pub trait ControlBinder: Send + Sync {
    /// Build the device's controls. Must not depend on anything but the
    /// descriptor.
    fn render(&self, descriptor: &DeviceDescriptor) -> Fragment;

    /// Attach the edit sink. Input routed to the binder before this call
    /// is rejected with [`CoreError::NotBound`].
    fn bind(
        &mut self,
        fragment: &Fragment,
        descriptor: &DeviceDescriptor,
        on_user_edit: EditSink,
    );

    /// Translate input on `fragment` into an edit and submit it. On success
    /// the fragment already shows the new value.
    fn handle_input(
        &self,
        fragment: &mut Fragment,
        input: &ControlInput,
    ) -> Result<FieldMap, CoreError>;

    /// Move controls to the values of a snapshot. Returns `true` if the
    /// fragment changed.
    fn update_from_snapshot(&self, fragment: &mut Fragment, fields: &FieldMap) -> bool {
        fragment.apply_fields(fields)
    }
}

/// Map input on a control to the fields it edits.
pub fn input_fields(fragment: &Fragment, input: &ControlInput) -> Result<FieldMap, CoreError> {
    let control = fragment
        .control(&input.control)
        .ok_or_else(|| CoreError::InvalidInput {
            control: input.control.clone(),
            input: "input (no such control)".into(),
        })?;

    if !control.enabled {
        return Err(CoreError::ControlDisabled {
            control: control.id.clone(),
        });
    }

    let mut fields = FieldMap::new();
    match (&control.widget, input.value) {
        (Widget::Toggle { field, .. }, InputValue::Toggle { on }) => {
            fields.insert(field.clone(), CharacteristicValue::Int(i64::from(on)));
        }
        (Widget::Slider { field, .. }, InputValue::Number { value }) => {
            fields.insert(field.clone(), CharacteristicValue::from_number(value));
        }
        (
            Widget::ColorPicker {
                hue_field,
                saturation_field,
                ..
            },
            InputValue::Color { hue, saturation },
        ) => {
            fields.insert(hue_field.clone(), CharacteristicValue::from_number(hue));
            fields.insert(
                saturation_field.clone(),
                CharacteristicValue::from_number(saturation),
            );
        }
        (Widget::Select { field, options, .. }, InputValue::Choice { value }) => {
            if !options.iter().any(|o| o.value == value) {
                return Err(CoreError::InvalidInput {
                    control: control.id.clone(),
                    input: format!("option {value}"),
                });
            }
            fields.insert(field.clone(), CharacteristicValue::Int(value));
        }
        (_, value) => {
            return Err(CoreError::InvalidInput {
                control: control.id.clone(),
                input: value.to_string(),
            });
        }
    }
    Ok(fields)
}

/// Shared `handle_input` body: map, submit, then update the fragment
/// optimistically. A rejected edit leaves the fragment untouched.
pub fn submit_input(
    sink: Option<&EditSink>,
    fragment: &mut Fragment,
    input: &ControlInput,
) -> Result<FieldMap, CoreError> {
    let sink = sink.ok_or_else(|| CoreError::NotBound {
        identifier: fragment.device.to_string(),
    })?;
    let fields = input_fields(fragment, input)?;
    sink.submit(fields.clone())?;
    fragment.apply_fields(&fields);
    Ok(fields)
}

// ── Rendering helpers ────────────────────────────────────────────────

/// Toggle for a boolean-ish characteristic, if the device has it and it is
/// readable.
pub(crate) fn toggle(descriptor: &DeviceDescriptor, field: &str, label: &str) -> Option<Control> {
    let c = descriptor.characteristic(field).filter(|c| c.can_read)?;
    Some(
        Control::new(
            field.to_lowercase(),
            label,
            Widget::Toggle {
                field: field.into(),
                on: c.value.is_some_and(CharacteristicValue::is_truthy),
            },
        )
        .enabled(c.can_write),
    )
}

/// Slider bounded by the characteristic, falling back to `default_range`.
pub(crate) fn slider(
    descriptor: &DeviceDescriptor,
    field: &str,
    label: &str,
    default_range: (f64, f64),
) -> Option<Control> {
    let c = descriptor.characteristic(field).filter(|c| c.can_read)?;
    let min = c.min_value.unwrap_or(default_range.0);
    let max = c.max_value.unwrap_or(default_range.1);
    Some(
        Control::new(
            field.to_lowercase(),
            label,
            Widget::Slider {
                field: field.into(),
                min,
                max,
                step: c.min_step.unwrap_or(1.0),
                value: c.value.map_or(min, CharacteristicValue::as_f64),
            },
        )
        .enabled(c.can_write),
    )
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::model::Characteristic;
    use pretty_assertions::assert_eq;
    use std::sync::Mutex;

    fn recording_sink() -> (EditSink, Arc<Mutex<Vec<FieldMap>>>) {
        let log = Arc::new(Mutex::new(Vec::new()));
        let sink_log = Arc::clone(&log);
        let sink = EditSink::new(move |fields| {
            sink_log.lock().unwrap().push(fields);
            Ok(())
        });
        (sink, log)
    }

    fn lamp() -> DeviceDescriptor {
        DeviceDescriptor::new("lamp-1", "Lightbulb")
            .with_characteristic(Characteristic::new("On", 0))
            .with_characteristic(Characteristic::new("Brightness", 40).with_range(0.0, 100.0))
    }

    fn fragment() -> Fragment {
        let d = lamp();
        let mut f = Fragment::new(d.unique_id().clone(), d.display_name());
        f.push(toggle(&d, "On", "Power").unwrap());
        f.push(slider(&d, "Brightness", "Brightness", (0.0, 100.0)).unwrap());
        f.push(Control::new("notice", "", Widget::Notice { text: "hi".into() }));
        f
    }

    #[test]
    fn toggle_sends_integer_flag() {
        let (sink, log) = recording_sink();
        let mut f = fragment();
        let fields = submit_input(
            Some(&sink),
            &mut f,
            &ControlInput::new("on", InputValue::Toggle { on: true }),
        )
        .unwrap();

        assert_eq!(fields.get("On"), Some(&CharacteristicValue::Int(1)));
        assert_eq!(log.lock().unwrap().len(), 1);
    }

    #[test]
    fn rejected_edit_leaves_fragment_untouched() {
        let sink = EditSink::new(|_| {
            Err(crate::error::ValidationError::OutOfRange {
                field: "Brightness".into(),
                value: 150.0,
                min: 0.0,
                max: 100.0,
            }
            .into())
        });
        let mut f = fragment();
        let before = f.clone();
        let err = submit_input(
            Some(&sink),
            &mut f,
            &ControlInput::new("brightness", InputValue::Number { value: 150.0 }),
        )
        .unwrap_err();

        assert!(matches!(err, CoreError::Validation(_)));
        assert_eq!(f, before);
    }

    #[test]
    fn mismatched_input_is_rejected() {
        let (sink, log) = recording_sink();
        let mut f = fragment();
        let err = submit_input(
            Some(&sink),
            &mut f,
            &ControlInput::new("on", InputValue::Number { value: 3.0 }),
        )
        .unwrap_err();
        assert!(matches!(err, CoreError::InvalidInput { .. }));

        let err = submit_input(
            Some(&sink),
            &mut f,
            &ControlInput::new("notice", InputValue::Toggle { on: true }),
        )
        .unwrap_err();
        assert!(matches!(err, CoreError::InvalidInput { .. }));
        assert!(log.lock().unwrap().is_empty());
    }

    #[test]
    fn unbound_binder_rejects_input() {
        let mut f = fragment();
        let err = submit_input(
            None,
            &mut f,
            &ControlInput::new("on", InputValue::Toggle { on: true }),
        )
        .unwrap_err();
        assert!(matches!(err, CoreError::NotBound { .. }));
    }

    #[test]
    fn read_only_characteristic_renders_disabled() {
        let d = DeviceDescriptor::new("s1", "Switch")
            .with_characteristic(Characteristic::new("On", 1).read_only());
        let control = toggle(&d, "On", "Power").unwrap();
        assert!(!control.enabled);

        let mut f = Fragment::new(d.unique_id().clone(), "s1");
        f.push(control);
        let (sink, _) = recording_sink();
        let err = submit_input(
            Some(&sink),
            &mut f,
            &ControlInput::new("on", InputValue::Toggle { on: false }),
        )
        .unwrap_err();
        assert!(matches!(err, CoreError::ControlDisabled { .. }));
    }

    #[test]
    fn unreadable_characteristic_is_not_rendered() {
        let d = DeviceDescriptor::new("s1", "Switch")
            .with_characteristic(Characteristic::new("On", 1).write_only());
        assert!(toggle(&d, "On", "Power").is_none());
    }
}
