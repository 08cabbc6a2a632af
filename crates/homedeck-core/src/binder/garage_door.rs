// Garage door opener: target state select plus current state and
// obstruction readouts.

use strum::{Display, FromRepr};

use super::fragment::{Control, Fragment, SelectOption, Widget};
use super::{ControlBinder, ControlInput, EditSink, submit_input};
use crate::error::CoreError;
use crate::model::{CharacteristicValue, DeviceDescriptor, FieldMap};
use crate::registry::DeviceTypeRegistry;

/// `CurrentDoorState` as reported by the accessory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, FromRepr)]
#[repr(i64)]
pub enum DoorState {
    Open = 0,
    Closed = 1,
    Opening = 2,
    Closing = 3,
    Stopped = 4,
}

impl DoorState {
    /// Wire value of the state.
    #[allow(clippy::as_conversions)]
    pub fn code(self) -> i64 {
        self as i64
    }
}

/// Label for a `CurrentDoorState` value.
pub fn door_state_label(value: Option<CharacteristicValue>) -> String {
    value
        .and_then(CharacteristicValue::as_i64)
        .and_then(DoorState::from_repr)
        .map_or_else(|| "Unknown".to_owned(), |s| s.to_string())
}

fn obstruction_label(value: Option<CharacteristicValue>) -> String {
    if value.is_some_and(CharacteristicValue::is_truthy) {
        "Yes".to_owned()
    } else {
        "No".to_owned()
    }
}

fn readout(
    descriptor: &DeviceDescriptor,
    field: &str,
    label: &str,
    format: fn(Option<CharacteristicValue>) -> String,
) -> Option<Control> {
    let c = descriptor.characteristic(field).filter(|c| c.can_read)?;
    Some(Control::new(
        field.to_lowercase(),
        label,
        Widget::Readout {
            field: field.into(),
            value: c.value,
            text: format(c.value),
        },
    ))
}

#[derive(Debug, Default)]
pub struct GarageDoorBinder {
    sink: Option<EditSink>,
}

impl GarageDoorBinder {
    fn relabel(fragment: &mut Fragment) {
        for control in &mut fragment.controls {
            if let Widget::Readout { field, value, text } = &mut control.widget {
                match field.as_str() {
                    "CurrentDoorState" => *text = door_state_label(*value),
                    "ObstructionDetected" => *text = obstruction_label(*value),
                    _ => {}
                }
            }
        }
    }
}

impl ControlBinder for GarageDoorBinder {
    fn render(&self, descriptor: &DeviceDescriptor) -> Fragment {
        let mut fragment = Fragment::new(descriptor.unique_id().clone(), descriptor.display_name());

        if let Some(c) = descriptor
            .characteristic("TargetDoorState")
            .filter(|c| c.can_read)
        {
            let options = [DoorState::Open, DoorState::Closed]
                .into_iter()
                .map(|state| SelectOption {
                    value: state.code(),
                    label: state.to_string(),
                })
                .collect();
            fragment.push(
                Control::new(
                    "targetdoorstate",
                    "Target",
                    Widget::Select {
                        field: "TargetDoorState".into(),
                        options,
                        selected: c.value.and_then(CharacteristicValue::as_i64),
                    },
                )
                .enabled(c.can_write),
            );
        }

        let readouts = [
            readout(descriptor, "CurrentDoorState", "State", door_state_label),
            readout(descriptor, "ObstructionDetected", "Obstruction", obstruction_label),
        ];
        for control in readouts.into_iter().flatten() {
            fragment.push(control);
        }
        fragment
    }

    fn bind(
        &mut self,
        _fragment: &Fragment,
        _descriptor: &DeviceDescriptor,
        on_user_edit: EditSink,
    ) {
        self.sink = Some(on_user_edit);
    }

    fn handle_input(
        &self,
        fragment: &mut Fragment,
        input: &ControlInput,
    ) -> Result<FieldMap, CoreError> {
        submit_input(self.sink.as_ref(), fragment, input)
    }

    fn update_from_snapshot(&self, fragment: &mut Fragment, fields: &FieldMap) -> bool {
        let changed = fragment.apply_fields(fields);
        if changed {
            Self::relabel(fragment);
        }
        changed
    }
}

pub fn register(registry: &DeviceTypeRegistry) {
    registry.register("GarageDoorOpener", |_| Box::new(GarageDoorBinder::default()));
}
