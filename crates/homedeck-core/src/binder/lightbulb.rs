// Lightbulb: power, brightness, color and color temperature.

use super::fragment::{Control, Fragment, Widget};
use super::{ControlBinder, ControlInput, EditSink, slider, submit_input, toggle};
use crate::error::CoreError;
use crate::model::{CharacteristicValue, DeviceDescriptor, FieldMap};
use crate::registry::DeviceTypeRegistry;

const HUE_RANGE: (f64, f64) = (0.0, 360.0);
const PERCENT_RANGE: (f64, f64) = (0.0, 100.0);
/// Mired range most bulbs report.
const MIRED_RANGE: (f64, f64) = (140.0, 500.0);

#[derive(Debug, Default)]
pub struct LightbulbBinder {
    sink: Option<EditSink>,
}

/// Color picker, only when the bulb exposes both Hue and Saturation.
fn color_picker(descriptor: &DeviceDescriptor) -> Option<Control> {
    let hue = descriptor.characteristic("Hue").filter(|c| c.can_read)?;
    let saturation = descriptor
        .characteristic("Saturation")
        .filter(|c| c.can_read)?;
    Some(
        Control::new(
            "color",
            "Color",
            Widget::ColorPicker {
                hue_field: "Hue".into(),
                saturation_field: "Saturation".into(),
                hue: hue.value.map_or(HUE_RANGE.0, CharacteristicValue::as_f64),
                saturation: saturation
                    .value
                    .map_or(PERCENT_RANGE.0, CharacteristicValue::as_f64),
            },
        )
        .enabled(hue.can_write && saturation.can_write),
    )
}

impl ControlBinder for LightbulbBinder {
    fn render(&self, descriptor: &DeviceDescriptor) -> Fragment {
        let mut fragment = Fragment::new(descriptor.unique_id().clone(), descriptor.display_name());
        let controls = [
            toggle(descriptor, "On", "Power"),
            slider(descriptor, "Brightness", "Brightness", PERCENT_RANGE),
            color_picker(descriptor),
            slider(descriptor, "ColorTemperature", "Color temperature", MIRED_RANGE),
        ];
        for control in controls.into_iter().flatten() {
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
}

pub fn register(registry: &DeviceTypeRegistry) {
    registry.register("Lightbulb", |_| Box::new(LightbulbBinder::default()));
}
