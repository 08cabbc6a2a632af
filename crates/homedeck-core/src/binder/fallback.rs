// Fallback for device types nothing is registered for.

use super::fragment::{Control, Fragment, Widget};
use super::{ControlBinder, ControlInput, EditSink};
use crate::error::CoreError;
use crate::model::{DeviceDescriptor, FieldMap};

/// Renders a single notice and accepts no input.
#[derive(Debug, Default)]
pub struct UnsupportedBinder;

impl ControlBinder for UnsupportedBinder {
    fn render(&self, descriptor: &DeviceDescriptor) -> Fragment {
        let mut fragment = Fragment::new(descriptor.unique_id().clone(), descriptor.display_name());
        fragment.push(Control::new(
            "notice",
            "",
            Widget::Notice {
                text: format!("Unsupported device type '{}'", descriptor.device_type()),
            },
        ));
        fragment
    }

    fn bind(
        &mut self,
        _fragment: &Fragment,
        _descriptor: &DeviceDescriptor,
        _on_user_edit: EditSink,
    ) {}

    fn handle_input(
        &self,
        _fragment: &mut Fragment,
        input: &ControlInput,
    ) -> Result<FieldMap, CoreError> {
        Err(CoreError::InvalidInput {
            control: input.control.clone(),
            input: input.value.to_string(),
        })
    }

    fn update_from_snapshot(&self, _fragment: &mut Fragment, _fields: &FieldMap) -> bool {
        false
    }
}
