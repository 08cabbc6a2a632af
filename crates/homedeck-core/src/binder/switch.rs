// Switch and Outlet: a single power toggle.

use super::fragment::Fragment;
use super::{ControlBinder, ControlInput, EditSink, submit_input, toggle};
use crate::error::CoreError;
use crate::model::{DeviceDescriptor, FieldMap};
use crate::registry::DeviceTypeRegistry;

#[derive(Debug, Default)]
pub struct SwitchBinder {
    sink: Option<EditSink>,
}

impl ControlBinder for SwitchBinder {
    fn render(&self, descriptor: &DeviceDescriptor) -> Fragment {
        let mut fragment = Fragment::new(descriptor.unique_id().clone(), descriptor.display_name());
        if let Some(control) = toggle(descriptor, "On", "Power") {
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
    for tag in ["Switch", "Outlet"] {
        registry.register(tag, |_| Box::new(SwitchBinder::default()));
    }
}
