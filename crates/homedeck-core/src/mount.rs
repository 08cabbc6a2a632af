// ── Mount points ──
//
// A mount point is the surface a device's fragment is shown on. The engine
// pushes whole fragments; it never reads anything back.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use arc_swap::ArcSwap;

use crate::binder::{ControlBinder, Fragment};
use crate::model::{DeviceDescriptor, DeviceId};

pub trait MountPoint: Send + Sync {
    /// Show (or re-show) the fragment of one device.
    fn present(&self, fragment: &Fragment);

    /// Inline message for one device, e.g. a rejected edit or failed write.
    fn notice(&self, _device: &DeviceId, _message: &str) {}

    /// The device was unmounted; drop whatever was shown for it.
    fn detach(&self, _device: &DeviceId) {}
}

// ── Mounted device state ─────────────────────────────────────────────

/// Binder and the fragment it manages, updated together.
pub(crate) struct View {
    pub(crate) binder: Box<dyn ControlBinder>,
    pub(crate) fragment: Fragment,
}

/// Everything the controller keeps for one mounted device.
pub(crate) struct MountedDevice {
    pub(crate) id: DeviceId,
    /// Latest known descriptor; shared with the device's edit sink.
    pub(crate) descriptor: Arc<ArcSwap<DeviceDescriptor>>,
    pub(crate) view: Mutex<View>,
    pub(crate) mount: Arc<dyn MountPoint>,
}

impl MountedDevice {
    pub(crate) fn view(&self) -> MutexGuard<'_, View> {
        self.view.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn fragment(&self) -> Fragment {
        self.view().fragment.clone()
    }

    /// Re-present the current fragment. The lock is released before the
    /// mount point runs.
    pub(crate) fn present(&self) {
        let fragment = self.fragment();
        self.mount.present(&fragment);
    }
}
