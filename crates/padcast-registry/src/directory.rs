use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use ahash::AHashMap;

use crate::types::{Device, DeviceId};

type DeviceMap = AHashMap<DeviceId, Arc<Device>>;

/// Mapping from device id to the currently attached device record.
///
/// Records are swapped as whole `Arc`s under the write lock, so a reader
/// either sees the previous record or the new one.
#[derive(Debug, Default)]
pub struct DeviceDirectory {
    devices: RwLock<DeviceMap>,
}

impl DeviceDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Constructs or replaces the record for `id`. Returns the replaced record.
    pub fn attach(
        &self,
        id: DeviceId,
        button_count: usize,
        axis_count: usize,
        buttons: &[bool],
        axes: &[f32],
    ) -> Option<Arc<Device>> {
        self.insert(Device::new(id, button_count, axis_count, buttons, axes))
    }

    /// Publishes a prepared record, replacing any record with the same id.
    pub fn insert(&self, device: Device) -> Option<Arc<Device>> {
        let device = Arc::new(device);
        self.write().insert(device.id(), device)
    }

    /// Removes the record for `id`, if any.
    pub fn detach(&self, id: DeviceId) -> Option<Arc<Device>> {
        self.write().remove(&id)
    }

    pub fn count(&self) -> usize {
        self.read().len()
    }

    pub fn lookup(&self, id: DeviceId) -> Option<Arc<Device>> {
        self.read().get(&id).cloned()
    }

    pub fn contains(&self, id: DeviceId) -> bool {
        self.read().contains_key(&id)
    }

    /// Returns the attached ids in ascending order.
    pub fn ids(&self) -> Vec<DeviceId> {
        let mut ids: Vec<DeviceId> = self.read().keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    /// Stores new state for an attached device. Returns the updated record,
    /// or `None` when the device is not attached.
    pub(crate) fn replace_state(
        &self,
        id: DeviceId,
        buttons: &[bool],
        axes: &[f32],
    ) -> Option<Arc<Device>> {
        let mut devices = self.write();
        let slot = devices.get_mut(&id)?;
        let updated = Arc::new(slot.with_state(buttons, axes));
        *slot = Arc::clone(&updated);
        Some(updated)
    }

    // Lock holders never run foreign code, so a poisoned map is still consistent.
    fn read(&self) -> RwLockReadGuard<'_, DeviceMap> {
        self.devices.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, DeviceMap> {
        self.devices.write().unwrap_or_else(PoisonError::into_inner)
    }
}
