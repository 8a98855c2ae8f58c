//! Device handles and the per-mapping device store.

use super::device::VideoDevice;
use super::input::InputDevice;
use super::output::OutputDevice;
use deckflow_core::{ConnectorMapping, DeviceStatus, VideoDeviceType};
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

/// A device of either type.
#[derive(Clone)]
pub enum DeviceHandle {
    /// Capture device
    Input(Arc<Mutex<InputDevice>>),
    /// Playout device
    Output(Arc<Mutex<OutputDevice>>),
}

impl DeviceHandle {
    /// Wraps an input device.
    pub fn input(device: InputDevice) -> Self {
        DeviceHandle::Input(Arc::new(Mutex::new(device)))
    }

    /// Wraps an output device.
    pub fn output(device: OutputDevice) -> Self {
        DeviceHandle::Output(Arc::new(Mutex::new(device)))
    }

    /// Direction of the device.
    pub fn device_type(&self) -> VideoDeviceType {
        match self {
            DeviceHandle::Input(_) => VideoDeviceType::Input,
            DeviceHandle::Output(_) => VideoDeviceType::Output,
        }
    }

    /// Runs a closure against the device behind the handle.
    pub fn with<R>(&self, f: impl FnOnce(&mut dyn VideoDevice) -> R) -> R {
        match self {
            DeviceHandle::Input(device) => f(&mut *device.lock()),
            DeviceHandle::Output(device) => f(&mut *device.lock()),
        }
    }

    /// Device name.
    pub fn name(&self) -> String {
        self.with(|device| device.name().to_string())
    }

    /// Bound logical device, -1 when unbound.
    pub fn selection(&self) -> i32 {
        self.with(|device| device.state().selection)
    }

    /// Binds a logical device.
    pub fn set_selection(&self, selection: i32) {
        self.with(|device| device.state_mut().set_selection(selection));
    }

    /// Whether frames flow through the device.
    pub fn is_active(&self) -> bool {
        self.with(|device| device.is_active())
    }

    /// Latest status.
    pub fn status(&self) -> DeviceStatus {
        self.with(|device| device.status().clone())
    }

    /// One scheduler tick.
    pub fn perform_update(&self, now: Duration) {
        self.with(|device| device.perform_update(now));
    }

    /// Final teardown.
    pub fn dispose(&self) {
        self.with(|device| device.dispose());
    }

    /// The input device, if this is one.
    pub fn as_input(&self) -> Option<&Arc<Mutex<InputDevice>>> {
        match self {
            DeviceHandle::Input(device) => Some(device),
            DeviceHandle::Output(_) => None,
        }
    }

    /// The output device, if this is one.
    pub fn as_output(&self) -> Option<&Arc<Mutex<OutputDevice>>> {
        match self {
            DeviceHandle::Output(device) => Some(device),
            DeviceHandle::Input(_) => None,
        }
    }

    /// Whether both handles point at the same device.
    pub fn ptr_eq(&self, other: &DeviceHandle) -> bool {
        match (self, other) {
            (DeviceHandle::Input(a), DeviceHandle::Input(b)) => Arc::ptr_eq(a, b),
            (DeviceHandle::Output(a), DeviceHandle::Output(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl std::fmt::Debug for DeviceHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeviceHandle")
            .field("type", &self.device_type())
            .field("name", &self.name())
            .finish()
    }
}

/// A named device as listed by the manager.
#[derive(Debug, Clone)]
pub struct DeviceRecord {
    /// Unique name within its type
    pub name: String,
    /// The device
    pub handle: DeviceHandle,
}

impl DeviceRecord {
    /// Record for a device.
    pub fn new(name: impl Into<String>, handle: DeviceHandle) -> Self {
        Self {
            name: name.into(),
            handle,
        }
    }

    /// Direction of the device.
    pub fn device_type(&self) -> VideoDeviceType {
        self.handle.device_type()
    }

    /// Bound logical device, -1 when unbound.
    pub fn current_index(&self) -> i32 {
        self.handle.selection()
    }

    /// Logical device bound before the last device list rebuild.
    pub fn old_index(&self) -> i32 {
        self.handle.with(|device| device.state().old_selection)
    }

    /// Binds a logical device and remembers the binding to restore.
    pub fn set_current_video_device(&self, index: i32, old_index: i32) {
        self.handle.with(|device| {
            let state = device.state_mut();
            state.set_selection(index);
            state.old_selection = old_index;
        });
    }
}

/// Key of a device container.
pub type ContainerKey = (usize, ConnectorMapping);

/// Devices grouped by the card and mapping they were configured under.
#[derive(Debug, Default)]
pub struct DeviceStore {
    containers: BTreeMap<ContainerKey, Vec<DeviceRecord>>,
}

impl DeviceStore {
    /// An empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a record to a container, creating the container if needed.
    pub fn insert(&mut self, key: ContainerKey, record: DeviceRecord) {
        self.containers.entry(key).or_default().push(record);
    }

    /// Records in a container.
    pub fn container(&self, key: ContainerKey) -> &[DeviceRecord] {
        self.containers
            .get(&key)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Finds a record by name and type within a container.
    pub fn find(
        &self,
        key: ContainerKey,
        name: &str,
        device_type: VideoDeviceType,
    ) -> Option<&DeviceRecord> {
        self.container(key)
            .iter()
            .find(|r| r.name == name && r.device_type() == device_type)
    }

    /// Removes a record. Empty containers are dropped.
    pub fn remove(
        &mut self,
        key: ContainerKey,
        name: &str,
        device_type: VideoDeviceType,
    ) -> Option<DeviceRecord> {
        let records = self.containers.get_mut(&key)?;
        let position = records
            .iter()
            .position(|r| r.name == name && r.device_type() == device_type)?;
        let record = records.remove(position);
        if records.is_empty() {
            self.containers.remove(&key);
        }
        Some(record)
    }

    /// Moves the records of one container to another.
    pub fn rekey(&mut self, from: ContainerKey, to: ContainerKey) {
        if from == to {
            return;
        }
        if let Some(records) = self.containers.remove(&from) {
            self.containers.entry(to).or_default().extend(records);
        }
    }

    /// Whether a container exists.
    pub fn contains(&self, key: ContainerKey) -> bool {
        self.containers.contains_key(&key)
    }

    /// Number of containers.
    pub fn len(&self) -> usize {
        self.containers.len()
    }

    /// No containers.
    pub fn is_empty(&self) -> bool {
        self.containers.is_empty()
    }

    /// Every record, container by container.
    pub fn records(&self) -> impl Iterator<Item = &DeviceRecord> {
        self.containers.values().flatten()
    }

    /// Drops every container.
    pub fn clear(&mut self) {
        self.containers.clear();
    }
}
