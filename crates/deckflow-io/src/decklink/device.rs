//! State shared by input and output devices.

use deckflow_core::{DeviceStatus, VideoDeviceType};
use std::time::Duration;

/// What a device should do with its resources on the next update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleStep {
    /// Open the port and register with the scheduler
    Start,
    /// Close the port and unregister
    Stop,
    /// Nothing changed
    Idle,
}

/// Selection, activity and status flags of a device.
#[derive(Debug, Clone)]
pub struct DeviceState {
    /// Bound logical device, -1 when unbound
    pub selection: i32,
    /// Selection before the last device list rebuild
    pub old_selection: i32,
    /// Runs outside of playback
    pub enabled: bool,
    /// Playback is running
    pub playing: bool,
    /// Resources were created at least once
    pub initialized: bool,
    /// A setting changed and the port must be reopened
    pub requires_reinit: bool,
    /// Latest status message
    pub status: DeviceStatus,
    /// Scheduler slot while registered
    pub slot: Option<usize>,
    lifecycle_dirty: bool,
}

impl Default for DeviceState {
    fn default() -> Self {
        Self {
            selection: -1,
            old_selection: -1,
            enabled: true,
            playing: false,
            initialized: false,
            requires_reinit: false,
            status: DeviceStatus::default(),
            slot: None,
            lifecycle_dirty: true,
        }
    }
}

impl DeviceState {
    /// State bound to a logical device.
    pub fn with_selection(selection: i32, enabled: bool) -> Self {
        Self {
            selection,
            old_selection: selection,
            enabled,
            ..Default::default()
        }
    }

    /// Whether frames flow through the device.
    pub fn is_active(&self) -> bool {
        (self.playing || self.enabled) && self.selection >= 0 && self.initialized
    }

    /// Whether the device wants to run, ignoring initialization.
    pub fn wants_to_run(&self) -> bool {
        (self.playing || self.enabled) && self.selection >= 0
    }

    /// Binds a logical device. A running device is reopened on its next update.
    pub fn set_selection(&mut self, selection: i32) {
        if self.selection == selection {
            return;
        }
        self.selection = selection;
        if self.initialized {
            self.requires_reinit = true;
        }
        self.lifecycle_dirty = true;
    }

    /// Enables or disables the device outside of playback.
    pub fn set_enabled(&mut self, enabled: bool) {
        if self.enabled != enabled {
            self.enabled = enabled;
            self.lifecycle_dirty = true;
        }
    }

    /// Starts or stops playback.
    pub fn set_playing(&mut self, playing: bool) {
        if self.playing != playing {
            self.playing = playing;
            self.lifecycle_dirty = true;
        }
    }

    /// Forces a lifecycle evaluation on the next update.
    pub fn mark_dirty(&mut self) {
        self.lifecycle_dirty = true;
    }

    /// Consumes a pending lifecycle change.
    pub fn lifecycle_step(&mut self) -> LifecycleStep {
        if !self.lifecycle_dirty {
            return LifecycleStep::Idle;
        }
        self.lifecycle_dirty = false;

        match (self.wants_to_run(), self.slot.is_some()) {
            (true, false) => LifecycleStep::Start,
            (false, true) => LifecycleStep::Stop,
            _ => LifecycleStep::Idle,
        }
    }

    /// Records an error status.
    pub fn set_error(&mut self, message: impl Into<String>) {
        self.status = DeviceStatus::error(message);
    }

    /// Records a warning status.
    pub fn set_warning(&mut self, message: impl Into<String>) {
        self.status = DeviceStatus::warning(message);
    }

    /// Clears the status.
    pub fn clear_status(&mut self) {
        self.status = DeviceStatus::default();
    }
}

/// Operations the manager and scheduler perform on any device.
pub trait VideoDevice: Send {
    /// Unique device name.
    fn name(&self) -> &str;

    /// Direction.
    fn device_type(&self) -> VideoDeviceType;

    /// Flags.
    fn state(&self) -> &DeviceState;

    /// Mutable flags.
    fn state_mut(&mut self) -> &mut DeviceState;

    /// Opens the port for a scheduler slot. Returns false when the device
    /// could not start; the reason is left in the status.
    fn initialize(&mut self, slot: usize) -> bool;

    /// Closes the port. Safe to call more than once.
    fn cleanup(&mut self);

    /// One scheduler tick.
    fn perform_update(&mut self, now: Duration);

    /// Final teardown.
    fn dispose(&mut self) {
        self.cleanup();
    }

    /// Whether frames flow through the device.
    fn is_active(&self) -> bool {
        self.state().is_active()
    }

    /// Latest status.
    fn status(&self) -> &DeviceStatus {
        &self.state().status
    }
}
