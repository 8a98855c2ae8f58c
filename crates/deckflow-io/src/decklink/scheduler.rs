//! Per-tick driver
//!
//! The host calls [`FrameScheduler::tick`] once per engine frame. Inputs are
//! updated before outputs, each group in registration order, so an output
//! mirroring an input sees that input's state from the same tick.

use super::device::VideoDevice;
use super::handle::DeviceHandle;
use super::input::InputDevice;
use super::output::OutputDevice;
use deckflow_core::{SyncMode, VideoDeviceType, FLICKS_PER_SECOND};
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};

/// Inconsistency between the active outputs found after a tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerIssue {
    /// Outputs run at different frame durations
    IncompatibleFrameRates,
    /// Outputs mix Manual and Async sync modes
    MixedSyncModes,
}

impl fmt::Display for SchedulerIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SchedulerIssue::IncompatibleFrameRates => {
                f.write_str("All OutputDevices must have compatible frame rates selected.")
            }
            SchedulerIssue::MixedSyncModes => {
                f.write_str("OutputDevices must all be set to either Manual or Async mode.")
            }
        }
    }
}

/// Registry of running devices.
#[derive(Default)]
pub struct FrameScheduler {
    inputs: BTreeMap<usize, Arc<Mutex<InputDevice>>>,
    outputs: BTreeMap<usize, Arc<Mutex<OutputDevice>>>,
    next_input_slot: usize,
    next_output_slot: usize,
    hook_installed: bool,
    last_issue: Option<SchedulerIssue>,
}

impl FrameScheduler {
    /// An empty scheduler.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a device and returns its slot. The first registration
    /// installs the tick hook.
    pub fn register(&mut self, handle: &DeviceHandle) -> usize {
        let slot = match handle {
            DeviceHandle::Input(device) => {
                let slot = self.next_input_slot;
                self.next_input_slot += 1;
                self.inputs.insert(slot, Arc::clone(device));
                slot
            }
            DeviceHandle::Output(device) => {
                let slot = self.next_output_slot;
                self.next_output_slot += 1;
                self.outputs.insert(slot, Arc::clone(device));
                slot
            }
        };

        if !self.hook_installed {
            self.hook_installed = true;
            info!("Video I/O tick hook installed");
        }
        slot
    }

    /// Removes a device. The last removal uninstalls the tick hook.
    pub fn unregister(&mut self, device_type: VideoDeviceType, slot: usize) -> bool {
        let removed = match device_type {
            VideoDeviceType::Input => self.inputs.remove(&slot).is_some(),
            VideoDeviceType::Output => self.outputs.remove(&slot).is_some(),
        };

        if self.hook_installed && self.is_empty() {
            self.hook_installed = false;
            self.last_issue = None;
            info!("Video I/O tick hook removed");
        }
        removed
    }

    /// Updates every input, then every output, then checks that the active
    /// outputs agree on frame duration and sync mode.
    pub fn tick(&mut self, now: Duration) -> Option<SchedulerIssue> {
        if !self.hook_installed {
            return None;
        }

        for input in self.inputs.values() {
            input.lock().perform_update(now);
        }
        for output in self.outputs.values() {
            output.lock().perform_update(now);
        }

        let issue = self.check_outputs();
        if issue != self.last_issue {
            if let Some(issue) = issue {
                error!("{}", issue);
            }
            self.last_issue = issue;
        }
        issue
    }

    fn active_outputs(&self) -> Vec<(i64, SyncMode)> {
        self.outputs
            .values()
            .filter_map(|output| {
                let output = output.lock();
                let frame_duration = output.frame_duration();
                (output.is_active() && frame_duration > 0)
                    .then(|| (frame_duration, output.sync_mode()))
            })
            .collect()
    }

    fn check_outputs(&self) -> Option<SchedulerIssue> {
        let outputs = self.active_outputs();
        let (first_duration, first_sync) = *outputs.first()?;

        if outputs.iter().any(|&(duration, _)| duration != first_duration) {
            return Some(SchedulerIssue::IncompatibleFrameRates);
        }
        if outputs.iter().any(|&(_, sync)| sync != first_sync) {
            return Some(SchedulerIssue::MixedSyncModes);
        }
        None
    }

    /// Time the host clock should advance per tick: the output tick period in
    /// Manual mode, zero in Async mode, `None` without an active output.
    pub fn capture_delta(&self) -> Option<Duration> {
        let (frame_duration, sync_mode) = *self.active_outputs().first()?;
        match sync_mode {
            SyncMode::Async => Some(Duration::ZERO),
            SyncMode::Manual => {
                let nanos = frame_duration as i128 * 1_000_000_000 / FLICKS_PER_SECOND as i128;
                Some(Duration::from_nanos(nanos as u64))
            }
        }
    }

    /// Whether the tick hook is installed.
    pub fn is_hook_installed(&self) -> bool {
        self.hook_installed
    }

    /// Issue found by the latest tick.
    pub fn last_issue(&self) -> Option<SchedulerIssue> {
        self.last_issue
    }

    /// Registered inputs.
    pub fn input_count(&self) -> usize {
        self.inputs.len()
    }

    /// Registered outputs.
    pub fn output_count(&self) -> usize {
        self.outputs.len()
    }

    /// No registered devices.
    pub fn is_empty(&self) -> bool {
        self.inputs.is_empty() && self.outputs.is_empty()
    }
}
