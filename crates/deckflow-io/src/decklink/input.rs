//! Capture device
//!
//! Frames captured by the port are kept in a small ring buffer. Each tick
//! presents one of them and publishes its timecode, which outputs mirroring
//! this device read back as their own.

use super::device::{DeviceState, VideoDevice};
use super::sdk::{CapturedFrame, DeckLinkSdk, InputError, InputFormat, InputOpenParams, InputPort};
use deckflow_core::{
    ColorSpace, InputSettings, PixelFormat, StatusType, Timecode, TransferFunction,
    VideoDeviceType, VideoMode, SIGNAL_NOT_DEFINED,
};
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Fixed-capacity queue of captured frames, oldest first.
#[derive(Debug, Clone)]
pub struct FrameQueue {
    frames: VecDeque<CapturedFrame>,
    capacity: usize,
}

impl FrameQueue {
    /// An empty queue holding at most `capacity` frames.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            frames: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Appends a frame, dropping the oldest one when full.
    pub fn push(&mut self, frame: CapturedFrame) {
        if self.frames.len() == self.capacity {
            self.frames.pop_front();
        }
        self.frames.push_back(frame);
    }

    /// Changes the capacity, dropping the oldest frames that no longer fit.
    pub fn set_capacity(&mut self, capacity: usize) {
        self.capacity = capacity.max(1);
        while self.frames.len() > self.capacity {
            self.frames.pop_front();
        }
    }

    /// The frame shown this tick: the second oldest when more than one is
    /// queued, so the newest arrival has a tick of slack.
    pub fn presented(&self) -> Option<&CapturedFrame> {
        if self.frames.len() > 1 {
            self.frames.get(1)
        } else {
            self.frames.front()
        }
    }

    /// Frames currently held.
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    /// No frames held.
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Maximum number of frames held.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Drops every frame.
    pub fn clear(&mut self) {
        self.frames.clear();
    }
}

/// An input device.
pub struct InputDevice {
    settings: InputSettings,
    state: DeviceState,
    sdk: Arc<dyn DeckLinkSdk>,
    port: Option<Box<dyn InputPort>>,
    format: Option<InputFormat>,
    desired_pixel_format: PixelFormat,
    queue: FrameQueue,
    timestamp: Option<Timecode>,
    presented_sequence: Option<u64>,
    last_error: InputError,
}

impl InputDevice {
    /// Creates an unbound device from its settings.
    pub fn new(settings: InputSettings, sdk: Arc<dyn DeckLinkSdk>) -> Self {
        let state = DeviceState::with_selection(settings.device_selection, settings.enabled);
        let queue = FrameQueue::new(settings.queue_length);
        let desired_pixel_format = settings.effective_pixel_format();
        Self {
            settings,
            state,
            sdk,
            port: None,
            format: None,
            desired_pixel_format,
            queue,
            timestamp: None,
            presented_sequence: None,
            last_error: InputError::NoError,
        }
    }

    /// Current settings, with the live selection and enabled flags.
    pub fn settings(&self) -> InputSettings {
        let mut settings = self.settings.clone();
        settings.device_selection = self.state.selection;
        settings.enabled = self.state.enabled;
        settings
    }

    fn update_settings(&self) -> bool {
        self.state.requires_reinit
            || self.settings.effective_pixel_format() != self.desired_pixel_format
    }

    fn update_resources(&mut self) {
        if !self.update_settings() {
            return;
        }

        self.destroy_resources();
        let Some(slot) = self.state.slot else {
            return;
        };
        if !self.initialize_resources(slot) {
            self.state.enabled = false;
            self.state.initialized = true;
        }
        self.state.requires_reinit = false;
    }

    fn initialize_resources(&mut self, slot: usize) -> bool {
        self.desired_pixel_format = self.settings.effective_pixel_format();

        let params = InputOpenParams {
            slot,
            device_selection: self.state.selection.max(0) as usize,
            pixel_format: self.desired_pixel_format,
        };

        let Some(port) = self.sdk.open_input(&params) else {
            self.format = None;
            self.fail(
                "Can't start input device (possibly already used)",
                InputError::DeviceAlreadyUsed,
            );
            return false;
        };

        if !port.is_initialized() {
            self.format = None;
            self.fail(
                "Can't start input device (possibly already used)",
                InputError::DeviceAlreadyUsed,
            );
            return false;
        }

        self.format = port.format();
        self.port = Some(port);
        self.queue.set_capacity(self.settings.queue_length);
        self.state.initialized = true;
        self.state.clear_status();
        self.last_error = InputError::NoError;

        info!(
            "{}: capturing from logical device {} ({})",
            self.settings.name,
            self.state.selection,
            self.format_name()
        );
        true
    }

    fn destroy_resources(&mut self) {
        if self.port.take().is_some() {
            debug!("{}: input port closed", self.settings.name);
        }
        self.queue.clear();
        self.timestamp = None;
        self.presented_sequence = None;
    }

    fn fail(&mut self, message: &str, input_error: InputError) {
        error!("{}: {}", self.settings.name, message);
        self.state.set_error(message);
        self.last_error = input_error;
    }

    fn poll_port(&mut self) {
        let Some(port) = self.port.as_mut() else {
            return;
        };

        if let Some((input_error, status)) = port.take_error() {
            self.last_error = input_error;
            if status.kind == StatusType::Error {
                error!("{}: {}", self.settings.name, status.message);
            } else {
                warn!("{}: {}", self.settings.name, status.message);
            }
            self.state.status = status;
        }

        let format = port.format();
        if format != self.format {
            info!(
                "{}: input format changed to {}",
                self.settings.name,
                format.as_ref().map(|f| f.name.as_str()).unwrap_or(SIGNAL_NOT_DEFINED)
            );
            self.format = format;
            self.queue.clear();
        }

        for frame in port.take_frames() {
            self.queue.push(frame);
        }
    }

    /// Requests a capture pixel format. Returns whether anything changed.
    pub fn change_pixel_format(&mut self, pixel_format: PixelFormat) -> bool {
        if self.settings.requested_pixel_format == pixel_format {
            return false;
        }
        self.settings.requested_pixel_format = pixel_format;
        self.refresh_signal_override();
        true
    }

    /// Overrides the signal color space.
    pub fn change_color_space(&mut self, color_space: ColorSpace) -> bool {
        if self.settings.color_space == color_space {
            return false;
        }
        self.settings.color_space = color_space;
        self.refresh_signal_override();
        true
    }

    /// Overrides the signal transfer function.
    pub fn change_transfer_function(&mut self, transfer_function: TransferFunction) -> bool {
        if self.settings.transfer_function == transfer_function {
            return false;
        }
        self.settings.transfer_function = transfer_function;
        self.refresh_signal_override();
        true
    }

    fn refresh_signal_override(&mut self) {
        self.settings.signal_override = self.settings.requested_pixel_format
            != PixelFormat::UseBestQuality
            || self.settings.color_space != ColorSpace::UseDeviceSignal
            || self.settings.transfer_function != TransferFunction::UseDeviceSignal;
    }

    /// Resizes the ring buffer.
    pub fn set_queue_length(&mut self, queue_length: usize) {
        self.settings.queue_length = queue_length;
        self.settings.normalize();
        self.queue.set_capacity(self.settings.queue_length);
    }

    /// Detected registered mode, `None` without a signal or for unknown modes.
    pub fn video_mode(&self) -> Option<&'static VideoMode> {
        self.format.as_ref().and_then(|f| f.mode)
    }

    /// Detected format.
    pub fn format(&self) -> Option<&InputFormat> {
        self.format.as_ref()
    }

    /// Frame duration of the signal in flicks, 0 without a signal.
    pub fn frame_duration(&self) -> i64 {
        self.format.as_ref().map(|f| f.frame_duration).unwrap_or(0)
    }

    /// Format name, "Not defined" without a signal.
    pub fn format_name(&self) -> &str {
        self.format
            .as_ref()
            .map(|f| f.name.as_str())
            .unwrap_or(SIGNAL_NOT_DEFINED)
    }

    /// Timecode of the frame presented this tick.
    pub fn timestamp(&self) -> Option<Timecode> {
        self.timestamp
    }

    /// Sequence number of the frame presented this tick.
    pub fn presented_sequence(&self) -> Option<u64> {
        self.presented_sequence
    }

    /// Frames held in the ring buffer.
    pub fn queued_frames(&self) -> usize {
        self.queue.len()
    }

    /// Frames the card dropped.
    pub fn dropped_frame_count(&self) -> u32 {
        self.port.as_ref().map(|p| p.dropped_frame_count()).unwrap_or(0)
    }

    /// Latest capture error.
    pub fn last_error(&self) -> InputError {
        self.last_error
    }

    /// Whether a port is open.
    pub fn has_port(&self) -> bool {
        self.port.is_some()
    }
}

impl VideoDevice for InputDevice {
    fn name(&self) -> &str {
        &self.settings.name
    }

    fn device_type(&self) -> VideoDeviceType {
        VideoDeviceType::Input
    }

    fn state(&self) -> &DeviceState {
        &self.state
    }

    fn state_mut(&mut self) -> &mut DeviceState {
        &mut self.state
    }

    fn initialize(&mut self, slot: usize) -> bool {
        self.state.slot = Some(slot);

        if self.state.selection < 0 {
            error!(
                "{}: Input device not used, the index is set to None.",
                self.settings.name
            );
            self.state
                .set_error("Input device not used, the index is set to None.");
            return false;
        }

        self.destroy_resources();
        let ok = self.initialize_resources(slot);
        self.state.requires_reinit = false;
        ok
    }

    fn cleanup(&mut self) {
        self.destroy_resources();
        self.format = None;
        self.state.initialized = false;
        self.state.slot = None;
    }

    fn perform_update(&mut self, _now: Duration) {
        self.update_resources();

        if !self.state.is_active() {
            return;
        }

        self.poll_port();

        match self.queue.presented() {
            Some(frame) => {
                self.timestamp = frame.timecode;
                self.presented_sequence = Some(frame.sequence);
            }
            None => {
                self.timestamp = None;
                self.presented_sequence = None;
            }
        }
    }
}
