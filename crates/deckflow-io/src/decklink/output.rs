//! Playout device
//!
//! Each tick the output takes the latest rendered frame from its
//! [`FrameSource`], packs it on the GPU into the card's pixel layout and
//! appends it to a FIFO. Entries leave the FIFO in order, once their GPU
//! readback is complete, and are scheduled on the card with a timecode.
//!
//! Interlaced modes take two ticks per card frame: the first source frame is
//! kept as the odd field and woven with the second.

use super::device::{DeviceState, VideoDevice};
use super::input::InputDevice;
use super::sdk::{
    DeckLinkSdk, FramePayload, FrameSource, GpuBackend, OutputOpenParams, OutputPort, PackTarget,
    ReadbackRequest, TextureHandle, TimecodeProvider,
};
use deckflow_core::video_mode::format_mode_name;
use deckflow_core::{
    registry, ColorSpace, FrameRate, KeyingMode, LinkMode, OutputSettings,
    OutputTimecodeMode, PixelFormat, Resolution, ScanMode, StatusType, SyncMode, Timecode,
    TransferFunction, VideoDeviceType, VideoMode, VideoModeSetting, FLICKS_PER_SECOND,
    SIGNAL_NOT_DEFINED,
};
use parking_lot::{Mutex, RwLock};
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// A stall longer than this many frames fast-forwards the schedule clock.
pub const STALL_THRESHOLD_FRAMES: i128 = 50;

/// Input device an output mirrors, with its name.
pub type InputLink = (String, Arc<Mutex<InputDevice>>);

/// Counters of one output device.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OutputStats {
    /// Frames packed and queued
    pub frames_queued: u64,
    /// Frames handed to the card
    pub frames_fed: u64,
    /// Queue entries dropped on GPU errors
    pub frames_dropped: u64,
    /// Frames skipped by stall recovery
    pub frames_skipped: u64,
}

enum PendingFrame {
    Readback {
        request: Box<dyn ReadbackRequest>,
        texture: TextureHandle,
    },
    Texture(TextureHandle),
}

struct QueuedFrame {
    sequence: u64,
    pending: PendingFrame,
    timecode: Option<Timecode>,
}

enum Readiness {
    Ready,
    Pending,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct AppliedConfig {
    pixel_format: PixelFormat,
    color_space: ColorSpace,
    transfer_function: TransferFunction,
    sync_mode: SyncMode,
    gpu_direct: bool,
}

/// Number of frames the schedule clock skips after a stall of `elapsed`.
///
/// Zero unless more than [`STALL_THRESHOLD_FRAMES`] frames elapsed,
/// otherwise `elapsed / frame_duration` rounded half up.
pub fn schedule_steps(elapsed: Duration, frame_duration: i64) -> u64 {
    if frame_duration <= 0 {
        return 0;
    }
    let elapsed = elapsed.as_nanos() as i128 * FLICKS_PER_SECOND as i128 / 1_000_000_000;
    let frame_duration = frame_duration as i128;
    if elapsed <= STALL_THRESHOLD_FRAMES * frame_duration {
        return 0;
    }
    ((2 * elapsed + frame_duration) / (2 * frame_duration)) as u64
}

/// An output device.
pub struct OutputDevice {
    settings: OutputSettings,
    state: DeviceState,
    sdk: Arc<dyn DeckLinkSdk>,
    gpu: Arc<dyn GpuBackend>,
    source: Option<Box<dyn FrameSource>>,
    port: Option<Box<dyn OutputPort>>,
    applied: AppliedConfig,
    queue: VecDeque<QueuedFrame>,
    odd_field: Option<TextureHandle>,
    frame_count: u64,
    next_sequence: u64,
    previous_time: Option<Duration>,
    resources_updated: bool,
    keying_initialized: bool,
    format_name: String,
    applied_mode: Option<u32>,
    input_link: Option<InputLink>,
    timecode_override: Option<Timecode>,
    timecode_source: Option<Arc<dyn TimecodeProvider>>,
    synchronizer: Option<Arc<dyn TimecodeProvider>>,
    stats: Arc<RwLock<OutputStats>>,
}

impl OutputDevice {
    /// Creates an unbound device from its settings.
    pub fn new(
        settings: OutputSettings,
        sdk: Arc<dyn DeckLinkSdk>,
        gpu: Arc<dyn GpuBackend>,
    ) -> Self {
        let state = DeviceState::with_selection(settings.device_selection, settings.enabled);
        let applied = AppliedConfig {
            pixel_format: settings.pixel_format,
            color_space: settings.color_space,
            transfer_function: settings.transfer_function,
            sync_mode: settings.sync_mode,
            gpu_direct: settings.gpu_direct && gpu.is_gpu_direct_available(),
        };
        Self {
            settings,
            state,
            sdk,
            gpu,
            source: None,
            port: None,
            applied,
            queue: VecDeque::new(),
            odd_field: None,
            frame_count: 0,
            next_sequence: 0,
            previous_time: None,
            resources_updated: false,
            keying_initialized: false,
            format_name: SIGNAL_NOT_DEFINED.to_string(),
            applied_mode: None,
            input_link: None,
            timecode_override: None,
            timecode_source: None,
            synchronizer: None,
            stats: Arc::new(RwLock::new(OutputStats::default())),
        }
    }

    /// Current settings, with the live selection and enabled flags.
    pub fn settings(&self) -> OutputSettings {
        let mut settings = self.settings.clone();
        settings.device_selection = self.state.selection;
        settings.enabled = self.state.enabled;
        settings
    }

    fn requested_config(&self) -> AppliedConfig {
        AppliedConfig {
            pixel_format: self.settings.pixel_format,
            color_space: self.settings.color_space,
            transfer_function: self.settings.transfer_function,
            sync_mode: self.settings.sync_mode,
            gpu_direct: self.settings.gpu_direct && self.gpu.is_gpu_direct_available(),
        }
    }

    fn update_settings(&self) -> bool {
        self.state.requires_reinit || self.requested_config() != self.applied
    }

    fn update_resources(&mut self) {
        if !self.update_settings() {
            self.resources_updated = false;
            return;
        }
        let Some(slot) = self.state.slot else {
            return;
        };

        debug!("{}: reinitializing output", self.settings.name);
        self.destroy_resources();
        if self.initialize_resources(slot) {
            self.resources_updated = true;
            self.previous_time = None;
        } else {
            self.state.enabled = false;
            self.state.initialized = true;
        }
        self.state.requires_reinit = false;
    }

    fn resolve_mode(&self) -> std::result::Result<&'static VideoMode, String> {
        match &self.settings.same_as_input {
            Some(name) => {
                let Some((_, input)) = &self.input_link else {
                    return Err(
                        "Same as Input Video Mode requested but no target input device set."
                            .to_string(),
                    );
                };
                input.lock().video_mode().ok_or_else(|| {
                    format!("Failed to detect and match Video Mode of input device {name}.")
                })
            }
            None => {
                let setting = self.settings.video_mode;
                setting.resolve().ok_or_else(|| {
                    format!(
                        "Unsupported video mode {}.",
                        format_mode_name(setting.resolution, setting.frame_rate, setting.scan_mode)
                    )
                })
            }
        }
    }

    fn initialize_resources(&mut self, slot: usize) -> bool {
        self.format_name = SIGNAL_NOT_DEFINED.to_string();
        self.applied = self.requested_config();

        if self.state.selection < 0 {
            self.fail("Output device not used, the index is set to None.");
            return false;
        }

        if self.source.is_none() {
            self.fail("The frame source cannot be null.");
            return false;
        }

        let mode = match self.resolve_mode() {
            Ok(mode) => mode,
            Err(message) => {
                self.applied_mode = None;
                error!("{}: {}", self.settings.name, message);
                self.state.set_error(message);
                return false;
            }
        };
        self.applied_mode = Some(mode.sdk_code);

        if !self.create_port(slot, mode) {
            self.fail("Can't start output device (possibly already used)");
            return false;
        }

        self.format_name = mode.name.clone();
        self.state.initialized = true;

        let valid = self
            .port
            .as_ref()
            .map(|port| port.is_valid_configuration())
            .unwrap_or(false);
        if !valid {
            self.fail("Invalid configuration (incompatible settings used)");
            return false;
        }

        self.state.clear_status();
        self.initialize_keying();
        self.initialize_link_mode();

        info!(
            "{}: playing out {} on logical device {} ({})",
            self.settings.name, mode.name, self.state.selection, self.applied.pixel_format
        );
        true
    }

    fn create_port(&mut self, slot: usize, mode: &VideoMode) -> bool {
        let params = OutputOpenParams {
            slot,
            device_selection: self.state.selection.max(0) as usize,
            mode_code: mode.sdk_code,
            pixel_format: self.applied.pixel_format,
            color_space: self.applied.color_space,
            transfer_function: self.applied.transfer_function,
            preroll_length: self.settings.preroll_length,
            sync_mode: self.applied.sync_mode,
            gpu_direct: self.applied.gpu_direct,
        };

        let Some(mut port) = self.sdk.open_output(&params) else {
            return false;
        };
        if !port.is_initialized() {
            return false;
        }

        port.set_default_schedule_time(0);
        self.frame_count = 0;
        self.port = Some(port);
        true
    }

    fn initialize_keying(&mut self) {
        self.keying_initialized = false;
        let mode = self.settings.keying_mode;
        if mode == KeyingMode::None {
            return;
        }

        if self.applied.color_space == ColorSpace::Bt2020 {
            warn!(
                "{}: keying is not available with the BT.2020 color space",
                self.settings.name
            );
            return;
        }

        let pixel_format = self.applied.pixel_format;
        let Some(port) = self.port.as_mut() else {
            return;
        };

        if pixel_format.is_keying_available()
            && port.is_keying_mode_compatible(mode)
            && port.initialize_keying(mode)
        {
            self.keying_initialized = true;
            info!("{}: keying set to {:?}", self.settings.name, mode);
        } else {
            let message = format!(
                "The selected Fill and Key mode is not compatible with your card or your current connector mapping. Current mode is {mode:?}."
            );
            warn!("{}: {}", self.settings.name, message);
            self.state.set_warning(message);
        }
    }

    fn initialize_link_mode(&mut self) {
        let mode = self.settings.link_mode;
        if mode == LinkMode::Single {
            return;
        }
        let Some(port) = self.port.as_mut() else {
            return;
        };

        if port.is_link_compatible(mode) && port.set_link_mode(mode) {
            info!("{}: link mode set to {:?}", self.settings.name, mode);
        } else {
            let message = "This selected Link Mode is not compatible with this device.";
            warn!("{}: {}", self.settings.name, message);
            port.set_link_mode(LinkMode::Single);
            self.state.set_warning(message);
        }
    }

    fn fail(&mut self, message: &str) {
        error!("{}: {}", self.settings.name, message);
        self.state.set_error(message);
    }

    fn destroy_resources(&mut self) {
        while let Some(entry) = self.queue.pop_front() {
            self.release_entry(entry);
        }
        if let Some(odd) = self.odd_field.take() {
            self.gpu.release(odd);
        }
        if let Some(mut port) = self.port.take() {
            if self.keying_initialized {
                port.disable_keying();
            }
            debug!("{}: output port closed", self.settings.name);
        }
        self.keying_initialized = false;
    }

    fn release_entry(&self, entry: QueuedFrame) {
        match entry.pending {
            PendingFrame::Readback {
                mut request,
                texture,
            } => {
                if !request.is_done() && !request.has_error() {
                    request.wait_for_completion();
                }
                self.gpu.release(texture);
            }
            PendingFrame::Texture(texture) => self.gpu.release(texture),
        }
    }

    fn poll_same_as_input(&mut self) {
        if self.settings.same_as_input.is_none() || !self.state.initialized {
            return;
        }
        let Some((name, input)) = &self.input_link else {
            return;
        };

        let current = input.lock().video_mode().map(|mode| mode.sdk_code);
        if current != self.applied_mode {
            info!(
                "{}: video mode of input device {} changed",
                self.settings.name, name
            );
            self.state.requires_reinit = true;
        }
    }

    fn recover_stalled_schedule(&mut self, now: Duration) {
        let previous = self.previous_time.replace(now);
        if self.applied.sync_mode != SyncMode::Manual {
            return;
        }
        let (Some(previous), Some(port)) = (previous, self.port.as_mut()) else {
            return;
        };

        let steps = schedule_steps(now.saturating_sub(previous), port.frame_duration());
        if steps > 0 {
            port.set_default_schedule_time(steps);
            self.stats.write().frames_skipped += steps;
            warn!(
                "{}: output stalled, schedule advanced by {} frames",
                self.settings.name, steps
            );
        }
    }

    fn next_timecode(&mut self) -> Option<Timecode> {
        if let Some(timecode) = self.timecode_override.take() {
            return Some(timecode);
        }
        match self.settings.timecode_mode {
            OutputTimecodeMode::Auto => None,
            OutputTimecodeMode::SameAsInput => self
                .input_link
                .as_ref()
                .and_then(|(_, input)| input.lock().timestamp()),
            OutputTimecodeMode::TimecodeSource => self
                .timecode_source
                .as_ref()
                .and_then(|source| source.current_timecode()),
            OutputTimecodeMode::TimecodeSynchronizer => self
                .synchronizer
                .as_ref()
                .and_then(|sync| sync.current_timecode()),
        }
    }

    fn encode_frame_and_add_to_queue(&mut self) {
        let Some(port) = self.port.as_ref() else {
            return;
        };
        let (width, height) = port.frame_dimensions();
        if width <= 1 || height <= 1 {
            return;
        }
        let progressive = port.is_progressive();
        let (row_bytes, rows, _) = port.backing_frame_byte_dimensions();

        let Some(texture) = self.source.as_mut().and_then(|source| source.acquire()) else {
            return;
        };

        let target = PackTarget {
            width: row_bytes / 4,
            height: rows,
            pixel_format: self.applied.pixel_format,
            color_space: self.applied.color_space,
            transfer_function: self.applied.transfer_function,
        };

        let packed = if progressive {
            self.gpu.pack(texture, &target)
        } else {
            match self.odd_field.take() {
                None => {
                    self.odd_field = Some(self.gpu.copy_field(texture, width, height));
                    return;
                }
                Some(odd) => {
                    let packed = self.gpu.pack_interlaced(odd, texture, &target);
                    self.gpu.release(odd);
                    packed
                }
            }
        };

        let timecode = self.next_timecode();
        let pending = if self.applied.gpu_direct {
            PendingFrame::Texture(packed)
        } else {
            PendingFrame::Readback {
                request: self.gpu.request_readback(packed),
                texture: packed,
            }
        };

        self.queue.push_back(QueuedFrame {
            sequence: self.next_sequence,
            pending,
            timecode,
        });
        self.next_sequence += 1;
        self.stats.write().frames_queued += 1;
    }

    fn process_frame_queue(&mut self, synchronous: bool) {
        loop {
            let readiness = match self.queue.front_mut() {
                None => break,
                Some(entry) => match &mut entry.pending {
                    PendingFrame::Texture(_) => Readiness::Ready,
                    PendingFrame::Readback { request, .. } => {
                        if synchronous && !request.has_error() && !request.is_done() {
                            request.wait_for_completion();
                        }
                        if request.has_error() {
                            Readiness::Failed
                        } else if request.is_done() {
                            Readiness::Ready
                        } else {
                            Readiness::Pending
                        }
                    }
                },
            };

            match readiness {
                Readiness::Pending => break,
                Readiness::Failed => {
                    if let Some(entry) = self.queue.pop_front() {
                        warn!(
                            "{}: GPU readback error was detected (frame {}).",
                            self.settings.name, entry.sequence
                        );
                        self.release_entry(entry);
                        self.frame_count += 1;
                        self.stats.write().frames_dropped += 1;
                    }
                }
                Readiness::Ready => {
                    if let Some(entry) = self.queue.pop_front() {
                        self.feed_entry(entry);
                    }
                }
            }
        }
    }

    fn feed_entry(&mut self, entry: QueuedFrame) {
        if let Some(port) = self.port.as_mut() {
            let frame_duration = port.frame_duration();
            let timecode = match entry.timecode {
                Some(timecode) => Ok(timecode),
                None => Timecode::from_flicks(
                    frame_duration,
                    self.frame_count as i64 * frame_duration,
                    false,
                ),
            };

            match timecode {
                Ok(timecode) => {
                    let payload = match &entry.pending {
                        PendingFrame::Readback { request, .. } => {
                            FramePayload::Bytes(request.data())
                        }
                        PendingFrame::Texture(texture) => FramePayload::Texture(*texture),
                    };
                    port.feed_frame(payload, timecode);
                    self.frame_count += 1;
                    self.stats.write().frames_fed += 1;
                }
                Err(e) => warn!("{}: frame not scheduled: {}", self.settings.name, e),
            }
        }
        self.release_entry(entry);
    }

    fn apply_backpressure(&mut self) {
        if self.applied.sync_mode != SyncMode::Manual {
            return;
        }
        let queue_length = self.settings.queue_length as u64;
        if self.frame_count > queue_length {
            if let Some(port) = self.port.as_mut() {
                port.wait_completion(self.frame_count - queue_length);
            }
        }
    }

    fn poll_frame_errors(&mut self) {
        let Some(status) = self.port.as_mut().and_then(|port| port.take_frame_error()) else {
            return;
        };
        match status.kind {
            StatusType::Error => error!("{}: {}", self.settings.name, status.message),
            _ => warn!("{}: {}", self.settings.name, status.message),
        }
        self.state.status = status;
    }

    // A running device reopens its port; a stopped one retries its start.
    fn schedule_reinit(&mut self) {
        if self.state.initialized {
            self.state.requires_reinit = true;
        } else if self.state.slot.is_none() {
            self.state.mark_dirty();
        }
    }

    /// Sets the frame source. Reopens the device if it is running.
    pub fn set_frame_source(&mut self, source: Option<Box<dyn FrameSource>>) {
        self.source = source;
        self.schedule_reinit();
    }

    /// Whether a frame source is set.
    pub fn has_frame_source(&self) -> bool {
        self.source.is_some()
    }

    /// Changes the keying mode.
    ///
    /// Recorded without touching the card while the device is not active.
    /// On an active device an incompatible mode, or any keying with BT.2020,
    /// is rejected and the previous mode stays. Returns whether the mode
    /// was taken.
    pub fn change_keying_mode(&mut self, mode: KeyingMode) -> bool {
        if self.settings.keying_mode == mode {
            return false;
        }

        let active = self.state.is_active();
        let Some(port) = self.port.as_mut().filter(|_| active) else {
            self.settings.keying_mode = mode;
            return true;
        };

        if mode == KeyingMode::None {
            if self.keying_initialized {
                port.disable_keying();
                self.keying_initialized = false;
            }
            self.settings.keying_mode = mode;
            info!("{}: keying disabled", self.settings.name);
            return true;
        }

        if self.applied.color_space == ColorSpace::Bt2020
            || !self.applied.pixel_format.is_keying_available()
            || !port.is_keying_mode_compatible(mode)
        {
            warn!(
                "{}: keying mode {:?} is not compatible with the current configuration",
                self.settings.name, mode
            );
            return false;
        }

        let changed = if self.keying_initialized {
            port.change_keying_mode(mode)
        } else {
            port.initialize_keying(mode)
        };

        if changed {
            self.keying_initialized = true;
            self.settings.keying_mode = mode;
            info!("{}: keying set to {:?}", self.settings.name, mode);
        } else {
            warn!("{}: failed to set keying mode {:?}", self.settings.name, mode);
        }
        changed
    }

    /// Changes the link mode. Same rules as [`change_keying_mode`](Self::change_keying_mode)
    /// without the color space restriction.
    pub fn change_link_mode(&mut self, mode: LinkMode) -> bool {
        if self.settings.link_mode == mode {
            return false;
        }

        let active = self.state.is_active();
        let Some(port) = self.port.as_mut().filter(|_| active) else {
            self.settings.link_mode = mode;
            return true;
        };

        if !port.is_link_compatible(mode) {
            warn!(
                "{}: This selected Link Mode is not compatible with this device.",
                self.settings.name
            );
            return false;
        }

        if port.set_link_mode(mode) {
            self.settings.link_mode = mode;
            info!("{}: link mode set to {:?}", self.settings.name, mode);
            true
        } else {
            warn!("{}: failed to set link mode {:?}", self.settings.name, mode);
            false
        }
    }

    /// Selects an explicit video mode. Reopens the device when it changed.
    pub fn change_video_configuration(
        &mut self,
        resolution: Resolution,
        frame_rate: FrameRate,
        scan_mode: ScanMode,
    ) -> bool {
        let setting = VideoModeSetting {
            resolution,
            frame_rate,
            scan_mode,
        };
        if self.settings.video_mode == setting {
            return false;
        }
        if setting.resolve().is_none() {
            warn!(
                "{}: {} is not a registered video mode",
                self.settings.name,
                format_mode_name(resolution, frame_rate, scan_mode)
            );
        }
        self.settings.video_mode = setting;
        self.schedule_reinit();
        true
    }

    /// Changes the resolution of the explicit video mode.
    pub fn change_video_resolution(&mut self, resolution: Resolution) -> bool {
        let current = self.settings.video_mode;
        self.change_video_configuration(resolution, current.frame_rate, current.scan_mode)
    }

    /// Changes the frame rate of the explicit video mode.
    pub fn change_video_frame_rate(&mut self, frame_rate: FrameRate) -> bool {
        let current = self.settings.video_mode;
        self.change_video_configuration(current.resolution, frame_rate, current.scan_mode)
    }

    /// Changes the scan mode of the explicit video mode.
    pub fn change_video_scan_mode(&mut self, scan_mode: ScanMode) -> bool {
        let current = self.settings.video_mode;
        self.change_video_configuration(current.resolution, current.frame_rate, scan_mode)
    }

    /// Mirrors the video mode of an input device, or stops mirroring.
    pub fn change_same_video_mode_as_input(&mut self, link: Option<InputLink>) {
        let name = link.as_ref().map(|(name, _)| name.clone());
        if name == self.settings.same_as_input && link.is_some() == self.input_link.is_some() {
            return;
        }
        self.settings.same_as_input = name;
        self.input_link = link;
        self.schedule_reinit();
    }

    /// Drops the link to the mirrored input, keeping its name. The device
    /// reports a missing input on its next initialization.
    pub fn detach_input(&mut self) {
        if self.input_link.take().is_some() {
            self.schedule_reinit();
        }
    }

    /// Changes the requested pixel format. Applied on the next update.
    pub fn change_pixel_format(&mut self, pixel_format: PixelFormat) -> bool {
        let changed = self.settings.pixel_format != pixel_format;
        self.settings.pixel_format = pixel_format;
        changed
    }

    /// Changes the requested color space. Applied on the next update.
    pub fn change_color_space(&mut self, color_space: ColorSpace) -> bool {
        let changed = self.settings.color_space != color_space;
        self.settings.color_space = color_space;
        changed
    }

    /// Changes the requested transfer function. Applied on the next update.
    pub fn change_transfer_function(&mut self, transfer_function: TransferFunction) -> bool {
        let changed = self.settings.transfer_function != transfer_function;
        self.settings.transfer_function = transfer_function;
        changed
    }

    /// Changes the requested sync mode. Applied on the next update.
    pub fn change_sync_mode(&mut self, sync_mode: SyncMode) -> bool {
        let changed = self.settings.sync_mode != sync_mode;
        self.settings.sync_mode = sync_mode;
        changed
    }

    /// Requests GPU-direct feeding. Applied on the next update.
    pub fn set_gpu_direct(&mut self, gpu_direct: bool) {
        self.settings.gpu_direct = gpu_direct;
    }

    /// Drains the queue synchronously every tick.
    pub fn set_low_latency(&mut self, low_latency: bool) {
        self.settings.low_latency = low_latency;
    }

    /// Changes the queue length, clamped to the allowed range.
    pub fn set_queue_length(&mut self, queue_length: usize) {
        self.settings.queue_length = queue_length;
        self.settings.normalize();
    }

    /// Changes the preroll length. Reopens the device.
    pub fn set_preroll_length(&mut self, preroll_length: u32) {
        if self.settings.preroll_length != preroll_length {
            self.settings.preroll_length = preroll_length;
            self.settings.normalize();
            self.schedule_reinit();
        }
    }

    /// Stamps the next queued frame with a timecode.
    pub fn set_timecode_override(&mut self, timecode: Option<Timecode>) {
        self.timecode_override = timecode;
    }

    /// Selects where frames take their timecode from.
    pub fn set_timecode_mode(&mut self, mode: OutputTimecodeMode) {
        self.settings.timecode_mode = mode;
    }

    /// Clock used in [`OutputTimecodeMode::TimecodeSource`].
    pub fn set_timecode_source(&mut self, source: Option<Arc<dyn TimecodeProvider>>) {
        self.timecode_source = source;
    }

    /// Clock used in [`OutputTimecodeMode::TimecodeSynchronizer`].
    pub fn set_timecode_synchronizer(&mut self, synchronizer: Option<Arc<dyn TimecodeProvider>>) {
        self.synchronizer = synchronizer;
    }

    /// Tick period in flicks: the card frame, or one field when interlaced.
    pub fn frame_duration(&self) -> i64 {
        match &self.port {
            Some(port) if port.is_progressive() => port.frame_duration(),
            Some(port) => port.frame_duration() / 2,
            None => 0,
        }
    }

    /// Frame size in pixels, `(0, 0)` while closed.
    pub fn frame_dimensions(&self) -> (u32, u32) {
        self.port
            .as_ref()
            .map(|port| port.frame_dimensions())
            .unwrap_or((0, 0))
    }

    /// Mode the port was opened with.
    pub fn video_mode(&self) -> Option<&'static VideoMode> {
        self.applied_mode
            .and_then(|code| registry().mode_from_sdk(code))
    }

    /// Mode name, "Not defined" while closed.
    pub fn format_name(&self) -> &str {
        &self.format_name
    }

    /// Applied sync mode.
    pub fn sync_mode(&self) -> SyncMode {
        self.applied.sync_mode
    }

    /// Whether frames are fed as textures.
    pub fn is_gpu_direct(&self) -> bool {
        self.applied.gpu_direct
    }

    /// Requested keying mode.
    pub fn keying_mode(&self) -> KeyingMode {
        self.settings.keying_mode
    }

    /// Requested link mode.
    pub fn link_mode(&self) -> LinkMode {
        self.settings.link_mode
    }

    /// Frames the card dropped.
    pub fn dropped_frame_count(&self) -> u32 {
        self.port.as_ref().map(|p| p.dropped_frame_count()).unwrap_or(0)
    }

    /// Frames the card displayed late.
    pub fn late_frame_count(&self) -> u32 {
        self.port.as_ref().map(|p| p.late_frame_count()).unwrap_or(0)
    }

    /// Locked to a reference signal.
    pub fn is_genlocked(&self) -> bool {
        self.port
            .as_ref()
            .map(|p| p.is_reference_locked())
            .unwrap_or(false)
    }

    /// Frames scheduled on the card, including dropped queue entries.
    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    /// Entries waiting in the queue.
    pub fn queued_frames(&self) -> usize {
        self.queue.len()
    }

    /// Whether an odd field waits for its pair.
    pub fn has_cached_field(&self) -> bool {
        self.odd_field.is_some()
    }

    /// Whether a port is open.
    pub fn has_port(&self) -> bool {
        self.port.is_some()
    }

    /// Name of the mirrored input device.
    pub fn same_as_input(&self) -> Option<&str> {
        self.settings.same_as_input.as_deref()
    }

    /// Snapshot of the counters.
    pub fn stats(&self) -> OutputStats {
        self.stats.read().clone()
    }

    /// Shared handle to the counters.
    pub fn stats_handle(&self) -> Arc<RwLock<OutputStats>> {
        Arc::clone(&self.stats)
    }
}

impl VideoDevice for OutputDevice {
    fn name(&self) -> &str {
        &self.settings.name
    }

    fn device_type(&self) -> VideoDeviceType {
        VideoDeviceType::Output
    }

    fn state(&self) -> &DeviceState {
        &self.state
    }

    fn state_mut(&mut self) -> &mut DeviceState {
        &mut self.state
    }

    fn initialize(&mut self, slot: usize) -> bool {
        self.state.slot = Some(slot);
        self.destroy_resources();
        let ok = self.initialize_resources(slot);
        self.state.requires_reinit = false;
        self.resources_updated = ok;
        self.previous_time = None;
        ok
    }

    fn cleanup(&mut self) {
        self.destroy_resources();
        self.format_name = SIGNAL_NOT_DEFINED.to_string();
        self.state.initialized = false;
        self.state.slot = None;
    }

    fn perform_update(&mut self, now: Duration) {
        self.poll_same_as_input();
        self.update_resources();

        if !self.state.is_active() || self.source.is_none() || self.port.is_none() {
            return;
        }

        if self.resources_updated {
            self.previous_time = Some(now);
        } else {
            self.recover_stalled_schedule(now);
        }

        self.encode_frame_and_add_to_queue();
        self.process_frame_queue(self.settings.low_latency);
        self.apply_backpressure();
        self.poll_frame_errors();
    }
}

impl Drop for OutputDevice {
    fn drop(&mut self) {
        self.destroy_resources();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use deckflow_core::frame_duration_from_rate;

    #[test]
    fn test_schedule_steps_below_threshold() {
        let fd = frame_duration_from_rate(50, 1);
        assert_eq!(schedule_steps(Duration::from_millis(1000), fd), 0);
        assert_eq!(schedule_steps(Duration::from_millis(20), fd), 0);
    }

    #[test]
    fn test_schedule_steps_rounds_half_up() {
        let fd = frame_duration_from_rate(50, 1);
        // 50.5 frames
        assert_eq!(schedule_steps(Duration::from_millis(1010), fd), 51);
        assert_eq!(schedule_steps(Duration::from_secs(3), fd), 150);
    }

    #[test]
    fn test_schedule_steps_ignores_bad_duration() {
        assert_eq!(schedule_steps(Duration::from_secs(10), 0), 0);
    }

    proptest::proptest! {
        #[test]
        fn schedule_steps_land_within_half_a_frame(
            rate_index in 0usize..FrameRate::COUNT,
            millis in 0u64..600_000,
        ) {
            let fd = FrameRate::ALL[rate_index].frame_duration();
            let elapsed = Duration::from_millis(millis);
            let steps = schedule_steps(elapsed, fd);
            let flicks = millis as i128 * FLICKS_PER_SECOND as i128 / 1000;

            if flicks <= STALL_THRESHOLD_FRAMES * fd as i128 {
                proptest::prop_assert_eq!(steps, 0);
            } else {
                let error = (steps as i128 * fd as i128 - flicks).abs();
                proptest::prop_assert!(2 * error <= fd as i128);
            }
        }
    }
}
