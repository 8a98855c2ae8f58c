//! Persisted settings
//!
//! Plain serde structures read at startup and whenever a device is
//! reconfigured. Every struct uses `#[serde(default)]` so partially written
//! files still load.

use crate::connector::{ConnectorMapping, KeyingMode, LinkMode};
use crate::logging::LogConfig;
use crate::pixel_format::{ColorSpace, PixelFormat, TransferFunction};
use crate::video_mode::{registry, FrameRate, Resolution, ScanMode, VideoMode};
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Smallest allowed frame queue length.
pub const MIN_QUEUE_LENGTH: usize = 1;
/// Largest allowed frame queue length.
pub const MAX_QUEUE_LENGTH: usize = 8;
/// Default frame queue length.
pub const DEFAULT_QUEUE_LENGTH: usize = 3;
/// Largest allowed preroll, in frames.
pub const MAX_PREROLL_LENGTH: u32 = 6;

/// How output frames are paced.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SyncMode {
    /// The host clock follows the output device
    #[default]
    Manual,
    /// The device schedules frames on its own clock
    Async,
}

/// Where an output device takes its timecode from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OutputTimecodeMode {
    /// Count frames
    #[default]
    Auto,
    /// Mirror the bound input device
    SameAsInput,
    /// External timecode source
    TimecodeSource,
    /// External timecode synchronizer
    TimecodeSynchronizer,
}

/// A (resolution, frame rate, scan mode) choice as stored on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VideoModeSetting {
    /// Frame size
    pub resolution: Resolution,
    /// Frame rate
    pub frame_rate: FrameRate,
    /// Scan mode
    pub scan_mode: ScanMode,
}

impl Default for VideoModeSetting {
    fn default() -> Self {
        Self {
            resolution: Resolution::Hd1080,
            frame_rate: FrameRate::Fps24,
            scan_mode: ScanMode::Progressive,
        }
    }
}

impl VideoModeSetting {
    /// Resolves the choice against the registry.
    pub fn resolve(&self) -> Option<&'static VideoMode> {
        registry().mode(self.resolution, self.frame_rate, self.scan_mode)
    }

    /// The setting matching a registered mode.
    pub fn from_mode(mode: &VideoMode) -> Self {
        Self {
            resolution: mode.resolution,
            frame_rate: mode.frame_rate,
            scan_mode: mode.scan_mode,
        }
    }
}

/// Settings of one output device.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct OutputSettings {
    /// Unique device name
    pub name: String,
    /// Bound logical device, -1 when unbound
    pub device_selection: i32,
    /// Whether the device runs outside of playback
    pub enabled: bool,
    /// Frames buffered before feeding the card
    pub queue_length: usize,
    /// Frames scheduled before playback starts
    pub preroll_length: u32,
    /// Requested pixel format
    pub pixel_format: PixelFormat,
    /// Requested color space
    pub color_space: ColorSpace,
    /// Requested transfer function
    pub transfer_function: TransferFunction,
    /// Frame pacing
    pub sync_mode: SyncMode,
    /// Keying
    pub keying_mode: KeyingMode,
    /// Link mode
    pub link_mode: LinkMode,
    /// Drain the frame queue synchronously every tick
    pub low_latency: bool,
    /// Hand GPU textures to the card instead of reading them back
    pub gpu_direct: bool,
    /// Timecode origin
    pub timecode_mode: OutputTimecodeMode,
    /// Explicit video mode, ignored when `same_as_input` is set
    pub video_mode: VideoModeSetting,
    /// Input device whose mode and timecode are mirrored
    pub same_as_input: Option<String>,
}

impl Default for OutputSettings {
    fn default() -> Self {
        Self {
            name: String::new(),
            device_selection: -1,
            enabled: true,
            queue_length: DEFAULT_QUEUE_LENGTH,
            preroll_length: 3,
            pixel_format: PixelFormat::Yuv8Bit,
            color_space: ColorSpace::Bt709,
            transfer_function: TransferFunction::Hlg,
            sync_mode: SyncMode::Manual,
            keying_mode: KeyingMode::None,
            link_mode: LinkMode::Single,
            low_latency: false,
            gpu_direct: false,
            timecode_mode: OutputTimecodeMode::Auto,
            video_mode: VideoModeSetting::default(),
            same_as_input: None,
        }
    }
}

impl OutputSettings {
    /// Default settings under a name.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Clamps out-of-range values, logging each correction.
    pub fn normalize(&mut self) {
        self.queue_length = clamp_queue_length(&self.name, self.queue_length);
        if self.preroll_length > MAX_PREROLL_LENGTH {
            warn!(
                "{}: preroll {} clamped to {}",
                self.name, self.preroll_length, MAX_PREROLL_LENGTH
            );
            self.preroll_length = MAX_PREROLL_LENGTH;
        }
    }
}

/// Settings of one input device.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct InputSettings {
    /// Unique device name
    pub name: String,
    /// Bound logical device, -1 when unbound
    pub device_selection: i32,
    /// Whether the device runs outside of playback
    pub enabled: bool,
    /// Captured frames kept in the ring buffer
    pub queue_length: usize,
    /// Pixel format used when `signal_override` is set
    pub requested_pixel_format: PixelFormat,
    /// Color space override
    pub color_space: ColorSpace,
    /// Transfer function override
    pub transfer_function: TransferFunction,
    /// Use the requested pixel format instead of the detected one
    pub signal_override: bool,
}

impl Default for InputSettings {
    fn default() -> Self {
        Self {
            name: String::new(),
            device_selection: -1,
            enabled: true,
            queue_length: DEFAULT_QUEUE_LENGTH,
            requested_pixel_format: PixelFormat::UseBestQuality,
            color_space: ColorSpace::UseDeviceSignal,
            transfer_function: TransferFunction::UseDeviceSignal,
            signal_override: false,
        }
    }
}

impl InputSettings {
    /// Default settings under a name.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Pixel format the device should capture in.
    pub fn effective_pixel_format(&self) -> PixelFormat {
        if self.signal_override {
            self.requested_pixel_format
        } else {
            PixelFormat::UseBestQuality
        }
    }

    /// Clamps out-of-range values, logging each correction.
    pub fn normalize(&mut self) {
        self.queue_length = clamp_queue_length(&self.name, self.queue_length);
    }
}

fn clamp_queue_length(name: &str, length: usize) -> usize {
    let clamped = length.clamp(MIN_QUEUE_LENGTH, MAX_QUEUE_LENGTH);
    if clamped != length {
        warn!("{}: queue length {} clamped to {}", name, length, clamped);
    }
    clamped
}

/// Device manager configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct ManagerSettings {
    /// Card whose devices are managed
    pub card_index: usize,
    /// Connector mapping per card index
    pub connector_mappings: Vec<ConnectorMapping>,
    /// Input device slots
    pub inputs: Vec<InputSettings>,
    /// Output device slots
    pub outputs: Vec<OutputSettings>,
}

impl ManagerSettings {
    /// Mapping stored for a card, defaulting when none was saved.
    pub fn connector_mapping(&self, card_index: usize) -> ConnectorMapping {
        self.connector_mappings
            .get(card_index)
            .copied()
            .unwrap_or_default()
    }

    /// Stores the mapping for a card, growing the list as needed.
    pub fn set_connector_mapping(&mut self, card_index: usize, mapping: ConnectorMapping) {
        if self.connector_mappings.len() <= card_index {
            self.connector_mappings
                .resize(card_index + 1, ConnectorMapping::default());
        }
        self.connector_mappings[card_index] = mapping;
    }
}

/// One simulated card.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SimulatedCard {
    /// Card name
    pub name: String,
    /// Logical devices exposed by the card
    pub logical_devices: usize,
}

impl Default for SimulatedCard {
    fn default() -> Self {
        Self {
            name: "DeckLink Simulated".to_string(),
            logical_devices: 4,
        }
    }
}

/// Hardware used when no SDK is linked.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SimulationSettings {
    /// Simulated cards
    pub cards: Vec<SimulatedCard>,
    /// Ticks to run
    pub ticks: u64,
    /// Milliseconds between ticks
    pub tick_interval_ms: u64,
}

impl Default for SimulationSettings {
    fn default() -> Self {
        Self {
            cards: vec![SimulatedCard::default()],
            ticks: 120,
            tick_interval_ms: 16,
        }
    }
}

/// Application settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct AppSettings {
    /// Logging configuration
    pub log_config: LogConfig,
    /// Device manager configuration
    pub manager: ManagerSettings,
    /// Simulated hardware
    pub simulation: SimulationSettings,
    /// Dirty flag (has changes?) - Not serialized
    #[serde(skip)]
    pub dirty: bool,
}
