//! DeckFlow Core - Domain Model for DeckLink Video I/O
//!
//! This crate contains the hardware-independent model shared by the device
//! layer, including:
//! - Video mode registry and per-device support maps
//! - Flick-based timecode with SMPTE BCD conversion
//! - Pixel formats, color spaces and transfer functions
//! - Connector mappings, keying and link modes
//! - Persisted settings and logging configuration

#![warn(missing_docs)]

use thiserror::Error;

pub mod connector;
pub mod logging;
pub mod pixel_format;
pub mod settings;
pub mod status;
pub mod timecode;
pub mod video_mode;

// --- Re-exports grouped by category ---

// Video Modes
pub use video_mode::{
    registry, FrameRate, Resolution, ScanMode, SupportMap, VideoMode, VideoModeRegistry,
    UNKNOWN_MODE_CODE,
};

// Timing
pub use timecode::{frame_duration_from_rate, Timecode, FLICKS_PER_SECOND};

// Signal Formats
pub use pixel_format::{ColorSpace, PixelFormat, TransferFunction};

// Cards & Devices
pub use connector::{
    ConnectorMapping, DeviceTypes, KeyingMode, KeyingModes, LinkMode, LinkModes, VideoDeviceType,
};
pub use status::{DeviceStatus, StatusType};

// Logging & Settings
pub use logging::LogConfig;
pub use settings::{
    AppSettings, InputSettings, ManagerSettings, OutputSettings, OutputTimecodeMode,
    SimulatedCard, SimulationSettings, SyncMode, VideoModeSetting,
};

/// Format name reported while no signal has been detected.
pub const SIGNAL_NOT_DEFINED: &str = "Not defined";

/// Core error types
#[derive(Error, Debug)]
pub enum CoreError {
    /// Timecode components or durations out of range
    #[error("Invalid timecode: {0}")]
    InvalidTimecode(String),

    /// No registered mode matches
    #[error("Unknown video mode: {0}")]
    UnknownVideoMode(String),

    /// Settings value out of range
    #[error("Invalid settings: {0}")]
    InvalidSettings(String),
}

/// Result type for core operations
pub type Result<T> = std::result::Result<T, CoreError>;

/// Looks up a mode by triple, reporting the triple on failure.
pub fn require_mode(
    resolution: Resolution,
    frame_rate: FrameRate,
    scan_mode: ScanMode,
) -> Result<&'static VideoMode> {
    registry()
        .mode(resolution, frame_rate, scan_mode)
        .ok_or_else(|| {
            CoreError::UnknownVideoMode(video_mode::format_mode_name(
                resolution, frame_rate, scan_mode,
            ))
        })
}
