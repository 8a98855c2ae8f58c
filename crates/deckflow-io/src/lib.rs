//! DeckFlow IO - DeckLink Device Layer
//!
//! This crate drives DeckLink capture cards through an abstract SDK,
//! including:
//! - Card discovery and connector mapping management
//! - Input and output device pipelines
//! - The device manager and per-tick scheduler
//! - Versioned settings files (RON, JSON, TOML)
//!
//! With the `simulation` feature (on by default) a simulated SDK and GPU are
//! available for tests and demos.

#![warn(missing_docs)]

pub mod config;
pub mod decklink;
pub mod error;
pub mod settings_file;

pub use config::{load_settings, save_settings};
pub use decklink::{
    DeckLinkCard, DeckLinkManager, DeckLinkSdk, DeviceHandle, DeviceRecord, FrameScheduler,
    FrameSource, GpuBackend, InputDevice, OutputDevice, SchedulerIssue, VideoDevice,
};
pub use error::{IoError, Result};
pub use settings_file::{SettingsFile, SettingsFormat, SettingsMetadata};
