//! Connector mappings, keying and link modes.
//!
//! A card's connector mapping (duplex profile) decides how many logical
//! devices it exposes and whether an input and an output may share one.
//! Keying and link modes are single values when requested by a device and
//! bit-flag sets when describing what a card supports.

use bitflags::bitflags;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Duplex profile of a card.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub enum ConnectorMapping {
    /// Four half-duplex logical devices
    #[default]
    FourSubDevicesHalfDuplex,
    /// One full-duplex logical device
    OneSubDeviceFullDuplex,
    /// One half-duplex logical device
    OneSubDeviceHalfDuplex,
    /// Two full-duplex logical devices
    TwoSubDevicesFullDuplex,
    /// Two half-duplex logical devices
    TwoSubDevicesHalfDuplex,
}

impl ConnectorMapping {
    /// Every mapping, in the order compatibility is probed.
    pub const ALL: [ConnectorMapping; 5] = [
        ConnectorMapping::FourSubDevicesHalfDuplex,
        ConnectorMapping::OneSubDeviceFullDuplex,
        ConnectorMapping::OneSubDeviceHalfDuplex,
        ConnectorMapping::TwoSubDevicesFullDuplex,
        ConnectorMapping::TwoSubDevicesHalfDuplex,
    ];

    /// Half-duplex mappings allow a logical index to be held by one device
    /// of either type; full-duplex ones allow one input and one output.
    pub fn is_unique_index(self) -> bool {
        matches!(
            self,
            ConnectorMapping::FourSubDevicesHalfDuplex
                | ConnectorMapping::OneSubDeviceHalfDuplex
                | ConnectorMapping::TwoSubDevicesHalfDuplex
        )
    }

    /// Whether keying can be used under this mapping.
    pub fn supports_keying(self) -> bool {
        matches!(
            self,
            ConnectorMapping::OneSubDeviceFullDuplex
                | ConnectorMapping::OneSubDeviceHalfDuplex
                | ConnectorMapping::TwoSubDevicesFullDuplex
        )
    }

    /// Whether dual/quad link can be used under this mapping.
    pub fn supports_link_modes(self) -> bool {
        matches!(
            self,
            ConnectorMapping::OneSubDeviceFullDuplex | ConnectorMapping::OneSubDeviceHalfDuplex
        )
    }

    /// Returns the mapping name as a string.
    pub fn name(self) -> &'static str {
        match self {
            ConnectorMapping::FourSubDevicesHalfDuplex => "FourSubDevicesHalfDuplex",
            ConnectorMapping::OneSubDeviceFullDuplex => "OneSubDeviceFullDuplex",
            ConnectorMapping::OneSubDeviceHalfDuplex => "OneSubDeviceHalfDuplex",
            ConnectorMapping::TwoSubDevicesFullDuplex => "TwoSubDevicesFullDuplex",
            ConnectorMapping::TwoSubDevicesHalfDuplex => "TwoSubDevicesHalfDuplex",
        }
    }
}

impl fmt::Display for ConnectorMapping {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Keying requested by an output device.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum KeyingMode {
    /// No keying
    #[default]
    None,
    /// Key and fill on separate connectors
    External,
    /// Keyed onto the input signal by the card
    Internal,
}

impl KeyingMode {
    /// Every keying mode.
    pub const ALL: [KeyingMode; 3] = [KeyingMode::None, KeyingMode::External, KeyingMode::Internal];

    /// Matching flag.
    pub fn flag(self) -> KeyingModes {
        match self {
            KeyingMode::None => KeyingModes::NONE,
            KeyingMode::External => KeyingModes::EXTERNAL,
            KeyingMode::Internal => KeyingModes::INTERNAL,
        }
    }
}

/// Link mode requested by an output device.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LinkMode {
    /// One connector
    #[default]
    Single,
    /// Two ganged connectors
    Dual,
    /// Four ganged connectors
    Quad,
}

impl LinkMode {
    /// Every link mode.
    pub const ALL: [LinkMode; 3] = [LinkMode::Single, LinkMode::Dual, LinkMode::Quad];

    /// Matching flag.
    pub fn flag(self) -> LinkModes {
        match self {
            LinkMode::Single => LinkModes::SINGLE,
            LinkMode::Dual => LinkModes::DUAL,
            LinkMode::Quad => LinkModes::QUAD,
        }
    }
}

bitflags! {
    /// Set of keying modes.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct KeyingModes: u32 {
        /// No keying
        const NONE = 1;
        /// External keying
        const EXTERNAL = 1 << 1;
        /// Internal keying
        const INTERNAL = 1 << 2;
    }
}

bitflags! {
    /// Set of link modes.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct LinkModes: u32 {
        /// Single link
        const SINGLE = 1;
        /// Dual link
        const DUAL = 1 << 1;
        /// Quad link
        const QUAD = 1 << 2;
    }
}

/// Direction of a device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum VideoDeviceType {
    /// Capture
    Input,
    /// Playout
    Output,
}

impl VideoDeviceType {
    /// Matching flag.
    pub fn flag(self) -> DeviceTypes {
        match self {
            VideoDeviceType::Input => DeviceTypes::INPUT,
            VideoDeviceType::Output => DeviceTypes::OUTPUT,
        }
    }

    /// The other direction.
    pub fn opposite(self) -> Self {
        match self {
            VideoDeviceType::Input => VideoDeviceType::Output,
            VideoDeviceType::Output => VideoDeviceType::Input,
        }
    }
}

impl fmt::Display for VideoDeviceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VideoDeviceType::Input => f.write_str("Input"),
            VideoDeviceType::Output => f.write_str("Output"),
        }
    }
}

bitflags! {
    /// Capabilities carried by a device arrival/removal notification.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct DeviceTypes: u32 {
        /// Device can capture
        const INPUT = 1;
        /// Device can play out
        const OUTPUT = 1 << 1;
    }
}
