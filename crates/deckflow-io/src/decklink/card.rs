//! Per-card discovery state.

use super::sdk::{CardInfo, GroupId};
use deckflow_core::{ConnectorMapping, KeyingModes, LinkModes, VideoDeviceType};

/// Name of the placeholder card used when no hardware is detected.
pub const DETECTION_ERROR_CARD: &str = "Detection error";

/// One physical card.
#[derive(Debug, Clone, PartialEq)]
pub struct DeckLinkCard {
    /// Hardware model name
    pub name: String,
    /// Hardware group id
    pub group_id: GroupId,
    /// Logical device names exposed at enumeration
    pub logical_devices: Vec<String>,
    /// Mappings the card accepts
    pub compatible_mappings: Vec<ConnectorMapping>,
    /// Mapping applied to the hardware
    pub connector_mapping: ConnectorMapping,
    /// Input devices reported for this card
    pub used_input_devices: usize,
    /// Output devices reported for this card
    pub used_output_devices: usize,
    /// Link modes supported under the current mapping
    pub compatible_link_modes: LinkModes,
    /// Keying modes supported under the current mapping
    pub compatible_keying_modes: KeyingModes,
    /// Link mode controls apply to the selected mapping
    pub is_link_mode_compatible: bool,
    /// Keying controls apply to the selected mapping
    pub is_keying_compatible: bool,
}

impl DeckLinkCard {
    /// A card with no capability information yet.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            group_id: 0,
            logical_devices: Vec::new(),
            compatible_mappings: Vec::new(),
            connector_mapping: ConnectorMapping::default(),
            used_input_devices: 0,
            used_output_devices: 0,
            compatible_link_modes: LinkModes::empty(),
            compatible_keying_modes: KeyingModes::empty(),
            is_link_mode_compatible: true,
            is_keying_compatible: true,
        }
    }

    /// The placeholder card standing in for missing hardware.
    pub fn placeholder() -> Self {
        Self::new(DETECTION_ERROR_CARD)
    }

    /// Builds a card from enumeration data.
    pub fn from_info(info: CardInfo) -> Self {
        let mut card = Self::new(info.name);
        card.group_id = info.group_id;
        card.logical_devices = info.logical_devices;
        card
    }

    /// Clears everything derived from SDK capability queries.
    pub fn reset_values(&mut self) {
        self.compatible_mappings.clear();
        self.compatible_link_modes = LinkModes::empty();
        self.compatible_keying_modes = KeyingModes::empty();
    }

    /// Whether a logical device belongs to this card.
    pub fn owns(&self, logical_device: &str) -> bool {
        self.logical_devices.iter().any(|d| d == logical_device)
    }

    /// Devices of a type reported for this card.
    pub fn used_devices(&self, device_type: VideoDeviceType) -> usize {
        match device_type {
            VideoDeviceType::Input => self.used_input_devices,
            VideoDeviceType::Output => self.used_output_devices,
        }
    }

    /// Counts a reported device if it belongs to this card.
    pub fn mark_used(&mut self, logical_device: &str, device_type: VideoDeviceType) {
        if !self.owns(logical_device) {
            return;
        }
        match device_type {
            VideoDeviceType::Input => self.used_input_devices += 1,
            VideoDeviceType::Output => self.used_output_devices += 1,
        }
    }

    /// Uncounts a removed device if it belongs to this card.
    pub fn mark_unused(&mut self, logical_device: &str, device_type: VideoDeviceType) {
        if !self.owns(logical_device) {
            return;
        }
        let used = match device_type {
            VideoDeviceType::Input => &mut self.used_input_devices,
            VideoDeviceType::Output => &mut self.used_output_devices,
        };
        *used = used.saturating_sub(1);
    }
}
