//! Card discovery and connector-mapping state.
//!
//! Cards are enumerated once when the manager is enabled. Logical devices
//! then come and go through [`DiscoveryEvent`]s, and every arrival or
//! removal rebuilds the per-card capability caches.

use super::card::DeckLinkCard;
use super::events::{discovery_channel, DiscoveryEvent, DiscoveryQueue};
use super::sdk::{DeckLinkSdk, GroupId};
use crate::error::{IoError, Result};
use deckflow_core::{
    ConnectorMapping, DeviceTypes, KeyingMode, KeyingModes, LinkMode, LinkModes, ManagerSettings,
    VideoDeviceType,
};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Whether the next capability scan also recomputes the cached
/// keying/link compatibility flags of a card.
///
/// Armed by enumeration and by every device arrival, consumed by the scan
/// that follows. Explicit mapping switches always recompute the flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompatibilityRefresh {
    /// The next scan recomputes the flags
    Armed,
    /// Flags are left as they are until re-armed
    Consumed,
}

/// Discovered cards and logical device names.
pub struct CardDiscovery {
    sdk: Arc<dyn DeckLinkSdk>,
    cards: Vec<DeckLinkCard>,
    input_names: Vec<String>,
    output_names: Vec<String>,
    refresh: CompatibilityRefresh,
    no_card_detected: bool,
    api_version: Option<String>,
    queue: Option<DiscoveryQueue>,
}

impl CardDiscovery {
    /// Creates an empty discovery bound to an SDK.
    pub fn new(sdk: Arc<dyn DeckLinkSdk>) -> Self {
        Self {
            sdk,
            cards: Vec::new(),
            input_names: Vec::new(),
            output_names: Vec::new(),
            refresh: CompatibilityRefresh::Armed,
            no_card_detected: false,
            api_version: None,
            queue: None,
        }
    }

    /// Enumerates cards and starts listening for devices.
    ///
    /// Without any card a placeholder named
    /// [`DETECTION_ERROR_CARD`](super::card::DETECTION_ERROR_CARD) is added so
    /// devices can still be configured. Stored mappings are extended to cover
    /// every card and the card index is reset when it points past the end.
    pub fn initialize(&mut self, settings: &mut ManagerSettings) -> usize {
        self.api_version = self.sdk.api_version();
        let found = self.enumerate_cards(settings);

        if found == 0 {
            warn!("No DeckLink card detected");
            self.cards.push(DeckLinkCard::placeholder());
            self.no_card_detected = true;
        } else {
            self.no_card_detected = false;
        }

        if settings.card_index >= self.cards.len() {
            settings.card_index = 0;
        }
        if settings.connector_mappings.len() < self.cards.len() {
            settings.connector_mappings.resize(self.cards.len(), ConnectorMapping::default());
        }

        let mappings: Vec<(GroupId, ConnectorMapping)> = self
            .cards
            .iter_mut()
            .enumerate()
            .map(|(i, card)| {
                card.connector_mapping = settings.connector_mapping(i);
                (card.group_id, card.connector_mapping)
            })
            .collect();

        let (sender, queue) = discovery_channel();
        self.sdk.start_discovery(sender, &mappings);
        self.queue = Some(queue);

        info!(
            "Discovery started: {} card(s), API {}",
            found,
            self.api_version.as_deref().unwrap_or("unknown")
        );
        found
    }

    fn enumerate_cards(&mut self, settings: &mut ManagerSettings) -> usize {
        self.cards.clear();
        self.refresh = CompatibilityRefresh::Armed;

        for info in self.sdk.enumerate_cards() {
            if info.name.is_empty() {
                continue;
            }
            debug!(
                "Card {}: {} ({} logical devices)",
                self.cards.len(),
                info.name,
                info.logical_devices.len()
            );
            self.cards.push(DeckLinkCard::from_info(info));
            if self.cards.len() > settings.connector_mappings.len() {
                settings
                    .connector_mappings
                    .push(ConnectorMapping::FourSubDevicesHalfDuplex);
            }
        }

        self.cards.len()
    }

    /// Stops discovery and forgets every card and device name.
    pub fn shutdown(&mut self) {
        if self.queue.take().is_some() {
            self.sdk.stop_discovery();
        }
        self.cards.clear();
        self.clear_device_names();
    }

    /// Takes the events queued since the previous call.
    pub fn poll_events(&self) -> Vec<DiscoveryEvent> {
        self.queue
            .as_ref()
            .map(DiscoveryQueue::drain)
            .unwrap_or_default()
    }

    /// Records a device arrival. Returns false for an unnamed device.
    pub fn handle_arrival(
        &mut self,
        name: &str,
        types: DeviceTypes,
        mappings: &[ConnectorMapping],
    ) -> bool {
        if name.is_empty() {
            info!("Device arrival without a name ignored");
            return false;
        }

        let is_input = types.contains(DeviceTypes::INPUT);
        let is_output = types.contains(DeviceTypes::OUTPUT);

        // A repeated arrival is not counted twice
        let new_input = is_input && insert_sorted(&mut self.input_names, name);
        let new_output = is_output && insert_sorted(&mut self.output_names, name);

        for i in 0..self.cards.len() {
            self.refresh = CompatibilityRefresh::Armed;
            self.add_compatible_connector_mapping_profiles(i, mapping_at(mappings, i));

            if new_input {
                self.cards[i].mark_used(name, VideoDeviceType::Input);
            }
            if new_output {
                self.cards[i].mark_used(name, VideoDeviceType::Output);
            }
        }

        info!("New {} device arrived: {}", describe_types(types), name);
        true
    }

    /// Records a device removal. Returns false for an unnamed device.
    pub fn handle_removal(
        &mut self,
        name: &str,
        types: DeviceTypes,
        mappings: &[ConnectorMapping],
    ) -> bool {
        if name.is_empty() {
            info!("Device removal without a name ignored");
            return false;
        }

        let gone_input =
            types.contains(DeviceTypes::INPUT) && remove_name(&mut self.input_names, name);
        let gone_output =
            types.contains(DeviceTypes::OUTPUT) && remove_name(&mut self.output_names, name);

        for i in 0..self.cards.len() {
            self.add_compatible_connector_mapping_profiles(i, mapping_at(mappings, i));

            if gone_input {
                self.cards[i].mark_unused(name, VideoDeviceType::Input);
            }
            if gone_output {
                self.cards[i].mark_unused(name, VideoDeviceType::Output);
            }
        }

        info!("{} device removed: {}", describe_types(types), name);
        true
    }

    /// Rebuilds a card's compatible mappings and keying/link sets from the
    /// SDK. The cached compatibility flags are recomputed only when a
    /// refresh is armed.
    pub fn add_compatible_connector_mapping_profiles(
        &mut self,
        card_index: usize,
        selected: ConnectorMapping,
    ) {
        let sdk = Arc::clone(&self.sdk);
        let Some(card) = self.cards.get_mut(card_index) else {
            return;
        };

        card.reset_values();
        let group = card.group_id;

        for mapping in ConnectorMapping::ALL {
            if sdk.is_connector_mapping_compatible(group, mapping)
                && !card.compatible_mappings.contains(&mapping)
            {
                card.compatible_mappings.push(mapping);
            }
        }

        card.compatible_link_modes = LinkMode::ALL
            .into_iter()
            .filter(|&mode| sdk.is_link_mode_compatible(group, mode))
            .fold(LinkModes::empty(), |acc, mode| acc | mode.flag());

        card.compatible_keying_modes = KeyingMode::ALL
            .into_iter()
            .filter(|&mode| mode != KeyingMode::None)
            .filter(|&mode| sdk.is_keying_mode_compatible(group, mode))
            .fold(KeyingModes::empty(), |acc, mode| acc | mode.flag());

        if self.refresh == CompatibilityRefresh::Armed {
            let link_modes_known = !card.compatible_link_modes.is_empty();
            let keying_modes_known = !card.compatible_keying_modes.is_empty();
            cache_link_mode_compatibility(card, selected, link_modes_known);
            cache_keying_compatibility(card, selected, keying_modes_known);
            self.refresh = CompatibilityRefresh::Consumed;
        }
    }

    /// Switches every connector of a card to `mapping`.
    ///
    /// Mappings the card does not list as compatible are not sent to the
    /// hardware; devices are reloaded instead and the card keeps its current
    /// mapping. Either way the cached compatibility flags are recomputed for
    /// `mapping`. Returns whether the hardware switched.
    pub fn changed_devices_duplex_mode(
        &mut self,
        mapping: ConnectorMapping,
        card_index: usize,
    ) -> Result<bool> {
        if card_index >= self.cards.len() {
            error!("Invalid DeckLink card index {}", card_index);
            return Err(IoError::InvalidParameter(format!(
                "card index {card_index} out of range"
            )));
        }

        // Counts are rebuilt from the arrivals that follow
        self.reset_used_devices();
        self.clear_device_names();

        let card = &self.cards[card_index];
        let group = card.group_id;
        let changed = if card.compatible_mappings.contains(&mapping) {
            let changed = self.sdk.change_connector_mapping(group, mapping);
            info!(
                "Set all devices to {} mode: {}",
                mapping,
                if changed { "succeeded" } else { "failed" }
            );
            changed
        } else {
            self.sdk.reload_devices();
            warn!(
                "The DeckLink card used is not compatible with the selected connector mapping {}",
                mapping
            );
            false
        };

        let card = &mut self.cards[card_index];
        if changed {
            card.connector_mapping = mapping;
        }
        cache_link_mode_compatibility(card, mapping, changed);
        cache_keying_compatibility(card, mapping, changed);

        Ok(changed)
    }

    /// Whether the selected mapping is one the card accepts.
    pub fn is_current_mapping_compatible(
        &self,
        card_index: usize,
        selected: ConnectorMapping,
    ) -> bool {
        self.cards
            .get(card_index)
            .map(|card| card.compatible_mappings.contains(&selected))
            .unwrap_or(false)
    }

    /// Card exposing an output logical device.
    pub fn card_from_logical_device(&self, logical_index: i32) -> Option<&DeckLinkCard> {
        let name = self.output_names.get(usize::try_from(logical_index).ok()?)?;
        self.cards.iter().find(|card| card.owns(name))
    }

    /// Cached `(keying, link)` compatibility of the card exposing an output
    /// logical device, `(false, false)` when unknown.
    pub fn is_keying_and_link_mode_supported(&self, logical_index: i32) -> (bool, bool) {
        self.card_from_logical_device(logical_index)
            .map(|card| (card.is_keying_compatible, card.is_link_mode_compatible))
            .unwrap_or((false, false))
    }

    /// Position of a card's first device of a type among all devices of that
    /// type, counting unused logical devices of the preceding cards.
    pub fn offset_from_device_index(&self, device_index: i32, device_type: VideoDeviceType) -> usize {
        let Ok(index) = usize::try_from(device_index) else {
            return 0;
        };
        let Some(name) = self.device_names(device_type).get(index) else {
            return 0;
        };

        let mut offset = 0;
        for card in &self.cards {
            if card.owns(name) {
                break;
            }
            offset += card
                .logical_devices
                .len()
                .saturating_sub(card.used_devices(device_type));
        }
        offset
    }

    /// Sorted logical device names of a type.
    pub fn device_names(&self, device_type: VideoDeviceType) -> &[String] {
        match device_type {
            VideoDeviceType::Input => &self.input_names,
            VideoDeviceType::Output => &self.output_names,
        }
    }

    /// Position of a logical device name.
    pub fn device_index(&self, name: &str, device_type: VideoDeviceType) -> Option<usize> {
        self.device_names(device_type).iter().position(|n| n == name)
    }

    /// Forgets every logical device name.
    pub fn clear_device_names(&mut self) {
        self.input_names.clear();
        self.output_names.clear();
    }

    /// Zeroes the per-card device counts.
    pub fn reset_used_devices(&mut self) {
        for card in &mut self.cards {
            card.used_input_devices = 0;
            card.used_output_devices = 0;
        }
    }

    /// Discovered cards.
    pub fn cards(&self) -> &[DeckLinkCard] {
        &self.cards
    }

    /// Card by index.
    pub fn card(&self, index: usize) -> Option<&DeckLinkCard> {
        self.cards.get(index)
    }

    /// True when only the placeholder card exists.
    pub fn no_card_detected(&self) -> bool {
        self.no_card_detected
    }

    /// SDK version string.
    pub fn api_version(&self) -> Option<&str> {
        self.api_version.as_deref()
    }

    /// Current refresh state.
    pub fn compatibility_refresh(&self) -> CompatibilityRefresh {
        self.refresh
    }
}

// Cards without any mapping (single-connector models) cannot be judged
// from the mapping, so the flag stays set.
fn cache_link_mode_compatibility(card: &mut DeckLinkCard, mapping: ConnectorMapping, changed: bool) {
    card.is_link_mode_compatible = if !changed || card.compatible_mappings.is_empty() {
        true
    } else {
        mapping.supports_link_modes()
    };
}

fn cache_keying_compatibility(card: &mut DeckLinkCard, mapping: ConnectorMapping, changed: bool) {
    card.is_keying_compatible = if !changed && card.compatible_mappings.is_empty() {
        true
    } else {
        mapping.supports_keying()
    };
}

fn mapping_at(mappings: &[ConnectorMapping], index: usize) -> ConnectorMapping {
    mappings.get(index).copied().unwrap_or_default()
}

/// Returns whether the name was new.
fn insert_sorted(names: &mut Vec<String>, name: &str) -> bool {
    match names.binary_search_by(|n| n.as_str().cmp(name)) {
        Ok(_) => false,
        Err(pos) => {
            names.insert(pos, name.to_string());
            true
        }
    }
}

/// Returns whether the name was present.
fn remove_name(names: &mut Vec<String>, name: &str) -> bool {
    let before = names.len();
    names.retain(|n| n != name);
    names.len() != before
}

fn describe_types(types: DeviceTypes) -> &'static str {
    match (
        types.contains(DeviceTypes::INPUT),
        types.contains(DeviceTypes::OUTPUT),
    ) {
        (true, true) => "InputOutput",
        (true, false) => "Input",
        (false, true) => "Output",
        (false, false) => "Unused",
    }
}
