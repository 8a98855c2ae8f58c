//! Device manager
//!
//! [`DeckLinkManager`] is the context object the host owns: it runs card
//! discovery, keeps the named input and output devices of the selected card
//! and connector mapping, enforces which logical device each of them may
//! bind, and drives them through the [`FrameScheduler`].
//!
//! Devices are grouped per `(card, mapping)` container. Switching the
//! mapping suspends the devices of the old container and brings up those
//! configured under the new one.

use super::device::{LifecycleStep, VideoDevice};
use super::discovery::CardDiscovery;
use super::events::DiscoveryEvent;
use super::handle::{ContainerKey, DeviceHandle, DeviceRecord, DeviceStore};
use super::input::InputDevice;
use super::output::OutputDevice;
use super::scheduler::{FrameScheduler, SchedulerIssue};
use super::sdk::{DeckLinkSdk, FrameSource, GpuBackend};
use crate::error::{IoError, Result};
use deckflow_core::{
    ConnectorMapping, DeviceStatus, InputSettings, ManagerSettings, OutputSettings, StatusType,
    VideoDeviceType,
};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Owns discovery, devices and the scheduler.
pub struct DeckLinkManager {
    sdk: Arc<dyn DeckLinkSdk>,
    gpu: Arc<dyn GpuBackend>,
    settings: ManagerSettings,
    discovery: CardDiscovery,
    store: DeviceStore,
    inputs: Vec<DeviceRecord>,
    outputs: Vec<DeviceRecord>,
    scheduler: FrameScheduler,
    enabled: bool,
    playing: bool,
}

impl DeckLinkManager {
    /// Builds the devices described by the settings. Nothing touches the
    /// hardware until [`enable`](Self::enable).
    pub fn new(
        mut settings: ManagerSettings,
        sdk: Arc<dyn DeckLinkSdk>,
        gpu: Arc<dyn GpuBackend>,
    ) -> Self {
        let input_settings = std::mem::take(&mut settings.inputs);
        let output_settings = std::mem::take(&mut settings.outputs);

        let mut manager = Self {
            discovery: CardDiscovery::new(Arc::clone(&sdk)),
            sdk,
            gpu,
            settings,
            store: DeviceStore::new(),
            inputs: Vec::new(),
            outputs: Vec::new(),
            scheduler: FrameScheduler::new(),
            enabled: false,
            playing: false,
        };

        for input in input_settings {
            if let Err(e) = manager.add_input(input) {
                warn!("Input device skipped: {}", e);
            }
        }
        for output in output_settings {
            if let Err(e) = manager.add_output(output) {
                warn!("Output device skipped: {}", e);
            }
        }
        manager.link_same_video_modes();
        manager
    }

    fn container_key(&self) -> ContainerKey {
        let card = self.settings.card_index;
        (card, self.settings.connector_mapping(card))
    }

    fn list(&self, device_type: VideoDeviceType) -> &Vec<DeviceRecord> {
        match device_type {
            VideoDeviceType::Input => &self.inputs,
            VideoDeviceType::Output => &self.outputs,
        }
    }

    fn list_mut(&mut self, device_type: VideoDeviceType) -> &mut Vec<DeviceRecord> {
        match device_type {
            VideoDeviceType::Input => &mut self.inputs,
            VideoDeviceType::Output => &mut self.outputs,
        }
    }

    fn records(&self) -> Vec<DeviceRecord> {
        self.inputs.iter().chain(&self.outputs).cloned().collect()
    }

    fn link_same_video_modes(&mut self) {
        for record in &self.outputs {
            let Some(output) = record.handle.as_output() else {
                continue;
            };
            let Some(name) = output.lock().same_as_input().map(str::to_string) else {
                continue;
            };
            let input = self
                .inputs
                .iter()
                .find(|r| r.name == name)
                .and_then(|r| r.handle.as_input().cloned());
            match input {
                Some(input) => output
                    .lock()
                    .change_same_video_mode_as_input(Some((name, input))),
                None => warn!("{}: input device {} not found", record.name, name),
            }
        }
    }

    /// Starts discovery, restores device bindings and marks every device for
    /// start on the next tick. Returns the number of cards found.
    pub fn enable(&mut self) -> usize {
        if self.enabled {
            return self.discovery.cards().len();
        }

        let key_before = self.container_key();
        let found = self.discovery.initialize(&mut self.settings);
        self.store.rekey(key_before, self.container_key());
        self.enabled = true;

        self.initialize_devices();
        info!(
            "DeckLink manager enabled: {} input(s), {} output(s)",
            self.inputs.len(),
            self.outputs.len()
        );
        found
    }

    /// Stops every device and discovery.
    pub fn disable(&mut self) {
        if !self.enabled {
            return;
        }
        for record in self.records() {
            suspend_device(&mut self.scheduler, &record.handle);
        }
        self.discovery.shutdown();
        self.enabled = false;
        info!("DeckLink manager disabled");
    }

    /// Starts or stops playback on every device.
    pub fn set_playing(&mut self, playing: bool) {
        self.playing = playing;
        for record in self.records() {
            record
                .handle
                .with(|device| device.state_mut().set_playing(playing));
        }
    }

    /// One host tick: applies discovery events, starts and stops devices,
    /// then updates them.
    pub fn tick(&mut self, now: Duration) -> Option<SchedulerIssue> {
        if !self.enabled {
            return None;
        }
        self.process_discovery_events();
        self.update_lifecycles();
        self.scheduler.tick(now)
    }

    fn initialize_devices(&mut self) {
        self.process_discovery_events();
        self.restore_bindings();
        let playing = self.playing;
        for record in self.records() {
            record.handle.with(|device| {
                let state = device.state_mut();
                state.playing = playing;
                state.mark_dirty();
            });
        }
    }

    fn process_discovery_events(&mut self) {
        let events = self.discovery.poll_events();
        if events.is_empty() {
            return;
        }

        let mappings = self.settings.connector_mappings.clone();
        for event in events {
            match event {
                DiscoveryEvent::Arrived { name, types } => {
                    self.discovery.handle_arrival(&name, types, &mappings);
                }
                DiscoveryEvent::Removed { name, types } => {
                    self.discovery.handle_removal(&name, types, &mappings);
                }
            }
        }
        self.restore_bindings();
    }

    /// Unbinds devices whose logical device vanished and rebinds devices
    /// whose previous logical device is available again.
    fn restore_bindings(&mut self) {
        for device_type in [VideoDeviceType::Input, VideoDeviceType::Output] {
            let count = self.discovery.device_names(device_type).len() as i32;
            for record in self.list(device_type).clone() {
                let current = record.current_index();
                let old = record.old_index();

                if current >= count {
                    warn!(
                        "{}: logical device {} is no longer available",
                        record.name, current
                    );
                    record.set_current_video_device(-1, current);
                } else if current < 0
                    && (0..count).contains(&old)
                    && !self.is_index_taken(old, device_type)
                {
                    info!("{}: bound again to logical device {}", record.name, old);
                    record.set_current_video_device(old, old);
                }
            }
        }
    }

    fn is_index_taken(&self, index: i32, device_type: VideoDeviceType) -> bool {
        let unique = self.is_current_mapping_unique();
        self.list(device_type)
            .iter()
            .chain(unique.then(|| self.list(device_type.opposite())).into_iter().flatten())
            .any(|r| r.current_index() == index)
    }

    // Every port being released closes before any port opens, so a taken
    // over logical device is never driven twice within one tick.
    fn update_lifecycles(&mut self) {
        let steps: Vec<(DeviceRecord, LifecycleStep)> = self
            .records()
            .into_iter()
            .map(|record| {
                let step = record.handle.with(|device| device.state_mut().lifecycle_step());
                (record, step)
            })
            .collect();

        for (record, _) in steps.iter().filter(|(_, step)| *step == LifecycleStep::Stop) {
            suspend_device(&mut self.scheduler, &record.handle);
            debug!("{}: stopped", record.name);
        }

        for (record, _) in steps.iter().filter(|(_, step)| *step == LifecycleStep::Start) {
            let slot = self.scheduler.register(&record.handle);
            let started = record.handle.with(|device| device.initialize(slot));
            if started {
                debug!("{}: started in slot {}", record.name, slot);
            } else {
                self.scheduler.unregister(record.device_type(), slot);
                record.handle.with(|device| device.cleanup());
                info!("{}: not started ({})", record.name, record.handle.status());
            }
        }
    }

    /// Returns the device with this name, creating it with default settings
    /// when it does not exist yet.
    pub fn get_or_create_device_instance(
        &mut self,
        name: &str,
        device_type: VideoDeviceType,
    ) -> Result<DeviceRecord> {
        if name.is_empty() {
            return Err(IoError::InvalidParameter(
                "device name cannot be empty".to_string(),
            ));
        }
        if let Some(record) = self.device_by_name(name, device_type) {
            return Ok(record.clone());
        }

        let key = self.container_key();
        if let Some(record) = self.store.find(key, name, device_type).cloned() {
            self.list_mut(device_type).push(record.clone());
            return Ok(record);
        }

        match device_type {
            VideoDeviceType::Input => self.add_input(InputSettings::named(name)),
            VideoDeviceType::Output => self.add_output(OutputSettings::named(name)),
        }
    }

    /// Adds an input device.
    pub fn add_input(&mut self, mut settings: InputSettings) -> Result<DeviceRecord> {
        self.check_new_name(&settings.name, VideoDeviceType::Input)?;
        settings.normalize();
        let selection = settings.device_selection;
        settings.device_selection = -1;

        let device = InputDevice::new(settings, Arc::clone(&self.sdk));
        let record = self.insert(device.name().to_string(), DeviceHandle::input(device));
        self.bind_initial(&record, selection);
        Ok(record)
    }

    /// Adds an output device.
    pub fn add_output(&mut self, mut settings: OutputSettings) -> Result<DeviceRecord> {
        self.check_new_name(&settings.name, VideoDeviceType::Output)?;
        settings.normalize();
        let selection = settings.device_selection;
        settings.device_selection = -1;

        let device = OutputDevice::new(settings, Arc::clone(&self.sdk), Arc::clone(&self.gpu));
        let record = self.insert(device.name().to_string(), DeviceHandle::output(device));
        self.bind_initial(&record, selection);
        Ok(record)
    }

    fn check_new_name(&self, name: &str, device_type: VideoDeviceType) -> Result<()> {
        if name.is_empty() {
            return Err(IoError::InvalidParameter(
                "device name cannot be empty".to_string(),
            ));
        }
        if self.device_by_name(name, device_type).is_some() {
            return Err(IoError::InvalidOperation(format!(
                "{device_type} device {name} already exists"
            )));
        }
        Ok(())
    }

    fn insert(&mut self, name: String, handle: DeviceHandle) -> DeviceRecord {
        let record = DeviceRecord::new(name, handle);
        let key = self.container_key();
        self.store.insert(key, record.clone());
        self.list_mut(record.device_type()).push(record.clone());
        info!("{} device {} added", record.device_type(), record.name);
        record
    }

    // Before discovery the stored index is kept as is, to be validated once
    // the logical devices are known.
    fn bind_initial(&mut self, record: &DeviceRecord, selection: i32) {
        if selection < 0 {
            return;
        }
        if self.enabled {
            if let Err(e) = self.set_device_index(&record.name, record.device_type(), selection) {
                warn!("{}: {}", record.name, e);
            }
        } else {
            self.stop_the_video_device_if_in_use(selection, record.device_type(), Some(record));
            record.set_current_video_device(selection, selection);
        }
    }

    /// Removes the device at a list position and returns its name.
    pub fn remove_device_instance(
        &mut self,
        index: usize,
        device_type: VideoDeviceType,
    ) -> Result<String> {
        let list = self.list_mut(device_type);
        if index >= list.len() {
            return Err(IoError::InvalidParameter(format!(
                "no {device_type} device at position {index}"
            )));
        }
        let record = list.remove(index);

        suspend_device(&mut self.scheduler, &record.handle);
        record.handle.dispose();

        let key = self.container_key();
        self.store.remove(key, &record.name, device_type);

        if device_type == VideoDeviceType::Input {
            for output in &self.outputs {
                if let Some(output) = output.handle.as_output() {
                    let mut output = output.lock();
                    if output.same_as_input() == Some(record.name.as_str()) {
                        output.detach_input();
                    }
                }
            }
        }

        info!("{} device {} removed", device_type, record.name);
        Ok(record.name)
    }

    /// Removes every device of every container.
    pub fn remove_all_devices(&mut self) {
        let all: Vec<DeviceRecord> = self.store.records().cloned().collect();
        for record in all.iter().chain(self.records().iter()) {
            suspend_device(&mut self.scheduler, &record.handle);
            record.handle.dispose();
        }
        self.store.clear();
        self.inputs.clear();
        self.outputs.clear();
        info!("All devices removed");
    }

    /// Unbinds whichever device holds a logical index: devices of the same
    /// type, and of both types under a unique-index mapping. `except` is
    /// left alone.
    pub fn stop_the_video_device_if_in_use(
        &self,
        logical_index: i32,
        device_type: VideoDeviceType,
        except: Option<&DeviceRecord>,
    ) {
        if logical_index < 0 {
            return;
        }

        let mut candidates: Vec<&DeviceRecord> = self.list(device_type).iter().collect();
        if self.is_current_mapping_unique() {
            candidates.extend(self.list(device_type.opposite()));
        }

        for record in candidates {
            if except.is_some_and(|e| e.handle.ptr_eq(&record.handle)) {
                continue;
            }
            if record.current_index() == logical_index {
                info!(
                    "{}: logical device {} taken over, device unbound",
                    record.name, logical_index
                );
                record.set_current_video_device(-1, -1);
            }
        }
    }

    /// Binds a named device to a logical index, unbinding the previous
    /// holder of that index.
    pub fn change_video_device_name_data(
        &mut self,
        name: &str,
        device_type: VideoDeviceType,
        new_index: i32,
    ) -> Result<()> {
        let record = self
            .device_by_name(name, device_type)
            .cloned()
            .ok_or_else(|| IoError::DeviceNotFound(format!("{device_type} device {name}")))?;

        self.stop_the_video_device_if_in_use(new_index, device_type, Some(&record));
        record.set_current_video_device(new_index, new_index);
        Ok(())
    }

    /// Binds a named device, falling back to unbound (-1) when the index is
    /// out of range. Returns the index actually bound.
    pub fn set_device_index(
        &mut self,
        name: &str,
        device_type: VideoDeviceType,
        index: i32,
    ) -> Result<i32> {
        let available = self.discovery.device_names(device_type).len() as i32;
        let index = if (0..available).contains(&index) {
            index
        } else {
            if index >= 0 {
                warn!(
                    "{}: logical device {} out of range ({} available), unbound",
                    name, index, available
                );
            }
            -1
        };
        self.change_video_device_name_data(name, device_type, index)?;
        Ok(index)
    }

    /// Whether a mapping lets a logical index be held by only one device.
    pub fn is_unique_index_device(mapping: ConnectorMapping) -> bool {
        mapping.is_unique_index()
    }

    fn is_current_mapping_unique(&self) -> bool {
        Self::is_unique_index_device(self.selected_connector_mapping())
    }

    /// Whether an output's logical index is also held by a running input
    /// under [`ConnectorMapping::TwoSubDevicesFullDuplex`].
    pub fn is_logical_device_bound_twice(&self, logical_index: i32) -> bool {
        if logical_index < 0
            || self.selected_connector_mapping() != ConnectorMapping::TwoSubDevicesFullDuplex
        {
            return false;
        }
        self.inputs.iter().any(|r| {
            r.current_index() == logical_index && r.handle.with(|d| d.state().wants_to_run())
        })
    }

    /// Whether the selected mapping is one the selected card accepts.
    pub fn is_current_mapping_compatible(&self) -> bool {
        self.discovery.is_current_mapping_compatible(
            self.settings.card_index,
            self.selected_connector_mapping(),
        )
    }

    /// Mapping selected for the current card.
    pub fn selected_connector_mapping(&self) -> ConnectorMapping {
        self.settings.connector_mapping(self.settings.card_index)
    }

    /// Switches the selected card to another connector mapping.
    ///
    /// The devices of the current mapping are suspended and those stored for
    /// `mapping` take over. The selection is recorded even when the card
    /// refuses the mapping; [`is_current_mapping_compatible`](Self::is_current_mapping_compatible)
    /// then reports false. Returns whether the hardware switched.
    pub fn change_connector_mapping(&mut self, mapping: ConnectorMapping) -> Result<bool> {
        let card = self.settings.card_index;
        if card >= self.discovery.cards().len() {
            return Err(IoError::InvalidParameter(format!(
                "card index {card} out of range"
            )));
        }
        if mapping == self.selected_connector_mapping() {
            return Ok(false);
        }

        for record in self.records() {
            suspend_device(&mut self.scheduler, &record.handle);
        }
        self.inputs.clear();
        self.outputs.clear();
        self.discovery.clear_device_names();

        self.settings.set_connector_mapping(card, mapping);
        let changed = self.discovery.changed_devices_duplex_mode(mapping, card)?;

        let key = self.container_key();
        for record in self.store.container(key) {
            match record.device_type() {
                VideoDeviceType::Input => self.inputs.push(record.clone()),
                VideoDeviceType::Output => self.outputs.push(record.clone()),
            }
        }

        self.initialize_devices();
        info!(
            "Connector mapping {} selected on card {} ({})",
            mapping,
            card,
            if changed { "applied" } else { "not applied" }
        );
        Ok(changed)
    }

    /// Status shown for a device: `Unused` while inactive, the device status
    /// when one is set, `Ok` otherwise.
    pub fn signal_status(&self, name: &str, device_type: VideoDeviceType) -> Option<DeviceStatus> {
        let record = self.device_by_name(name, device_type)?;
        Some(record.handle.with(|device| {
            if !device.is_active() {
                DeviceStatus::new("", StatusType::Unused)
            } else if !device.status().is_clear() {
                device.status().clone()
            } else {
                DeviceStatus::default()
            }
        }))
    }

    /// Lowest free numbered name for a new device.
    pub fn next_device_name(&self, device_type: VideoDeviceType) -> String {
        let prefix = match device_type {
            VideoDeviceType::Input => "Input Device",
            VideoDeviceType::Output => "Output Device",
        };
        (1..)
            .map(|n| format!("{prefix} {n}"))
            .find(|name| self.device_by_name(name, device_type).is_none())
            .unwrap_or_else(|| prefix.to_string())
    }

    /// Makes an output mirror the mode and timecode of an input, or stop
    /// mirroring with `None`.
    pub fn link_same_video_mode(&mut self, output: &str, input: Option<&str>) -> Result<()> {
        let output_device = self
            .output_device(output)
            .ok_or_else(|| IoError::DeviceNotFound(format!("Output device {output}")))?;

        let link = match input {
            Some(name) => {
                let input_device = self
                    .input_device(name)
                    .ok_or_else(|| IoError::DeviceNotFound(format!("Input device {name}")))?;
                Some((name.to_string(), input_device))
            }
            None => None,
        };
        output_device.lock().change_same_video_mode_as_input(link);
        Ok(())
    }

    /// Sets the frame source of an output.
    pub fn set_frame_source(&mut self, output: &str, source: Box<dyn FrameSource>) -> Result<()> {
        let output_device = self
            .output_device(output)
            .ok_or_else(|| IoError::DeviceNotFound(format!("Output device {output}")))?;
        output_device.lock().set_frame_source(Some(source));
        Ok(())
    }

    /// `(keying, link)` support of the card behind an output.
    pub fn is_keying_and_link_mode_supported(&self, output: &str) -> (bool, bool) {
        self.device_by_name(output, VideoDeviceType::Output)
            .map(|r| {
                self.discovery
                    .is_keying_and_link_mode_supported(r.current_index())
            })
            .unwrap_or((false, false))
    }

    /// Devices of a type in the current container, in creation order.
    pub fn devices(&self, device_type: VideoDeviceType) -> &[DeviceRecord] {
        self.list(device_type)
    }

    /// Device by name.
    pub fn device_by_name(&self, name: &str, device_type: VideoDeviceType) -> Option<&DeviceRecord> {
        self.list(device_type).iter().find(|r| r.name == name)
    }

    /// Input device by name.
    pub fn input_device(&self, name: &str) -> Option<Arc<Mutex<InputDevice>>> {
        self.device_by_name(name, VideoDeviceType::Input)
            .and_then(|r| r.handle.as_input().cloned())
    }

    /// Output device by name.
    pub fn output_device(&self, name: &str) -> Option<Arc<Mutex<OutputDevice>>> {
        self.device_by_name(name, VideoDeviceType::Output)
            .and_then(|r| r.handle.as_output().cloned())
    }

    /// Logical device names of a type.
    pub fn logical_device_names(&self, device_type: VideoDeviceType) -> &[String] {
        self.discovery.device_names(device_type)
    }

    /// Card discovery state.
    pub fn discovery(&self) -> &CardDiscovery {
        &self.discovery
    }

    /// The scheduler.
    pub fn scheduler(&self) -> &FrameScheduler {
        &self.scheduler
    }

    /// Host clock advance per tick.
    pub fn capture_delta(&self) -> Option<Duration> {
        self.scheduler.capture_delta()
    }

    /// Device containers.
    pub fn store(&self) -> &DeviceStore {
        &self.store
    }

    /// Whether discovery runs.
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Whether playback runs.
    pub fn is_playing(&self) -> bool {
        self.playing
    }

    /// Settings describing the current devices.
    pub fn settings_snapshot(&self) -> ManagerSettings {
        let mut settings = self.settings.clone();
        settings.inputs = self
            .inputs
            .iter()
            .filter_map(|r| r.handle.as_input().map(|d| d.lock().settings()))
            .collect();
        settings.outputs = self
            .outputs
            .iter()
            .filter_map(|r| r.handle.as_output().map(|d| d.lock().settings()))
            .collect();
        settings
    }
}

impl Drop for DeckLinkManager {
    fn drop(&mut self) {
        self.disable();
    }
}

fn suspend_device(scheduler: &mut FrameScheduler, handle: &DeviceHandle) {
    let device_type = handle.device_type();
    handle.with(|device| {
        if let Some(slot) = device.state().slot {
            scheduler.unregister(device_type, slot);
        }
        device.cleanup();
        device.state_mut().mark_dirty();
    });
}
