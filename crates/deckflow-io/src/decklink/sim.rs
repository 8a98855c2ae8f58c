//! In-process DeckLink simulation
//!
//! Implements the SDK and GPU traits without hardware so the manager can be
//! exercised end to end. Cards expose `"{card} (n)"` logical devices, four,
//! two or one depending on the connector mapping, and every device is both
//! input and output capable. What the card does is recorded and can be read
//! back by tests.

use super::events::DiscoverySender;
use super::sdk::{
    CapturedFrame, CardInfo, DeckLinkSdk, FramePayload, FrameSource, GpuBackend, GroupId,
    InputError, InputFormat, InputOpenParams, InputPort, OutputOpenParams, OutputPort, PackTarget,
    ReadbackRequest, TextureHandle,
};
use deckflow_core::{
    registry, ColorSpace, ConnectorMapping, DeviceStatus, DeviceTypes, KeyingMode, LinkMode,
    PixelFormat, ScanMode, SimulatedCard, SimulationSettings, Timecode, TransferFunction,
    VideoMode,
};
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::{debug, warn};

const GROUP_ID_BASE: GroupId = 100;

/// One frame scheduled on a simulated output.
#[derive(Debug, Clone, PartialEq)]
pub struct FedFrame {
    /// Logical device name
    pub device: String,
    /// Timecode the frame was scheduled with
    pub timecode: Timecode,
    /// Bytes handed over, 0 for textures
    pub bytes: usize,
    /// Fed as a GPU texture
    pub texture: bool,
}

#[derive(Debug, Clone)]
struct SimCard {
    name: String,
    group_id: GroupId,
    logical_devices: usize,
    mapping: ConnectorMapping,
    compatible: Vec<ConnectorMapping>,
}

impl SimCard {
    fn device_name(&self, index: usize) -> String {
        format!("{} ({})", self.name, index + 1)
    }

    fn all_devices(&self) -> Vec<String> {
        (0..self.logical_devices).map(|i| self.device_name(i)).collect()
    }

    fn exposed_devices(&self) -> Vec<String> {
        let count = exposed_count(self.mapping).min(self.logical_devices);
        (0..count).map(|i| self.device_name(i)).collect()
    }
}

fn exposed_count(mapping: ConnectorMapping) -> usize {
    match mapping {
        ConnectorMapping::FourSubDevicesHalfDuplex => 4,
        ConnectorMapping::TwoSubDevicesFullDuplex | ConnectorMapping::TwoSubDevicesHalfDuplex => 2,
        ConnectorMapping::OneSubDeviceFullDuplex | ConnectorMapping::OneSubDeviceHalfDuplex => 1,
    }
}

#[derive(Default)]
struct Shared {
    fed: Vec<FedFrame>,
    schedule_times: Vec<u64>,
    waits: Vec<u64>,
    output_params: Vec<OutputOpenParams>,
    frame_errors: HashMap<String, DeviceStatus>,
    input_modes: HashMap<String, u32>,
    open_outputs: usize,
    open_inputs: usize,
    driven: HashMap<String, usize>,
    collisions: Vec<String>,
}

impl Shared {
    // A half-duplex logical device carries one port at a time.
    fn drive(&mut self, name: &str, half_duplex: bool) {
        let ports = self.driven.entry(name.to_string()).or_default();
        if half_duplex && *ports > 0 {
            self.collisions.push(name.to_string());
        }
        *ports += 1;
    }

    fn release(&mut self, name: &str) {
        if let Some(ports) = self.driven.get_mut(name) {
            *ports = ports.saturating_sub(1);
        }
    }
}

struct SdkState {
    cards: Vec<SimCard>,
    sender: Option<DiscoverySender>,
    fail_open: bool,
    busy: HashSet<String>,
    invalid_configuration: bool,
    reference_locked: bool,
}

/// Simulated DeckLink SDK.
pub struct SimulatedSdk {
    state: Mutex<SdkState>,
    shared: Arc<Mutex<Shared>>,
}

impl SimulatedSdk {
    /// A simulation with the given cards. Every mapping whose device count
    /// fits the card is compatible; cards start in four-device half duplex.
    pub fn new(cards: &[SimulatedCard]) -> Self {
        let cards = cards
            .iter()
            .enumerate()
            .map(|(i, card)| SimCard {
                name: card.name.clone(),
                group_id: GROUP_ID_BASE + i as GroupId,
                logical_devices: card.logical_devices,
                mapping: ConnectorMapping::FourSubDevicesHalfDuplex,
                compatible: ConnectorMapping::ALL
                    .into_iter()
                    .filter(|m| exposed_count(*m) <= card.logical_devices)
                    .collect(),
            })
            .collect();

        Self {
            state: Mutex::new(SdkState {
                cards,
                sender: None,
                fail_open: false,
                busy: HashSet::new(),
                invalid_configuration: false,
                reference_locked: true,
            }),
            shared: Arc::new(Mutex::new(Shared::default())),
        }
    }

    /// A simulation built from settings.
    pub fn from_settings(settings: &SimulationSettings) -> Self {
        Self::new(&settings.cards)
    }

    /// Restricts the mappings a card accepts.
    pub fn set_compatible_mappings(&self, card: usize, mappings: Vec<ConnectorMapping>) {
        if let Some(card) = self.state.lock().cards.get_mut(card) {
            card.compatible = mappings;
        }
    }

    /// Makes every port open fail.
    pub fn set_fail_open(&self, fail: bool) {
        self.state.lock().fail_open = fail;
    }

    /// Marks a logical device as held by another process.
    pub fn set_busy(&self, name: &str, busy: bool) {
        let mut state = self.state.lock();
        if busy {
            state.busy.insert(name.to_string());
        } else {
            state.busy.remove(name);
        }
    }

    /// Makes ports report an invalid configuration.
    pub fn set_invalid_configuration(&self, invalid: bool) {
        self.state.lock().invalid_configuration = invalid;
    }

    /// Sets the reference lock state reported by new ports.
    pub fn set_reference_locked(&self, locked: bool) {
        self.state.lock().reference_locked = locked;
    }

    /// Feeds a signal into an input, `None` to unplug it.
    pub fn set_input_signal(&self, name: &str, mode: Option<&VideoMode>) {
        let mut shared = self.shared.lock();
        match mode {
            Some(mode) => {
                shared.input_modes.insert(name.to_string(), mode.sdk_code);
            }
            None => {
                shared.input_modes.remove(name);
            }
        }
    }

    /// Raises a frame error on the next update of an output.
    pub fn inject_frame_error(&self, name: &str, status: DeviceStatus) {
        self.shared
            .lock()
            .frame_errors
            .insert(name.to_string(), status);
    }

    /// Reports a logical device as unplugged.
    pub fn unplug(&self, name: &str) {
        if let Some(sender) = &self.state.lock().sender {
            sender.device_removed(name, DeviceTypes::INPUT | DeviceTypes::OUTPUT);
        }
    }

    /// Reports a logical device as plugged in.
    pub fn plug(&self, name: &str) {
        if let Some(sender) = &self.state.lock().sender {
            sender.device_arrived(name, DeviceTypes::INPUT | DeviceTypes::OUTPUT);
        }
    }

    /// Mapping applied to a card.
    pub fn hardware_mapping(&self, card: usize) -> Option<ConnectorMapping> {
        self.state.lock().cards.get(card).map(|c| c.mapping)
    }

    /// Exposed logical devices, sorted.
    pub fn logical_device_names(&self) -> Vec<String> {
        sorted_exposed(&self.state.lock().cards)
    }

    /// Frames scheduled so far.
    pub fn fed_frames(&self) -> Vec<FedFrame> {
        self.shared.lock().fed.clone()
    }

    /// Schedule clock advances so far.
    pub fn schedule_times(&self) -> Vec<u64> {
        self.shared.lock().schedule_times.clone()
    }

    /// Completion waits so far.
    pub fn waits(&self) -> Vec<u64> {
        self.shared.lock().waits.clone()
    }

    /// Parameters of every output opened so far.
    pub fn output_params(&self) -> Vec<OutputOpenParams> {
        self.shared.lock().output_params.clone()
    }

    /// Output ports currently open.
    pub fn open_outputs(&self) -> usize {
        self.shared.lock().open_outputs
    }

    /// Input ports currently open.
    pub fn open_inputs(&self) -> usize {
        self.shared.lock().open_inputs
    }

    /// Half-duplex logical devices opened while another port still held
    /// them, in open order.
    pub fn port_collisions(&self) -> Vec<String> {
        self.shared.lock().collisions.clone()
    }

    fn emit_arrivals(state: &SdkState, card: Option<usize>) {
        let Some(sender) = &state.sender else {
            return;
        };
        for (i, c) in state.cards.iter().enumerate() {
            if card.is_some_and(|card| card != i) {
                continue;
            }
            for name in c.exposed_devices() {
                sender.device_arrived(name, DeviceTypes::INPUT | DeviceTypes::OUTPUT);
            }
        }
    }

    fn card_by_group(state: &SdkState, group: GroupId) -> Option<&SimCard> {
        state.cards.iter().find(|c| c.group_id == group)
    }

    fn card_of_device<'a>(state: &'a SdkState, name: &str) -> Option<&'a SimCard> {
        state.cards.iter().find(|c| c.all_devices().iter().any(|d| d == name))
    }
}

fn sorted_exposed(cards: &[SimCard]) -> Vec<String> {
    let mut names: Vec<String> = cards.iter().flat_map(SimCard::exposed_devices).collect();
    names.sort();
    names
}

impl DeckLinkSdk for SimulatedSdk {
    fn api_version(&self) -> Option<String> {
        Some("12.9 (simulated)".to_string())
    }

    fn enumerate_cards(&self) -> Vec<CardInfo> {
        self.state
            .lock()
            .cards
            .iter()
            .map(|c| CardInfo {
                name: c.name.clone(),
                group_id: c.group_id,
                logical_devices: c.all_devices(),
            })
            .collect()
    }

    fn start_discovery(&self, sender: DiscoverySender, mappings: &[(GroupId, ConnectorMapping)]) {
        let mut state = self.state.lock();
        for &(group, mapping) in mappings {
            if let Some(card) = state.cards.iter_mut().find(|c| c.group_id == group) {
                if card.compatible.contains(&mapping) {
                    card.mapping = mapping;
                }
            }
        }
        state.sender = Some(sender);
        Self::emit_arrivals(&state, None);
    }

    fn stop_discovery(&self) {
        self.state.lock().sender = None;
    }

    fn is_connector_mapping_compatible(&self, group: GroupId, mapping: ConnectorMapping) -> bool {
        let state = self.state.lock();
        Self::card_by_group(&state, group).is_some_and(|c| c.compatible.contains(&mapping))
    }

    fn is_link_mode_compatible(&self, group: GroupId, mode: LinkMode) -> bool {
        let state = self.state.lock();
        Self::card_by_group(&state, group).is_some_and(|c| {
            mode == LinkMode::Single || c.mapping.supports_link_modes()
        })
    }

    fn is_keying_mode_compatible(&self, group: GroupId, mode: KeyingMode) -> bool {
        let state = self.state.lock();
        Self::card_by_group(&state, group)
            .is_some_and(|c| mode == KeyingMode::None || c.mapping.supports_keying())
    }

    fn change_connector_mapping(&self, group: GroupId, mapping: ConnectorMapping) -> bool {
        let mut state = self.state.lock();
        let Some(index) = state.cards.iter().position(|c| c.group_id == group) else {
            return false;
        };
        if !state.cards[index].compatible.contains(&mapping) {
            return false;
        }

        if let Some(sender) = &state.sender {
            for name in state.cards[index].exposed_devices() {
                sender.device_removed(name, DeviceTypes::INPUT | DeviceTypes::OUTPUT);
            }
        }
        state.cards[index].mapping = mapping;
        Self::emit_arrivals(&state, Some(index));
        debug!("Simulated card {} switched to {}", index, mapping);
        true
    }

    fn reload_devices(&self) {
        let state = self.state.lock();
        Self::emit_arrivals(&state, None);
    }

    fn open_output(&self, params: &OutputOpenParams) -> Option<Box<dyn OutputPort>> {
        let state = self.state.lock();
        if state.fail_open {
            return None;
        }
        let name = sorted_exposed(&state.cards).get(params.device_selection)?.clone();
        let mode = registry().mode_from_sdk(params.mode_code)?;
        let card = Self::card_of_device(&state, &name)?;

        let port = SimOutputPort {
            name: name.clone(),
            mode,
            pixel_format: params.pixel_format,
            initialized: !state.busy.contains(&name),
            valid: !state.invalid_configuration,
            reference_locked: state.reference_locked,
            keying_supported: card.mapping.supports_keying(),
            link_supported: card.mapping.supports_link_modes(),
            shared: Arc::clone(&self.shared),
        };

        let half_duplex = card.mapping.is_unique_index();
        let mut shared = self.shared.lock();
        shared.output_params.push(params.clone());
        shared.open_outputs += 1;
        shared.drive(&name, half_duplex);
        Some(Box::new(port))
    }

    fn open_input(&self, params: &InputOpenParams) -> Option<Box<dyn InputPort>> {
        let state = self.state.lock();
        if state.fail_open {
            return None;
        }
        let name = sorted_exposed(&state.cards).get(params.device_selection)?.clone();
        let half_duplex = Self::card_of_device(&state, &name)?.mapping.is_unique_index();

        let port = SimInputPort {
            initialized: !state.busy.contains(&name),
            name,
            pixel_format: params.pixel_format,
            sequence: 0,
            had_signal: None,
            shared: Arc::clone(&self.shared),
        };
        let mut shared = self.shared.lock();
        shared.open_inputs += 1;
        shared.drive(&port.name, half_duplex);
        Some(Box::new(port))
    }
}

struct SimOutputPort {
    name: String,
    mode: &'static VideoMode,
    pixel_format: PixelFormat,
    initialized: bool,
    valid: bool,
    reference_locked: bool,
    keying_supported: bool,
    link_supported: bool,
    shared: Arc<Mutex<Shared>>,
}

impl OutputPort for SimOutputPort {
    fn is_initialized(&self) -> bool {
        self.initialized
    }

    fn frame_dimensions(&self) -> (u32, u32) {
        self.mode.dimensions()
    }

    fn frame_duration(&self) -> i64 {
        self.mode.frame_duration()
    }

    fn is_progressive(&self) -> bool {
        self.mode.scan_mode == ScanMode::Progressive
    }

    fn is_reference_locked(&self) -> bool {
        self.reference_locked
    }

    fn dropped_frame_count(&self) -> u32 {
        0
    }

    fn late_frame_count(&self) -> u32 {
        0
    }

    fn is_valid_configuration(&self) -> bool {
        self.valid
    }

    fn backing_frame_byte_dimensions(&self) -> (u32, u32, u32) {
        let (width, height) = self.mode.dimensions();
        self.pixel_format.byte_dimensions(width, height)
    }

    fn set_default_schedule_time(&mut self, frames: u64) {
        self.shared.lock().schedule_times.push(frames);
    }

    fn is_keying_mode_compatible(&self, mode: KeyingMode) -> bool {
        mode == KeyingMode::None || self.keying_supported
    }

    fn initialize_keying(&mut self, mode: KeyingMode) -> bool {
        self.is_keying_mode_compatible(mode)
    }

    fn change_keying_mode(&mut self, mode: KeyingMode) -> bool {
        self.is_keying_mode_compatible(mode)
    }

    fn disable_keying(&mut self) -> bool {
        true
    }

    fn is_link_compatible(&self, mode: LinkMode) -> bool {
        mode == LinkMode::Single || self.link_supported
    }

    fn set_link_mode(&mut self, mode: LinkMode) -> bool {
        self.is_link_compatible(mode)
    }

    fn feed_frame(&mut self, frame: FramePayload<'_>, timecode: Timecode) {
        let (bytes, texture) = match frame {
            FramePayload::Bytes(data) => (data.len(), false),
            FramePayload::Texture(_) => (0, true),
        };
        self.shared.lock().fed.push(FedFrame {
            device: self.name.clone(),
            timecode,
            bytes,
            texture,
        });
    }

    fn wait_completion(&mut self, frame: u64) {
        self.shared.lock().waits.push(frame);
    }

    fn take_frame_error(&mut self) -> Option<DeviceStatus> {
        self.shared.lock().frame_errors.remove(&self.name)
    }
}

impl Drop for SimOutputPort {
    fn drop(&mut self) {
        let mut shared = self.shared.lock();
        shared.open_outputs = shared.open_outputs.saturating_sub(1);
        shared.release(&self.name);
    }
}

struct SimInputPort {
    name: String,
    pixel_format: PixelFormat,
    initialized: bool,
    sequence: u64,
    had_signal: Option<bool>,
    shared: Arc<Mutex<Shared>>,
}

impl SimInputPort {
    fn mode(&self) -> Option<&'static VideoMode> {
        let code = *self.shared.lock().input_modes.get(&self.name)?;
        registry().mode_from_sdk(code)
    }
}

impl InputPort for SimInputPort {
    fn is_initialized(&self) -> bool {
        self.initialized
    }

    fn format(&self) -> Option<InputFormat> {
        let mode = self.mode()?;
        let (width, height) = mode.dimensions();
        let pixel_format = match self.pixel_format {
            PixelFormat::UseBestQuality => PixelFormat::Yuv10Bit,
            other => other,
        };
        Some(InputFormat {
            mode: Some(mode),
            name: mode.name.clone(),
            width,
            height,
            frame_rate: mode.frame_rate.rational(),
            frame_duration: mode.frame_duration(),
            pixel_format,
            color_space: ColorSpace::Bt709,
            transfer_function: TransferFunction::Hdr,
        })
    }

    fn take_frames(&mut self) -> Vec<CapturedFrame> {
        let Some(mode) = self.mode() else {
            return Vec::new();
        };
        let frame_duration = mode.frame_duration();
        let sequence = self.sequence;
        self.sequence += 1;
        vec![CapturedFrame {
            sequence,
            timecode: Timecode::from_flicks(frame_duration, sequence as i64 * frame_duration, false)
                .ok(),
            frame_duration,
        }]
    }

    fn dropped_frame_count(&self) -> u32 {
        0
    }

    fn take_error(&mut self) -> Option<(InputError, DeviceStatus)> {
        let has_signal = self.mode().is_some();
        if self.had_signal.replace(has_signal) == Some(has_signal) {
            return None;
        }
        if has_signal {
            None
        } else {
            Some((
                InputError::NoInputSource,
                DeviceStatus::warning("No input source"),
            ))
        }
    }
}

impl Drop for SimInputPort {
    fn drop(&mut self) {
        let mut shared = self.shared.lock();
        shared.open_inputs = shared.open_inputs.saturating_sub(1);
        shared.release(&self.name);
    }
}

struct GpuState {
    next_handle: u64,
    live: HashMap<u64, (u32, u32)>,
    gpu_direct: bool,
    readback_latency: u32,
    fail_readbacks: bool,
    bad_releases: usize,
}

/// Simulated GPU. Texture handles start at 1; handle 0 is left to frame
/// sources.
pub struct SimulatedGpu {
    state: Mutex<GpuState>,
    pending: Arc<AtomicUsize>,
}

impl Default for SimulatedGpu {
    fn default() -> Self {
        Self::new()
    }
}

impl SimulatedGpu {
    /// A GPU whose readbacks finish on the first poll.
    pub fn new() -> Self {
        Self {
            state: Mutex::new(GpuState {
                next_handle: 1,
                live: HashMap::new(),
                gpu_direct: false,
                readback_latency: 0,
                fail_readbacks: false,
                bad_releases: 0,
            }),
            pending: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Enables GPU-direct support.
    pub fn set_gpu_direct(&self, available: bool) {
        self.state.lock().gpu_direct = available;
    }

    /// Number of polls a readback reports not done.
    pub fn set_readback_latency(&self, polls: u32) {
        self.state.lock().readback_latency = polls;
    }

    /// Makes new readbacks fail.
    pub fn set_fail_readbacks(&self, fail: bool) {
        self.state.lock().fail_readbacks = fail;
    }

    /// Textures allocated and not released.
    pub fn live_textures(&self) -> usize {
        self.state.lock().live.len()
    }

    /// Readback requests not dropped yet.
    pub fn pending_readbacks(&self) -> usize {
        self.pending.load(Ordering::SeqCst)
    }

    /// Releases of unknown or already released textures.
    pub fn bad_releases(&self) -> usize {
        self.state.lock().bad_releases
    }

    fn allocate(&self, width: u32, height: u32) -> TextureHandle {
        let mut state = self.state.lock();
        let handle = state.next_handle;
        state.next_handle += 1;
        state.live.insert(handle, (width, height));
        TextureHandle(handle)
    }
}

impl GpuBackend for SimulatedGpu {
    fn is_gpu_direct_available(&self) -> bool {
        self.state.lock().gpu_direct
    }

    fn pack(&self, _source: TextureHandle, target: &PackTarget) -> TextureHandle {
        self.allocate(target.width, target.height)
    }

    fn pack_interlaced(
        &self,
        _odd: TextureHandle,
        _even: TextureHandle,
        target: &PackTarget,
    ) -> TextureHandle {
        self.allocate(target.width, target.height)
    }

    fn copy_field(&self, _source: TextureHandle, width: u32, height: u32) -> TextureHandle {
        self.allocate(width, height)
    }

    fn request_readback(&self, texture: TextureHandle) -> Box<dyn ReadbackRequest> {
        let state = self.state.lock();
        let (width, height) = state.live.get(&texture.0).copied().unwrap_or((0, 0));
        self.pending.fetch_add(1, Ordering::SeqCst);
        Box::new(SimReadback {
            remaining: AtomicU32::new(state.readback_latency),
            failed: state.fail_readbacks,
            data: vec![0; width as usize * height as usize * 4],
            pending: Arc::clone(&self.pending),
        })
    }

    fn release(&self, texture: TextureHandle) {
        let mut state = self.state.lock();
        if state.live.remove(&texture.0).is_none() {
            warn!("Texture {} released twice", texture.0);
            state.bad_releases += 1;
        }
    }
}

struct SimReadback {
    remaining: AtomicU32,
    failed: bool,
    data: Vec<u8>,
    pending: Arc<AtomicUsize>,
}

impl ReadbackRequest for SimReadback {
    fn is_done(&self) -> bool {
        if self.failed {
            return false;
        }
        self.remaining
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_err()
    }

    fn has_error(&self) -> bool {
        self.failed
    }

    fn wait_for_completion(&mut self) {
        self.remaining.store(0, Ordering::SeqCst);
    }

    fn data(&self) -> &[u8] {
        if self.failed || self.remaining.load(Ordering::SeqCst) > 0 {
            &[]
        } else {
            &self.data
        }
    }
}

impl Drop for SimReadback {
    fn drop(&mut self) {
        self.pending.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Frame source producing the same texture every tick.
#[derive(Debug, Clone, Default)]
pub struct SimFrameSource {
    frames: u64,
    limit: Option<u64>,
}

impl SimFrameSource {
    /// A source producing frames forever.
    pub fn new() -> Self {
        Self::default()
    }

    /// A source producing `limit` frames.
    pub fn with_limit(limit: u64) -> Self {
        Self {
            frames: 0,
            limit: Some(limit),
        }
    }
}

impl FrameSource for SimFrameSource {
    fn acquire(&mut self) -> Option<TextureHandle> {
        if self.limit.is_some_and(|limit| self.frames >= limit) {
            return None;
        }
        self.frames += 1;
        Some(TextureHandle(0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exposed_devices_follow_mapping() {
        let mut card = SimCard {
            name: "DeckLink Duo".to_string(),
            group_id: GROUP_ID_BASE,
            logical_devices: 4,
            mapping: ConnectorMapping::FourSubDevicesHalfDuplex,
            compatible: ConnectorMapping::ALL.to_vec(),
        };
        assert_eq!(card.exposed_devices().len(), 4);
        card.mapping = ConnectorMapping::TwoSubDevicesFullDuplex;
        assert_eq!(card.exposed_devices(), vec!["DeckLink Duo (1)", "DeckLink Duo (2)"]);
        assert_eq!(card.all_devices().len(), 4);
    }

    #[test]
    fn test_readback_latency() {
        let gpu = SimulatedGpu::new();
        gpu.set_readback_latency(2);
        let texture = gpu.allocate(2, 2);
        let mut request = gpu.request_readback(texture);
        assert!(!request.is_done());
        assert!(!request.is_done());
        assert!(request.is_done());
        assert_eq!(request.data().len(), 16);

        let mut slow = gpu.request_readback(texture);
        slow.wait_for_completion();
        assert!(slow.is_done());
        drop(request);
        drop(slow);
        assert_eq!(gpu.pending_readbacks(), 0);
    }

    #[test]
    fn test_double_release_is_counted() {
        let gpu = SimulatedGpu::new();
        let texture = gpu.allocate(1, 1);
        gpu.release(texture);
        gpu.release(texture);
        assert_eq!(gpu.live_textures(), 0);
        assert_eq!(gpu.bad_releases(), 1);
    }

    #[test]
    fn test_frame_source_limit() {
        let mut source = SimFrameSource::with_limit(1);
        assert!(source.acquire().is_some());
        assert!(source.acquire().is_none());
    }
}
