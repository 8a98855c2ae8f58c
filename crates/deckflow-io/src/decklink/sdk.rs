//! Collaborator interfaces
//!
//! The DeckLink SDK, the GPU and the render source are reached only through
//! the traits in this module. Every SDK call is made from the control thread;
//! the one exception is discovery, whose callbacks go through a
//! [`DiscoverySender`].

use super::events::DiscoverySender;
use deckflow_core::{
    ColorSpace, ConnectorMapping, DeviceStatus, KeyingMode, LinkMode, PixelFormat, SyncMode,
    Timecode, TransferFunction, VideoMode,
};

/// Hardware group identifier shared by the logical devices of one card.
pub type GroupId = i64;

/// One installed card as reported by enumeration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CardInfo {
    /// Hardware model name
    pub name: String,
    /// Hardware group id
    pub group_id: GroupId,
    /// Logical device names exposed by the card
    pub logical_devices: Vec<String>,
}

/// Parameters for opening an output port.
#[derive(Debug, Clone, PartialEq)]
pub struct OutputOpenParams {
    /// Scheduler slot of the device
    pub slot: usize,
    /// Index into the sorted output device names
    pub device_selection: usize,
    /// SDK display mode code
    pub mode_code: u32,
    /// Pixel format
    pub pixel_format: PixelFormat,
    /// Color space
    pub color_space: ColorSpace,
    /// Transfer function
    pub transfer_function: TransferFunction,
    /// Frames scheduled before playback starts
    pub preroll_length: u32,
    /// Manual or async scheduling
    pub sync_mode: SyncMode,
    /// Frames are fed as GPU textures
    pub gpu_direct: bool,
}

/// Parameters for opening an input port.
#[derive(Debug, Clone, PartialEq)]
pub struct InputOpenParams {
    /// Scheduler slot of the device
    pub slot: usize,
    /// Index into the sorted input device names
    pub device_selection: usize,
    /// Capture pixel format, [`PixelFormat::UseBestQuality`] to follow the signal
    pub pixel_format: PixelFormat,
}

/// Native SDK entry points.
pub trait DeckLinkSdk: Send + Sync {
    /// Version string of the linked API.
    fn api_version(&self) -> Option<String>;

    /// Lists installed cards.
    fn enumerate_cards(&self) -> Vec<CardInfo>;

    /// Applies the stored mappings per group and starts reporting device
    /// arrival and removal. Callbacks may run on any thread.
    fn start_discovery(&self, sender: DiscoverySender, mappings: &[(GroupId, ConnectorMapping)]);

    /// Stops discovery and drops the sender.
    fn stop_discovery(&self);

    /// Whether the card can run a mapping.
    fn is_connector_mapping_compatible(&self, group: GroupId, mapping: ConnectorMapping) -> bool;

    /// Whether the card supports a link mode under its current mapping.
    fn is_link_mode_compatible(&self, group: GroupId, mode: LinkMode) -> bool;

    /// Whether the card supports a keying mode under its current mapping.
    fn is_keying_mode_compatible(&self, group: GroupId, mode: KeyingMode) -> bool;

    /// Switches every connector of a card to a mapping. Devices are then
    /// reported again through discovery.
    fn change_connector_mapping(&self, group: GroupId, mapping: ConnectorMapping) -> bool;

    /// Reports every device again through discovery.
    fn reload_devices(&self);

    /// Opens an output port, `None` if the SDK refused.
    fn open_output(&self, params: &OutputOpenParams) -> Option<Box<dyn OutputPort>>;

    /// Opens an input port, `None` if the SDK refused.
    fn open_input(&self, params: &InputOpenParams) -> Option<Box<dyn InputPort>>;
}

/// Frame handed to an output port.
#[derive(Debug, Clone, Copy)]
pub enum FramePayload<'a> {
    /// Packed bytes read back from the GPU
    Bytes(&'a [u8]),
    /// Packed texture fed without a readback
    Texture(TextureHandle),
}

/// An open output port. Dropping it releases the device.
pub trait OutputPort: Send {
    /// False when the SDK created the port but could not start it.
    fn is_initialized(&self) -> bool;

    /// Frame size in pixels.
    fn frame_dimensions(&self) -> (u32, u32);

    /// SDK frame duration in flicks.
    fn frame_duration(&self) -> i64;

    /// Progressive scan.
    fn is_progressive(&self) -> bool;

    /// Locked to a reference signal.
    fn is_reference_locked(&self) -> bool;

    /// Frames the card dropped.
    fn dropped_frame_count(&self) -> u32;

    /// Frames the card displayed late.
    fn late_frame_count(&self) -> u32;

    /// Whether the pixel format, mode and colorimetry combine.
    fn is_valid_configuration(&self) -> bool;

    /// Row bytes, rows and bytes per texel of one packed frame.
    fn backing_frame_byte_dimensions(&self) -> (u32, u32, u32);

    /// Advances the schedule clock by a number of frames.
    fn set_default_schedule_time(&mut self, frames: u64);

    /// Whether a keying mode works on this port.
    fn is_keying_mode_compatible(&self, mode: KeyingMode) -> bool;

    /// Enables keying.
    fn initialize_keying(&mut self, mode: KeyingMode) -> bool;

    /// Switches between keying modes.
    fn change_keying_mode(&mut self, mode: KeyingMode) -> bool;

    /// Disables keying.
    fn disable_keying(&mut self) -> bool;

    /// Whether a link mode works with this port.
    fn is_link_compatible(&self, mode: LinkMode) -> bool;

    /// Sets the link mode.
    fn set_link_mode(&mut self, mode: LinkMode) -> bool;

    /// Schedules one frame.
    fn feed_frame(&mut self, frame: FramePayload<'_>, timecode: Timecode);

    /// Blocks until the given frame has been displayed.
    fn wait_completion(&mut self, frame: u64);

    /// Latest frame error raised by the card, cleared on read.
    fn take_frame_error(&mut self) -> Option<DeviceStatus>;
}

/// Errors reported by an input port.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum InputError {
    /// No error
    #[default]
    NoError,
    /// The signal cannot be captured in the requested pixel format
    IncompatiblePixelFormatAndVideoMode,
    /// An audio packet could not be read
    AudioPacketInvalid,
    /// Another process holds the device
    DeviceAlreadyUsed,
    /// No signal on the connector
    NoInputSource,
}

/// Signal format detected by an input port.
#[derive(Debug, Clone, PartialEq)]
pub struct InputFormat {
    /// Registered mode, `None` for modes outside the registry
    pub mode: Option<&'static VideoMode>,
    /// Format name as reported by the card
    pub name: String,
    /// Frame width
    pub width: u32,
    /// Frame height
    pub height: u32,
    /// Rational frame rate
    pub frame_rate: (u32, u32),
    /// Frame duration in flicks
    pub frame_duration: i64,
    /// Captured pixel format
    pub pixel_format: PixelFormat,
    /// Signal color space
    pub color_space: ColorSpace,
    /// Signal transfer function
    pub transfer_function: TransferFunction,
}

/// One frame captured by an input port.
#[derive(Debug, Clone, PartialEq)]
pub struct CapturedFrame {
    /// Arrival order
    pub sequence: u64,
    /// Timecode attached by the card
    pub timecode: Option<Timecode>,
    /// Frame duration in flicks
    pub frame_duration: i64,
}

/// An open input port. Dropping it releases the device.
pub trait InputPort: Send {
    /// False when the SDK created the port but could not start it.
    fn is_initialized(&self) -> bool;

    /// Current signal format, `None` without a signal.
    fn format(&self) -> Option<InputFormat>;

    /// Frames captured since the previous call, oldest first.
    fn take_frames(&mut self) -> Vec<CapturedFrame>;

    /// Frames the card dropped.
    fn dropped_frame_count(&self) -> u32;

    /// Latest capture error, cleared on read.
    fn take_error(&mut self) -> Option<(InputError, DeviceStatus)>;
}

/// Opaque GPU texture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TextureHandle(pub u64);

/// Packed texture layout requested from the GPU.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PackTarget {
    /// Width in RGBA8 texels (row bytes / 4)
    pub width: u32,
    /// Rows
    pub height: u32,
    /// Pixel format to pack into
    pub pixel_format: PixelFormat,
    /// Output color space
    pub color_space: ColorSpace,
    /// Output transfer function
    pub transfer_function: TransferFunction,
}

/// Produces the frames an output device plays out.
pub trait FrameSource: Send {
    /// The latest rendered frame.
    fn acquire(&mut self) -> Option<TextureHandle>;
}

/// Asynchronous texture read.
pub trait ReadbackRequest: Send {
    /// The pixels are available.
    fn is_done(&self) -> bool;

    /// The read failed.
    fn has_error(&self) -> bool;

    /// Blocks until the read finished or failed.
    fn wait_for_completion(&mut self);

    /// Read pixels, empty until done.
    fn data(&self) -> &[u8];
}

/// GPU operations used by the output pipeline. Textures returned by
/// `pack`, `pack_interlaced` and `copy_field` belong to the caller until
/// passed to `release`.
pub trait GpuBackend: Send + Sync {
    /// Whether textures can be handed to the card directly.
    fn is_gpu_direct_available(&self) -> bool;

    /// Converts a frame into the packed layout.
    fn pack(&self, source: TextureHandle, target: &PackTarget) -> TextureHandle;

    /// Weaves two fields and converts them into the packed layout.
    fn pack_interlaced(
        &self,
        odd: TextureHandle,
        even: TextureHandle,
        target: &PackTarget,
    ) -> TextureHandle;

    /// Copies a frame so it can be paired with the next one.
    fn copy_field(&self, source: TextureHandle, width: u32, height: u32) -> TextureHandle;

    /// Starts reading a texture back.
    fn request_readback(&self, texture: TextureHandle) -> Box<dyn ReadbackRequest>;

    /// Frees a texture.
    fn release(&self, texture: TextureHandle);
}

/// External clock an output can stamp its frames with.
pub trait TimecodeProvider: Send + Sync {
    /// Current time, `None` while the clock is not running.
    fn current_timecode(&self) -> Option<Timecode>;
}
