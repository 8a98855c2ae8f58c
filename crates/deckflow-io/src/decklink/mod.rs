//! DeckLink SDI/HDMI capture and output.
//!
//! The native SDK, the GPU and the render source sit behind the traits in
//! [`sdk`]; everything else here is hardware independent:
//! - [`discovery`] tracks cards, logical devices and connector mappings
//! - [`input`] and [`output`] implement the device pipelines
//! - [`manager`] binds named devices to logical devices
//! - [`scheduler`] drives every running device once per tick

pub mod card;
pub mod device;
pub mod discovery;
pub mod events;
pub mod handle;
pub mod input;
pub mod manager;
pub mod output;
pub mod scheduler;
pub mod sdk;
#[cfg(feature = "simulation")]
pub mod sim;

pub use card::{DeckLinkCard, DETECTION_ERROR_CARD};
pub use device::{DeviceState, LifecycleStep, VideoDevice};
pub use discovery::{CardDiscovery, CompatibilityRefresh};
pub use events::{discovery_channel, DiscoveryEvent, DiscoveryQueue, DiscoverySender};
pub use handle::{ContainerKey, DeviceHandle, DeviceRecord, DeviceStore};
pub use input::{FrameQueue, InputDevice};
pub use manager::DeckLinkManager;
pub use output::{schedule_steps, InputLink, OutputDevice, OutputStats};
pub use scheduler::{FrameScheduler, SchedulerIssue};
pub use sdk::{
    CapturedFrame, CardInfo, DeckLinkSdk, FramePayload, FrameSource, GpuBackend, GroupId,
    InputError, InputFormat, InputOpenParams, InputPort, OutputOpenParams, OutputPort, PackTarget,
    ReadbackRequest, TextureHandle, TimecodeProvider,
};
