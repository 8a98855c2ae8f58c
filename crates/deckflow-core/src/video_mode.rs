//! Video mode registry
//!
//! Every display mode the DeckLink SDK knows about is described by a
//! (resolution, frame rate, scan mode) triple and a four-character SDK code.
//! The registry is built once from a static table and answers lookups in both
//! directions. [`SupportMap`] records which of those modes a given device
//! reported as supported.

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// SDK code reported for a signal whose display mode could not be identified.
pub const UNKNOWN_MODE_CODE: u32 = 0x6975_6e6b;

/// Upper bound on the number of registered modes.
pub const MAX_MODES: usize = 256;

/// Upper bound on the number of frame rates (one bit each in a `u32` mask).
pub const MAX_FRAME_RATES: usize = 31;

/// Video resolutions known to the SDK, in registry order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Resolution {
    /// 720x486
    Ntsc,
    /// 720x576
    Pal,
    /// 1920x1080
    Hd1080,
    /// 1280x720
    Hd720,
    /// 2048x1556
    TwoK,
    /// 2048x1080
    TwoKDci,
    /// 3840x2160
    Uhd2160,
    /// 4096x2160
    FourKDci,
    /// 7680x4320
    Uhd4320,
    /// 8192x4320
    EightKDci,
    /// 640x480
    Pc640x480,
    /// 800x600
    Pc800x600,
    /// 1440x900
    Pc1440x900,
    /// 1440x1080
    Pc1440x1080,
    /// 1600x1200
    Pc1600x1200,
    /// 1920x1200
    Pc1920x1200,
    /// 1920x1440
    Pc1920x1440,
    /// 2560x1440
    Pc2560x1440,
    /// 2560x1600
    Pc2560x1600,
}

impl Resolution {
    /// All resolutions in registry order.
    pub const ALL: [Resolution; 19] = [
        Resolution::Ntsc,
        Resolution::Pal,
        Resolution::Hd1080,
        Resolution::Hd720,
        Resolution::TwoK,
        Resolution::TwoKDci,
        Resolution::Uhd2160,
        Resolution::FourKDci,
        Resolution::Uhd4320,
        Resolution::EightKDci,
        Resolution::Pc640x480,
        Resolution::Pc800x600,
        Resolution::Pc1440x900,
        Resolution::Pc1440x1080,
        Resolution::Pc1600x1200,
        Resolution::Pc1920x1200,
        Resolution::Pc1920x1440,
        Resolution::Pc2560x1440,
        Resolution::Pc2560x1600,
    ];

    /// Number of resolutions.
    pub const COUNT: usize = Self::ALL.len();

    /// Position of this resolution in [`Resolution::ALL`].
    pub fn index(self) -> usize {
        self as usize
    }

    /// Display name, as shown in mode names (`"HD1080"`, `"2K DCI"`, `"640 x 480"`).
    pub fn name(self) -> &'static str {
        match self {
            Resolution::Ntsc => "NTSC",
            Resolution::Pal => "PAL",
            Resolution::Hd1080 => "HD1080",
            Resolution::Hd720 => "HD720",
            Resolution::TwoK => "2K",
            Resolution::TwoKDci => "2K DCI",
            Resolution::Uhd2160 => "2160",
            Resolution::FourKDci => "4K DCI",
            Resolution::Uhd4320 => "4320",
            Resolution::EightKDci => "8k DCI",
            Resolution::Pc640x480 => "640 x 480",
            Resolution::Pc800x600 => "800 x 600",
            Resolution::Pc1440x900 => "1440 x 900",
            Resolution::Pc1440x1080 => "1440 x 1080",
            Resolution::Pc1600x1200 => "1600 x 1200",
            Resolution::Pc1920x1200 => "1920 x 1200",
            Resolution::Pc1920x1440 => "1920 x 1440",
            Resolution::Pc2560x1440 => "2560 x 1440",
            Resolution::Pc2560x1600 => "2560 x 1600",
        }
    }

    /// Frame size in pixels.
    pub fn dimensions(self) -> (u32, u32) {
        match self {
            Resolution::Ntsc => (720, 486),
            Resolution::Pal => (720, 576),
            Resolution::Hd1080 => (1920, 1080),
            Resolution::Hd720 => (1280, 720),
            Resolution::TwoK => (2048, 1556),
            Resolution::TwoKDci => (2048, 1080),
            Resolution::Uhd2160 => (3840, 2160),
            Resolution::FourKDci => (4096, 2160),
            Resolution::Uhd4320 => (7680, 4320),
            Resolution::EightKDci => (8192, 4320),
            Resolution::Pc640x480 => (640, 480),
            Resolution::Pc800x600 => (800, 600),
            Resolution::Pc1440x900 => (1440, 900),
            Resolution::Pc1440x1080 => (1440, 1080),
            Resolution::Pc1600x1200 => (1600, 1200),
            Resolution::Pc1920x1200 => (1920, 1200),
            Resolution::Pc1920x1440 => (1920, 1440),
            Resolution::Pc2560x1440 => (2560, 1440),
            Resolution::Pc2560x1600 => (2560, 1600),
        }
    }

    /// DCI resolutions carry no scan-mode letter in their mode name.
    fn omits_scan_letter(self) -> bool {
        matches!(
            self,
            Resolution::TwoKDci | Resolution::FourKDci | Resolution::EightKDci
        )
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Frame rates known to the SDK, in registry order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum FrameRate {
    /// 24000/1001
    Fps23_98,
    /// 24
    Fps24,
    /// 25
    Fps25,
    /// 30000/1001
    Fps29_97,
    /// 30
    Fps30,
    /// 48000/1001
    Fps47_95,
    /// 48
    Fps48,
    /// 50
    Fps50,
    /// 60000/1001
    Fps59_94,
    /// 60
    Fps60,
    /// 96000/1001
    Fps95_90,
    /// 96
    Fps96,
    /// 98
    Fps98,
    /// 100
    Fps100,
    /// 120000/1001
    Fps119_88,
    /// 120
    Fps120,
}

impl FrameRate {
    /// All frame rates in registry order.
    pub const ALL: [FrameRate; 16] = [
        FrameRate::Fps23_98,
        FrameRate::Fps24,
        FrameRate::Fps25,
        FrameRate::Fps29_97,
        FrameRate::Fps30,
        FrameRate::Fps47_95,
        FrameRate::Fps48,
        FrameRate::Fps50,
        FrameRate::Fps59_94,
        FrameRate::Fps60,
        FrameRate::Fps95_90,
        FrameRate::Fps96,
        FrameRate::Fps98,
        FrameRate::Fps100,
        FrameRate::Fps119_88,
        FrameRate::Fps120,
    ];

    /// Number of frame rates.
    pub const COUNT: usize = Self::ALL.len();

    /// Bit position of this frame rate in support masks.
    pub fn index(self) -> usize {
        self as usize
    }

    fn bit(self) -> u32 {
        1 << self.index()
    }

    /// Display name (`"23.98"`, `"60"`).
    pub fn name(self) -> &'static str {
        match self {
            FrameRate::Fps23_98 => "23.98",
            FrameRate::Fps24 => "24",
            FrameRate::Fps25 => "25",
            FrameRate::Fps29_97 => "29.97",
            FrameRate::Fps30 => "30",
            FrameRate::Fps47_95 => "47.95",
            FrameRate::Fps48 => "48",
            FrameRate::Fps50 => "50",
            FrameRate::Fps59_94 => "59.94",
            FrameRate::Fps60 => "60",
            FrameRate::Fps95_90 => "95.90",
            FrameRate::Fps96 => "96",
            FrameRate::Fps98 => "98",
            FrameRate::Fps100 => "100",
            FrameRate::Fps119_88 => "119.88",
            FrameRate::Fps120 => "120",
        }
    }

    /// Exact rate as `(numerator, denominator)` frames per second.
    pub fn rational(self) -> (u32, u32) {
        match self {
            FrameRate::Fps23_98 => (24_000, 1001),
            FrameRate::Fps24 => (24, 1),
            FrameRate::Fps25 => (25, 1),
            FrameRate::Fps29_97 => (30_000, 1001),
            FrameRate::Fps30 => (30, 1),
            FrameRate::Fps47_95 => (48_000, 1001),
            FrameRate::Fps48 => (48, 1),
            FrameRate::Fps50 => (50, 1),
            FrameRate::Fps59_94 => (60_000, 1001),
            FrameRate::Fps60 => (60, 1),
            FrameRate::Fps95_90 => (96_000, 1001),
            FrameRate::Fps96 => (96, 1),
            FrameRate::Fps98 => (98, 1),
            FrameRate::Fps100 => (100, 1),
            FrameRate::Fps119_88 => (120_000, 1001),
            FrameRate::Fps120 => (120, 1),
        }
    }

    /// Duration of one frame in flicks.
    pub fn frame_duration(self) -> i64 {
        let (num, den) = self.rational();
        crate::timecode::FLICKS_PER_SECOND * den as i64 / num as i64
    }
}

impl fmt::Display for FrameRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Progressive or interlaced scanning.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub enum ScanMode {
    /// Full frames
    #[default]
    Progressive,
    /// Two fields per frame
    Interlaced,
}

impl ScanMode {
    /// Both scan modes in registry order.
    pub const ALL: [ScanMode; 2] = [ScanMode::Progressive, ScanMode::Interlaced];

    /// Position in [`ScanMode::ALL`].
    pub fn index(self) -> usize {
        self as usize
    }

    /// Display name.
    pub fn name(self) -> &'static str {
        match self {
            ScanMode::Progressive => "Progressive",
            ScanMode::Interlaced => "Interlaced",
        }
    }

    /// Letter used inside mode names.
    pub fn letter(self) -> char {
        match self {
            ScanMode::Progressive => 'p',
            ScanMode::Interlaced => 'i',
        }
    }
}

impl fmt::Display for ScanMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One registered display mode.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VideoMode {
    /// Frame size
    pub resolution: Resolution,
    /// Frame rate
    pub frame_rate: FrameRate,
    /// Scan mode
    pub scan_mode: ScanMode,
    /// Four-character SDK display mode code
    pub sdk_code: u32,
    /// Dense registry position, used for bitmask indexing
    pub index: usize,
    /// Formatted name (`"HD1080p59.94"`)
    pub name: String,
}

impl VideoMode {
    /// Duration of one SDK frame in flicks. Interlaced rates count fields,
    /// so an interlaced frame spans two of them.
    pub fn frame_duration(&self) -> i64 {
        match self.scan_mode {
            ScanMode::Progressive => self.frame_rate.frame_duration(),
            ScanMode::Interlaced => self.frame_rate.frame_duration() * 2,
        }
    }

    /// Duration of one output tick: a frame, or a field when interlaced.
    pub fn field_duration(&self) -> i64 {
        self.frame_rate.frame_duration()
    }

    /// Frame size in pixels.
    pub fn dimensions(&self) -> (u32, u32) {
        self.resolution.dimensions()
    }
}

impl fmt::Display for VideoMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// Builds the display name of a mode from its parts.
pub fn format_mode_name(resolution: Resolution, frame_rate: FrameRate, scan: ScanMode) -> String {
    let mut name = String::from(resolution.name());
    if !resolution.omits_scan_letter() {
        name.push(scan.letter());
    }
    name.push_str(frame_rate.name());
    name
}

mod table {
    use super::FrameRate::*;
    use super::Resolution::*;
    use super::ScanMode::{Interlaced, Progressive};
    use super::{FrameRate, Resolution, ScanMode};

#[rustfmt::skip]
pub(super) static MODE_TABLE: &[(Resolution, FrameRate, ScanMode, u32)] = &[
    (Ntsc, Fps59_94, Interlaced, 0x6e74_7363),
    (Ntsc, Fps23_98, Interlaced, 0x6e74_3233),
    (Pal, Fps50, Interlaced, 0x7061_6c20),
    (Ntsc, Fps59_94, Progressive, 0x6e74_7370),
    (Pal, Fps50, Progressive, 0x7061_6c70),

    (Hd1080, Fps23_98, Progressive, 0x3233_7073),
    (Hd1080, Fps24, Progressive, 0x3234_7073),
    (Hd1080, Fps25, Progressive, 0x4870_3235),
    (Hd1080, Fps29_97, Progressive, 0x4870_3239),
    (Hd1080, Fps30, Progressive, 0x4870_3330),
    (Hd1080, Fps47_95, Progressive, 0x4870_3437),
    (Hd1080, Fps48, Progressive, 0x4870_3438),
    (Hd1080, Fps50, Progressive, 0x4870_3530),
    (Hd1080, Fps59_94, Progressive, 0x4870_3539),
    (Hd1080, Fps60, Progressive, 0x4870_3630),
    (Hd1080, Fps95_90, Progressive, 0x4870_3936),
    (Hd1080, Fps96, Progressive, 0x4870_3130),
    (Hd1080, Fps119_88, Progressive, 0x4870_3131),
    (Hd1080, Fps120, Progressive, 0x4870_3132),
    (Hd1080, Fps50, Interlaced, 0x4869_3530),
    (Hd1080, Fps59_94, Interlaced, 0x4869_3539),
    (Hd1080, Fps60, Interlaced, 0x4869_3630),

    (Hd720, Fps50, Progressive, 0x6870_3530),
    (Hd720, Fps59_94, Progressive, 0x6870_3539),
    (Hd720, Fps60, Progressive, 0x6870_3630),

    (TwoK, Fps23_98, Progressive, 0x326b_3233),
    (TwoK, Fps24, Progressive, 0x326b_3234),
    (TwoK, Fps25, Progressive, 0x326b_3235),

    (TwoKDci, Fps23_98, Progressive, 0x3264_3233),
    (TwoKDci, Fps24, Progressive, 0x3264_3234),
    (TwoKDci, Fps25, Progressive, 0x3264_3235),
    (TwoKDci, Fps29_97, Progressive, 0x3264_3239),
    (TwoKDci, Fps30, Progressive, 0x3264_3330),
    (TwoKDci, Fps47_95, Progressive, 0x3264_3437),
    (TwoKDci, Fps48, Progressive, 0x3264_3438),
    (TwoKDci, Fps50, Progressive, 0x3264_3530),
    (TwoKDci, Fps59_94, Progressive, 0x3264_3539),
    (TwoKDci, Fps60, Progressive, 0x3264_3630),
    (TwoKDci, Fps95_90, Progressive, 0x3264_3935),
    (TwoKDci, Fps96, Progressive, 0x3264_3936),
    (TwoKDci, Fps100, Progressive, 0x3264_3130),
    (TwoKDci, Fps119_88, Progressive, 0x3264_3131),
    (TwoKDci, Fps120, Progressive, 0x3264_3132),

    (Uhd2160, Fps23_98, Progressive, 0x346b_3233),
    (Uhd2160, Fps24, Progressive, 0x346b_3234),
    (Uhd2160, Fps25, Progressive, 0x346b_3235),
    (Uhd2160, Fps29_97, Progressive, 0x346b_3239),
    (Uhd2160, Fps30, Progressive, 0x346b_3330),
    (Uhd2160, Fps47_95, Progressive, 0x346b_3437),
    (Uhd2160, Fps48, Progressive, 0x346b_3438),
    (Uhd2160, Fps50, Progressive, 0x346b_3530),
    (Uhd2160, Fps59_94, Progressive, 0x346b_3539),
    (Uhd2160, Fps60, Progressive, 0x346b_3630),
    (Uhd2160, Fps95_90, Progressive, 0x346b_3935),
    (Uhd2160, Fps96, Progressive, 0x346b_3936),
    (Uhd2160, Fps100, Progressive, 0x346b_3130),
    (Uhd2160, Fps119_88, Progressive, 0x346b_3131),
    (Uhd2160, Fps120, Progressive, 0x346b_3132),

    (FourKDci, Fps23_98, Progressive, 0x3464_3233),
    (FourKDci, Fps24, Progressive, 0x3464_3234),
    (FourKDci, Fps25, Progressive, 0x3464_3235),
    (FourKDci, Fps29_97, Progressive, 0x3464_3239),
    (FourKDci, Fps30, Progressive, 0x3464_3330),
    (FourKDci, Fps47_95, Progressive, 0x3464_3437),
    (FourKDci, Fps48, Progressive, 0x3464_3438),
    (FourKDci, Fps50, Progressive, 0x3464_3530),
    (FourKDci, Fps59_94, Progressive, 0x3464_3539),
    (FourKDci, Fps60, Progressive, 0x3464_3630),
    (FourKDci, Fps95_90, Progressive, 0x3464_3935),
    (FourKDci, Fps96, Progressive, 0x3464_3936),
    (FourKDci, Fps100, Progressive, 0x3464_3130),
    (FourKDci, Fps119_88, Progressive, 0x3464_3131),
    (FourKDci, Fps120, Progressive, 0x3464_3132),

    (Uhd4320, Fps23_98, Progressive, 0x386b_3233),
    (Uhd4320, Fps24, Progressive, 0x386b_3234),
    (Uhd4320, Fps25, Progressive, 0x386b_3235),
    (Uhd4320, Fps29_97, Progressive, 0x386b_3239),
    (Uhd4320, Fps30, Progressive, 0x386b_3330),
    (Uhd4320, Fps47_95, Progressive, 0x386b_3437),
    (Uhd4320, Fps48, Progressive, 0x386b_3438),
    (Uhd4320, Fps50, Progressive, 0x386b_3530),
    (Uhd4320, Fps59_94, Progressive, 0x386b_3539),
    (Uhd4320, Fps60, Progressive, 0x386b_3630),

    (EightKDci, Fps23_98, Progressive, 0x3864_3233),
    (EightKDci, Fps24, Progressive, 0x3864_3234),
    (EightKDci, Fps25, Progressive, 0x3864_3235),
    (EightKDci, Fps29_97, Progressive, 0x3864_3239),
    (EightKDci, Fps30, Progressive, 0x3864_3330),
    (EightKDci, Fps47_95, Progressive, 0x3864_3437),
    (EightKDci, Fps48, Progressive, 0x3864_3438),
    (EightKDci, Fps50, Progressive, 0x3864_3530),
    (EightKDci, Fps59_94, Progressive, 0x3864_3539),
    (EightKDci, Fps60, Progressive, 0x3864_3630),

    (Pc640x480, Fps60, Progressive, 0x7667_6136),
    (Pc800x600, Fps60, Progressive, 0x7376_6736),
    (Pc1440x900, Fps50, Progressive, 0x7778_6735),
    (Pc1440x900, Fps60, Progressive, 0x7778_6736),
    (Pc1440x1080, Fps50, Progressive, 0x7378_6735),
    (Pc1440x1080, Fps60, Progressive, 0x7378_6736),
    (Pc1600x1200, Fps50, Progressive, 0x7578_6735),
    (Pc1600x1200, Fps60, Progressive, 0x7578_6736),
    (Pc1920x1200, Fps50, Progressive, 0x7775_7835),
    (Pc1920x1200, Fps60, Progressive, 0x7775_7836),
    (Pc1920x1440, Fps50, Progressive, 0x3139_3435),
    (Pc1920x1440, Fps60, Progressive, 0x3139_3436),
    (Pc2560x1440, Fps50, Progressive, 0x7771_6835),
    (Pc2560x1440, Fps60, Progressive, 0x7771_6836),
    (Pc2560x1600, Fps50, Progressive, 0x7771_7835),
    (Pc2560x1600, Fps60, Progressive, 0x7771_7836),
];
}

use table::MODE_TABLE;

static REGISTRY: Lazy<VideoModeRegistry> = Lazy::new(VideoModeRegistry::new);

/// The process-wide registry, built on first use.
pub fn registry() -> &'static VideoModeRegistry {
    &REGISTRY
}

/// Bidirectional lookup between SDK codes and mode triples.
#[derive(Debug)]
pub struct VideoModeRegistry {
    modes: Vec<VideoMode>,
    by_code: HashMap<u32, usize>,
    by_scan: [HashMap<(Resolution, FrameRate), usize>; 2],
}

impl VideoModeRegistry {
    /// Builds the registry from the static table.
    ///
    /// # Panics
    ///
    /// Panics if the table violates its own invariants (too many modes or
    /// frame rates, a duplicated SDK code or a duplicated triple).
    pub fn new() -> Self {
        assert!(MODE_TABLE.len() <= MAX_MODES, "too many video modes");
        assert!(FrameRate::COUNT <= MAX_FRAME_RATES, "too many frame rates");

        let mut modes = Vec::with_capacity(MODE_TABLE.len());
        let mut by_code = HashMap::with_capacity(MODE_TABLE.len());
        let mut by_scan: [HashMap<(Resolution, FrameRate), usize>; 2] =
            [HashMap::new(), HashMap::new()];

        for (index, &(resolution, frame_rate, scan_mode, sdk_code)) in
            MODE_TABLE.iter().enumerate()
        {
            let previous = by_code.insert(sdk_code, index);
            assert!(previous.is_none(), "duplicate SDK code {sdk_code:#010x}");

            let previous = by_scan[scan_mode.index()].insert((resolution, frame_rate), index);
            assert!(
                previous.is_none(),
                "duplicate mode {resolution:?} {frame_rate:?} {scan_mode:?}"
            );

            modes.push(VideoMode {
                resolution,
                frame_rate,
                scan_mode,
                sdk_code,
                index,
                name: format_mode_name(resolution, frame_rate, scan_mode),
            });
        }

        Self {
            modes,
            by_code,
            by_scan,
        }
    }

    /// Every registered mode, indexed by [`VideoMode::index`].
    pub fn modes(&self) -> &[VideoMode] {
        &self.modes
    }

    /// Number of registered modes.
    pub fn len(&self) -> usize {
        self.modes.len()
    }

    /// Always false once built, kept for API symmetry with `len`.
    pub fn is_empty(&self) -> bool {
        self.modes.is_empty()
    }

    /// Looks a mode up by SDK code. The unknown-mode sentinel and
    /// unregistered codes resolve to `None`.
    pub fn mode_from_sdk(&self, code: u32) -> Option<&VideoMode> {
        if code == UNKNOWN_MODE_CODE {
            return None;
        }
        self.by_code.get(&code).map(|&i| &self.modes[i])
    }

    /// Looks a mode up by its exact triple.
    pub fn mode(
        &self,
        resolution: Resolution,
        frame_rate: FrameRate,
        scan_mode: ScanMode,
    ) -> Option<&VideoMode> {
        self.by_scan[scan_mode.index()]
            .get(&(resolution, frame_rate))
            .map(|&i| &self.modes[i])
    }

    /// Looks a mode up by registry index.
    pub fn mode_at(&self, index: usize) -> Option<&VideoMode> {
        self.modes.get(index)
    }

    /// Resolution display names in registry order.
    pub fn resolution_names(&self) -> Vec<&'static str> {
        Resolution::ALL.iter().map(|r| r.name()).collect()
    }

    /// Frame rate display names in registry order.
    pub fn frame_rate_names(&self) -> Vec<&'static str> {
        FrameRate::ALL.iter().map(|f| f.name()).collect()
    }

    /// Scan mode display names.
    pub fn scan_mode_names(&self) -> Vec<&'static str> {
        ScanMode::ALL.iter().map(|s| s.name()).collect()
    }

    /// Formatted names of every mode, in registry order.
    pub fn mode_names(&self) -> Vec<&str> {
        self.modes.iter().map(|m| m.name.as_str()).collect()
    }
}

impl Default for VideoModeRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Per-device record of which modes the hardware reported.
///
/// An empty map means nothing has been queried yet; callers treat that as
/// "unfiltered" rather than "unsupported".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SupportMap {
    resolution_bits: [u32; Resolution::COUNT],
    scan_bits: [[u32; Resolution::COUNT]; 2],
    registered: usize,
}

impl SupportMap {
    /// Creates an empty map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the contents with the given modes.
    pub fn load_modes<'a>(&mut self, modes: impl IntoIterator<Item = &'a VideoMode>) {
        self.clear();
        for mode in modes {
            self.register(mode);
        }
    }

    /// Replaces the contents with every known mode among `codes`.
    /// Unknown codes are skipped.
    pub fn load_sdk_mode_values(&mut self, codes: &[u32]) {
        let registry = registry();
        self.load_modes(codes.iter().filter_map(|&c| registry.mode_from_sdk(c)));
    }

    fn register(&mut self, mode: &VideoMode) {
        let bit = mode.frame_rate.bit();
        let res = mode.resolution.index();
        self.resolution_bits[res] |= bit;
        self.scan_bits[mode.scan_mode.index()][res] |= bit;
        self.registered += 1;
    }

    /// Removes everything.
    pub fn clear(&mut self) {
        *self = Self::default();
    }

    /// True when no mode has been registered.
    pub fn is_empty(&self) -> bool {
        self.registered == 0
    }

    /// Number of modes registered by the last load.
    pub fn len(&self) -> usize {
        self.registered
    }

    /// True if the resolution is supported at any frame rate.
    pub fn is_resolution_supported(&self, resolution: Resolution) -> bool {
        self.resolution_bits[resolution.index()] != 0
    }

    /// True if the resolution is supported at this frame rate in any scan mode.
    pub fn is_frame_rate_supported(&self, resolution: Resolution, frame_rate: FrameRate) -> bool {
        self.resolution_bits[resolution.index()] & frame_rate.bit() != 0
    }

    /// True if the exact triple is supported.
    pub fn is_mode_supported(
        &self,
        resolution: Resolution,
        frame_rate: FrameRate,
        scan_mode: ScanMode,
    ) -> bool {
        self.scan_bits[scan_mode.index()][resolution.index()] & frame_rate.bit() != 0
    }

    /// Narrowing query: `None` components match anything.
    pub fn is_supported(
        &self,
        resolution: Resolution,
        frame_rate: Option<FrameRate>,
        scan_mode: Option<ScanMode>,
    ) -> bool {
        match (frame_rate, scan_mode) {
            (None, None) => self.is_resolution_supported(resolution),
            (Some(rate), None) => self.is_frame_rate_supported(resolution, rate),
            (Some(rate), Some(scan)) => self.is_mode_supported(resolution, rate, scan),
            (None, Some(scan)) => self.scan_bits[scan.index()][resolution.index()] != 0,
        }
    }

    /// Supported resolutions in registry order.
    pub fn resolutions(&self) -> Vec<Resolution> {
        Resolution::ALL
            .into_iter()
            .filter(|&r| self.is_resolution_supported(r))
            .collect()
    }

    /// Frame rates supported for a resolution.
    pub fn frame_rates(&self, resolution: Resolution) -> Vec<FrameRate> {
        FrameRate::ALL
            .into_iter()
            .filter(|&f| self.is_frame_rate_supported(resolution, f))
            .collect()
    }

    /// Scan modes supported for a resolution and frame rate.
    pub fn scan_modes(&self, resolution: Resolution, frame_rate: FrameRate) -> Vec<ScanMode> {
        ScanMode::ALL
            .into_iter()
            .filter(|&s| self.is_mode_supported(resolution, frame_rate, s))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mode_names() {
        let reg = registry();
        let mode = reg
            .mode(Resolution::Hd1080, FrameRate::Fps59_94, ScanMode::Progressive)
            .unwrap();
        assert_eq!(mode.name, "HD1080p59.94");

        let mode = reg
            .mode(Resolution::Ntsc, FrameRate::Fps59_94, ScanMode::Interlaced)
            .unwrap();
        assert_eq!(mode.name, "NTSCi59.94");

        let dci = reg
            .mode(Resolution::FourKDci, FrameRate::Fps24, ScanMode::Progressive)
            .unwrap();
        assert_eq!(dci.name, "4K DCI24");

        let pc = reg
            .mode(Resolution::Pc1920x1200, FrameRate::Fps50, ScanMode::Progressive)
            .unwrap();
        assert_eq!(pc.name, "1920 x 1200p50");
    }

    #[test]
    fn test_only_dci_names_drop_the_scan_letter() {
        let dci = [Resolution::TwoKDci, Resolution::FourKDci, Resolution::EightKDci];
        for resolution in Resolution::ALL {
            let name = format_mode_name(resolution, FrameRate::Fps25, ScanMode::Progressive);
            if dci.contains(&resolution) {
                assert_eq!(name, format!("{}25", resolution.name()));
            } else {
                assert_eq!(name, format!("{}p25", resolution.name()));
            }
        }
        assert_eq!(
            format_mode_name(Resolution::EightKDci, FrameRate::Fps24, ScanMode::Progressive),
            "8k DCI24"
        );
    }

    #[test]
    fn test_dci_has_no_interlaced_modes() {
        let reg = registry();
        for rate in FrameRate::ALL {
            assert!(reg
                .mode(Resolution::TwoKDci, rate, ScanMode::Interlaced)
                .is_none());
        }
    }

    #[test]
    fn test_unknown_codes() {
        let reg = registry();
        assert!(reg.mode_from_sdk(UNKNOWN_MODE_CODE).is_none());
        assert!(reg.mode_from_sdk(0).is_none());
        assert_eq!(
            reg.mode_from_sdk(0x4870_3630).map(|m| m.name.as_str()),
            Some("HD1080p60")
        );
    }

    #[test]
    fn test_indices_are_dense() {
        let reg = registry();
        for (i, mode) in reg.modes().iter().enumerate() {
            assert_eq!(mode.index, i);
            assert_eq!(reg.mode_at(i), Some(mode));
        }
    }

    #[test]
    fn test_interlaced_frame_spans_two_fields() {
        let reg = registry();
        let p = reg
            .mode(Resolution::Hd1080, FrameRate::Fps50, ScanMode::Progressive)
            .unwrap();
        let i = reg
            .mode(Resolution::Hd1080, FrameRate::Fps50, ScanMode::Interlaced)
            .unwrap();
        assert_eq!(p.frame_duration(), 14_112_000);
        assert_eq!(i.frame_duration(), 28_224_000);
        assert_eq!(i.field_duration(), 14_112_000);
    }

    #[test]
    fn test_support_map_empty() {
        let map = SupportMap::new();
        assert!(map.is_empty());
        assert!(!map.is_resolution_supported(Resolution::Hd1080));
    }

    #[test]
    fn test_support_map_queries() {
        let mut map = SupportMap::new();
        map.load_sdk_mode_values(&[0x4870_3530, 0x4869_3530, 0x6870_3630, 0xdead_beef]);

        assert_eq!(map.len(), 3);
        assert!(map.is_resolution_supported(Resolution::Hd1080));
        assert!(map.is_frame_rate_supported(Resolution::Hd1080, FrameRate::Fps50));
        assert!(!map.is_frame_rate_supported(Resolution::Hd1080, FrameRate::Fps60));
        assert_eq!(
            map.scan_modes(Resolution::Hd1080, FrameRate::Fps50),
            vec![ScanMode::Progressive, ScanMode::Interlaced]
        );
        assert_eq!(map.frame_rates(Resolution::Hd720), vec![FrameRate::Fps60]);
        assert_eq!(map.resolutions(), vec![Resolution::Hd1080, Resolution::Hd720]);
        assert!(map.is_supported(Resolution::Hd720, None, Some(ScanMode::Progressive)));
        assert!(!map.is_supported(Resolution::Hd720, None, Some(ScanMode::Interlaced)));
    }

    #[test]
    fn test_support_map_reload_clears_scan_bits() {
        let mut map = SupportMap::new();
        map.load_sdk_mode_values(&[0x4869_3530]);
        assert!(map.is_mode_supported(
            Resolution::Hd1080,
            FrameRate::Fps50,
            ScanMode::Interlaced
        ));

        map.load_sdk_mode_values(&[0x6870_3630]);
        assert!(!map.is_mode_supported(
            Resolution::Hd1080,
            FrameRate::Fps50,
            ScanMode::Interlaced
        ));
        assert!(!map.is_resolution_supported(Resolution::Hd1080));
    }
}
