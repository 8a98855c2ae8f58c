//! Pixel format and color definitions.
//!
//! Values match the DeckLink SDK four-character codes so they can be handed
//! to the native layer unchanged.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Pixel formats accepted by DeckLink devices.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PixelFormat {
    /// Let the device choose
    UseBestQuality,
    /// 4:2:2 YUV, 8 bit ('2vuy')
    #[default]
    Yuv8Bit,
    /// 4:2:2 YUV, 10 bit ('v210')
    Yuv10Bit,
    /// 4:4:4:4 ARGB, 8 bit
    Argb8Bit,
    /// 4:4:4:4 BGRA, 8 bit ('BGRA')
    Bgra8Bit,
    /// 4:4:4 RGB, 10 bit big endian ('r210')
    Rgb10Bit,
    /// 4:4:4 RGB, 10 bit little endian ('R10l')
    RgbxLe10Bit,
    /// 4:4:4 RGB, 10 bit big endian ('R10b')
    Rgbx10Bit,
    /// 4:4:4 RGB, 12 bit big endian ('R12B')
    Rgb12Bit,
    /// 4:4:4 RGB, 12 bit little endian ('R12L')
    RgbLe12Bit,
}

impl PixelFormat {
    /// SDK code.
    pub fn sdk_code(self) -> u32 {
        match self {
            PixelFormat::UseBestQuality => 0,
            PixelFormat::Yuv8Bit => 0x3276_7579,
            PixelFormat::Yuv10Bit => 0x7632_3130,
            PixelFormat::Argb8Bit => 32,
            PixelFormat::Bgra8Bit => 0x4247_5241,
            PixelFormat::Rgb10Bit => 0x7232_3130,
            PixelFormat::RgbxLe10Bit => 0x5231_306c,
            PixelFormat::Rgbx10Bit => 0x5231_3062,
            PixelFormat::Rgb12Bit => 0x5231_3242,
            PixelFormat::RgbLe12Bit => 0x5231_324c,
        }
    }

    /// Parses an SDK code.
    pub fn from_sdk_code(code: u32) -> Option<Self> {
        [
            PixelFormat::UseBestQuality,
            PixelFormat::Yuv8Bit,
            PixelFormat::Yuv10Bit,
            PixelFormat::Argb8Bit,
            PixelFormat::Bgra8Bit,
            PixelFormat::Rgb10Bit,
            PixelFormat::RgbxLe10Bit,
            PixelFormat::Rgbx10Bit,
            PixelFormat::Rgb12Bit,
            PixelFormat::RgbLe12Bit,
        ]
        .into_iter()
        .find(|f| f.sdk_code() == code)
    }

    /// Returns the format name as a string.
    pub fn name(self) -> &'static str {
        match self {
            PixelFormat::UseBestQuality => "Best Quality",
            PixelFormat::Yuv8Bit => "8-bit YUV",
            PixelFormat::Yuv10Bit => "10-bit YUV",
            PixelFormat::Argb8Bit => "8-bit ARGB",
            PixelFormat::Bgra8Bit => "8-bit BGRA",
            PixelFormat::Rgb10Bit => "10-bit RGB",
            PixelFormat::RgbxLe10Bit => "10-bit RGBX LE",
            PixelFormat::Rgbx10Bit => "10-bit RGBX",
            PixelFormat::Rgb12Bit => "12-bit RGB",
            PixelFormat::RgbLe12Bit => "12-bit RGB LE",
        }
    }

    /// Keying needs an alpha channel.
    pub fn is_keying_available(self) -> bool {
        matches!(self, PixelFormat::Argb8Bit | PixelFormat::Bgra8Bit)
    }

    /// Size of the backing buffer the device expects for one frame, as
    /// `(row bytes, rows, bytes per texel)`. Zero for [`PixelFormat::UseBestQuality`].
    pub fn byte_dimensions(self, width: u32, height: u32) -> (u32, u32, u32) {
        let row_bytes = match self {
            PixelFormat::UseBestQuality => return (0, 0, 4),
            PixelFormat::Yuv8Bit => width * 2,
            PixelFormat::Argb8Bit | PixelFormat::Bgra8Bit => width * 4,
            PixelFormat::Yuv10Bit => align_up(width / 6 * 16, 128),
            PixelFormat::Rgb10Bit | PixelFormat::RgbxLe10Bit | PixelFormat::Rgbx10Bit => {
                align_up(width * 4, 256)
            }
            PixelFormat::Rgb12Bit | PixelFormat::RgbLe12Bit => width * 36 / 8,
        };
        (row_bytes, height, 4)
    }

    /// Total backing buffer size in bytes.
    pub fn buffer_size(self, width: u32, height: u32) -> usize {
        let (row_bytes, rows, _) = self.byte_dimensions(width, height);
        row_bytes as usize * rows as usize
    }
}

fn align_up(value: u32, alignment: u32) -> u32 {
    value.div_ceil(alignment) * alignment
}

impl fmt::Display for PixelFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Color space of the signal.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ColorSpace {
    /// Follow the incoming signal
    UseDeviceSignal,
    /// Rec. 601
    Bt601,
    /// Rec. 709
    #[default]
    Bt709,
    /// Rec. 2020
    Bt2020,
}

impl ColorSpace {
    /// SDK flag value.
    pub fn sdk_code(self) -> u32 {
        match self {
            ColorSpace::UseDeviceSignal => 0,
            ColorSpace::Bt601 => 1 << 1,
            ColorSpace::Bt709 => 1 << 2,
            ColorSpace::Bt2020 => 1 << 3,
        }
    }
}

/// Transfer function of the signal.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TransferFunction {
    /// Follow the incoming signal
    UseDeviceSignal,
    /// Standard dynamic range
    Hdr,
    /// Perceptual quantizer
    Pq,
    /// Hybrid log-gamma
    #[default]
    Hlg,
}

impl TransferFunction {
    /// SDK value.
    pub fn sdk_code(self) -> u32 {
        match self {
            TransferFunction::UseDeviceSignal => 0,
            TransferFunction::Hdr => 1,
            TransferFunction::Pq => 2,
            TransferFunction::Hlg => 3,
        }
    }
}
