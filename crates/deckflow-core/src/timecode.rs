//! SMPTE timecode in flicks
//!
//! Time is carried as an integer count of flicks (1/705,600,000 s), which
//! divides every broadcast frame rate exactly. A [`Timecode`] pairs a flick
//! count with the frame duration it was built for, and converts to and from
//! the BCD word the SDK attaches to frames.

use crate::{CoreError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Flicks in one second.
pub const FLICKS_PER_SECOND: i64 = 705_600_000;

/// BCD word the SDK uses for "no timecode".
pub const INVALID_BCD: u32 = 0xFFFF_FFFF;

/// Frame durations at or below this value (50 fps and faster) store the
/// frame number halved, with the low bit in the field flag.
const FIELD_PAIR_THRESHOLD: i64 = FLICKS_PER_SECOND / 50;

/// Converts a rational frame rate into a frame duration in flicks.
pub fn frame_duration_from_rate(numerator: u32, denominator: u32) -> i64 {
    FLICKS_PER_SECOND * denominator as i64 / numerator.max(1) as i64
}

/// A timecode value.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Timecode {
    frame_duration: i64,
    flicks: i64,
    drop_frame: bool,
    hour: u32,
    minute: u32,
    second: u32,
    frame: u32,
}

impl Timecode {
    /// Builds a timecode from an absolute flick count.
    pub fn from_flicks(frame_duration: i64, flicks: i64, drop_frame: bool) -> Result<Self> {
        if frame_duration <= 0 {
            return Err(CoreError::InvalidTimecode(format!(
                "frame duration must be positive, got {frame_duration}"
            )));
        }
        if flicks < 0 {
            return Err(CoreError::InvalidTimecode(format!(
                "flicks must not be negative, got {flicks}"
            )));
        }

        let (fps, fpm, fph) = frames_per_units(frame_duration);
        let frames = flicks / frame_duration;

        Ok(Self {
            frame_duration,
            flicks,
            drop_frame,
            hour: ((frames / fph) % 24) as u32,
            minute: ((frames % fph) / fpm) as u32,
            second: ((frames % fpm) / fps) as u32,
            frame: (frames % fps) as u32,
        })
    }

    /// Builds a timecode from its components.
    pub fn from_components(
        frame_duration: i64,
        hour: u32,
        minute: u32,
        second: u32,
        frame: u32,
        drop_frame: bool,
    ) -> Result<Self> {
        if frame_duration <= 0 {
            return Err(CoreError::InvalidTimecode(format!(
                "frame duration must be positive, got {frame_duration}"
            )));
        }

        let (fps, fpm, fph) = frames_per_units(frame_duration);
        if minute >= 60 || second >= 60 || frame as i64 >= fps {
            return Err(CoreError::InvalidTimecode(format!(
                "{hour:02}:{minute:02}:{second:02}:{frame:02} out of range"
            )));
        }

        let frames = fph * hour as i64 + fpm * minute as i64 + fps * second as i64 + frame as i64;

        Ok(Self {
            frame_duration,
            flicks: frames * frame_duration,
            drop_frame,
            hour: hour % 24,
            minute,
            second,
            frame,
        })
    }

    /// Decodes an SDK BCD word. Returns `None` for [`INVALID_BCD`].
    pub fn from_bcd(frame_duration: i64, bcd: u32) -> Result<Option<Self>> {
        if bcd == INVALID_BCD {
            return Ok(None);
        }

        let hour = ((bcd >> 28) & 0x3) * 10 + ((bcd >> 24) & 0xf);
        let minute = ((bcd >> 20) & 0x7) * 10 + ((bcd >> 16) & 0xf);
        let second = ((bcd >> 12) & 0x7) * 10 + ((bcd >> 8) & 0xf);
        let mut frame = ((bcd >> 4) & 0x3) * 10 + (bcd & 0xf);

        if frame_duration <= FIELD_PAIR_THRESHOLD {
            frame = frame * 2 + ((bcd >> 7) & 0x1);
        }

        let drop_frame = (bcd >> 6) & 0x1 != 0;

        Self::from_components(frame_duration, hour, minute, second, frame, drop_frame).map(Some)
    }

    /// Encodes this timecode as an SDK BCD word.
    pub fn to_bcd(&self) -> u32 {
        let mut frame = self.frame;
        let mut field = 0;

        if self.frame_duration <= FIELD_PAIR_THRESHOLD {
            field = frame & 1;
            frame /= 2;
        }

        let (h, m, s) = (self.hour, self.minute, self.second);

        (h / 10) << 28
            | (h % 10) << 24
            | (m / 10) << 20
            | (m % 10) << 16
            | (s / 10) << 12
            | (s % 10) << 8
            | field << 7
            | (self.drop_frame as u32) << 6
            | (frame / 10) << 4
            | (frame % 10)
    }

    /// Absolute time in flicks.
    pub fn flicks(&self) -> i64 {
        self.flicks
    }

    /// Frame duration this timecode counts in.
    pub fn frame_duration(&self) -> i64 {
        self.frame_duration
    }

    /// Whether drop-frame counting is flagged.
    pub fn is_drop_frame(&self) -> bool {
        self.drop_frame
    }

    /// Hours, wrapped to a day.
    pub fn hour(&self) -> u32 {
        self.hour
    }

    /// Minutes.
    pub fn minute(&self) -> u32 {
        self.minute
    }

    /// Seconds.
    pub fn second(&self) -> u32 {
        self.second
    }

    /// Frame within the second.
    pub fn frame(&self) -> u32 {
        self.frame
    }
}

fn frames_per_units(frame_duration: i64) -> (i64, i64, i64) {
    // Round up so 59.94 counts as 60 frames per second.
    let fps = (FLICKS_PER_SECOND + frame_duration - 1) / frame_duration;
    let fpm = fps * 60;
    (fps, fpm, fpm * 60)
}

impl PartialEq for Timecode {
    fn eq(&self, other: &Self) -> bool {
        self.flicks == other.flicks && self.drop_frame == other.drop_frame
    }
}

impl Eq for Timecode {}

impl fmt::Display for Timecode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sep = if self.drop_frame { ';' } else { ':' };
        write!(
            f,
            "{:02}:{:02}:{:02}{}{:02}",
            self.hour, self.minute, self.second, sep, self.frame
        )
    }
}
