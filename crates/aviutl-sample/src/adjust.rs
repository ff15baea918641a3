//! Per-pixel YC adjustment.

use aviutl_plugin::FilterParams;
use aviutl_sys::PixelYc;

pub const TRACK_GAIN: usize = 0;
pub const TRACK_LUMA: usize = 1;
pub const TRACK_CB: usize = 2;
pub const TRACK_CR: usize = 3;

pub const CHECK_CLAMP: usize = 0;
pub const CHECK_GRAYSCALE: usize = 1;
pub const CHECK_RESET: usize = 2;

const Y_RANGE: (i32, i32) = (0, 4096);
const C_RANGE: (i32, i32) = (-2048, 2048);

/// Settings for one frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Adjustment {
    /// Luma gain in percent.
    pub gain: i32,
    pub luma_offset: i32,
    pub cb_offset: i32,
    pub cr_offset: i32,
    pub clamp: bool,
    pub grayscale: bool,
}

impl Default for Adjustment {
    fn default() -> Self {
        Self {
            gain: 100,
            luma_offset: 0,
            cb_offset: 0,
            cr_offset: 0,
            clamp: true,
            grayscale: false,
        }
    }
}

impl Adjustment {
    pub fn from_params(params: &FilterParams<'_>) -> Self {
        Self {
            gain: params.track_or_default(TRACK_GAIN),
            luma_offset: params.track_or_default(TRACK_LUMA),
            cb_offset: params.track_or_default(TRACK_CB),
            cr_offset: params.track_or_default(TRACK_CR),
            clamp: params.check(CHECK_CLAMP).unwrap_or(true),
            grayscale: params.check(CHECK_GRAYSCALE).unwrap_or(false),
        }
    }

    /// True if [`apply`](Self::apply) never changes an in-range pixel.
    pub fn is_identity(&self) -> bool {
        self.gain == 100 && self.luma_offset == 0 && self.cb_offset == 0 && self.cr_offset == 0 && !self.grayscale
    }

    pub fn apply(&self, px: PixelYc) -> PixelYc {
        let mut y = i32::from(px.y) * self.gain / 100 + self.luma_offset;
        let (mut cb, mut cr) = if self.grayscale {
            (0, 0)
        } else {
            (i32::from(px.cb) + self.cb_offset, i32::from(px.cr) + self.cr_offset)
        };
        if self.clamp {
            y = y.clamp(Y_RANGE.0, Y_RANGE.1);
            cb = cb.clamp(C_RANGE.0, C_RANGE.1);
            cr = cr.clamp(C_RANGE.0, C_RANGE.1);
        }
        PixelYc {
            y: saturate(y),
            cb: saturate(cb),
            cr: saturate(cr),
        }
    }

    pub fn apply_row(&self, row: &mut [PixelYc]) {
        for px in row {
            *px = self.apply(*px);
        }
    }
}

fn saturate(v: i32) -> i16 {
    v.clamp(i32::from(i16::MIN), i32::from(i16::MAX)) as i16
}
