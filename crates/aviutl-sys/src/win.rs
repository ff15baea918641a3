//! Win32 types that appear in the plugin ABI.
//!
//! Declared here rather than pulled from a Windows bindings crate so the
//! ABI compiles (and the mock host runs) on every target.

use core::ffi::c_void;

use bytemuck::{Pod, Zeroable};

/// Win32 `BOOL`.
pub type Bool = i32;

pub const TRUE: Bool = 1;
pub const FALSE: Bool = 0;

pub type Hwnd = *mut c_void;
pub type Hinstance = *mut c_void;
pub type Hfont = *mut c_void;

/// Window message parameters. Pointer sized on every target.
pub type Wparam = usize;
pub type Lparam = isize;

/// Convert a Rust `bool` into `BOOL`.
#[inline]
pub const fn to_bool(value: bool) -> Bool {
    if value {
        TRUE
    } else {
        FALSE
    }
}

/// Pack four ASCII bytes into a little-endian FOURCC.
#[inline]
pub const fn fourcc(code: &[u8; 4]) -> u32 {
    (code[0] as u32) | (code[1] as u32) << 8 | (code[2] as u32) << 16 | (code[3] as u32) << 24
}

/// `BI_RGB` compression (uncompressed DIB).
pub const BI_RGB: u32 = 0;

/// `WAVE_FORMAT_PCM`.
pub const WAVE_FORMAT_PCM: u16 = 1;

/// Win32 `BITMAPINFOHEADER`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Pod, Zeroable)]
#[repr(C)]
pub struct BitmapInfoHeader {
    pub size: u32,
    pub width: i32,
    pub height: i32,
    pub planes: u16,
    pub bit_count: u16,
    pub compression: u32,
    pub size_image: u32,
    pub x_pels_per_meter: i32,
    pub y_pels_per_meter: i32,
    pub clr_used: u32,
    pub clr_important: u32,
}

impl BitmapInfoHeader {
    pub const ABI_SIZE: usize = 40;

    /// Header for an uncompressed bottom-up DIB of the given bit depth.
    pub fn rgb(width: i32, height: i32, bit_count: u16) -> Self {
        Self {
            size: Self::ABI_SIZE as u32,
            width,
            height,
            planes: 1,
            bit_count,
            compression: BI_RGB,
            size_image: dib_image_size(width, height, bit_count) as u32,
            ..Self::default()
        }
    }

    /// Header for a packed YUV or other FOURCC format.
    pub fn fourcc(width: i32, height: i32, bit_count: u16, code: u32) -> Self {
        Self {
            compression: code,
            ..Self::rgb(width, height, bit_count)
        }
    }
}

/// Bytes occupied by a DIB whose rows are padded to four bytes.
pub fn dib_image_size(width: i32, height: i32, bit_count: u16) -> usize {
    let row = ((width.unsigned_abs() as usize * bit_count as usize + 31) / 32) * 4;
    row * height.unsigned_abs() as usize
}

/// Win32 `WAVEFORMATEX`. Byte packed, as declared by `mmsystem.h`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Pod, Zeroable)]
#[repr(C, packed)]
pub struct WaveFormatEx {
    pub format_tag: u16,
    pub channels: u16,
    pub samples_per_sec: u32,
    pub avg_bytes_per_sec: u32,
    pub block_align: u16,
    pub bits_per_sample: u16,
    pub cb_size: u16,
}

impl WaveFormatEx {
    pub const ABI_SIZE: usize = 18;

    /// Integer PCM description.
    pub fn pcm(samples_per_sec: u32, channels: u16, bits_per_sample: u16) -> Self {
        let block_align = channels * bits_per_sample / 8;
        Self {
            format_tag: WAVE_FORMAT_PCM,
            channels,
            samples_per_sec,
            avg_bytes_per_sec: samples_per_sec * block_align as u32,
            block_align,
            bits_per_sample,
            cb_size: 0,
        }
    }
}
