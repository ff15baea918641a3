//! Color conversion plugin ABI (`*.auc`).

use core::ffi::{c_char, c_void};

use bytemuck::Zeroable;

use crate::abi_flags;
use crate::filter::{MultiThreadFunc, PixelYc};
use crate::win::Bool;

abi_flags! {
    /// `COLOR_PROC_INFO::flag`.
    pub struct ColorInfoFlag {
        /// The DIB is stored top-down.
        const INVERT_HEIGHT = 1;
        const USE_SSE = 256;
        const USE_SSE2 = 512;
    }
}

/// Conversion job. 100 bytes.
#[derive(Clone, Copy)]
#[repr(C)]
pub struct ColorInfo {
    pub flag: ColorInfoFlag,
    pub ycp: *mut PixelYc,
    /// DIB data in `format`.
    pub pixelp: *mut c_void,
    /// FOURCC of `pixelp` (0 = RGB).
    pub format: u32,
    pub w: i32,
    pub h: i32,
    /// Bytes per row of `ycp`.
    pub line_size: i32,
    /// Bytes per pixel of `ycp`.
    pub yc_size: i32,
    pub exec_multi_thread_func:
        Option<unsafe extern "C" fn(func: MultiThreadFunc, param1: *mut c_void, param2: *mut c_void) -> Bool>,
    pub reserved: [i32; 16],
}

impl ColorInfo {
    pub const ABI_SIZE: usize = 100;
}

// SAFETY: integers, raw pointers and `Option<fn>`; all-zero is valid.
unsafe impl Zeroable for ColorInfo {}

impl Default for ColorInfo {
    fn default() -> Self {
        Zeroable::zeroed()
    }
}

/// Plugin table for color conversion plugins. 92 bytes.
#[derive(Clone, Copy)]
#[repr(C)]
pub struct ColorPluginTable {
    /// Unused; zero.
    pub flag: i32,
    pub name: *mut c_char,
    pub information: *mut c_char,
    pub func_init: Option<unsafe extern "C" fn() -> Bool>,
    pub func_exit: Option<unsafe extern "C" fn() -> Bool>,
    /// Returns `FALSE` if the format is not handled.
    pub func_pixel2yc: Option<unsafe extern "C" fn(cpip: *mut ColorInfo) -> Bool>,
    /// Returns `FALSE` if the format is not handled.
    pub func_yc2pixel: Option<unsafe extern "C" fn(cpip: *mut ColorInfo) -> Bool>,
    pub reserved: [i32; 16],
}

impl ColorPluginTable {
    pub const ABI_SIZE: usize = 92;
}

// SAFETY: integers, raw pointers and `Option<fn>`; all-zero is valid.
unsafe impl Zeroable for ColorPluginTable {}

impl Default for ColorPluginTable {
    fn default() -> Self {
        Zeroable::zeroed()
    }
}
