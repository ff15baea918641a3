//! Input plugin ABI (`*.aui`).

use core::ffi::{c_char, c_void};

use bytemuck::Zeroable;

use crate::abi_flags;
use crate::win::{BitmapInfoHeader, Bool, Hinstance, Hwnd, WaveFormatEx};

abi_flags! {
    /// `INPUT_INFO::flag`.
    pub struct InputInfoFlag {
        const VIDEO = 1;
        const AUDIO = 2;
        /// Frames can be read in any order.
        const VIDEO_RANDOM_ACCESS = 8;
    }
}

/// Stream description returned by `func_info_get`. 68 bytes.
///
/// `format` and `audio_format` must stay valid until the handle is closed.
#[derive(Debug, Clone, Copy)]
#[repr(C)]
pub struct InputInfo {
    pub flag: InputInfoFlag,
    pub rate: i32,
    pub scale: i32,
    pub n: i32,
    pub format: *mut BitmapInfoHeader,
    pub format_size: i32,
    /// Total audio samples.
    pub audio_n: i32,
    pub audio_format: *mut WaveFormatEx,
    pub audio_format_size: i32,
    /// Video codec FOURCC.
    pub handler: u32,
    pub reserved: [i32; 7],
}

impl InputInfo {
    pub const ABI_SIZE: usize = 68;
}

// SAFETY: integers and raw pointers; all-zero is valid.
unsafe impl Zeroable for InputInfo {}

impl Default for InputInfo {
    fn default() -> Self {
        Zeroable::zeroed()
    }
}

abi_flags! {
    /// `INPUT_PLUGIN_TABLE::flag`.
    pub struct InputPluginFlag {
        const VIDEO = 1;
        const AUDIO = 2;
    }
}

/// Opaque handle returned by `func_open`.
pub type InputHandle = *mut c_void;

/// Plugin table for input plugins. 116 bytes.
#[derive(Clone, Copy)]
#[repr(C)]
pub struct InputPluginTable {
    pub flag: InputPluginFlag,
    pub name: *mut c_char,
    /// File dialog filter, `"Name (*.ext)\0*.ext\0"`.
    pub filefilter: *mut c_char,
    pub information: *mut c_char,
    pub func_init: Option<unsafe extern "C" fn() -> Bool>,
    pub func_exit: Option<unsafe extern "C" fn() -> Bool>,
    /// Returns null on failure.
    pub func_open: Option<unsafe extern "C" fn(file: *mut c_char) -> InputHandle>,
    pub func_close: Option<unsafe extern "C" fn(ih: InputHandle) -> Bool>,
    pub func_info_get: Option<unsafe extern "C" fn(ih: InputHandle, iip: *mut InputInfo) -> Bool>,
    /// Returns the number of bytes written.
    pub func_read_video: Option<unsafe extern "C" fn(ih: InputHandle, frame: i32, buf: *mut c_void) -> i32>,
    /// Returns the number of samples written.
    pub func_read_audio:
        Option<unsafe extern "C" fn(ih: InputHandle, start: i32, length: i32, buf: *mut c_void) -> i32>,
    pub func_is_keyframe: Option<unsafe extern "C" fn(ih: InputHandle, frame: i32) -> Bool>,
    pub func_config: Option<unsafe extern "C" fn(hwnd: Hwnd, dll_hinst: Hinstance) -> Bool>,
    pub reserved: [i32; 16],
}

impl InputPluginTable {
    pub const ABI_SIZE: usize = 116;
}

// SAFETY: integers, raw pointers and `Option<fn>`; all-zero is valid.
unsafe impl Zeroable for InputPluginTable {}

impl Default for InputPluginTable {
    fn default() -> Self {
        Zeroable::zeroed()
    }
}
