//! Output plugin ABI (`*.auo`).

use core::ffi::{c_char, c_void};

use bytemuck::Zeroable;

use crate::abi_flags;
use crate::win::{Bool, Hinstance, Hwnd};

abi_flags! {
    /// `OUTPUT_INFO::flag`.
    pub struct OutputInfoFlag {
        const VIDEO = 1;
        const AUDIO = 2;
        /// Running as part of a batch.
        const BATCH = 4;
    }
}

abi_flags! {
    /// Result of `func_get_flag`.
    pub struct OutputFrameFlag {
        const KEYFRAME = 1;
        const COPYFRAME = 2;
    }
}

/// Job description passed to `func_output`. 76 bytes.
#[derive(Clone, Copy)]
#[repr(C)]
pub struct OutputInfo {
    pub flag: OutputInfoFlag,
    pub w: i32,
    pub h: i32,
    pub rate: i32,
    pub scale: i32,
    pub n: i32,
    /// Bytes per RGB24 DIB frame.
    pub size: i32,
    pub audio_rate: i32,
    pub audio_ch: i32,
    pub audio_n: i32,
    /// Bytes per audio sample (all channels).
    pub audio_size: i32,
    pub savefile: *mut c_char,
    /// RGB24 DIB of frame `frame`. Valid until the next call.
    pub func_get_video: Option<unsafe extern "C" fn(frame: i32) -> *mut c_void>,
    /// Interleaved 16-bit PCM starting at `start`; `readed` receives the sample count.
    pub func_get_audio: Option<unsafe extern "C" fn(start: i32, length: i32, readed: *mut i32) -> *mut c_void>,
    pub func_is_abort: Option<unsafe extern "C" fn() -> Bool>,
    pub func_rest_time_disp: Option<unsafe extern "C" fn(now: i32, total: i32) -> Bool>,
    pub func_get_flag: Option<unsafe extern "C" fn(frame: i32) -> OutputFrameFlag>,
    pub func_update_preview: Option<unsafe extern "C" fn() -> Bool>,
    /// Like `func_get_video` in the given FOURCC (0 = RGB24).
    pub func_get_video_ex: Option<unsafe extern "C" fn(frame: i32, format: u32) -> *mut c_void>,
}

impl OutputInfo {
    pub const ABI_SIZE: usize = 76;
}

// SAFETY: integers, raw pointers and `Option<fn>`; all-zero is valid.
unsafe impl Zeroable for OutputInfo {}

impl Default for OutputInfo {
    fn default() -> Self {
        Zeroable::zeroed()
    }
}

/// Plugin table for output plugins. 104 bytes.
#[derive(Clone, Copy)]
#[repr(C)]
pub struct OutputPluginTable {
    /// Unused; zero.
    pub flag: i32,
    pub name: *mut c_char,
    pub filefilter: *mut c_char,
    pub information: *mut c_char,
    pub func_init: Option<unsafe extern "C" fn() -> Bool>,
    pub func_exit: Option<unsafe extern "C" fn() -> Bool>,
    pub func_output: Option<unsafe extern "C" fn(oip: *mut OutputInfo) -> Bool>,
    pub func_config: Option<unsafe extern "C" fn(hwnd: Hwnd, dll_hinst: Hinstance) -> Bool>,
    /// Copies settings into `data`; a null `data` queries the size. Returns the size.
    pub func_config_get: Option<unsafe extern "C" fn(data: *mut c_void, size: i32) -> i32>,
    /// Restores settings from `data`. Returns the number of bytes consumed.
    pub func_config_set: Option<unsafe extern "C" fn(data: *mut c_void, size: i32) -> i32>,
    pub reserved: [i32; 16],
}

impl OutputPluginTable {
    pub const ABI_SIZE: usize = 104;
}

// SAFETY: integers, raw pointers and `Option<fn>`; all-zero is valid.
unsafe impl Zeroable for OutputPluginTable {}

impl Default for OutputPluginTable {
    fn default() -> Self {
        Zeroable::zeroed()
    }
}
