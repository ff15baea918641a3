//! Filter plugin ABI (`*.auf`).
//!
//! Field order and widths follow the host's `FILTER`, `FILTER_PROC_INFO` and
//! `EXFUNC` structures exactly. Sizes quoted in the docs are for 32-bit x86.

use core::ffi::{c_char, c_void};

use bytemuck::{Pod, Zeroable};

use crate::win::{Bool, Hfont, Hinstance, Hwnd, Lparam, Wparam};
use crate::{abi_enum, abi_flags};

/// One pixel in the host's YCbCr working format.
///
/// Values may lie outside the nominal range; the host clamps on output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Pod, Zeroable)]
#[repr(C)]
pub struct PixelYc {
    /// Luma, nominally `0..=4096`.
    pub y: i16,
    /// Blue difference, nominally `-2048..=2048`.
    pub cb: i16,
    /// Red difference, nominally `-2048..=2048`.
    pub cr: i16,
}

impl PixelYc {
    pub const ABI_SIZE: usize = 6;

    pub const Y_MIN: i16 = 0;
    pub const Y_MAX: i16 = 4096;
    pub const C_MIN: i16 = -2048;
    pub const C_MAX: i16 = 2048;

    /// Neutral black.
    pub const BLACK: Self = Self::new(0, 0, 0);
    /// Neutral white.
    pub const WHITE: Self = Self::new(Self::Y_MAX, 0, 0);

    #[inline]
    pub const fn new(y: i16, cb: i16, cr: i16) -> Self {
        Self { y, cb, cr }
    }

    /// Components as an array.
    #[inline]
    pub const fn to_array(self) -> [i16; 3] {
        [self.y, self.cb, self.cr]
    }

    /// True if every component is inside its nominal range.
    #[inline]
    pub fn in_range(self) -> bool {
        (Self::Y_MIN..=Self::Y_MAX).contains(&self.y)
            && (Self::C_MIN..=Self::C_MAX).contains(&self.cb)
            && (Self::C_MIN..=Self::C_MAX).contains(&self.cr)
    }

    /// Clamp every component to its nominal range.
    #[inline]
    pub fn clamped(self) -> Self {
        Self {
            y: self.y.clamp(Self::Y_MIN, Self::Y_MAX),
            cb: self.cb.clamp(Self::C_MIN, Self::C_MAX),
            cr: self.cr.clamp(Self::C_MIN, Self::C_MAX),
        }
    }
}

impl From<[i16; 3]> for PixelYc {
    #[inline]
    fn from([y, cb, cr]: [i16; 3]) -> Self {
        Self { y, cb, cr }
    }
}

/// One pixel of a 24-bit DIB (BGR byte order).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Pod, Zeroable)]
#[repr(C)]
pub struct Pixel {
    pub b: u8,
    pub g: u8,
    pub r: u8,
}

impl Pixel {
    pub const ABI_SIZE: usize = 3;

    #[inline]
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { b, g, r }
    }
}

abi_flags! {
    /// `FILTER_PROC_INFO::flag`.
    pub struct ProcInfoFlag {
        /// Field order is reversed (bottom field first).
        const INVERT_FIELD_ORDER = 0x0001_0000;
        /// Deinterlace with inverted order.
        const INVERT_INTERLACE = 0x0002_0000;
    }
}

/// Arguments of `func_proc`. 104 bytes.
///
/// For deinterlace filters `ycp_edit` starts empty and the buffers and
/// dimensions must not be changed.
#[derive(Debug, Clone, Copy)]
#[repr(C)]
pub struct FilterProcInfo {
    pub flag: ProcInfoFlag,
    /// Working image. Rows are `line_size` bytes apart.
    pub ycp_edit: *mut PixelYc,
    /// Scratch image with the same geometry; may be swapped with `ycp_edit`.
    pub ycp_temp: *mut PixelYc,
    pub w: i32,
    pub h: i32,
    pub max_w: i32,
    pub max_h: i32,
    /// Current frame index (0-based).
    pub frame: i32,
    pub frame_n: i32,
    pub org_w: i32,
    pub org_h: i32,
    /// Interleaved 16-bit PCM. `audio_n * audio_ch` samples.
    pub audiop: *mut i16,
    /// Samples per channel.
    pub audio_n: i32,
    pub audio_ch: i32,
    /// Unused by current hosts; always null.
    pub pixelp: *mut Pixel,
    /// Edit handle.
    pub editp: *mut c_void,
    /// Bytes per pixel in the YC buffers.
    pub yc_size: i32,
    /// Bytes per row in the YC buffers.
    pub line_size: i32,
    pub reserved: [i32; 8],
}

impl FilterProcInfo {
    pub const ABI_SIZE: usize = 104;
}

// SAFETY: integers, raw pointers and flag newtypes; all-zero is valid.
unsafe impl Zeroable for FilterProcInfo {}

abi_enum! {
    /// `FRAME_STATUS::inter`.
    pub struct InterlaceType {
        const NORMAL = 0;
        const REVERSE = 1;
        const ODD = 2;
        const EVEN = 3;
        const MIX = 4;
        const AUTO = 5;
    }
}

abi_flags! {
    /// `FRAME_STATUS::edit_flag`.
    pub struct EditFlag {
        const KEYFRAME = 1;
        const MARKFRAME = 2;
        const DELFRAME = 4;
        const NULLFRAME = 8;
    }
}

/// Per-frame status. 64 bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Pod, Zeroable)]
#[repr(C)]
pub struct FrameStatus {
    /// Source video frame number.
    pub video: i32,
    /// Source audio frame number.
    pub audio: i32,
    pub inter: InterlaceType,
    /// Obsolete 24fps index.
    pub index24fps: i32,
    /// Profile number.
    pub config: i32,
    /// Compression setting number.
    pub vcm: i32,
    pub edit_flag: EditFlag,
    pub reserved: [i32; 9],
}

impl FrameStatus {
    pub const ABI_SIZE: usize = 64;
}

abi_flags! {
    /// `FILE_INFO::flag`.
    pub struct FileInfoFlag {
        const VIDEO = 1;
        const AUDIO = 2;
    }
}

/// Description of an opened media file. 64 bytes.
#[derive(Debug, Clone, Copy)]
#[repr(C)]
pub struct FileInfo {
    pub flag: FileInfoFlag,
    /// File name (null for `avi_file_open`).
    pub name: *mut c_char,
    pub w: i32,
    pub h: i32,
    pub video_rate: i32,
    pub video_scale: i32,
    pub audio_rate: i32,
    pub audio_ch: i32,
    pub frame_n: i32,
    /// Decoded video FOURCC.
    pub video_decode_format: u32,
    pub video_decode_bit: i32,
    /// Total audio samples (set by `avi_file_open` only).
    pub audio_n: i32,
    pub reserved: [i32; 4],
}

impl FileInfo {
    pub const ABI_SIZE: usize = 64;
}

// SAFETY: integers and raw pointers; all-zero is valid.
unsafe impl Zeroable for FileInfo {}

abi_flags! {
    /// `SYS_INFO::flag`.
    pub struct SystemInfoFlag {
        const EDIT = 1;
        const VFAPI = 2;
        const USE_SSE = 4;
        const USE_SSE2 = 8;
    }
}

/// Host environment. 76 bytes.
#[derive(Debug, Clone, Copy)]
#[repr(C)]
pub struct SystemInfo {
    pub flag: SystemInfoFlag,
    /// Version string.
    pub info: *mut c_char,
    /// Number of registered filters.
    pub filter_n: i32,
    pub min_w: i32,
    pub min_h: i32,
    pub max_w: i32,
    pub max_h: i32,
    pub max_frame: i32,
    pub edit_name: *mut c_char,
    pub project_name: *mut c_char,
    pub output_name: *mut c_char,
    pub vram_w: i32,
    pub vram_h: i32,
    pub vram_yc_size: i32,
    pub vram_line_size: i32,
    pub hfont: Hfont,
    /// Build number; increases with each release.
    pub build: i32,
    pub reserved: [i32; 2],
}

impl SystemInfo {
    pub const ABI_SIZE: usize = 76;
}

// SAFETY: integers and raw pointers; all-zero is valid.
unsafe impl Zeroable for SystemInfo {}

/// Worker signature for `exec_multi_thread_func`.
pub type MultiThreadFunc =
    unsafe extern "C" fn(thread_id: i32, thread_num: i32, param1: *mut c_void, param2: *mut c_void);

/// Handle returned by `avi_file_open`.
pub type AviFileHandle = *mut c_void;

abi_flags! {
    /// Flags for `avi_file_open`.
    pub struct AviFileOpenFlag {
        const VIDEO_ONLY = 16;
        const AUDIO_ONLY = 32;
        const ONLY_YUY2 = 0x0001_0000;
        const ONLY_RGB24 = 0x0002_0000;
        const ONLY_RGB32 = 0x0004_0000;
    }
}

abi_enum! {
    /// Argument of `get_avi_file_filter`.
    pub struct AviFileFilterType {
        const VIDEO = 0;
        const AUDIO = 1;
    }
}

abi_enum! {
    /// Argument of `get_frame_status_table`.
    pub struct FrameStatusType {
        const EDIT_FLAG = 0;
        const INTERLACE = 1;
    }
}

abi_flags! {
    /// Modifier keys for `add_menu_item`.
    pub struct AddMenuItemFlag {
        const KEY_SHIFT = 1;
        const KEY_CTRL = 2;
        const KEY_ALT = 4;
    }
}

abi_flags! {
    /// Flags for `edit_open`.
    pub struct EditOpenFlag {
        const ADD = 2;
        const AUDIO = 16;
        const PROJECT = 512;
        const DIALOG = 65536;
    }
}

abi_flags! {
    /// Flags for `edit_output`.
    pub struct EditOutputFlag {
        const NO_DIALOG = 2;
        const WAV = 4;
    }
}

/// Host services handed to filters (`EXFUNC`). 320 bytes.
///
/// Unless noted, pointers returned by the host stay valid only until the
/// next host call or until control returns to the host.
#[derive(Clone, Copy)]
#[repr(C)]
pub struct CallbackFunctionSet {
    /// Obsolete; use `get_ycp_source_cache`.
    pub get_ycp_ofs: Option<unsafe extern "C" fn(editp: *mut c_void, n: i32, ofs: i32) -> *mut c_void>,
    /// Obsolete; use `get_ycp_source_cache`.
    pub get_ycp: Option<unsafe extern "C" fn(editp: *mut c_void, n: i32) -> *mut c_void>,
    pub get_pixelp: Option<unsafe extern "C" fn(editp: *mut c_void, n: i32) -> *mut c_void>,
    /// Unfiltered audio. A null buffer queries the sample count.
    pub get_audio: Option<unsafe extern "C" fn(editp: *mut c_void, n: i32, buf: *mut c_void) -> i32>,
    pub is_editing: Option<unsafe extern "C" fn(editp: *mut c_void) -> Bool>,
    pub is_saving: Option<unsafe extern "C" fn(editp: *mut c_void) -> Bool>,
    pub get_frame: Option<unsafe extern "C" fn(editp: *mut c_void) -> i32>,
    pub get_frame_n: Option<unsafe extern "C" fn(editp: *mut c_void) -> i32>,
    pub get_frame_size: Option<unsafe extern "C" fn(editp: *mut c_void, w: *mut i32, h: *mut i32) -> Bool>,
    pub set_frame: Option<unsafe extern "C" fn(editp: *mut c_void, n: i32) -> i32>,
    pub set_frame_n: Option<unsafe extern "C" fn(editp: *mut c_void, n: i32) -> i32>,
    pub copy_frame: Option<unsafe extern "C" fn(editp: *mut c_void, d: i32, s: i32) -> Bool>,
    pub copy_video: Option<unsafe extern "C" fn(editp: *mut c_void, d: i32, s: i32) -> Bool>,
    pub copy_audio: Option<unsafe extern "C" fn(editp: *mut c_void, d: i32, s: i32) -> Bool>,
    pub copy_clip: Option<unsafe extern "C" fn(hwnd: Hwnd, pixelp: *mut c_void, w: i32, h: i32) -> Bool>,
    pub paste_clip: Option<unsafe extern "C" fn(hwnd: Hwnd, editp: *mut c_void, n: i32) -> Bool>,
    pub get_frame_status: Option<unsafe extern "C" fn(editp: *mut c_void, n: i32, fsp: *mut FrameStatus) -> Bool>,
    pub set_frame_status: Option<unsafe extern "C" fn(editp: *mut c_void, n: i32, fsp: *mut FrameStatus) -> Bool>,
    pub is_saveframe: Option<unsafe extern "C" fn(editp: *mut c_void, n: i32) -> Bool>,
    pub is_keyframe: Option<unsafe extern "C" fn(editp: *mut c_void, n: i32) -> Bool>,
    pub is_recompress: Option<unsafe extern "C" fn(editp: *mut c_void, n: i32) -> Bool>,
    pub filter_window_update: Option<unsafe extern "C" fn(fp: *mut c_void) -> Bool>,
    pub is_filter_window_disp: Option<unsafe extern "C" fn(fp: *mut c_void) -> Bool>,
    pub get_file_info: Option<unsafe extern "C" fn(editp: *mut c_void, fip: *mut FileInfo) -> Bool>,
    pub get_config_name: Option<unsafe extern "C" fn(editp: *mut c_void, n: i32) -> *mut c_char>,
    pub is_filter_active: Option<unsafe extern "C" fn(fp: *mut c_void) -> Bool>,
    /// Filtered DIB. Null `pixelp` queries the size only.
    pub get_pixel_filtered: Option<
        unsafe extern "C" fn(editp: *mut c_void, n: i32, pixelp: *mut c_void, w: *mut i32, h: *mut i32) -> Bool,
    >,
    pub get_audio_filtered: Option<unsafe extern "C" fn(editp: *mut c_void, n: i32, buf: *mut c_void) -> i32>,
    pub get_select_frame: Option<unsafe extern "C" fn(editp: *mut c_void, s: *mut i32, e: *mut i32) -> Bool>,
    pub set_select_frame: Option<unsafe extern "C" fn(editp: *mut c_void, s: i32, e: i32) -> Bool>,
    pub rgb2yc: Option<unsafe extern "C" fn(ycp: *mut PixelYc, pixelp: *mut Pixel, count: i32) -> Bool>,
    pub yc2rgb: Option<unsafe extern "C" fn(pixelp: *mut Pixel, ycp: *mut PixelYc, count: i32) -> Bool>,
    /// Open-file dialog. `name` receives at most `MAX_PATH` bytes.
    pub dlg_get_load_name:
        Option<unsafe extern "C" fn(name: *mut c_char, filter: *mut c_char, def: *mut c_char) -> Bool>,
    pub dlg_get_save_name:
        Option<unsafe extern "C" fn(name: *mut c_char, filter: *mut c_char, def: *mut c_char) -> Bool>,
    pub ini_load_int: Option<unsafe extern "C" fn(fp: *mut c_void, key: *mut c_char, n: i32) -> i32>,
    pub ini_save_int: Option<unsafe extern "C" fn(fp: *mut c_void, key: *mut c_char, n: i32) -> i32>,
    pub ini_load_str: Option<
        unsafe extern "C" fn(fp: *mut c_void, key: *mut c_char, str: *mut c_char, def: *mut c_char) -> Bool,
    >,
    pub ini_save_str: Option<unsafe extern "C" fn(fp: *mut c_void, key: *mut c_char, str: *mut c_char) -> Bool>,
    pub get_source_file_info:
        Option<unsafe extern "C" fn(editp: *mut c_void, fip: *mut FileInfo, source_file_id: i32) -> Bool>,
    pub get_source_video_number: Option<
        unsafe extern "C" fn(editp: *mut c_void, n: i32, source_file_id: *mut i32, source_video_number: *mut i32) -> Bool,
    >,
    /// A null `editp` leaves the editing flag and file names unset.
    pub get_sys_info: Option<unsafe extern "C" fn(editp: *mut c_void, sip: *mut SystemInfo) -> Bool>,
    pub get_filterp: Option<unsafe extern "C" fn(filter_id: i32) -> *mut c_void>,
    /// Obsolete; use `get_ycp_filtering_cache_ex`.
    pub get_ycp_filtering:
        Option<unsafe extern "C" fn(fp: *mut c_void, editp: *mut c_void, n: i32, reserve: *mut c_void) -> *mut c_void>,
    pub get_audio_filtering:
        Option<unsafe extern "C" fn(fp: *mut c_void, editp: *mut c_void, n: i32, buf: *mut c_void) -> i32>,
    /// Reallocates only when a setting changes; the cache exists only while the filter is active.
    pub set_ycp_filtering_cache_size:
        Option<unsafe extern "C" fn(fp: *mut c_void, w: i32, h: i32, d: i32, flag: i32) -> Bool>,
    /// Obsolete; use `get_ycp_filtering_cache_ex`.
    pub get_ycp_filtering_cache:
        Option<unsafe extern "C" fn(fp: *mut c_void, editp: *mut c_void, n: i32) -> *mut c_void>,
    /// Valid until evicted from the cache.
    pub get_ycp_source_cache: Option<unsafe extern "C" fn(editp: *mut c_void, n: i32, ofs: i32) -> *mut c_void>,
    /// Display filters only.
    pub get_disp_pixelp: Option<unsafe extern "C" fn(editp: *mut c_void, format: u32) -> *mut c_void>,
    pub get_pixel_source:
        Option<unsafe extern "C" fn(editp: *mut c_void, n: i32, pixelp: *mut c_void, format: u32) -> Bool>,
    pub get_pixel_filtered_ex: Option<
        unsafe extern "C" fn(editp: *mut c_void, n: i32, pixelp: *mut c_void, w: *mut i32, h: *mut i32, format: u32) -> Bool,
    >,
    /// Valid until evicted from the cache.
    pub get_ycp_filtering_cache_ex: Option<
        unsafe extern "C" fn(fp: *mut c_void, editp: *mut c_void, n: i32, w: *mut i32, h: *mut i32) -> *mut PixelYc,
    >,
    /// Runs `func` on every worker and returns when all have finished.
    /// Workers must not call Win32 or host functions other than `rgb2yc`/`yc2rgb`.
    pub exec_multi_thread_func:
        Option<unsafe extern "C" fn(func: MultiThreadFunc, param1: *mut c_void, param2: *mut c_void) -> Bool>,
    pub create_yc: Option<unsafe extern "C" fn() -> *mut PixelYc>,
    pub delete_yc: Option<unsafe extern "C" fn(ycp: *mut PixelYc)>,
    /// A null `ycp` only reports the size.
    pub load_image:
        Option<unsafe extern "C" fn(ycp: *mut PixelYc, file: *mut c_char, w: *mut i32, h: *mut i32, flag: i32) -> Bool>,
    pub resize_yc: Option<
        unsafe extern "C" fn(
            ycp: *mut PixelYc,
            w: i32,
            h: i32,
            ycp_src: *mut PixelYc,
            sx: i32,
            sy: i32,
            sw: i32,
            sh: i32,
        ),
    >,
    pub copy_yc: Option<
        unsafe extern "C" fn(
            ycp: *mut PixelYc,
            x: i32,
            y: i32,
            ycp_src: *mut PixelYc,
            sx: i32,
            sy: i32,
            sw: i32,
            sh: i32,
            tr: i32,
        ),
    >,
    pub draw_text: Option<
        unsafe extern "C" fn(
            ycp: *mut PixelYc,
            x: i32,
            y: i32,
            text: *mut c_char,
            r: i32,
            g: i32,
            b: i32,
            tr: i32,
            hfont: Hfont,
            w: *mut i32,
            h: *mut i32,
        ),
    >,
    pub avi_file_open:
        Option<unsafe extern "C" fn(file: *mut c_char, fip: *mut FileInfo, flag: AviFileOpenFlag) -> AviFileHandle>,
    pub avi_file_close: Option<unsafe extern "C" fn(afh: AviFileHandle)>,
    pub avi_file_read_video: Option<unsafe extern "C" fn(afh: AviFileHandle, ycp: *mut PixelYc, n: i32) -> Bool>,
    pub avi_file_read_audio: Option<unsafe extern "C" fn(afh: AviFileHandle, buf: *mut c_void, n: i32) -> i32>,
    pub avi_file_get_video_pixelp: Option<unsafe extern "C" fn(afh: AviFileHandle, n: i32) -> *mut c_void>,
    pub get_avi_file_filter: Option<unsafe extern "C" fn(kind: AviFileFilterType) -> *mut c_char>,
    pub avi_file_read_audio_sample:
        Option<unsafe extern "C" fn(afh: AviFileHandle, start: i32, length: i32, buf: *mut c_void) -> i32>,
    pub avi_file_set_audio_sample_rate:
        Option<unsafe extern "C" fn(afh: AviFileHandle, audio_rate: i32, audio_ch: i32) -> i32>,
    pub get_frame_status_table: Option<unsafe extern "C" fn(editp: *mut c_void, kind: FrameStatusType) -> *mut u8>,
    pub set_undo: Option<unsafe extern "C" fn(editp: *mut c_void) -> Bool>,
    pub add_menu_item: Option<
        unsafe extern "C" fn(
            fp: *mut c_void,
            name: *mut c_char,
            hwnd: Hwnd,
            id: i32,
            def_key: i32,
            flag: AddMenuItemFlag,
        ) -> Bool,
    >,
    pub edit_open: Option<unsafe extern "C" fn(editp: *mut c_void, file: *mut c_char, flag: EditOpenFlag) -> Bool>,
    pub edit_close: Option<unsafe extern "C" fn(editp: *mut c_void) -> Bool>,
    pub edit_output: Option<
        unsafe extern "C" fn(editp: *mut c_void, file: *mut c_char, flag: EditOutputFlag, kind: *mut c_char) -> Bool,
    >,
    pub set_config: Option<unsafe extern "C" fn(editp: *mut c_void, n: i32, name: *mut c_char) -> Bool>,
    pub reserved: [i32; 7],
}

impl CallbackFunctionSet {
    pub const ABI_SIZE: usize = 320;
}

// SAFETY: every callback slot is `Option<fn>` (null is `None`) and the rest are integers.
unsafe impl Zeroable for CallbackFunctionSet {}

abi_flags! {
    /// `FILTER::flag`.
    pub struct FilterFlag {
        const ACTIVE = 1;
        const ALWAYS_ACTIVE = 4;
        const CONFIG_POPUP = 8;
        const CONFIG_CHECK = 16;
        const CONFIG_RADIO = 32;
        const EX_DATA = 1024;
        const PRIORITY_HIGHEST = 2048;
        const PRIORITY_LOWEST = 4096;
        const WINDOW_THICKFRAME = 8192;
        const WINDOW_SIZE = 16384;
        const DISP_FILTER = 32768;
        const REDRAW = 0x0002_0000;
        const EX_INFORMATION = 0x0004_0000;
        const INFORMATION = 0x0008_0000;
        const NO_CONFIG = 0x0010_0000;
        const AUDIO_FILTER = 0x0020_0000;
        const RADIO_BUTTON = 0x0040_0000;
        const WINDOW_HSCROLL = 0x0080_0000;
        const WINDOW_VSCROLL = 0x0100_0000;
        const INTERLACE_FILTER = 0x0400_0000;
        const NO_INIT_DATA = 0x0800_0000;
        const IMPORT = 0x1000_0000;
        const EXPORT = 0x2000_0000;
        const MAIN_MESSAGE = 0x4000_0000;
    }
}

abi_enum! {
    /// Messages delivered to `func_WndProc` beyond ordinary Win32 ones.
    pub struct WindowMessage {
        const UPDATE = 1124;
        const FILE_OPEN = 1125;
        const FILE_CLOSE = 1126;
        const INIT = 1127;
        const EXIT = 1128;
        const SAVE_START = 1129;
        const SAVE_END = 1130;
        const IMPORT = 1131;
        const EXPORT = 1132;
        const CHANGE_ACTIVE = 1133;
        const CHANGE_WINDOW = 1134;
        const CHANGE_PARAM = 1135;
        const CHANGE_EDIT = 1136;
        const COMMAND = 1137;
        const FILE_UPDATE = 1138;
        const MAIN_MOUSE_DOWN = 1144;
        const MAIN_MOUSE_UP = 1145;
        const MAIN_MOUSE_MOVE = 1146;
        const MAIN_KEY_DOWN = 1147;
        const MAIN_KEY_UP = 1148;
        const MAIN_MOVESIZE = 1149;
        const MAIN_MOUSE_DBLCLK = 1150;
        const MAIN_MOUSE_R_DOWN = 1151;
        const MAIN_MOUSE_R_UP = 1152;
        const MAIN_MOUSE_WHEEL = 1153;
        const MAIN_CONTEXTMENU = 1154;
        /// Button id offset for filter buttons (`WM_COMMAND` wparam).
        const FILTER_BUTTON = 12004;
    }
}

abi_enum! {
    /// Argument of `func_update`. For `TRACK`/`CHECK` the low 16 bits hold the control index.
    pub struct FilterUpdateStatus {
        const ALL = 0;
        const TRACK = 0x0001_0000;
        const CHECK = 0x0002_0000;
    }
}

impl FilterUpdateStatus {
    /// Category with the control index masked off.
    #[inline]
    pub const fn kind(self) -> Self {
        Self(self.0 & !0xffff)
    }

    /// Control index for `TRACK`/`CHECK` updates.
    #[inline]
    pub const fn index(self) -> usize {
        (self.0 & 0xffff) as usize
    }
}

abi_flags! {
    /// Modifiers combined into `FILTER::x` to size the client area.
    pub struct FilterWindowSize {
        const CLIENT = 0x1000_0000;
        const ADD = 0x3000_0000;
    }
}

/// Plugin table for filters (`FILTER_DLL` / `FILTER`). 140 bytes.
///
/// The plugin hands this over at load time; the host keeps its own copy and
/// fills the host-owned fields (`track`, `check`, `ex_data_ptr`,
/// `exfunc`, `hwnd`, `dll_hinst`, `dll_path`).
#[derive(Clone, Copy)]
#[repr(C)]
pub struct FilterPluginTable {
    pub flag: FilterFlag,
    /// Window width, optionally combined with `FilterWindowSize` bits.
    pub x: i32,
    pub y: i32,
    pub name: *mut c_char,
    pub track_n: i32,
    pub track_name: *mut *mut c_char,
    pub track_default: *mut i32,
    /// Lower limits (null means all 0).
    pub track_s: *mut i32,
    /// Upper limits (null means all 256).
    pub track_e: *mut i32,
    pub check_n: i32,
    pub check_name: *mut *mut c_char,
    pub check_default: *mut i32,
    pub func_proc: Option<unsafe extern "C" fn(fp: *mut FilterPluginTable, fpip: *mut FilterProcInfo) -> Bool>,
    pub func_init: Option<unsafe extern "C" fn(fp: *mut FilterPluginTable) -> Bool>,
    pub func_exit: Option<unsafe extern "C" fn(fp: *mut FilterPluginTable) -> Bool>,
    pub func_update: Option<unsafe extern "C" fn(fp: *mut FilterPluginTable, status: FilterUpdateStatus) -> Bool>,
    /// Returns `TRUE` to request a redraw.
    pub func_wndproc: Option<
        unsafe extern "C" fn(
            hwnd: Hwnd,
            message: u32,
            wparam: Wparam,
            lparam: Lparam,
            editp: *mut c_void,
            fp: *mut FilterPluginTable,
        ) -> Bool,
    >,
    /// Current trackbar values (host owned).
    pub track: *mut i32,
    /// Current checkbox values (host owned).
    pub check: *mut i32,
    /// Extended data area (host owned, `ex_data_size` bytes).
    pub ex_data_ptr: *mut c_void,
    pub ex_data_size: i32,
    pub information: *mut c_char,
    pub func_save_start:
        Option<unsafe extern "C" fn(fp: *mut FilterPluginTable, s: i32, e: i32, editp: *mut c_void) -> Bool>,
    pub func_save_end: Option<unsafe extern "C" fn(fp: *mut FilterPluginTable, editp: *mut c_void) -> Bool>,
    pub exfunc: *mut CallbackFunctionSet,
    pub hwnd: Hwnd,
    pub dll_hinst: Hinstance,
    /// Initial contents of the extended data area (null leaves it zeroed).
    pub ex_data_def: *mut c_void,
    pub func_is_saveframe: Option<
        unsafe extern "C" fn(
            fp: *mut FilterPluginTable,
            editp: *mut c_void,
            saveno: i32,
            frame: i32,
            fps: i32,
            edit_flag: i32,
            inter: i32,
        ) -> Bool,
    >,
    pub func_project_load:
        Option<unsafe extern "C" fn(fp: *mut FilterPluginTable, editp: *mut c_void, data: *mut c_void, size: i32) -> Bool>,
    /// Called with a null `data` first to query the size.
    pub func_project_save: Option<
        unsafe extern "C" fn(fp: *mut FilterPluginTable, editp: *mut c_void, data: *mut c_void, size: *mut i32) -> Bool,
    >,
    pub func_modify_title: Option<
        unsafe extern "C" fn(
            fp: *mut FilterPluginTable,
            editp: *mut c_void,
            frame: i32,
            title: *mut c_char,
            max_title: i32,
        ) -> Bool,
    >,
    /// Sub-directory of the plugins directory holding the DLL, if any.
    pub dll_path: *mut c_char,
    pub reserved: [i32; 2],
}

impl FilterPluginTable {
    pub const ABI_SIZE: usize = 140;

    /// Default trackbar range when the limit arrays are null.
    pub const DEFAULT_TRACK_MIN: i32 = 0;
    pub const DEFAULT_TRACK_MAX: i32 = 256;
}

// SAFETY: integers, raw pointers and `Option<fn>`; all-zero is valid.
unsafe impl Zeroable for FilterPluginTable {}

impl Default for FilterPluginTable {
    fn default() -> Self {
        Zeroable::zeroed()
    }
}

impl Default for CallbackFunctionSet {
    fn default() -> Self {
        Zeroable::zeroed()
    }
}

impl Default for FilterProcInfo {
    fn default() -> Self {
        Zeroable::zeroed()
    }
}

impl Default for FileInfo {
    fn default() -> Self {
        Zeroable::zeroed()
    }
}

impl Default for SystemInfo {
    fn default() -> Self {
        Zeroable::zeroed()
    }
}
