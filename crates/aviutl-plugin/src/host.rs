//! Safe wrapper over the host services table (`EXFUNC`).
//!
//! Every method checks the callback slot (a missing one yields
//! [`PluginError::MissingCallback`]) and maps a `FALSE` return to
//! [`PluginError::HostRejected`]. Strings are converted to and from code page
//! 932 on the way through.

use std::ffi::{c_char, c_void, CStr};
use std::marker::PhantomData;
use std::path::{Path, PathBuf};
use std::ptr::{self, NonNull};

use aviutl_sys::constants::MAX_PATH;
use aviutl_sys::filter::{AddMenuItemFlag, AviFileHandle, EditOpenFlag, EditOutputFlag};
use aviutl_sys::win::{dib_image_size, fourcc, Hfont, Hwnd};
use aviutl_sys::{
    AviFileFilterType, AviFileOpenFlag, Bool, CallbackFunctionSet, FileInfo, FileInfoFlag, FilterPluginTable,
    FrameStatus, FrameStatusType, Pixel, PixelYc, SystemInfo, SystemInfoFlag, FALSE,
};
use bytemuck::Zeroable;
use tracing::{debug, trace};

use crate::encoding::{decode_ansi_bytes, decode_ansi_ptr, encode_ansi, encode_filter_list};
use crate::error::{PluginError, PluginResult};
use crate::frame::{ProcFrame, YcPlane, YcPlaneMut};
use crate::threading::{dispatch_via_host, Dispatcher, WorkerFn};

/// Capacity used for `ini_load_str`.
pub const INI_STR_CAPACITY: usize = 1024;

macro_rules! callback {
    ($exfunc:expr, $name:ident) => {
        $exfunc.$name.ok_or(PluginError::MissingCallback(stringify!($name)))?
    };
}

fn check(ok: Bool, name: &'static str) -> PluginResult<()> {
    if ok == FALSE {
        Err(PluginError::HostRejected(name))
    } else {
        Ok(())
    }
}

/// Media properties reported by the host (`FILE_INFO`).
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FileDetails {
    pub flags: FileInfoFlag,
    pub name: String,
    pub width: i32,
    pub height: i32,
    pub video_rate: i32,
    pub video_scale: i32,
    pub audio_rate: i32,
    pub audio_channels: i32,
    pub frame_count: i32,
    /// FourCC of the decoded video (`0` = RGB).
    pub video_decode_format: u32,
    pub video_decode_bits: i32,
    pub audio_samples: i32,
}

impl FileDetails {
    /// # Safety
    ///
    /// `info.name` must be null or a NUL-terminated string.
    pub unsafe fn from_raw(info: &FileInfo) -> Self {
        Self {
            flags: info.flag,
            name: decode_ansi_ptr(info.name),
            width: info.w,
            height: info.h,
            video_rate: info.video_rate,
            video_scale: info.video_scale,
            audio_rate: info.audio_rate,
            audio_channels: info.audio_ch,
            frame_count: info.frame_n,
            video_decode_format: info.video_decode_format,
            video_decode_bits: info.video_decode_bit,
            audio_samples: info.audio_n,
        }
    }

    pub fn fps(&self) -> f64 {
        if self.video_scale == 0 {
            0.0
        } else {
            self.video_rate as f64 / self.video_scale as f64
        }
    }

    /// Upper bound of interleaved samples in one frame of audio.
    pub fn frame_audio_capacity(&self) -> usize {
        if self.video_rate <= 0 || self.audio_channels <= 0 || self.audio_rate <= 0 {
            return 0;
        }
        let per_frame = (self.audio_rate as u64 * self.video_scale.max(1) as u64).div_ceil(self.video_rate as u64);
        ((per_frame + 1) * 2 * self.audio_channels as u64) as usize
    }
}

/// Host environment (`SYS_INFO`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SystemDetails {
    pub flags: SystemInfoFlag,
    pub version: String,
    pub filter_count: i32,
    pub min_size: (i32, i32),
    pub max_size: (i32, i32),
    pub max_frame: i32,
    pub edit_name: String,
    pub project_name: String,
    pub output_name: String,
    pub vram_width: i32,
    pub vram_height: i32,
    pub vram_yc_size: i32,
    pub vram_line_size: i32,
    pub font: Hfont,
    pub build: i32,
}

impl SystemDetails {
    /// # Safety
    ///
    /// String pointers in `info` must be null or NUL-terminated.
    pub unsafe fn from_raw(info: &SystemInfo) -> Self {
        Self {
            flags: info.flag,
            version: decode_ansi_ptr(info.info),
            filter_count: info.filter_n,
            min_size: (info.min_w, info.min_h),
            max_size: (info.max_w, info.max_h),
            max_frame: info.max_frame,
            edit_name: decode_ansi_ptr(info.edit_name),
            project_name: decode_ansi_ptr(info.project_name),
            output_name: decode_ansi_ptr(info.output_name),
            vram_width: info.vram_w,
            vram_height: info.vram_h,
            vram_yc_size: info.vram_yc_size,
            vram_line_size: info.vram_line_size,
            font: info.hfont,
            build: info.build,
        }
    }

    pub fn is_editing(&self) -> bool {
        self.flags.contains(SystemInfoFlag::EDIT)
    }
}

/// A rectangle in host image coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct YcRect {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl YcRect {
    pub const fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self { x, y, width, height }
    }
}

/// A DIB image read back from the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DibImage {
    pub width: i32,
    pub height: i32,
    /// `0` for RGB24, otherwise a FourCC such as `YUY2`.
    pub format: u32,
    pub data: Vec<u8>,
}

/// Bits per pixel of the DIB formats the host can hand out.
pub fn dib_format_bits(format: u32) -> PluginResult<u16> {
    match format {
        0 => Ok(24),
        f if f == fourcc(b"YUY2") => Ok(16),
        other => Err(PluginError::Unsupported(format!("DIB format {other:#010x}"))),
    }
}

/// Image memory laid out the way host image helpers expect
/// (`vram_line_size` row pitch, `vram_h` rows).
///
/// # Safety
///
/// `host_yc_ptr` must return such a buffer, or null where the callee accepts it.
pub unsafe trait HostYc {
    fn host_yc_ptr(&self) -> *mut PixelYc;
}

/// Callback table plus the handles the callbacks need.
#[derive(Clone, Copy)]
pub struct Host<'a> {
    exfunc: &'a CallbackFunctionSet,
    editp: *mut c_void,
    fp: *mut FilterPluginTable,
}

impl<'a> Host<'a> {
    pub fn new(exfunc: &'a CallbackFunctionSet, editp: *mut c_void, fp: *mut FilterPluginTable) -> Self {
        Self { exfunc, editp, fp }
    }

    /// # Safety
    ///
    /// `exfunc` must be null or point to a callback table valid for `'a`.
    pub unsafe fn from_raw(
        exfunc: *const CallbackFunctionSet,
        editp: *mut c_void,
        fp: *mut FilterPluginTable,
    ) -> PluginResult<Self> {
        let exfunc = exfunc.as_ref().ok_or(PluginError::MissingCallback("exfunc"))?;
        Ok(Self::new(exfunc, editp, fp))
    }

    pub fn callbacks(&self) -> &'a CallbackFunctionSet {
        self.exfunc
    }

    pub fn edit_handle(&self) -> *mut c_void {
        self.editp
    }

    pub fn filter_ptr(&self) -> *mut FilterPluginTable {
        self.fp
    }

    /// Same callbacks and filter, different edit handle.
    pub fn with_edit(self, editp: *mut c_void) -> Self {
        Self { editp, ..self }
    }

    fn editp(&self, op: &'static str) -> PluginResult<*mut c_void> {
        if self.editp.is_null() {
            Err(PluginError::NoEditHandle(op))
        } else {
            Ok(self.editp)
        }
    }

    fn fp(&self) -> *mut c_void {
        self.fp.cast()
    }

    // -- editing state --------------------------------------------------

    pub fn is_editing(&self) -> PluginResult<bool> {
        let f = callback!(self.exfunc, is_editing);
        Ok(unsafe { f(self.editp("is_editing")?) } != FALSE)
    }

    pub fn is_saving(&self) -> PluginResult<bool> {
        let f = callback!(self.exfunc, is_saving);
        Ok(unsafe { f(self.editp("is_saving")?) } != FALSE)
    }

    /// Frame shown in the main window.
    pub fn current_frame(&self) -> PluginResult<i32> {
        let f = callback!(self.exfunc, get_frame);
        Ok(unsafe { f(self.editp("get_frame")?) })
    }

    pub fn frame_count(&self) -> PluginResult<i32> {
        let f = callback!(self.exfunc, get_frame_n);
        Ok(unsafe { f(self.editp("get_frame_n")?) })
    }

    pub fn frame_size(&self) -> PluginResult<(i32, i32)> {
        let f = callback!(self.exfunc, get_frame_size);
        let (mut w, mut h) = (0, 0);
        check(unsafe { f(self.editp("get_frame_size")?, &mut w, &mut h) }, "get_frame_size")?;
        Ok((w, h))
    }

    /// Move the current frame. Returns the frame actually selected.
    pub fn set_current_frame(&self, frame: i32) -> PluginResult<i32> {
        let f = callback!(self.exfunc, set_frame);
        Ok(unsafe { f(self.editp("set_frame")?, frame) })
    }

    /// Change the frame count. Returns the count actually set.
    pub fn set_frame_count(&self, count: i32) -> PluginResult<i32> {
        let f = callback!(self.exfunc, set_frame_n);
        Ok(unsafe { f(self.editp("set_frame_n")?, count) })
    }

    pub fn copy_frame(&self, dst: i32, src: i32) -> PluginResult<()> {
        let f = callback!(self.exfunc, copy_frame);
        check(unsafe { f(self.editp("copy_frame")?, dst, src) }, "copy_frame")
    }

    pub fn copy_video(&self, dst: i32, src: i32) -> PluginResult<()> {
        let f = callback!(self.exfunc, copy_video);
        check(unsafe { f(self.editp("copy_video")?, dst, src) }, "copy_video")
    }

    pub fn copy_audio(&self, dst: i32, src: i32) -> PluginResult<()> {
        let f = callback!(self.exfunc, copy_audio);
        check(unsafe { f(self.editp("copy_audio")?, dst, src) }, "copy_audio")
    }

    /// Put a 24-bit DIB on the clipboard.
    pub fn copy_to_clipboard(&self, hwnd: Hwnd, dib: &[u8], width: i32, height: i32) -> PluginResult<()> {
        let needed = dib_image_size(width, height, 24);
        if dib.len() < needed {
            return Err(PluginError::out_of_bounds("clipboard image", dib.len() as i64, needed as i64, i64::MAX));
        }
        let f = callback!(self.exfunc, copy_clip);
        check(unsafe { f(hwnd, dib.as_ptr() as *mut c_void, width, height) }, "copy_clip")
    }

    pub fn paste_from_clipboard(&self, hwnd: Hwnd, frame: i32) -> PluginResult<()> {
        let f = callback!(self.exfunc, paste_clip);
        check(unsafe { f(hwnd, self.editp("paste_clip")?, frame) }, "paste_clip")
    }

    pub fn frame_status(&self, frame: i32) -> PluginResult<FrameStatus> {
        let f = callback!(self.exfunc, get_frame_status);
        let mut status = FrameStatus::zeroed();
        check(unsafe { f(self.editp("get_frame_status")?, frame, &mut status) }, "get_frame_status")?;
        Ok(status)
    }

    pub fn set_frame_status(&self, frame: i32, status: &FrameStatus) -> PluginResult<()> {
        let f = callback!(self.exfunc, set_frame_status);
        let mut copy = *status;
        check(unsafe { f(self.editp("set_frame_status")?, frame, &mut copy) }, "set_frame_status")
    }

    /// Whether `frame` will be written when saving.
    pub fn is_save_frame(&self, frame: i32) -> PluginResult<bool> {
        let f = callback!(self.exfunc, is_saveframe);
        Ok(unsafe { f(self.editp("is_saveframe")?, frame) } != FALSE)
    }

    pub fn is_keyframe(&self, frame: i32) -> PluginResult<bool> {
        let f = callback!(self.exfunc, is_keyframe);
        Ok(unsafe { f(self.editp("is_keyframe")?, frame) } != FALSE)
    }

    pub fn is_recompress(&self, frame: i32) -> PluginResult<bool> {
        let f = callback!(self.exfunc, is_recompress);
        Ok(unsafe { f(self.editp("is_recompress")?, frame) } != FALSE)
    }

    /// Sync the filter window's controls with the table values.
    pub fn update_filter_window(&self) -> PluginResult<()> {
        let f = callback!(self.exfunc, filter_window_update);
        check(unsafe { f(self.fp()) }, "filter_window_update")
    }

    pub fn is_filter_window_visible(&self) -> PluginResult<bool> {
        let f = callback!(self.exfunc, is_filter_window_disp);
        Ok(unsafe { f(self.fp()) } != FALSE)
    }

    pub fn is_filter_active(&self) -> PluginResult<bool> {
        let f = callback!(self.exfunc, is_filter_active);
        Ok(unsafe { f(self.fp()) } != FALSE)
    }

    pub fn set_undo(&self) -> PluginResult<()> {
        let f = callback!(self.exfunc, set_undo);
        check(unsafe { f(self.editp("set_undo")?) }, "set_undo")
    }

    /// Run `f(thread_id, thread_num)` on every host worker and wait.
    pub fn exec_multi_thread<F>(&self, f: F) -> PluginResult<()>
    where
        F: Fn(usize, usize) + Sync,
    {
        self.dispatch(&f)
    }

    // -- file and system information -------------------------------------

    pub fn file_info(&self) -> PluginResult<FileDetails> {
        let f = callback!(self.exfunc, get_file_info);
        let mut info = FileInfo::zeroed();
        check(unsafe { f(self.editp("get_file_info")?, &mut info) }, "get_file_info")?;
        Ok(unsafe { FileDetails::from_raw(&info) })
    }

    pub fn source_file_info(&self, source_id: i32) -> PluginResult<FileDetails> {
        let f = callback!(self.exfunc, get_source_file_info);
        let mut info = FileInfo::zeroed();
        check(
            unsafe { f(self.editp("get_source_file_info")?, &mut info, source_id) },
            "get_source_file_info",
        )?;
        Ok(unsafe { FileDetails::from_raw(&info) })
    }

    /// Source file id and source frame number behind `frame`.
    pub fn source_video_number(&self, frame: i32) -> PluginResult<(i32, i32)> {
        let f = callback!(self.exfunc, get_source_video_number);
        let (mut id, mut number) = (0, 0);
        check(
            unsafe { f(self.editp("get_source_video_number")?, frame, &mut id, &mut number) },
            "get_source_video_number",
        )?;
        Ok((id, number))
    }

    /// Works without an edit handle; editing fields are then unset.
    pub fn sys_info(&self) -> PluginResult<SystemDetails> {
        let f = callback!(self.exfunc, get_sys_info);
        let mut info = SystemInfo::zeroed();
        check(unsafe { f(self.editp, &mut info) }, "get_sys_info")?;
        Ok(unsafe { SystemDetails::from_raw(&info) })
    }

    /// Name of profile `index`, or `None` past the last one.
    pub fn config_name(&self, index: i32) -> PluginResult<Option<String>> {
        let f = callback!(self.exfunc, get_config_name);
        let name = unsafe { f(self.editp("get_config_name")?, index) };
        Ok((!name.is_null()).then(|| unsafe { decode_ansi_ptr(name) }))
    }

    /// Switch to profile `index`, optionally renaming it.
    pub fn set_config(&self, index: i32, name: Option<&str>) -> PluginResult<()> {
        let f = callback!(self.exfunc, set_config);
        let name = name.map(encode_ansi).transpose()?;
        let name_ptr = name.as_ref().map_or(ptr::null_mut(), |n| n.as_ptr() as *mut c_char);
        check(unsafe { f(self.editp("set_config")?, index, name_ptr) }, "set_config")
    }

    pub fn select_range(&self) -> PluginResult<(i32, i32)> {
        let f = callback!(self.exfunc, get_select_frame);
        let (mut s, mut e) = (0, 0);
        check(unsafe { f(self.editp("get_select_frame")?, &mut s, &mut e) }, "get_select_frame")?;
        Ok((s, e))
    }

    pub fn set_select_range(&self, start: i32, end: i32) -> PluginResult<()> {
        let f = callback!(self.exfunc, set_select_frame);
        check(unsafe { f(self.editp("set_select_frame")?, start, end) }, "set_select_frame")
    }

    /// Filter table with id `index`, or `None` past the last one.
    pub fn filter_by_id(&self, index: i32) -> PluginResult<Option<NonNull<FilterPluginTable>>> {
        let f = callback!(self.exfunc, get_filterp);
        Ok(NonNull::new(unsafe { f(index) }.cast()))
    }

    // -- colour conversion ------------------------------------------------

    pub fn rgb_to_yc(&self, dst: &mut [PixelYc], src: &[Pixel]) -> PluginResult<()> {
        if dst.len() != src.len() {
            return Err(PluginError::out_of_bounds("rgb2yc length", dst.len() as i64, src.len() as i64, src.len() as i64));
        }
        let f = callback!(self.exfunc, rgb2yc);
        check(unsafe { f(dst.as_mut_ptr(), src.as_ptr() as *mut Pixel, src.len() as i32) }, "rgb2yc")
    }

    pub fn yc_to_rgb(&self, dst: &mut [Pixel], src: &[PixelYc]) -> PluginResult<()> {
        if dst.len() != src.len() {
            return Err(PluginError::out_of_bounds("yc2rgb length", dst.len() as i64, src.len() as i64, src.len() as i64));
        }
        let f = callback!(self.exfunc, yc2rgb);
        check(unsafe { f(dst.as_mut_ptr(), src.as_ptr() as *mut PixelYc, src.len() as i32) }, "yc2rgb")
    }

    // -- dialogs and ini ----------------------------------------------------

    /// Show the open dialog. `Ok(None)` when cancelled.
    pub fn load_dialog(&self, filters: &[(&str, &str)], default: &str) -> PluginResult<Option<PathBuf>> {
        let f = callback!(self.exfunc, dlg_get_load_name);
        self.file_dialog(f, filters, default)
    }

    /// Show the save dialog. `Ok(None)` when cancelled.
    pub fn save_dialog(&self, filters: &[(&str, &str)], default: &str) -> PluginResult<Option<PathBuf>> {
        let f = callback!(self.exfunc, dlg_get_save_name);
        self.file_dialog(f, filters, default)
    }

    fn file_dialog(
        &self,
        f: unsafe extern "C" fn(*mut c_char, *mut c_char, *mut c_char) -> Bool,
        filters: &[(&str, &str)],
        default: &str,
    ) -> PluginResult<Option<PathBuf>> {
        let mut filter = encode_filter_list(filters)?;
        let default = encode_ansi(default)?;
        let mut name = [0u8; MAX_PATH];
        let ok = unsafe {
            f(
                name.as_mut_ptr().cast(),
                filter.as_mut_ptr().cast(),
                default.as_ptr() as *mut c_char,
            )
        };
        if ok == FALSE {
            return Ok(None);
        }
        Ok(Some(PathBuf::from(decode_nul_terminated(&name))))
    }

    pub fn ini_load_int(&self, key: &str, default: i32) -> PluginResult<i32> {
        let f = callback!(self.exfunc, ini_load_int);
        let key = encode_ansi(key)?;
        Ok(unsafe { f(self.fp(), key.as_ptr() as *mut c_char, default) })
    }

    pub fn ini_save_int(&self, key: &str, value: i32) -> PluginResult<i32> {
        let f = callback!(self.exfunc, ini_save_int);
        let key = encode_ansi(key)?;
        Ok(unsafe { f(self.fp(), key.as_ptr() as *mut c_char, value) })
    }

    /// Read a string of at most [`INI_STR_CAPACITY`] bytes.
    pub fn ini_load_str(&self, key: &str, default: &str) -> PluginResult<String> {
        let f = callback!(self.exfunc, ini_load_str);
        let key = encode_ansi(key)?;
        let default = encode_ansi(default)?;
        let mut buf = vec![0u8; INI_STR_CAPACITY];
        check(
            unsafe {
                f(
                    self.fp(),
                    key.as_ptr() as *mut c_char,
                    buf.as_mut_ptr().cast(),
                    default.as_ptr() as *mut c_char,
                )
            },
            "ini_load_str",
        )?;
        Ok(decode_nul_terminated(&buf))
    }

    pub fn ini_save_str(&self, key: &str, value: &str) -> PluginResult<()> {
        let f = callback!(self.exfunc, ini_save_str);
        let key = encode_ansi(key)?;
        let value = encode_ansi(value)?;
        check(
            unsafe { f(self.fp(), key.as_ptr() as *mut c_char, value.as_ptr() as *mut c_char) },
            "ini_save_str",
        )
    }

    // -- audio ------------------------------------------------------------

    /// Source audio of `frame`, before filtering.
    pub fn audio(&self, frame: i32) -> PluginResult<Vec<i16>> {
        let f = callback!(self.exfunc, get_audio);
        let editp = self.editp("get_audio")?;
        self.read_frame_audio(|buf| unsafe { f(editp, frame, buf) })
    }

    /// Audio of `frame` after every filter.
    pub fn filtered_audio(&self, frame: i32) -> PluginResult<Vec<i16>> {
        let f = callback!(self.exfunc, get_audio_filtered);
        let editp = self.editp("get_audio_filtered")?;
        self.read_frame_audio(|buf| unsafe { f(editp, frame, buf) })
    }

    /// Audio of `frame` filtered up to (not including) this filter.
    pub fn audio_filtering(&self, frame: i32) -> PluginResult<Vec<i16>> {
        let f = callback!(self.exfunc, get_audio_filtering);
        let editp = self.editp("get_audio_filtering")?;
        let fp = self.fp();
        self.read_frame_audio(|buf| unsafe { f(fp, editp, frame, buf) })
    }

    fn read_frame_audio(&self, read: impl FnOnce(*mut c_void) -> i32) -> PluginResult<Vec<i16>> {
        let info = self.file_info()?;
        let channels = info.audio_channels.max(0) as usize;
        let mut buf = vec![0i16; info.frame_audio_capacity()];
        if buf.is_empty() {
            return Ok(buf);
        }
        let samples = read(buf.as_mut_ptr().cast()).max(0) as usize;
        buf.truncate((samples * channels).min(buf.len()));
        Ok(buf)
    }

    // -- image access -----------------------------------------------------

    /// Configure the cache behind [`Host::yc_filtering_cache_ex`].
    pub fn set_yc_cache_size(&self, width: i32, height: i32, frames: i32) -> PluginResult<()> {
        let f = callback!(self.exfunc, set_ycp_filtering_cache_size);
        check(unsafe { f(self.fp(), width, height, frames, 0) }, "set_ycp_filtering_cache_size")
    }

    /// Image of `frame` filtered up to this filter, from the cache. Rows are
    /// `line_size` bytes apart (normally the cache width times 6).
    ///
    /// # Safety
    ///
    /// The view is valid only until the host evicts the frame; do not keep it
    /// across other host calls.
    pub unsafe fn yc_filtering_cache_ex(&self, frame: i32, line_size: usize) -> PluginResult<YcPlane<'_>> {
        let f = callback!(self.exfunc, get_ycp_filtering_cache_ex);
        let (mut w, mut h) = (0, 0);
        let ptr = f(self.fp(), self.editp("get_ycp_filtering_cache_ex")?, frame, &mut w, &mut h);
        if ptr.is_null() {
            return Err(PluginError::HostRejected("get_ycp_filtering_cache_ex"));
        }
        Ok(YcPlane::from_raw(ptr, w.max(0) as usize, h.max(0) as usize, line_size))
    }

    /// Unfiltered image of `frame + offset` (offset in source frames).
    ///
    /// # Safety
    ///
    /// As [`Host::yc_filtering_cache_ex`].
    pub unsafe fn yc_source_cache(&self, frame: i32, offset: i32) -> PluginResult<YcPlane<'_>> {
        let f = callback!(self.exfunc, get_ycp_source_cache);
        let (w, h) = self.frame_size()?;
        let line = self.sys_info()?.vram_line_size;
        let ptr = f(self.editp("get_ycp_source_cache")?, frame, offset);
        if ptr.is_null() {
            return Err(PluginError::HostRejected("get_ycp_source_cache"));
        }
        Ok(YcPlane::from_raw(ptr.cast(), w.max(0) as usize, h.max(0) as usize, line.max(0) as usize))
    }

    /// DIB of the frame on display (display filters only).
    ///
    /// # Safety
    ///
    /// The pointer is valid until the next host call.
    pub unsafe fn display_pixels(&self, format: u32) -> PluginResult<NonNull<u8>> {
        let f = callback!(self.exfunc, get_disp_pixelp);
        NonNull::new(f(self.editp("get_disp_pixelp")?, format).cast())
            .ok_or(PluginError::HostRejected("get_disp_pixelp"))
    }

    /// Unfiltered DIB of `frame`.
    pub fn pixel_source(&self, frame: i32, format: u32) -> PluginResult<DibImage> {
        let f = callback!(self.exfunc, get_pixel_source);
        let bits = dib_format_bits(format)?;
        let (w, h) = self.frame_size()?;
        let mut data = vec![0u8; dib_image_size(w, h, bits)];
        check(
            unsafe { f(self.editp("get_pixel_source")?, frame, data.as_mut_ptr().cast(), format) },
            "get_pixel_source",
        )?;
        Ok(DibImage {
            width: w,
            height: h,
            format,
            data,
        })
    }

    /// Fully filtered 24-bit DIB of `frame`.
    pub fn pixel_filtered(&self, frame: i32) -> PluginResult<DibImage> {
        let f = callback!(self.exfunc, get_pixel_filtered);
        let editp = self.editp("get_pixel_filtered")?;
        let (mut w, mut h) = (0, 0);
        check(unsafe { f(editp, frame, ptr::null_mut(), &mut w, &mut h) }, "get_pixel_filtered")?;
        let mut data = vec![0u8; dib_image_size(w, h, 24)];
        check(
            unsafe { f(editp, frame, data.as_mut_ptr().cast(), &mut w, &mut h) },
            "get_pixel_filtered",
        )?;
        Ok(DibImage {
            width: w,
            height: h,
            format: 0,
            data,
        })
    }

    /// Fully filtered DIB of `frame` in `format`.
    pub fn pixel_filtered_ex(&self, frame: i32, format: u32) -> PluginResult<DibImage> {
        let f = callback!(self.exfunc, get_pixel_filtered_ex);
        let bits = dib_format_bits(format)?;
        let editp = self.editp("get_pixel_filtered_ex")?;
        let (mut w, mut h) = (0, 0);
        check(
            unsafe { f(editp, frame, ptr::null_mut(), &mut w, &mut h, format) },
            "get_pixel_filtered_ex",
        )?;
        let mut data = vec![0u8; dib_image_size(w, h, bits)];
        check(
            unsafe { f(editp, frame, data.as_mut_ptr().cast(), &mut w, &mut h, format) },
            "get_pixel_filtered_ex",
        )?;
        Ok(DibImage {
            width: w,
            height: h,
            format,
            data,
        })
    }

    // -- host image helpers -------------------------------------------------

    /// Allocate a frame-sized image buffer owned by the host.
    pub fn create_yc(&self) -> PluginResult<OwnedYc<'a>> {
        let create = callback!(self.exfunc, create_yc);
        let delete = callback!(self.exfunc, delete_yc);
        let sys = self.sys_info()?;
        let ptr = NonNull::new(unsafe { create() }).ok_or(PluginError::HostRejected("create_yc"))?;
        trace!(w = sys.vram_width, h = sys.vram_height, "create_yc");
        Ok(OwnedYc {
            ptr,
            delete,
            width: sys.vram_width.max(0) as usize,
            height: sys.vram_height.max(0) as usize,
            line_size: sys.vram_line_size.max(0) as usize,
            _host: PhantomData,
        })
    }

    /// Size of a BMP file without loading it.
    pub fn image_size(&self, path: &Path) -> PluginResult<(i32, i32)> {
        let f = callback!(self.exfunc, load_image);
        let file = encode_ansi(&path.to_string_lossy())?;
        let (mut w, mut h) = (0, 0);
        check(
            unsafe { f(ptr::null_mut(), file.as_ptr() as *mut c_char, &mut w, &mut h, 0) },
            "load_image",
        )?;
        Ok((w, h))
    }

    /// Load a BMP file into `dst`. Returns the image size.
    pub fn load_image<D: HostYc>(&self, dst: &mut D, path: &Path) -> PluginResult<(i32, i32)> {
        let f = callback!(self.exfunc, load_image);
        let file = encode_ansi(&path.to_string_lossy())?;
        let target = non_null_target(dst.host_yc_ptr(), "load_image")?;
        let (mut w, mut h) = (0, 0);
        check(unsafe { f(target, file.as_ptr() as *mut c_char, &mut w, &mut h, 0) }, "load_image")?;
        Ok((w, h))
    }

    /// Resize `src_rect` of `src` (or of `dst` itself when `src` is `None`)
    /// into `dst` at `width` x `height`.
    pub fn resize_yc<D: HostYc, S: HostYc>(
        &self,
        dst: &mut D,
        width: i32,
        height: i32,
        src: Option<&S>,
        src_rect: YcRect,
    ) -> PluginResult<()> {
        let f = callback!(self.exfunc, resize_yc);
        let target = non_null_target(dst.host_yc_ptr(), "resize_yc")?;
        let source = src.map_or(ptr::null_mut(), |s| s.host_yc_ptr());
        unsafe {
            f(
                target,
                width,
                height,
                source,
                src_rect.x,
                src_rect.y,
                src_rect.width,
                src_rect.height,
            )
        };
        Ok(())
    }

    /// Blend `src_rect` of `src` onto `dst` at (`x`, `y`). `alpha` is `0..=4096`.
    pub fn copy_yc<D: HostYc, S: HostYc>(
        &self,
        dst: &mut D,
        x: i32,
        y: i32,
        src: &S,
        src_rect: YcRect,
        alpha: i32,
    ) -> PluginResult<()> {
        if !(0..=4096).contains(&alpha) {
            return Err(PluginError::out_of_bounds("alpha", alpha, 0, 4096));
        }
        let f = callback!(self.exfunc, copy_yc);
        let target = non_null_target(dst.host_yc_ptr(), "copy_yc")?;
        let source = non_null_target(src.host_yc_ptr(), "copy_yc")?;
        unsafe {
            f(
                target,
                x,
                y,
                source,
                src_rect.x,
                src_rect.y,
                src_rect.width,
                src_rect.height,
                alpha,
            )
        };
        Ok(())
    }

    /// Draw `text` onto `dst`. Returns the drawn extent.
    #[allow(clippy::too_many_arguments)]
    pub fn draw_text<D: HostYc>(
        &self,
        dst: &mut D,
        x: i32,
        y: i32,
        text: &str,
        color: Pixel,
        alpha: i32,
        font: Hfont,
    ) -> PluginResult<(i32, i32)> {
        let target = non_null_target(dst.host_yc_ptr(), "draw_text")?;
        self.draw_text_raw(target, x, y, text, color, alpha, font)
    }

    /// Extent `text` would occupy, without drawing.
    pub fn measure_text(&self, text: &str, font: Hfont) -> PluginResult<(i32, i32)> {
        self.draw_text_raw(ptr::null_mut(), 0, 0, text, Pixel::default(), 0, font)
    }

    #[allow(clippy::too_many_arguments)]
    fn draw_text_raw(
        &self,
        target: *mut PixelYc,
        x: i32,
        y: i32,
        text: &str,
        color: Pixel,
        alpha: i32,
        font: Hfont,
    ) -> PluginResult<(i32, i32)> {
        let f = callback!(self.exfunc, draw_text);
        let text = encode_ansi(text)?;
        let (mut w, mut h) = (0, 0);
        unsafe {
            f(
                target,
                x,
                y,
                text.as_ptr() as *mut c_char,
                color.r as i32,
                color.g as i32,
                color.b as i32,
                alpha,
                font,
                &mut w,
                &mut h,
            )
        };
        Ok((w, h))
    }

    // -- AVI files ------------------------------------------------------------

    /// Open any file the host (or an input plugin) can read.
    pub fn open_avi_file(&self, path: &Path, flags: AviFileOpenFlag) -> PluginResult<AviFile<'a>> {
        let open = callback!(self.exfunc, avi_file_open);
        let close = callback!(self.exfunc, avi_file_close);
        let file = encode_ansi(&path.to_string_lossy())?;
        let mut info = FileInfo::zeroed();
        let handle = unsafe { open(file.as_ptr() as *mut c_char, &mut info, flags) };
        if handle.is_null() {
            return Err(PluginError::HostRejected("avi_file_open"));
        }
        let info = unsafe { FileDetails::from_raw(&info) };
        debug!(path = %path.display(), frames = info.frame_count, "opened file through host");
        Ok(AviFile {
            exfunc: self.exfunc,
            handle,
            close,
            info,
        })
    }

    /// File dialog filter for files `open_avi_file` accepts.
    pub fn avi_file_filter(&self, kind: AviFileFilterType) -> PluginResult<Vec<(String, String)>> {
        let f = callback!(self.exfunc, get_avi_file_filter);
        let list = unsafe { f(kind) };
        if list.is_null() {
            return Err(PluginError::HostRejected("get_avi_file_filter"));
        }
        Ok(unsafe { decode_filter_list(list) })
    }

    /// One byte per frame for `kind`, valid until the edit is closed.
    ///
    /// # Safety
    ///
    /// Do not keep the slice after the edit file closes.
    pub unsafe fn frame_status_table(&self, kind: FrameStatusType) -> PluginResult<&[u8]> {
        let f = callback!(self.exfunc, get_frame_status_table);
        let len = self.frame_count()?.max(0) as usize;
        let table = f(self.editp("get_frame_status_table")?, kind);
        if table.is_null() {
            return Err(PluginError::HostRejected("get_frame_status_table"));
        }
        Ok(std::slice::from_raw_parts(table, len))
    }

    // -- menus and edit control -------------------------------------------------

    /// Add a main-window menu entry. Only valid from `init` or `WM_FILTER_INIT`.
    pub fn add_menu_item(
        &self,
        name: &str,
        hwnd: Hwnd,
        id: i32,
        default_key: i32,
        flags: AddMenuItemFlag,
    ) -> PluginResult<()> {
        let f = callback!(self.exfunc, add_menu_item);
        let name = encode_ansi(name)?;
        check(
            unsafe { f(self.fp(), name.as_ptr() as *mut c_char, hwnd, id, default_key, flags) },
            "add_menu_item",
        )
    }

    pub fn edit_open(&self, path: &Path, flags: EditOpenFlag) -> PluginResult<()> {
        let f = callback!(self.exfunc, edit_open);
        let file = encode_ansi(&path.to_string_lossy())?;
        check(
            unsafe { f(self.editp("edit_open")?, file.as_ptr() as *mut c_char, flags) },
            "edit_open",
        )
    }

    pub fn edit_close(&self) -> PluginResult<()> {
        let f = callback!(self.exfunc, edit_close);
        check(unsafe { f(self.editp("edit_close")?) }, "edit_close")
    }

    /// Render the edit to `path`, through the named output plugin or as AVI/WAV.
    pub fn edit_output(&self, path: &Path, flags: EditOutputFlag, plugin: Option<&str>) -> PluginResult<()> {
        let f = callback!(self.exfunc, edit_output);
        let file = encode_ansi(&path.to_string_lossy())?;
        let plugin = plugin.map(encode_ansi).transpose()?;
        let plugin_ptr = plugin.as_ref().map_or(ptr::null_mut(), |p| p.as_ptr() as *mut c_char);
        check(
            unsafe { f(self.editp("edit_output")?, file.as_ptr() as *mut c_char, flags, plugin_ptr) },
            "edit_output",
        )
    }
}

impl Dispatcher for Host<'_> {
    fn dispatch(&self, f: &WorkerFn<'_>) -> PluginResult<()> {
        dispatch_via_host(self.exfunc.exec_multi_thread_func, f)
    }
}

fn non_null_target(ptr: *mut PixelYc, op: &'static str) -> PluginResult<*mut PixelYc> {
    if ptr.is_null() {
        Err(PluginError::Unsupported(format!("{op} needs an image buffer")))
    } else {
        Ok(ptr)
    }
}

fn decode_nul_terminated(buf: &[u8]) -> String {
    let end = buf.iter().position(|&b| b == 0).unwrap_or(buf.len());
    decode_ansi_bytes(&buf[..end])
}

/// Parse a `"desc\0pattern\0...\0\0"` list.
///
/// # Safety
///
/// `list` must be terminated by an empty string.
pub(crate) unsafe fn decode_filter_list(list: *const c_char) -> Vec<(String, String)> {
    let mut parts = Vec::new();
    let mut cursor = list;
    loop {
        let s = CStr::from_ptr(cursor);
        let bytes = s.to_bytes();
        if bytes.is_empty() {
            break;
        }
        parts.push(decode_ansi_bytes(bytes));
        cursor = cursor.add(bytes.len() + 1);
    }
    let mut pairs = Vec::with_capacity(parts.len() / 2);
    let mut iter = parts.into_iter();
    while let (Some(desc), Some(pattern)) = (iter.next(), iter.next()) {
        pairs.push((desc, pattern));
    }
    pairs
}

/// Host-allocated image from `create_yc`, freed with `delete_yc`.
pub struct OwnedYc<'a> {
    ptr: NonNull<PixelYc>,
    delete: unsafe extern "C" fn(*mut PixelYc),
    width: usize,
    height: usize,
    line_size: usize,
    _host: PhantomData<&'a CallbackFunctionSet>,
}

impl OwnedYc<'_> {
    /// Buffer capacity in pixels per row and rows.
    pub fn capacity(&self) -> (usize, usize) {
        (self.width, self.height)
    }

    pub fn line_size(&self) -> usize {
        self.line_size
    }

    /// View the top-left `width` x `height` region.
    pub fn plane(&self, width: usize, height: usize) -> PluginResult<YcPlane<'_>> {
        self.check_region(width, height)?;
        // SAFETY: the buffer spans `height` rows of `line_size` bytes.
        Ok(unsafe { YcPlane::from_raw(self.ptr.as_ptr(), width, height, self.line_size) })
    }

    pub fn plane_mut(&mut self, width: usize, height: usize) -> PluginResult<YcPlaneMut<'_>> {
        self.check_region(width, height)?;
        // SAFETY: as `plane`, and `&mut self` keeps it exclusive.
        Ok(unsafe { YcPlaneMut::from_raw(self.ptr.as_ptr(), width, height, self.line_size) })
    }

    fn check_region(&self, width: usize, height: usize) -> PluginResult<()> {
        if width > self.width {
            return Err(PluginError::out_of_bounds("width", width as i64, 0, self.width as i64));
        }
        if height > self.height {
            return Err(PluginError::out_of_bounds("height", height as i64, 0, self.height as i64));
        }
        Ok(())
    }
}

unsafe impl HostYc for OwnedYc<'_> {
    fn host_yc_ptr(&self) -> *mut PixelYc {
        self.ptr.as_ptr()
    }
}

unsafe impl HostYc for ProcFrame<'_> {
    fn host_yc_ptr(&self) -> *mut PixelYc {
        self.raw().ycp_edit
    }
}

impl Drop for OwnedYc<'_> {
    fn drop(&mut self) {
        unsafe { (self.delete)(self.ptr.as_ptr()) };
    }
}

/// A media file opened through the host, closed on drop.
pub struct AviFile<'a> {
    exfunc: &'a CallbackFunctionSet,
    handle: AviFileHandle,
    close: unsafe extern "C" fn(AviFileHandle),
    info: FileDetails,
}

impl<'a> AviFile<'a> {
    pub fn info(&self) -> &FileDetails {
        &self.info
    }

    pub fn read_video<D: HostYc>(&self, dst: &mut D, frame: i32) -> PluginResult<()> {
        let f = callback!(self.exfunc, avi_file_read_video);
        let target = non_null_target(dst.host_yc_ptr(), "avi_file_read_video")?;
        check(unsafe { f(self.handle, target, frame) }, "avi_file_read_video")
    }

    /// Audio belonging to video frame `frame`.
    pub fn read_audio(&self, frame: i32) -> PluginResult<Vec<i16>> {
        let f = callback!(self.exfunc, avi_file_read_audio);
        let mut buf = vec![0i16; self.info.frame_audio_capacity()];
        if buf.is_empty() {
            return Ok(buf);
        }
        let samples = unsafe { f(self.handle, buf.as_mut_ptr().cast(), frame) }.max(0) as usize;
        buf.truncate((samples * self.info.audio_channels.max(0) as usize).min(buf.len()));
        Ok(buf)
    }

    /// Read `buf.len() / channels` samples starting at `start`. Returns samples read.
    pub fn read_audio_samples(&self, start: i32, buf: &mut [i16]) -> PluginResult<usize> {
        let f = callback!(self.exfunc, avi_file_read_audio_sample);
        let channels = self.info.audio_channels.max(1) as usize;
        let length = (buf.len() / channels) as i32;
        let read = unsafe { f(self.handle, start, length, buf.as_mut_ptr().cast()) };
        Ok(read.max(0) as usize)
    }

    /// Resample what `read_audio_samples` returns. Returns the new total sample count.
    pub fn set_audio_sample_rate(&mut self, rate: i32, channels: i32) -> PluginResult<i32> {
        let f = callback!(self.exfunc, avi_file_set_audio_sample_rate);
        let total = unsafe { f(self.handle, rate, channels) };
        self.info.audio_rate = rate;
        self.info.audio_channels = channels;
        self.info.audio_samples = total;
        Ok(total)
    }

    /// Decoded DIB of `frame` in the file's decode format.
    ///
    /// # Safety
    ///
    /// The pointer is valid until the next host call.
    pub unsafe fn video_pixels(&self, frame: i32) -> PluginResult<NonNull<u8>> {
        let f = callback!(self.exfunc, avi_file_get_video_pixelp);
        NonNull::new(f(self.handle, frame).cast()).ok_or(PluginError::HostRejected("avi_file_get_video_pixelp"))
    }
}

impl Drop for AviFile<'_> {
    fn drop(&mut self) {
        unsafe { (self.close)(self.handle) };
    }
}
