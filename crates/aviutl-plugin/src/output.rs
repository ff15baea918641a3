//! Output plugins (`*.auo`).

use std::ffi::{c_char, c_void, CString};
use std::path::PathBuf;

use aviutl_sys::win::dib_image_size;
use aviutl_sys::{Bool, Hinstance, Hwnd, OutputFrameFlag, OutputInfo, OutputInfoFlag, OutputPluginTable};
use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, info};

use crate::encoding::{decode_ansi_path, encode_ansi, encode_filter_list};
use crate::error::{PluginError, PluginResult};
use crate::ffi_guard::{guard_bool, guard_with_default};
use crate::host::dib_format_bits;
use crate::registry;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputDescriptor {
    pub name: String,
    /// `(description, pattern)` pairs for the save dialog.
    pub file_filters: Vec<(String, String)>,
    pub information: String,
    /// Install `func_config`.
    pub has_config: bool,
    /// Install `func_config_get` / `func_config_set`.
    pub has_config_data: bool,
}

impl OutputDescriptor {
    pub fn new(name: impl Into<String>, information: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            file_filters: Vec::new(),
            information: information.into(),
            has_config: false,
            has_config_data: false,
        }
    }

    pub fn file_filter(mut self, description: impl Into<String>, pattern: impl Into<String>) -> Self {
        self.file_filters.push((description.into(), pattern.into()));
        self
    }

    pub fn with_config(mut self) -> Self {
        self.has_config = true;
        self
    }

    pub fn with_config_data(mut self) -> Self {
        self.has_config_data = true;
        self
    }
}

/// Serialize plugin settings for `func_config_get`.
pub fn encode_config<T: Serialize>(config: &T) -> PluginResult<Vec<u8>> {
    Ok(serde_json::to_vec(config)?)
}

/// Inverse of [`encode_config`]. Trailing NULs from fixed-size host
/// buffers are ignored.
pub fn decode_config<T: DeserializeOwned>(data: &[u8]) -> PluginResult<T> {
    let end = data.iter().rposition(|&b| b != 0).map_or(0, |i| i + 1);
    Ok(serde_json::from_slice(&data[..end])?)
}

pub trait OutputPlugin: Send + 'static {
    fn descriptor() -> OutputDescriptor
    where
        Self: Sized;

    fn create() -> PluginResult<Self>
    where
        Self: Sized;

    fn init(&mut self) -> PluginResult<()> {
        Ok(())
    }

    fn exit(&mut self) -> PluginResult<()> {
        Ok(())
    }

    /// Write the whole job. `Ok(false)` reports failure to the host.
    fn output(&mut self, job: &mut OutputJob<'_>) -> PluginResult<bool>;

    fn config(&mut self, _hwnd: Hwnd, _dll_instance: Hinstance) -> PluginResult<bool> {
        Ok(false)
    }

    /// Settings persisted by the host between sessions.
    fn config_data(&mut self) -> PluginResult<Vec<u8>> {
        Ok(Vec::new())
    }

    /// Restore settings. Returns bytes consumed.
    fn set_config_data(&mut self, _data: &[u8]) -> PluginResult<usize> {
        Ok(0)
    }
}

/// One `func_output` call.
///
/// Buffers returned by the fetch methods belong to the host and are only
/// valid until the next fetch, which the `&mut self` receivers enforce.
pub struct OutputJob<'a> {
    info: &'a OutputInfo,
}

impl<'a> OutputJob<'a> {
    pub fn new(info: &'a OutputInfo) -> Self {
        Self { info }
    }

    pub fn raw(&self) -> &OutputInfo {
        self.info
    }

    pub fn flags(&self) -> OutputInfoFlag {
        self.info.flag
    }

    pub fn has_video(&self) -> bool {
        self.info.flag.contains(OutputInfoFlag::VIDEO)
    }

    pub fn has_audio(&self) -> bool {
        self.info.flag.contains(OutputInfoFlag::AUDIO)
    }

    pub fn is_batch(&self) -> bool {
        self.info.flag.contains(OutputInfoFlag::BATCH)
    }

    pub fn width(&self) -> i32 {
        self.info.w
    }

    pub fn height(&self) -> i32 {
        self.info.h
    }

    pub fn rate(&self) -> i32 {
        self.info.rate
    }

    pub fn scale(&self) -> i32 {
        self.info.scale
    }

    pub fn fps(&self) -> f64 {
        if self.info.scale == 0 {
            0.0
        } else {
            f64::from(self.info.rate) / f64::from(self.info.scale)
        }
    }

    pub fn frame_count(&self) -> i32 {
        self.info.n
    }

    pub fn frame_size(&self) -> usize {
        self.info.size.max(0) as usize
    }

    pub fn audio_rate(&self) -> i32 {
        self.info.audio_rate
    }

    pub fn audio_channels(&self) -> i32 {
        self.info.audio_ch
    }

    pub fn audio_samples(&self) -> i32 {
        self.info.audio_n
    }

    pub fn audio_sample_size(&self) -> usize {
        self.info.audio_size.max(0) as usize
    }

    pub fn save_path(&self) -> PathBuf {
        // SAFETY: the host keeps `savefile` alive for the job.
        unsafe { decode_ansi_path(self.info.savefile) }
    }

    fn check_frame(&self, frame: i32) -> PluginResult<()> {
        if (0..self.info.n).contains(&frame) {
            Ok(())
        } else {
            Err(PluginError::out_of_bounds("frame", frame, 0, self.info.n - 1))
        }
    }

    /// RGB24 DIB of `frame`.
    pub fn video(&mut self, frame: i32) -> PluginResult<&[u8]> {
        self.check_frame(frame)?;
        let get = self.info.func_get_video.ok_or(PluginError::MissingCallback("func_get_video"))?;
        // SAFETY: host callback.
        let ptr = unsafe { get(frame) };
        if ptr.is_null() {
            return Err(PluginError::HostRejected("func_get_video"));
        }
        // SAFETY: `size` bytes per frame.
        Ok(unsafe { std::slice::from_raw_parts(ptr.cast::<u8>(), self.frame_size()) })
    }

    /// `frame` as a DIB in `format` (`0` or `YUY2`).
    pub fn video_ex(&mut self, frame: i32, format: u32) -> PluginResult<&[u8]> {
        self.check_frame(frame)?;
        let bits = dib_format_bits(format)?;
        let get = self
            .info
            .func_get_video_ex
            .ok_or(PluginError::MissingCallback("func_get_video_ex"))?;
        // SAFETY: host callback.
        let ptr = unsafe { get(frame, format) };
        if ptr.is_null() {
            return Err(PluginError::HostRejected("func_get_video_ex"));
        }
        let len = dib_image_size(self.info.w, self.info.h, bits);
        // SAFETY: one DIB of `format`.
        Ok(unsafe { std::slice::from_raw_parts(ptr.cast::<u8>(), len) })
    }

    /// Interleaved 16-bit PCM for up to `length` samples from `start`.
    pub fn audio(&mut self, start: i32, length: i32) -> PluginResult<&[i16]> {
        let get = self.info.func_get_audio.ok_or(PluginError::MissingCallback("func_get_audio"))?;
        if length <= 0 {
            return Ok(&[]);
        }
        let mut read = 0i32;
        // SAFETY: host callback; `read` is a valid out parameter.
        let ptr = unsafe { get(start, length, &mut read) };
        if ptr.is_null() || read <= 0 {
            return Ok(&[]);
        }
        let values = read.min(length) as usize * self.info.audio_ch.max(1) as usize;
        // SAFETY: `read` samples of `audio_ch` interleaved channels.
        Ok(unsafe { std::slice::from_raw_parts(ptr.cast::<i16>(), values) })
    }

    pub fn is_aborted(&self) -> bool {
        match self.info.func_is_abort {
            // SAFETY: host callback.
            Some(f) => unsafe { f() != 0 },
            None => false,
        }
    }

    /// Update the remaining-time display.
    pub fn show_progress(&self, now: i32, total: i32) -> PluginResult<()> {
        let f = self
            .info
            .func_rest_time_disp
            .ok_or(PluginError::MissingCallback("func_rest_time_disp"))?;
        // SAFETY: host callback.
        unsafe { f(now, total) };
        Ok(())
    }

    pub fn frame_flags(&self, frame: i32) -> PluginResult<OutputFrameFlag> {
        self.check_frame(frame)?;
        let f = self.info.func_get_flag.ok_or(PluginError::MissingCallback("func_get_flag"))?;
        // SAFETY: host callback.
        Ok(unsafe { f(frame) })
    }

    pub fn update_preview(&self) -> PluginResult<()> {
        let f = self
            .info
            .func_update_preview
            .ok_or(PluginError::MissingCallback("func_update_preview"))?;
        // SAFETY: host callback.
        unsafe { f() };
        Ok(())
    }
}

struct OutputState<P> {
    plugin: P,
    pending_config: Option<Vec<u8>>,
}

pub struct OutputSlot<P: OutputPlugin> {
    table: Box<OutputPluginTable>,
    _name: CString,
    _filters: Vec<u8>,
    _information: CString,
    state: Mutex<OutputState<P>>,
}

// SAFETY: immutable after registration except `state`, which is locked.
unsafe impl<P: OutputPlugin> Send for OutputSlot<P> {}
unsafe impl<P: OutputPlugin> Sync for OutputSlot<P> {}

impl<P: OutputPlugin> OutputSlot<P> {
    fn build() -> PluginResult<Self> {
        let descriptor = P::descriptor();
        let name = encode_ansi(&descriptor.name)?;
        let pairs: Vec<(&str, &str)> = descriptor
            .file_filters
            .iter()
            .map(|(d, p)| (d.as_str(), p.as_str()))
            .collect();
        let filters = encode_filter_list(&pairs)?;
        let information = encode_ansi(&descriptor.information)?;

        let mut table = Box::<OutputPluginTable>::default();
        table.name = name.as_ptr() as *mut c_char;
        table.filefilter = filters.as_ptr() as *mut c_char;
        table.information = information.as_ptr() as *mut c_char;
        table.func_init = Some(init_trampoline::<P>);
        table.func_exit = Some(exit_trampoline::<P>);
        table.func_output = Some(output_trampoline::<P>);
        if descriptor.has_config {
            table.func_config = Some(config_trampoline::<P>);
        }
        if descriptor.has_config_data {
            table.func_config_get = Some(config_get_trampoline::<P>);
            table.func_config_set = Some(config_set_trampoline::<P>);
        }
        let plugin = P::create()?;
        info!(output = %descriptor.name, "output plugin registered");
        Ok(Self {
            table,
            _name: name,
            _filters: filters,
            _information: information,
            state: Mutex::new(OutputState {
                plugin,
                pending_config: None,
            }),
        })
    }

    pub fn table_ptr(&self) -> *mut OutputPluginTable {
        &*self.table as *const OutputPluginTable as *mut OutputPluginTable
    }
}

pub fn register_output<P: OutputPlugin>() -> PluginResult<*mut OutputPluginTable> {
    Ok(registry::get_or_try_insert(OutputSlot::<P>::build)?.table_ptr())
}

fn output_slot<P: OutputPlugin>() -> PluginResult<&'static OutputSlot<P>> {
    registry::get::<OutputSlot<P>>().ok_or(PluginError::NotRegistered(std::any::type_name::<P>()))
}

unsafe extern "C" fn init_trampoline<P: OutputPlugin>() -> Bool {
    guard_bool("output func_init", || output_slot::<P>()?.state.lock().plugin.init().map(|()| true))
}

unsafe extern "C" fn exit_trampoline<P: OutputPlugin>() -> Bool {
    guard_bool("output func_exit", || output_slot::<P>()?.state.lock().plugin.exit().map(|()| true))
}

unsafe extern "C" fn output_trampoline<P: OutputPlugin>(oip: *mut OutputInfo) -> Bool {
    guard_bool("output func_output", || {
        let info = unsafe { oip.as_ref() }.ok_or(PluginError::Unsupported("null OUTPUT_INFO".into()))?;
        let mut job = OutputJob::new(info);
        debug!(
            path = %job.save_path().display(),
            frames = job.frame_count(),
            "output started"
        );
        let ok = output_slot::<P>()?.state.lock().plugin.output(&mut job)?;
        debug!(ok, aborted = job.is_aborted(), "output finished");
        Ok(ok)
    })
}

unsafe extern "C" fn config_trampoline<P: OutputPlugin>(hwnd: Hwnd, dll_hinst: Hinstance) -> Bool {
    guard_bool("output func_config", || {
        output_slot::<P>()?.state.lock().plugin.config(hwnd, dll_hinst)
    })
}

unsafe extern "C" fn config_get_trampoline<P: OutputPlugin>(data: *mut c_void, size: i32) -> i32 {
    guard_with_default("output func_config_get", 0, || {
        let mut state = output_slot::<P>()?.state.lock();
        if data.is_null() {
            let bytes = state.plugin.config_data()?;
            let len = config_len(bytes.len())?;
            state.pending_config = Some(bytes);
            return Ok(len);
        }
        let bytes = match state.pending_config.take() {
            Some(bytes) => bytes,
            None => state.plugin.config_data()?,
        };
        let n = bytes.len().min(size.max(0) as usize);
        // SAFETY: the host provides `size` writable bytes.
        unsafe { std::ptr::copy_nonoverlapping(bytes.as_ptr(), data.cast::<u8>(), n) };
        config_len(n)
    })
}

/// Byte count as the host's `int`.
fn config_len(len: usize) -> PluginResult<i32> {
    i32::try_from(len).map_err(|_| PluginError::out_of_bounds("config data", len as i64, 0, i32::MAX))
}

unsafe extern "C" fn config_set_trampoline<P: OutputPlugin>(data: *mut c_void, size: i32) -> i32 {
    guard_with_default("output func_config_set", 0, || {
        if data.is_null() || size <= 0 {
            return Ok(0);
        }
        // SAFETY: the host provides `size` readable bytes.
        let bytes = unsafe { std::slice::from_raw_parts(data.cast::<u8>(), size as usize) };
        let used = output_slot::<P>()?.state.lock().plugin.set_config_data(bytes)?;
        config_len(used.min(bytes.len()))
    })
}
