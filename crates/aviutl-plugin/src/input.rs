//! Input plugins (`*.aui`).
//!
//! Each successful `func_open` boxes an [`InputSession`] that owns the
//! plugin's handle together with the `BITMAPINFOHEADER` / `WAVEFORMATEX`
//! the host reads through `INPUT_INFO`. The box address is the host handle.

use std::ffi::{c_char, c_void, CString};
use std::path::Path;

use aviutl_sys::win::dib_image_size;
use aviutl_sys::{
    BitmapInfoHeader, Bool, Hinstance, Hwnd, InputHandle, InputInfo, InputInfoFlag, InputPluginFlag,
    InputPluginTable, WaveFormatEx, FALSE, TRUE,
};
use parking_lot::Mutex;
use tracing::{debug, info};

use crate::encoding::{decode_ansi_path, encode_ansi, encode_filter_list};
use crate::error::{PluginError, PluginResult};
use crate::ffi_guard::{guard_bool, guard_with_default};
use crate::registry;

/// What the host shows for an input plugin.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputDescriptor {
    pub name: String,
    /// `(description, pattern)` pairs for the open dialog.
    pub file_filters: Vec<(String, String)>,
    pub information: String,
    pub flags: InputPluginFlag,
    /// Install `func_config`.
    pub has_config: bool,
}

impl InputDescriptor {
    pub fn new(name: impl Into<String>, information: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            file_filters: Vec::new(),
            information: information.into(),
            flags: InputPluginFlag::VIDEO | InputPluginFlag::AUDIO,
            has_config: false,
        }
    }

    pub fn file_filter(mut self, description: impl Into<String>, pattern: impl Into<String>) -> Self {
        self.file_filters.push((description.into(), pattern.into()));
        self
    }

    pub fn flags(mut self, flags: InputPluginFlag) -> Self {
        self.flags = flags;
        self
    }

    pub fn with_config(mut self) -> Self {
        self.has_config = true;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VideoInfo {
    pub rate: i32,
    pub scale: i32,
    pub frames: i32,
    pub format: BitmapInfoHeader,
    /// Codec FourCC, `0` when uncompressed.
    pub handler: u32,
    pub random_access: bool,
}

impl VideoInfo {
    /// Bytes one decoded frame occupies.
    pub fn frame_bytes(&self) -> usize {
        if self.format.size_image > 0 {
            self.format.size_image as usize
        } else {
            dib_image_size(self.format.width, self.format.height.abs(), self.format.bit_count)
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AudioInfo {
    /// Total samples per channel.
    pub samples: i32,
    pub format: WaveFormatEx,
}

impl AudioInfo {
    pub fn block_align(&self) -> usize {
        let align = self.format.block_align;
        align as usize
    }
}

/// Streams of an opened file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MediaInfo {
    pub video: Option<VideoInfo>,
    pub audio: Option<AudioInfo>,
}

pub trait InputPlugin: Send + 'static {
    type Handle: Send + 'static;

    fn descriptor() -> InputDescriptor
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

    /// Open `path`. `Ok(None)` means the file is not for this plugin.
    fn open(&mut self, path: &Path) -> PluginResult<Option<Self::Handle>>;

    fn info(&mut self, handle: &mut Self::Handle) -> PluginResult<MediaInfo>;

    /// Decode `frame` into `buf` (sized from the video format). Returns bytes written.
    fn read_video(&mut self, handle: &mut Self::Handle, frame: i32, buf: &mut [u8]) -> PluginResult<usize>;

    /// Decode `length` samples from `start` into `buf`. Returns samples written.
    fn read_audio(&mut self, handle: &mut Self::Handle, start: i32, length: i32, buf: &mut [u8]) -> PluginResult<usize>;

    fn is_keyframe(&mut self, _handle: &mut Self::Handle, _frame: i32) -> PluginResult<bool> {
        Ok(true)
    }

    /// Settings dialog; needs [`InputDescriptor::with_config`].
    fn config(&mut self, _hwnd: Hwnd, _dll_instance: Hinstance) -> PluginResult<bool> {
        Ok(false)
    }
}

/// One open file.
pub struct InputSession<H> {
    handle: H,
    info: Option<MediaInfo>,
    video_format: BitmapInfoHeader,
    audio_format: WaveFormatEx,
}

impl<H> InputSession<H> {
    fn new(handle: H) -> Self {
        Self {
            handle,
            info: None,
            video_format: BitmapInfoHeader::default(),
            audio_format: WaveFormatEx::default(),
        }
    }

    pub fn handle_mut(&mut self) -> &mut H {
        &mut self.handle
    }

    pub fn info(&self) -> Option<&MediaInfo> {
        self.info.as_ref()
    }

    fn ensure_info<P: InputPlugin<Handle = H>>(&mut self, plugin: &mut P) -> PluginResult<MediaInfo> {
        if let Some(info) = self.info {
            return Ok(info);
        }
        let info = plugin.info(&mut self.handle)?;
        if let Some(video) = &info.video {
            self.video_format = video.format;
        }
        if let Some(audio) = &info.audio {
            self.audio_format = audio.format;
        }
        self.info = Some(info);
        Ok(info)
    }

    /// Fill `out` with pointers into this session.
    fn fill(&mut self, info: &MediaInfo, out: &mut InputInfo) {
        *out = InputInfo::default();
        if let Some(video) = &info.video {
            out.flag |= InputInfoFlag::VIDEO;
            if video.random_access {
                out.flag |= InputInfoFlag::VIDEO_RANDOM_ACCESS;
            }
            out.rate = video.rate;
            out.scale = video.scale;
            out.n = video.frames;
            out.format = &mut self.video_format;
            out.format_size = std::mem::size_of::<BitmapInfoHeader>() as i32;
            out.handler = video.handler;
        }
        if let Some(audio) = &info.audio {
            out.flag |= InputInfoFlag::AUDIO;
            out.audio_n = audio.samples;
            out.audio_format = &mut self.audio_format;
            out.audio_format_size = std::mem::size_of::<WaveFormatEx>() as i32;
        }
    }
}

/// Registered state of one input plugin type.
pub struct InputSlot<P: InputPlugin> {
    table: Box<InputPluginTable>,
    _name: CString,
    _filters: Vec<u8>,
    _information: CString,
    plugin: Mutex<P>,
}

// SAFETY: the table and strings are immutable after registration; the
// plugin is behind a mutex and `P: Send`.
unsafe impl<P: InputPlugin> Send for InputSlot<P> {}
unsafe impl<P: InputPlugin> Sync for InputSlot<P> {}

impl<P: InputPlugin> InputSlot<P> {
    fn build() -> PluginResult<Self> {
        let descriptor = P::descriptor();
        let name = encode_ansi(&descriptor.name)?;
        let filter_pairs: Vec<(&str, &str)> = descriptor
            .file_filters
            .iter()
            .map(|(d, p)| (d.as_str(), p.as_str()))
            .collect();
        let filters = encode_filter_list(&filter_pairs)?;
        let information = encode_ansi(&descriptor.information)?;

        let mut table = Box::<InputPluginTable>::default();
        table.flag = descriptor.flags;
        table.name = name.as_ptr() as *mut c_char;
        table.filefilter = filters.as_ptr() as *mut c_char;
        table.information = information.as_ptr() as *mut c_char;
        table.func_init = Some(init_trampoline::<P>);
        table.func_exit = Some(exit_trampoline::<P>);
        table.func_open = Some(open_trampoline::<P>);
        table.func_close = Some(close_trampoline::<P>);
        table.func_info_get = Some(info_get_trampoline::<P>);
        table.func_read_video = Some(read_video_trampoline::<P>);
        table.func_read_audio = Some(read_audio_trampoline::<P>);
        table.func_is_keyframe = Some(is_keyframe_trampoline::<P>);
        if descriptor.has_config {
            table.func_config = Some(config_trampoline::<P>);
        }
        let plugin = P::create()?;
        info!(input = %descriptor.name, "input plugin registered");
        Ok(Self {
            table,
            _name: name,
            _filters: filters,
            _information: information,
            plugin: Mutex::new(plugin),
        })
    }

    pub fn table_ptr(&self) -> *mut InputPluginTable {
        &*self.table as *const InputPluginTable as *mut InputPluginTable
    }
}

/// Register `P` (once per process) and return its table.
pub fn register_input<P: InputPlugin>() -> PluginResult<*mut InputPluginTable> {
    Ok(registry::get_or_try_insert(InputSlot::<P>::build)?.table_ptr())
}

fn input_slot<P: InputPlugin>() -> PluginResult<&'static InputSlot<P>> {
    registry::get::<InputSlot<P>>().ok_or(PluginError::NotRegistered(std::any::type_name::<P>()))
}

/// # Safety
///
/// `ih` must be null or a handle produced by `open_trampoline::<P>`, and the
/// caller must hold the plugin lock for as long as the reference lives. That
/// lock is what keeps two host threads from aliasing one session.
unsafe fn session<'s, P: InputPlugin>(ih: InputHandle) -> PluginResult<&'s mut InputSession<P::Handle>> {
    ih.cast::<InputSession<P::Handle>>()
        .as_mut()
        .ok_or(PluginError::Unsupported("null input handle".into()))
}

unsafe extern "C" fn init_trampoline<P: InputPlugin>() -> Bool {
    guard_bool("input func_init", || input_slot::<P>()?.plugin.lock().init().map(|()| true))
}

unsafe extern "C" fn exit_trampoline<P: InputPlugin>() -> Bool {
    guard_bool("input func_exit", || input_slot::<P>()?.plugin.lock().exit().map(|()| true))
}

unsafe extern "C" fn open_trampoline<P: InputPlugin>(file: *mut c_char) -> InputHandle {
    guard_with_default("input func_open", std::ptr::null_mut(), || {
        let path = unsafe { decode_ansi_path(file) };
        let opened = input_slot::<P>()?.plugin.lock().open(&path)?;
        Ok(match opened {
            Some(handle) => {
                debug!(path = %path.display(), "input opened");
                Box::into_raw(Box::new(InputSession::new(handle))).cast::<c_void>()
            }
            None => std::ptr::null_mut(),
        })
    })
}

unsafe extern "C" fn close_trampoline<P: InputPlugin>(ih: InputHandle) -> Bool {
    guard_bool("input func_close", || {
        if ih.is_null() {
            return Ok(false);
        }
        let _plugin = input_slot::<P>()?.plugin.lock();
        // SAFETY: produced by `open_trampoline::<P>` and closed once, under the lock.
        drop(unsafe { Box::from_raw(ih.cast::<InputSession<P::Handle>>()) });
        Ok(true)
    })
}

unsafe extern "C" fn info_get_trampoline<P: InputPlugin>(ih: InputHandle, iip: *mut InputInfo) -> Bool {
    guard_bool("input func_info_get", || {
        let mut plugin = input_slot::<P>()?.plugin.lock();
        let session = unsafe { session::<P>(ih)? };
        let out = unsafe { iip.as_mut() }.ok_or(PluginError::Unsupported("null INPUT_INFO".into()))?;
        let info = session.ensure_info(&mut *plugin)?;
        session.fill(&info, out);
        Ok(info.video.is_some() || info.audio.is_some())
    })
}

unsafe extern "C" fn read_video_trampoline<P: InputPlugin>(ih: InputHandle, frame: i32, buf: *mut c_void) -> i32 {
    guard_with_default("input func_read_video", 0, || {
        let mut plugin = input_slot::<P>()?.plugin.lock();
        let session = unsafe { session::<P>(ih)? };
        let info = session.ensure_info(&mut *plugin)?;
        let video = info
            .video
            .ok_or(PluginError::Unsupported("file has no video".into()))?;
        if buf.is_null() {
            return Ok(0);
        }
        // SAFETY: the host allocates one frame as described by `format`.
        let out = unsafe { std::slice::from_raw_parts_mut(buf.cast::<u8>(), video.frame_bytes()) };
        let written = plugin.read_video(&mut session.handle, frame, out)?;
        Ok(written.min(out.len()) as i32)
    })
}

unsafe extern "C" fn read_audio_trampoline<P: InputPlugin>(
    ih: InputHandle,
    start: i32,
    length: i32,
    buf: *mut c_void,
) -> i32 {
    guard_with_default("input func_read_audio", 0, || {
        let mut plugin = input_slot::<P>()?.plugin.lock();
        let session = unsafe { session::<P>(ih)? };
        let info = session.ensure_info(&mut *plugin)?;
        let audio = info
            .audio
            .ok_or(PluginError::Unsupported("file has no audio".into()))?;
        if buf.is_null() || length <= 0 {
            return Ok(0);
        }
        // SAFETY: the host allocates `length` blocks.
        let out = unsafe { std::slice::from_raw_parts_mut(buf.cast::<u8>(), length as usize * audio.block_align()) };
        let samples = plugin.read_audio(&mut session.handle, start, length, out)?;
        Ok(samples.min(length as usize) as i32)
    })
}

unsafe extern "C" fn is_keyframe_trampoline<P: InputPlugin>(ih: InputHandle, frame: i32) -> Bool {
    // Errors report a keyframe so seeking still works.
    guard_with_default("input func_is_keyframe", TRUE, || {
        let mut plugin = input_slot::<P>()?.plugin.lock();
        let session = unsafe { session::<P>(ih)? };
        let key = plugin.is_keyframe(&mut session.handle, frame)?;
        Ok(if key { TRUE } else { FALSE })
    })
}

unsafe extern "C" fn config_trampoline<P: InputPlugin>(hwnd: Hwnd, dll_hinst: Hinstance) -> Bool {
    guard_bool("input func_config", || input_slot::<P>()?.plugin.lock().config(hwnd, dll_hinst))
}
