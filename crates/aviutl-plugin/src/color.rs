//! Color conversion plugins (`*.auc`).

use std::ffi::{c_char, CString};
use std::mem::size_of;

use aviutl_sys::win::dib_image_size;
use aviutl_sys::{Bool, ColorInfo, ColorInfoFlag, ColorPluginTable, PixelYc};
use parking_lot::Mutex;
use tracing::{info, trace};

use crate::encoding::encode_ansi;
use crate::error::{PluginError, PluginResult};
use crate::ffi_guard::guard_bool;
use crate::frame::{YcPlane, YcPlaneMut};
use crate::host::dib_format_bits;
use crate::registry;
use crate::threading::{Dispatcher, HostThreads, WorkerFn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColorDescriptor {
    pub name: String,
    pub information: String,
}

impl ColorDescriptor {
    pub fn new(name: impl Into<String>, information: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            information: information.into(),
        }
    }
}

/// Converts between a DIB format and the host's YC plane.
///
/// Return `Ok(false)` for formats the plugin does not handle so the host
/// can try the next plugin.
pub trait ColorPlugin: Send + 'static {
    fn descriptor() -> ColorDescriptor
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

    fn pixel_to_yc(&mut self, job: &mut ColorJob<'_>) -> PluginResult<bool>;

    fn yc_to_pixel(&mut self, job: &mut ColorJob<'_>) -> PluginResult<bool>;
}

/// One conversion request.
pub struct ColorJob<'a> {
    info: &'a mut ColorInfo,
}

impl<'a> ColorJob<'a> {
    pub fn new(info: &'a mut ColorInfo) -> Self {
        Self { info }
    }

    pub fn raw(&self) -> &ColorInfo {
        self.info
    }

    pub fn flags(&self) -> ColorInfoFlag {
        self.info.flag
    }

    /// Rows of the DIB run top to bottom.
    pub fn is_height_inverted(&self) -> bool {
        self.info.flag.contains(ColorInfoFlag::INVERT_HEIGHT)
    }

    /// FOURCC of the DIB side, `0` for RGB.
    pub fn format(&self) -> u32 {
        self.info.format
    }

    pub fn width(&self) -> usize {
        self.info.w.max(0) as usize
    }

    pub fn height(&self) -> usize {
        self.info.h.max(0) as usize
    }

    pub fn line_size(&self) -> usize {
        self.info.line_size.max(0) as usize
    }

    fn check_yc(&self) -> PluginResult<()> {
        if self.info.ycp.is_null() {
            return Err(PluginError::Unsupported("null ycp".into()));
        }
        if self.info.yc_size != 0 && self.info.yc_size as usize != size_of::<PixelYc>() {
            return Err(PluginError::Unsupported(format!("yc_size {}", self.info.yc_size)));
        }
        if self.line_size() < self.width() * size_of::<PixelYc>() {
            return Err(PluginError::out_of_bounds(
                "line_size",
                self.info.line_size,
                (self.width() * size_of::<PixelYc>()) as i64,
                i64::from(i32::MAX),
            ));
        }
        Ok(())
    }

    pub fn yc(&self) -> PluginResult<YcPlane<'_>> {
        self.check_yc()?;
        // SAFETY: the host sizes `ycp` by `line_size` rows.
        Ok(unsafe { YcPlane::from_raw(self.info.ycp, self.width(), self.height(), self.line_size()) })
    }

    pub fn yc_mut(&mut self) -> PluginResult<YcPlaneMut<'_>> {
        self.check_yc()?;
        // SAFETY: as `yc`, borrowed mutably through `self`.
        Ok(unsafe { YcPlaneMut::from_raw(self.info.ycp, self.width(), self.height(), self.line_size()) })
    }

    fn pixel_len(&self) -> PluginResult<usize> {
        if self.info.pixelp.is_null() {
            return Err(PluginError::Unsupported("null pixelp".into()));
        }
        let bits = dib_format_bits(self.info.format)?;
        Ok(dib_image_size(self.info.w, self.info.h, bits))
    }

    /// DIB bytes for the formats whose depth is known (RGB24, YUY2).
    pub fn pixels(&self) -> PluginResult<&[u8]> {
        let len = self.pixel_len()?;
        // SAFETY: the host buffer holds one DIB of `format`.
        Ok(unsafe { std::slice::from_raw_parts(self.info.pixelp.cast::<u8>(), len) })
    }

    pub fn pixels_mut(&mut self) -> PluginResult<&mut [u8]> {
        let len = self.pixel_len()?;
        // SAFETY: as `pixels`.
        Ok(unsafe { std::slice::from_raw_parts_mut(self.info.pixelp.cast::<u8>(), len) })
    }

    /// DIB bytes for a format this crate does not know.
    ///
    /// # Safety
    ///
    /// `bit_count` must match `format()`.
    pub unsafe fn pixels_with_depth(&mut self, bit_count: u16) -> PluginResult<&mut [u8]> {
        if self.info.pixelp.is_null() {
            return Err(PluginError::Unsupported("null pixelp".into()));
        }
        let len = dib_image_size(self.info.w, self.info.h, bit_count);
        Ok(std::slice::from_raw_parts_mut(self.info.pixelp.cast::<u8>(), len))
    }

    /// The host pool, usable while [`split_mut`](Self::split_mut) borrows the buffers.
    pub fn threads(&self) -> HostThreads {
        HostThreads::new(self.info.exec_multi_thread_func)
    }

    /// Both sides at once, for conversions that read one and write the other.
    pub fn split_mut(&mut self) -> PluginResult<(YcPlaneMut<'_>, &mut [u8])> {
        self.check_yc()?;
        let len = self.pixel_len()?;
        // SAFETY: `ycp` and `pixelp` are distinct host buffers.
        unsafe {
            Ok((
                YcPlaneMut::from_raw(self.info.ycp, self.width(), self.height(), self.line_size()),
                std::slice::from_raw_parts_mut(self.info.pixelp.cast::<u8>(), len),
            ))
        }
    }
}

impl Dispatcher for ColorJob<'_> {
    fn dispatch(&self, f: &WorkerFn<'_>) -> PluginResult<()> {
        self.threads().dispatch(f)
    }
}

pub struct ColorSlot<P: ColorPlugin> {
    table: Box<ColorPluginTable>,
    _name: CString,
    _information: CString,
    plugin: Mutex<P>,
}

// SAFETY: the table and strings are fixed after registration.
unsafe impl<P: ColorPlugin> Send for ColorSlot<P> {}
unsafe impl<P: ColorPlugin> Sync for ColorSlot<P> {}

impl<P: ColorPlugin> ColorSlot<P> {
    fn build() -> PluginResult<Self> {
        let descriptor = P::descriptor();
        let name = encode_ansi(&descriptor.name)?;
        let information = encode_ansi(&descriptor.information)?;
        let mut table = Box::<ColorPluginTable>::default();
        table.name = name.as_ptr() as *mut c_char;
        table.information = information.as_ptr() as *mut c_char;
        table.func_init = Some(init_trampoline::<P>);
        table.func_exit = Some(exit_trampoline::<P>);
        table.func_pixel2yc = Some(pixel2yc_trampoline::<P>);
        table.func_yc2pixel = Some(yc2pixel_trampoline::<P>);
        let plugin = P::create()?;
        info!(color = %descriptor.name, "color plugin registered");
        Ok(Self {
            table,
            _name: name,
            _information: information,
            plugin: Mutex::new(plugin),
        })
    }

    pub fn table_ptr(&self) -> *mut ColorPluginTable {
        &*self.table as *const ColorPluginTable as *mut ColorPluginTable
    }
}

pub fn register_color<P: ColorPlugin>() -> PluginResult<*mut ColorPluginTable> {
    Ok(registry::get_or_try_insert(ColorSlot::<P>::build)?.table_ptr())
}

fn color_slot<P: ColorPlugin>() -> PluginResult<&'static ColorSlot<P>> {
    registry::get::<ColorSlot<P>>().ok_or(PluginError::NotRegistered(std::any::type_name::<P>()))
}

unsafe extern "C" fn init_trampoline<P: ColorPlugin>() -> Bool {
    guard_bool("color func_init", || color_slot::<P>()?.plugin.lock().init().map(|()| true))
}

unsafe extern "C" fn exit_trampoline<P: ColorPlugin>() -> Bool {
    guard_bool("color func_exit", || color_slot::<P>()?.plugin.lock().exit().map(|()| true))
}

unsafe extern "C" fn pixel2yc_trampoline<P: ColorPlugin>(cpip: *mut ColorInfo) -> Bool {
    guard_bool("color func_pixel2yc", || {
        let info = unsafe { cpip.as_mut() }.ok_or(PluginError::Unsupported("null COLOR_PLUGIN_INFO".into()))?;
        trace!(format = info.format, w = info.w, h = info.h, "pixel2yc");
        color_slot::<P>()?.plugin.lock().pixel_to_yc(&mut ColorJob::new(info))
    })
}

unsafe extern "C" fn yc2pixel_trampoline<P: ColorPlugin>(cpip: *mut ColorInfo) -> Bool {
    guard_bool("color func_yc2pixel", || {
        let info = unsafe { cpip.as_mut() }.ok_or(PluginError::Unsupported("null COLOR_PLUGIN_INFO".into()))?;
        trace!(format = info.format, w = info.w, h = info.h, "yc2pixel");
        color_slot::<P>()?.plugin.lock().yc_to_pixel(&mut ColorJob::new(info))
    })
}
