//! YC image views and the per-frame processing context.
//!
//! Host images are arrays of [`PixelYc`] whose rows are `line_size` bytes
//! apart. Only the first `width` pixels of each row belong to the image.

use std::ffi::c_void;
use std::marker::PhantomData;
use std::mem::size_of;

use aviutl_sys::{FilterProcInfo, PixelYc, ProcInfoFlag};

use crate::error::{PluginError, PluginResult};
use crate::threading::{band_range, Dispatcher};

const YC_SIZE: usize = size_of::<PixelYc>();

/// Read-only strided YC image.
#[derive(Clone, Copy)]
pub struct YcPlane<'a> {
    ptr: *const PixelYc,
    width: usize,
    height: usize,
    stride: usize,
    _marker: PhantomData<&'a [PixelYc]>,
}

// SAFETY: behaves like `&[PixelYc]`.
unsafe impl Send for YcPlane<'_> {}
unsafe impl Sync for YcPlane<'_> {}

impl<'a> YcPlane<'a> {
    /// View host memory.
    ///
    /// # Safety
    ///
    /// `ptr` must address `height` rows of `line_size` bytes, each holding at
    /// least `width` pixels, valid and unmodified for `'a`.
    pub unsafe fn from_raw(ptr: *const PixelYc, width: usize, height: usize, line_size: usize) -> Self {
        Self {
            ptr,
            width,
            height,
            stride: line_size / YC_SIZE,
            _marker: PhantomData,
        }
    }

    /// View a slice with `stride` pixels per row.
    pub fn from_slice(data: &'a [PixelYc], width: usize, height: usize, stride: usize) -> PluginResult<Self> {
        check_geometry(data.len(), width, height, stride)?;
        Ok(Self {
            ptr: data.as_ptr(),
            width,
            height,
            stride,
            _marker: PhantomData,
        })
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    /// Row pitch in pixels.
    pub fn stride(&self) -> usize {
        self.stride
    }

    pub fn row(&self, y: usize) -> &'a [PixelYc] {
        assert!(y < self.height, "row {y} out of {}", self.height);
        // SAFETY: `y` is in range and rows hold `width` pixels.
        unsafe { std::slice::from_raw_parts(self.ptr.add(y * self.stride), self.width) }
    }

    pub fn pixel(&self, x: usize, y: usize) -> Option<PixelYc> {
        (x < self.width && y < self.height).then(|| self.row(y)[x])
    }

    pub fn rows(&self) -> impl Iterator<Item = &'a [PixelYc]> + '_ {
        (0..self.height).map(move |y| self.row(y))
    }
}

/// Writable strided YC image.
pub struct YcPlaneMut<'a> {
    ptr: *mut PixelYc,
    width: usize,
    height: usize,
    stride: usize,
    _marker: PhantomData<&'a mut [PixelYc]>,
}

// SAFETY: behaves like `&mut [PixelYc]`.
unsafe impl Send for YcPlaneMut<'_> {}
unsafe impl Sync for YcPlaneMut<'_> {}

#[derive(Clone, Copy)]
struct RowPtr(*mut PixelYc);

// SAFETY: workers only ever touch disjoint row bands.
unsafe impl Send for RowPtr {}
unsafe impl Sync for RowPtr {}

impl<'a> YcPlaneMut<'a> {
    /// # Safety
    ///
    /// As [`YcPlane::from_raw`], and the memory must not be aliased for `'a`.
    pub unsafe fn from_raw(ptr: *mut PixelYc, width: usize, height: usize, line_size: usize) -> Self {
        Self {
            ptr,
            width,
            height,
            stride: line_size / YC_SIZE,
            _marker: PhantomData,
        }
    }

    pub fn from_slice(data: &'a mut [PixelYc], width: usize, height: usize, stride: usize) -> PluginResult<Self> {
        check_geometry(data.len(), width, height, stride)?;
        Ok(Self {
            ptr: data.as_mut_ptr(),
            width,
            height,
            stride,
            _marker: PhantomData,
        })
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn stride(&self) -> usize {
        self.stride
    }

    pub fn as_plane(&self) -> YcPlane<'_> {
        YcPlane {
            ptr: self.ptr,
            width: self.width,
            height: self.height,
            stride: self.stride,
            _marker: PhantomData,
        }
    }

    pub fn row(&self, y: usize) -> &[PixelYc] {
        self.as_plane().row(y)
    }

    pub fn row_mut(&mut self, y: usize) -> &mut [PixelYc] {
        assert!(y < self.height, "row {y} out of {}", self.height);
        // SAFETY: `y` is in range and the view is exclusive.
        unsafe { std::slice::from_raw_parts_mut(self.ptr.add(y * self.stride), self.width) }
    }

    pub fn pixel_mut(&mut self, x: usize, y: usize) -> Option<&mut PixelYc> {
        if x < self.width && y < self.height {
            Some(&mut self.row_mut(y)[x])
        } else {
            None
        }
    }

    pub fn rows_mut(&mut self) -> impl Iterator<Item = &mut [PixelYc]> + '_ {
        let (ptr, width, stride) = (self.ptr, self.width, self.stride);
        // SAFETY: rows are disjoint and each is yielded once.
        (0..self.height).map(move |y| unsafe { std::slice::from_raw_parts_mut(ptr.add(y * stride), width) })
    }

    pub fn fill(&mut self, value: PixelYc) {
        for row in self.rows_mut() {
            row.fill(value);
        }
    }

    /// Copy an image of identical dimensions.
    pub fn copy_from(&mut self, src: &YcPlane<'_>) -> PluginResult<()> {
        if src.width() != self.width || src.height() != self.height {
            return Err(PluginError::Unsupported(format!(
                "copy {}x{} into {}x{}",
                src.width(),
                src.height(),
                self.width,
                self.height
            )));
        }
        for (y, row) in self.rows_mut().enumerate() {
            row.copy_from_slice(src.row(y));
        }
        Ok(())
    }

    /// Run `f(y, row)` for every row, splitting rows into bands over the
    /// dispatcher's workers.
    pub fn par_rows<D, F>(&mut self, dispatcher: &D, f: F) -> PluginResult<()>
    where
        D: Dispatcher + ?Sized,
        F: Fn(usize, &mut [PixelYc]) + Sync,
    {
        let base = RowPtr(self.ptr);
        let (width, height, stride) = (self.width, self.height, self.stride);
        dispatcher.dispatch(&|id, num| {
            // Capture the wrapper, not the raw field.
            let base = base;
            for y in band_range(height, id, num) {
                // SAFETY: each worker gets a disjoint band of rows.
                let row = unsafe { std::slice::from_raw_parts_mut(base.0.add(y * stride), width) };
                f(y, row);
            }
        })
    }
}

fn check_geometry(len: usize, width: usize, height: usize, stride: usize) -> PluginResult<()> {
    if width > stride {
        return Err(PluginError::out_of_bounds("width", width as i64, 0, stride as i64));
    }
    let needed = if height == 0 { 0 } else { (height - 1) * stride + width };
    if needed > len {
        return Err(PluginError::out_of_bounds("image size", needed as i64, 0, len as i64));
    }
    Ok(())
}

/// Owned contiguous YC image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct YcBuffer {
    width: usize,
    height: usize,
    data: Vec<PixelYc>,
}

impl YcBuffer {
    pub fn new(width: usize, height: usize) -> Self {
        Self::filled(width, height, PixelYc::BLACK)
    }

    pub fn filled(width: usize, height: usize, value: PixelYc) -> Self {
        Self {
            width,
            height,
            data: vec![value; width * height],
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn as_slice(&self) -> &[PixelYc] {
        &self.data
    }

    pub fn as_mut_slice(&mut self) -> &mut [PixelYc] {
        &mut self.data
    }

    /// Row pitch in bytes, as the host expects in `line_size`.
    pub fn line_size(&self) -> usize {
        self.width * YC_SIZE
    }

    pub fn plane(&self) -> YcPlane<'_> {
        YcPlane {
            ptr: self.data.as_ptr(),
            width: self.width,
            height: self.height,
            stride: self.width,
            _marker: PhantomData,
        }
    }

    pub fn plane_mut(&mut self) -> YcPlaneMut<'_> {
        YcPlaneMut {
            ptr: self.data.as_mut_ptr(),
            width: self.width,
            height: self.height,
            stride: self.width,
            _marker: PhantomData,
        }
    }
}

/// Safe access to the `FILTER_PROC_INFO` of one `func_proc` call.
pub struct ProcFrame<'a> {
    info: &'a mut FilterProcInfo,
    /// Samples the host buffer holds, as passed in.
    audio_capacity: usize,
}

impl<'a> ProcFrame<'a> {
    pub fn new(info: &'a mut FilterProcInfo) -> Self {
        let audio_capacity = info.audio_n.max(0) as usize;
        Self { info, audio_capacity }
    }

    pub fn raw(&self) -> &FilterProcInfo {
        self.info
    }

    pub fn flags(&self) -> ProcInfoFlag {
        self.info.flag
    }

    pub fn width(&self) -> usize {
        self.info.w.max(0) as usize
    }

    pub fn height(&self) -> usize {
        self.info.h.max(0) as usize
    }

    pub fn max_width(&self) -> usize {
        self.info.max_w.max(0) as usize
    }

    pub fn max_height(&self) -> usize {
        self.info.max_h.max(0) as usize
    }

    /// Size of the source before any filter ran.
    pub fn original_size(&self) -> (usize, usize) {
        (self.info.org_w.max(0) as usize, self.info.org_h.max(0) as usize)
    }

    /// Current frame index (0-based).
    pub fn frame(&self) -> i32 {
        self.info.frame
    }

    pub fn frame_count(&self) -> i32 {
        self.info.frame_n
    }

    pub fn line_size(&self) -> usize {
        self.info.line_size.max(0) as usize
    }

    pub fn edit_handle(&self) -> *mut c_void {
        self.info.editp
    }

    pub fn edit(&self) -> PluginResult<YcPlane<'_>> {
        let ptr = non_null_image(self.info.ycp_edit, "ycp_edit")?;
        self.check_rows(self.width())?;
        // SAFETY: the host guarantees `h` rows of `line_size` bytes for the duration of the call.
        Ok(unsafe { YcPlane::from_raw(ptr, self.width(), self.height(), self.line_size()) })
    }

    pub fn edit_mut(&mut self) -> PluginResult<YcPlaneMut<'_>> {
        let ptr = non_null_image(self.info.ycp_edit, "ycp_edit")?;
        self.check_rows(self.width())?;
        // SAFETY: as `edit`, and `&mut self` keeps the view exclusive.
        Ok(unsafe { YcPlaneMut::from_raw(ptr, self.width(), self.height(), self.line_size()) })
    }

    /// The scratch buffer at the current size.
    pub fn temp_mut(&mut self) -> PluginResult<YcPlaneMut<'_>> {
        let (w, h) = (self.width(), self.height());
        self.temp_mut_sized(w, h)
    }

    /// The scratch buffer viewed at `width` x `height` (at most the max size).
    pub fn temp_mut_sized(&mut self, width: usize, height: usize) -> PluginResult<YcPlaneMut<'_>> {
        self.check_size(width, height)?;
        self.check_rows(width)?;
        let ptr = non_null_image(self.info.ycp_temp, "ycp_temp")?;
        // SAFETY: the temp buffer is `max_h` rows of `line_size` bytes.
        Ok(unsafe { YcPlaneMut::from_raw(ptr, width, height, self.line_size()) })
    }

    /// Source image plus the scratch buffer at `width` x `height`.
    pub fn edit_and_temp(&mut self, width: usize, height: usize) -> PluginResult<(YcPlane<'_>, YcPlaneMut<'_>)> {
        self.check_size(width, height)?;
        self.check_rows(width.max(self.width()))?;
        let edit = non_null_image(self.info.ycp_edit, "ycp_edit")?;
        let temp = non_null_image(self.info.ycp_temp, "ycp_temp")?;
        let line = self.line_size();
        // SAFETY: the two host buffers never overlap.
        unsafe {
            Ok((
                YcPlane::from_raw(edit, self.width(), self.height(), line),
                YcPlaneMut::from_raw(temp, width, height, line),
            ))
        }
    }

    /// Exchange the edit and temp buffers, so the temp image becomes the result.
    pub fn swap_buffers(&mut self) {
        std::mem::swap(&mut self.info.ycp_edit, &mut self.info.ycp_temp);
    }

    /// Change the output size. Rejects sizes beyond the max buffer size.
    pub fn set_size(&mut self, width: usize, height: usize) -> PluginResult<()> {
        self.check_size(width, height)?;
        self.info.w = width as i32;
        self.info.h = height as i32;
        Ok(())
    }

    fn check_size(&self, width: usize, height: usize) -> PluginResult<()> {
        if width > self.max_width() {
            return Err(PluginError::out_of_bounds("width", width as i64, 0, self.max_width() as i64));
        }
        if height > self.max_height() {
            return Err(PluginError::out_of_bounds("height", height as i64, 0, self.max_height() as i64));
        }
        Ok(())
    }

    /// Rows of `width` pixels must fit in `line_size` without overlapping.
    fn check_rows(&self, width: usize) -> PluginResult<()> {
        if self.info.yc_size != YC_SIZE as i32 {
            return Err(PluginError::Unsupported(format!("yc_size {}", self.info.yc_size)));
        }
        let stride = self.line_size() / YC_SIZE;
        if width > stride {
            return Err(PluginError::Unsupported(format!(
                "line_size {} holds {stride} pixels, {width} needed",
                self.info.line_size
            )));
        }
        Ok(())
    }

    pub fn audio_samples(&self) -> usize {
        self.info.audio_n.max(0) as usize
    }

    pub fn audio_channels(&self) -> usize {
        self.info.audio_ch.max(0) as usize
    }

    /// Interleaved 16-bit PCM of this frame; empty when the host passed none.
    pub fn audio_mut(&mut self) -> &mut [i16] {
        let len = self.audio_samples() * self.audio_channels();
        if self.info.audiop.is_null() || len == 0 {
            return &mut [];
        }
        // SAFETY: the host provides `audio_n * audio_ch` samples.
        unsafe { std::slice::from_raw_parts_mut(self.info.audiop, len) }
    }

    /// Change the number of audio samples in this frame. The host buffer
    /// cannot grow, so `n` is capped at the count the host passed in.
    pub fn set_audio_samples(&mut self, n: usize) -> PluginResult<()> {
        if n > self.audio_capacity {
            return Err(PluginError::out_of_bounds("audio samples", n as i64, 0, self.audio_capacity as i64));
        }
        self.info.audio_n = n as i32;
        Ok(())
    }
}

fn non_null_image(ptr: *mut PixelYc, what: &'static str) -> PluginResult<*mut PixelYc> {
    if ptr.is_null() {
        Err(PluginError::Unsupported(format!("{what} is null")))
    } else {
        Ok(ptr)
    }
}
