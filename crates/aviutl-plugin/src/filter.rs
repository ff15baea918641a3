//! Filter plugins (`*.auf`).
//!
//! Implement [`FilterPlugin`], then export it with
//! [`export_filter!`](crate::export_filter). Registration builds an owned
//! `FILTER_DLL` table whose callbacks are generic trampolines; each one finds
//! the plugin instance through the type registry, wraps the host table in a
//! [`FilterContext`] and calls the trait method inside a panic guard.

use std::cell::RefCell;
use std::ffi::{c_char, c_void};

use aviutl_sys::{
    Bool, FilterFlag, FilterPluginTable, FilterProcInfo, FilterUpdateStatus, Hinstance, Hwnd, Lparam,
    WindowMessage, Wparam, FALSE, TRUE,
};
use parking_lot::ReentrantMutex;
use tracing::{debug, info, trace};

use crate::encoding::{decode_ansi_ptr, write_ansi};
use crate::error::{PluginError, PluginResult};
use crate::ffi_guard::{guard_bool, guard_with_default};
use crate::frame::ProcFrame;
use crate::host::Host;
use crate::params::{FilterDescriptor, FilterParams, TableStorage};
use crate::registry;

/// `WM_COMMAND`, sent for filter buttons and menu items.
pub const WM_COMMAND: u32 = 0x0111;

/// A message delivered to the filter window procedure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowEvent {
    pub hwnd: Hwnd,
    pub message: u32,
    pub wparam: Wparam,
    pub lparam: Lparam,
    /// Checkbox count of the filter (`check_n`); button ids beyond it belong
    /// to other controls.
    pub checks: usize,
}

impl WindowEvent {
    /// The host-specific message, when `message` is one.
    pub fn filter_message(&self) -> Option<WindowMessage> {
        let msg = WindowMessage::from(self.message as i32);
        (msg.is_known() && msg != WindowMessage::FILTER_BUTTON).then_some(msg)
    }

    /// Index of the checkbox button that was pressed.
    pub fn button_index(&self) -> Option<usize> {
        if self.message != WM_COMMAND {
            return None;
        }
        let id = (self.wparam & 0xffff) as i32;
        let index = usize::try_from(id - WindowMessage::FILTER_BUTTON.raw()).ok()?;
        (index < self.checks).then_some(index)
    }
}

/// Arguments of `func_is_saveframe`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SaveFrameQuery {
    /// Frames written so far.
    pub save_count: i32,
    pub frame: i32,
    /// Target rate (the frame-rate control's setting).
    pub fps: i32,
    pub edit_flag: i32,
    pub interlace: i32,
}

/// A filter plugin.
///
/// One instance lives for the whole process. Every method runs on the host's
/// UI thread; use [`Host`]'s dispatcher for parallel work inside `process`.
pub trait FilterPlugin: Send + 'static {
    /// Static description: name, controls, flags and hooks.
    fn descriptor() -> FilterDescriptor
    where
        Self: Sized;

    fn create() -> PluginResult<Self>
    where
        Self: Sized;

    /// Filter one frame. Return `false` when nothing was changed.
    fn process(&mut self, ctx: &mut FilterContext<'_>, frame: &mut ProcFrame<'_>) -> PluginResult<bool>;

    fn init(&mut self, _ctx: &mut FilterContext<'_>) -> PluginResult<()> {
        Ok(())
    }

    fn exit(&mut self, _ctx: &mut FilterContext<'_>) -> PluginResult<()> {
        Ok(())
    }

    /// A control changed (or everything, for `FilterUpdateStatus::ALL`).
    fn update(&mut self, _ctx: &mut FilterContext<'_>, _status: FilterUpdateStatus) -> PluginResult<()> {
        Ok(())
    }

    /// Window messages; return `true` to redraw. Needs
    /// [`FilterDescriptor::hook_window_message`].
    fn window_message(&mut self, _ctx: &mut FilterContext<'_>, _event: &WindowEvent) -> PluginResult<bool> {
        Ok(false)
    }

    fn save_start(&mut self, _ctx: &mut FilterContext<'_>, _start: i32, _end: i32) -> PluginResult<()> {
        Ok(())
    }

    fn save_end(&mut self, _ctx: &mut FilterContext<'_>) -> PluginResult<()> {
        Ok(())
    }

    /// Whether a frame is written or dropped. Needs
    /// [`FilterDescriptor::hook_save_frame`].
    fn is_save_frame(&mut self, _ctx: &mut FilterContext<'_>, _query: &SaveFrameQuery) -> PluginResult<bool> {
        Ok(true)
    }

    /// Bytes to store in the project file, or `None` for nothing. Needs
    /// [`FilterDescriptor::hook_project_data`].
    fn project_save(&mut self, _ctx: &mut FilterContext<'_>) -> PluginResult<Option<Vec<u8>>> {
        Ok(None)
    }

    /// Only called when the project holds data for this filter.
    fn project_load(&mut self, _ctx: &mut FilterContext<'_>, _data: &[u8]) -> PluginResult<()> {
        Ok(())
    }

    /// Replacement main-window title. Needs
    /// [`FilterDescriptor::hook_modify_title`].
    fn modify_title(&mut self, _ctx: &mut FilterContext<'_>, _frame: i32, _title: &str) -> PluginResult<Option<String>> {
        Ok(None)
    }
}

/// The host's copy of the filter table for the duration of one callback.
pub struct FilterContext<'a> {
    fp: *mut FilterPluginTable,
    editp: *mut c_void,
    descriptor: &'a FilterDescriptor,
    params: FilterParams<'a>,
}

impl<'a> FilterContext<'a> {
    /// # Safety
    ///
    /// `fp` must be a live host filter table for `'a`.
    pub unsafe fn new(fp: *mut FilterPluginTable, editp: *mut c_void, descriptor: &'a FilterDescriptor) -> PluginResult<Self> {
        let table = fp.as_ref().ok_or(PluginError::Unsupported("null filter table".into()))?;
        let params = FilterParams::from_table(table, descriptor);
        Ok(Self {
            fp,
            editp,
            descriptor,
            params,
        })
    }

    fn table(&self) -> &FilterPluginTable {
        // SAFETY: checked non-null in `new`; the host keeps it alive.
        unsafe { &*self.fp }
    }

    fn table_mut(&mut self) -> &mut FilterPluginTable {
        // SAFETY: as `table`; the host does not touch it during the callback.
        unsafe { &mut *self.fp }
    }

    pub fn descriptor(&self) -> &'a FilterDescriptor {
        self.descriptor
    }

    pub fn params(&self) -> &FilterParams<'a> {
        &self.params
    }

    pub fn filter_ptr(&self) -> *mut FilterPluginTable {
        self.fp
    }

    /// Null outside of an open edit.
    pub fn edit_handle(&self) -> *mut c_void {
        self.editp
    }

    pub fn host(&self) -> PluginResult<Host<'a>> {
        // SAFETY: `exfunc` is set by the host and outlives the filter.
        unsafe { Host::from_raw(self.table().exfunc, self.editp, self.fp) }
    }

    pub fn flags(&self) -> FilterFlag {
        self.table().flag
    }

    pub fn is_active(&self) -> bool {
        self.flags().contains(FilterFlag::ACTIVE)
    }

    pub fn hwnd(&self) -> Hwnd {
        self.table().hwnd
    }

    pub fn dll_instance(&self) -> Hinstance {
        self.table().dll_hinst
    }

    /// Sub-directory of the plugins folder holding the DLL, if any.
    pub fn dll_subdir(&self) -> Option<String> {
        let path = self.table().dll_path;
        // SAFETY: host string or null.
        (!path.is_null()).then(|| unsafe { decode_ansi_ptr(path) })
    }

    /// Write a trackbar value back to the host. Call
    /// [`Host::update_filter_window`] afterwards to refresh the UI.
    pub fn set_track(&mut self, index: usize, value: i32) -> PluginResult<()> {
        let bar = self
            .descriptor
            .trackbars
            .get(index)
            .ok_or_else(|| PluginError::out_of_bounds("trackbar index", index as i64, 0, self.descriptor.trackbars.len() as i64 - 1))?;
        if !(bar.min..=bar.max).contains(&value) {
            return Err(PluginError::out_of_bounds("trackbar value", value, bar.min, bar.max));
        }
        let table = self.table_mut();
        if table.track.is_null() || index >= table.track_n.max(0) as usize {
            return Err(PluginError::Unsupported("host has no trackbar array".into()));
        }
        // SAFETY: index checked against `track_n`.
        unsafe { *table.track.add(index) = value };
        self.refresh_params();
        Ok(())
    }

    pub fn set_check(&mut self, index: usize, checked: bool) -> PluginResult<()> {
        if index >= self.descriptor.checkboxes.len() {
            return Err(PluginError::out_of_bounds(
                "checkbox index",
                index as i64,
                0,
                self.descriptor.checkboxes.len() as i64 - 1,
            ));
        }
        let table = self.table_mut();
        if table.check.is_null() || index >= table.check_n.max(0) as usize {
            return Err(PluginError::Unsupported("host has no checkbox array".into()));
        }
        // SAFETY: index checked against `check_n`.
        unsafe { *table.check.add(index) = checked as i32 };
        self.refresh_params();
        Ok(())
    }

    fn refresh_params(&mut self) {
        // SAFETY: same table the snapshot came from.
        self.params = unsafe { FilterParams::from_table(&*self.fp, self.descriptor) };
    }

    /// The extended data area. Empty without `FilterFlag::EX_DATA`.
    pub fn ex_data_bytes(&self) -> &[u8] {
        let table = self.table();
        if table.ex_data_ptr.is_null() || table.ex_data_size <= 0 {
            return &[];
        }
        // SAFETY: the host allocates `ex_data_size` bytes.
        unsafe { std::slice::from_raw_parts(table.ex_data_ptr.cast(), table.ex_data_size as usize) }
    }

    pub fn ex_data_bytes_mut(&mut self) -> &mut [u8] {
        let table = self.table_mut();
        if table.ex_data_ptr.is_null() || table.ex_data_size <= 0 {
            return &mut [];
        }
        // SAFETY: as `ex_data_bytes`, exclusive through `&mut self`.
        unsafe { std::slice::from_raw_parts_mut(table.ex_data_ptr.cast(), table.ex_data_size as usize) }
    }

    /// The extended data area as `T`. It must be exactly `size_of::<T>()` bytes.
    pub fn ex_data<T: bytemuck::Pod>(&self) -> PluginResult<&T> {
        let bytes = self.ex_data_bytes();
        check_ex_size::<T>(bytes.len())?;
        bytemuck::try_from_bytes(bytes).map_err(|e| PluginError::Unsupported(format!("extended data: {e}")))
    }

    pub fn ex_data_mut<T: bytemuck::Pod>(&mut self) -> PluginResult<&mut T> {
        let bytes = self.ex_data_bytes_mut();
        check_ex_size::<T>(bytes.len())?;
        bytemuck::try_from_bytes_mut(bytes).map_err(|e| PluginError::Unsupported(format!("extended data: {e}")))
    }

    /// Copy the extended data out, ignoring alignment.
    pub fn read_ex_data<T: bytemuck::Pod>(&self) -> PluginResult<T> {
        let bytes = self.ex_data_bytes();
        check_ex_size::<T>(bytes.len())?;
        Ok(bytemuck::pod_read_unaligned(bytes))
    }

    pub fn write_ex_data<T: bytemuck::Pod>(&mut self, value: &T) -> PluginResult<()> {
        let bytes = self.ex_data_bytes_mut();
        check_ex_size::<T>(bytes.len())?;
        bytes.copy_from_slice(bytemuck::bytes_of(value));
        Ok(())
    }
}

fn check_ex_size<T>(actual: usize) -> PluginResult<()> {
    let expected = std::mem::size_of::<T>();
    if actual != expected {
        return Err(PluginError::ExDataSize { expected, actual });
    }
    Ok(())
}

struct FilterState<F> {
    plugin: F,
    /// Bytes produced by the size query of a project save.
    pending_save: Option<Vec<u8>>,
}

/// Everything one registered filter type owns.
pub struct FilterSlot<F: FilterPlugin> {
    descriptor: FilterDescriptor,
    table: Box<FilterPluginTable>,
    _storage: TableStorage,
    state: ReentrantMutex<RefCell<FilterState<F>>>,
}

// SAFETY: the table and storage are immutable after registration and only
// read by the host; the plugin state is behind a mutex and `F: Send`.
unsafe impl<F: FilterPlugin> Send for FilterSlot<F> {}
unsafe impl<F: FilterPlugin> Sync for FilterSlot<F> {}

impl<F: FilterPlugin> FilterSlot<F> {
    fn build() -> PluginResult<Self> {
        let descriptor = F::descriptor();
        let storage = descriptor.encode()?;
        let mut table = Box::<FilterPluginTable>::default();
        storage.fill(&mut table);
        install_trampolines::<F>(&mut table, &descriptor);
        let plugin = F::create()?;
        info!(
            filter = %descriptor.name,
            tracks = descriptor.trackbars.len(),
            checks = descriptor.checkboxes.len(),
            "filter registered"
        );
        Ok(Self {
            descriptor,
            table,
            _storage: storage,
            state: ReentrantMutex::new(RefCell::new(FilterState {
                plugin,
                pending_save: None,
            })),
        })
    }

    pub fn descriptor(&self) -> &FilterDescriptor {
        &self.descriptor
    }

    /// The table handed to the host.
    pub fn table_ptr(&self) -> *mut FilterPluginTable {
        &*self.table as *const FilterPluginTable as *mut FilterPluginTable
    }

    /// Run `f` with exclusive access to the plugin. Re-entrant calls on the
    /// same thread fail with [`PluginError::Reentrant`].
    fn with<R>(
        &self,
        op: &'static str,
        fp: *mut FilterPluginTable,
        editp: *mut c_void,
        f: impl FnOnce(&mut F, &mut FilterContext<'_>, &mut Option<Vec<u8>>) -> PluginResult<R>,
    ) -> PluginResult<R> {
        let guard = self.state.lock();
        let mut state = guard.try_borrow_mut().map_err(|_| PluginError::Reentrant(op))?;
        // SAFETY: `fp` comes straight from the host for this call.
        let mut ctx = unsafe { FilterContext::new(fp, editp, &self.descriptor)? };
        let FilterState { plugin, pending_save } = &mut *state;
        trace!(op, "filter callback");
        f(plugin, &mut ctx, pending_save)
    }
}

/// Register `F` (once per process) and return its table.
pub fn register_filter<F: FilterPlugin>() -> PluginResult<*mut FilterPluginTable> {
    let slot = registry::get_or_try_insert(FilterSlot::<F>::build)?;
    Ok(slot.table_ptr())
}

/// The slot of a registered filter.
pub fn filter_slot<F: FilterPlugin>() -> PluginResult<&'static FilterSlot<F>> {
    registry::get::<FilterSlot<F>>().ok_or(PluginError::NotRegistered(std::any::type_name::<F>()))
}

fn install_trampolines<F: FilterPlugin>(table: &mut FilterPluginTable, descriptor: &FilterDescriptor) {
    table.func_proc = Some(proc_trampoline::<F>);
    table.func_init = Some(init_trampoline::<F>);
    table.func_exit = Some(exit_trampoline::<F>);
    table.func_update = Some(update_trampoline::<F>);
    table.func_save_start = Some(save_start_trampoline::<F>);
    table.func_save_end = Some(save_end_trampoline::<F>);
    let hooks = descriptor.hooks;
    if hooks.window_message {
        table.func_wndproc = Some(wndproc_trampoline::<F>);
    }
    if hooks.save_frame {
        table.func_is_saveframe = Some(is_saveframe_trampoline::<F>);
    }
    if hooks.project_data {
        table.func_project_load = Some(project_load_trampoline::<F>);
        table.func_project_save = Some(project_save_trampoline::<F>);
    }
    if hooks.modify_title {
        table.func_modify_title = Some(modify_title_trampoline::<F>);
    }
}

unsafe extern "C" fn proc_trampoline<F: FilterPlugin>(fp: *mut FilterPluginTable, fpip: *mut FilterProcInfo) -> Bool {
    guard_bool("func_proc", || {
        let info = unsafe { fpip.as_mut() }.ok_or(PluginError::Unsupported("null FILTER_PROC_INFO".into()))?;
        let editp = info.editp;
        filter_slot::<F>()?.with("func_proc", fp, editp, |plugin, ctx, _| {
            let mut frame = ProcFrame::new(info);
            plugin.process(ctx, &mut frame)
        })
    })
}

unsafe extern "C" fn init_trampoline<F: FilterPlugin>(fp: *mut FilterPluginTable) -> Bool {
    guard_bool("func_init", || {
        filter_slot::<F>()?.with("func_init", fp, std::ptr::null_mut(), |plugin, ctx, _| {
            debug!(filter = %ctx.descriptor().name, "init");
            plugin.init(ctx).map(|()| true)
        })
    })
}

unsafe extern "C" fn exit_trampoline<F: FilterPlugin>(fp: *mut FilterPluginTable) -> Bool {
    guard_bool("func_exit", || {
        filter_slot::<F>()?.with("func_exit", fp, std::ptr::null_mut(), |plugin, ctx, _| {
            debug!(filter = %ctx.descriptor().name, "exit");
            plugin.exit(ctx).map(|()| true)
        })
    })
}

unsafe extern "C" fn update_trampoline<F: FilterPlugin>(fp: *mut FilterPluginTable, status: FilterUpdateStatus) -> Bool {
    guard_bool("func_update", || {
        filter_slot::<F>()?.with("func_update", fp, std::ptr::null_mut(), |plugin, ctx, _| {
            plugin.update(ctx, status).map(|()| true)
        })
    })
}

unsafe extern "C" fn wndproc_trampoline<F: FilterPlugin>(
    hwnd: Hwnd,
    message: u32,
    wparam: Wparam,
    lparam: Lparam,
    editp: *mut c_void,
    fp: *mut FilterPluginTable,
) -> Bool {
    guard_bool("func_WndProc", || {
        // SAFETY: `fp` is null or the table the host copied from ours.
        let checks = unsafe { fp.as_ref() }.map_or(0, |table| table.check_n.max(0) as usize);
        let event = WindowEvent {
            hwnd,
            message,
            wparam,
            lparam,
            checks,
        };
        filter_slot::<F>()?.with("func_WndProc", fp, editp, |plugin, ctx, _| {
            plugin.window_message(ctx, &event)
        })
    })
}

unsafe extern "C" fn save_start_trampoline<F: FilterPlugin>(
    fp: *mut FilterPluginTable,
    start: i32,
    end: i32,
    editp: *mut c_void,
) -> Bool {
    guard_bool("func_save_start", || {
        filter_slot::<F>()?.with("func_save_start", fp, editp, |plugin, ctx, _| {
            plugin.save_start(ctx, start, end).map(|()| true)
        })
    })
}

unsafe extern "C" fn save_end_trampoline<F: FilterPlugin>(fp: *mut FilterPluginTable, editp: *mut c_void) -> Bool {
    guard_bool("func_save_end", || {
        filter_slot::<F>()?.with("func_save_end", fp, editp, |plugin, ctx, _| plugin.save_end(ctx).map(|()| true))
    })
}

unsafe extern "C" fn is_saveframe_trampoline<F: FilterPlugin>(
    fp: *mut FilterPluginTable,
    editp: *mut c_void,
    save_count: i32,
    frame: i32,
    fps: i32,
    edit_flag: i32,
    interlace: i32,
) -> Bool {
    let query = SaveFrameQuery {
        save_count,
        frame,
        fps,
        edit_flag,
        interlace,
    };
    // Errors keep the frame.
    guard_with_default("func_is_saveframe", TRUE, || {
        let keep = filter_slot::<F>()?.with("func_is_saveframe", fp, editp, |plugin, ctx, _| {
            plugin.is_save_frame(ctx, &query)
        })?;
        Ok(if keep { TRUE } else { FALSE })
    })
}

unsafe extern "C" fn project_load_trampoline<F: FilterPlugin>(
    fp: *mut FilterPluginTable,
    editp: *mut c_void,
    data: *mut c_void,
    size: i32,
) -> Bool {
    guard_bool("func_project_load", || {
        let data: &[u8] = if data.is_null() || size <= 0 {
            &[]
        } else {
            unsafe { std::slice::from_raw_parts(data.cast(), size as usize) }
        };
        filter_slot::<F>()?.with("func_project_load", fp, editp, |plugin, ctx, _| {
            debug!(bytes = data.len(), "project load");
            plugin.project_load(ctx, data).map(|()| true)
        })
    })
}

/// Two-phase save: a null `data` asks for the size (the bytes are kept
/// until the second call), then the host passes a buffer of that size.
unsafe extern "C" fn project_save_trampoline<F: FilterPlugin>(
    fp: *mut FilterPluginTable,
    editp: *mut c_void,
    data: *mut c_void,
    size: *mut i32,
) -> Bool {
    guard_bool("func_project_save", || {
        let size = unsafe { size.as_mut() }.ok_or(PluginError::Unsupported("null size pointer".into()))?;
        filter_slot::<F>()?.with("func_project_save", fp, editp, |plugin, ctx, pending| {
            if data.is_null() {
                *pending = plugin.project_save(ctx)?;
                let len = pending.as_ref().map_or(0, Vec::len);
                *size = i32::try_from(len).map_err(|_| PluginError::out_of_bounds("project data", len as i64, 0, i32::MAX))?;
                return Ok(pending.is_some());
            }
            let bytes = match pending.take() {
                Some(bytes) => bytes,
                None => match plugin.project_save(ctx)? {
                    Some(bytes) => bytes,
                    None => return Ok(false),
                },
            };
            let capacity = (*size).max(0) as usize;
            if bytes.len() > capacity {
                return Err(PluginError::out_of_bounds("project data", bytes.len() as i64, 0, capacity as i64));
            }
            unsafe { std::ptr::copy_nonoverlapping(bytes.as_ptr(), data.cast::<u8>(), bytes.len()) };
            *size = bytes.len() as i32;
            debug!(bytes = bytes.len(), "project save");
            Ok(true)
        })
    })
}

unsafe extern "C" fn modify_title_trampoline<F: FilterPlugin>(
    fp: *mut FilterPluginTable,
    editp: *mut c_void,
    frame: i32,
    title: *mut c_char,
    max_title: i32,
) -> Bool {
    guard_bool("func_modify_title", || {
        if title.is_null() || max_title <= 0 {
            return Ok(false);
        }
        let current = unsafe { decode_ansi_ptr(title) };
        filter_slot::<F>()?.with("func_modify_title", fp, editp, |plugin, ctx, _| {
            let Some(new_title) = plugin.modify_title(ctx, frame, &current)? else {
                return Ok(true);
            };
            let buf = unsafe { std::slice::from_raw_parts_mut(title.cast::<u8>(), max_title as usize) };
            write_ansi(buf, &new_title)?;
            Ok(true)
        })
    })
}
