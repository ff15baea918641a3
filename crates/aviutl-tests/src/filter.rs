//! Filter plugins driven through their exported tables.

use std::sync::atomic::{AtomicI32, AtomicUsize, Ordering};
use std::sync::OnceLock;

use aviutl_plugin::export::{filter_table_list, FilterRegistration, TableList};
use aviutl_plugin::filter::WM_COMMAND;
use aviutl_plugin::{
    register_filter, Checkbox, FilterContext, FilterDescriptor, FilterPlugin, PluginError, PluginResult, ProcFrame,
    SaveFrameQuery, Trackbar,
};
use aviutl_sample::YcAdjust;
use aviutl_sys::{CallbackFunctionSet, FilterFlag, FilterUpdateStatus, PixelYc, WindowMessage, FALSE};
use bytemuck::{Pod, Zeroable};

use crate::mock_host::{self, MockFilter, MockFrame, FILE_NAME, FRAME_COUNT, THREADS};

// ── Helpers ────────────────────────────────────────────────────

fn load<F: FilterPlugin>() -> MockFilter {
    let table = register_filter::<F>().unwrap();
    unsafe { MockFilter::load(table, mock_host::callbacks()) }
}

fn reset_button() -> usize {
    WindowMessage::FILTER_BUTTON.raw() as usize + 2
}

// ── Sample plugin ──────────────────────────────────────────────

#[test]
fn sample_exports_its_table() {
    let table = aviutl_sample::GetFilterTable();
    assert!(!table.is_null());
    assert_eq!(table, register_filter::<YcAdjust>().unwrap());

    let list = aviutl_sample::GetFilterTableList();
    let entries = unsafe { std::slice::from_raw_parts(list, 2) };
    assert_eq!(entries[0], table);
    assert!(entries[1].is_null());
    assert_eq!(list, aviutl_sample::GetFilterTableList());
}

#[test]
fn sample_table_describes_controls() {
    let host = unsafe { MockFilter::load(aviutl_sample::GetFilterTable(), mock_host::callbacks()) };
    let table = host.table();

    assert_eq!(host.name(), "YC Adjust");
    assert_eq!(host.tracks(), &[100, 0, 0, 0]);
    assert_eq!(host.track_name(0), "Luma gain %");
    assert_eq!(host.track_range(0), (0, 400));
    assert_eq!(host.track_range(3), (-1024, 1024));
    assert_eq!(host.checks(), &[1, 0, -1]);
    assert_eq!(host.check_name(2), "Reset");
    assert!(table.flag.contains(FilterFlag::EX_INFORMATION));
    assert!(!table.flag.contains(FilterFlag::EX_DATA));
    assert!(table.func_wndproc.is_some());
    assert!(table.func_project_save.is_some() && table.func_project_load.is_some());
    assert!(table.func_modify_title.is_some());
    assert!(table.func_is_saveframe.is_none());
}

/// The sample's state is process-wide, so its whole lifecycle runs in one test.
#[test]
fn sample_lifecycle() {
    let mut host = unsafe { MockFilter::load(aviutl_sample::GetFilterTable(), mock_host::callbacks()) };
    assert!(host.init());

    // Nothing processed yet: no project data, title untouched.
    assert_eq!(host.project_save(), None);
    assert_eq!(host.modify_title(0, FILE_NAME).as_deref(), Some(FILE_NAME));

    let original = PixelYc { y: 2000, cb: 300, cr: -300 };
    let mut frame = MockFrame::new(32, 8, original);
    assert_eq!(host.proc(&mut frame), Some(false));
    assert_eq!(frame.pixel(5, 5), original);

    assert!(host.move_track(0, 50));
    assert!(host.toggle_check(1, true));
    assert_eq!(host.proc(&mut frame), Some(true));
    for y in 0..frame.height {
        for x in 0..frame.width {
            assert_eq!(frame.pixel(x, y), PixelYc { y: 1000, cb: 0, cr: 0 });
        }
    }
    // Row padding and rows below the image stay untouched.
    assert_eq!(frame.pixel(frame.width, 0), original);
    assert_eq!(frame.pixel(0, frame.height), original);

    assert_eq!(host.proc(&mut frame), Some(true));
    assert_eq!(
        host.modify_title(3, FILE_NAME).as_deref(),
        Some("clip.avi [YC Adjust: 2 frames]")
    );
    assert_eq!(host.project_save().as_deref(), Some(&br#"{"frames":2}"#[..]));

    assert_eq!(host.project_load(br#"{"frames":7}"#), Some(true));
    assert_eq!(
        host.modify_title(3, FILE_NAME).as_deref(),
        Some("clip.avi [YC Adjust: 7 frames]")
    );
    assert_eq!(host.project_load(b"not json"), Some(false));

    let updates = mock_host::window_updates();
    // Command ids past the last checkbox are not buttons.
    assert_eq!(host.wndproc(WM_COMMAND, reset_button() + 1), Some(false));
    assert_eq!(mock_host::window_updates(), updates);
    assert_eq!(host.wndproc(WM_COMMAND, reset_button()), Some(true));
    assert_eq!(host.tracks(), &[100, 0, 0, 0]);
    assert_eq!(mock_host::window_updates(), updates + 1);
    assert_eq!(host.wndproc(WindowMessage::UPDATE.raw() as u32, 0), Some(false));

    assert!(host.exit());
}

// ── Host services, extended data and save hooks ────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Pod, Zeroable)]
#[repr(C)]
struct InspectorMemo {
    calls: u32,
    last_frame: i32,
}

static INSPECTOR_WORKERS: AtomicUsize = AtomicUsize::new(0);

struct Inspector;

impl FilterPlugin for Inspector {
    fn descriptor() -> FilterDescriptor {
        FilterDescriptor::new("Inspector")
            .trackbar(Trackbar::with_default_range("Level", 10))
            .ex_data_pod(&InspectorMemo { calls: 0, last_frame: -1 })
            .hook_save_frame()
    }

    fn create() -> PluginResult<Self> {
        Ok(Inspector)
    }

    fn process(&mut self, ctx: &mut FilterContext<'_>, frame: &mut ProcFrame<'_>) -> PluginResult<bool> {
        let host = ctx.host()?;
        if host.frame_count()? != FRAME_COUNT || !host.is_editing()? {
            return Ok(false);
        }
        let file = host.file_info()?;
        if file.name != FILE_NAME || file.width != 64 {
            return Ok(false);
        }
        host.exec_multi_thread(|_, num| {
            assert_eq!(num, THREADS as usize);
            INSPECTOR_WORKERS.fetch_add(1, Ordering::SeqCst);
        })?;

        let mut memo = ctx.read_ex_data::<InspectorMemo>()?;
        memo.calls += 1;
        memo.last_frame = frame.frame();
        ctx.write_ex_data(&memo)?;

        let level = ctx.params().track(0).unwrap_or_default() as i16;
        frame.edit_mut()?.fill(PixelYc { y: level, cb: 0, cr: 0 });
        Ok(true)
    }

    fn is_save_frame(&mut self, _ctx: &mut FilterContext<'_>, query: &SaveFrameQuery) -> PluginResult<bool> {
        if query.frame < 0 {
            return Err(PluginError::plugin("negative frame"));
        }
        Ok(query.frame % 2 == 0)
    }
}

#[test]
fn inspector_reaches_host_services() {
    let mut host = load::<Inspector>();
    let initial: InspectorMemo = bytemuck::pod_read_unaligned(host.ex_data());
    assert_eq!(initial, InspectorMemo { calls: 0, last_frame: -1 });
    assert_eq!(host.track_range(0), (0, 256));

    let mut frame = MockFrame::new(8, 4, PixelYc::default());
    frame.frame = 17;
    assert_eq!(host.proc(&mut frame), Some(true));
    assert_eq!(frame.pixel(7, 3).y, 10);
    assert_eq!(INSPECTOR_WORKERS.load(Ordering::SeqCst), THREADS as usize);

    let memo: InspectorMemo = bytemuck::pod_read_unaligned(host.ex_data());
    assert_eq!(memo, InspectorMemo { calls: 1, last_frame: 17 });

    assert_eq!(host.is_saveframe(4), Some(true));
    assert_eq!(host.is_saveframe(5), Some(false));
    // Errors keep the frame.
    assert_eq!(host.is_saveframe(-1), Some(true));
}

#[test]
fn inspector_without_callbacks_fails_cleanly() {
    let table = register_filter::<Inspector>().unwrap();
    let mut host = unsafe { MockFilter::load(table, CallbackFunctionSet::default()) };
    let mut frame = MockFrame::new(8, 4, PixelYc::WHITE);
    assert_eq!(host.proc(&mut frame), Some(false));
    assert_eq!(frame.pixel(0, 0), PixelYc::WHITE);
}

// ── Failure containment ────────────────────────────────────────

struct Panicky;

impl FilterPlugin for Panicky {
    fn descriptor() -> FilterDescriptor {
        FilterDescriptor::new("Panicky")
    }

    fn create() -> PluginResult<Self> {
        Ok(Panicky)
    }

    fn process(&mut self, _ctx: &mut FilterContext<'_>, frame: &mut ProcFrame<'_>) -> PluginResult<bool> {
        if frame.frame() == 0 {
            panic!("frame zero");
        }
        Ok(true)
    }

    fn update(&mut self, _ctx: &mut FilterContext<'_>, status: FilterUpdateStatus) -> PluginResult<()> {
        if status == FilterUpdateStatus::ALL {
            return Err(PluginError::plugin("refusing full update"));
        }
        Ok(())
    }
}

#[test]
fn panics_and_errors_become_false() {
    let mut host = load::<Panicky>();
    let mut frame = MockFrame::new(4, 4, PixelYc::BLACK);
    assert_eq!(host.proc(&mut frame), Some(false));
    assert!(!host.update(FilterUpdateStatus::ALL));

    // The plugin is still usable afterwards.
    frame.frame = 1;
    assert_eq!(host.proc(&mut frame), Some(true));
    assert!(host.update(FilterUpdateStatus::TRACK));
}

static REENTRANT_RESULT: AtomicI32 = AtomicI32::new(-1);

struct Reentrant;

impl FilterPlugin for Reentrant {
    fn descriptor() -> FilterDescriptor {
        FilterDescriptor::new("Reentrant")
    }

    fn create() -> PluginResult<Self> {
        Ok(Reentrant)
    }

    fn process(&mut self, _ctx: &mut FilterContext<'_>, _frame: &mut ProcFrame<'_>) -> PluginResult<bool> {
        Ok(false)
    }

    fn update(&mut self, ctx: &mut FilterContext<'_>, _status: FilterUpdateStatus) -> PluginResult<()> {
        let fp = ctx.filter_ptr();
        let init = unsafe { (*fp).func_init }.ok_or(PluginError::MissingCallback("func_init"))?;
        REENTRANT_RESULT.store(unsafe { init(fp) }, Ordering::SeqCst);
        Ok(())
    }
}

#[test]
fn reentrant_callback_is_refused() {
    let mut host = load::<Reentrant>();
    assert!(host.update(FilterUpdateStatus::ALL));
    assert_eq!(REENTRANT_RESULT.load(Ordering::SeqCst), FALSE);
    assert!(host.init());
}

// ── Registration ───────────────────────────────────────────────

struct Invalid;

impl FilterPlugin for Invalid {
    fn descriptor() -> FilterDescriptor {
        FilterDescriptor::new("Invalid").trackbar(Trackbar::new("Out of range", 500, 0, 100))
    }

    fn create() -> PluginResult<Self> {
        Ok(Invalid)
    }

    fn process(&mut self, _ctx: &mut FilterContext<'_>, _frame: &mut ProcFrame<'_>) -> PluginResult<bool> {
        Ok(false)
    }
}

struct Buttons;

impl FilterPlugin for Buttons {
    fn descriptor() -> FilterDescriptor {
        FilterDescriptor::new("Buttons")
            .checkbox(Checkbox::button("Apply"))
            .checkbox(Checkbox::new("Enabled", false))
            .window_size(320, 200)
    }

    fn create() -> PluginResult<Self> {
        Ok(Buttons)
    }

    fn process(&mut self, ctx: &mut FilterContext<'_>, _frame: &mut ProcFrame<'_>) -> PluginResult<bool> {
        ctx.set_check(1, true)?;
        Ok(ctx.params().check(1) == Some(true))
    }
}

#[test]
fn invalid_descriptor_is_not_registered() {
    assert!(matches!(
        register_filter::<Invalid>(),
        Err(PluginError::InvalidDescriptor(_))
    ));
    assert!(aviutl_plugin::filter::filter_slot::<Invalid>().is_err());
}

#[test]
fn table_list_covers_every_filter() {
    static LIST: OnceLock<TableList> = OnceLock::new();
    let registrations = [
        register_filter::<Buttons> as FilterRegistration,
        register_filter::<Panicky> as FilterRegistration,
    ];
    let list = filter_table_list(&LIST, &registrations);
    let entries = unsafe { std::slice::from_raw_parts(list, 3) };
    assert_eq!(entries[0], register_filter::<Buttons>().unwrap());
    assert_eq!(entries[1], register_filter::<Panicky>().unwrap());
    assert!(entries[2].is_null());

    let mut host = unsafe { MockFilter::load(entries[0], mock_host::callbacks()) };
    assert!(host.table().flag.contains(FilterFlag::WINDOW_SIZE));
    assert_eq!((host.table().x, host.table().y), (320, 200));
    let mut frame = MockFrame::new(2, 2, PixelYc::BLACK);
    assert_eq!(host.proc(&mut frame), Some(true));
    assert_eq!(host.checks(), &[-1, 1]);
}
