//! Output plugins driven through their exported tables.

use std::cell::{Cell, RefCell, UnsafeCell};
use std::ffi::{c_void, CString};
use std::path::PathBuf;

use aviutl_plugin::output::{decode_config, encode_config};
use aviutl_plugin::{register_output, OutputDescriptor, OutputJob, OutputPlugin, PluginResult};
use aviutl_sys::{Bool, OutputFrameFlag, OutputInfo, OutputInfoFlag, OutputPluginTable, FALSE, TRUE};
use serde::{Deserialize, Serialize};

// ── Mock host side of OUTPUT_INFO ──────────────────────────────

const WIDTH: i32 = 3;
const HEIGHT: i32 = 2;
const FRAME_BYTES: usize = 24;
const CHANNELS: i32 = 2;
const CHUNK: i32 = 8;

thread_local! {
    static FRAME: UnsafeCell<[u8; FRAME_BYTES]> = const { UnsafeCell::new([0; FRAME_BYTES]) };
    static SAMPLES: UnsafeCell<[i16; (CHUNK * CHANNELS) as usize]> =
        const { UnsafeCell::new([0; (CHUNK * CHANNELS) as usize]) };
    static AUDIO_TOTAL: Cell<i32> = const { Cell::new(0) };
    static ABORT_AFTER: Cell<u32> = const { Cell::new(u32::MAX) };
    static ABORT_POLLS: Cell<u32> = const { Cell::new(0) };
    static PROGRESS: RefCell<Vec<(i32, i32)>> = const { RefCell::new(Vec::new()) };
    static REPORT: RefCell<Option<Report>> = const { RefCell::new(None) };
}

/// Frame `n` is every byte set to `n`.
unsafe extern "C" fn get_video(frame: i32) -> *mut c_void {
    FRAME.with(|buf| {
        let ptr = buf.get();
        (*ptr).fill(frame as u8);
        ptr.cast()
    })
}

/// Sample `i` is `i` on every channel.
unsafe extern "C" fn get_audio(start: i32, length: i32, readed: *mut i32) -> *mut c_void {
    let total = AUDIO_TOTAL.with(Cell::get);
    let count = length.min(CHUNK).min(total - start).max(0);
    *readed = count;
    SAMPLES.with(|buf| {
        let ptr = buf.get();
        for (i, frame) in (*ptr).chunks_exact_mut(CHANNELS as usize).take(count as usize).enumerate() {
            frame.fill((start + i as i32) as i16);
        }
        ptr.cast()
    })
}

unsafe extern "C" fn is_abort() -> Bool {
    let polls = ABORT_POLLS.with(|p| {
        p.set(p.get() + 1);
        p.get()
    });
    if polls > ABORT_AFTER.with(Cell::get) {
        TRUE
    } else {
        FALSE
    }
}

unsafe extern "C" fn rest_time_disp(now: i32, total: i32) -> Bool {
    PROGRESS.with(|p| p.borrow_mut().push((now, total)));
    TRUE
}

unsafe extern "C" fn get_flag(frame: i32) -> OutputFrameFlag {
    if frame == 0 {
        OutputFrameFlag::KEYFRAME
    } else {
        OutputFrameFlag::empty()
    }
}

struct Job {
    info: OutputInfo,
    _savefile: CString,
}

impl Job {
    fn new(frames: i32, samples: i32) -> Self {
        AUDIO_TOTAL.with(|t| t.set(samples));
        ABORT_POLLS.with(|p| p.set(0));
        PROGRESS.with(|p| p.borrow_mut().clear());
        REPORT.with(|r| r.borrow_mut().take());

        let savefile = CString::new("C:\\out\\movie.dig").unwrap();
        let info = OutputInfo {
            flag: OutputInfoFlag::VIDEO | OutputInfoFlag::AUDIO,
            w: WIDTH,
            h: HEIGHT,
            rate: 30,
            scale: 1,
            n: frames,
            size: FRAME_BYTES as i32,
            audio_rate: 8000,
            audio_ch: CHANNELS,
            audio_n: samples,
            audio_size: 2 * CHANNELS,
            savefile: savefile.as_ptr() as *mut _,
            func_get_video: Some(get_video),
            func_get_audio: Some(get_audio),
            func_is_abort: Some(is_abort),
            func_rest_time_disp: Some(rest_time_disp),
            func_get_flag: Some(get_flag),
            ..OutputInfo::default()
        };
        Self { info, _savefile: savefile }
    }
}

// ── Digest plugin ──────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct Report {
    path: PathBuf,
    frames: i32,
    video_sum: u64,
    samples: i32,
    audio_sum: i64,
    first_is_key: bool,
    aborted: bool,
}

/// Sums every byte of video and every audio value.
struct Digest;

impl OutputPlugin for Digest {
    fn descriptor() -> OutputDescriptor {
        OutputDescriptor::new("Digest", "Digest writer 0.1").file_filter("Digest (*.dig)", "*.dig")
    }

    fn create() -> PluginResult<Self> {
        Ok(Digest)
    }

    fn output(&mut self, job: &mut OutputJob<'_>) -> PluginResult<bool> {
        let mut report = Report {
            path: job.save_path(),
            first_is_key: job.frame_flags(0)?.contains(OutputFrameFlag::KEYFRAME),
            ..Report::default()
        };
        let total = job.frame_count();
        for frame in 0..total {
            if job.is_aborted() {
                report.aborted = true;
                break;
            }
            report.video_sum += job.video(frame)?.iter().map(|&b| u64::from(b)).sum::<u64>();
            report.frames += 1;
            job.show_progress(frame + 1, total)?;
        }
        if !report.aborted {
            let channels = job.audio_channels() as usize;
            while report.samples < job.audio_samples() {
                let chunk = job.audio(report.samples, CHUNK)?;
                if chunk.is_empty() {
                    break;
                }
                report.audio_sum += chunk.iter().map(|&v| i64::from(v)).sum::<i64>();
                report.samples += (chunk.len() / channels) as i32;
            }
        }
        let ok = !report.aborted;
        REPORT.with(|r| *r.borrow_mut() = Some(report));
        Ok(ok)
    }
}

fn digest_table() -> &'static OutputPluginTable {
    unsafe { &*register_output::<Digest>().unwrap() }
}

fn report() -> Report {
    REPORT.with(|r| r.borrow().clone()).unwrap()
}

#[test]
fn digest_table_layout() {
    let table = digest_table();
    assert!(table.func_output.is_some());
    assert!(table.func_config.is_none());
    assert!(table.func_config_get.is_none() && table.func_config_set.is_none());
    assert_eq!(unsafe { (table.func_init.unwrap())() }, TRUE);
}

#[test]
fn digest_reads_whole_job() {
    let table = digest_table();
    let mut job = Job::new(4, 20);
    assert_eq!(unsafe { (table.func_output.unwrap())(&mut job.info) }, TRUE);

    let report = report();
    assert_eq!(report.path, PathBuf::from("C:\\out\\movie.dig"));
    assert!(report.first_is_key);
    assert_eq!(report.frames, 4);
    assert_eq!(report.video_sum, 6 * FRAME_BYTES as u64);
    assert_eq!(report.samples, 20);
    // Sum of 0..20 on both channels.
    assert_eq!(report.audio_sum, 190 * 2);
    assert_eq!(PROGRESS.with(|p| p.borrow().clone()), vec![(1, 4), (2, 4), (3, 4), (4, 4)]);
}

#[test]
fn digest_stops_on_abort() {
    let table = digest_table();
    let mut job = Job::new(10, 100);
    ABORT_AFTER.with(|a| a.set(3));
    let ok = unsafe { (table.func_output.unwrap())(&mut job.info) };
    ABORT_AFTER.with(|a| a.set(u32::MAX));

    assert_eq!(ok, FALSE);
    let report = report();
    assert!(report.aborted);
    assert_eq!(report.frames, 3);
    assert_eq!(report.samples, 0);
}

#[test]
fn missing_host_callbacks_fail_the_job() {
    let table = digest_table();
    let mut job = Job::new(2, 0);
    job.info.func_rest_time_disp = None;
    assert_eq!(unsafe { (table.func_output.unwrap())(&mut job.info) }, FALSE);
    assert_eq!(unsafe { (table.func_output.unwrap())(std::ptr::null_mut()) }, FALSE);
}

// ── Settings through config_get / config_set ───────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
struct Settings {
    quality: u8,
    two_pass: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self { quality: 50, two_pass: false }
    }
}

struct Tunable {
    settings: Settings,
}

impl OutputPlugin for Tunable {
    fn descriptor() -> OutputDescriptor {
        OutputDescriptor::new("Tunable", "Tunable writer").with_config_data()
    }

    fn create() -> PluginResult<Self> {
        Ok(Tunable {
            settings: Settings::default(),
        })
    }

    fn output(&mut self, _job: &mut OutputJob<'_>) -> PluginResult<bool> {
        Ok(true)
    }

    fn config_data(&mut self) -> PluginResult<Vec<u8>> {
        encode_config(&self.settings)
    }

    fn set_config_data(&mut self, data: &[u8]) -> PluginResult<usize> {
        self.settings = decode_config(data)?;
        Ok(data.len())
    }
}

fn read_config(table: &OutputPluginTable) -> Vec<u8> {
    let get = table.func_config_get.unwrap();
    let size = unsafe { get(std::ptr::null_mut(), 0) };
    let mut buf = vec![0u8; size as usize];
    let written = unsafe { get(buf.as_mut_ptr().cast(), size) };
    assert_eq!(written, size);
    buf
}

/// The plugin's settings are process-wide, so every step runs in one test.
#[test]
fn config_data_round_trips() {
    let table = unsafe { &*register_output::<Tunable>().unwrap() };
    assert!(table.func_config.is_none());
    let set = table.func_config_set.unwrap();

    let initial = read_config(table);
    assert_eq!(initial, encode_config(&Settings::default()).unwrap());

    // Host buffers are fixed size and NUL padded.
    let mut stored = [0u8; 64];
    let wanted = Settings { quality: 90, two_pass: true };
    let bytes = encode_config(&wanted).unwrap();
    stored[..bytes.len()].copy_from_slice(&bytes);
    assert_eq!(unsafe { set(stored.as_mut_ptr().cast(), stored.len() as i32) }, 64);
    assert_eq!(decode_config::<Settings>(&read_config(table)).unwrap(), wanted);

    // Short buffers get a prefix.
    let mut small = [0u8; 4];
    assert_eq!(unsafe { (table.func_config_get.unwrap())(small.as_mut_ptr().cast(), 4) }, 4);
    assert_eq!(&small, b"{\"qu");

    let mut garbage = *b"not json";
    assert_eq!(unsafe { set(garbage.as_mut_ptr().cast(), garbage.len() as i32) }, 0);
    assert_eq!(unsafe { set(std::ptr::null_mut(), 10) }, 0);
    assert_eq!(decode_config::<Settings>(&read_config(table)).unwrap(), wanted);
}
