//! Input plugins driven through their exported tables.

use std::ffi::{c_void, CStr, CString};
use std::path::Path;

use aviutl_plugin::encoding::decode_ansi_ptr;
use aviutl_plugin::{register_input, AudioInfo, InputDescriptor, InputPlugin, MediaInfo, PluginError, PluginResult, VideoInfo};
use aviutl_sys::win::dib_image_size;
use aviutl_sys::{
    BitmapInfoHeader, InputInfo, InputInfoFlag, InputPluginFlag, InputPluginTable, WaveFormatEx, FALSE, TRUE,
};

// ── Synthetic source ───────────────────────────────────────────

const WIDTH: i32 = 4;
const HEIGHT: i32 = 2;
const FRAMES: i32 = 10;
const SAMPLES: i32 = 800;

/// Frame `n` is filled with byte `n`; audio sample `i` has value `i`.
struct Ramp;

struct RampFile;

impl InputPlugin for Ramp {
    type Handle = RampFile;

    fn descriptor() -> InputDescriptor {
        InputDescriptor::new("Ramp Reader", "Ramp Reader 0.1").file_filter("Ramp (*.ramp)", "*.ramp")
    }

    fn create() -> PluginResult<Self> {
        Ok(Ramp)
    }

    fn open(&mut self, path: &Path) -> PluginResult<Option<RampFile>> {
        if path.extension().and_then(|e| e.to_str()) != Some("ramp") {
            return Ok(None);
        }
        if path.file_stem().and_then(|s| s.to_str()) == Some("broken") {
            return Err(PluginError::plugin("corrupt header"));
        }
        Ok(Some(RampFile))
    }

    fn info(&mut self, _handle: &mut RampFile) -> PluginResult<MediaInfo> {
        Ok(MediaInfo {
            video: Some(VideoInfo {
                rate: 30,
                scale: 1,
                frames: FRAMES,
                format: BitmapInfoHeader::rgb(WIDTH, HEIGHT, 24),
                handler: 0,
                random_access: true,
            }),
            audio: Some(AudioInfo {
                samples: SAMPLES,
                format: WaveFormatEx::pcm(8000, 1, 16),
            }),
        })
    }

    fn read_video(&mut self, _handle: &mut RampFile, frame: i32, buf: &mut [u8]) -> PluginResult<usize> {
        if !(0..FRAMES).contains(&frame) {
            return Err(PluginError::plugin("frame out of range"));
        }
        buf.fill(frame as u8);
        Ok(buf.len())
    }

    fn read_audio(&mut self, _handle: &mut RampFile, start: i32, length: i32, buf: &mut [u8]) -> PluginResult<usize> {
        let end = (start + length).min(SAMPLES);
        let count = (end - start).max(0) as usize;
        for (i, chunk) in buf.chunks_exact_mut(2).take(count).enumerate() {
            chunk.copy_from_slice(&((start as i16) + i as i16).to_le_bytes());
        }
        Ok(count)
    }

    fn is_keyframe(&mut self, _handle: &mut RampFile, frame: i32) -> PluginResult<bool> {
        if frame < 0 {
            return Err(PluginError::plugin("negative frame"));
        }
        Ok(frame % 5 == 0)
    }
}

fn table() -> &'static InputPluginTable {
    unsafe { &*register_input::<Ramp>().unwrap() }
}

fn open(table: &InputPluginTable, path: &str) -> *mut c_void {
    let path = CString::new(path).unwrap();
    unsafe { (table.func_open.unwrap())(path.as_ptr() as *mut _) }
}

// ── Table ──────────────────────────────────────────────────────

#[test]
fn table_describes_plugin() {
    let table = table();
    assert_eq!(table as *const InputPluginTable, register_input::<Ramp>().unwrap() as *const _);
    assert_eq!(table.flag, InputPluginFlag::VIDEO | InputPluginFlag::AUDIO);
    assert_eq!(unsafe { decode_ansi_ptr(table.name) }, "Ramp Reader");
    assert_eq!(unsafe { decode_ansi_ptr(table.information) }, "Ramp Reader 0.1");
    // No settings dialog unless asked for.
    assert!(table.func_config.is_none());

    let filters = unsafe { std::slice::from_raw_parts(table.filefilter as *const u8, 22) };
    assert_eq!(filters, b"Ramp (*.ramp)\0*.ramp\0\0");
    assert_eq!(unsafe { (table.func_init.unwrap())() }, TRUE);
}

// ── Reading ────────────────────────────────────────────────────

#[test]
fn foreign_files_are_declined() {
    let table = table();
    assert!(open(table, "C:\\video\\clip.avi").is_null());
    assert!(open(table, "C:\\video\\broken.ramp").is_null());
}

#[test]
fn info_points_at_session_formats() {
    let table = table();
    let ih = open(table, "C:\\video\\take.ramp");
    assert!(!ih.is_null());

    let mut info = InputInfo::default();
    assert_eq!(unsafe { (table.func_info_get.unwrap())(ih, &mut info) }, TRUE);
    assert_eq!(
        info.flag,
        InputInfoFlag::VIDEO | InputInfoFlag::AUDIO | InputInfoFlag::VIDEO_RANDOM_ACCESS
    );
    assert_eq!((info.rate, info.scale, info.n), (30, 1, FRAMES));
    assert_eq!(info.audio_n, SAMPLES);
    assert_eq!(info.format_size, BitmapInfoHeader::ABI_SIZE as i32);
    assert_eq!(info.audio_format_size, WaveFormatEx::ABI_SIZE as i32);

    let format = unsafe { *info.format };
    assert_eq!((format.width, format.height, format.bit_count), (WIDTH, HEIGHT, 24));
    let audio = unsafe { *info.audio_format };
    let (channels, rate) = (audio.channels, audio.samples_per_sec);
    assert_eq!((channels, rate), (1, 8000));

    // A second query hands out the same storage.
    let mut again = InputInfo::default();
    assert_eq!(unsafe { (table.func_info_get.unwrap())(ih, &mut again) }, TRUE);
    assert_eq!(again.format, info.format);

    assert_eq!(unsafe { (table.func_close.unwrap())(ih) }, TRUE);
}

#[test]
fn reads_frames_and_samples() {
    let table = table();
    let ih = open(table, "take.ramp");
    let frame_bytes = dib_image_size(WIDTH, HEIGHT, 24);
    assert_eq!(frame_bytes, 24);

    // Reads work before `func_info_get` was ever called.
    let mut buf = vec![0xEEu8; frame_bytes];
    let read = unsafe { (table.func_read_video.unwrap())(ih, 7, buf.as_mut_ptr().cast()) };
    assert_eq!(read, frame_bytes as i32);
    assert!(buf.iter().all(|&b| b == 7));

    assert_eq!(unsafe { (table.func_read_video.unwrap())(ih, FRAMES, buf.as_mut_ptr().cast()) }, 0);
    assert_eq!(unsafe { (table.func_read_video.unwrap())(ih, 0, std::ptr::null_mut()) }, 0);

    let mut samples = [0i16; 4];
    let got = unsafe { (table.func_read_audio.unwrap())(ih, 10, 4, samples.as_mut_ptr().cast()) };
    assert_eq!(got, 4);
    assert_eq!(samples, [10, 11, 12, 13]);

    // Reading past the end is cut short.
    let mut tail = [0i16; 4];
    let got = unsafe { (table.func_read_audio.unwrap())(ih, SAMPLES - 2, 4, tail.as_mut_ptr().cast()) };
    assert_eq!(got, 2);
    assert_eq!(&tail[..2], &[(SAMPLES - 2) as i16, (SAMPLES - 1) as i16]);

    assert_eq!(unsafe { (table.func_close.unwrap())(ih) }, TRUE);
}

#[test]
fn keyframes_and_failures() {
    let table = table();
    let ih = open(table, "take.ramp");
    let is_keyframe = table.func_is_keyframe.unwrap();
    assert_eq!(unsafe { is_keyframe(ih, 5) }, TRUE);
    assert_eq!(unsafe { is_keyframe(ih, 6) }, FALSE);
    // Errors report a keyframe.
    assert_eq!(unsafe { is_keyframe(ih, -1) }, TRUE);
    assert_eq!(unsafe { is_keyframe(std::ptr::null_mut(), 3) }, TRUE);

    let mut info = InputInfo::default();
    assert_eq!(unsafe { (table.func_info_get.unwrap())(std::ptr::null_mut(), &mut info) }, FALSE);
    assert_eq!(unsafe { (table.func_info_get.unwrap())(ih, std::ptr::null_mut()) }, FALSE);
    assert_eq!(unsafe { (table.func_close.unwrap())(ih) }, TRUE);
    assert_eq!(unsafe { (table.func_close.unwrap())(std::ptr::null_mut()) }, FALSE);
}

#[test]
fn threads_share_one_handle() {
    let table = table();
    let ih = open(table, "shared.ramp") as usize;
    let frame_bytes = dib_image_size(WIDTH, HEIGHT, 24);
    let (read_video, info_get) = (table.func_read_video.unwrap(), table.func_info_get.unwrap());

    std::thread::scope(|s| {
        for t in 0..4 {
            s.spawn(move || {
                let ih = ih as *mut c_void;
                let mut buf = vec![0u8; frame_bytes];
                for i in 0..50 {
                    let frame = (t + i) % FRAMES;
                    let read = unsafe { read_video(ih, frame, buf.as_mut_ptr().cast()) };
                    assert_eq!(read, frame_bytes as i32);
                    assert!(buf.iter().all(|&b| b == frame as u8));
                    let mut info = InputInfo::default();
                    assert_eq!(unsafe { info_get(ih, &mut info) }, TRUE);
                    assert_eq!(info.n, FRAMES);
                }
            });
        }
    });
    assert_eq!(unsafe { (table.func_close.unwrap())(ih as *mut c_void) }, TRUE);
}

#[test]
fn non_ascii_paths_decode() {
    let table = table();
    let mut bytes = aviutl_plugin::encoding::encode_ansi_bytes("動画.ramp").unwrap();
    bytes.push(0);
    let path = CStr::from_bytes_with_nul(&bytes).unwrap();
    let ih = unsafe { (table.func_open.unwrap())(path.as_ptr() as *mut _) };
    assert!(!ih.is_null());
    assert_eq!(unsafe { (table.func_close.unwrap())(ih) }, TRUE);
}

// ── Video only ─────────────────────────────────────────────────

struct Stills;

impl InputPlugin for Stills {
    type Handle = ();

    fn descriptor() -> InputDescriptor {
        InputDescriptor::new("Stills", "Stills")
            .file_filter("Bitmap", "*.bmp")
            .flags(InputPluginFlag::VIDEO)
            .with_config()
    }

    fn create() -> PluginResult<Self> {
        Ok(Stills)
    }

    fn open(&mut self, _path: &Path) -> PluginResult<Option<()>> {
        Ok(Some(()))
    }

    fn info(&mut self, _handle: &mut ()) -> PluginResult<MediaInfo> {
        Ok(MediaInfo {
            video: Some(VideoInfo {
                rate: 1,
                scale: 1,
                frames: 1,
                format: BitmapInfoHeader::rgb(2, 2, 32),
                handler: 0,
                random_access: false,
            }),
            audio: None,
        })
    }

    fn read_video(&mut self, _handle: &mut (), _frame: i32, buf: &mut [u8]) -> PluginResult<usize> {
        buf.fill(0xFF);
        Ok(buf.len())
    }

    fn read_audio(&mut self, _handle: &mut (), _start: i32, _length: i32, _buf: &mut [u8]) -> PluginResult<usize> {
        unreachable!("no audio stream")
    }
}

#[test]
fn video_only_source() {
    let table = unsafe { &*register_input::<Stills>().unwrap() };
    assert_eq!(table.flag, InputPluginFlag::VIDEO);
    assert!(table.func_config.is_some());

    let ih = open(table, "a.bmp");
    let mut info = InputInfo::default();
    assert_eq!(unsafe { (table.func_info_get.unwrap())(ih, &mut info) }, TRUE);
    assert_eq!(info.flag, InputInfoFlag::VIDEO);
    assert!(info.audio_format.is_null());

    let mut samples = [0u8; 8];
    assert_eq!(unsafe { (table.func_read_audio.unwrap())(ih, 0, 4, samples.as_mut_ptr().cast()) }, 0);
    let mut pixels = [0u8; 16];
    assert_eq!(unsafe { (table.func_read_video.unwrap())(ih, 0, pixels.as_mut_ptr().cast()) }, 16);
    assert_eq!(unsafe { (table.func_close.unwrap())(ih) }, TRUE);
}
