//! Color plugins driven through their exported tables.

use std::mem::size_of;
use std::sync::atomic::{AtomicUsize, Ordering};

use aviutl_plugin::encoding::decode_ansi_ptr;
use aviutl_plugin::{register_color, ColorDescriptor, ColorJob, ColorPlugin, Dispatcher, PluginResult, Sequential};
use aviutl_sys::win::fourcc;
use aviutl_sys::{ColorInfo, ColorInfoFlag, ColorPluginTable, PixelYc, FALSE, TRUE};

use crate::mock_host;

// ── 8-bit YUY2 <-> YC ──────────────────────────────────────────

/// Bytes in one YUY2 row, padded to four.
fn yuy2_row_bytes(width: usize) -> usize {
    (width * 16 + 31) / 32 * 4
}

/// Maps 8-bit YUY2 onto the YC range by plain scaling.
struct Yuy2Scale;

impl Yuy2Scale {
    fn decode(pair: &[u8], odd: bool) -> PixelYc {
        let luma = if odd { pair[2] } else { pair[0] };
        PixelYc {
            y: i16::from(luma) * 16,
            cb: (i16::from(pair[1]) - 128) * 16,
            cr: (i16::from(pair[3]) - 128) * 16,
        }
    }

    fn encode(left: PixelYc, right: PixelYc) -> [u8; 4] {
        let byte = |v: i16| v.clamp(0, 255) as u8;
        [
            byte(left.y / 16),
            byte(left.cb / 16 + 128),
            byte(right.y / 16),
            byte(left.cr / 16 + 128),
        ]
    }
}

impl ColorPlugin for Yuy2Scale {
    fn descriptor() -> ColorDescriptor {
        ColorDescriptor::new("YUY2 scale", "YUY2 scale 0.1")
    }

    fn create() -> PluginResult<Self> {
        Ok(Yuy2Scale)
    }

    fn pixel_to_yc(&mut self, job: &mut ColorJob<'_>) -> PluginResult<bool> {
        if job.format() != fourcc(b"YUY2") {
            return Ok(false);
        }
        let (height, row_bytes, top_down) = (job.height(), yuy2_row_bytes(job.width()), job.is_height_inverted());
        let threads = job.threads();
        let (mut plane, bytes) = job.split_mut()?;
        let bytes: &[u8] = bytes;
        let convert = |y: usize, row: &mut [PixelYc]| {
            let src_row = if top_down { y } else { height - 1 - y };
            let src = &bytes[src_row * row_bytes..(src_row + 1) * row_bytes];
            for (x, px) in row.iter_mut().enumerate() {
                *px = Self::decode(&src[x / 2 * 4..x / 2 * 4 + 4], x % 2 == 1);
            }
        };
        if threads.is_available() {
            plane.par_rows(&threads, convert)?;
        } else {
            plane.par_rows(&Sequential::default(), convert)?;
        }
        Ok(true)
    }

    fn yc_to_pixel(&mut self, job: &mut ColorJob<'_>) -> PluginResult<bool> {
        if job.format() != fourcc(b"YUY2") {
            return Ok(false);
        }
        let (height, row_bytes, top_down) = (job.height(), yuy2_row_bytes(job.width()), job.is_height_inverted());
        let (plane, bytes) = job.split_mut()?;
        for (y, row) in plane.as_plane().rows().enumerate() {
            let dst_row = if top_down { y } else { height - 1 - y };
            let dst = &mut bytes[dst_row * row_bytes..(dst_row + 1) * row_bytes];
            for (pair, out) in row.chunks(2).zip(dst.chunks_exact_mut(4)) {
                let right = pair.get(1).copied().unwrap_or(pair[0]);
                out.copy_from_slice(&Self::encode(pair[0], right));
            }
        }
        Ok(true)
    }
}

// ── Mock conversion job ────────────────────────────────────────

const WIDTH: usize = 4;
const HEIGHT: usize = 2;
/// Pixels per YC row, one more than the image.
const YC_STRIDE: usize = WIDTH + 1;

#[rustfmt::skip]
const TOP_DOWN: [u8; 16] = [
    100, 140, 110, 120,   200, 128, 210, 128,
     16, 128,  17, 128,    0, 255, 255,   0,
];

struct Conversion {
    yc: Vec<PixelYc>,
    pixels: Vec<u8>,
    info: ColorInfo,
}

impl Conversion {
    fn new(pixels: &[u8], flag: ColorInfoFlag, format: u32) -> Self {
        let mut job = Self {
            yc: vec![PixelYc::WHITE; YC_STRIDE * HEIGHT],
            pixels: pixels.to_vec(),
            info: ColorInfo::default(),
        };
        job.info = ColorInfo {
            flag,
            ycp: job.yc.as_mut_ptr(),
            pixelp: job.pixels.as_mut_ptr().cast(),
            format,
            w: WIDTH as i32,
            h: HEIGHT as i32,
            line_size: (YC_STRIDE * size_of::<PixelYc>()) as i32,
            yc_size: size_of::<PixelYc>() as i32,
            exec_multi_thread_func: Some(mock_host::exec_multi_thread),
            ..ColorInfo::default()
        };
        job
    }

    fn yc(&self, x: usize, y: usize) -> PixelYc {
        self.yc[y * YC_STRIDE + x]
    }
}

fn table() -> &'static ColorPluginTable {
    unsafe { &*register_color::<Yuy2Scale>().unwrap() }
}

// ── Tests ──────────────────────────────────────────────────────

#[test]
fn table_names_plugin() {
    let table = table();
    assert_eq!(unsafe { decode_ansi_ptr(table.name) }, "YUY2 scale");
    assert_eq!(unsafe { decode_ansi_ptr(table.information) }, "YUY2 scale 0.1");
    assert_eq!(unsafe { (table.func_init.unwrap())() }, TRUE);
}

#[test]
fn yuy2_to_yc_on_host_threads() {
    let table = table();
    let mut job = Conversion::new(&TOP_DOWN, ColorInfoFlag::INVERT_HEIGHT, fourcc(b"YUY2"));
    assert_eq!(unsafe { (table.func_pixel2yc.unwrap())(&mut job.info) }, TRUE);

    assert_eq!(job.yc(0, 0), PixelYc { y: 1600, cb: 192, cr: -128 });
    assert_eq!(job.yc(1, 0), PixelYc { y: 1760, cb: 192, cr: -128 });
    assert_eq!(job.yc(3, 0), PixelYc { y: 3360, cb: 0, cr: 0 });
    assert_eq!(job.yc(1, 1), PixelYc { y: 272, cb: 0, cr: 0 });
    // Row padding is untouched.
    assert_eq!(job.yc(WIDTH, 0), PixelYc::WHITE);
    assert_eq!(job.yc(WIDTH, 1), PixelYc::WHITE);
}

#[test]
fn bottom_up_rows_are_flipped() {
    let table = table();
    let mut job = Conversion::new(&TOP_DOWN, ColorInfoFlag::empty(), fourcc(b"YUY2"));
    job.info.exec_multi_thread_func = None;
    assert_eq!(unsafe { (table.func_pixel2yc.unwrap())(&mut job.info) }, TRUE);
    assert_eq!(job.yc(0, 1).y, 1600);
    assert_eq!(job.yc(0, 0).y, 256);
}

#[test]
fn yc_back_to_yuy2() {
    let table = table();
    let mut job = Conversion::new(&TOP_DOWN, ColorInfoFlag::INVERT_HEIGHT, fourcc(b"YUY2"));
    assert_eq!(unsafe { (table.func_pixel2yc.unwrap())(&mut job.info) }, TRUE);
    job.pixels.fill(0xAA);
    assert_eq!(unsafe { (table.func_yc2pixel.unwrap())(&mut job.info) }, TRUE);
    assert_eq!(job.pixels, TOP_DOWN);
}

#[test]
fn other_formats_are_declined() {
    let table = table();
    let mut rgb = Conversion::new(&[0; 24], ColorInfoFlag::empty(), 0);
    assert_eq!(unsafe { (table.func_pixel2yc.unwrap())(&mut rgb.info) }, FALSE);
    assert_eq!(unsafe { (table.func_yc2pixel.unwrap())(&mut rgb.info) }, FALSE);
    assert!(rgb.yc.iter().all(|&px| px == PixelYc::WHITE));

    assert_eq!(unsafe { (table.func_pixel2yc.unwrap())(std::ptr::null_mut()) }, FALSE);

    let mut broken = Conversion::new(&TOP_DOWN, ColorInfoFlag::empty(), fourcc(b"YUY2"));
    broken.info.ycp = std::ptr::null_mut();
    assert_eq!(unsafe { (table.func_pixel2yc.unwrap())(&mut broken.info) }, FALSE);
}

#[test]
fn job_dispatches_through_host() {
    let mut conversion = Conversion::new(&TOP_DOWN, ColorInfoFlag::empty(), fourcc(b"YUY2"));
    let job = ColorJob::new(&mut conversion.info);
    let workers = AtomicUsize::new(0);
    job.dispatch(&|_, num| {
        assert_eq!(num, mock_host::THREADS as usize);
        workers.fetch_add(1, Ordering::SeqCst);
    })
    .unwrap();
    assert_eq!(workers.load(Ordering::SeqCst), mock_host::THREADS as usize);
    assert!(job.threads().is_available());
}
