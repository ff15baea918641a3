//! Byte layouts the host reads, checked from the plugin side.

use std::mem::size_of;

use aviutl_plugin::encoding::decode_ansi_ptr;
use aviutl_sys::layout::native_size;
use aviutl_sys::win::dib_image_size;
use aviutl_sys::{
    BitmapInfoHeader, ColorPluginTable, FilterPluginTable, InputPluginTable, OutputPluginTable, PixelYc, WaveFormatEx,
};
use proptest::prelude::*;

fn le_u32(bytes: &[u8], at: usize) -> u32 {
    u32::from_le_bytes(bytes[at..at + 4].try_into().unwrap())
}

fn le_u16(bytes: &[u8], at: usize) -> u16 {
    u16::from_le_bytes(bytes[at..at + 2].try_into().unwrap())
}

// ── Pointer-free structures ────────────────────────────────────

#[test]
fn bitmap_header_bytes() {
    let header = BitmapInfoHeader::rgb(640, 480, 24);
    let bytes = bytemuck::bytes_of(&header);
    assert_eq!(bytes.len(), 40);
    assert_eq!(le_u32(bytes, 0), 40);
    assert_eq!(le_u32(bytes, 4), 640);
    assert_eq!(le_u32(bytes, 8), 480);
    assert_eq!(le_u16(bytes, 12), 1);
    assert_eq!(le_u16(bytes, 14), 24);
    assert_eq!(le_u32(bytes, 20), 640 * 3 * 480);
}

proptest! {
    #[test]
    fn dib_rows_are_dword_aligned(width in 1..2000i32, height in 1..64i32, bits in prop::sample::select(vec![16u16, 24, 32])) {
        let header = BitmapInfoHeader::rgb(width, -height, bits);
        let size = header.size_image as usize;
        prop_assert_eq!(size, dib_image_size(width, height, bits));
        let row = size / height as usize;
        let packed = width as usize * usize::from(bits) / 8;
        prop_assert_eq!(row % 4, 0);
        prop_assert!(row >= packed && row - packed < 4);
    }
}

#[test]
fn wave_format_is_packed() {
    let format = WaveFormatEx::pcm(48000, 2, 16);
    let bytes = bytemuck::bytes_of(&format);
    assert_eq!(bytes.len(), 18);
    assert_eq!(le_u16(bytes, 0), 1);
    assert_eq!(le_u16(bytes, 2), 2);
    assert_eq!(le_u32(bytes, 4), 48000);
    assert_eq!(le_u32(bytes, 8), 192_000);
    assert_eq!(le_u16(bytes, 12), 4);
    assert_eq!(le_u16(bytes, 14), 16);
    assert_eq!(le_u16(bytes, 16), 0);
}

#[test]
fn yc_pixels_are_three_shorts() {
    let row = [PixelYc { y: 1, cb: -2, cr: 3 }, PixelYc { y: 4096, cb: 0, cr: 0 }];
    let shorts: &[i16] = bytemuck::cast_slice(&row);
    assert_eq!(shorts, &[1, -2, 3, 4096, 0, 0]);
    assert_eq!(size_of::<PixelYc>() * 2, bytemuck::bytes_of(&row).len());
}

// ── Plugin tables ──────────────────────────────────────────────

#[test]
fn tables_fit_every_field() {
    let round = |n: usize| n.div_ceil(size_of::<usize>()) * size_of::<usize>();
    assert_eq!(size_of::<InputPluginTable>(), round(native_size(17, 12)));
    assert_eq!(size_of::<OutputPluginTable>(), round(native_size(17, 9)));
    assert_eq!(size_of::<ColorPluginTable>(), round(native_size(17, 6)));
}

#[cfg(target_pointer_width = "32")]
#[test]
fn tables_match_host_sizes() {
    assert_eq!(size_of::<FilterPluginTable>(), FilterPluginTable::ABI_SIZE);
    assert_eq!(size_of::<InputPluginTable>(), InputPluginTable::ABI_SIZE);
    assert_eq!(size_of::<OutputPluginTable>(), OutputPluginTable::ABI_SIZE);
    assert_eq!(size_of::<ColorPluginTable>(), ColorPluginTable::ABI_SIZE);
}

#[test]
fn exported_name_arrays_are_null_terminated() {
    let table: &FilterPluginTable = unsafe { &*aviutl_sample::GetFilterTable() };
    assert_eq!(table.track_n, 4);
    assert_eq!(table.check_n, 3);

    let tracks = unsafe { std::slice::from_raw_parts(table.track_name, 5) };
    assert!(tracks[..4].iter().all(|p| !p.is_null()));
    assert!(tracks[4].is_null());
    assert_eq!(unsafe { decode_ansi_ptr(tracks[3]) }, "Cr offset");

    let checks = unsafe { std::slice::from_raw_parts(table.check_name, 4) };
    assert!(checks[3].is_null());
    assert_eq!(unsafe { decode_ansi_ptr(checks[0]) }, "Clamp to range");

    let defaults = unsafe { std::slice::from_raw_parts(table.track_default, 4) };
    assert_eq!(defaults, &[100, 0, 0, 0]);
    let starts = unsafe { std::slice::from_raw_parts(table.track_s, 4) };
    let ends = unsafe { std::slice::from_raw_parts(table.track_e, 4) };
    assert_eq!(starts, &[0, -1024, -1024, -1024]);
    assert_eq!(ends, &[400, 1024, 1024, 1024]);
    // No extended data for the sample.
    assert_eq!(table.ex_data_size, 0);
    assert!(table.ex_data_def.is_null());
}
