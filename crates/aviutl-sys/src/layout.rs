//! Compile-time layout checks.
//!
//! The host is a 32-bit x86 binary, so pointer-bearing structures are only
//! checked there. Pointer-free structures must match on every target.

use core::mem::size_of;

use crate::filter::{FrameStatus, Pixel, PixelYc};
use crate::win::{BitmapInfoHeader, WaveFormatEx};

const _: () = assert!(size_of::<PixelYc>() == PixelYc::ABI_SIZE);
const _: () = assert!(size_of::<Pixel>() == Pixel::ABI_SIZE);
const _: () = assert!(size_of::<FrameStatus>() == FrameStatus::ABI_SIZE);
const _: () = assert!(size_of::<BitmapInfoHeader>() == BitmapInfoHeader::ABI_SIZE);
const _: () = assert!(size_of::<WaveFormatEx>() == WaveFormatEx::ABI_SIZE);

#[cfg(target_pointer_width = "32")]
mod x86 {
    use core::mem::size_of;

    use crate::color::{ColorInfo, ColorPluginTable};
    use crate::filter::{CallbackFunctionSet, FileInfo, FilterPluginTable, FilterProcInfo, SystemInfo};
    use crate::input::{InputInfo, InputPluginTable};
    use crate::output::{OutputInfo, OutputPluginTable};

    const _: () = assert!(size_of::<FilterProcInfo>() == FilterProcInfo::ABI_SIZE);
    const _: () = assert!(size_of::<FileInfo>() == FileInfo::ABI_SIZE);
    const _: () = assert!(size_of::<SystemInfo>() == SystemInfo::ABI_SIZE);
    const _: () = assert!(size_of::<CallbackFunctionSet>() == CallbackFunctionSet::ABI_SIZE);
    const _: () = assert!(size_of::<FilterPluginTable>() == FilterPluginTable::ABI_SIZE);
    const _: () = assert!(size_of::<InputInfo>() == InputInfo::ABI_SIZE);
    const _: () = assert!(size_of::<InputPluginTable>() == InputPluginTable::ABI_SIZE);
    const _: () = assert!(size_of::<OutputInfo>() == OutputInfo::ABI_SIZE);
    const _: () = assert!(size_of::<OutputPluginTable>() == OutputPluginTable::ABI_SIZE);
    const _: () = assert!(size_of::<ColorInfo>() == ColorInfo::ABI_SIZE);
    const _: () = assert!(size_of::<ColorPluginTable>() == ColorPluginTable::ABI_SIZE);
}

/// Size a structure would have on the host: `ints` 4-byte fields plus
/// `ptrs` pointer fields, with no padding.
pub const fn host_size(ints: usize, ptrs: usize) -> usize {
    ints * 4 + ptrs * 4
}

/// Size the same field list takes on the current target, assuming each
/// pointer is naturally aligned.
pub const fn native_size(ints: usize, ptrs: usize) -> usize {
    ints * 4 + ptrs * size_of::<usize>()
}
