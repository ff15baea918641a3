//! AviUtl Sys - Raw plugin ABI
//!
//! Fixed-layout structures, callback tables and flag sets shared between
//! AviUtl and its plugins:
//! - Filter plugins (`*.auf`): [`filter`]
//! - Input plugins (`*.aui`): [`input`]
//! - Output plugins (`*.auo`): [`output`]
//! - Color conversion plugins (`*.auc`): [`color`]
//!
//! Everything here mirrors the host's memory layout. Safe wrappers live in
//! `aviutl-plugin`.

#![allow(clippy::missing_safety_doc)]

#[doc(hidden)]
pub use bytemuck;

pub mod flags;

pub mod color;
pub mod constants;
pub mod filter;
pub mod input;
pub mod layout;
pub mod output;
pub mod win;

pub use color::{ColorInfo, ColorInfoFlag, ColorPluginTable};
pub use constants::{HostBuild, HostString, KNOWN_BUILDS};
pub use filter::{
    AddMenuItemFlag, AviFileFilterType, AviFileHandle, AviFileOpenFlag, CallbackFunctionSet, EditFlag,
    EditOpenFlag, EditOutputFlag, FileInfo, FileInfoFlag, FilterFlag, FilterPluginTable, FilterProcInfo,
    FilterUpdateStatus, FilterWindowSize, FrameStatus, FrameStatusType, InterlaceType, MultiThreadFunc, Pixel,
    PixelYc, ProcInfoFlag, SystemInfo, SystemInfoFlag, WindowMessage,
};
pub use input::{InputHandle, InputInfo, InputInfoFlag, InputPluginFlag, InputPluginTable};
pub use output::{OutputFrameFlag, OutputInfo, OutputInfoFlag, OutputPluginTable};
pub use win::{BitmapInfoHeader, Bool, Hinstance, Hwnd, Lparam, WaveFormatEx, Wparam, FALSE, TRUE};
