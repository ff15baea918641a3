//! AviUtl Plugin - safe SDK for filter, input, output and color plugins.
//!
//! Implement [`FilterPlugin`] (or [`InputPlugin`], [`OutputPlugin`],
//! [`ColorPlugin`]) and export it with the matching macro:
//!
//! ```ignore
//! use aviutl_plugin::{FilterContext, FilterDescriptor, FilterPlugin, PluginResult, ProcFrame};
//!
//! struct Invert;
//!
//! impl FilterPlugin for Invert {
//!     fn descriptor() -> FilterDescriptor {
//!         FilterDescriptor::new("Invert")
//!     }
//!     fn create() -> PluginResult<Self> {
//!         Ok(Invert)
//!     }
//!     fn process(&mut self, _ctx: &mut FilterContext, frame: &mut ProcFrame) -> PluginResult<bool> {
//!         for row in frame.edit_mut()?.rows_mut() {
//!             for px in row {
//!                 px.y = 4096 - px.y;
//!             }
//!         }
//!         Ok(true)
//!     }
//! }
//!
//! aviutl_plugin::export_filter!(Invert);
//! ```

pub mod color;
pub mod config;
pub mod encoding;
pub mod error;
pub mod export;
pub mod ffi_guard;
pub mod filter;
pub mod frame;
pub mod host;
pub mod host_build;
pub mod input;
pub mod logging;
pub mod output;
pub mod params;
pub mod registry;
pub mod threading;

#[doc(hidden)]
pub use aviutl_sys;

pub use color::{register_color, ColorDescriptor, ColorJob, ColorPlugin};
pub use config::PluginConfig;
pub use error::{PluginError, PluginResult};
pub use filter::{register_filter, FilterContext, FilterPlugin, SaveFrameQuery, WindowEvent};
pub use frame::{ProcFrame, YcBuffer, YcPlane, YcPlaneMut};
pub use host::{AviFile, Host, OwnedYc};
pub use host_build::{identify_host, identify_host_file};
pub use input::{register_input, AudioInfo, InputDescriptor, InputPlugin, MediaInfo, VideoInfo};
pub use logging::{init_logging, init_plugin};
pub use output::{register_output, OutputDescriptor, OutputJob, OutputPlugin};
pub use params::{Checkbox, FilterDescriptor, FilterParams, Trackbar};
pub use threading::{Dispatcher, HostThreads, Sequential};
