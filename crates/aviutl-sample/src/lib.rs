//! YC Adjust - sample filter plugin.
//!
//! Scales luma, shifts luma and chroma, optionally drops chroma, and counts
//! the frames it processed. The count is stored in the project file and shown
//! in the main window title.

pub mod adjust;

use aviutl_plugin::{
    Checkbox, FilterContext, FilterDescriptor, FilterPlugin, PluginError, PluginResult, ProcFrame, Sequential,
    Trackbar, WindowEvent,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

pub use adjust::Adjustment;
use adjust::CHECK_RESET;

pub const FILTER_NAME: &str = "YC Adjust";

/// Saved with the project.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageStats {
    pub frames: u64,
}

#[derive(Debug, Default)]
pub struct YcAdjust {
    stats: UsageStats,
}

impl YcAdjust {
    pub fn stats(&self) -> UsageStats {
        self.stats
    }

    fn reset_controls(ctx: &mut FilterContext<'_>) -> PluginResult<()> {
        for (index, bar) in ctx.descriptor().trackbars.iter().enumerate() {
            ctx.set_track(index, bar.default)?;
        }
        ctx.host()?.update_filter_window()
    }
}

impl FilterPlugin for YcAdjust {
    fn descriptor() -> FilterDescriptor {
        // Order must match the TRACK_* / CHECK_* indices.
        FilterDescriptor::new(FILTER_NAME)
            .information("YC Adjust version 0.1.0")
            .trackbar(Trackbar::new("Luma gain %", 100, 0, 400))
            .trackbar(Trackbar::new("Luma offset", 0, -1024, 1024))
            .trackbar(Trackbar::new("Cb offset", 0, -1024, 1024))
            .trackbar(Trackbar::new("Cr offset", 0, -1024, 1024))
            .checkbox(Checkbox::new("Clamp to range", true))
            .checkbox(Checkbox::new("Grayscale", false))
            .checkbox(Checkbox::button("Reset"))
            .hook_window_message()
            .hook_project_data()
            .hook_modify_title()
    }

    fn create() -> PluginResult<Self> {
        Ok(Self::default())
    }

    fn init(&mut self, ctx: &mut FilterContext<'_>) -> PluginResult<()> {
        info!(filter = %ctx.descriptor().name, "YC Adjust ready");
        Ok(())
    }

    fn process(&mut self, ctx: &mut FilterContext<'_>, frame: &mut ProcFrame<'_>) -> PluginResult<bool> {
        let adjust = Adjustment::from_params(ctx.params());
        if adjust.is_identity() {
            return Ok(false);
        }
        let host = ctx.host()?;
        let mut plane = frame.edit_mut()?;
        match plane.par_rows(&host, |_, row| adjust.apply_row(row)) {
            Err(PluginError::MissingCallback(_)) => {
                debug!("no host thread pool, filtering on the caller");
                plane.par_rows(&Sequential::default(), |_, row| adjust.apply_row(row))?;
            }
            other => other?,
        }
        self.stats.frames += 1;
        Ok(true)
    }

    fn window_message(&mut self, ctx: &mut FilterContext<'_>, event: &WindowEvent) -> PluginResult<bool> {
        if event.button_index() == Some(CHECK_RESET) {
            Self::reset_controls(ctx)?;
            return Ok(true);
        }
        Ok(false)
    }

    fn project_save(&mut self, _ctx: &mut FilterContext<'_>) -> PluginResult<Option<Vec<u8>>> {
        if self.stats.frames == 0 {
            return Ok(None);
        }
        Ok(Some(serde_json::to_vec(&self.stats)?))
    }

    fn project_load(&mut self, _ctx: &mut FilterContext<'_>, data: &[u8]) -> PluginResult<()> {
        self.stats = serde_json::from_slice(data)?;
        debug!(frames = self.stats.frames, "usage restored");
        Ok(())
    }

    fn modify_title(&mut self, _ctx: &mut FilterContext<'_>, _frame: i32, title: &str) -> PluginResult<Option<String>> {
        if self.stats.frames == 0 {
            return Ok(None);
        }
        Ok(Some(format!("{title} [{FILTER_NAME}: {} frames]", self.stats.frames)))
    }
}

aviutl_plugin::export_filter!(YcAdjust);
