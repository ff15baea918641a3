//! Filter controls and the filter descriptor.

use std::ffi::{c_char, c_void, CString};

use aviutl_sys::filter::FilterWindowSize;
use aviutl_sys::{FilterFlag, FilterPluginTable};
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::encoding::{encode_ansi, AnsiStrings};
use crate::error::{PluginError, PluginResult};

/// Most trackbars or checkboxes one filter may declare.
pub const MAX_CONTROLS: usize = 255;

/// Checkbox default that turns the control into a push button.
pub const BUTTON_DEFAULT: i32 = -1;

/// A slider in the filter window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Trackbar {
    pub name: String,
    pub default: i32,
    pub min: i32,
    pub max: i32,
}

impl Trackbar {
    pub fn new(name: impl Into<String>, default: i32, min: i32, max: i32) -> Self {
        Self {
            name: name.into(),
            default,
            min,
            max,
        }
    }

    /// Host default range `0..=256`.
    pub fn with_default_range(name: impl Into<String>, default: i32) -> Self {
        Self::new(
            name,
            default,
            FilterPluginTable::DEFAULT_TRACK_MIN,
            FilterPluginTable::DEFAULT_TRACK_MAX,
        )
    }

    pub fn clamp(&self, value: i32) -> i32 {
        value.clamp(self.min, self.max)
    }

    fn validate(&self) -> PluginResult<()> {
        if self.min > self.max {
            return Err(PluginError::InvalidDescriptor(format!(
                "trackbar {:?}: min {} > max {}",
                self.name, self.min, self.max
            )));
        }
        if !(self.min..=self.max).contains(&self.default) {
            return Err(PluginError::InvalidDescriptor(format!(
                "trackbar {:?}: default {} not in {}..={}",
                self.name, self.default, self.min, self.max
            )));
        }
        Ok(())
    }
}

/// A checkbox (or, with default [`BUTTON_DEFAULT`], a button).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Checkbox {
    pub name: String,
    pub default: i32,
}

impl Checkbox {
    pub fn new(name: impl Into<String>, checked: bool) -> Self {
        Self {
            name: name.into(),
            default: checked as i32,
        }
    }

    pub fn button(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            default: BUTTON_DEFAULT,
        }
    }

    pub fn is_button(&self) -> bool {
        self.default == BUTTON_DEFAULT
    }

    fn validate(&self) -> PluginResult<()> {
        if !matches!(self.default, BUTTON_DEFAULT | 0 | 1) {
            return Err(PluginError::InvalidDescriptor(format!(
                "checkbox {:?}: default {} is not 0, 1 or -1",
                self.name, self.default
            )));
        }
        Ok(())
    }
}

/// Optional table entries. Hooks that stay off leave the slot null so the
/// host skips the call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FilterHooks {
    pub window_message: bool,
    pub project_data: bool,
    pub modify_title: bool,
    pub save_frame: bool,
}

/// Everything the host learns about a filter at load time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterDescriptor {
    pub name: String,
    pub information: Option<String>,
    pub flags: FilterFlag,
    /// `FILTER::x` / `FILTER::y`, size modifiers included.
    pub window: Option<(i32, i32)>,
    pub trackbars: Vec<Trackbar>,
    pub checkboxes: Vec<Checkbox>,
    /// Default contents of the extended data area.
    pub ex_data: Option<Vec<u8>>,
    pub hooks: FilterHooks,
}

impl FilterDescriptor {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            information: None,
            flags: FilterFlag::empty(),
            window: None,
            trackbars: Vec::new(),
            checkboxes: Vec::new(),
            ex_data: None,
            hooks: FilterHooks::default(),
        }
    }

    pub fn information(mut self, text: impl Into<String>) -> Self {
        self.information = Some(text.into());
        self.flags |= FilterFlag::EX_INFORMATION;
        self
    }

    pub fn flags(mut self, flags: FilterFlag) -> Self {
        self.flags |= flags;
        self
    }

    /// Window size in pixels, including the frame.
    pub fn window_size(mut self, width: i32, height: i32) -> Self {
        self.window = Some((width, height));
        self.flags |= FilterFlag::WINDOW_SIZE;
        self
    }

    /// Client-area size in pixels.
    pub fn client_size(mut self, width: i32, height: i32) -> Self {
        let client = FilterWindowSize::CLIENT.bits();
        self.window = Some((width | client, height | client));
        self.flags |= FilterFlag::WINDOW_SIZE;
        self
    }

    pub fn trackbar(mut self, trackbar: Trackbar) -> Self {
        self.trackbars.push(trackbar);
        self
    }

    pub fn checkbox(mut self, checkbox: Checkbox) -> Self {
        self.checkboxes.push(checkbox);
        self
    }

    /// Reserve an extended data area initialised with `default`.
    pub fn ex_data(mut self, default: impl Into<Vec<u8>>) -> Self {
        self.ex_data = Some(default.into());
        self.flags |= FilterFlag::EX_DATA;
        self
    }

    pub fn ex_data_pod<T: bytemuck::Pod>(self, default: &T) -> Self {
        self.ex_data(bytemuck::bytes_of(default).to_vec())
    }

    pub fn hook_window_message(mut self) -> Self {
        self.hooks.window_message = true;
        self
    }

    pub fn hook_project_data(mut self) -> Self {
        self.hooks.project_data = true;
        self
    }

    pub fn hook_modify_title(mut self) -> Self {
        self.hooks.modify_title = true;
        self
    }

    pub fn hook_save_frame(mut self) -> Self {
        self.hooks.save_frame = true;
        self
    }

    pub fn track_index(&self, name: &str) -> Option<usize> {
        self.trackbars.iter().position(|t| t.name == name)
    }

    pub fn check_index(&self, name: &str) -> Option<usize> {
        self.checkboxes.iter().position(|c| c.name == name)
    }

    pub fn validate(&self) -> PluginResult<()> {
        if self.name.is_empty() {
            return Err(PluginError::InvalidDescriptor("empty filter name".into()));
        }
        if self.trackbars.len() > MAX_CONTROLS {
            return Err(PluginError::InvalidDescriptor(format!(
                "{} trackbars, at most {MAX_CONTROLS}",
                self.trackbars.len()
            )));
        }
        if self.checkboxes.len() > MAX_CONTROLS {
            return Err(PluginError::InvalidDescriptor(format!(
                "{} checkboxes, at most {MAX_CONTROLS}",
                self.checkboxes.len()
            )));
        }
        self.trackbars.iter().try_for_each(Trackbar::validate)?;
        self.checkboxes.iter().try_for_each(Checkbox::validate)?;
        match &self.ex_data {
            Some(_) if !self.flags.contains(FilterFlag::EX_DATA) => Err(PluginError::InvalidDescriptor(
                "extended data without FilterFlag::EX_DATA".into(),
            )),
            None if self.flags.contains(FilterFlag::EX_DATA) => Err(PluginError::InvalidDescriptor(
                "FilterFlag::EX_DATA without extended data".into(),
            )),
            Some(data) if i32::try_from(data.len()).is_err() => {
                Err(PluginError::InvalidDescriptor("extended data too large".into()))
            }
            _ => Ok(()),
        }
    }

    /// Validate and encode into host-readable storage.
    pub(crate) fn encode(&self) -> PluginResult<TableStorage> {
        self.validate()?;
        let encode_named = |what: &str, text: &str| {
            encode_ansi(text).map_err(|e| PluginError::InvalidDescriptor(format!("{what} {text:?}: {e}")))
        };
        Ok(TableStorage {
            name: encode_named("name", &self.name)?,
            information: self
                .information
                .as_deref()
                .map(|i| encode_named("information", i))
                .transpose()?,
            track_names: AnsiStrings::new(self.trackbars.iter().map(|t| t.name.as_str()))?,
            track_default: self.trackbars.iter().map(|t| t.default).collect(),
            track_min: self.trackbars.iter().map(|t| t.min).collect(),
            track_max: self.trackbars.iter().map(|t| t.max).collect(),
            check_names: AnsiStrings::new(self.checkboxes.iter().map(|c| c.name.as_str()))?,
            check_default: self.checkboxes.iter().map(|c| c.default).collect(),
            ex_data: self.ex_data.clone().unwrap_or_default(),
            flags: self.flags,
            window: self.window.unwrap_or((0, 0)),
        })
    }
}

/// Owned backing memory for the pointers in a [`FilterPluginTable`].
///
/// Heap buffers do not move when this struct moves, so filled-in pointers
/// stay valid for as long as the storage lives.
#[derive(Debug)]
pub(crate) struct TableStorage {
    name: CString,
    information: Option<CString>,
    track_names: AnsiStrings,
    track_default: Vec<i32>,
    track_min: Vec<i32>,
    track_max: Vec<i32>,
    check_names: AnsiStrings,
    check_default: Vec<i32>,
    ex_data: Vec<u8>,
    flags: FilterFlag,
    window: (i32, i32),
}

// SAFETY: immutable after construction; only read by the host.
unsafe impl Send for TableStorage {}
unsafe impl Sync for TableStorage {}

fn slice_ptr<T>(v: &[T]) -> *mut T {
    if v.is_empty() {
        std::ptr::null_mut()
    } else {
        v.as_ptr() as *mut T
    }
}

impl TableStorage {
    /// Point the descriptive fields of `table` at this storage.
    pub(crate) fn fill(&self, table: &mut FilterPluginTable) {
        table.flag = self.flags;
        table.x = self.window.0;
        table.y = self.window.1;
        table.name = self.name.as_ptr() as *mut c_char;
        table.track_n = self.track_default.len() as i32;
        table.track_name = self.track_names.as_ptr();
        table.track_default = slice_ptr(&self.track_default);
        table.track_s = slice_ptr(&self.track_min);
        table.track_e = slice_ptr(&self.track_max);
        table.check_n = self.check_default.len() as i32;
        table.check_name = self.check_names.as_ptr();
        table.check_default = slice_ptr(&self.check_default);
        table.information = self
            .information
            .as_ref()
            .map_or(std::ptr::null_mut(), |i| i.as_ptr() as *mut c_char);
        table.ex_data_size = self.ex_data.len() as i32;
        table.ex_data_def = slice_ptr(&self.ex_data) as *mut c_void;
    }
}

/// Control values at the time of a call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterParams<'a> {
    tracks: SmallVec<[i32; 16]>,
    checks: SmallVec<[i32; 16]>,
    descriptor: &'a FilterDescriptor,
}

impl<'a> FilterParams<'a> {
    /// Snapshot the host's current values.
    ///
    /// # Safety
    ///
    /// `table.track` / `table.check` must be null or hold `track_n` /
    /// `check_n` values.
    pub unsafe fn from_table(table: &FilterPluginTable, descriptor: &'a FilterDescriptor) -> Self {
        let tracks = read_values(table.track, table.track_n, descriptor.trackbars.len());
        let checks = read_values(table.check, table.check_n, descriptor.checkboxes.len());
        Self {
            tracks,
            checks,
            descriptor,
        }
    }

    /// Values as declared by the descriptor defaults.
    pub fn defaults(descriptor: &'a FilterDescriptor) -> Self {
        Self {
            tracks: descriptor.trackbars.iter().map(|t| t.default).collect(),
            checks: descriptor.checkboxes.iter().map(|c| c.default).collect(),
            descriptor,
        }
    }

    pub fn tracks(&self) -> &[i32] {
        &self.tracks
    }

    pub fn checks(&self) -> &[i32] {
        &self.checks
    }

    pub fn track(&self, index: usize) -> Option<i32> {
        self.tracks.get(index).copied()
    }

    pub fn check(&self, index: usize) -> Option<bool> {
        self.checks.get(index).map(|&v| v != 0)
    }

    pub fn track_by_name(&self, name: &str) -> Option<i32> {
        self.descriptor.track_index(name).and_then(|i| self.track(i))
    }

    pub fn check_by_name(&self, name: &str) -> Option<bool> {
        self.descriptor.check_index(name).and_then(|i| self.check(i))
    }

    /// Trackbar value or its declared default.
    pub fn track_or_default(&self, index: usize) -> i32 {
        self.track(index)
            .or_else(|| self.descriptor.trackbars.get(index).map(|t| t.default))
            .unwrap_or(0)
    }
}

unsafe fn read_values(ptr: *const i32, host_n: i32, declared: usize) -> SmallVec<[i32; 16]> {
    let n = (host_n.max(0) as usize).min(declared);
    if ptr.is_null() || n == 0 {
        return SmallVec::new();
    }
    SmallVec::from_slice(std::slice::from_raw_parts(ptr, n))
}
