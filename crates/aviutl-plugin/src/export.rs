//! DLL entry points.
//!
//! The host finds a plugin through a fixed set of exported getters. The
//! macros here emit them for plugin types; each getter initialises logging,
//! registers the type and returns null if registration fails.

use std::sync::OnceLock;

use aviutl_sys::FilterPluginTable;

use crate::error::PluginResult;
use crate::ffi_guard::guard_with_default;

/// `register_filter::<F>` as a plain function pointer.
pub type FilterRegistration = fn() -> PluginResult<*mut FilterPluginTable>;

/// NULL-terminated table pointer array returned by `GetFilterTableList`.
pub struct TableList(Vec<*mut FilterPluginTable>);

// SAFETY: the pointers reference leaked registry slots.
unsafe impl Send for TableList {}
unsafe impl Sync for TableList {}

impl TableList {
    pub fn build(registrations: &[FilterRegistration]) -> PluginResult<Self> {
        let mut tables = registrations
            .iter()
            .map(|register| register())
            .collect::<PluginResult<Vec<_>>>()?;
        tables.push(std::ptr::null_mut());
        Ok(Self(tables))
    }

    pub fn len(&self) -> usize {
        self.0.len() - 1
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn as_ptr(&self) -> *mut *mut FilterPluginTable {
        self.0.as_ptr() as *mut *mut FilterPluginTable
    }
}

/// Body of `GetFilterTableList`: build `cell` once and return its array.
#[doc(hidden)]
pub fn filter_table_list(
    cell: &'static OnceLock<TableList>,
    registrations: &[FilterRegistration],
) -> *mut *mut FilterPluginTable {
    guard_with_default("GetFilterTableList", std::ptr::null_mut(), || {
        if let Some(list) = cell.get() {
            return Ok(list.as_ptr());
        }
        let list = TableList::build(registrations)?;
        // A racing caller may have won; either list holds the same tables.
        let _ = cell.set(list);
        Ok(cell.get().map_or(std::ptr::null_mut(), TableList::as_ptr))
    })
}

/// Export `GetFilterTable` (first type) and `GetFilterTableList` (all types).
///
/// ```ignore
/// aviutl_plugin::export_filter!(Sharpen, Blur);
/// ```
#[macro_export]
macro_rules! export_filter {
    ($first:ty $(, $rest:ty)* $(,)?) => {
        #[no_mangle]
        #[allow(non_snake_case)]
        pub extern "system" fn GetFilterTable() -> *mut $crate::aviutl_sys::FilterPluginTable {
            $crate::init_plugin(env!("CARGO_PKG_NAME"));
            $crate::ffi_guard::guard_with_default("GetFilterTable", ::std::ptr::null_mut(), || {
                $crate::register_filter::<$first>()
            })
        }

        #[no_mangle]
        #[allow(non_snake_case)]
        pub extern "system" fn GetFilterTableList() -> *mut *mut $crate::aviutl_sys::FilterPluginTable {
            static LIST: ::std::sync::OnceLock<$crate::export::TableList> = ::std::sync::OnceLock::new();
            $crate::init_plugin(env!("CARGO_PKG_NAME"));
            $crate::export::filter_table_list(
                &LIST,
                &[
                    $crate::register_filter::<$first> as $crate::export::FilterRegistration,
                    $($crate::register_filter::<$rest> as $crate::export::FilterRegistration,)*
                ],
            )
        }
    };
}

/// Export `GetInputPluginTable`.
#[macro_export]
macro_rules! export_input {
    ($plugin:ty $(,)?) => {
        #[no_mangle]
        #[allow(non_snake_case)]
        pub extern "system" fn GetInputPluginTable() -> *mut $crate::aviutl_sys::InputPluginTable {
            $crate::init_plugin(env!("CARGO_PKG_NAME"));
            $crate::ffi_guard::guard_with_default("GetInputPluginTable", ::std::ptr::null_mut(), || {
                $crate::register_input::<$plugin>()
            })
        }
    };
}

/// Export `GetOutputPluginTable`.
#[macro_export]
macro_rules! export_output {
    ($plugin:ty $(,)?) => {
        #[no_mangle]
        #[allow(non_snake_case)]
        pub extern "system" fn GetOutputPluginTable() -> *mut $crate::aviutl_sys::OutputPluginTable {
            $crate::init_plugin(env!("CARGO_PKG_NAME"));
            $crate::ffi_guard::guard_with_default("GetOutputPluginTable", ::std::ptr::null_mut(), || {
                $crate::register_output::<$plugin>()
            })
        }
    };
}

/// Export `GetColorPluginTable`.
#[macro_export]
macro_rules! export_color {
    ($plugin:ty $(,)?) => {
        #[no_mangle]
        #[allow(non_snake_case)]
        pub extern "system" fn GetColorPluginTable() -> *mut $crate::aviutl_sys::ColorPluginTable {
            $crate::init_plugin(env!("CARGO_PKG_NAME"));
            $crate::ffi_guard::guard_with_default("GetColorPluginTable", ::std::ptr::null_mut(), || {
                $crate::register_color::<$plugin>()
            })
        }
    };
}
