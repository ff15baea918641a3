//! Identify which host build loaded us.
//!
//! Structure layouts are only verified for the builds listed in
//! [`aviutl_sys::KNOWN_BUILDS`], keyed by the SHA-1 of `aviutl.exe`.

use std::fs;
use std::path::Path;

use aviutl_sys::constants::build_by_sha1;
use aviutl_sys::HostBuild;
use sha1::{Digest, Sha1};
use tracing::debug;

use crate::error::PluginResult;

/// Lowercase hex SHA-1 of `bytes`.
pub fn sha1_hex(bytes: &[u8]) -> String {
    format!("{:x}", Sha1::digest(bytes))
}

pub fn identify_host(exe: &[u8]) -> Option<&'static HostBuild> {
    build_by_sha1(&sha1_hex(exe))
}

pub fn identify_host_file(path: &Path) -> PluginResult<Option<&'static HostBuild>> {
    let bytes = fs::read(path)?;
    let build = identify_host(&bytes);
    debug!(path = %path.display(), version = build.map(|b| b.version), "host identified");
    Ok(build)
}

/// [`identify_host_file`] on the current process image.
pub fn identify_running_host() -> PluginResult<Option<&'static HostBuild>> {
    identify_host_file(&std::env::current_exe()?)
}
