//! Host text encoding.
//!
//! Every string crossing the ABI is NUL-terminated code page 932
//! (Shift_JIS). Conversion goes through `encoding_rs`.

use std::ffi::{c_char, CStr, CString};
use std::path::PathBuf;

use encoding_rs::SHIFT_JIS;

use crate::error::{PluginError, PluginResult};

/// Encode UTF-8 text for the host. Fails on characters code page 932 cannot
/// represent and on interior NUL bytes.
pub fn encode_ansi(text: &str) -> PluginResult<CString> {
    let bytes = encode_ansi_bytes(text)?;
    CString::new(bytes).map_err(|_| PluginError::Encoding(format!("interior NUL in {text:?}")))
}

/// Encode without the trailing NUL.
pub fn encode_ansi_bytes(text: &str) -> PluginResult<Vec<u8>> {
    let (bytes, _, had_errors) = SHIFT_JIS.encode(text);
    if had_errors {
        return Err(PluginError::Encoding(format!("{text:?} is not representable in code page 932")));
    }
    Ok(bytes.into_owned())
}

/// Decode host bytes (without NUL). Invalid sequences become U+FFFD.
pub fn decode_ansi_bytes(bytes: &[u8]) -> String {
    let (text, _) = SHIFT_JIS.decode_without_bom_handling(bytes);
    text.into_owned()
}

/// Decode a NUL-terminated host string. Null yields an empty string.
///
/// # Safety
///
/// `ptr` must be null or point to a NUL-terminated buffer.
pub unsafe fn decode_ansi_ptr(ptr: *const c_char) -> String {
    if ptr.is_null() {
        return String::new();
    }
    decode_ansi_bytes(CStr::from_ptr(ptr).to_bytes())
}

/// Decode a host file name.
///
/// # Safety
///
/// Same as [`decode_ansi_ptr`].
pub unsafe fn decode_ansi_path(ptr: *const c_char) -> PathBuf {
    PathBuf::from(decode_ansi_ptr(ptr))
}

/// Length of the longest prefix of `bytes` that fits in `max` bytes without
/// splitting a double-byte character.
pub fn ansi_prefix_len(bytes: &[u8], max: usize) -> usize {
    let mut i = 0;
    while i < bytes.len() {
        let width = if is_lead_byte(bytes[i]) { 2 } else { 1 };
        if i + width > max {
            break;
        }
        i += width;
    }
    i.min(bytes.len())
}

#[inline]
fn is_lead_byte(b: u8) -> bool {
    matches!(b, 0x81..=0x9f | 0xe0..=0xfc)
}

/// Encode `text` into a fixed host buffer, truncating at a character
/// boundary and always writing the NUL. Returns the bytes written (without NUL).
pub fn write_ansi(buf: &mut [u8], text: &str) -> PluginResult<usize> {
    if buf.is_empty() {
        return Err(PluginError::Encoding("empty destination buffer".into()));
    }
    let bytes = encode_ansi_bytes(text)?;
    if bytes.contains(&0) {
        return Err(PluginError::Encoding(format!("interior NUL in {text:?}")));
    }
    let n = ansi_prefix_len(&bytes, buf.len() - 1);
    buf[..n].copy_from_slice(&bytes[..n]);
    buf[n] = 0;
    Ok(n)
}

/// Build a file-dialog filter list: `"desc\0pattern\0...\0"`.
pub fn encode_filter_list(entries: &[(&str, &str)]) -> PluginResult<Vec<u8>> {
    let mut out = Vec::new();
    for (desc, pattern) in entries {
        for part in [desc, pattern] {
            let bytes = encode_ansi_bytes(part)?;
            if bytes.contains(&0) {
                return Err(PluginError::Encoding(format!("interior NUL in {part:?}")));
            }
            out.extend_from_slice(&bytes);
            out.push(0);
        }
    }
    out.push(0);
    Ok(out)
}

/// Owned host strings plus a stable array of pointers to them, as used for
/// trackbar and checkbox name tables.
#[derive(Debug, Default)]
pub struct AnsiStrings {
    strings: Vec<CString>,
    ptrs: Vec<*mut c_char>,
}

// SAFETY: the pointers only reference the owned `CString` heap buffers,
// which are never mutated after construction.
unsafe impl Send for AnsiStrings {}
unsafe impl Sync for AnsiStrings {}

impl AnsiStrings {
    pub fn new<'a>(texts: impl IntoIterator<Item = &'a str>) -> PluginResult<Self> {
        let strings = texts.into_iter().map(encode_ansi).collect::<PluginResult<Vec<_>>>()?;
        let mut ptrs: Vec<*mut c_char> = strings.iter().map(|s| s.as_ptr() as *mut c_char).collect();
        ptrs.push(std::ptr::null_mut());
        Ok(Self { strings, ptrs })
    }

    pub fn len(&self) -> usize {
        self.strings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strings.is_empty()
    }

    /// Pointer array (NULL-terminated); null when empty.
    pub fn as_ptr(&self) -> *mut *mut c_char {
        if self.strings.is_empty() {
            std::ptr::null_mut()
        } else {
            self.ptrs.as_ptr() as *mut *mut c_char
        }
    }
}
