//! Host constants: window classes, entry symbols and known builds.

/// A constant string in both ANSI (NUL-terminated) and UTF-16 form.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HostString {
    /// Bytes including the trailing NUL.
    pub ansi: &'static [u8],
    /// UTF-16 code units including the trailing NUL.
    pub wide: &'static [u16],
}

impl HostString {
    /// The ANSI text without the NUL.
    pub fn as_str(&self) -> &'static str {
        let bytes = &self.ansi[..self.ansi.len().saturating_sub(1)];
        core::str::from_utf8(bytes).unwrap_or("")
    }
}

/// Encode an ASCII literal as NUL-terminated UTF-16 at compile time.
macro_rules! host_string {
    ($text:literal) => {{
        const ANSI: &[u8] = concat!($text, "\0").as_bytes();
        const WIDE: [u16; ANSI.len()] = {
            let mut out = [0u16; ANSI.len()];
            let mut i = 0;
            while i < ANSI.len() {
                out[i] = ANSI[i] as u16;
                i += 1;
            }
            out
        };
        HostString {
            ansi: ANSI,
            wide: &WIDE,
        }
    }};
}

/// Window class names registered by the host.
pub mod window_class {
    use super::HostString;

    /// Main window.
    pub const MAIN: HostString = host_string!("AviUtl");
    /// Buttons inside filter windows.
    pub const BUTTON: HostString = host_string!("AviUtlButton");
    /// The extended editing window.
    pub const EXTENDED_EDITOR: HostString = host_string!("ExtendedFilterClass");
}

/// Exported symbol names the host looks up.
pub mod entry {
    pub const FILTER_TABLE: &str = "GetFilterTable";
    pub const FILTER_TABLE_LIST: &str = "GetFilterTableList";
    pub const FILTER_TABLE_YUY2: &str = "GetFilterTableYUY2";
    pub const INPUT_TABLE: &str = "GetInputPluginTable";
    pub const OUTPUT_TABLE: &str = "GetOutputPluginTable";
    pub const COLOR_TABLE: &str = "GetColorPluginTable";
}

/// A released host build and the SHA-1 of its `aviutl.exe`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HostBuild {
    pub version: &'static str,
    /// Lowercase hex digest.
    pub sha1: &'static str,
}

/// Builds whose structure layouts match this crate.
pub const KNOWN_BUILDS: &[HostBuild] = &[
    HostBuild {
        version: "0.99k2",
        sha1: "52c241710a1cdbc7efdbdc5f50807eddae049c87",
    },
    HostBuild {
        version: "0.99l",
        sha1: "fc9c953aa0f8d618df3d25ec5df761849f92c987",
    },
    HostBuild {
        version: "0.99m",
        sha1: "f3530f8da99f0cb49787663c3e28ea39d3efb1a3",
    },
    HostBuild {
        version: "1.00",
        sha1: "11994746b8470e58c3745a66c01dbaeb2f48e20c",
    },
    HostBuild {
        version: "1.10",
        sha1: "473c0479b828a1ff663473223eb9fc9f59edf856",
    },
];

/// Look up a build by hex digest (case-insensitive).
pub fn build_by_sha1(digest: &str) -> Option<&'static HostBuild> {
    KNOWN_BUILDS
        .iter()
        .find(|b| b.sha1.eq_ignore_ascii_case(digest))
}

/// Look up a build by version string.
pub fn build_by_version(version: &str) -> Option<&'static HostBuild> {
    KNOWN_BUILDS.iter().find(|b| b.version == version)
}

/// `MAX_PATH`, the buffer size the host uses for file names.
pub const MAX_PATH: usize = 260;
