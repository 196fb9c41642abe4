// this_file: backends/ttb-core/src/types.rs

//! Wire-level types shared by engines, the bridge and host implementations.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Semantic category of an input resource requested by an engine.
///
/// The numeric values are part of the contract between engines and hosts.
/// Existing values must never be renumbered; new categories only get new
/// values.
#[repr(i32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FormatCode {
    /// TeX font metrics
    Tfm = 3,
    /// Adobe font metrics
    Afm = 4,
    /// Bibliography database
    Bib = 6,
    /// Bibliography style
    Bst = 7,
    /// Runtime configuration
    Cnf = 8,
    /// Compiled format dump
    Format = 10,
    /// Font map
    FontMap = 11,
    /// Omega font metrics
    Ofm = 20,
    /// Omega virtual font
    Ovf = 23,
    /// Included graphic
    Pict = 25,
    /// TeX source
    Tex = 26,
    /// PostScript header
    TexPsHeader = 30,
    /// Type-1 font program
    Type1 = 32,
    /// Virtual font
    Vf = 33,
    /// TrueType font
    TrueType = 36,
    /// Generic binary data
    Binary = 40,
    /// Miscellaneous font data
    MiscFonts = 41,
    /// Encoding file
    Enc = 44,
    /// Character map
    Cmap = 45,
    /// Subfont definition
    Sfd = 46,
    /// OpenType font
    OpenType = 47,
    /// The document under processing
    Primary = 59,
}

impl FormatCode {
    /// Every known format code, in ascending numeric order.
    pub const ALL: [FormatCode; 22] = [
        FormatCode::Tfm,
        FormatCode::Afm,
        FormatCode::Bib,
        FormatCode::Bst,
        FormatCode::Cnf,
        FormatCode::Format,
        FormatCode::FontMap,
        FormatCode::Ofm,
        FormatCode::Ovf,
        FormatCode::Pict,
        FormatCode::Tex,
        FormatCode::TexPsHeader,
        FormatCode::Type1,
        FormatCode::Vf,
        FormatCode::TrueType,
        FormatCode::Binary,
        FormatCode::MiscFonts,
        FormatCode::Enc,
        FormatCode::Cmap,
        FormatCode::Sfd,
        FormatCode::OpenType,
        FormatCode::Primary,
    ];

    pub fn code(self) -> i32 {
        self as i32
    }

    pub fn from_code(code: i32) -> Option<Self> {
        Self::ALL.iter().copied().find(|format| format.code() == code)
    }

    /// Short human-readable label.
    pub fn name(self) -> &'static str {
        match self {
            FormatCode::Tfm => "tfm",
            FormatCode::Afm => "afm",
            FormatCode::Bib => "bib",
            FormatCode::Bst => "bst",
            FormatCode::Cnf => "cnf",
            FormatCode::Format => "format",
            FormatCode::FontMap => "fontmap",
            FormatCode::Ofm => "ofm",
            FormatCode::Ovf => "ovf",
            FormatCode::Pict => "pict",
            FormatCode::Tex => "tex",
            FormatCode::TexPsHeader => "tex-ps-header",
            FormatCode::Type1 => "type1",
            FormatCode::Vf => "vf",
            FormatCode::TrueType => "truetype",
            FormatCode::Binary => "binary",
            FormatCode::MiscFonts => "miscfonts",
            FormatCode::Enc => "enc",
            FormatCode::Cmap => "cmap",
            FormatCode::Sfd => "sfd",
            FormatCode::OpenType => "opentype",
            FormatCode::Primary => "primary",
        }
    }

    /// Filename suffixes a host may append when the requested name has none
    /// of them.
    pub fn extensions(self) -> &'static [&'static str] {
        match self {
            FormatCode::Tfm => &[".tfm"],
            FormatCode::Afm => &[".afm"],
            FormatCode::Bib => &[".bib"],
            FormatCode::Bst => &[".bst"],
            FormatCode::Cnf => &[".cnf"],
            FormatCode::Format => &[".fmt"],
            FormatCode::FontMap => &[".map"],
            FormatCode::Ofm => &[".ofm"],
            FormatCode::Ovf => &[".ovf", ".vf"],
            FormatCode::Tex => &[".tex"],
            FormatCode::TexPsHeader => &[".pro"],
            FormatCode::Type1 => &[".pfa", ".pfb"],
            FormatCode::Vf => &[".vf"],
            FormatCode::TrueType => &[".ttf", ".ttc"],
            FormatCode::Enc => &[".enc"],
            FormatCode::Sfd => &[".sfd"],
            FormatCode::OpenType => &[".otf"],
            FormatCode::Pict
            | FormatCode::Binary
            | FormatCode::MiscFonts
            | FormatCode::Cmap
            | FormatCode::Primary => &[],
        }
    }

    /// Candidate names for `name`: the name itself, then the name with each
    /// default extension it does not already carry.
    pub fn candidate_names(self, name: &str) -> Vec<String> {
        let mut names = vec![name.to_string()];
        let exts = self.extensions();
        if !exts.iter().any(|ext| name.ends_with(ext)) {
            names.extend(exts.iter().map(|ext| format!("{name}{ext}")));
        }
        names
    }
}

impl TryFrom<i32> for FormatCode {
    type Error = i32;

    fn try_from(code: i32) -> Result<Self, Self::Error> {
        Self::from_code(code).ok_or(code)
    }
}

impl fmt::Display for FormatCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name(), self.code())
    }
}

/// Outcome reported by the typesetting and bibliography engines.
#[repr(i32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum History {
    Spotless = 0,
    WarningIssued = 1,
    ErrorIssued = 2,
    FatalError = 3,
}

impl History {
    pub fn code(self) -> i32 {
        self as i32
    }

    pub fn from_code(code: i32) -> Option<Self> {
        match code {
            0 => Some(History::Spotless),
            1 => Some(History::WarningIssued),
            2 => Some(History::ErrorIssued),
            3 => Some(History::FatalError),
            _ => None,
        }
    }
}

impl From<History> for i32 {
    fn from(history: History) -> Self {
        history.code()
    }
}

/// Fatal sentinel of the bibliography and page-conversion engines.
pub const HARD_FAILURE: i32 = 99;

/// The engines that can run behind a trampoline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EngineKind {
    Tex,
    Bibtex,
    Dvipdfmx,
}

impl EngineKind {
    /// Status code returned when a run of this engine aborts.
    ///
    /// The typesetting engine reports [`History::FatalError`]; the other two
    /// report [`HARD_FAILURE`]. Each matches that engine's own pre-existing
    /// return-code convention.
    pub fn fatal_code(self) -> i32 {
        match self {
            EngineKind::Tex => History::FatalError.code(),
            EngineKind::Bibtex | EngineKind::Dvipdfmx => HARD_FAILURE,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            EngineKind::Tex => "TeX",
            EngineKind::Bibtex => "BibTeX",
            EngineKind::Dvipdfmx => "xdvipdfmx",
        }
    }
}

impl fmt::Display for EngineKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

macro_rules! opaque_handle {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, PartialEq, Eq, Hash)]
        pub struct $name(u32);

        impl $name {
            /// Wrap a host-chosen identifier.
            pub fn from_raw(id: u32) -> Self {
                Self(id)
            }

            /// The host-chosen identifier.
            pub fn raw(&self) -> u32 {
                self.0
            }
        }
    };
}

opaque_handle!(
    /// An open input resource. Owned by the host; consumed by `input_close`.
    InputHandle
);
opaque_handle!(
    /// An open output resource. Owned by the host; consumed by `output_close`.
    OutputHandle
);
opaque_handle!(
    /// A diagnostic under construction. Consumed by `diag_finish`.
    DiagnosticHandle
);

/// Severity of a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DiagnosticKind {
    Warning,
    Error,
}

/// Content digest produced by the host. Algorithm and width are the host's
/// choice.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Digest(Vec<u8>);

impl Digest {
    pub fn from_bytes(bytes: impl Into<Vec<u8>>) -> Self {
        Self(bytes.into())
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(&self.0))
    }
}

/// Engine-wide switches for the typesetting engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TexOptions {
    /// Upgrade errors to fatal errors
    pub halt_on_error: bool,
    /// Produce a format dump instead of a document
    pub initex_mode: bool,
    /// Produce SyncTeX data
    pub synctex: bool,
    /// Emit top-level boxes as they are built instead of running the page builder
    pub semantic_pagination: bool,
    /// Allow `\write18`
    pub shell_escape: bool,
}

impl Default for TexOptions {
    fn default() -> Self {
        Self {
            halt_on_error: true,
            initex_mode: false,
            synctex: false,
            semantic_pagination: false,
            shell_escape: false,
        }
    }
}

/// Arguments of the typesetting entry point.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TexArgs {
    /// Name of the compiled format dump to load
    pub dump_name: String,
    /// Name of the primary input as the engine should see it
    pub input_name: String,
    /// Build timestamp in Unix seconds
    pub build_date: i64,
    pub options: TexOptions,
}

/// Arguments of the page-conversion entry point.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DvipdfmxArgs {
    pub dvi_path: String,
    pub pdf_path: String,
    /// Compress PDF streams
    pub compress: bool,
    /// Generate deterministic font subset tags
    pub deterministic_tags: bool,
    /// Build timestamp in Unix seconds
    pub build_date: i64,
}

/// Arguments of the bibliography entry point.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BibtexArgs {
    pub aux_file_name: String,
}
