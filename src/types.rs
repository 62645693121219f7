//! Shared types: [`FormatVariant`], [`BaykalVersion`], [`SampleWidth`] and [`Probe`].

use std::fmt;

/// Supported data-logger families.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FormatVariant {
    /// SDAS recorder: INI-style text header, block/fragment data.
    Sdas,
    /// GeoInstr Smart24 continuous file: binary frame with per-channel subframes.
    Smart24,
    /// Symmetric Research `.out` samples with a sibling `vdaq.txt`.
    Symres,
    /// Baykal XX: fixed binary general header selected by version.
    Baykal(BaykalVersion),
}

impl FormatVariant {
    /// Short lowercase name, stable across releases.
    pub fn name(self) -> &'static str {
        match self {
            Self::Sdas => "sdas",
            Self::Smart24 => "smart24",
            Self::Symres => "symres",
            Self::Baykal(_) => "baykal",
        }
    }
}

impl fmt::Display for FormatVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sdas => write!(f, "SDAS"),
            Self::Smart24 => write!(f, "Smart24"),
            Self::Symres => write!(f, "Symmetric Research"),
            Self::Baykal(v) => write!(f, "Baykal XX {v}"),
        }
    }
}

/// Baykal XX general-header versions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BaykalVersion {
    /// Version 53, fully decoded.
    V53,
    /// Version 60, recognized only.
    V60,
}

impl BaykalVersion {
    pub fn from_code(code: u16) -> Option<Self> {
        match code {
            53 => Some(Self::V53),
            60 => Some(Self::V60),
            _ => None,
        }
    }

    pub fn to_code(self) -> u16 {
        match self {
            Self::V53 => 53,
            Self::V60 => 60,
        }
    }
}

impl fmt::Display for BaykalVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}", self.to_code())
    }
}

/// Width of one stored sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SampleWidth {
    /// 16-bit signed little-endian.
    Int16,
    /// 32-bit signed little-endian.
    Int32,
}

impl SampleWidth {
    pub fn bytes(self) -> usize {
        match self {
            Self::Int16 => 2,
            Self::Int32 => 4,
        }
    }

    pub fn bits(self) -> u8 {
        match self {
            Self::Int16 => 16,
            Self::Int32 => 32,
        }
    }
}

impl fmt::Display for SampleWidth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int16 => write!(f, "INT16"),
            Self::Int32 => write!(f, "INT32"),
        }
    }
}

/// Outcome of a format probe.
///
/// `Unsupported` means the container was recognized but holds a kind of
/// recording that has no decode path. It is kept apart from `NoMatch` so
/// callers can tell "not this format" from "this format, but not readable".
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Probe {
    Match,
    NoMatch,
    Unsupported(String),
}

impl Probe {
    pub fn is_match(&self) -> bool {
        matches!(self, Self::Match)
    }
}
