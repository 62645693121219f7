//! Format registry: detection order and per-variant dispatch.
//!
//! Every format module exposes the same surface (`probe`/`detect`,
//! `parse_header`, `decode`). [`FormatVariant`] selects among them with a
//! plain `match`, and [`identify`] walks [`DETECTION_ORDER`] to find the
//! first format that claims a file.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use tracing::debug;

use crate::record::{Header, TraceRecord};
use crate::types::{BaykalVersion, FormatVariant, Probe};
use crate::{DataloggerError, Result, baykal, sdas, smart24, symres};

/// Order in which [`identify`] probes formats.
///
/// Formats with textual or multi-field magic go first; the sibling-file
/// check of the Symmetric Research format is last because it says nothing
/// about the file contents.
pub const DETECTION_ORDER: [FormatVariant; 4] = [
    FormatVariant::Sdas,
    FormatVariant::Smart24,
    FormatVariant::Baykal(BaykalVersion::V53),
    FormatVariant::Symres,
];

impl FormatVariant {
    /// Probe `path` for this variant's family.
    ///
    /// Baykal probes accept any recognized version regardless of the
    /// version carried by `self`.
    pub fn probe(self, path: &Path) -> Result<Probe> {
        match self {
            Self::Sdas => sdas::probe(path),
            Self::Smart24 => smart24::probe(path),
            Self::Symres => symres::probe(path),
            Self::Baykal(_) => baykal::probe(path),
        }
    }

    pub fn parse_header(self, path: &Path) -> Result<Header> {
        match self {
            Self::Sdas => sdas::parse_header(&std::fs::read(path)?),
            Self::Smart24 => smart24::parse_header(&std::fs::read(path)?),
            Self::Symres => symres::parse_header(path),
            Self::Baykal(_) => baykal::parse_header(&std::fs::read(path)?),
        }
    }

    pub fn decode(self, path: &Path) -> Result<Vec<TraceRecord>> {
        match self {
            Self::Sdas => sdas::decode(path),
            Self::Smart24 => smart24::decode(path),
            Self::Symres => symres::decode(path),
            Self::Baykal(_) => baykal::decode(path),
        }
    }
}

/// Find the format of `path`.
///
/// Returns [`DataloggerError::UnrecognizedFormat`] when no format claims the
/// file. A format that recognizes its container but not the kind of
/// recording inside ([`Probe::Unsupported`]) ends the search with
/// [`DataloggerError::UnsupportedFeature`].
pub fn identify(path: &Path) -> Result<FormatVariant> {
    for variant in DETECTION_ORDER {
        match variant.probe(path)? {
            Probe::Match => {
                let found = match variant {
                    FormatVariant::Baykal(_) => baykal::version(path)?
                        .map(FormatVariant::Baykal)
                        .ok_or(DataloggerError::UnrecognizedFormat)?,
                    other => other,
                };
                debug!(path = %path.display(), format = %found, "identified format");
                return Ok(found);
            }
            Probe::Unsupported(reason) => {
                return Err(DataloggerError::UnsupportedFeature(format!("{variant}: {reason}")));
            }
            Probe::NoMatch => {}
        }
    }
    Err(DataloggerError::UnrecognizedFormat)
}

/// Identify and decode `path` in one call.
pub fn read(path: &Path) -> Result<Vec<TraceRecord>> {
    identify(path)?.decode(path)
}

/// Read at most `limit` bytes from the start of `path`.
pub(crate) fn read_prefix(path: &Path, limit: usize) -> Result<Vec<u8>> {
    let mut buf = Vec::with_capacity(limit);
    File::open(path)?.take(limit as u64).read_to_end(&mut buf)?;
    Ok(buf)
}
