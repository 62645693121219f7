//! Symmetric Research `.out` recordings.
//!
//! The `.out` file is nothing but interleaved 32-bit little-endian samples.
//! Station, rate and channel names live in a sibling `vdaq.txt` of
//! `key:value` lines. Column 0 is the logger's time channel: its first four
//! values encode the start second (see [`time::split_word_seconds`]) and it
//! is not returned as a trace.
//!
//! The time channel is known only by its position. Nothing in `vdaq.txt`
//! names it, so the `ChN` entries describe columns `1..Channels`.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::assemble;
use crate::demux::{self, InterleaveLayout};
use crate::record::{ChannelDescriptor, GlobalMetadata, Header, Samples, TraceRecord};
use crate::time::{self, TimeBase};
use crate::types::{FormatVariant, Probe, SampleWidth};
use crate::{DataloggerError, Result};

/// Default name of the companion metadata file.
pub const COMPANION_FILE: &str = "vdaq.txt";
/// Default correction value above which the start second is taken back by one.
pub const DEFAULT_ROLLOVER_THRESHOLD: i32 = 360;
/// Column holding the time channel.
pub const TIME_CHANNEL_SLOT: usize = 0;
const TIME_WORDS: usize = 4;
const DATA_EXTENSION: &str = "out";

/// Decoding options.
///
/// # Example
///
/// ```
/// use datalogger_rs::symres::SymresOptions;
///
/// let opts = SymresOptions::default().with_rollover_threshold(350);
/// assert_eq!(opts.rollover_threshold, 350);
/// assert_eq!(opts.companion_file, "vdaq.txt");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SymresOptions {
    /// Correction values above this mark a rolled-over second.
    pub rollover_threshold: i32,
    /// File name of the companion metadata, looked up beside the data file.
    pub companion_file: String,
}

impl Default for SymresOptions {
    fn default() -> Self {
        Self {
            rollover_threshold: DEFAULT_ROLLOVER_THRESHOLD,
            companion_file: COMPANION_FILE.into(),
        }
    }
}

impl SymresOptions {
    /// Set the correction threshold used by a particular logger revision.
    pub fn with_rollover_threshold(mut self, threshold: i32) -> Self {
        self.rollover_threshold = threshold;
        self
    }

    pub fn with_companion_file(mut self, name: impl Into<String>) -> Self {
        self.companion_file = name.into();
        self
    }

    fn companion_path(&self, data_path: &Path) -> PathBuf {
        data_path
            .parent()
            .unwrap_or_else(|| Path::new("."))
            .join(&self.companion_file)
    }
}

/// Contents of `vdaq.txt`.
#[derive(Debug, Clone, PartialEq)]
pub struct VdaqInfo {
    pub sample_rate: f64,
    pub station: String,
    /// Column count of the data file, time channel included.
    pub columns: usize,
    /// Names of columns `1..columns`.
    pub channel_ids: Vec<String>,
}

impl VdaqInfo {
    /// Parse `key:value` lines. Keys are taken up to the first colon and
    /// values up to the next one; lines without a colon are ignored.
    pub fn parse(text: &str) -> Result<Self> {
        let fields: HashMap<&str, &str> = text
            .lines()
            .filter_map(|line| {
                let mut parts = line.split(':');
                let key = parts.next()?.trim();
                let value = parts.next()?.trim();
                Some((key, value))
            })
            .collect();

        let get = |key: &str| {
            fields
                .get(key)
                .copied()
                .ok_or_else(|| {
                    DataloggerError::malformed(format!("{COMPANION_FILE} lacks {key}"))
                })
        };

        let rate_text = get("SampleRate")?;
        let sample_rate: f64 = rate_text
            .parse()
            .map_err(|_| DataloggerError::malformed(format!("SampleRate {rate_text:?}")))?;
        let station = get("A-DInfo")?.to_string();
        let count_text = get("Channels")?;
        let columns: usize = count_text
            .parse()
            .map_err(|_| DataloggerError::malformed(format!("Channels {count_text:?}")))?;
        if columns <= TIME_CHANNEL_SLOT {
            return Err(DataloggerError::malformed("no time channel column"));
        }
        let channel_ids = (1..columns)
            .map(|n| get(&format!("Ch{n}ID")).map(String::from))
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            sample_rate,
            station,
            columns,
            channel_ids,
        })
    }
}

/// Matches `*.out` files that have a companion file beside them.
pub fn probe(path: &Path) -> Result<Probe> {
    probe_with(path, &SymresOptions::default())
}

pub fn probe_with(path: &Path, options: &SymresOptions) -> Result<Probe> {
    let has_extension = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case(DATA_EXTENSION));
    if has_extension && options.companion_path(path).is_file() {
        Ok(Probe::Match)
    } else {
        Ok(Probe::NoMatch)
    }
}

pub fn detect(path: &Path) -> Result<bool> {
    Ok(probe(path)?.is_match())
}

pub fn parse_header(path: &Path) -> Result<Header> {
    let (vdaq, data) = load(path, &SymresOptions::default())?;
    let (header, _) = parse(&vdaq, &data, &SymresOptions::default())?;
    Ok(header)
}

pub fn decode(path: &Path) -> Result<Vec<TraceRecord>> {
    decode_with(path, &SymresOptions::default())
}

pub fn decode_with(path: &Path, options: &SymresOptions) -> Result<Vec<TraceRecord>> {
    let (vdaq, data) = load(path, options)?;
    decode_parts(&vdaq, &data, options)
}

/// Decode from the companion text and the raw sample bytes.
pub fn decode_parts(
    vdaq: &str,
    data: &[u8],
    options: &SymresOptions,
) -> Result<Vec<TraceRecord>> {
    let (header, mut columns) = parse(vdaq, data, options)?;
    columns.remove(TIME_CHANNEL_SLOT);
    assemble::package(&header, columns)
}

fn load(path: &Path, options: &SymresOptions) -> Result<(String, Vec<u8>)> {
    let companion = options.companion_path(path);
    if !companion.is_file() {
        return Err(DataloggerError::MissingCompanionFile(companion));
    }
    let vdaq = String::from_utf8_lossy(&std::fs::read(&companion)?).into_owned();
    let data = std::fs::read(path)?;
    Ok((vdaq, data))
}

/// Parse metadata, demultiplex every column and decode the start time.
fn parse(vdaq: &str, data: &[u8], options: &SymresOptions) -> Result<(Header, Vec<Samples>)> {
    let info = VdaqInfo::parse(vdaq)?;
    let layout = InterleaveLayout::columns_for(info.columns, SampleWidth::Int32, data.len())?;
    let columns = demux::demux_columns(data, &layout)?;

    let time_words = columns[TIME_CHANNEL_SLOT].to_i32();
    if time_words.len() < TIME_WORDS {
        return Err(DataloggerError::TruncatedData {
            expected: TIME_WORDS * layout.block_size,
            actual: data.len(),
        });
    }
    let seconds = time::split_word_seconds(
        time_words[0],
        time_words[1],
        time_words[2],
        time_words[3],
        options.rollover_threshold,
    );
    let start = time::from_epoch_seconds(seconds)?;

    debug!(
        station = %info.station,
        columns = info.columns,
        rows = layout.block_count,
        start = %start,
        "parsed Symmetric Research recording"
    );

    let channels = info
        .channel_ids
        .iter()
        .enumerate()
        .map(|(i, id)| ChannelDescriptor::new(i + 1, id.clone(), info.sample_rate))
        .collect();
    let meta = GlobalMetadata::new(FormatVariant::Symres, info.station.clone());
    let header = Header::new(meta, channels, layout, TimeBase::fixed(start))?;
    Ok((header, columns))
}
