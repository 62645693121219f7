//! SDAS continuous recordings.
//!
//! An SDAS file opens with an INI-style text header. Its first 98 bytes
//! always contain a `[HEADER]` section declaring `HEADER_SIZE` and
//! `OFFSET_TO_DATA`; the full header is then re-read from offset 0. The data
//! region is a run of blocks, each a 256-byte preamble followed by one
//! fragment of unsigned 16-bit little-endian samples per channel. Samples are
//! returned widened to `i32`. The preamble of the first block carries the
//! recording start time.

use std::collections::HashMap;
use std::path::Path;
use std::str::FromStr;

use tracing::debug;

use crate::assemble;
use crate::demux::{self, InterleaveLayout};
use crate::format::read_prefix;
use crate::reader::ByteReader;
use crate::record::{ChannelDescriptor, GlobalMetadata, Header, Samples, TraceRecord};
use crate::time::{self, TimeBase};
use crate::types::{FormatVariant, Probe, SampleWidth};
use crate::{DataloggerError, Result};

/// Size of the header prefix that declares the full header size.
pub const PREFIX_LEN: usize = 98;
/// Fixed preamble at the start of every data block.
pub const PREAMBLE_LEN: usize = 256;
/// Offset of the start-time fields inside the first preamble.
const PREAMBLE_TIME_OFFSET: usize = 8;

pub fn probe(path: &Path) -> Result<Probe> {
    let prefix = read_prefix(path, PREFIX_LEN)?;
    Ok(probe_bytes(&prefix))
}

/// Probe an in-memory header prefix.
pub fn probe_bytes(prefix: &[u8]) -> Probe {
    let prefix = &prefix[..prefix.len().min(PREFIX_LEN)];
    match IniText::parse(prefix, true) {
        Ok(ini) if ini.has("HEADER", "OFFSET_TO_DATA") => Probe::Match,
        _ => Probe::NoMatch,
    }
}

pub fn detect(path: &Path) -> Result<bool> {
    Ok(probe(path)?.is_match())
}

/// Parse the text header and the start time from the first block preamble.
pub fn parse_header(data: &[u8]) -> Result<Header> {
    parse(data).map(|(header, _)| header)
}

pub fn decode(path: &Path) -> Result<Vec<TraceRecord>> {
    let data = std::fs::read(path)?;
    decode_bytes(&data)
}

pub fn decode_bytes(data: &[u8]) -> Result<Vec<TraceRecord>> {
    let (header, data_offset) = parse(data)?;
    let region = data.get(data_offset..).ok_or(DataloggerError::TruncatedData {
        expected: data_offset,
        actual: data.len(),
    })?;
    let sequences = demux::demux_blocks(region, &header.layout)?
        .into_iter()
        .map(Samples::widen_unsigned)
        .collect();
    assemble::package(&header, sequences)
}

fn parse(data: &[u8]) -> Result<(Header, usize)> {
    let mut reader = ByteReader::new(data);

    // Stage one: the fixed-size prefix declares the header size.
    let prefix = reader.read_bytes(PREFIX_LEN.min(data.len()))?;
    let ini = IniText::parse(prefix, true)?;
    let header_size: usize = ini.get_parsed("HEADER", "HEADER_SIZE")?;
    let data_offset: usize = ini.get_parsed("HEADER", "OFFSET_TO_DATA")?;
    if header_size < PREFIX_LEN {
        return Err(DataloggerError::malformed(format!(
            "HEADER_SIZE {header_size} smaller than the {PREFIX_LEN}-byte prefix"
        )));
    }

    // Stage two: re-read the whole header at its declared size.
    reader.seek(0)?;
    let ini = IniText::parse(reader.read_bytes(header_size - PREFIX_LEN)?, false)?;

    let station = ini.get("SYSTEM", "NAME")?.to_string();
    let group_count: u32 = ini.get_parsed("SYSTEM", "N_GROUP")?;
    let stream = ini.get("FILE", "STREAM")?.to_string();
    let stream_section = format!("STREAM{stream}");
    let fragment_secs: u64 = ini.get_parsed(&stream_section, "REC_SIZE_SEC")?;
    let total_secs: u64 = ini.get_parsed(&stream_section, "FILE_SIZE_SEC")?;
    let stream_channels = id_list(ini.get(&stream_section, "CH#")?);

    let groups = (1..=group_count)
        .map(|g| {
            let section = format!("GROUP{g}");
            let freq: u32 = ini.get_parsed(&section, "FREQ")?;
            Ok((freq, id_list(ini.get(&section, "CH#")?)))
        })
        .collect::<Result<Vec<_>>>()?;

    let mut channels = Vec::with_capacity(stream_channels.len());
    for (i, id) in stream_channels.iter().enumerate() {
        let name = ini.get(&format!("CH{id}"), "NAME")?;
        let mut rates = groups
            .iter()
            .filter(|(_, members)| members.contains(id))
            .map(|(freq, _)| *freq);
        let freq = match (rates.next(), rates.next()) {
            (Some(freq), None) => freq,
            (None, _) => {
                return Err(DataloggerError::malformed(format!(
                    "channel {id} belongs to no group"
                )));
            }
            (Some(_), Some(_)) => {
                return Err(DataloggerError::malformed(format!(
                    "channel {id} belongs to more than one group"
                )));
            }
        };
        channels.push(ChannelDescriptor::new(i + 1, name, freq as f64));
    }
    if channels.is_empty() {
        return Err(DataloggerError::malformed(format!(
            "{stream_section} lists no channels"
        )));
    }

    if fragment_secs == 0 || !total_secs.is_multiple_of(fragment_secs) {
        return Err(DataloggerError::malformed(format!(
            "file duration {total_secs} s is not a whole number of {fragment_secs} s fragments"
        )));
    }
    let block_count = usize::try_from(total_secs / fragment_secs)
        .map_err(|_| DataloggerError::malformed(format!("{total_secs} s of blocks")))?;

    // Fragments within a block share one size.
    let fragment_size = fragment_bytes(channels[0].sample_rate, fragment_secs)?;
    let mut odd = None;
    for ch in &channels[1..] {
        if fragment_bytes(ch.sample_rate, fragment_secs)? != fragment_size {
            odd = Some(ch);
            break;
        }
    }
    if let Some(odd) = odd {
        return Err(DataloggerError::malformed(format!(
            "channel {} runs at {} Hz, unlike {} at {} Hz",
            odd.name,
            odd.sample_rate,
            channels[0].name,
            channels[0].sample_rate
        )));
    }
    let layout = InterleaveLayout::blocks(
        channels.len(),
        SampleWidth::Int16,
        PREAMBLE_LEN,
        fragment_size,
        block_count,
    )?;
    layout.validate()?;

    reader.seek(data_offset)?;
    reader.skip(PREAMBLE_TIME_OFFSET)?;
    let start = read_preamble_time(&mut reader)?;

    debug!(
        station = %station,
        channels = channels.len(),
        blocks = block_count,
        fragment_size,
        data_offset,
        start = %start,
        "parsed SDAS header"
    );

    let mut meta = GlobalMetadata::new(FormatVariant::Sdas, station);
    meta.stream = Some(stream);
    meta.group_count = Some(group_count);
    let header = Header::new(meta, channels, layout, TimeBase::fixed(start))?;
    Ok((header, data_offset))
}

fn fragment_bytes(sample_rate: f64, fragment_secs: u64) -> Result<usize> {
    usize::try_from(fragment_secs)
        .ok()
        .and_then(|secs| (sample_rate as usize).checked_mul(secs))
        .and_then(|n| n.checked_mul(SampleWidth::Int16.bytes()))
        .ok_or_else(|| {
            DataloggerError::malformed(format!(
                "{fragment_secs} s fragments at {sample_rate} Hz overflow the block size"
            ))
        })
}

/// Day, month, year, hour, minute, second, millisecond as LE i16 fields.
fn read_preamble_time(reader: &mut ByteReader<'_>) -> Result<chrono::DateTime<chrono::Utc>> {
    let mut fields = [0u32; 7];
    for field in &mut fields {
        let raw = reader.read_i16()?;
        *field = u32::try_from(raw)
            .map_err(|_| DataloggerError::malformed(format!("negative time field {raw}")))?;
    }
    let [day, month, year, hour, minute, second, millis] = fields;
    time::calendar(year as i32, month, day, hour, minute, second, millis)
}

fn id_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

/// Minimal INI reader for SDAS headers.
///
/// Keys are case-insensitive, section names are not. Lines may use `=` or
/// `:` as separator; `#` and `;` start comment lines. Text ends at the first
/// NUL byte.
#[derive(Debug, Default)]
struct IniText {
    sections: HashMap<String, HashMap<String, String>>,
}

impl IniText {
    /// Parse `raw`. A `prefix` is a cut taken from a longer header: its
    /// unterminated last line is dropped and unparseable lines are skipped.
    fn parse(raw: &[u8], prefix: bool) -> Result<Self> {
        let end = raw.iter().position(|&b| b == 0).unwrap_or(raw.len());
        let text = String::from_utf8_lossy(&raw[..end]);
        let mut lines: Vec<&str> = text.split('\n').collect();
        if prefix && end == raw.len() && !text.ends_with('\n') {
            lines.pop();
        }

        let mut ini = IniText::default();
        let mut current: Option<String> = None;
        for line in lines {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') || line.starts_with(';') {
                continue;
            }
            if let Some(name) = line.strip_prefix('[').and_then(|l| l.strip_suffix(']')) {
                let name = name.trim().to_string();
                ini.sections.entry(name.clone()).or_default();
                current = Some(name);
                continue;
            }
            let split = line.find(['=', ':']).map(|at| (&line[..at], &line[at + 1..]));
            match (split, &current) {
                (Some((key, value)), Some(section)) => {
                    ini.sections
                        .entry(section.clone())
                        .or_default()
                        .insert(key.trim().to_ascii_lowercase(), value.trim().to_string());
                }
                _ if prefix => {}
                _ => {
                    return Err(DataloggerError::malformed(format!(
                        "unparseable header line {line:?}"
                    )));
                }
            }
        }
        Ok(ini)
    }

    fn has(&self, section: &str, key: &str) -> bool {
        self.sections
            .get(section)
            .is_some_and(|s| s.contains_key(&key.to_ascii_lowercase()))
    }

    fn get(&self, section: &str, key: &str) -> Result<&str> {
        self.sections
            .get(section)
            .and_then(|s| s.get(&key.to_ascii_lowercase()))
            .map(String::as_str)
            .ok_or_else(|| DataloggerError::malformed(format!("missing [{section}] {key}")))
    }

    fn get_parsed<T: FromStr>(&self, section: &str, key: &str) -> Result<T> {
        let value = self.get(section, key)?;
        value.parse().map_err(|_| {
            DataloggerError::malformed(format!("[{section}] {key} = {value:?} is not a number"))
        })
    }
}
