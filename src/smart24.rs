//! GeoInstr Smart24 continuous files.
//!
//! A file starts with one 72-byte frame header and a channel string table,
//! followed by frames of `channels_number` subframes until end of file.
//! Every subframe is a 116-byte header (description, time, status), a
//! payload of 32-bit little-endian samples and a 12-byte footer. Each frame
//! covers exactly 60 seconds.

use std::path::Path;

use chrono::TimeDelta;
use tracing::{debug, trace};

use crate::assemble::{self, FrameChannel};
use crate::demux::{self, InterleaveLayout};
use crate::format::read_prefix;
use crate::reader::ByteReader;
use crate::record::{
    Calibration, ChannelDescriptor, ChannelStatus, Coordinates, GlobalMetadata, Header,
    TraceRecord,
};
use crate::time::{self, TimeBase};
use crate::types::{FormatVariant, Probe, SampleWidth};
use crate::{DataloggerError, Result};

/// Frame type of a data frame.
pub const FRAME_TYPE_DATA: i32 = 5;
/// File-kind tag of a continuous recording.
pub const CONTINUOUS_TAG: &[u8; 8] = b"FILE_CON";
const FILE_TAG_PREFIX: &[u8] = b"FILE_";
/// Bytes read by the probe.
pub const PROBE_LEN: usize = 24;
/// Required subframe time length, milliseconds.
pub const TIME_LENGTH_MS: i32 = 60_000;
/// Required size of the subframe status block.
pub const STATUS_SIZE: i32 = 48;
/// Footer after every subframe payload.
pub const SUBFRAME_FOOTER_LEN: usize = 12;
const CHANNEL_STRING_LEN: usize = 10;
const FRAME_SECONDS: i64 = 60;

/// Leading frame header (72 bytes).
#[derive(Debug, Clone, PartialEq)]
pub struct FrameHeader {
    pub frame_type: i32,
    pub trailer_offset: i32,
    pub creator: String,
    pub destination: String,
    pub sequence: i64,
    pub series: i32,
    pub auth_key: i32,
    pub channels_number: i32,
    pub frame_length: i32,
    pub nominal_time: String,
    pub string_count: i32,
}

impl FrameHeader {
    pub const SIZE: usize = 72;

    pub fn read(r: &mut ByteReader<'_>) -> Result<Self> {
        Ok(Self {
            frame_type: r.read_i32()?,
            trailer_offset: r.read_i32()?,
            creator: r.read_text(8)?,
            destination: r.read_text(8)?,
            sequence: r.read_i64()?,
            series: r.read_i32()?,
            auth_key: r.read_i32()?,
            channels_number: r.read_i32()?,
            frame_length: r.read_i32()?,
            nominal_time: r.read_text(20)?,
            string_count: r.read_i32()?,
        })
    }
}

/// One `site/channel/location` entry of the channel string table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelString {
    pub site: String,
    pub channel: String,
    pub location: String,
}

/// Per-subframe channel description (24 bytes).
#[derive(Debug, Clone, PartialEq)]
pub struct ChannelDescription {
    pub authentication: i8,
    pub transformation: i8,
    pub sensor_type: i8,
    pub flag: i8,
    pub site: String,
    pub channel: String,
    pub location: String,
    pub data_format: String,
    pub calib: f32,
    pub calper: f32,
}

impl ChannelDescription {
    fn read(r: &mut ByteReader<'_>) -> Result<Self> {
        Ok(Self {
            authentication: r.read_i8()?,
            transformation: r.read_i8()?,
            sensor_type: r.read_i8()?,
            flag: r.read_i8()?,
            site: r.read_text(5)?,
            channel: r.read_text(3)?,
            location: r.read_text(2)?,
            data_format: r.read_text(2)?,
            calib: r.read_f32()?,
            calper: r.read_f32()?,
        })
    }
}

/// Fixed part of a channel subframe (116 bytes).
#[derive(Debug, Clone, PartialEq)]
pub struct SubframeHeader {
    pub channel_length: i32,
    pub auth_offset: i32,
    pub description: ChannelDescription,
    pub timestamp: String,
    pub time_length: i32,
    pub npts: i32,
    pub status_size: i32,
    pub status: ChannelStatus,
    pub data_size: i32,
}

impl SubframeHeader {
    pub const SIZE: usize = 116;

    pub fn read(r: &mut ByteReader<'_>) -> Result<Self> {
        let channel_length = r.read_i32()?;
        let auth_offset = r.read_i32()?;
        let description = ChannelDescription::read(r)?;
        let timestamp = r.read_text(20)?;
        let time_length = r.read_i32()?;
        let npts = r.read_i32()?;
        let status_size = r.read_i32()?;
        let status = ChannelStatus {
            status: r.read_text(8)?,
            gps_sync: r.read_text(20)?,
            clock_diff: r.read_i32()?,
            coordinates: {
                let latitude = r.read_f32()? as f64;
                let longitude = r.read_f32()? as f64;
                let altitude = r.read_f32()? as f64;
                Coordinates {
                    latitude,
                    longitude,
                    altitude: Some(altitude),
                }
            },
            lsb: r.read_f32()?,
        };
        let data_size = r.read_i32()?;
        Ok(Self {
            channel_length,
            auth_offset,
            description,
            timestamp,
            time_length,
            npts,
            status_size,
            status,
            data_size,
        })
    }

    /// Reject subframes this decoder cannot read.
    pub fn validate(&self) -> Result<()> {
        if self.description.authentication != 0 {
            return Err(DataloggerError::unsupported("subframe authentication"));
        }
        if self.description.transformation != 0 {
            return Err(DataloggerError::unsupported("subframe transformation"));
        }
        if self.time_length != TIME_LENGTH_MS {
            return Err(DataloggerError::malformed(format!(
                "subframe time length {} != {TIME_LENGTH_MS}",
                self.time_length
            )));
        }
        if self.status_size != STATUS_SIZE {
            return Err(DataloggerError::malformed(format!(
                "channel status size {} != {STATUS_SIZE}",
                self.status_size
            )));
        }
        if self.data_size < 0 || self.data_size % 4 != 0 {
            return Err(DataloggerError::malformed(format!(
                "subframe data size {} is not a whole number of samples",
                self.data_size
            )));
        }
        if self.npts < 0 {
            return Err(DataloggerError::malformed(format!("negative sample count {}", self.npts)));
        }
        Ok(())
    }

    pub fn sample_rate(&self) -> f64 {
        self.npts as f64 / FRAME_SECONDS as f64
    }

    fn descriptor(&self, index: usize) -> ChannelDescriptor {
        let d = &self.description;
        ChannelDescriptor::new(index, d.channel.clone(), self.sample_rate())
            .with_location(d.location.clone())
            .with_calibration(Calibration {
                factor: d.calib,
                period: d.calper,
            })
    }
}

pub fn probe(path: &Path) -> Result<Probe> {
    Ok(probe_bytes(&read_prefix(path, PROBE_LEN)?))
}

/// Probe the first bytes of a file.
///
/// A data frame whose destination tag starts with `FILE_` is a Smart24
/// file; anything but `FILE_CON` is a non-continuous kind this crate does
/// not decode and is reported as [`Probe::Unsupported`].
pub fn probe_bytes(prefix: &[u8]) -> Probe {
    if prefix.len() < PROBE_LEN {
        return Probe::NoMatch;
    }
    let mut r = ByteReader::new(prefix);
    let (Ok(frame_type), Ok(trailer_offset)) = (r.read_i32(), r.read_i32()) else {
        return Probe::NoMatch;
    };
    let tag = &prefix[16..24];
    if frame_type != FRAME_TYPE_DATA || trailer_offset < 0 || !tag.starts_with(FILE_TAG_PREFIX) {
        return Probe::NoMatch;
    }
    if tag != CONTINUOUS_TAG {
        return Probe::Unsupported(format!(
            "only continuous recordings can be read, found {:?}",
            String::from_utf8_lossy(tag)
        ));
    }
    Probe::Match
}

/// Probe as a yes/no answer.
///
/// A recognized non-continuous file is an error here, not `false`.
pub fn detect(path: &Path) -> Result<bool> {
    match probe(path)? {
        Probe::Match => Ok(true),
        Probe::NoMatch => Ok(false),
        Probe::Unsupported(reason) => Err(DataloggerError::UnsupportedFeature(reason)),
    }
}

pub fn parse_header(data: &[u8]) -> Result<Header> {
    let parsed = parse(data)?;
    let cn = parsed.channels_number;
    if !parsed.pieces.len().is_multiple_of(cn) {
        return Err(DataloggerError::malformed(format!(
            "{} subframes do not fill frames of {cn} channels",
            parsed.pieces.len()
        )));
    }
    let frames = parsed.pieces.len() / cn;
    let channels = parsed
        .pieces
        .iter()
        .take(cn)
        .map(|p| p.descriptor.clone())
        .collect();
    let layout = InterleaveLayout::subframes(cn, SampleWidth::Int32, frames, SUBFRAME_FOOTER_LEN);
    Header::new(parsed.metadata(), channels, layout, parsed.time_base)
}

pub fn decode(path: &Path) -> Result<Vec<TraceRecord>> {
    let data = std::fs::read(path)?;
    decode_bytes(&data)
}

pub fn decode_bytes(data: &[u8]) -> Result<Vec<TraceRecord>> {
    let parsed = parse(data)?;
    let merged = assemble::merge_frames(parsed.pieces, parsed.channels_number)?;
    Ok(assemble::frame_traces(
        FormatVariant::Smart24,
        &parsed.time_base,
        merged,
    ))
}

struct Parsed {
    frame: FrameHeader,
    strings: Vec<ChannelString>,
    channels_number: usize,
    time_base: TimeBase,
    pieces: Vec<FrameChannel>,
}

impl Parsed {
    fn metadata(&self) -> GlobalMetadata {
        let station = self
            .strings
            .first()
            .map(|s| s.site.clone())
            .or_else(|| self.pieces.first().map(|p| p.station.clone()))
            .unwrap_or_default();
        let mut meta = GlobalMetadata::new(FormatVariant::Smart24, station);
        meta.creator = Some(self.frame.creator.clone());
        meta.coordinates = self
            .pieces
            .first()
            .and_then(|p| p.status.as_ref())
            .map(|s| s.coordinates);
        meta
    }
}

fn parse(data: &[u8]) -> Result<Parsed> {
    let mut r = ByteReader::new(data);
    let frame = FrameHeader::read(&mut r)?;
    if frame.frame_type != FRAME_TYPE_DATA {
        return Err(DataloggerError::malformed(format!(
            "frame type {} is not a data frame",
            frame.frame_type
        )));
    }
    if frame.auth_key != 0 {
        return Err(DataloggerError::unsupported("frame authentication"));
    }
    let channels_number = usize::try_from(frame.channels_number)
        .ok()
        .filter(|&n| n > 0)
        .ok_or_else(|| {
            DataloggerError::malformed(format!("channel count {}", frame.channels_number))
        })?;
    let strings = read_channel_strings(&mut r, frame.string_count)?;
    let start = time::parse_nominal_time(&frame.nominal_time)?;
    let time_base = TimeBase::framed(start, TimeDelta::seconds(FRAME_SECONDS));

    debug!(
        creator = %frame.creator,
        channels = channels_number,
        strings = strings.len(),
        start = %start,
        "parsed Smart24 frame header"
    );

    let layout =
        InterleaveLayout::subframes(channels_number, SampleWidth::Int32, 0, SUBFRAME_FOOTER_LEN);
    let mut pieces = Vec::new();
    while !r.is_empty() {
        let offset = r.position();
        let sub = SubframeHeader::read(&mut r)?;
        sub.validate()?;
        let samples = demux::read_subframe_payload(&mut r, sub.data_size as usize, &layout)?;
        trace!(
            offset,
            channel = %sub.description.channel,
            npts = sub.npts,
            samples = samples.len(),
            "read subframe"
        );
        let slot = pieces.len() % channels_number;
        pieces.push(FrameChannel {
            station: sub.description.site.clone(),
            descriptor: sub.descriptor(slot + 1),
            status: Some(sub.status),
            samples,
        });
    }

    Ok(Parsed {
        frame,
        strings,
        channels_number,
        time_base,
        pieces,
    })
}

/// Read `string_count / 10` entries, then skip the table's padding to the
/// next 4-byte boundary.
fn read_channel_strings(
    r: &mut ByteReader<'_>,
    string_count: i32,
) -> Result<Vec<ChannelString>> {
    let table_len = usize::try_from(string_count)
        .map_err(|_| DataloggerError::malformed(format!("channel string count {string_count}")))?;
    let entries = table_len / CHANNEL_STRING_LEN;
    let strings = (0..entries)
        .map(|_| {
            Ok(ChannelString {
                site: r.read_text(5)?,
                channel: r.read_text(3)?,
                location: r.read_text(2)?,
            })
        })
        .collect::<Result<Vec<_>>>()?;
    r.skip(table_len.next_multiple_of(4) - entries * CHANNEL_STRING_LEN)?;
    Ok(strings)
}
