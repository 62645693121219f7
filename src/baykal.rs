//! Baykal XX recordings.
//!
//! A 120-byte general header whose `version` field selects the layout.
//! Version 53 is followed by one 72-byte channel header per channel and then
//! 32-bit little-endian samples interleaved by row. Version 60 is recognized
//! but its layout is not decoded.

use std::path::Path;

use tracing::debug;

use crate::assemble;
use crate::demux::{self, InterleaveLayout};
use crate::format::read_prefix;
use crate::reader::ByteReader;
use crate::record::{
    ChannelDescriptor, Coordinates, GlobalMetadata, Header, SyncDiagnostics, TraceRecord,
};
use crate::time::{self, TimeBase};
use crate::types::{BaykalVersion, FormatVariant, Probe, SampleWidth};
use crate::{DataloggerError, Result};

const FORMAT_NAME: &str = "Baykal XX";

/// General header shared by every version (120 bytes).
///
/// Field names follow the v53 layout. In a v60 file only
/// `number_of_channel` and `version` are meaningful.
#[derive(Debug, Clone, PartialEq)]
pub struct GeneralHeader {
    pub number_of_channel: u16,
    pub test_type: u16,
    pub version: u16,
    pub day: u16,
    pub month: u16,
    pub year: u16,
    pub satellites: u16,
    pub end_invalid: u16,
    pub synchronize: u16,
    pub digits: u16,
    pub start_invalid: u16,
    pub constant: u16,
    pub acq_version: u16,
    pub system_freq: u16,
    pub max_criteria: u16,
    pub satellite_instart: u16,
    pub station_name: String,
    pub sample_period: f64,
    pub time_begin: f64,
    pub correction: f64,
    pub latitude: f64,
    pub longitude: f64,
    pub before_synch: u64,
    pub synch_point: u64,
    pub after_synch: u64,
    pub synch_point_start: u32,
}

impl GeneralHeader {
    pub const SIZE: usize = 120;

    pub fn read(r: &mut ByteReader<'_>) -> Result<Self> {
        let header = Self {
            number_of_channel: r.read_u16()?,
            test_type: r.read_u16()?,
            version: r.read_u16()?,
            day: r.read_u16()?,
            month: r.read_u16()?,
            year: r.read_u16()?,
            satellites: r.read_u16()?,
            end_invalid: r.read_u16()?,
            synchronize: r.read_u16()?,
            digits: r.read_u16()?,
            start_invalid: r.read_u16()?,
            constant: r.read_u16()?,
            acq_version: r.read_u16()?,
            system_freq: r.read_u16()?,
            max_criteria: r.read_u16()?,
            satellite_instart: r.read_u16()?,
            station_name: r.read_text(16)?,
            sample_period: r.read_f64()?,
            time_begin: r.read_f64()?,
            correction: r.read_f64()?,
            latitude: r.read_f64()?,
            longitude: r.read_f64()?,
            before_synch: r.read_u64()?,
            synch_point: r.read_u64()?,
            after_synch: r.read_u64()?,
            synch_point_start: r.read_u32()?,
        };
        r.skip(4)?;
        Ok(header)
    }

    /// Nominal sample rate, the inverse of `sample_period`.
    pub fn sample_rate(&self) -> Result<f64> {
        if self.sample_period.is_nan() || self.sample_period <= 0.0 {
            return Err(DataloggerError::malformed(format!(
                "sample period {} s is not positive",
                self.sample_period
            )));
        }
        Ok(1.0 / self.sample_period)
    }
}

/// Per-channel header of a v53 file (72 bytes).
#[derive(Debug, Clone, PartialEq)]
pub struct ChannelHeader {
    pub channel_number: i16,
    pub channel_name: String,
    pub channel_mark: String,
    pub channel_rate: f64,
}

impl ChannelHeader {
    pub const SIZE: usize = 72;

    pub fn read(r: &mut ByteReader<'_>) -> Result<Self> {
        let channel_number = r.read_i16()?;
        r.skip(6)?;
        let channel_name = r.read_text(24)?;
        let channel_mark = r.read_text(24)?;
        let channel_rate = r.read_f64()?;
        r.skip(8)?;
        Ok(Self {
            channel_number,
            channel_name,
            channel_mark,
            channel_rate,
        })
    }
}

pub fn probe(path: &Path) -> Result<Probe> {
    Ok(probe_bytes(&read_prefix(path, GeneralHeader::SIZE)?))
}

/// Check a version code and a plausible channel count. For v53 the date
/// fields must also be in range.
pub fn probe_bytes(prefix: &[u8]) -> Probe {
    match version_bytes(prefix) {
        Some(BaykalVersion::V60) => Probe::Match,
        Some(BaykalVersion::V53) => {
            let mut r = ByteReader::new(prefix);
            let plausible = GeneralHeader::read(&mut r)
                .is_ok_and(|h| (1..=12).contains(&h.month) && (1..=31).contains(&h.day));
            if plausible { Probe::Match } else { Probe::NoMatch }
        }
        None => Probe::NoMatch,
    }
}

pub fn detect(path: &Path) -> Result<bool> {
    Ok(probe(path)?.is_match())
}

/// Header version of `path`, or `None` if it is not a Baykal XX file.
pub fn version(path: &Path) -> Result<Option<BaykalVersion>> {
    let prefix = read_prefix(path, GeneralHeader::SIZE)?;
    Ok(match probe_bytes(&prefix) {
        Probe::Match => version_bytes(&prefix),
        _ => None,
    })
}

fn version_bytes(prefix: &[u8]) -> Option<BaykalVersion> {
    if prefix.len() < GeneralHeader::SIZE {
        return None;
    }
    let mut r = ByteReader::new(prefix);
    let channels = r.read_u16().ok()?;
    r.skip(2).ok()?;
    let code = r.read_u16().ok()?;
    if channels == 0 {
        return None;
    }
    BaykalVersion::from_code(code)
}

pub fn parse_header(data: &[u8]) -> Result<Header> {
    parse(data).map(|(header, _)| header)
}

pub fn decode(path: &Path) -> Result<Vec<TraceRecord>> {
    decode_bytes(&std::fs::read(path)?)
}

pub fn decode_bytes(data: &[u8]) -> Result<Vec<TraceRecord>> {
    let (header, offset) = parse(data)?;
    let sequences = demux::demux_columns(&data[offset..], &header.layout)?;
    assemble::package(&header, sequences)
}

/// Parse the general and channel headers. Returns the header and the offset
/// of the first sample.
fn parse(data: &[u8]) -> Result<(Header, usize)> {
    let mut r = ByteReader::new(data);
    let general = GeneralHeader::read(&mut r)?;
    match BaykalVersion::from_code(general.version) {
        Some(BaykalVersion::V53) => {}
        Some(BaykalVersion::V60) => {
            return Err(DataloggerError::UnsupportedVersion {
                format: FORMAT_NAME,
                version: general.version,
            });
        }
        None => {
            return Err(DataloggerError::malformed(format!(
                "unknown {FORMAT_NAME} version {}",
                general.version
            )));
        }
    }
    if general.number_of_channel == 0 {
        return Err(DataloggerError::malformed("zero channels"));
    }

    let sample_rate = general.sample_rate()?;
    let start = time::date_plus_seconds(
        i32::from(general.year),
        u32::from(general.month),
        u32::from(general.day),
        general.time_begin,
    )?;

    let channel_headers = (0..general.number_of_channel)
        .map(|_| ChannelHeader::read(&mut r))
        .collect::<Result<Vec<_>>>()?;
    let offset = r.position();

    let channels = channel_headers
        .iter()
        .enumerate()
        .map(|(i, ch)| ChannelDescriptor::new(i + 1, ch.channel_name.clone(), sample_rate))
        .collect();
    let layout = InterleaveLayout::columns_for(
        usize::from(general.number_of_channel),
        SampleWidth::Int32,
        data.len() - offset,
    )?;

    debug!(
        station = %general.station_name,
        channels = general.number_of_channel,
        sample_rate,
        start = %start,
        "parsed Baykal XX v53 header"
    );

    let mut meta = GlobalMetadata::new(
        FormatVariant::Baykal(BaykalVersion::V53),
        general.station_name.clone(),
    );
    meta.coordinates = Some(Coordinates {
        latitude: general.latitude,
        longitude: general.longitude,
        altitude: None,
    });
    meta.sync = Some(SyncDiagnostics {
        satellites: general.satellites,
        synchronized: general.synchronize != 0,
        correction: general.correction,
    });

    let header = Header::new(meta, channels, layout, TimeBase::fixed(start))?;
    Ok((header, offset))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::Samples;
    use chrono::{Datelike, Timelike};

    fn general(version: u16, channels: u16, period: f64) -> Vec<u8> {
        let mut out = Vec::with_capacity(GeneralHeader::SIZE);
        // number_of_channel, test_type, version, day, month, year, satellites
        for v in [channels, 0, version, 14, 7, 2016, 9] {
            out.extend_from_slice(&v.to_le_bytes());
        }
        // end_invalid, synchronize, then seven more u16 fields
        for v in [0u16, 1, 24, 0, 0, 0, 0, 0, 0] {
            out.extend_from_slice(&v.to_le_bytes());
        }
        let mut name = [0u8; 16];
        name[..4].copy_from_slice(b"BKL1");
        out.extend_from_slice(&name);
        // sample_period, time_begin, correction, latitude, longitude
        for v in [period, 3723.5, -0.002, 51.88, 104.82] {
            out.extend_from_slice(&v.to_le_bytes());
        }
        out.extend_from_slice(&[0u8; 3 * 8 + 4 + 4]);
        assert_eq!(out.len(), GeneralHeader::SIZE);
        out
    }

    fn channel(number: i16, name: &str) -> Vec<u8> {
        let mut out = Vec::with_capacity(ChannelHeader::SIZE);
        out.extend_from_slice(&number.to_le_bytes());
        out.extend_from_slice(&[0u8; 6]);
        let mut field = [0u8; 24];
        field[..name.len()].copy_from_slice(name.as_bytes());
        out.extend_from_slice(&field);
        out.extend_from_slice(&[0u8; 24]);
        out.extend_from_slice(&100.0f64.to_le_bytes());
        out.extend_from_slice(&[0u8; 8]);
        out
    }

    fn v53_file(rows: i32) -> Vec<u8> {
        let mut out = general(53, 3, 0.01);
        for (i, name) in ["N", "E", "Z"].iter().enumerate() {
            out.extend(channel(i as i16, name));
        }
        for r in 0..rows {
            for c in 0..3 {
                out.extend_from_slice(&(r * 10 + c).to_le_bytes());
            }
        }
        out
    }

    #[test]
    fn test_probe_versions() {
        assert_eq!(probe_bytes(&general(53, 3, 0.01)), Probe::Match);
        assert_eq!(probe_bytes(&general(60, 3, 0.01)), Probe::Match);
        assert_eq!(probe_bytes(&general(54, 3, 0.01)), Probe::NoMatch);
        assert_eq!(probe_bytes(&general(53, 0, 0.01)), Probe::NoMatch);
        assert_eq!(probe_bytes(&general(53, 3, 0.01)[..40]), Probe::NoMatch);
    }

    #[test]
    fn test_probe_rejects_bad_v53_date() {
        let mut head = general(53, 3, 0.01);
        head[8..10].copy_from_slice(&13u16.to_le_bytes());
        assert_eq!(probe_bytes(&head), Probe::NoMatch);
    }

    #[test]
    fn test_decode_v53() {
        let traces = decode_bytes(&v53_file(4)).unwrap();
        assert_eq!(traces.len(), 3);
        assert_eq!(traces[0].channel, "N");
        assert_eq!(traces[2].channel, "Z");
        assert_eq!(traces[0].station, "BKL1");
        assert_eq!(traces[0].format, FormatVariant::Baykal(BaykalVersion::V53));
        assert!((traces[0].sample_rate - 100.0).abs() < 1e-9);
        assert_eq!(traces[1].samples, Samples::Int32(vec![1, 11, 21, 31]));

        let t = traces[0].start_time;
        assert_eq!((t.year(), t.month(), t.day()), (2016, 7, 14));
        assert_eq!((t.hour(), t.minute(), t.second()), (1, 2, 3));
        assert_eq!(t.timestamp_subsec_millis(), 500);
    }

    #[test]
    fn test_header_metadata() {
        let header = parse_header(&v53_file(1)).unwrap();
        let sync = header.meta.sync.unwrap();
        assert_eq!(sync.satellites, 9);
        assert!(sync.synchronized);
        assert_eq!(sync.correction, -0.002);
        assert_eq!(header.meta.coordinates.unwrap().latitude, 51.88);
        assert_eq!(header.layout.block_count, 1);
    }

    #[test]
    fn test_v60_is_unsupported_version() {
        let err = decode_bytes(&general(60, 3, 0.01)).unwrap_err();
        assert!(matches!(
            err,
            DataloggerError::UnsupportedVersion { version: 60, .. }
        ));
    }

    #[test]
    fn test_non_positive_period() {
        let mut data = general(53, 1, 0.0);
        data.extend(channel(0, "Z"));
        assert!(matches!(
            parse_header(&data),
            Err(DataloggerError::MalformedHeader(_))
        ));
    }

    #[test]
    fn test_partial_row_is_truncation() {
        let mut data = v53_file(2);
        data.pop();
        assert!(matches!(
            decode_bytes(&data),
            Err(DataloggerError::TruncatedData { .. })
        ));
    }

    #[test]
    fn test_missing_channel_headers() {
        let mut data = general(53, 3, 0.01);
        data.extend(channel(0, "N"));
        assert!(matches!(
            parse_header(&data),
            Err(DataloggerError::TruncatedData { .. })
        ));
    }
}
