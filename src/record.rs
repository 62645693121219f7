//! Decoded data model shared by every format.
//!
//! [`TraceRecord`] is the output unit: one per channel per file. The header
//! side types ([`GlobalMetadata`], [`ChannelDescriptor`], [`Header`]) are what
//! each format's `parse_header` produces before any samples are touched.

use std::collections::HashSet;
use std::fmt;

use chrono::{DateTime, TimeDelta, Utc};

use crate::demux::InterleaveLayout;
use crate::time::TimeBase;
use crate::types::{FormatVariant, SampleWidth};
use crate::{DataloggerError, Result};

/// Decoded sample data with its stored bit width.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Samples {
    Int16(Vec<i16>),
    Int32(Vec<i32>),
}

impl Samples {
    /// An empty sequence of the given width.
    pub fn empty(width: SampleWidth) -> Self {
        match width {
            SampleWidth::Int16 => Samples::Int16(Vec::new()),
            SampleWidth::Int32 => Samples::Int32(Vec::new()),
        }
    }

    /// Decode packed little-endian samples.
    ///
    /// `data` must hold a whole number of samples.
    pub fn from_le_bytes(data: &[u8], width: SampleWidth) -> Result<Self> {
        let size = width.bytes();
        if !data.len().is_multiple_of(size) {
            return Err(DataloggerError::TruncatedData {
                expected: data.len().div_ceil(size) * size,
                actual: data.len(),
            });
        }
        Ok(match width {
            SampleWidth::Int16 => Samples::Int16(
                data.chunks_exact(2)
                    .map(|c| i16::from_le_bytes([c[0], c[1]]))
                    .collect(),
            ),
            SampleWidth::Int32 => Samples::Int32(
                data.chunks_exact(4)
                    .map(|c| i32::from_le_bytes([c[0], c[1], c[2], c[3]]))
                    .collect(),
            ),
        })
    }

    pub fn width(&self) -> SampleWidth {
        match self {
            Samples::Int16(_) => SampleWidth::Int16,
            Samples::Int32(_) => SampleWidth::Int32,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Samples::Int16(v) => v.len(),
            Samples::Int32(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Append `other`, which must have the same width.
    pub fn append(&mut self, other: Samples) -> Result<()> {
        match (self, other) {
            (Samples::Int16(a), Samples::Int16(b)) => a.extend(b),
            (Samples::Int32(a), Samples::Int32(b)) => a.extend(b),
            (a, b) => {
                return Err(DataloggerError::malformed(format!(
                    "cannot join {} samples onto {} samples",
                    b.width(),
                    a.width()
                )));
            }
        }
        Ok(())
    }

    /// Reinterpret 16-bit samples as unsigned and widen them to `Int32`.
    /// 32-bit samples are returned unchanged.
    pub fn widen_unsigned(self) -> Self {
        match self {
            Samples::Int16(v) => {
                Samples::Int32(v.into_iter().map(|s| i32::from(s as u16)).collect())
            }
            other => other,
        }
    }

    /// Widen every sample to `i32`.
    pub fn to_i32(&self) -> Vec<i32> {
        match self {
            Samples::Int16(v) => v.iter().map(|&s| s as i32).collect(),
            Samples::Int32(v) => v.clone(),
        }
    }
}

/// Sensor calibration as reported by the logger.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Calibration {
    pub factor: f32,
    /// Period (seconds) at which `factor` applies.
    pub period: f32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
    pub altitude: Option<f64>,
}

/// Per-channel status block of a Smart24 subframe.
#[derive(Debug, Clone, PartialEq)]
pub struct ChannelStatus {
    pub status: String,
    pub gps_sync: String,
    /// Clock difference reported by the digitizer.
    pub clock_diff: i32,
    pub coordinates: Coordinates,
    /// Least-significant-bit scale.
    pub lsb: f32,
}

/// Clock synchronisation diagnostics from a Baykal general header.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SyncDiagnostics {
    pub satellites: u16,
    pub synchronized: bool,
    pub correction: f64,
}

/// File-level metadata.
#[derive(Debug, Clone, PartialEq)]
pub struct GlobalMetadata {
    pub format: FormatVariant,
    pub station: String,
    pub stream: Option<String>,
    pub group_count: Option<u32>,
    pub creator: Option<String>,
    pub coordinates: Option<Coordinates>,
    pub sync: Option<SyncDiagnostics>,
}

impl GlobalMetadata {
    pub fn new(format: FormatVariant, station: impl Into<String>) -> Self {
        Self {
            format,
            station: station.into(),
            stream: None,
            group_count: None,
            creator: None,
            coordinates: None,
            sync: None,
        }
    }
}

/// One channel as described by a file header.
#[derive(Debug, Clone, PartialEq)]
pub struct ChannelDescriptor {
    /// 1-based position in the interleave order.
    pub index: usize,
    pub name: String,
    pub sample_rate: f64,
    pub location: Option<String>,
    pub calibration: Option<Calibration>,
}

impl ChannelDescriptor {
    pub fn new(index: usize, name: impl Into<String>, sample_rate: f64) -> Self {
        Self {
            index,
            name: name.into(),
            sample_rate,
            location: None,
            calibration: None,
        }
    }

    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        let location = location.into();
        self.location = (!location.is_empty()).then_some(location);
        self
    }

    pub fn with_calibration(mut self, calibration: Calibration) -> Self {
        self.calibration = Some(calibration);
        self
    }
}

/// Everything a header parser yields before sample data is read.
#[derive(Debug, Clone, PartialEq)]
pub struct Header {
    pub meta: GlobalMetadata,
    pub channels: Vec<ChannelDescriptor>,
    pub layout: InterleaveLayout,
    pub time_base: TimeBase,
}

impl Header {
    /// Assemble a header, rejecting duplicate or zero channel indices.
    pub fn new(
        meta: GlobalMetadata,
        channels: Vec<ChannelDescriptor>,
        layout: InterleaveLayout,
        time_base: TimeBase,
    ) -> Result<Self> {
        let mut seen = HashSet::with_capacity(channels.len());
        for ch in &channels {
            if ch.index == 0 || !seen.insert(ch.index) {
                return Err(DataloggerError::malformed(format!(
                    "channel index {} of {:?} is zero or repeated",
                    ch.index, ch.name
                )));
            }
        }
        Ok(Self {
            meta,
            channels,
            layout,
            time_base,
        })
    }
}

/// A decoded trace: one channel's continuous samples and identity.
#[derive(Debug, Clone, PartialEq)]
pub struct TraceRecord {
    pub format: FormatVariant,
    pub station: String,
    pub location: Option<String>,
    pub channel: String,
    pub sample_rate: f64,
    pub start_time: DateTime<Utc>,
    pub samples: Samples,
    pub calibration: Option<Calibration>,
    pub status: Option<ChannelStatus>,
}

impl TraceRecord {
    /// Return the identifier `"STA.LOC.CHA"`.
    pub fn id(&self) -> String {
        format!(
            "{}.{}.{}",
            self.station,
            self.location.as_deref().unwrap_or(""),
            self.channel
        )
    }

    /// Time of the last sample, or the start time for empty traces.
    pub fn end_time(&self) -> DateTime<Utc> {
        if self.samples.len() < 2 || self.sample_rate <= 0.0 {
            return self.start_time;
        }
        let span = (self.samples.len() - 1) as f64 / self.sample_rate;
        self.start_time + TimeDelta::nanoseconds((span * 1.0e9).round() as i64)
    }
}

impl fmt::Display for TraceRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} | {} - {} | {} Hz | {} samples ({}) [{}]",
            self.id(),
            self.start_time.format("%Y-%m-%dT%H:%M:%S%.3fZ"),
            self.end_time().format("%Y-%m-%dT%H:%M:%S%.3fZ"),
            self.sample_rate,
            self.samples.len(),
            self.samples.width(),
            self.format,
        )
    }
}
