//! Turn demultiplexed sequences into [`TraceRecord`]s.
//!
//! Single-frame formats map one sequence to one channel directly. The
//! frame-sequential format yields one sequence per channel per frame; those
//! are merged slot by slot before packaging.

use tracing::debug;

use crate::record::{ChannelDescriptor, ChannelStatus, Header, Samples, TraceRecord};
use crate::time::TimeBase;
use crate::types::FormatVariant;
use crate::{DataloggerError, Result};

/// Package one sequence per header channel, all sharing the header time base.
pub fn package(header: &Header, sequences: Vec<Samples>) -> Result<Vec<TraceRecord>> {
    if sequences.len() != header.channels.len() {
        return Err(DataloggerError::malformed(format!(
            "{} channel sequences for {} described channels",
            sequences.len(),
            header.channels.len()
        )));
    }
    if let Some(first) = sequences.first()
        && let Some(odd) = sequences.iter().find(|s| s.len() != first.len())
    {
        return Err(DataloggerError::malformed(format!(
            "channel lengths differ: {} vs {} samples",
            first.len(),
            odd.len()
        )));
    }

    let start = header.time_base.at_frame(0);
    Ok(header
        .channels
        .iter()
        .zip(sequences)
        .map(|(ch, samples)| TraceRecord {
            format: header.meta.format,
            station: header.meta.station.clone(),
            location: ch.location.clone(),
            channel: ch.name.clone(),
            sample_rate: ch.sample_rate,
            start_time: start,
            samples,
            calibration: ch.calibration,
            status: None,
        })
        .collect())
}

/// One channel's contribution from one frame.
#[derive(Debug, Clone, PartialEq)]
pub struct FrameChannel {
    pub station: String,
    pub descriptor: ChannelDescriptor,
    pub status: Option<ChannelStatus>,
    pub samples: Samples,
}

/// Concatenate per-frame pieces slot by slot.
///
/// `pieces` are in file order, `channel_count` per frame. The piece count
/// must be a whole number of frames, and every frame must carry the same
/// channel in the same slot at the same rate. Description and status of the
/// merged channel come from its first frame.
pub fn merge_frames(pieces: Vec<FrameChannel>, channel_count: usize) -> Result<Vec<FrameChannel>> {
    if channel_count == 0 || !pieces.len().is_multiple_of(channel_count) {
        return Err(DataloggerError::malformed(format!(
            "{} subframes do not fill frames of {} channels",
            pieces.len(),
            channel_count
        )));
    }

    let frames = pieces.len() / channel_count;
    let mut merged: Vec<FrameChannel> = Vec::with_capacity(channel_count);
    for (i, piece) in pieces.into_iter().enumerate() {
        let slot = i % channel_count;
        if i < channel_count {
            merged.push(piece);
            continue;
        }
        let target = &mut merged[slot];
        if target.descriptor.name != piece.descriptor.name
            || target.station != piece.station
            || target.descriptor.location != piece.descriptor.location
        {
            return Err(DataloggerError::malformed(format!(
                "frame {} slot {} holds {}.{} instead of {}.{}",
                i / channel_count,
                slot,
                piece.station,
                piece.descriptor.name,
                target.station,
                target.descriptor.name
            )));
        }
        if target.descriptor.sample_rate != piece.descriptor.sample_rate {
            return Err(DataloggerError::malformed(format!(
                "channel {} changes rate from {} to {} Hz",
                piece.descriptor.name, target.descriptor.sample_rate, piece.descriptor.sample_rate
            )));
        }
        target.samples.append(piece.samples)?;
    }
    debug!(frames, channels = channel_count, "merged frame-sequential channels");
    Ok(merged)
}

/// Package merged frame channels; every trace starts at the first frame.
pub fn frame_traces(
    format: FormatVariant,
    time_base: &TimeBase,
    merged: Vec<FrameChannel>,
) -> Vec<TraceRecord> {
    let start = time_base.at_frame(0);
    merged
        .into_iter()
        .map(|fc| TraceRecord {
            format,
            station: fc.station,
            location: fc.descriptor.location,
            channel: fc.descriptor.name,
            sample_rate: fc.descriptor.sample_rate,
            start_time: start,
            samples: fc.samples,
            calibration: fc.descriptor.calibration,
            status: fc.status,
        })
        .collect()
}
