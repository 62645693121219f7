//! Channel-interleave layouts and the demultiplexers that undo them.
//!
//! Three physical orderings occur across the supported loggers:
//!
//! - **Columns**: `rows × channels` fixed-width samples, sample-major
//!   (sample 0 of every channel, then sample 1, ...).
//! - **Blocks**: repeating blocks of `preamble | fragment(ch1) | ... |
//!   fragment(chN) | trailer`, each fragment a contiguous run of one
//!   channel's samples.
//! - **Subframes**: self-sized per-channel payloads followed by a footer,
//!   grouped into frames of one subframe per channel.
//!
//! Every strategy reports short input as
//! [`DataloggerError::TruncatedData`] rather than yielding short channels.

use tracing::{trace, warn};

use crate::reader::ByteReader;
use crate::record::Samples;
use crate::types::SampleWidth;
use crate::{DataloggerError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InterleaveKind {
    Columns,
    Blocks,
    Subframes,
}

/// How channels are physically ordered inside a sample region.
///
/// For `Columns` and `Blocks` the structure obeys
/// `block_size == preamble + channel_count * fragment_size + trailer`.
/// A `Columns` layout is a block layout whose fragment is a single sample
/// and whose block is one row. `Subframes` carry their own sizes, so only
/// `channel_count`, `block_count` (frames) and `trailer` (footer) apply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InterleaveLayout {
    pub kind: InterleaveKind,
    pub channel_count: usize,
    pub sample_width: SampleWidth,
    /// Bytes per channel per block.
    pub fragment_size: usize,
    pub preamble: usize,
    pub trailer: usize,
    pub block_size: usize,
    pub block_count: usize,
}

impl InterleaveLayout {
    /// Flat sample-major layout of `rows` rows.
    pub fn columns(channel_count: usize, sample_width: SampleWidth, rows: usize) -> Self {
        Self {
            kind: InterleaveKind::Columns,
            channel_count,
            sample_width,
            fragment_size: sample_width.bytes(),
            preamble: 0,
            trailer: 0,
            block_size: channel_count.saturating_mul(sample_width.bytes()),
            block_count: rows,
        }
    }

    /// Flat layout sized to cover exactly `data_len` bytes.
    ///
    /// Fails with `TruncatedData` when `data_len` is not a whole number of
    /// rows, which is how a short final row shows up.
    pub fn columns_for(
        channel_count: usize,
        sample_width: SampleWidth,
        data_len: usize,
    ) -> Result<Self> {
        if channel_count == 0 {
            return Err(DataloggerError::malformed("layout has no channels"));
        }
        let row = channel_count
            .checked_mul(sample_width.bytes())
            .ok_or_else(|| overflow("row size"))?;
        if !data_len.is_multiple_of(row) {
            return Err(DataloggerError::TruncatedData {
                expected: data_len.div_ceil(row) * row,
                actual: data_len,
            });
        }
        Ok(Self::columns(channel_count, sample_width, data_len / row))
    }

    /// Block/fragment layout with a fixed per-block preamble.
    ///
    /// Fails with `MalformedHeader` when the block size does not fit in
    /// `usize`.
    pub fn blocks(
        channel_count: usize,
        sample_width: SampleWidth,
        preamble: usize,
        fragment_size: usize,
        block_count: usize,
    ) -> Result<Self> {
        let block_size = channel_count
            .checked_mul(fragment_size)
            .and_then(|n| n.checked_add(preamble))
            .ok_or_else(|| overflow("block size"))?;
        Ok(Self {
            kind: InterleaveKind::Blocks,
            channel_count,
            sample_width,
            fragment_size,
            preamble,
            trailer: 0,
            block_size,
            block_count,
        })
    }

    /// Frame-sequential subframe layout.
    pub fn subframes(
        channel_count: usize,
        sample_width: SampleWidth,
        frame_count: usize,
        footer: usize,
    ) -> Self {
        Self {
            kind: InterleaveKind::Subframes,
            channel_count,
            sample_width,
            fragment_size: 0,
            preamble: 0,
            trailer: footer,
            block_size: 0,
            block_count: frame_count,
        }
    }

    /// Override the block size with a value declared by the file.
    pub fn with_block_size(mut self, block_size: usize) -> Self {
        self.block_size = block_size;
        self
    }

    /// Check the structural invariants.
    pub fn validate(&self) -> Result<()> {
        if self.channel_count == 0 {
            return Err(DataloggerError::malformed("layout has no channels"));
        }
        if self.kind == InterleaveKind::Subframes {
            return Ok(());
        }
        let width = self.sample_width.bytes();
        if self.fragment_size == 0 || !self.fragment_size.is_multiple_of(width) {
            return Err(DataloggerError::malformed(format!(
                "fragment size {} is not a positive multiple of {} bytes",
                self.fragment_size, width
            )));
        }
        let expected = self
            .channel_count
            .checked_mul(self.fragment_size)
            .and_then(|n| n.checked_add(self.preamble))
            .and_then(|n| n.checked_add(self.trailer))
            .ok_or_else(|| overflow("block size"))?;
        if self.block_size != expected {
            return Err(DataloggerError::malformed(format!(
                "block size {} != preamble {} + {} channels x {} bytes + trailer {}",
                self.block_size, self.preamble, self.channel_count, self.fragment_size, self.trailer
            )));
        }
        Ok(())
    }

    /// Bytes needed to hold every block. Zero for subframe layouts.
    pub fn required_len(&self) -> Result<usize> {
        self.block_size
            .checked_mul(self.block_count)
            .ok_or_else(|| overflow("data region size"))
    }

    /// Samples each channel ends up with, where the layout fixes it.
    pub fn samples_per_channel(&self) -> Option<usize> {
        match self.kind {
            InterleaveKind::Subframes => None,
            _ => self
                .block_count
                .checked_mul(self.fragment_size)
                .map(|n| n / self.sample_width.bytes()),
        }
    }
}

/// Split a sample-major region into one sequence per column.
pub fn demux_columns(data: &[u8], layout: &InterleaveLayout) -> Result<Vec<Samples>> {
    expect_kind(layout, InterleaveKind::Columns)?;
    layout.validate()?;
    let region = take_region(data, layout)?;

    let width = layout.sample_width.bytes();
    (0..layout.channel_count)
        .map(|col| {
            let start = col * width;
            let bytes: Vec<u8> = region
                .chunks_exact(layout.block_size)
                .flat_map(|row| &row[start..start + width])
                .copied()
                .collect();
            Samples::from_le_bytes(&bytes, layout.sample_width)
        })
        .collect()
}

/// Collect channel `slot` (0-based) from every block of a block layout.
///
/// The reader must sit at the first block. Per block it skips the
/// preamble and the fragments of earlier channels, reads this channel's
/// fragment, then skips the remaining fragments and the trailer so the
/// cursor lands on the next block boundary.
pub fn gather_fragments(
    reader: &mut ByteReader<'_>,
    layout: &InterleaveLayout,
    slot: usize,
) -> Result<Samples> {
    if slot >= layout.channel_count {
        return Err(DataloggerError::malformed(format!(
            "channel slot {slot} outside {} channels",
            layout.channel_count
        )));
    }
    let before = slot * layout.fragment_size;
    let after = (layout.channel_count - slot - 1) * layout.fragment_size + layout.trailer;

    let mut out = Samples::empty(layout.sample_width);
    for block in 0..layout.block_count {
        trace!(block, slot, offset = reader.position(), "reading fragment");
        reader.skip(layout.preamble)?;
        reader.skip(before)?;
        let fragment = reader.read_bytes(layout.fragment_size)?;
        out.append(Samples::from_le_bytes(fragment, layout.sample_width)?)?;
        reader.skip(after)?;
    }
    Ok(out)
}

/// Demultiplex every channel of a block/fragment region.
pub fn demux_blocks(data: &[u8], layout: &InterleaveLayout) -> Result<Vec<Samples>> {
    expect_kind(layout, InterleaveKind::Blocks)?;
    layout.validate()?;
    let region = take_region(data, layout)?;

    (0..layout.channel_count)
        .map(|slot| gather_fragments(&mut ByteReader::new(region), layout, slot))
        .collect()
}

/// Read one subframe payload of `data_size` bytes and discard its footer.
pub fn read_subframe_payload(
    reader: &mut ByteReader<'_>,
    data_size: usize,
    layout: &InterleaveLayout,
) -> Result<Samples> {
    expect_kind(layout, InterleaveKind::Subframes)?;
    let payload = reader.read_bytes(data_size)?;
    let samples = Samples::from_le_bytes(payload, layout.sample_width)?;
    reader.skip(layout.trailer)?;
    Ok(samples)
}

fn expect_kind(layout: &InterleaveLayout, kind: InterleaveKind) -> Result<()> {
    if layout.kind != kind {
        return Err(DataloggerError::malformed(format!(
            "expected a {kind:?} layout, got {:?}",
            layout.kind
        )));
    }
    Ok(())
}

fn take_region<'a>(data: &'a [u8], layout: &InterleaveLayout) -> Result<&'a [u8]> {
    let needed = layout.required_len()?;
    if data.len() < needed {
        return Err(DataloggerError::TruncatedData {
            expected: needed,
            actual: data.len(),
        });
    }
    if data.len() > needed {
        warn!(
            extra = data.len() - needed,
            "ignoring bytes after the last block"
        );
    }
    Ok(&data[..needed])
}

fn overflow(what: &str) -> DataloggerError {
    DataloggerError::malformed(format!("{what} overflows the address space"))
}
