//! Pure Rust decoders for continuous seismic data-logger recordings.
//!
//! Four vendor families are supported: SDAS, GeoInstr Smart24, Symmetric
//! Research `.out` with its `vdaq.txt`, and Baykal XX. Each is detected
//! from its own signature, its header is parsed into a common [`Header`],
//! its interleaved samples are split per channel and the result is
//! returned as one [`TraceRecord`] per channel.
//!
//! # Reading a file
//!
//! ```no_run
//! use std::path::Path;
//!
//! let path = Path::new("station.xx");
//! let format = datalogger_rs::identify(path)?;
//! for trace in format.decode(path)? {
//!     println!("{trace}");
//! }
//! # Ok::<(), datalogger_rs::DataloggerError>(())
//! ```
//!
//! # Decoding from memory
//!
//! ```
//! use datalogger_rs::symres::{self, SymresOptions};
//! use datalogger_rs::Samples;
//!
//! let vdaq = "SampleRate: 50\nA-DInfo: YKT\nChannels: 2\nCh1ID: SHZ\n";
//!
//! // Two columns: time channel, then SHZ
//! let mut data = Vec::new();
//! for (time_word, value) in [(0, 7), (86_400, -7), (125, 9), (0, -9)] {
//!     data.extend_from_slice(&i32::to_le_bytes(time_word));
//!     data.extend_from_slice(&i32::to_le_bytes(value));
//! }
//!
//! let traces = symres::decode_parts(vdaq, &data, &SymresOptions::default()).unwrap();
//! assert_eq!(traces.len(), 1);
//! assert_eq!(traces[0].id(), "YKT..SHZ");
//! assert_eq!(traces[0].samples, Samples::Int32(vec![7, -7, 9, -9]));
//! assert_eq!(traces[0].start_time.timestamp_millis(), 86_400_125);
//! ```
//!
//! # Demultiplexing
//!
//! ```
//! use datalogger_rs::{InterleaveLayout, SampleWidth, Samples, demux};
//!
//! let data: Vec<u8> = [1i16, 10, 2, 20, 3, 30]
//!     .iter()
//!     .flat_map(|v| v.to_le_bytes())
//!     .collect();
//! let layout = InterleaveLayout::columns_for(2, SampleWidth::Int16, data.len()).unwrap();
//! let channels = demux::demux_columns(&data, &layout).unwrap();
//!
//! assert_eq!(channels[0], Samples::Int16(vec![1, 2, 3]));
//! assert_eq!(channels[1], Samples::Int16(vec![10, 20, 30]));
//! ```

pub mod assemble;
pub mod baykal;
pub mod demux;
pub mod error;
pub mod format;
pub mod reader;
pub mod record;
pub mod sdas;
pub mod smart24;
pub mod symres;
pub mod time;
pub mod types;

pub use demux::{InterleaveKind, InterleaveLayout};
pub use error::{DataloggerError, Result};
pub use format::{DETECTION_ORDER, identify, read};
pub use reader::ByteReader;
pub use record::{
    Calibration, ChannelDescriptor, ChannelStatus, Coordinates, GlobalMetadata, Header, Samples,
    SyncDiagnostics, TraceRecord,
};
pub use symres::SymresOptions;
pub use time::TimeBase;
pub use types::{BaykalVersion, FormatVariant, Probe, SampleWidth};
