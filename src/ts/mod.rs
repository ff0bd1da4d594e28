//! # MPEG Transport Stream (TS) Probing
//!
//! This module reads a live MPEG transport stream and reports on its health:
//!
//! - TS packet header and adaptation field parsing
//! - PES header parsing with PTS/DTS extraction
//! - PCR and PTS/DTS decoding
//! - Continuity counter and duration tracking for one program id
//!
//! ## Example Usage
//!
//! ### Parsing a Single Packet
//!
//! ```rust
//! use tsprobe::ts::{parse_packet, TS_PACKET_SIZE};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut data = [0u8; TS_PACKET_SIZE];
//! data[..4].copy_from_slice(&[0x47, 0x00, 0xc8, 0x17]);
//!
//! let packet = parse_packet(&data)?;
//! assert_eq!(packet.pid, 200);
//! assert_eq!(packet.continuity_counter, 7);
//! # Ok(())
//! # }
//! ```
//!
//! ### Probing a Stream
//!
//! ```rust
//! use tsprobe::config::DemuxConfig;
//! use tsprobe::ts::{StopReason, TSDemuxer};
//! use tokio_util::sync::CancellationToken;
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let source = std::io::Cursor::new(vec![0x47u8; 188 * 3]);
//! let demuxer = TSDemuxer::new(source, DemuxConfig::default())?;
//!
//! let report = demuxer.run(CancellationToken::new()).await?;
//! assert_eq!(report.total_packet_count, 3);
//! assert_eq!(report.stop_reason, StopReason::EndOfStream);
//! # Ok(())
//! # }
//! ```

/// Continuity and timestamp tracking
pub mod analyzer;

/// Ingestion/consumption pipeline
pub mod demuxer;

/// TS packet parsing
pub mod parser;

/// PES header parsing
pub mod pes;

/// Run report and report sinks
pub mod report;

/// PCR and PTS/DTS codec
pub mod timestamp;

/// Core TS types and constants
pub mod types;

// Re-export commonly used types and constants
pub use analyzer::{duration_seconds, StreamAnalyzer};
pub use demuxer::TSDemuxer;
pub use parser::parse_packet;
pub use pes::{parse_pes_header, PesHeader, StreamKind};
pub use report::{LogSink, ReportSink, StopReason, StreamReport};
pub use timestamp::{decode_pcr, decode_pts, pcr_to_duration, pts_delta, pts_to_duration};
pub use types::{TsPacket, MAX_PID, PCR_HZ, PTS_HZ, SYNC_BYTE, TS_PACKET_SIZE};
