use super::timestamp::{decode_pts, PTS_FIELD_SIZE};
use super::types::*;
use crate::error::{ProbeError, Result};

const PTS_OFFSET: usize = PES_FIXED_HEADER_SIZE;
const DTS_OFFSET: usize = PTS_OFFSET + PTS_FIELD_SIZE;

/// Coarse classification of a PES stream id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamKind {
    /// MPEG audio streams, ids 0xC0..=0xDF
    Audio,
    /// MPEG video streams, ids 0xE0..=0xEF
    Video,
    /// Everything else (private streams, padding, system streams)
    Other,
}

/// Packetized Elementary Stream (PES) header fields read at the start of a
/// payload unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PesHeader {
    /// Stream identifier (video/audio/etc.)
    pub stream_id: u8,
    /// PES packet length; 0 means unbounded (video)
    pub packet_length: u16,
    /// PTS/DTS indicator: 0 none, 2 PTS only, 3 PTS and DTS
    pub pts_dts_indicator: u8,
    /// Length of the optional fields following the fixed header
    pub header_data_length: u8,
    /// Presentation Time Stamp (33 bits, 90 kHz)
    pub pts: Option<u64>,
    /// Decoding Time Stamp (33 bits, 90 kHz)
    pub dts: Option<u64>,
}

impl PesHeader {
    pub fn stream_kind(&self) -> StreamKind {
        match self.stream_id {
            0xc0..=0xdf => StreamKind::Audio,
            0xe0..=0xef => StreamKind::Video,
            _ => StreamKind::Other,
        }
    }
}

/// Stream ids whose PES packets carry no optional header (ISO/IEC 13818-1
/// table 2-21).
fn has_optional_header(stream_id: u8) -> bool {
    !matches!(
        stream_id,
        STREAM_ID_PROGRAM_STREAM_MAP
            | STREAM_ID_PADDING
            | STREAM_ID_PRIVATE_STREAM_2
            | STREAM_ID_ECM
            | STREAM_ID_EMM
            | STREAM_ID_DSMCC
            | STREAM_ID_H222_1_TYPE_E
            | STREAM_ID_PROGRAM_STREAM_DIRECTORY
    )
}

fn require(payload: &[u8], needed: usize, what: &'static str) -> Result<()> {
    if payload.len() < needed {
        return Err(ProbeError::Truncated {
            what,
            needed,
            available: payload.len(),
        });
    }
    Ok(())
}

/// Parses the PES header at the start of a payload-unit-start payload.
///
/// Only the timestamps are decoded; the remaining optional fields covered by
/// `header_data_length` are left alone.
pub fn parse_pes_header(payload: &[u8]) -> Result<PesHeader> {
    require(payload, PES_START_CODE.len(), "PES start code")?;
    if payload[..3] != PES_START_CODE {
        return Err(ProbeError::InvalidStartCode([
            payload[0], payload[1], payload[2],
        ]));
    }
    require(payload, 6, "PES header")?;

    let mut header = PesHeader {
        stream_id: payload[3],
        packet_length: u16::from_be_bytes([payload[4], payload[5]]),
        pts_dts_indicator: 0,
        header_data_length: 0,
        pts: None,
        dts: None,
    };
    if !has_optional_header(header.stream_id) {
        return Ok(header);
    }

    require(payload, PES_FIXED_HEADER_SIZE, "PES header")?;
    header.pts_dts_indicator = (payload[7] & 0xc0) >> 6;
    header.header_data_length = payload[8];

    match header.pts_dts_indicator {
        2 => {
            require(payload, DTS_OFFSET, "PES PTS")?;
            header.pts = Some(decode_pts(&payload[PTS_OFFSET..DTS_OFFSET])?);
        }
        3 => {
            require(payload, DTS_OFFSET + PTS_FIELD_SIZE, "PES PTS/DTS")?;
            header.pts = Some(decode_pts(&payload[PTS_OFFSET..DTS_OFFSET])?);
            header.dts = Some(decode_pts(
                &payload[DTS_OFFSET..DTS_OFFSET + PTS_FIELD_SIZE],
            )?);
        }
        1 => log::debug!(
            "forbidden PTS/DTS indicator 1 on stream {:#04x}, ignoring timestamps",
            header.stream_id
        ),
        _ => {}
    }

    Ok(header)
}
