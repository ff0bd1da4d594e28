use super::pes::PesHeader;
use crate::error::Result;

// Packet layout
pub const TS_PACKET_SIZE: usize = 188;
pub const TS_HEADER_SIZE: usize = 4;
pub const SYNC_BYTE: u8 = 0x47;
pub const MAX_PID: u16 = 0x1fff;

// Adaptation field bytes needed for the flags byte plus a PCR
pub const MIN_PCR_ADAPTATION_LENGTH: usize = 7;

// PES
pub const PES_START_CODE: [u8; 3] = [0x00, 0x00, 0x01];
pub const PES_FIXED_HEADER_SIZE: usize = 9;

// Stream IDs
pub const STREAM_ID_PROGRAM_STREAM_MAP: u8 = 0xbc;
pub const STREAM_ID_PADDING: u8 = 0xbe;
pub const STREAM_ID_PRIVATE_STREAM_2: u8 = 0xbf;
pub const STREAM_ID_ECM: u8 = 0xf0;
pub const STREAM_ID_EMM: u8 = 0xf1;
pub const STREAM_ID_DSMCC: u8 = 0xf2;
pub const STREAM_ID_H222_1_TYPE_E: u8 = 0xf8;
pub const STREAM_ID_PROGRAM_STREAM_DIRECTORY: u8 = 0xff;

// Clocks
pub const PTS_HZ: u64 = 90_000;
pub const PCR_HZ: u64 = 27_000_000;
pub const PTS_WRAP: u64 = 1 << 33;
/// One NTSC frame (1001/30000 s) in 90 kHz ticks.
pub const NTSC_FRAME_TICKS: u64 = 3003;

/// One parsed 188-byte transport packet.
///
/// `payload` borrows the packet bytes, so the packet cannot outlive the
/// buffer slot it was parsed from.
#[derive(Debug)]
pub struct TsPacket<'a> {
    /// False when byte 0 was not 0x47; the other fields are best effort
    pub sync_byte_valid: bool,
    pub payload_unit_start: bool,
    pub has_payload: bool,
    pub adaptation_field_present: bool,
    /// Declared adaptation field length, 0 when absent
    pub adaptation_field_length: usize,
    /// 13-bit packet identifier
    pub pid: u16,
    /// 4-bit continuity counter
    pub continuity_counter: u8,
    pub has_pcr: bool,
    /// 27 MHz clock sample, valid iff `has_pcr`
    pub pcr: u64,
    pub payload: &'a [u8],
    /// PES header parse result, present only on payload-unit starts
    pub pes: Option<Result<PesHeader>>,
}

impl TsPacket<'_> {
    /// The PES header, if this packet starts one and it parsed.
    pub fn pes_header(&self) -> Option<&PesHeader> {
        self.pes.as_ref().and_then(|pes| pes.as_ref().ok())
    }
}
