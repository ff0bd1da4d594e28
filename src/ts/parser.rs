use super::pes::parse_pes_header;
use super::timestamp::{decode_pcr, PCR_FIELD_SIZE};
use super::types::*;
use crate::error::{ProbeError, Result};

const PCR_OFFSET: usize = TS_HEADER_SIZE + 2;

/// Parses one 188-byte transport packet.
///
/// Fails only with `NotEnoughData` when `data` is shorter than a packet;
/// bytes past the first 188 are ignored. A bad sync byte is logged and
/// parsing continues. On payload-unit starts the PES header is parsed too and
/// its outcome stored in [`TsPacket::pes`] without failing the packet.
pub fn parse_packet(data: &[u8]) -> Result<TsPacket<'_>> {
    if data.len() < TS_PACKET_SIZE {
        return Err(ProbeError::NotEnoughData {
            needed: TS_PACKET_SIZE,
            available: data.len(),
        });
    }
    let data = &data[..TS_PACKET_SIZE];

    let sync_byte_valid = data[0] == SYNC_BYTE;
    if !sync_byte_valid {
        log::warn!("{}", ProbeError::SyncError(data[0]));
    }

    let payload_unit_start = (data[1] & 0x40) != 0;
    let pid = (((data[1] & 0x1f) as u16) << 8) | data[2] as u16;
    let adaptation_field_present = (data[3] & 0x20) != 0;
    let has_payload = (data[3] & 0x10) != 0;
    let continuity_counter = data[3] & 0x0f;

    let mut payload_offset = TS_HEADER_SIZE;
    let mut adaptation_field_length = 0;
    let mut has_pcr = false;
    let mut pcr = 0;

    if adaptation_field_present {
        adaptation_field_length = data[TS_HEADER_SIZE] as usize;
        if adaptation_field_length >= MIN_PCR_ADAPTATION_LENGTH
            && (data[TS_HEADER_SIZE + 1] & 0x10) != 0
        {
            pcr = decode_pcr(&data[PCR_OFFSET..PCR_OFFSET + PCR_FIELD_SIZE])?;
            has_pcr = true;
        }
        // +1 for the length byte itself
        payload_offset += adaptation_field_length + 1;
    }

    // a length running past the packet leaves no payload
    let payload = data.get(payload_offset..).unwrap_or(&[]);

    let pes = if payload_unit_start {
        let parsed = parse_pes_header(payload);
        if let Err(e) = &parsed {
            log::debug!("pid {:#06x}: no PES header: {}", pid, e);
        }
        Some(parsed)
    } else {
        None
    };

    Ok(TsPacket {
        sync_byte_valid,
        payload_unit_start,
        has_payload,
        adaptation_field_present,
        adaptation_field_length,
        pid,
        continuity_counter,
        has_pcr,
        pcr,
        payload,
        pes,
    })
}
