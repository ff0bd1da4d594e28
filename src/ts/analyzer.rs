use super::report::{StopReason, StreamReport};
use super::timestamp::pts_delta;
use super::types::{TsPacket, NTSC_FRAME_TICKS, PTS_HZ};

/// Whole seconds covered by `first..=last`, counting the last frame.
///
/// `last < first` is read as one 33-bit PTS wrap.
pub fn duration_seconds(first_pts: u64, last_pts: u64) -> u64 {
    (pts_delta(first_pts, last_pts) + NTSC_FRAME_TICKS) / PTS_HZ
}

/// Per-run health state for one tracked program id.
///
/// Packets on other pids only bump the total count.
#[derive(Debug, Clone)]
pub struct StreamAnalyzer {
    target_pid: u16,
    last_continuity_counter: Option<u8>,
    continuity_error_count: u64,
    total_packet_count: u64,
    tracked_packet_count: u64,
    sync_error_count: u64,
    pes_error_count: u64,
    pcr_packet_count: u64,
    first_pts: Option<u64>,
    last_pts: Option<u64>,
}

impl StreamAnalyzer {
    pub fn new(target_pid: u16) -> Self {
        Self {
            target_pid,
            last_continuity_counter: None,
            continuity_error_count: 0,
            total_packet_count: 0,
            tracked_packet_count: 0,
            sync_error_count: 0,
            pes_error_count: 0,
            pcr_packet_count: 0,
            first_pts: None,
            last_pts: None,
        }
    }

    pub fn target_pid(&self) -> u16 {
        self.target_pid
    }

    pub fn total_packet_count(&self) -> u64 {
        self.total_packet_count
    }

    pub fn tracked_packet_count(&self) -> u64 {
        self.tracked_packet_count
    }

    pub fn continuity_error_count(&self) -> u64 {
        self.continuity_error_count
    }

    pub fn first_pts(&self) -> Option<u64> {
        self.first_pts
    }

    pub fn last_pts(&self) -> Option<u64> {
        self.last_pts
    }

    /// Feeds one parsed packet.
    pub fn analyze(&mut self, packet: &TsPacket<'_>) {
        self.total_packet_count += 1;
        if !packet.sync_byte_valid {
            self.sync_error_count += 1;
        }
        if packet.pid != self.target_pid {
            return;
        }
        self.tracked_packet_count += 1;

        let cc = packet.continuity_counter;
        if let Some(last) = self.last_continuity_counter {
            // gaps and duplicates land in the same counter
            if packet.has_payload && cc != (last + 1) & 0x0f {
                self.continuity_error_count += 1;
                log::debug!(
                    "pid {}: continuity counter {} after {}",
                    self.target_pid,
                    cc,
                    last
                );
            }
        }
        self.last_continuity_counter = Some(cc);

        if packet.has_pcr {
            self.pcr_packet_count += 1;
        }

        if !packet.payload_unit_start {
            return;
        }
        match &packet.pes {
            Some(Ok(pes)) => {
                log::debug!(
                    "pid {}: PES stream {:#04x} ({:?}) pts {:?} dts {:?}",
                    self.target_pid,
                    pes.stream_id,
                    pes.stream_kind(),
                    pes.pts,
                    pes.dts
                );
                if let Some(pts) = pes.pts.filter(|&pts| pts != 0) {
                    if self.first_pts.is_none() {
                        self.first_pts = Some(pts);
                    }
                    self.last_pts = Some(pts);
                }
            }
            Some(Err(e)) => {
                self.pes_error_count += 1;
                log::warn!("pid {}: {}", self.target_pid, e);
            }
            None => {}
        }
    }

    /// Span of the seen PTS values in seconds, 0 if none was seen.
    pub fn duration_seconds(&self) -> u64 {
        match (self.first_pts, self.last_pts) {
            (Some(first), Some(last)) => duration_seconds(first, last),
            _ => 0,
        }
    }

    pub fn report(&self, total_bytes_ingested: u64, stop_reason: StopReason) -> StreamReport {
        StreamReport {
            target_pid: self.target_pid,
            total_packet_count: self.total_packet_count,
            tracked_packet_count: self.tracked_packet_count,
            continuity_error_count: self.continuity_error_count,
            duration_seconds: self.duration_seconds(),
            total_bytes_ingested,
            sync_error_count: self.sync_error_count,
            pes_error_count: self.pes_error_count,
            pcr_packet_count: self.pcr_packet_count,
            first_pts: self.first_pts,
            last_pts: self.last_pts,
            stop_reason,
            finished_at: chrono::Utc::now().to_rfc3339(),
        }
    }
}
