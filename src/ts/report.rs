use super::timestamp::pts_to_duration;
use std::fmt;

/// Why a demux run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// The byte source was exhausted and every complete packet was analyzed
    EndOfStream,
    /// The caller's cancellation token fired
    Cancelled,
    /// A write would have overwritten unread data
    Overflow,
    /// The byte source failed
    SourceError,
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            StopReason::EndOfStream => "end of stream",
            StopReason::Cancelled => "cancelled",
            StopReason::Overflow => "buffer overflow",
            StopReason::SourceError => "source error",
        };
        f.write_str(s)
    }
}

/// Aggregated counters of one demux run.
#[derive(Debug, Clone, PartialEq)]
pub struct StreamReport {
    /// Program id the continuity and timestamp figures refer to
    pub target_pid: u16,
    /// Every packet seen
    pub total_packet_count: u64,
    /// Packets on the target pid
    pub tracked_packet_count: u64,
    /// Continuity counter gaps and duplicates on the target pid
    pub continuity_error_count: u64,
    /// Span between first and last PTS plus one frame, whole seconds
    pub duration_seconds: u64,
    /// Bytes accepted into the ring buffer
    pub total_bytes_ingested: u64,
    pub sync_error_count: u64,
    /// Payload-unit starts on the target pid without a usable PES header
    pub pes_error_count: u64,
    /// Target pid packets carrying a PCR
    pub pcr_packet_count: u64,
    pub first_pts: Option<u64>,
    pub last_pts: Option<u64>,
    pub stop_reason: StopReason,
    /// RFC 3339 time the report was produced
    pub finished_at: String,
}

impl fmt::Display for StreamReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Total MPEGTS packets: {}\tpid {} packets: {}\tBytes read: {}\tCC errors: {}, duration: {} sec",
            self.total_packet_count,
            self.target_pid,
            self.tracked_packet_count,
            self.total_bytes_ingested,
            self.continuity_error_count,
            self.duration_seconds,
        )?;
        if let (Some(first), Some(last)) = (self.first_pts, self.last_pts) {
            write!(
                f,
                " (pts {:?} .. {:?})",
                pts_to_duration(first),
                pts_to_duration(last)
            )?;
        }
        write!(
            f,
            ", sync errors: {}, PES errors: {}, PCRs: {}, stopped: {}",
            self.sync_error_count, self.pes_error_count, self.pcr_packet_count, self.stop_reason
        )
    }
}

/// Receives the final report of a run.
///
/// Implementations must not fail the run; errors stay inside the sink.
pub trait ReportSink: Send + Sync {
    fn emit(&self, report: &StreamReport);
}

/// Default sink: one `info!` line per report.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

impl ReportSink for LogSink {
    fn emit(&self, report: &StreamReport) {
        log::info!("{}", report);
    }
}

impl<T: ReportSink + ?Sized> ReportSink for std::sync::Arc<T> {
    fn emit(&self, report: &StreamReport) {
        (**self).emit(report)
    }
}
