use super::analyzer::StreamAnalyzer;
use super::parser::parse_packet;
use super::report::{LogSink, ReportSink, StopReason, StreamReport};
use super::types::TS_PACKET_SIZE;
use crate::config::DemuxConfig;
use crate::error::{ProbeError, Result};
use crate::utils::SharedRingBuffer;
use bytes::BytesMut;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio_util::sync::CancellationToken;

/// Live MPEG-TS prober.
///
/// Reads a transport stream from any [`AsyncRead`] source and analyzes it
/// while it arrives:
/// - ingestion copies source bytes into a bounded ring buffer
/// - consumption takes whole 188-byte packets out of it, parses them and
///   feeds the [`StreamAnalyzer`]
///
/// Both sides run concurrently on the caller's task. When the source ends
/// the consumer drains every complete packet still buffered before the
/// report is produced.
pub struct TSDemuxer<R: AsyncRead + Unpin + Send> {
    reader: R,
    ring: SharedRingBuffer,
    analyzer: StreamAnalyzer,
    config: DemuxConfig,
    sink: Box<dyn ReportSink>,
}

impl<R: AsyncRead + Unpin + Send> TSDemuxer<R> {
    /// Creates a demuxer over `reader`.
    ///
    /// Fails with `Config` on out-of-range settings and with
    /// `InvalidCapacity` when the buffer cannot hold a single packet.
    pub fn new(reader: R, config: DemuxConfig) -> Result<Self> {
        config.validate()?;
        if config.buffer_capacity <= TS_PACKET_SIZE {
            return Err(ProbeError::InvalidCapacity(config.buffer_capacity));
        }
        Ok(Self {
            reader,
            ring: SharedRingBuffer::new(config.buffer_capacity, config.blocking)?,
            analyzer: StreamAnalyzer::new(config.target_pid),
            config,
            sink: Box::new(LogSink),
        })
    }

    /// Replaces the default [`LogSink`].
    pub fn with_sink<S: ReportSink + 'static>(mut self, sink: S) -> Self {
        self.sink = Box::new(sink);
        self
    }

    pub fn config(&self) -> &DemuxConfig {
        &self.config
    }

    /// Runs the probe until the source ends, fails, overflows the buffer or
    /// `cancel` fires.
    ///
    /// The final report always goes to the sink. It is also returned, except
    /// after a source read failure, where the read error is returned instead.
    pub async fn run(self, cancel: CancellationToken) -> Result<StreamReport> {
        let Self {
            mut reader,
            ring,
            mut analyzer,
            config,
            sink,
        } = self;

        log::info!(
            "probing pid {} ({} byte buffer, {})",
            config.target_pid,
            config.buffer_capacity,
            if config.blocking { "blocking" } else { "non-blocking" }
        );

        // fires when ingestion is over, for whatever reason
        let ingest_done = cancel.child_token();

        let (ingested, ()) = tokio::join!(
            ingest(&mut reader, &ring, config.read_chunk_size, &ingest_done),
            consume(
                &ring,
                &mut analyzer,
                config.poll_interval,
                &cancel,
                &ingest_done
            ),
        );

        // a source failure wins over a late cancellation
        let stop_reason = match &ingested {
            Err(_) => StopReason::SourceError,
            Ok(_) if cancel.is_cancelled() => StopReason::Cancelled,
            Ok(reason) => *reason,
        };
        let report = analyzer.report(ring.total_written(), stop_reason);
        sink.emit(&report);

        match ingested {
            Err(e) => Err(e),
            Ok(_) => Ok(report),
        }
    }
}

/// Copies the source into the ring until it ends, fails, overflows the ring
/// or `done` fires. Always fires `done` on the way out.
async fn ingest<R: AsyncRead + Unpin>(
    reader: &mut R,
    ring: &SharedRingBuffer,
    chunk_size: usize,
    done: &CancellationToken,
) -> Result<StopReason> {
    let mut buf = BytesMut::with_capacity(chunk_size);

    let outcome = loop {
        buf.clear();
        let read = tokio::select! {
            biased;
            _ = done.cancelled() => break Ok(StopReason::Cancelled),
            read = reader.read_buf(&mut buf) => read,
        };

        let n = match read {
            Ok(0) => {
                log::debug!("source exhausted after {} bytes", ring.total_written());
                break Ok(StopReason::EndOfStream);
            }
            Ok(n) => n,
            Err(e) => {
                log::error!("source read failed: {}", e);
                break Err(ProbeError::Io(e));
            }
        };

        match ring.write_all(&buf[..n], done).await {
            Ok(written) if written < n => break Ok(StopReason::Cancelled),
            Ok(_) => {}
            Err(e @ ProbeError::Overflow { .. }) => {
                log::error!("ingestion stopped: {}", e);
                break Ok(StopReason::Overflow);
            }
            Err(e) => break Err(e),
        }

        // an always-ready source must not starve the consumer
        tokio::task::yield_now().await;
    };

    done.cancel();
    outcome
}

/// Analyzes whole packets from the ring.
///
/// Drains every complete packet before suspending, so one ingestion chunk
/// never finds the ring fuller than the previous chunk left it. Stops at
/// once when `cancel` fires. Once `ingest_done` fires it keeps going until
/// fewer than one packet's worth of bytes is left.
async fn consume(
    ring: &SharedRingBuffer,
    analyzer: &mut StreamAnalyzer,
    poll_interval: Duration,
    cancel: &CancellationToken,
    ingest_done: &CancellationToken,
) {
    let mut unit = [0u8; TS_PACKET_SIZE];

    loop {
        if cancel.is_cancelled() {
            log::debug!("consumer cancelled");
            return;
        }
        // sampled before the read so no write can slip in between
        let finished = ingest_done.is_cancelled();

        match ring.read_unit(&mut unit) {
            Ok(()) => match parse_packet(&unit) {
                Ok(packet) => analyzer.analyze(&packet),
                Err(e) => log::warn!("dropping packet: {}", e),
            },
            Err(e) if e.is_retryable() => {
                if finished {
                    let leftover = ring.buffered();
                    if leftover > 0 {
                        log::debug!("{} trailing bytes do not form a packet", leftover);
                    }
                    return;
                }
                ring.wait_for_data(ingest_done, poll_interval).await;
            }
            Err(e) => {
                log::error!("consumer stopped: {}", e);
                return;
            }
        }
    }
}
