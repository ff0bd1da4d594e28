use crate::error::{ProbeError, Result};
use parking_lot::Mutex;
use std::time::Duration;
use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;

/// Fixed-capacity circular byte store.
///
/// One slot always stays unused so that `read_pos == write_pos` means
/// "empty" and never "full". A write that does not fit in the free space is
/// rejected as a whole: unread bytes are never overwritten and a failed
/// write leaves the buffer untouched.
///
/// Example:
/// ```
/// use tsprobe::utils::RingBuffer;
///
/// let mut ring = RingBuffer::new(8).unwrap();
/// ring.write(&[1, 2, 3]).unwrap();
///
/// let mut out = [0u8; 2];
/// assert_eq!(ring.read(&mut out).unwrap(), 2);
/// assert_eq!(out, [1, 2]);
/// assert_eq!(ring.buffered(), 1);
/// ```
pub struct RingBuffer {
    buf: Box<[u8]>,
    read_pos: usize,
    write_pos: usize,
    total_written: u64,
}

impl RingBuffer {
    /// Allocates a buffer of `capacity` bytes.
    pub fn new(capacity: usize) -> Result<Self> {
        if capacity == 0 {
            return Err(ProbeError::InvalidCapacity(capacity));
        }
        Ok(Self {
            buf: vec![0u8; capacity].into_boxed_slice(),
            read_pos: 0,
            write_pos: 0,
            total_written: 0,
        })
    }

    pub fn capacity(&self) -> usize {
        self.buf.len()
    }

    /// Number of unread bytes.
    pub fn buffered(&self) -> usize {
        if self.write_pos >= self.read_pos {
            self.write_pos - self.read_pos
        } else {
            self.buf.len() - self.read_pos + self.write_pos
        }
    }

    /// Largest write that is currently accepted.
    pub fn free_space(&self) -> usize {
        self.buf.len() - self.buffered() - 1
    }

    pub fn is_empty(&self) -> bool {
        self.read_pos == self.write_pos
    }

    /// Bytes accepted since creation or the last [`reset`](Self::reset).
    pub fn total_written(&self) -> u64 {
        self.total_written
    }

    /// Appends `data` at the write cursor, wrapping at the end of storage.
    pub fn write(&mut self, data: &[u8]) -> Result<usize> {
        let n = data.len();
        let available = self.free_space();
        if n > available {
            return Err(ProbeError::Overflow {
                requested: n,
                available,
            });
        }

        let size = self.buf.len();
        let first = (size - self.write_pos).min(n);
        self.buf[self.write_pos..self.write_pos + first].copy_from_slice(&data[..first]);
        if n > first {
            self.buf[..n - first].copy_from_slice(&data[first..]);
        }

        self.write_pos = (self.write_pos + n) % size;
        self.total_written += n as u64;
        Ok(n)
    }

    /// Copies up to `dest.len()` unread bytes into `dest`.
    ///
    /// Returns the number of bytes copied, which may be short. Fails with
    /// `EmptyBuffer` when nothing is buffered; waiting for data is the job of
    /// [`SharedRingBuffer`].
    pub fn read(&mut self, dest: &mut [u8]) -> Result<usize> {
        if self.is_empty() {
            return Err(ProbeError::EmptyBuffer);
        }

        let size = self.buf.len();
        let n = self.buffered().min(dest.len());
        let first = (size - self.read_pos).min(n);
        dest[..first].copy_from_slice(&self.buf[self.read_pos..self.read_pos + first]);
        if n > first {
            dest[first..n].copy_from_slice(&self.buf[..n - first]);
        }

        self.read_pos = (self.read_pos + n) % size;
        Ok(n)
    }

    /// Clears cursors and the write counter. Storage is kept as is.
    pub fn reset(&mut self) {
        self.read_pos = 0;
        self.write_pos = 0;
        self.total_written = 0;
    }
}

/// Ring buffer shared by one producer and one consumer.
///
/// Cursor updates happen under a short `parking_lot` lock; the two
/// [`Notify`] handles wake the consumer after a write and the producer after
/// a read. In blocking mode readers suspend until data arrives and writers
/// suspend until space frees up. In non-blocking mode an empty read fails
/// with `EmptyBuffer` and an oversized write fails with `Overflow`.
pub struct SharedRingBuffer {
    inner: Mutex<RingBuffer>,
    blocking: bool,
    data_ready: Notify,
    space_ready: Notify,
}

impl SharedRingBuffer {
    pub fn new(capacity: usize, blocking: bool) -> Result<Self> {
        Ok(Self {
            inner: Mutex::new(RingBuffer::new(capacity)?),
            blocking,
            data_ready: Notify::new(),
            space_ready: Notify::new(),
        })
    }

    pub fn is_blocking(&self) -> bool {
        self.blocking
    }

    pub fn capacity(&self) -> usize {
        self.inner.lock().capacity()
    }

    pub fn buffered(&self) -> usize {
        self.inner.lock().buffered()
    }

    pub fn free_space(&self) -> usize {
        self.inner.lock().free_space()
    }

    pub fn total_written(&self) -> u64 {
        self.inner.lock().total_written()
    }

    pub fn reset(&self) {
        self.inner.lock().reset();
        self.space_ready.notify_one();
    }

    /// Writes `data` in one piece or not at all.
    pub fn write(&self, data: &[u8]) -> Result<usize> {
        let n = self.inner.lock().write(data)?;
        self.data_ready.notify_one();
        Ok(n)
    }

    /// Writes all of `data`.
    ///
    /// In blocking mode the data goes in as pieces that fit the current free
    /// space, waiting for the consumer in between. Returns the number of bytes
    /// written, which is short only if `cancel` fired. In non-blocking mode
    /// this is [`write`](Self::write).
    pub async fn write_all(&self, data: &[u8], cancel: &CancellationToken) -> Result<usize> {
        if !self.blocking {
            return self.write(data);
        }

        let mut written = 0;
        while written < data.len() {
            let free = self.free_space();
            if free == 0 {
                tokio::select! {
                    _ = cancel.cancelled() => return Ok(written),
                    _ = self.space_ready.notified() => continue,
                }
            }
            let take = free.min(data.len() - written);
            self.write(&data[written..written + take])?;
            written += take;
        }
        Ok(written)
    }

    /// Reads whatever is buffered, up to `dest.len()`, without waiting.
    pub fn try_read(&self, dest: &mut [u8]) -> Result<usize> {
        let n = self.inner.lock().read(dest)?;
        self.space_ready.notify_one();
        Ok(n)
    }

    /// Reads exactly `dest.len()` bytes, or nothing.
    ///
    /// Fails with `NotEnoughData` when fewer bytes are buffered; nothing is
    /// consumed in that case.
    pub fn read_unit(&self, dest: &mut [u8]) -> Result<()> {
        {
            let mut ring = self.inner.lock();
            let available = ring.buffered();
            if available < dest.len() {
                return Err(ProbeError::NotEnoughData {
                    needed: dest.len(),
                    available,
                });
            }
            ring.read(dest)?;
        }
        self.space_ready.notify_one();
        Ok(())
    }

    /// Reads up to `dest.len()` bytes.
    ///
    /// Non-blocking mode fails with `EmptyBuffer` when nothing is buffered.
    /// Blocking mode waits for the producer instead and returns `Ok(0)` if
    /// `cancel` fires first.
    pub async fn read(&self, dest: &mut [u8], cancel: &CancellationToken) -> Result<usize> {
        loop {
            match self.try_read(dest) {
                Err(ProbeError::EmptyBuffer) if self.blocking => {
                    tokio::select! {
                        _ = cancel.cancelled() => return Ok(0),
                        _ = self.data_ready.notified() => {}
                    }
                }
                other => return other,
            }
        }
    }

    /// Suspends the consumer until new data may be available.
    ///
    /// Blocking mode waits for the next write. Non-blocking mode also wakes
    /// on the next write but gives up after `poll_interval`. Returns `false`
    /// if `cancel` fired.
    pub async fn wait_for_data(&self, cancel: &CancellationToken, poll_interval: Duration) -> bool {
        if self.blocking {
            tokio::select! {
                _ = cancel.cancelled() => false,
                _ = self.data_ready.notified() => true,
            }
        } else {
            tokio::select! {
                _ = cancel.cancelled() => false,
                _ = self.data_ready.notified() => true,
                _ = tokio::time::sleep(poll_interval) => true,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use quickcheck_macros::quickcheck;
    use std::sync::Arc;

    #[test]
    fn test_zero_capacity() {
        assert!(matches!(
            RingBuffer::new(0),
            Err(ProbeError::InvalidCapacity(0))
        ));
    }

    #[test]
    fn test_write_read_wraparound() {
        let mut ring = RingBuffer::new(8).unwrap();
        let mut out = [0u8; 8];

        ring.write(&[1, 2, 3, 4, 5]).unwrap();
        assert_eq!(ring.read(&mut out[..4]).unwrap(), 4);
        assert_eq!(&out[..4], &[1, 2, 3, 4]);

        // write cursor at 5, read cursor at 4: this write wraps
        ring.write(&[6, 7, 8, 9, 10]).unwrap();
        assert_eq!(ring.buffered(), 6);
        assert_eq!(ring.read(&mut out).unwrap(), 6);
        assert_eq!(&out[..6], &[5, 6, 7, 8, 9, 10]);
        assert!(ring.is_empty());
        assert_eq!(ring.total_written(), 10);
    }

    #[test]
    fn test_overflow_rejected_without_mutation() {
        let mut ring = RingBuffer::new(8).unwrap();
        assert!(matches!(
            ring.write(&[0; 8]),
            Err(ProbeError::Overflow {
                requested: 8,
                available: 7
            })
        ));
        assert_eq!(ring.buffered(), 0);
        assert_eq!(ring.total_written(), 0);

        ring.write(&[1; 7]).unwrap();
        assert_eq!(ring.free_space(), 0);
        assert!(ring.write(&[2]).is_err());
        assert_eq!(ring.buffered(), 7);

        let mut out = [0u8; 7];
        ring.read(&mut out).unwrap();
        assert_eq!(out, [1; 7]);
    }

    #[test]
    fn test_overflow_when_write_behind_read() {
        let mut ring = RingBuffer::new(10).unwrap();
        let mut out = [0u8; 10];
        ring.write(&[0; 8]).unwrap();
        ring.read(&mut out[..6]).unwrap();
        ring.write(&[0; 4]).unwrap(); // write_pos = 2, read_pos = 6
        assert_eq!(ring.free_space(), 3);
        assert!(ring.write(&[0; 4]).is_err());
        assert!(ring.write(&[0; 3]).is_ok());
    }

    #[test]
    fn test_empty_read_and_reset() {
        let mut ring = RingBuffer::new(4).unwrap();
        let mut out = [0u8; 4];
        assert!(matches!(ring.read(&mut out), Err(ProbeError::EmptyBuffer)));

        ring.write(&[9, 9]).unwrap();
        ring.reset();
        assert_eq!(ring.buffered(), 0);
        assert_eq!(ring.total_written(), 0);
        assert!(matches!(ring.read(&mut out), Err(ProbeError::EmptyBuffer)));
    }

    #[test]
    fn test_short_read() {
        let mut ring = RingBuffer::new(16).unwrap();
        ring.write(&[1, 2, 3]).unwrap();
        let mut out = [0u8; 10];
        assert_eq!(ring.read(&mut out).unwrap(), 3);
    }

    #[quickcheck]
    fn prop_round_trip(chunks: Vec<Vec<u8>>, capacity: u8, read_size: u8) -> bool {
        let capacity = capacity as usize + 2;
        let read_size = read_size as usize % capacity + 1;
        let mut ring = RingBuffer::new(capacity).unwrap();

        let mut written = Vec::new();
        let mut read_back = Vec::new();
        let mut dest = vec![0u8; read_size];

        for chunk in chunks {
            let chunk = &chunk[..chunk.len().min(capacity - 1)];
            // drain until the chunk fits
            while ring.free_space() < chunk.len() {
                match ring.read(&mut dest) {
                    Ok(n) => read_back.extend_from_slice(&dest[..n]),
                    Err(_) => return false,
                }
            }
            if ring.write(chunk).is_err() {
                return false;
            }
            written.extend_from_slice(chunk);
        }
        while let Ok(n) = ring.read(&mut dest) {
            read_back.extend_from_slice(&dest[..n]);
        }

        written == read_back && ring.total_written() == written.len() as u64
    }

    #[quickcheck]
    fn prop_buffered_matches_accounting(ops: Vec<(bool, u8)>) -> bool {
        let mut ring = RingBuffer::new(64).unwrap();
        let mut written = 0usize;
        let mut read = 0usize;
        let mut dest = [0u8; 256];

        for (is_write, len) in ops {
            let len = len as usize;
            if is_write {
                let before = (ring.buffered(), ring.total_written());
                match ring.write(&vec![0xAB; len]) {
                    Ok(n) => written += n,
                    Err(_) => {
                        if (ring.buffered(), ring.total_written()) != before {
                            return false;
                        }
                    }
                }
            } else if let Ok(n) = ring.read(&mut dest[..len]) {
                read += n;
            }
            if ring.buffered() != written - read {
                return false;
            }
        }
        true
    }

    #[tokio::test]
    async fn test_shared_read_unit_is_all_or_nothing() {
        let ring = SharedRingBuffer::new(32, false).unwrap();
        ring.write(&[1, 2, 3]).unwrap();

        let mut unit = [0u8; 4];
        assert!(matches!(
            ring.read_unit(&mut unit),
            Err(ProbeError::NotEnoughData {
                needed: 4,
                available: 3
            })
        ));
        assert_eq!(ring.buffered(), 3);

        ring.write(&[4]).unwrap();
        ring.read_unit(&mut unit).unwrap();
        assert_eq!(unit, [1, 2, 3, 4]);
    }

    #[tokio::test]
    async fn test_shared_non_blocking_errors() {
        let ring = SharedRingBuffer::new(8, false).unwrap();
        let cancel = CancellationToken::new();
        let mut out = [0u8; 4];

        assert!(matches!(
            ring.read(&mut out, &cancel).await,
            Err(ProbeError::EmptyBuffer)
        ));
        assert!(matches!(
            ring.write_all(&[0; 8], &cancel).await,
            Err(ProbeError::Overflow { .. })
        ));
        assert_eq!(ring.total_written(), 0);
    }

    #[tokio::test]
    async fn test_shared_blocking_read_waits_for_writer() {
        let ring = Arc::new(SharedRingBuffer::new(16, true).unwrap());
        let cancel = CancellationToken::new();

        let writer = {
            let ring = ring.clone();
            tokio::spawn(async move {
                tokio::time::sleep(Duration::from_millis(20)).await;
                ring.write(&[7, 8, 9]).unwrap();
            })
        };

        let mut out = [0u8; 8];
        let n = ring.read(&mut out, &cancel).await.unwrap();
        assert_eq!(&out[..n], &[7, 8, 9]);
        writer.await.unwrap();
    }

    #[tokio::test]
    async fn test_shared_blocking_read_cancelled() {
        let ring = SharedRingBuffer::new(16, true).unwrap();
        let cancel = CancellationToken::new();
        cancel.cancel();

        let mut out = [0u8; 8];
        assert_eq!(ring.read(&mut out, &cancel).await.unwrap(), 0);
        assert!(!ring.wait_for_data(&cancel, Duration::from_millis(1)).await);
    }

    #[tokio::test]
    async fn test_shared_blocking_write_applies_backpressure() {
        let ring = Arc::new(SharedRingBuffer::new(8, true).unwrap());
        let cancel = CancellationToken::new();
        let payload: Vec<u8> = (0..40).collect();

        let reader = {
            let ring = ring.clone();
            let cancel = cancel.clone();
            tokio::spawn(async move {
                let mut collected = Vec::new();
                let mut out = [0u8; 3];
                while collected.len() < 40 {
                    let n = ring.read(&mut out, &cancel).await.unwrap();
                    collected.extend_from_slice(&out[..n]);
                }
                collected
            })
        };

        let written = ring.write_all(&payload, &cancel).await.unwrap();
        assert_eq!(written, 40);
        assert_eq!(reader.await.unwrap(), payload);
        assert_eq!(ring.total_written(), 40);
    }

    #[tokio::test]
    async fn test_shared_reset_wakes_blocked_writer() {
        let ring = SharedRingBuffer::new(4, true).unwrap();
        let cancel = CancellationToken::new();
        assert!(ring.is_blocking());
        assert_eq!(ring.capacity(), 4);

        let pending = ring.write_all(&[1, 2, 3, 4, 5, 6], &cancel);
        let resetter = async {
            tokio::time::sleep(Duration::from_millis(10)).await;
            ring.reset();
        };
        let (written, _) = tokio::join!(pending, resetter);

        // first three bytes were discarded by the reset
        assert_eq!(written.unwrap(), 6);
        assert_eq!(ring.buffered(), 3);
        assert_eq!(ring.total_written(), 3);
        let mut out = [0u8; 3];
        ring.read_unit(&mut out).unwrap();
        assert_eq!(out, [4, 5, 6]);
    }

    #[tokio::test]
    async fn test_shared_non_blocking_wait_wakes_on_write() {
        let ring = SharedRingBuffer::new(16, false).unwrap();
        let cancel = CancellationToken::new();

        let waiter = ring.wait_for_data(&cancel, Duration::from_secs(3600));
        let writer = async {
            tokio::time::sleep(Duration::from_millis(10)).await;
            ring.write(&[1]).unwrap();
        };
        let (woken, _) = tokio::time::timeout(Duration::from_secs(5), async {
            tokio::join!(waiter, writer)
        })
        .await
        .unwrap();
        assert!(woken);
    }

    #[tokio::test]
    async fn test_shared_blocking_write_cancelled_when_full() {
        let ring = SharedRingBuffer::new(4, true).unwrap();
        let cancel = CancellationToken::new();

        let pending = ring.write_all(&[1, 2, 3, 4, 5, 6], &cancel);
        let canceller = async {
            tokio::time::sleep(Duration::from_millis(10)).await;
            cancel.cancel();
        };
        let (written, _) = tokio::join!(pending, canceller);
        assert_eq!(written.unwrap(), 3);
        assert_eq!(ring.buffered(), 3);
    }
}
