//! PCR and PTS/DTS reconstruction from their packed wire layouts.

use super::types::{PCR_HZ, PTS_HZ, PTS_WRAP};
use crate::error::{ProbeError, Result};
use std::time::Duration;

pub const PCR_FIELD_SIZE: usize = 6;
pub const PTS_FIELD_SIZE: usize = 5;

fn check_len(bytes: &[u8], expected: usize) -> Result<()> {
    if bytes.len() != expected {
        return Err(ProbeError::InvalidInputLength {
            expected,
            actual: bytes.len(),
        });
    }
    Ok(())
}

/// Decodes a 6-byte PCR field into 27 MHz ticks.
///
/// Layout: 33-bit base (90 kHz), 6 reserved bits, 9-bit extension.
/// The result is `base * 300 + extension`.
pub fn decode_pcr(bytes: &[u8]) -> Result<u64> {
    check_len(bytes, PCR_FIELD_SIZE)?;
    let b = |i: usize| bytes[i] as u64;

    let base = (b(0) << 25) | (b(1) << 17) | (b(2) << 9) | (b(3) << 1) | (b(4) >> 7);
    let ext = ((b(4) & 0x01) << 8) | b(5);
    Ok(base * 300 + ext)
}

/// Decodes a 5-byte PTS or DTS field into 90 kHz ticks.
///
/// The 33 timestamp bits are split 3/15/15 with a marker bit after each
/// group; the leading 4-bit prefix and the markers are dropped.
pub fn decode_pts(bytes: &[u8]) -> Result<u64> {
    check_len(bytes, PTS_FIELD_SIZE)?;
    let b = |i: usize| bytes[i] as u64;

    Ok((((b(0) >> 1) & 0x07) << 30)
        | (b(1) << 22)
        | (((b(2) >> 1) & 0x7f) << 15)
        | (b(3) << 7)
        | ((b(4) >> 1) & 0x7f))
}

/// Ticks from `first` to `last`, assuming at most one 33-bit wrap in between.
pub fn pts_delta(first: u64, last: u64) -> u64 {
    let first = first % PTS_WRAP;
    let last = last % PTS_WRAP;
    if last >= first {
        last - first
    } else {
        PTS_WRAP - first + last
    }
}

pub fn pts_to_duration(ticks: u64) -> Duration {
    Duration::from_nanos(((ticks as u128 * 1_000_000_000) / PTS_HZ as u128) as u64)
}

pub fn pcr_to_duration(ticks: u64) -> Duration {
    Duration::from_nanos(((ticks as u128 * 1_000_000_000) / PCR_HZ as u128) as u64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    /// Packs a PTS the way a muxer does, with prefix `0b0010` and markers set.
    fn encode_pts(pts: u64) -> [u8; 5] {
        [
            0x20 | (((pts >> 29) & 0x0e) as u8) | 0x01,
            (pts >> 22) as u8,
            (((pts >> 14) & 0xfe) as u8) | 0x01,
            (pts >> 7) as u8,
            (((pts << 1) & 0xfe) as u8) | 0x01,
        ]
    }

    #[test]
    fn test_pcr_zero() {
        assert_eq!(decode_pcr(&[0, 0, 0, 0, 0, 0]).unwrap(), 0);
    }

    #[test]
    fn test_pcr_golden_vector() {
        // base = 0x12345678 << 1 | 1 = 0x2468ACF1, ext = 0x155
        let bytes = [0x12, 0x34, 0x56, 0x78, 0xff, 0x55];
        let base: u64 = (0x12 << 25) | (0x34 << 17) | (0x56 << 9) | (0x78 << 1) | 1;
        assert_eq!(base, 0x2468_acf1);
        assert_eq!(decode_pcr(&bytes).unwrap(), base * 300 + 0x155);
    }

    #[test]
    fn test_pcr_max() {
        let bytes = [0xff, 0xff, 0xff, 0xff, 0xff, 0xff];
        assert_eq!(decode_pcr(&bytes).unwrap(), ((1u64 << 33) - 1) * 300 + 0x1ff);
    }

    #[test]
    fn test_pts_zero_with_markers() {
        assert_eq!(decode_pts(&[0x21, 0x00, 0x01, 0x00, 0x01]).unwrap(), 0);
    }

    #[test]
    fn test_pts_golden_vectors() {
        assert_eq!(decode_pts(&encode_pts(90_000)).unwrap(), 90_000);
        assert_eq!(decode_pts(&[0x21, 0x00, 0x05, 0xbf, 0x21]).unwrap(), 90_000);

        let max = PTS_WRAP - 1;
        assert_eq!(decode_pts(&encode_pts(max)).unwrap(), max);
        assert_eq!(decode_pts(&encode_pts(0x1_2345_6789)).unwrap(), 0x1_2345_6789);
    }

    #[test]
    fn test_wrong_lengths() {
        assert!(matches!(
            decode_pcr(&[0; 5]),
            Err(ProbeError::InvalidInputLength {
                expected: 6,
                actual: 5
            })
        ));
        assert!(matches!(
            decode_pts(&[0; 6]),
            Err(ProbeError::InvalidInputLength {
                expected: 5,
                actual: 6
            })
        ));
    }

    #[test]
    fn test_pts_delta_wraps() {
        assert_eq!(pts_delta(0, 90_000), 90_000);
        assert_eq!(pts_delta(PTS_WRAP - 100, 200), 300);
        assert_eq!(pts_delta(5, 5), 0);
    }

    #[test]
    fn test_durations() {
        assert_eq!(pts_to_duration(90_000), Duration::from_secs(1));
        assert_eq!(pts_to_duration(45_000), Duration::from_millis(500));
        assert_eq!(pcr_to_duration(27_000_000 * 3), Duration::from_secs(3));
    }
}
