//! # Utility Types
//!
//! Buffer management shared by the ingestion and consumption sides of the
//! pipeline.
//!
//! ## Ring Buffer
//!
//! ```rust
//! use tsprobe::utils::RingBuffer;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut ring = RingBuffer::new(4)?;
//!
//! // One slot stays free, so a 4-byte buffer holds at most 3 bytes
//! ring.write(&[1, 2, 3])?;
//! assert!(ring.write(&[4]).is_err());
//! # Ok(())
//! # }
//! ```

/// Circular byte buffers
pub mod ring_buffer;

pub use ring_buffer::{RingBuffer, SharedRingBuffer};
