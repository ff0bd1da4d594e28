#![doc(html_root_url = "https://docs.rs/tsprobe/0.1.0")]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![deny(rustdoc::missing_crate_level_docs)]

//! # tsprobe - Live MPEG Transport Stream Prober
//!
//! `tsprobe` watches an MPEG transport stream while it is being received and
//! reports on its health. Bytes from any async source are staged in a bounded
//! ring buffer, cut into 188-byte packets, parsed, and fed to an analyzer that
//! tracks one program id.
//!
//! ## Features
//!
//! - TS header, adaptation field and PCR parsing
//! - PES header parsing with PTS/DTS extraction
//! - Continuity counter error detection
//! - Stream duration from the first and last PTS
//! - Blocking (backpressure) or non-blocking (fail on overflow) buffering
//! - Cancellation through `tokio_util`'s `CancellationToken`
//!
//! ## Quick Start
//!
//! Add this to your `Cargo.toml`:
//!
//! ```toml
//! [dependencies]
//! tsprobe = "0.1.0"
//! ```
//!
//! ### Probing a File
//!
//! ```rust,no_run
//! use tsprobe::config::DemuxConfig;
//! use tsprobe::ts::TSDemuxer;
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let file = tokio::fs::File::open("capture.ts").await?;
//!     let config = DemuxConfig::load()?.with_target_pid(256);
//!
//!     let report = TSDemuxer::new(file, config)?
//!         .run(CancellationToken::new())
//!         .await?;
//!     println!("{}", report);
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Module Overview
//!
//! - `ts`: transport stream parsing, analysis and the probe pipeline
//! - `utils`: the ring buffer shared by ingestion and consumption
//! - `config`: run settings from defaults, a config file and the environment
//! - `error`: the crate error type and `Result` alias
//!
/// Configuration module
pub mod config;

/// Error types and utilities
pub mod error;

/// MPEG transport stream parsing and probing
pub mod ts;

/// Common utilities and helper functions
pub mod utils;

pub use error::{ProbeError, Result};
