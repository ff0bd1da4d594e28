use crate::error::{ProbeError, Result};
use crate::ts::types::{MAX_PID, TS_PACKET_SIZE};
use std::env;
use std::fs;
use std::path::Path;
use std::time::Duration;

/// Default program id tracked by the analyzer.
pub const DEFAULT_TARGET_PID: u16 = 200;
/// Default ring buffer capacity (10 MiB).
pub const DEFAULT_BUFFER_CAPACITY: usize = 10 * 1024 * 1024;
/// Default size of a single read from the byte source.
pub const DEFAULT_READ_CHUNK_SIZE: usize = TS_PACKET_SIZE * 1024;
/// Default retry interval for the consumer in non-blocking mode.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(5);

const CONFIG_PATHS: [&str; 2] = ["./tsprobe.toml", "./tsprobe_config.toml"];

const TEMPLATE: &str = r#"# tsprobe configuration
# Copy this file to 'tsprobe.toml' and adjust the values.
# Environment variables (TSPROBE_TARGET_PID, ...) override these keys.

# Program id to track (decimal or 0x-prefixed hex)
target_pid = 200

# Ring buffer capacity in bytes
buffer_capacity = 10485760

# Suspend the consumer (and throttle the producer) instead of failing fast
blocking = true

# Bytes requested from the source per read
read_chunk_size = 192512

# Consumer retry interval in non-blocking mode, milliseconds
poll_interval_ms = 5
"#;

/// Runtime settings for one demux run.
#[derive(Debug, Clone, PartialEq)]
pub struct DemuxConfig {
    /// Program id whose continuity and timestamps are tracked
    pub target_pid: u16,
    /// Ring buffer capacity in bytes
    pub buffer_capacity: usize,
    /// Blocking mode for the ring buffer
    pub blocking: bool,
    /// Bytes requested from the source per read
    pub read_chunk_size: usize,
    /// Consumer retry interval when not in blocking mode
    pub poll_interval: Duration,
}

impl Default for DemuxConfig {
    fn default() -> Self {
        Self {
            target_pid: DEFAULT_TARGET_PID,
            buffer_capacity: DEFAULT_BUFFER_CAPACITY,
            blocking: true,
            read_chunk_size: DEFAULT_READ_CHUNK_SIZE,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }
}

impl DemuxConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads defaults, then the first config file found, then `TSPROBE_*`
    /// environment variables.
    pub fn load() -> Result<Self> {
        let file = CONFIG_PATHS
            .iter()
            .find_map(|path| fs::read_to_string(path).ok());
        Self::from_sources(file.as_deref(), |key| env::var(key).ok())
    }

    /// Builds a config from optional file contents and an environment lookup.
    pub fn from_sources<F>(file: Option<&str>, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(content) = file {
            for line in content.lines() {
                let line = line.trim();
                if line.is_empty() || line.starts_with('#') {
                    continue;
                }
                let Some((key, value)) = line.split_once('=') else {
                    continue;
                };
                // trailing `# ...` comments, as TOML allows
                let value = value.split_once('#').map_or(value, |(value, _)| value);
                let value = value.trim().trim_matches('"').trim_matches('\'');
                config.apply(key.trim(), value)?;
            }
        }

        for (var, key) in [
            ("TSPROBE_TARGET_PID", "target_pid"),
            ("TSPROBE_BUFFER_CAPACITY", "buffer_capacity"),
            ("TSPROBE_BLOCKING", "blocking"),
            ("TSPROBE_READ_CHUNK_SIZE", "read_chunk_size"),
            ("TSPROBE_POLL_INTERVAL_MS", "poll_interval_ms"),
        ] {
            if let Some(value) = lookup(var) {
                config.apply(key, value.trim())?;
            }
        }

        config.validate()?;
        Ok(config)
    }

    fn apply(&mut self, key: &str, value: &str) -> Result<()> {
        match key {
            "target_pid" => self.target_pid = parse_pid(value)?,
            "buffer_capacity" => self.buffer_capacity = parse_number(key, value)?,
            "blocking" => self.blocking = parse_bool(key, value)?,
            "read_chunk_size" => self.read_chunk_size = parse_number(key, value)?,
            "poll_interval_ms" => {
                self.poll_interval = Duration::from_millis(parse_number(key, value)? as u64)
            }
            // unknown keys are ignored
            _ => {}
        }
        Ok(())
    }

    pub fn with_target_pid(mut self, pid: u16) -> Self {
        self.target_pid = pid;
        self
    }

    pub fn with_buffer_capacity(mut self, capacity: usize) -> Self {
        self.buffer_capacity = capacity;
        self
    }

    pub fn with_blocking(mut self, blocking: bool) -> Self {
        self.blocking = blocking;
        self
    }

    pub fn with_read_chunk_size(mut self, size: usize) -> Self {
        self.read_chunk_size = size;
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Checks value ranges. Buffer capacity itself is checked by the ring buffer.
    pub fn validate(&self) -> Result<()> {
        if self.target_pid > MAX_PID {
            return Err(ProbeError::Config(format!(
                "target_pid {:#x} exceeds 13 bits",
                self.target_pid
            )));
        }
        if self.read_chunk_size == 0 {
            return Err(ProbeError::Config("read_chunk_size must be > 0".into()));
        }
        if self.poll_interval.is_zero() {
            return Err(ProbeError::Config("poll_interval must be > 0".into()));
        }
        Ok(())
    }
}

fn parse_pid(value: &str) -> Result<u16> {
    let parsed = match value.strip_prefix("0x").or_else(|| value.strip_prefix("0X")) {
        Some(hex) => u16::from_str_radix(hex, 16),
        None => value.parse::<u16>(),
    };
    parsed.map_err(|e| ProbeError::Config(format!("target_pid '{}': {}", value, e)))
}

fn parse_number(key: &str, value: &str) -> Result<usize> {
    value
        .parse::<usize>()
        .map_err(|e| ProbeError::Config(format!("{} '{}': {}", key, value, e)))
}

fn parse_bool(key: &str, value: &str) -> Result<bool> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ProbeError::Config(format!("{} '{}': not a boolean", key, value))),
    }
}

/// Creates a default config template file if it doesn't exist
pub fn create_default_config_template<P: AsRef<Path>>(path: P) -> std::io::Result<()> {
    if !path.as_ref().exists() {
        fs::write(path, TEMPLATE)?;
    }
    Ok(())
}
