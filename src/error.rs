//! Error types for the tile codecs and file formats
//!
//! Structural violations of the binary format (a value that cannot be
//! represented at all) are reported through [`Error`]. Soft limits are
//! clamped and logged by the codecs instead, see [`crate::bits::Overflow`].

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for codec and format operations
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// A value exceeds the hard capacity of its bit field
    #[error("{field} exceeds max: {value} > {max}")]
    FieldOverflow {
        field: &'static str,
        value: u64,
        max: u64,
    },

    #[error("way ids larger than 63 bits are not allowed for transit connections: {0}")]
    WayIdOverflow(u64),

    #[error("invalid coordinates are not allowed for transit connections: ({lon}, {lat})")]
    InvalidConnectingPoint { lon: f64, lat: f64 },

    #[error("invalid magic in {path}: expected 0x{expected:08x}, got 0x{found:08x}")]
    InvalidMagic {
        path: PathBuf,
        expected: u32,
        found: u32,
    },

    #[error("unsupported version in {path}: {version}")]
    UnsupportedVersion { path: PathBuf, version: u16 },

    #[error("CRC mismatch in {path}: expected {expected:016x}, got {found:016x}")]
    ChecksumMismatch {
        path: PathBuf,
        expected: u64,
        found: u64,
    },

    #[error("{path} is truncated: {detail}")]
    Truncated { path: PathBuf, detail: String },

    #[error("invalid graph id: {0}")]
    InvalidGraphId(String),

    #[error("invalid build stage: {0}")]
    InvalidStage(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("record encoding error: {0}")]
    Encode(#[from] bincode::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
