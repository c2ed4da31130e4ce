//! Intermediate record files (`*.bin`) shared between build stages
//!
//! Format (little-endian):
//!
//! Header (32 bytes):
//!   magic:        u32 = 0x42544d50  // "BTMP"
//!   version:      u16 = 1
//!   reserved:     u16 = 0
//!   count:        u64   number of records
//!   payload_len:  u64   bytes of bincode payload
//!   reserved2:    [8]u8
//!
//! Body: bincode encoding of the record vector
//!
//! Footer (16 bytes):
//!   body_crc64: u64
//!   file_crc64: u64

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;

use serde::de::DeserializeOwned;
use serde::Serialize;

use super::crc::{self, FOOTER_SIZE};
use crate::error::{Error, Result};

const MAGIC: u32 = 0x42544d50; // "BTMP"
const VERSION: u16 = 1;
const HEADER_SIZE: usize = 32;

/// Reader/writer for record vectors
pub struct TempFile;

impl TempFile {
    pub fn write<P, T>(path: P, records: &[T]) -> Result<()>
    where
        P: AsRef<Path>,
        T: Serialize,
    {
        let path = path.as_ref();
        let body = bincode::serialize(records)?;
        Self::write_payload(path, records.len() as u64, &body)
    }

    /// Write a single value (a snapshot rather than a record list)
    pub fn write_value<P, T>(path: P, value: &T) -> Result<()>
    where
        P: AsRef<Path>,
        T: Serialize,
    {
        let body = bincode::serialize(value)?;
        Self::write_payload(path.as_ref(), 1, &body)
    }

    pub fn read<P, T>(path: P) -> Result<Vec<T>>
    where
        P: AsRef<Path>,
        T: DeserializeOwned,
    {
        let (count, body) = Self::read_payload(path.as_ref())?;
        let records: Vec<T> = bincode::deserialize(&body)?;
        if records.len() as u64 != count {
            return Err(Error::Truncated {
                path: path.as_ref().to_path_buf(),
                detail: format!("header says {count} records, found {}", records.len()),
            });
        }
        Ok(records)
    }

    pub fn read_value<P, T>(path: P) -> Result<T>
    where
        P: AsRef<Path>,
        T: DeserializeOwned,
    {
        let (_, body) = Self::read_payload(path.as_ref())?;
        Ok(bincode::deserialize(&body)?)
    }

    /// Number of records without decoding them
    pub fn count<P: AsRef<Path>>(path: P) -> Result<u64> {
        Ok(Self::read_payload(path.as_ref())?.0)
    }

    fn write_payload(path: &Path, count: u64, body: &[u8]) -> Result<()> {
        let mut writer = BufWriter::new(File::create(path)?);

        let mut header = Vec::with_capacity(HEADER_SIZE);
        header.extend_from_slice(&MAGIC.to_le_bytes());
        header.extend_from_slice(&VERSION.to_le_bytes());
        header.extend_from_slice(&0u16.to_le_bytes()); // reserved
        header.extend_from_slice(&count.to_le_bytes());
        header.extend_from_slice(&(body.len() as u64).to_le_bytes());
        header.resize(HEADER_SIZE, 0);

        writer.write_all(&header)?;
        writer.write_all(body)?;
        writer.write_all(&crc::footer(&header, body))?;
        writer.flush()?;
        Ok(())
    }

    fn read_payload(path: &Path) -> Result<(u64, Vec<u8>)> {
        let mut data = fs::read(path)?;
        if data.len() < HEADER_SIZE + FOOTER_SIZE {
            return Err(Error::Truncated {
                path: path.to_path_buf(),
                detail: format!("{} bytes", data.len()),
            });
        }

        let magic = u32::from_le_bytes([data[0], data[1], data[2], data[3]]);
        if magic != MAGIC {
            return Err(Error::InvalidMagic {
                path: path.to_path_buf(),
                expected: MAGIC,
                found: magic,
            });
        }
        let version = u16::from_le_bytes([data[4], data[5]]);
        if version != VERSION {
            return Err(Error::UnsupportedVersion {
                path: path.to_path_buf(),
                version,
            });
        }
        let count = le_u64(&data[8..16]);
        let payload_len = le_u64(&data[16..24]) as usize;
        if data.len() != HEADER_SIZE + payload_len + FOOTER_SIZE {
            return Err(Error::Truncated {
                path: path.to_path_buf(),
                detail: format!(
                    "expected {} bytes, found {}",
                    HEADER_SIZE + payload_len + FOOTER_SIZE,
                    data.len()
                ),
            });
        }

        crc::verify_footer(path, &data, HEADER_SIZE)?;
        let footer_start = HEADER_SIZE + payload_len;
        data.truncate(footer_start);
        data.drain(..HEADER_SIZE);
        Ok((count, data))
    }
}

fn le_u64(bytes: &[u8]) -> u64 {
    let mut buf = [0u8; 8];
    buf.copy_from_slice(&bytes[..8]);
    u64::from_le_bytes(buf)
}

/// Remove a temp file, ignoring one that does not exist
pub fn remove_temp_file<P: AsRef<Path>>(path: P) -> Result<()> {
    match fs::remove_file(path.as_ref()) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}
