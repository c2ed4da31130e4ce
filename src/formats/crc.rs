//! CRC-64-ISO footers shared by tile and temp files
//!
//! Every file ends with two checksums: `body_crc64` over the records and
//! `file_crc64` over header and body.

use std::path::Path;

use crc::{Crc, CRC_64_GO_ISO};

use crate::error::{Error, Result};

pub const CRC64: Crc<u64> = Crc::<u64>::new(&CRC_64_GO_ISO);

pub const FOOTER_SIZE: usize = 16;

pub fn checksum(data: &[u8]) -> u64 {
    CRC64.checksum(data)
}

/// Footer bytes for a file made of `header` followed by `body`
pub fn footer(header: &[u8], body: &[u8]) -> [u8; FOOTER_SIZE] {
    let mut file_digest = CRC64.digest();
    file_digest.update(header);
    file_digest.update(body);

    let mut out = [0u8; FOOTER_SIZE];
    out[..8].copy_from_slice(&checksum(body).to_le_bytes());
    out[8..].copy_from_slice(&file_digest.finalize().to_le_bytes());
    out
}

/// Check the footer of a whole file whose body starts at `body_start`
pub fn verify_footer(path: &Path, data: &[u8], body_start: usize) -> Result<()> {
    let Some(footer_start) = data
        .len()
        .checked_sub(FOOTER_SIZE)
        .filter(|&start| start >= body_start)
    else {
        return Err(Error::Truncated {
            path: path.to_path_buf(),
            detail: format!("{} bytes, no room for the footer", data.len()),
        });
    };

    let stored = |at: usize| {
        let mut buf = [0u8; 8];
        buf.copy_from_slice(&data[at..at + 8]);
        u64::from_le_bytes(buf)
    };
    let checks = [
        (stored(footer_start), checksum(&data[body_start..footer_start])),
        (stored(footer_start + 8), checksum(&data[..footer_start])),
    ];
    for (expected, found) in checks {
        if expected != found {
            return Err(Error::ChecksumMismatch {
                path: path.to_path_buf(),
                expected,
                found,
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn file(header: &[u8], body: &[u8]) -> Vec<u8> {
        let mut data = header.to_vec();
        data.extend_from_slice(body);
        data.extend_from_slice(&footer(header, body));
        data
    }

    #[test]
    fn test_footer_roundtrip() {
        let data = file(b"HDR0", b"GPHT tile body");
        assert_eq!(data.len(), 4 + 14 + FOOTER_SIZE);
        assert!(verify_footer(Path::new("t"), &data, 4).is_ok());
    }

    #[test]
    fn test_header_corruption_caught_by_file_crc() {
        let mut data = file(b"HDR0", b"GPHT tile body");
        data[0] ^= 0xff;
        let err = verify_footer(Path::new("t"), &data, 4).unwrap_err();
        assert!(matches!(err, Error::ChecksumMismatch { .. }));
    }

    #[test]
    fn test_short_file() {
        let err = verify_footer(Path::new("t"), &[0u8; 10], 4).unwrap_err();
        assert!(matches!(err, Error::Truncated { .. }));
    }
}
