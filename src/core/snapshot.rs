//! Binary snapshot format for formatted logs.
//!
//! Layout (all little-endian):
//!
//! ```text
//! offset  size  field
//! 0       4     magic "PLSN"
//! 4       2     version
//! 6       2     flags (0)
//! 8       8     sample count N
//! 16      4     crc32 of the payload
//! 20      4     reserved (0)
//! 24      8*N   timestamps, i64 microseconds since 1970-01-01T00:00:00
//! ..      8*N   positions, f32 x then f32 y per sample
//! ```
//!
//! Snapshots are a reload cache for this crate, not an interchange format.

use chrono::{DateTime, NaiveDateTime};
use thiserror::Error;

use super::transforms::FormattedLog;

pub const MAGIC: [u8; 4] = *b"PLSN";
pub const VERSION: u16 = 1;
pub const HEADER_SIZE: usize = 24;

const VERSION_OFFSET: usize = 4;
const FLAGS_OFFSET: usize = 6;
const COUNT_OFFSET: usize = 8;
const CRC_OFFSET: usize = 16;
const RESERVED_OFFSET: usize = 20;

/// Bytes per sample: one i64 timestamp plus two f32 coordinates.
const SAMPLE_SIZE: usize = 16;

/// Errors raised while encoding or decoding a snapshot.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum SnapshotError {
    #[error("bad magic {0:?}")]
    BadMagic([u8; 4]),

    #[error("unsupported snapshot version {0}")]
    UnsupportedVersion(u16),

    #[error("snapshot truncated: expected {expected} bytes, found {found}")]
    Truncated { expected: usize, found: usize },

    #[error("snapshot has {0} trailing bytes")]
    TrailingBytes(usize),

    #[error("crc mismatch: header {expected:#010x}, payload {actual:#010x}")]
    CrcMismatch { expected: u32, actual: u32 },

    #[error("timestamps and positions differ in length ({timestamps} vs {positions})")]
    LengthMismatch { timestamps: usize, positions: usize },

    #[error("timestamp {0} out of calendar range")]
    TimestampOutOfRange(i64),
}

pub type Result<T> = std::result::Result<T, SnapshotError>;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SnapshotHeader {
    pub version: u16,
    pub flags: u16,
    pub count: u64,
    pub crc: u32,
}

impl SnapshotHeader {
    pub fn to_bytes(&self) -> [u8; HEADER_SIZE] {
        let mut buf = [0u8; HEADER_SIZE];
        buf[..VERSION_OFFSET].copy_from_slice(&MAGIC);
        buf[VERSION_OFFSET..FLAGS_OFFSET].copy_from_slice(&self.version.to_le_bytes());
        buf[FLAGS_OFFSET..COUNT_OFFSET].copy_from_slice(&self.flags.to_le_bytes());
        buf[COUNT_OFFSET..CRC_OFFSET].copy_from_slice(&self.count.to_le_bytes());
        buf[CRC_OFFSET..RESERVED_OFFSET].copy_from_slice(&self.crc.to_le_bytes());
        buf
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < HEADER_SIZE {
            return Err(SnapshotError::Truncated {
                expected: HEADER_SIZE,
                found: bytes.len(),
            });
        }

        let mut magic = [0u8; 4];
        magic.copy_from_slice(&bytes[..VERSION_OFFSET]);
        if magic != MAGIC {
            return Err(SnapshotError::BadMagic(magic));
        }

        let version = u16::from_le_bytes([bytes[VERSION_OFFSET], bytes[VERSION_OFFSET + 1]]);
        if version != VERSION {
            return Err(SnapshotError::UnsupportedVersion(version));
        }

        let flags = u16::from_le_bytes([bytes[FLAGS_OFFSET], bytes[FLAGS_OFFSET + 1]]);
        let count = read_u64(&bytes[COUNT_OFFSET..CRC_OFFSET]);
        let crc = read_u32(&bytes[CRC_OFFSET..RESERVED_OFFSET]);

        Ok(Self {
            version,
            flags,
            count,
            crc,
        })
    }
}

fn read_u32(bytes: &[u8]) -> u32 {
    let mut buf = [0u8; 4];
    buf.copy_from_slice(&bytes[..4]);
    u32::from_le_bytes(buf)
}

fn read_u64(bytes: &[u8]) -> u64 {
    let mut buf = [0u8; 8];
    buf.copy_from_slice(&bytes[..8]);
    u64::from_le_bytes(buf)
}

pub fn crc32(payload: &[u8]) -> u32 {
    use crc32fast::Hasher;
    let mut hasher = Hasher::new();
    hasher.update(payload);
    hasher.finalize()
}

/// Serialize a formatted log into snapshot bytes.
pub fn encode(log: &FormattedLog) -> Result<Vec<u8>> {
    if log.timestamps.len() != log.positions.len() {
        return Err(SnapshotError::LengthMismatch {
            timestamps: log.timestamps.len(),
            positions: log.positions.len(),
        });
    }

    let count = log.len();
    let mut payload = Vec::with_capacity(count * SAMPLE_SIZE);
    for ts in &log.timestamps {
        payload.extend_from_slice(&ts.and_utc().timestamp_micros().to_le_bytes());
    }
    for [x, y] in &log.positions {
        payload.extend_from_slice(&x.to_le_bytes());
        payload.extend_from_slice(&y.to_le_bytes());
    }

    let header = SnapshotHeader {
        version: VERSION,
        flags: 0,
        count: count as u64,
        crc: crc32(&payload),
    };

    let mut bytes = Vec::with_capacity(HEADER_SIZE + payload.len());
    bytes.extend_from_slice(&header.to_bytes());
    bytes.extend_from_slice(&payload);
    Ok(bytes)
}

/// Deserialize snapshot bytes back into a formatted log.
pub fn decode(bytes: &[u8]) -> Result<FormattedLog> {
    let header = SnapshotHeader::from_bytes(bytes)?;
    let payload = &bytes[HEADER_SIZE..];

    let expected = usize::try_from(header.count)
        .ok()
        .and_then(|n| n.checked_mul(SAMPLE_SIZE))
        .unwrap_or(usize::MAX);
    if payload.len() < expected {
        return Err(SnapshotError::Truncated {
            expected: HEADER_SIZE.saturating_add(expected),
            found: bytes.len(),
        });
    }
    if payload.len() > expected {
        return Err(SnapshotError::TrailingBytes(payload.len() - expected));
    }

    let actual = crc32(payload);
    if actual != header.crc {
        return Err(SnapshotError::CrcMismatch {
            expected: header.crc,
            actual,
        });
    }

    let count = header.count as usize;
    let (ts_bytes, pos_bytes) = payload.split_at(count * 8);

    let timestamps = ts_bytes
        .chunks_exact(8)
        .map(|chunk| {
            let micros = read_u64(chunk) as i64;
            DateTime::from_timestamp_micros(micros)
                .map(|dt| dt.naive_utc())
                .ok_or(SnapshotError::TimestampOutOfRange(micros))
        })
        .collect::<Result<Vec<NaiveDateTime>>>()?;

    let positions = pos_bytes
        .chunks_exact(8)
        .map(|chunk| {
            let x = f32::from_bits(read_u32(&chunk[..4]));
            let y = f32::from_bits(read_u32(&chunk[4..]));
            [x, y]
        })
        .collect();

    Ok(FormattedLog {
        timestamps,
        positions,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BEGIN_FORMAT;
    use chrono::Duration;

    fn sample() -> FormattedLog {
        let begin = NaiveDateTime::parse_from_str("2021-04-01 12:00:00", BEGIN_FORMAT).unwrap();
        FormattedLog {
            timestamps: vec![
                begin,
                begin + Duration::microseconds(250_001),
                begin + Duration::seconds(2),
            ],
            positions: vec![[1.0, -10.0], [2.5, f32::MAX], [-0.0, 1e-7]],
        }
    }

    #[test]
    fn crc_matches_known_payload() {
        assert_eq!(crc32(b"hello"), 0x3610A686);
    }

    #[test]
    fn header_layout() {
        let header = SnapshotHeader {
            version: VERSION,
            flags: 0,
            count: 3,
            crc: 0xDEAD_BEEF,
        };
        let bytes = header.to_bytes();

        assert_eq!(&bytes[..4], b"PLSN");
        assert_eq!(&bytes[4..6], &[1, 0]);
        assert_eq!(&bytes[8..16], &3u64.to_le_bytes());
        assert_eq!(&bytes[16..20], &[0xEF, 0xBE, 0xAD, 0xDE]);
        assert_eq!(&bytes[20..24], &[0, 0, 0, 0]);
        assert_eq!(SnapshotHeader::from_bytes(&bytes).unwrap(), header);
    }

    #[test]
    fn decode_restores_encoded_log() {
        let log = sample();
        let bytes = encode(&log).unwrap();

        assert_eq!(bytes.len(), HEADER_SIZE + 3 * SAMPLE_SIZE);
        assert_eq!(decode(&bytes).unwrap(), log);
    }

    #[test]
    fn empty_log_is_header_only() {
        let bytes = encode(&FormattedLog::default()).unwrap();

        assert_eq!(bytes.len(), HEADER_SIZE);
        assert!(decode(&bytes).unwrap().is_empty());
    }

    #[test]
    fn rejects_bad_magic_and_version() {
        let mut bytes = encode(&sample()).unwrap();
        bytes[0] = b'X';
        assert_eq!(decode(&bytes), Err(SnapshotError::BadMagic(*b"XLSN")));

        let mut bytes = encode(&sample()).unwrap();
        bytes[4] = 9;
        assert_eq!(decode(&bytes), Err(SnapshotError::UnsupportedVersion(9)));
    }

    #[test]
    fn rejects_truncated_and_trailing() {
        let bytes = encode(&sample()).unwrap();

        assert!(matches!(
            decode(&bytes[..bytes.len() - 1]),
            Err(SnapshotError::Truncated { .. })
        ));
        assert!(matches!(decode(&bytes[..10]), Err(SnapshotError::Truncated { .. })));

        let mut padded = bytes.clone();
        padded.push(0);
        assert_eq!(decode(&padded), Err(SnapshotError::TrailingBytes(1)));
    }

    #[test]
    fn rejects_corrupted_payload() {
        let mut bytes = encode(&sample()).unwrap();
        let last = bytes.len() - 1;
        bytes[last] ^= 0xFF;

        assert!(matches!(decode(&bytes), Err(SnapshotError::CrcMismatch { .. })));
    }

    #[test]
    fn rejects_length_mismatch() {
        let mut log = sample();
        log.positions.pop();

        assert_eq!(
            encode(&log),
            Err(SnapshotError::LengthMismatch {
                timestamps: 3,
                positions: 2
            })
        );
    }
}
