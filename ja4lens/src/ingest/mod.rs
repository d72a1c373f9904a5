// ja4lens/src/ingest/mod.rs
//
// Capture upload boundary.
//
// Checks, in order:
//   1. size      ≤ 50 MB                       → 413 otherwise
//   2. extension .pcap / .pcapng (any case)    → 400 otherwise
//   3. magic     first 4 bytes, read big-endian:
//                  0xd4c3b2a1  pcap, little-endian
//                  0xa1b2c3d4  pcap, big-endian
//                  0x0a0d0d0a  pcapng section header block
//                anything else (or < 4 bytes)  → 400
//
// Only the header is inspected; the rest of the payload is the extraction
// tool's problem. Nothing that passes through here enters the index.

pub mod extractor;

use crate::error::IngestError;

pub const MAX_UPLOAD_BYTES: usize = 50 * 1024 * 1024;
pub const ALLOWED_EXTENSIONS: &[&str] = &[".pcap", ".pcapng"];

pub const PCAP_MAGIC_LE: u32 = 0xd4c3_b2a1;
pub const PCAP_MAGIC_BE: u32 = 0xa1b2_c3d4;
pub const PCAPNG_MAGIC:  u32 = 0x0a0d_0d0a;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureFormat {
    PcapLe,
    PcapBe,
    PcapNg,
}

impl std::fmt::Display for CaptureFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::PcapLe => write!(f, "pcap (little-endian)"),
            Self::PcapBe => write!(f, "pcap (big-endian)"),
            Self::PcapNg => write!(f, "pcapng"),
        }
    }
}

pub fn check_size(len: usize) -> Result<(), IngestError> {
    if len > MAX_UPLOAD_BYTES {
        return Err(IngestError::TooLarge { size: len, max_mb: MAX_UPLOAD_BYTES / (1024 * 1024) });
    }
    Ok(())
}

pub fn check_extension(file_name: &str) -> Result<(), IngestError> {
    let name = file_name.to_lowercase();
    if ALLOWED_EXTENSIONS.iter().any(|ext| name.ends_with(ext)) {
        Ok(())
    } else {
        Err(IngestError::BadExtension(file_name.to_string()))
    }
}

pub fn validate_magic(buf: &[u8]) -> Result<CaptureFormat, IngestError> {
    let Some(head) = buf.get(..4) else {
        return Err(IngestError::TooSmall);
    };
    let magic = u32::from_be_bytes([head[0], head[1], head[2], head[3]]);
    match magic {
        PCAP_MAGIC_LE => Ok(CaptureFormat::PcapLe),
        PCAP_MAGIC_BE => Ok(CaptureFormat::PcapBe),
        PCAPNG_MAGIC  => Ok(CaptureFormat::PcapNg),
        other         => Err(IngestError::BadMagic(other)),
    }
}

/// Full upload gate: size, then extension, then magic bytes.
pub fn validate_upload(file_name: &str, buf: &[u8]) -> Result<CaptureFormat, IngestError> {
    check_size(buf.len())?;
    check_extension(file_name)?;
    validate_magic(buf)
}
