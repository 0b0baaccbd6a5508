//! Artifact codec
//!
//! Layout: `MAGIC` (4 bytes), format version (1 byte), SHA-256 of the
//! payload (32 bytes), payload. The payload is gzip over bincode.

use super::{PersistenceError, PersistenceResult};
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use serde::de::DeserializeOwned;
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::fs;
use std::io::{Read, Write};
use std::path::Path;
use tempfile::NamedTempFile;
use tracing::debug;

pub const MAGIC: [u8; 4] = *b"CWKG";
pub const FORMAT_VERSION: u8 = 1;

const DIGEST_LEN: usize = 32;
const HEADER_LEN: usize = MAGIC.len() + 1 + DIGEST_LEN;

/// Serialize, compress and frame a value
pub fn encode<T: Serialize>(value: &T) -> PersistenceResult<Vec<u8>> {
    let raw = bincode::serialize(value)?;

    let mut encoder = GzEncoder::new(Vec::with_capacity(raw.len() / 2), Compression::default());
    encoder.write_all(&raw)?;
    let payload = encoder.finish()?;

    let digest = Sha256::digest(&payload);

    let mut bytes = Vec::with_capacity(HEADER_LEN + payload.len());
    bytes.extend_from_slice(&MAGIC);
    bytes.push(FORMAT_VERSION);
    bytes.extend_from_slice(&digest);
    bytes.extend_from_slice(&payload);
    Ok(bytes)
}

/// Verify the frame and decode the value inside it
pub fn decode<T: DeserializeOwned>(bytes: &[u8]) -> PersistenceResult<T> {
    if bytes.len() < HEADER_LEN {
        return Err(PersistenceError::Corrupt(format!(
            "{} bytes is shorter than the {}-byte header",
            bytes.len(),
            HEADER_LEN
        )));
    }

    let (magic, rest) = bytes.split_at(MAGIC.len());
    if magic != MAGIC {
        return Err(PersistenceError::Corrupt("bad magic".to_string()));
    }

    let (version, rest) = rest.split_at(1);
    if version[0] != FORMAT_VERSION {
        return Err(PersistenceError::Mismatch(format!(
            "format version {} (expected {})",
            version[0], FORMAT_VERSION
        )));
    }

    let (digest, payload) = rest.split_at(DIGEST_LEN);
    if Sha256::digest(payload).as_slice() != digest {
        return Err(PersistenceError::Corrupt("checksum mismatch".to_string()));
    }

    let mut raw = Vec::new();
    GzDecoder::new(payload)
        .read_to_end(&mut raw)
        .map_err(|e| PersistenceError::Corrupt(format!("decompression failed: {}", e)))?;

    Ok(bincode::deserialize(&raw)?)
}

/// Write `bytes` to a uniquely named temporary sibling and rename it over
/// `path`. The temporary file is removed if any step fails.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> PersistenceResult<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    fs::create_dir_all(dir)?;

    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(bytes)?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| PersistenceError::Io(e.error))?;
    Ok(())
}

/// Encode `value` and write it atomically to `path`
pub fn save<T: Serialize>(path: &Path, value: &T) -> PersistenceResult<()> {
    let bytes = encode(value)?;
    write_atomic(path, &bytes)?;
    debug!("Wrote {} bytes to {:?}", bytes.len(), path);
    Ok(())
}

/// Read and decode the artifact at `path`
pub fn load<T: DeserializeOwned>(path: &Path) -> PersistenceResult<T> {
    let bytes = fs::read(path)?;
    debug!("Read {} bytes from {:?}", bytes.len(), path);
    decode(&bytes)
}
