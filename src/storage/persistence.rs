//! Checksummed snapshot files.
//!
//! Both on-disk formats (document store and graph topology) share one
//! framing: `[bincode payload][4-byte magic][CRC32 BE]`. Writes go to a
//! temp file in the same directory and are renamed into place so a crash
//! never leaves a half-written snapshot behind.

use crate::error::{Error, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs;
use std::path::Path;

/// Magic trailer of a document store snapshot.
pub const STORE_MAGIC: &[u8; 4] = b"UCS1";

/// Magic trailer of a graph topology snapshot.
pub const GRAPH_MAGIC: &[u8; 4] = b"UCG1";

/// Serializes `value` and writes it atomically to `path`.
pub fn save_snapshot<T: Serialize>(value: &T, path: &Path, magic: &[u8; 4]) -> Result<()> {
    let bytes =
        bincode::serialize(value).map_err(|e| Error::Corrupted(format!("encode: {e}")))?;
    let crc = crc32fast::hash(&bytes);

    let mut out = Vec::with_capacity(bytes.len() + 8);
    out.extend_from_slice(&bytes);
    out.extend_from_slice(magic);
    out.extend_from_slice(&crc.to_be_bytes());

    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir)?;
    }
    let mut tmp_name = path.file_name().unwrap_or_default().to_os_string();
    tmp_name.push(".tmp");
    let tmp_path = path.with_file_name(tmp_name);
    fs::write(&tmp_path, &out)?;
    fs::rename(&tmp_path, path)?;

    tracing::info!(
        "saved snapshot {:?} ({} bytes, CRC32={:#010x})",
        path,
        bytes.len(),
        crc
    );
    Ok(())
}

/// Reads a snapshot from `path`, verifying the magic trailer and CRC.
pub fn load_snapshot<T: DeserializeOwned>(path: &Path, magic: &[u8; 4]) -> Result<T> {
    let raw = fs::read(path)?;
    if raw.len() < 8 {
        return Err(Error::Corrupted(format!("snapshot {path:?} is truncated")));
    }

    let payload = &raw[..raw.len() - 8];
    let trailer = &raw[raw.len() - 8..raw.len() - 4];
    if trailer != magic {
        return Err(Error::Corrupted(format!(
            "snapshot {path:?} has wrong magic {trailer:02x?}"
        )));
    }

    let stored_crc = u32::from_be_bytes([
        raw[raw.len() - 4],
        raw[raw.len() - 3],
        raw[raw.len() - 2],
        raw[raw.len() - 1],
    ]);
    let computed_crc = crc32fast::hash(payload);
    if computed_crc != stored_crc {
        return Err(Error::Corrupted(format!(
            "snapshot {path:?} CRC32 mismatch: expected {stored_crc:#010x}, got {computed_crc:#010x}"
        )));
    }
    tracing::debug!("snapshot {:?} CRC32 verified: {:#010x}", path, stored_crc);

    bincode::deserialize(payload).map_err(|e| Error::Corrupted(format!("decode {path:?}: {e}")))
}
