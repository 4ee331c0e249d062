//! Artifact I/O helpers.
//!
//! Human-facing artifacts (settings, graphs, witnesses, proofs) go through
//! JSON or CBOR with extension-based auto-detection; unknown extensions are
//! rejected for reads and default to JSON for writes. Opaque binary blobs
//! (keys, SRS) go through bincode.

use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Cursor, Read, Write};
use std::path::Path;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::Error;

/// Ensure the parent directory for a file exists (no-op if none).
pub fn ensure_parent_dir(path: &Path) -> Result<(), Error> {
    if let Some(dir) = path.parent() {
        if !dir.as_os_str().is_empty() {
            fs::create_dir_all(dir)?;
        }
    }
    Ok(())
}

/// Return the lowercase extension (without dot) if present.
fn ext_lower(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|s| s.to_ascii_lowercase())
}

/// Read any `T` from a **JSON** file.
pub fn read_json<T: DeserializeOwned, P: AsRef<Path>>(path: P) -> Result<T, Error> {
    let f = File::open(path.as_ref())?;
    serde_json::from_reader(BufReader::new(f)).map_err(Error::codec)
}

/// Write any `T` to a **JSON** file (pretty).
pub fn write_json<T: Serialize, P: AsRef<Path>>(path: P, v: &T) -> Result<(), Error> {
    ensure_parent_dir(path.as_ref())?;
    let f = File::create(path.as_ref())?;
    serde_json::to_writer_pretty(BufWriter::new(f), v).map_err(Error::codec)
}

/// Read any `T` from a **CBOR** file.
pub fn read_cbor<T: DeserializeOwned, P: AsRef<Path>>(path: P) -> Result<T, Error> {
    let f = File::open(path.as_ref())?;
    ciborium::de::from_reader(BufReader::new(f)).map_err(Error::codec)
}

/// Write any `T` to a **CBOR** file.
pub fn write_cbor<T: Serialize, P: AsRef<Path>>(path: P, v: &T) -> Result<(), Error> {
    ensure_parent_dir(path.as_ref())?;
    let f = File::create(path.as_ref())?;
    let mut w = BufWriter::new(f);
    ciborium::ser::into_writer(v, &mut w).map_err(Error::codec)?;
    w.flush()?;
    Ok(())
}

/// Auto-detect read by extension `.json` / `.cbor` (case-insensitive).
pub fn read_auto<T: DeserializeOwned, P: AsRef<Path>>(path: P) -> Result<T, Error> {
    match ext_lower(path.as_ref()).as_deref() {
        Some("json") => read_json(path),
        Some("cbor") => read_cbor(path),
        Some(other) => Err(Error::Codec(format!(
            "unsupported artifact extension: {other} (supported: .json, .cbor)"
        ))),
        None => Err(Error::Codec(
            "path has no extension (expected .json or .cbor)".into(),
        )),
    }
}

/// Auto-detect write (defaults to **JSON** if unknown or missing).
pub fn write_auto<T: Serialize, P: AsRef<Path>>(path: P, v: &T) -> Result<(), Error> {
    match ext_lower(path.as_ref()).as_deref() {
        Some("cbor") => write_cbor(path, v),
        _ => write_json(path, v),
    }
}

/// Serialize any `T` to **CBOR bytes**.
pub fn to_cbor<T: Serialize>(v: &T) -> Result<Vec<u8>, Error> {
    let mut buf = Vec::new();
    ciborium::ser::into_writer(v, &mut buf).map_err(Error::codec)?;
    Ok(buf)
}

/// Deserialize any `T` from **CBOR bytes**.
pub fn from_cbor<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, Error> {
    ciborium::de::from_reader(Cursor::new(bytes)).map_err(Error::codec)
}

/// Write an opaque binary blob (bincode) to `path`.
pub fn write_bin<T: Serialize, P: AsRef<Path>>(path: P, v: &T) -> Result<(), Error> {
    ensure_parent_dir(path.as_ref())?;
    let bytes = bincode::serialize(v).map_err(Error::codec)?;
    let f = File::create(path.as_ref())?;
    let mut w = BufWriter::new(f);
    w.write_all(&bytes)?;
    w.flush()?;
    Ok(())
}

/// Read an opaque binary blob (bincode) from `path`.
pub fn read_bin<T: DeserializeOwned, P: AsRef<Path>>(path: P) -> Result<T, Error> {
    let mut f = File::open(path.as_ref())?;
    let mut bytes = Vec::new();
    f.read_to_end(&mut bytes)?;
    bincode::deserialize(&bytes).map_err(Error::codec)
}
