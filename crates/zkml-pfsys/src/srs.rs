//! Structured reference string.
//!
//! Generation is deterministic from `logrows` alone: the basis rows are
//! domain-separated digests, so any two parties generating an SRS for
//! the same size agree byte-for-byte and the digest embedded in keys
//! pins the pairing without trusting filenames.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::info;

use zkml_core::{content_digest, Error, MAX_LOGROWS};

/// On-disk SRS format version.
pub const SRS_FORMAT_VERSION: u16 = 1;

/// A structured reference string sized for circuits up to `2^logrows`
/// rows.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Srs {
    /// Format version, currently [`SRS_FORMAT_VERSION`].
    pub version: u16,
    /// Largest log2 row count this SRS supports.
    pub logrows: u32,
    /// One basis element per supported row power, `0..=logrows`.
    pub basis: Vec<[u8; 32]>,
}

impl Srs {
    /// Content digest binding keys to this SRS.
    #[must_use]
    pub fn digest(&self) -> [u8; 32] {
        let mut chunks: Vec<&[u8]> = Vec::with_capacity(self.basis.len() + 1);
        let lr = self.logrows.to_le_bytes();
        chunks.push(&lr);
        for b in &self.basis {
            chunks.push(b);
        }
        content_digest("zkml/srs-digest/v1", &chunks)
    }

    /// Whether this SRS is large enough for a circuit of `logrows` rows.
    #[must_use]
    pub fn supports(&self, logrows: u32) -> bool {
        self.logrows >= logrows
    }

    /// Write the SRS as an opaque binary blob.
    pub fn save(&self, path: &Path) -> Result<(), Error> {
        zkml_core::write_bin(path, self)
    }

    /// Read an SRS written by [`Srs::save`].
    pub fn load(path: &Path) -> Result<Self, Error> {
        let srs: Self = zkml_core::read_bin(path)?;
        if srs.version != SRS_FORMAT_VERSION {
            return Err(Error::codec(format!(
                "unsupported SRS format version {} (expected {SRS_FORMAT_VERSION})",
                srs.version
            )));
        }
        if srs.basis.len() != (srs.logrows + 1) as usize {
            return Err(Error::codec("SRS basis length disagrees with logrows"));
        }
        Ok(srs)
    }
}

/// Generate a deterministic SRS supporting circuits up to `2^logrows`.
pub fn gen_srs(logrows: u32) -> Result<Srs, Error> {
    if logrows > MAX_LOGROWS {
        return Err(Error::ResourceExceeded {
            needed: logrows,
            ceiling: MAX_LOGROWS,
        });
    }
    let basis = (0..=logrows)
        .map(|i| {
            content_digest(
                "zkml/srs/v1",
                &[&logrows.to_le_bytes(), &i.to_le_bytes()],
            )
        })
        .collect();
    let srs = Srs {
        version: SRS_FORMAT_VERSION,
        logrows,
        basis,
    };
    info!(logrows, digest = %zkml_core::short_hex(&srs.digest()), "generated SRS");
    Ok(srs)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generation_is_deterministic() {
        let a = gen_srs(10).unwrap();
        let b = gen_srs(10).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.digest(), b.digest());
    }

    #[test]
    fn sizes_produce_distinct_digests() {
        let a = gen_srs(10).unwrap();
        let b = gen_srs(11).unwrap();
        assert_ne!(a.digest(), b.digest());
        assert!(b.supports(10));
        assert!(!a.supports(11));
    }

    #[test]
    fn oversized_request_rejected() {
        assert!(matches!(
            gen_srs(MAX_LOGROWS + 1).unwrap_err(),
            Error::ResourceExceeded { .. }
        ));
    }

    #[test]
    fn save_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let p = dir.path().join("kzg.srs");
        let srs = gen_srs(8).unwrap();
        srs.save(&p).unwrap();
        let back = Srs::load(&p).unwrap();
        assert_eq!(srs, back);
    }
}
