//! Fiat–Shamir transcripts with a simple absorb/challenge API.
//!
//! Two strategies exist: [`Blake3Transcript`] (native, optimized for
//! off-chain verification) and [`KeccakTranscript`] (EVM-compatible,
//! built on a hash that is cheap to evaluate on-chain). Both apply
//! length-prefixed domain separation to every absorb and challenge, and
//! both model forward progress after each challenge so challenges cannot
//! be replayed against an earlier transcript state.

use std::io::Read;

use blake3::Hasher;
use sha3::{Digest, Keccak256};

/// Fixed prefix seeding every transcript.
const TRANSCRIPT_PREFIX: &[u8] = b"zkml.transcript.v1";

/// Transcript interface used across the prover, verifier, and aggregator.
pub trait Transcript {
    /// Add raw bytes under a label (domain-separated).
    fn absorb(&mut self, label: &str, bytes: &[u8]);

    /// Convenience: absorb an unsigned 64-bit value (LE).
    fn absorb_u64(&mut self, label: &str, x: u64) {
        self.absorb(label, &x.to_le_bytes());
    }

    /// Squeeze `n` bytes as a challenge under `label`.
    ///
    /// Deterministic with respect to the transcript state.
    #[must_use]
    fn challenge_bytes(&mut self, label: &str, n: usize) -> Vec<u8>;
}

/// Blake3-based transcript (the `native` strategy).
#[derive(Clone, Debug)]
pub struct Blake3Transcript {
    st: Hasher,
}

impl Blake3Transcript {
    /// Create a new transcript under a domain separation string.
    #[must_use]
    pub fn new(domain_sep: &str) -> Self {
        let mut st = Hasher::new();
        st.update(TRANSCRIPT_PREFIX);
        st.update(&(domain_sep.len() as u32).to_le_bytes());
        st.update(domain_sep.as_bytes());
        Self { st }
    }
}

impl Transcript for Blake3Transcript {
    fn absorb(&mut self, label: &str, bytes: &[u8]) {
        self.st.update(b"absorb");
        self.st.update(&(label.len() as u32).to_le_bytes());
        self.st.update(label.as_bytes());
        self.st.update(&(bytes.len() as u32).to_le_bytes());
        self.st.update(bytes);
    }

    fn challenge_bytes(&mut self, label: &str, n: usize) -> Vec<u8> {
        let mut st = self.st.clone();
        st.update(b"challenge");
        st.update(&(label.len() as u32).to_le_bytes());
        st.update(label.as_bytes());

        let mut rdr = st.finalize_xof();
        let mut out = vec![0u8; n];
        rdr.read_exact(&mut out)
            .expect("blake3::OutputReader should not fail");

        // Forward progress after a challenge.
        self.st.update(b"after_challenge");
        self.st.update(&(label.len() as u32).to_le_bytes());
        self.st.update(label.as_bytes());

        out
    }
}

/// Keccak-256 transcript (the `evm` strategy).
///
/// Keccak has no XOF, so the state is a running 32-byte digest and
/// challenges are expanded counter-mode: `keccak(state || label || ctr)`.
#[derive(Clone, Debug)]
pub struct KeccakTranscript {
    state: [u8; 32],
}

impl KeccakTranscript {
    /// Create a new transcript under a domain separation string.
    #[must_use]
    pub fn new(domain_sep: &str) -> Self {
        let mut h = Keccak256::new();
        h.update(TRANSCRIPT_PREFIX);
        h.update((domain_sep.len() as u32).to_le_bytes());
        h.update(domain_sep.as_bytes());
        Self {
            state: h.finalize().into(),
        }
    }

    fn chain(&mut self, tag: &[u8], label: &str, bytes: &[u8]) {
        let mut h = Keccak256::new();
        h.update(self.state);
        h.update(tag);
        h.update((label.len() as u32).to_le_bytes());
        h.update(label.as_bytes());
        h.update((bytes.len() as u32).to_le_bytes());
        h.update(bytes);
        self.state = h.finalize().into();
    }
}

impl Transcript for KeccakTranscript {
    fn absorb(&mut self, label: &str, bytes: &[u8]) {
        self.chain(b"absorb", label, bytes);
    }

    fn challenge_bytes(&mut self, label: &str, n: usize) -> Vec<u8> {
        let mut out = Vec::with_capacity(n);
        let mut ctr = 0u32;
        while out.len() < n {
            let mut h = Keccak256::new();
            h.update(self.state);
            h.update(b"challenge");
            h.update((label.len() as u32).to_le_bytes());
            h.update(label.as_bytes());
            h.update(ctr.to_le_bytes());
            let block: [u8; 32] = h.finalize().into();
            let take = (n - out.len()).min(32);
            out.extend_from_slice(&block[..take]);
            ctr += 1;
        }

        self.chain(b"after_challenge", label, &[]);
        out
    }
}

/// Derive `k` positions in `[0, n)` from the transcript under `label`.
#[must_use]
pub fn challenge_indices<T: Transcript + ?Sized>(
    tr: &mut T,
    label: &str,
    n: usize,
    k: usize,
) -> Vec<usize> {
    let bytes = tr.challenge_bytes(label, 8 * k);
    let mut out = Vec::with_capacity(k);
    for i in 0..k {
        let mut le = [0u8; 8];
        le.copy_from_slice(&bytes[i * 8..(i + 1) * 8]);
        out.push(u64::from_le_bytes(le) as usize % n.max(1));
    }
    out
}
