//! Key generation from a compiled circuit.
//!
//! `setup` is deterministic: the same graph, settings, and SRS always
//! yield byte-identical keys. The verifying key embeds the node table so
//! verification can re-execute sampled constraints without access to the
//! original graph file.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::info;

use zkml_core::{circuit_fingerprint, content_digest, short_hex, Error, Settings};
use zkml_graph::OpGraph;

use crate::srs::Srs;

/// On-disk key format version.
pub const KEY_FORMAT_VERSION: u16 = 1;

/// Verification key: everything needed to check a proof.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct VerifyingKey {
    /// Format version, currently [`KEY_FORMAT_VERSION`].
    pub version: u16,
    /// Circuit fingerprint (graph + settings) this key verifies.
    pub fingerprint: [u8; 32],
    /// Log2 row count of the circuit.
    pub logrows: u32,
    /// Digest of the SRS the keys were derived against.
    pub srs_digest: [u8; 32],
    /// Digest of the settings the circuit was compiled under.
    pub settings_digest: [u8; 32],
    /// Run scale inputs are quantized at.
    pub scale: u32,
    /// The resolved node table, used to re-execute sampled constraints.
    pub graph: OpGraph,
    /// Expected public instance count (inputs + outputs).
    pub num_instances: usize,
}

impl VerifyingKey {
    /// Content digest of the key itself, folded into accumulators.
    pub fn digest(&self) -> Result<[u8; 32], Error> {
        let bytes = zkml_core::to_cbor(self)?;
        Ok(content_digest("zkml/vk/v1", &[&bytes]))
    }
}

/// Proving key: the verification key plus the prover's row layout.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProvingKey {
    /// The verification key this proving key extends.
    pub vk: VerifyingKey,
    /// Starting constraint row of each node, indexed by node id.
    pub row_offsets: Vec<u64>,
    /// Total occupied constraint rows.
    pub trace_rows: u64,
}

/// Derive the proving and verifying keys for a compiled circuit.
///
/// Checks that `settings` describes `graph` and that `srs` covers the
/// compiled row budget.
pub fn setup(graph: &OpGraph, settings: &Settings, srs: &Srs) -> Result<(ProvingKey, VerifyingKey), Error> {
    let graph_fp = graph.fingerprint()?;
    if settings.model_fingerprint != graph_fp {
        return Err(Error::SettingsMismatch {
            settings: short_hex(&settings.model_fingerprint),
            graph: short_hex(&graph_fp),
        });
    }
    let logrows = settings.run_args.logrows;
    if !srs.supports(logrows) {
        return Err(Error::SrsTooSmall {
            needed: logrows,
            available: srs.logrows,
        });
    }

    let settings_digest = settings.digest();
    let fingerprint = circuit_fingerprint(&graph_fp, &settings_digest);

    let mut row_offsets = Vec::with_capacity(graph.nodes.len());
    let mut next_row = 0u64;
    for node in &graph.nodes {
        row_offsets.push(next_row);
        next_row += node.out_dims.iter().product::<usize>() as u64;
    }

    let vk = VerifyingKey {
        version: KEY_FORMAT_VERSION,
        fingerprint,
        logrows,
        srs_digest: srs.digest(),
        settings_digest,
        scale: settings.run_args.scale,
        graph: graph.clone(),
        num_instances: graph.input_ids.len() + graph.output_ids.len(),
    };
    let pk = ProvingKey {
        vk: vk.clone(),
        row_offsets,
        trace_rows: next_row,
    };
    info!(
        fingerprint = %short_hex(&fingerprint),
        logrows,
        rows = next_row,
        "setup complete"
    );
    Ok((pk, vk))
}

/// Write a verifying key as an opaque binary blob.
pub fn save_vk(path: &Path, vk: &VerifyingKey) -> Result<(), Error> {
    zkml_core::write_bin(path, vk)
}

/// Read a verifying key written by [`save_vk`].
pub fn load_vk(path: &Path) -> Result<VerifyingKey, Error> {
    let vk: VerifyingKey = zkml_core::read_bin(path)?;
    check_version(vk.version)?;
    Ok(vk)
}

/// Write a proving key as an opaque binary blob.
pub fn save_pk(path: &Path, pk: &ProvingKey) -> Result<(), Error> {
    zkml_core::write_bin(path, pk)
}

/// Read a proving key written by [`save_pk`].
pub fn load_pk(path: &Path) -> Result<ProvingKey, Error> {
    let pk: ProvingKey = zkml_core::read_bin(path)?;
    check_version(pk.vk.version)?;
    Ok(pk)
}

fn check_version(version: u16) -> Result<(), Error> {
    if version != KEY_FORMAT_VERSION {
        return Err(Error::codec(format!(
            "unsupported key format version {version} (expected {KEY_FORMAT_VERSION})"
        )));
    }
    Ok(())
}
