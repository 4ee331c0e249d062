//! Proof generation.
//!
//! The prover replays the quantized forward pass, commits to the
//! per-node trace with a Merkle tree, derives query positions from the
//! transcript, and opens the queried nodes plus their direct inputs.
//! Accumulation-friendly proofs additionally embed the accumulator the
//! aggregator folds.

use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::info;

use zkml_core::{short_hex, Error, ProofArtifact, ProofMode, TranscriptType};
use zkml_crypto::{
    challenge_indices, instance_digest, instances_digest, trace_leaf_digest, Blake3Transcript,
    KeccakTranscript, MerklePath, MerkleTree, Transcript,
};
use zkml_graph::{execute_quantized, quantize::quantize_vec, Witness};

use crate::keys::ProvingKey;
use crate::lift;
use crate::srs::Srs;

/// Number of trace positions sampled per proof.
pub const NUM_QUERIES: usize = 16;

/// Transcript domain separator for single proofs.
pub const PROOF_DOMAIN: &str = "zkml/proof/v1";

/// One opened trace position: the node's full output tensor and its
/// authentication path.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Opening {
    /// Node id of the opened position.
    pub idx: u32,
    /// Quantized output tensor of the node.
    pub values: Vec<i64>,
    /// Path from the trace leaf to the committed root.
    pub path: MerklePath,
}

/// Accumulator carried by accumulation-friendly proofs.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Accumulator {
    /// Digest of the verifying key the proof is bound to.
    pub vk_digest: [u8; 32],
    /// Digest over the proof's public instances.
    pub instances_digest: [u8; 32],
    /// The trace commitment root.
    pub root: [u8; 32],
}

/// Decoded structure behind `ProofArtifact::proof_bytes`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProofBody {
    /// Merkle root of the trace commitment.
    pub root: [u8; 32],
    /// Openings for the queried nodes and their direct inputs, by id.
    pub openings: Vec<Opening>,
    /// Present exactly when the proof mode is `Accum`.
    pub accumulator: Option<Accumulator>,
}

/// Build the Fiat–Shamir transcript for `strategy` under `domain`.
#[must_use]
pub fn make_transcript(strategy: TranscriptType, domain: &str) -> Box<dyn Transcript> {
    match strategy {
        TranscriptType::Native => Box::new(Blake3Transcript::new(domain)),
        TranscriptType::Evm => Box::new(KeccakTranscript::new(domain)),
    }
}

/// Derive the queried node ids and the full set of ids that must be
/// opened (queries plus their direct inputs), both sorted and deduped.
pub(crate) fn query_plan(
    tr: &mut dyn Transcript,
    graph: &zkml_graph::OpGraph,
) -> (Vec<usize>, Vec<usize>) {
    let n = graph.nodes.len();
    let mut queried = challenge_indices(tr, "query", n, NUM_QUERIES.min(n));
    // Public instances are always checked: inputs and outputs are
    // queried unconditionally, sampling covers the interior.
    queried.extend_from_slice(&graph.input_ids);
    queried.extend_from_slice(&graph.output_ids);
    queried.sort_unstable();
    queried.dedup();

    let mut opened = queried.clone();
    for &q in &queried {
        opened.extend_from_slice(&graph.nodes[q].inputs);
    }
    opened.sort_unstable();
    opened.dedup();
    (queried, opened)
}

/// Produce a proof that the witness is a faithful run of the circuit
/// behind `pk`.
pub fn prove(
    pk: &ProvingKey,
    srs: &Srs,
    witness: &Witness,
    strategy: TranscriptType,
    mode: ProofMode,
) -> Result<ProofArtifact, Error> {
    let vk = &pk.vk;
    let srs_digest = srs.digest();
    if srs_digest != vk.srs_digest {
        return Err(Error::SrsMismatch {
            key: short_hex(&vk.srs_digest),
            srs: short_hex(&srs_digest),
        });
    }

    let expected_shapes = vk.graph.input_shapes();
    for (index, (got, expected)) in witness
        .input_shapes
        .iter()
        .zip(expected_shapes.iter())
        .enumerate()
    {
        if got != expected {
            return Err(Error::WitnessMismatch {
                index,
                expected: expected.clone(),
                got: got.clone(),
            });
        }
    }
    if witness.input_shapes.len() != expected_shapes.len() {
        return Err(Error::Graph(format!(
            "witness has {} input tensors, circuit expects {}",
            witness.input_shapes.len(),
            expected_shapes.len()
        )));
    }

    let quantized: Vec<Vec<i64>> = witness
        .input_data
        .iter()
        .map(|t| quantize_vec(t, vk.scale))
        .collect();
    let trace = execute_quantized(&vk.graph, &quantized).map_err(lift)?;

    let mut instances: Vec<[u8; 32]> = quantized.iter().map(|t| instance_digest(t)).collect();
    for &out in &vk.graph.output_ids {
        instances.push(instance_digest(&trace[out]));
    }
    for (i, (stored, recomputed)) in witness
        .instances()
        .iter()
        .zip(instances.iter())
        .enumerate()
    {
        if stored != recomputed {
            return Err(Error::Graph(format!(
                "witness instance {i} is stale: stored digest does not match the recomputed trace"
            )));
        }
    }

    let leaves: Vec<[u8; 32]> = trace
        .iter()
        .enumerate()
        .map(|(i, t)| trace_leaf_digest(i as u32, t))
        .collect();
    let tree = MerkleTree::from_leaves(leaves);
    let root = tree.root();

    let mut tr = make_transcript(strategy, PROOF_DOMAIN);
    tr.absorb("fingerprint", &vk.fingerprint);
    tr.absorb("root", &root);
    tr.absorb("instances", &instances_digest(&instances));
    let (queried, opened) = query_plan(tr.as_mut(), &vk.graph);

    let openings: Vec<Opening> = opened
        .iter()
        .map(|&i| Opening {
            idx: i as u32,
            values: trace[i].clone(),
            path: tree.open(i),
        })
        .collect();

    let accumulator = match mode {
        ProofMode::Single => None,
        ProofMode::Accum => Some(Accumulator {
            vk_digest: vk.digest()?,
            instances_digest: instances_digest(&instances),
            root,
        }),
    };

    let body = ProofBody {
        root,
        openings,
        accumulator,
    };
    let proof_bytes = bincode::serialize(&body).map_err(Error::codec)?;
    info!(
        fingerprint = %short_hex(&vk.fingerprint),
        %strategy,
        %mode,
        queries = queried.len(),
        openings = body.openings.len(),
        bytes = proof_bytes.len(),
        "proof generated"
    );

    Ok(ProofArtifact::new(
        strategy,
        mode,
        vk.fingerprint,
        instances,
        proof_bytes,
        json!({
            "logrows": vk.logrows,
            "queries": queried.len(),
            "openings": body.openings.len(),
        }),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keys::setup;
    use crate::srs::gen_srs;
    use zkml_core::{CalibrationTarget, RunArgs, Settings};
    use zkml_graph::{forward, InputData, NodeDecl, OpGraph, OpKind};

    fn fixture() -> (OpGraph, Settings, Srs, Witness) {
        let decls = vec![
            NodeDecl { op: OpKind::Input { dims: vec![2, 2] }, inputs: vec![] },
            NodeDecl {
                op: OpKind::Const { values: vec![0.5, -1.0, 2.0, 0.25], dims: vec![2, 2] },
                inputs: vec![],
            },
            NodeDecl { op: OpKind::MatMul, inputs: vec![0, 1] },
            NodeDecl { op: OpKind::Relu, inputs: vec![2] },
            NodeDecl { op: OpKind::Sum, inputs: vec![3] },
        ];
        let graph = OpGraph::new(&decls, 7).unwrap();
        let settings = graph
            .compile(&RunArgs::default(), CalibrationTarget::Resources)
            .unwrap();
        let srs = gen_srs(settings.run_args.logrows).unwrap();
        let data = InputData { input_data: vec![vec![0.4, -0.2, 1.5, 0.9]] };
        let witness = forward(&graph, &settings, &data).unwrap();
        (graph, settings, srs, witness)
    }

    #[test]
    fn proving_is_deterministic() {
        let (graph, settings, srs, witness) = fixture();
        let (pk, _) = setup(&graph, &settings, &srs).unwrap();
        let a = prove(&pk, &srs, &witness, TranscriptType::Native, ProofMode::Single).unwrap();
        let b = prove(&pk, &srs, &witness, TranscriptType::Native, ProofMode::Single).unwrap();
        assert_eq!(a.proof_bytes, b.proof_bytes);
        assert_eq!(a.instances, b.instances);
    }

    #[test]
    fn strategies_sample_different_queries() {
        // A chain long enough that 16 queries cannot cover every node.
        let mut decls = vec![NodeDecl { op: OpKind::Input { dims: vec![4] }, inputs: vec![] }];
        for i in 0..63 {
            decls.push(NodeDecl { op: OpKind::Relu, inputs: vec![i] });
        }
        let graph = OpGraph::new(&decls, 7).unwrap();

        let plan = |strategy| {
            let mut tr = make_transcript(strategy, PROOF_DOMAIN);
            tr.absorb("fingerprint", &[1u8; 32]);
            tr.absorb("root", &[2u8; 32]);
            tr.absorb("instances", &[3u8; 32]);
            query_plan(tr.as_mut(), &graph)
        };
        let (native_q, native_open) = plan(TranscriptType::Native);
        let (evm_q, evm_open) = plan(TranscriptType::Evm);
        assert_ne!(native_q, evm_q);
        assert!(native_open.len() >= native_q.len());
        assert!(evm_open.iter().all(|&i| i < graph.nodes.len()));
    }

    #[test]
    fn strategies_share_instances() {
        let (graph, settings, srs, witness) = fixture();
        let (pk, _) = setup(&graph, &settings, &srs).unwrap();
        let native =
            prove(&pk, &srs, &witness, TranscriptType::Native, ProofMode::Single).unwrap();
        let evm = prove(&pk, &srs, &witness, TranscriptType::Evm, ProofMode::Single).unwrap();
        assert_eq!(native.instances, evm.instances);
        assert_eq!(native.transcript, TranscriptType::Native);
        assert_eq!(evm.transcript, TranscriptType::Evm);
    }

    #[test]
    fn accum_mode_embeds_accumulator() {
        let (graph, settings, srs, witness) = fixture();
        let (pk, vk) = setup(&graph, &settings, &srs).unwrap();
        let artifact =
            prove(&pk, &srs, &witness, TranscriptType::Native, ProofMode::Accum).unwrap();
        assert!(artifact.is_aggregatable());
        let body: ProofBody = bincode::deserialize(&artifact.proof_bytes).unwrap();
        let acc = body.accumulator.unwrap();
        assert_eq!(acc.vk_digest, vk.digest().unwrap());
        assert_eq!(acc.root, body.root);
    }

    #[test]
    fn wrong_srs_rejected() {
        let (graph, settings, srs, witness) = fixture();
        let (pk, _) = setup(&graph, &settings, &srs).unwrap();
        let other = gen_srs(srs.logrows + 1).unwrap();
        assert!(matches!(
            prove(&pk, &other, &witness, TranscriptType::Native, ProofMode::Single).unwrap_err(),
            Error::SrsMismatch { .. }
        ));
    }

    #[test]
    fn wrong_witness_shape_rejected() {
        let (graph, settings, srs, mut witness) = fixture();
        let (pk, _) = setup(&graph, &settings, &srs).unwrap();
        witness.input_shapes[0] = vec![4];
        assert!(matches!(
            prove(&pk, &srs, &witness, TranscriptType::Native, ProofMode::Single).unwrap_err(),
            Error::WitnessMismatch { index: 0, .. }
        ));
    }

    #[test]
    fn stale_witness_digest_rejected() {
        let (graph, settings, srs, mut witness) = fixture();
        let (pk, _) = setup(&graph, &settings, &srs).unwrap();
        witness.output_digests[0] = [0xAB; 32];
        assert!(matches!(
            prove(&pk, &srs, &witness, TranscriptType::Native, ProofMode::Single).unwrap_err(),
            Error::Graph(_)
        ));
    }
}
