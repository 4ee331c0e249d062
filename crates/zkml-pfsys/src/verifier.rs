//! Proof verification.
//!
//! Re-derives the query positions from the transcript, checks every
//! opening against the committed root, re-executes the queried
//! constraints from the opened inputs, and compares input/output
//! openings against the public instance digests.
//!
//! Rejection is `Ok(false)`: a proof that decodes badly, opens the wrong
//! positions, or fails any check is *invalid*, not an error. Errors are
//! reserved for inputs that cannot be used at all (an SRS the key was
//! not derived against).

use std::collections::BTreeMap;

use tracing::debug;

use zkml_core::{short_hex, Error, ProofArtifact, ProofMode};
use zkml_crypto::{instance_digest, instances_digest, trace_leaf_digest, verify_path};

use crate::keys::VerifyingKey;
use crate::prover::{make_transcript, query_plan, Opening, ProofBody, PROOF_DOMAIN};
use crate::srs::Srs;

/// Check a proof against a verifying key and its SRS.
pub fn verify(vk: &VerifyingKey, srs: &Srs, artifact: &ProofArtifact) -> Result<bool, Error> {
    let srs_digest = srs.digest();
    if srs_digest != vk.srs_digest {
        return Err(Error::SrsMismatch {
            key: short_hex(&vk.srs_digest),
            srs: short_hex(&srs_digest),
        });
    }

    if artifact.fingerprint != vk.fingerprint {
        debug!(
            proof = %short_hex(&artifact.fingerprint),
            key = %short_hex(&vk.fingerprint),
            "rejecting: fingerprint mismatch"
        );
        return Ok(false);
    }
    if artifact.instances.len() != vk.num_instances {
        debug!(
            got = artifact.instances.len(),
            expected = vk.num_instances,
            "rejecting: instance count mismatch"
        );
        return Ok(false);
    }

    let body: ProofBody = match bincode::deserialize(artifact.bytes()) {
        Ok(b) => b,
        Err(e) => {
            debug!(error = %e, "rejecting: proof bytes do not decode");
            return Ok(false);
        }
    };

    match (artifact.mode, &body.accumulator) {
        (ProofMode::Single, None) => {}
        (ProofMode::Accum, Some(acc)) => {
            if acc.vk_digest != vk.digest()?
                || acc.instances_digest != instances_digest(&artifact.instances)
                || acc.root != body.root
            {
                debug!("rejecting: accumulator does not bind this key and instances");
                return Ok(false);
            }
        }
        _ => {
            debug!(mode = %artifact.mode, "rejecting: accumulator presence disagrees with mode");
            return Ok(false);
        }
    }

    let mut tr = make_transcript(artifact.transcript, PROOF_DOMAIN);
    tr.absorb("fingerprint", &vk.fingerprint);
    tr.absorb("root", &body.root);
    tr.absorb("instances", &instances_digest(&artifact.instances));
    let (queried, opened_ids) = query_plan(tr.as_mut(), &vk.graph);

    let Some(openings) = check_openings(vk, &body, &opened_ids) else {
        return Ok(false);
    };

    for &q in &queried {
        let node = &vk.graph.nodes[q];
        if node.opkind.is_input() {
            // Input placeholders have no constraint; their openings are
            // pinned by the instance digest check below.
            continue;
        }
        let opened = openings[&q];
        let gathered: Vec<(&[i64], &[usize], u32)> = node
            .inputs
            .iter()
            .map(|&i| {
                (
                    openings[&i].values.as_slice(),
                    vk.graph.nodes[i].out_dims.as_slice(),
                    vk.graph.nodes[i].out_scale,
                )
            })
            .collect();
        let expected = match node.opkind.eval_quantized(q, &gathered, node.out_scale, vk.scale) {
            Ok(v) => v,
            Err(e) => {
                debug!(node = q, error = %e, "rejecting: constraint re-execution failed");
                return Ok(false);
            }
        };
        if expected != opened.values {
            debug!(node = q, "rejecting: opened values violate the constraint");
            return Ok(false);
        }
    }

    // Openings of instance-bearing nodes must match the public digests.
    for (pos, &id) in vk
        .graph
        .input_ids
        .iter()
        .chain(vk.graph.output_ids.iter())
        .enumerate()
    {
        if instance_digest(&openings[&id].values) != artifact.instances[pos] {
            debug!(node = id, instance = pos, "rejecting: instance digest mismatch");
            return Ok(false);
        }
    }

    Ok(true)
}

/// Validate the opening set: exact coverage of `opened_ids`, in-range
/// ids, declared tensor sizes, and valid authentication paths. Returns
/// `None` on any failure.
fn check_openings<'a>(
    vk: &VerifyingKey,
    body: &'a ProofBody,
    opened_ids: &[usize],
) -> Option<BTreeMap<usize, &'a Opening>> {
    if body.openings.len() != opened_ids.len() {
        debug!(
            got = body.openings.len(),
            expected = opened_ids.len(),
            "rejecting: opening count mismatch"
        );
        return None;
    }
    let mut map: BTreeMap<usize, &Opening> = BTreeMap::new();
    for o in &body.openings {
        let idx = o.idx as usize;
        let node = vk.graph.nodes.get(idx)?;
        let expected_len: usize = node.out_dims.iter().product();
        if o.values.len() != expected_len
            || o.path.index != o.idx
            || !verify_path(&body.root, &trace_leaf_digest(o.idx, &o.values), &o.path)
        {
            debug!(node = idx, "rejecting: bad opening");
            return None;
        }
        if map.insert(idx, o).is_some() {
            debug!(node = idx, "rejecting: duplicate opening");
            return None;
        }
    }
    if opened_ids.iter().any(|id| !map.contains_key(id)) {
        debug!("rejecting: openings do not cover the query plan");
        return None;
    }
    Some(map)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keys::setup;
    use crate::prover::prove;
    use crate::srs::gen_srs;
    use zkml_core::{CalibrationTarget, RunArgs, Settings, TranscriptType};
    use zkml_graph::{forward, InputData, NodeDecl, OpGraph, OpKind, Witness};

    fn fixture() -> (OpGraph, Settings, Srs, Witness) {
        let decls = vec![
            NodeDecl { op: OpKind::Input { dims: vec![1, 2, 2] }, inputs: vec![] },
            NodeDecl { op: OpKind::Pad { pads: [[1, 1], [1, 1]] }, inputs: vec![0] },
            NodeDecl {
                op: OpKind::SumPool { kernel: [2, 2], stride: [1, 1] },
                inputs: vec![1],
            },
            NodeDecl { op: OpKind::Flatten, inputs: vec![2] },
            NodeDecl { op: OpKind::Sigmoid, inputs: vec![3] },
        ];
        let graph = OpGraph::new(&decls, 7).unwrap();
        let settings = graph
            .compile(&RunArgs::default(), CalibrationTarget::Resources)
            .unwrap();
        let srs = gen_srs(settings.run_args.logrows).unwrap();
        let data = InputData { input_data: vec![vec![0.25, -0.75, 1.1, 0.0]] };
        let witness = forward(&graph, &settings, &data).unwrap();
        (graph, settings, srs, witness)
    }

    #[test]
    fn roundtrip_all_strategies_and_modes() {
        let (graph, settings, srs, witness) = fixture();
        let (pk, vk) = setup(&graph, &settings, &srs).unwrap();
        for strategy in [TranscriptType::Native, TranscriptType::Evm] {
            for mode in [ProofMode::Single, ProofMode::Accum] {
                let artifact = prove(&pk, &srs, &witness, strategy, mode).unwrap();
                assert!(
                    verify(&vk, &srs, &artifact).unwrap(),
                    "strategy={strategy} mode={mode}"
                );
            }
        }
    }

    #[test]
    fn tampered_proof_bytes_rejected_not_errored() {
        let (graph, settings, srs, witness) = fixture();
        let (pk, vk) = setup(&graph, &settings, &srs).unwrap();
        let artifact =
            prove(&pk, &srs, &witness, TranscriptType::Native, ProofMode::Single).unwrap();

        for pos in [0, artifact.proof_bytes.len() / 2, artifact.proof_bytes.len() - 1] {
            let mut bad = artifact.clone();
            bad.proof_bytes[pos] ^= 0x01;
            assert!(!verify(&vk, &srs, &bad).unwrap(), "byte {pos}");
        }

        let mut truncated = artifact.clone();
        truncated.proof_bytes.truncate(4);
        assert!(!verify(&vk, &srs, &truncated).unwrap());

        let mut garbage = artifact;
        garbage.proof_bytes = b"not a proof".to_vec();
        assert!(!verify(&vk, &srs, &garbage).unwrap());
    }

    #[test]
    fn tampered_instance_rejected() {
        let (graph, settings, srs, witness) = fixture();
        let (pk, vk) = setup(&graph, &settings, &srs).unwrap();
        let artifact =
            prove(&pk, &srs, &witness, TranscriptType::Evm, ProofMode::Single).unwrap();

        for i in 0..artifact.instances.len() {
            let mut bad = artifact.clone();
            bad.instances[i][0] ^= 0x01;
            assert!(!verify(&vk, &srs, &bad).unwrap(), "instance {i}");
        }
    }

    #[test]
    fn foreign_circuit_proof_rejected() {
        let (graph, settings, srs, witness) = fixture();
        let (pk, _) = setup(&graph, &settings, &srs).unwrap();
        let artifact =
            prove(&pk, &srs, &witness, TranscriptType::Native, ProofMode::Single).unwrap();

        let other_decls = vec![
            NodeDecl { op: OpKind::Input { dims: vec![1, 2, 2] }, inputs: vec![] },
            NodeDecl { op: OpKind::Sum, inputs: vec![0] },
        ];
        let other = OpGraph::new(&other_decls, 7).unwrap();
        let other_settings = other
            .compile(&RunArgs::default(), CalibrationTarget::Resources)
            .unwrap();
        let (_, other_vk) = setup(&other, &other_settings, &srs).unwrap();
        assert!(!verify(&other_vk, &srs, &artifact).unwrap());
    }

    #[test]
    fn mismatched_srs_is_an_error() {
        let (graph, settings, srs, witness) = fixture();
        let (pk, vk) = setup(&graph, &settings, &srs).unwrap();
        let artifact =
            prove(&pk, &srs, &witness, TranscriptType::Native, ProofMode::Single).unwrap();
        let other = gen_srs(srs.logrows + 2).unwrap();
        assert!(matches!(
            verify(&vk, &other, &artifact).unwrap_err(),
            Error::SrsMismatch { .. }
        ));
    }

    #[test]
    fn wrong_transcript_tag_rejected() {
        // Long chain: 16 samples cannot cover it, so the two strategies
        // derive different query plans.
        let mut decls = vec![NodeDecl { op: OpKind::Input { dims: vec![4] }, inputs: vec![] }];
        for i in 0..63 {
            decls.push(NodeDecl { op: OpKind::Relu, inputs: vec![i] });
        }
        let graph = OpGraph::new(&decls, 7).unwrap();
        let settings = graph
            .compile(&RunArgs::default(), CalibrationTarget::Resources)
            .unwrap();
        let srs = gen_srs(settings.run_args.logrows).unwrap();
        let data = InputData { input_data: vec![vec![0.5, -0.5, 0.25, 1.0]] };
        let witness = forward(&graph, &settings, &data).unwrap();
        let (pk, vk) = setup(&graph, &settings, &srs).unwrap();

        let mut artifact =
            prove(&pk, &srs, &witness, TranscriptType::Native, ProofMode::Single).unwrap();
        assert!(verify(&vk, &srs, &artifact).unwrap());
        // Claiming the other strategy changes the derived queries.
        artifact.transcript = TranscriptType::Evm;
        assert!(!verify(&vk, &srs, &artifact).unwrap());
    }

    #[test]
    fn mode_flip_rejected() {
        let (graph, settings, srs, witness) = fixture();
        let (pk, vk) = setup(&graph, &settings, &srs).unwrap();

        let mut single =
            prove(&pk, &srs, &witness, TranscriptType::Native, ProofMode::Single).unwrap();
        single.mode = ProofMode::Accum;
        assert!(!verify(&vk, &srs, &single).unwrap());

        let mut accum =
            prove(&pk, &srs, &witness, TranscriptType::Native, ProofMode::Accum).unwrap();
        accum.mode = ProofMode::Single;
        assert!(!verify(&vk, &srs, &accum).unwrap());
    }
}
