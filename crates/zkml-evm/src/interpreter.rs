//! Local execution of exported verifier programs.
//!
//! Mirrors the deployed contract: the program's embedded key and SRS
//! are the only trusted inputs, the calldata is an untrusted proof
//! file (JSON or CBOR), and the verdict is the boolean `VERIFY_*` left
//! behind before `RETURN`.
//!
//! Exported verifiers only accept proofs produced under the `evm`
//! transcript; a native-transcript proof is rejected, not errored, to
//! match the on-chain behavior.

use tracing::debug;

use zkml_aggregate::{verify_aggregate, AggregateProof, AggregateVerifyingKey};
use zkml_core::{ProofArtifact, TranscriptType};
use zkml_pfsys::{verify, Srs, VerifyingKey};

use crate::bytecode::{Opcode, Program};
use crate::ExportError;

enum LoadedKey {
    Single(Box<VerifyingKey>),
    Aggregate(Box<AggregateVerifyingKey>),
}

/// Decode calldata bytes as CBOR first, then JSON.
fn decode_calldata<T: serde::de::DeserializeOwned>(calldata: &[u8]) -> Result<T, ExportError> {
    zkml_core::from_cbor(calldata)
        .or_else(|_| serde_json::from_slice(calldata).map_err(|e| ExportError::BadCalldata(e.to_string())))
}

/// Run a verifier program against `calldata` (a serialized proof).
pub fn execute(bytecode: &[u8], calldata: &[u8]) -> Result<bool, ExportError> {
    let program = Program::decode(bytecode)?;

    let mut key: Option<LoadedKey> = None;
    let mut srs: Option<Srs> = None;
    let mut verdict: Option<bool> = None;

    for ins in &program.instructions {
        match ins.opcode {
            Opcode::PushVk => {
                // The verify opcode later in the program disambiguates
                // the key type; try the matching one lazily by keeping
                // the raw bytes decodable both ways.
                key = Some(decode_key(&program, &ins.operand)?);
            }
            Opcode::PushSrs => {
                srs = Some(
                    bincode::deserialize(&ins.operand)
                        .map_err(|e| ExportError::Malformed(e.to_string()))?,
                );
            }
            Opcode::PushSettings => {
                // Informational echo; no effect on the verdict.
            }
            Opcode::VerifySingle => {
                let (Some(LoadedKey::Single(vk)), Some(srs)) = (&key, &srs) else {
                    return Err(ExportError::Malformed(
                        "VERIFY_SINGLE without a loaded key and SRS".into(),
                    ));
                };
                let artifact: ProofArtifact = match decode_calldata(calldata) {
                    Ok(a) => a,
                    Err(e) => {
                        debug!(error = %e, "rejecting: calldata is not a proof artifact");
                        verdict = Some(false);
                        continue;
                    }
                };
                if artifact.transcript != TranscriptType::Evm {
                    debug!("rejecting: proof was not produced under the evm transcript");
                    verdict = Some(false);
                    continue;
                }
                verdict = Some(verify(vk, srs, &artifact)?);
            }
            Opcode::VerifyAggregate => {
                let (Some(LoadedKey::Aggregate(avk)), Some(srs)) = (&key, &srs) else {
                    return Err(ExportError::Malformed(
                        "VERIFY_AGGREGATE without a loaded key and SRS".into(),
                    ));
                };
                let proof: AggregateProof = match decode_calldata(calldata) {
                    Ok(p) => p,
                    Err(e) => {
                        debug!(error = %e, "rejecting: calldata is not an aggregate proof");
                        verdict = Some(false);
                        continue;
                    }
                };
                if proof.transcript != TranscriptType::Evm {
                    debug!("rejecting: aggregate was not folded under the evm transcript");
                    verdict = Some(false);
                    continue;
                }
                verdict = Some(verify_aggregate(avk, srs, &proof)?);
            }
            Opcode::Return => {
                return verdict.ok_or_else(|| {
                    ExportError::Malformed("RETURN before any VERIFY_* opcode".into())
                });
            }
        }
    }
    Err(ExportError::Malformed("program ended without RETURN".into()))
}

/// Decode the pushed key as the type the program's verify opcode needs.
fn decode_key(program: &Program, operand: &[u8]) -> Result<LoadedKey, ExportError> {
    let wants_aggregate = program
        .instructions
        .iter()
        .any(|i| i.opcode == Opcode::VerifyAggregate);
    if wants_aggregate {
        let avk: AggregateVerifyingKey =
            bincode::deserialize(operand).map_err(|e| ExportError::Malformed(e.to_string()))?;
        Ok(LoadedKey::Aggregate(Box::new(avk)))
    } else {
        let vk: VerifyingKey =
            bincode::deserialize(operand).map_err(|e| ExportError::Malformed(e.to_string()))?;
        Ok(LoadedKey::Single(Box::new(vk)))
    }
}
