//! Verifier program assembly.
//!
//! The exported artifact embeds everything verification needs (key and
//! SRS), so the program is a pure function of the calldata proof. The
//! settings echo is embedded alongside for on-chain introspection but
//! plays no part in the verdict.

use serde::{Deserialize, Serialize};
use tracing::info;

use zkml_aggregate::AggregateVerifyingKey;
use zkml_core::{Error, Settings};
use zkml_pfsys::{Srs, VerifyingKey};

use crate::bytecode::{Instruction, Opcode, Program};
use crate::ExportError;

/// Largest circuit (log2 rows) an exported verifier will accept.
pub const EVM_MAX_LOGROWS: u32 = 24;

/// An exported verifier: deployable bytecode plus its assembly listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerifierArtifact {
    /// The encoded verifier program.
    pub bytecode: Vec<u8>,
    /// Human-readable listing of the same program.
    pub assembly: String,
}

fn check_logrows(logrows: u32) -> Result<(), ExportError> {
    if logrows > EVM_MAX_LOGROWS {
        return Err(ExportError::CircuitTooLarge {
            logrows,
            max: EVM_MAX_LOGROWS,
        });
    }
    Ok(())
}

fn assemble(
    vk_bytes: Vec<u8>,
    srs: &Srs,
    settings: Option<&Settings>,
    verify_op: Opcode,
) -> Result<VerifierArtifact, ExportError> {
    let srs_bytes = bincode::serialize(srs).map_err(Error::codec)?;

    let mut instructions = vec![
        Instruction { opcode: Opcode::PushVk, operand: vk_bytes },
        Instruction { opcode: Opcode::PushSrs, operand: srs_bytes },
    ];
    if let Some(settings) = settings {
        instructions.push(Instruction {
            opcode: Opcode::PushSettings,
            operand: zkml_core::to_cbor(settings)?,
        });
    }
    instructions.push(Instruction { opcode: verify_op, operand: vec![] });
    instructions.push(Instruction { opcode: Opcode::Return, operand: vec![] });

    let program = Program { instructions };
    let bytecode = program.encode();
    let assembly = program.assembly();
    info!(
        bytes = bytecode.len(),
        op = verify_op.mnemonic(),
        "exported verifier program"
    );
    Ok(VerifierArtifact { bytecode, assembly })
}

/// Export a verifier program for a single circuit.
pub fn export_verifier(
    vk: &VerifyingKey,
    srs: &Srs,
    settings: &Settings,
) -> Result<VerifierArtifact, ExportError> {
    check_logrows(vk.logrows)?;
    let vk_bytes = bincode::serialize(vk).map_err(Error::codec)?;
    assemble(vk_bytes, srs, Some(settings), Opcode::VerifySingle)
}

/// Export a verifier program for an aggregate proof.
pub fn export_aggregate_verifier(
    avk: &AggregateVerifyingKey,
    srs: &Srs,
) -> Result<VerifierArtifact, ExportError> {
    check_logrows(avk.logrows)?;
    let vk_bytes = bincode::serialize(avk).map_err(Error::codec)?;
    assemble(vk_bytes, srs, None, Opcode::VerifyAggregate)
}

#[cfg(test)]
mod tests {
    use super::*;
    use zkml_core::{CalibrationTarget, RunArgs};
    use zkml_graph::{NodeDecl, OpGraph, OpKind};
    use zkml_pfsys::{gen_srs, setup};

    fn fixture() -> (VerifyingKey, Srs, Settings) {
        let decls = vec![
            NodeDecl { op: OpKind::Input { dims: vec![2] }, inputs: vec![] },
            NodeDecl { op: OpKind::Relu, inputs: vec![0] },
        ];
        let graph = OpGraph::new(&decls, 7).unwrap();
        let settings = graph
            .compile(&RunArgs::default(), CalibrationTarget::Resources)
            .unwrap();
        let srs = gen_srs(settings.run_args.logrows).unwrap();
        let (_, vk) = setup(&graph, &settings, &srs).unwrap();
        (vk, srs, settings)
    }

    #[test]
    fn export_is_deterministic() {
        let (vk, srs, settings) = fixture();
        let a = export_verifier(&vk, &srs, &settings).unwrap();
        let b = export_verifier(&vk, &srs, &settings).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn exported_program_decodes() {
        let (vk, srs, settings) = fixture();
        let artifact = export_verifier(&vk, &srs, &settings).unwrap();
        let program = Program::decode(&artifact.bytecode).unwrap();
        assert_eq!(program.instructions.len(), 5);
        assert_eq!(program.assembly(), artifact.assembly);
    }

    #[test]
    fn oversized_circuit_refused() {
        let (mut vk, srs, settings) = fixture();
        vk.logrows = EVM_MAX_LOGROWS + 1;
        assert!(matches!(
            export_verifier(&vk, &srs, &settings).unwrap_err(),
            ExportError::CircuitTooLarge { .. }
        ));
    }
}
