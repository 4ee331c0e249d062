//! Verifier bytecode container.
//!
//! Layout: `MAGIC || version:u16 LE || instructions`, where each
//! instruction is one opcode byte optionally followed by a
//! `len:u32 LE || payload` operand. Programs must end with `RETURN`.

use crate::ExportError;

/// File magic identifying a zkml verifier program.
pub const MAGIC: &[u8; 5] = b"ZKVM1";

/// Bytecode format version.
pub const BYTECODE_VERSION: u16 = 1;

/// Operations a verifier program may perform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Opcode {
    /// End execution; the verdict on the stack is the result.
    Return = 0x00,
    /// Load the embedded verifying key (operand: bincode).
    PushVk = 0x01,
    /// Load the embedded SRS (operand: bincode).
    PushSrs = 0x02,
    /// Verify the calldata proof against the loaded single-circuit key.
    VerifySingle = 0x03,
    /// Verify the calldata proof against the loaded aggregate key.
    VerifyAggregate = 0x04,
    /// Load the embedded settings echo (operand: CBOR, informational).
    PushSettings = 0x05,
}

impl Opcode {
    fn from_byte(b: u8) -> Option<Self> {
        match b {
            0x00 => Some(Self::Return),
            0x01 => Some(Self::PushVk),
            0x02 => Some(Self::PushSrs),
            0x03 => Some(Self::VerifySingle),
            0x04 => Some(Self::VerifyAggregate),
            0x05 => Some(Self::PushSettings),
            _ => None,
        }
    }

    /// Whether this opcode carries a length-prefixed operand.
    #[must_use]
    pub fn has_operand(self) -> bool {
        matches!(self, Self::PushVk | Self::PushSrs | Self::PushSettings)
    }

    /// Mnemonic used in assembly listings.
    #[must_use]
    pub fn mnemonic(self) -> &'static str {
        match self {
            Self::Return => "RETURN",
            Self::PushVk => "PUSH_VK",
            Self::PushSrs => "PUSH_SRS",
            Self::VerifySingle => "VERIFY_SINGLE",
            Self::VerifyAggregate => "VERIFY_AGGREGATE",
            Self::PushSettings => "PUSH_SETTINGS",
        }
    }
}

/// One decoded instruction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Instruction {
    /// The operation.
    pub opcode: Opcode,
    /// Operand payload; empty for operand-less opcodes.
    pub operand: Vec<u8>,
}

/// A decoded verifier program.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Program {
    /// Instructions in execution order, ending with `RETURN`.
    pub instructions: Vec<Instruction>,
}

impl Program {
    /// Encode the program into its byte form.
    #[must_use]
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(MAGIC);
        out.extend_from_slice(&BYTECODE_VERSION.to_le_bytes());
        for ins in &self.instructions {
            out.push(ins.opcode as u8);
            if ins.opcode.has_operand() {
                out.extend_from_slice(&(ins.operand.len() as u32).to_le_bytes());
                out.extend_from_slice(&ins.operand);
            }
        }
        out
    }

    /// Decode a program, validating magic, version, framing, and the
    /// trailing `RETURN`.
    pub fn decode(bytes: &[u8]) -> Result<Self, ExportError> {
        let rest = bytes
            .strip_prefix(MAGIC.as_slice())
            .ok_or_else(|| ExportError::Malformed("bad magic".into()))?;
        if rest.len() < 2 {
            return Err(ExportError::Malformed("truncated header".into()));
        }
        let version = u16::from_le_bytes([rest[0], rest[1]]);
        if version != BYTECODE_VERSION {
            return Err(ExportError::Malformed(format!(
                "unsupported bytecode version {version}"
            )));
        }

        let mut cursor = &rest[2..];
        let mut instructions = Vec::new();
        while let Some((&op_byte, tail)) = cursor.split_first() {
            let opcode = Opcode::from_byte(op_byte)
                .ok_or_else(|| ExportError::Malformed(format!("unknown opcode {op_byte:#04x}")))?;
            cursor = tail;
            let operand = if opcode.has_operand() {
                if cursor.len() < 4 {
                    return Err(ExportError::Malformed("truncated operand length".into()));
                }
                let len =
                    u32::from_le_bytes([cursor[0], cursor[1], cursor[2], cursor[3]]) as usize;
                cursor = &cursor[4..];
                if cursor.len() < len {
                    return Err(ExportError::Malformed("truncated operand".into()));
                }
                let (payload, tail) = cursor.split_at(len);
                cursor = tail;
                payload.to_vec()
            } else {
                Vec::new()
            };
            instructions.push(Instruction { opcode, operand });
        }

        match instructions.last() {
            Some(ins) if ins.opcode == Opcode::Return => Ok(Self { instructions }),
            _ => Err(ExportError::Malformed(
                "program does not end with RETURN".into(),
            )),
        }
    }

    /// Human-readable assembly listing of the program.
    #[must_use]
    pub fn assembly(&self) -> String {
        let mut out = String::new();
        for ins in &self.instructions {
            if ins.opcode.has_operand() {
                out.push_str(&format!(
                    "{} {} ; {} bytes\n",
                    ins.opcode.mnemonic(),
                    hex::encode(blake3_first8(&ins.operand)),
                    ins.operand.len()
                ));
            } else {
                out.push_str(ins.opcode.mnemonic());
                out.push('\n');
            }
        }
        out
    }
}

fn blake3_first8(bytes: &[u8]) -> [u8; 8] {
    let digest = zkml_core::content_digest("zkml/evm-operand/v1", &[bytes]);
    let mut out = [0u8; 8];
    out.copy_from_slice(&digest[..8]);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn program() -> Program {
        Program {
            instructions: vec![
                Instruction { opcode: Opcode::PushVk, operand: vec![1, 2, 3] },
                Instruction { opcode: Opcode::PushSrs, operand: vec![4, 5] },
                Instruction { opcode: Opcode::VerifySingle, operand: vec![] },
                Instruction { opcode: Opcode::Return, operand: vec![] },
            ],
        }
    }

    #[test]
    fn encode_decode_roundtrip() {
        let p = program();
        let bytes = p.encode();
        assert!(bytes.starts_with(MAGIC));
        assert_eq!(Program::decode(&bytes).unwrap(), p);
    }

    #[test]
    fn bad_magic_rejected() {
        let mut bytes = program().encode();
        bytes[0] ^= 0xFF;
        assert!(matches!(
            Program::decode(&bytes).unwrap_err(),
            ExportError::Malformed(_)
        ));
    }

    #[test]
    fn truncation_rejected() {
        let bytes = program().encode();
        for cut in [3, 8, bytes.len() - 1] {
            assert!(Program::decode(&bytes[..cut]).is_err(), "cut={cut}");
        }
    }

    #[test]
    fn missing_return_rejected() {
        let p = Program {
            instructions: vec![Instruction { opcode: Opcode::PushVk, operand: vec![7] }],
        };
        assert!(matches!(
            Program::decode(&p.encode()).unwrap_err(),
            ExportError::Malformed(_)
        ));
    }

    #[test]
    fn assembly_lists_mnemonics() {
        let asm = program().assembly();
        assert!(asm.contains("PUSH_VK"));
        assert!(asm.contains("VERIFY_SINGLE"));
        assert!(asm.trim_end().ends_with("RETURN"));
    }
}
