use crate::bytecode::op::Variant;
use thiserror::Error;

/// Failure to turn an instruction buffer into tokens or grammar rules.
///
/// Always fatal for the code object being decoded.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("unknown opcode {byte} at offset {offset}")]
    UnknownOpcode { offset: usize, byte: u8 },

    #[error("instruction at offset {offset} is missing its operand")]
    Truncated { offset: usize },

    #[error("constant index {index} out of range at offset {offset}")]
    ConstIndex { offset: usize, index: u32 },

    #[error("name index {index} out of range at offset {offset}")]
    NameIndex { offset: usize, index: u32 },

    #[error("local slot {index} out of range at offset {offset}")]
    LocalIndex { offset: usize, index: u32 },

    #[error("comparison index {index} out of range at offset {offset}")]
    CompareIndex { offset: usize, index: u32 },

    #[error("jump at offset {offset} targets {target}, outside a buffer of {len} bytes")]
    JumpOutOfRange {
        offset: usize,
        target: usize,
        len: usize,
    },

    #[error("jump target {target} falls inside an instruction")]
    MisalignedTarget { target: usize },

    #[error("no grammar shape for {variant}")]
    UnsupportedArity { variant: Variant },

    #[error("code object '{code}' flags {param} but has no local slot for it")]
    MissingVarname { code: String, param: &'static str },
}
