pub mod assemble;
pub mod decode_error;
pub mod disasm;
pub mod ir;
pub mod op;

pub use decode_error::DecodeError;
pub use disasm::{Decoded, decode};
pub use ir::CodeObject;
pub use op::{Family, Opcode, Variant};
