use crate::bytecode::decode_error::DecodeError;
use crate::bytecode::op::{ArgKind, CMP_OPS, Opcode, Variant};
use crate::bytecode::CodeObject;
use crate::frontend::token::{CodeRef, Offset, Operand, Token};
use crate::lang::value::Constant;
use std::collections::{BTreeMap, BTreeSet};
use tracing::trace;

/// Token kind for `LOAD_CONST` of a lambda body.
pub const LOAD_LAMBDA: &str = "LOAD_LAMBDA";

// =============================================================================
// INSTRUCTION STREAM
// =============================================================================

/// One raw instruction, with any `EXTENDED_ARG` prefix folded in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Instruction {
    /// Position of the first byte, including a prefix.
    pub offset: usize,
    pub opcode: Opcode,
    pub arg: Option<u32>,
    /// Position of the following instruction.
    pub next: usize,
}

impl Instruction {
    /// Absolute target of a jump instruction.
    pub fn jump_target(&self) -> Option<usize> {
        let arg = self.arg? as usize;
        match self.opcode.arg_kind() {
            ArgKind::JumpRelative => Some(self.next + arg),
            ArgKind::JumpAbsolute => Some(arg),
            _ => None,
        }
    }
}

/// Iterator over the instructions of a raw buffer.
///
/// Stops after the first error.
pub struct Instructions<'a> {
    code: &'a [u8],
    pos: usize,
    failed: bool,
}

impl<'a> Instructions<'a> {
    pub fn new(code: &'a [u8]) -> Self {
        Self {
            code,
            pos: 0,
            failed: false,
        }
    }

    fn fail(&mut self, err: DecodeError) -> Option<Result<Instruction, DecodeError>> {
        self.failed = true;
        Some(Err(err))
    }
}

impl Iterator for Instructions<'_> {
    type Item = Result<Instruction, DecodeError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed || self.pos >= self.code.len() {
            return None;
        }

        let start = self.pos;
        let mut extended = 0u32;
        loop {
            let byte = self.code[self.pos];
            let Some(opcode) = Opcode::from_byte(byte) else {
                let offset = self.pos;
                return self.fail(DecodeError::UnknownOpcode { offset, byte });
            };

            if !opcode.has_arg() {
                self.pos += 1;
                return Some(Ok(Instruction {
                    offset: start,
                    opcode,
                    arg: None,
                    next: self.pos,
                }));
            }

            if self.pos + 3 > self.code.len() {
                return self.fail(DecodeError::Truncated { offset: start });
            }
            let arg = u32::from(self.code[self.pos + 1]) | u32::from(self.code[self.pos + 2]) << 8;
            self.pos += 3;

            if opcode == Opcode::ExtendedArg {
                if self.pos >= self.code.len() {
                    return self.fail(DecodeError::Truncated { offset: start });
                }
                extended = arg << 16;
                continue;
            }

            return Some(Ok(Instruction {
                offset: start,
                opcode,
                arg: Some(extended | arg),
                next: self.pos,
            }));
        }
    }
}

// =============================================================================
// JUMP TARGETS
// =============================================================================

/// Count the relative jumps landing on each offset.
///
/// Absolute jumps are loop back-edges whose destination is already
/// delimited by `SETUP_LOOP`/`FOR_LOOP`, so they do not produce merge
/// points. Targets may equal the buffer length but never exceed it.
pub fn find_jump_targets(code: &[u8]) -> Result<BTreeMap<usize, usize>, DecodeError> {
    let mut targets = BTreeMap::new();

    for ins in Instructions::new(code) {
        let ins = ins?;
        let Some(target) = ins.jump_target() else {
            continue;
        };
        if target > code.len() {
            return Err(DecodeError::JumpOutOfRange {
                offset: ins.offset,
                target,
                len: code.len(),
            });
        }
        if ins.opcode.arg_kind() == ArgKind::JumpRelative {
            *targets.entry(target).or_insert(0) += 1;
        }
    }

    Ok(targets)
}

// =============================================================================
// DECODER
// =============================================================================

/// Output of [`decode`].
#[derive(Debug, Clone, PartialEq)]
pub struct Decoded {
    pub tokens: Vec<Token>,

    /// Every variable-arity `(family, arity)` pair seen, once each.
    pub customize: BTreeSet<Variant>,
}

/// Decode a code object into grammar tokens.
///
/// One `COME_FROM` marker is emitted per relative jump arriving at an
/// offset, ahead of the instruction there. `SET_LINENO` is dropped but
/// its merge points are kept.
pub fn decode(code: &CodeObject) -> Result<Decoded, DecodeError> {
    let buf = &code.code;
    let targets = find_jump_targets(buf)?;

    let mut tokens = Vec::new();
    let mut customize = BTreeSet::new();
    let mut boundaries = BTreeSet::new();

    for ins in Instructions::new(buf) {
        let ins = ins?;
        boundaries.insert(ins.offset);

        if let Some(&count) = targets.get(&ins.offset) {
            tokens.extend((0..count).map(|i| Token::come_from(ins.offset, i)));
        }
        if ins.opcode == Opcode::SetLineno {
            continue;
        }
        tokens.push(resolve(code, &ins, &mut customize)?);
    }

    if let Some(&count) = targets.get(&buf.len()) {
        tokens.extend((0..count).map(|i| Token::come_from(buf.len(), i)));
    }
    if let Some(&target) = targets
        .keys()
        .find(|&&t| t != buf.len() && !boundaries.contains(&t))
    {
        return Err(DecodeError::MisalignedTarget { target });
    }

    trace!(
        code = %code.name,
        tokens = tokens.len(),
        variants = customize.len(),
        "decoded"
    );
    Ok(Decoded { tokens, customize })
}

fn resolve(
    code: &CodeObject,
    ins: &Instruction,
    customize: &mut BTreeSet<Variant>,
) -> Result<Token, DecodeError> {
    let op = ins.opcode;
    let offset = Offset::at(ins.offset);
    let Some(arg) = ins.arg else {
        return Ok(Token::new(op.mnemonic(), offset));
    };
    let index = arg as usize;
    let at = ins.offset;

    let text = |s: &str| Token::new(op.mnemonic(), offset).with_operand(Some(arg), Operand::text(s));

    Ok(match op.arg_kind() {
        ArgKind::Const => match code.consts.get(index) {
            Some(Constant::Code(nested)) => {
                let kind = if nested.is_lambda() {
                    LOAD_LAMBDA
                } else {
                    op.mnemonic()
                };
                Token::new(kind, offset).with_operand(
                    Some(arg),
                    Operand::Code(CodeRef {
                        index,
                        name: nested.name.clone(),
                    }),
                )
            }
            Some(constant) => text(&constant.to_string()),
            None => return Err(DecodeError::ConstIndex { offset: at, index: arg }),
        },
        ArgKind::Name => match code.names.get(index) {
            Some(name) => text(name),
            None => return Err(DecodeError::NameIndex { offset: at, index: arg }),
        },
        ArgKind::Local => match code.varnames.get(index) {
            Some(name) => text(name),
            None => return Err(DecodeError::LocalIndex { offset: at, index: arg }),
        },
        ArgKind::Compare => match CMP_OPS.get(index) {
            Some(cmp) => text(cmp),
            None => return Err(DecodeError::CompareIndex { offset: at, index: arg }),
        },
        ArgKind::JumpRelative | ArgKind::JumpAbsolute => {
            let target = ins.jump_target().unwrap_or(index);
            text(&target.to_string())
        }
        ArgKind::Count | ArgKind::None => {
            let kind = match op.family() {
                Some(family) => {
                    let variant = Variant::new(family, arg);
                    customize.insert(variant);
                    variant.kind()
                }
                None => op.mnemonic().to_string(),
            };
            Token {
                kind,
                arg: Some(arg),
                operand: None,
                offset,
            }
        }
    })
}

/// Render tokens one per line, as shown when a parse fails.
pub fn listing(tokens: &[Token]) -> String {
    let mut out = String::new();
    for token in tokens {
        out.push_str(&token.to_string());
        out.push('\n');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bytecode::assemble::CodeBuilder;
    use crate::bytecode::op::Family;

    fn kinds(decoded: &Decoded) -> Vec<&str> {
        decoded.tokens.iter().map(|t| t.kind.as_str()).collect()
    }

    #[test]
    fn test_instructions_fold_extended_arg() {
        let code = [143, 1, 0, 100, 2, 0, 83];
        let ins: Vec<_> = Instructions::new(&code).collect::<Result<_, _>>().unwrap();
        assert_eq!(ins.len(), 2);
        assert_eq!(ins[0].offset, 0);
        assert_eq!(ins[0].opcode, Opcode::LoadConst);
        assert_eq!(ins[0].arg, Some(0x1_0002));
        assert_eq!(ins[0].next, 6);
        assert_eq!(ins[1].opcode, Opcode::ReturnValue);
    }

    #[test]
    fn test_unknown_and_truncated() {
        let err = Instructions::new(&[1, 6]).collect::<Result<Vec<_>, _>>().unwrap_err();
        assert_eq!(err, DecodeError::UnknownOpcode { offset: 1, byte: 6 });

        let err = Instructions::new(&[100, 0]).collect::<Result<Vec<_>, _>>().unwrap_err();
        assert_eq!(err, DecodeError::Truncated { offset: 0 });
    }

    #[test]
    fn test_jump_targets_count_each_arrival() {
        // 0 JUMP_FORWARD +3 -> 6, 3 JUMP_FORWARD +0 -> 6, 6 RETURN_VALUE
        let code = [110, 3, 0, 110, 0, 0, 83];
        let targets = find_jump_targets(&code).unwrap();
        assert_eq!(targets.get(&6), Some(&2));
        assert_eq!(targets.len(), 1);
    }

    #[test]
    fn test_absolute_jumps_do_not_merge() {
        let code = [1, 113, 0, 0];
        assert!(find_jump_targets(&code).unwrap().is_empty());
    }

    #[test]
    fn test_jump_beyond_buffer() {
        let code = [110, 9, 0];
        assert_eq!(
            find_jump_targets(&code),
            Err(DecodeError::JumpOutOfRange {
                offset: 0,
                target: 12,
                len: 3
            })
        );
    }

    #[test]
    fn test_merge_points_precede_target() {
        let mut b = CodeBuilder::module();
        let end = b.label();
        b.load_name("x");
        b.jump(Opcode::JumpIfTrue, end);
        b.jump(Opcode::JumpForward, end);
        b.bind(end);
        b.op(Opcode::PopTop);
        b.return_none();
        let decoded = decode(&b.finish().unwrap()).unwrap();

        assert_eq!(
            kinds(&decoded),
            [
                "LOAD_NAME",
                "JUMP_IF_TRUE",
                "JUMP_FORWARD",
                "COME_FROM",
                "COME_FROM",
                "POP_TOP",
                "LOAD_CONST",
                "RETURN_VALUE"
            ]
        );
        assert_eq!(decoded.tokens[3].offset.to_string(), "9_0");
        assert_eq!(decoded.tokens[4].offset.to_string(), "9_1");
        assert_eq!(decoded.tokens[1].pattr(), "9");
    }

    #[test]
    fn test_merge_point_at_end_of_buffer() {
        let mut b = CodeBuilder::module();
        let end = b.label();
        b.jump(Opcode::JumpForward, end);
        b.bind(end);
        let decoded = decode(&b.finish().unwrap()).unwrap();
        assert_eq!(kinds(&decoded), ["JUMP_FORWARD", "COME_FROM"]);
        assert_eq!(decoded.tokens[1].offset, Offset::arrival(3, 0));
    }

    #[test]
    fn test_set_lineno_dropped() {
        let mut b = CodeBuilder::module();
        b.op_arg(Opcode::SetLineno, 1);
        b.return_none();
        let decoded = decode(&b.finish().unwrap()).unwrap();
        assert_eq!(kinds(&decoded), ["LOAD_CONST", "RETURN_VALUE"]);
        assert_eq!(decoded.tokens[0].pattr(), "None");
    }

    #[test]
    fn test_variants_recorded_once() {
        let mut b = CodeBuilder::module();
        b.load_name("a");
        b.load_name("b");
        b.op_arg(Opcode::BuildTuple, 2);
        b.load_name("c");
        b.load_name("d");
        b.op_arg(Opcode::BuildTuple, 2);
        b.op_arg(Opcode::CallFunction, 0x0102);
        let decoded = decode(&b.finish().unwrap()).unwrap();

        assert_eq!(decoded.tokens[2].kind, "BUILD_TUPLE_2");
        assert_eq!(decoded.tokens[6].kind, "CALL_FUNCTION_258");
        assert_eq!(
            decoded.customize.into_iter().collect::<Vec<_>>(),
            [
                Variant::new(Family::BuildTuple, 2),
                Variant::new(Family::CallFunction, 258)
            ]
        );
    }

    #[test]
    fn test_operands_resolve_against_tables() {
        let mut b = CodeBuilder::function("f", &["a"], None);
        b.load_fast("a");
        b.load_global("g");
        b.compare("not in");
        b.op(Opcode::ReturnValue);
        let decoded = decode(&b.finish().unwrap()).unwrap();
        let pattrs: Vec<_> = decoded.tokens.iter().map(Token::pattr).collect();
        assert_eq!(pattrs, ["a", "g", "not in", ""]);
    }

    #[test]
    fn test_lambda_constant() {
        let mut inner = CodeBuilder::function("<lambda>", &[], None);
        inner.load_name("x");
        inner.op(Opcode::ReturnValue);

        let mut b = CodeBuilder::module();
        b.load_code(inner.finish().unwrap());
        b.op_arg(Opcode::MakeFunction, 0);
        let decoded = decode(&b.finish().unwrap()).unwrap();

        let token = &decoded.tokens[0];
        assert_eq!(token.kind, LOAD_LAMBDA);
        assert_eq!(token.pattr(), "code_object <lambda>");
        assert_eq!(token.operand.as_ref().and_then(Operand::code_ref).map(|c| c.index), Some(0));
    }

    #[test]
    fn test_bad_indices() {
        let mut code = CodeObject::new("m");
        code.code = vec![101, 4, 0];
        assert_eq!(
            decode(&code),
            Err(DecodeError::NameIndex { offset: 0, index: 4 })
        );

        code.code = vec![106, 12, 0];
        assert_eq!(
            decode(&code),
            Err(DecodeError::CompareIndex { offset: 0, index: 12 })
        );
    }

    #[test]
    fn test_misaligned_target() {
        let mut code = CodeObject::new("m");
        // JUMP_FORWARD +1 lands inside the LOAD_NAME operand.
        code.code = vec![110, 1, 0, 101, 0, 0];
        code.names = vec!["x".into()];
        assert_eq!(decode(&code), Err(DecodeError::MisalignedTarget { target: 4 }));
    }

    #[test]
    fn test_listing_lines() {
        let mut b = CodeBuilder::module();
        b.load_name("spam");
        let decoded = decode(&b.finish().unwrap()).unwrap();
        assert_eq!(listing(&decoded.tokens), "0\tLOAD_NAME         spam\n");
    }
}
