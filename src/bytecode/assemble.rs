use crate::bytecode::ir::{CO_VARARGS, CO_VARKEYWORDS, CodeObject};
use crate::bytecode::op::{ArgKind, CMP_OPS, Opcode};
use crate::lang::value::Constant;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AssembleError {
    #[error("label {0} was never bound")]
    UnboundLabel(usize),

    #[error("relative jump at offset {at} goes backwards to {target}")]
    BackwardJump { at: usize, target: usize },

    #[error("jump at offset {at} to {target} does not fit a 16-bit operand")]
    JumpTooFar { at: usize, target: usize },

    #[error("unknown comparison operator '{0}'")]
    UnknownCompare(String),

    #[error("{0} does not take a jump label")]
    NotAJump(Opcode),
}

/// A forward reference to an instruction position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Label(usize);

#[derive(Debug)]
struct Fixup {
    at: usize,
    kind: ArgKind,
    label: Label,
}

/// Builds a [`CodeObject`] one instruction at a time.
///
/// Jumps are emitted against labels with a placeholder operand and
/// patched in [`CodeBuilder::finish`] once every label is bound.
#[derive(Debug)]
pub struct CodeBuilder {
    code: CodeObject,
    labels: Vec<Option<usize>>,
    fixups: Vec<Fixup>,
    error: Option<AssembleError>,
}

impl CodeBuilder {
    pub fn new(code: CodeObject) -> Self {
        Self {
            code,
            labels: Vec::new(),
            fixups: Vec::new(),
            error: None,
        }
    }

    pub fn module() -> Self {
        Self::new(CodeObject::new("<module>"))
    }

    /// A function body: parameters occupy the first local slots and
    /// `consts[0]` holds the docstring slot.
    pub fn function(name: &str, params: &[&str], doc: Option<&str>) -> Self {
        let mut code = CodeObject::new(name);
        code.arg_count = params.len() as u16;
        code.varnames = params.iter().map(|p| p.to_string()).collect();
        code.consts.push(match doc {
            Some(doc) => Constant::Str(doc.to_string()),
            None => Constant::None,
        });
        Self::new(code)
    }

    /// A class body. A docstring is stored to `__doc__` up front.
    pub fn class(name: &str, doc: Option<&str>) -> Self {
        let mut b = Self::new(CodeObject::new(name));
        if let Some(doc) = doc {
            b.load_const(Constant::Str(doc.to_string()));
            b.store_name("__doc__");
        }
        b
    }

    pub fn varargs(&mut self, name: &str) -> &mut Self {
        self.code.flags |= CO_VARARGS;
        self.code.varnames.push(name.to_string());
        self
    }

    pub fn varkeywords(&mut self, name: &str) -> &mut Self {
        self.code.flags |= CO_VARKEYWORDS;
        self.code.varnames.push(name.to_string());
        self
    }

    pub fn position(&self) -> usize {
        self.code.code.len()
    }

    // =========================================================================
    // Raw emission
    // =========================================================================

    pub fn op(&mut self, op: Opcode) -> &mut Self {
        self.code.code.push(op.byte());
        self
    }

    /// Emit an instruction with an operand, prefixing `EXTENDED_ARG` when
    /// it does not fit 16 bits.
    pub fn op_arg(&mut self, op: Opcode, arg: u32) -> &mut Self {
        if arg > 0xffff {
            self.emit3(Opcode::ExtendedArg, arg >> 16);
        }
        self.emit3(op, arg & 0xffff)
    }

    fn emit3(&mut self, op: Opcode, arg: u32) -> &mut Self {
        self.code
            .code
            .extend_from_slice(&[op.byte(), (arg & 0xff) as u8, (arg >> 8) as u8]);
        self
    }

    // =========================================================================
    // Table-backed operands
    // =========================================================================

    pub fn load_const(&mut self, value: Constant) -> &mut Self {
        let index = match self.code.consts.iter().position(|c| *c == value) {
            Some(index) => index,
            None => {
                self.code.consts.push(value);
                self.code.consts.len() - 1
            }
        };
        self.op_arg(Opcode::LoadConst, index as u32)
    }

    /// Load a nested code object. Each call adds a fresh constant.
    pub fn load_code(&mut self, code: CodeObject) -> &mut Self {
        self.code.consts.push(Constant::Code(Box::new(code)));
        let index = self.code.consts.len() - 1;
        self.op_arg(Opcode::LoadConst, index as u32)
    }

    pub fn name_op(&mut self, op: Opcode, name: &str) -> &mut Self {
        let index = intern(&mut self.code.names, name);
        self.op_arg(op, index)
    }

    pub fn local_op(&mut self, op: Opcode, name: &str) -> &mut Self {
        let index = intern(&mut self.code.varnames, name);
        self.op_arg(op, index)
    }

    pub fn load_name(&mut self, name: &str) -> &mut Self {
        self.name_op(Opcode::LoadName, name)
    }

    pub fn store_name(&mut self, name: &str) -> &mut Self {
        self.name_op(Opcode::StoreName, name)
    }

    pub fn load_global(&mut self, name: &str) -> &mut Self {
        self.name_op(Opcode::LoadGlobal, name)
    }

    pub fn load_attr(&mut self, name: &str) -> &mut Self {
        self.name_op(Opcode::LoadAttr, name)
    }

    pub fn load_fast(&mut self, name: &str) -> &mut Self {
        self.local_op(Opcode::LoadFast, name)
    }

    pub fn store_fast(&mut self, name: &str) -> &mut Self {
        self.local_op(Opcode::StoreFast, name)
    }

    pub fn compare(&mut self, cmp: &str) -> &mut Self {
        match CMP_OPS.iter().position(|c| *c == cmp) {
            Some(index) => self.op_arg(Opcode::CompareOp, index as u32),
            None => {
                self.error.get_or_insert(AssembleError::UnknownCompare(cmp.to_string()));
                self
            }
        }
    }

    pub fn return_none(&mut self) -> &mut Self {
        self.load_const(Constant::None).op(Opcode::ReturnValue)
    }

    // =========================================================================
    // Labels
    // =========================================================================

    pub fn label(&mut self) -> Label {
        self.labels.push(None);
        Label(self.labels.len() - 1)
    }

    pub fn bind(&mut self, label: Label) -> &mut Self {
        self.labels[label.0] = Some(self.position());
        self
    }

    /// Emit a jump to `label` with a placeholder operand.
    pub fn jump(&mut self, op: Opcode, label: Label) -> &mut Self {
        let kind = op.arg_kind();
        if !matches!(kind, ArgKind::JumpRelative | ArgKind::JumpAbsolute) {
            self.error.get_or_insert(AssembleError::NotAJump(op));
            return self;
        }
        self.fixups.push(Fixup {
            at: self.position(),
            kind,
            label,
        });
        self.emit3(op, 0)
    }

    /// Patch every jump and return the finished code object.
    pub fn finish(mut self) -> Result<CodeObject, AssembleError> {
        if let Some(err) = self.error {
            return Err(err);
        }

        for fixup in &self.fixups {
            let target = self.labels[fixup.label.0].ok_or(AssembleError::UnboundLabel(fixup.label.0))?;
            let next = fixup.at + 3;
            let value = match fixup.kind {
                ArgKind::JumpRelative => target.checked_sub(next).ok_or(AssembleError::BackwardJump {
                    at: fixup.at,
                    target,
                })?,
                _ => target,
            };
            if value > 0xffff {
                return Err(AssembleError::JumpTooFar {
                    at: fixup.at,
                    target,
                });
            }
            self.code.code[fixup.at + 1] = (value & 0xff) as u8;
            self.code.code[fixup.at + 2] = (value >> 8) as u8;
        }

        Ok(self.code)
    }
}

fn intern(table: &mut Vec<String>, name: &str) -> u32 {
    match table.iter().position(|n| n == name) {
        Some(index) => index as u32,
        None => {
            table.push(name.to_string());
            (table.len() - 1) as u32
        }
    }
}
