use crate::lang::value::Constant;
use serde::{Deserialize, Serialize};

/// `co_flags` bit: the function takes `*args`.
pub const CO_VARARGS: u32 = 0x04;
/// `co_flags` bit: the function takes `**kwargs`.
pub const CO_VARKEYWORDS: u32 = 0x08;

/// A compiled unit of behavior as handed over by the loader.
///
/// The decompiler only ever reads a code object. Nested functions,
/// lambdas and class bodies live in `consts` as [`Constant::Code`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CodeObject {
    pub name: String,

    /// Number of positional parameters; their names are `varnames[..arg_count]`.
    pub arg_count: u16,

    pub flags: u32,

    /// Constant pool. For functions, `consts[0]` is the docstring or `None`.
    pub consts: Vec<Constant>,

    /// Global and attribute names.
    pub names: Vec<String>,

    /// Local slots, parameters first.
    pub varnames: Vec<String>,

    /// Raw instruction buffer.
    pub code: Vec<u8>,
}

impl CodeObject {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            arg_count: 0,
            flags: 0,
            consts: Vec::new(),
            names: Vec::new(),
            varnames: Vec::new(),
            code: Vec::new(),
        }
    }

    pub fn has_varargs(&self) -> bool {
        self.flags & CO_VARARGS != 0
    }

    pub fn has_varkeywords(&self) -> bool {
        self.flags & CO_VARKEYWORDS != 0
    }

    pub fn is_lambda(&self) -> bool {
        self.name == "<lambda>"
    }

    /// The docstring slot: `consts[0]` when it is a string.
    pub fn doc_const(&self) -> Option<&str> {
        self.consts.first().and_then(Constant::as_str)
    }
}
