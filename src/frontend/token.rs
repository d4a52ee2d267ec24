use std::fmt;

/// Grammar terminal for merge-point markers.
pub const COME_FROM: &str = "COME_FROM";

/// Byte position of a token in the instruction buffer.
///
/// Merge-point markers share the position of the instruction they precede
/// and are told apart by their arrival index, rendered as `12_0`, `12_1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Offset {
    pub pos: usize,
    pub arrival: Option<usize>,
}

impl Offset {
    pub fn at(pos: usize) -> Self {
        Self { pos, arrival: None }
    }

    pub fn arrival(pos: usize, index: usize) -> Self {
        Self {
            pos,
            arrival: Some(index),
        }
    }
}

impl fmt::Display for Offset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.arrival {
            Some(index) => write!(f, "{}_{}", self.pos, index),
            None => write!(f, "{}", self.pos),
        }
    }
}

/// Reference to a nested code object in the enclosing constant pool.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CodeRef {
    pub index: usize,
    pub name: String,
}

/// Display operand of a token.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Operand {
    Text(String),
    Code(CodeRef),
}

impl Operand {
    pub fn text(s: impl Into<String>) -> Self {
        Operand::Text(s.into())
    }

    pub fn code_ref(&self) -> Option<&CodeRef> {
        match self {
            Operand::Code(code) => Some(code),
            Operand::Text(_) => None,
        }
    }
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operand::Text(s) => f.write_str(s),
            Operand::Code(code) => write!(f, "code_object {}", code.name),
        }
    }
}

/// One decoded instruction, or a merge-point marker.
#[derive(Debug, Clone)]
pub struct Token {
    /// Grammar terminal: a mnemonic, a variant such as `BUILD_LIST_2`,
    /// `LOAD_LAMBDA`, or `COME_FROM`.
    pub kind: String,
    pub arg: Option<u32>,
    pub operand: Option<Operand>,
    pub offset: Offset,
}

impl Token {
    pub fn new(kind: impl Into<String>, offset: Offset) -> Self {
        Self {
            kind: kind.into(),
            arg: None,
            operand: None,
            offset,
        }
    }

    pub fn with_operand(mut self, arg: Option<u32>, operand: Operand) -> Self {
        self.arg = arg;
        self.operand = Some(operand);
        self
    }

    pub fn come_from(pos: usize, index: usize) -> Self {
        Self::new(COME_FROM, Offset::arrival(pos, index))
    }

    /// A token with no meaningful position, for building canonical shapes.
    pub fn shape(kind: &str, operand: Option<&str>) -> Self {
        Self {
            kind: kind.to_string(),
            arg: None,
            operand: operand.map(Operand::text),
            offset: Offset::at(0),
        }
    }

    /// The display operand as text, empty when absent.
    pub fn pattr(&self) -> String {
        self.operand.as_ref().map(|o| o.to_string()).unwrap_or_default()
    }

    pub fn is_come_from(&self) -> bool {
        self.kind == COME_FROM
    }
}

/// Tokens are equal when kind and display operand agree; position and raw
/// argument are irrelevant to the shape of the code.
impl PartialEq for Token {
    fn eq(&self, other: &Self) -> bool {
        self.kind == other.kind && self.operand == other.operand
    }
}

impl fmt::Display for Token {
    /// One line of the diagnostic listing.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}\t{:<17} {}", self.offset, self.kind, self.pattr())
    }
}
