use std::fmt;

// =============================================================================
// OPCODE - Python 2.0 virtual machine instructions
// =============================================================================

/// Opcodes at or above this value carry a 16-bit operand.
pub const HAVE_ARGUMENT: u8 = 90;

/// Operand table for `COMPARE_OP`.
pub const CMP_OPS: [&str; 12] = [
    "<",
    "<=",
    "==",
    "!=",
    ">",
    ">=",
    "in",
    "not in",
    "is",
    "is not",
    "exception match",
    "BAD",
];

macro_rules! opcodes {
    ($($variant:ident = $byte:literal => $mnemonic:literal,)*) => {
        /// A single instruction of the fixed 2.0 instruction set.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub enum Opcode {
            $($variant,)*
        }

        impl Opcode {
            /// Decode an opcode byte. Bytes outside the table yield `None`.
            pub fn from_byte(byte: u8) -> Option<Opcode> {
                match byte {
                    $($byte => Some(Opcode::$variant),)*
                    _ => None,
                }
            }

            pub fn byte(self) -> u8 {
                match self {
                    $(Opcode::$variant => $byte,)*
                }
            }

            /// Mnemonic as it appears in listings and grammar rules.
            pub fn mnemonic(self) -> &'static str {
                match self {
                    $(Opcode::$variant => $mnemonic,)*
                }
            }
        }
    };
}

opcodes! {
    StopCode = 0 => "STOP_CODE",
    PopTop = 1 => "POP_TOP",
    RotTwo = 2 => "ROT_TWO",
    RotThree = 3 => "ROT_THREE",
    DupTop = 4 => "DUP_TOP",
    RotFour = 5 => "ROT_FOUR",

    UnaryPositive = 10 => "UNARY_POSITIVE",
    UnaryNegative = 11 => "UNARY_NEGATIVE",
    UnaryNot = 12 => "UNARY_NOT",
    UnaryConvert = 13 => "UNARY_CONVERT",
    UnaryInvert = 15 => "UNARY_INVERT",

    BinaryPower = 19 => "BINARY_POWER",
    BinaryMultiply = 20 => "BINARY_MULTIPLY",
    BinaryDivide = 21 => "BINARY_DIVIDE",
    BinaryModulo = 22 => "BINARY_MODULO",
    BinaryAdd = 23 => "BINARY_ADD",
    BinarySubtract = 24 => "BINARY_SUBTRACT",
    BinarySubscr = 25 => "BINARY_SUBSCR",

    Slice0 = 30 => "SLICE+0",
    Slice1 = 31 => "SLICE+1",
    Slice2 = 32 => "SLICE+2",
    Slice3 = 33 => "SLICE+3",
    StoreSlice0 = 40 => "STORE_SLICE+0",
    StoreSlice1 = 41 => "STORE_SLICE+1",
    StoreSlice2 = 42 => "STORE_SLICE+2",
    StoreSlice3 = 43 => "STORE_SLICE+3",
    DeleteSlice0 = 50 => "DELETE_SLICE+0",
    DeleteSlice1 = 51 => "DELETE_SLICE+1",
    DeleteSlice2 = 52 => "DELETE_SLICE+2",
    DeleteSlice3 = 53 => "DELETE_SLICE+3",

    InplaceAdd = 55 => "INPLACE_ADD",
    InplaceSubtract = 56 => "INPLACE_SUBTRACT",
    InplaceMultiply = 57 => "INPLACE_MULTIPLY",
    InplaceDivide = 58 => "INPLACE_DIVIDE",
    InplaceModulo = 59 => "INPLACE_MODULO",
    StoreSubscr = 60 => "STORE_SUBSCR",
    DeleteSubscr = 61 => "DELETE_SUBSCR",

    BinaryLshift = 62 => "BINARY_LSHIFT",
    BinaryRshift = 63 => "BINARY_RSHIFT",
    BinaryAnd = 64 => "BINARY_AND",
    BinaryXor = 65 => "BINARY_XOR",
    BinaryOr = 66 => "BINARY_OR",
    InplacePower = 67 => "INPLACE_POWER",

    PrintExpr = 70 => "PRINT_EXPR",
    PrintItem = 71 => "PRINT_ITEM",
    PrintNewline = 72 => "PRINT_NEWLINE",
    PrintItemTo = 73 => "PRINT_ITEM_TO",
    PrintNewlineTo = 74 => "PRINT_NEWLINE_TO",
    InplaceLshift = 75 => "INPLACE_LSHIFT",
    InplaceRshift = 76 => "INPLACE_RSHIFT",
    InplaceAnd = 77 => "INPLACE_AND",
    InplaceXor = 78 => "INPLACE_XOR",
    InplaceOr = 79 => "INPLACE_OR",
    BreakLoop = 80 => "BREAK_LOOP",

    LoadLocals = 82 => "LOAD_LOCALS",
    ReturnValue = 83 => "RETURN_VALUE",
    ImportStar = 84 => "IMPORT_STAR",
    ExecStmt = 85 => "EXEC_STMT",

    PopBlock = 87 => "POP_BLOCK",
    EndFinally = 88 => "END_FINALLY",
    BuildClass = 89 => "BUILD_CLASS",

    // ==========================================================================
    // Opcodes with an operand
    // ==========================================================================
    StoreName = 90 => "STORE_NAME",
    DeleteName = 91 => "DELETE_NAME",
    UnpackSequence = 92 => "UNPACK_SEQUENCE",

    StoreAttr = 95 => "STORE_ATTR",
    DeleteAttr = 96 => "DELETE_ATTR",
    StoreGlobal = 97 => "STORE_GLOBAL",
    DeleteGlobal = 98 => "DELETE_GLOBAL",
    DupTopX = 99 => "DUP_TOPX",
    LoadConst = 100 => "LOAD_CONST",
    LoadName = 101 => "LOAD_NAME",
    BuildTuple = 102 => "BUILD_TUPLE",
    BuildList = 103 => "BUILD_LIST",
    BuildMap = 104 => "BUILD_MAP",
    LoadAttr = 105 => "LOAD_ATTR",
    CompareOp = 106 => "COMPARE_OP",
    ImportName = 107 => "IMPORT_NAME",
    ImportFrom = 108 => "IMPORT_FROM",

    JumpForward = 110 => "JUMP_FORWARD",
    JumpIfFalse = 111 => "JUMP_IF_FALSE",
    JumpIfTrue = 112 => "JUMP_IF_TRUE",
    JumpAbsolute = 113 => "JUMP_ABSOLUTE",
    ForLoop = 114 => "FOR_LOOP",

    LoadGlobal = 116 => "LOAD_GLOBAL",

    SetupLoop = 120 => "SETUP_LOOP",
    SetupExcept = 121 => "SETUP_EXCEPT",
    SetupFinally = 122 => "SETUP_FINALLY",

    LoadFast = 124 => "LOAD_FAST",
    StoreFast = 125 => "STORE_FAST",
    DeleteFast = 126 => "DELETE_FAST",
    SetLineno = 127 => "SET_LINENO",

    RaiseVarargs = 130 => "RAISE_VARARGS",
    CallFunction = 131 => "CALL_FUNCTION",
    MakeFunction = 132 => "MAKE_FUNCTION",
    BuildSlice = 133 => "BUILD_SLICE",

    CallFunctionVar = 140 => "CALL_FUNCTION_VAR",
    CallFunctionKw = 141 => "CALL_FUNCTION_KW",
    CallFunctionVarKw = 142 => "CALL_FUNCTION_VAR_KW",
    ExtendedArg = 143 => "EXTENDED_ARG",
}

/// How an instruction's operand is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArgKind {
    None,
    Const,
    Name,
    Local,
    JumpRelative,
    JumpAbsolute,
    Compare,
    Count,
}

impl Opcode {
    pub fn has_arg(self) -> bool {
        self.byte() >= HAVE_ARGUMENT
    }

    /// Encoded size in bytes.
    pub fn size(self) -> usize {
        if self.has_arg() { 3 } else { 1 }
    }

    pub fn arg_kind(self) -> ArgKind {
        use Opcode::*;
        if !self.has_arg() {
            return ArgKind::None;
        }
        match self {
            LoadConst => ArgKind::Const,
            StoreName | DeleteName | StoreAttr | DeleteAttr | StoreGlobal | DeleteGlobal
            | LoadName | LoadAttr | ImportName | ImportFrom | LoadGlobal => ArgKind::Name,
            LoadFast | StoreFast | DeleteFast => ArgKind::Local,
            JumpForward | JumpIfFalse | JumpIfTrue | ForLoop | SetupLoop | SetupExcept
            | SetupFinally => ArgKind::JumpRelative,
            JumpAbsolute => ArgKind::JumpAbsolute,
            CompareOp => ArgKind::Compare,
            _ => ArgKind::Count,
        }
    }

    /// The variable-arity family this opcode belongs to, if any.
    pub fn family(self) -> Option<Family> {
        use Opcode::*;
        Some(match self {
            BuildList => Family::BuildList,
            BuildTuple => Family::BuildTuple,
            BuildSlice => Family::BuildSlice,
            UnpackSequence => Family::UnpackSequence,
            MakeFunction => Family::MakeFunction,
            CallFunction => Family::CallFunction,
            CallFunctionVar => Family::CallFunctionVar,
            CallFunctionKw => Family::CallFunctionKw,
            CallFunctionVarKw => Family::CallFunctionVarKw,
            DupTopX => Family::DupTopX,
            _ => return None,
        })
    }
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.mnemonic())
    }
}

// =============================================================================
// FAMILY - variable-arity instruction families
// =============================================================================

/// Instructions whose operand is an item count. Each decoded
/// `(family, arity)` pair needs its own grammar production.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Family {
    BuildList,
    BuildTuple,
    BuildSlice,
    UnpackSequence,
    MakeFunction,
    CallFunction,
    CallFunctionVar,
    CallFunctionKw,
    CallFunctionVarKw,
    DupTopX,
}

impl Family {
    pub const ALL: [Family; 10] = [
        Family::BuildList,
        Family::BuildTuple,
        Family::BuildSlice,
        Family::UnpackSequence,
        Family::MakeFunction,
        Family::CallFunction,
        Family::CallFunctionVar,
        Family::CallFunctionKw,
        Family::CallFunctionVarKw,
        Family::DupTopX,
    ];

    pub fn opcode(self) -> Opcode {
        match self {
            Family::BuildList => Opcode::BuildList,
            Family::BuildTuple => Opcode::BuildTuple,
            Family::BuildSlice => Opcode::BuildSlice,
            Family::UnpackSequence => Opcode::UnpackSequence,
            Family::MakeFunction => Opcode::MakeFunction,
            Family::CallFunction => Opcode::CallFunction,
            Family::CallFunctionVar => Opcode::CallFunctionVar,
            Family::CallFunctionKw => Opcode::CallFunctionKw,
            Family::CallFunctionVarKw => Opcode::CallFunctionVarKw,
            Family::DupTopX => Opcode::DupTopX,
        }
    }

    pub fn mnemonic(self) -> &'static str {
        self.opcode().mnemonic()
    }

    /// Number of trailing `*args`/`**kwargs` operands a call family pops.
    pub fn star_args(self) -> usize {
        match self {
            Family::CallFunctionVar | Family::CallFunctionKw => 1,
            Family::CallFunctionVarKw => 2,
            _ => 0,
        }
    }
}

/// A decoded `(family, arity)` pair, e.g. `BUILD_LIST_3`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Variant {
    pub family: Family,
    pub arity: u32,
}

impl Variant {
    pub fn new(family: Family, arity: u32) -> Self {
        Self { family, arity }
    }

    /// Grammar terminal for this variant.
    pub fn kind(&self) -> String {
        format!("{}_{}", self.family.mnemonic(), self.arity)
    }

    /// Split a token kind such as `CALL_FUNCTION_KW_257` back into a variant.
    pub fn parse(kind: &str) -> Option<Variant> {
        let (head, digits) = kind.rsplit_once('_')?;
        let arity = digits.parse().ok()?;
        Family::ALL
            .iter()
            .find(|family| family.mnemonic() == head)
            .map(|&family| Variant::new(family, arity))
    }
}

impl fmt::Display for Variant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}", self.family.mnemonic(), self.arity)
    }
}
