use crate::bytecode::CodeObject;
use serde::{Deserialize, Serialize};

/// An entry of a code object's constant pool.
///
/// `Display` yields the constant's `repr` as the 2.0 runtime would print it;
/// this is also the display operand of a `LOAD_CONST` token.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Constant {
    None,
    Ellipsis,

    /// Machine-sized integer.
    Int(i64),

    /// Arbitrary-precision integer, kept as its decimal digits.
    Long(String),

    Float(f64),

    /// Byte string literal.
    Str(String),

    Tuple(Vec<Constant>),

    /// Nested function, lambda or class body.
    Code(Box<CodeObject>),
}

impl Constant {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Constant::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_code(&self) -> Option<&CodeObject> {
        match self {
            Constant::Code(code) => Some(code),
            _ => None,
        }
    }

    /// Render the constant as a source literal for a `LOAD_CONST` site.
    ///
    /// Returns `None` for code objects, which have no literal form.
    ///
    /// `None` renders empty: a `LOAD_CONST None` only appears where the
    /// value is implicit (bare `return`, omitted slice bounds).
    ///
    /// A negative integer constant can only come from a literal that
    /// overflowed into the sign bit, since `-1` compiles to
    /// `LOAD_CONST 1; UNARY_NEGATIVE`. It is written back in hex so it
    /// recompiles to the same constant.
    pub fn literal(&self) -> Option<String> {
        Some(match self {
            Constant::None => String::new(),
            Constant::Ellipsis => "...".to_string(),
            Constant::Int(v) if *v < 0 => match i32::try_from(*v) {
                Ok(small) => format!("0x{:x}", small as u32),
                Err(_) => format!("0x{:x}", *v as u64),
            },
            Constant::Long(digits) if digits.starts_with('-') => format!("({}L)", digits),
            Constant::Float(v) if v.is_sign_negative() && !v.is_nan() => {
                format!("({})", float_repr(*v))
            }
            Constant::Code(_) => return None,
            other => other.to_string(),
        })
    }
}

impl std::fmt::Display for Constant {
    /// Format a constant using 2.0 `repr` syntax.
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Constant::None => write!(f, "None"),
            Constant::Ellipsis => write!(f, "Ellipsis"),
            Constant::Int(v) => write!(f, "{}", v),
            Constant::Long(digits) => write!(f, "{}L", digits),
            Constant::Float(v) => f.write_str(&float_repr(*v)),
            Constant::Str(s) => f.write_str(&string_repr(s)),
            Constant::Tuple(items) => {
                write!(f, "(")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                if items.len() == 1 {
                    write!(f, ",")?;
                }
                write!(f, ")")
            }
            Constant::Code(code) => write!(f, "<code object {}>", code.name),
        }
    }
}

/// Shortest text that reads back to the same `f64`, not the 17-digit
/// `repr` of 2.0. Both compile to the same constant.
fn float_repr(v: f64) -> String {
    if v.is_nan() {
        return "(1e1000 - 1e1000)".to_string();
    }
    if v.is_infinite() {
        return if v > 0.0 { "1e1000" } else { "-1e1000" }.to_string();
    }
    let text = format!("{:?}", v);
    if text.contains(['.', 'e', 'E']) {
        text
    } else {
        format!("{}.0", text)
    }
}

/// Quote a string the way `repr` does: single quotes unless the text
/// contains a single quote and no double quote.
pub fn string_repr(s: &str) -> String {
    let quote = if s.contains('\'') && !s.contains('"') {
        '"'
    } else {
        '\''
    };
    let mut out = String::with_capacity(s.len() + 2);
    out.push(quote);
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if c == quote => {
                out.push('\\');
                out.push(c);
            }
            c if (c as u32) < 0x20 || c as u32 == 0x7f => {
                out.push_str(&format!("\\x{:02x}", c as u32));
            }
            c => out.push(c),
        }
    }
    out.push(quote);
    out
}
