use crate::bytecode::decode_error::DecodeError;
use crate::bytecode::disasm::LOAD_LAMBDA;
use crate::bytecode::op::{Family, Variant};
use crate::grammar::Rule;
use std::iter;

fn repeat(symbol: &str, n: usize) -> impl Iterator<Item = String> + '_ {
    iter::repeat_n(symbol.to_string(), n)
}

/// The productions a decoded `(family, arity)` pair needs.
///
/// `DUP_TOPX` only appears inside fixed static rules and yields nothing.
/// Arities without a known stack shape are refused.
pub fn synthesize(variant: Variant) -> Result<Vec<Rule>, DecodeError> {
    let kind = variant.kind();
    let n = variant.arity as usize;
    let unsupported = || DecodeError::UnsupportedArity { variant };

    Ok(match variant.family {
        Family::BuildList | Family::BuildTuple => {
            vec![Rule::new("expr", repeat("expr", n).chain(iter::once(kind)))]
        }
        Family::BuildSlice => {
            if !(2..=3).contains(&n) {
                return Err(unsupported());
            }
            vec![Rule::new("expr", repeat("expr", n).chain(iter::once(kind)))]
        }
        Family::UnpackSequence => {
            vec![Rule::new("unpack", iter::once(kind).chain(repeat("designator", n)))]
        }
        Family::MakeFunction => vec![
            Rule::new(
                "mkfunc",
                repeat("expr", n).chain(["LOAD_CONST".to_string(), kind.clone()]),
            ),
            Rule::new(
                "mklambda",
                repeat("expr", n).chain([LOAD_LAMBDA.to_string(), kind]),
            ),
        ],
        Family::CallFunction
        | Family::CallFunctionVar
        | Family::CallFunctionKw
        | Family::CallFunctionVarKw => {
            if variant.arity > 0xffff {
                return Err(unsupported());
            }
            let positional = n & 0xff;
            let keyword = (n >> 8) & 0xff;
            let rhs = iter::once("expr".to_string())
                .chain(repeat("expr", positional))
                .chain(repeat("kwarg", keyword))
                .chain(repeat("expr", variant.family.star_args()))
                .chain(iter::once(kind));
            vec![Rule::new("expr", rhs)]
        }
        Family::DupTopX => {
            if !(1..=5).contains(&n) {
                return Err(unsupported());
            }
            Vec::new()
        }
    })
}
