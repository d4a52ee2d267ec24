//! Structural rewrites between parsing and generation.
//!
//! Scope passes strip what the compiler adds around a body (docstring
//! stores, implicit returns, tuple-parameter unpacking). Idiom passes then
//! reshape single constructs so templates can render them directly.

pub mod idioms;
pub mod rewrite_error;
pub mod scope;

pub use rewrite_error::RewriteError;

use crate::bytecode::CodeObject;
use crate::lang::node::{Child, Node};
use std::collections::BTreeMap;
use tracing::trace;

/// Which kind of body a code object holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeKind {
    Module,
    Function,
    Lambda,
    Class,
}

/// A rewritten scope, ready for generation.
#[derive(Debug, Clone, PartialEq)]
pub struct Rewritten {
    /// Always `code[stmts[...]]`.
    pub tree: Node,

    /// Docstring lifted out of the body.
    pub doc: Option<String>,

    /// Unpacking target per hidden tuple parameter (`.0`, `.1`, ...).
    pub tuple_params: BTreeMap<String, Node>,
}

/// Apply the scope passes for `kind`, then every idiom pass.
pub fn rewrite(tree: Node, code: &CodeObject, kind: ScopeKind) -> Result<Rewritten, RewriteError> {
    let mut tree = tree;
    if tree.is_empty() {
        tree.children.push(Child::Node(Node::new("stmts", Vec::new())));
    }

    let (doc, tuple_params) = match tree.node_mut(0) {
        Some(stmts) => {
            let doc = scope::strip(stmts, code, kind)?;
            let params = scope::tuple_params(stmts, code)?;
            if kind == ScopeKind::Lambda && stmts.len() != 1 {
                return Err(RewriteError::LambdaBody);
            }
            (doc, params)
        }
        None => (None, BTreeMap::new()),
    };

    idioms::apply(&mut tree)?;
    trace!(code = %code.name, ?kind, "rewritten");

    Ok(Rewritten {
        tree,
        doc,
        tuple_params,
    })
}
