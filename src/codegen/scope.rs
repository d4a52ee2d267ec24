//! Whole-scope generation: modules, function and lambda signatures, class bodies.

use super::Walker;
use crate::bytecode::{CodeObject, DecodeError};
use crate::decompiler::{Decompiler, ScopeText};
use crate::error::Result;
use crate::lang::node::Node;
use crate::rewrite::ScopeKind;
use std::collections::BTreeMap;
use tracing::trace;

/// Source text of a module: its docstring, then its statements.
pub fn module(decompiler: &Decompiler, code: &CodeObject) -> Result<String> {
    let rewritten = decompiler.scope_tree(code, ScopeKind::Module, 0)?;
    Walker::new(decompiler, code, 0, 0).scope_body(
        &rewritten.tree,
        rewritten.doc.as_deref(),
        ScopeKind::Module,
    )
}

/// Signature and body of a function or lambda.
///
/// Function bodies are indented at level `indent` and end with a newline;
/// a lambda body is the bare expression it returns.
pub fn function(
    decompiler: &Decompiler,
    code: &CodeObject,
    defaults: &[String],
    indent: usize,
    depth: usize,
) -> Result<ScopeText> {
    let kind = if code.is_lambda() {
        ScopeKind::Lambda
    } else {
        ScopeKind::Function
    };
    trace!(code = %code.name, ?kind, "generating scope");

    let rewritten = decompiler.scope_tree(code, kind, depth)?;
    let mut walker = Walker::new(decompiler, code, indent, depth);
    let signature = signature(&mut walker, code, defaults, &rewritten.tuple_params)?;

    let body = match kind {
        ScopeKind::Lambda => walker.lambda(true).generate(&rewritten.tree)?,
        _ => walker.scope_body(&rewritten.tree, rewritten.doc.as_deref(), kind)?,
    };

    Ok(ScopeText { signature, body })
}

/// Docstring and statements of a class body at level `indent`.
pub fn class(
    decompiler: &Decompiler,
    code: &CodeObject,
    indent: usize,
    depth: usize,
) -> Result<String> {
    let rewritten = decompiler.scope_tree(code, ScopeKind::Class, depth)?;
    Walker::new(decompiler, code, indent, depth).scope_body(
        &rewritten.tree,
        rewritten.doc.as_deref(),
        ScopeKind::Class,
    )
}

fn missing(code: &CodeObject, param: &'static str) -> DecodeError {
    DecodeError::MissingVarname {
        code: code.name.clone(),
        param,
    }
}

fn signature(
    walker: &mut Walker<'_>,
    code: &CodeObject,
    defaults: &[String],
    tuple_params: &BTreeMap<String, Node>,
) -> Result<String> {
    let argc = code.arg_count as usize;
    let first_default = argc.saturating_sub(defaults.len());
    let mut params = Vec::with_capacity(argc + 2);

    for (i, name) in (0..argc).map(|i| (i, code.varnames.get(i))) {
        let name = name.ok_or_else(|| missing(code, "a positional parameter"))?;
        let mut param = match tuple_params.get(name) {
            Some(designator) => tuple_param(walker, designator)?,
            None => name.clone(),
        };
        if let Some(value) = i.checked_sub(first_default).and_then(|d| defaults.get(d)) {
            let value = if value.is_empty() { "None" } else { value.as_str() };
            param.push('=');
            param.push_str(value);
        }
        params.push(param);
    }

    let mut slot = argc;
    if code.has_varargs() {
        let name = code.varnames.get(slot).ok_or_else(|| missing(code, "*args"))?;
        params.push(format!("*{}", name));
        slot += 1;
    }
    if code.has_varkeywords() {
        let name = code
            .varnames
            .get(slot)
            .ok_or_else(|| missing(code, "**kwargs"))?;
        params.push(format!("**{}", name));
    }

    Ok(params.join(", "))
}

/// `(a, (b, c))` for an unpacked tuple parameter.
fn tuple_param(walker: &mut Walker<'_>, designator: &Node) -> Result<String> {
    let text = walker.render_node(designator)?;
    if designator.kind_at(0) == "unpack" {
        Ok(text)
    } else {
        Ok(format!("({})", text))
    }
}
