use super::{RewriteError, ScopeKind};
use crate::bytecode::CodeObject;
use crate::lang::node::{Node, shapes};
use std::collections::BTreeMap;

/// Remove the statements the compiler wraps around a `kind` body and
/// return the docstring, if the body has one.
pub fn strip(
    stmts: &mut Node,
    code: &CodeObject,
    kind: ScopeKind,
) -> Result<Option<String>, RewriteError> {
    match kind {
        ScopeKind::Module => {
            let doc = take_doc_store(stmts, code);
            drop_last(stmts, &shapes::return_none());
            Ok(doc)
        }
        ScopeKind::Class => {
            let doc = take_doc_store(stmts, code);
            drop_last(stmts, &shapes::return_locals());
            Ok(doc)
        }
        ScopeKind::Function => {
            drop_last(stmts, &shapes::return_none());
            Ok(code.doc_const().map(str::to_string))
        }
        ScopeKind::Lambda => {
            let ret = stmts
                .node_mut(-1)
                .filter(|stmt| stmt.is("stmt") && stmt.len() == 1)
                .and_then(|stmt| stmt.node_mut(0))
                .filter(|ret| ret.is("return_stmt"))
                .ok_or(RewriteError::LambdaBody)?;
            ret.tag = "return_lambda".to_string();
            Ok(None)
        }
    }
}

/// A leading `__doc__ = consts[0]` store.
fn take_doc_store(stmts: &mut Node, code: &CodeObject) -> Option<String> {
    let doc = code.consts.first()?.as_str()?;
    if stmts.node(0)? != &shapes::assign_doc_string(doc) {
        return None;
    }
    stmts.children.remove(0);
    Some(doc.to_string())
}

fn drop_last(stmts: &mut Node, shape: &Node) {
    if stmts.node(-1) == Some(shape) {
        stmts.children.pop();
    }
}

/// Pull out the `<target> = .n` statement for every hidden tuple
/// parameter `.n`, keyed by parameter name.
pub fn tuple_params(
    stmts: &mut Node,
    code: &CodeObject,
) -> Result<BTreeMap<String, Node>, RewriteError> {
    let mut found = BTreeMap::new();
    let params = code
        .varnames
        .iter()
        .take(code.arg_count as usize)
        .filter(|name| name.starts_with('.'));

    for param in params {
        let load = shapes::tuple_param(param);
        let unpack = stmts.children.iter().enumerate().find_map(|(index, child)| {
            let assign = child.as_node()?.node(0)?;
            let matches = assign.is("assign") && assign.len() == 2 && assign.node(0) == Some(&load);
            matches.then(|| (index, assign.node(-1).cloned()))
        });

        match unpack {
            Some((index, Some(designator))) => {
                stmts.children.remove(index);
                found.insert(param.clone(), designator);
            }
            _ => {
                return Err(RewriteError::MissingTupleUnpack {
                    param: param.clone(),
                });
            }
        }
    }

    Ok(found)
}
