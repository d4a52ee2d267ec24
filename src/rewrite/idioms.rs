//! Node-local rewrites, applied in one top-down walk.

use super::RewriteError;
use crate::lang::node::{Child, Node};

/// Rewrite `node` and then its children. A node is always reshaped
/// before anything below it is visited.
pub fn apply(node: &mut Node) -> Result<(), RewriteError> {
    match node.tag.as_str() {
        "ifelsestmt" => collapse_ladder(node),
        "list_compr" => flatten_comprehension(node)?,
        "stmts" => merge_prints(node),
        "binary_subscr" | "store_subscr" | "delete_subscr" => mark_subscript_tuple(node),
        _ => {}
    }

    for child in &mut node.children {
        if let Child::Node(child) = child {
            apply(child)?;
        }
    }
    Ok(())
}

// =============================================================================
// if / elif ladders
// =============================================================================

/// Turn `else: if ...` into `elif ...`, all the way down the chain.
fn collapse_ladder(node: &mut Node) {
    let Some(inner) = sole_statement(node, -2) else {
        return;
    };

    match inner.tag.as_str() {
        "ifstmt" => inner.tag = "elifstmt".to_string(),
        "ifelsestmt" => {
            collapse_ladder(inner);
            inner.tag = if inner.is("ifelifstmt") {
                "elifelifstmt"
            } else {
                "elifelsestmt"
            }
            .to_string();
        }
        _ => return,
    }
    node.tag = "ifelifstmt".to_string();
}

/// The compound statement inside a branch holding exactly one statement.
fn sole_statement(node: &mut Node, branch: isize) -> Option<&mut Node> {
    let stmts = node.node_mut(branch).filter(|n| n.is("stmts") && n.len() == 1)?;
    stmts.node_mut(0)?.node_mut(0)
}

// =============================================================================
// List comprehensions
// =============================================================================

/// `list_compr[lc_prep, lc_for, lc_cleanup]` becomes
/// `list_compr[body, comp_for[designator, iter], comp_if[cond], ...]`
/// with clauses in source order.
fn flatten_comprehension(node: &mut Node) -> Result<(), RewriteError> {
    let mut children = std::mem::take(&mut node.children).into_iter();
    let mut current = children
        .nth(1)
        .and_then(into_node)
        .ok_or(RewriteError::Comprehension("missing for clause"))?;

    let mut clauses = Vec::new();
    let body = loop {
        let tag = std::mem::take(&mut current.tag);
        let mut parts = slots(current);
        match tag.as_str() {
            "lc_for" => {
                let iter = take(&mut parts, 0, "for clause without iterable")?;
                let designator = take(&mut parts, 3, "for clause without target")?;
                clauses.push(Node::new(
                    "comp_for",
                    vec![Child::Node(designator), Child::Node(iter)],
                ));
                current = inner_clause(&mut parts, 4)?;
            }
            "lc_if" => {
                let cond = take(&mut parts, 0, "if clause without condition")?;
                clauses.push(Node::new("comp_if", vec![Child::Node(cond)]));
                current = inner_clause(&mut parts, 2)?;
            }
            "lc_body" => break take(&mut parts, 1, "missing element expression")?,
            _ => return Err(RewriteError::Comprehension("unexpected clause")),
        }
    };

    node.children = std::iter::once(body)
        .chain(clauses)
        .map(Child::Node)
        .collect();
    Ok(())
}

fn into_node(child: Child) -> Option<Node> {
    match child {
        Child::Node(node) => Some(node),
        Child::Token(_) => None,
    }
}

fn slots(node: Node) -> Vec<Option<Node>> {
    node.children.into_iter().map(into_node).collect()
}

fn take(parts: &mut [Option<Node>], index: usize, what: &'static str) -> Result<Node, RewriteError> {
    parts
        .get_mut(index)
        .and_then(Option::take)
        .ok_or(RewriteError::Comprehension(what))
}

/// Unwrap the `lc_inner` at `index` to the clause it holds.
fn inner_clause(parts: &mut [Option<Node>], index: usize) -> Result<Node, RewriteError> {
    let inner = take(parts, index, "missing inner clause")?;
    slots(inner)
        .into_iter()
        .next()
        .flatten()
        .ok_or(RewriteError::Comprehension("empty inner clause"))
}

// =============================================================================
// print
// =============================================================================

enum Print {
    /// `print x,`
    Item(Node),
    /// `print x`
    ItemNewline(Node),
    /// bare `print`
    Newline,
}

fn classify_print(stmt: &Node) -> Option<Print> {
    let inner = stmt.node(0)?;
    match inner.tag.as_str() {
        "print_stmt" => Some(Print::Item(inner.node(0)?.clone())),
        "print_stmt_nl" => Some(Print::ItemNewline(inner.node(0)?.node(0)?.clone())),
        "print_nl_stmt" => Some(Print::Newline),
        _ => None,
    }
}

/// Merge runs of `print x,` statements, plus a following newline print,
/// into one `print a, b[,]`.
fn merge_prints(stmts: &mut Node) {
    let old = std::mem::take(&mut stmts.children);
    let mut out = Vec::with_capacity(old.len());
    let mut run: Vec<Node> = Vec::new();

    for child in old {
        let print = child.as_node().and_then(classify_print);
        match print {
            Some(Print::Item(expr)) => run.push(expr),
            Some(Print::ItemNewline(expr)) => {
                run.push(expr);
                flush(&mut out, &mut run, true);
            }
            Some(Print::Newline) if !run.is_empty() => flush(&mut out, &mut run, true),
            _ => {
                flush(&mut out, &mut run, false);
                out.push(child);
            }
        }
    }
    flush(&mut out, &mut run, false);

    stmts.children = out;
}

fn flush(out: &mut Vec<Child>, run: &mut Vec<Node>, newline: bool) {
    if run.is_empty() {
        return;
    }
    let tag = if newline { "print_items_nl" } else { "print_items" };
    let items = run.drain(..).map(Child::Node).collect();
    out.push(Child::Node(Node::new(
        "stmt",
        vec![Child::Node(Node::new(tag, items))],
    )));
}

// =============================================================================
// Subscripts
// =============================================================================

/// `x[a, b]` indexes with a tuple; render it without parentheses.
fn mark_subscript_tuple(node: &mut Node) {
    let Some(index) = node.node_mut(-2).filter(|n| n.is("expr")) else {
        return;
    };
    let is_tuple = index
        .token(-1)
        .and_then(|t| t.kind.strip_prefix("BUILD_TUPLE_"))
        .and_then(|n| n.parse::<u32>().ok())
        .is_some_and(|n| n >= 2);
    if is_tuple {
        index.tag = "subscript_tuple".to_string();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frontend::token::Token;

    fn tok(kind: &str, operand: &str) -> Child {
        Child::Token(Token::shape(kind, (!operand.is_empty()).then_some(operand)))
    }

    fn n(tag: &str, children: Vec<Child>) -> Child {
        Child::Node(Node::new(tag, children))
    }

    fn name(id: &str) -> Child {
        n("expr", vec![tok("LOAD_NAME", id)])
    }

    fn assign(target: &str) -> Child {
        n(
            "stmts",
            vec![n(
                "stmt",
                vec![n(
                    "assign",
                    vec![name("v"), n("designator", vec![tok("STORE_NAME", target)])],
                )],
            )],
        )
    }

    fn if_else(cond: &str, then: Child, otherwise: Child) -> Child {
        n(
            "ifelsestmt",
            vec![
                name(cond),
                n("condjmp", vec![tok("JUMP_IF_FALSE", ""), tok("POP_TOP", "")]),
                then,
                tok("JUMP_FORWARD", ""),
                tok("COME_FROM", ""),
                tok("POP_TOP", ""),
                otherwise,
                tok("COME_FROM", ""),
            ],
        )
    }

    fn if_only(cond: &str, then: Child) -> Child {
        n(
            "ifstmt",
            vec![
                name(cond),
                n("condjmp", vec![tok("JUMP_IF_FALSE", ""), tok("POP_TOP", "")]),
                then,
                tok("JUMP_FORWARD", ""),
                tok("COME_FROM", ""),
                tok("POP_TOP", ""),
                tok("COME_FROM", ""),
            ],
        )
    }

    fn wrap(stmt: Child) -> Child {
        n("stmts", vec![n("stmt", vec![stmt])])
    }

    fn ladder_tags(node: &Node) -> Vec<String> {
        let mut tags = vec![node.tag.clone()];
        let mut current = node;
        while let Some(next) = current.node(-2).and_then(|s| s.node(0)).and_then(|s| s.node(0)) {
            if !next.tag.contains("if") {
                break;
            }
            tags.push(next.tag.clone());
            current = next;
        }
        tags
    }

    #[test]
    fn test_ladder_ending_in_else() {
        let chain = if_else(
            "a",
            assign("x"),
            wrap(if_else("b", assign("x"), wrap(if_else("c", assign("x"), assign("y"))))),
        );
        let Child::Node(mut root) = chain else { unreachable!() };
        apply(&mut root).unwrap();
        assert_eq!(
            ladder_tags(&root),
            ["ifelifstmt", "elifelifstmt", "elifelsestmt"]
        );
    }

    #[test]
    fn test_ladder_ending_in_elif() {
        let Child::Node(mut root) = if_else("a", assign("x"), wrap(if_only("b", assign("y")))) else {
            unreachable!()
        };
        apply(&mut root).unwrap();
        assert_eq!(ladder_tags(&root), ["ifelifstmt", "elifstmt"]);
    }

    #[test]
    fn test_else_with_two_statements_stays() {
        let mut otherwise = wrap(if_only("b", assign("y")));
        if let Child::Node(stmts) = &mut otherwise {
            stmts.children.push(n("stmt", vec![n("passstmt", vec![])]));
        }
        let Child::Node(mut root) = if_else("a", assign("x"), otherwise) else { unreachable!() };
        apply(&mut root).unwrap();
        assert_eq!(root.tag, "ifelsestmt");
    }

    #[test]
    fn test_comprehension_flattened() {
        let body = n(
            "lc_body",
            vec![tok("LOAD_NAME", "_[1]"), name("x"), tok("CALL_FUNCTION_1", ""), tok("POP_TOP", "")],
        );
        let lc_if = n(
            "lc_if",
            vec![
                name("x"),
                n("condjmp", vec![tok("JUMP_IF_FALSE", ""), tok("POP_TOP", "")]),
                n("lc_inner", vec![body]),
                tok("JUMP_FORWARD", ""),
                tok("COME_FROM", ""),
                tok("POP_TOP", ""),
                tok("COME_FROM", ""),
            ],
        );
        let lc_for = n(
            "lc_for",
            vec![
                name("xs"),
                tok("LOAD_CONST", "0"),
                tok("FOR_LOOP", ""),
                n("designator", vec![tok("STORE_NAME", "x")]),
                n("lc_inner", vec![lc_if]),
                tok("JUMP_ABSOLUTE", ""),
                tok("COME_FROM", ""),
            ],
        );
        let mut root = Node::new(
            "list_compr",
            vec![n("lc_prep", vec![]), lc_for, n("lc_cleanup", vec![])],
        );
        apply(&mut root).unwrap();

        let tags: Vec<_> = root.children.iter().map(Child::kind).collect();
        assert_eq!(tags, ["expr", "comp_for", "comp_if"]);
        let comp_for = root.node(1).unwrap();
        assert_eq!(comp_for.kind_at(0), "designator");
        let Child::Node(iter) = name("xs") else { unreachable!() };
        assert_eq!(comp_for.node(1), Some(&iter));
        assert_eq!(root.node(0).and_then(|e| e.token(0)).map(Token::pattr).as_deref(), Some("x"));
    }

    #[test]
    fn test_malformed_comprehension() {
        let mut root = Node::new("list_compr", vec![n("lc_prep", vec![])]);
        assert_eq!(
            apply(&mut root),
            Err(RewriteError::Comprehension("missing for clause"))
        );
    }

    fn print_item(id: &str) -> Child {
        n("stmt", vec![n("print_stmt", vec![name(id), tok("PRINT_ITEM", "")])])
    }

    fn print_newline() -> Child {
        n("stmt", vec![n("print_nl_stmt", vec![tok("PRINT_NEWLINE", "")])])
    }

    #[test]
    fn test_prints_merged() {
        let mut stmts = Node::new(
            "stmts",
            vec![
                print_item("a"),
                print_item("b"),
                print_newline(),
                print_item("c"),
                n("stmt", vec![n("passstmt", vec![])]),
                print_newline(),
            ],
        );
        apply(&mut stmts).unwrap();
        let shapes: Vec<_> = stmts
            .children
            .iter()
            .map(|c| {
                let inner = c.as_node().and_then(|s| s.node(0)).unwrap();
                (inner.tag.clone(), inner.len())
            })
            .collect();
        assert_eq!(
            shapes,
            [
                ("print_items_nl".to_string(), 2),
                ("print_items".to_string(), 1),
                ("passstmt".to_string(), 0),
                ("print_nl_stmt".to_string(), 1),
            ]
        );
    }

    #[test]
    fn test_subscript_tuple_marked() {
        let index = n("expr", vec![name("i"), name("j"), tok("BUILD_TUPLE_2", "")]);
        let mut node = Node::new("binary_subscr", vec![name("m"), index, tok("BINARY_SUBSCR", "")]);
        apply(&mut node).unwrap();
        assert!(node.node(1).unwrap().is("subscript_tuple"));

        let single = n("expr", vec![name("i"), tok("BUILD_TUPLE_1", "")]);
        let mut node = Node::new("binary_subscr", vec![name("m"), single, tok("BINARY_SUBSCR", "")]);
        apply(&mut node).unwrap();
        assert!(node.node(1).unwrap().is("expr"));
    }
}
