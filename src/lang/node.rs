use crate::frontend::token::Token;
use std::fmt;

/// A syntax tree node: a grammar symbol and the children it derived.
///
/// Nodes own their children outright. Equality is structural, and tokens
/// inside compare by kind and display operand only.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub tag: String,
    pub children: Vec<Child>,
}

/// Either a nested node or a leaf token.
#[derive(Debug, Clone, PartialEq)]
pub enum Child {
    Node(Node),
    Token(Token),
}

impl Child {
    /// Tag of a node or kind of a token.
    pub fn kind(&self) -> &str {
        match self {
            Child::Node(node) => &node.tag,
            Child::Token(token) => &token.kind,
        }
    }

    pub fn as_node(&self) -> Option<&Node> {
        match self {
            Child::Node(node) => Some(node),
            Child::Token(_) => None,
        }
    }

    pub fn as_node_mut(&mut self) -> Option<&mut Node> {
        match self {
            Child::Node(node) => Some(node),
            Child::Token(_) => None,
        }
    }

    pub fn as_token(&self) -> Option<&Token> {
        match self {
            Child::Token(token) => Some(token),
            Child::Node(_) => None,
        }
    }

    pub fn is(&self, kind: &str) -> bool {
        self.kind() == kind
    }
}

impl From<Node> for Child {
    fn from(node: Node) -> Self {
        Child::Node(node)
    }
}

impl From<Token> for Child {
    fn from(token: Token) -> Self {
        Child::Token(token)
    }
}

/// Resolve a possibly negative child index against `len`.
pub fn resolve_index(len: usize, index: isize) -> Option<usize> {
    let resolved = if index < 0 {
        len.checked_sub(index.unsigned_abs())?
    } else {
        index as usize
    };
    (resolved < len).then_some(resolved)
}

/// Clamp a `[low, high)` range with negative bounds counted from the end.
pub fn resolve_range(len: usize, low: isize, high: isize) -> (usize, usize) {
    let clamp = |i: isize| -> usize {
        if i < 0 {
            len.saturating_sub(i.unsigned_abs())
        } else {
            (i as usize).min(len)
        }
    };
    let (low, high) = (clamp(low), clamp(high));
    (low, high.max(low))
}

impl Node {
    pub fn new(tag: impl Into<String>, children: Vec<Child>) -> Self {
        Self {
            tag: tag.into(),
            children,
        }
    }

    pub fn len(&self) -> usize {
        self.children.len()
    }

    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }

    /// Child by index; negative indices count from the end.
    pub fn child(&self, index: isize) -> Option<&Child> {
        resolve_index(self.children.len(), index).map(|i| &self.children[i])
    }

    pub fn child_mut(&mut self, index: isize) -> Option<&mut Child> {
        let i = resolve_index(self.children.len(), index)?;
        Some(&mut self.children[i])
    }

    pub fn node(&self, index: isize) -> Option<&Node> {
        self.child(index).and_then(Child::as_node)
    }

    pub fn node_mut(&mut self, index: isize) -> Option<&mut Node> {
        self.child_mut(index).and_then(Child::as_node_mut)
    }

    pub fn token(&self, index: isize) -> Option<&Token> {
        self.child(index).and_then(Child::as_token)
    }

    /// Kind of the child at `index`, or `""` when there is none.
    pub fn kind_at(&self, index: isize) -> &str {
        self.child(index).map(Child::kind).unwrap_or("")
    }

    pub fn is(&self, tag: &str) -> bool {
        self.tag == tag
    }

    /// Every token in the subtree, in order.
    pub fn tokens(&self) -> Vec<&Token> {
        let mut out = Vec::new();
        let mut stack: Vec<&Child> = self.children.iter().rev().collect();
        while let Some(child) = stack.pop() {
            match child {
                Child::Token(token) => out.push(token),
                Child::Node(node) => stack.extend(node.children.iter().rev()),
            }
        }
        out
    }

    fn write_indented(&self, f: &mut fmt::Formatter<'_>, depth: usize) -> fmt::Result {
        writeln!(f, "{:indent$}{}", "", self.tag, indent = depth * 3)?;
        for child in &self.children {
            match child {
                Child::Node(node) => node.write_indented(f, depth + 1)?,
                Child::Token(token) => writeln!(
                    f,
                    "{:indent$}{}",
                    "",
                    token,
                    indent = (depth + 1) * 3
                )?,
            }
        }
        Ok(())
    }
}

impl fmt::Display for Node {
    /// Indented tree dump used by `--ast`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.write_indented(f, 0)
    }
}

// =============================================================================
// CANONICAL SHAPES
// =============================================================================

pub mod shapes {
    use super::{Child, Node};
    use crate::frontend::token::Token;
    use crate::lang::value::string_repr;

    fn token(kind: &str, operand: Option<&str>) -> Child {
        Child::Token(Token::shape(kind, operand))
    }

    fn node(tag: &str, children: Vec<Child>) -> Child {
        Child::Node(Node::new(tag, children))
    }

    fn returns(value: Child) -> Node {
        Node::new(
            "stmt",
            vec![node(
                "return_stmt",
                vec![node("expr", vec![value]), token("RETURN_VALUE", None)],
            )],
        )
    }

    /// `return None`, appended by the compiler to every body.
    pub fn return_none() -> Node {
        returns(token("LOAD_CONST", Some("None")))
    }

    /// `return locals()`, closing every class body.
    pub fn return_locals() -> Node {
        returns(token("LOAD_LOCALS", None))
    }

    /// `__doc__ = <doc>` as stored by module and class bodies.
    pub fn assign_doc_string(doc: &str) -> Node {
        Node::new(
            "stmt",
            vec![node(
                "assign",
                vec![
                    node("expr", vec![token("LOAD_CONST", Some(&string_repr(doc)))]),
                    node("designator", vec![token("STORE_NAME", Some("__doc__"))]),
                ],
            )],
        )
    }

    /// The empty tuple `()`.
    pub fn empty_tuple() -> Node {
        Node::new("expr", vec![token("BUILD_TUPLE_0", None)])
    }

    /// Load of a hidden tuple parameter such as `.1`.
    pub fn tuple_param(name: &str) -> Node {
        Node::new("expr", vec![token("LOAD_FAST", Some(name))])
    }

    /// The implicit `None` operand of a bare `return`.
    pub fn implicit_none() -> Node {
        Node::new("expr", vec![token("LOAD_CONST", Some("None"))])
    }
}
