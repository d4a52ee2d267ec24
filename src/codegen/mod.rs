//! Source generation from rewritten syntax trees.

pub mod scope;
pub mod templates;

use crate::bytecode::CodeObject;
use crate::decompiler::Decompiler;
use crate::error::{Error, Result};
use crate::frontend::token::{Operand, Token};
use crate::lang::node::{Child, Node, resolve_range, shapes};
use crate::lang::value::{Constant, string_repr};
use crate::rewrite::ScopeKind;
use std::collections::HashSet;
use templates::{Arg, Template};

/// Tags whose shape template is chosen by their last child.
const SHAPED: &[&str] = &["stmt", "designator", "expr"];

/// Expression kinds that need parentheses when nested under an operator.
const COMPOUND: &[&str] = &["binary_expr", "cmp", "and", "or", "mklambda"];

/// Generates the text of one scope.
///
/// A walker owns its output buffer and indentation. Nested function and
/// class bodies are generated by fresh walkers and spliced in.
pub struct Walker<'a> {
    decompiler: &'a Decompiler,
    code: &'a CodeObject,
    out: String,
    indent: usize,
    lambda: bool,
    /// Names already declared `global` in this scope.
    globals: HashSet<String>,
    /// Tree depth, carried into nested scopes.
    depth: usize,
}

/// What an escape applies to: the template's node, or the child a `%[n]`
/// prefix stepped to.
#[derive(Clone, Copy)]
enum Focus<'n> {
    Node(&'n Node),
    Token(&'n Token),
}

impl<'n> Focus<'n> {
    fn of(child: &'n Child) -> Self {
        match child {
            Child::Node(node) => Focus::Node(node),
            Child::Token(token) => Focus::Token(token),
        }
    }
}

fn generate_error(message: impl Into<String>) -> Error {
    Error::Generate(message.into())
}

impl<'a> Walker<'a> {
    pub fn new(decompiler: &'a Decompiler, code: &'a CodeObject, indent: usize, depth: usize) -> Self {
        Self {
            decompiler,
            code,
            out: String::new(),
            indent,
            lambda: false,
            globals: HashSet::new(),
            depth,
        }
    }

    pub fn lambda(mut self, lambda: bool) -> Self {
        self.lambda = lambda;
        self
    }

    /// Generate `node` and return everything written so far.
    pub fn generate(mut self, node: &Node) -> Result<String> {
        self.node(node)?;
        Ok(self.out)
    }

    fn tab(&self) -> &'a str {
        &self.decompiler.config().output.indent
    }

    fn write_indent(&mut self) {
        let tab = self.tab();
        for _ in 0..self.indent {
            self.out.push_str(tab);
        }
    }

    /// Run `f` against an empty buffer and return what it wrote.
    fn capture(&mut self, f: impl FnOnce(&mut Self) -> Result<()>) -> Result<String> {
        let saved = std::mem::take(&mut self.out);
        let result = f(self);
        let text = std::mem::replace(&mut self.out, saved);
        result.map(|()| text)
    }

    fn render(&mut self, child: &Child) -> Result<String> {
        self.capture(|w| w.child(child))
    }

    fn render_node(&mut self, node: &Node) -> Result<String> {
        self.capture(|w| w.node(node))
    }

    // =========================================================================
    // Traversal
    // =========================================================================

    fn child(&mut self, child: &Child) -> Result<()> {
        match child {
            Child::Node(node) => self.node(node),
            Child::Token(token) => self.token(token),
        }
    }

    fn node(&mut self, node: &Node) -> Result<()> {
        let max_depth = self.decompiler.config().limits.max_depth;
        if self.depth >= max_depth {
            return Err(Error::DepthExceeded { limit: max_depth });
        }
        self.depth += 1;
        let result = self.dispatch(node);
        self.depth -= 1;
        result
    }

    fn dispatch(&mut self, node: &Node) -> Result<()> {
        match node.tag.as_str() {
            "funcdef" => return self.funcdef(node),
            "classdef" => return self.classdef(node),
            "mklambda" => return self.mklambda(node),
            "mkfunc" => return Err(generate_error("function object used outside a definition")),
            "import_as" => return self.import_as(node),
            "exec_stmt" => return self.exec_stmt(node),
            "raise_stmt" => return self.raise_stmt(node),
            "return_stmt" => return self.return_stmt(node),
            "stmt" if !self.lambda => self.declare_globals(node),
            _ => {}
        }

        let template = if SHAPED.contains(&node.tag.as_str()) {
            templates::shape(node.kind_at(-1))
        } else {
            templates::direct(&node.tag)
        };

        match template {
            Some(template) => self.run(template, Focus::Node(node)),
            None => node.children.iter().try_for_each(|child| self.child(child)),
        }
    }

    fn token(&mut self, token: &Token) -> Result<()> {
        if token.kind == "LOAD_CONST" {
            let literal = self.constant(token)?;
            self.out.push_str(&literal);
            return Ok(());
        }
        match templates::direct(&token.kind) {
            Some(template) => self.run(template, Focus::Token(token)),
            None => Ok(()),
        }
    }

    fn paren(&mut self, child: &Child) -> Result<()> {
        if is_compound(child) {
            self.out.push('(');
            self.child(child)?;
            self.out.push(')');
            Ok(())
        } else {
            self.child(child)
        }
    }

    // =========================================================================
    // Template engine
    // =========================================================================

    fn run(&mut self, template: &Template, start: Focus<'_>) -> Result<()> {
        let malformed = || generate_error(format!("malformed template {:?}", template.pattern));
        let mut args = template.args.iter();
        let mut joined = 0usize;
        let mut rest = template.pattern;

        while let Some(at) = rest.find('%') {
            self.out.push_str(&rest[..at]);
            rest = &rest[at + 1..];

            let mut focus = start;
            if let Some(after) = rest.strip_prefix('[') {
                let close = after.find(']').ok_or_else(malformed)?;
                let index: isize = after[..close].parse().map_err(|_| malformed())?;
                focus = match focus {
                    Focus::Node(node) => node.child(index).map(Focus::of),
                    Focus::Token(_) => None,
                }
                .ok_or_else(|| generate_error(format!("no child {} for {:?}", index, template.pattern)))?;
                rest = &after[close + 1..];
            }

            let escape = rest.chars().next().ok_or_else(malformed)?;
            rest = &rest[escape.len_utf8()..];

            match escape {
                '%' => self.out.push('%'),
                '|' => self.write_indent(),
                '+' => self.indent += 1,
                '-' => self.indent = self.indent.saturating_sub(1),
                ',' => {
                    if joined == 1 {
                        self.out.push(',');
                    }
                }
                'c' | 'p' => {
                    let Some(&Arg::Child(index)) = args.next() else {
                        return Err(malformed());
                    };
                    let child = expect_node(focus, template)?
                        .child(index)
                        .ok_or_else(|| generate_error(format!("no child {} for {:?}", index, template.pattern)))?;
                    if escape == 'p' {
                        self.paren(child)?;
                    } else {
                        self.child(child)?;
                    }
                }
                'C' => {
                    let Some(&Arg::Range(low, high, sep)) = args.next() else {
                        return Err(malformed());
                    };
                    let node = expect_node(focus, template)?;
                    let (low, high) = resolve_range(node.len(), low, high);
                    for (i, child) in node.children[low..high].iter().enumerate() {
                        if i > 0 {
                            self.out.push_str(sep);
                        }
                        self.child(child)?;
                    }
                    joined = high - low;
                }
                '{' => {
                    let close = rest.find('}').ok_or_else(malformed)?;
                    let field = &rest[..close];
                    rest = &rest[close + 1..];
                    let Focus::Token(token) = focus else {
                        return Err(generate_error(format!("field {{{}}} needs a token", field)));
                    };
                    let text = match field {
                        "pattr" => token.pattr(),
                        "name" => unquote(&token.pattr()).to_string(),
                        other => return Err(generate_error(format!("unknown template field {{{}}}", other))),
                    };
                    self.out.push_str(&text);
                }
                _ => return Err(malformed()),
            }
        }

        self.out.push_str(rest);
        Ok(())
    }

    // =========================================================================
    // Node handlers
    // =========================================================================

    fn constant(&self, token: &Token) -> Result<String> {
        if let Some(Operand::Code(code)) = &token.operand {
            return Err(generate_error(format!("code object {} used as a value", code.name)));
        }
        match token.arg.and_then(|i| self.code.consts.get(i as usize)) {
            Some(constant) => constant
                .literal()
                .ok_or_else(|| generate_error("constant has no literal form")),
            None if token.pattr() == "None" => Ok(String::new()),
            None => Ok(token.pattr()),
        }
    }

    /// The nested code object a `LOAD_CONST`/`LOAD_LAMBDA` token refers to.
    fn nested(&self, token: Option<&Token>) -> Result<&'a CodeObject> {
        let code_ref = token
            .and_then(|t| t.operand.as_ref())
            .and_then(Operand::code_ref)
            .ok_or_else(|| generate_error("expected a code object operand"))?;
        self.code
            .consts
            .get(code_ref.index)
            .and_then(Constant::as_code)
            .ok_or_else(|| generate_error(format!("no code object at constant {}", code_ref.index)))
    }

    /// Rendered default values of a `mkfunc`/`mklambda` node, in order.
    fn defaults(&mut self, maker: &Node) -> Result<Vec<String>> {
        let count = maker.len().saturating_sub(2);
        maker.children[..count].iter().map(|d| self.render(d)).collect()
    }

    fn funcdef(&mut self, node: &Node) -> Result<()> {
        let maker = node
            .node(0)
            .filter(|n| n.is("mkfunc"))
            .ok_or_else(|| generate_error("definition without a function"))?;
        let name = node.token(-1).map(Token::pattr).unwrap_or_default();
        let code = self.nested(maker.token(-2))?;
        let defaults = self.defaults(maker)?;

        let text = scope::function(self.decompiler, code, &defaults, self.indent + 1, self.depth)
            .map_err(|e| e.in_scope(&code.name))?;

        self.write_indent();
        self.out.push_str(&format!("def {}({}):\n", name, text.signature));
        self.out.push_str(&text.body);
        Ok(())
    }

    fn mklambda(&mut self, node: &Node) -> Result<()> {
        let code = self.nested(node.token(-2))?;
        let defaults = self.defaults(node)?;
        let text = scope::function(self.decompiler, code, &defaults, self.indent, self.depth)
            .map_err(|e| e.in_scope(&code.name))?;

        if text.signature.is_empty() {
            self.out.push_str("lambda: ");
        } else {
            self.out.push_str(&format!("lambda {}: ", text.signature));
        }
        self.out.push_str(&text.body);
        Ok(())
    }

    /// `classdef ::= LOAD_CONST expr mkfunc CALL_FUNCTION_0 BUILD_CLASS STORE_*`
    fn classdef(&mut self, node: &Node) -> Result<()> {
        let name = node.token(-1).map(Token::pattr).unwrap_or_default();
        let bases = node
            .node(1)
            .ok_or_else(|| generate_error("class without bases"))?;
        let maker = node
            .node(2)
            .ok_or_else(|| generate_error("class without a body"))?;
        let code = self.nested(maker.token(-2))?;

        let bases = if *bases == shapes::empty_tuple() {
            String::new()
        } else {
            let items = match bases.token(-1) {
                Some(t) if t.kind.starts_with("BUILD_TUPLE_") => &bases.children[..bases.len() - 1],
                _ => std::slice::from_ref(bases.child(0).ok_or_else(|| generate_error("empty bases"))?),
            };
            let rendered = items
                .iter()
                .map(|base| self.render(base))
                .collect::<Result<Vec<_>>>()?;
            format!("({})", rendered.join(", "))
        };

        let body = scope::class(self.decompiler, code, self.indent + 1, self.depth)
            .map_err(|e| e.in_scope(&code.name))?;

        self.write_indent();
        self.out.push_str(&format!("class {}{}:\n", name, bases));
        self.out.push_str(&body);
        Ok(())
    }

    /// `import a.b`, `import a.b as c`, `from m import x as y`.
    fn import_as(&mut self, node: &Node) -> Result<()> {
        let imported = node.token(0).map(Token::pattr).unwrap_or_default();
        let stored = node.token(-1).map(Token::pattr).unwrap_or_default();
        let implicit = imported == stored
            || imported
                .strip_prefix(stored.as_str())
                .is_some_and(|rest| rest.starts_with('.'));
        if implicit {
            self.out.push_str(&imported);
        } else {
            self.out.push_str(&format!("{} as {}", imported, stored));
        }
        Ok(())
    }

    /// `exec code [in globals[, locals]]`
    fn exec_stmt(&mut self, node: &Node) -> Result<()> {
        let code = node
            .child(0)
            .ok_or_else(|| generate_error("exec without code"))?;
        let code = self.render(code)?;
        let scope = match node.node(1) {
            Some(list) => self.join(list, ", ")?,
            None => String::new(),
        };

        self.write_indent();
        self.out.push_str("exec ");
        self.out.push_str(&code);
        if !scope.is_empty() {
            self.out.push_str(" in ");
            self.out.push_str(&scope);
        }
        self.out.push('\n');
        Ok(())
    }

    fn raise_stmt(&mut self, node: &Node) -> Result<()> {
        let args = match node.node(0) {
            Some(list) => self.join(list, ", ")?,
            None => String::new(),
        };
        self.write_indent();
        if args.is_empty() {
            self.out.push_str("raise\n");
        } else {
            self.out.push_str(&format!("raise {}\n", args));
        }
        Ok(())
    }

    fn return_stmt(&mut self, node: &Node) -> Result<()> {
        let value = node
            .node(0)
            .ok_or_else(|| generate_error("return without a value"))?;
        self.write_indent();
        if *value == shapes::implicit_none() {
            self.out.push_str("return\n");
        } else {
            let text = self.render(&node.children[0])?;
            self.out.push_str(&format!("return {}\n", text));
        }
        Ok(())
    }

    /// Render every child of `list`, separated by `sep`. An all-empty list
    /// renders as nothing.
    fn join(&mut self, list: &Node, sep: &str) -> Result<String> {
        let parts = list
            .children
            .iter()
            .map(|child| self.render(child))
            .collect::<Result<Vec<_>>>()?;
        if parts.iter().all(String::is_empty) {
            return Ok(String::new());
        }
        Ok(parts.join(sep))
    }

    /// Emit `global NAME` for each name this statement stores or deletes
    /// globally, once per scope. Nested statements declare their own.
    fn declare_globals(&mut self, stmt: &Node) {
        let mut names = Vec::new();
        collect_globals(stmt, &mut names);
        for name in names {
            if self.globals.insert(name.clone()) {
                self.write_indent();
                self.out.push_str("global ");
                self.out.push_str(&name);
                self.out.push('\n');
            }
        }
    }

    /// Docstring line for a function or class body.
    fn docstring(&mut self, doc: &str) {
        self.write_indent();
        self.out.push_str(&string_repr(doc));
        self.out.push('\n');
    }
}

fn collect_globals(node: &Node, names: &mut Vec<String>) {
    for child in &node.children {
        match child {
            Child::Node(inner) if !inner.is("stmt") => collect_globals(inner, names),
            Child::Token(token) if matches!(token.kind.as_str(), "STORE_GLOBAL" | "DELETE_GLOBAL") => {
                names.push(token.pattr());
            }
            _ => {}
        }
    }
}

fn expect_node<'n>(focus: Focus<'n>, template: &Template) -> Result<&'n Node> {
    match focus {
        Focus::Node(node) => Ok(node),
        Focus::Token(_) => Err(generate_error(format!(
            "template {:?} descends into a token",
            template.pattern
        ))),
    }
}

/// An operator expression that binds looser than a primary.
fn is_compound(child: &Child) -> bool {
    let Some(node) = child.as_node() else {
        return false;
    };
    if COMPOUND.contains(&node.tag.as_str()) {
        return true;
    }
    node.is("expr")
        && (node.children.iter().any(|c| COMPOUND.contains(&c.kind()))
            || node.kind_at(-1).starts_with("UNARY_"))
}

fn unquote(text: &str) -> &str {
    let quoted = text.len() >= 2
        && (text.starts_with('\'') && text.ends_with('\'')
            || text.starts_with('"') && text.ends_with('"'));
    if quoted { &text[1..text.len() - 1] } else { text }
}

impl Walker<'_> {
    /// Generate a whole scope tree (`code[stmts]`) for a `kind` body.
    pub(crate) fn scope_body(mut self, tree: &Node, doc: Option<&str>, kind: ScopeKind) -> Result<String> {
        if let Some(doc) = doc {
            match kind {
                ScopeKind::Module => {
                    self.out.push_str(&string_repr(doc));
                    self.out.push('\n');
                }
                _ => self.docstring(doc),
            }
        }
        self.node(tree)?;
        if self.out.is_empty() && kind != ScopeKind::Module {
            self.write_indent();
            self.out.push_str("pass\n");
        }
        Ok(self.out)
    }
}
