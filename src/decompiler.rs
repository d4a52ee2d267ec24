use crate::bytecode::{self, CodeObject, Decoded};
use crate::codegen;
use crate::config::Config;
use crate::error::Result;
use crate::grammar::{AugmentedGrammar, Grammar};
use crate::lang::node::Node;
use crate::parser;
use crate::rewrite::{self, Rewritten, ScopeKind};
use tracing::debug;

/// Text generated for one function or lambda scope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScopeText {
    /// Parameter list without surrounding parentheses, e.g. `a, b=1, *rest`.
    pub signature: String,

    /// For a function, the docstring and statements indented one level
    /// below the `def`. For a lambda, the body expression.
    pub body: String,
}

/// Runs the whole pipeline on code objects.
///
/// Holds only configuration; every call builds its own grammar and tree,
/// so one `Decompiler` can serve many threads at once.
#[derive(Debug, Clone, Default)]
pub struct Decompiler {
    config: Config,
}

impl Decompiler {
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Source text for a module-level code object.
    pub fn decompile(&self, code: &CodeObject) -> Result<String> {
        debug!(code = %code.name, "decompiling module");
        codegen::scope::module(self, code)
    }

    /// Signature and body of a function or lambda, with its statements at
    /// block level `indent`.
    ///
    /// `defaults` are the already rendered default values of the trailing
    /// parameters; an empty string stands for `None`.
    pub fn function_text(
        &self,
        code: &CodeObject,
        defaults: &[String],
        indent: usize,
    ) -> Result<ScopeText> {
        codegen::scope::function(self, code, defaults, indent, 0)
    }

    /// Tokens and variant set for one code object.
    pub fn decode(&self, code: &CodeObject) -> Result<Decoded> {
        Ok(bytecode::decode(code)?)
    }

    /// The rewritten tree of a module-level code object.
    pub fn syntax_tree(&self, code: &CodeObject) -> Result<Node> {
        Ok(self.scope_tree(code, ScopeKind::Module, 0)?.tree)
    }

    /// Decode, parse and rewrite one scope whose root sits at `depth` in
    /// the enclosing tree.
    pub(crate) fn scope_tree(
        &self,
        code: &CodeObject,
        kind: ScopeKind,
        depth: usize,
    ) -> Result<Rewritten> {
        let decoded = self.decode(code)?;
        let grammar = AugmentedGrammar::new(Grammar::base(), &decoded.customize)?;
        let max_depth = self.config.limits.max_depth;
        let tree = parser::parse(&grammar, &decoded.tokens, depth, max_depth)?;
        Ok(rewrite::rewrite(tree, code, kind)?)
    }
}

/// Decompile a module with the default configuration.
pub fn decompile(code: &CodeObject) -> Result<String> {
    Decompiler::default().decompile(code)
}
