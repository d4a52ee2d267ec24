//! Context-free grammar over decoded instruction tokens.

pub mod rules;
pub mod synth;

use crate::bytecode::decode_error::DecodeError;
use crate::bytecode::op::Variant;
use once_cell::sync::Lazy;
use std::collections::{BTreeSet, HashSet};
use std::fmt;
use tracing::debug;

/// Start symbol of every scope.
pub const START: &str = "code";

static BASE: Lazy<Grammar> = Lazy::new(|| Grammar::parse(rules::GRAMMAR));

/// A single production `lhs ::= rhs...`. An empty `rhs` derives nothing.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Rule {
    pub lhs: String,
    pub rhs: Vec<String>,
}

impl Rule {
    pub fn new<I, S>(lhs: &str, rhs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            lhs: lhs.to_string(),
            rhs: rhs.into_iter().map(Into::into).collect(),
        }
    }
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ::=", self.lhs)?;
        for symbol in &self.rhs {
            write!(f, " {}", symbol)?;
        }
        Ok(())
    }
}

/// An ordered rule list. Declaration order is the final tie-break
/// between competing derivations.
#[derive(Debug, Clone, Default)]
pub struct Grammar {
    rules: Vec<Rule>,
}

impl Grammar {
    /// Read rules from `lhs ::= rhs` text.
    ///
    /// Blank lines and `#` comments are skipped. Text before the first
    /// `::=` has no rule to continue and is ignored.
    pub fn parse(text: &str) -> Self {
        let mut rules: Vec<Rule> = Vec::new();

        for line in text.lines() {
            let line = line.split('#').next().unwrap_or("").trim();
            if line.is_empty() {
                continue;
            }
            match line.split_once("::=") {
                Some((lhs, rhs)) => rules.push(Rule::new(lhs.trim(), rhs.split_whitespace())),
                None => {
                    if let Some(rule) = rules.last_mut() {
                        rule.rhs.extend(line.split_whitespace().map(str::to_string));
                    }
                }
            }
        }

        Self { rules }
    }

    /// The static grammar, parsed once per process.
    pub fn base() -> &'static Grammar {
        &BASE
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }
}

/// The base grammar plus the rules synthesized for one code object.
///
/// Built fresh for every scope; nothing is shared between invocations.
#[derive(Debug, Clone)]
pub struct AugmentedGrammar {
    rules: Vec<Rule>,
}

impl AugmentedGrammar {
    pub fn new(base: &Grammar, customize: &BTreeSet<Variant>) -> Result<Self, DecodeError> {
        let mut seen: HashSet<Rule> = HashSet::new();
        let mut rules = Vec::with_capacity(base.rules.len() + customize.len());

        let synthesized = customize
            .iter()
            .map(|&variant| synth::synthesize(variant))
            .collect::<Result<Vec<_>, _>>()?;

        for rule in base.rules.iter().cloned().chain(synthesized.into_iter().flatten()) {
            if seen.insert(rule.clone()) {
                rules.push(rule);
            }
        }

        debug!(
            base = base.rules.len(),
            total = rules.len(),
            variants = customize.len(),
            "augmented grammar"
        );
        Ok(Self { rules })
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    pub fn start(&self) -> &str {
        START
    }
}
