//! Tree extraction from a finished Earley chart.

use super::{Chart, Item, RuleId, SymbolId, Table};
use crate::error::{Error, Result};
use crate::frontend::token::Token;
use crate::lang::node::{Child, Node};
use crate::parser_error::ParseError;
use std::collections::HashMap;

/// Left-recursive list symbols, built into one flat node each.
const COLLECT: &[&str] = &[
    "stmts",
    "exprlist",
    "kvlist",
    "importlist2",
    "print_to_items",
    "attr_path",
];

pub(super) struct Forest<'a> {
    table: &'a Table,
    chart: &'a Chart,
    tokens: &'a [Token],
    kinds: &'a [SymbolId],
    /// Per end position: rules completed there, keyed by `(lhs, origin)`.
    completed: Vec<HashMap<(SymbolId, usize), Vec<RuleId>>>,
    max_depth: usize,
}

impl<'a> Forest<'a> {
    pub(super) fn new(
        table: &'a Table,
        chart: &'a Chart,
        tokens: &'a [Token],
        kinds: &'a [SymbolId],
        max_depth: usize,
    ) -> Self {
        let completed = chart
            .sets
            .iter()
            .map(|set| {
                let mut done: HashMap<(SymbolId, usize), Vec<RuleId>> = HashMap::new();
                for &item in set.items.iter().filter(|&&item| table.is_complete(item)) {
                    done.entry((table.lhs[item.rule], item.origin))
                        .or_default()
                        .push(item.rule);
                }
                done
            })
            .collect();

        Self {
            table,
            chart,
            tokens,
            kinds,
            completed,
            max_depth,
        }
    }

    pub(super) fn tree(&self, depth: usize) -> Result<Node> {
        self.build(self.table.start, 0, self.tokens.len(), depth)
    }

    fn build(&self, sym: SymbolId, start: usize, end: usize, depth: usize) -> Result<Node> {
        if depth > self.max_depth {
            return Err(Error::DepthExceeded {
                limit: self.max_depth,
            });
        }

        let name = self.table.name(sym);
        let collect = COLLECT.contains(&name);
        let mut groups: Vec<Vec<Child>> = Vec::new();
        let mut end = end;

        loop {
            let rule = self.resolve(sym, start, end).ok_or_else(|| self.stuck(start))?;
            let bounds = self.split(rule, start, end).ok_or_else(|| self.stuck(start))?;
            let rhs = &self.table.rhs[rule];
            let flatten = collect && rhs.first() == Some(&sym);

            let mut group = Vec::with_capacity(rhs.len());
            for k in usize::from(flatten)..rhs.len() {
                group.push(self.child(rhs[k], bounds[k], bounds[k + 1], depth)?);
            }
            groups.push(group);

            if !flatten {
                break;
            }
            end = bounds[1];
        }

        let children = groups.into_iter().rev().flatten().collect();
        Ok(Node::new(name, children))
    }

    fn child(&self, sym: SymbolId, start: usize, end: usize, depth: usize) -> Result<Child> {
        if self.table.is_terminal(sym) {
            let token = self.tokens.get(start).ok_or_else(|| self.stuck(start))?;
            Ok(Child::Token(token.clone()))
        } else {
            self.build(sym, start, end, depth + 1).map(Child::Node)
        }
    }

    /// Pick one rule among those deriving `tokens[start..end]` from `sym`.
    ///
    /// A function or class definition wins over an assignment, then the
    /// shortest right-hand side, then the earliest declared rule.
    fn resolve(&self, sym: SymbolId, start: usize, end: usize) -> Option<RuleId> {
        let candidates = self.completed.get(end)?.get(&(sym, start))?;
        let defines = candidates
            .iter()
            .any(|&r| self.derives_only(r, "funcdef") || self.derives_only(r, "classdef"));

        candidates
            .iter()
            .copied()
            .filter(|&r| !(defines && self.derives_only(r, "assign")))
            .min_by_key(|&r| (self.table.rhs[r].len(), r))
    }

    fn derives_only(&self, rule: RuleId, name: &str) -> bool {
        matches!(self.table.rhs[rule].as_slice(), [sym] if self.table.name(*sym) == name)
    }

    /// Boundaries of each right-hand-side symbol of `rule` over
    /// `[start, end)`, found right to left.
    ///
    /// Each step keeps the invariant that the dotted prefix before the
    /// current symbol is in the chart set where that symbol begins, so a
    /// split always exists for a completed item. The rightmost symbols take
    /// the shortest span that works.
    fn split(&self, rule: RuleId, start: usize, end: usize) -> Option<Vec<usize>> {
        let rhs = &self.table.rhs[rule];
        let mut bounds = vec![start; rhs.len() + 1];
        let mut right = end;

        for (dot, &sym) in rhs.iter().enumerate().rev() {
            let prefix = Item {
                rule,
                dot,
                origin: start,
            };
            let left = if self.table.is_terminal(sym) {
                let m = right.checked_sub(1).filter(|&m| m >= start)?;
                (self.kinds[m] == sym && self.chart.sets[m].seen.contains(&prefix)).then_some(m)?
            } else {
                let done = &self.completed[right];
                (start..=right)
                    .rev()
                    .find(|&m| done.contains_key(&(sym, m)) && self.chart.sets[m].seen.contains(&prefix))?
            };
            bounds[dot + 1] = right;
            bounds[dot] = left;
            right = left;
        }

        (right == start).then_some(bounds)
    }

    fn stuck(&self, position: usize) -> Error {
        Error::Parse(ParseError::new(position, self.tokens))
    }
}
