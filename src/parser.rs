use crate::error::Result;
use crate::frontend::token::Token;
use crate::grammar::AugmentedGrammar;
use crate::lang::node::Node;
use crate::parser_error::ParseError;
use std::collections::{HashMap, HashSet};
use tracing::{debug, error};

mod forest;

type SymbolId = u32;
type RuleId = usize;

/// Token kinds the grammar never mentions map here and match nothing.
const UNKNOWN: SymbolId = SymbolId::MAX;

/// Parse a decoded token stream into a syntax tree rooted at `code`.
///
/// Recognition is Earley over the augmented grammar; the tree is then read
/// back out of the chart with a deterministic resolver. The root sits at
/// `depth`, which is non-zero for a scope nested inside another tree, and
/// no node may sit deeper than `max_depth`.
pub fn parse(
    grammar: &AugmentedGrammar,
    tokens: &[Token],
    depth: usize,
    max_depth: usize,
) -> Result<Node> {
    let table = Table::new(grammar);
    let kinds: Vec<SymbolId> = tokens.iter().map(|t| table.symbol(&t.kind)).collect();

    let chart = recognize(&table, &kinds).map_err(|position| {
        let err = ParseError::new(position, tokens);
        error!("{}\n{}", err, err.listing());
        err
    })?;
    debug!(
        tokens = tokens.len(),
        items = chart.sets.iter().map(|s| s.items.len()).sum::<usize>(),
        "recognized"
    );

    forest::Forest::new(&table, &chart, tokens, &kinds, max_depth).tree(depth)
}

// =============================================================================
// Compiled grammar
// =============================================================================

/// The grammar with every symbol interned to an integer.
///
/// Terminals are the symbols with no rules of their own.
struct Table {
    names: Vec<String>,
    ids: HashMap<String, SymbolId>,
    lhs: Vec<SymbolId>,
    rhs: Vec<Vec<SymbolId>>,
    by_lhs: Vec<Vec<RuleId>>,
    nullable: Vec<bool>,
    start: SymbolId,
}

impl Table {
    fn new(grammar: &AugmentedGrammar) -> Self {
        let mut table = Table {
            names: Vec::new(),
            ids: HashMap::new(),
            lhs: Vec::new(),
            rhs: Vec::new(),
            by_lhs: Vec::new(),
            nullable: Vec::new(),
            start: 0,
        };
        table.start = table.intern(grammar.start());

        for rule in grammar.rules() {
            let lhs = table.intern(&rule.lhs);
            let rhs = rule.rhs.iter().map(|s| table.intern(s)).collect();
            table.lhs.push(lhs);
            table.rhs.push(rhs);
        }

        table.by_lhs = vec![Vec::new(); table.names.len()];
        for (rule, &lhs) in table.lhs.iter().enumerate() {
            table.by_lhs[lhs as usize].push(rule);
        }

        table.nullable = vec![false; table.names.len()];
        let mut changed = true;
        while changed {
            changed = false;
            for rule in 0..table.lhs.len() {
                let lhs = table.lhs[rule] as usize;
                if !table.nullable[lhs]
                    && table.rhs[rule].iter().all(|&s| table.nullable[s as usize])
                {
                    table.nullable[lhs] = true;
                    changed = true;
                }
            }
        }

        table
    }

    fn intern(&mut self, name: &str) -> SymbolId {
        if let Some(&id) = self.ids.get(name) {
            return id;
        }
        let id = self.names.len() as SymbolId;
        self.names.push(name.to_string());
        self.ids.insert(name.to_string(), id);
        id
    }

    fn symbol(&self, name: &str) -> SymbolId {
        self.ids.get(name).copied().unwrap_or(UNKNOWN)
    }

    fn name(&self, sym: SymbolId) -> &str {
        self.names.get(sym as usize).map(String::as_str).unwrap_or("")
    }

    fn is_terminal(&self, sym: SymbolId) -> bool {
        self.by_lhs
            .get(sym as usize)
            .is_none_or(|rules| rules.is_empty())
    }

    fn next_symbol(&self, item: Item) -> Option<SymbolId> {
        self.rhs[item.rule].get(item.dot).copied()
    }

    fn is_complete(&self, item: Item) -> bool {
        item.dot == self.rhs[item.rule].len()
    }
}

// =============================================================================
// Recognizer
// =============================================================================

/// A dotted rule with the set it started in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct Item {
    rule: RuleId,
    dot: usize,
    origin: usize,
}

impl Item {
    fn advance(self) -> Self {
        Item {
            dot: self.dot + 1,
            ..self
        }
    }
}

#[derive(Debug, Default)]
struct ItemSet {
    items: Vec<Item>,
    seen: HashSet<Item>,
    /// Items in this set whose next symbol is the key.
    waiting: HashMap<SymbolId, Vec<Item>>,
    predicted: HashSet<SymbolId>,
}

impl ItemSet {
    fn add(&mut self, item: Item) {
        if self.seen.insert(item) {
            self.items.push(item);
        }
    }
}

struct Chart {
    sets: Vec<ItemSet>,
}

/// Build the Earley chart, or return the index of the token that could not
/// be shifted (`kinds.len()` when the input ended early).
///
/// Nullable nonterminals are advanced over at prediction time, so a
/// completion in the current set never misses a later waiting item.
fn recognize(table: &Table, kinds: &[SymbolId]) -> std::result::Result<Chart, usize> {
    let n = kinds.len();
    let mut sets: Vec<ItemSet> = (0..=n).map(|_| ItemSet::default()).collect();

    sets[0].predicted.insert(table.start);
    for &rule in &table.by_lhs[table.start as usize] {
        sets[0].add(Item {
            rule,
            dot: 0,
            origin: 0,
        });
    }

    for i in 0..=n {
        let mut k = 0;
        while k < sets[i].items.len() {
            let item = sets[i].items[k];
            k += 1;

            match table.next_symbol(item) {
                None => {
                    let lhs = table.lhs[item.rule];
                    let parents = sets[item.origin]
                        .waiting
                        .get(&lhs)
                        .cloned()
                        .unwrap_or_default();
                    for parent in parents {
                        sets[i].add(parent.advance());
                    }
                }
                Some(sym) if table.is_terminal(sym) => {
                    if i < n && kinds[i] == sym {
                        sets[i + 1].add(item.advance());
                    }
                }
                Some(sym) => {
                    let set = &mut sets[i];
                    set.waiting.entry(sym).or_default().push(item);
                    if set.predicted.insert(sym) {
                        for &rule in &table.by_lhs[sym as usize] {
                            set.add(Item {
                                rule,
                                dot: 0,
                                origin: i,
                            });
                        }
                    }
                    if table.nullable[sym as usize] {
                        set.add(item.advance());
                    }
                }
            }
        }

        if i < n && sets[i + 1].items.is_empty() {
            return Err(i);
        }
    }

    let accepted = sets[n].items.iter().any(|&item| {
        item.origin == 0 && table.lhs[item.rule] == table.start && table.is_complete(item)
    });
    if !accepted {
        return Err(n);
    }
    Ok(Chart { sets })
}
