//! FIRST-set computation directly over EBNF grammar trees (no BNF
//! flattening). See [`super::GrammarNode`] for the tree shapes.

use std::cell::RefCell;
use std::collections::{HashMap, HashSet};

use super::{Grammar, GrammarNode, EPS};

/// A memoizing FIRST-set table over one grammar. `first(name)` is stable
/// across repeated queries: the grammar never changes after construction.
pub struct FirstTable<'g> {
    grammar: &'g Grammar,
    cache: RefCell<HashMap<String, HashSet<String>>>,
}

impl<'g> FirstTable<'g> {
    pub fn new(grammar: &'g Grammar) -> Self {
        FirstTable { grammar, cache: RefCell::new(HashMap::new()) }
    }

    /// `FIRST` of a nonterminal, by name.
    pub fn of_name(&self, name: &str) -> HashSet<String> {
        if let Some(cached) = self.cache.borrow().get(name) {
            return cached.clone();
        }
        let result = if self.grammar.is_terminal(name) {
            HashSet::from([name.to_string()])
        } else {
            let tree = self
                .grammar
                .production(name)
                .unwrap_or_else(|| panic!("nonterminal '{name}' has no production (grammar invariant violated)"));
            self.of_node(tree)
        };
        self.cache.borrow_mut().insert(name.to_string(), result.clone());
        result
    }

    /// `FIRST` of an arbitrary grammar (sub)tree.
    pub fn of_node(&self, node: &GrammarNode) -> HashSet<String> {
        match node {
            GrammarNode::Leaf(name) => self.of_name(name),
            GrammarNode::Seq(children) => {
                let mut result = HashSet::new();
                let mut all_eps = true;
                for child in children {
                    let mut first = self.of_node(child);
                    let had_eps = first.remove(EPS);
                    result.extend(first);
                    if !had_eps {
                        all_eps = false;
                        break;
                    }
                }
                if all_eps {
                    result.insert(EPS.to_string());
                }
                result
            }
            GrammarNode::Alt(children) => {
                let mut result = HashSet::new();
                for child in children {
                    result.extend(self.of_node(child));
                }
                result
            }
            GrammarNode::Opt(inner) => {
                let mut result = self.of_node(inner);
                result.insert(EPS.to_string());
                result
            }
            GrammarNode::Star(inner) => {
                let mut result = self.of_node(inner);
                result.insert(EPS.to_string());
                result
            }
            GrammarNode::Plus(inner) => self.of_node(inner),
        }
    }

    /// Precompute and cache `FIRST` for every nonterminal in the grammar.
    pub fn build_all(&self) {
        let names: Vec<String> = self.grammar.productions().map(|(n, _)| n.to_string()).collect();
        for name in names {
            self.of_name(&name);
        }
    }
}
