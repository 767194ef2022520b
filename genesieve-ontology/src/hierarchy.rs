//! Directed acyclic term hierarchies.
//!
//! Uses arena-style storage: terms live in a flat `Vec<Term>` and are
//! referenced by `TermId` (a `usize` index). Edges point from a term to its
//! more general parents; `is_a` and `part_of` are not distinguished.

use std::collections::{HashMap, VecDeque};

use genesieve_core::{GenesieveError, Result, Summarizable};

/// Index into the hierarchy's term arena.
pub type TermId = usize;

/// A single node of the hierarchy.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Term {
    /// Index of this term in the arena.
    pub id: TermId,
    /// Term identifier as it appears in the source (e.g. `GO:0008150`).
    pub name: String,
    /// More general terms.
    pub parents: Vec<TermId>,
    /// More specific terms.
    pub children: Vec<TermId>,
}

impl Term {
    /// True if this term has no parents.
    pub fn is_root(&self) -> bool {
        self.parents.is_empty()
    }

    /// True if this term has no children.
    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }
}

/// A term hierarchy stored as an arena of terms.
///
/// Construction never fails; acyclicity is checked by [`Hierarchy::toposort`]
/// and everything that depends on it.
#[derive(Debug, Clone, Default)]
pub struct Hierarchy {
    terms: Vec<Term>,
    index: HashMap<String, TermId>,
}

impl Hierarchy {
    /// Build a hierarchy from `(term, parents)` declarations.
    ///
    /// Declared terms are numbered first, in declaration order. Terms that
    /// only ever appear as a parent are appended afterwards in the order they
    /// are first referenced. A term declared twice accumulates the parents of
    /// both declarations; repeated edges are stored once.
    pub fn build<I, S, P>(term_parents: I) -> Self
    where
        I: IntoIterator<Item = (S, P)>,
        S: Into<String>,
        P: IntoIterator,
        P::Item: Into<String>,
    {
        let declarations: Vec<(String, Vec<String>)> = term_parents
            .into_iter()
            .map(|(term, parents)| (term.into(), parents.into_iter().map(Into::into).collect()))
            .collect();

        let mut hierarchy = Self::default();
        for (term, _) in &declarations {
            hierarchy.intern(term);
        }
        for (term, parents) in &declarations {
            let child = hierarchy.index[term.as_str()];
            for parent in parents {
                let parent = hierarchy.intern(parent);
                hierarchy.add_edge(child, parent);
            }
        }
        hierarchy
    }

    fn intern(&mut self, name: &str) -> TermId {
        if let Some(&id) = self.index.get(name) {
            return id;
        }
        let id = self.terms.len();
        self.terms.push(Term {
            id,
            name: name.to_string(),
            parents: Vec::new(),
            children: Vec::new(),
        });
        self.index.insert(name.to_string(), id);
        id
    }

    fn add_edge(&mut self, child: TermId, parent: TermId) {
        if self.terms[child].parents.contains(&parent) {
            return;
        }
        self.terms[child].parents.push(parent);
        self.terms[parent].children.push(child);
    }

    /// Number of terms, including implicitly declared parents.
    pub fn len(&self) -> usize {
        self.terms.len()
    }

    /// True if the hierarchy has no terms.
    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    /// Total number of parent edges.
    pub fn edge_count(&self) -> usize {
        self.terms.iter().map(|t| t.parents.len()).sum()
    }

    /// Look up a term by name.
    pub fn term_id(&self, name: &str) -> Option<TermId> {
        self.index.get(name).copied()
    }

    /// Name of term `id`.
    ///
    /// # Panics
    ///
    /// Panics if `id` is out of range.
    pub fn term_name(&self, id: TermId) -> &str {
        &self.terms[id].name
    }

    /// Get a reference to a term by id.
    pub fn term(&self, id: TermId) -> Option<&Term> {
        self.terms.get(id)
    }

    /// All terms in id order.
    pub fn terms(&self) -> &[Term] {
        &self.terms
    }

    /// Parents of term `id`.
    pub fn parents(&self, id: TermId) -> &[TermId] {
        &self.terms[id].parents
    }

    /// Children of term `id`.
    pub fn children(&self, id: TermId) -> &[TermId] {
        &self.terms[id].children
    }

    /// Topologically sort the terms so that every parent precedes its children.
    ///
    /// Kahn's algorithm with the parent count as in-degree.
    ///
    /// # Errors
    ///
    /// Returns [`GenesieveError::CyclicGraph`] if any term remains unsorted
    /// once the queue drains.
    pub fn toposort(&self) -> Result<Vec<TermId>> {
        let n = self.terms.len();
        let mut n_parents: Vec<usize> = self.terms.iter().map(|t| t.parents.len()).collect();
        let mut queue: VecDeque<TermId> = (0..n).filter(|&t| n_parents[t] == 0).collect();
        let mut order = Vec::with_capacity(n);

        while let Some(term) = queue.pop_front() {
            order.push(term);
            for &child in &self.terms[term].children {
                n_parents[child] -= 1;
                if n_parents[child] == 0 {
                    queue.push_back(child);
                }
            }
        }

        if order.len() < n {
            return Err(GenesieveError::CyclicGraph {
                unsorted: n - order.len(),
            });
        }
        Ok(order)
    }

    /// Reflexive-transitive ancestor closure of every term.
    ///
    /// `closure[t]` is sorted and contains `t` and all of its ancestors.
    pub fn transitive_closure(&self) -> Result<Vec<Vec<TermId>>> {
        let order = self.toposort()?;
        Ok(self.closure_in_order(&order))
    }

    /// Closure computation over a precomputed topological order.
    pub(crate) fn closure_in_order(&self, order: &[TermId]) -> Vec<Vec<TermId>> {
        let mut closure: Vec<Vec<TermId>> = vec![Vec::new(); self.terms.len()];
        for &term in order {
            let mut ancestors = vec![term];
            for &parent in &self.terms[term].parents {
                ancestors.extend_from_slice(&closure[parent]);
            }
            ancestors.sort_unstable();
            ancestors.dedup();
            closure[term] = ancestors;
        }
        closure
    }

    /// Serialize back to `(term, parents)` declarations, one per term in id order.
    pub fn to_term_parents(&self) -> Vec<(String, Vec<String>)> {
        self.terms
            .iter()
            .map(|t| {
                let parents = t.parents.iter().map(|&p| self.terms[p].name.clone()).collect();
                (t.name.clone(), parents)
            })
            .collect()
    }
}

impl Summarizable for Hierarchy {
    fn summary(&self) -> String {
        format!(
            "Hierarchy: {} terms, {} parent edges",
            self.len(),
            self.edge_count()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn animals() -> Hierarchy {
        Hierarchy::build(vec![
            ("arachnid", vec!["animal"]),
            ("mammal", vec!["animal"]),
            ("spider", vec!["arachnid"]),
            ("primate", vec!["mammal"]),
            ("man", vec!["primate"]),
            ("spiderman", vec!["spider", "man"]),
            ("kingkong", vec!["primate"]),
        ])
    }

    #[test]
    fn implicit_parents_are_appended() {
        let h = animals();
        assert_eq!(h.len(), 8);
        assert_eq!(h.term_name(7), "animal");
        assert!(h.term(7).unwrap().is_root());
        assert_eq!(h.children(7), &[0, 1]);
    }

    #[test]
    fn round_trips_full_declarations() {
        let decls = animals().to_term_parents();
        assert_eq!(decls.last().unwrap(), &("animal".to_string(), vec![]));
        let rebuilt = Hierarchy::build(decls.clone());
        assert_eq!(rebuilt.to_term_parents(), decls);
    }

    #[test]
    fn duplicate_edges_collapse() {
        let h = Hierarchy::build(vec![("b", vec!["a", "a"]), ("b", vec!["a", "c"])]);
        let b = h.term_id("b").unwrap();
        assert_eq!(h.parents(b).len(), 2);
        assert_eq!(h.children(h.term_id("a").unwrap()), &[b]);
    }

    #[test]
    fn toposort_puts_parents_first() {
        let h = animals();
        let order = h.toposort().unwrap();
        assert_eq!(order.len(), h.len());
        let mut position = vec![0; h.len()];
        for (i, &t) in order.iter().enumerate() {
            position[t] = i;
        }
        for term in h.terms() {
            for &p in &term.parents {
                assert!(position[p] < position[term.id], "{} before {}", term.name, h.term_name(p));
            }
        }
    }

    #[test]
    fn toposort_detects_cycle() {
        let h = Hierarchy::build(vec![("a", vec!["c"]), ("b", vec!["a"]), ("c", vec!["b"]), ("d", vec![])]);
        match h.toposort() {
            Err(GenesieveError::CyclicGraph { unsorted }) => assert_eq!(unsorted, 3),
            other => panic!("expected cycle, got {:?}", other),
        }
        assert!(h.transitive_closure().is_err());
    }

    #[test]
    fn self_loop_is_a_cycle() {
        let h = Hierarchy::build(vec![("a", vec!["a"])]);
        assert!(matches!(h.toposort(), Err(GenesieveError::CyclicGraph { unsorted: 1 })));
    }

    #[test]
    fn closure_is_reflexive_and_transitive() {
        let h = animals();
        let closure = h.transitive_closure().unwrap();
        for t in 0..h.len() {
            assert!(closure[t].contains(&t));
            for &p in &closure[t] {
                assert!(closure[p].iter().all(|a| closure[t].contains(a)));
            }
        }
        let spiderman = h.term_id("spiderman").unwrap();
        let names: Vec<&str> = closure[spiderman].iter().map(|&t| h.term_name(t)).collect();
        assert_eq!(
            names,
            vec!["arachnid", "mammal", "spider", "primate", "man", "spiderman", "animal"]
        );
    }

    #[test]
    fn small_diamond_closure() {
        let h = Hierarchy::build(vec![("A", vec![]), ("B", vec!["A"]), ("C", vec!["A"])]);
        let closure = h.transitive_closure().unwrap();
        assert_eq!(closure[0], vec![0]);
        assert_eq!(closure[1], vec![0, 1]);
        assert_eq!(closure[2], vec![0, 2]);
    }

    #[test]
    fn summary_counts_edges() {
        assert_eq!(animals().summary(), "Hierarchy: 8 terms, 8 parent edges");
    }
}
