//! Binding of terms and genes to Bernoulli parameters.

use std::collections::HashMap;

use genesieve_ontology::{AssociationIndex, GeneId, TermId};

use crate::counts::BernoulliCounts;

/// Index of a Bernoulli parameter.
pub type ParamId = usize;

/// Name of the shared "term is active" parameter.
pub const TERM_PRIOR: &str = "t";
/// Name of the shared "observed but not explained" parameter.
pub const FALSE_POS: &str = "fp";
/// Name of the shared "explained but not observed" parameter.
pub const FALSE_NEG: &str = "fn";

/// Maps every term and gene of an [`AssociationIndex`] to the Bernoulli
/// parameters governing it.
///
/// Parameter ids are assigned in first-registration order: all term-prior
/// names (by term id), then false-positive names, then false-negative names
/// (both by gene id).
#[derive(Debug, Clone)]
pub struct ParameterMap {
    names: Vec<String>,
    index: HashMap<String, ParamId>,
    term_prior: Vec<ParamId>,
    false_pos: Vec<ParamId>,
    false_neg: Vec<ParamId>,
}

impl ParameterMap {
    /// One parameter of each kind, shared by all terms and genes.
    pub fn new(assocs: &AssociationIndex) -> Self {
        Self::with_naming(
            assocs,
            |_| TERM_PRIOR.to_string(),
            |_| FALSE_POS.to_string(),
            |_| FALSE_NEG.to_string(),
        )
    }

    /// Custom parameter names per term and per gene.
    ///
    /// Each closure receives the term or gene name and returns the name of
    /// the parameter to bind it to; equal names share a parameter.
    pub fn with_naming<T, P, N>(
        assocs: &AssociationIndex,
        mut term_prior: T,
        mut false_pos: P,
        mut false_neg: N,
    ) -> Self
    where
        T: FnMut(&str) -> String,
        P: FnMut(&str) -> String,
        N: FnMut(&str) -> String,
    {
        let mut map = Self {
            names: Vec::new(),
            index: HashMap::new(),
            term_prior: Vec::with_capacity(assocs.terms()),
            false_pos: Vec::with_capacity(assocs.genes()),
            false_neg: Vec::with_capacity(assocs.genes()),
        };
        let hierarchy = assocs.hierarchy();
        for t in 0..assocs.terms() {
            let id = map.register(term_prior(hierarchy.term_name(t)));
            map.term_prior.push(id);
        }
        for g in 0..assocs.genes() {
            let id = map.register(false_pos(assocs.gene_name(g)));
            map.false_pos.push(id);
        }
        for g in 0..assocs.genes() {
            let id = map.register(false_neg(assocs.gene_name(g)));
            map.false_neg.push(id);
        }
        map
    }

    /// Register `name`, returning its existing id if already known.
    fn register(&mut self, name: impl Into<String>) -> ParamId {
        let name = name.into();
        if let Some(&id) = self.index.get(&name) {
            return id;
        }
        let id = self.names.len();
        self.index.insert(name.clone(), id);
        self.names.push(name);
        id
    }

    pub fn id(&self, name: &str) -> Option<ParamId> {
        self.index.get(name).copied()
    }

    pub fn name(&self, id: ParamId) -> &str {
        &self.names[id]
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Number of distinct parameters.
    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn term_prior(&self, term: TermId) -> ParamId {
        self.term_prior[term]
    }

    pub fn false_pos(&self, gene: GeneId) -> ParamId {
        self.false_pos[gene]
    }

    pub fn false_neg(&self, gene: GeneId) -> ParamId {
        self.false_neg[gene]
    }

    /// Empty counts sized for this map.
    pub fn new_counts(&self) -> BernoulliCounts {
        BernoulliCounts::zeros(self.len())
    }
}

/// Prior pseudo-counts by role, on top of the implicit Beta(1,1).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PriorPseudocounts {
    pub active_terms: f64,
    pub absent_terms: f64,
    pub false_positives: f64,
    pub true_negatives: f64,
    pub false_negatives: f64,
    pub true_positives: f64,
}

impl PriorPseudocounts {
    /// One pseudo-observation of each error; failures sized to the index.
    ///
    /// Absent terms default to the number of relevant terms, true negatives
    /// and true positives to the number of genes.
    pub fn for_index(assocs: &AssociationIndex) -> Self {
        let terms = assocs.relevant_terms().len() as f64;
        let genes = assocs.genes() as f64;
        Self {
            active_terms: 1.0,
            absent_terms: terms,
            false_positives: 1.0,
            true_negatives: genes,
            false_negatives: 1.0,
            true_positives: genes,
        }
    }

    /// Prior counts over `params`, every parameter taking the pseudo-counts of its role.
    pub fn to_counts(&self, params: &ParameterMap) -> BernoulliCounts {
        let mut counts = params.new_counts();
        for &p in &params.term_prior {
            counts.set(p, self.active_terms, self.absent_terms);
        }
        for &p in &params.false_pos {
            counts.set(p, self.false_positives, self.true_negatives);
        }
        for &p in &params.false_neg {
            counts.set(p, self.false_negatives, self.true_positives);
        }
        counts
    }
}
