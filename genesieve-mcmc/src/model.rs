//! Latent term-activation model for a single query gene set.
//!
//! Each relevant term is either active or inactive. A gene is predicted
//! present when at least one active term annotates it; a gene whose
//! prediction disagrees with its observed membership in the query set is
//! *mismatched*, counting as a false positive (observed, unexplained) or a
//! false negative (explained, unobserved).
//!
//! The model never holds the Bernoulli parameters themselves. It reports
//! sufficient statistics ([`BernoulliCounts`]) and their changes, which the
//! collapsed sampler scores against pooled counts shared by all models.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;

use genesieve_core::{GenesieveError, Result};
use genesieve_ontology::{AssociationIndex, GeneId, TermId};
use rand::Rng;

use crate::counts::BernoulliCounts;
use crate::params::ParameterMap;

/// Target states for a set of terms.
pub type TermStateAssignment = BTreeMap<TermId, bool>;

/// Kind of Metropolis-Hastings move.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub enum MoveKind {
    /// Toggle one relevant term.
    Flip,
    /// Move activation from an active term to an inactive neighbor.
    Step,
    /// Redraw every relevant term's state.
    Randomize,
}

impl MoveKind {
    pub const ALL: [MoveKind; 3] = [MoveKind::Flip, MoveKind::Step, MoveKind::Randomize];

    pub fn as_str(&self) -> &'static str {
        match self {
            MoveKind::Flip => "flip",
            MoveKind::Step => "step",
            MoveKind::Randomize => "randomize",
        }
    }
}

impl fmt::Display for MoveKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A proposed change of term states.
#[derive(Debug, Clone, PartialEq)]
pub enum Proposal {
    Flip {
        term: TermId,
        state: bool,
    },
    /// Deactivate `from` and activate `to`.
    Step {
        from: TermId,
        to: TermId,
        /// `|neighbors(from)| / |neighbors(to)|`
        hastings_ratio: f64,
    },
    Randomize {
        states: TermStateAssignment,
    },
    /// Nothing to propose; accepted without evaluation.
    Null,
}

impl Proposal {
    pub fn assignment(&self) -> TermStateAssignment {
        match self {
            Proposal::Flip { term, state } => BTreeMap::from([(*term, *state)]),
            Proposal::Step { from, to, .. } => BTreeMap::from([(*from, false), (*to, true)]),
            Proposal::Randomize { states } => states.clone(),
            Proposal::Null => BTreeMap::new(),
        }
    }

    /// Proposal-density correction for detailed balance.
    pub fn hastings_ratio(&self) -> f64 {
        match self {
            Proposal::Step { hastings_ratio, .. } => *hastings_ratio,
            _ => 1.0,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Proposal::Null)
    }
}

/// Result of evaluating a proposal.
#[derive(Debug, Clone, PartialEq)]
pub struct MoveOutcome {
    /// Change in sufficient statistics the proposal causes.
    pub delta: BernoulliCounts,
    pub log_likelihood_ratio: f64,
    /// Proposal correction times the likelihood ratio.
    pub hastings_ratio: f64,
    pub accepted: bool,
}

/// Activation state of the terms relevant to one query gene set.
#[derive(Debug, Clone)]
pub struct ActivationModel<'a> {
    assocs: &'a AssociationIndex,
    params: &'a ParameterMap,
    gene_set: Vec<GeneId>,
    in_gene_set: Vec<bool>,
    relevant_terms: Vec<TermId>,
    is_relevant: Vec<bool>,
    relevant_neighbors: Vec<Vec<TermId>>,
    term_state: Vec<bool>,
    active_terms: BTreeSet<TermId>,
    coverage: Vec<usize>,
    mismatched: BTreeSet<GeneId>,
}

impl<'a> ActivationModel<'a> {
    /// Build a model for the named query genes, all terms inactive.
    ///
    /// # Errors
    ///
    /// Returns [`GenesieveError::UnknownQueryGenes`] if any name is not in
    /// the association index.
    pub fn new<S: AsRef<str>>(
        assocs: &'a AssociationIndex,
        params: &'a ParameterMap,
        gene_names: &[S],
    ) -> Result<Self> {
        let genes = assocs.resolve_gene_names(gene_names)?;
        Self::from_genes(assocs, params, &genes)
    }

    /// Build a model for already resolved query genes.
    pub fn from_genes(
        assocs: &'a AssociationIndex,
        params: &'a ParameterMap,
        genes: &[GeneId],
    ) -> Result<Self> {
        let n_genes = assocs.genes();
        let n_terms = assocs.terms();
        if let Some(&g) = genes.iter().find(|&&g| g >= n_genes) {
            return Err(GenesieveError::InvalidInput(format!(
                "gene index {} out of range ({} genes)",
                g, n_genes
            )));
        }

        let mut in_gene_set = vec![false; n_genes];
        let mut gene_set = Vec::with_capacity(genes.len());
        let mut relevant = BTreeSet::new();
        for &g in genes {
            if !in_gene_set[g] {
                in_gene_set[g] = true;
                gene_set.push(g);
                relevant.extend(assocs.terms_by_gene(g).iter().copied());
            }
        }
        let relevant_terms: Vec<TermId> = relevant.into_iter().collect();

        let mut is_relevant = vec![false; n_terms];
        for &t in &relevant_terms {
            is_relevant[t] = true;
        }

        let hierarchy = assocs.hierarchy();
        let mut relevant_neighbors = vec![Vec::new(); n_terms];
        for &t in &relevant_terms {
            let mut neighbors: Vec<TermId> = hierarchy
                .parents(t)
                .iter()
                .chain(hierarchy.children(t))
                .copied()
                .filter(|&n| is_relevant[n])
                .collect();
            neighbors.sort_unstable();
            neighbors.dedup();
            relevant_neighbors[t] = neighbors;
        }

        // nothing is active yet, so every query gene is unexplained
        let mismatched = gene_set.iter().copied().collect();

        Ok(Self {
            assocs,
            params,
            gene_set,
            in_gene_set,
            relevant_terms,
            is_relevant,
            relevant_neighbors,
            term_state: vec![false; n_terms],
            active_terms: BTreeSet::new(),
            coverage: vec![0; n_genes],
            mismatched,
        })
    }

    pub fn assocs(&self) -> &'a AssociationIndex {
        self.assocs
    }

    /// Query genes in first-seen order.
    pub fn gene_set(&self) -> &[GeneId] {
        &self.gene_set
    }

    pub fn in_gene_set(&self, gene: GeneId) -> bool {
        self.in_gene_set[gene]
    }

    /// Sorted terms annotating at least one query gene.
    pub fn relevant_terms(&self) -> &[TermId] {
        &self.relevant_terms
    }

    pub fn is_relevant(&self, term: TermId) -> bool {
        self.is_relevant[term]
    }

    /// Sorted relevant parents and children of `term`.
    pub fn relevant_neighbors(&self, term: TermId) -> &[TermId] {
        &self.relevant_neighbors[term]
    }

    pub fn term_state(&self, term: TermId) -> bool {
        self.term_state[term]
    }

    pub fn active_terms(&self) -> &BTreeSet<TermId> {
        &self.active_terms
    }

    /// Number of active terms annotating `gene`.
    pub fn coverage(&self, gene: GeneId) -> usize {
        self.coverage[gene]
    }

    /// Genes whose predicted presence disagrees with the query set.
    pub fn mismatched_genes(&self) -> &BTreeSet<GeneId> {
        &self.mismatched
    }

    fn check_relevant(&self, term: TermId) -> Result<()> {
        if term < self.is_relevant.len() && self.is_relevant[term] {
            Ok(())
        } else {
            Err(GenesieveError::InvalidInput(format!(
                "term {} is not relevant to this gene set",
                term
            )))
        }
    }

    fn is_false(&self, gene: GeneId, active: bool) -> bool {
        active != self.in_gene_set[gene]
    }

    /// Set one term's state, updating coverage and mismatches of the genes it annotates.
    pub fn set_term_state(&mut self, term: TermId, state: bool) -> Result<()> {
        self.check_relevant(term)?;
        if self.term_state[term] == state {
            return Ok(());
        }
        for &g in self.assocs.genes_by_term(term) {
            if state {
                self.coverage[g] += 1;
            } else {
                self.coverage[g] -= 1;
            }
            if self.is_false(g, self.coverage[g] > 0) {
                self.mismatched.insert(g);
            } else {
                self.mismatched.remove(&g);
            }
        }
        if state {
            self.active_terms.insert(term);
        } else {
            self.active_terms.remove(&term);
        }
        self.term_state[term] = state;
        Ok(())
    }

    pub fn set_term_states(&mut self, assignment: &TermStateAssignment) -> Result<()> {
        for (&term, &state) in assignment {
            self.set_term_state(term, state)?;
        }
        Ok(())
    }

    /// The assignment that undoes `assignment` from the current state.
    ///
    /// Terms that `assignment` would leave unchanged are omitted.
    pub fn invert(&self, assignment: &TermStateAssignment) -> TermStateAssignment {
        assignment
            .iter()
            .filter(|&(&t, &state)| self.term_state[t] != state)
            .map(|(&t, _)| (t, self.term_state[t]))
            .collect()
    }

    fn count_term(&self, counts: &mut BernoulliCounts, inc: f64, term: TermId, state: bool) {
        counts.add(self.params.term_prior(term), state, inc);
    }

    //  active  in set  parameter  outcome
    //  no      no      fp         fail
    //  no      yes     fp         succ
    //  yes     no      fn         succ
    //  yes     yes     fn         fail
    fn count_obs(&self, counts: &mut BernoulliCounts, inc: f64, active: bool, gene: GeneId) {
        let param = if active {
            self.params.false_neg(gene)
        } else {
            self.params.false_pos(gene)
        };
        counts.add(param, self.is_false(gene, active), inc);
    }

    /// Sufficient statistics of the current state, computed from scratch.
    pub fn get_counts(&self) -> BernoulliCounts {
        let mut counts = self.params.new_counts();
        for &t in &self.relevant_terms {
            self.count_term(&mut counts, 1.0, t, self.term_state[t]);
        }
        for g in 0..self.coverage.len() {
            self.count_obs(&mut counts, 1.0, self.coverage[g] > 0, g);
        }
        counts
    }

    /// Change in sufficient statistics that applying `assignment` would cause.
    ///
    /// Does not modify the model.
    pub fn get_count_delta(&self, assignment: &TermStateAssignment) -> Result<BernoulliCounts> {
        let mut delta = self.params.new_counts();
        let mut coverage: HashMap<GeneId, usize> = HashMap::new();
        for (&term, &state) in assignment {
            self.check_relevant(term)?;
            let current = self.term_state[term];
            if current == state {
                continue;
            }
            self.count_term(&mut delta, -1.0, term, current);
            self.count_term(&mut delta, 1.0, term, state);
            for &g in self.assocs.genes_by_term(term) {
                let old = *coverage.get(&g).unwrap_or(&self.coverage[g]);
                let new = if state { old + 1 } else { old - 1 };
                coverage.insert(g, new);
                if (old > 0) != (new > 0) {
                    self.count_obs(&mut delta, -1.0, old > 0, g);
                    self.count_obs(&mut delta, 1.0, new > 0, g);
                }
            }
        }
        Ok(delta)
    }

    /// Propose a move of the given kind.
    pub fn propose<R: Rng + ?Sized>(&self, kind: MoveKind, rng: &mut R) -> Proposal {
        match kind {
            MoveKind::Flip => self.propose_flip(rng),
            MoveKind::Step => self.propose_step(rng),
            MoveKind::Randomize => self.propose_randomize(rng),
        }
    }

    /// Toggle a uniformly chosen relevant term.
    pub fn propose_flip<R: Rng + ?Sized>(&self, rng: &mut R) -> Proposal {
        if self.relevant_terms.is_empty() {
            return Proposal::Null;
        }
        let term = self.relevant_terms[rng.gen_range(0..self.relevant_terms.len())];
        Proposal::Flip {
            term,
            state: !self.term_state[term],
        }
    }

    /// Move activation from a uniformly chosen active term to one of its neighbors.
    ///
    /// Null when nothing is active, the chosen term has no relevant neighbors,
    /// or the chosen neighbor is already active.
    pub fn propose_step<R: Rng + ?Sized>(&self, rng: &mut R) -> Proposal {
        if self.active_terms.is_empty() {
            return Proposal::Null;
        }
        let pick = rng.gen_range(0..self.active_terms.len());
        let Some(&from) = self.active_terms.iter().nth(pick) else {
            return Proposal::Null;
        };
        let neighbors = &self.relevant_neighbors[from];
        if neighbors.is_empty() {
            return Proposal::Null;
        }
        let to = neighbors[rng.gen_range(0..neighbors.len())];
        if self.term_state[to] {
            return Proposal::Null;
        }
        Proposal::Step {
            from,
            to,
            hastings_ratio: neighbors.len() as f64 / self.relevant_neighbors[to].len() as f64,
        }
    }

    /// Redraw every relevant term's state with probability 1/2.
    pub fn propose_randomize<R: Rng + ?Sized>(&self, rng: &mut R) -> Proposal {
        let states = self
            .relevant_terms
            .iter()
            .map(|&t| (t, rng.gen_bool(0.5)))
            .collect();
        Proposal::Randomize { states }
    }

    /// Metropolis-Hastings accept/reject of `proposal` against pooled counts.
    ///
    /// The likelihood ratio is evaluated with `pooled` (prior plus the
    /// counts of every model) as the effective prior. On acceptance the
    /// state is updated and the delta is added into `pooled`. A null
    /// proposal is accepted without drawing a random number.
    pub fn sample_move_collapsed<R: Rng + ?Sized>(
        &mut self,
        proposal: &Proposal,
        pooled: &mut BernoulliCounts,
        rng: &mut R,
    ) -> Result<MoveOutcome> {
        if proposal.is_null() {
            return Ok(MoveOutcome {
                delta: self.params.new_counts(),
                log_likelihood_ratio: 0.0,
                hastings_ratio: 1.0,
                accepted: true,
            });
        }
        let assignment = proposal.assignment();
        let delta = self.get_count_delta(&assignment)?;
        let log_likelihood_ratio = pooled.delta_log_beta_bernoulli(&delta);
        let hastings_ratio = proposal.hastings_ratio() * log_likelihood_ratio.exp();
        let accepted = hastings_ratio >= 1.0 || rng.gen::<f64>() < hastings_ratio;
        if accepted {
            self.set_term_states(&assignment)?;
            *pooled += &delta;
        }
        Ok(MoveOutcome {
            delta,
            log_likelihood_ratio,
            hastings_ratio,
            accepted,
        })
    }

    /// Names of the active terms.
    pub fn active_term_names(&self) -> Vec<&str> {
        let hierarchy = self.assocs.hierarchy();
        self.active_terms
            .iter()
            .map(|&t| hierarchy.term_name(t))
            .collect()
    }
}
