//! Forward simulation of gene sets from the generative model.

use std::collections::BTreeMap;

use genesieve_core::{GenesieveError, Result};
use genesieve_ontology::AssociationIndex;
use rand::Rng;
use tracing::debug;

use crate::counts::BernoulliCounts;
use crate::params::ParameterMap;
use crate::sampler::ModelInfo;

/// Genes of one simulated replicate.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct SimulatedGenes {
    /// Genes annotated to an active term.
    #[cfg_attr(feature = "serde", serde(rename = "true"))]
    pub true_genes: Vec<String>,
    pub false_pos: Vec<String>,
    pub false_neg: Vec<String>,
    pub observed: Vec<String>,
}

/// One simulated replicate: the active terms and the genes they produce.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct SimulatedGeneSet {
    pub term: Vec<String>,
    pub gene: SimulatedGenes,
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct SimulationData {
    /// Parameter values shared by every replicate.
    pub params: BTreeMap<String, f64>,
    pub samples: Vec<SimulatedGeneSet>,
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Simulation {
    pub model: ModelInfo,
    pub simulation: SimulationData,
}

impl Simulation {
    /// Observed gene set of each replicate.
    pub fn observed_gene_sets(&self) -> Vec<Vec<String>> {
        self.simulation
            .samples
            .iter()
            .map(|s| s.gene.observed.clone())
            .collect()
    }
}

/// Draws gene sets by activating relevant terms and corrupting their genes.
#[derive(Debug, Clone)]
pub struct Simulator<'a> {
    assocs: &'a AssociationIndex,
    params: &'a ParameterMap,
    prior: BernoulliCounts,
    exclude_redundant: bool,
}

impl<'a> Simulator<'a> {
    pub fn new(
        assocs: &'a AssociationIndex,
        params: &'a ParameterMap,
        prior: BernoulliCounts,
    ) -> Result<Self> {
        if prior.len() != params.len() {
            return Err(GenesieveError::InvalidInput(format!(
                "prior has {} parameters, expected {}",
                prior.len(),
                params.len()
            )));
        }
        prior.validate()?;
        Ok(Self {
            assocs,
            params,
            prior,
            exclude_redundant: false,
        })
    }

    /// Never activate a term below an already active one.
    pub fn exclude_redundant(mut self, exclude: bool) -> Self {
        self.exclude_redundant = exclude;
        self
    }

    /// Draw one parameter vector from the prior, then `n` replicates under it.
    pub fn sample_gene_sets<R: Rng + ?Sized>(&self, n: usize, rng: &mut R) -> Result<Simulation> {
        let p = self.prior.sample_params(rng)?;
        let hierarchy = self.assocs.hierarchy();
        let n_terms = self.assocs.terms();
        let n_genes = self.assocs.genes();
        let relevant: Vec<bool> = {
            let mut mask = vec![false; n_terms];
            for t in self.assocs.relevant_terms() {
                mask[t] = true;
            }
            mask
        };

        let mut samples = Vec::with_capacity(n);
        for _ in 0..n {
            let mut term_state = vec![false; n_terms];
            let mut implicit = vec![false; n_terms];
            let mut gene_state = vec![false; n_genes];

            for &t in self.assocs.term_order() {
                implicit[t] = hierarchy.parents(t).iter().any(|&parent| implicit[parent]);
                if !relevant[t] || (self.exclude_redundant && implicit[t]) {
                    continue;
                }
                if rng.gen::<f64>() < p[self.params.term_prior(t)] {
                    term_state[t] = true;
                    implicit[t] = true;
                    for &g in self.assocs.genes_by_term(t) {
                        gene_state[g] = true;
                    }
                }
            }

            let mut genes = SimulatedGenes::default();
            for (g, &present) in gene_state.iter().enumerate() {
                let error = if present {
                    p[self.params.false_neg(g)]
                } else {
                    p[self.params.false_pos(g)]
                };
                let observed = present != (rng.gen::<f64>() < error);
                let name = self.assocs.gene_name(g).to_string();
                match (present, observed) {
                    (true, false) => genes.false_neg.push(name.clone()),
                    (false, true) => genes.false_pos.push(name.clone()),
                    _ => {}
                }
                if present {
                    genes.true_genes.push(name.clone());
                }
                if observed {
                    genes.observed.push(name);
                }
            }

            let term = (0..n_terms)
                .filter(|&t| term_state[t])
                .map(|t| hierarchy.term_name(t).to_string())
                .collect();
            samples.push(SimulatedGeneSet { term, gene: genes });
        }
        debug!(replicates = n, "simulated gene sets");

        let params = (0..self.params.len())
            .map(|id| (self.params.name(id).to_string(), p[id]))
            .collect();
        Ok(Simulation {
            model: ModelInfo {
                prior: self.prior.named(self.params),
            },
            simulation: SimulationData { params, samples },
        })
    }
}
