//! Bayesian term-activation inference for gene sets.
//!
//! A gene set is explained by a small set of active ontology terms: genes
//! annotated to an active term are expected in the set, all others are not,
//! and mismatches are charged to false-positive and false-negative rates.
//! The rates and the term prior are integrated out (Beta-Bernoulli), and the
//! posterior over active terms is explored with Metropolis-Hastings.
//!
//! - **Parameters** - [`ParameterMap`], [`PriorPseudocounts`]
//! - **Sufficient statistics** - [`BernoulliCounts`]
//! - **Per gene set state** - [`ActivationModel`] with flip, step and
//!   randomize proposals
//! - **Inference** - [`Sampler`] and its [`Summary`] report
//! - **Simulation** - [`Simulator`] draws gene sets from the prior
//!
//! # Quick start
//!
//! ```
//! use genesieve_mcmc::{ParameterMap, PriorPseudocounts, Sampler, SamplerConfig};
//! use genesieve_ontology::{Annotation, AssociationIndex, Hierarchy};
//! use rand::SeedableRng;
//!
//! let hierarchy = Hierarchy::build(vec![("A", vec![]), ("B", vec!["A"]), ("C", vec!["A"])]);
//! let index = AssociationIndex::build(
//!     hierarchy,
//!     vec![
//!         Annotation::new("gene1", "B"),
//!         Annotation::new("gene2", "C"),
//!         Annotation::new("gene3", "A"),
//!     ],
//! )
//! .unwrap();
//! let params = ParameterMap::new(&index);
//! let prior = PriorPseudocounts::for_index(&index).to_counts(&params);
//!
//! let gene_sets = vec![vec!["gene1", "gene2"]];
//! let mut sampler =
//!     Sampler::new(&index, &params, &gene_sets, prior, &SamplerConfig::default()).unwrap();
//! let mut rng = rand_chacha::ChaCha20Rng::seed_from_u64(123456789);
//! sampler.run(1000, 100, &mut rng).unwrap();
//!
//! let summary = sampler.summary(0.01, 0.05).unwrap();
//! assert_eq!(summary.mcmc.samples, 900);
//! ```

pub mod counts;
pub mod model;
pub mod params;
pub mod sampler;
pub mod simulate;

pub use counts::{BernoulliCounts, NamedCounts};
pub use model::{ActivationModel, MoveKind, MoveOutcome, Proposal, TermStateAssignment};
pub use params::{ParamId, ParameterMap, PriorPseudocounts, FALSE_NEG, FALSE_POS, TERM_PRIOR};
pub use sampler::{
    GenePosterior, GeneSetSummary, HypergeometricSummary, ModelInfo, Move, MoveRates, MoveStats,
    PosteriorMarginal, RunInfo, Sampler, SamplerConfig, Summary, SummaryOptions,
};
pub use simulate::{SimulatedGeneSet, SimulatedGenes, Simulation, SimulationData, Simulator};
