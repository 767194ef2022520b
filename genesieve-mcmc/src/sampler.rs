//! Collapsed Metropolis-Hastings sampler over several gene-set models.
//!
//! All models share one pooled [`BernoulliCounts`] accumulator (prior plus
//! every model's counts), so false-positive and false-negative rates are
//! learned jointly across gene sets while each model keeps its own term
//! states.

use std::collections::BTreeMap;
use std::time::{Duration, Instant};

use genesieve_core::{GenesieveError, Result};
use genesieve_ontology::AssociationIndex;
use genesieve_stats::correction::correct;
use genesieve_stats::CorrectionMethod;
use rand::distributions::{Distribution, WeightedIndex};
use rand::Rng;
use tracing::{debug, info, trace, warn};

use crate::counts::{BernoulliCounts, NamedCounts};
use crate::model::{ActivationModel, MoveKind, MoveOutcome, Proposal};
use crate::params::ParameterMap;

/// Relative rates of the move kinds.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct MoveRates {
    pub flip: f64,
    pub step: f64,
    pub randomize: f64,
}

impl Default for MoveRates {
    fn default() -> Self {
        Self {
            flip: 1.0,
            step: 1.0,
            randomize: 0.0,
        }
    }
}

impl MoveRates {
    pub fn rate(&self, kind: MoveKind) -> f64 {
        match kind {
            MoveKind::Flip => self.flip,
            MoveKind::Step => self.step,
            MoveKind::Randomize => self.randomize,
        }
    }

    fn validate(&self) -> Result<()> {
        let rates = MoveKind::ALL.map(|k| self.rate(k));
        if rates.iter().any(|r| !r.is_finite() || *r < 0.0) || rates.iter().sum::<f64>() <= 0.0 {
            return Err(GenesieveError::InvalidInput(format!(
                "move rates must be non-negative with a positive total: {:?}",
                self
            )));
        }
        Ok(())
    }
}

/// Sampler construction options.
#[derive(Debug, Clone, Default)]
pub struct SamplerConfig {
    pub move_rates: MoveRates,
    /// Drop unknown query genes with a warning instead of failing.
    pub ignore_missing: bool,
}

/// Proposal and acceptance tallies for one move kind.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct MoveStats {
    /// Non-null proposals evaluated.
    pub proposed: usize,
    pub accepted: usize,
    /// Null proposals; accepted as no-ops and excluded from the rate.
    pub null: usize,
}

impl MoveStats {
    pub fn acceptance_rate(&self) -> Option<f64> {
        (self.proposed > 0).then(|| self.accepted as f64 / self.proposed as f64)
    }
}

/// Record of one sampler iteration, handed to observers.
#[derive(Debug, Clone)]
pub struct Move {
    /// 1-based iteration index, counted across runs.
    pub iteration: usize,
    pub model: usize,
    pub kind: MoveKind,
    pub proposal: Proposal,
    pub outcome: MoveOutcome,
}

/// Thresholds for [`Sampler::summary_with`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SummaryOptions {
    /// Minimum posterior probability reported.
    pub post_prob: f64,
    /// Maximum (corrected) hypergeometric p-value reported.
    pub p_value: f64,
    pub correction: CorrectionMethod,
}

impl Default for SummaryOptions {
    fn default() -> Self {
        Self {
            post_prob: 0.01,
            p_value: 0.05,
            correction: CorrectionMethod::None,
        }
    }
}

/// Sampler report.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Summary {
    pub model: ModelInfo,
    pub mcmc: RunInfo,
    pub summary: Vec<GeneSetSummary>,
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct ModelInfo {
    pub prior: NamedCounts,
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct RunInfo {
    /// Recorded (post-burn-in) samples.
    pub samples: usize,
    pub iterations: usize,
    pub burn_in: usize,
    pub move_rate: MoveRates,
    pub moves: BTreeMap<MoveKind, MoveStats>,
}

/// Per-gene-set results.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct GeneSetSummary {
    pub hypergeometric_p_value: HypergeometricSummary,
    pub posterior_marginal: PosteriorMarginal,
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct HypergeometricSummary {
    pub max_threshold: f64,
    pub correction: CorrectionMethod,
    pub term: BTreeMap<String, f64>,
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct PosteriorMarginal {
    pub min_threshold: f64,
    pub term: BTreeMap<String, f64>,
    pub gene: GenePosterior,
}

#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct GenePosterior {
    /// Query genes not explained by any active term.
    pub false_pos: BTreeMap<String, f64>,
    /// Genes outside the query set that active terms predict.
    pub false_neg: BTreeMap<String, f64>,
}

/// Collapsed MH sampler.
#[derive(Debug, Clone)]
pub struct Sampler<'a> {
    assocs: &'a AssociationIndex,
    params: &'a ParameterMap,
    models: Vec<ActivationModel<'a>>,
    prior: BernoulliCounts,
    counts_with_prior: BernoulliCounts,
    model_weight: Vec<usize>,
    move_rates: MoveRates,
    hypergeometric: Vec<Vec<f64>>,
    iterations: usize,
    burn_in: usize,
    recorded: usize,
    term_occupancy: Vec<Vec<usize>>,
    gene_occupancy: Vec<Vec<usize>>,
    move_stats: BTreeMap<MoveKind, MoveStats>,
}

impl<'a> Sampler<'a> {
    /// Build one model per named gene set.
    ///
    /// # Errors
    ///
    /// Fails if the prior is malformed, the move rates are all zero, or (unless
    /// `config.ignore_missing`) a query gene is unknown.
    pub fn new<S: AsRef<str>>(
        assocs: &'a AssociationIndex,
        params: &'a ParameterMap,
        gene_sets: &[Vec<S>],
        prior: BernoulliCounts,
        config: &SamplerConfig,
    ) -> Result<Self> {
        let models = gene_sets
            .iter()
            .enumerate()
            .map(|(n, names)| {
                if !config.ignore_missing {
                    return ActivationModel::new(assocs, params, names);
                }
                let (genes, missing) = assocs.validate_gene_names(names);
                if !missing.is_empty() {
                    warn!(
                        gene_set = n,
                        count = missing.len(),
                        "ignoring genes not found in the associations list: {}",
                        missing.join(", ")
                    );
                }
                ActivationModel::from_genes(assocs, params, &genes)
            })
            .collect::<Result<Vec<_>>>()?;
        Self::from_models(assocs, params, models, prior, config.move_rates)
    }

    /// Build a sampler over existing models, whose current states seed the pooled counts.
    pub fn from_models(
        assocs: &'a AssociationIndex,
        params: &'a ParameterMap,
        models: Vec<ActivationModel<'a>>,
        prior: BernoulliCounts,
        move_rates: MoveRates,
    ) -> Result<Self> {
        if prior.len() != params.len() {
            return Err(GenesieveError::InvalidInput(format!(
                "prior has {} parameters, expected {}",
                prior.len(),
                params.len()
            )));
        }
        prior.validate()?;
        move_rates.validate()?;
        for (n, m) in models.iter().enumerate() {
            let n_params = m.get_counts().len();
            if n_params != params.len() {
                return Err(GenesieveError::InvalidInput(format!(
                    "model {} has {} parameters, expected {}",
                    n,
                    n_params,
                    params.len()
                )));
            }
        }

        let hypergeometric = models
            .iter()
            .map(|m| assocs.hypergeometric_all(m.gene_set()))
            .collect::<Result<Vec<_>>>()?;
        let model_weight: Vec<usize> = models.iter().map(|m| m.relevant_terms().len()).collect();

        let mut counts_with_prior = prior.clone();
        for m in &models {
            counts_with_prior += &m.get_counts();
        }

        let sampler = Self {
            assocs,
            params,
            term_occupancy: vec![vec![0; assocs.terms()]; models.len()],
            gene_occupancy: vec![vec![0; assocs.genes()]; models.len()],
            models,
            prior,
            counts_with_prior,
            model_weight,
            move_rates,
            hypergeometric,
            iterations: 0,
            burn_in: 0,
            recorded: 0,
            move_stats: MoveKind::ALL.iter().map(|&k| (k, MoveStats::default())).collect(),
        };
        debug!(
            models = sampler.models.len(),
            variables = sampler.n_variables(),
            "sampler initialized"
        );
        Ok(sampler)
    }

    pub fn models(&self) -> &[ActivationModel<'a>] {
        &self.models
    }

    pub fn prior(&self) -> &BernoulliCounts {
        &self.prior
    }

    /// Running pooled counts: prior plus every model's current counts.
    pub fn counts_with_prior(&self) -> &BernoulliCounts {
        &self.counts_with_prior
    }

    pub fn move_rates(&self) -> MoveRates {
        self.move_rates
    }

    /// Per-model proposal weight (its number of relevant terms).
    pub fn model_weights(&self) -> &[usize] {
        &self.model_weight
    }

    /// Total number of free term variables.
    pub fn n_variables(&self) -> usize {
        self.model_weight.iter().sum()
    }

    pub fn iterations(&self) -> usize {
        self.iterations
    }

    pub fn recorded_samples(&self) -> usize {
        self.recorded
    }

    pub fn move_stats(&self, kind: MoveKind) -> MoveStats {
        self.move_stats.get(&kind).copied().unwrap_or_default()
    }

    /// Recorded samples in which each term of model `m` was active.
    pub fn term_occupancy(&self, m: usize) -> &[usize] {
        &self.term_occupancy[m]
    }

    /// Recorded samples in which each gene of model `m` was mismatched.
    pub fn gene_occupancy(&self, m: usize) -> &[usize] {
        &self.gene_occupancy[m]
    }

    /// Raw hypergeometric p-value per term for model `m`.
    pub fn hypergeometric(&self, m: usize) -> &[f64] {
        &self.hypergeometric[m]
    }

    /// Sum of every model's counts, without the prior.
    pub fn compute_counts(&self) -> BernoulliCounts {
        let mut counts = self.params.new_counts();
        for m in &self.models {
            counts += &m.get_counts();
        }
        counts
    }

    /// Prior plus every model's counts, recomputed from scratch.
    pub fn compute_counts_with_prior(&self) -> BernoulliCounts {
        let mut counts = self.prior.clone();
        for m in &self.models {
            counts += &m.get_counts();
        }
        counts
    }

    /// Log marginal likelihood of the current joint state under the prior.
    pub fn collapsed_log_likelihood(&self) -> f64 {
        self.compute_counts().log_beta_bernoulli(&self.prior)
    }

    /// Run `n_samples` iterations, recording iterations numbered above `burn_in`.
    pub fn run<R: Rng + ?Sized>(&mut self, n_samples: usize, burn_in: usize, rng: &mut R) -> Result<()> {
        self.run_with(n_samples, burn_in, rng, |_, _| {})
    }

    /// Like [`run`](Self::run), calling `observer` after every iteration.
    ///
    /// Refuses to run, with a warning, when no model has a free variable.
    pub fn run_with<R, F>(
        &mut self,
        n_samples: usize,
        burn_in: usize,
        rng: &mut R,
        mut observer: F,
    ) -> Result<()>
    where
        R: Rng + ?Sized,
        F: FnMut(&Sampler<'a>, &Move),
    {
        if self.n_variables() == 0 {
            warn!("refusing to run MCMC on a model with no variables");
            return Ok(());
        }
        let model_dist = WeightedIndex::new(&self.model_weight)
            .map_err(|e| GenesieveError::InvalidInput(format!("model weights: {}", e)))?;
        let kind_dist = WeightedIndex::new(MoveKind::ALL.map(|k| self.move_rates.rate(k)))
            .map_err(|e| GenesieveError::InvalidInput(format!("move rates: {}", e)))?;

        self.burn_in = burn_in;
        info!(
            samples = n_samples,
            burn_in,
            variables = self.n_variables(),
            "running MCMC"
        );
        let mut progress = Progress::new(n_samples);

        for sample in 0..n_samples {
            let m = model_dist.sample(rng);
            let kind = MoveKind::ALL[kind_dist.sample(rng)];
            let proposal = self.models[m].propose(kind, rng);
            let outcome =
                self.models[m].sample_move_collapsed(&proposal, &mut self.counts_with_prior, rng)?;

            if let Some(stats) = self.move_stats.get_mut(&kind) {
                if proposal.is_null() {
                    stats.null += 1;
                } else {
                    stats.proposed += 1;
                    stats.accepted += usize::from(outcome.accepted);
                }
            }

            self.iterations += 1;
            if self.iterations > burn_in {
                self.record();
            }

            trace!(
                iteration = self.iterations,
                model = m,
                kind = %kind,
                proposal = ?proposal,
                hastings_ratio = outcome.hastings_ratio,
                accepted = outcome.accepted,
                "move"
            );

            let mv = Move {
                iteration: self.iterations,
                model: m,
                kind,
                proposal,
                outcome,
            };
            observer(self, &mv);
            progress.tick(sample);
        }

        for kind in MoveKind::ALL {
            let stats = self.move_stats(kind);
            debug!(
                kind = %kind,
                proposed = stats.proposed,
                accepted = stats.accepted,
                null = stats.null,
                "move statistics"
            );
        }
        Ok(())
    }

    fn record(&mut self) {
        self.recorded += 1;
        for (n, model) in self.models.iter().enumerate() {
            for &t in model.active_terms() {
                self.term_occupancy[n][t] += 1;
            }
            for &g in model.mismatched_genes() {
                self.gene_occupancy[n][g] += 1;
            }
        }
    }

    fn fraction(&self, occupancy: usize) -> f64 {
        if self.recorded == 0 {
            0.0
        } else {
            occupancy as f64 / self.recorded as f64
        }
    }

    /// Summary with raw p-values.
    pub fn summary(&self, post_prob: f64, p_value: f64) -> Result<Summary> {
        self.summary_with(&SummaryOptions {
            post_prob,
            p_value,
            ..SummaryOptions::default()
        })
    }

    /// Posterior marginals and hypergeometric p-values per gene set, filtered by `options`.
    ///
    /// Terms are reported by the exemplar of their equivalence class only. The
    /// p-value correction runs over the exemplars of all non-empty classes.
    pub fn summary_with(&self, options: &SummaryOptions) -> Result<Summary> {
        let hierarchy = self.assocs.hierarchy();
        let exemplars = self.assocs.relevant_terms();
        let mut summary = Vec::with_capacity(self.models.len());
        for (n, model) in self.models.iter().enumerate() {
            let raw: Vec<f64> = exemplars.iter().map(|&t| self.hypergeometric[n][t]).collect();
            let p_values = correct(&raw, options.correction)?;
            let hypergeometric = exemplars
                .iter()
                .zip(p_values)
                .filter(|&(_, p)| p <= options.p_value)
                .map(|(&t, p)| (hierarchy.term_name(t).to_string(), p))
                .collect();

            let term = model
                .relevant_terms()
                .iter()
                .filter(|&&t| self.assocs.is_exemplar(t))
                .map(|&t| (t, self.fraction(self.term_occupancy[n][t])))
                .filter(|&(_, p)| p >= options.post_prob)
                .map(|(t, p)| (hierarchy.term_name(t).to_string(), p))
                .collect();

            let mut gene = GenePosterior::default();
            for (g, &occ) in self.gene_occupancy[n].iter().enumerate() {
                let p = self.fraction(occ);
                if p < options.post_prob {
                    continue;
                }
                let name = self.assocs.gene_name(g).to_string();
                if model.in_gene_set(g) {
                    gene.false_pos.insert(name, p);
                } else {
                    gene.false_neg.insert(name, p);
                }
            }

            summary.push(GeneSetSummary {
                hypergeometric_p_value: HypergeometricSummary {
                    max_threshold: options.p_value,
                    correction: options.correction,
                    term: hypergeometric,
                },
                posterior_marginal: PosteriorMarginal {
                    min_threshold: options.post_prob,
                    term,
                    gene,
                },
            });
        }

        Ok(Summary {
            model: ModelInfo {
                prior: self.prior.named(self.params),
            },
            mcmc: RunInfo {
                samples: self.recorded,
                iterations: self.iterations,
                burn_in: self.burn_in,
                move_rate: self.move_rates,
                moves: self.move_stats.clone(),
            },
            summary,
        })
    }
}

/// Progress logging at a doubling interval, from 1 s up to 30 s.
struct Progress {
    total: usize,
    start: Instant,
    last: Instant,
    delay: Duration,
}

impl Progress {
    const MAX_DELAY: Duration = Duration::from_secs(30);

    fn new(total: usize) -> Self {
        let now = Instant::now();
        Self {
            total,
            start: now,
            last: now,
            delay: Duration::from_secs(1),
        }
    }

    fn tick(&mut self, sample: usize) {
        let now = Instant::now();
        if now.duration_since(self.last) <= self.delay {
            return;
        }
        self.last = now;
        self.delay = (self.delay * 2).min(Self::MAX_DELAY);
        let done = sample + 1;
        let fraction = done as f64 / self.total as f64;
        let elapsed = now.duration_since(self.start).as_secs_f64();
        let remaining = elapsed * (1.0 / fraction - 1.0);
        info!(
            "sampled {}/{} states ({:.0}%), estimated time left {}",
            done,
            self.total,
            100.0 * fraction,
            hhmmss(remaining)
        );
    }
}

fn hhmmss(seconds: f64) -> String {
    let s = seconds.max(0.0).round() as u64;
    format!("{:02}:{:02}:{:02}", s / 3600, (s / 60) % 60, s % 60)
}
