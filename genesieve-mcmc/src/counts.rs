//! Beta-Bernoulli sufficient statistics.
//!
//! Every parameter carries an implicit Beta(1,1) base measure; the counts
//! stored here are pseudo-observations on top of it. With Beta conjugacy
//! the parameters can be integrated out, so a move's acceptance only needs
//! the change in counts it causes.

use std::collections::BTreeMap;
use std::ops::AddAssign;

use genesieve_core::{GenesieveError, Result};
use genesieve_stats::ln_beta;
use rand::Rng;
use rand_distr::{Beta, Distribution};

use crate::params::{ParamId, ParameterMap};

/// Success and failure counts per Bernoulli parameter.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct BernoulliCounts {
    succ: Vec<f64>,
    fail: Vec<f64>,
}

/// Counts keyed by parameter name, for reports.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct NamedCounts {
    pub succ: BTreeMap<String, f64>,
    pub fail: BTreeMap<String, f64>,
}

impl BernoulliCounts {
    pub fn zeros(n_params: usize) -> Self {
        Self {
            succ: vec![0.0; n_params],
            fail: vec![0.0; n_params],
        }
    }

    /// Build from parallel success and failure vectors.
    pub fn from_vecs(succ: Vec<f64>, fail: Vec<f64>) -> Result<Self> {
        if succ.len() != fail.len() {
            return Err(GenesieveError::InvalidInput(format!(
                "success and failure counts differ in length ({} vs {})",
                succ.len(),
                fail.len()
            )));
        }
        Ok(Self { succ, fail })
    }

    pub fn len(&self) -> usize {
        self.succ.len()
    }

    pub fn is_empty(&self) -> bool {
        self.succ.is_empty()
    }

    pub fn succ(&self) -> &[f64] {
        &self.succ
    }

    pub fn fail(&self) -> &[f64] {
        &self.fail
    }

    pub fn set(&mut self, param: ParamId, succ: f64, fail: f64) {
        self.succ[param] = succ;
        self.fail[param] = fail;
    }

    /// Add `inc` to the success (`outcome == true`) or failure count of `param`.
    pub fn add(&mut self, param: ParamId, outcome: bool, inc: f64) {
        if outcome {
            self.succ[param] += inc;
        } else {
            self.fail[param] += inc;
        }
    }

    /// True if every count is zero.
    pub fn is_zero(&self) -> bool {
        self.succ.iter().chain(&self.fail).all(|&c| c == 0.0)
    }

    /// Check that every Beta argument `count + 1` is finite and positive.
    pub fn validate(&self) -> Result<()> {
        for (p, (&s, &f)) in self.succ.iter().zip(&self.fail).enumerate() {
            if !(s + 1.0 > 0.0 && f + 1.0 > 0.0 && s.is_finite() && f.is_finite()) {
                return Err(GenesieveError::NumericDomain(format!(
                    "parameter {} has pseudo-counts succ={}, fail={}; both must exceed -1",
                    p, s, f
                )));
            }
        }
        Ok(())
    }

    /// Log marginal likelihood of these counts relative to `prior`.
    ///
    /// `Σ_p lnB(prior.succ+1+succ, prior.fail+1+fail) − lnB(prior.succ+1, prior.fail+1)`
    pub fn log_beta_bernoulli(&self, prior: &Self) -> f64 {
        self.succ
            .iter()
            .zip(&self.fail)
            .zip(prior.succ.iter().zip(&prior.fail))
            .map(|((&s, &f), (&ps, &pf))| {
                ln_beta(ps + 1.0 + s, pf + 1.0 + f) - ln_beta(ps + 1.0, pf + 1.0)
            })
            .sum()
    }

    /// Log marginal likelihood ratio of adding `delta` to these counts.
    ///
    /// Parameters whose delta is zero contribute nothing and are skipped.
    pub fn delta_log_beta_bernoulli(&self, delta: &Self) -> f64 {
        let mut llr = 0.0;
        for p in 0..delta.len() {
            let (ds, df) = (delta.succ[p], delta.fail[p]);
            if ds == 0.0 && df == 0.0 {
                continue;
            }
            let (s, f) = (self.succ[p], self.fail[p]);
            llr += ln_beta(s + ds + 1.0, f + df + 1.0) - ln_beta(s + 1.0, f + 1.0);
        }
        llr
    }

    /// Draw one probability per parameter from its Beta(succ+1, fail+1) posterior.
    pub fn sample_params<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<Vec<f64>> {
        self.succ
            .iter()
            .zip(&self.fail)
            .enumerate()
            .map(|(p, (&s, &f))| {
                let beta = Beta::new(s + 1.0, f + 1.0).map_err(|e| {
                    GenesieveError::NumericDomain(format!("parameter {}: {}", p, e))
                })?;
                Ok(beta.sample(rng))
            })
            .collect()
    }

    /// Key the counts by parameter name.
    pub fn named(&self, params: &ParameterMap) -> NamedCounts {
        let mut named = NamedCounts::default();
        for p in 0..self.len().min(params.len()) {
            named.succ.insert(params.name(p).to_string(), self.succ[p]);
            named.fail.insert(params.name(p).to_string(), self.fail[p]);
        }
        named
    }
}

impl AddAssign<&BernoulliCounts> for BernoulliCounts {
    fn add_assign(&mut self, other: &BernoulliCounts) {
        debug_assert_eq!(self.len(), other.len(), "counts sized for different parameter maps");
        for (a, b) in self.succ.iter_mut().zip(&other.succ) {
            *a += b;
        }
        for (a, b) in self.fail.iter_mut().zip(&other.fail) {
            *a += b;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha20Rng;

    const TOL: f64 = 1e-10;

    fn counts(succ: &[f64], fail: &[f64]) -> BernoulliCounts {
        BernoulliCounts::from_vecs(succ.to_vec(), fail.to_vec()).unwrap()
    }

    #[test]
    fn empty_counts_have_zero_log_likelihood() {
        let prior = counts(&[1.0, 2.0], &[5.0, 3.0]);
        assert!(BernoulliCounts::zeros(2).log_beta_bernoulli(&prior).abs() < TOL);
    }

    #[test]
    fn uniform_prior_single_success() {
        // ∫ p dp = 1/2
        let c = counts(&[1.0], &[0.0]);
        let ll = c.log_beta_bernoulli(&BernoulliCounts::zeros(1));
        assert!((ll - 0.5f64.ln()).abs() < TOL);
    }

    #[test]
    fn uniform_prior_sequence() {
        // 2 successes, 1 failure under Beta(1,1): B(3,2)/B(1,1) = 1/12
        let c = counts(&[2.0], &[1.0]);
        let ll = c.log_beta_bernoulli(&BernoulliCounts::zeros(1));
        assert!((ll - (1.0f64 / 12.0).ln()).abs() < TOL);
    }

    #[test]
    fn delta_matches_difference_of_marginals() {
        let prior = counts(&[1.0, 1.0, 1.0], &[3.0, 3.0, 3.0]);
        let before = counts(&[2.0, 0.0, 1.0], &[1.0, 3.0, 0.0]);
        let delta = counts(&[1.0, 0.0, -1.0], &[-1.0, 0.0, 1.0]);

        let mut with_prior = prior.clone();
        with_prior += &before;
        let mut after = before.clone();
        after += &delta;

        let expected = after.log_beta_bernoulli(&prior) - before.log_beta_bernoulli(&prior);
        assert!((with_prior.delta_log_beta_bernoulli(&delta) - expected).abs() < TOL);
    }

    #[test]
    fn zero_delta_is_free() {
        let c = counts(&[4.0], &[7.0]);
        assert_eq!(c.delta_log_beta_bernoulli(&BernoulliCounts::zeros(1)), 0.0);
    }

    #[test]
    fn add_assign_is_elementwise() {
        let mut a = counts(&[1.0, 2.0], &[3.0, 4.0]);
        a += &counts(&[1.0, -1.0], &[0.0, 2.0]);
        assert_eq!(a, counts(&[2.0, 1.0], &[3.0, 6.0]));
        assert!(!a.is_zero());
        assert!(BernoulliCounts::zeros(3).is_zero());
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "different parameter maps")]
    fn add_assign_rejects_mismatched_lengths() {
        let mut a = BernoulliCounts::zeros(3);
        a += &BernoulliCounts::zeros(5);
    }

    #[test]
    fn validate_rejects_negative_pseudocounts() {
        assert!(counts(&[0.0], &[-0.5]).validate().is_ok());
        assert!(matches!(
            counts(&[-1.0], &[0.0]).validate(),
            Err(GenesieveError::NumericDomain(_))
        ));
        assert!(counts(&[f64::NAN], &[0.0]).validate().is_err());
    }

    #[test]
    fn mismatched_lengths_rejected() {
        assert!(BernoulliCounts::from_vecs(vec![0.0], vec![]).is_err());
    }

    #[test]
    fn sampled_params_are_probabilities() {
        let mut rng = ChaCha20Rng::seed_from_u64(7);
        let c = counts(&[0.0, 50.0, 1.0], &[0.0, 0.0, 1000.0]);
        let p = c.sample_params(&mut rng).unwrap();
        assert_eq!(p.len(), 3);
        assert!(p.iter().all(|&x| (0.0..=1.0).contains(&x)));
        assert!(p[1] > 0.8);
        assert!(p[2] < 0.05);
    }

    #[test]
    fn sample_params_rejects_invalid_counts() {
        let mut rng = ChaCha20Rng::seed_from_u64(7);
        assert!(counts(&[-2.0], &[0.0]).sample_params(&mut rng).is_err());
    }
}
