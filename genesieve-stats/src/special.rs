//! Log-space special functions.
//!
//! Everything here works on natural logarithms so that Beta-Bernoulli
//! marginal likelihoods and binomial coefficients over whole genomes stay
//! finite.

use core::f64::consts::PI;

/// Natural log of the gamma function via the Lanczos approximation (g=7).
pub fn ln_gamma(x: f64) -> f64 {
    const COEFFS: [f64; 8] = [
        676.5203681218851,
        -1259.1392167224028,
        771.32342877765313,
        -176.61502916214059,
        12.507343278686905,
        -0.13857109526572012,
        9.9843695780195716e-6,
        1.5056327351493116e-7,
    ];

    if x < 0.5 {
        // Reflection formula: Γ(x) = π / (sin(πx) · Γ(1-x))
        let log_pi_over_sin = (PI / (PI * x).sin()).ln();
        log_pi_over_sin - ln_gamma(1.0 - x)
    } else {
        let x = x - 1.0;
        let mut ag = 0.99999999999980993_f64;
        for (i, &c) in COEFFS.iter().enumerate() {
            ag += c / (x + i as f64 + 1.0);
        }
        let t = x + 7.5; // g + 0.5
        0.5 * (2.0 * PI).ln() + (x + 0.5) * t.ln() - t + ag.ln()
    }
}

/// Natural log of the Beta function, `ln B(a, b) = lnΓ(a) + lnΓ(b) − lnΓ(a+b)`.
///
/// Only meaningful for `a > 0` and `b > 0`; callers validate their
/// pseudo-counts before reaching this point.
pub fn ln_beta(a: f64, b: f64) -> f64 {
    ln_gamma(a) + ln_gamma(b) - ln_gamma(a + b)
}

/// Log of binomial coefficient C(n, k) = ln(n!) - ln(k!) - ln((n-k)!).
///
/// Returns negative infinity when `k > n`.
pub fn ln_choose(n: usize, k: usize) -> f64 {
    if k > n {
        return f64::NEG_INFINITY;
    }
    ln_gamma(n as f64 + 1.0) - ln_gamma(k as f64 + 1.0) - ln_gamma((n - k) as f64 + 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    const TOL: f64 = 1e-8;

    #[test]
    fn ln_gamma_integers() {
        // Γ(n) = (n-1)! for positive integers
        assert!((ln_gamma(1.0) - 0.0).abs() < TOL);
        assert!((ln_gamma(2.0) - 0.0).abs() < TOL);
        assert!((ln_gamma(5.0) - (24.0_f64).ln()).abs() < TOL);
        assert!((ln_gamma(7.0) - (720.0_f64).ln()).abs() < TOL);
    }

    #[test]
    fn ln_beta_uniform_is_zero() {
        // B(1,1) = 1
        assert!(ln_beta(1.0, 1.0).abs() < TOL);
    }

    #[test]
    fn ln_beta_matches_factorials() {
        // B(3,4) = 2!·3!/6! = 12/720
        assert!((ln_beta(3.0, 4.0) - (12.0_f64 / 720.0).ln()).abs() < TOL);
        assert!((ln_beta(3.0, 4.0) - ln_beta(4.0, 3.0)).abs() < TOL);
    }

    #[test]
    fn ln_choose_small_values() {
        assert!((ln_choose(5, 2) - 10.0_f64.ln()).abs() < TOL);
        assert!(ln_choose(7, 0).abs() < TOL);
        assert!(ln_choose(7, 7).abs() < TOL);
        assert_eq!(ln_choose(3, 4), f64::NEG_INFINITY);
    }
}
