//! Exact over-representation statistics for annotated gene sets.
//!
//! A term annotating `K` of the `N` genes in the universe is tested against a
//! query of `n` genes, `k` of which it annotates. The statistic is the
//! hypergeometric upper tail `P(X >= k)`.

use crate::special::ln_choose;

/// Hypergeometric upper-tail probability: P(X >= k).
///
/// X ~ Hypergeometric(N, K, n) where:
/// - `big_n` = total population (genes in the universe)
/// - `big_k` = success states in population (genes annotated to the term)
/// - `n` = draws (query set size)
/// - `k` = observed successes (annotated genes in the query)
///
/// Summed term by term in log-space; returns 0 when `k` exceeds
/// `min(n, K)`.
pub fn hypergeometric_upper_tail(k: usize, n: usize, big_k: usize, big_n: usize) -> f64 {
    if k == 0 {
        return 1.0;
    }
    let max_i = n.min(big_k);
    if k > max_i {
        return 0.0;
    }

    let mut sum = 0.0_f64;
    let log_denom = ln_choose(big_n, n);
    for i in k..=max_i {
        if big_n - big_k < n - i {
            continue;
        }
        let log_p = ln_choose(big_k, i) + ln_choose(big_n - big_k, n - i) - log_denom;
        sum += log_p.exp();
    }
    sum.min(1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    const TOL: f64 = 1e-10;

    #[test]
    fn zero_overlap_is_certain() {
        assert!((hypergeometric_upper_tail(0, 5, 10, 100) - 1.0).abs() < TOL);
    }

    #[test]
    fn impossible_overlap_is_zero() {
        assert_eq!(hypergeometric_upper_tail(4, 3, 10, 100), 0.0);
        assert_eq!(hypergeometric_upper_tail(4, 10, 3, 100), 0.0);
    }

    #[test]
    fn term_covering_universe_is_certain() {
        // Every gene annotated: any query of size 2 has overlap 2.
        assert!((hypergeometric_upper_tail(2, 2, 3, 3) - 1.0).abs() < TOL);
    }

    #[test]
    fn matches_hand_computed_tail() {
        // N=10, K=4, n=3: P(X>=2) = [C(4,2)C(6,1) + C(4,3)C(6,0)] / C(10,3) = (36+4)/120
        let p = hypergeometric_upper_tail(2, 3, 4, 10);
        assert!((p - 40.0 / 120.0).abs() < TOL, "p={}", p);
    }

    #[test]
    fn tail_non_increasing_in_overlap() {
        let (n, big_k, big_n) = (12, 20, 200);
        let mut prev = 1.0 + TOL;
        for k in 0..=12 {
            let p = hypergeometric_upper_tail(k, n, big_k, big_n);
            assert!(p <= prev + TOL, "k={} p={} prev={}", k, p, prev);
            prev = p;
        }
    }
}
