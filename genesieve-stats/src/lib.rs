//! Statistical building blocks for the genesieve workspace.
//!
//! - **Special functions** - [`ln_gamma`], [`ln_beta`], [`ln_choose`]
//! - **Enrichment** - exact hypergeometric upper-tail p-values
//! - **Multiple testing correction** - Bonferroni, Benjamini-Hochberg

pub mod correction;
pub mod enrichment;
pub mod special;

pub use correction::CorrectionMethod;
pub use enrichment::hypergeometric_upper_tail;
pub use special::{ln_beta, ln_choose, ln_gamma};
