//! Shared primitives for the genesieve workspace.
//!
//! `genesieve-core` provides the pieces every other crate builds on:
//!
//! - **Error types** - [`GenesieveError`] and [`Result`] for structured error handling
//! - **Traits** - [`Summarizable`] for one-line descriptions used in log output

pub mod error;
pub mod traits;

pub use error::{GenesieveError, Result};
pub use traits::*;
