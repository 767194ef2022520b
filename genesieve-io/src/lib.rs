//! File format parsing for genesieve inputs.
//!
//! Supported formats:
//! - **OBO** - ontology stanzas, reduced to a term→parents list for [`Hierarchy::build`]
//! - **GAF** - tab-separated gene-term annotations, as [`Annotation`] records
//! - **Gene lists** - one gene name per line
//!
//! Every parser has a path variant and a `_str` variant working on in-memory text.
//!
//! [`Hierarchy::build`]: genesieve_ontology::Hierarchy::build
//! [`Annotation`]: genesieve_ontology::Annotation

pub mod gaf;
pub mod gene_list;
pub mod obo;

pub use gaf::{parse_gaf, parse_gaf_str, parse_gaf_with, GafOptions};
pub use gene_list::{parse_gene_list, parse_gene_list_str};
pub use obo::{parse_obo, parse_obo_hierarchy, parse_obo_str, OboTerm};

use std::fs;
use std::path::Path;

use genesieve_core::{GenesieveError, Result};

/// Read a whole file, prefixing any I/O error with the path.
pub(crate) fn read_to_string(path: &Path) -> Result<String> {
    fs::read_to_string(path).map_err(|e| {
        GenesieveError::Io(std::io::Error::new(
            e.kind(),
            format!("{}: {}", path.display(), e),
        ))
    })
}
