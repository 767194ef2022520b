//! GAF (Gene Association File) parser.
//!
//! GAF is tab-separated with `!`-prefixed header lines. Columns used
//! (1-based): 2 = database object id, 3 = object symbol, 4 = qualifier,
//! 5 = term id. Records with fewer than 7 columns are skipped. Negated
//! (`NOT`) records are returned as-is; [`AssociationIndex::build`] drops them.
//!
//! [`AssociationIndex::build`]: genesieve_ontology::AssociationIndex::build

use std::path::Path;

use genesieve_core::Result;
use genesieve_ontology::Annotation;
use tracing::debug;

const MIN_FIELDS: usize = 7;

/// GAF parsing options.
#[derive(Debug, Clone, Copy, Default)]
pub struct GafOptions {
    /// Name genes by the database object id (column 2) instead of the symbol (column 3).
    pub use_database_id: bool,
}

/// Parse a GAF file, naming genes by their symbol.
pub fn parse_gaf(path: impl AsRef<Path>) -> Result<Vec<Annotation>> {
    parse_gaf_with(path, GafOptions::default())
}

/// Parse a GAF file with explicit options.
pub fn parse_gaf_with(path: impl AsRef<Path>, options: GafOptions) -> Result<Vec<Annotation>> {
    let path = path.as_ref();
    let text = crate::read_to_string(path)?;
    let annotations = parse_gaf_text(&text, options);
    debug!(
        annotations = annotations.len(),
        source = %path.display(),
        "parsed GAF records"
    );
    Ok(annotations)
}

/// Parse GAF text from a string, naming genes by their symbol.
pub fn parse_gaf_str(text: &str) -> Vec<Annotation> {
    parse_gaf_text(text, GafOptions::default())
}

fn parse_gaf_text(text: &str, options: GafOptions) -> Vec<Annotation> {
    let gene_column = if options.use_database_id { 1 } else { 2 };
    let mut short = 0usize;
    let mut annotations = Vec::new();
    for line in text.lines() {
        if line.trim_start().starts_with('!') || line.trim().is_empty() {
            continue;
        }
        let fields: Vec<&str> = line.split('\t').collect();
        if fields.len() < MIN_FIELDS {
            short += 1;
            continue;
        }
        annotations.push(Annotation::with_qualifier(
            fields[gene_column],
            fields[4],
            fields[3],
        ));
    }
    if short > 0 {
        debug!(lines = short, "skipped GAF lines with too few columns");
    }
    annotations
}
