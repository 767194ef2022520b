//! Plain gene lists: one name per line, blank lines skipped.

use std::path::Path;

use genesieve_core::Result;

/// Read a gene list file.
pub fn parse_gene_list(path: impl AsRef<Path>) -> Result<Vec<String>> {
    let text = crate::read_to_string(path.as_ref())?;
    Ok(parse_gene_list_str(&text))
}

/// Split gene-list text into trimmed, non-empty names.
pub fn parse_gene_list_str(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}
