//! Structured error types for the genesieve workspace.

use thiserror::Error;

/// Unified error type for all genesieve operations.
#[derive(Debug, Error)]
pub enum GenesieveError {
    /// I/O error (file not found, permission denied, etc.)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Parse error (malformed input data)
    #[error("parse error: {0}")]
    Parse(String),

    /// Invalid input (bad arguments, out-of-range values)
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The term hierarchy contains a cycle; `unsorted` terms could not be ordered.
    #[error("term hierarchy is cyclic: {unsorted} term(s) could not be topologically sorted")]
    CyclicGraph { unsorted: usize },

    /// Query gene names that are absent from the association index.
    #[error("genes not found in the associations list: {}", .0.join(", "))]
    UnknownQueryGenes(Vec<String>),

    /// Beta-function arguments outside their domain (non-positive pseudo-counts).
    #[error("numeric domain error: {0}")]
    NumericDomain(String),
}

/// Convenience alias used throughout the workspace.
pub type Result<T> = std::result::Result<T, GenesieveError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_genes_lists_every_name() {
        let err = GenesieveError::UnknownQueryGenes(vec!["abc1".into(), "xyz9".into()]);
        assert_eq!(
            err.to_string(),
            "genes not found in the associations list: abc1, xyz9"
        );
    }

    #[test]
    fn every_variant_formats() {
        let cases = [
            (
                GenesieveError::Io(std::io::Error::new(std::io::ErrorKind::Other, "disk")),
                "I/O error: disk",
            ),
            (GenesieveError::Parse("line 3".into()), "parse error: line 3"),
            (GenesieveError::InvalidInput("rate".into()), "invalid input: rate"),
            (
                GenesieveError::CyclicGraph { unsorted: 2 },
                "term hierarchy is cyclic: 2 term(s) could not be topologically sorted",
            ),
            (
                GenesieveError::UnknownQueryGenes(vec!["zeus".into()]),
                "genes not found in the associations list: zeus",
            ),
            (
                GenesieveError::NumericDomain("succ=-2".into()),
                "numeric domain error: succ=-2",
            ),
        ];
        for (err, message) in &cases {
            assert_eq!(err.to_string(), *message);
        }
    }

    #[test]
    fn io_errors_convert() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing.obo");
        let err: GenesieveError = io.into();
        assert!(matches!(err, GenesieveError::Io(_)));
    }
}
