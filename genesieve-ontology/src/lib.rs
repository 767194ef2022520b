//! Term hierarchies and gene annotations for the genesieve workspace.
//!
//! - **Hierarchy** - [`Hierarchy`]: arena-stored DAG of terms with
//!   topological sorting and ancestor closure
//! - **Associations** - [`AssociationIndex`]: closure-complete gene↔term
//!   relation, equivalence classes of indistinguishable terms, and exact
//!   hypergeometric enrichment
//!
//! # Quick start
//!
//! ```
//! use genesieve_ontology::{Annotation, AssociationIndex, Hierarchy};
//!
//! let hierarchy = Hierarchy::build(vec![
//!     ("A", vec![]),
//!     ("B", vec!["A"]),
//!     ("C", vec!["A"]),
//! ]);
//! let index = AssociationIndex::build(
//!     hierarchy,
//!     vec![
//!         Annotation::new("gene1", "B"),
//!         Annotation::new("gene2", "C"),
//!         Annotation::new("gene3", "A"),
//!     ],
//! )
//! .unwrap();
//!
//! let a = index.hierarchy().term_id("A").unwrap();
//! assert_eq!(index.genes_by_term(a).len(), 3);
//! ```

pub mod associations;
pub mod hierarchy;

pub use associations::{Annotation, AssociationIndex, ClassId, GeneId};
pub use hierarchy::{Hierarchy, Term, TermId};
