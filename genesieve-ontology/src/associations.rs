//! Gene↔term association index.
//!
//! Every asserted annotation is expanded through the hierarchy's ancestor
//! closure, so the stored relation is closure-complete: if a gene is
//! annotated to a term it is also annotated to all of that term's ancestors.
//! Terms annotating exactly the same genes are grouped into equivalence
//! classes, since the data cannot tell them apart.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use genesieve_core::{GenesieveError, Result, Summarizable};
use genesieve_stats::hypergeometric_upper_tail;
use tracing::{debug, warn};

use crate::hierarchy::{Hierarchy, TermId};

/// Index into the association index's gene arena.
pub type GeneId = usize;

/// Index of an equivalence class of terms.
pub type ClassId = usize;

/// One gene-term record from an annotation source.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Annotation {
    pub gene: String,
    pub term: String,
    /// Free-text qualifier; `NOT` (alone or `|`-joined) negates the record.
    pub qualifier: String,
}

impl Annotation {
    /// An unqualified (asserted) annotation.
    pub fn new(gene: impl Into<String>, term: impl Into<String>) -> Self {
        Self::with_qualifier(gene, term, "")
    }

    pub fn with_qualifier(
        gene: impl Into<String>,
        term: impl Into<String>,
        qualifier: impl Into<String>,
    ) -> Self {
        Self {
            gene: gene.into(),
            term: term.into(),
            qualifier: qualifier.into(),
        }
    }

    /// True if the qualifier contains a `NOT` component.
    pub fn is_negated(&self) -> bool {
        self.qualifier.split('|').any(|q| q.trim() == "NOT")
    }
}

/// Closure-complete gene↔term relation over an owned [`Hierarchy`].
#[derive(Debug, Clone)]
pub struct AssociationIndex {
    hierarchy: Hierarchy,
    term_order: Vec<TermId>,
    closure: Vec<Vec<TermId>>,
    gene_names: Vec<String>,
    gene_index: HashMap<String, GeneId>,
    terms_by_gene: Vec<Vec<TermId>>,
    genes_by_term: Vec<Vec<GeneId>>,
    missing_terms: BTreeSet<String>,
    total_associations: usize,
    class_of_term: Vec<ClassId>,
    class_members: Vec<Vec<TermId>>,
}

impl AssociationIndex {
    /// Build the index from annotation records.
    ///
    /// Negated records are skipped. Records naming a term that is absent
    /// from the hierarchy are dropped and remembered in
    /// [`missing_terms`](Self::missing_terms); the gene itself is still
    /// registered.
    ///
    /// # Errors
    ///
    /// Returns [`GenesieveError::CyclicGraph`] if the hierarchy cannot be
    /// topologically sorted.
    pub fn build<I>(hierarchy: Hierarchy, annotations: I) -> Result<Self>
    where
        I: IntoIterator<Item = Annotation>,
    {
        let term_order = hierarchy.toposort()?;
        let closure = hierarchy.closure_in_order(&term_order);

        let mut gene_names = Vec::new();
        let mut gene_index: HashMap<String, GeneId> = HashMap::new();
        let mut term_sets: Vec<BTreeSet<TermId>> = Vec::new();
        let mut missing_terms = BTreeSet::new();
        let mut total_associations = 0;

        for annotation in annotations {
            if annotation.is_negated() {
                continue;
            }
            let gene = match gene_index.get(&annotation.gene) {
                Some(&g) => g,
                None => {
                    let g = gene_names.len();
                    gene_index.insert(annotation.gene.clone(), g);
                    gene_names.push(annotation.gene);
                    term_sets.push(BTreeSet::new());
                    g
                }
            };
            match hierarchy.term_id(&annotation.term) {
                Some(term) => {
                    term_sets[gene].extend(closure[term].iter().copied());
                    total_associations += closure[term].len();
                }
                None => {
                    missing_terms.insert(annotation.term);
                }
            }
        }

        let terms_by_gene: Vec<Vec<TermId>> =
            term_sets.into_iter().map(|s| s.into_iter().collect()).collect();
        let mut genes_by_term: Vec<Vec<GeneId>> = vec![Vec::new(); hierarchy.len()];
        for (gene, terms) in terms_by_gene.iter().enumerate() {
            for &term in terms {
                genes_by_term[term].push(gene);
            }
        }

        if !missing_terms.is_empty() {
            let preview: Vec<&str> = missing_terms.iter().take(10).map(String::as_str).collect();
            warn!(
                count = missing_terms.len(),
                "terms not found in the hierarchy, associations dropped: {}",
                preview.join(", ")
            );
        }

        let (class_of_term, class_members) = equivalence_classes(&term_order, &genes_by_term);

        let index = Self {
            hierarchy,
            term_order,
            closure,
            gene_names,
            gene_index,
            terms_by_gene,
            genes_by_term,
            missing_terms,
            total_associations,
            class_of_term,
            class_members,
        };
        debug!(
            genes = index.genes(),
            associations = index.total_associations,
            classes = index.class_members.len(),
            "built association index"
        );
        Ok(index)
    }

    /// The hierarchy this index was built over.
    pub fn hierarchy(&self) -> &Hierarchy {
        &self.hierarchy
    }

    /// Topological order of the hierarchy (parents first).
    pub fn term_order(&self) -> &[TermId] {
        &self.term_order
    }

    /// Sorted ancestor closure of `term`, including `term` itself.
    pub fn closure(&self, term: TermId) -> &[TermId] {
        &self.closure[term]
    }

    /// Number of genes with at least one asserted annotation.
    pub fn genes(&self) -> usize {
        self.gene_names.len()
    }

    /// Number of terms in the hierarchy.
    pub fn terms(&self) -> usize {
        self.hierarchy.len()
    }

    pub fn gene_id(&self, name: &str) -> Option<GeneId> {
        self.gene_index.get(name).copied()
    }

    /// # Panics
    ///
    /// Panics if `gene` is out of range.
    pub fn gene_name(&self, gene: GeneId) -> &str {
        &self.gene_names[gene]
    }

    pub fn gene_names(&self) -> &[String] {
        &self.gene_names
    }

    /// Sorted, closure-complete terms annotating `gene`.
    pub fn terms_by_gene(&self, gene: GeneId) -> &[TermId] {
        &self.terms_by_gene[gene]
    }

    /// Sorted genes annotated (directly or by inheritance) to `term`.
    pub fn genes_by_term(&self, term: TermId) -> &[GeneId] {
        &self.genes_by_term[term]
    }

    pub fn gene_has_term(&self, gene: GeneId, term: TermId) -> bool {
        self.terms_by_gene[gene].binary_search(&term).is_ok()
    }

    /// Annotation terms that were absent from the hierarchy.
    pub fn missing_terms(&self) -> &BTreeSet<String> {
        &self.missing_terms
    }

    /// Sum of the closure sizes of every applied annotation.
    ///
    /// Implied ancestors are counted, and so are repeated records.
    pub fn total_associations(&self) -> usize {
        self.total_associations
    }

    /// Equivalence class containing `term`.
    pub fn equivalence_class(&self, term: TermId) -> ClassId {
        self.class_of_term[term]
    }

    /// Members of class `class`, exemplar first.
    pub fn class_members(&self, class: ClassId) -> &[TermId] {
        &self.class_members[class]
    }

    pub fn equivalence_classes(&self) -> usize {
        self.class_members.len()
    }

    /// The designated representative of `term`'s equivalence class.
    pub fn exemplar(&self, term: TermId) -> TermId {
        self.class_members[self.class_of_term[term]][0]
    }

    pub fn is_exemplar(&self, term: TermId) -> bool {
        self.exemplar(term) == term
    }

    /// Terms that annotate at least one gene and represent their class.
    pub fn relevant_terms(&self) -> Vec<TermId> {
        (0..self.terms())
            .filter(|&t| !self.genes_by_term[t].is_empty() && self.is_exemplar(t))
            .collect()
    }

    /// Split `names` into resolved gene ids and unknown names.
    ///
    /// Duplicate names resolve once; both outputs keep first-seen order.
    pub fn validate_gene_names<S: AsRef<str>>(&self, names: &[S]) -> (Vec<GeneId>, Vec<String>) {
        let mut seen = BTreeSet::new();
        let mut resolved = Vec::new();
        let mut missing = Vec::new();
        for name in names {
            let name = name.as_ref();
            match self.gene_id(name) {
                Some(g) => {
                    if seen.insert(g) {
                        resolved.push(g);
                    }
                }
                None => {
                    if !missing.iter().any(|m| m == name) {
                        missing.push(name.to_string());
                    }
                }
            }
        }
        (resolved, missing)
    }

    /// Resolve every name in `names`.
    ///
    /// # Errors
    ///
    /// Returns [`GenesieveError::UnknownQueryGenes`] listing every name that
    /// could not be resolved.
    pub fn resolve_gene_names<S: AsRef<str>>(&self, names: &[S]) -> Result<Vec<GeneId>> {
        let (resolved, missing) = self.validate_gene_names(names);
        if !missing.is_empty() {
            return Err(GenesieveError::UnknownQueryGenes(missing));
        }
        Ok(resolved)
    }

    /// Hypergeometric upper-tail p-value of every term against `gene_subset`.
    ///
    /// Entry `t` is `P(X >= k)` for a term annotating `nPresent` of all genes,
    /// `k` of them inside the (deduplicated) subset.
    ///
    /// # Errors
    ///
    /// Returns an error if a gene id is out of range.
    pub fn hypergeometric_all(&self, gene_subset: &[GeneId]) -> Result<Vec<f64>> {
        let subset: BTreeSet<GeneId> = gene_subset.iter().copied().collect();
        if let Some(&g) = subset.iter().next_back() {
            if g >= self.genes() {
                return Err(GenesieveError::InvalidInput(format!(
                    "gene index {} out of range ({} genes)",
                    g,
                    self.genes()
                )));
            }
        }

        let mut overlap = vec![0usize; self.terms()];
        for &g in &subset {
            for &t in &self.terms_by_gene[g] {
                overlap[t] += 1;
            }
        }

        let n = self.genes();
        let n_in_set = subset.len();
        Ok((0..self.terms())
            .map(|t| hypergeometric_upper_tail(overlap[t], n_in_set, self.genes_by_term[t].len(), n))
            .collect())
    }

    /// Terms whose hypergeometric p-value is at most `p_value_threshold`.
    pub fn hypergeometric_p_values(
        &self,
        gene_subset: &[GeneId],
        p_value_threshold: f64,
    ) -> Result<BTreeMap<TermId, f64>> {
        Ok(self
            .hypergeometric_all(gene_subset)?
            .into_iter()
            .enumerate()
            .filter(|&(_, p)| p <= p_value_threshold)
            .collect())
    }

    /// The closure-complete relation as `(gene, term)` name pairs, by gene then term id.
    pub fn to_gene_term_pairs(&self) -> Vec<(String, String)> {
        self.terms_by_gene
            .iter()
            .enumerate()
            .flat_map(|(g, terms)| {
                terms.iter().map(move |&t| {
                    (
                        self.gene_names[g].clone(),
                        self.hierarchy.term_name(t).to_string(),
                    )
                })
            })
            .collect()
    }
}

impl Summarizable for AssociationIndex {
    fn summary(&self) -> String {
        format!(
            "AssociationIndex: {} associations, {} genes, {} relevant terms",
            self.total_associations,
            self.genes(),
            self.relevant_terms().len()
        )
    }
}

/// Group terms with identical gene lists, visiting terms most-specific first.
fn equivalence_classes(
    term_order: &[TermId],
    genes_by_term: &[Vec<GeneId>],
) -> (Vec<ClassId>, Vec<Vec<TermId>>) {
    let mut class_of_term = vec![0; genes_by_term.len()];
    let mut class_members: Vec<Vec<TermId>> = Vec::new();
    let mut class_by_genes: HashMap<&[GeneId], ClassId> = HashMap::new();
    for &term in term_order.iter().rev() {
        let genes = genes_by_term[term].as_slice();
        let class = *class_by_genes.entry(genes).or_insert_with(|| {
            class_members.push(Vec::new());
            class_members.len() - 1
        });
        class_members[class].push(term);
        class_of_term[term] = class;
    }
    (class_of_term, class_members)
}
