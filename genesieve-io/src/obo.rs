//! OBO ontology parser.
//!
//! Only `[Term]` stanzas are read. Within a stanza the `id:`, `name:`,
//! `is_a:` and `relationship: part_of` tags are used; `is_a` and `part_of`
//! both become parent edges. A stanza carrying `is_obsolete: true` is
//! discarded entirely. Trailing `! comment` text after an identifier is
//! ignored.

use std::path::Path;

use genesieve_core::{GenesieveError, Result};
use genesieve_ontology::Hierarchy;
use tracing::debug;

/// One non-obsolete `[Term]` stanza.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OboTerm {
    pub id: String,
    pub name: String,
    /// Parent identifiers from `is_a` and `part_of`, in file order.
    pub parents: Vec<String>,
}

/// Parse an OBO file into its term stanzas.
pub fn parse_obo(path: impl AsRef<Path>) -> Result<Vec<OboTerm>> {
    let path = path.as_ref();
    let text = crate::read_to_string(path)?;
    parse_obo_text(&text, path)
}

/// Parse OBO text from a string.
pub fn parse_obo_str(text: &str) -> Result<Vec<OboTerm>> {
    parse_obo_text(text, Path::new("<string>"))
}

/// Parse an OBO file and build the term [`Hierarchy`] from it.
pub fn parse_obo_hierarchy(path: impl AsRef<Path>) -> Result<Hierarchy> {
    let terms = parse_obo(path)?;
    Ok(Hierarchy::build(terms.into_iter().map(|t| (t.id, t.parents))))
}

#[derive(Default)]
struct Stanza {
    is_term: bool,
    obsolete: bool,
    id: Option<String>,
    name: String,
    parents: Vec<String>,
}

impl Stanza {
    fn finish(self, terms: &mut Vec<OboTerm>) {
        if !self.is_term || self.obsolete {
            return;
        }
        if let Some(id) = self.id {
            terms.push(OboTerm {
                id,
                name: self.name,
                parents: self.parents,
            });
        }
    }
}

fn parse_obo_text(text: &str, path: &Path) -> Result<Vec<OboTerm>> {
    let mut terms = Vec::new();
    let mut stanza = Stanza::default();
    let mut obsolete = 0usize;

    for (i, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('!') {
            continue;
        }

        if line.starts_with('[') && line.ends_with(']') {
            if stanza.is_term && stanza.obsolete {
                obsolete += 1;
            }
            std::mem::take(&mut stanza).finish(&mut terms);
            stanza.is_term = line == "[Term]";
            continue;
        }
        if !stanza.is_term {
            continue;
        }

        let Some((tag, value)) = line.split_once(':') else {
            continue;
        };
        let value = value.trim();
        match tag {
            "id" => stanza.id = Some(identifier(value, tag, i + 1, path)?),
            "name" => stanza.name = value.to_string(),
            "is_a" => stanza.parents.push(identifier(value, tag, i + 1, path)?),
            "relationship" => {
                let mut fields = value.split_whitespace();
                if fields.next() == Some("part_of") {
                    let parent = fields.next().unwrap_or("");
                    stanza.parents.push(identifier(parent, tag, i + 1, path)?);
                }
            }
            "is_obsolete" => stanza.obsolete = value == "true",
            _ => {}
        }
    }
    if stanza.is_term && stanza.obsolete {
        obsolete += 1;
    }
    stanza.finish(&mut terms);

    debug!(
        terms = terms.len(),
        obsolete,
        source = %path.display(),
        "parsed OBO stanzas"
    );
    Ok(terms)
}

/// First whitespace-delimited token of a tag value.
fn identifier(value: &str, tag: &str, line_num: usize, path: &Path) -> Result<String> {
    match value.split_whitespace().next() {
        Some(id) if !id.starts_with('!') => Ok(id.to_string()),
        _ => Err(GenesieveError::Parse(format!(
            "{}: line {}: missing identifier after '{}:'",
            path.display(),
            line_num,
            tag
        ))),
    }
}
