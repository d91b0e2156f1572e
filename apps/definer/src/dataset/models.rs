use std::fmt;

use serde::Deserialize;

/// A row exactly as it appears in the input CSV. Every column is optional at
/// this stage; rows lacking a term or identifier are dropped by the loader.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawRow {
    #[serde(default)]
    pub legislation_term: Option<String>,
    #[serde(default)]
    pub legislation_id: Option<String>,
    #[serde(default)]
    pub section_text: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub para_id: Option<String>,
    #[serde(default)]
    pub paragraphs: Option<String>,
    #[serde(default)]
    pub case_term: Option<String>,
}

/// One groupable input record: a term cited in a piece of legislation,
/// optionally paired with one case-law paragraph that uses it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TermRow {
    pub legislation_term: String,
    pub legislation_id: String,
    pub section_text: Option<String>,
    pub url: Option<String>,
    pub para_id: Option<String>,
    pub paragraphs: Option<String>,
    pub case_term: Option<String>,
}

impl TermRow {
    /// Promotes a raw row, or returns `None` when the term or identifier is blank.
    pub fn from_raw(raw: RawRow) -> Option<Self> {
        let legislation_term = present(raw.legislation_term)?;
        let legislation_id = present(raw.legislation_id)?;
        Some(TermRow {
            legislation_term,
            legislation_id,
            section_text: present(raw.section_text),
            url: present(raw.url),
            para_id: present(raw.para_id),
            paragraphs: present(raw.paragraphs),
            case_term: present(raw.case_term),
        })
    }

    pub fn key(&self) -> GroupKey {
        GroupKey {
            term: self.legislation_term.clone(),
            legislation_id: self.legislation_id.clone(),
        }
    }
}

/// Empty cells count as missing values.
fn present(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GroupKey {
    pub term: String,
    pub legislation_id: String,
}

impl fmt::Display for GroupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.term, self.legislation_id)
    }
}

/// Every row sharing one (term, legislation identifier) pair, in input order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TermGroup {
    pub key: GroupKey,
    pub rows: Vec<TermRow>,
}

impl TermGroup {
    pub fn term(&self) -> &str {
        &self.key.term
    }

    pub fn legislation_id(&self) -> &str {
        &self.key.legislation_id
    }
}
