//! Prompt Builder — turns one (term, legislation) group into prompt text.

use tracing::warn;

use crate::dataset::models::TermGroup;
use crate::definitions::template::{PromptFields, PromptTemplate};

/// Substituted for `{case_terms}` when no row in the group carries a case term.
pub const NO_CASE_TERMS: &str = "None identified";

const UNKNOWN_URL: &str = "Unknown URL";
const UNKNOWN_PARA_ID: &str = "Unknown";
const CASE_LAW_SEPARATOR: &str = "\n---\n\n";

/// A rendered prompt plus the counts worth logging before it is sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuiltPrompt {
    pub text: String,
    pub case_law_blocks: usize,
}

pub fn build_prompt(template: &PromptTemplate, group: &TermGroup) -> BuiltPrompt {
    let section_text = statutory_text(group);
    let (case_law_paragraphs, case_law_blocks) = format_case_law(group);
    let case_terms = case_terms(group);

    let text = template.render(&PromptFields {
        legislation_term: group.term(),
        legislation_id: group.legislation_id(),
        section_text,
        case_law_paragraphs: &case_law_paragraphs,
        case_terms: &case_terms,
    });

    BuiltPrompt {
        text,
        case_law_blocks,
    }
}

/// The first non-blank `section_text` in the group, or `""`.
///
/// Rows of one group are expected to quote the same section. When they do
/// not, the first value still wins and the disagreement is only logged.
pub fn statutory_text(group: &TermGroup) -> &str {
    let mut texts = group
        .rows
        .iter()
        .filter_map(|r| r.section_text.as_deref())
        .filter(|t| !t.trim().is_empty());

    let Some(first) = texts.next() else {
        return "";
    };
    if texts.any(|t| t != first) {
        warn!(
            "Conflicting section_text values for {}; using the first one",
            group.key
        );
    }
    first
}

/// Formats each row with a non-blank paragraph as a citation block.
/// Returns the joined text and the number of blocks emitted.
pub fn format_case_law(group: &TermGroup) -> (String, usize) {
    let blocks: Vec<String> = group
        .rows
        .iter()
        .filter_map(|row| {
            let paragraph = row.paragraphs.as_deref()?;
            if paragraph.trim().is_empty() {
                return None;
            }
            Some(format!(
                "Case Law: {} (Paragraph: {})\n{}\n",
                row.url.as_deref().unwrap_or(UNKNOWN_URL),
                row.para_id.as_deref().unwrap_or(UNKNOWN_PARA_ID),
                paragraph
            ))
        })
        .collect();

    let count = blocks.len();
    (blocks.join(CASE_LAW_SEPARATOR), count)
}

/// Distinct non-blank case terms in first-occurrence order, comma separated.
pub fn case_terms(group: &TermGroup) -> String {
    let mut distinct: Vec<&str> = Vec::new();
    for term in group.rows.iter().filter_map(|r| r.case_term.as_deref()) {
        if !term.trim().is_empty() && !distinct.contains(&term) {
            distinct.push(term);
        }
    }

    if distinct.is_empty() {
        NO_CASE_TERMS.to_string()
    } else {
        distinct.join(", ")
    }
}
