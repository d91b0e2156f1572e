//! The external prompt template.
//!
//! Loaded once at startup and parsed up front so that a typo in a placeholder
//! aborts the run before any API call is made. Syntax: `{name}` substitutes a
//! field, `{{` and `}}` produce literal braces.

use std::path::Path;

use thiserror::Error;
use tracing::{info, warn};

use crate::errors::AppError;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TemplateError {
    #[error("unknown placeholder '{{{name}}}' at byte {offset}")]
    UnknownPlaceholder { name: String, offset: usize },

    #[error("unclosed '{{' at byte {offset}")]
    Unclosed { offset: usize },

    #[error("unmatched '}}' at byte {offset}")]
    UnmatchedClose { offset: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    LegislationTerm,
    LegislationId,
    SectionText,
    CaseLawParagraphs,
    CaseTerms,
}

impl Field {
    pub const ALL: [Field; 5] = [
        Field::LegislationTerm,
        Field::LegislationId,
        Field::SectionText,
        Field::CaseLawParagraphs,
        Field::CaseTerms,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Field::LegislationTerm => "legislation_term",
            Field::LegislationId => "legislation_id",
            Field::SectionText => "section_text",
            Field::CaseLawParagraphs => "case_law_paragraphs",
            Field::CaseTerms => "case_terms",
        }
    }

    fn from_name(name: &str) -> Option<Self> {
        Field::ALL.into_iter().find(|f| f.name() == name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Field(Field),
}

/// Values substituted into the template for one group.
#[derive(Debug, Clone, Copy)]
pub struct PromptFields<'a> {
    pub legislation_term: &'a str,
    pub legislation_id: &'a str,
    pub section_text: &'a str,
    pub case_law_paragraphs: &'a str,
    pub case_terms: &'a str,
}

impl PromptFields<'_> {
    fn get(&self, field: Field) -> &str {
        match field {
            Field::LegislationTerm => self.legislation_term,
            Field::LegislationId => self.legislation_id,
            Field::SectionText => self.section_text,
            Field::CaseLawParagraphs => self.case_law_paragraphs,
            Field::CaseTerms => self.case_terms,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptTemplate {
    segments: Vec<Segment>,
}

impl PromptTemplate {
    /// Reads and parses the template file. Both a missing file and a malformed
    /// template are fatal.
    pub fn load(path: &Path) -> Result<Self, AppError> {
        let source = std::fs::read_to_string(path).map_err(|e| AppError::read(path, e))?;
        let template = Self::parse(&source).map_err(|source| AppError::Template {
            path: path.to_path_buf(),
            source,
        })?;

        for field in template.missing_fields() {
            warn!(
                "Prompt template does not use {{{}}}; that value will not reach the model",
                field.name()
            );
        }
        info!("Prompt template loaded from {}", path.display());
        Ok(template)
    }

    pub fn parse(source: &str) -> Result<Self, TemplateError> {
        let mut segments = Vec::new();
        let mut literal = String::new();
        let mut chars = source.char_indices().peekable();

        while let Some((offset, c)) = chars.next() {
            match c {
                '{' if matches!(chars.peek(), Some((_, '{'))) => {
                    chars.next();
                    literal.push('{');
                }
                '}' if matches!(chars.peek(), Some((_, '}'))) => {
                    chars.next();
                    literal.push('}');
                }
                '{' => {
                    let rest = &source[offset + 1..];
                    let end = rest.find('}').ok_or(TemplateError::Unclosed { offset })?;
                    let name = &rest[..end];
                    let field = Field::from_name(name).ok_or_else(|| {
                        TemplateError::UnknownPlaceholder {
                            name: name.to_string(),
                            offset,
                        }
                    })?;
                    if !literal.is_empty() {
                        segments.push(Segment::Literal(std::mem::take(&mut literal)));
                    }
                    segments.push(Segment::Field(field));
                    // Skip the name and the closing brace.
                    for _ in 0..name.chars().count() + 1 {
                        chars.next();
                    }
                }
                '}' => return Err(TemplateError::UnmatchedClose { offset }),
                _ => literal.push(c),
            }
        }

        if !literal.is_empty() {
            segments.push(Segment::Literal(literal));
        }
        Ok(Self { segments })
    }

    /// Substitutes every placeholder in a single pass; substituted values are
    /// never scanned for placeholders themselves.
    pub fn render(&self, fields: &PromptFields<'_>) -> String {
        let mut out = String::new();
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => out.push_str(text),
                Segment::Field(field) => out.push_str(fields.get(*field)),
            }
        }
        out
    }

    pub fn missing_fields(&self) -> Vec<Field> {
        Field::ALL
            .into_iter()
            .filter(|f| !self.segments.contains(&Segment::Field(*f)))
            .collect()
    }
}
