//! Run Orchestrator — drives one batch from input file to output file.
//!
//! Flow: load template → load rows → group → for each group
//!       (build prompt → generate → record, checkpoint every N) → write output.
//!
//! Groups are processed strictly one at a time. A failed API call costs one
//! placeholder record, never the run.

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use tracing::{error, info, info_span, warn, Instrument};

use crate::config::Config;
use crate::dataset::grouping::group_rows;
use crate::dataset::loader::load_rows;
use crate::dataset::models::TermGroup;
use crate::definitions::output::{checkpoint_path, write_records, DefinitionRecord};
use crate::definitions::prompt_builder::build_prompt;
use crate::definitions::template::PromptTemplate;
use crate::errors::AppError;
use crate::llm_client::DefinitionGenerator;

/// Recorded in place of a definition when generation fails for a group.
pub const ERROR_PLACEHOLDER: &str = "Error: Could not generate definition";

const RESPONSE_PREVIEW_CHARS: usize = 200;
const PROMPT_PREVIEW_CHARS: usize = 500;
const AUDIT_RULE_WIDTH: usize = 80;

// ────────────────────────────────────────────────────────────────────────────
// Settings and results
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSettings {
    pub output_path: PathBuf,
    pub checkpoint_dir: PathBuf,
    /// Checkpoint after every N processed groups. Must be at least 1.
    pub checkpoint_every: usize,
    /// Fixed pause between consecutive groups.
    pub delay: Duration,
    /// `None` processes every group; `Some(k)` only the first `k`.
    pub max_groups: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    /// Groups found in the input, before `max_groups` is applied.
    pub total_groups: usize,
    pub processed: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub checkpoints: Vec<PathBuf>,
    pub output_path: PathBuf,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunPhase {
    Init,
    Loading,
    Grouping,
    Processing,
    Finalizing,
    Done,
}

impl fmt::Display for RunPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RunPhase::Init => "init",
            RunPhase::Loading => "loading",
            RunPhase::Grouping => "grouping",
            RunPhase::Processing => "processing",
            RunPhase::Finalizing => "finalizing",
            RunPhase::Done => "done",
        };
        f.write_str(name)
    }
}

fn enter(phase: RunPhase) {
    info!("Run phase: {phase}");
}

// ────────────────────────────────────────────────────────────────────────────
// Pipeline
// ────────────────────────────────────────────────────────────────────────────

/// Runs the whole batch described by `config`.
///
/// Template and input failures abort before any API call; per-group API
/// failures never abort.
pub async fn run(
    config: &Config,
    generator: &dyn DefinitionGenerator,
) -> Result<RunSummary, AppError> {
    enter(RunPhase::Init);
    info!("Starting definition generation process...");

    enter(RunPhase::Loading);
    let template = PromptTemplate::load(&config.template_path)?;
    let dataset = load_rows(&config.input_path)?;
    info!(
        "Input decoded as {}; {} rows kept, {} rows skipped",
        dataset.encoding,
        dataset.rows.len(),
        dataset.skipped_rows
    );

    enter(RunPhase::Grouping);
    info!("Grouping by legislation_term and legislation_id...");
    let groups = group_rows(dataset.rows, config.group_order);
    info!(
        "Found {} unique combinations of legislation_term and legislation_id",
        groups.len()
    );

    process_groups(&groups, &template, generator, &config.run).await
}

/// Processes (up to `max_groups` of) `groups` in order and writes the output table.
pub async fn process_groups(
    groups: &[TermGroup],
    template: &PromptTemplate,
    generator: &dyn DefinitionGenerator,
    settings: &RunSettings,
) -> Result<RunSummary, AppError> {
    enter(RunPhase::Processing);

    let total_groups = groups.len();
    let selected = match settings.max_groups {
        Some(limit) if limit < total_groups => {
            info!(
                "max_groups={} limits this run to the first {} of {} groups",
                limit, limit, total_groups
            );
            &groups[..limit]
        }
        _ => groups,
    };

    let mut records: Vec<DefinitionRecord> = Vec::with_capacity(selected.len());
    let mut checkpoints = Vec::new();

    for (index, group) in selected.iter().enumerate() {
        if index > 0 && !settings.delay.is_zero() {
            tokio::time::sleep(settings.delay).await;
        }

        let processed = index + 1;
        info!("Processing group {}/{}", processed, total_groups);

        let span = info_span!("group", term = %group.term(), id = %group.legislation_id());
        let definition = process_group(group, template, generator)
            .instrument(span)
            .await;

        records.push(DefinitionRecord {
            legislation_id: group.legislation_id().to_string(),
            legislation_term: group.term().to_string(),
            legislation_term_definition: definition,
        });

        if processed % settings.checkpoint_every == 0 {
            let path = checkpoint_path(&settings.checkpoint_dir, processed);
            match write_records(&path, &records) {
                Ok(()) => {
                    info!("Saved intermediate results to {}", path.display());
                    checkpoints.push(path);
                }
                // The final write still covers these records.
                Err(e) => error!("Failed to write checkpoint: {e}"),
            }
        }
    }

    enter(RunPhase::Finalizing);
    write_records(&settings.output_path, &records)?;
    info!("Completed! Results saved to {}", settings.output_path.display());

    let failed = count_placeholders(&records);
    let summary = RunSummary {
        total_groups,
        processed: records.len(),
        succeeded: records.len() - failed,
        failed,
        checkpoints,
        output_path: settings.output_path.clone(),
    };
    info!("Total definitions generated: {}", summary.processed);
    info!("Successful definitions: {}", summary.succeeded);
    info!("Failed definitions: {}", summary.failed);

    enter(RunPhase::Done);
    Ok(summary)
}

/// Builds the prompt for one group and asks the generator for a definition.
/// Always yields text: the definition, or `ERROR_PLACEHOLDER`.
async fn process_group(
    group: &TermGroup,
    template: &PromptTemplate,
    generator: &dyn DefinitionGenerator,
) -> String {
    info!("Processing: {}", group.key);

    let prompt = build_prompt(template, group);
    info!("Prompt length: {} characters", prompt.text.chars().count());
    info!(
        "Number of case law paragraphs: {} ({} rows in group)",
        prompt.case_law_blocks,
        group.rows.len()
    );

    let definition = match generator.generate(&prompt.text).await {
        Ok(definition) => definition,
        Err(e) => {
            error!("Failed to get definition for {}: {e}", group.key);
            return ERROR_PLACEHOLDER.to_string();
        }
    };

    if definition.is_empty() {
        warn!("Empty definition returned for {}", group.key);
        return ERROR_PLACEHOLDER.to_string();
    }

    info!(
        "Definition received (length: {} characters)",
        definition.chars().count()
    );
    info!("Response preview: {}...", preview(&definition, RESPONSE_PREVIEW_CHARS));

    let rule = "=".repeat(AUDIT_RULE_WIDTH);
    info!(
        "\n{rule}\nLegislation Term: {}\nLegislation ID: {}\n\nPrompt:\n{}...\n\nResponse:\n{}\n{rule}\n",
        group.term(),
        group.legislation_id(),
        preview(&prompt.text, PROMPT_PREVIEW_CHARS),
        definition
    );

    definition
}

/// Records counted as failures: those carrying the placeholder text.
pub fn count_placeholders(records: &[DefinitionRecord]) -> usize {
    records
        .iter()
        .filter(|r| r.legislation_term_definition.contains(ERROR_PLACEHOLDER))
        .count()
}

fn preview(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────
