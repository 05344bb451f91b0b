//! Prompt assembly for each stage.

use crate::{analysis::InputAnalysis, model::PipelineState};

/// Log entries carried into generation prompts.
const RECENT_HISTORY: usize = 4;

pub(super) fn clarification(normalized: &str, analysis: &InputAnalysis) -> String {
    format!("User input: {normalized}\n\nInput analysis: {analysis}")
}

/// The generation prompt: the requirement, recent conversation, recorded
/// answers, and reference context when there is any.
///
/// An empty `context` leaves the reference section out entirely.
pub(super) fn generation(normalized: &str, state: &PipelineState, context: &str) -> String {
    let mut prompt = normalized.to_string();

    let recent: Vec<&str> = state
        .recent_history(RECENT_HISTORY)
        .map(String::as_str)
        .collect();
    if !recent.is_empty() {
        prompt.push_str("\n\nPrevious conversation:\n");
        prompt.push_str(&recent.join("\n"));
    }

    if !state.answers.is_empty() {
        let answers: Vec<String> = state
            .answers
            .iter()
            .map(|(key, value)| format!("- {key}: {value}"))
            .collect();
        prompt.push_str("\n\nAdditional context:\n");
        prompt.push_str(&answers.join("\n"));
    }

    if !context.is_empty() {
        prompt.push_str("\n\nReference Context (from KB):\n");
        prompt.push_str(context);
    }

    prompt
}

pub(super) fn simulation(requirements: &str, code: &str) -> String {
    format!(
        "Requirements (for context): {requirements}\n\
         Code under test:\n```st\n{code}\n```\n\
         Create a table of test scenarios covering normal operation, thresholds, edge cases and failure modes."
    )
}

pub(super) fn refinement(code: &str, request: &str) -> String {
    format!("Original code:\n{code}\n\nRefinement request: {request}")
}
