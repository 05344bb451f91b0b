//! Output formatting for CLI display.

use std::fmt::Write;

use crate::{
    model::{CodeVersion, Phase, PipelineState},
    pipeline::Outcome,
};

pub(super) fn format_phase(phase: Phase) -> &'static str {
    match phase {
        Phase::AwaitingInput => "awaiting input",
        Phase::Clarifying => "clarifying",
        Phase::ClarificationPending => "question pending",
        Phase::Generating => "ready to generate",
        Phase::Done => "code ready",
    }
}

/// Render an outcome for stderr. Empty for a quiet success.
pub(super) fn format_outcome(outcome: &Outcome, short_id: &str) -> String {
    let mut out = String::new();
    match outcome {
        Outcome::Completed { notices } => {
            for notice in notices {
                let _ = writeln!(out, "{notice}");
            }
        }
        Outcome::ClarificationNeeded { question } => {
            let _ = writeln!(out, "Clarification needed: {question}");
            let _ = writeln!(
                out,
                "Answer with: plcgen --session {short_id} answer \"...\""
            );
        }
        Outcome::Warning(message) => {
            let _ = writeln!(out, "Warning: {message}");
        }
    }
    out
}

pub(super) fn format_history(state: &PipelineState) -> String {
    if state.history.is_empty() {
        return "No history".to_string();
    }
    state
        .history
        .iter()
        .map(String::as_str)
        .collect::<Vec<_>>()
        .join("\n")
}

pub(super) fn format_versions(versions: &[CodeVersion]) -> String {
    if versions.is_empty() {
        return "No saved versions".to_string();
    }
    versions
        .iter()
        .enumerate()
        .map(|(i, v)| {
            let lines = v.code.lines().count();
            format!(
                "{}  {}  {}  ({lines} lines)",
                i + 1,
                v.saved_at.strftime("%Y-%m-%d %H:%M:%S"),
                v.description
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}
