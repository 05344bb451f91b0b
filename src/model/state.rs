//! Pipeline state: everything one session has produced so far.

use std::collections::{BTreeMap, VecDeque};

use jiff::Timestamp;
use serde::{Deserialize, Serialize};

/// Output of one generation stage as stored in the session.
///
/// A failed stage still leaves a display-safe message behind, but only
/// `Produced` counts as an artifact for downstream preconditions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "text", rename_all = "camelCase")]
pub enum Artifact {
    /// The stage succeeded and this is its (possibly extracted) output.
    Produced(String),

    /// The stage failed after all attempts; this is the message to show.
    Failed(String),
}

impl Artifact {
    /// The text to display, whichever way the stage went.
    pub fn text(&self) -> &str {
        match self {
            Self::Produced(text) | Self::Failed(text) => text,
        }
    }

    /// The produced output, or `None` if the stage failed.
    pub fn produced(&self) -> Option<&str> {
        match self {
            Self::Produced(text) => Some(text),
            Self::Failed(_) => None,
        }
    }
}

/// Where the single-round clarification gate stands for the current input.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "camelCase")]
pub enum Clarification {
    /// No round has run for the current input.
    #[default]
    Unresolved,

    /// The clarification stage asked a question; the pipeline is halted until it is answered.
    Pending { question: String },

    /// The stage reported clear input, or the user answered the question.
    Resolved,
}

/// Coarse position of a session in the orchestration sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Nothing submitted yet.
    AwaitingInput,

    /// Input submitted but the gate has not run (or was dismissed).
    Clarifying,

    /// Halted on an unanswered clarification question.
    ClarificationPending,

    /// Gate resolved; generation stages may run.
    Generating,

    /// A code artifact exists for the current input.
    Done,
}

/// A snapshot of generated code, kept so earlier versions can be inspected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CodeVersion {
    pub saved_at: Timestamp,
    pub code: String,
    pub description: String,
    pub prompt: String,
}

/// Per-session mutable record of inputs and generated artifacts.
///
/// Owned by exactly one session and passed by `&mut` into every pipeline
/// operation. Each field is overwritten only by the operation that produces it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PipelineState {
    /// Raw text of the last submitted input.
    pub input: Option<String>,

    /// The input after language normalization (equal to `input` when skipped or failed).
    pub normalized: Option<String>,

    pub code: Option<Artifact>,
    pub flowchart: Option<Artifact>,
    pub hmi: Option<Artifact>,
    pub validation_report: Option<Artifact>,
    pub simulation_report: Option<Artifact>,

    /// Bounded log of what happened in this session, oldest first.
    pub history: VecDeque<String>,

    pub clarification: Clarification,

    /// Answers recorded by the clarification round, keyed by topic.
    pub answers: BTreeMap<String, String>,

    pub versions: Vec<CodeVersion>,
}

impl PipelineState {
    /// Where this session stands in the orchestration sequence.
    pub fn phase(&self) -> Phase {
        if self.input.is_none() {
            return Phase::AwaitingInput;
        }
        match self.clarification {
            Clarification::Unresolved => Phase::Clarifying,
            Clarification::Pending { .. } => Phase::ClarificationPending,
            Clarification::Resolved => {
                if self.produced_code().is_some() {
                    Phase::Done
                } else {
                    Phase::Generating
                }
            }
        }
    }

    /// The current code artifact, if code generation succeeded.
    pub fn produced_code(&self) -> Option<&str> {
        self.code.as_ref().and_then(Artifact::produced)
    }

    /// The pending clarification question, if the pipeline is halted on one.
    pub fn pending_question(&self) -> Option<&str> {
        match &self.clarification {
            Clarification::Pending { question } => Some(question),
            _ => None,
        }
    }

    /// Append to the conversation log, dropping the oldest entries past `limit`.
    pub fn record(&mut self, entry: impl Into<String>, limit: usize) {
        self.history.push_back(entry.into());
        while self.history.len() > limit {
            self.history.pop_front();
        }
    }

    /// The most recent `n` log entries, oldest first.
    pub fn recent_history(&self, n: usize) -> impl Iterator<Item = &String> {
        self.history.iter().skip(self.history.len().saturating_sub(n))
    }

    /// Clear everything; the session starts over.
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_state_awaits_input() {
        let state = PipelineState::default();
        assert_eq!(state.phase(), Phase::AwaitingInput);
        assert!(state.produced_code().is_none());
    }

    #[test]
    fn phase_follows_clarification_and_code() {
        let mut state = PipelineState {
            input: Some("start the pump".into()),
            ..PipelineState::default()
        };
        assert_eq!(state.phase(), Phase::Clarifying);

        state.clarification = Clarification::Pending {
            question: "Which pump?".into(),
        };
        assert_eq!(state.phase(), Phase::ClarificationPending);
        assert_eq!(state.pending_question(), Some("Which pump?"));

        state.clarification = Clarification::Resolved;
        assert_eq!(state.phase(), Phase::Generating);

        state.code = Some(Artifact::Failed("Error in Code generation: boom".into()));
        assert_eq!(state.phase(), Phase::Generating);

        state.code = Some(Artifact::Produced("PROGRAM Main END_PROGRAM".into()));
        assert_eq!(state.phase(), Phase::Done);
    }

    #[test]
    fn history_is_bounded() {
        let mut state = PipelineState::default();
        for i in 0..5 {
            state.record(format!("entry {i}"), 3);
        }
        let entries: Vec<&str> = state.history.iter().map(String::as_str).collect();
        assert_eq!(entries, ["entry 2", "entry 3", "entry 4"]);

        let recent: Vec<&String> = state.recent_history(2).collect();
        assert_eq!(recent, ["entry 3", "entry 4"]);
    }

    #[test]
    fn reset_clears_everything() {
        let mut state = PipelineState {
            input: Some("x".into()),
            code: Some(Artifact::Produced("code".into())),
            clarification: Clarification::Resolved,
            ..PipelineState::default()
        };
        state.answers.insert("clarification".into(), "tank 2".into());
        state.reset();
        assert_eq!(state, PipelineState::default());
    }

    #[test]
    fn artifact_round_trips_through_json() {
        let artifact = Artifact::Failed("Error in HMI generation: timeout".into());
        let json = serde_json::to_string(&artifact).unwrap();
        assert!(json.contains("\"status\":\"failed\""));
        let back: Artifact = serde_json::from_str(&json).unwrap();
        assert_eq!(back, artifact);
    }
}
