//! Orchestration: drive one session's state through the generation stages.
//!
//! ```text
//! submit_input ─▶ (normalize) ─▶ clarify ──CLEAR_INPUT──▶ generate code / flowchart / hmi
//!                                   │                                │
//!                                   ▼                                ▼
//!                         ClarificationPending            validate_and_simulate
//!                                   │
//!                       answer_clarification (one round)
//! ```
//!
//! Every operation takes the session's `PipelineState` by `&mut` and
//! returns an `Outcome`. Nothing here fails: stage errors degrade the field
//! they would have filled, and bad input or missing preconditions come back
//! as warnings with the state untouched.

mod prompt;
mod stage;

use std::thread;

use jiff::Timestamp;
use tracing::{debug, info, warn};

use crate::{
    analysis::{analyze, check_requirements},
    generate::{StageResult, TextGenerator, code_or_text, first_fenced_block, run_stage},
    knowledge::{self, ChunkStore},
    model::{Artifact, Clarification, CodeVersion, PipelineState},
};

pub use stage::{CLEAR_MARKER, Stage};

const EMPTY_INPUT: &str = "Please enter some control logic.";
const NO_CODE: &str = "Please generate code first!";

/// Tunables for one pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Settings {
    /// Run the language normalization stage before clarification.
    pub multilingual: bool,

    /// Ground generation prompts with knowledge-base context.
    pub use_knowledge_base: bool,

    pub top_k: usize,
    pub max_attempts: u32,
    pub min_input_length: usize,
    pub history_limit: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            multilingual: true,
            use_knowledge_base: true,
            top_k: 4,
            max_attempts: 3,
            min_input_length: 10,
            history_limit: 50,
        }
    }
}

/// What an operation did, for the caller to show.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// The operation ran. `notices` carries suggestions and stage failures.
    Completed { notices: Vec<String> },

    /// The pipeline is halted on a clarification question.
    ClarificationNeeded { question: String },

    /// Bad input or an unmet precondition. The state was not changed.
    Warning(String),
}

impl Outcome {
    fn completed() -> Self {
        Self::Completed {
            notices: Vec::new(),
        }
    }
}

/// The orchestration sequence over a generator and an optional knowledge base.
pub struct Pipeline<'a> {
    generator: &'a dyn TextGenerator,
    knowledge: Option<&'a ChunkStore>,
    settings: Settings,
}

impl<'a> Pipeline<'a> {
    pub fn new(
        generator: &'a dyn TextGenerator,
        knowledge: Option<&'a ChunkStore>,
        settings: Settings,
    ) -> Self {
        Self {
            generator,
            knowledge,
            settings,
        }
    }

    // ── Input and clarification ──

    /// Accept a new requirement and run it up to the clarification gate.
    ///
    /// Empty or too-short input is a warning and changes nothing. A new
    /// requirement starts a fresh cycle: previous artifacts and answers are
    /// cleared and the gate runs again. Resubmitting the same requirement
    /// reuses its normalization and gate result.
    pub fn submit_input(&self, state: &mut PipelineState, text: &str) -> Outcome {
        let text = text.trim();
        if text.is_empty() {
            return Outcome::Warning(EMPTY_INPUT.to_string());
        }

        let check = check_requirements(text, self.settings.min_input_length);
        if !check.is_valid {
            return Outcome::Warning(check.warnings.join(" "));
        }
        let mut notices: Vec<String> = check
            .suggestions
            .iter()
            .map(|s| format!("Suggestion: {s}"))
            .collect();

        if state.input.as_deref() == Some(text) {
            if let Some(question) = state.pending_question() {
                return Outcome::ClarificationNeeded {
                    question: question.to_string(),
                };
            }
        } else {
            start_cycle(state);
            state.input = Some(text.to_string());
        }

        if state.normalized.is_none() {
            let normalized = self.normalize(text, &mut notices);
            state.normalized = Some(normalized);
        }

        match self.clarify(state, &mut notices) {
            Some(halt) => halt,
            None => Outcome::Completed { notices },
        }
    }

    /// Record the user's answer to the pending question and open the gate.
    ///
    /// One round only: the answer is not sent back for another review.
    pub fn answer_clarification(&self, state: &mut PipelineState, answer: &str) -> Outcome {
        let Some(question) = state.pending_question().map(str::to_string) else {
            return Outcome::Warning("No clarification is pending.".to_string());
        };
        let answer = answer.trim();
        if answer.is_empty() {
            return Outcome::Warning(
                "Please answer the clarification question to proceed.".to_string(),
            );
        }

        let limit = self.settings.history_limit;
        state
            .answers
            .insert("clarification".to_string(), answer.to_string());
        state.record(format!("Q: {question}"), limit);
        state.record(format!("A: {answer}"), limit);
        state.clarification = Clarification::Resolved;
        info!("clarification answered");

        Outcome::Completed {
            notices: vec!["Clarification received. You can now generate code.".to_string()],
        }
    }

    /// Drop the pending question without answering it.
    ///
    /// The gate goes back to unresolved, so the next generation asks again.
    pub fn dismiss_clarification(&self, state: &mut PipelineState) -> Outcome {
        if state.pending_question().is_none() {
            return Outcome::Warning("No clarification is pending.".to_string());
        }
        state.clarification = Clarification::Unresolved;
        Outcome::completed()
    }

    // ── Generation ──

    /// Generate Structured Text and store its first fenced block as the code artifact.
    pub fn generate_code(&self, state: &mut PipelineState) -> Outcome {
        let mut notices = Vec::new();
        let normalized = match self.ready_input(state, &mut notices) {
            Ok(normalized) => normalized,
            Err(halt) => return halt,
        };

        let prompt = self.grounded_prompt(state, &normalized);
        let result = self.run(Stage::Code, prompt);
        if result.success {
            let code = code_or_text(&result.text).to_string();
            state.versions.push(CodeVersion {
                saved_at: Timestamp::now(),
                code: code.clone(),
                description: "Generated from prompt".to_string(),
                prompt: normalized.clone(),
            });
            state.code = Some(Artifact::Produced(code));
            state.record(
                format!("Generated code for: {normalized}"),
                self.settings.history_limit,
            );
        } else {
            state.code = Some(failure(&result, &mut notices));
        }
        Outcome::Completed { notices }
    }

    /// Generate a Mermaid flowchart from the requirement.
    pub fn generate_flowchart(&self, state: &mut PipelineState) -> Outcome {
        let mut notices = Vec::new();
        let normalized = match self.ready_input(state, &mut notices) {
            Ok(normalized) => normalized,
            Err(halt) => return halt,
        };

        let result = self.run(Stage::Flowchart, self.grounded_prompt(state, &normalized));
        self.apply_flowchart(state, &normalized, &result, &mut notices);
        Outcome::Completed { notices }
    }

    /// Generate an HTML HMI mockup from the requirement.
    pub fn generate_hmi(&self, state: &mut PipelineState) -> Outcome {
        let mut notices = Vec::new();
        let normalized = match self.ready_input(state, &mut notices) {
            Ok(normalized) => normalized,
            Err(halt) => return halt,
        };

        let result = self.run(Stage::Hmi, self.grounded_prompt(state, &normalized));
        self.apply_hmi(state, &normalized, &result, &mut notices);
        Outcome::Completed { notices }
    }

    /// Code first, then flowchart and HMI side by side.
    ///
    /// The flowchart and HMI read the requirement, not the code, so they
    /// run on separate threads and are written back once both finish.
    pub fn generate_all(&self, state: &mut PipelineState) -> Outcome {
        let mut notices = match self.generate_code(state) {
            Outcome::Completed { notices } => notices,
            halt => return halt,
        };

        let Some(normalized) = state.normalized.clone() else {
            return Outcome::Warning(EMPTY_INPUT.to_string());
        };
        let prompt = self.grounded_prompt(state, &normalized);

        let (flowchart, hmi) = thread::scope(|scope| {
            let flowchart = scope.spawn(|| self.run(Stage::Flowchart, prompt.clone()));
            let hmi = self.run(Stage::Hmi, prompt.clone());
            (joined(flowchart.join(), Stage::Flowchart), hmi)
        });

        self.apply_flowchart(state, &normalized, &flowchart, &mut notices);
        self.apply_hmi(state, &normalized, &hmi, &mut notices);
        Outcome::Completed { notices }
    }

    // ── Review ──

    /// Validate the code artifact and produce a simulation scenario table.
    ///
    /// Requires produced code. The two reports are independent: either may
    /// fail without affecting the other.
    pub fn validate_and_simulate(&self, state: &mut PipelineState) -> Outcome {
        let Some(code) = state.produced_code().map(str::to_string) else {
            return Outcome::Warning(NO_CODE.to_string());
        };
        let requirements = state.normalized.clone().unwrap_or_default();
        let mut notices = Vec::new();

        let validation = self.run(Stage::Validate, code.clone());
        state.validation_report = Some(artifact(&validation, &mut notices));

        let simulation = self.run(Stage::Simulate, prompt::simulation(&requirements, &code));
        state.simulation_report = Some(artifact(&simulation, &mut notices));

        Outcome::Completed { notices }
    }

    /// Ask for a change to the existing code.
    ///
    /// The code is replaced only when the reply contains a fenced block; the
    /// code it replaces is kept in the version history.
    pub fn refine_code(&self, state: &mut PipelineState, request: &str) -> Outcome {
        let request = request.trim();
        if request.is_empty() {
            return Outcome::Warning("Describe the refinement you want.".to_string());
        }
        let Some(code) = state.produced_code().map(str::to_string) else {
            return Outcome::Warning(NO_CODE.to_string());
        };

        let mut notices = Vec::new();
        let result = self.run(Stage::Refine, prompt::refinement(&code, request));
        if !result.success {
            notices.extend(result.error);
            return Outcome::Completed { notices };
        }

        let Some(refined) = first_fenced_block(&result.text) else {
            notices.push("Refinement reply contained no code block; code unchanged.".to_string());
            return Outcome::Completed { notices };
        };

        state.versions.push(CodeVersion {
            saved_at: Timestamp::now(),
            code,
            description: "Before refinement".to_string(),
            prompt: state.normalized.clone().unwrap_or_default(),
        });
        state.code = Some(Artifact::Produced(refined.to_string()));
        state.record(
            format!("Refined code: {request}"),
            self.settings.history_limit,
        );
        Outcome::Completed { notices }
    }

    // ── Internals ──

    fn run(&self, stage: Stage, prompt: String) -> StageResult {
        let result = run_stage(
            self.generator,
            &stage.request(prompt),
            stage.label(),
            self.settings.max_attempts,
        );
        info!(stage = stage.label(), success = result.success, "stage finished");
        result
    }

    /// The normalized requirement, or the original when normalization is off or fails.
    fn normalize(&self, text: &str, notices: &mut Vec<String>) -> String {
        if !self.settings.multilingual {
            return text.to_string();
        }
        let result = self.run(Stage::Normalize, text.to_string());
        if result.success {
            result.text
        } else {
            warn!("normalization failed, continuing with original input");
            notices.push(format!(
                "{} unavailable; using the original input.",
                Stage::Normalize.label()
            ));
            text.to_string()
        }
    }

    /// Run the clarification round if it hasn't run for this input.
    ///
    /// Returns the halt outcome when a question is pending afterwards.
    fn clarify(&self, state: &mut PipelineState, notices: &mut Vec<String>) -> Option<Outcome> {
        match &state.clarification {
            Clarification::Resolved => return None,
            Clarification::Pending { question } => {
                return Some(Outcome::ClarificationNeeded {
                    question: question.clone(),
                });
            }
            Clarification::Unresolved => {}
        }

        let normalized = state.normalized.clone().unwrap_or_default();
        let analysis = analyze(&normalized);
        let result = self.run(
            Stage::Clarify,
            prompt::clarification(&normalized, &analysis),
        );

        if !result.success {
            // The gate is advisory when the generator is down.
            notices.push(format!(
                "{} unavailable; proceeding without clarification.",
                Stage::Clarify.label()
            ));
            state.clarification = Clarification::Resolved;
            return None;
        }

        if result.text.to_uppercase().contains(CLEAR_MARKER) {
            debug!("input is clear");
            state.clarification = Clarification::Resolved;
            return None;
        }

        info!("clarification needed");
        let question = result.text.trim().to_string();
        state.clarification = Clarification::Pending {
            question: question.clone(),
        };
        Some(Outcome::ClarificationNeeded { question })
    }

    /// The requirement generation stages work from, once the gate is open.
    fn ready_input(
        &self,
        state: &mut PipelineState,
        notices: &mut Vec<String>,
    ) -> Result<String, Outcome> {
        let Some(normalized) = state.normalized.clone() else {
            return Err(Outcome::Warning(EMPTY_INPUT.to_string()));
        };
        match self.clarify(state, notices) {
            Some(halt) => Err(halt),
            None => Ok(normalized),
        }
    }

    fn grounded_prompt(&self, state: &PipelineState, normalized: &str) -> String {
        let context = match self.knowledge {
            Some(store) if self.settings.use_knowledge_base => {
                knowledge::context_for(store, normalized, self.settings.top_k)
            }
            _ => String::new(),
        };
        prompt::generation(normalized, state, &context)
    }

    fn apply_flowchart(
        &self,
        state: &mut PipelineState,
        normalized: &str,
        result: &StageResult,
        notices: &mut Vec<String>,
    ) {
        state.flowchart = Some(artifact(result, notices));
        if result.success {
            state.record(
                format!("Generated flowchart for: {normalized}"),
                self.settings.history_limit,
            );
        }
    }

    fn apply_hmi(
        &self,
        state: &mut PipelineState,
        normalized: &str,
        result: &StageResult,
        notices: &mut Vec<String>,
    ) {
        if result.success {
            state.hmi = Some(Artifact::Produced(code_or_text(&result.text).to_string()));
            state.record(
                format!("Generated HMI for: {normalized}"),
                self.settings.history_limit,
            );
        } else {
            state.hmi = Some(failure(result, notices));
        }
    }
}

/// Clear everything tied to the previous requirement.
///
/// The conversation log and version history survive; they span cycles.
fn start_cycle(state: &mut PipelineState) {
    state.normalized = None;
    state.code = None;
    state.flowchart = None;
    state.hmi = None;
    state.validation_report = None;
    state.simulation_report = None;
    state.clarification = Clarification::Unresolved;
    state.answers.clear();
}

/// Store a stage result as-is.
fn artifact(result: &StageResult, notices: &mut Vec<String>) -> Artifact {
    if result.success {
        Artifact::Produced(result.text.clone())
    } else {
        failure(result, notices)
    }
}

fn failure(result: &StageResult, notices: &mut Vec<String>) -> Artifact {
    if let Some(error) = &result.error {
        notices.push(error.clone());
    }
    Artifact::Failed(result.text.clone())
}

/// A panicked stage thread becomes a failed result for that stage.
fn joined(result: thread::Result<StageResult>, stage: Stage) -> StageResult {
    result.unwrap_or_else(|_| StageResult {
        success: false,
        text: format!("Error in {}: stage thread panicked", stage.label()),
        error: Some(format!("{} panicked", stage.label())),
    })
}
