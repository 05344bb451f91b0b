//! CLI interface for plcgen.
//!
//! Each subcommand is non-interactive: arguments in, text out. Artifacts go
//! to stdout, notices and warnings to stderr.
//!
//! Commands split into two groups:
//!
//! - `plcgen session new|list`, `kb`, `analyze`: no session context needed.
//! - `plcgen --session <id> <command>`: everything else, operating within a session.
//!
//! The `--session` flag takes a full UUID or unambiguous prefix.

mod format;
mod kb;
mod session;

use clap::{Parser, Subcommand, ValueEnum};

use crate::{
    analysis::{analyze, check_requirements},
    config::Config,
    generate::{GenerationError, GenerationRequest, TextGenerator},
    knowledge::ChunkStore,
    model::{Artifact, Session},
    pipeline::{Outcome, Pipeline},
    storage::Storage,
};

use format::{format_history, format_outcome, format_phase, format_versions};
use kb::KbCommand;
use session::SessionCommand;

/// plcgen: turn plain-language control requirements into PLC artifacts.
#[derive(Debug, Parser)]
#[command(name = "plcgen", after_long_help = WORKFLOW_HELP)]
pub struct Cli {
    /// Session ID: full UUID or unambiguous prefix (e.g. `a3b`).
    #[arg(long, global = true)]
    session: Option<String>,

    /// Log stage attempts and gate decisions to stderr.
    #[arg(long, short, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

const WORKFLOW_HELP: &str = r#"Workflow:
  1. plcgen session new
     → prints a session ID (e.g. a3b0fc12)
  2. plcgen --session a3b submit "Start pump P-101 when tank level exceeds 80%"
  3. plcgen --session a3b answer "Stop it again below 20%, E-stop on I0.0"   (if asked)
  4. plcgen --session a3b generate all
  5. plcgen --session a3b validate
  6. plcgen --session a3b show code

Knowledge base:
  plcgen kb stats
  plcgen kb search "pump dry-run protection" --top-k 3"#;

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Manage sessions: create, list, reset.
    Session {
        #[command(subcommand)]
        command: SessionCommand,
    },

    /// Submit a control requirement and run it up to the clarification gate.
    Submit {
        /// The requirement, in any language.
        text: String,
    },

    /// Answer the pending clarification question.
    Answer {
        text: String,
    },

    /// Drop the pending clarification question without answering.
    Dismiss,

    /// Generate an artifact from the current requirement.
    Generate {
        #[arg(value_enum)]
        target: GenerateTarget,
    },

    /// Validate the generated code and build a simulation scenario table.
    Validate,

    /// Ask for a change to the generated code.
    Refine {
        /// What to change.
        request: String,
    },

    /// Print part of the session.
    Show {
        #[arg(value_enum, default_value = "status")]
        part: ShowPart,
    },

    /// Inspect the knowledge base.
    Kb {
        #[command(subcommand)]
        command: KbCommand,
    },

    /// Print keyword analysis and the pre-check for a requirement.
    Analyze {
        text: String,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum GenerateTarget {
    /// IEC 61131-3 Structured Text.
    Code,
    /// Mermaid flowchart.
    Flowchart,
    /// HTML HMI mockup.
    Hmi,
    /// Code, then flowchart and HMI.
    All,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum ShowPart {
    /// Phase and which artifacts exist.
    Status,
    Input,
    Code,
    Flowchart,
    Hmi,
    Validation,
    Simulation,
    /// Conversation log.
    History,
    /// Saved code versions.
    Versions,
}

/// Run the CLI, returning an error message on failure.
pub fn run(cli: Cli, config: &Config, storage: &Storage) -> Result<(), String> {
    match cli.command {
        Command::Session { command } => match command {
            SessionCommand::New => session::cmd_new(storage),
            SessionCommand::List => session::cmd_list(storage),
            SessionCommand::Reset => {
                let mut session = require_session(storage, cli.session.as_deref())?;
                session::cmd_reset(storage, &mut session)
            }
        },
        Command::Kb { command } => kb::run(config, command),
        Command::Analyze { text } => cmd_analyze(config, &text),
        Command::Show { part } => {
            let session = require_session(storage, cli.session.as_deref())?;
            cmd_show(&session, part)
        }
        command => {
            let mut session = require_session(storage, cli.session.as_deref())?;
            let generator = pipeline_generator(config, &command)?;
            let store = knowledge_store(config);
            let pipeline = Pipeline::new(generator.as_ref(), store.as_ref(), config.settings());

            let result = cmd_pipeline(&pipeline, &mut session, command);
            storage
                .update_session(&mut session)
                .map_err(|e| format!("failed to save session: {e}"))?;
            result
        }
    }
}

/// Stands in for the generator on commands that only touch session state.
struct Unconfigured;

impl TextGenerator for Unconfigured {
    fn generate(&self, _request: &GenerationRequest) -> Result<String, GenerationError> {
        Err(GenerationError::NotConfigured)
    }
}

/// The configured generator, required only by commands that call it.
fn pipeline_generator(
    config: &Config,
    command: &Command,
) -> Result<Box<dyn TextGenerator>, String> {
    if matches!(command, Command::Answer { .. } | Command::Dismiss) {
        return Ok(Box::new(Unconfigured));
    }
    let generator = config
        .generator()
        .map_err(|e| format!("{e}\nSet [generator] program in {}", config_path()))?;
    Ok(Box::new(generator))
}

/// Require that `--session` was provided and resolve it.
fn require_session(storage: &Storage, session_ref: Option<&str>) -> Result<Session, String> {
    let session_ref = session_ref.ok_or("this command requires --session <id>")?;
    storage.resolve(session_ref).map_err(|e| e.to_string())
}

/// The knowledge store, if grounding is on and the directory exists.
fn knowledge_store(config: &Config) -> Option<ChunkStore> {
    if !config.use_knowledge_base {
        return None;
    }
    let dir = config.knowledge_dir()?;
    if !dir.is_dir() {
        tracing::debug!(dir = %dir.display(), "knowledge directory missing, generating ungrounded");
        return None;
    }
    Some(ChunkStore::new(dir))
}

fn config_path() -> String {
    Config::path().map_or_else(
        || "~/.plcgen/config.toml".to_string(),
        |p| p.display().to_string(),
    )
}

fn cmd_pipeline(
    pipeline: &Pipeline<'_>,
    session: &mut Session,
    command: Command,
) -> Result<(), String> {
    let state = &mut session.state;
    let (outcome, shown) = match command {
        Command::Submit { text } => (pipeline.submit_input(state, &text), None),
        Command::Answer { text } => (pipeline.answer_clarification(state, &text), None),
        Command::Dismiss => (pipeline.dismiss_clarification(state), None),
        Command::Generate { target } => match target {
            GenerateTarget::Code => (pipeline.generate_code(state), Some(ShowPart::Code)),
            GenerateTarget::Flowchart => {
                (pipeline.generate_flowchart(state), Some(ShowPart::Flowchart))
            }
            GenerateTarget::Hmi => (pipeline.generate_hmi(state), Some(ShowPart::Hmi)),
            GenerateTarget::All => (pipeline.generate_all(state), Some(ShowPart::Code)),
        },
        Command::Validate => (
            pipeline.validate_and_simulate(state),
            Some(ShowPart::Validation),
        ),
        Command::Refine { request } => {
            (pipeline.refine_code(state, &request), Some(ShowPart::Code))
        }
        Command::Session { .. }
        | Command::Kb { .. }
        | Command::Analyze { .. }
        | Command::Show { .. } => return Err("not a pipeline command".to_string()),
    };

    eprint!("{}", format_outcome(&outcome, &session.short_id()));
    if let (Outcome::Completed { .. }, Some(part)) = (&outcome, shown) {
        if part_is_set(session, part) {
            cmd_show(session, part)?;
            if matches!(part, ShowPart::Validation) {
                cmd_show(session, ShowPart::Simulation)?;
            }
        }
    }
    Ok(())
}

fn part_is_set(session: &Session, part: ShowPart) -> bool {
    artifact(session, part).is_some()
}

fn artifact(session: &Session, part: ShowPart) -> Option<&Artifact> {
    let state = &session.state;
    match part {
        ShowPart::Code => state.code.as_ref(),
        ShowPart::Flowchart => state.flowchart.as_ref(),
        ShowPart::Hmi => state.hmi.as_ref(),
        ShowPart::Validation => state.validation_report.as_ref(),
        ShowPart::Simulation => state.simulation_report.as_ref(),
        ShowPart::Status | ShowPart::Input | ShowPart::History | ShowPart::Versions => None,
    }
}

fn cmd_show(session: &Session, part: ShowPart) -> Result<(), String> {
    let state = &session.state;
    match part {
        ShowPart::Status => {
            println!("Session {}  [{}]", session.short_id(), format_phase(state.phase()));
            if let Some(input) = &state.input {
                println!("Input: {input}");
            }
            if let Some(question) = state.pending_question() {
                println!("Pending question: {question}");
            }
            for (name, part) in [
                ("code", ShowPart::Code),
                ("flowchart", ShowPart::Flowchart),
                ("hmi", ShowPart::Hmi),
                ("validation", ShowPart::Validation),
                ("simulation", ShowPart::Simulation),
            ] {
                let status = match artifact(session, part) {
                    Some(Artifact::Produced(_)) => "ready",
                    Some(Artifact::Failed(_)) => "failed",
                    None => "-",
                };
                println!("  {name:<11}{status}");
            }
        }
        ShowPart::Input => {
            let input = state.input.as_deref().ok_or("no input submitted")?;
            println!("{input}");
            if let Some(normalized) = state.normalized.as_deref().filter(|n| *n != input) {
                println!("\nNormalized: {normalized}");
            }
        }
        ShowPart::History => println!("{}", format_history(state)),
        ShowPart::Versions => println!("{}", format_versions(&state.versions)),
        part => {
            let artifact = artifact(session, part).ok_or("nothing generated yet")?;
            println!("{}", artifact.text());
        }
    }
    Ok(())
}

fn cmd_analyze(config: &Config, text: &str) -> Result<(), String> {
    let analysis = analyze(text);
    let check = check_requirements(text, config.min_input_length);
    let report = serde_json::json!({
        "analysis": analysis,
        "check": check,
    });
    let json = serde_json::to_string_pretty(&report)
        .map_err(|e| format!("failed to serialize analysis: {e}"))?;
    println!("{json}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::model::PipelineState;

    fn pending_state() -> PipelineState {
        PipelineState {
            input: Some("turn on pump".into()),
            normalized: Some("turn on pump".into()),
            clarification: crate::model::Clarification::Pending {
                question: "Which pump?".into(),
            },
            ..PipelineState::default()
        }
    }

    #[test]
    fn answer_and_dismiss_work_without_a_generator_program() {
        let config = Config::default();
        let answer = Command::Answer {
            text: "Pump P-101".into(),
        };

        let generator = pipeline_generator(&config, &answer).unwrap();
        let pipeline = Pipeline::new(generator.as_ref(), None, config.settings());
        let mut state = pending_state();
        let outcome = pipeline.answer_clarification(&mut state, "Pump P-101");
        assert!(matches!(outcome, Outcome::Completed { .. }));
        assert_eq!(state.answers["clarification"], "Pump P-101");

        let generator = pipeline_generator(&config, &Command::Dismiss).unwrap();
        let pipeline = Pipeline::new(generator.as_ref(), None, config.settings());
        let mut state = pending_state();
        assert!(matches!(
            pipeline.dismiss_clarification(&mut state),
            Outcome::Completed { .. }
        ));
    }

    #[test]
    fn generating_commands_need_a_generator_program() {
        let config = Config::default();
        for command in [
            Command::Submit {
                text: "turn on pump".into(),
            },
            Command::Validate,
            Command::Generate {
                target: GenerateTarget::Code,
            },
        ] {
            let err = pipeline_generator(&config, &command).err().unwrap();
            assert!(err.contains("no generator program configured"));
        }
    }
}
