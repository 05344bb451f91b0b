//! Text generators: the external capability every stage calls.
//!
//! The pipeline only knows the `TextGenerator` trait. The production
//! implementation shells out to a configured program; tests script replies.

use std::{
    io::{self, Read, Write},
    process::{Command, ExitStatus, Stdio},
    thread,
    time::{Duration, Instant},
};

use serde::{Deserialize, Serialize};
use tracing::debug;

/// One call to a text generator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationRequest {
    /// System-level instructions, in order.
    pub instructions: Vec<String>,

    /// The user prompt.
    pub prompt: String,

    /// Whether the generator may use tools such as web search.
    pub tools_enabled: bool,
}

impl GenerationRequest {
    pub fn new(instructions: &[&str], prompt: impl Into<String>) -> Self {
        Self {
            instructions: instructions.iter().map(ToString::to_string).collect(),
            prompt: prompt.into(),
            tools_enabled: false,
        }
    }

    #[must_use]
    pub fn with_tools(mut self, enabled: bool) -> Self {
        self.tools_enabled = enabled;
        self
    }

    /// Plain-text rendering: instructions first, then the prompt.
    pub fn to_text(&self) -> String {
        let mut text = String::new();
        for instruction in &self.instructions {
            text.push_str("System: ");
            text.push_str(instruction);
            text.push('\n');
        }
        if !self.instructions.is_empty() {
            text.push('\n');
        }
        text.push_str(&self.prompt);
        text
    }
}

/// Ways a single generation call can fail.
#[derive(Debug, thiserror::Error)]
pub enum GenerationError {
    #[error("no generator program configured")]
    NotConfigured,

    #[error("failed to run {program}: {source}")]
    Spawn {
        program: String,
        source: io::Error,
    },

    #[error("I/O error talking to generator: {0}")]
    Io(#[from] io::Error),

    #[error("failed to encode request: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("generator exited with {status}: {stderr}")]
    Exit { status: ExitStatus, stderr: String },

    #[error("generator timed out after {0:?}")]
    Timeout(Duration),

    #[error("generator returned an empty response")]
    Empty,
}

/// Something that turns a request into text, and may fail.
///
/// `Sync` so independent stages can share one generator across threads.
pub trait TextGenerator: Send + Sync {
    fn generate(&self, request: &GenerationRequest) -> Result<String, GenerationError>;
}

/// How a `CommandGenerator` writes the request to the program's stdin.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RequestFormat {
    /// `System:` lines followed by the prompt. Tool use can't be expressed.
    #[default]
    Text,

    /// A JSON object with `instructions`, `prompt` and `toolsEnabled`.
    Json,
}

/// Runs an external program per request: request on stdin, reply on stdout.
#[derive(Debug, Clone)]
pub struct CommandGenerator {
    program: String,
    args: Vec<String>,
    format: RequestFormat,
    timeout: Duration,
}

impl CommandGenerator {
    pub fn new(
        program: impl Into<String>,
        args: Vec<String>,
        format: RequestFormat,
        timeout: Duration,
    ) -> Self {
        Self {
            program: program.into(),
            args,
            format,
            timeout,
        }
    }

    fn encode(&self, request: &GenerationRequest) -> Result<String, GenerationError> {
        match self.format {
            RequestFormat::Text => {
                if request.tools_enabled {
                    debug!(program = %self.program, "text format drops the tools flag");
                }
                Ok(request.to_text())
            }
            RequestFormat::Json => Ok(serde_json::to_string(request)?),
        }
    }
}

impl TextGenerator for CommandGenerator {
    fn generate(&self, request: &GenerationRequest) -> Result<String, GenerationError> {
        let input = self.encode(request)?;

        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|source| GenerationError::Spawn {
                program: self.program.clone(),
                source,
            })?;

        // Feed stdin and drain both pipes on their own threads so a chatty
        // child can't deadlock against a full pipe while we poll for exit.
        let mut stdin = child.stdin.take().ok_or_else(|| missing_pipe("stdin"))?;
        let mut stdout = child.stdout.take().ok_or_else(|| missing_pipe("stdout"))?;
        let mut stderr = child.stderr.take().ok_or_else(|| missing_pipe("stderr"))?;

        let writer = thread::spawn(move || stdin.write_all(input.as_bytes()));
        let out_reader = thread::spawn(move || {
            let mut buf = String::new();
            stdout.read_to_string(&mut buf).map(|_| buf)
        });
        let err_reader = thread::spawn(move || {
            let mut buf = String::new();
            stderr.read_to_string(&mut buf).map(|_| buf)
        });

        let deadline = Instant::now() + self.timeout;
        let status = loop {
            if let Some(status) = child.try_wait()? {
                break status;
            }
            if Instant::now() >= deadline {
                // Already-exited races are fine; the kill error is irrelevant then.
                let _ = child.kill();
                let _ = child.wait();
                return Err(GenerationError::Timeout(self.timeout));
            }
            thread::sleep(Duration::from_millis(25));
        };

        // A child that exits without reading all of stdin closes the pipe
        // under us; its exit status decides the outcome.
        let write_result = join(writer)?;
        let stdout = join(out_reader)??;
        let stderr = join(err_reader)??;

        if !status.success() {
            return Err(GenerationError::Exit {
                status,
                stderr: stderr.trim().to_string(),
            });
        }
        match write_result {
            Err(e) if e.kind() == io::ErrorKind::BrokenPipe => {
                debug!(program = %self.program, "generator replied without reading the whole request");
            }
            other => other?,
        }

        let reply = stdout.trim();
        if reply.is_empty() {
            return Err(GenerationError::Empty);
        }
        Ok(reply.to_string())
    }
}

fn missing_pipe(name: &str) -> GenerationError {
    GenerationError::Io(io::Error::other(format!("child {name} was not captured")))
}

fn join<T>(handle: thread::JoinHandle<T>) -> Result<T, GenerationError> {
    handle
        .join()
        .map_err(|_| GenerationError::Io(io::Error::other("pipe thread panicked")))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sh(script: &str, format: RequestFormat, timeout: Duration) -> CommandGenerator {
        CommandGenerator::new(
            "sh",
            vec!["-c".to_string(), script.to_string()],
            format,
            timeout,
        )
    }

    fn request() -> GenerationRequest {
        GenerationRequest::new(&["Be terse.", "Use IEC 61131-3."], "start the pump")
    }

    #[test]
    fn text_rendering_puts_instructions_first() {
        assert_eq!(
            request().to_text(),
            "System: Be terse.\nSystem: Use IEC 61131-3.\n\nstart the pump"
        );
        assert_eq!(GenerationRequest::new(&[], "bare").to_text(), "bare");
    }

    #[test]
    fn json_encoding_carries_tools_flag() {
        let json = serde_json::to_value(request().with_tools(true)).unwrap();
        assert_eq!(json["toolsEnabled"], true);
        assert_eq!(json["prompt"], "start the pump");
        assert_eq!(json["instructions"][1], "Use IEC 61131-3.");
    }

    #[test]
    fn echoes_stdin_back_trimmed() {
        let generator = sh("cat; echo", RequestFormat::Text, Duration::from_secs(10));
        let reply = generator.generate(&request()).unwrap();
        assert!(reply.starts_with("System: Be terse."));
        assert!(reply.ends_with("start the pump"));
    }

    #[test]
    fn json_format_reaches_the_program() {
        let generator = sh("cat", RequestFormat::Json, Duration::from_secs(10));
        let reply = generator.generate(&request()).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&reply).unwrap();
        assert_eq!(parsed["toolsEnabled"], false);
    }

    #[test]
    fn non_zero_exit_is_an_error_with_stderr() {
        let generator = sh(
            "cat >/dev/null; echo 'quota exceeded' >&2; exit 3",
            RequestFormat::Text,
            Duration::from_secs(10),
        );
        let err = generator.generate(&request()).unwrap_err();
        match err {
            GenerationError::Exit { stderr, .. } => assert_eq!(stderr, "quota exceeded"),
            other => panic!("expected Exit, got {other:?}"),
        }
    }

    #[test]
    fn reply_counts_even_if_the_request_was_not_fully_read() {
        let generator = sh(
            "head -c 10 >/dev/null; echo ok",
            RequestFormat::Text,
            Duration::from_secs(10),
        );
        let large = GenerationRequest::new(&["Be terse."], "x".repeat(1 << 20));
        assert_eq!(generator.generate(&large).unwrap(), "ok");
    }

    #[test]
    fn unread_request_with_failing_exit_reports_the_exit() {
        let generator = sh(
            "head -c 10 >/dev/null; exit 2",
            RequestFormat::Text,
            Duration::from_secs(10),
        );
        let large = GenerationRequest::new(&["Be terse."], "x".repeat(1 << 20));
        assert!(matches!(
            generator.generate(&large),
            Err(GenerationError::Exit { .. })
        ));
    }

    #[test]
    fn empty_output_is_an_error() {
        let generator = sh("cat >/dev/null", RequestFormat::Text, Duration::from_secs(10));
        assert!(matches!(
            generator.generate(&request()),
            Err(GenerationError::Empty)
        ));
    }

    #[test]
    fn slow_program_times_out() {
        let generator = sh("sleep 5", RequestFormat::Text, Duration::from_millis(200));
        assert!(matches!(
            generator.generate(&request()),
            Err(GenerationError::Timeout(_))
        ));
    }

    #[test]
    fn missing_program_fails_to_spawn() {
        let generator = CommandGenerator::new(
            "/nonexistent/generator/binary",
            Vec::new(),
            RequestFormat::Text,
            Duration::from_secs(1),
        );
        assert!(matches!(
            generator.generate(&request()),
            Err(GenerationError::Spawn { .. })
        ));
    }
}
