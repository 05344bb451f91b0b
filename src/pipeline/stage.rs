//! Stages: the fixed set of generation calls and their instructions.

use crate::generate::GenerationRequest;

/// One discrete call to the text generator within the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Normalize,
    Clarify,
    Code,
    Flowchart,
    Hmi,
    Validate,
    Simulate,
    Refine,
}

/// The reply that lets the pipeline past the clarification gate.
pub const CLEAR_MARKER: &str = "CLEAR_INPUT";

impl Stage {
    /// Human-readable name, used in logs and failure messages.
    pub fn label(self) -> &'static str {
        match self {
            Self::Normalize => "Language normalization",
            Self::Clarify => "Requirements analysis",
            Self::Code => "Code generation",
            Self::Flowchart => "Flowchart generation",
            Self::Hmi => "HMI generation",
            Self::Validate => "Code validation",
            Self::Simulate => "Logic simulation",
            Self::Refine => "Code refinement",
        }
    }

    fn instructions(self) -> &'static [&'static str] {
        match self {
            Self::Normalize => &[
                "Detect the language of the requirement. If it is not English, translate it into precise technical English using PLC and IEC 61131-3 terminology.",
                "Reply with the English requirement only, without the original text or commentary.",
                "Keep every signal name, data type, setpoint and process detail intact.",
            ],
            Self::Clarify => &[
                "You review PLC control requirements before code is written for them.",
                "If the requirement is complete enough to implement, reply with exactly: CLEAR_INPUT",
                "Otherwise ask ONE concrete question about the missing process values, signals or safety behaviour.",
            ],
            Self::Code => &[
                "Write IEC 61131-3 Structured Text that implements the requirement.",
                "Declare all variables in VAR blocks with explicit types, use consistent naming, and include safety interlocks and emergency-stop handling.",
                "Return the program in a single fenced code block with inline comments.",
            ],
            Self::Flowchart => &[
                "Draw the control logic as a Mermaid flowchart: diamonds for decisions, rectangles for process steps.",
                "Show safety interlocks, diagnostics and fault paths.",
                "Return only valid Mermaid code in a fenced block.",
            ],
            Self::Hmi => &[
                "Produce a simple industrial HMI mockup for the process in HTML and inline CSS.",
                "Use conventional HMI colours and a plain layout of indicators, setpoints and push buttons.",
                "Return only the HTML in a single fenced code block.",
            ],
            Self::Validate => &[
                "Validate the IEC 61131-3 Structured Text: syntax, block closure, variable and type consistency.",
                "Check safety behaviour: emergency stop, permissives, latching and hazard interlocks.",
                "Start with a PASS or FAIL verdict, then give detailed findings and targeted fixes. Do not give a numeric score.",
            ],
            Self::Simulate => &[
                "Design test scenarios for the given IEC 61131-3 Structured Text program.",
                "Cover normal operation, thresholds and hysteresis, edge conditions and failure modes.",
                "Present inputs, expected outputs and reasoning as a markdown table.",
            ],
            Self::Refine => &[
                "You improve existing IEC 61131-3 Structured Text on request.",
                "Keep the original behaviour while applying the requested change, following industrial safety practice.",
                "Return the complete improved program in a fenced code block with explanatory comments.",
            ],
        }
    }

    /// Only code generation may look things up.
    fn tools_enabled(self) -> bool {
        matches!(self, Self::Code)
    }

    /// Build the generator request for this stage.
    pub fn request(self, prompt: impl Into<String>) -> GenerationRequest {
        GenerationRequest::new(self.instructions(), prompt).with_tools(self.tools_enabled())
    }

    /// Whether `request` was built by this stage.
    #[cfg(test)]
    pub fn owns(self, request: &GenerationRequest) -> bool {
        request.instructions.first().map(String::as_str) == self.instructions().first().copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clarify_instructions_name_the_marker() {
        let request = Stage::Clarify.request("x");
        assert!(request.instructions.iter().any(|i| i.contains(CLEAR_MARKER)));
    }

    #[test]
    fn only_code_generation_enables_tools() {
        assert!(Stage::Code.request("x").tools_enabled);
        assert!(!Stage::Flowchart.request("x").tools_enabled);
        assert!(!Stage::Validate.request("x").tools_enabled);
    }

    #[test]
    fn requests_are_attributable_to_their_stage() {
        let request = Stage::Hmi.request("tank");
        assert!(Stage::Hmi.owns(&request));
        assert!(!Stage::Flowchart.owns(&request));
    }
}
