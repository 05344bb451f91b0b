//! Requirement analysis: cheap keyword heuristics over the user's input.
//!
//! Nothing here calls a generator. The flags feed the clarification prompt
//! and the pre-check decides whether input is worth sending at all.

use std::{fmt, sync::LazyLock};

use regex::Regex;
use serde::Serialize;

fn keyword_pattern(words: &[&str]) -> Regex {
    Regex::new(&format!(r"\b(?:{})\b", words.join("|"))).expect("keyword pattern is valid")
}

static CONDITIONS: LazyLock<Regex> = LazyLock::new(|| {
    keyword_pattern(&[
        "if", "when", "while", "until", "greater", "less", "equal", "above", "below",
    ])
});
static ACTIONS: LazyLock<Regex> = LazyLock::new(|| {
    keyword_pattern(&[
        "turn", "start", "stop", "enable", "disable", "activate", "deactivate", "open", "close",
    ])
});
static SENSORS: LazyLock<Regex> = LazyLock::new(|| {
    keyword_pattern(&[
        "temperature", "pressure", "level", "flow", "sensor", "input", "feedback",
    ])
});
static ACTUATORS: LazyLock<Regex> = LazyLock::new(|| {
    keyword_pattern(&[
        "motor", "pump", "valve", "heater", "output", "actuator", "drive", "fan", "light",
    ])
});
static SAFETY: LazyLock<Regex> = LazyLock::new(|| {
    keyword_pattern(&["emergency", "stop", "safety", "interlock", "fail", "alarm"])
});
static LOGICAL: LazyLock<Regex> =
    LazyLock::new(|| keyword_pattern(&["and", "or", "not", "greater", "less", "equal"]));
static NUMBER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d+(?:\.\d+)?").expect("number pattern is valid"));

/// Words that usually hide a missing value, with the question each one raises.
static AMBIGUOUS: LazyLock<Vec<(Regex, &'static str)>> = LazyLock::new(|| {
    [
        ("high", "high (what value?)"),
        ("low", "low (what value?)"),
        ("on", "on (for how long?)"),
        ("off", "off (under what conditions?)"),
        ("start", "start (what sequence?)"),
        ("stop", "stop (emergency or normal?)"),
    ]
    .into_iter()
    .map(|(word, hint)| (keyword_pattern(&[word]), hint))
    .collect()
});

const SAFETY_TERMS: [&str; 5] = ["emergency", "stop", "safety", "interlock", "fail"];
const PLC_TERMS: [&str; 12] = [
    "input",
    "output",
    "timer",
    "counter",
    "analog",
    "digital",
    "sensor",
    "actuator",
    "motor",
    "valve",
    "temperature",
    "pressure",
];

/// Rough size of a requirement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Complexity {
    None,
    Low,
    Medium,
    High,
}

impl fmt::Display for Complexity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::None => "none",
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        };
        f.write_str(s)
    }
}

/// Keyword-presence flags for one input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
#[allow(clippy::struct_excessive_bools)] // One flag per keyword family.
pub struct InputAnalysis {
    pub word_count: usize,
    pub has_conditions: bool,
    pub has_actions: bool,
    pub has_sensors: bool,
    pub has_actuators: bool,
    pub has_safety: bool,
    pub has_numeric_values: bool,
    pub has_logical_operators: bool,
    pub complexity: Complexity,
    /// Vague terms found, each phrased as the question it leaves open.
    pub ambiguous_terms: Vec<String>,
}

impl fmt::Display for InputAnalysis {
    /// Compact JSON, which is how the clarification prompt embeds it.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let json = serde_json::to_string(self).map_err(|_| fmt::Error)?;
        f.write_str(&json)
    }
}

/// Flag which keyword families appear in `text`.
pub fn analyze(text: &str) -> InputAnalysis {
    let lowered = text.to_lowercase();
    let word_count = text.split_whitespace().count();
    let complexity = match word_count {
        0 => Complexity::None,
        1..=20 => Complexity::Low,
        21..=50 => Complexity::Medium,
        _ => Complexity::High,
    };

    InputAnalysis {
        word_count,
        has_conditions: CONDITIONS.is_match(&lowered),
        has_actions: ACTIONS.is_match(&lowered),
        has_sensors: SENSORS.is_match(&lowered),
        has_actuators: ACTUATORS.is_match(&lowered),
        has_safety: SAFETY.is_match(&lowered),
        has_numeric_values: NUMBER.is_match(&lowered),
        has_logical_operators: LOGICAL.is_match(&lowered),
        complexity,
        ambiguous_terms: AMBIGUOUS
            .iter()
            .filter(|(pattern, _)| pattern.is_match(&lowered))
            .map(|(_, hint)| (*hint).to_string())
            .collect(),
    }
}

/// Outcome of the pre-check run before any stage is called.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RequirementCheck {
    pub is_valid: bool,
    pub warnings: Vec<String>,
    pub suggestions: Vec<String>,
    /// Share of common PLC terms present, capped at 1.0.
    pub confidence: f64,
}

/// Decide whether `text` is substantial enough to generate from.
///
/// Too-short input is invalid. Otherwise the check only adds suggestions
/// and a confidence estimate.
pub fn check_requirements(text: &str, min_length: usize) -> RequirementCheck {
    let trimmed = text.trim();
    if trimmed.chars().count() < min_length {
        return RequirementCheck {
            is_valid: false,
            warnings: vec!["Input too short for meaningful PLC logic".to_string()],
            suggestions: Vec::new(),
            confidence: 0.0,
        };
    }

    let lowered = trimmed.to_lowercase();
    let mut suggestions = Vec::new();
    if !SAFETY_TERMS.iter().any(|term| lowered.contains(term)) {
        suggestions.push("Consider adding safety interlocks".to_string());
    }

    let found = PLC_TERMS.iter().filter(|term| lowered.contains(*term)).count();
    #[allow(clippy::cast_precision_loss)] // At most twelve terms.
    let confidence = (found as f64 / 5.0).min(1.0);

    RequirementCheck {
        is_valid: true,
        warnings: Vec::new(),
        suggestions,
        confidence,
    }
}
