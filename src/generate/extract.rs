//! Fenced-block extraction from generated markdown.

use std::sync::LazyLock;

use regex::Regex;

/// A markdown fence: three backticks, an optional info string, the body, closing backticks.
static FENCED_BLOCK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)```[^\n`]*\n(.*?)```").expect("fence pattern is valid")
});

/// The trimmed body of the first fenced block in `text`, if there is one.
pub fn first_fenced_block(text: &str) -> Option<&str> {
    FENCED_BLOCK
        .captures(text)
        .and_then(|caps| caps.get(1))
        .map(|body| body.as_str().trim())
}

/// The first fenced block, or the whole text when there is none.
///
/// Idempotent: an extracted body has no fences, so extracting again
/// returns it unchanged.
pub fn code_or_text(text: &str) -> &str {
    first_fenced_block(text).unwrap_or(text)
}

#[cfg(test)]
mod tests {
    use super::*;

    const REPLY: &str = "Here is the program:\n\n\
        ```iecst\nPROGRAM Main\n  Pump := Start AND NOT EStop;\nEND_PROGRAM\n```\n\n\
        And a second block:\n```\nignored\n```\n";

    #[test]
    fn extracts_first_block_with_language_tag() {
        assert_eq!(
            first_fenced_block(REPLY),
            Some("PROGRAM Main\n  Pump := Start AND NOT EStop;\nEND_PROGRAM")
        );
    }

    #[test]
    fn extracts_untagged_block() {
        assert_eq!(
            first_fenced_block("```\nflowchart TD\n  A --> B\n```"),
            Some("flowchart TD\n  A --> B")
        );
    }

    #[test]
    fn no_fence_falls_back_to_full_text() {
        assert_eq!(first_fenced_block("just prose"), None);
        assert_eq!(code_or_text("just prose"), "just prose");
    }

    #[test]
    fn unterminated_fence_is_not_a_block() {
        assert_eq!(first_fenced_block("```st\nPROGRAM Main"), None);
    }

    #[test]
    fn extraction_is_idempotent() {
        let once = code_or_text(REPLY);
        let twice = code_or_text(once);
        assert_eq!(once, twice);
    }
}
