//! Self-harm pre-check that bypasses the model entirely.

use regex::{Regex, RegexBuilder};

use super::types::TurnResult;

/// Phrases that trigger the canned safe response (case-insensitive substrings).
pub const DEFAULT_CRISIS_PHRASES: [&str; 5] = [
    "suicide",
    "kill myself",
    "harm myself",
    "overdose",
    "end it",
];

const CRISIS_PARAPHRASE: &str = "It sounds like you're going through intense pain.";
const CRISIS_FOLLOW_UP: &str =
    "Would you be willing to contact immediate support? I can share options.";

/// Decides whether raw user text must short-circuit to the safe response.
pub trait CrisisScreen: Send + Sync {
    fn is_crisis(&self, text: &str) -> bool;
}

impl<F> CrisisScreen for F
where
    F: Fn(&str) -> bool + Send + Sync,
{
    fn is_crisis(&self, text: &str) -> bool {
        self(text)
    }
}

/// Case-insensitive substring match against a fixed phrase list.
#[derive(Debug, Clone)]
pub struct PhraseScreen {
    pattern: Regex,
}

impl PhraseScreen {
    pub fn new<S: AsRef<str>>(phrases: &[S]) -> Result<Self, regex::Error> {
        let alternation = phrases
            .iter()
            .map(|p| regex::escape(p.as_ref()))
            .collect::<Vec<_>>()
            .join("|");
        let pattern = RegexBuilder::new(&alternation)
            .case_insensitive(true)
            .build()?;
        Ok(Self { pattern })
    }
}

impl Default for PhraseScreen {
    fn default() -> Self {
        Self::new(&DEFAULT_CRISIS_PHRASES).expect("escaped phrases always compile")
    }
}

impl CrisisScreen for PhraseScreen {
    fn is_crisis(&self, text: &str) -> bool {
        self.pattern.is_match(text)
    }
}

/// The fixed reply returned instead of calling the model.
pub fn crisis_response() -> TurnResult {
    TurnResult {
        paraphrase: CRISIS_PARAPHRASE.to_string(),
        follow_up: Some(CRISIS_FOLLOW_UP.to_string()),
        action_steps: Vec::new(),
        tags: vec!["Empathic Calibration".to_string(), "Transparency".to_string()],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_phrases_match_case_insensitively() {
        let screen = PhraseScreen::default();
        assert!(screen.is_crisis("I want to kill myself"));
        assert!(screen.is_crisis("thinking about SUICIDE lately"));
        assert!(screen.is_crisis("I just want to End It all"));
        assert!(!screen.is_crisis("I want to quit my job"));
    }

    #[test]
    fn test_custom_phrases_escape_metacharacters() {
        let screen = PhraseScreen::new(&["can't go on", "a.b"]).unwrap();
        assert!(screen.is_crisis("I CAN'T GO ON"));
        assert!(!screen.is_crisis("axb"));
    }

    #[test]
    fn test_closure_screen() {
        let screen = |text: &str| text.contains("help");
        assert!(screen.is_crisis("please help"));
    }

    #[test]
    fn test_canned_response_shape() {
        let reply = crisis_response();
        assert!(reply.action_steps.is_empty());
        assert_eq!(reply.tags, vec!["Empathic Calibration", "Transparency"]);
        assert!(reply.follow_up.is_some());
    }
}
