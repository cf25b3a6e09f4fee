//! Conversation inputs and the normalized result contracts.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub const MAX_ACTION_STEPS: usize = 3;
pub const MAX_TAGS: usize = 4;
pub const MAX_SUMMARY_POINTS: usize = 5;

/// Requested tone of the reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tone {
    Calm,
    #[default]
    Neutral,
    Upbeat,
}

impl Tone {
    pub fn as_str(&self) -> &'static str {
        match self {
            Tone::Calm => "calm",
            Tone::Neutral => "neutral",
            Tone::Upbeat => "upbeat",
        }
    }
}

impl fmt::Display for Tone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What the user wants from the turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    /// One open question inviting reflection.
    #[default]
    GoDeep,
    /// A few short actionable steps.
    Solve,
}

impl Intent {
    pub fn as_str(&self) -> &'static str {
        match self {
            Intent::GoDeep => "go_deep",
            Intent::Solve => "solve",
        }
    }
}

impl fmt::Display for Intent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Author of a transcript message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Ai,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Ai => "ai",
        }
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(Role::User),
            "ai" => Ok(Role::Ai),
            other => Err(format!("unknown role: {}", other)),
        }
    }
}

/// One message of history or transcript, oldest first when in a sequence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryMessage {
    pub role: Role,
    pub content: String,
}

impl HistoryMessage {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }
}

/// Everything the turn prompt is built from.
#[derive(Debug, Clone, Copy)]
pub struct PromptContext<'a> {
    pub tone: Tone,
    pub intent: Intent,
    /// Chronological, oldest first.
    pub history: &'a [HistoryMessage],
    pub user_text: &'a str,
}

/// Normalized reply to one chat turn.
///
/// Arrays are always present and never longer than their caps.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TurnResult {
    #[serde(default)]
    pub paraphrase: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub follow_up: Option<String>,
    #[serde(default)]
    pub action_steps: Vec<String>,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl TurnResult {
    /// Normalize a parsed model object. Missing fields become empty, never errors.
    pub fn from_output(output: &Map<String, Value>) -> Self {
        Self {
            paraphrase: text_field(output, "paraphrase").unwrap_or_default(),
            follow_up: text_field(output, "followUp"),
            action_steps: text_list(output, "actionSteps"),
            tags: text_list(output, "tags"),
        }
        .clamp()
    }

    /// Truncate arrays to their caps, keeping the first items.
    pub fn clamp(mut self) -> Self {
        self.action_steps.truncate(MAX_ACTION_STEPS);
        self.tags.truncate(MAX_TAGS);
        self
    }

    /// Render the reply the way it is stored in the transcript.
    pub fn to_transcript_text(&self, intent: Intent) -> String {
        let mut lines: Vec<String> = vec![self.paraphrase.clone()];

        if intent == Intent::Solve && !self.action_steps.is_empty() {
            lines.push(String::new());
            lines.push("Next steps:".to_string());
            lines.extend(self.action_steps.iter().map(|s| format!("• {}", s)));
        }
        if let Some(follow_up) = &self.follow_up {
            lines.push(String::new());
            lines.push(format!("Q: {}", follow_up));
        }
        if !self.tags.is_empty() {
            lines.push(String::new());
            lines.push(format!("— {}", self.tags.join(" · ")));
        }

        lines.join("\n").trim().to_string()
    }
}

/// Normalized end-of-session summary.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SummaryResult {
    #[serde(default)]
    pub summary: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_prompt: Option<String>,
    #[serde(default)]
    pub action_steps: Vec<String>,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl SummaryResult {
    pub fn from_output(output: &Map<String, Value>) -> Self {
        Self {
            summary: text_list(output, "summary"),
            next_prompt: text_field(output, "nextPrompt"),
            action_steps: text_list(output, "actionSteps"),
            tags: text_list(output, "tags"),
        }
        .clamp()
    }

    pub fn clamp(mut self) -> Self {
        self.summary.truncate(MAX_SUMMARY_POINTS);
        self.action_steps.truncate(MAX_ACTION_STEPS);
        self.tags.truncate(MAX_TAGS);
        self
    }
}

/// A non-blank string field.
fn text_field(output: &Map<String, Value>, key: &str) -> Option<String> {
    output
        .get(key)
        .and_then(|v| v.as_str())
        .filter(|s| !s.trim().is_empty())
        .map(str::to_string)
}

/// String items of an array field; anything that is not an array is empty.
fn text_list(output: &Map<String, Value>, key: &str) -> Vec<String> {
    output
        .get(key)
        .and_then(|v| v.as_array())
        .map(|items| {
            items
                .iter()
                .filter_map(|item| item.as_str())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}
