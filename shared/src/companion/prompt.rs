//! Prompt text and structured-output hints.

use serde_json::{json, Value};

use super::types::{HistoryMessage, PromptContext, MAX_ACTION_STEPS, MAX_SUMMARY_POINTS, MAX_TAGS};

pub const SYSTEM_PROMPT: &str = "\
You are Reflectly, a calm, non-clinical listening companion.

Listening techniques (apply at least two every turn):
- Reflective Mirroring: restate what the person said in warm, plain words.
- Clarifying Extension: ask one gentle, non-interrogative question.
- Empathic Calibration: name and acknowledge the feeling.
- Strategic Framing: organize briefly; offer simple next steps when asked.
- Transparency: be honest about limits; never sound clinical.

Rules:
- Never give medical, diagnostic, or legal advice.
- Be concise. The paraphrase is one or two sentences.
- The tone is given separately (calm | neutral | upbeat).
- The intent is given separately:
  * go_deep: ask one open-ended question that invites reflection.
  * solve: give two or three short actionable steps, optionally one gentle question.";

pub const TURN_OUTPUT_CONTRACT: &str = r#"Return ONLY one JSON object with these keys (omit keys that do not apply):
{
  "paraphrase": "string",
  "followUp": "string",
  "actionSteps": ["step 1", "step 2"],
  "tags": ["Reflective Mirroring", "Empathic Calibration", "Clarifying Extension", "Strategic Framing", "Transparency"]
}
actionSteps holds at most 3 items, tags at most 4. No prose before or after the JSON."#;

pub const SUMMARY_OUTPUT_CONTRACT: &str = r#"Return ONLY JSON:
{
  "summary": ["point 1", "point 2"],
  "nextPrompt": "string",
  "actionSteps": ["step 1", "step 2"],
  "tags": ["Reflective Mirroring", "Empathic Calibration"]
}"#;

const SEPARATOR: &str = "---";

/// Render messages as `ROLE: content` lines, oldest first.
pub fn render_history(messages: &[HistoryMessage]) -> String {
    messages
        .iter()
        .map(|m| format!("{}: {}", m.role.as_str().to_uppercase(), m.content))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Build the single prompt string for one chat turn.
pub fn build_turn_prompt(ctx: &PromptContext<'_>) -> String {
    let history = render_history(ctx.history);
    let history = if history.is_empty() {
        "(none)".to_string()
    } else {
        history
    };

    [
        SYSTEM_PROMPT.to_string(),
        format!("Tone: {}", ctx.tone),
        format!("Intent: {}", ctx.intent),
        SEPARATOR.to_string(),
        "RECENT HISTORY (may be empty):".to_string(),
        history,
        SEPARATOR.to_string(),
        "USER:".to_string(),
        ctx.user_text.to_string(),
        SEPARATOR.to_string(),
        TURN_OUTPUT_CONTRACT.to_string(),
    ]
    .join("\n")
}

/// Build the prompt for an end-of-session summary.
pub fn build_summary_prompt(transcript: &[HistoryMessage]) -> String {
    format!(
        "Apply the listening techniques to this session. Produce at most {points} bullet points \
capturing both what was said and how it felt, plus one next reflective prompt. \
Optionally add at most {steps} action steps, and up to {tags} tags naming the \
listening techniques that were applied.\n\nTRANSCRIPT:\n{transcript}\n\n{contract}",
        points = MAX_SUMMARY_POINTS,
        steps = MAX_ACTION_STEPS,
        tags = MAX_TAGS,
        transcript = render_history(transcript),
        contract = SUMMARY_OUTPUT_CONTRACT,
    )
}

fn string_array(max_items: usize) -> Value {
    json!({
        "type": "array",
        "items": { "type": "string" },
        "maxItems": max_items,
    })
}

/// Structured-output hint for a turn.
///
/// `additionalProperties` is left out because some model versions reject it.
pub fn turn_response_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "paraphrase": { "type": "string" },
            "followUp": { "type": "string" },
            "actionSteps": string_array(MAX_ACTION_STEPS),
            "tags": string_array(MAX_TAGS),
        },
        "required": ["paraphrase"],
    })
}

/// Structured-output hint for a summary.
pub fn summary_response_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "summary": string_array(MAX_SUMMARY_POINTS),
            "nextPrompt": { "type": "string" },
            "actionSteps": string_array(MAX_ACTION_STEPS),
            "tags": string_array(MAX_TAGS),
        },
        "required": ["summary"],
    })
}
