//! Prompt composition for debate turns and post-debate summaries
//!
//! Both composers are pure functions over the topic and the ordered message
//! history. History is always included in full, verbatim and in order; the
//! closed set of allowed turn budgets is what bounds prompt growth.

use crate::persona::{persona, Persona, PersonaKey};

/// Line inserted in place of the history block for the opening turn.
const OPENING_SENTINEL: &str = "(No one has spoken yet. You open the debate.)";

fn render_history(history: &[(PersonaKey, String)], separator: &str) -> String {
    history
        .iter()
        .map(|(key, content)| format!("{}: {}", persona(*key).name, content))
        .collect::<Vec<_>>()
        .join(separator)
}

/// Compose the prompt for one debate turn.
///
/// Structure: the speaker's voice block, the topic, the conversation so far
/// (or the opening sentinel), then the fixed closing directives.
pub fn compose_turn_prompt(
    speaker: PersonaKey,
    topic: &str,
    history: &[(PersonaKey, String)],
) -> String {
    let p: &Persona = persona(speaker);

    let history_text = if history.is_empty() {
        OPENING_SENTINEL.to_string()
    } else {
        render_history(history, "\n")
    };

    format!(
        "{voice}\n\
         \n\
         [Debate topic]\n\
         {topic}\n\
         \n\
         [Conversation so far]\n\
         {history_text}\n\
         \n\
         Continue the conversation above, speaking in character.\n\
         - Keep it to 3-5 sentences, short and punchy.\n\
         - React directly to things said before you.\n\
         - Never mention your own name or role. Just say what you want to say.",
        voice = p.voice,
        topic = topic,
        history_text = history_text,
    )
}

/// Compose the one-shot summary prompt over a finished debate.
///
/// Asks for a bare JSON object mapping each roster member's screen name to a
/// 2-3 sentence summary of their position.
pub fn compose_summary_prompt(
    topic: &str,
    roster: &[PersonaKey],
    history: &[(PersonaKey, String)],
) -> String {
    let history_text = render_history(history, "\n\n");

    let shape = roster
        .iter()
        .map(|key| format!("  \"{}\": \"...\"", persona(*key).name))
        .collect::<Vec<_>>()
        .join(",\n");

    format!(
        "The following is an AI debate on the topic \"{topic}\".\n\
         \n\
         {history_text}\n\
         \n\
         Summarize the core position each participant argued, as a JSON object\n\
         in exactly this shape. Keep each summary to 2-3 sentences.\n\
         \n\
         {{\n{shape}\n}}\n\
         \n\
         Output only the JSON object and no other text.",
        topic = topic,
        history_text = history_text,
        shape = shape,
    )
}

/// Strip markdown code fences a model may wrap JSON output in.
pub fn strip_code_fences(raw: &str) -> String {
    raw.replace("```json", "").replace("```", "").trim().to_string()
}
