//! Deterministic prompt assembly.
//!
//! [`build_prompt`] is a pure function: identical params render identical
//! text, with no I/O and no clock. Segments appear in a fixed order and
//! are joined by one blank line:
//!
//! 1. persona instructions (always)
//! 2. age-group modifier (`children` and `teenagers` only)
//! 3. affect annotations (only when a stable verdict exists)
//! 4. history window, most recent first (only when history is non-empty)
//! 5. the new user message, cueing the assistant's turn
//!
//! History is rendered newest-first on purpose: the model weights early
//! context more heavily, and the latest exchanges matter most here.

use attune_core::affect::{FacialExpression, VocalTone};
use attune_core::messages::{AgeGroup, Message};

/// Base persona instructions, present in every prompt.
pub const PERSONA: &str = "You are a warm, attentive emotional support companion. \
Listen closely, validate feelings without judging them, and reply in a few \
natural, conversational sentences. Offer gentle perspective when it helps. \
Never lecture, diagnose, or claim to be a therapist.";

/// Tone modifier rendered for the `children` age group.
pub const CHILDREN_MODIFIER: &str = "You are talking with a young child. Use \
short, simple sentences and friendly, concrete words. Be playful and \
reassuring, and avoid anything frightening or abstract.";

/// Tone modifier rendered for the `teenagers` age group.
pub const TEENAGERS_MODIFIER: &str = "You are talking with a teenager. Be \
genuine and straightforward rather than formal. Respect their independence, \
skip forced slang, and never talk down to them.";

/// Closing line of the affect block: the hints steer tone, silently.
pub const AFFECT_INSTRUCTION: &str = "Let these hints quietly inform your \
reply. Do not mention how you sensed them unless asked directly.";

/// Maximum history entries rendered into one prompt.
pub const HISTORY_WINDOW: usize = 10;

/// Everything [`build_prompt`] needs for one turn.
#[derive(Clone, Copy, Debug)]
pub struct PromptParams<'a> {
    /// The new user message. Validated non-blank by the session; the
    /// builder renders whatever it is given.
    pub message: &'a str,
    /// Declared age bracket in force for this turn.
    pub age_group: AgeGroup,
    /// Stable facial verdict at send time, if any.
    pub detected_emotion: Option<FacialExpression>,
    /// Stable vocal verdict at send time, if any.
    pub detected_tone: Option<VocalTone>,
    /// Conversation so far, oldest first, excluding the new message.
    pub history: &'a [Message],
}

/// Render one prompt string from the params.
#[must_use]
pub fn build_prompt(params: &PromptParams<'_>) -> String {
    let mut segments: Vec<String> = vec![PERSONA.to_string()];

    match params.age_group {
        AgeGroup::Children => segments.push(CHILDREN_MODIFIER.to_string()),
        AgeGroup::Teenagers => segments.push(TEENAGERS_MODIFIER.to_string()),
        AgeGroup::Adults => {}
    }

    if params.detected_emotion.is_some() || params.detected_tone.is_some() {
        segments.push(affect_block(params.detected_emotion, params.detected_tone));
    }

    if !params.history.is_empty() {
        segments.push(history_block(params.history));
    }

    segments.push(format!("USER: {}\nASSISTANT:", params.message));
    segments.join("\n\n")
}

fn affect_block(emotion: Option<FacialExpression>, tone: Option<VocalTone>) -> String {
    let mut lines = Vec::new();
    if let Some(emotion) = emotion {
        lines.push(format!(
            "Hint: their facial expression currently reads as {emotion}."
        ));
    }
    if let Some(tone) = tone {
        lines.push(format!("Hint: their tone of voice sounds {tone}."));
    }
    lines.push(AFFECT_INSTRUCTION.to_string());
    lines.join("\n")
}

fn history_block(history: &[Message]) -> String {
    history
        .iter()
        .rev()
        .take(HISTORY_WINDOW)
        .map(|message| format!("{}: {}", message.role.prompt_marker(), message.content))
        .collect::<Vec<_>>()
        .join("\n")
}
