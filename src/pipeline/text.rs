//! Text pre-pass: auto-reply scrubbing and token counting.
//!
//! Runs between ingest and the triage engine. Vehicle auto-responders
//! ("[Auto-Reply] I'm driving...", "Sent from my car") are not voter
//! speech, so matching fields are rewritten to the empty string before
//! token counts are derived.

use regex::Regex;
use tracing::debug;

use crate::pipeline::types::Conversation;

/// Scrubs auto-responder text out of the three voter-authored fields
/// and recomputes their token counts.
pub struct AutoReplyScrubber {
    pattern: Regex,
}

impl AutoReplyScrubber {
    /// The `[Auto-Reply]` / `[Auto Reply]` prefix must sit at the start
    /// of the field; "Sent from my car" matches anywhere.
    pub fn new() -> Self {
        Self {
            pattern: Regex::new(r"(?i)(^\[Auto[- ]?Reply\])|(Sent from my car)").unwrap(),
        }
    }

    /// True if the field is an auto-responder message.
    pub fn is_auto_reply(&self, text: &str) -> bool {
        self.pattern.is_match(text)
    }

    /// Blank auto-responder fields, then recompute all token counts.
    pub fn scrub(&self, conversation: &mut Conversation) {
        for field in [
            &mut conversation.voter_response,
            &mut conversation.voter_final,
            &mut conversation.voter_post,
        ] {
            if self.pattern.is_match(field) {
                debug!(
                    conversation_id = %conversation.conversation_id,
                    text = %field,
                    "Scrubbing auto-reply text"
                );
                field.clear();
            }
        }

        conversation.num_tokens_response = count_tokens(&conversation.voter_response);
        conversation.num_tokens_final = count_tokens(&conversation.voter_final);
        conversation.num_tokens_post = count_tokens(&conversation.voter_post);
    }
}

impl Default for AutoReplyScrubber {
    fn default() -> Self {
        Self::new()
    }
}

/// Word count approximated by space-splitting: the number of space
/// characters, plus one unless the field is empty (so an empty field
/// yields 0 tokens rather than 1).
pub fn count_tokens(text: &str) -> u32 {
    let spaces = text.matches(' ').count() as u32;
    if text.is_empty() { spaces } else { spaces + 1 }
}
