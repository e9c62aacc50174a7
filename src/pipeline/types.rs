//! Shared types for the conversation triage pipeline.

use serde::Serialize;

// ── Conversation record ─────────────────────────────────────────────

/// One voter-outreach conversation, as ingested from the scored table.
///
/// Text fields are never null — ingest substitutes the empty string, the
/// canonical "no content" value. Token counts are recomputed by the text
/// pre-pass after auto-reply scrubbing, so the ingested values are only
/// a starting point.
#[derive(Debug, Clone)]
pub struct Conversation {
    /// Externally assigned conversation identifier.
    pub conversation_id: String,
    /// Phone number the outreach was sent to.
    pub contact_phone: String,
    /// The outbound ask sent to the voter.
    pub triple_message: String,
    /// First voter reply.
    pub voter_response: String,
    /// Voter reply to the final ask.
    pub voter_final: String,
    /// Any post-conversation voter message.
    pub voter_post: String,
    /// Upstream response-stage flags. Validated present on ingest;
    /// no triage rule reads them.
    pub no_response: bool,
    pub neg_response: bool,
    pub pos_response: bool,
    pub affirm_response: bool,
    pub final_affirm_response: bool,
    /// A human already flagged this conversation for review upstream.
    pub manual_review: bool,
    /// Space-count token totals per text field (see `pipeline::text`).
    pub num_tokens_response: u32,
    pub num_tokens_final: u32,
    pub num_tokens_post: u32,
    /// Upstream classifier probabilities, each in [0, 1]. The engine
    /// never reads these directly — they reach it through a
    /// `ModelEnsemble` as `Scores`.
    pub tripler_probability: f64,
    pub name_provided_probability: f64,
    pub optout_probability: f64,
    pub wrongnumber_probability: f64,
    /// Names the extractor believes were mentioned (possibly empty).
    pub names_extract: String,
    /// Ranked confidence that a 1st/2nd/3rd distinct name was present.
    /// `name_prob3 == 0.0` means no third-name candidate was considered
    /// at all, which is distinct from a low-but-nonzero value.
    pub name_prob1: f64,
    pub name_prob2: f64,
    pub name_prob3: f64,
}

// ── Scores ──────────────────────────────────────────────────────────

/// The four classifier outputs for one conversation.
///
/// Each is an independent probability in [0, 1]; no cross-consistency
/// is guaranteed (tripler and optout can both be high).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Scores {
    pub tripler: f64,
    pub name_provided: f64,
    pub optout: f64,
    pub wrong_number: f64,
}

/// A conversation paired with its ensemble scores — the engine's input
/// unit. Every numeric/boolean field is populated; the engine does not
/// impute.
#[derive(Debug, Clone)]
pub struct ScoredConversation {
    pub conversation: Conversation,
    pub scores: Scores,
}

// ── Labels ──────────────────────────────────────────────────────────

/// Categorical "yes"/"no" label assigned by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Label {
    Yes,
    No,
}

impl Label {
    /// "yes" iff `probability >= cutoff`.
    pub fn at_least(probability: f64, cutoff: f64) -> Self {
        if probability >= cutoff { Self::Yes } else { Self::No }
    }

    /// Wire string, as written to every output table.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Yes => "yes",
            Self::No => "no",
        }
    }
}

// ── Output projections ──────────────────────────────────────────────
//
// Serde rename attributes carry the original wire column names so both
// the CSV and warehouse sinks emit the schema downstream expects.

/// Auto-confirmed tripler.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TriplerRow {
    #[serde(rename = "conversationid")]
    pub conversation_id: String,
    pub contact_phone: String,
    pub is_tripler: Label,
    pub opted_out: Label,
    pub wrong_number: Label,
    pub names_extract: String,
}

/// Auto-rejected: opt-out and/or wrong number.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OptoutRow {
    #[serde(rename = "conversationid")]
    pub conversation_id: String,
    pub contact_phone: String,
    pub opted_out: Label,
    pub wrong_number: Label,
}

/// Needs human adjudication. Carries the conversation text so the
/// reviewer sees what the voter actually wrote.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReviewRow {
    #[serde(rename = "conversationid")]
    pub conversation_id: String,
    pub contact_phone: String,
    #[serde(rename = "voterresponse")]
    pub voter_response: String,
    #[serde(rename = "voterfinal")]
    pub voter_final: String,
    #[serde(rename = "voterpost")]
    pub voter_post: String,
    pub is_tripler: Label,
    pub opted_out: Label,
    pub wrong_number: Label,
    pub names_extract: String,
}

// ── Partition result ────────────────────────────────────────────────

/// The three output tables produced by one engine pass.
///
/// Membership is per-bucket: a conversation may appear in zero, one, or
/// several tables (see `OverlapPolicy`). A record matching no bucket is
/// dropped from all outputs — that is intended behavior, not an error.
#[derive(Debug, Default)]
pub struct TriageOutput {
    pub triplers: Vec<TriplerRow>,
    pub optouts: Vec<OptoutRow>,
    pub review: Vec<ReviewRow>,
}

impl TriageOutput {
    /// Total rows across all three tables (duplicates counted).
    pub fn total_rows(&self) -> usize {
        self.triplers.len() + self.optouts.len() + self.review.len()
    }
}
