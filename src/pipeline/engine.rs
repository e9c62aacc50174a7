//! Triage decision engine.
//!
//! Partitions scored conversations into three output tables:
//! - `triplers` — confident enough to auto-confirm
//! - `optouts` — confident opt-out / wrong number, auto-rejected
//! - `review` — automated confidence insufficient, needs a human
//!
//! The engine is a pure function over a fixed input snapshot: each
//! record is evaluated once, statelessly, against three independent
//! bucket predicates. Buckets are not mutually exclusive by
//! construction — see `OverlapPolicy`.

use std::collections::HashSet;

use tracing::debug;

use crate::pipeline::thresholds::Thresholds;
use crate::pipeline::types::{
    Label, OptoutRow, ReviewRow, ScoredConversation, TriageOutput, TriplerRow,
};

/// What to do about a record selected twice for manual review.
///
/// The review bucket is the union of two rule-sets (the primary
/// uncertainty predicate and the missed-third-name catch-rule), and a
/// record can satisfy both. Whether that duplication is intended or a
/// latent defect of the rule design is an open question upstream, so
/// the choice is explicit configuration rather than an accident of rule
/// order.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OverlapPolicy {
    /// Faithful to the source rules: duplicate review rows are kept,
    /// and cross-bucket overlap is left untouched.
    #[default]
    Preserve,
    /// Collapse duplicate review rows by conversation id, first
    /// occurrence wins. Cross-bucket overlap is still left untouched.
    DedupeReview,
}

/// The triage rule set, bound to one threshold regime.
pub struct TriageEngine {
    thresholds: Thresholds,
    overlap: OverlapPolicy,
}

impl TriageEngine {
    pub fn new(thresholds: Thresholds, overlap: OverlapPolicy) -> Self {
        Self {
            thresholds,
            overlap,
        }
    }

    /// Engine with the given thresholds and the faithful overlap policy.
    pub fn with_thresholds(thresholds: Thresholds) -> Self {
        Self::new(thresholds, OverlapPolicy::Preserve)
    }

    // ── Bucket predicates ───────────────────────────────────────────

    /// Auto-confirm: the tripler signal is confidently present, the
    /// name and opt-out signals are out of the uncertain band either
    /// way, and no human has already flagged the conversation.
    fn is_tripler(&self, record: &ScoredConversation) -> bool {
        let t = &self.thresholds;
        record.scores.tripler > t.upper
            && t.decisive(record.scores.name_provided)
            && t.decisive(record.scores.optout)
            && !record.conversation.manual_review
    }

    /// Auto-reject: confidently not a tripler, and confidently an
    /// opt-out or a wrong number. `tripler < lower` is strict — a score
    /// exactly at the bound does not count as confidently absent.
    fn is_optout(&self, record: &ScoredConversation) -> bool {
        let t = &self.thresholds;
        record.scores.tripler < t.lower
            && (record.scores.optout > t.upper || record.scores.wrong_number > t.upper)
    }

    /// Primary review predicate: plausibly a tripler, with at least one
    /// signal in the uncertain band or an upstream human flag.
    fn needs_review(&self, record: &ScoredConversation) -> bool {
        let t = &self.thresholds;
        record.scores.tripler > t.lower
            && (record.scores.tripler < t.upper
                || t.uncertain(record.scores.name_provided)
                || t.uncertain(record.scores.optout)
                || record.conversation.manual_review)
    }

    /// Catch-rule: two names extracted with high confidence and a weak
    /// but considered third candidate in a short final message — the
    /// extractor likely missed a third name. `name_prob3 > 0` is
    /// strict: a probability of exactly zero means no third-name
    /// candidate existed at all.
    fn missed_third_name(&self, record: &ScoredConversation) -> bool {
        let t = &self.thresholds;
        let c = &record.conversation;
        c.name_prob1 > t.upper
            && c.name_prob2 > t.upper
            && c.name_prob3 < t.lower
            && c.name_prob3 > 0.0
            && c.num_tokens_final < 5
    }

    // ── Label derivation ────────────────────────────────────────────

    fn tripler_row(&self, record: &ScoredConversation) -> TriplerRow {
        let t = &self.thresholds;
        let c = &record.conversation;
        TriplerRow {
            conversation_id: c.conversation_id.clone(),
            contact_phone: c.contact_phone.clone(),
            // Entry required tripler > upper, so the label is constant.
            is_tripler: Label::Yes,
            opted_out: Label::at_least(record.scores.optout, t.upper),
            wrong_number: Label::at_least(record.scores.wrong_number, t.upper),
            // Names are kept only when confidently present.
            names_extract: if record.scores.name_provided < t.upper {
                String::new()
            } else {
                c.names_extract.clone()
            },
        }
    }

    fn optout_row(&self, record: &ScoredConversation) -> OptoutRow {
        let t = &self.thresholds;
        let c = &record.conversation;
        OptoutRow {
            conversation_id: c.conversation_id.clone(),
            contact_phone: c.contact_phone.clone(),
            opted_out: Label::at_least(record.scores.optout, t.upper),
            wrong_number: Label::at_least(record.scores.wrong_number, t.upper),
        }
    }

    /// Review labels are best guesses for the human, cut at `mid`
    /// rather than `upper`/`lower`.
    fn review_row(&self, record: &ScoredConversation) -> ReviewRow {
        let t = &self.thresholds;
        let c = &record.conversation;
        ReviewRow {
            conversation_id: c.conversation_id.clone(),
            contact_phone: c.contact_phone.clone(),
            voter_response: c.voter_response.clone(),
            voter_final: c.voter_final.clone(),
            voter_post: c.voter_post.clone(),
            is_tripler: Label::at_least(record.scores.tripler, t.mid),
            opted_out: Label::at_least(record.scores.optout, t.mid),
            wrong_number: Label::at_least(record.scores.wrong_number, t.mid),
            names_extract: if record.scores.name_provided < t.mid {
                String::new()
            } else {
                c.names_extract.clone()
            },
        }
    }

    // ── Partitioning ────────────────────────────────────────────────

    /// Evaluate every record against the three bucket predicates and
    /// project the matching rows.
    ///
    /// Records are tested against each bucket independently; a record
    /// matching no bucket is dropped from all outputs. Within `review`,
    /// primary-rule rows come first (in input order), catch-rule rows
    /// after, matching the source rule-set's union order.
    pub fn partition(&self, records: &[ScoredConversation]) -> TriageOutput {
        let mut output = TriageOutput::default();

        for record in records {
            let id = &record.conversation.conversation_id;
            if self.is_tripler(record) {
                debug!(conversation_id = %id, "Matched tripler bucket");
                output.triplers.push(self.tripler_row(record));
            }
            if self.is_optout(record) {
                debug!(conversation_id = %id, "Matched optout bucket");
                output.optouts.push(self.optout_row(record));
            }
            if self.needs_review(record) {
                debug!(conversation_id = %id, "Matched review bucket");
                output.review.push(self.review_row(record));
            }
        }

        for record in records {
            if self.missed_third_name(record) {
                debug!(
                    conversation_id = %record.conversation.conversation_id,
                    name_prob3 = record.conversation.name_prob3,
                    num_tokens_final = record.conversation.num_tokens_final,
                    "Matched missed-third-name catch-rule"
                );
                output.review.push(self.review_row(record));
            }
        }

        if self.overlap == OverlapPolicy::DedupeReview {
            let before = output.review.len();
            let mut seen = HashSet::new();
            output
                .review
                .retain(|row| seen.insert(row.conversation_id.clone()));
            if output.review.len() < before {
                debug!(
                    collapsed = before - output.review.len(),
                    "Collapsed duplicate review rows"
                );
            }
        }

        output
    }
}

impl Default for TriageEngine {
    fn default() -> Self {
        Self::with_thresholds(Thresholds::default())
    }
}
