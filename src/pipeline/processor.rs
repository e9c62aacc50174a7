//! Batch annotator — scrubs, scores, and partitions conversations.
//!
//! Flow:
//! 1. Text pre-pass — blank auto-replies, recompute token counts
//! 2. Ensemble scoring — bind the four classifier probabilities
//! 3. Triage engine — partition into the three output tables
//!
//! The pre-pass runs before scoring and triage on purpose: the
//! catch-rule reads `num_tokens_final`, which only exists after
//! scrubbing.

use std::sync::Arc;

use tracing::info;

use crate::error::ScoreError;
use crate::pipeline::engine::TriageEngine;
use crate::pipeline::scores::ModelEnsemble;
use crate::pipeline::text::AutoReplyScrubber;
use crate::pipeline::types::{Conversation, ScoredConversation, TriageOutput};

/// Runs one full annotation pass over a batch of conversations.
pub struct Annotator {
    scrubber: AutoReplyScrubber,
    ensemble: Arc<dyn ModelEnsemble>,
    engine: TriageEngine,
}

impl Annotator {
    pub fn new(ensemble: Arc<dyn ModelEnsemble>, engine: TriageEngine) -> Self {
        Self {
            scrubber: AutoReplyScrubber::new(),
            ensemble,
            engine,
        }
    }

    /// Annotate a batch. A scoring failure fails the whole pass — there
    /// is no partial-result contract, and the engine does not impute.
    pub fn annotate(&self, conversations: Vec<Conversation>) -> Result<TriageOutput, ScoreError> {
        let count = conversations.len();
        info!(count, ensemble = self.ensemble.name(), "Annotating conversations");

        let mut scored = Vec::with_capacity(count);
        for mut conversation in conversations {
            self.scrubber.scrub(&mut conversation);
            let scores = self.ensemble.score(&conversation)?;
            scored.push(ScoredConversation {
                conversation,
                scores,
            });
        }

        let output = self.engine.partition(&scored);
        info!(
            triplers = output.triplers.len(),
            optouts = output.optouts.len(),
            review = output.review.len(),
            dropped = count.saturating_sub(output.total_rows()),
            "Triage complete"
        );
        Ok(output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::scores::{FixedEnsemble, PrecomputedEnsemble};
    use crate::pipeline::types::Scores;

    fn conversation(id: &str, tripler: f64, name: f64, optout: f64, wrong: f64) -> Conversation {
        Conversation {
            conversation_id: id.into(),
            contact_phone: "+15551234567".into(),
            triple_message: "Will you remind 3 friends to vote?".into(),
            voter_response: "yes".into(),
            voter_final: "Maria and Jose".into(),
            voter_post: String::new(),
            no_response: false,
            neg_response: false,
            pos_response: true,
            affirm_response: false,
            final_affirm_response: false,
            manual_review: false,
            num_tokens_response: 0,
            num_tokens_final: 0,
            num_tokens_post: 0,
            tripler_probability: tripler,
            name_provided_probability: name,
            optout_probability: optout,
            wrongnumber_probability: wrong,
            names_extract: "Maria, Jose".into(),
            name_prob1: 0.0,
            name_prob2: 0.0,
            name_prob3: 0.0,
        }
    }

    #[test]
    fn annotate_partitions_a_mixed_batch() {
        let annotator = Annotator::new(Arc::new(PrecomputedEnsemble), TriageEngine::default());
        let batch = vec![
            conversation("tripler", 0.9, 0.9, 0.1, 0.1),
            conversation("optout", 0.1, 0.1, 0.8, 0.1),
            conversation("review", 0.6, 0.9, 0.1, 0.1),
            conversation("dropped", 0.1, 0.1, 0.1, 0.1),
        ];

        let out = annotator.annotate(batch).unwrap();
        assert_eq!(out.triplers.len(), 1);
        assert_eq!(out.optouts.len(), 1);
        assert_eq!(out.review.len(), 1);
        assert_eq!(out.triplers[0].conversation_id, "tripler");
        assert_eq!(out.optouts[0].conversation_id, "optout");
        assert_eq!(out.review[0].conversation_id, "review");
    }

    #[test]
    fn annotate_scrubs_before_triage() {
        // The final message is a long auto-reply; only after scrubbing
        // does num_tokens_final drop below 5 and trip the catch-rule.
        let mut conv = conversation("c1", 0.1, 0.2, 0.1, 0.1);
        conv.voter_final = "[Auto-Reply] I am driving and will reply later".into();
        conv.name_prob1 = 0.9;
        conv.name_prob2 = 0.8;
        conv.name_prob3 = 0.1;

        let annotator = Annotator::new(Arc::new(PrecomputedEnsemble), TriageEngine::default());
        let out = annotator.annotate(vec![conv]).unwrap();
        assert_eq!(out.review.len(), 1);
        assert_eq!(out.review[0].voter_final, "");
    }

    #[test]
    fn annotate_scores_through_the_ensemble_seam() {
        // Fixed ensemble overrides whatever the columns say.
        let fixed = FixedEnsemble(Scores {
            tripler: 0.9,
            name_provided: 0.9,
            optout: 0.1,
            wrong_number: 0.1,
        });
        let annotator = Annotator::new(Arc::new(fixed), TriageEngine::default());
        let out = annotator
            .annotate(vec![conversation("c1", 0.0, 0.0, 0.0, 0.0)])
            .unwrap();
        assert_eq!(out.triplers.len(), 1);
    }
}
