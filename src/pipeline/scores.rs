//! Classifier ensemble seam.
//!
//! The triage engine never depends on which model implementation
//! produced a score — scores reach it through this capability
//! interface. Production runs bind the probabilities already present on
//! the ingested row (the models run upstream); tests substitute fixed
//! ensembles.

use crate::error::ScoreError;
use crate::pipeline::types::{Conversation, Scores};

/// Uniform `score(record) → probability` capability over the four
/// per-conversation classifiers.
pub trait ModelEnsemble: Send + Sync {
    /// Ensemble name for logging.
    fn name(&self) -> &str;

    /// Produce all four probabilities for one conversation.
    fn score(&self, conversation: &Conversation) -> Result<Scores, ScoreError>;
}

/// Binds the probability columns carried on the input row.
///
/// This is the production ensemble: scoring already happened upstream,
/// so "scoring" here is a column read.
pub struct PrecomputedEnsemble;

impl ModelEnsemble for PrecomputedEnsemble {
    fn name(&self) -> &str {
        "precomputed"
    }

    fn score(&self, conversation: &Conversation) -> Result<Scores, ScoreError> {
        Ok(Scores {
            tripler: conversation.tripler_probability,
            name_provided: conversation.name_provided_probability,
            optout: conversation.optout_probability,
            wrong_number: conversation.wrongnumber_probability,
        })
    }
}

/// Fixed-output ensemble for tests.
#[cfg(test)]
pub struct FixedEnsemble(pub Scores);

#[cfg(test)]
impl ModelEnsemble for FixedEnsemble {
    fn name(&self) -> &str {
        "fixed"
    }

    fn score(&self, _conversation: &Conversation) -> Result<Scores, ScoreError> {
        Ok(self.0)
    }
}
