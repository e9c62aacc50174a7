//! Conversation triage pipeline.
//!
//! Every scored conversation flows through:
//! 1. `AutoReplyScrubber` — blank auto-responder text, recount tokens
//! 2. `ModelEnsemble` — bind the four classifier probabilities
//! 3. `TriageEngine::partition()` — threshold rules → three tables
//!
//! I/O stays outside this module: sources and sinks live in `store`.

pub mod engine;
pub mod processor;
pub mod scores;
pub mod text;
pub mod thresholds;
pub mod types;
