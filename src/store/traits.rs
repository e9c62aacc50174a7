//! Source and sink traits — the swappable I/O seam.
//!
//! Backends handle loading scored records and persisting the output
//! tables. Triage logic lives entirely in `pipeline`; swapping flat
//! files for the warehouse must never change a triage decision.

use async_trait::async_trait;

use crate::error::Error;
use crate::pipeline::types::{Conversation, TriageOutput};

/// Loads the scored conversation table, validating the input contract.
#[async_trait]
pub trait RecordSource: Send + Sync {
    /// Backend name (e.g. "flat-file", "warehouse").
    fn name(&self) -> &str;

    /// Load every input row. Fails fast on schema violations — a
    /// missing required column is named in the error.
    async fn load(&self) -> Result<Vec<Conversation>, Error>;
}

/// Persists the three output tables.
#[async_trait]
pub trait TableSink: Send + Sync {
    /// Backend name (e.g. "flat-file", "warehouse").
    fn name(&self) -> &str;

    /// Write all three tables. A full pass either completes or the
    /// whole run is treated as failed; there is no partial commit
    /// contract.
    async fn persist(&self, output: &TriageOutput) -> Result<(), Error>;
}
