//! Storage backends — pure I/O, no triage logic.
//!
//! Two interchangeable backends implement the `RecordSource` /
//! `TableSink` seams: flat CSV files under a home directory, and a
//! libSQL warehouse database. Both enforce the same input contract.

pub mod csv_backend;
pub mod libsql_backend;
pub mod traits;

pub use csv_backend::CsvStore;
pub use libsql_backend::WarehouseStore;
pub use traits::{RecordSource, TableSink};

use crate::error::SchemaError;

/// Columns every input table must carry, whatever the backend.
/// The upstream response-stage flags are validated even though no
/// triage rule reads them — their absence means the aggregation step
/// upstream was skipped.
pub const REQUIRED_COLUMNS: &[&str] = &[
    "noresponse",
    "negresponse",
    "posresponse",
    "affirmresponse",
    "finalaffirmresponse",
    "triplemessage",
    "voterresponse",
    "voterfinal",
    "voterpost",
    "conversationid",
    "contact_phone",
    "manual_review",
    "tripler_probability",
    "name_provided_probability",
    "optout_probability",
    "wrongnumber_probability",
    "names_extract",
    "name_prob1",
    "name_prob2",
    "name_prob3",
];

/// Reject probabilities outside [0, 1] — a fatal input-contract
/// violation, never clamped. The engine's strict inequalities would
/// make clamping indistinguishable from data corruption.
pub fn check_probability(row: usize, column: &str, value: f64) -> Result<f64, SchemaError> {
    if !(0.0..=1.0).contains(&value) || value.is_nan() {
        return Err(SchemaError::ProbabilityRange {
            row,
            column: column.to_string(),
            value,
        });
    }
    Ok(value)
}

/// Parse an upstream boolean flag. Warehouse exports use `t`/`f`;
/// flat files carry `True`/`False` or `1`/`0`. Empty means false
/// (an unset flag, not an error).
pub fn parse_flag(row: usize, column: &str, value: &str) -> Result<bool, SchemaError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "t" | "true" | "1" | "yes" => Ok(true),
        "f" | "false" | "0" | "no" | "" => Ok(false),
        other => Err(SchemaError::BadField {
            row,
            column: column.to_string(),
            value: other.to_string(),
            reason: "expected a boolean flag".to_string(),
        }),
    }
}
