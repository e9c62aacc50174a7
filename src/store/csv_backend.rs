//! Flat-file backend: one scored CSV in, three labeled CSVs out.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::Serialize;
use tracing::info;

use crate::config::RunConfig;
use crate::error::{Error, SchemaError, StoreError};
use crate::pipeline::types::{Conversation, TriageOutput};
use crate::store::traits::{RecordSource, TableSink};
use crate::store::{REQUIRED_COLUMNS, check_probability, parse_flag};

// Headers are written by hand when a table comes out empty; serde only
// emits them alongside the first row.
const TRIPLER_HEADER: &[&str] = &[
    "conversationid",
    "contact_phone",
    "is_tripler",
    "opted_out",
    "wrong_number",
    "names_extract",
];
const OPTOUT_HEADER: &[&str] = &[
    "conversationid",
    "contact_phone",
    "opted_out",
    "wrong_number",
];
const REVIEW_HEADER: &[&str] = &[
    "conversationid",
    "contact_phone",
    "voterresponse",
    "voterfinal",
    "voterpost",
    "is_tripler",
    "opted_out",
    "wrong_number",
    "names_extract",
];

/// CSV files under a home directory: input from `Input_Data/`, the
/// three output tables into `Output_Data/`.
pub struct CsvStore {
    input_path: PathBuf,
    output_dir: PathBuf,
    triplers_out: String,
    optouts_out: String,
    review_out: String,
}

impl CsvStore {
    pub fn new(config: &RunConfig) -> Self {
        Self {
            input_path: config.input_path(),
            output_dir: config.output_dir(),
            triplers_out: config.triplers_out.clone(),
            optouts_out: config.optouts_out.clone(),
            review_out: config.review_out.clone(),
        }
    }

    /// Store reading and writing in the given directories directly,
    /// without the `Input_Data`/`Output_Data` layout (tests).
    pub fn with_paths(input_path: PathBuf, output_dir: PathBuf, config: &RunConfig) -> Self {
        Self {
            input_path,
            output_dir,
            triplers_out: config.triplers_out.clone(),
            optouts_out: config.optouts_out.clone(),
            review_out: config.review_out.clone(),
        }
    }
}

#[async_trait]
impl RecordSource for CsvStore {
    fn name(&self) -> &str {
        "flat-file"
    }

    async fn load(&self) -> Result<Vec<Conversation>, Error> {
        let conversations = read_input(&self.input_path)?;
        info!(
            rows = conversations.len(),
            path = %self.input_path.display(),
            "Loaded scored conversations"
        );
        Ok(conversations)
    }
}

#[async_trait]
impl TableSink for CsvStore {
    fn name(&self) -> &str {
        "flat-file"
    }

    async fn persist(&self, output: &TriageOutput) -> Result<(), Error> {
        std::fs::create_dir_all(&self.output_dir).map_err(StoreError::Io)?;

        let triplers_path = self.output_dir.join(&self.triplers_out);
        write_table(&triplers_path, &output.triplers, TRIPLER_HEADER)?;
        info!(rows = output.triplers.len(), path = %triplers_path.display(), "Wrote triplers");

        let optouts_path = self.output_dir.join(&self.optouts_out);
        write_table(&optouts_path, &output.optouts, OPTOUT_HEADER)?;
        info!(rows = output.optouts.len(), path = %optouts_path.display(), "Wrote optouts");

        let review_path = self.output_dir.join(&self.review_out);
        write_table(&review_path, &output.review, REVIEW_HEADER)?;
        info!(rows = output.review.len(), path = %review_path.display(), "Wrote manual review");

        Ok(())
    }
}

// ── Reading ─────────────────────────────────────────────────────────

fn read_input(path: &Path) -> Result<Vec<Conversation>, Error> {
    let mut reader = csv::Reader::from_path(path).map_err(StoreError::Csv)?;
    let headers = reader.headers().map_err(StoreError::Csv)?.clone();
    let index: HashMap<&str, usize> = headers
        .iter()
        .enumerate()
        .map(|(position, name)| (name, position))
        .collect();

    for column in REQUIRED_COLUMNS {
        if !index.contains_key(column) {
            return Err(SchemaError::MissingColumn(column.to_string()).into());
        }
    }

    let mut conversations = Vec::new();
    for (i, result) in reader.records().enumerate() {
        // 1-based data row number, header excluded.
        let row = i + 1;
        let record = result.map_err(StoreError::Csv)?;

        // Missing/null text cells recover to the empty string.
        let text = |column: &str| record.get(index[column]).unwrap_or("").to_string();
        let flag =
            |column: &str| parse_flag(row, column, record.get(index[column]).unwrap_or(""));
        let prob = |column: &str| -> Result<f64, SchemaError> {
            let raw = record.get(index[column]).unwrap_or("").trim();
            let value = raw.parse::<f64>().map_err(|e| SchemaError::BadField {
                row,
                column: column.to_string(),
                value: raw.to_string(),
                reason: e.to_string(),
            })?;
            check_probability(row, column, value)
        };

        conversations.push(Conversation {
            conversation_id: text("conversationid"),
            contact_phone: text("contact_phone"),
            triple_message: text("triplemessage"),
            voter_response: text("voterresponse"),
            voter_final: text("voterfinal"),
            voter_post: text("voterpost"),
            no_response: flag("noresponse")?,
            neg_response: flag("negresponse")?,
            pos_response: flag("posresponse")?,
            affirm_response: flag("affirmresponse")?,
            final_affirm_response: flag("finalaffirmresponse")?,
            manual_review: flag("manual_review")?,
            // Token counts are derived by the text pre-pass.
            num_tokens_response: 0,
            num_tokens_final: 0,
            num_tokens_post: 0,
            tripler_probability: prob("tripler_probability")?,
            name_provided_probability: prob("name_provided_probability")?,
            optout_probability: prob("optout_probability")?,
            wrongnumber_probability: prob("wrongnumber_probability")?,
            names_extract: text("names_extract"),
            name_prob1: prob("name_prob1")?,
            name_prob2: prob("name_prob2")?,
            name_prob3: prob("name_prob3")?,
        });
    }

    Ok(conversations)
}

// ── Writing ─────────────────────────────────────────────────────────

fn write_table<T: Serialize>(path: &Path, rows: &[T], header: &[&str]) -> Result<(), StoreError> {
    let mut writer = csv::Writer::from_path(path)?;
    if rows.is_empty() {
        writer.write_record(header)?;
    }
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::types::{Label, OptoutRow};

    const INPUT_HEADER: &str = "noresponse,negresponse,posresponse,affirmresponse,\
        finalaffirmresponse,triplemessage,voterresponse,voterfinal,voterpost,\
        conversationid,contact_phone,manual_review,tripler_probability,\
        name_provided_probability,optout_probability,wrongnumber_probability,\
        names_extract,name_prob1,name_prob2,name_prob3";

    fn store_for(dir: &Path) -> CsvStore {
        CsvStore::with_paths(
            dir.join("input.csv"),
            dir.to_path_buf(),
            &RunConfig::default(),
        )
    }

    fn write_input(dir: &Path, rows: &[&str]) {
        let mut contents = String::from(INPUT_HEADER);
        for row in rows {
            contents.push('\n');
            contents.push_str(row);
        }
        std::fs::write(dir.join("input.csv"), contents).unwrap();
    }

    #[tokio::test]
    async fn loads_scored_rows() {
        let dir = tempfile::tempdir().unwrap();
        write_input(
            dir.path(),
            &[
                "f,f,t,f,f,Will you remind 3 friends?,yes,Maria and Jose,,c1,+15551234567,f,0.9,0.8,0.1,0.05,\"Maria, Jose\",0.9,0.8,0.0",
            ],
        );

        let rows = store_for(dir.path()).load().await.unwrap();
        assert_eq!(rows.len(), 1);
        let conv = &rows[0];
        assert_eq!(conv.conversation_id, "c1");
        assert_eq!(conv.contact_phone, "+15551234567");
        assert!(conv.pos_response);
        assert!(!conv.no_response);
        assert!(!conv.manual_review);
        assert_eq!(conv.tripler_probability, 0.9);
        assert_eq!(conv.names_extract, "Maria, Jose");
        assert_eq!(conv.name_prob3, 0.0);
    }

    #[tokio::test]
    async fn missing_column_is_named_in_the_error() {
        let dir = tempfile::tempdir().unwrap();
        // Header without contact_phone.
        let header = INPUT_HEADER.replace(",contact_phone", "");
        let contents = format!("{header}\nf,f,t,f,f,msg,yes,ok,,c1,f,0.9,0.8,0.1,0.05,,0.0,0.0,0.0");
        std::fs::write(dir.path().join("input.csv"), contents).unwrap();

        let err = store_for(dir.path()).load().await.unwrap_err();
        assert_eq!(
            err.to_string(),
            "Schema error: contact_phone must be a valid column in the dataset"
        );
    }

    #[tokio::test]
    async fn out_of_range_probability_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        write_input(
            dir.path(),
            &["f,f,t,f,f,msg,yes,ok,,c1,+15550000000,f,1.5,0.8,0.1,0.05,,0.9,0.8,0.0"],
        );

        let err = store_for(dir.path()).load().await.unwrap_err();
        let message = err.to_string();
        assert!(message.contains("tripler_probability"), "{message}");
        assert!(message.contains("outside [0, 1]"), "{message}");
    }

    #[tokio::test]
    async fn unparseable_probability_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        write_input(
            dir.path(),
            &["f,f,t,f,f,msg,yes,ok,,c1,+15550000000,f,high,0.8,0.1,0.05,,0.9,0.8,0.0"],
        );

        let err = store_for(dir.path()).load().await.unwrap_err();
        assert!(err.to_string().contains("tripler_probability"));
    }

    #[tokio::test]
    async fn unknown_flag_encoding_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        write_input(
            dir.path(),
            &["maybe,f,t,f,f,msg,yes,ok,,c1,+15550000000,f,0.9,0.8,0.1,0.05,,0.9,0.8,0.0"],
        );

        let err = store_for(dir.path()).load().await.unwrap_err();
        assert!(err.to_string().contains("noresponse"));
    }

    #[tokio::test]
    async fn empty_text_fields_recover_to_empty_strings() {
        let dir = tempfile::tempdir().unwrap();
        write_input(
            dir.path(),
            &["f,f,t,f,f,msg,,,,c1,+15550000000,f,0.9,0.8,0.1,0.05,,0.9,0.8,0.0"],
        );

        let rows = store_for(dir.path()).load().await.unwrap();
        assert_eq!(rows[0].voter_response, "");
        assert_eq!(rows[0].voter_final, "");
        assert_eq!(rows[0].voter_post, "");
    }

    #[tokio::test]
    async fn persist_writes_headers_even_for_empty_tables() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_for(dir.path());

        store.persist(&TriageOutput::default()).await.unwrap();

        let triplers = std::fs::read_to_string(dir.path().join("sms_triplers.csv")).unwrap();
        assert_eq!(
            triplers.trim_end(),
            "conversationid,contact_phone,is_tripler,opted_out,wrong_number,names_extract"
        );
        let optouts = std::fs::read_to_string(dir.path().join("sms_opt_outs.csv")).unwrap();
        assert_eq!(
            optouts.trim_end(),
            "conversationid,contact_phone,opted_out,wrong_number"
        );
        assert!(dir.path().join("sms_manual_review.csv").exists());
    }

    #[tokio::test]
    async fn persist_writes_rows_in_partition_order() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_for(dir.path());

        let output = TriageOutput {
            optouts: vec![
                OptoutRow {
                    conversation_id: "c1".into(),
                    contact_phone: "+15550000001".into(),
                    opted_out: Label::Yes,
                    wrong_number: Label::No,
                },
                OptoutRow {
                    conversation_id: "c2".into(),
                    contact_phone: "+15550000002".into(),
                    opted_out: Label::No,
                    wrong_number: Label::Yes,
                },
            ],
            ..Default::default()
        };
        store.persist(&output).await.unwrap();

        let contents = std::fs::read_to_string(dir.path().join("sms_opt_outs.csv")).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines[1], "c1,+15550000001,yes,no");
        assert_eq!(lines[2], "c2,+15550000002,no,yes");
    }
}
