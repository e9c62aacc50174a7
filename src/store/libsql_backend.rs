//! Warehouse backend — libSQL implementation of the source/sink seam.
//!
//! The `-c` run mode of the annotator: the scored input lives in a
//! database table and the three output tables are replaced in place.
//! Local file databases cover tests; a served endpoint can be swapped
//! in behind the same seam.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use libsql::{Connection, Database as LibSqlDatabase, Value, params};
use tracing::info;

use crate::config::RunConfig;
use crate::error::{Error, SchemaError, StoreError};
use crate::pipeline::types::{Conversation, TriageOutput};
use crate::store::traits::{RecordSource, TableSink};
use crate::store::{REQUIRED_COLUMNS, check_probability, parse_flag};

/// libSQL warehouse store.
///
/// Holds a single connection reused for all operations;
/// `libsql::Connection` is `Send + Sync` and safe for concurrent
/// async use.
pub struct WarehouseStore {
    #[allow(dead_code)]
    db: Arc<LibSqlDatabase>,
    conn: Connection,
    input_table: String,
    triplers_table: String,
    optouts_table: String,
    review_table: String,
}

impl WarehouseStore {
    /// Open (or create) the database file named by the run config.
    pub async fn open(config: &RunConfig) -> Result<Self, StoreError> {
        let path = config.database_path();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                StoreError::Database(format!("Failed to create database directory: {e}"))
            })?;
        }

        let db = libsql::Builder::new_local(&path)
            .build()
            .await
            .map_err(|e| StoreError::Database(format!("Failed to open database: {e}")))?;
        let conn = db
            .connect()
            .map_err(|e| StoreError::Database(format!("Failed to create connection: {e}")))?;

        info!(path = %path.display(), "Warehouse database opened");
        Ok(Self::from_parts(db, conn, config))
    }

    /// In-memory database (tests).
    pub async fn in_memory(config: &RunConfig) -> Result<Self, StoreError> {
        let db = libsql::Builder::new_local(":memory:")
            .build()
            .await
            .map_err(|e| StoreError::Database(format!("Failed to create database: {e}")))?;
        let conn = db
            .connect()
            .map_err(|e| StoreError::Database(format!("Failed to create connection: {e}")))?;
        Ok(Self::from_parts(db, conn, config))
    }

    fn from_parts(db: LibSqlDatabase, conn: Connection, config: &RunConfig) -> Self {
        Self {
            db: Arc::new(db),
            conn,
            input_table: config.input_table(),
            triplers_table: config.triplers_table(),
            optouts_table: config.optouts_table(),
            review_table: config.review_table(),
        }
    }

    /// Access for tests that need to seed or inspect tables.
    #[cfg(test)]
    pub(crate) fn conn(&self) -> &Connection {
        &self.conn
    }

    async fn replace_table(&self, table: &str, columns_sql: &str) -> Result<(), StoreError> {
        self.conn
            .execute(
                &format!("CREATE TABLE IF NOT EXISTS \"{table}\" ({columns_sql})"),
                (),
            )
            .await
            .map_err(db_err)?;
        self.conn
            .execute(&format!("DELETE FROM \"{table}\""), ())
            .await
            .map_err(db_err)?;
        Ok(())
    }
}

fn db_err(e: libsql::Error) -> StoreError {
    StoreError::Database(e.to_string())
}

#[async_trait]
impl RecordSource for WarehouseStore {
    fn name(&self) -> &str {
        "warehouse"
    }

    async fn load(&self) -> Result<Vec<Conversation>, Error> {
        let mut rows = self
            .conn
            .query(&format!("SELECT * FROM \"{}\"", self.input_table), ())
            .await
            .map_err(db_err)?;

        let mut index = HashMap::new();
        for position in 0..rows.column_count() {
            if let Some(name) = rows.column_name(position) {
                index.insert(name.to_string(), position);
            }
        }
        for column in REQUIRED_COLUMNS {
            if !index.contains_key(*column) {
                return Err(SchemaError::MissingColumn(column.to_string()).into());
            }
        }

        let mut conversations = Vec::new();
        let mut row_number = 0usize;
        while let Some(row) = rows.next().await.map_err(db_err)? {
            row_number += 1;
            let value = |column: &str| -> Result<Value, StoreError> {
                row.get_value(index[column]).map_err(db_err)
            };

            conversations.push(Conversation {
                conversation_id: text_value(value("conversationid")?),
                contact_phone: text_value(value("contact_phone")?),
                triple_message: text_value(value("triplemessage")?),
                voter_response: text_value(value("voterresponse")?),
                voter_final: text_value(value("voterfinal")?),
                voter_post: text_value(value("voterpost")?),
                no_response: flag_value(row_number, "noresponse", value("noresponse")?)?,
                neg_response: flag_value(row_number, "negresponse", value("negresponse")?)?,
                pos_response: flag_value(row_number, "posresponse", value("posresponse")?)?,
                affirm_response: flag_value(
                    row_number,
                    "affirmresponse",
                    value("affirmresponse")?,
                )?,
                final_affirm_response: flag_value(
                    row_number,
                    "finalaffirmresponse",
                    value("finalaffirmresponse")?,
                )?,
                manual_review: flag_value(row_number, "manual_review", value("manual_review")?)?,
                num_tokens_response: 0,
                num_tokens_final: 0,
                num_tokens_post: 0,
                tripler_probability: prob_value(
                    row_number,
                    "tripler_probability",
                    value("tripler_probability")?,
                )?,
                name_provided_probability: prob_value(
                    row_number,
                    "name_provided_probability",
                    value("name_provided_probability")?,
                )?,
                optout_probability: prob_value(
                    row_number,
                    "optout_probability",
                    value("optout_probability")?,
                )?,
                wrongnumber_probability: prob_value(
                    row_number,
                    "wrongnumber_probability",
                    value("wrongnumber_probability")?,
                )?,
                names_extract: text_value(value("names_extract")?),
                name_prob1: prob_value(row_number, "name_prob1", value("name_prob1")?)?,
                name_prob2: prob_value(row_number, "name_prob2", value("name_prob2")?)?,
                name_prob3: prob_value(row_number, "name_prob3", value("name_prob3")?)?,
            });
        }

        info!(
            rows = conversations.len(),
            table = %self.input_table,
            "Loaded scored conversations"
        );
        Ok(conversations)
    }
}

#[async_trait]
impl TableSink for WarehouseStore {
    fn name(&self) -> &str {
        "warehouse"
    }

    async fn persist(&self, output: &TriageOutput) -> Result<(), Error> {
        self.replace_table(
            &self.triplers_table,
            "conversationid TEXT, contact_phone TEXT, is_tripler TEXT, \
             opted_out TEXT, wrong_number TEXT, names_extract TEXT",
        )
        .await?;
        for row in &output.triplers {
            self.conn
                .execute(
                    &format!(
                        "INSERT INTO \"{}\" (conversationid, contact_phone, is_tripler, \
                         opted_out, wrong_number, names_extract) \
                         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                        self.triplers_table
                    ),
                    params![
                        row.conversation_id.as_str(),
                        row.contact_phone.as_str(),
                        row.is_tripler.as_str(),
                        row.opted_out.as_str(),
                        row.wrong_number.as_str(),
                        row.names_extract.as_str(),
                    ],
                )
                .await
                .map_err(db_err)?;
        }
        info!(rows = output.triplers.len(), table = %self.triplers_table, "Wrote triplers");

        self.replace_table(
            &self.optouts_table,
            "conversationid TEXT, contact_phone TEXT, opted_out TEXT, wrong_number TEXT",
        )
        .await?;
        for row in &output.optouts {
            self.conn
                .execute(
                    &format!(
                        "INSERT INTO \"{}\" (conversationid, contact_phone, opted_out, \
                         wrong_number) VALUES (?1, ?2, ?3, ?4)",
                        self.optouts_table
                    ),
                    params![
                        row.conversation_id.as_str(),
                        row.contact_phone.as_str(),
                        row.opted_out.as_str(),
                        row.wrong_number.as_str(),
                    ],
                )
                .await
                .map_err(db_err)?;
        }
        info!(rows = output.optouts.len(), table = %self.optouts_table, "Wrote optouts");

        self.replace_table(
            &self.review_table,
            "conversationid TEXT, contact_phone TEXT, voterresponse TEXT, voterfinal TEXT, \
             voterpost TEXT, is_tripler TEXT, opted_out TEXT, wrong_number TEXT, \
             names_extract TEXT",
        )
        .await?;
        for row in &output.review {
            self.conn
                .execute(
                    &format!(
                        "INSERT INTO \"{}\" (conversationid, contact_phone, voterresponse, \
                         voterfinal, voterpost, is_tripler, opted_out, wrong_number, \
                         names_extract) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                        self.review_table
                    ),
                    params![
                        row.conversation_id.as_str(),
                        row.contact_phone.as_str(),
                        row.voter_response.as_str(),
                        row.voter_final.as_str(),
                        row.voter_post.as_str(),
                        row.is_tripler.as_str(),
                        row.opted_out.as_str(),
                        row.wrong_number.as_str(),
                        row.names_extract.as_str(),
                    ],
                )
                .await
                .map_err(db_err)?;
        }
        info!(rows = output.review.len(), table = %self.review_table, "Wrote manual review");

        Ok(())
    }
}

// ── Value coercion ──────────────────────────────────────────────────

/// Text cells: NULL recovers to the empty string.
fn text_value(value: Value) -> String {
    match value {
        Value::Text(s) => s,
        Value::Integer(i) => i.to_string(),
        Value::Real(f) => f.to_string(),
        Value::Null | Value::Blob(_) => String::new(),
    }
}

/// Boolean flags: warehouse exports store `t`/`f` text or 0/1
/// integers; NULL means unset.
fn flag_value(row: usize, column: &str, value: Value) -> Result<bool, SchemaError> {
    match value {
        Value::Integer(i) => Ok(i != 0),
        Value::Text(s) => parse_flag(row, column, &s),
        Value::Null => Ok(false),
        other => Err(SchemaError::BadField {
            row,
            column: column.to_string(),
            value: format!("{other:?}"),
            reason: "expected a boolean flag".to_string(),
        }),
    }
}

/// Probabilities must be numeric and in [0, 1]; NULL is a contract
/// violation, not a default.
fn prob_value(row: usize, column: &str, value: Value) -> Result<f64, SchemaError> {
    let number = match value {
        Value::Real(f) => f,
        Value::Integer(i) => i as f64,
        Value::Text(s) => s.trim().parse::<f64>().map_err(|e| SchemaError::BadField {
            row,
            column: column.to_string(),
            value: s.clone(),
            reason: e.to_string(),
        })?,
        other => {
            return Err(SchemaError::BadField {
                row,
                column: column.to_string(),
                value: format!("{other:?}"),
                reason: "expected a probability".to_string(),
            });
        }
    };
    check_probability(row, column, number)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::types::{Label, TriplerRow};

    const INPUT_COLUMNS_SQL: &str = "noresponse TEXT, negresponse TEXT, posresponse TEXT, \
        affirmresponse TEXT, finalaffirmresponse TEXT, triplemessage TEXT, \
        voterresponse TEXT, voterfinal TEXT, voterpost TEXT, conversationid TEXT, \
        contact_phone TEXT, manual_review TEXT, tripler_probability REAL, \
        name_provided_probability REAL, optout_probability REAL, \
        wrongnumber_probability REAL, names_extract TEXT, name_prob1 REAL, \
        name_prob2 REAL, name_prob3 REAL";

    async fn seeded_store() -> WarehouseStore {
        let store = WarehouseStore::in_memory(&RunConfig::default()).await.unwrap();
        store
            .conn()
            .execute(
                &format!("CREATE TABLE testdata_aggregated ({INPUT_COLUMNS_SQL})"),
                (),
            )
            .await
            .unwrap();
        store
    }

    #[tokio::test]
    async fn loads_and_coerces_warehouse_rows() {
        let store = seeded_store().await;
        store
            .conn()
            .execute(
                "INSERT INTO testdata_aggregated VALUES \
                 ('f', 'f', 't', 'f', 'f', 'Will you remind 3 friends?', 'yes', \
                  'Maria and Jose', NULL, 'c1', '+15551234567', 'f', 0.9, 0.8, 0.1, \
                  0.05, 'Maria, Jose', 0.9, 0.8, 0.0)",
                (),
            )
            .await
            .unwrap();

        let rows = store.load().await.unwrap();
        assert_eq!(rows.len(), 1);
        let conv = &rows[0];
        assert!(conv.pos_response);
        assert!(!conv.manual_review);
        assert_eq!(conv.voter_post, ""); // NULL recovered
        assert_eq!(conv.tripler_probability, 0.9);
        assert_eq!(conv.name_prob3, 0.0);
    }

    #[tokio::test]
    async fn missing_column_is_named_in_the_error() {
        let store = WarehouseStore::in_memory(&RunConfig::default()).await.unwrap();
        store
            .conn()
            .execute(
                "CREATE TABLE testdata_aggregated (conversationid TEXT, voterresponse TEXT)",
                (),
            )
            .await
            .unwrap();

        let err = store.load().await.unwrap_err();
        assert!(err.to_string().contains("must be a valid column"));
    }

    #[tokio::test]
    async fn out_of_range_probability_is_fatal() {
        let store = seeded_store().await;
        store
            .conn()
            .execute(
                "INSERT INTO testdata_aggregated VALUES \
                 ('f', 'f', 'f', 'f', 'f', 'm', 'r', 'f', 'p', 'c1', '+15550000000', \
                  'f', 1.2, 0.5, 0.5, 0.5, '', 0.0, 0.0, 0.0)",
                (),
            )
            .await
            .unwrap();

        let err = store.load().await.unwrap_err();
        assert!(err.to_string().contains("tripler_probability"));
    }

    #[tokio::test]
    async fn persist_replaces_output_tables() {
        let store = seeded_store().await;
        let output = TriageOutput {
            triplers: vec![TriplerRow {
                conversation_id: "c1".into(),
                contact_phone: "+15550000000".into(),
                is_tripler: Label::Yes,
                opted_out: Label::No,
                wrong_number: Label::No,
                names_extract: "Maria".into(),
            }],
            ..Default::default()
        };

        store.persist(&output).await.unwrap();
        // Persisting again must replace, not append.
        store.persist(&output).await.unwrap();

        let mut rows = store
            .conn()
            .query("SELECT COUNT(*), MAX(is_tripler) FROM sms_triplers", ())
            .await
            .unwrap();
        let row = rows.next().await.unwrap().unwrap();
        assert_eq!(row.get::<i64>(0).unwrap(), 1);
        assert_eq!(row.get::<String>(1).unwrap(), "yes");

        let mut rows = store
            .conn()
            .query("SELECT COUNT(*) FROM sms_opt_outs", ())
            .await
            .unwrap();
        let row = rows.next().await.unwrap().unwrap();
        assert_eq!(row.get::<i64>(0).unwrap(), 0);
    }
}
