//! Run configuration.

use std::path::PathBuf;

/// Where a run reads its input and writes its three output tables.
///
/// File names double as warehouse table names with the `.csv` suffix
/// stripped, so one configuration drives either backend.
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// Base directory for flat-file runs and the warehouse database.
    pub home: PathBuf,
    /// Aggregated, scored input file (or table).
    pub input: String,
    /// Output file (or table) for auto-confirmed triplers.
    pub triplers_out: String,
    /// Output file (or table) for opt-outs / wrong numbers.
    pub optouts_out: String,
    /// Output file (or table) for manual review.
    pub review_out: String,
    /// Warehouse database file name.
    pub database: String,
    /// Read and write warehouse tables instead of flat files.
    pub use_warehouse: bool,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            home: PathBuf::from("."),
            input: "testdata_aggregated.csv".to_string(),
            triplers_out: "sms_triplers.csv".to_string(),
            optouts_out: "sms_opt_outs.csv".to_string(),
            review_out: "sms_manual_review.csv".to_string(),
            database: "vote_tripling.db".to_string(),
            use_warehouse: false,
        }
    }
}

impl RunConfig {
    /// Flat-file input path: `<home>/Input_Data/<input>`.
    pub fn input_path(&self) -> PathBuf {
        self.home.join("Input_Data").join(&self.input)
    }

    /// Flat-file output directory: `<home>/Output_Data`.
    pub fn output_dir(&self) -> PathBuf {
        self.home.join("Output_Data")
    }

    /// Warehouse database path: `<home>/<database>`.
    pub fn database_path(&self) -> PathBuf {
        self.home.join(&self.database)
    }

    pub fn input_table(&self) -> String {
        table_name(&self.input)
    }

    pub fn triplers_table(&self) -> String {
        table_name(&self.triplers_out)
    }

    pub fn optouts_table(&self) -> String {
        table_name(&self.optouts_out)
    }

    pub fn review_table(&self) -> String {
        table_name(&self.review_out)
    }
}

/// A file name is also the warehouse table name, minus the suffix.
fn table_name(file: &str) -> String {
    file.strip_suffix(".csv").unwrap_or(file).to_string()
}
