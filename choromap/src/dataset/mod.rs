//! Tabular datasets keyed by a primary column.
//!
//! A dataset is loaded once from a delimited text source, mapped row by row
//! into typed properties and is read-only afterwards. Loading happens in the
//! background; a [`DatasetHandle`] exposes readiness so that layer operations
//! can be queued before the data arrives.

pub mod mappers;

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::queue::{Readiness, ReadinessError, ReadinessState};
use crate::source::SourceFetcher;
use crate::value::{Properties, Value};

/// Raw text cells of a row, by column name.
pub type RawRow = BTreeMap<String, String>;

/// Maps raw cells into typed properties.
pub type RowMapper = Arc<dyn Fn(&RawRow) -> Properties + Send + Sync>;

/// Errors raised while loading or parsing a dataset.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum DataError {
    /// The source could not be fetched, or loading failed for another reason.
    #[error("failed to load dataset '{name}': {reason}")]
    LoadFailure { name: String, reason: String },

    /// The source is not valid delimited text.
    #[error("failed to parse dataset: {0}")]
    Parse(String),

    /// The header has no primary key column.
    #[error("primary key column '{0}' not found in header")]
    MissingPrimaryKey(String),

    /// A row has an empty primary key cell.
    #[error("row {row} has no value for primary key '{column}'")]
    MissingKeyValue { column: String, row: usize },

    /// The caller-imposed timeout elapsed before the dataset settled.
    #[error("dataset '{name}' not ready after {timeout:?}")]
    Timeout { name: String, timeout: Duration },
}

/// Options controlling how a source becomes a dataset.
#[derive(Clone)]
pub struct DatasetOptions {
    /// Column holding the unique row key.
    pub primary_key: String,
    /// Field delimiter.
    pub delimiter: u8,
    /// Row mapper applied to every record.
    pub mapper: RowMapper,
}

impl DatasetOptions {
    /// Comma-delimited, text-only rows keyed by `primary_key`.
    pub fn new(primary_key: impl Into<String>) -> Self {
        Self {
            primary_key: primary_key.into(),
            delimiter: b',',
            mapper: mappers::identity(),
        }
    }

    pub fn with_delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = delimiter;
        self
    }

    pub fn with_mapper(mut self, mapper: RowMapper) -> Self {
        self.mapper = mapper;
        self
    }
}

impl std::fmt::Debug for DatasetOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DatasetOptions")
            .field("primary_key", &self.primary_key)
            .field("delimiter", &(self.delimiter as char))
            .finish()
    }
}

/// One dataset row.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    key: String,
    values: Properties,
}

impl Row {
    /// Primary key value, as found in the source.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Mapped value of `column`.
    pub fn get(&self, column: &str) -> Option<&Value> {
        self.values.get(column)
    }

    /// All mapped values.
    pub fn values(&self) -> &Properties {
        &self.values
    }
}

/// Rows sharing a column value, in source order.
#[derive(Debug, Clone)]
pub struct Group {
    /// The shared value, `None` for rows lacking the column.
    pub key: Option<String>,
    pub rows: Vec<Arc<Row>>,
}

/// A loaded, read-only dataset.
#[derive(Debug)]
pub struct Dataset {
    name: String,
    primary_key: String,
    columns: Vec<String>,
    rows: Vec<Arc<Row>>,
    index: HashMap<String, usize>,
}

impl Dataset {
    /// Parses delimited text into a dataset.
    pub fn parse(
        name: impl Into<String>,
        bytes: &[u8],
        options: &DatasetOptions,
    ) -> Result<Self, DataError> {
        let name = name.into();
        let bytes = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);

        let mut reader = csv::ReaderBuilder::new()
            .delimiter(options.delimiter)
            .has_headers(true)
            .trim(csv::Trim::All)
            .from_reader(bytes);

        let columns: Vec<String> = reader
            .headers()
            .map_err(|e| DataError::Parse(e.to_string()))?
            .iter()
            .map(str::to_string)
            .collect();

        if !columns.iter().any(|c| c == &options.primary_key) {
            return Err(DataError::MissingPrimaryKey(options.primary_key.clone()));
        }

        let mut rows = Vec::new();
        let mut index = HashMap::new();
        let mut duplicates = 0usize;

        for (line, record) in reader.records().enumerate() {
            let record = record.map_err(|e| DataError::Parse(e.to_string()))?;
            let raw: RawRow = columns
                .iter()
                .zip(record.iter())
                .map(|(column, cell)| (column.clone(), cell.to_string()))
                .collect();

            let key = raw
                .get(&options.primary_key)
                .filter(|k| !k.is_empty())
                .cloned()
                .ok_or_else(|| DataError::MissingKeyValue {
                    column: options.primary_key.clone(),
                    row: line + 1,
                })?;

            // First row wins for repeated keys
            let next = rows.len();
            if *index.entry(key.clone()).or_insert(next) != next {
                duplicates += 1;
            }

            let values = (options.mapper)(&raw);
            rows.push(Arc::new(Row { key, values }));
        }

        if duplicates > 0 {
            debug!(dataset = %name, duplicates, "Repeated primary keys resolve to their first row");
        }
        debug!(dataset = %name, rows = rows.len(), columns = columns.len(), "Parsed dataset");

        Ok(Self {
            name,
            primary_key: options.primary_key.clone(),
            columns,
            rows,
            index,
        })
    }

    /// Starts loading `source` in the background.
    ///
    /// Returns immediately; the handle settles once the source has been
    /// fetched and parsed, or failed to.
    pub fn load(
        name: impl Into<String>,
        fetcher: Arc<dyn SourceFetcher>,
        source: impl Into<String>,
        options: DatasetOptions,
    ) -> DatasetHandle {
        let name = name.into();
        let source = source.into();
        let handle = DatasetHandle {
            name: name.clone(),
            readiness: Readiness::new(),
        };
        let readiness = handle.readiness.clone();

        tokio::spawn(async move {
            let result = match fetcher.fetch(&source).await {
                Ok(bytes) => Dataset::parse(name.clone(), &bytes, &options),
                Err(e) => Err(DataError::LoadFailure {
                    name: name.clone(),
                    reason: e.to_string(),
                }),
            };

            match result {
                Ok(dataset) => {
                    info!(dataset = %name, source = %source, rows = dataset.len(), "Dataset loaded");
                    readiness.resolve(dataset);
                }
                Err(e) => {
                    warn!(dataset = %name, source = %source, error = %e, "Dataset failed to load");
                    readiness.fail(e.to_string());
                }
            }
        });

        handle
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn primary_key(&self) -> &str {
        &self.primary_key
    }

    /// Header columns in source order.
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Rows in source order.
    pub fn rows(&self) -> &[Arc<Row>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Returns the first row, in source order, whose primary key is `key`.
    pub fn find(&self, key: &str) -> Option<Arc<Row>> {
        self.index.get(key).map(|&i| Arc::clone(&self.rows[i]))
    }

    /// Returns the first row, in source order, whose `column` renders as `key`.
    pub fn find_by(&self, column: &str, key: &str) -> Option<Arc<Row>> {
        if column == self.primary_key {
            return self.find(key);
        }
        self.rows
            .iter()
            .find(|row| row.get(column).and_then(Value::as_key).as_deref() == Some(key))
            .cloned()
    }

    /// Groups rows by the value of `column`.
    ///
    /// Groups appear in first-seen order and keep source row order.
    pub fn group_by(&self, column: &str) -> Vec<Group> {
        let mut groups: Vec<Group> = Vec::new();
        let mut positions: HashMap<Option<String>, usize> = HashMap::new();

        for row in &self.rows {
            let key = row.get(column).and_then(Value::as_key);
            match positions.get(&key) {
                Some(&i) => groups[i].rows.push(Arc::clone(row)),
                None => {
                    positions.insert(key.clone(), groups.len());
                    groups.push(Group {
                        key,
                        rows: vec![Arc::clone(row)],
                    });
                }
            }
        }
        groups
    }

    /// Indexes rows by the value of `column`, keeping source order per key.
    ///
    /// Rows without a value for `column` are left out.
    pub fn export_index(&self, column: &str) -> HashMap<String, Vec<Arc<Row>>> {
        let mut index: HashMap<String, Vec<Arc<Row>>> = HashMap::new();
        for row in &self.rows {
            if let Some(key) = row.get(column).and_then(Value::as_key) {
                index.entry(key).or_default().push(Arc::clone(row));
            }
        }
        index
    }
}

/// Handle on a dataset that may still be loading.
#[derive(Debug, Clone)]
pub struct DatasetHandle {
    name: String,
    readiness: Readiness<Dataset>,
}

impl DatasetHandle {
    /// Wraps an already loaded dataset.
    pub fn from_dataset(dataset: Dataset) -> Self {
        Self {
            name: dataset.name.clone(),
            readiness: Readiness::ready(dataset),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Waits for the dataset.
    pub async fn ready(&self) -> Result<Arc<Dataset>, DataError> {
        self.readiness
            .wait()
            .await
            .map_err(|e| self.to_data_error(e))
    }

    /// Waits for the dataset, at most `timeout`.
    pub async fn ready_timeout(&self, timeout: Duration) -> Result<Arc<Dataset>, DataError> {
        self.readiness
            .wait_timeout(timeout)
            .await
            .map_err(|e| self.to_data_error(e))
    }

    /// Returns the dataset if it has loaded.
    pub fn get(&self) -> Option<Arc<Dataset>> {
        match self.readiness.state() {
            ReadinessState::Ready(dataset) => Some(dataset),
            _ => None,
        }
    }

    pub fn is_ready(&self) -> bool {
        self.readiness.is_ready()
    }

    pub fn is_pending(&self) -> bool {
        self.readiness.is_pending()
    }

    fn to_data_error(&self, e: ReadinessError) -> DataError {
        match e {
            ReadinessError::Failed(reason) => DataError::LoadFailure {
                name: self.name.clone(),
                reason,
            },
            ReadinessError::TimedOut(timeout) => DataError::Timeout {
                name: self.name.clone(),
                timeout,
            },
        }
    }
}
