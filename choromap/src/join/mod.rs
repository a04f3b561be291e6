//! Binding dataset rows to features.
//!
//! Each feature is matched against at most one row: the first row, in source
//! order, whose join column renders to the same key as the feature's join
//! property. Matched columns are merged into the feature properties, either
//! flat or nested under a namespace. Running the same join twice yields the
//! same properties.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::debug;

use crate::dataset::{Dataset, Row};
use crate::geometry::Feature;
use crate::value::{Properties, Value};

/// Options for a join.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JoinOptions {
    /// Dataset column to match on; defaults to the dataset primary key.
    pub data_key: Option<String>,
    /// Feature property to match on; defaults to the layer primary property.
    pub geo_key: Option<String>,
    /// Nest the row under this property instead of merging it flat.
    pub namespace: Option<String>,
}

impl JoinOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_data_key(mut self, key: impl Into<String>) -> Self {
        self.data_key = Some(key.into());
        self
    }

    pub fn with_geo_key(mut self, key: impl Into<String>) -> Self {
        self.geo_key = Some(key.into());
        self
    }

    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }
}

/// Outcome of a join.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JoinReport {
    /// Features that received a row.
    pub matched: usize,
    /// Ids of features left without a row.
    pub unmatched: Vec<String>,
}

/// First row per key of `column`, in source order.
pub(crate) fn first_rows<'a>(dataset: &'a Dataset, column: &str) -> HashMap<String, &'a Arc<Row>> {
    let mut index = HashMap::new();
    for row in dataset.rows() {
        let key = if column == dataset.primary_key() {
            Some(row.key().to_string())
        } else {
            row.get(column).and_then(Value::as_key)
        };
        if let Some(key) = key {
            index.entry(key).or_insert(row);
        }
    }
    index
}

fn merge(properties: &mut Properties, row: &Row, namespace: Option<&str>) {
    match namespace {
        Some(ns) => {
            properties.insert(ns.to_string(), Value::Map(row.values().clone()));
        }
        None => {
            for (column, value) in row.values() {
                properties.insert(column.clone(), value.clone());
            }
        }
    }
}

/// Joins `dataset` onto `features`.
///
/// `default_geo_key` is used when the options name no feature property.
pub fn join_features(
    features: &mut [Feature],
    dataset: &Dataset,
    options: &JoinOptions,
    default_geo_key: &str,
) -> JoinReport {
    let data_key = options.data_key.as_deref().unwrap_or(dataset.primary_key());
    let geo_key = options.geo_key.as_deref().unwrap_or(default_geo_key);
    let rows = first_rows(dataset, data_key);

    let mut report = JoinReport::default();
    for feature in features.iter_mut() {
        let row = feature
            .properties
            .get(geo_key)
            .and_then(Value::as_key)
            .and_then(|key| rows.get(&key));

        match row {
            Some(row) => {
                merge(&mut feature.properties, row, options.namespace.as_deref());
                report.matched += 1;
            }
            None => report.unmatched.push(feature.id.clone()),
        }
    }

    debug!(
        dataset = %dataset.name(),
        data_key = %data_key,
        geo_key = %geo_key,
        matched = report.matched,
        unmatched = report.unmatched.len(),
        "Joined dataset"
    );
    report
}
