//! Engineered-feature CSV export and raw row previews
//!
//! One row per athlete with every catalog column: raw values as recorded,
//! derived values at display precision, blank cells for absent values.

use csv::Writer;
use std::fs;
use std::io::Write;
use std::path::Path;
use tracing::info;

use crate::columns::{Column, ColumnKind};
use crate::dataset::Dataset;
use crate::error::Result;
use crate::features::DerivedFeatures;
use crate::models::AthleteRecord;

/// Columns as they appear in the dataset file: raw measurements and the label
pub fn recorded_columns() -> impl Iterator<Item = Column> {
    Column::ALL
        .into_iter()
        .filter(|column| column.kind() != ColumnKind::Derived)
}

/// Recorded values of the first `limit` rows, in [`recorded_columns`] order
pub fn raw_preview(dataset: &Dataset, limit: usize) -> Vec<Vec<String>> {
    dataset
        .rows()
        .take(limit)
        .map(|(record, derived)| {
            recorded_columns()
                .map(|column| cell(column, record, derived))
                .collect()
        })
        .collect()
}

fn cell(column: Column, record: &AthleteRecord, derived: &DerivedFeatures) -> String {
    match (column.kind(), column.value(record, derived)) {
        (_, None) => String::new(),
        (ColumnKind::Derived, Some(value)) => column.format_value(value),
        (_, Some(value)) => value.to_string(),
    }
}

/// Write the engineered dataset, returning the number of data rows
pub fn export_features<W: Write>(dataset: &Dataset, writer: W) -> Result<usize> {
    let mut csv = Writer::from_writer(writer);
    csv.write_record(Column::ALL.iter().map(|column| column.name()))
        .map_err(std::io::Error::from)?;

    for (record, derived) in dataset.rows() {
        let cells = Column::ALL
            .iter()
            .map(|&column| cell(column, record, derived));
        csv.write_record(cells).map_err(std::io::Error::from)?;
    }

    csv.flush()?;
    Ok(dataset.len())
}

/// Write the engineered dataset to a file, creating parent directories
pub fn export_features_to_path(dataset: &Dataset, output_path: &Path) -> Result<usize> {
    if let Some(parent) = output_path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    let rows = export_features(dataset, fs::File::create(output_path)?)?;
    info!(path = %output_path.display(), rows, "Engineered features exported");
    Ok(rows)
}
