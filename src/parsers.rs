// Row parsers for the flat DOCUMENT, SURVEYS and SAMPLES sheets
//
// Each flat sheet is a heading row followed by one record per row. The driver
// here checks the headings against the schema, coerces every row, hands it to
// the record-specific parser, then enforces the sheet's unique constraints.
// Row-level failures are collected; one bad row never stops the sheet.

pub mod documents;
pub mod row;
pub mod samples;
pub mod surveys;

use std::collections::HashMap;
use tracing::{debug, info};

use crate::config::DatasetOptions;
use crate::error::{DatasetError, Position};
use crate::schema::SheetSchema;
use crate::workbook::Grid;

pub use documents::DocumentParser;
pub use row::{coerce, Field, Header, TypedRow};
pub use samples::SampleParser;
pub use surveys::SurveyParser;

/// Turns one coerced row into a typed record
pub trait RowParser {
    type Record;

    fn schema(&self) -> &'static SheetSchema;

    /// Field-level semantic checks live here; errors must point at a column
    fn build(&self, row: &TypedRow) -> Result<Self::Record, Vec<DatasetError>>;
}

/// Records and accumulated errors from one sheet
#[derive(Debug, Clone)]
pub struct SheetOutcome<T> {
    pub records: Vec<T>,
    pub errors: Vec<DatasetError>,
}

impl<T> Default for SheetOutcome<T> {
    fn default() -> Self {
        Self {
            records: Vec::new(),
            errors: Vec::new(),
        }
    }
}

impl<T> SheetOutcome<T> {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    /// Append another sheet's outcome, keeping file order
    pub fn merge(&mut self, other: SheetOutcome<T>) {
        self.records.extend(other.records);
        self.errors.extend(other.errors);
    }
}

/// Parse a flat sheet with the given record parser
pub fn parse_sheet<P: RowParser>(
    grid: &Grid,
    parser: &P,
    options: &DatasetOptions,
) -> SheetOutcome<P::Record> {
    let schema = parser.schema();
    let mut outcome = SheetOutcome::default();

    let header = match Header::parse(grid, schema, options) {
        Ok(header) => header,
        Err(errors) => {
            for e in &errors {
                debug!("{}", e);
            }
            outcome.errors = errors;
            return outcome;
        }
    };

    let mut unique_indexes: Vec<HashMap<Vec<String>, u32>> =
        vec![HashMap::new(); schema.unique.len()];
    let mut data_rows = 0usize;

    for row_idx in 2..=grid.height() {
        if grid.is_blank_row(row_idx) {
            continue;
        }
        data_rows += 1;

        // (a) required cells and (b) type coercion
        let typed = match TypedRow::coerce(grid, &header, schema, row_idx) {
            Ok(typed) => typed,
            Err(errors) => {
                for e in &errors {
                    debug!("{}", e);
                }
                outcome.errors.extend(errors);
                continue;
            }
        };

        // (c) field-level semantics
        let record = match parser.build(&typed) {
            Ok(record) => record,
            Err(errors) => {
                for e in &errors {
                    debug!("{}", e);
                }
                outcome.errors.extend(errors);
                continue;
            }
        };

        // (d) uniqueness against earlier rows of this sheet
        let mut duplicate = false;
        for (constraint, index) in schema.unique.iter().zip(unique_indexes.iter_mut()) {
            let key: Vec<String> = constraint
                .iter()
                .map(|c| typed.text(c).unwrap_or_default().to_string())
                .collect();

            if let Some(first_row) = index.get(&key) {
                let error = DatasetError::RowValidation {
                    position: typed.position().at_column(constraint.join(", ")),
                    reason: format!(
                        "violates unique constraint on columns {} (duplicate of row {first_row})",
                        constraint.join(", ")
                    ),
                };
                debug!("{}", error);
                outcome.errors.push(error);
                duplicate = true;
            } else {
                index.insert(key, row_idx);
            }
        }

        if !duplicate {
            outcome.records.push(record);
        }
    }

    if data_rows < schema.min_rows || schema.max_rows.is_some_and(|max| data_rows > max) {
        let max = schema
            .max_rows
            .map(|m| m.to_string())
            .unwrap_or_else(|| "unlimited".to_string());
        outcome.errors.push(DatasetError::SheetStructure {
            position: grid.position(),
            reason: format!(
                "expected between {} and {max} data rows, found {data_rows}",
                schema.min_rows
            ),
        });
    }

    info!(
        "Parsed {} {} records from {}::{} ({} errors)",
        outcome.records.len(),
        schema.kind,
        grid.workbook(),
        grid.sheet(),
        outcome.errors.len()
    );
    outcome
}

pub(crate) fn column_error(position: Position, column: &str, reason: String) -> DatasetError {
    DatasetError::RowValidation {
        position: position.at_column(column),
        reason,
    }
}
