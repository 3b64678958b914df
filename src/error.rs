use std::fmt;
use std::path::PathBuf;

use serde::Serialize;
use thiserror::Error;

use crate::utils::{cell_ref, column_letter};

/// Where in a dataset a diagnostic points to.
///
/// Rows and columns are 1-based, matching what a user sees in Excel.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Position {
    pub workbook: String,
    pub sheet: String,
    pub row: Option<u32>,
    pub column: Option<Column>,
}

/// A column reference, either by heading or by Excel letter.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub enum Column {
    Named(String),
    Index(u32),
}

impl Position {
    pub fn sheet(workbook: impl Into<String>, sheet: impl Into<String>) -> Self {
        Self {
            workbook: workbook.into(),
            sheet: sheet.into(),
            row: None,
            column: None,
        }
    }

    pub fn at_row(mut self, row: u32) -> Self {
        self.row = Some(row);
        self
    }

    pub fn at_column(mut self, column: impl Into<String>) -> Self {
        self.column = Some(Column::Named(column.into()));
        self
    }

    pub fn at_column_index(mut self, column: u32) -> Self {
        self.column = Some(Column::Index(column));
        self
    }

    /// `D9`-style reference, when the position names a single cell by index
    pub fn cell_ref(&self) -> Option<String> {
        match (self.row, &self.column) {
            (Some(row), Some(Column::Index(col))) => Some(cell_ref(row, *col)),
            _ => None,
        }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}::{}", self.workbook, self.sheet)?;
        if let Some(row) = self.row {
            write!(f, " row {row}")?;
        }
        match &self.column {
            Some(Column::Named(name)) => write!(f, ", column {name}"),
            Some(Column::Index(idx)) => write!(f, ", column {}", column_letter(*idx)),
            None => Ok(()),
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum DatasetError {
    #[error("Dataset directory not found: {}", path.display())]
    DatasetNotFound { path: PathBuf },

    #[error("Invalid dataset name {name:?}: must use reverse domain name notation")]
    InvalidDatasetName { name: String },

    #[error("Workbook not found: {}", path.display())]
    WorkbookNotFound { path: PathBuf },

    #[error("Sheet {sheet} not found in workbook {workbook}")]
    SheetNotFound { workbook: String, sheet: String },

    #[error("Failed to read workbook {}: {reason}", path.display())]
    CorruptWorkbook { path: PathBuf, reason: String },

    #[error("Unknown workbook kind: {0}")]
    UnknownWorkbookKind(String),

    #[error("{position}: {reason}")]
    SheetStructure { position: Position, reason: String },

    #[error("{position}: {reason}")]
    RowValidation { position: Position, reason: String },

    #[error("{position}: duplicate result type {name:?} (first declared at {first})")]
    DuplicateResultType {
        position: Position,
        name: String,
        first: Position,
    },

    #[error("{position}: metadata type {metadata_type:?} declared after the first data row (row {first_data_row})")]
    MetadataAfterData {
        position: Position,
        metadata_type: String,
        first_data_row: u32,
    },

    #[error("{position}: hierarchy chain is broken; a blank level precedes a non-blank one")]
    BrokenHierarchyChain { position: Position },

    #[error("{position}: {reason}")]
    ReferentialIntegrity { position: Position, reason: String },
}

impl DatasetError {
    /// Container-level failures: nothing more can be read from the workbook.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            DatasetError::DatasetNotFound { .. }
                | DatasetError::InvalidDatasetName { .. }
                | DatasetError::WorkbookNotFound { .. }
                | DatasetError::SheetNotFound { .. }
                | DatasetError::CorruptWorkbook { .. }
                | DatasetError::UnknownWorkbookKind(_)
        )
    }

    pub fn position(&self) -> Option<&Position> {
        match self {
            DatasetError::SheetStructure { position, .. }
            | DatasetError::RowValidation { position, .. }
            | DatasetError::DuplicateResultType { position, .. }
            | DatasetError::MetadataAfterData { position, .. }
            | DatasetError::BrokenHierarchyChain { position }
            | DatasetError::ReferentialIntegrity { position, .. } => Some(position),
            _ => None,
        }
    }
}

/// The full set of accumulated errors for a dataset.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationReport {
    pub dataset: String,
    pub errors: Vec<DatasetError>,
}

impl fmt::Display for ValidationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "dataset {} has {} error(s)",
            self.dataset,
            self.errors.len()
        )?;
        for error in &self.errors {
            write!(f, "\n  {error}")?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationReport {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_position_display_named_column() {
        let pos = Position::sheet("SURVEYS.xlsx", "SURVEYS")
            .at_row(3)
            .at_column("YEAR_END");
        assert_eq!(pos.to_string(), "SURVEYS.xlsx::SURVEYS row 3, column YEAR_END");
    }

    #[test]
    fn test_position_display_indexed_column() {
        let pos = Position::sheet("BULK.xlsx", "BULK1").at_row(5).at_column_index(4);
        assert_eq!(pos.to_string(), "BULK.xlsx::BULK1 row 5, column D");
        assert_eq!(pos.cell_ref().as_deref(), Some("D5"));
        assert_eq!(Position::sheet("BULK.xlsx", "BULK1").at_row(5).cell_ref(), None);
    }

    #[test]
    fn test_fatal_classification() {
        let fatal = DatasetError::SheetNotFound {
            workbook: "SURVEYS.xlsx".into(),
            sheet: "SURVEYS".into(),
        };
        assert!(fatal.is_fatal());

        let row = DatasetError::RowValidation {
            position: Position::sheet("SURVEYS.xlsx", "SURVEYS").at_row(2),
            reason: "bad".into(),
        };
        assert!(!row.is_fatal());
        assert!(row.position().is_some());
    }
}
