use crate::error::DatasetError;
use crate::models::Document;
use crate::schema::{schema_for, SheetSchema, WorkbookKind};

use super::{RowParser, TypedRow};

/// Parser for the single-row DOCUMENT sheet
#[derive(Debug, Clone, Copy, Default)]
pub struct DocumentParser;

impl RowParser for DocumentParser {
    type Record = Document;

    fn schema(&self) -> &'static SheetSchema {
        schema_for(WorkbookKind::Documents)
    }

    fn build(&self, row: &TypedRow) -> Result<Document, Vec<DatasetError>> {
        Ok(Document {
            origin: row.origin().clone(),
            recommended_citation: row.required_text("RECOMMENDED_CITATION"),
            extra: row.extra().clone(),
        })
    }
}
