use crate::error::DatasetError;
use crate::models::Survey;
use crate::schema::{schema_for, SheetSchema, WorkbookKind};

use super::{RowParser, TypedRow};

#[derive(Debug, Clone, Copy, Default)]
pub struct SurveyParser;

fn year(row: &TypedRow, column: &str) -> Result<Option<i32>, DatasetError> {
    match row.integer(column) {
        None => Ok(None),
        Some(value) => i32::try_from(value)
            .map(Some)
            .map_err(|_| row.error(column, format!("year {value} is out of range"))),
    }
}

impl RowParser for SurveyParser {
    type Record = Survey;

    fn schema(&self) -> &'static SheetSchema {
        schema_for(WorkbookKind::Surveys)
    }

    fn build(&self, row: &TypedRow) -> Result<Survey, Vec<DatasetError>> {
        let mut errors = Vec::new();

        let year_begin = year(row, "YEAR_BEGIN").unwrap_or_else(|e| {
            errors.push(e);
            None
        });
        let year_end = year(row, "YEAR_END").unwrap_or_else(|e| {
            errors.push(e);
            None
        });

        match (year_begin, year_end) {
            (Some(begin), Some(end)) if end < begin => errors.push(row.error(
                "YEAR_END",
                format!("YEAR_END ({end}) is earlier than YEAR_BEGIN ({begin})"),
            )),
            (None, Some(_)) if errors.is_empty() => {
                errors.push(row.error("YEAR_BEGIN", "YEAR_END requires YEAR_BEGIN"))
            }
            _ => {}
        }

        if !errors.is_empty() {
            return Err(errors);
        }

        Ok(Survey {
            origin: row.origin().clone(),
            title: row.required_text("TITLE"),
            organization: row.required_text("ORGANIZATION"),
            year_begin: year_begin.unwrap_or_default(),
            year_end,
            party_leader: row.text("PARTY_LEADER").map(str::to_string),
            description: row.text("DESCRIPTION").map(str::to_string),
            gsc_catalog_number: row.integer("GSC_CATALOG_NUMBER"),
            extra: row.extra().clone(),
        })
    }
}
