use std::collections::HashMap;

use crate::config::DatasetOptions;
use crate::error::{DatasetError, Position};
use crate::models::{Extra, RowOrigin};
use crate::schema::{ColumnType, SheetSchema};
use crate::utils::format_number;
use crate::workbook::{CellValue, Grid, EMPTY_CELL};

/// A cell after coercion to its declared column type
#[derive(Debug, Clone, PartialEq)]
pub enum Field {
    Null,
    Text(String),
    Integer(i64),
    Float(f64),
}

static NULL_FIELD: Field = Field::Null;

/// Coerce a cell strictly; partial matches like `"1990a"` are rejected
pub fn coerce(cell: &CellValue, ty: ColumnType) -> Result<Field, String> {
    match (cell, ty) {
        (CellValue::Empty, _) => Ok(Field::Null),

        (CellValue::Text(s), ColumnType::Text) => Ok(Field::Text(s.clone())),
        (CellValue::Number(n), ColumnType::Text) => Ok(Field::Text(format_number(*n))),

        (CellValue::Text(s), ColumnType::Integer) => s
            .parse::<i64>()
            .map(Field::Integer)
            .map_err(|_| format!("expected an integer, got {s:?}")),
        (CellValue::Number(n), ColumnType::Integer) => {
            if n.fract() == 0.0 && n.abs() <= i64::MAX as f64 {
                Ok(Field::Integer(*n as i64))
            } else {
                Err(format!("expected an integer, got {}", format_number(*n)))
            }
        }

        (CellValue::Text(s), ColumnType::Float | ColumnType::Coordinate) => match s.parse::<f64>()
        {
            Ok(f) if f.is_finite() => Ok(Field::Float(f)),
            _ => Err(format!("expected a number, got {s:?}")),
        },
        (CellValue::Number(n), ColumnType::Float | ColumnType::Coordinate) => Ok(Field::Float(*n)),

        (cell, ColumnType::Enum(allowed)) => {
            let text = cell.as_text().unwrap_or_default();
            if allowed.contains(&text.as_str()) {
                Ok(Field::Text(text))
            } else {
                Err(format!(
                    "expected one of {}, got {text:?}",
                    allowed.join(", ")
                ))
            }
        }
    }
}

/// Heading row of a flat sheet, mapped to 1-based column indexes
#[derive(Debug, Clone)]
pub struct Header {
    columns: HashMap<String, u32>,
    extra: Vec<(String, u32)>,
}

impl Header {
    /// Check headings against the schema; all problems are reported together
    pub fn parse(
        grid: &Grid,
        schema: &SheetSchema,
        options: &DatasetOptions,
    ) -> Result<Self, Vec<DatasetError>> {
        let mut errors = Vec::new();
        let mut columns = HashMap::new();
        let mut extra = Vec::new();
        let header_position = grid.position().at_row(1);

        for col in 1..=grid.width() {
            let Some(heading) = grid.get(1, col).as_text() else {
                errors.push(DatasetError::SheetStructure {
                    position: header_position.clone().at_column_index(col),
                    reason: "missing heading".to_string(),
                });
                continue;
            };

            if columns.contains_key(&heading) {
                errors.push(DatasetError::SheetStructure {
                    position: header_position.clone().at_column_index(col),
                    reason: format!("duplicate heading {heading:?}"),
                });
                continue;
            }

            if schema.column(&heading).is_none() {
                if options.extra_columns_ok {
                    extra.push((heading.clone(), col));
                } else {
                    errors.push(DatasetError::SheetStructure {
                        position: header_position.clone().at_column(heading.clone()),
                        reason: "unexpected column".to_string(),
                    });
                }
            }
            columns.insert(heading, col);
        }

        for spec in schema.columns {
            if !columns.contains_key(spec.name) {
                errors.push(DatasetError::SheetStructure {
                    position: header_position.clone().at_column(spec.name),
                    reason: "missing column".to_string(),
                });
            }
        }

        if errors.is_empty() {
            Ok(Self { columns, extra })
        } else {
            Err(errors)
        }
    }

    pub fn index_of(&self, heading: &str) -> Option<u32> {
        self.columns.get(heading).copied()
    }
}

/// One data row with every schema column coerced
#[derive(Debug, Clone)]
pub struct TypedRow {
    origin: RowOrigin,
    fields: HashMap<&'static str, Field>,
    extra: Extra,
}

impl TypedRow {
    /// Required-value and coercion checks for one row
    pub fn coerce(
        grid: &Grid,
        header: &Header,
        schema: &SheetSchema,
        row: u32,
    ) -> Result<Self, Vec<DatasetError>> {
        let origin = RowOrigin {
            workbook: grid.workbook().to_string(),
            sheet: grid.sheet().to_string(),
            row,
        };
        let mut errors = Vec::new();
        let mut fields = HashMap::new();

        for spec in schema.columns {
            let cell = header
                .index_of(spec.name)
                .map(|col| grid.get(row, col))
                .unwrap_or(&EMPTY_CELL);

            if cell.is_empty() && !spec.nullable {
                errors.push(super::column_error(
                    origin.position(),
                    spec.name,
                    "missing required value".to_string(),
                ));
                continue;
            }

            match coerce(cell, spec.ty) {
                Ok(field) => {
                    fields.insert(spec.name, field);
                }
                Err(reason) => errors.push(super::column_error(origin.position(), spec.name, reason)),
            }
        }

        if !errors.is_empty() {
            return Err(errors);
        }

        let extra = header
            .extra
            .iter()
            .map(|(heading, col)| {
                (
                    heading.to_lowercase(),
                    grid.get(row, *col).as_text().unwrap_or_default(),
                )
            })
            .collect();

        Ok(Self {
            origin,
            fields,
            extra,
        })
    }

    pub fn origin(&self) -> &RowOrigin {
        &self.origin
    }

    pub fn position(&self) -> Position {
        self.origin.position()
    }

    pub fn extra(&self) -> &Extra {
        &self.extra
    }

    pub fn field(&self, column: &str) -> &Field {
        self.fields.get(column).unwrap_or(&NULL_FIELD)
    }

    pub fn text(&self, column: &str) -> Option<&str> {
        match self.field(column) {
            Field::Text(s) => Some(s.as_str()),
            _ => None,
        }
    }

    pub fn integer(&self, column: &str) -> Option<i64> {
        match self.field(column) {
            Field::Integer(i) => Some(*i),
            _ => None,
        }
    }

    pub fn float(&self, column: &str) -> Option<f64> {
        match self.field(column) {
            Field::Float(f) => Some(*f),
            _ => None,
        }
    }

    /// A required text column; coercion already guaranteed it is present
    pub fn required_text(&self, column: &str) -> String {
        self.text(column).unwrap_or_default().to_string()
    }

    pub fn error(&self, column: &str, reason: impl Into<String>) -> DatasetError {
        super::column_error(self.position(), column, reason.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{schema_for, WorkbookKind};
    use crate::workbook::tests::grid;

    #[test]
    fn test_coerce_integer_strict() {
        assert_eq!(
            coerce(&CellValue::Text("1990".into()), ColumnType::Integer),
            Ok(Field::Integer(1990))
        );
        assert!(coerce(&CellValue::Text("1990a".into()), ColumnType::Integer).is_err());
        assert!(coerce(&CellValue::Text("19.5".into()), ColumnType::Integer).is_err());
        assert_eq!(
            coerce(&CellValue::Number(1985.0), ColumnType::Integer),
            Ok(Field::Integer(1985))
        );
        assert!(coerce(&CellValue::Number(1985.5), ColumnType::Integer).is_err());
    }

    #[test]
    fn test_coerce_float() {
        assert_eq!(
            coerce(&CellValue::Text("45.25".into()), ColumnType::Coordinate),
            Ok(Field::Float(45.25))
        );
        assert!(coerce(&CellValue::Text("45.25N".into()), ColumnType::Float).is_err());
        assert!(coerce(&CellValue::Text("inf".into()), ColumnType::Float).is_err());
    }

    #[test]
    fn test_coerce_text_from_number() {
        assert_eq!(
            coerce(&CellValue::Number(12.0), ColumnType::Text),
            Ok(Field::Text("12".into()))
        );
    }

    #[test]
    fn test_coerce_enum() {
        let ty = ColumnType::Enum(&["ICP", "XRF"]);
        assert_eq!(
            coerce(&CellValue::Text("XRF".into()), ty),
            Ok(Field::Text("XRF".into()))
        );
        assert!(coerce(&CellValue::Text("xrf".into()), ty).is_err());
    }

    #[test]
    fn test_coerce_empty_is_null() {
        assert_eq!(coerce(&CellValue::Empty, ColumnType::Integer), Ok(Field::Null));
    }

    #[test]
    fn test_header_reports_missing_and_extra_columns() {
        let g = grid("DOCUMENT.xlsx", "DOCUMENT", &[&["CITATION"], &["x"]]);
        let schema = schema_for(WorkbookKind::Documents);
        let errors = Header::parse(&g, schema, &DatasetOptions::default()).unwrap_err();

        assert_eq!(errors.len(), 2);
        assert!(errors.iter().any(|e| e.to_string().contains("unexpected column")));
        assert!(errors
            .iter()
            .any(|e| e.to_string().contains("RECOMMENDED_CITATION")));
    }

    #[test]
    fn test_header_extra_columns_ok() {
        let g = grid(
            "DOCUMENT.xlsx",
            "DOCUMENT",
            &[&["RECOMMENDED_CITATION", "CAT"], &["x", "Skittles"]],
        );
        let schema = schema_for(WorkbookKind::Documents);
        let options = DatasetOptions {
            extra_columns_ok: true,
        };
        let header = Header::parse(&g, schema, &options).unwrap();
        let row = TypedRow::coerce(&g, &header, schema, 2).unwrap();

        assert_eq!(row.extra().get("cat").map(String::as_str), Some("Skittles"));
    }

    #[test]
    fn test_header_blank_heading() {
        let g = grid(
            "DOCUMENT.xlsx",
            "DOCUMENT",
            &[&["RECOMMENDED_CITATION", "", "X"], &["x", "", "y"]],
        );
        let schema = schema_for(WorkbookKind::Documents);
        let options = DatasetOptions {
            extra_columns_ok: true,
        };
        let errors = Header::parse(&g, schema, &options).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].to_string().contains("column B"));
    }
}
