use calamine::{open_workbook, Data, Range, Reader, Xlsx};
use chrono::Timelike;
use serde::Serialize;
use std::fmt;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use tracing::{debug, instrument};

use crate::error::{DatasetError, Position};
use crate::utils::format_number;

/// Text that stands for a missing value, matched after trimming
pub const NA_MARKERS: &[&str] = &[
    "-1.#IND", "1.#QNAN", "1.#IND", "-1.#QNAN", "#N/A N/A", "#N/A", "N/A", "n/a", "<NA>", "#NA",
    "NULL", "null", "NaN", "-NaN", "nan", "-nan",
];

/// A single worksheet cell after normalization
///
/// Text is trimmed; whitespace-only text, the `NA_MARKERS` and Excel error
/// cells are `Empty`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub enum CellValue {
    #[default]
    Empty,
    Text(String),
    Number(f64),
}

pub(crate) static EMPTY_CELL: CellValue = CellValue::Empty;

impl CellValue {
    pub fn text(value: &str) -> Self {
        let trimmed = value.trim();
        if trimmed.is_empty() || NA_MARKERS.contains(&trimmed) {
            CellValue::Empty
        } else {
            CellValue::Text(trimmed.to_string())
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, CellValue::Empty)
    }

    /// The cell rendered as text, `None` when blank
    pub fn as_text(&self) -> Option<String> {
        match self {
            CellValue::Empty => None,
            CellValue::Text(s) => Some(s.clone()),
            CellValue::Number(n) => Some(format_number(*n)),
        }
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Empty => Ok(()),
            CellValue::Text(s) => f.write_str(s),
            CellValue::Number(n) => f.write_str(&format_number(*n)),
        }
    }
}

impl From<&Data> for CellValue {
    fn from(data: &Data) -> Self {
        match data {
            Data::String(s) => CellValue::text(s),
            Data::Float(f) if f.is_finite() => CellValue::Number(*f),
            Data::Int(i) => CellValue::Number(*i as f64),
            Data::Bool(b) => CellValue::Text(if *b { "TRUE" } else { "FALSE" }.to_string()),
            Data::DateTime(dt) => match dt.as_datetime() {
                Some(ndt) if ndt.time().num_seconds_from_midnight() == 0 => {
                    CellValue::Text(ndt.format("%Y-%m-%d").to_string())
                }
                Some(ndt) => CellValue::Text(ndt.format("%Y-%m-%dT%H:%M:%S").to_string()),
                None => CellValue::Number(dt.as_f64()),
            },
            Data::DateTimeIso(s) => CellValue::text(s),
            _ => CellValue::Empty,
        }
    }
}

/// Rectangular view of one worksheet, addressed with 1-based (row, column)
///
/// Trailing blank rows and columns are cropped; everything inside the used
/// area is present, blanks as `CellValue::Empty`. Blank rows and columns
/// before the used area are not stored, only counted in the offsets.
#[derive(Debug, Clone, PartialEq)]
pub struct Grid {
    workbook: String,
    sheet: String,
    rows: Vec<Vec<CellValue>>,
    width: usize,
    row_offset: u32,
    col_offset: u32,
}

impl Grid {
    pub fn new(
        workbook: impl Into<String>,
        sheet: impl Into<String>,
        mut rows: Vec<Vec<CellValue>>,
    ) -> Self {
        while rows.last().is_some_and(|r| r.iter().all(CellValue::is_empty)) {
            rows.pop();
        }

        let width = rows
            .iter()
            .filter_map(|r| r.iter().rposition(|c| !c.is_empty()))
            .map(|idx| idx + 1)
            .max()
            .unwrap_or(0);

        for row in &mut rows {
            row.resize(width, CellValue::Empty);
        }

        Self {
            workbook: workbook.into(),
            sheet: sheet.into(),
            rows,
            width,
            row_offset: 0,
            col_offset: 0,
        }
    }

    /// Build a grid from a calamine range, keeping absolute cell positions
    pub fn from_range(
        workbook: impl Into<String>,
        sheet: impl Into<String>,
        range: &Range<Data>,
    ) -> Self {
        let (row_offset, col_offset) = range.start().unwrap_or((0, 0));
        let (height, width) = range.get_size();

        // Only the used range is allocated
        let mut rows = vec![vec![CellValue::Empty; width]; height];
        for (r, c, data) in range.used_cells() {
            rows[r][c] = CellValue::from(data);
        }

        let mut grid = Self::new(workbook, sheet, rows);
        if !grid.rows.is_empty() {
            grid.row_offset = row_offset;
            grid.col_offset = col_offset;
        }
        grid
    }

    pub fn workbook(&self) -> &str {
        &self.workbook
    }

    pub fn sheet(&self) -> &str {
        &self.sheet
    }

    /// Last used row, counting leading blank rows
    pub fn height(&self) -> u32 {
        self.row_offset + self.rows.len() as u32
    }

    /// Last used column, counting leading blank columns
    pub fn width(&self) -> u32 {
        if self.width == 0 {
            0
        } else {
            self.col_offset + self.width as u32
        }
    }

    /// Cell at 1-based coordinates; anything outside the used area is blank
    pub fn get(&self, row: u32, column: u32) -> &CellValue {
        if row <= self.row_offset || column <= self.col_offset {
            return &EMPTY_CELL;
        }
        self.rows
            .get((row - self.row_offset) as usize - 1)
            .and_then(|r| r.get((column - self.col_offset) as usize - 1))
            .unwrap_or(&EMPTY_CELL)
    }

    /// Stored cells of a 1-based row, starting at the first used column;
    /// empty slice when the row is outside the used area
    pub fn row(&self, row: u32) -> &[CellValue] {
        if row <= self.row_offset {
            return &[];
        }
        self.rows
            .get((row - self.row_offset) as usize - 1)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn is_blank_row(&self, row: u32) -> bool {
        self.row(row).iter().all(CellValue::is_empty)
    }

    pub fn position(&self) -> Position {
        Position::sheet(self.workbook.clone(), self.sheet.clone())
    }
}

fn workbook_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Open an .xlsx container; the handle is dropped by the caller's scope
fn open(path: &Path) -> Result<Xlsx<BufReader<File>>, DatasetError> {
    if !path.is_file() {
        return Err(DatasetError::WorkbookNotFound {
            path: path.to_path_buf(),
        });
    }

    open_workbook(path).map_err(|e: calamine::XlsxError| DatasetError::CorruptWorkbook {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })
}

/// List sheet names in workbook order
pub fn sheet_names(path: &Path) -> Result<Vec<String>, DatasetError> {
    let workbook = open(path)?;
    Ok(workbook.sheet_names())
}

/// Load one worksheet as a grid
#[instrument(skip_all, fields(path = %path.display(), sheet = sheet_name))]
pub fn read_sheet(path: &Path, sheet_name: &str) -> Result<Grid, DatasetError> {
    let mut workbook = open(path)?;

    if !workbook.sheet_names().iter().any(|n| n == sheet_name) {
        return Err(DatasetError::SheetNotFound {
            workbook: workbook_name(path),
            sheet: sheet_name.to_string(),
        });
    }

    let range = workbook
        .worksheet_range(sheet_name)
        .map_err(|e| DatasetError::CorruptWorkbook {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

    let grid = Grid::from_range(workbook_name(path), sheet_name, &range);
    debug!(
        "Loaded sheet {} ({} rows x {} columns)",
        sheet_name,
        grid.height(),
        grid.width()
    );
    Ok(grid)
}

/// Load every worksheet of a workbook, in workbook order
#[instrument(skip_all, fields(path = %path.display()))]
pub fn read_all_sheets(path: &Path) -> Result<Vec<Grid>, DatasetError> {
    let mut workbook = open(path)?;
    let name = workbook_name(path);

    let mut grids = Vec::new();
    for sheet_name in workbook.sheet_names() {
        let range = workbook
            .worksheet_range(&sheet_name)
            .map_err(|e| DatasetError::CorruptWorkbook {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?;
        let grid = Grid::from_range(name.clone(), sheet_name.as_str(), &range);
        debug!(
            "Loaded sheet {} ({} rows x {} columns)",
            sheet_name,
            grid.height(),
            grid.width()
        );
        grids.push(grid);
    }

    Ok(grids)
}
