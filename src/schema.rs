//! Static descriptors for the fixed workbook kinds of a dataset.

use std::fmt;
use std::str::FromStr;

use crate::error::DatasetError;

/// Heading of the first hierarchy column of a BULK sheet
pub const SAMPLE_HEADING: &str = "SAMPLE";
/// Prefix that each deeper hierarchy heading adds to the previous one
pub const SUBSAMPLE_PREFIX: &str = "SUB";
/// Heading separating hierarchy columns from result-type columns
pub const METADATA_TYPE_HEADING: &str = "METADATA_TYPE";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WorkbookKind {
    Documents,
    Surveys,
    Samples,
    Bulk,
}

impl WorkbookKind {
    pub const ALL: [WorkbookKind; 4] = [
        WorkbookKind::Documents,
        WorkbookKind::Surveys,
        WorkbookKind::Samples,
        WorkbookKind::Bulk,
    ];

    /// File stem used in the dataset directory, e.g. `SURVEYS` for `SURVEYS.xlsx`
    pub fn file_stem(&self) -> &'static str {
        match self {
            WorkbookKind::Documents => "DOCUMENT",
            WorkbookKind::Surveys => "SURVEYS",
            WorkbookKind::Samples => "SAMPLES",
            WorkbookKind::Bulk => "BULK",
        }
    }

    /// Whether the kind may be split across `<STEM>-<suffix>.xlsx` files
    pub fn allows_split_files(&self) -> bool {
        matches!(self, WorkbookKind::Samples | WorkbookKind::Bulk)
    }
}

impl fmt::Display for WorkbookKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.file_stem())
    }
}

impl FromStr for WorkbookKind {
    type Err = DatasetError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let stem = s.trim().trim_end_matches(".xlsx").to_ascii_uppercase();
        match stem.as_str() {
            "DOCUMENT" | "DOCUMENTS" => Ok(WorkbookKind::Documents),
            "SURVEYS" => Ok(WorkbookKind::Surveys),
            "SAMPLES" => Ok(WorkbookKind::Samples),
            "BULK" => Ok(WorkbookKind::Bulk),
            _ => Err(DatasetError::UnknownWorkbookKind(s.to_string())),
        }
    }
}

/// Semantic type of a column, applied by the row parsers with strict coercion
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ColumnType {
    Text,
    Integer,
    Float,
    /// Closed vocabulary, matched exactly
    Enum(&'static [&'static str]),
    /// Float with a range checked by the owning record (lat/long or x/y)
    Coordinate,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColumnSpec {
    pub name: &'static str,
    pub ty: ColumnType,
    pub nullable: bool,
}

const fn required(name: &'static str, ty: ColumnType) -> ColumnSpec {
    ColumnSpec {
        name,
        ty,
        nullable: false,
    }
}

const fn optional(name: &'static str, ty: ColumnType) -> ColumnSpec {
    ColumnSpec {
        name,
        ty,
        nullable: true,
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SheetSchema {
    pub kind: WorkbookKind,
    pub workbook_name: &'static str,
    /// `None` means every sheet in the workbook follows the layout (BULK)
    pub sheet_name: Option<&'static str>,
    pub columns: &'static [ColumnSpec],
    pub unique: &'static [&'static [&'static str]],
    pub min_rows: usize,
    pub max_rows: Option<usize>,
}

impl SheetSchema {
    pub fn column(&self, name: &str) -> Option<&ColumnSpec> {
        self.columns.iter().find(|c| c.name == name)
    }
}

static DOCUMENTS: SheetSchema = SheetSchema {
    kind: WorkbookKind::Documents,
    workbook_name: "DOCUMENT.xlsx",
    sheet_name: Some("DOCUMENT"),
    columns: &[required("RECOMMENDED_CITATION", ColumnType::Text)],
    unique: &[&["RECOMMENDED_CITATION"]],
    min_rows: 1,
    max_rows: Some(1),
};

static SURVEYS: SheetSchema = SheetSchema {
    kind: WorkbookKind::Surveys,
    workbook_name: "SURVEYS.xlsx",
    sheet_name: Some("SURVEYS"),
    columns: &[
        required("TITLE", ColumnType::Text),
        required("ORGANIZATION", ColumnType::Text),
        required("YEAR_BEGIN", ColumnType::Integer),
        optional("YEAR_END", ColumnType::Integer),
        optional("PARTY_LEADER", ColumnType::Text),
        optional("DESCRIPTION", ColumnType::Text),
        optional("GSC_CATALOG_NUMBER", ColumnType::Integer),
    ],
    unique: &[&["TITLE"]],
    min_rows: 1,
    max_rows: None,
};

static SAMPLES: SheetSchema = SheetSchema {
    kind: WorkbookKind::Samples,
    workbook_name: "SAMPLES.xlsx",
    sheet_name: Some("SAMPLES"),
    columns: &[
        required("SURVEY_TITLE", ColumnType::Text),
        required("STATION", ColumnType::Text),
        required("EARTHMAT", ColumnType::Text),
        required("SAMPLE", ColumnType::Text),
        optional("LAT_NAD27", ColumnType::Coordinate),
        optional("LONG_NAD27", ColumnType::Coordinate),
        optional("LAT_NAD83", ColumnType::Coordinate),
        optional("LONG_NAD83", ColumnType::Coordinate),
        optional("X_NAD27", ColumnType::Coordinate),
        optional("Y_NAD27", ColumnType::Coordinate),
        optional("X_NAD83", ColumnType::Coordinate),
        optional("Y_NAD83", ColumnType::Coordinate),
        optional("ZONE", ColumnType::Text),
        required("EARTHMAT_TYPE", ColumnType::Text),
        optional("STATUS", ColumnType::Text),
    ],
    unique: &[&["SURVEY_TITLE", "STATION", "EARTHMAT", "SAMPLE"]],
    min_rows: 1,
    max_rows: None,
};

static BULK: SheetSchema = SheetSchema {
    kind: WorkbookKind::Bulk,
    workbook_name: "BULK.xlsx",
    sheet_name: None,
    columns: &[],
    unique: &[],
    min_rows: 0,
    max_rows: None,
};

pub fn schema_for(kind: WorkbookKind) -> &'static SheetSchema {
    match kind {
        WorkbookKind::Documents => &DOCUMENTS,
        WorkbookKind::Surveys => &SURVEYS,
        WorkbookKind::Samples => &SAMPLES,
        WorkbookKind::Bulk => &BULK,
    }
}

/// Lookup by kind name (`"SURVEYS"`, `"surveys.xlsx"`, ...)
pub fn schema_by_name(name: &str) -> Result<&'static SheetSchema, DatasetError> {
    name.parse::<WorkbookKind>().map(schema_for)
}
