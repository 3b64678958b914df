// Shared fixtures: real .xlsx workbooks written into a temporary dataset directory

#![allow(dead_code)]

use rust_xlsxwriter::Workbook;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

pub type Rows<'a> = &'a [&'a [&'a str]];

/// Write one workbook; numeric text becomes a number cell and "" stays blank
pub fn write_workbook(path: &Path, sheets: &[(&str, Rows)]) {
    let mut workbook = Workbook::new();
    for (name, rows) in sheets {
        let worksheet = workbook.add_worksheet();
        worksheet.set_name(*name).expect("Failed to name worksheet");
        for (r, row) in rows.iter().enumerate() {
            for (c, value) in row.iter().enumerate() {
                if value.is_empty() {
                    continue;
                }
                match value.parse::<f64>() {
                    Ok(n) if n.is_finite() => worksheet.write_number(r as u32, c as u16, n),
                    _ => worksheet.write_string(r as u32, c as u16, *value),
                }
                .expect("Failed to write cell");
            }
        }
    }
    workbook.save(path).expect("Failed to save workbook");
}

pub const DOCUMENT: Rows = &[
    &["RECOMMENDED_CITATION"],
    &["Doe, J. 2024. Till geochemistry of the Ottawa valley."],
];

pub const SURVEYS: Rows = &[
    &[
        "TITLE",
        "ORGANIZATION",
        "YEAR_BEGIN",
        "YEAR_END",
        "PARTY_LEADER",
        "DESCRIPTION",
        "GSC_CATALOG_NUMBER",
    ],
    &["Till survey", "GSC", "1990", "1992", "J. Doe", "", "12345"],
];

pub const SAMPLES_HEADER: &[&str] = &[
    "SURVEY_TITLE",
    "STATION",
    "EARTHMAT",
    "SAMPLE",
    "LAT_NAD27",
    "LONG_NAD27",
    "LAT_NAD83",
    "LONG_NAD83",
    "X_NAD27",
    "Y_NAD27",
    "X_NAD83",
    "Y_NAD83",
    "ZONE",
    "EARTHMAT_TYPE",
    "STATUS",
];

pub const SAMPLES: Rows = &[
    SAMPLES_HEADER,
    &[
        "Till survey", "ST1", "E1", "S1", "", "", "45.5", "-75.5", "", "", "", "", "", "Till", "",
    ],
    &[
        "Till survey", "ST2", "E1", "S2", "", "", "45.6", "-75.6", "", "", "", "", "", "Till", "",
    ],
];

pub const BULK: Rows = &[
    &["SAMPLE", "SUBSAMPLE", "METADATA_TYPE", "Au", "Ag"],
    &["", "", "method", "ICP", "ICP"],
    &["", "", "unit", "ppb", "ppm"],
    &["S1", "", "", "0.5", "<0.1"],
    &["S1", "A", "", "1.5", ""],
    &["S2", "", "", "", "3"],
];

/// A temporary dataset directory named in reverse domain notation
pub struct Fixture {
    pub temp: TempDir,
    pub dir: PathBuf,
}

impl Fixture {
    pub fn empty() -> Self {
        let temp = TempDir::new().expect("Failed to create temp dir");
        let dir = temp.path().join("ca.gc.nrcan.test");
        std::fs::create_dir(&dir).expect("Failed to create dataset dir");
        Self { temp, dir }
    }

    /// DOCUMENT, SURVEYS, SAMPLES and BULK, all valid
    pub fn valid() -> Self {
        Self::empty()
            .with("DOCUMENT.xlsx", &[("DOCUMENT", DOCUMENT)])
            .with("SURVEYS.xlsx", &[("SURVEYS", SURVEYS)])
            .with("SAMPLES.xlsx", &[("SAMPLES", SAMPLES)])
            .with("BULK.xlsx", &[("BULK1", BULK)])
    }

    pub fn with(self, file_name: &str, sheets: &[(&str, Rows)]) -> Self {
        write_workbook(&self.dir.join(file_name), sheets);
        self
    }

    pub fn without(self, file_name: &str) -> Self {
        std::fs::remove_file(self.dir.join(file_name)).expect("Failed to remove workbook");
        self
    }
}
