use serde::Serialize;
use std::collections::BTreeMap;

use crate::error::Position;

/// Values of columns outside the schema, keyed by lower-cased heading
pub type Extra = BTreeMap<String, String>;

// Dataset-scoped arena indexes
macro_rules! arena_id {
    ($name:ident) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
        pub struct $name(pub usize);

        impl $name {
            pub fn index(self) -> usize {
                self.0
            }
        }
    };
}

arena_id!(SurveyId);
arena_id!(SampleId);
arena_id!(SubsampleId);
arena_id!(ResultTypeId);
arena_id!(MetadataTypeId);
arena_id!(MetadataSetId);

/// Where a flat-sheet record came from
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RowOrigin {
    pub workbook: String,
    pub sheet: String,
    pub row: u32,
}

impl RowOrigin {
    pub fn position(&self) -> Position {
        Position::sheet(self.workbook.clone(), self.sheet.clone()).at_row(self.row)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Document {
    pub origin: RowOrigin,
    pub recommended_citation: String,
    pub extra: Extra,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Survey {
    pub origin: RowOrigin,
    pub title: String,
    pub organization: String,
    pub year_begin: i32,
    pub year_end: Option<i32>,
    pub party_leader: Option<String>,
    pub description: Option<String>,
    pub gsc_catalog_number: Option<i64>,
    pub extra: Extra,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LatLong {
    pub lat: f64,
    pub long: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Projected {
    pub x: f64,
    pub y: f64,
}

/// Coordinates in one datum; each pair is whole or absent
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct Coordinates {
    pub lat_long: Option<LatLong>,
    pub xy: Option<Projected>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Sample {
    pub origin: RowOrigin,
    pub survey_title: String,
    pub station: String,
    pub earthmat: String,
    pub name: String,
    pub nad27: Coordinates,
    pub nad83: Coordinates,
    pub zone: Option<String>,
    pub earthmat_type: String,
    pub status: Option<String>,
    pub extra: Extra,
}

/// One node of the sample → subsample → sub-subsample tree
///
/// A root node (`parent == None`) is named after its sample. `parent` always
/// points at an entry created earlier in the same arena.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Subsample {
    pub sample_name: String,
    pub parent: Option<SubsampleId>,
    pub name: String,
    pub origin: Position,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResultType {
    pub name: String,
    pub origin: Position,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetadataType {
    pub name: String,
}

/// Sorted (type, value) pairs; one value per type
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize)]
pub struct MetadataSet {
    pub entries: Vec<(MetadataTypeId, String)>,
}

impl MetadataSet {
    pub fn get(&self, metadata_type: MetadataTypeId) -> Option<&str> {
        self.entries
            .iter()
            .find(|(t, _)| *t == metadata_type)
            .map(|(_, v)| v.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// A single analytical value, e.g. `0.5` or the censored `<0.01`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisResult {
    pub subsample: SubsampleId,
    pub result_type: ResultTypeId,
    pub metadata_set: MetadataSetId,
    pub value: String,
    /// Sheet and cell the value was read from
    pub origin: Position,
}
