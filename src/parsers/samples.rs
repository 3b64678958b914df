use crate::error::DatasetError;
use crate::models::{Coordinates, LatLong, Projected, Sample};
use crate::schema::{schema_for, SheetSchema, WorkbookKind};

use super::{RowParser, TypedRow};

#[derive(Debug, Clone, Copy, Default)]
pub struct SampleParser;

/// Both-or-neither check for a coordinate pair
fn pair(
    row: &TypedRow,
    first: &str,
    second: &str,
    errors: &mut Vec<DatasetError>,
) -> Option<(f64, f64)> {
    match (row.float(first), row.float(second)) {
        (Some(a), Some(b)) => Some((a, b)),
        (None, None) => None,
        (Some(_), None) => {
            errors.push(row.error(second, format!("{second} is required when {first} is given")));
            None
        }
        (None, Some(_)) => {
            errors.push(row.error(first, format!("{first} is required when {second} is given")));
            None
        }
    }
}

fn coordinates(row: &TypedRow, datum: &str, errors: &mut Vec<DatasetError>) -> Coordinates {
    let lat_col = format!("LAT_{datum}");
    let long_col = format!("LONG_{datum}");
    let x_col = format!("X_{datum}");
    let y_col = format!("Y_{datum}");

    let lat_long = pair(row, &lat_col, &long_col, errors).and_then(|(lat, long)| {
        let mut ok = true;
        if !(-90.0..=90.0).contains(&lat) {
            errors.push(row.error(&lat_col, format!("latitude {lat} outside -90 to 90")));
            ok = false;
        }
        if !(-180.0..=180.0).contains(&long) {
            errors.push(row.error(&long_col, format!("longitude {long} outside -180 to 180")));
            ok = false;
        }
        ok.then_some(LatLong { lat, long })
    });

    let xy = pair(row, &x_col, &y_col, errors).map(|(x, y)| Projected { x, y });
    if xy.is_some() && row.text("ZONE").is_none() {
        errors.push(row.error("ZONE", format!("ZONE is required when {x_col}/{y_col} are given")));
    }

    Coordinates { lat_long, xy }
}

impl RowParser for SampleParser {
    type Record = Sample;

    fn schema(&self) -> &'static SheetSchema {
        schema_for(WorkbookKind::Samples)
    }

    fn build(&self, row: &TypedRow) -> Result<Sample, Vec<DatasetError>> {
        let mut errors = Vec::new();
        let nad27 = coordinates(row, "NAD27", &mut errors);
        let nad83 = coordinates(row, "NAD83", &mut errors);

        if !errors.is_empty() {
            return Err(errors);
        }

        Ok(Sample {
            origin: row.origin().clone(),
            survey_title: row.required_text("SURVEY_TITLE"),
            station: row.required_text("STATION"),
            earthmat: row.required_text("EARTHMAT"),
            name: row.required_text("SAMPLE"),
            nad27,
            nad83,
            zone: row.text("ZONE").map(str::to_string),
            earthmat_type: row.required_text("EARTHMAT_TYPE"),
            status: row.text("STATUS").map(str::to_string),
            extra: row.extra().clone(),
        })
    }
}
