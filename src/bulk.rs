//! BULK worksheet normalizer
//!
//! A BULK sheet is a pivoted "wide" table:
//!
//! ```text
//! | SAMPLE   | SUBSAMPLE | ... | METADATA_TYPE | Au    | Ag    |
//! |          |           |     | method        | ICP   | ICP   |   <- metadata rows
//! |          |           |     | unit          | ppm   | ppb   |
//! | S1       | A         |     |               | 0.5   | <0.1  |   <- data rows
//! | S1       | A         | x   |               |       | 3     |
//! ```
//!
//! The leading hierarchy columns (`SAMPLE`, `SUBSAMPLE`, `SUBSUBSAMPLE`, ...)
//! name a path in the subsample tree. Metadata is stated per result column,
//! so every result in a column shares that column's metadata set.

use serde::Serialize;
use std::collections::HashMap;
use tracing::{debug, info, instrument, warn};

use crate::error::{DatasetError, Position};
use crate::models::{
    AnalysisResult, MetadataSet, MetadataSetId, MetadataType, MetadataTypeId, ResultType,
    ResultTypeId, Subsample, SubsampleId,
};
use crate::schema::{METADATA_TYPE_HEADING, SAMPLE_HEADING, SUBSAMPLE_PREFIX};
use crate::workbook::Grid;

/// Normalized records from every BULK sheet of a dataset
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AnalysisBulk {
    pub subsamples: Vec<Subsample>,
    pub result_types: Vec<ResultType>,
    pub metadata_types: Vec<MetadataType>,
    pub metadata_sets: Vec<MetadataSet>,
    pub results: Vec<AnalysisResult>,
}

impl AnalysisBulk {
    pub fn subsample(&self, id: SubsampleId) -> Option<&Subsample> {
        self.subsamples.get(id.index())
    }

    pub fn result_type(&self, id: ResultTypeId) -> Option<&ResultType> {
        self.result_types.get(id.index())
    }

    pub fn metadata_type(&self, id: MetadataTypeId) -> Option<&MetadataType> {
        self.metadata_types.get(id.index())
    }

    pub fn metadata_set(&self, id: MetadataSetId) -> Option<&MetadataSet> {
        self.metadata_sets.get(id.index())
    }

    /// Names from the root (sample level) down to `id`
    pub fn subsample_path(&self, id: SubsampleId) -> Vec<&str> {
        let mut path = Vec::new();
        let mut current = self.subsample(id);
        while let Some(node) = current {
            path.push(node.name.as_str());
            current = node.parent.and_then(|p| self.subsample(p));
        }
        path.reverse();
        path
    }

    /// (type name, value) pairs of a metadata set, sorted by type name
    pub fn metadata_pairs(&self, id: MetadataSetId) -> Vec<(&str, &str)> {
        let mut pairs: Vec<(&str, &str)> = self
            .metadata_set(id)
            .map(|set| {
                set.entries
                    .iter()
                    .filter_map(|(t, v)| {
                        self.metadata_type(*t)
                            .map(|mt| (mt.name.as_str(), v.as_str()))
                    })
                    .collect()
            })
            .unwrap_or_default();
        pairs.sort();
        pairs
    }
}

#[derive(Debug, Clone, Default)]
pub struct BulkOutcome {
    pub bulk: AnalysisBulk,
    pub errors: Vec<DatasetError>,
}

/// Column geometry of one BULK sheet
#[derive(Debug, Clone)]
struct Layout {
    depth: u32,
    metadata_column: u32,
    /// One entry per column right of METADATA_TYPE; `None` when the heading was rejected
    result_columns: Vec<(u32, Option<ResultTypeId>)>,
}

/// Accumulates BULK sheets into one `AnalysisBulk`
///
/// Result types, metadata types and the subsample tree are dataset-scoped;
/// metadata-set sharing is resolved per sheet.
#[derive(Debug, Default)]
pub struct BulkNormalizer {
    bulk: AnalysisBulk,
    subsample_index: HashMap<(Option<SubsampleId>, String), SubsampleId>,
    result_type_index: HashMap<String, ResultTypeId>,
    /// A result is unique by subsample, result type and metadata set
    result_index: HashMap<(SubsampleId, ResultTypeId, MetadataSetId), Position>,
    metadata_type_index: HashMap<String, MetadataTypeId>,
    errors: Vec<DatasetError>,
}

impl BulkNormalizer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn finish(self) -> BulkOutcome {
        BulkOutcome {
            bulk: self.bulk,
            errors: self.errors,
        }
    }

    fn error(&mut self, error: DatasetError) {
        debug!("{}", error);
        self.errors.push(error);
    }

    #[instrument(skip_all, fields(workbook = grid.workbook(), sheet = grid.sheet()))]
    pub fn normalize_sheet(&mut self, grid: &Grid) {
        if grid.height() == 0 {
            warn!("Skipping empty sheet {}::{}", grid.workbook(), grid.sheet());
            return;
        }

        let Some(layout) = self.parse_header(grid) else {
            return;
        };

        let results_before = self.bulk.results.len();
        let errors_before = self.errors.len();

        let column_count = layout.result_columns.len();
        let mut column_metadata: Vec<Vec<(MetadataTypeId, String)>> = vec![Vec::new(); column_count];
        let mut column_sets: Vec<Option<MetadataSetId>> = vec![None; column_count];
        let mut set_index: HashMap<Vec<(MetadataTypeId, String)>, MetadataSetId> = HashMap::new();
        let mut sheet_metadata_types: HashMap<String, u32> = HashMap::new();
        let mut first_data_row: Option<u32> = None;

        for row in 2..=grid.height() {
            if grid.is_blank_row(row) {
                continue;
            }

            let hierarchy: Vec<Option<String>> =
                (1..=layout.depth).map(|col| grid.get(row, col).as_text()).collect();
            let metadata_type = grid.get(row, layout.metadata_column).as_text();
            let row_position = grid.position().at_row(row);

            if hierarchy.iter().all(Option::is_none) {
                let Some(name) = metadata_type else {
                    self.error(DatasetError::RowValidation {
                        position: row_position,
                        reason: "row has values but neither a sample nor a metadata type"
                            .to_string(),
                    });
                    continue;
                };

                if let Some(first_data_row) = first_data_row {
                    self.error(DatasetError::MetadataAfterData {
                        position: row_position.at_column(METADATA_TYPE_HEADING),
                        metadata_type: name,
                        first_data_row,
                    });
                    continue;
                }

                if let Some(first_row) = sheet_metadata_types.get(&name) {
                    self.error(DatasetError::RowValidation {
                        position: row_position.at_column(METADATA_TYPE_HEADING),
                        reason: format!(
                            "duplicate metadata type {name:?} (first declared on row {first_row})"
                        ),
                    });
                    continue;
                }
                sheet_metadata_types.insert(name.clone(), row);

                let type_id = self.metadata_type_id(&name);
                for (j, (col, result_type)) in layout.result_columns.iter().enumerate() {
                    if result_type.is_none() {
                        continue;
                    }
                    if let Some(value) = grid.get(row, *col).as_text() {
                        column_metadata[j].push((type_id, value));
                    }
                }
                continue;
            }

            // Data row
            first_data_row.get_or_insert(row);

            if metadata_type.is_some() {
                self.error(DatasetError::RowValidation {
                    position: row_position.at_column(METADATA_TYPE_HEADING),
                    reason: "METADATA_TYPE must be blank on a data row".to_string(),
                });
                continue;
            }

            let path_len = hierarchy.iter().take_while(|v| v.is_some()).count();
            if hierarchy[path_len..].iter().any(Option::is_some) {
                self.error(DatasetError::BrokenHierarchyChain {
                    position: row_position.at_column_index(path_len as u32 + 1),
                });
                continue;
            }

            let path: Vec<String> = hierarchy.into_iter().flatten().collect();
            let Some(subsample) = self.resolve_chain(grid, row, &path) else {
                continue;
            };

            for (j, (col, result_type)) in layout.result_columns.iter().enumerate() {
                let Some(result_type) = result_type else {
                    continue;
                };
                let Some(value) = grid.get(row, *col).as_text() else {
                    continue;
                };

                let metadata_set = match column_sets[j] {
                    Some(id) => id,
                    None => {
                        let id = self.shared_metadata_set(&mut set_index, &column_metadata[j]);
                        column_sets[j] = Some(id);
                        id
                    }
                };

                let origin = grid.position().at_row(row).at_column_index(*col);
                let key = (subsample, *result_type, metadata_set);
                if let Some(first) = self.result_index.get(&key) {
                    let reason = format!(
                        "duplicate result for subsample {} (first at {first})",
                        self.bulk.subsample_path(subsample).join("/")
                    );
                    self.error(DatasetError::RowValidation {
                        position: origin,
                        reason,
                    });
                    continue;
                }
                self.result_index.insert(key, origin.clone());

                self.bulk.results.push(AnalysisResult {
                    subsample,
                    result_type: *result_type,
                    metadata_set,
                    value,
                    origin,
                });
            }
        }

        info!(
            "Normalized {} results from {}::{} ({} errors)",
            self.bulk.results.len() - results_before,
            grid.workbook(),
            grid.sheet(),
            self.errors.len() - errors_before
        );
    }

    /// Validate the heading row and register the sheet's result types
    fn parse_header(&mut self, grid: &Grid) -> Option<Layout> {
        let header = grid.position().at_row(1);

        if grid.get(1, 1).as_text().as_deref() != Some(SAMPLE_HEADING) {
            self.error(DatasetError::SheetStructure {
                position: header.at_column_index(1),
                reason: format!("heading must be {SAMPLE_HEADING}"),
            });
            return None;
        }

        let mut depth = 1;
        let mut previous = SAMPLE_HEADING.to_string();
        loop {
            let expected = format!("{SUBSAMPLE_PREFIX}{previous}");
            if grid.get(1, depth + 1).as_text().as_deref() != Some(expected.as_str()) {
                break;
            }
            depth += 1;
            previous = expected;
        }

        let metadata_column = depth + 1;
        if grid.get(1, metadata_column).as_text().as_deref() != Some(METADATA_TYPE_HEADING) {
            self.error(DatasetError::SheetStructure {
                position: header.at_column_index(metadata_column),
                reason: format!("heading must be {METADATA_TYPE_HEADING}"),
            });
            return None;
        }

        let mut result_columns = Vec::new();
        for col in (metadata_column + 1)..=grid.width() {
            let position = header.clone().at_column_index(col);
            let id = match grid.get(1, col).as_text() {
                None => {
                    self.error(DatasetError::SheetStructure {
                        position,
                        reason: "missing result type heading".to_string(),
                    });
                    None
                }
                Some(name) => self.register_result_type(name, position),
            };
            result_columns.push((col, id));
        }

        debug!(
            "BULK layout for {}: depth {}, {} result columns",
            grid.sheet(),
            depth,
            result_columns.len()
        );

        Some(Layout {
            depth,
            metadata_column,
            result_columns,
        })
    }

    fn register_result_type(&mut self, name: String, position: Position) -> Option<ResultTypeId> {
        if let Some(existing) = self.result_type_index.get(&name) {
            let first = self.bulk.result_types[existing.index()].origin.clone();
            self.error(DatasetError::DuplicateResultType {
                position,
                name,
                first,
            });
            return None;
        }

        let id = ResultTypeId(self.bulk.result_types.len());
        self.bulk.result_types.push(ResultType {
            name: name.clone(),
            origin: position,
        });
        self.result_type_index.insert(name, id);
        Some(id)
    }

    fn metadata_type_id(&mut self, name: &str) -> MetadataTypeId {
        if let Some(id) = self.metadata_type_index.get(name) {
            return *id;
        }
        let id = MetadataTypeId(self.bulk.metadata_types.len());
        self.bulk.metadata_types.push(MetadataType {
            name: name.to_string(),
        });
        self.metadata_type_index.insert(name.to_string(), id);
        id
    }

    /// Find or create the subsample node for every level of `path`
    fn resolve_chain(&mut self, grid: &Grid, row: u32, path: &[String]) -> Option<SubsampleId> {
        let sample_name = path.first()?;
        let mut parent: Option<SubsampleId> = None;

        for (level, name) in path.iter().enumerate() {
            let key = (parent, name.clone());
            let id = match self.subsample_index.get(&key) {
                Some(id) => *id,
                None => {
                    let id = SubsampleId(self.bulk.subsamples.len());
                    self.bulk.subsamples.push(Subsample {
                        sample_name: sample_name.clone(),
                        parent,
                        name: name.clone(),
                        origin: grid.position().at_row(row).at_column_index(level as u32 + 1),
                    });
                    self.subsample_index.insert(key, id);
                    id
                }
            };
            parent = Some(id);
        }

        parent
    }

    /// Identical metadata content maps to one set
    fn shared_metadata_set(
        &mut self,
        set_index: &mut HashMap<Vec<(MetadataTypeId, String)>, MetadataSetId>,
        entries: &[(MetadataTypeId, String)],
    ) -> MetadataSetId {
        let mut key = entries.to_vec();
        key.sort();

        if let Some(id) = set_index.get(&key) {
            return *id;
        }

        let id = MetadataSetId(self.bulk.metadata_sets.len());
        self.bulk.metadata_sets.push(MetadataSet {
            entries: key.clone(),
        });
        set_index.insert(key, id);
        id
    }
}

/// Normalize a sequence of BULK sheets, in order
pub fn normalize<'a>(grids: impl IntoIterator<Item = &'a Grid>) -> BulkOutcome {
    let mut normalizer = BulkNormalizer::new();
    for grid in grids {
        normalizer.normalize_sheet(grid);
    }
    normalizer.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workbook::tests::grid;

    fn bulk(rows: &[&[&str]]) -> BulkOutcome {
        normalize([&grid("BULK.xlsx", "BULK1", rows)])
    }

    #[test]
    fn test_single_level_scenario() {
        let outcome = bulk(&[
            &["SAMPLE", "METADATA_TYPE", "Au", "Ag"],
            &["", "method", "ICP", "ICP"],
            &["S1", "", "0.5", "<0.1"],
        ]);

        assert!(outcome.errors.is_empty(), "{:?}", outcome.errors);
        let b = &outcome.bulk;

        assert_eq!(b.subsamples.len(), 1);
        assert_eq!(b.subsamples[0].name, "S1");
        assert_eq!(b.subsamples[0].sample_name, "S1");
        assert_eq!(b.subsamples[0].parent, None);

        assert_eq!(b.metadata_sets.len(), 1);
        assert_eq!(b.metadata_pairs(MetadataSetId(0)), vec![("method", "ICP")]);

        assert_eq!(b.results.len(), 2);
        assert_eq!(b.results[0].value, "0.5");
        assert_eq!(b.results[1].value, "<0.1");
        assert_eq!(b.results[0].metadata_set, b.results[1].metadata_set);
        assert_eq!(b.result_type(b.results[0].result_type).unwrap().name, "Au");
        assert_eq!(b.result_type(b.results[1].result_type).unwrap().name, "Ag");
        assert_eq!(b.results[1].origin.to_string(), "BULK.xlsx::BULK1 row 3, column D");
    }

    #[test]
    fn test_result_count_matches_non_blank_cells() {
        let outcome = bulk(&[
            &["SAMPLE", "SUBSAMPLE", "METADATA_TYPE", "Au", "Ag", "Cu"],
            &["", "", "method", "ICP", "FA", "ICP"],
            &["S1", "A", "", "1", "", "3"],
            &["S1", "B", "", "", "", ""],
            &["S2", "A", "", "4", "5", "6"],
        ]);

        assert!(outcome.errors.is_empty(), "{:?}", outcome.errors);
        assert_eq!(outcome.bulk.results.len(), 5);
    }

    #[test]
    fn test_row_without_results_still_creates_subsample() {
        let outcome = bulk(&[
            &["SAMPLE", "SUBSAMPLE", "METADATA_TYPE", "Au"],
            &["S1", "A", "", ""],
        ]);

        assert!(outcome.errors.is_empty());
        assert_eq!(outcome.bulk.subsamples.len(), 2);
        assert!(outcome.bulk.results.is_empty());
    }

    #[test]
    fn test_missing_value_markers_yield_no_results() {
        let outcome = bulk(&[
            &["SAMPLE", "METADATA_TYPE", "Au", "Ag", "Cu"],
            &["", "Method", "N/A", "#N/A", "ICP"],
            &["S1", "", "N/A", "NULL", "nan"],
        ]);

        assert!(outcome.errors.is_empty(), "{:?}", outcome.errors);
        assert!(outcome.bulk.results.is_empty());
        assert_eq!(outcome.bulk.subsamples.len(), 1);
        assert_eq!(outcome.bulk.subsamples[0].name, "S1");
    }

    #[test]
    fn test_na_is_a_result_value() {
        let outcome = bulk(&[
            &["SAMPLE", "METADATA_TYPE", "Na"],
            &["S1", "", "NA"],
        ]);

        assert!(outcome.errors.is_empty(), "{:?}", outcome.errors);
        assert_eq!(outcome.bulk.results.len(), 1);
        assert_eq!(outcome.bulk.results[0].value, "NA");
    }

    #[test]
    fn test_metadata_set_shared_across_rows_and_columns() {
        let outcome = bulk(&[
            &["SAMPLE", "SUBSAMPLE", "METADATA_TYPE", "Au", "Ag", "Cu"],
            &["", "", "method", "ICP", "ICP", "FA"],
            &["", "", "unit", "ppm", "ppm", "ppm"],
            &["S1", "A", "", "1", "2", "3"],
            &["S2", "A", "", "4", "5", "6"],
        ]);

        assert!(outcome.errors.is_empty(), "{:?}", outcome.errors);
        let b = &outcome.bulk;
        assert_eq!(b.metadata_types.len(), 2);
        assert_eq!(b.metadata_sets.len(), 2);

        let au_s1 = &b.results[0];
        let ag_s1 = &b.results[1];
        let cu_s1 = &b.results[2];
        let au_s2 = &b.results[3];
        assert_eq!(au_s1.metadata_set, au_s2.metadata_set);
        assert_eq!(au_s1.metadata_set, ag_s1.metadata_set);
        assert_ne!(au_s1.metadata_set, cu_s1.metadata_set);
        assert_eq!(
            b.metadata_pairs(cu_s1.metadata_set),
            vec![("method", "FA"), ("unit", "ppm")]
        );
    }

    #[test]
    fn test_blank_metadata_value_is_omitted() {
        let outcome = bulk(&[
            &["SAMPLE", "METADATA_TYPE", "Au", "Ag"],
            &["", "method", "ICP", ""],
            &["S1", "", "1", "2"],
        ]);

        let b = &outcome.bulk;
        assert_eq!(b.metadata_pairs(b.results[0].metadata_set), vec![("method", "ICP")]);
        assert!(b.metadata_set(b.results[1].metadata_set).unwrap().is_empty());
    }

    #[test]
    fn test_repeated_path_reuses_subsample() {
        let outcome = bulk(&[
            &["SAMPLE", "SUBSAMPLE", "SUBSUBSAMPLE", "METADATA_TYPE", "Au", "Ag"],
            &["S1", "A", "x", "", "1", ""],
            &["S1", "A", "y", "", "2", ""],
            &["S1", "A", "x", "", "", "3"],
        ]);

        assert!(outcome.errors.is_empty(), "{:?}", outcome.errors);
        let b = &outcome.bulk;
        // S1, S1/A, S1/A/x, S1/A/y
        assert_eq!(b.subsamples.len(), 4);
        assert_eq!(b.results[0].subsample, b.results[2].subsample);
        assert_ne!(b.results[0].subsample, b.results[1].subsample);
        assert_eq!(b.subsample_path(b.results[2].subsample), vec!["S1", "A", "x"]);
    }

    #[test]
    fn test_repeated_result_cell_is_rejected() {
        let outcome = bulk(&[
            &["SAMPLE", "SUBSAMPLE", "METADATA_TYPE", "Au", "Ag"],
            &["S1", "A", "", "1", ""],
            &["S1", "A", "", "2", "3"],
        ]);

        assert_eq!(outcome.errors.len(), 1, "{:?}", outcome.errors);
        match &outcome.errors[0] {
            DatasetError::RowValidation { position, reason } => {
                assert_eq!(position.to_string(), "BULK.xlsx::BULK1 row 3, column D");
                assert!(reason.contains("S1/A"));
                assert!(reason.contains("first at BULK.xlsx::BULK1 row 2, column D"));
            }
            other => panic!("Expected RowValidation, got {other:?}"),
        }

        // the first value is kept, and the new Ag value on the same row is fine
        let values: Vec<&str> = outcome.bulk.results.iter().map(|r| r.value.as_str()).collect();
        assert_eq!(values, vec!["1", "3"]);
    }

    #[test]
    fn test_parent_always_precedes_child() {
        let outcome = bulk(&[
            &["SAMPLE", "SUBSAMPLE", "SUBSUBSAMPLE", "METADATA_TYPE", "Au"],
            &["S1", "A", "x", "", "1"],
            &["S2", "B", "", "", "2"],
        ]);

        for (idx, node) in outcome.bulk.subsamples.iter().enumerate() {
            if let Some(parent) = node.parent {
                assert!(parent.index() < idx);
            }
        }
    }

    #[test]
    fn test_shorter_contiguous_path_is_allowed() {
        let outcome = bulk(&[
            &["SAMPLE", "SUBSAMPLE", "SUBSUBSAMPLE", "METADATA_TYPE", "Au"],
            &["S1", "A", "", "", "1"],
        ]);

        assert!(outcome.errors.is_empty());
        let b = &outcome.bulk;
        assert_eq!(b.subsample_path(b.results[0].subsample), vec!["S1", "A"]);
    }

    #[test]
    fn test_broken_hierarchy_chain() {
        let outcome = bulk(&[
            &["SAMPLE", "SUBSAMPLE", "SUBSUBSAMPLE", "METADATA_TYPE", "Au"],
            &["S1", "", "x", "", "1"],
        ]);

        assert_eq!(outcome.errors.len(), 1);
        match &outcome.errors[0] {
            DatasetError::BrokenHierarchyChain { position } => {
                assert_eq!(position.to_string(), "BULK.xlsx::BULK1 row 2, column B");
            }
            other => panic!("Expected BrokenHierarchyChain, got {other:?}"),
        }
        assert!(outcome.bulk.results.is_empty());
    }

    #[test]
    fn test_sample_missing_breaks_chain() {
        let outcome = bulk(&[
            &["SAMPLE", "SUBSAMPLE", "METADATA_TYPE", "Au"],
            &["", "A", "", "1"],
        ]);

        assert!(matches!(
            outcome.errors[0],
            DatasetError::BrokenHierarchyChain { .. }
        ));
    }

    #[test]
    fn test_metadata_after_data() {
        let outcome = bulk(&[
            &["SAMPLE", "METADATA_TYPE", "Au"],
            &["", "method", "ICP"],
            &["S1", "", "1"],
            &["", "unit", "ppm"],
            &["S2", "", "2"],
        ]);

        assert_eq!(outcome.errors.len(), 1);
        match &outcome.errors[0] {
            DatasetError::MetadataAfterData {
                position,
                metadata_type,
                first_data_row,
            } => {
                assert_eq!(position.row, Some(4));
                assert_eq!(metadata_type, "unit");
                assert_eq!(*first_data_row, 3);
            }
            other => panic!("Expected MetadataAfterData, got {other:?}"),
        }
        // the late metadata row is ignored; both data rows still produce results
        assert_eq!(outcome.bulk.results.len(), 2);
    }

    #[test]
    fn test_duplicate_result_type_in_header() {
        let outcome = bulk(&[
            &["SAMPLE", "METADATA_TYPE", "Au", "Au"],
            &["S1", "", "1", "2"],
        ]);

        assert_eq!(outcome.errors.len(), 1);
        match &outcome.errors[0] {
            DatasetError::DuplicateResultType {
                position,
                name,
                first,
            } => {
                assert_eq!(name, "Au");
                assert_eq!(position.column, Some(crate::error::Column::Index(4)));
                assert_eq!(first.column, Some(crate::error::Column::Index(3)));
            }
            other => panic!("Expected DuplicateResultType, got {other:?}"),
        }
        assert_eq!(outcome.bulk.result_types.len(), 1);
        assert_eq!(outcome.bulk.results.len(), 1);
    }

    #[test]
    fn test_duplicate_result_type_across_sheets() {
        let first = grid(
            "BULK.xlsx",
            "BULK1",
            &[&["SAMPLE", "METADATA_TYPE", "Au"], &["S1", "", "1"]],
        );
        let second = grid(
            "BULK.xlsx",
            "BULK2",
            &[&["SAMPLE", "METADATA_TYPE", "Au", "Cu"], &["S1", "", "1", "2"]],
        );
        let outcome = normalize([&first, &second]);

        assert_eq!(outcome.errors.len(), 1);
        assert!(matches!(
            outcome.errors[0],
            DatasetError::DuplicateResultType { .. }
        ));
        // S1 is shared by both sheets
        assert_eq!(outcome.bulk.subsamples.len(), 1);
        assert_eq!(outcome.bulk.results.len(), 2);
    }

    #[test]
    fn test_metadata_types_are_dataset_scoped() {
        let first = grid(
            "BULK.xlsx",
            "BULK1",
            &[
                &["SAMPLE", "METADATA_TYPE", "Au"],
                &["", "method", "ICP"],
                &["S1", "", "1"],
            ],
        );
        let second = grid(
            "BULK.xlsx",
            "BULK2",
            &[
                &["SAMPLE", "METADATA_TYPE", "Cu"],
                &["", "method", "FA"],
                &["S1", "", "1"],
            ],
        );
        let outcome = normalize([&first, &second]);

        assert!(outcome.errors.is_empty());
        assert_eq!(outcome.bulk.metadata_types.len(), 1);
        assert_eq!(outcome.bulk.metadata_sets.len(), 2);
    }

    #[test]
    fn test_header_must_start_with_sample() {
        let outcome = bulk(&[&["STATION", "METADATA_TYPE", "Au"], &["S1", "", "1"]]);

        assert_eq!(outcome.errors.len(), 1);
        assert!(outcome.errors[0].to_string().contains("column A"));
        assert!(outcome.bulk.results.is_empty());
    }

    #[test]
    fn test_header_requires_metadata_type_column() {
        let outcome = bulk(&[&["SAMPLE", "SUBSAMPLE", "Au"], &["S1", "A", "1"]]);

        assert_eq!(outcome.errors.len(), 1);
        assert!(outcome.errors[0].to_string().contains("METADATA_TYPE"));
    }

    #[test]
    fn test_duplicate_metadata_type_row() {
        let outcome = bulk(&[
            &["SAMPLE", "METADATA_TYPE", "Au"],
            &["", "method", "ICP"],
            &["", "method", "FA"],
            &["S1", "", "1"],
        ]);

        assert_eq!(outcome.errors.len(), 1);
        assert!(outcome.errors[0].to_string().contains("first declared on row 2"));
        assert_eq!(
            outcome.bulk.metadata_pairs(outcome.bulk.results[0].metadata_set),
            vec![("method", "ICP")]
        );
    }

    #[test]
    fn test_metadata_type_on_data_row() {
        let outcome = bulk(&[&["SAMPLE", "METADATA_TYPE", "Au"], &["S1", "method", "1"]]);

        assert_eq!(outcome.errors.len(), 1);
        assert!(matches!(outcome.errors[0], DatasetError::RowValidation { .. }));
    }

    #[test]
    fn test_values_without_sample_or_metadata_type() {
        let outcome = bulk(&[&["SAMPLE", "METADATA_TYPE", "Au"], &["", "", "1"]]);

        assert_eq!(outcome.errors.len(), 1);
        assert!(outcome.errors[0].to_string().contains("row 2"));
    }

    #[test]
    fn test_blank_rows_are_padding() {
        let outcome = bulk(&[
            &["SAMPLE", "METADATA_TYPE", "Au"],
            &["", "", ""],
            &["", "method", "ICP"],
            &["", "", ""],
            &["S1", "", "1"],
        ]);

        assert!(outcome.errors.is_empty(), "{:?}", outcome.errors);
        assert_eq!(outcome.bulk.results.len(), 1);
    }
}
