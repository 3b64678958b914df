//! Dataset aggregation
//!
//! A dataset is a directory named in reverse domain notation
//! (`ca.gc.nrcan.geochem`) holding fixed-name workbooks:
//!
//! - `DOCUMENT.xlsx`, sheet `DOCUMENT`
//! - `SURVEYS.xlsx`, sheet `SURVEYS`
//! - `SAMPLES.xlsx` and/or `SAMPLES-<suffix>.xlsx`, sheet `SAMPLES`
//! - optionally `BULK.xlsx` and/or `BULK-<suffix>.xlsx`, every sheet a BULK sheet
//!
//! Every stage is parsed at most once per [`Dataset`] and cached for the
//! lifetime of the instance. Accessors return `Err` only for fatal errors;
//! row and structure problems are collected and available from
//! [`Dataset::errors`] and [`Dataset::validate`].

use regex::Regex;
use serde::Serialize;
use std::cell::OnceCell;
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use tracing::{debug, info, instrument, warn};

use crate::bulk::{AnalysisBulk, BulkNormalizer, BulkOutcome};
use crate::config::DatasetOptions;
use crate::error::{DatasetError, Position, ValidationReport};
use crate::models::{Document, Sample, Survey};
use crate::parsers::{
    parse_sheet, DocumentParser, RowParser, SampleParser, SheetOutcome, SurveyParser,
};
use crate::schema::WorkbookKind;
use crate::validator::{self, CrossReferences, DatasetContext};
use crate::workbook;

const DATASET_NAME_PATTERN: &str =
    r"^(?:[a-z0-9](?:[a-z0-9-]{0,61}[a-z0-9])?\.)+[a-z0-9][a-z0-9-]{0,61}[a-z0-9]$";

/// Whether `name` is a reverse domain name such as `ca.gc.nrcan.geochem`
///
/// ```
/// use geochem_dataset::dataset::is_valid_dataset_name;
///
/// assert!(is_valid_dataset_name("ca.gc.nrcan.geochem"));
/// assert!(!is_valid_dataset_name("geochem"));
/// assert!(!is_valid_dataset_name("Ca.Gc.Nrcan"));
/// ```
pub fn is_valid_dataset_name(name: &str) -> bool {
    static DATASET_NAME: OnceLock<Option<Regex>> = OnceLock::new();
    DATASET_NAME
        .get_or_init(|| Regex::new(DATASET_NAME_PATTERN).ok())
        .as_ref()
        .is_some_and(|re| re.is_match(name))
}

/// Workbook paths of one dataset, split files in file-name order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DatasetFiles {
    pub documents: PathBuf,
    pub surveys: PathBuf,
    pub samples: Vec<PathBuf>,
    pub bulk: Vec<PathBuf>,
}

impl DatasetFiles {
    /// Find the workbooks of each kind in `dir`
    pub fn discover(dir: &Path) -> Result<Self, DatasetError> {
        let entries = fs::read_dir(dir).map_err(|_| DatasetError::DatasetNotFound {
            path: dir.to_path_buf(),
        })?;

        let mut names: Vec<String> = entries
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.path().is_file())
            .map(|entry| entry.file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();

        let split = |kind: WorkbookKind| -> Vec<PathBuf> {
            let whole = format!("{}.xlsx", kind.file_stem());
            let prefix = format!("{}-", kind.file_stem());
            names
                .iter()
                .filter(|n| {
                    **n == whole
                        || (kind.allows_split_files()
                            && n.starts_with(&prefix)
                            && n.ends_with(".xlsx")
                            && n.len() > prefix.len() + ".xlsx".len())
                })
                .map(|n| dir.join(n))
                .collect()
        };

        let mut samples = split(WorkbookKind::Samples);
        if samples.is_empty() {
            // Reading it reports the missing workbook
            samples.push(dir.join(format!("{}.xlsx", WorkbookKind::Samples.file_stem())));
        }

        Ok(Self {
            documents: dir.join(format!("{}.xlsx", WorkbookKind::Documents.file_stem())),
            surveys: dir.join(format!("{}.xlsx", WorkbookKind::Surveys.file_stem())),
            samples,
            bulk: split(WorkbookKind::Bulk),
        })
    }

    /// File names of the workbooks that exist on disk
    pub fn present(&self) -> BTreeSet<String> {
        std::iter::once(&self.documents)
            .chain(std::iter::once(&self.surveys))
            .chain(self.samples.iter())
            .chain(self.bulk.iter())
            .filter(|p| p.is_file())
            .filter_map(|p| p.file_name())
            .map(|n| n.to_string_lossy().into_owned())
            .collect()
    }
}

/// One result joined with everything needed to interpret it
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResultRecord<'a> {
    /// `None` when the BULK sample name does not resolve to one SAMPLES row
    pub sample: Option<&'a Sample>,
    pub subsample_path: Vec<&'a str>,
    pub result_type: &'a str,
    pub metadata: Vec<(&'a str, &'a str)>,
    pub value: &'a str,
    pub origin: &'a Position,
    /// Excel reference of the value, e.g. `D4`
    pub cell: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DatasetStats {
    pub documents: usize,
    pub surveys: usize,
    pub samples: usize,
    pub subsamples: usize,
    pub result_types: usize,
    pub metadata_types: usize,
    pub metadata_sets: usize,
    pub results: usize,
    pub errors: usize,
}

type Stage<T> = OnceCell<Result<SheetOutcome<T>, DatasetError>>;

pub struct Dataset {
    path: PathBuf,
    name: String,
    options: DatasetOptions,
    files: DatasetFiles,
    documents: Stage<Document>,
    surveys: Stage<Survey>,
    samples: Stage<Sample>,
    bulk: OnceCell<Result<BulkOutcome, DatasetError>>,
    links: OnceCell<Result<CrossReferences, DatasetError>>,
    origins: OnceCell<Result<Vec<DatasetError>, DatasetError>>,
}

impl std::fmt::Debug for Dataset {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dataset")
            .field("path", &self.path)
            .field("name", &self.name)
            .field("options", &self.options)
            .field("files", &self.files)
            .finish_non_exhaustive()
    }
}

impl Dataset {
    /// Check the directory and its name, and locate the workbooks
    ///
    /// No workbook is read until one of the accessors needs it.
    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn open(path: impl AsRef<Path>, options: DatasetOptions) -> Result<Self, DatasetError> {
        let path = path.as_ref();
        if !path.is_dir() {
            return Err(DatasetError::DatasetNotFound {
                path: path.to_path_buf(),
            });
        }

        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        if !is_valid_dataset_name(&name) {
            return Err(DatasetError::InvalidDatasetName { name });
        }

        let files = DatasetFiles::discover(path)?;
        debug!("Discovered workbooks for {}: {:?}", name, files);
        if files.bulk.is_empty() {
            warn!("Dataset {} has no BULK workbook; it has no results", name);
        }
        info!("Opened dataset {}", name);

        Ok(Self {
            path: path.to_path_buf(),
            name,
            options,
            files,
            documents: OnceCell::new(),
            surveys: OnceCell::new(),
            samples: OnceCell::new(),
            bulk: OnceCell::new(),
            links: OnceCell::new(),
            origins: OnceCell::new(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn files(&self) -> &DatasetFiles {
        &self.files
    }

    fn parse_flat<P: RowParser>(
        &self,
        paths: &[PathBuf],
        parser: &P,
    ) -> Result<SheetOutcome<P::Record>, DatasetError> {
        let sheet = parser.schema().sheet_name.unwrap_or(parser.schema().workbook_name);
        let mut outcome = SheetOutcome::default();
        for path in paths {
            let grid = workbook::read_sheet(path, sheet)?;
            outcome.merge(parse_sheet(&grid, parser, &self.options));
        }
        Ok(outcome)
    }

    fn document_stage(&self) -> Result<&SheetOutcome<Document>, DatasetError> {
        self.documents
            .get_or_init(|| {
                self.parse_flat(std::slice::from_ref(&self.files.documents), &DocumentParser)
            })
            .as_ref()
            .map_err(|e| e.clone())
    }

    fn survey_stage(&self) -> Result<&SheetOutcome<Survey>, DatasetError> {
        self.surveys
            .get_or_init(|| {
                self.parse_flat(std::slice::from_ref(&self.files.surveys), &SurveyParser)
            })
            .as_ref()
            .map_err(|e| e.clone())
    }

    fn sample_stage(&self) -> Result<&SheetOutcome<Sample>, DatasetError> {
        self.samples
            .get_or_init(|| self.parse_flat(&self.files.samples, &SampleParser))
            .as_ref()
            .map_err(|e| e.clone())
    }

    fn bulk_stage(&self) -> Result<&BulkOutcome, DatasetError> {
        self.bulk
            .get_or_init(|| {
                let mut normalizer = BulkNormalizer::new();
                for path in &self.files.bulk {
                    for grid in workbook::read_all_sheets(path)? {
                        normalizer.normalize_sheet(&grid);
                    }
                }
                Ok(normalizer.finish())
            })
            .as_ref()
            .map_err(|e| e.clone())
    }

    /// Sample and subsample links; needs surveys, samples and BULK only
    fn link_stage(&self) -> Result<&CrossReferences, DatasetError> {
        self.links
            .get_or_init(|| {
                Ok(validator::resolve_links(
                    &self.survey_stage()?.records,
                    &self.sample_stage()?.records,
                    &self.bulk_stage()?.bulk,
                ))
            })
            .as_ref()
            .map_err(|e| e.clone())
    }

    fn origin_stage(&self) -> Result<&[DatasetError], DatasetError> {
        self.origins
            .get_or_init(|| {
                let context = DatasetContext {
                    name: self.name.clone(),
                    workbooks: self.files.present(),
                };
                Ok(validator::check_origins(
                    &context,
                    &self.document_stage()?.records,
                    &self.survey_stage()?.records,
                ))
            })
            .as_ref()
            .map(Vec::as_slice)
            .map_err(|e| e.clone())
    }

    /// Valid rows of the DOCUMENT sheet
    pub fn documents(&self) -> Result<&[Document], DatasetError> {
        Ok(&self.document_stage()?.records)
    }

    pub fn surveys(&self) -> Result<&[Survey], DatasetError> {
        Ok(&self.survey_stage()?.records)
    }

    /// Valid rows of every SAMPLES workbook, in file order
    pub fn samples(&self) -> Result<&[Sample], DatasetError> {
        Ok(&self.sample_stage()?.records)
    }

    /// The normalized BULK content; empty when the dataset has no BULK workbook
    pub fn analysis_bulk(&self) -> Result<&AnalysisBulk, DatasetError> {
        Ok(&self.bulk_stage()?.bulk)
    }

    /// Every result with its sample, subsample path, result type and metadata
    ///
    /// Reads SURVEYS, SAMPLES and BULK; DOCUMENT is not needed.
    pub fn analysis_bulk_results(
        &self,
    ) -> Result<impl Iterator<Item = ResultRecord<'_>> + '_, DatasetError> {
        let bulk = self.analysis_bulk()?;
        let samples = self.samples()?;
        let links = &self.link_stage()?.links;

        Ok(bulk.results.iter().map(move |result| ResultRecord {
            sample: links
                .subsample_samples
                .get(result.subsample.index())
                .copied()
                .flatten()
                .and_then(|id| samples.get(id.index())),
            subsample_path: bulk.subsample_path(result.subsample),
            result_type: bulk
                .result_type(result.result_type)
                .map(|t| t.name.as_str())
                .unwrap_or_default(),
            metadata: bulk.metadata_pairs(result.metadata_set),
            value: &result.value,
            origin: &result.origin,
            cell: result.origin.cell_ref(),
        }))
    }

    pub fn survey_by_title(&self, title: &str) -> Result<Option<&Survey>, DatasetError> {
        Ok(self.surveys()?.iter().find(|s| s.title == title))
    }

    /// Every sample with the given name; names are only unique per survey, station and earthmat
    pub fn sample_by_name(&self, name: &str) -> Result<Vec<&Sample>, DatasetError> {
        Ok(self.samples()?.iter().filter(|s| s.name == name).collect())
    }

    /// Every error found in the dataset, fatal ones included, in stage order
    ///
    /// Forces every stage to be parsed.
    pub fn errors(&self) -> Vec<DatasetError> {
        let mut errors = Vec::new();

        match self.document_stage() {
            Ok(outcome) => errors.extend(outcome.errors.iter().cloned()),
            Err(e) => errors.push(e),
        }
        match self.survey_stage() {
            Ok(outcome) => errors.extend(outcome.errors.iter().cloned()),
            Err(e) => errors.push(e),
        }
        match self.sample_stage() {
            Ok(outcome) => errors.extend(outcome.errors.iter().cloned()),
            Err(e) => errors.push(e),
        }
        match self.bulk_stage() {
            Ok(outcome) => errors.extend(outcome.errors.iter().cloned()),
            Err(e) => errors.push(e),
        }
        // A fatal stage error was already reported above
        if let Ok(origin_errors) = self.origin_stage() {
            errors.extend(origin_errors.iter().cloned());
        }
        if let Ok(links) = self.link_stage() {
            errors.extend(links.errors.iter().cloned());
        }

        errors
    }

    pub fn is_valid(&self) -> bool {
        self.errors().is_empty()
    }

    /// Fail-fast view: `Err` carries the complete error list
    pub fn validate(&self) -> Result<(), ValidationReport> {
        let errors = self.errors();
        if errors.is_empty() {
            info!("Dataset {} is valid", self.name);
            Ok(())
        } else {
            warn!("Dataset {} has {} errors", self.name, errors.len());
            Err(ValidationReport {
                dataset: self.name.clone(),
                errors,
            })
        }
    }

    pub fn stats(&self) -> Result<DatasetStats, DatasetError> {
        let bulk = self.analysis_bulk()?;
        Ok(DatasetStats {
            documents: self.documents()?.len(),
            surveys: self.surveys()?.len(),
            samples: self.samples()?.len(),
            subsamples: bulk.subsamples.len(),
            result_types: bulk.result_types.len(),
            metadata_types: bulk.metadata_types.len(),
            metadata_sets: bulk.metadata_sets.len(),
            results: bulk.results.len(),
            errors: self.errors().len(),
        })
    }
}
