// Cross-reference checks run once every sheet of a dataset has been parsed.
//
// Nothing here fails fast: every dangling reference becomes a
// `ReferentialIntegrity` error and the links that did resolve are kept.

use std::collections::{BTreeSet, HashMap};
use tracing::{debug, info, instrument};

use crate::bulk::AnalysisBulk;
use crate::error::DatasetError;
use crate::models::{Document, RowOrigin, Sample, SampleId, Survey, SurveyId};

/// The dataset a set of records is checked against
#[derive(Debug, Clone, Default)]
pub struct DatasetContext {
    pub name: String,
    /// File names of the workbooks found in the dataset directory
    pub workbooks: BTreeSet<String>,
}

/// Resolved references, indexed like the record slices they describe
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Links {
    /// Survey of each sample, by `SURVEY_TITLE`
    pub sample_surveys: Vec<Option<SurveyId>>,
    /// Sample each subsample node belongs to, by the root node's name
    pub subsample_samples: Vec<Option<SampleId>>,
}

#[derive(Debug, Clone, Default)]
pub struct CrossReferences {
    pub links: Links,
    pub errors: Vec<DatasetError>,
}

fn check_origin(
    context: &DatasetContext,
    origin: &RowOrigin,
    what: &str,
    errors: &mut Vec<DatasetError>,
) {
    if !context.workbooks.contains(&origin.workbook) {
        errors.push(DatasetError::ReferentialIntegrity {
            position: origin.position(),
            reason: format!(
                "{what} does not belong to a workbook of dataset {}",
                context.name
            ),
        });
    }
}

/// Every document and survey must come from a workbook of this dataset
pub fn check_origins(
    context: &DatasetContext,
    documents: &[Document],
    surveys: &[Survey],
) -> Vec<DatasetError> {
    let mut errors = Vec::new();
    for document in documents {
        check_origin(context, &document.origin, "document", &mut errors);
    }
    for survey in surveys {
        check_origin(context, &survey.origin, "survey", &mut errors);
    }
    for e in &errors {
        debug!("{}", e);
    }
    errors
}

/// Run every cross-reference check over fully parsed records
#[instrument(skip_all, fields(dataset = %context.name))]
pub fn validate(
    context: &DatasetContext,
    documents: &[Document],
    surveys: &[Survey],
    samples: &[Sample],
    bulk: &AnalysisBulk,
) -> CrossReferences {
    let mut errors = check_origins(context, documents, surveys);
    let mut references = resolve_links(surveys, samples, bulk);
    errors.append(&mut references.errors);

    info!(
        "Cross-reference check of {} finished with {} errors",
        context.name,
        errors.len()
    );
    references.errors = errors;
    references
}

/// Resolve sample -> survey and subsample -> sample, and check sample
/// uniqueness across split SAMPLES files
#[instrument(skip_all)]
pub fn resolve_links(
    surveys: &[Survey],
    samples: &[Sample],
    bulk: &AnalysisBulk,
) -> CrossReferences {
    let mut errors = Vec::new();

    // Sample -> Survey
    let survey_index: HashMap<&str, SurveyId> = surveys
        .iter()
        .enumerate()
        .map(|(idx, s)| (s.title.as_str(), SurveyId(idx)))
        .collect();

    let sample_surveys: Vec<Option<SurveyId>> = samples
        .iter()
        .map(|sample| {
            let survey = survey_index.get(sample.survey_title.as_str()).copied();
            if survey.is_none() {
                errors.push(DatasetError::ReferentialIntegrity {
                    position: sample.origin.position().at_column("SURVEY_TITLE"),
                    reason: format!("survey {:?} is not declared in SURVEYS", sample.survey_title),
                });
            }
            survey
        })
        .collect();

    // Sample uniqueness once split SAMPLES files are merged
    let mut seen: HashMap<(&str, &str, &str, &str), &RowOrigin> = HashMap::new();
    for sample in samples {
        let key = (
            sample.survey_title.as_str(),
            sample.station.as_str(),
            sample.earthmat.as_str(),
            sample.name.as_str(),
        );
        match seen.get(&key) {
            Some(first) if first.workbook != sample.origin.workbook => {
                errors.push(DatasetError::ReferentialIntegrity {
                    position: sample.origin.position().at_column("SAMPLE"),
                    reason: format!(
                        "sample {:?} is already declared at {}",
                        sample.name,
                        first.position()
                    ),
                });
            }
            Some(_) => {}
            None => {
                seen.insert(key, &sample.origin);
            }
        }
    }

    // Subsample -> Sample
    let mut sample_names: HashMap<&str, Vec<SampleId>> = HashMap::new();
    for (idx, sample) in samples.iter().enumerate() {
        sample_names
            .entry(sample.name.as_str())
            .or_default()
            .push(SampleId(idx));
    }

    let subsample_samples: Vec<Option<SampleId>> = bulk
        .subsamples
        .iter()
        .map(|node| {
            let candidates = sample_names
                .get(node.sample_name.as_str())
                .map(Vec::as_slice)
                .unwrap_or_default();

            // Only the root node reports, so one bad sample name is one error
            let report = node.parent.is_none();
            match candidates {
                [only] => Some(*only),
                [] => {
                    if report {
                        errors.push(DatasetError::ReferentialIntegrity {
                            position: node.origin.clone(),
                            reason: format!("sample {:?} is not declared in SAMPLES", node.sample_name),
                        });
                    }
                    None
                }
                _ => {
                    if report {
                        errors.push(DatasetError::ReferentialIntegrity {
                            position: node.origin.clone(),
                            reason: format!(
                                "sample name {:?} is ambiguous ({} SAMPLES rows)",
                                node.sample_name,
                                candidates.len()
                            ),
                        });
                    }
                    None
                }
            }
        })
        .collect();

    for e in &errors {
        debug!("{}", e);
    }
    debug!("Resolved links with {} errors", errors.len());

    CrossReferences {
        links: Links {
            sample_surveys,
            subsample_samples,
        },
        errors,
    }
}
