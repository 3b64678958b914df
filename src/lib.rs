pub mod bulk;
pub mod config;
pub mod dataset;
pub mod error;
pub mod models;
pub mod parsers;
pub mod schema;
pub mod utils;
pub mod validator;
pub mod workbook;

pub use bulk::{AnalysisBulk, BulkNormalizer};
pub use config::{Config, DatasetOptions};
pub use dataset::{Dataset, DatasetStats, ResultRecord};
pub use error::{DatasetError, Position, ValidationReport};
