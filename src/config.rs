use std::env;
use std::path::PathBuf;

/// Per-dataset parsing options
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DatasetOptions {
    /// Keep unexpected columns of flat sheets in each record's `extra` map
    /// instead of rejecting the sheet
    pub extra_columns_ok: bool,
}

/// Process configuration for the command-line front door
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Config {
    pub datasets_dir: Option<PathBuf>,
    pub extra_columns_ok: bool,
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

impl Config {
    pub fn from_env() -> Self {
        Config {
            datasets_dir: env::var("GEOCHEM_DATASETS_DIR")
                .ok()
                .filter(|s| !s.trim().is_empty())
                .map(PathBuf::from),
            extra_columns_ok: env::var("GEOCHEM_EXTRA_COLUMNS_OK")
                .ok()
                .and_then(|v| parse_bool(&v))
                .unwrap_or(false),
        }
    }

    pub fn dataset_options(&self) -> DatasetOptions {
        DatasetOptions {
            extra_columns_ok: self.extra_columns_ok,
        }
    }
}
