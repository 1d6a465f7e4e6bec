use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::{PipelineError, Result};
use crate::loader::LoadOptions;

pub const DATA_PATH_ENV: &str = "FABDASH_DATA_PATH";
pub const RECENT_ROWS_ENV: &str = "FABDASH_RECENT_ROWS";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DashboardConfig {
    pub data_path: PathBuf,
    /// Size of the recent-readings window.
    pub recent_rows: usize,
    pub delimiter: char,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            data_path: PathBuf::from("data.csv"),
            recent_rows: 1000,
            delimiter: ',',
        }
    }
}

impl DashboardConfig {
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)
            .map_err(|err| PipelineError::Config(format!("failed to parse config: {err}")))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|err| PipelineError::io(path, err))?;
        Self::from_toml_str(&content)
    }

    /// Applies `FABDASH_*` overrides from the process environment.
    pub fn apply_env(self) -> Result<Self> {
        self.apply_env_with(|key| std::env::var(key).ok())
    }

    pub fn apply_env_with(mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        if let Some(path) = lookup(DATA_PATH_ENV).filter(|v| !v.trim().is_empty()) {
            self.data_path = PathBuf::from(path.trim());
        }
        if let Some(rows) = lookup(RECENT_ROWS_ENV) {
            self.recent_rows = rows.trim().parse().map_err(|err| {
                PipelineError::Config(format!("{RECENT_ROWS_ENV} '{rows}' is not a row count: {err}"))
            })?;
        }
        self.validate()?;
        Ok(self)
    }

    pub fn load_options(&self) -> LoadOptions {
        LoadOptions {
            delimiter: self.delimiter as u8,
        }
    }

    fn validate(&self) -> Result<()> {
        if !self.delimiter.is_ascii() || self.delimiter == '"' || self.delimiter == '\n' {
            return Err(PipelineError::Config(format!(
                "delimiter {:?} must be a single ASCII character other than a quote or newline",
                self.delimiter
            )));
        }
        Ok(())
    }
}
