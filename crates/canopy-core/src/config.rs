use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::views::Statistic;

/// Where the dataset's files live and which years to load.
///
/// File-name patterns carry a `{year}` placeholder.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatasetConfig {
    pub years: Vec<u16>,
    pub features_mean_pattern: String,
    pub features_std_pattern: String,
    pub trees_file: String,
    pub plots_file: String,
    pub ndvi_patterns_file: String,
}

impl Default for DatasetConfig {
    fn default() -> Self {
        Self {
            years: (2017..=2022).collect(),
            features_mean_pattern: "features_{year}_mean.csv".into(),
            features_std_pattern: "features_{year}_stdD.csv".into(),
            trees_file: "trees_finland_and_sweden_parsed.csv".into(),
            plots_file: "plots_finland_and_sweden.csv".into(),
            ndvi_patterns_file: "preprocessed_ndvi_patterns.json".into(),
        }
    }
}

impl DatasetConfig {
    pub fn from_json_str(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    pub fn features_file(&self, year: u16, statistic: Statistic) -> String {
        let pattern = match statistic {
            Statistic::Mean => &self.features_mean_pattern,
            Statistic::StdDev => &self.features_std_pattern,
        };
        pattern.replace("{year}", &year.to_string())
    }

    pub fn features_path(&self, data_dir: &Path, year: u16, statistic: Statistic) -> PathBuf {
        data_dir.join(self.features_file(year, statistic))
    }

    pub fn trees_path(&self, data_dir: &Path) -> PathBuf {
        data_dir.join(&self.trees_file)
    }

    pub fn plots_path(&self, data_dir: &Path) -> PathBuf {
        data_dir.join(&self.plots_file)
    }

    pub fn ndvi_patterns_path(&self, data_dir: &Path) -> PathBuf {
        data_dir.join(&self.ndvi_patterns_file)
    }
}
