use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::types::{CostMatrix, EstimationProcedure};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluationConfig {
    pub task: TaskSection,
    pub data: DataSection,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskSection {
    /// Class attribute of the dataset.
    pub target: String,
    /// Nominal class labels in class order. Inferred from the dataset when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub class_values: Option<Vec<String>>,
    #[serde(default)]
    pub estimation_procedure: EstimationProcedure,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cost_matrix: Option<Vec<Vec<f64>>>,
}

/// Table locations: local paths or `http(s)://` URLs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataSection {
    pub dataset: String,
    pub splits: String,
    pub predictions: String,
}

impl EvaluationConfig {
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        serde_yaml::from_str(yaml).context("Invalid evaluation config")
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {:?}", path))?;
        let mut config = Self::from_yaml_str(&content)
            .with_context(|| format!("Failed to parse config {:?}", path))?;
        config.data.resolve_relative_to(path.parent().unwrap_or_else(|| Path::new(".")));
        Ok(config)
    }

    pub fn cost_matrix(&self) -> Result<Option<CostMatrix>> {
        match &self.task.cost_matrix {
            Some(rows) => Ok(Some(CostMatrix::new(rows.clone())?)),
            None => Ok(None),
        }
    }
}

impl DataSection {
    /// Relative paths in a config file are relative to the file itself.
    fn resolve_relative_to(&mut self, base: &Path) {
        for location in [&mut self.dataset, &mut self.splits, &mut self.predictions] {
            if is_url(location) || Path::new(location.as_str()).is_absolute() {
                continue;
            }
            *location = base.join(location.as_str()).to_string_lossy().into_owned();
        }
    }
}

pub(crate) fn is_url(location: &str) -> bool {
    location.starts_with("http://") || location.starts_with("https://")
}
