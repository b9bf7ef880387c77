use std::fmt;

use serde::{Deserialize, Serialize};
use tabled::Tabled;

/// Kind of benchmark task, decided from the shape of the dataset and prediction schemas.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskKind {
	Regression,
	Classification,
	LearningCurve,
}

impl TaskKind {
	/// Classification and learning-curve tasks both score probability vectors.
	pub fn is_classification(&self) -> bool {
		matches!(self, TaskKind::Classification | TaskKind::LearningCurve)
	}

	pub fn as_str(&self) -> &'static str {
		match self {
			TaskKind::Regression => "regression",
			TaskKind::Classification => "classification",
			TaskKind::LearningCurve => "learning_curve",
		}
	}
}

impl fmt::Display for TaskKind {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

/// Where a metric record applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "scope", rename_all = "snake_case")]
pub enum MetricScope {
	Global,
	Fold {
		repeat: usize,
		fold: usize,
	},
	/// Learning-curve partition; `sample_size` is the number of rows the sample was scored on.
	Sample {
		repeat: usize,
		fold: usize,
		sample: usize,
		sample_size: usize,
	},
}

impl MetricScope {
	pub fn is_global(&self) -> bool {
		matches!(self, MetricScope::Global)
	}
}

impl fmt::Display for MetricScope {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			MetricScope::Global => f.write_str("global"),
			MetricScope::Fold { repeat, fold } => write!(f, "r{repeat} f{fold}"),
			MetricScope::Sample { repeat, fold, sample, sample_size } => {
				write!(f, "r{repeat} f{fold} s{sample} (n={sample_size})")
			}
		}
	}
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricRecord {
	pub name: String,
	/// Fixed-precision decimal rendering of the score.
	pub value: String,
	/// Per-class breakdown, e.g. `[0.5,0.75]`.
	#[serde(skip_serializing_if = "Option::is_none", default)]
	pub array: Option<String>,
	#[serde(flatten)]
	pub scope: MetricScope,
}

impl MetricRecord {
	pub fn new(name: impl Into<String>, value: impl Into<String>, scope: MetricScope) -> Self {
		Self { name: name.into(), value: value.into(), array: None, scope }
	}

	pub fn with_array(mut self, array: impl Into<String>) -> Self {
		self.array = Some(array.into());
		self
	}

	pub fn numeric_value(&self) -> Option<f64> {
		self.value.parse().ok()
	}
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluationReport {
	pub task_kind: TaskKind,
	pub number_of_classes: usize,
	pub records: Vec<MetricRecord>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Tabled)]
struct RecordRow {
	scope: String,
	metric: String,
	value: String,
	per_class: String,
}

impl EvaluationReport {
	pub fn global(&self) -> impl Iterator<Item = &MetricRecord> {
		self.records.iter().filter(|r| r.scope.is_global())
	}

	pub fn find(&self, name: &str, scope: &MetricScope) -> Option<&MetricRecord> {
		self.records.iter().find(|r| r.name == name && &r.scope == scope)
	}

	/// Distinct non-global scopes, in first-seen order.
	pub fn partitions(&self) -> Vec<MetricScope> {
		let mut seen = Vec::new();
		for r in &self.records {
			if !r.scope.is_global() && !seen.contains(&r.scope) {
				seen.push(r.scope);
			}
		}
		seen
	}

	pub fn summary_table(&self) -> String {
		use tabled::Table;
		let rows: Vec<RecordRow> = self.records.iter().map(|r| RecordRow {
			scope: r.scope.to_string(),
			metric: r.name.clone(),
			value: r.value.clone(),
			per_class: truncate(r.array.clone().unwrap_or_default(), 48),
		}).collect();

		let table = Table::new(rows);
		let table_str = table.to_string();

		let summary_text = format!(
			"Task: {}  Classes: {}  Records: {}  Partitions: {}",
			self.task_kind,
			self.number_of_classes,
			self.records.len(),
			self.partitions().len()
		);

		format!("{}\n\n{}\n", table_str, summary_text)
	}
}

fn truncate(s: String, max_len: usize) -> String {
	if s.chars().count() <= max_len {
		return s;
	}
	let mut truncated = s.chars().take(max_len.saturating_sub(1)).collect::<String>();
	truncated.push('…');
	truncated
}
