use std::sync::Arc;

use predeval_types::EvaluationReport;

use crate::aggregator::EvaluationAggregator;
use crate::classifier::classify;
use crate::engine::MetricsEngine;
use crate::error::{EvalError, Result};
use crate::layout::PredictionLayout;
use crate::metrics::standard::StandardMetricsEngine;
use crate::table::Table;
use crate::types::{CostMatrix, Dataset, EstimationProcedure, SplitAssignment};

pub struct EvaluationBuilder {
	dataset: Option<Dataset>,
	target: Option<String>,
	splits: Option<SplitAssignment>,
	predictions: Option<Table>,
	procedure: EstimationProcedure,
	cost_matrix: Option<CostMatrix>,
	engine: Arc<dyn MetricsEngine>,
}

impl EvaluationBuilder {
	pub fn new() -> Self {
		Self {
			dataset: None,
			target: None,
			splits: None,
			predictions: None,
			procedure: EstimationProcedure::default(),
			cost_matrix: None,
			engine: Arc::new(StandardMetricsEngine),
		}
	}

	pub fn dataset(mut self, dataset: Dataset) -> Self {
		self.dataset = Some(dataset);
		self
	}

	/// Name of the class attribute.
	pub fn target(mut self, target: impl Into<String>) -> Self {
		self.target = Some(target.into());
		self
	}

	pub fn splits(mut self, splits: SplitAssignment) -> Self {
		self.splits = Some(splits);
		self
	}

	pub fn predictions(mut self, predictions: Table) -> Self {
		self.predictions = Some(predictions);
		self
	}

	pub fn estimation_procedure(mut self, procedure: EstimationProcedure) -> Self {
		self.procedure = procedure;
		self
	}

	pub fn cost_matrix(mut self, cost_matrix: Option<CostMatrix>) -> Self {
		self.cost_matrix = cost_matrix;
		self
	}

	pub fn engine(mut self, engine: Arc<dyn MetricsEngine>) -> Self {
		self.engine = engine;
		self
	}

	pub fn build(self) -> anyhow::Result<Evaluation> {
		Ok(Evaluation {
			dataset: self.dataset.ok_or_else(|| anyhow::anyhow!("dataset must be set"))?,
			target: self.target.ok_or_else(|| anyhow::anyhow!("target must be set"))?,
			splits: self.splits.ok_or_else(|| anyhow::anyhow!("splits must be set"))?,
			predictions: self.predictions.ok_or_else(|| anyhow::anyhow!("predictions must be set"))?,
			procedure: self.procedure,
			cost_matrix: self.cost_matrix,
			engine: self.engine,
		})
	}
}

impl Default for EvaluationBuilder {
	fn default() -> Self {
		Self::new()
	}
}

/// One submission against one task: dataset, split assignment and predictions.
pub struct Evaluation {
	dataset: Dataset,
	target: String,
	splits: SplitAssignment,
	predictions: Table,
	procedure: EstimationProcedure,
	cost_matrix: Option<CostMatrix>,
	engine: Arc<dyn MetricsEngine>,
}

impl Evaluation {
	pub fn builder() -> EvaluationBuilder {
		EvaluationBuilder::new()
	}

	/// Runs the whole evaluation. Either every metric is returned or none is.
	pub fn run(&self) -> Result<EvaluationReport> {
		let task_kind = classify(&self.dataset, &self.target, &self.predictions.columns)?;
		let (_, class_attribute) = self.dataset.class_attribute(&self.target)?;
		let layout = PredictionLayout::resolve(&self.predictions.columns, task_kind, class_attribute.values())?;
		log::info!(
			"evaluating {} predictions as {} task against {} rows",
			self.predictions.len(),
			task_kind,
			self.dataset.num_instances()
		);

		let mut aggregator = EvaluationAggregator::new(
			&self.dataset,
			&self.target,
			task_kind,
			&self.splits,
			self.procedure,
			self.cost_matrix.clone(),
		)?;

		let records = layout.records(&self.predictions)?;
		// reject out-of-range rows before anything is accumulated
		if let Some(bad) = records.iter().find(|r| r.row_id >= aggregator.dataset_size()) {
			return Err(EvalError::RowOutOfRange {
				row_id: bad.row_id,
				dataset_size: aggregator.dataset_size(),
			});
		}
		for record in &records {
			aggregator.feed(record)?;
		}

		let validated = aggregator.finish()?;
		Ok(validated.extract(self.engine.as_ref()))
	}
}
