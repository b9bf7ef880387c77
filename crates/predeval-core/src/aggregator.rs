use std::sync::Arc;

use predeval_types::TaskKind;

use crate::accumulator::{Accumulator, FrozenAccumulator};
use crate::arena::PartitionArena;
use crate::counter::PredictionCounter;
use crate::error::{EvalError, Result};
use crate::types::{
	AttributeKind, CostMatrix, Dataset, EstimationProcedure, PartitionKey, PredictedValue, PredictionRecord,
	SplitAssignment, Truth,
};

/// Replicate every submitted prediction is scored in. Bootstrap tasks keep the
/// in-bag replicate at index 1.
pub const PRIMARY_REPLICATE: usize = 0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
	Constructed,
	Accumulating,
	Failed,
}

/// Where one prediction goes: always its own partition, and the global
/// accumulators when `global` is set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeedPlan {
	pub partition: PartitionKey,
	pub global: bool,
}

/// Learning curves report the last (largest) sample of each fold as the
/// global score; every other task kind counts each prediction globally.
pub fn feed_plan(task_kind: TaskKind, key: PartitionKey, samples: usize) -> FeedPlan {
	let global = match task_kind {
		TaskKind::LearningCurve => key.sample + 1 == samples,
		TaskKind::Classification | TaskKind::Regression => true,
	};
	FeedPlan { partition: key, global }
}

/// Streams predictions into per-partition and global accumulators.
pub struct EvaluationAggregator {
	task_kind: TaskKind,
	class_names: Vec<String>,
	truths: Vec<Truth>,
	bootstrap: bool,
	counter: PredictionCounter,
	partitions: PartitionArena<Accumulator>,
	global: Vec<Accumulator>,
	phase: Phase,
}

impl EvaluationAggregator {
	pub fn new(
		dataset: &Dataset,
		target: &str,
		task_kind: TaskKind,
		splits: &SplitAssignment,
		procedure: EstimationProcedure,
		cost_matrix: Option<CostMatrix>,
	) -> Result<Self> {
		let (class_index, class_attribute) = dataset.class_attribute(target)?;
		let class_names = match (&class_attribute.kind, task_kind.is_classification()) {
			(AttributeKind::Nominal(values), true) => values.clone(),
			(AttributeKind::Numeric, false) => Vec::new(),
			(_, _) => {
				return Err(EvalError::schema(format!(
					"class attribute {target} cannot be evaluated as a {task_kind} task"
				)))
			}
		};

		let cost_matrix = match cost_matrix {
			Some(m) if task_kind.is_classification() => {
				if m.size() != class_names.len() {
					return Err(EvalError::schema(format!(
						"cost matrix is {0}x{0} but class attribute {target} has {1} values",
						m.size(),
						class_names.len()
					)));
				}
				Some(Arc::new(m))
			}
			Some(_) => {
				log::warn!("ignoring cost matrix for {task_kind} task");
				None
			}
			None => None,
		};

		let counter = PredictionCounter::new(splits)?;
		let width = procedure.bootstrap_width();
		let num_classes = class_names.len();
		let make = || {
			if task_kind.is_classification() {
				Accumulator::classification(num_classes, cost_matrix.clone())
			} else {
				Accumulator::regression()
			}
		};
		let partitions = PartitionArena::new(counter.dims(), width, make)?;
		let global = (0..width).map(|_| make()).collect();

		log::debug!(
			"{} task: {} repeats, {} folds, {} samples, {} replicate(s), {} expected predictions",
			task_kind,
			counter.repeats(),
			counter.folds(),
			counter.samples(),
			width,
			counter.expected_total()
		);

		Ok(Self {
			task_kind,
			class_names,
			truths: dataset.truths(class_index),
			bootstrap: procedure.is_bootstrap(),
			counter,
			partitions,
			global,
			phase: Phase::Constructed,
		})
	}

	pub fn task_kind(&self) -> TaskKind {
		self.task_kind
	}

	pub fn phase(&self) -> Phase {
		self.phase
	}

	pub fn counter(&self) -> &PredictionCounter {
		&self.counter
	}

	pub fn dataset_size(&self) -> usize {
		self.truths.len()
	}

	/// Fails fast if `row_id` is outside the dataset.
	pub fn check_row(&self, row_id: usize) -> Result<()> {
		if row_id >= self.truths.len() {
			return Err(EvalError::RowOutOfRange { row_id, dataset_size: self.truths.len() });
		}
		Ok(())
	}

	/// Folds one prediction in. Any error poisons the aggregator.
	pub fn feed(&mut self, record: &PredictionRecord) -> Result<()> {
		if self.phase == Phase::Failed {
			return Err(EvalError::Aborted);
		}
		self.phase = Phase::Accumulating;
		let result = self.feed_record(record);
		if result.is_err() {
			self.phase = Phase::Failed;
		}
		result
	}

	fn feed_record(&mut self, record: &PredictionRecord) -> Result<()> {
		let PredictionRecord { row_id, key, predicted } = record;
		self.check_row(*row_id)?;
		self.counter.add_prediction(key.repeat, key.fold, key.sample, *row_id);
		let plan = feed_plan(self.task_kind, *key, self.counter.samples());

		self.check_shape(*row_id, predicted)?;
		if !self.counter.dims().contains(key) {
			// the counter reports it when the stream is checked
			log::debug!("row_id {} predicted for {} outside the split assignment", row_id, key);
			return Ok(());
		}
		let truth = self.truths[*row_id];
		if truth == Truth::Missing {
			log::debug!("row_id {} has no class value, not scored", row_id);
			return Ok(());
		}

		if let Some(acc) = self.partitions.get_mut(&plan.partition, PRIMARY_REPLICATE) {
			observe(acc, *row_id, truth, predicted);
		}
		if plan.global {
			observe(&mut self.global[PRIMARY_REPLICATE], *row_id, truth, predicted);
		}
		Ok(())
	}

	fn check_shape(&self, row_id: usize, predicted: &PredictedValue) -> Result<()> {
		match (predicted, self.task_kind.is_classification()) {
			(PredictedValue::Distribution(d), true) if d.len() == self.class_names.len() => Ok(()),
			(PredictedValue::Distribution(d), true) => Err(EvalError::schema(format!(
				"row_id {row_id} carries {} confidences for {} classes",
				d.len(),
				self.class_names.len()
			))),
			(PredictedValue::Value(_), false) => Ok(()),
			_ => Err(EvalError::schema(format!(
				"row_id {row_id} carries the wrong prediction type for a {} task",
				self.task_kind
			))),
		}
	}

	/// Gates on complete coverage and freezes every accumulator.
	pub fn finish(self) -> Result<ValidatedEvaluation> {
		if self.phase == Phase::Failed {
			return Err(EvalError::Aborted);
		}
		if !self.counter.check() {
			let message = self.counter.error_message();
			log::warn!("prediction count does not match: {message}");
			return Err(EvalError::CountMismatch(message));
		}
		Ok(ValidatedEvaluation {
			task_kind: self.task_kind,
			class_names: self.class_names,
			bootstrap: self.bootstrap,
			counter: self.counter,
			partitions: self.partitions.map(Accumulator::freeze),
			global: self.global.into_iter().map(Accumulator::freeze).collect(),
		})
	}
}

fn observe(acc: &mut Accumulator, row_id: usize, truth: Truth, predicted: &PredictedValue) {
	match (truth, predicted) {
		(Truth::Class(actual), PredictedValue::Distribution(d)) => acc.add_class(row_id, actual, d),
		(Truth::Value(actual), PredictedValue::Value(v)) => acc.add_value(row_id, actual, *v),
		_ => {}
	}
}

/// Completed, checked evaluation. Its accumulators are read-only.
#[derive(Debug)]
pub struct ValidatedEvaluation {
	task_kind: TaskKind,
	class_names: Vec<String>,
	bootstrap: bool,
	counter: PredictionCounter,
	partitions: PartitionArena<FrozenAccumulator>,
	global: Vec<FrozenAccumulator>,
}

impl ValidatedEvaluation {
	pub fn task_kind(&self) -> TaskKind {
		self.task_kind
	}

	pub fn class_names(&self) -> &[String] {
		&self.class_names
	}

	pub fn is_bootstrap(&self) -> bool {
		self.bootstrap
	}

	pub fn counter(&self) -> &PredictionCounter {
		&self.counter
	}

	pub fn global(&self) -> &[FrozenAccumulator] {
		&self.global
	}

	pub fn partitions(&self) -> &PartitionArena<FrozenAccumulator> {
		&self.partitions
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::types::{Attribute, CellValue};

	fn yes_no_dataset(labels: &[usize]) -> Dataset {
		let rows = labels.iter().map(|l| vec![CellValue::Nominal(*l)]).collect();
		Dataset::new(vec![Attribute::nominal("class", ["yes", "no"])], rows).unwrap()
	}

	fn one_hot(label: usize) -> Vec<f64> {
		if label == 0 { vec![1.0, 0.0] } else { vec![0.0, 1.0] }
	}

	#[test]
	fn test_feed_plan_learning_curve() {
		let last = feed_plan(TaskKind::LearningCurve, PartitionKey::new(0, 0, 1), 2);
		assert!(last.global);
		let first = feed_plan(TaskKind::LearningCurve, PartitionKey::new(0, 0, 0), 2);
		assert!(!first.global);
		assert_eq!(first.partition, PartitionKey::new(0, 0, 0));
	}

	#[test]
	fn test_feed_plan_other_kinds_always_global() {
		for kind in [TaskKind::Classification, TaskKind::Regression] {
			assert!(feed_plan(kind, PartitionKey::new(1, 3, 0), 1).global);
		}
	}

	#[test]
	fn test_learning_curve_routing() {
		let dataset = yes_no_dataset(&[0, 1]);
		let splits: SplitAssignment = [0, 1]
			.into_iter()
			.flat_map(|row| [(PartitionKey::new(0, 0, 0), row), (PartitionKey::new(0, 0, 1), row)])
			.collect();
		let mut agg = EvaluationAggregator::new(
			&dataset, "class", TaskKind::LearningCurve, &splits, EstimationProcedure::Learningcurve, None,
		)
		.unwrap();
		for sample in [0, 1] {
			for row in [0, 1] {
				let rec = PredictionRecord::distribution(row, PartitionKey::new(0, 0, sample), one_hot(row));
				agg.feed(&rec).unwrap();
			}
		}
		let done = agg.finish().unwrap();
		assert_eq!(done.global()[0].len(), 2);
		assert_eq!(done.partitions().get(&PartitionKey::new(0, 0, 0), 0).unwrap().len(), 2);
		assert_eq!(done.partitions().get(&PartitionKey::new(0, 0, 1), 0).unwrap().len(), 2);
	}

	#[test]
	fn test_bootstrap_allocates_two_replicates() {
		let dataset = yes_no_dataset(&[0, 1]);
		let splits: SplitAssignment = [(PartitionKey::default(), 0), (PartitionKey::default(), 1)].into_iter().collect();
		let mut agg = EvaluationAggregator::new(
			&dataset, "class", TaskKind::Classification, &splits, EstimationProcedure::Bootstrapping, None,
		)
		.unwrap();
		for row in [0, 1] {
			agg.feed(&PredictionRecord::distribution(row, PartitionKey::default(), one_hot(row))).unwrap();
		}
		let done = agg.finish().unwrap();
		assert!(done.is_bootstrap());
		assert_eq!(done.global().len(), 2);
		assert_eq!(done.global()[PRIMARY_REPLICATE].len(), 2);
		assert!(done.global()[1].is_empty());
		let reps = done.partitions().replicates(&PartitionKey::default()).unwrap();
		assert_eq!((reps[0].len(), reps[1].len()), (2, 0));
	}

	#[test]
	fn test_row_out_of_range_poisons() {
		let dataset = yes_no_dataset(&[0, 1]);
		let splits: SplitAssignment = [(PartitionKey::default(), 0), (PartitionKey::default(), 1)].into_iter().collect();
		let mut agg = EvaluationAggregator::new(
			&dataset, "class", TaskKind::Classification, &splits, EstimationProcedure::Holdout, None,
		)
		.unwrap();
		assert_eq!(agg.phase(), Phase::Constructed);
		let err = agg.feed(&PredictionRecord::distribution(2, PartitionKey::default(), one_hot(0))).unwrap_err();
		assert_eq!(err, EvalError::RowOutOfRange { row_id: 2, dataset_size: 2 });
		assert_eq!(agg.phase(), Phase::Failed);
		// nothing was counted for the rejected row
		assert!(agg.counter().discrepancies().iter().all(|d| d.unexpected.is_empty()));
		let ok_record = PredictionRecord::distribution(0, PartitionKey::default(), one_hot(0));
		assert_eq!(agg.feed(&ok_record), Err(EvalError::Aborted));
		assert!(matches!(agg.finish(), Err(EvalError::Aborted)));
	}

	#[test]
	fn test_wrong_confidence_count() {
		let dataset = yes_no_dataset(&[0]);
		let splits: SplitAssignment = [(PartitionKey::default(), 0)].into_iter().collect();
		let mut agg = EvaluationAggregator::new(
			&dataset, "class", TaskKind::Classification, &splits, EstimationProcedure::Holdout, None,
		)
		.unwrap();
		let err = agg.feed(&PredictionRecord::distribution(0, PartitionKey::default(), vec![1.0])).unwrap_err();
		assert!(matches!(err, EvalError::Schema(_)));
	}

	#[test]
	fn test_cost_matrix_size_checked() {
		let dataset = yes_no_dataset(&[0]);
		let splits: SplitAssignment = [(PartitionKey::default(), 0)].into_iter().collect();
		let cost = CostMatrix::new(vec![vec![0.0; 3]; 3]).unwrap();
		let result = EvaluationAggregator::new(
			&dataset, "class", TaskKind::Classification, &splits, EstimationProcedure::Holdout, Some(cost),
		);
		assert!(matches!(result, Err(EvalError::Schema(_))));
	}

	#[test]
	fn test_missing_truth_counted_not_scored() {
		let rows = vec![vec![CellValue::Nominal(0)], vec![CellValue::Missing]];
		let dataset = Dataset::new(vec![Attribute::nominal("class", ["yes", "no"])], rows).unwrap();
		let splits: SplitAssignment = [(PartitionKey::default(), 0), (PartitionKey::default(), 1)].into_iter().collect();
		let mut agg = EvaluationAggregator::new(
			&dataset, "class", TaskKind::Classification, &splits, EstimationProcedure::Holdout, None,
		)
		.unwrap();
		for row in [0, 1] {
			agg.feed(&PredictionRecord::distribution(row, PartitionKey::default(), one_hot(0))).unwrap();
		}
		let done = agg.finish().unwrap();
		assert_eq!(done.global()[0].len(), 1);
	}

	#[test]
	fn test_foreign_partition_becomes_count_mismatch() {
		let dataset = yes_no_dataset(&[0, 1]);
		let splits: SplitAssignment = [(PartitionKey::default(), 0), (PartitionKey::default(), 1)].into_iter().collect();
		let mut agg = EvaluationAggregator::new(
			&dataset, "class", TaskKind::Classification, &splits, EstimationProcedure::Holdout, None,
		)
		.unwrap();
		for row in [0, 1] {
			agg.feed(&PredictionRecord::distribution(row, PartitionKey::default(), one_hot(row))).unwrap();
		}
		agg.feed(&PredictionRecord::distribution(1, PartitionKey::new(0, 4, 0), one_hot(1))).unwrap();
		match agg.finish() {
			Err(EvalError::CountMismatch(msg)) => assert!(msg.contains("fold 4")),
			other => panic!("expected count mismatch, got {other:?}"),
		}
	}
}
