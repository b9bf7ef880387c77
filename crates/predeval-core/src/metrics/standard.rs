use std::collections::BTreeMap;

use crate::accumulator::FrozenAccumulator;
use crate::engine::{MetricScore, MetricsEngine, TaskContext};
use crate::metrics::{classification, regression};

/// Default engine: the metric set the evaluation server has always reported.
///
/// Scores come from the primary replicate only. An empty primary yields no
/// scores at all.
#[derive(Debug, Clone, Copy, Default)]
pub struct StandardMetricsEngine;

impl MetricsEngine for StandardMetricsEngine {
	fn name(&self) -> &'static str {
		"standard"
	}

	fn compute(&self, replicates: &[FrozenAccumulator], ctx: &TaskContext<'_>) -> BTreeMap<String, MetricScore> {
		let Some(primary) = replicates.first() else {
			return BTreeMap::new();
		};
		match primary {
			FrozenAccumulator::Classification { num_classes, cost_matrix, observations } if ctx.task_kind.is_classification() => {
				classification::compute(observations, *num_classes, cost_matrix.as_deref())
			}
			FrozenAccumulator::Regression { observations } if !ctx.task_kind.is_classification() => {
				regression::compute(observations)
			}
			_ => {
				log::warn!("{} accumulator does not match task kind {}", self.name(), ctx.task_kind);
				BTreeMap::new()
			}
		}
	}
}
