//! Turns validated accumulators into filtered, tagged metric records.

use predeval_types::{EvaluationReport, MetricRecord, MetricScope, TaskKind};

use crate::accumulator::FrozenAccumulator;
use crate::aggregator::ValidatedEvaluation;
use crate::engine::{MetricScore, MetricsEngine, TaskContext};
use crate::types::PartitionKey;

/// Fractional digits kept when rendering a score.
pub const SCORE_DECIMALS: usize = 6;

/// Deterministic decimal rendering: at most six fractional digits, trailing zeros trimmed.
pub fn format_score(value: f64) -> String {
    let fixed = format!("{:.*}", SCORE_DECIMALS, value);
    let trimmed = if fixed.contains('.') {
        fixed.trim_end_matches('0').trim_end_matches('.')
    } else {
        fixed.as_str()
    };
    if trimmed == "-0" {
        "0".to_string()
    } else {
        trimmed.to_string()
    }
}

/// `[v1,v2,...]`, or `None` when any element is not finite.
pub fn format_array(values: &[f64]) -> Option<String> {
    if values.iter().any(|v| !v.is_finite()) {
        return None;
    }
    let parts: Vec<String> = values.iter().map(|v| format_score(*v)).collect();
    Some(format!("[{}]", parts.join(",")))
}

pub struct MetricExtractor<'e> {
    engine: &'e dyn MetricsEngine,
}

impl<'e> MetricExtractor<'e> {
    pub fn new(engine: &'e dyn MetricsEngine) -> Self {
        Self { engine }
    }

    /// Global records first, then one block per partition in grid order.
    pub fn extract(&self, evaluation: ValidatedEvaluation) -> EvaluationReport {
        let task_kind = evaluation.task_kind();
        let ctx = TaskContext {
            task_kind,
            class_names: evaluation.class_names(),
            bootstrap: evaluation.is_bootstrap(),
        };

        let mut records = Vec::new();
        self.push_scores(&mut records, evaluation.global(), &ctx, MetricScope::Global);
        for (key, replicates) in evaluation.partitions().iter() {
            let scope = partition_scope(task_kind, key, &evaluation);
            self.push_scores(&mut records, replicates, &ctx, scope);
        }

        log::info!(
            "extracted {} metric records with the {} engine",
            records.len(),
            self.engine.name()
        );
        EvaluationReport {
            task_kind,
            number_of_classes: ctx.num_classes(),
            records,
        }
    }

    fn push_scores(
        &self,
        out: &mut Vec<MetricRecord>,
        replicates: &[FrozenAccumulator],
        ctx: &TaskContext<'_>,
        scope: MetricScope,
    ) {
        for (name, score) in self.engine.compute(replicates, ctx) {
            if let Some(record) = to_record(&name, &score, scope) {
                out.push(record);
            }
        }
    }
}

fn partition_scope(task_kind: TaskKind, key: PartitionKey, evaluation: &ValidatedEvaluation) -> MetricScope {
    match task_kind {
        TaskKind::LearningCurve => MetricScope::Sample {
            repeat: key.repeat,
            fold: key.fold,
            sample: key.sample,
            sample_size: evaluation.counter().shadow_type_size(key.repeat, key.fold, key.sample),
        },
        TaskKind::Classification | TaskKind::Regression => MetricScope::Fold {
            repeat: key.repeat,
            fold: key.fold,
        },
    }
}

fn to_record(name: &str, score: &MetricScore, scope: MetricScope) -> Option<MetricRecord> {
    let value = match score.value {
        Some(v) if v.is_finite() => v,
        other => {
            log::debug!("dropping {name} for {scope}: {other:?}");
            return None;
        }
    };
    let mut record = MetricRecord::new(name, format_score(value), scope);
    record.array = score.array.as_deref().and_then(format_array);
    Some(record)
}

impl ValidatedEvaluation {
    pub fn extract(self, engine: &dyn MetricsEngine) -> EvaluationReport {
        MetricExtractor::new(engine).extract(self)
    }
}
