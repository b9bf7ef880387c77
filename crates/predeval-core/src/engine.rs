use std::collections::BTreeMap;

use predeval_types::TaskKind;

use crate::accumulator::FrozenAccumulator;

/// What a metrics engine knows about the task besides the accumulator itself.
#[derive(Debug, Clone, Copy)]
pub struct TaskContext<'a> {
    pub task_kind: TaskKind,
    pub class_names: &'a [String],
    pub bootstrap: bool,
}

impl TaskContext<'_> {
    pub fn num_classes(&self) -> usize {
        self.class_names.len()
    }
}

/// Raw score as produced by an engine. Non-finite values are allowed here;
/// the extractor filters them.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MetricScore {
    pub value: Option<f64>,
    pub array: Option<Vec<f64>>,
}

impl MetricScore {
    pub fn scalar(value: f64) -> Self {
        Self { value: Some(value), array: None }
    }

    pub fn with_array(value: f64, array: Vec<f64>) -> Self {
        Self { value: Some(value), array: Some(array) }
    }
}

/// Computes named scores from one partition's replicates.
///
/// `replicates[0]` is the primary (out-of-bag) accumulator; bootstrap tasks
/// pass the in-bag replicate at index 1.
pub trait MetricsEngine: Send + Sync {
    fn name(&self) -> &'static str;
    fn compute(&self, replicates: &[FrozenAccumulator], ctx: &TaskContext<'_>) -> BTreeMap<String, MetricScore>;
}
