//! predeval-core: validation and scoring of benchmark prediction submissions.
//! Checks a prediction table against a dataset and its split assignment, then
//! computes global and per-partition metrics. See `examples/simple.rs` for a quickstart.

pub mod accumulator;
pub mod aggregator;
pub mod arena;
pub mod classifier;
pub mod config;
pub mod counter;
pub mod datasource;
pub mod engine;
pub mod error;
pub mod extractor;
pub mod layout;
pub mod report;
pub mod runner;
pub mod table;
pub mod testing;
pub mod types;

pub mod metrics {
    pub mod classification;
    pub mod regression;
    pub mod standard;
}

#[cfg(feature = "persistence")]
pub mod persist;

pub use aggregator::{EvaluationAggregator, ValidatedEvaluation};
pub use classifier::classify;
pub use config::EvaluationConfig;
pub use counter::PredictionCounter;
pub use datasource::{
    load_inputs, CsvFileSource, HttpCsvSource, LoadedInputs, TableSource, VecTableSource,
};
pub use engine::{MetricScore, MetricsEngine, TaskContext};
pub use error::{ErrorKind, EvalError};
pub use extractor::MetricExtractor;
pub use metrics::standard::StandardMetricsEngine;
pub use runner::{Evaluation, EvaluationBuilder};
pub use table::Table;
pub use types::{
    Attribute, CellValue, CostMatrix, Dataset, EstimationProcedure, PartitionKey, PredictionRecord,
    SplitAssignment,
};
pub use predeval_types::{EvaluationReport, MetricRecord, MetricScope, TaskKind};
