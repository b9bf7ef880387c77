//! Resolves prediction-table columns once and converts raw rows into records.

use predeval_types::TaskKind;

use crate::classifier::SAMPLE_COLUMNS;
use crate::error::{EvalError, Result};
use crate::table::{column_index, parse_index, Table};
use crate::types::{PartitionKey, PredictionRecord};

pub const ROW_ID_COLUMNS: [&str; 1] = ["row_id"];
pub const REPEAT_COLUMNS: [&str; 2] = ["repeat", "repeat_nr"];
pub const FOLD_COLUMNS: [&str; 2] = ["fold", "fold_nr"];
pub const PREDICTION_COLUMNS: [&str; 1] = ["prediction"];
pub const CONFIDENCE_PREFIX: &str = "confidence.";

#[derive(Debug, Clone, PartialEq)]
pub struct PredictionLayout {
    task_kind: TaskKind,
    row_id: usize,
    repeat: Option<usize>,
    fold: Option<usize>,
    sample: Option<usize>,
    prediction: Option<usize>,
    /// One column per class, in class order.
    confidences: Vec<usize>,
}

impl PredictionLayout {
    pub fn resolve(columns: &[String], task_kind: TaskKind, class_names: &[String]) -> Result<Self> {
        let row_id = column_index(columns, &ROW_ID_COLUMNS)
            .ok_or_else(|| EvalError::schema("Attribute row_id not found among predictions"))?;
        let sample = if task_kind == TaskKind::LearningCurve {
            column_index(columns, &SAMPLE_COLUMNS)
        } else {
            None
        };
        let prediction = column_index(columns, &PREDICTION_COLUMNS);
        if task_kind == TaskKind::Regression && prediction.is_none() {
            return Err(EvalError::schema("Attribute prediction not found among predictions"));
        }

        let mut confidences = Vec::new();
        if task_kind.is_classification() {
            for class in class_names {
                let name = format!("{CONFIDENCE_PREFIX}{class}");
                let idx = column_index(columns, &[name.as_str()]).ok_or_else(|| {
                    EvalError::schema(format!("Attribute {name} not found among predictions"))
                })?;
                confidences.push(idx);
            }
        }

        Ok(Self {
            task_kind,
            row_id,
            repeat: column_index(columns, &REPEAT_COLUMNS),
            fold: column_index(columns, &FOLD_COLUMNS),
            sample,
            prediction,
            confidences,
        })
    }

    pub fn task_kind(&self) -> TaskKind {
        self.task_kind
    }

    /// Converts table row `line` (0-based, for diagnostics) into a record.
    pub fn record(&self, line: usize, row: &[Option<String>], columns: &[String]) -> Result<PredictionRecord> {
        let row_id = index_cell(row, self.row_id, line, columns)?
            .ok_or_else(|| EvalError::schema(format!("prediction row {line} has no row_id")))?;
        let key = PartitionKey::new(
            self.optional_index(row, self.repeat, line, columns)?,
            self.optional_index(row, self.fold, line, columns)?,
            self.optional_index(row, self.sample, line, columns)?,
        );

        if !self.task_kind.is_classification() {
            let col = self.prediction.unwrap_or(usize::MAX);
            let value = number_cell(row, col, line, columns)?.ok_or_else(|| {
                EvalError::schema(format!("prediction row {line} (row_id {row_id}) has no prediction"))
            })?;
            return Ok(PredictionRecord::value(row_id, key, value));
        }

        let mut confidences = Vec::with_capacity(self.confidences.len());
        for &col in &self.confidences {
            let value = number_cell(row, col, line, columns)?.ok_or_else(|| {
                EvalError::schema(format!(
                    "prediction row {line} (row_id {row_id}) has no value for {}",
                    column_name(columns, col)
                ))
            })?;
            confidences.push(value);
        }
        Ok(PredictionRecord::distribution(row_id, key, confidences))
    }

    /// Converts a whole table, stopping at the first malformed row.
    pub fn records(&self, table: &Table) -> Result<Vec<PredictionRecord>> {
        table
            .rows
            .iter()
            .enumerate()
            .map(|(line, row)| self.record(line, row, &table.columns))
            .collect()
    }

    fn optional_index(
        &self,
        row: &[Option<String>],
        col: Option<usize>,
        line: usize,
        columns: &[String],
    ) -> Result<usize> {
        match col {
            Some(col) => Ok(index_cell(row, col, line, columns)?.unwrap_or(0)),
            None => Ok(0),
        }
    }
}

fn column_name(columns: &[String], col: usize) -> &str {
    columns.get(col).map(String::as_str).unwrap_or("?")
}

fn number_cell(row: &[Option<String>], col: usize, line: usize, columns: &[String]) -> Result<Option<f64>> {
    match row.get(col).and_then(Option::as_deref) {
        None => Ok(None),
        Some(raw) => raw.parse::<f64>().map(Some).map_err(|_| {
            EvalError::schema(format!(
                "prediction row {line}: {} holds non-numeric value '{raw}'",
                column_name(columns, col)
            ))
        }),
    }
}

fn index_cell(row: &[Option<String>], col: usize, line: usize, columns: &[String]) -> Result<Option<usize>> {
    let Some(raw) = row.get(col).and_then(Option::as_deref) else {
        return Ok(None);
    };
    parse_index(raw).map(Some).ok_or_else(|| {
        EvalError::schema(format!(
            "prediction row {line}: {} holds '{raw}', expected a non-negative integer",
            column_name(columns, col)
        ))
    })
}
