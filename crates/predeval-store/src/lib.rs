use anyhow::{anyhow, Result};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OpenFlags};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

use predeval_types::{EvaluationReport, MetricScope};

#[derive(Debug)]
pub struct Store {
    conn: Arc<Mutex<Connection>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunEntity {
    pub id: i64,
    pub created_at: DateTime<Utc>,
    pub metadata: Option<serde_json::Value>,
}

/// One evaluation row: either a scored report or a recorded failure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationEntity {
    pub id: i64,
    pub run_id: i64,
    pub name: String,
    pub status: String,
    pub task_kind: Option<String>,
    pub number_of_classes: Option<i64>,
    pub error_kind: Option<String>,
    pub error_message: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricEntity {
    pub name: String,
    pub value: String,
    pub array: Option<String>,
    pub scope: String,
    pub repeat: Option<i64>,
    pub fold: Option<i64>,
    pub sample: Option<i64>,
    pub sample_size: Option<i64>,
}

impl Store {
    /// Opens (or creates) a store, e.g. `"predeval.db"` or `":memory:"`.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_WRITE
                | OpenFlags::SQLITE_OPEN_CREATE
                | OpenFlags::SQLITE_OPEN_URI,
        )?;

        let store = Self {
            conn: Arc::new(Mutex::new(conn)),
        };

        store.init_schema()?;
        Ok(store)
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| anyhow!("store connection lock poisoned"))
    }

    fn init_schema(&self) -> Result<()> {
        let conn = self.lock()?;

        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS runs (
                id INTEGER PRIMARY KEY,
                created_at TEXT NOT NULL,
                metadata TEXT
            );
            CREATE TABLE IF NOT EXISTS evaluations (
                id INTEGER PRIMARY KEY,
                run_id INTEGER NOT NULL,
                name TEXT NOT NULL,
                status TEXT NOT NULL,
                task_kind TEXT,
                number_of_classes INTEGER,
                error_kind TEXT,
                error_message TEXT,
                FOREIGN KEY(run_id) REFERENCES runs(id)
            );
            CREATE TABLE IF NOT EXISTS metrics (
                id INTEGER PRIMARY KEY,
                evaluation_id INTEGER NOT NULL,
                name TEXT NOT NULL,
                value TEXT NOT NULL,
                array TEXT,
                scope TEXT NOT NULL,
                repeat INTEGER,
                fold INTEGER,
                sample INTEGER,
                sample_size INTEGER,
                FOREIGN KEY(evaluation_id) REFERENCES evaluations(id)
            );",
        )?;

        Ok(())
    }

    pub fn create_run(&self, metadata: Option<serde_json::Value>) -> Result<i64> {
        let conn = self.lock()?;
        let now = Utc::now();

        conn.execute(
            "INSERT INTO runs (created_at, metadata) VALUES (?1, ?2)",
            params![now.to_rfc3339(), metadata.map(|v| v.to_string())],
        )?;

        Ok(conn.last_insert_rowid())
    }

    /// Saves a successful evaluation and all of its metric records in one transaction.
    pub fn save_report(&self, run_id: i64, name: &str, report: &EvaluationReport) -> Result<i64> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;

        tx.execute(
            "INSERT INTO evaluations (run_id, name, status, task_kind, number_of_classes)
             VALUES (?1, ?2, 'ok', ?3, ?4)",
            params![
                run_id,
                name,
                report.task_kind.as_str(),
                report.number_of_classes as i64
            ],
        )?;
        let evaluation_id = tx.last_insert_rowid();

        for record in &report.records {
            let (scope, repeat, fold, sample, sample_size) = match record.scope {
                MetricScope::Global => ("global", None, None, None, None),
                MetricScope::Fold { repeat, fold } => {
                    ("fold", Some(repeat as i64), Some(fold as i64), None, None)
                }
                MetricScope::Sample {
                    repeat,
                    fold,
                    sample,
                    sample_size,
                } => (
                    "sample",
                    Some(repeat as i64),
                    Some(fold as i64),
                    Some(sample as i64),
                    Some(sample_size as i64),
                ),
            };
            tx.execute(
                "INSERT INTO metrics (evaluation_id, name, value, array, scope, repeat, fold, sample, sample_size)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                params![
                    evaluation_id,
                    record.name,
                    record.value,
                    record.array,
                    scope,
                    repeat,
                    fold,
                    sample,
                    sample_size
                ],
            )?;
        }

        tx.commit()?;
        Ok(evaluation_id)
    }

    /// Records a failed evaluation. No metrics are stored for it.
    pub fn save_failure(&self, run_id: i64, name: &str, error_kind: &str, message: &str) -> Result<i64> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO evaluations (run_id, name, status, error_kind, error_message)
             VALUES (?1, ?2, 'error', ?3, ?4)",
            params![run_id, name, error_kind, message],
        )?;
        Ok(conn.last_insert_rowid())
    }

    pub fn evaluation(&self, evaluation_id: i64) -> Result<EvaluationEntity> {
        let conn = self.lock()?;
        let entity = conn.query_row(
            "SELECT id, run_id, name, status, task_kind, number_of_classes, error_kind, error_message
             FROM evaluations WHERE id = ?1",
            params![evaluation_id],
            |row| {
                Ok(EvaluationEntity {
                    id: row.get(0)?,
                    run_id: row.get(1)?,
                    name: row.get(2)?,
                    status: row.get(3)?,
                    task_kind: row.get(4)?,
                    number_of_classes: row.get(5)?,
                    error_kind: row.get(6)?,
                    error_message: row.get(7)?,
                })
            },
        )?;
        Ok(entity)
    }

    pub fn metrics(&self, evaluation_id: i64) -> Result<Vec<MetricEntity>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT name, value, array, scope, repeat, fold, sample, sample_size
             FROM metrics WHERE evaluation_id = ?1 ORDER BY id",
        )?;
        let rows = stmt.query_map(params![evaluation_id], |row| {
            Ok(MetricEntity {
                name: row.get(0)?,
                value: row.get(1)?,
                array: row.get(2)?,
                scope: row.get(3)?,
                repeat: row.get(4)?,
                fold: row.get(5)?,
                sample: row.get(6)?,
                sample_size: row.get(7)?,
            })
        })?;
        let mut metrics = Vec::new();
        for row in rows {
            metrics.push(row?);
        }
        Ok(metrics)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use predeval_types::{MetricRecord, TaskKind};

    #[test]
    fn test_save_report_and_read_back() {
        let store = Store::open(":memory:").unwrap();
        let run_id = store.create_run(Some(serde_json::json!({"task": "demo"}))).unwrap();
        let report = EvaluationReport {
            task_kind: TaskKind::LearningCurve,
            number_of_classes: 2,
            records: vec![
                MetricRecord::new("predictive_accuracy", "0.8", MetricScope::Global).with_array("[0.7,0.9]"),
                MetricRecord::new(
                    "predictive_accuracy",
                    "0.6",
                    MetricScope::Sample { repeat: 0, fold: 1, sample: 2, sample_size: 40 },
                ),
            ],
        };
        let id = store.save_report(run_id, "submission", &report).unwrap();

        let evaluation = store.evaluation(id).unwrap();
        assert_eq!(evaluation.status, "ok");
        assert_eq!(evaluation.task_kind.as_deref(), Some("learning_curve"));
        assert_eq!(evaluation.number_of_classes, Some(2));

        let metrics = store.metrics(id).unwrap();
        assert_eq!(metrics.len(), 2);
        assert_eq!(metrics[0].scope, "global");
        assert_eq!(metrics[0].array.as_deref(), Some("[0.7,0.9]"));
        assert_eq!(metrics[1].sample, Some(2));
        assert_eq!(metrics[1].sample_size, Some(40));
    }

    #[test]
    fn test_save_failure_has_no_metrics() {
        let store = Store::open(":memory:").unwrap();
        let run_id = store.create_run(None).unwrap();
        let id = store
            .save_failure(run_id, "submission", "count_mismatch", "missing row_ids [2]")
            .unwrap();
        let evaluation = store.evaluation(id).unwrap();
        assert_eq!(evaluation.status, "error");
        assert_eq!(evaluation.error_kind.as_deref(), Some("count_mismatch"));
        assert_eq!(evaluation.number_of_classes, None);
        assert!(store.metrics(id).unwrap().is_empty());
    }
}
