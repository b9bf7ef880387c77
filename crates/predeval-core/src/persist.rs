//! Records evaluation outcomes in a [`Store`]. A failed evaluation is stored
//! with its error kind and no metrics.

use predeval_store::Store;
use predeval_types::EvaluationReport;

use crate::error::EvalError;

pub fn record_outcome(
    store: &Store,
    run_id: i64,
    name: &str,
    outcome: &Result<EvaluationReport, EvalError>,
) -> anyhow::Result<i64> {
    match outcome {
        Ok(report) => {
            let id = store.save_report(run_id, name, report)?;
            log::debug!("stored {} metric records as evaluation {}", report.records.len(), id);
            Ok(id)
        }
        Err(err) => {
            let id = store.save_failure(run_id, name, err.kind().as_str(), &err.to_string())?;
            log::debug!("stored {} failure as evaluation {}", err.kind(), id);
            Ok(id)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failure_is_recorded_with_kind() {
        let store = Store::open(":memory:").unwrap();
        let run_id = store.create_run(None).unwrap();
        let outcome = Err(EvalError::RowOutOfRange { row_id: 7, dataset_size: 4 });
        let id = record_outcome(&store, run_id, "late", &outcome).unwrap();
        let evaluation = store.evaluation(id).unwrap();
        assert_eq!(evaluation.error_kind.as_deref(), Some("row_out_of_range"));
        assert!(evaluation.error_message.unwrap().contains("row_id 7"));
    }
}
