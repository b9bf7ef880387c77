use anyhow::Result;
use predeval_types::{EvaluationReport, MetricScope};

/// Asserts that `name` was reported for `scope`.
///
/// Use this in tests that run a full evaluation.
///
/// # Example
/// ```ignore
/// #[test]
/// fn test_submission() -> anyhow::Result<()> {
///     let report = Evaluation::builder()
///         .dataset(dataset)
///         .target("class")
///         .splits(splits)
///         .predictions(predictions)
///         .build()?
///         .run()?;
///
///     assert_metric_present(&report, "predictive_accuracy", &MetricScope::Global)?;
///     assert_metric_at_least(&report, "area_under_roc_curve", 0.8)?;
///     Ok(())
/// }
/// ```
pub fn assert_metric_present(report: &EvaluationReport, name: &str, scope: &MetricScope) -> Result<()> {
    if report.find(name, scope).is_none() {
        anyhow::bail!(
            "Evaluation check failed: {} not reported for {}\n{}",
            name,
            scope,
            report.summary_table()
        );
    }
    Ok(())
}

/// Asserts that the global value of `name` is at least `min`.
pub fn assert_metric_at_least(report: &EvaluationReport, name: &str, min: f64) -> Result<()> {
    let value = report
        .find(name, &MetricScope::Global)
        .and_then(|r| r.numeric_value())
        .ok_or_else(|| anyhow::anyhow!("Evaluation check failed: no global {}", name))?;
    if value < min {
        anyhow::bail!(
            "Evaluation check failed: {} is {:.4}, below threshold {:.4}\n{}",
            name,
            value,
            min,
            report.summary_table()
        );
    }
    Ok(())
}

/// Asserts that every record holds a finite number.
pub fn assert_no_non_finite(report: &EvaluationReport) -> Result<()> {
    let bad: Vec<String> = report
        .records
        .iter()
        .filter(|r| !r.numeric_value().map_or(false, f64::is_finite))
        .map(|r| format!("{} ({}) = {}", r.name, r.scope, r.value))
        .collect();
    if !bad.is_empty() {
        anyhow::bail!("Evaluation check failed: non-finite values {}", bad.join(", "));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use predeval_types::{MetricRecord, TaskKind};

    fn report(value: &str) -> EvaluationReport {
        EvaluationReport {
            task_kind: TaskKind::Regression,
            number_of_classes: 0,
            records: vec![MetricRecord::new("mean_absolute_error", value, MetricScope::Global)],
        }
    }

    #[test]
    fn test_present_and_threshold() {
        let report = report("0.25");
        assert!(assert_metric_present(&report, "mean_absolute_error", &MetricScope::Global).is_ok());
        assert!(assert_metric_present(&report, "kappa", &MetricScope::Global).is_err());
        assert!(assert_metric_at_least(&report, "mean_absolute_error", 0.2).is_ok());
        assert!(assert_metric_at_least(&report, "mean_absolute_error", 0.3).is_err());
    }

    #[test]
    fn test_non_finite_detected() {
        assert!(assert_no_non_finite(&report("0.25")).is_ok());
        assert!(assert_no_non_finite(&report("NaN")).is_err());
    }
}
