use std::collections::BTreeMap;

use crate::accumulator::ValueObservation;
use crate::engine::MetricScore;

/// Regression scores over one accumulator. The prior is the mean true value
/// of the accumulator.
pub fn compute(observations: &[ValueObservation]) -> BTreeMap<String, MetricScore> {
    let mut out = BTreeMap::new();
    if observations.is_empty() {
        return out;
    }
    let n = observations.len() as f64;
    let mean_actual = observations.iter().map(|o| o.actual).sum::<f64>() / n;
    let mean_predicted = observations.iter().map(|o| o.predicted).sum::<f64>() / n;

    let (mut abs_err, mut sq_err, mut prior_abs, mut prior_sq) = (0.0, 0.0, 0.0, 0.0);
    let (mut cov, mut var_predicted) = (0.0, 0.0);
    for o in observations {
        let err = o.predicted - o.actual;
        let dev = o.actual - mean_actual;
        abs_err += err.abs();
        sq_err += err * err;
        prior_abs += dev.abs();
        prior_sq += dev * dev;
        cov += (o.predicted - mean_predicted) * dev;
        var_predicted += (o.predicted - mean_predicted).powi(2);
    }

    let mae = abs_err / n;
    let rmse = (sq_err / n).sqrt();
    let prior_mae = prior_abs / n;
    let prior_rmse = (prior_sq / n).sqrt();

    out.insert("number_of_instances".to_string(), MetricScore::scalar(n));
    out.insert("mean_absolute_error".to_string(), MetricScore::scalar(mae));
    out.insert("root_mean_squared_error".to_string(), MetricScore::scalar(rmse));
    out.insert("mean_prior_absolute_error".to_string(), MetricScore::scalar(prior_mae));
    out.insert("root_mean_prior_squared_error".to_string(), MetricScore::scalar(prior_rmse));
    out.insert("relative_absolute_error".to_string(), MetricScore::scalar(mae / prior_mae));
    out.insert("root_relative_squared_error".to_string(), MetricScore::scalar(rmse / prior_rmse));
    out.insert(
        "correlation_coefficient".to_string(),
        MetricScore::scalar(cov / (var_predicted * prior_sq).sqrt()),
    );
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn obs(row_id: usize, actual: f64, predicted: f64) -> ValueObservation {
        ValueObservation { row_id, actual, predicted }
    }

    #[test]
    fn test_errors() {
        let observations = vec![obs(0, 1.0, 2.0), obs(1, 3.0, 3.0), obs(2, 5.0, 3.0)];
        let scores = compute(&observations);
        assert_eq!(scores["number_of_instances"].value, Some(3.0));
        assert_eq!(scores["mean_absolute_error"].value, Some(1.0));
        assert_eq!(scores["root_mean_squared_error"].value, Some((5.0f64 / 3.0).sqrt()));
        // mean 3: deviations 2, 0, 2
        assert_eq!(scores["mean_prior_absolute_error"].value, Some(4.0 / 3.0));
        assert!((scores["relative_absolute_error"].value.unwrap() - 0.75).abs() < 1e-12);
    }

    #[test]
    fn test_constant_target_yields_non_finite_relative_scores() {
        let observations = vec![obs(0, 2.0, 1.0), obs(1, 2.0, 3.0)];
        let scores = compute(&observations);
        assert!(!scores["relative_absolute_error"].value.unwrap().is_finite());
        assert!(scores["correlation_coefficient"].value.unwrap().is_nan());
        assert_eq!(scores["mean_absolute_error"].value, Some(1.0));
    }

    #[test]
    fn test_perfect_correlation() {
        let observations = vec![obs(0, 1.0, 2.0), obs(1, 2.0, 4.0), obs(2, 3.0, 6.0)];
        let r = compute(&observations)["correlation_coefficient"].value.unwrap();
        assert!((r - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_empty() {
        assert!(compute(&[]).is_empty());
    }
}
