use std::collections::BTreeMap;

use crate::accumulator::ClassObservation;
use crate::engine::MetricScore;
use crate::types::CostMatrix;

/// Weka-style classification scores over one accumulator.
///
/// Priors are the class frequencies of the accumulator itself. Relative errors
/// are fractions, not percentages.
pub fn compute(
    observations: &[ClassObservation],
    num_classes: usize,
    cost_matrix: Option<&CostMatrix>,
) -> BTreeMap<String, MetricScore> {
    let mut out = BTreeMap::new();
    if observations.is_empty() || num_classes == 0 {
        return out;
    }
    let n = observations.len() as f64;
    let k = num_classes as f64;

    let mut confusion = vec![vec![0usize; num_classes]; num_classes];
    for o in observations {
        confusion[o.actual][o.predicted()] += 1;
    }
    let class_counts: Vec<f64> = confusion.iter().map(|row| row.iter().sum::<usize>() as f64).collect();
    let predicted_counts: Vec<f64> = (0..num_classes)
        .map(|j| confusion.iter().map(|row| row[j]).sum::<usize>() as f64)
        .collect();
    let correct = (0..num_classes).map(|i| confusion[i][i]).sum::<usize>() as f64;

    out.insert("number_of_instances".to_string(), MetricScore::scalar(n));
    out.insert("predictive_accuracy".to_string(), MetricScore::scalar(correct / n));
    out.insert("kappa".to_string(), MetricScore::scalar(kappa(correct, &class_counts, &predicted_counts, n)));

    let priors: Vec<f64> = class_counts.iter().map(|c| c / n).collect();
    let (mut abs_err, mut sq_err, mut prior_abs, mut prior_sq) = (0.0, 0.0, 0.0, 0.0);
    for o in observations {
        for c in 0..num_classes {
            let actual = if c == o.actual { 1.0 } else { 0.0 };
            let p = o.distribution.get(c).copied().unwrap_or(0.0);
            abs_err += (p - actual).abs();
            sq_err += (p - actual).powi(2);
            prior_abs += (priors[c] - actual).abs();
            prior_sq += (priors[c] - actual).powi(2);
        }
    }
    let mae = abs_err / (n * k);
    let rmse = (sq_err / (n * k)).sqrt();
    let prior_mae = prior_abs / (n * k);
    let prior_rmse = (prior_sq / (n * k)).sqrt();
    out.insert("mean_absolute_error".to_string(), MetricScore::scalar(mae));
    out.insert("root_mean_squared_error".to_string(), MetricScore::scalar(rmse));
    out.insert("mean_prior_absolute_error".to_string(), MetricScore::scalar(prior_mae));
    out.insert("root_mean_prior_squared_error".to_string(), MetricScore::scalar(prior_rmse));
    out.insert("relative_absolute_error".to_string(), MetricScore::scalar(mae / prior_mae));
    out.insert("root_relative_squared_error".to_string(), MetricScore::scalar(rmse / prior_rmse));

    let aucs: Vec<f64> = (0..num_classes).map(|c| area_under_roc(observations, c)).collect();
    let (mut auc_sum, mut auc_weight) = (0.0, 0.0);
    for (auc, count) in aucs.iter().zip(&class_counts) {
        if auc.is_finite() {
            auc_sum += auc * count;
            auc_weight += count;
        }
    }
    out.insert("area_under_roc_curve".to_string(), MetricScore::with_array(auc_sum / auc_weight, aucs));

    let mut precision = Vec::with_capacity(num_classes);
    let mut recall = Vec::with_capacity(num_classes);
    let mut f_measure = Vec::with_capacity(num_classes);
    for c in 0..num_classes {
        let tp = confusion[c][c] as f64;
        let p = if predicted_counts[c] > 0.0 { tp / predicted_counts[c] } else { 0.0 };
        let r = if class_counts[c] > 0.0 { tp / class_counts[c] } else { 0.0 };
        let f = if p + r > 0.0 { 2.0 * p * r / (p + r) } else { 0.0 };
        precision.push(p);
        recall.push(r);
        f_measure.push(f);
    }
    for (name, per_class) in [("precision", precision), ("recall", recall), ("f_measure", f_measure)] {
        let weighted = weighted_mean(&per_class, &class_counts, n);
        out.insert(name.to_string(), MetricScore::with_array(weighted, per_class));
    }

    if let Some(cost) = cost_matrix {
        let total: f64 = observations
            .iter()
            .filter(|o| o.actual < cost.size() && o.predicted() < cost.size())
            .map(|o| cost.cost(o.actual, o.predicted()))
            .sum();
        out.insert("total_cost".to_string(), MetricScore::scalar(total));
        out.insert("average_cost".to_string(), MetricScore::scalar(total / n));
    }

    out
}

fn kappa(correct: f64, class_counts: &[f64], predicted_counts: &[f64], n: f64) -> f64 {
    let chance: f64 = class_counts
        .iter()
        .zip(predicted_counts)
        .map(|(a, p)| (a / n) * (p / n))
        .sum();
    let observed = correct / n;
    if chance < 1.0 {
        (observed - chance) / (1.0 - chance)
    } else {
        1.0
    }
}

fn weighted_mean(values: &[f64], weights: &[f64], total: f64) -> f64 {
    values.iter().zip(weights).map(|(v, w)| v * w).sum::<f64>() / total
}

/// One-vs-rest AUC of `class` via the rank-sum statistic with averaged ties.
/// NaN when the class has no positives or no negatives.
pub fn area_under_roc(observations: &[ClassObservation], class: usize) -> f64 {
    let mut scored: Vec<(f64, bool)> = observations
        .iter()
        .map(|o| (o.distribution.get(class).copied().unwrap_or(0.0), o.actual == class))
        .collect();
    let positives = scored.iter().filter(|(_, pos)| *pos).count() as f64;
    let negatives = scored.len() as f64 - positives;
    if positives == 0.0 || negatives == 0.0 {
        return f64::NAN;
    }
    scored.sort_by(|a, b| a.0.total_cmp(&b.0));

    let mut rank_sum = 0.0;
    let mut i = 0;
    while i < scored.len() {
        let mut j = i;
        while j + 1 < scored.len() && scored[j + 1].0 == scored[i].0 {
            j += 1;
        }
        // ranks are 1-based; tied block i..=j shares the mean rank
        let mean_rank = (i + j) as f64 / 2.0 + 1.0;
        rank_sum += mean_rank * scored[i..=j].iter().filter(|(_, pos)| *pos).count() as f64;
        i = j + 1;
    }
    (rank_sum - positives * (positives + 1.0) / 2.0) / (positives * negatives)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn obs(row_id: usize, actual: usize, distribution: &[f64]) -> ClassObservation {
        ClassObservation { row_id, actual, distribution: distribution.to_vec() }
    }

    fn value(scores: &BTreeMap<String, MetricScore>, name: &str) -> f64 {
        scores[name].value.unwrap()
    }

    #[test]
    fn test_perfect_binary_predictions() {
        let observations = vec![
            obs(0, 0, &[0.9, 0.1]),
            obs(1, 1, &[0.2, 0.8]),
            obs(2, 0, &[0.6, 0.4]),
            obs(3, 1, &[0.3, 0.7]),
        ];
        let scores = compute(&observations, 2, None);
        assert_eq!(value(&scores, "number_of_instances"), 4.0);
        assert_eq!(value(&scores, "predictive_accuracy"), 1.0);
        assert_eq!(value(&scores, "kappa"), 1.0);
        assert_eq!(value(&scores, "area_under_roc_curve"), 1.0);
        assert_eq!(scores["precision"].array, Some(vec![1.0, 1.0]));
        // |0.1|+|0.1| + |0.2|+|0.2| + |0.4|+|0.4| + |0.3|+|0.3| = 2.0 over 8 cells
        assert!((value(&scores, "mean_absolute_error") - 0.25).abs() < 1e-12);
        assert!(!scores.contains_key("total_cost"));
    }

    #[test]
    fn test_single_class_partition_has_undefined_auc() {
        let observations = vec![obs(0, 0, &[0.9, 0.1]), obs(1, 0, &[0.4, 0.6])];
        let scores = compute(&observations, 2, None);
        assert!(value(&scores, "area_under_roc_curve").is_nan());
        assert!(!value(&scores, "relative_absolute_error").is_finite());
        assert_eq!(value(&scores, "predictive_accuracy"), 0.5);
    }

    #[test]
    fn test_auc_with_ties() {
        // positive and negative share the same score: half credit
        let observations = vec![obs(0, 1, &[0.5, 0.5]), obs(1, 0, &[0.5, 0.5])];
        assert_eq!(area_under_roc(&observations, 1), 0.5);

        let observations = vec![
            obs(0, 1, &[0.1, 0.9]),
            obs(1, 0, &[0.6, 0.4]),
            obs(2, 1, &[0.6, 0.4]),
            obs(3, 0, &[0.8, 0.2]),
        ];
        // pairs (pos, neg): (0.9,0.4)=1 (0.9,0.2)=1 (0.4,0.4)=0.5 (0.4,0.2)=1
        assert_eq!(area_under_roc(&observations, 1), 3.5 / 4.0);
    }

    #[test]
    fn test_cost_matrix_scores() {
        let cost = CostMatrix::new(vec![vec![0.0, 1.0], vec![5.0, 0.0]]).unwrap();
        let observations = vec![
            obs(0, 0, &[0.9, 0.1]),
            obs(1, 1, &[0.8, 0.2]),
            obs(2, 0, &[0.3, 0.7]),
        ];
        let scores = compute(&observations, 2, Some(&cost));
        assert_eq!(value(&scores, "total_cost"), 6.0);
        assert_eq!(value(&scores, "average_cost"), 2.0);
    }

    #[test]
    fn test_weighted_recall_equals_accuracy() {
        let observations = vec![
            obs(0, 0, &[0.7, 0.2, 0.1]),
            obs(1, 1, &[0.7, 0.2, 0.1]),
            obs(2, 2, &[0.1, 0.1, 0.8]),
            obs(3, 2, &[0.1, 0.6, 0.3]),
        ];
        let scores = compute(&observations, 3, None);
        assert_eq!(value(&scores, "recall"), value(&scores, "predictive_accuracy"));
        assert_eq!(scores["recall"].array, Some(vec![1.0, 0.0, 0.5]));
    }
}
