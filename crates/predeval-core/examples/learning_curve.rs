use predeval_core::{
    Attribute, CellValue, Dataset, Evaluation, EstimationProcedure, MetricScope, PartitionKey,
    SplitAssignment, Table,
};

/// Two folds, each scored at two training-set sizes. Only the last sample of
/// each fold counts toward the global scores.
fn main() -> anyhow::Result<()> {
    let labels = [0, 1, 0, 1, 1, 0];
    let rows = labels
        .iter()
        .enumerate()
        .map(|(i, l)| vec![CellValue::Numeric(i as f64), CellValue::Nominal(*l)])
        .collect();
    let dataset = Dataset::new(
        vec![Attribute::numeric("x"), Attribute::nominal("class", ["a", "b"])],
        rows,
    )?;

    let mut splits = SplitAssignment::default();
    let mut predictions = Vec::new();
    for sample in 0..2 {
        for row in 0..6usize {
            let fold = row % 2;
            splits.push(PartitionKey::new(0, fold, sample), row);
            // the larger sample predicts better
            let correct = sample == 1 || row % 3 != 0;
            let p_a = if (labels[row] == 0) == correct { 0.8 } else { 0.2 };
            predictions.push(vec![
                row.to_string(),
                fold.to_string(),
                sample.to_string(),
                p_a.to_string(),
                (1.0 - p_a).to_string(),
            ]);
        }
    }

    let report = Evaluation::builder()
        .dataset(dataset)
        .target("class")
        .splits(splits)
        .predictions(Table::from_rows(
            ["row_id", "fold", "sample", "confidence.a", "confidence.b"].map(String::from),
            predictions,
        ))
        .estimation_procedure(EstimationProcedure::Learningcurve)
        .build()?
        .run()?;

    println!("{}", report.summary_table());
    for scope in report.partitions() {
        if let (MetricScope::Sample { .. }, Some(acc)) = (scope, report.find("predictive_accuracy", &scope)) {
            println!("{}: accuracy {}", scope, acc.value);
        }
    }
    Ok(())
}
