use predeval_core::{
    datasource::{parse_csv, dataset_from_table, splits_from_table},
    load_inputs, EvaluationConfig, Evaluation, Table,
};

const DATASET: &str = "outlook,temperature,play
sunny,85,no
sunny,80,no
overcast,83,yes
rainy,70,yes
rainy,68,yes
rainy,65,no
overcast,64,yes
sunny,72,no
";

const SPLITS: &str = "type,rowid,repeat,fold
TEST,0,0,0
TEST,1,0,1
TEST,2,0,0
TEST,3,0,1
TEST,4,0,0
TEST,5,0,1
TEST,6,0,0
TEST,7,0,1
";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Example 1: Inline tables
    let dataset = dataset_from_table(&parse_csv(DATASET)?, "play", None)?;
    let splits = splits_from_table(&parse_csv(SPLITS)?)?;
    let predictions = Table::from_rows(
        ["row_id", "fold", "prediction", "confidence.no", "confidence.yes"],
        [
            ["0", "0", "no", "0.8", "0.2"],
            ["1", "1", "no", "0.6", "0.4"],
            ["2", "0", "yes", "0.1", "0.9"],
            ["3", "1", "yes", "0.3", "0.7"],
            ["4", "0", "no", "0.55", "0.45"],
            ["5", "1", "no", "0.7", "0.3"],
            ["6", "0", "yes", "0.2", "0.8"],
            ["7", "1", "yes", "0.4", "0.6"],
        ],
    );

    let report = Evaluation::builder()
        .dataset(dataset)
        .target("play")
        .splits(splits)
        .predictions(predictions)
        .build()?
        .run()?;
    println!("{}", report.summary_table());

    // Example 2: Load tables from a YAML config if provided
    if let Some(path) = std::env::args().nth(1) {
        let config = EvaluationConfig::load(path)?;
        let inputs = load_inputs(&config.data, &config.task.target, config.task.class_values.as_deref()).await?;
        let report = Evaluation::builder()
            .dataset(inputs.dataset)
            .target(config.task.target.clone())
            .splits(inputs.splits)
            .predictions(inputs.predictions)
            .estimation_procedure(config.task.estimation_procedure)
            .cost_matrix(config.cost_matrix()?)
            .build()?
            .run()?;
        println!("{}", report.summary_table());
    }

    Ok(())
}
