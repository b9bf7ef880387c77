use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use predeval_core::config::{DataSection, TaskSection};
use predeval_core::persist::record_outcome;
use predeval_core::report::{generate_html_report, generate_json_report};
use predeval_core::{load_inputs, EstimationProcedure, Evaluation, EvaluationConfig};
use predeval_store::Store;
use serde_json::json;

#[derive(Debug, Parser)]
#[command(name = "predeval", about = "Validate and score benchmark prediction submissions")]
struct Cli {
	#[command(subcommand)]
	command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
	Run(RunArgs),
}

#[derive(Debug, Clone, Parser)]
struct RunArgs {
	/// YAML config with `task` and `data` sections. Flags below override its values.
	#[arg(long)]
	config: Option<PathBuf>,

	/// Dataset CSV (path or http(s) URL)
	#[arg(long)]
	dataset: Option<String>,

	/// Split assignment CSV: rowid, repeat, fold, optional sample and type
	#[arg(long)]
	splits: Option<String>,

	/// Prediction CSV: row_id, repeat, fold, prediction, confidence.<class>
	#[arg(long)]
	predictions: Option<String>,

	/// Class attribute of the dataset
	#[arg(long)]
	target: Option<String>,

	/// Estimation procedure: crossvalidation, holdout, learningcurve, bootstrapping, ...
	#[arg(long)]
	estimation: Option<String>,

	/// Comma-separated nominal class labels in class order
	#[arg(long, value_delimiter = ',')]
	class_values: Option<Vec<String>>,

	/// Output JSON result to a file
	#[arg(long)]
	json_out: Option<PathBuf>,

	/// Output HTML report to a file
	#[arg(long)]
	html_out: Option<PathBuf>,

	/// Record the outcome in this SQLite database
	#[arg(long)]
	db: Option<PathBuf>,

	/// Name stored with the outcome in --db
	#[arg(long, default_value = "submission")]
	name: String,
}

#[tokio::main]
async fn main() -> ExitCode {
	env_logger::init();
	let cli = Cli::parse();
	let result = match cli.command {
		Commands::Run(args) => run(args).await,
	};
	match result {
		Ok(code) => code,
		Err(err) => {
			log::error!("{:#}", err);
			eprintln!("error: {:#}", err);
			ExitCode::FAILURE
		}
	}
}

fn resolve_config(args: &RunArgs) -> Result<EvaluationConfig> {
	let mut config = match &args.config {
		Some(path) => EvaluationConfig::load(path)?,
		None => {
			let missing = |flag: &str| anyhow::anyhow!("--{} is required without --config", flag);
			EvaluationConfig {
				task: TaskSection {
					target: args.target.clone().ok_or_else(|| missing("target"))?,
					class_values: None,
					estimation_procedure: EstimationProcedure::default(),
					cost_matrix: None,
				},
				data: DataSection {
					dataset: args.dataset.clone().ok_or_else(|| missing("dataset"))?,
					splits: args.splits.clone().ok_or_else(|| missing("splits"))?,
					predictions: args.predictions.clone().ok_or_else(|| missing("predictions"))?,
				},
			}
		}
	};

	if let Some(target) = &args.target {
		config.task.target = target.clone();
	}
	if let Some(values) = &args.class_values {
		config.task.class_values = Some(values.clone());
	}
	if let Some(estimation) = &args.estimation {
		config.task.estimation_procedure = serde_json::from_value(json!(estimation))
			.with_context(|| format!("Unknown estimation procedure '{}'", estimation))?;
	}
	if let Some(dataset) = &args.dataset {
		config.data.dataset = dataset.clone();
	}
	if let Some(splits) = &args.splits {
		config.data.splits = splits.clone();
	}
	if let Some(predictions) = &args.predictions {
		config.data.predictions = predictions.clone();
	}
	Ok(config)
}

async fn run(args: RunArgs) -> Result<ExitCode> {
	let config = resolve_config(&args)?;
	let inputs = load_inputs(&config.data, &config.task.target, config.task.class_values.as_deref()).await?;

	let evaluation = Evaluation::builder()
		.dataset(inputs.dataset)
		.target(config.task.target.clone())
		.splits(inputs.splits)
		.predictions(inputs.predictions)
		.estimation_procedure(config.task.estimation_procedure)
		.cost_matrix(config.cost_matrix()?)
		.build()?;

	let outcome = evaluation.run();

	if let Some(db) = &args.db {
		let store = Store::open(db).with_context(|| format!("Failed to open store {:?}", db))?;
		let run_id = store.create_run(Some(json!({
			"dataset": config.data.dataset,
			"splits": config.data.splits,
			"predictions": config.data.predictions,
			"estimation_procedure": config.task.estimation_procedure,
		})))?;
		let id = record_outcome(&store, run_id, &args.name, &outcome)?;
		log::info!("recorded evaluation {} in {:?}", id, db);
	}

	let report = match outcome {
		Ok(report) => report,
		Err(err) => {
			log::error!("evaluation failed ({}): {}", err.kind(), err);
			eprintln!("evaluation failed: {}", err);
			return Ok(ExitCode::FAILURE);
		}
	};

	println!("{}", report.summary_table());

	if let Some(path) = &args.json_out {
		tokio::fs::write(path, generate_json_report(&report)?).await?;
	}
	if let Some(path) = &args.html_out {
		tokio::fs::write(path, generate_html_report(&report)).await?;
	}

	Ok(ExitCode::SUCCESS)
}
