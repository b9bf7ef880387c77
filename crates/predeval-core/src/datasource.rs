use std::path::PathBuf;

use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;

use crate::classifier::SAMPLE_COLUMNS;
use crate::config::{is_url, DataSection};
use crate::layout::{FOLD_COLUMNS, REPEAT_COLUMNS};
use crate::table::{column_index, missing_to_none, parse_index, Table};
use crate::types::{Attribute, AttributeKind, CellValue, Dataset, PartitionKey, SplitAssignment};

const SPLIT_ROW_COLUMNS: [&str; 2] = ["rowid", "row_id"];
const SPLIT_TYPE_COLUMNS: [&str; 1] = ["type"];

#[async_trait]
pub trait TableSource: Send + Sync {
    async fn load(&self) -> Result<Table>;
}

pub struct VecTableSource {
    table: Table,
}

impl VecTableSource {
    pub fn new(table: Table) -> Self {
        Self { table }
    }
}

#[async_trait]
impl TableSource for VecTableSource {
    async fn load(&self) -> Result<Table> {
        Ok(self.table.clone())
    }
}

/// CSV file with a header row.
pub struct CsvFileSource {
    path: PathBuf,
}

impl CsvFileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl TableSource for CsvFileSource {
    async fn load(&self) -> Result<Table> {
        let content = tokio::fs::read_to_string(&self.path)
            .await
            .with_context(|| format!("Failed to read {:?}", self.path))?;
        parse_csv(&content).with_context(|| format!("Invalid CSV in {:?}", self.path))
    }
}

pub struct HttpCsvSource {
    url: String,
    client: reqwest::Client,
}

impl HttpCsvSource {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl TableSource for HttpCsvSource {
    async fn load(&self) -> Result<Table> {
        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .with_context(|| format!("Failed to fetch {}", self.url))?
            .error_for_status()
            .with_context(|| format!("Bad status from {}", self.url))?;
        let body = response.text().await?;
        parse_csv(&body).with_context(|| format!("Invalid CSV from {}", self.url))
    }
}

pub fn source_for(location: &str) -> Box<dyn TableSource> {
    if is_url(location) {
        Box::new(HttpCsvSource::new(location))
    } else {
        Box::new(CsvFileSource::new(location))
    }
}

pub fn parse_csv(content: &str) -> Result<Table> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(content.as_bytes());
    let columns: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();
    let mut rows = Vec::new();
    for (idx, record) in reader.records().enumerate() {
        let record = record.with_context(|| format!("Malformed CSV record {}", idx + 1))?;
        if record.len() != columns.len() {
            bail!(
                "CSV record {} has {} fields, header has {}",
                idx + 1,
                record.len(),
                columns.len()
            );
        }
        rows.push(record.iter().map(|cell| missing_to_none(cell.to_string())).collect());
    }
    Ok(Table::new(columns, rows))
}

/// Builds a dataset from a raw table. The target column is nominal over
/// `class_values` when given; every other column, and the target otherwise,
/// is numeric when all present values parse as numbers and nominal over its
/// sorted distinct labels otherwise.
pub fn dataset_from_table(table: &Table, target: &str, class_values: Option<&[String]>) -> Result<Dataset> {
    if column_index(&table.columns, &[target]).is_none() {
        bail!("Class attribute ({}) not found in dataset columns", target);
    }

    let mut attributes = Vec::with_capacity(table.columns.len());
    for (col, name) in table.columns.iter().enumerate() {
        let cells = table.rows.iter().map(|row| row.get(col).and_then(Option::as_deref));
        let attribute = match class_values {
            Some(values) if name == target => Attribute::nominal(name.as_str(), values.iter().cloned()),
            _ => infer_attribute(name, cells),
        };
        attributes.push(attribute);
    }

    let mut rows = Vec::with_capacity(table.len());
    for (line, row) in table.rows.iter().enumerate() {
        let mut values = Vec::with_capacity(attributes.len());
        for (col, attribute) in attributes.iter().enumerate() {
            let cell = row.get(col).and_then(Option::as_deref);
            values.push(cell_value(attribute, cell).with_context(|| format!("dataset row {}", line))?);
        }
        rows.push(values);
    }

    Ok(Dataset::new(attributes, rows)?)
}

fn infer_attribute<'a>(name: &str, cells: impl Iterator<Item = Option<&'a str>> + Clone) -> Attribute {
    if cells.clone().flatten().all(|c| c.parse::<f64>().is_ok()) {
        return Attribute::numeric(name);
    }
    let mut labels: Vec<&str> = cells.flatten().collect();
    labels.sort_unstable();
    labels.dedup();
    Attribute::nominal(name, labels)
}

fn cell_value(attribute: &Attribute, cell: Option<&str>) -> Result<CellValue> {
    let Some(raw) = cell else {
        return Ok(CellValue::Missing);
    };
    match &attribute.kind {
        AttributeKind::Numeric => raw
            .parse::<f64>()
            .map(CellValue::Numeric)
            .map_err(|_| anyhow!("{} holds non-numeric value '{}'", attribute.name, raw)),
        AttributeKind::Nominal(values) => values
            .iter()
            .position(|v| v == raw)
            .map(CellValue::Nominal)
            .ok_or_else(|| anyhow!("{} holds unknown label '{}'", attribute.name, raw)),
    }
}

/// Reads the split table. When a `type` column exists only TEST rows count.
pub fn splits_from_table(table: &Table) -> Result<SplitAssignment> {
    let row_col = column_index(&table.columns, &SPLIT_ROW_COLUMNS)
        .ok_or_else(|| anyhow!("split table has no rowid column"))?;
    let repeat_col = column_index(&table.columns, &REPEAT_COLUMNS);
    let fold_col = column_index(&table.columns, &FOLD_COLUMNS);
    let sample_col = column_index(&table.columns, &SAMPLE_COLUMNS);
    let type_col = column_index(&table.columns, &SPLIT_TYPE_COLUMNS);

    let mut splits = SplitAssignment::default();
    for (line, row) in table.rows.iter().enumerate() {
        if let Some(col) = type_col {
            let is_test = row
                .get(col)
                .and_then(Option::as_deref)
                .map_or(false, |t| t.eq_ignore_ascii_case("test"));
            if !is_test {
                continue;
            }
        }
        let index = |col: Option<usize>| -> Result<usize> {
            match col.and_then(|c| row.get(c)).and_then(Option::as_deref) {
                None => Ok(0),
                Some(raw) => index_value(raw).with_context(|| format!("split row {}", line)),
            }
        };
        let row_id = match row.get(row_col).and_then(Option::as_deref) {
            Some(raw) => index_value(raw).with_context(|| format!("split row {}", line))?,
            None => bail!("split row {} has no rowid", line),
        };
        let key = PartitionKey::new(index(repeat_col)?, index(fold_col)?, index(sample_col)?);
        splits.push(key, row_id);
    }
    Ok(splits)
}

fn index_value(raw: &str) -> Result<usize> {
    parse_index(raw).ok_or_else(|| anyhow!("'{}' is not a non-negative integer index", raw))
}

/// Everything an evaluation needs, loaded from the data section.
pub struct LoadedInputs {
    pub dataset: Dataset,
    pub splits: SplitAssignment,
    pub predictions: Table,
}

/// Fetches the three tables concurrently, then converts them.
pub async fn load_inputs(
    data: &DataSection,
    target: &str,
    class_values: Option<&[String]>,
) -> Result<LoadedInputs> {
    let dataset_source = source_for(&data.dataset);
    let splits_source = source_for(&data.splits);
    let predictions_source = source_for(&data.predictions);
    let (dataset, splits, predictions) = futures::try_join!(
        dataset_source.load(),
        splits_source.load(),
        predictions_source.load()
    )?;
    log::debug!(
        "loaded {} dataset rows, {} split rows, {} prediction rows",
        dataset.len(),
        splits.len(),
        predictions.len()
    );

    Ok(LoadedInputs {
        dataset: dataset_from_table(&dataset, target, class_values)
            .with_context(|| format!("Failed to read dataset {}", data.dataset))?,
        splits: splits_from_table(&splits)
            .with_context(|| format!("Failed to read splits {}", data.splits))?,
        predictions,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_csv_marks_missing() {
        let table = parse_csv("row_id,prediction\n0, yes\n1,?\n2,\n").unwrap();
        assert_eq!(table.columns, vec!["row_id", "prediction"]);
        assert_eq!(table.rows[0][1].as_deref(), Some("yes"));
        assert_eq!(table.rows[1][1], None);
        assert_eq!(table.rows[2][1], None);
    }

    #[test]
    fn test_dataset_type_inference() {
        let table = parse_csv("x,class\n1.5,no\n2,yes\n?,no\n").unwrap();
        let dataset = dataset_from_table(&table, "class", None).unwrap();
        let (_, class) = dataset.class_attribute("class").unwrap();
        assert_eq!(class.values(), ["no", "yes"]);
        assert!(!dataset.attributes()[0].is_nominal());
        assert_eq!(dataset.num_instances(), 3);
    }

    #[test]
    fn test_dataset_class_values_override_order() {
        let table = parse_csv("class\nno\nyes\n").unwrap();
        let values = vec!["yes".to_string(), "no".to_string()];
        let dataset = dataset_from_table(&table, "class", Some(&values)).unwrap();
        assert_eq!(dataset.class_attribute("class").unwrap().1.values(), ["yes", "no"]);

        let unknown = parse_csv("class\nmaybe\n").unwrap();
        assert!(dataset_from_table(&unknown, "class", Some(&values)).is_err());
    }

    #[test]
    fn test_dataset_missing_target() {
        let table = parse_csv("x\n1\n").unwrap();
        assert!(dataset_from_table(&table, "class", None).is_err());
    }

    #[test]
    fn test_splits_keep_only_test_rows() {
        let table = parse_csv("type,rowid,repeat,fold\nTRAIN,0,0,0\nTEST,1,0,0\ntest,0,0,1\nTRAIN,1,0,1\n").unwrap();
        let splits = splits_from_table(&table).unwrap();
        assert_eq!(
            splits.entries(),
            &[(PartitionKey::new(0, 0, 0), 1), (PartitionKey::new(0, 1, 0), 0)]
        );
    }

    #[test]
    fn test_splits_without_type_column_use_every_row() {
        let table = parse_csv("row_id,fold_nr,sample_nr\n0,0,0\n1,0,1\n").unwrap();
        let splits = splits_from_table(&table).unwrap();
        assert_eq!(splits.len(), 2);
        assert_eq!(splits.entries()[1].0, PartitionKey::new(0, 0, 1));
    }

    #[test]
    fn test_splits_reject_oversized_index() {
        let table = parse_csv("rowid,fold\n0,1e30\n").unwrap();
        let err = splits_from_table(&table).unwrap_err();
        assert!(format!("{:#}", err).contains("'1e30' is not a non-negative integer index"));
    }

    #[tokio::test]
    async fn test_vec_source_round_trip() {
        let table = Table::from_rows(["row_id"], [["0"]]);
        let loaded = VecTableSource::new(table.clone()).load().await.unwrap();
        assert_eq!(loaded, table);
    }

    #[tokio::test]
    async fn test_csv_file_source_missing_file() {
        let err = CsvFileSource::new("/nonexistent/predictions.csv").load().await.unwrap_err();
        assert!(err.to_string().contains("Failed to read"));
    }

    #[tokio::test]
    async fn test_load_inputs_from_files() {
        let dir = std::env::temp_dir().join(format!("predeval-load-{}", std::process::id()));
        tokio::fs::create_dir_all(&dir).await.unwrap();
        let write = |name: &str, body: &str| {
            let path = dir.join(name);
            std::fs::write(&path, body).unwrap();
            path.to_string_lossy().into_owned()
        };
        let data = DataSection {
            dataset: write("dataset.csv", "x,class\n1,yes\n2,no\n"),
            splits: write("splits.csv", "rowid,fold\n0,0\n1,0\n"),
            predictions: write("predictions.csv", "row_id,confidence.no,confidence.yes\n0,0,1\n1,1,0\n"),
        };
        let inputs = load_inputs(&data, "class", None).await.unwrap();
        assert_eq!(inputs.dataset.num_instances(), 2);
        assert_eq!(inputs.splits.len(), 2);
        assert_eq!(inputs.predictions.len(), 2);
        std::fs::remove_dir_all(&dir).unwrap();
    }
}
