use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{EvalError, Result};

/// Coordinate of one evaluation partition. `sample` is 0 unless the task is a learning curve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub struct PartitionKey {
	pub repeat: usize,
	pub fold: usize,
	pub sample: usize,
}

impl PartitionKey {
	pub fn new(repeat: usize, fold: usize, sample: usize) -> Self {
		Self { repeat, fold, sample }
	}
}

impl fmt::Display for PartitionKey {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "repeat {}, fold {}, sample {}", self.repeat, self.fold, self.sample)
	}
}

#[derive(Debug, Clone, PartialEq)]
pub enum AttributeKind {
	/// Ordered list of declared labels.
	Nominal(Vec<String>),
	Numeric,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Attribute {
	pub name: String,
	pub kind: AttributeKind,
}

impl Attribute {
	pub fn nominal<I, S>(name: impl Into<String>, values: I) -> Self
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		Self {
			name: name.into(),
			kind: AttributeKind::Nominal(values.into_iter().map(Into::into).collect()),
		}
	}

	pub fn numeric(name: impl Into<String>) -> Self {
		Self { name: name.into(), kind: AttributeKind::Numeric }
	}

	pub fn is_nominal(&self) -> bool {
		matches!(self.kind, AttributeKind::Nominal(_))
	}

	/// Declared labels; empty for numeric attributes.
	pub fn values(&self) -> &[String] {
		match &self.kind {
			AttributeKind::Nominal(values) => values,
			AttributeKind::Numeric => &[],
		}
	}
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CellValue {
	Missing,
	Numeric(f64),
	/// Index into the attribute's declared labels.
	Nominal(usize),
}

/// Ground truth of one dataset row for the selected class attribute.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Truth {
	Class(usize),
	Value(f64),
	Missing,
}

#[derive(Debug, Clone)]
pub struct Dataset {
	attributes: Vec<Attribute>,
	rows: Vec<Vec<CellValue>>,
}

impl Dataset {
	pub fn new(attributes: Vec<Attribute>, rows: Vec<Vec<CellValue>>) -> Result<Self> {
		for (idx, row) in rows.iter().enumerate() {
			if row.len() != attributes.len() {
				return Err(EvalError::schema(format!(
					"dataset row {} has {} values, schema declares {} attributes",
					idx,
					row.len(),
					attributes.len()
				)));
			}
			for (cell, attribute) in row.iter().zip(&attributes) {
				let fits = match (cell, &attribute.kind) {
					(CellValue::Missing, _) => true,
					(CellValue::Numeric(_), AttributeKind::Numeric) => true,
					(CellValue::Nominal(i), AttributeKind::Nominal(values)) => *i < values.len(),
					_ => false,
				};
				if !fits {
					return Err(EvalError::schema(format!(
						"dataset row {} holds {:?} for attribute {}",
						idx, cell, attribute.name
					)));
				}
			}
		}
		Ok(Self { attributes, rows })
	}

	pub fn num_instances(&self) -> usize {
		self.rows.len()
	}

	pub fn attributes(&self) -> &[Attribute] {
		&self.attributes
	}

	pub fn attribute(&self, name: &str) -> Option<(usize, &Attribute)> {
		self.attributes.iter().enumerate().find(|(_, a)| a.name == name)
	}

	/// Locates the class attribute by name.
	pub fn class_attribute(&self, target: &str) -> Result<(usize, &Attribute)> {
		self.attribute(target)
			.ok_or_else(|| EvalError::schema(format!("Class attribute ({target}) not found")))
	}

	/// Row-indexed true values of the attribute at `column`.
	pub fn truths(&self, column: usize) -> Vec<Truth> {
		self.rows
			.iter()
			.map(|row| match row.get(column) {
				Some(CellValue::Nominal(i)) => Truth::Class(*i),
				Some(CellValue::Numeric(v)) => Truth::Value(*v),
				_ => Truth::Missing,
			})
			.collect()
	}
}

/// Authoritative list of expected test predictions: one `(partition, row_id)` pair each.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SplitAssignment {
	entries: Vec<(PartitionKey, usize)>,
}

impl SplitAssignment {
	pub fn new(entries: Vec<(PartitionKey, usize)>) -> Self {
		Self { entries }
	}

	pub fn push(&mut self, key: PartitionKey, row_id: usize) {
		self.entries.push((key, row_id));
	}

	pub fn entries(&self) -> &[(PartitionKey, usize)] {
		&self.entries
	}

	pub fn len(&self) -> usize {
		self.entries.len()
	}

	pub fn is_empty(&self) -> bool {
		self.entries.is_empty()
	}
}

impl FromIterator<(PartitionKey, usize)> for SplitAssignment {
	fn from_iter<T: IntoIterator<Item = (PartitionKey, usize)>>(iter: T) -> Self {
		Self { entries: iter.into_iter().collect() }
	}
}

#[derive(Debug, Clone, PartialEq)]
pub enum PredictedValue {
	Value(f64),
	/// Confidence per class, in the class attribute's label order.
	Distribution(Vec<f64>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct PredictionRecord {
	pub row_id: usize,
	pub key: PartitionKey,
	pub predicted: PredictedValue,
}

impl PredictionRecord {
	pub fn value(row_id: usize, key: PartitionKey, value: f64) -> Self {
		Self { row_id, key, predicted: PredictedValue::Value(value) }
	}

	pub fn distribution(row_id: usize, key: PartitionKey, confidences: Vec<f64>) -> Self {
		Self { row_id, key, predicted: PredictedValue::Distribution(confidences) }
	}
}

/// Square misclassification cost matrix, indexed `[actual][predicted]`.
#[derive(Debug, Clone, PartialEq)]
pub struct CostMatrix {
	size: usize,
	cells: Vec<f64>,
}

impl CostMatrix {
	pub fn new(rows: Vec<Vec<f64>>) -> Result<Self> {
		let size = rows.len();
		if size == 0 {
			return Err(EvalError::schema("cost matrix is empty"));
		}
		let mut cells = Vec::with_capacity(size * size);
		for (i, row) in rows.into_iter().enumerate() {
			if row.len() != size {
				return Err(EvalError::schema(format!(
					"cost matrix row {} has {} entries, expected {}",
					i,
					row.len(),
					size
				)));
			}
			cells.extend(row);
		}
		Ok(Self { size, cells })
	}

	pub fn size(&self) -> usize {
		self.size
	}

	pub fn cost(&self, actual: usize, predicted: usize) -> f64 {
		self.cells[actual * self.size + predicted]
	}
}

/// Estimation procedure of the benchmark task. Only bootstrap variants change the aggregation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EstimationProcedure {
	#[default]
	#[serde(alias = "cross_validation")]
	Crossvalidation,
	Holdout,
	Leaveoneout,
	#[serde(alias = "learning_curve")]
	Learningcurve,
	#[serde(alias = "bootstrap")]
	Bootstrapping,
	Subsampling,
	TestOnTrainingData,
	CustomHoldout,
}

impl EstimationProcedure {
	pub fn is_bootstrap(&self) -> bool {
		matches!(self, EstimationProcedure::Bootstrapping)
	}

	/// Number of replicate accumulators kept per partition.
	pub fn bootstrap_width(&self) -> usize {
		if self.is_bootstrap() {
			2
		} else {
			1
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_dataset_rejects_bad_nominal_index() {
		let attrs = vec![Attribute::nominal("class", ["yes", "no"])];
		let err = Dataset::new(attrs, vec![vec![CellValue::Nominal(2)]]).unwrap_err();
		assert!(matches!(err, EvalError::Schema(_)));
	}

	#[test]
	fn test_class_attribute_lookup() {
		let attrs = vec![Attribute::numeric("x"), Attribute::nominal("class", ["a", "b"])];
		let rows = vec![
			vec![CellValue::Numeric(1.0), CellValue::Nominal(1)],
			vec![CellValue::Missing, CellValue::Missing],
		];
		let dataset = Dataset::new(attrs, rows).unwrap();
		let (idx, attr) = dataset.class_attribute("class").unwrap();
		assert_eq!(idx, 1);
		assert_eq!(attr.values(), ["a", "b"]);
		assert_eq!(dataset.truths(idx), vec![Truth::Class(1), Truth::Missing]);

		let err = dataset.class_attribute("label").unwrap_err();
		assert_eq!(err.to_string(), "schema error: Class attribute (label) not found");
	}

	#[test]
	fn test_cost_matrix_must_be_square() {
		assert!(CostMatrix::new(vec![vec![0.0, 1.0], vec![1.0]]).is_err());
		let m = CostMatrix::new(vec![vec![0.0, 1.0], vec![5.0, 0.0]]).unwrap();
		assert_eq!(m.size(), 2);
		assert_eq!(m.cost(1, 0), 5.0);
	}

	#[test]
	fn test_estimation_procedure_names() {
		let p: EstimationProcedure = serde_yaml::from_str("bootstrap").unwrap();
		assert_eq!(p.bootstrap_width(), 2);
		let p: EstimationProcedure = serde_yaml::from_str("crossvalidation").unwrap();
		assert_eq!(p.bootstrap_width(), 1);
	}
}
