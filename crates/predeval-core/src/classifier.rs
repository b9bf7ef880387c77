//! Decides what kind of task a submission is from the shape of its schemas.

use predeval_types::TaskKind;

use crate::error::Result;
use crate::types::Dataset;

/// Column names that mark a prediction table as a learning curve.
pub const SAMPLE_COLUMNS: [&str; 2] = ["sample", "sample_nr"];

/// Numeric class ⇒ regression; nominal class ⇒ classification, or learning
/// curve when the predictions carry a sample column.
pub fn classify<S: AsRef<str>>(dataset: &Dataset, target: &str, prediction_columns: &[S]) -> Result<TaskKind> {
    let (_, class_attribute) = dataset.class_attribute(target)?;
    if !class_attribute.is_nominal() {
        return Ok(TaskKind::Regression);
    }
    let has_sample = prediction_columns
        .iter()
        .any(|c| SAMPLE_COLUMNS.contains(&c.as_ref()));
    Ok(if has_sample {
        TaskKind::LearningCurve
    } else {
        TaskKind::Classification
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::EvalError;
    use crate::types::{Attribute, Dataset};

    fn dataset(class: Attribute) -> Dataset {
        Dataset::new(vec![Attribute::numeric("x"), class], Vec::new()).unwrap()
    }

    #[test]
    fn test_numeric_class_is_regression() {
        let ds = dataset(Attribute::numeric("y"));
        // a sample column does not turn regression into a learning curve
        let kind = classify(&ds, "y", &["row_id", "sample", "prediction"]).unwrap();
        assert_eq!(kind, TaskKind::Regression);
    }

    #[test]
    fn test_nominal_class() {
        let ds = dataset(Attribute::nominal("class", ["yes", "no"]));
        let cols = ["row_id", "fold", "confidence.yes", "confidence.no"];
        assert_eq!(classify(&ds, "class", &cols).unwrap(), TaskKind::Classification);

        let cols = ["row_id", "fold", "sample_nr", "confidence.yes", "confidence.no"];
        assert_eq!(classify(&ds, "class", &cols).unwrap(), TaskKind::LearningCurve);
    }

    #[test]
    fn test_missing_class_attribute() {
        let ds = dataset(Attribute::nominal("class", ["yes", "no"]));
        let err = classify(&ds, "target", &["row_id"]).unwrap_err();
        assert!(matches!(err, EvalError::Schema(_)));
    }
}
