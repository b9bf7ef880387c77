/// Header plus string cells, as delivered by a table source. `None` marks a missing value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Option<String>>>,
}

impl Table {
    pub fn new(columns: Vec<String>, rows: Vec<Vec<Option<String>>>) -> Self {
        Self { columns, rows }
    }

    /// Builds a table from string literals; empty strings and `?` become missing.
    pub fn from_rows<C, R, S>(columns: C, rows: R) -> Self
    where
        C: IntoIterator<Item = S>,
        R: IntoIterator,
        R::Item: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let columns = columns.into_iter().map(Into::into).collect();
        let rows = rows
            .into_iter()
            .map(|row| row.into_iter().map(|cell| missing_to_none(cell.into())).collect())
            .collect();
        Self { columns, rows }
    }

    /// Index of the first column whose name is one of `names`, tried in order.
    pub fn column(&self, names: &[&str]) -> Option<usize> {
        column_index(&self.columns, names)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

pub fn column_index(columns: &[String], names: &[&str]) -> Option<usize> {
    names
        .iter()
        .find_map(|name| columns.iter().position(|c| c == name))
}

/// Largest row, repeat, fold or sample index accepted from a table.
pub const MAX_INDEX: usize = u32::MAX as usize;

/// Parses a non-negative integer index up to [`MAX_INDEX`]. Numeric formats
/// such as `3.0` are accepted.
pub fn parse_index(raw: &str) -> Option<usize> {
    let value: f64 = raw.parse().ok()?;
    if !value.is_finite() || value < 0.0 || value.fract() != 0.0 || value > MAX_INDEX as f64 {
        return None;
    }
    Some(value as usize)
}

pub(crate) fn missing_to_none(cell: String) -> Option<String> {
    let trimmed = cell.trim();
    if trimmed.is_empty() || trimmed == "?" {
        None
    } else {
        Some(trimmed.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_rows_marks_missing() {
        let t = Table::from_rows(["row_id", "prediction"], [["0", "yes"], ["1", "?"], ["2", " "]]);
        assert_eq!(t.len(), 3);
        assert_eq!(t.rows[0][1].as_deref(), Some("yes"));
        assert_eq!(t.rows[1][1], None);
        assert_eq!(t.rows[2][1], None);
    }

    #[test]
    fn test_parse_index() {
        assert_eq!(parse_index("5"), Some(5));
        assert_eq!(parse_index("5.0"), Some(5));
        for bad in ["-1", "2.5", "1e30", "inf", "NaN", "x"] {
            assert_eq!(parse_index(bad), None, "{bad}");
        }
        assert_eq!(parse_index(&MAX_INDEX.to_string()), Some(MAX_INDEX));
    }

    #[test]
    fn test_column_alias_order() {
        let t = Table::from_rows(["repeat_nr", "fold"], Vec::<Vec<&str>>::new());
        assert_eq!(t.column(&["repeat", "repeat_nr"]), Some(0));
        assert_eq!(t.column(&["fold", "fold_nr"]), Some(1));
        assert_eq!(t.column(&["sample", "sample_nr"]), None);
    }
}
