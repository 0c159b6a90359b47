use std::{cmp::Ordering, fmt};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Declared or inferred type of a table column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ColumnType {
    Integer,
    Float,
    Date,
    Text,
}

impl ColumnType {
    /// Infers the narrowest type able to hold every non-empty cell.
    ///
    /// A column with no non-empty cell is `Text`.
    pub fn infer<'a>(cells: impl IntoIterator<Item = &'a str>) -> ColumnType {
        let mut integer = true;
        let mut float = true;
        let mut date = true;
        let mut seen = false;

        for cell in cells.into_iter().filter(|c| !c.is_empty()) {
            seen = true;
            integer &= cell.parse::<i64>().is_ok();
            float &= cell.parse::<f64>().is_ok();
            date &= NaiveDate::parse_from_str(cell, DATE_FORMAT).is_ok();
            if !(integer || float || date) {
                break;
            }
        }

        match (seen, integer, float, date) {
            (false, ..) => ColumnType::Text,
            (true, true, _, _) => ColumnType::Integer,
            (true, false, true, _) => ColumnType::Float,
            (true, false, false, true) => ColumnType::Date,
            _ => ColumnType::Text,
        }
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, ColumnType::Integer | ColumnType::Float)
    }
}

/// A single table cell.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Value {
    Null,
    Integer(i64),
    Float(f64),
    Date(NaiveDate),
    Text(String),
}

impl Value {
    /// Parses a raw cell as the given column type; empty cells become `Null`.
    ///
    /// A cell that does not match the type is kept as `Text` so that a
    /// declared type never drops data.
    pub fn parse(raw: &str, column_type: ColumnType) -> Value {
        if raw.is_empty() {
            return Value::Null;
        }

        let parsed = match column_type {
            ColumnType::Integer => raw.parse().ok().map(Value::Integer),
            ColumnType::Float => raw.parse().ok().map(Value::Float),
            ColumnType::Date => NaiveDate::parse_from_str(raw, DATE_FORMAT)
                .ok()
                .map(Value::Date),
            ColumnType::Text => None,
        };

        parsed.unwrap_or_else(|| Value::Text(raw.to_string()))
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Numeric value of integers and floats; `None` for anything else.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Integer(v) => Some(*v as f64),
            Value::Float(v) => Some(*v),
            _ => None,
        }
    }

    /// Key used for joins, grouping and duplicate detection.
    pub fn key(&self) -> Option<String> {
        match self {
            Value::Null => None,
            other => Some(other.to_string()),
        }
    }

    fn rank(&self) -> u8 {
        match self {
            Value::Null => 0,
            Value::Integer(_) | Value::Float(_) => 1,
            Value::Date(_) => 2,
            Value::Text(_) => 3,
        }
    }

    /// Total order used when sorting grouped results: nulls first, then
    /// numbers, dates and text.
    pub fn compare(&self, other: &Value) -> Ordering {
        match (self, other) {
            (Value::Date(a), Value::Date(b)) => a.cmp(b),
            (Value::Text(a), Value::Text(b)) => a.cmp(b),
            (a, b) if a.rank() == 1 && b.rank() == 1 => {
                let (a, b) = (a.as_f64().unwrap_or(0.0), b.as_f64().unwrap_or(0.0));
                a.partial_cmp(&b).unwrap_or(Ordering::Equal)
            }
            (a, b) => a.rank().cmp(&b.rank()),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => Ok(()),
            Value::Integer(v) => write!(f, "{}", v),
            Value::Float(v) => write!(f, "{}", v),
            Value::Date(v) => write!(f, "{}", v.format(DATE_FORMAT)),
            Value::Text(v) => f.write_str(v),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn infers_integer_float_date_and_text() {
        assert_eq!(ColumnType::infer(["1", "2", ""]), ColumnType::Integer);
        assert_eq!(ColumnType::infer(["1", "2.5"]), ColumnType::Float);
        assert_eq!(
            ColumnType::infer(["2025-01-03", "2025-02-01"]),
            ColumnType::Date
        );
        assert_eq!(ColumnType::infer(["12", "twelve"]), ColumnType::Text);
        assert_eq!(ColumnType::infer(["", ""]), ColumnType::Text);
    }

    #[test]
    fn parse_keeps_mismatched_cells_as_text() {
        assert_eq!(Value::parse("", ColumnType::Integer), Value::Null);
        assert_eq!(Value::parse("42", ColumnType::Integer), Value::Integer(42));
        assert_eq!(
            Value::parse("n/a", ColumnType::Float),
            Value::Text("n/a".to_string())
        );
    }

    #[test]
    fn compare_orders_dates_and_numbers() {
        let early = Value::parse("2025-01-02", ColumnType::Date);
        let late = Value::parse("2025-01-10", ColumnType::Date);

        assert_eq!(early.compare(&late), Ordering::Less);
        assert_eq!(
            Value::Integer(3).compare(&Value::Float(2.5)),
            Ordering::Greater
        );
        assert_eq!(Value::Null.compare(&Value::Integer(0)), Ordering::Less);
    }

    #[test]
    fn display_formats_dates_as_iso() {
        let date = Value::parse("2025-04-09", ColumnType::Date);

        assert_eq!(date.to_string(), "2025-04-09");
        assert_eq!(date.key(), Some("2025-04-09".to_string()));
        assert_eq!(Value::Null.key(), None);
    }
}
