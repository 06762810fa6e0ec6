//! Data rows and indicator grids returned by a data source

use crate::{AttributeComboId, CategoryComboId, DataElementId, OrgUnitId, Period};
use serde::{Deserialize, Serialize};

/// One stored aggregate value, denormalised
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataRow {
    pub data_element: DataElementId,
    pub period: Period,
    pub org_unit: OrgUnitId,
    pub category_combo: CategoryComboId,
    pub attribute_combo: AttributeComboId,
    pub value: f64,
}

/// Column holding the dimension item id
pub const DX_HEADER: &str = "dx";
/// Column holding the period id
pub const PE_HEADER: &str = "pe";
/// Column holding the org unit id
pub const OU_HEADER: &str = "ou";
/// Column holding the attribute option combo id (optional)
pub const AO_HEADER: &str = "ao";
/// Column holding the numeric value
pub const VALUE_HEADER: &str = "value";

/// A cell of an indicator grid
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum GridValue {
    Number(f64),
    Text(String),
}

impl GridValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            GridValue::Text(text) => Some(text),
            GridValue::Number(_) => None,
        }
    }

    /// Numeric value, parsing text cells
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            GridValue::Number(n) => Some(*n),
            GridValue::Text(text) => text.trim().parse().ok(),
        }
    }
}

impl From<&str> for GridValue {
    fn from(value: &str) -> Self {
        GridValue::Text(value.to_string())
    }
}

impl From<f64> for GridValue {
    fn from(value: f64) -> Self {
        GridValue::Number(value)
    }
}

/// Tabular analytics response for indicator-style operands
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Grid {
    pub headers: Vec<String>,
    #[serde(default)]
    pub rows: Vec<Vec<GridValue>>,
}

impl Grid {
    pub fn new(headers: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            headers: headers.into_iter().map(Into::into).collect(),
            rows: Vec::new(),
        }
    }

    pub fn push_row(&mut self, row: Vec<GridValue>) {
        self.rows.push(row);
    }

    pub fn index_of_header(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Append the rows of `other`, matching columns by header name
    pub fn extend(&mut self, other: Grid) {
        if self.headers.is_empty() {
            *self = other;
            return;
        }
        let mapping: Vec<Option<usize>> = self
            .headers
            .iter()
            .map(|h| other.index_of_header(h))
            .collect();
        for row in other.rows {
            let mapped = mapping
                .iter()
                .map(|idx| {
                    idx.and_then(|i| row.get(i).cloned())
                        .unwrap_or_else(|| GridValue::Text(String::new()))
                })
                .collect();
            self.rows.push(mapped);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grid_value_untagged() {
        let row: Vec<GridValue> = serde_json::from_str(r#"["piA", 4.5, "7"]"#).unwrap();
        assert_eq!(row[0].as_str(), Some("piA"));
        assert_eq!(row[1].as_f64(), Some(4.5));
        assert_eq!(row[2].as_f64(), Some(7.0));
    }

    #[test]
    fn test_extend_maps_columns_by_header() {
        let mut grid = Grid::new([DX_HEADER, VALUE_HEADER]);
        grid.push_row(vec!["a".into(), 1.0.into()]);
        let mut other = Grid::new([VALUE_HEADER, DX_HEADER]);
        other.push_row(vec![2.0.into(), "b".into()]);
        grid.extend(other);
        assert_eq!(grid.rows[1], vec![GridValue::from("b"), GridValue::from(2.0)]);
    }
}
