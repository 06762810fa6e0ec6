//! In-memory data source

use crate::provider::{DataSource, DataSourceError};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use valrule_model::data::{AO_HEADER, DX_HEADER, OU_HEADER, PE_HEADER, VALUE_HEADER};
use valrule_model::{
    AttributeComboId, DataElementId, DataRow, DateRange, Grid, GridValue, OrgUnit, OrgUnitId,
    Period,
};

/// One value of an indicator-style item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndicatorRow {
    /// Dimension item id, e.g. `piA` or `prgA.atA`
    pub item: String,
    pub period: Period,
    pub org_unit: OrgUnitId,
    /// Absent when the item is not disaggregated by attribute combo
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attribute_combo: Option<AttributeComboId>,
    pub value: f64,
}

/// Data source backed by vectors, used by tests and the CLI
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InMemoryDataSource {
    #[serde(default)]
    rows: Vec<DataRow>,
    #[serde(default)]
    indicators: Vec<IndicatorRow>,
    /// Org units whose fetch fails
    #[serde(skip)]
    failing: HashSet<OrgUnitId>,
}

fn overlaps(period: &Period, span: &DateRange) -> bool {
    period.start() <= span.end && period.end() >= span.start
}

impl InMemoryDataSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_rows(mut self, rows: impl IntoIterator<Item = DataRow>) -> Self {
        self.rows.extend(rows);
        self
    }

    pub fn with_indicators(mut self, rows: impl IntoIterator<Item = IndicatorRow>) -> Self {
        self.indicators.extend(rows);
        self
    }

    /// Make every fetch for `org_unit` fail
    pub fn failing_for(mut self, org_unit: impl Into<OrgUnitId>) -> Self {
        self.failing.insert(org_unit.into());
        self
    }

    pub fn push_row(&mut self, row: DataRow) {
        self.rows.push(row);
    }

    pub fn rows(&self) -> &[DataRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len() + self.indicators.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn check(&self, org_unit: &OrgUnit) -> Result<(), DataSourceError> {
        if self.failing.contains(&org_unit.id) {
            return Err(DataSourceError::Unavailable(format!(
                "no connection for {}",
                org_unit.id
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl DataSource for InMemoryDataSource {
    async fn get_data_rows(
        &self,
        org_unit: &OrgUnit,
        data_elements: &[DataElementId],
        spans: &[DateRange],
    ) -> Result<Vec<DataRow>, DataSourceError> {
        self.check(org_unit)?;
        Ok(self
            .rows
            .iter()
            .filter(|row| row.org_unit == org_unit.id)
            .filter(|row| data_elements.contains(&row.data_element))
            .filter(|row| spans.iter().any(|span| overlaps(&row.period, span)))
            .cloned()
            .collect())
    }

    async fn query_indicator_series(
        &self,
        items: &[String],
        org_unit: &OrgUnit,
        range: DateRange,
    ) -> Result<Grid, DataSourceError> {
        self.check(org_unit)?;
        let matching: Vec<&IndicatorRow> = self
            .indicators
            .iter()
            .filter(|row| row.org_unit == org_unit.id)
            .filter(|row| items.contains(&row.item))
            .filter(|row| overlaps(&row.period, &range))
            .collect();

        let with_combo = matching.iter().any(|row| row.attribute_combo.is_some());
        let mut grid = if with_combo {
            Grid::new([DX_HEADER, PE_HEADER, OU_HEADER, AO_HEADER, VALUE_HEADER])
        } else {
            Grid::new([DX_HEADER, PE_HEADER, OU_HEADER, VALUE_HEADER])
        };
        for row in matching {
            let mut cells: Vec<GridValue> = vec![
                row.item.as_str().into(),
                GridValue::Text(row.period.iso()),
                row.org_unit.as_str().into(),
            ];
            if with_combo {
                let combo = row
                    .attribute_combo
                    .as_ref()
                    .map_or("", AttributeComboId::as_str);
                cells.push(combo.into());
            }
            cells.push(row.value.into());
            grid.push_row(cells);
        }
        Ok(grid)
    }
}
