//! Operand values of one org unit, resolved per period slot and attribute combo

use crate::rule_index::PeriodSlot;
use std::collections::hash_map::Entry;
use std::collections::{BTreeMap, HashMap};
use tracing::debug;
use valrule_model::data::{AO_HEADER, DX_HEADER, PE_HEADER, VALUE_HEADER};
use valrule_model::{AttributeComboId, DataRow, Grid, Operand, Period};

/// A stored value before period selection
#[derive(Debug, Clone)]
struct Observation {
    operand: Operand,
    period: Period,
    /// `None` for indicator values not split by attribute combo
    attribute_combo: Option<AttributeComboId>,
    value: f64,
}

/// Everything fetched for one org unit
#[derive(Debug, Clone, Default)]
pub struct UnitData {
    observations: Vec<Observation>,
}

impl UnitData {
    /// Combine data rows with an indicator grid
    ///
    /// Grid rows are matched to `indicator_items` through their `dx` column.
    /// Rows with an unknown item, an unreadable period or a non-numeric value
    /// are dropped.
    pub fn new(rows: Vec<DataRow>, grid: &Grid, indicator_items: &[Operand]) -> Self {
        let mut observations: Vec<Observation> = rows
            .into_iter()
            .map(|row| Observation {
                operand: Operand::combo(row.data_element, row.category_combo),
                period: row.period,
                attribute_combo: Some(row.attribute_combo),
                value: row.value,
            })
            .collect();

        let columns = (
            grid.index_of_header(DX_HEADER),
            grid.index_of_header(PE_HEADER),
            grid.index_of_header(VALUE_HEADER),
        );
        let (Some(dx), Some(pe), Some(value)) = columns else {
            if !grid.is_empty() {
                debug!(headers = ?grid.headers, "indicator grid without dx, pe and value columns");
            }
            return Self { observations };
        };
        let ao = grid.index_of_header(AO_HEADER);
        let items: HashMap<String, &Operand> = indicator_items
            .iter()
            .map(|operand| (operand.dimension_item(), operand))
            .collect();

        for row in &grid.rows {
            let operand = row
                .get(dx)
                .and_then(|cell| cell.as_str())
                .and_then(|item| items.get(item));
            let period = row
                .get(pe)
                .and_then(|cell| cell.as_str())
                .and_then(|id| Period::parse(id).ok());
            let number = row.get(value).and_then(|cell| cell.as_f64());
            let (Some(operand), Some(period), Some(number)) = (operand, period, number) else {
                debug!(?row, "dropped unreadable indicator row");
                continue;
            };
            let attribute_combo = ao
                .and_then(|i| row.get(i))
                .and_then(|cell| cell.as_str())
                .filter(|id| !id.is_empty())
                .map(AttributeComboId::from);
            observations.push(Observation {
                operand: (*operand).clone(),
                period,
                attribute_combo,
                value: number,
            });
        }
        Self { observations }
    }

    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }

    /// Values visible from `slot`
    ///
    /// Non-sliding: a value applies when its period covers the slot period;
    /// the shortest covering period wins and values of equal length are
    /// summed. Sliding: values whose period lies in the window are summed.
    /// Data element totals sum their category option combos. Values without
    /// an attribute combo are shared by every combo, or filed under
    /// `default_combo` when there is no other.
    pub fn values_for(
        &self,
        slot: &PeriodSlot,
        sliding: bool,
        default_combo: &AttributeComboId,
    ) -> ValueMaps {
        let mut best: HashMap<(Option<&AttributeComboId>, &Operand), (u32, f64)> = HashMap::new();
        for observation in &self.observations {
            let applies = if sliding {
                slot.window.contains_period(&observation.period)
            } else {
                observation.period.covers(&slot.period)
            };
            if !applies {
                continue;
            }
            let length = if sliding {
                0
            } else {
                observation.period.day_count()
            };
            let key = (observation.attribute_combo.as_ref(), &observation.operand);
            match best.entry(key) {
                Entry::Vacant(entry) => {
                    entry.insert((length, observation.value));
                }
                Entry::Occupied(mut entry) => {
                    let (best_length, sum) = entry.get_mut();
                    if length < *best_length {
                        *best_length = length;
                        *sum = observation.value;
                    } else if length == *best_length {
                        *sum += observation.value;
                    }
                }
            }
        }

        let mut by_combo: HashMap<Option<&AttributeComboId>, HashMap<Operand, f64>> = HashMap::new();
        for ((combo, operand), (_, value)) in best {
            let values = by_combo.entry(combo).or_default();
            if let Operand::DataElement {
                data_element,
                category_combo: Some(_),
            } = operand
            {
                *values
                    .entry(Operand::total(data_element.clone()))
                    .or_insert(0.0) += value;
            }
            values.insert(operand.clone(), value);
        }

        let shared = by_combo.remove(&None);
        let mut maps: BTreeMap<AttributeComboId, HashMap<Operand, f64>> = by_combo
            .into_iter()
            .filter_map(|(combo, values)| combo.map(|combo| (combo.clone(), values)))
            .collect();
        if let Some(shared) = shared {
            if maps.is_empty() {
                maps.insert(default_combo.clone(), HashMap::new());
            }
            for values in maps.values_mut() {
                for (operand, value) in &shared {
                    values.entry(operand.clone()).or_insert(*value);
                }
            }
        }
        ValueMaps { maps }
    }
}

/// Operand values by attribute combo for one slot
#[derive(Debug, Clone, Default)]
pub struct ValueMaps {
    maps: BTreeMap<AttributeComboId, HashMap<Operand, f64>>,
}

impl ValueMaps {
    /// Attribute combos with at least one value
    pub fn combos(&self) -> impl Iterator<Item = &AttributeComboId> {
        self.maps.keys()
    }

    pub fn get(&self, combo: &AttributeComboId) -> Option<&HashMap<Operand, f64>> {
        self.maps.get(combo)
    }

    pub fn is_empty(&self) -> bool {
        self.maps.is_empty()
    }
}
