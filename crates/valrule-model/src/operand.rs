//! Operands referenced by rule expressions

use crate::{CategoryComboId, DataElementId};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A value source an expression can reference
///
/// Data element operands are resolved from data rows. The other kinds are
/// indicator-style items resolved from the indicator time series.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Operand {
    /// `#{de}` or `#{de.coc}`
    DataElement {
        data_element: DataElementId,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        category_combo: Option<CategoryComboId>,
    },
    /// `I{indicator}`
    ProgramIndicator { indicator: String },
    /// `A{attribute}` or `A{program.attribute}`
    Attribute {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        program: Option<String>,
        attribute: String,
    },
    /// `D{program.dataElement}`
    ProgramDataElement { program: String, data_element: String },
}

impl Operand {
    /// Data element total across all category option combos
    pub fn total(data_element: impl Into<DataElementId>) -> Self {
        Operand::DataElement {
            data_element: data_element.into(),
            category_combo: None,
        }
    }

    /// A single category option combo of a data element
    pub fn combo(
        data_element: impl Into<DataElementId>,
        category_combo: impl Into<CategoryComboId>,
    ) -> Self {
        Operand::DataElement {
            data_element: data_element.into(),
            category_combo: Some(category_combo.into()),
        }
    }

    /// Whether the value comes from the indicator series rather than data rows
    pub fn is_indicator_item(&self) -> bool {
        !matches!(self, Operand::DataElement { .. })
    }

    /// The data element behind this operand, if any
    pub fn data_element(&self) -> Option<&DataElementId> {
        match self {
            Operand::DataElement { data_element, .. } => Some(data_element),
            _ => None,
        }
    }

    /// The dimension item id used in indicator grids (`dx` column)
    pub fn dimension_item(&self) -> String {
        match self {
            Operand::DataElement {
                data_element,
                category_combo: None,
            } => data_element.to_string(),
            Operand::DataElement {
                data_element,
                category_combo: Some(coc),
            } => format!("{data_element}.{coc}"),
            Operand::ProgramIndicator { indicator } => indicator.clone(),
            Operand::Attribute {
                program: Some(program),
                attribute,
            } => format!("{program}.{attribute}"),
            Operand::Attribute {
                program: None,
                attribute,
            } => attribute.clone(),
            Operand::ProgramDataElement {
                program,
                data_element,
            } => format!("{program}.{data_element}"),
        }
    }
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let item = self.dimension_item();
        match self {
            Operand::DataElement { .. } => write!(f, "#{{{item}}}"),
            Operand::ProgramIndicator { .. } => write!(f, "I{{{item}}}"),
            Operand::Attribute { .. } => write!(f, "A{{{item}}}"),
            Operand::ProgramDataElement { .. } => write!(f, "D{{{item}}}"),
        }
    }
}
