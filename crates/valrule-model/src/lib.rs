//! Validation rule domain model
//!
//! This crate defines the value objects shared by the expression service and
//! the evaluation engine:
//! - Identifiers for rules, org units, data elements and disaggregation combos
//! - Periods and period types, including ISO period identifiers
//! - The organisation unit hierarchy
//! - Operands referenced by rule expressions
//! - Validation rules, their expressions and operators
//! - Data rows and indicator grids returned by a data source
//! - `ValidationResult`, the record of one rule violation

pub mod data;
pub mod error;
pub mod ids;
pub mod operand;
pub mod org_unit;
pub mod period;
pub mod result;
pub mod rule;

pub use data::{DataRow, Grid, GridValue};
pub use error::{ModelError, ModelResult};
pub use ids::{AttributeComboId, CategoryComboId, DataElementId, OrgUnitId, RuleGroupId, RuleId};
pub use operand::Operand;
pub use org_unit::OrgUnit;
pub use period::{DateRange, Period, PeriodType};
pub use result::ValidationResult;
pub use rule::{Expression, MissingValueStrategy, Operator, RuleGroup, ValidationRule};
