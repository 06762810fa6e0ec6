//! Validation rule evaluation engine
//!
//! Turns a request of rules, org units and periods into the set of violated
//! rule instances:
//!
//! - [`ValidationContext`] holds the request and the shared result sink
//! - [`RuleIndexSet`] groups rules by period type and computes what to fetch
//! - [`OrgUnitEvaluator`] fetches one org unit's data and evaluates every rule
//! - [`ValidationRunner`] fans evaluators out with bounded concurrency
//!
//! Data comes from a [`DataSource`]; expressions are handled by a
//! [`valrule_expr::ExpressionService`].

pub mod config;
pub mod context;
pub mod detail;
pub mod error;
pub mod evaluator;
pub mod metadata;
pub mod operator;
pub mod provider;
pub mod rule_index;
pub mod runner;
pub mod source;
pub mod value_map;

pub use config::EngineConfig;
pub use context::{
    PeriodSelection, RuleSelection, ValidationContext, ValidationContextBuilder, ValidationRequest,
};
pub use detail::{DetailEntry, ExpressionDetails};
pub use error::{EngineError, EngineResult};
pub use evaluator::OrgUnitEvaluator;
pub use metadata::Metadata;
pub use provider::{DataSource, DataSourceError, NoOpProgress, ProgressSink};
pub use rule_index::{IndexedRule, PeriodSlot, RuleIndex, RuleIndexSet};
pub use runner::{UnitFailure, ValidationRunner, ValidationSummary};
pub use source::{InMemoryDataSource, IndicatorRow};
