//! Validation rule evaluation for aggregate data
//!
//! This crate ties together:
//! - The domain model (periods, org units, rules, data rows)
//! - The expression language and its evaluation service
//! - The validation engine that finds violated rule instances
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use valrule::{InMemoryDataSource, Metadata, ValidationContext, ValidationRunner};
//!
//! let metadata: Metadata = serde_json::from_str(&metadata_json)?;
//! let context = ValidationContext::builder(&metadata)
//!     .org_unit("ouA")
//!     .period("202401".parse()?)
//!     .as_of(chrono::Local::now().date_naive())
//!     .build()?;
//! let runner = ValidationRunner::new(Arc::new(InMemoryDataSource::new().with_rows(rows)));
//! let summary = runner.run(&context).await?;
//! ```

pub use valrule_engine as engine;
pub use valrule_expr as expr;
pub use valrule_model as model;

pub mod run_file;

pub use run_file::RunFile;

pub use valrule_engine::{
    DataSource, EngineConfig, EngineError, EngineResult, ExpressionDetails, InMemoryDataSource,
    Metadata, ProgressSink, ValidationContext, ValidationRequest, ValidationRunner,
    ValidationSummary,
};
pub use valrule_expr::{ExpressionEngine, ExpressionService, parse_expression};
pub use valrule_model::{
    Expression, MissingValueStrategy, Operator, OrgUnit, Period, PeriodType, ValidationResult,
    ValidationRule,
};

#[cfg(feature = "cli")]
pub mod cli;
