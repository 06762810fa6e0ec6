//! A self-contained validation run: configuration, request, metadata and data

use chrono::Local;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;
use valrule_engine::{
    EngineConfig, EngineResult, InMemoryDataSource, Metadata, ValidationContext,
    ValidationRequest, ValidationRunner,
};

/// The JSON document read by the `valrule` binary
///
/// ```json
/// {
///   "config": { "max_concurrency": 4 },
///   "request": { "org_units": ["ouA"], "periods": ["202401"] },
///   "metadata": { "rules": [], "org_units": [] },
///   "data": { "rows": [] }
/// }
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunFile {
    #[serde(default)]
    pub config: EngineConfig,
    #[serde(default)]
    pub request: ValidationRequest,
    #[serde(default)]
    pub metadata: Metadata,
    #[serde(default)]
    pub data: InMemoryDataSource,
}

impl RunFile {
    /// Parse a run file; org unit levels are derived from the tree
    pub fn from_json(text: &str) -> serde_json::Result<Self> {
        let mut file: RunFile = serde_json::from_str(text)?;
        file.metadata = file.metadata.normalize();
        debug!(
            rules = file.metadata.rules.len(),
            data_rows = file.data.len(),
            "loaded run file"
        );
        Ok(file)
    }

    /// Context for the file's request; `as_of` defaults to today
    pub fn context(&self) -> EngineResult<ValidationContext> {
        let mut request = self.request.clone();
        request.as_of.get_or_insert_with(|| Local::now().date_naive());
        request.into_context(&self.metadata)
    }

    /// Runner over the file's data with the file's configuration
    pub fn runner(&self) -> ValidationRunner {
        ValidationRunner::new(Arc::new(self.data.clone())).with_config(self.config.clone())
    }
}
