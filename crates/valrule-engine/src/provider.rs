//! Collaborator traits: where data comes from and where progress goes

use async_trait::async_trait;
use valrule_model::{DataElementId, DataRow, DateRange, Grid, OrgUnit, OrgUnitId};

/// Source of stored data for validation
#[async_trait]
pub trait DataSource: Send + Sync {
    /// Rows of `org_unit` for the given data elements whose period overlaps
    /// at least one of `spans`
    async fn get_data_rows(
        &self,
        org_unit: &OrgUnit,
        data_elements: &[DataElementId],
        spans: &[DateRange],
    ) -> Result<Vec<DataRow>, DataSourceError>;

    /// Time series for indicator-style items (`dx`, `pe`, optional `ao`, `value`)
    async fn query_indicator_series(
        &self,
        items: &[String],
        org_unit: &OrgUnit,
        range: DateRange,
    ) -> Result<Grid, DataSourceError>;
}

/// Data source error
#[derive(Debug, thiserror::Error)]
pub enum DataSourceError {
    #[error("Query failed: {0}")]
    QueryFailed(String),

    #[error("Source unavailable: {0}")]
    Unavailable(String),
}

/// Receives progress and answers cancellation for a run
pub trait ProgressSink: Send + Sync {
    /// One org unit finished
    fn tick(&self, org_unit: &OrgUnitId);

    /// Checked before each org unit starts
    fn is_cancelled(&self) -> bool {
        false
    }
}

/// Progress sink that ignores ticks and never cancels
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpProgress;

impl NoOpProgress {
    pub fn new() -> Self {
        Self
    }
}

impl ProgressSink for NoOpProgress {
    fn tick(&self, _org_unit: &OrgUnitId) {}
}
