//! One run's request and its shared result sink

use crate::metadata::Metadata;
use crate::{EngineError, EngineResult};
use chrono::NaiveDate;
use indexmap::IndexMap;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use valrule_model::{
    AttributeComboId, DateRange, Operand, OrgUnit, OrgUnitId, Period, RuleGroupId, RuleId,
    ValidationResult, ValidationRule,
};

/// Which rules a run evaluates
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleSelection {
    #[default]
    All,
    Rules(Vec<RuleId>),
    Group(RuleGroupId),
}

/// Which periods a run evaluates
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PeriodSelection {
    Periods(Vec<Period>),
    /// Every period of each rule's period type lying inside the range
    Range(DateRange),
}

/// Serializable form of a run request
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationRequest {
    pub rules: RuleSelection,
    pub org_units: Vec<OrgUnitId>,
    pub include_descendants: bool,
    pub periods: Vec<Period>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub attribute_combo: Option<AttributeComboId>,
    pub constants: HashMap<String, f64>,
    pub max_results: usize,
    pub form_mode: bool,
    pub as_of: Option<NaiveDate>,
}

impl ValidationRequest {
    /// Build a context for this request against `metadata`
    pub fn into_context(self, metadata: &Metadata) -> EngineResult<ValidationContext> {
        let mut builder = ValidationContext::builder(metadata)
            .rule_selection(self.rules)
            .org_units(self.org_units)
            .include_descendants(self.include_descendants)
            .max_results(self.max_results)
            .form_mode(self.form_mode);
        builder = match (self.start_date, self.end_date) {
            (Some(start), Some(end)) => builder.date_range(DateRange::new(start, end)?),
            (None, None) => builder.periods(self.periods),
            _ => {
                return Err(EngineError::invalid_request(
                    "start_date and end_date must be given together",
                ));
            }
        };
        if let Some(combo) = self.attribute_combo {
            builder = builder.attribute_combo(combo);
        }
        if let Some(as_of) = self.as_of {
            builder = builder.as_of(as_of);
        }
        for (name, value) in self.constants {
            builder = builder.constant(name, value);
        }
        builder.build()
    }
}

/// Concurrency-safe collection of results with an exact cap
#[derive(Debug, Default)]
struct ResultSink {
    results: Mutex<Vec<ValidationResult>>,
    max_results: usize,
    cap_reached: AtomicBool,
}

impl ResultSink {
    fn push(&self, result: ValidationResult) -> bool {
        if self.cap_reached.load(Ordering::Acquire) {
            return false;
        }
        let mut results = self.results.lock();
        if self.max_results > 0 && results.len() >= self.max_results {
            self.cap_reached.store(true, Ordering::Release);
            return false;
        }
        results.push(result);
        if self.max_results > 0 && results.len() >= self.max_results {
            self.cap_reached.store(true, Ordering::Release);
        }
        true
    }
}

/// The parameters of one validation run plus its results
///
/// Built once per run by [`ValidationContextBuilder`]; evaluators append to it
/// concurrently.
#[derive(Debug)]
pub struct ValidationContext {
    rules: Vec<ValidationRule>,
    org_units: Vec<OrgUnit>,
    include_descendants: bool,
    periods: PeriodSelection,
    attribute_combo: Option<AttributeComboId>,
    constants: HashMap<String, f64>,
    default_attribute_combo: AttributeComboId,
    form_mode: bool,
    as_of: NaiveDate,
    item_names: HashMap<String, String>,
    sink: ResultSink,
}

impl ValidationContext {
    pub fn builder(metadata: &Metadata) -> ValidationContextBuilder<'_> {
        ValidationContextBuilder::new(metadata)
    }

    /// Selected rules
    pub fn rules(&self) -> &[ValidationRule] {
        &self.rules
    }

    pub fn rule(&self, id: &RuleId) -> Option<&ValidationRule> {
        self.rules.iter().find(|rule| &rule.id == id)
    }

    /// Selected org units as given, each with its subtree
    pub fn org_units(&self) -> &[OrgUnit] {
        &self.org_units
    }

    pub fn include_descendants(&self) -> bool {
        self.include_descendants
    }

    /// The org units to evaluate: descendants expanded when requested,
    /// duplicates removed, children detached
    pub fn resolve_org_units(&self) -> Vec<OrgUnit> {
        let mut resolved: IndexMap<OrgUnitId, OrgUnit> = IndexMap::new();
        for unit in &self.org_units {
            if self.include_descendants {
                for descendant in unit.descendants() {
                    resolved
                        .entry(descendant.id.clone())
                        .or_insert_with(|| descendant.detached());
                }
            } else {
                resolved
                    .entry(unit.id.clone())
                    .or_insert_with(|| unit.detached());
            }
        }
        resolved.into_values().collect()
    }

    /// Find a selected org unit, or a descendant of one
    pub fn find_org_unit(&self, id: &OrgUnitId) -> Option<&OrgUnit> {
        self.org_units.iter().find_map(|unit| unit.find(id))
    }

    pub fn period_selection(&self) -> &PeriodSelection {
        &self.periods
    }

    pub fn attribute_combo(&self) -> Option<&AttributeComboId> {
        self.attribute_combo.as_ref()
    }

    pub fn constants(&self) -> &HashMap<String, f64> {
        &self.constants
    }

    pub fn default_attribute_combo(&self) -> &AttributeComboId {
        &self.default_attribute_combo
    }

    pub fn max_results(&self) -> usize {
        self.sink.max_results
    }

    pub fn form_mode(&self) -> bool {
        self.form_mode
    }

    /// Date used for day-in-period and to clamp sliding windows
    pub fn as_of(&self) -> NaiveDate {
        self.as_of
    }

    /// Display name of an operand
    pub fn item_name(&self, operand: &Operand) -> String {
        self.item_names
            .get(&operand.dimension_item())
            .cloned()
            .unwrap_or_else(|| operand.to_string())
    }

    /// Append a result; false once the cap is reached and the result dropped
    pub fn push_result(&self, result: ValidationResult) -> bool {
        self.sink.push(result)
    }

    /// Whether evaluators should stop producing results
    pub fn is_cap_reached(&self) -> bool {
        self.sink.cap_reached.load(Ordering::Acquire)
    }

    pub fn result_count(&self) -> usize {
        self.sink.results.lock().len()
    }

    /// Copy of the results appended so far
    pub fn results(&self) -> Vec<ValidationResult> {
        self.sink.results.lock().clone()
    }

    /// Remove and return the results appended so far
    pub fn take_results(&self) -> Vec<ValidationResult> {
        std::mem::take(&mut *self.sink.results.lock())
    }
}

/// Builder for [`ValidationContext`]
#[derive(Debug, Clone)]
pub struct ValidationContextBuilder<'m> {
    metadata: &'m Metadata,
    rules: RuleSelection,
    org_units: Vec<OrgUnitId>,
    include_descendants: bool,
    periods: Option<PeriodSelection>,
    attribute_combo: Option<AttributeComboId>,
    constants: HashMap<String, f64>,
    default_attribute_combo: Option<AttributeComboId>,
    max_results: usize,
    form_mode: bool,
    as_of: Option<NaiveDate>,
}

impl<'m> ValidationContextBuilder<'m> {
    pub fn new(metadata: &'m Metadata) -> Self {
        Self {
            metadata,
            rules: RuleSelection::All,
            org_units: Vec::new(),
            include_descendants: false,
            periods: None,
            attribute_combo: None,
            constants: HashMap::new(),
            default_attribute_combo: None,
            max_results: 0,
            form_mode: false,
            as_of: None,
        }
    }

    pub fn rule_selection(mut self, selection: RuleSelection) -> Self {
        self.rules = selection;
        self
    }

    pub fn rules(self, ids: impl IntoIterator<Item = impl Into<RuleId>>) -> Self {
        self.rule_selection(RuleSelection::Rules(ids.into_iter().map(Into::into).collect()))
    }

    pub fn rule_group(self, id: impl Into<RuleGroupId>) -> Self {
        self.rule_selection(RuleSelection::Group(id.into()))
    }

    pub fn all_rules(self) -> Self {
        self.rule_selection(RuleSelection::All)
    }

    pub fn org_unit(mut self, id: impl Into<OrgUnitId>) -> Self {
        self.org_units.push(id.into());
        self
    }

    pub fn org_units(mut self, ids: impl IntoIterator<Item = impl Into<OrgUnitId>>) -> Self {
        self.org_units.extend(ids.into_iter().map(Into::into));
        self
    }

    pub fn include_descendants(mut self, include: bool) -> Self {
        self.include_descendants = include;
        self
    }

    pub fn periods(mut self, periods: impl IntoIterator<Item = Period>) -> Self {
        self.periods = Some(PeriodSelection::Periods(periods.into_iter().collect()));
        self
    }

    pub fn period(self, period: Period) -> Self {
        self.periods([period])
    }

    pub fn date_range(mut self, range: DateRange) -> Self {
        self.periods = Some(PeriodSelection::Range(range));
        self
    }

    pub fn attribute_combo(mut self, id: impl Into<AttributeComboId>) -> Self {
        self.attribute_combo = Some(id.into());
        self
    }

    /// Add or override a constant
    pub fn constant(mut self, name: impl Into<String>, value: f64) -> Self {
        self.constants.insert(name.into(), value);
        self
    }

    pub fn default_attribute_combo(mut self, id: impl Into<AttributeComboId>) -> Self {
        self.default_attribute_combo = Some(id.into());
        self
    }

    /// Stop collecting after this many results; 0 means unlimited
    pub fn max_results(mut self, max_results: usize) -> Self {
        self.max_results = max_results;
        self
    }

    /// Validate a single data entry form: rules flagged to skip form
    /// validation are left out
    pub fn form_mode(mut self, form_mode: bool) -> Self {
        self.form_mode = form_mode;
        self
    }

    /// Reference date; required, building never reads the clock
    pub fn as_of(mut self, date: NaiveDate) -> Self {
        self.as_of = Some(date);
        self
    }

    pub fn build(self) -> EngineResult<ValidationContext> {
        let metadata = self.metadata;
        // Keyed by id so a rule listed twice is evaluated once.
        let mut rules: IndexMap<RuleId, ValidationRule> = IndexMap::new();
        match &self.rules {
            RuleSelection::All => {
                for rule in &metadata.rules {
                    rules.entry(rule.id.clone()).or_insert_with(|| rule.clone());
                }
            }
            RuleSelection::Rules(ids) => {
                for id in ids {
                    let rule = metadata.rule(id).ok_or_else(|| {
                        EngineError::invalid_request(format!("unknown rule {id}"))
                    })?;
                    rules.entry(id.clone()).or_insert_with(|| rule.clone());
                }
            }
            RuleSelection::Group(group_id) => {
                let group = metadata.group(group_id).ok_or_else(|| {
                    EngineError::invalid_request(format!("unknown rule group {group_id}"))
                })?;
                for rule in group.rules.iter().filter_map(|id| metadata.rule(id)) {
                    rules.entry(rule.id.clone()).or_insert_with(|| rule.clone());
                }
            }
        }

        if self.org_units.is_empty() {
            return Err(EngineError::invalid_request("no org units selected"));
        }
        let org_units = self
            .org_units
            .iter()
            .map(|id| {
                metadata.org_unit(id).cloned().ok_or_else(|| {
                    EngineError::invalid_request(format!("unknown org unit {id}"))
                })
            })
            .collect::<EngineResult<Vec<_>>>()?;

        let periods = self
            .periods
            .ok_or_else(|| EngineError::invalid_request("no periods or date range selected"))?;
        if matches!(&periods, PeriodSelection::Periods(periods) if periods.is_empty()) {
            return Err(EngineError::invalid_request("no periods or date range selected"));
        }

        let as_of = self
            .as_of
            .ok_or_else(|| EngineError::invalid_request("no as_of date given"))?;

        let mut constants = metadata.constants.clone();
        constants.extend(self.constants);

        Ok(ValidationContext {
            rules: rules.into_values().collect(),
            org_units,
            include_descendants: self.include_descendants,
            periods,
            attribute_combo: self.attribute_combo,
            constants,
            default_attribute_combo: self
                .default_attribute_combo
                .unwrap_or_else(|| metadata.default_attribute_combo.clone()),
            form_mode: self.form_mode,
            as_of,
            item_names: metadata.item_names.clone(),
            sink: ResultSink {
                results: Mutex::new(Vec::new()),
                max_results: self.max_results,
                cap_reached: AtomicBool::new(false),
            },
        })
    }
}
