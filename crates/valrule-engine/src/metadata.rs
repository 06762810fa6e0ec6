//! Metadata a run draws from

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use valrule_model::{
    AttributeComboId, Operand, OrgUnit, OrgUnitId, RuleGroup, RuleGroupId, RuleId, ValidationRule,
};

fn default_attribute_combo() -> AttributeComboId {
    AttributeComboId::from("default")
}

/// Rules, rule groups, the org unit hierarchy, constants and display names
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Metadata {
    #[serde(default)]
    pub rules: Vec<ValidationRule>,
    #[serde(default)]
    pub groups: Vec<RuleGroup>,
    /// Roots of the org unit hierarchy
    #[serde(default)]
    pub org_units: Vec<OrgUnit>,
    #[serde(default)]
    pub constants: HashMap<String, f64>,
    /// Display names keyed by dimension item id (`deA`, `deA.cocB`, `prgA.atA`)
    #[serde(default)]
    pub item_names: HashMap<String, String>,
    #[serde(default = "default_attribute_combo")]
    pub default_attribute_combo: AttributeComboId,
}

impl Default for Metadata {
    fn default() -> Self {
        Self {
            rules: Vec::new(),
            groups: Vec::new(),
            org_units: Vec::new(),
            constants: HashMap::new(),
            item_names: HashMap::new(),
            default_attribute_combo: default_attribute_combo(),
        }
    }
}

impl Metadata {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_rule(mut self, rule: ValidationRule) -> Self {
        self.rules.push(rule);
        self
    }

    pub fn with_group(mut self, group: RuleGroup) -> Self {
        self.groups.push(group);
        self
    }

    pub fn with_org_unit(mut self, root: OrgUnit) -> Self {
        self.org_units.push(root);
        self
    }

    pub fn with_constant(mut self, name: impl Into<String>, value: f64) -> Self {
        self.constants.insert(name.into(), value);
        self
    }

    pub fn with_item_name(mut self, item: impl Into<String>, name: impl Into<String>) -> Self {
        self.item_names.insert(item.into(), name.into());
        self
    }

    /// Recompute org unit levels from each root's level downward
    pub fn normalize(mut self) -> Self {
        for root in &mut self.org_units {
            root.normalize_levels();
        }
        self
    }

    pub fn rule(&self, id: &RuleId) -> Option<&ValidationRule> {
        self.rules.iter().find(|rule| &rule.id == id)
    }

    pub fn group(&self, id: &RuleGroupId) -> Option<&RuleGroup> {
        self.groups.iter().find(|group| &group.id == id)
    }

    pub fn org_unit(&self, id: &OrgUnitId) -> Option<&OrgUnit> {
        self.org_units.iter().find_map(|root| root.find(id))
    }

    /// Display name of an operand, falling back to its expression form
    pub fn item_name(&self, operand: &Operand) -> String {
        self.item_names
            .get(&operand.dimension_item())
            .cloned()
            .unwrap_or_else(|| operand.to_string())
    }
}
