//! Organisation unit hierarchy

use crate::OrgUnitId;
use serde::{Deserialize, Serialize};

fn default_level() -> u32 {
    1
}

/// A node in the organisation unit tree
///
/// `level` is 1 at the root and grows by one per generation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrgUnit {
    pub id: OrgUnitId,
    #[serde(default)]
    pub name: String,
    #[serde(default = "default_level")]
    pub level: u32,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<OrgUnit>,
}

impl OrgUnit {
    /// Create a root-level unit with no children
    pub fn new(id: impl Into<OrgUnitId>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            level: 1,
            children: Vec::new(),
        }
    }

    /// Attach `child`, relevelling its whole subtree under this unit
    pub fn with_child(mut self, mut child: OrgUnit) -> Self {
        child.set_level(self.level + 1);
        self.children.push(child);
        self
    }

    fn set_level(&mut self, level: u32) {
        self.level = level;
        for child in &mut self.children {
            child.set_level(level + 1);
        }
    }

    /// Recompute levels of the subtree from this unit's level downward
    pub fn normalize_levels(&mut self) {
        let level = self.level;
        self.set_level(level);
    }

    /// This unit followed by all its descendants, pre-order
    pub fn descendants(&self) -> Vec<&OrgUnit> {
        let mut out = vec![self];
        for child in &self.children {
            out.extend(child.descendants());
        }
        out
    }

    /// Find a unit by id in this subtree
    pub fn find(&self, id: &OrgUnitId) -> Option<&OrgUnit> {
        if &self.id == id {
            return Some(self);
        }
        self.children.iter().find_map(|child| child.find(id))
    }

    /// A copy of this unit without its children
    pub fn detached(&self) -> OrgUnit {
        OrgUnit {
            id: self.id.clone(),
            name: self.name.clone(),
            level: self.level,
            children: Vec::new(),
        }
    }

    /// Display name, falling back to the id
    pub fn display_name(&self) -> &str {
        if self.name.is_empty() {
            self.id.as_str()
        } else {
            &self.name
        }
    }
}
