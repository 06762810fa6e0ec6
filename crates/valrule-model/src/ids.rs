//! Typed identifiers
//!
//! Every metadata object is referenced by an opaque string id. The newtypes
//! keep a rule id from being passed where an org unit id is expected.

use crate::{ModelError, ModelResult};
use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! define_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Create an id, rejecting blank input
            pub fn new(value: impl Into<String>) -> ModelResult<Self> {
                let value = value.into();
                let trimmed = value.trim();
                if trimmed.is_empty() {
                    return Err(ModelError::InvalidId(value));
                }
                Ok(Self(trimmed.to_string()))
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self(value)
            }
        }
    };
}

define_id!(
    /// Validation rule id
    RuleId
);
define_id!(
    /// Validation rule group id
    RuleGroupId
);
define_id!(
    /// Organisation unit id
    OrgUnitId
);
define_id!(
    /// Data element id
    DataElementId
);
define_id!(
    /// Category option combo id (the disaggregation of a data element)
    CategoryComboId
);
define_id!(
    /// Attribute option combo id (the disaggregation of a data value's source)
    AttributeComboId
);
