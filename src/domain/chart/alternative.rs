//! Alternatives - the candidate options being compared.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::domain::foundation::ObjectiveId;
use crate::domain::objective::DomainValue;

/// One candidate with a value for (ideally) every primitive objective.
///
/// Entries may be partial while the chart is being authored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alternative {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub values: BTreeMap<ObjectiveId, DomainValue>,
}

impl Alternative {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            values: BTreeMap::new(),
        }
    }

    /// Builder-style value assignment.
    pub fn with_value(mut self, id: impl Into<ObjectiveId>, value: impl Into<DomainValue>) -> Self {
        self.values.insert(id.into(), value.into());
        self
    }

    pub fn value_of(&self, id: &ObjectiveId) -> Option<&DomainValue> {
        self.values.get(id)
    }

    pub fn set_value(&mut self, id: ObjectiveId, value: DomainValue) {
        self.values.insert(id, value);
    }
}
