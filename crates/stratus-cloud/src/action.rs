//! Operation and change types for resource reconciliation

use crate::schema::{AttributeSpec, ResourceDescriptor};
use crate::state::LocalState;
use crate::value::Value;
use serde::{Deserialize, Serialize};

/// Reconciler entry point an error or log line belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    Create,
    Read,
    Update,
    Delete,
    Import,
    /// Data source query
    Lookup,
}

impl std::fmt::Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Operation::Create => write!(f, "create"),
            Operation::Read => write!(f, "read"),
            Operation::Update => write!(f, "update"),
            Operation::Delete => write!(f, "delete"),
            Operation::Import => write!(f, "import"),
            Operation::Lookup => write!(f, "lookup"),
        }
    }
}

/// How a single attribute change can be applied
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
    NoOp,
    InPlace,
    Replace,
}

impl std::fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ChangeKind::NoOp => write!(f, "no-op"),
            ChangeKind::InPlace => write!(f, "update in-place"),
            ChangeKind::Replace => write!(f, "forces replacement"),
        }
    }
}

/// Difference between the tracked state and the merged configuration,
/// partitioned by how each configurable attribute can be applied
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DesiredChange {
    pub unchanged: Vec<String>,
    pub in_place: Vec<String>,
    pub replace: Vec<String>,
}

impl DesiredChange {
    /// Compare `old` and `new` over the descriptor's configurable attributes.
    ///
    /// Unset values compare equal to the attribute's zero value, and an unset
    /// optional+computed attribute keeps whatever the remote reported.
    pub fn compute(descriptor: &ResourceDescriptor, old: &LocalState, new: &LocalState) -> Self {
        let mut change = DesiredChange::default();

        for spec in descriptor.attributes().filter(|a| a.is_configurable()) {
            let kind = classify(spec, old.get(&spec.name), new.get(&spec.name));
            let bucket = match kind {
                ChangeKind::NoOp => &mut change.unchanged,
                ChangeKind::InPlace => &mut change.in_place,
                ChangeKind::Replace => &mut change.replace,
            };
            bucket.push(spec.name.clone());
        }

        change
    }

    pub fn is_empty(&self) -> bool {
        self.in_place.is_empty() && self.replace.is_empty()
    }

    pub fn requires_replacement(&self) -> bool {
        !self.replace.is_empty()
    }

    /// Changed attribute names, in-place first
    pub fn changed(&self) -> impl Iterator<Item = &String> {
        self.in_place.iter().chain(self.replace.iter())
    }

    pub fn kind_of(&self, attribute: &str) -> ChangeKind {
        if self.replace.iter().any(|a| a == attribute) {
            ChangeKind::Replace
        } else if self.in_place.iter().any(|a| a == attribute) {
            ChangeKind::InPlace
        } else {
            ChangeKind::NoOp
        }
    }

    pub fn summary(&self) -> ChangeSummary {
        ChangeSummary {
            in_place: self.in_place.len(),
            replace: self.replace.len(),
            unchanged: self.unchanged.len(),
        }
    }
}

fn classify(spec: &AttributeSpec, old: Option<&Value>, new: Option<&Value>) -> ChangeKind {
    if new.is_none() && spec.presence.is_computed() {
        return ChangeKind::NoOp;
    }

    let zero = spec.kind.zero_value();
    let old = old.unwrap_or(&zero);
    let new = new.unwrap_or(&zero);
    if old == new {
        ChangeKind::NoOp
    } else if spec.force_new {
        ChangeKind::Replace
    } else {
        ChangeKind::InPlace
    }
}

/// Summary of a computed change
#[derive(Debug, Clone)]
pub struct ChangeSummary {
    pub in_place: usize,
    pub replace: usize,
    pub unchanged: usize,
}

impl std::fmt::Display for ChangeSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} to update in-place, {} forcing replacement, {} unchanged",
            self.in_place, self.replace, self.unchanged
        )
    }
}
