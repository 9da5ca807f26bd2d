//! Resource type declarations
//!
//! A [`Resource`] bundles what the reconciler needs to know about one remote
//! resource type: its attribute descriptor, the lifecycle statuses it moves
//! through, and how remote objects map back to attributes.

use crate::client::RemoteObject;
use crate::poll::PollConfig;
use crate::schema::ResourceDescriptor;
use crate::value::Attributes;
use std::time::Duration;

/// How the reconciler fetches a single object by id
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lookup {
    /// Direct GET by id
    Get,
    /// List filtered by id, expecting zero or one match
    List,
}

/// Wait bounds for the operations that poll.
///
/// Update makes one call and one read, so it has no bound of its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeouts {
    pub create: Duration,
    pub delete: Duration,
}

impl Timeouts {
    pub fn uniform(timeout: Duration) -> Self {
        Self {
            create: timeout,
            delete: timeout,
        }
    }

    pub fn minutes(minutes: u64) -> Self {
        Self::uniform(Duration::from_secs(minutes.saturating_mul(60)))
    }
}

impl Default for Timeouts {
    fn default() -> Self {
        Self::minutes(10)
    }
}

/// Status vocabulary and wait parameters of a resource type
#[derive(Debug, Clone)]
pub struct Lifecycle {
    pub lookup: Lookup,
    pub pending_create: Vec<String>,
    pub steady: Vec<String>,
    pub pending_delete: Vec<String>,
    pub timeouts: Timeouts,
    pub poll: PollConfig,
}

impl Lifecycle {
    pub fn new<S>(steady: S) -> Self
    where
        S: IntoIterator,
        S::Item: Into<String>,
    {
        Self {
            lookup: Lookup::Get,
            pending_create: vec!["CREATING".to_string()],
            steady: steady.into_iter().map(Into::into).collect(),
            pending_delete: vec!["DELETING".to_string()],
            timeouts: Timeouts::default(),
            poll: PollConfig::default(),
        }
    }

    pub fn lookup(mut self, lookup: Lookup) -> Self {
        self.lookup = lookup;
        self
    }

    pub fn pending_create<S>(mut self, statuses: S) -> Self
    where
        S: IntoIterator,
        S::Item: Into<String>,
    {
        self.pending_create = statuses.into_iter().map(Into::into).collect();
        self
    }

    pub fn pending_delete<S>(mut self, statuses: S) -> Self
    where
        S: IntoIterator,
        S::Item: Into<String>,
    {
        self.pending_delete = statuses.into_iter().map(Into::into).collect();
        self
    }

    pub fn timeouts(mut self, timeouts: Timeouts) -> Self {
        self.timeouts = timeouts;
        self
    }

    pub fn poll(mut self, poll: PollConfig) -> Self {
        self.poll = poll;
        self
    }

    pub fn is_steady(&self, status: &str) -> bool {
        self.steady.iter().any(|s| s == status)
    }
}

/// Status label of an object that no longer exists
pub const DELETED: &str = "DELETED";

/// A remote resource type managed by the reconciler
pub trait Resource: Send + Sync + 'static {
    type Object: RemoteObject;

    fn descriptor(&self) -> &ResourceDescriptor;

    fn lifecycle(&self) -> &Lifecycle;

    /// Attributes reported by a remote object, named as in the descriptor
    fn extract(&self, object: &Self::Object) -> Attributes;

    /// Status fed to the create wait
    fn create_status(&self, object: &Self::Object) -> String {
        object.status().to_string()
    }

    /// Status fed to the delete wait while the object still exists
    fn delete_status(&self, _object: &Self::Object) -> String {
        self.lifecycle()
            .pending_delete
            .first()
            .cloned()
            .unwrap_or_else(|| "DELETING".to_string())
    }
}
