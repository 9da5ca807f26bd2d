//! Remote client boundary
//!
//! A remote client is bound to one service and region and must be safe for
//! concurrent use across distinct resource ids.

use crate::error::TransportError;
use crate::projector::RequestPayload;
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::fmt;

/// Typed object returned by a remote API
pub trait RemoteObject: Clone + fmt::Debug + Send + Sync + 'static {
    fn id(&self) -> &str;

    /// Domain status string as reported by the API
    fn status(&self) -> &str;
}

/// Query-string style filter for list calls
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListFilter {
    fields: BTreeMap<String, String>,
}

impl ListFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn by_id(id: impl Into<String>) -> Self {
        Self::new().with("id", id)
    }

    /// Add a field; empty values are skipped
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        let value = value.into();
        if !value.is_empty() {
            self.fields.insert(key.into(), value);
        }
        self
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.fields.get(key).map(String::as_str)
    }

    pub fn id(&self) -> Option<&str> {
        self.get("id")
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl fmt::Display for ListFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.fields.is_empty() {
            return write!(f, "no filter");
        }
        let parts: Vec<String> = self
            .fields
            .iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect();
        write!(f, "{}", parts.join(", "))
    }
}

/// List half of the remote boundary, enough for data sources
#[async_trait]
pub trait RemoteLister: Send + Sync {
    type Object: RemoteObject;

    async fn list(&self, filter: &ListFilter) -> Result<Vec<Self::Object>, TransportError>;
}

/// Full CRUD boundary used by the reconciler
#[async_trait]
pub trait RemoteClient: RemoteLister {
    async fn get(&self, id: &str) -> Result<Self::Object, TransportError>;

    async fn create(&self, payload: &RequestPayload) -> Result<Self::Object, TransportError>;

    async fn update(&self, id: &str, payload: &RequestPayload)
    -> Result<Self::Object, TransportError>;

    /// `NotFound` when the object is already gone, `Conflict` while it is busy
    async fn delete(&self, id: &str) -> Result<(), TransportError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_skips_empty_values() {
        let filter = ListFilter::new()
            .with("name", "peer")
            .with("status", "")
            .with("vpc_id", "v1");
        assert_eq!(filter.get("status"), None);
        assert_eq!(filter.to_string(), "name=peer, vpc_id=v1");
    }

    #[test]
    fn test_by_id() {
        let filter = ListFilter::by_id("abc");
        assert_eq!(filter.id(), Some("abc"));
        assert!(ListFilter::by_id("").is_empty());
        assert_eq!(ListFilter::new().to_string(), "no filter");
    }
}
