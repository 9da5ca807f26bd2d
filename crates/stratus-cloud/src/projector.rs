//! Mapping between remote objects, local state and request payloads

use crate::action::Operation;
use crate::error::{CloudError, Result};
use crate::schema::{Presence, ResourceDescriptor};
use crate::state::LocalState;
use crate::value::{Attributes, Value};

/// Attribute values sent to a remote client
///
/// Flat and ordered; each client shapes it into its own wire body.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestPayload {
    attributes: Attributes,
}

impl RequestPayload {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    pub fn contains(&self, name: &str) -> bool {
        self.attributes.contains_key(name)
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.attributes.get(name)
    }

    pub fn get_str(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(Value::as_str)
    }

    pub fn get_int(&self, name: &str) -> Option<i64> {
        self.get(name).and_then(Value::as_int)
    }

    pub fn get_bool(&self, name: &str) -> Option<bool> {
        self.get(name).and_then(Value::as_bool)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.attributes.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.attributes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty()
    }
}

/// Projector pair bound to one descriptor
pub struct Projector<'a> {
    descriptor: &'a ResourceDescriptor,
}

impl<'a> Projector<'a> {
    pub fn new(descriptor: &'a ResourceDescriptor) -> Self {
        Self { descriptor }
    }

    /// Build local state from the attributes a remote object reported.
    ///
    /// Reported names outside the descriptor are dropped. Configurable
    /// attributes the remote does not echo back keep their prior value;
    /// everything else missing takes the kind's zero value.
    pub fn to_local(&self, id: &str, reported: Attributes, prior: Option<&LocalState>) -> LocalState {
        let mut reported = reported;
        let mut state = LocalState::new().with_id(id);

        for spec in self.descriptor.attributes() {
            let value = match reported.remove(&spec.name) {
                Some(value) if !value.is_null() => value,
                _ => prior
                    .filter(|_| spec.is_configurable())
                    .and_then(|p| p.get(&spec.name))
                    .cloned()
                    .unwrap_or_else(|| spec.kind.zero_value()),
            };
            state.set(spec.name.clone(), value);
        }

        if !reported.is_empty() {
            tracing::trace!(
                "{}: ignoring undeclared remote fields {:?}",
                self.descriptor.name(),
                reported.keys().collect::<Vec<_>>()
            );
        }

        state
    }

    /// Build the payload for a create or update request.
    ///
    /// Create carries every set configurable attribute; update carries only
    /// `changed` (nulls included, so clients can clear removed values).
    pub fn to_request(
        &self,
        state: &LocalState,
        operation: Operation,
        changed: &[String],
    ) -> Result<RequestPayload> {
        let mut payload = RequestPayload::new();

        match operation {
            Operation::Create => {
                for spec in self.descriptor.attributes().filter(|a| a.is_configurable()) {
                    match state.get(&spec.name) {
                        Some(value) => {
                            payload.attributes.insert(spec.name.clone(), value.clone());
                        }
                        None if spec.presence == Presence::Required => {
                            return Err(CloudError::Encoding {
                                attribute: spec.name.clone(),
                                reason: "required attribute is absent at create".to_string(),
                            });
                        }
                        None => {}
                    }
                }
            }
            Operation::Update => {
                for name in changed {
                    let spec = self.descriptor.get(name).ok_or_else(|| CloudError::Encoding {
                        attribute: name.clone(),
                        reason: format!("not declared by {}", self.descriptor.name()),
                    })?;
                    if !spec.is_configurable() {
                        return Err(CloudError::Encoding {
                            attribute: name.clone(),
                            reason: "computed attributes cannot be updated".to_string(),
                        });
                    }
                    let value = state.get(name).cloned().unwrap_or(Value::Null);
                    payload.attributes.insert(name.clone(), value);
                }
            }
            other => {
                return Err(CloudError::Encoding {
                    attribute: String::new(),
                    reason: format!("{} does not send a request payload", other),
                });
            }
        }

        Ok(payload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::AttributeSpec;

    fn descriptor() -> ResourceDescriptor {
        ResourceDescriptor::new("peering")
            .with(AttributeSpec::string("name").required())
            .with(AttributeSpec::string("vpc_id").required().force_new())
            .with(AttributeSpec::string("peer_tenant_id").force_new())
            .with(AttributeSpec::string("region").optional_computed())
            .with(AttributeSpec::string("status").computed())
    }

    #[test]
    fn test_to_local_fills_missing_attributes() {
        let mut reported = Attributes::new();
        reported.insert("name".to_string(), Value::from("peer"));
        reported.insert("status".to_string(), Value::from("ACTIVE"));
        reported.insert("created_at".to_string(), Value::from("yesterday"));

        let prior = LocalState::new()
            .with("region", "eu-de")
            .with("status", "CREATING");
        let state = Projector::new(&descriptor()).to_local("p1", reported, Some(&prior));

        assert_eq!(state.id(), Some("p1"));
        assert_eq!(state.get_str("name"), Some("peer"));
        assert_eq!(state.get_str("status"), Some("ACTIVE"));
        assert_eq!(state.get_str("region"), Some("eu-de"));
        assert_eq!(state.get_str("vpc_id"), Some(""));
        assert!(state.get("created_at").is_none());
    }

    #[test]
    fn test_to_local_does_not_carry_computed_from_prior() {
        let prior = LocalState::new().with("status", "CREATING");
        let state = Projector::new(&descriptor()).to_local("p1", Attributes::new(), Some(&prior));
        assert_eq!(state.get_str("status"), Some(""));
    }

    #[test]
    fn test_create_payload() {
        let state = LocalState::new()
            .with("name", "peer")
            .with("vpc_id", "v1")
            .with("status", "ignored");
        let payload = Projector::new(&descriptor())
            .to_request(&state, Operation::Create, &[])
            .unwrap();
        assert_eq!(payload.names().collect::<Vec<_>>(), vec!["name", "vpc_id"]);
    }

    #[test]
    fn test_create_payload_requires_required() {
        let state = LocalState::new().with("name", "peer");
        let err = Projector::new(&descriptor())
            .to_request(&state, Operation::Create, &[])
            .unwrap_err();
        assert!(matches!(err, CloudError::Encoding { attribute, .. } if attribute == "vpc_id"));
    }

    #[test]
    fn test_update_payload_only_changed() {
        let state = LocalState::new().with("name", "renamed").with("vpc_id", "v1");
        let payload = Projector::new(&descriptor())
            .to_request(&state, Operation::Update, &["name".to_string()])
            .unwrap();
        assert_eq!(payload.len(), 1);
        assert_eq!(payload.get_str("name"), Some("renamed"));
    }

    #[test]
    fn test_update_payload_rejects_computed() {
        let state = LocalState::new().with("status", "ACTIVE");
        let result = Projector::new(&descriptor()).to_request(
            &state,
            Operation::Update,
            &["status".to_string()],
        );
        assert!(result.is_err());
    }
}
