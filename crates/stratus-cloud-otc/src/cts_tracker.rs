//! CTS trackers (`/v1.0/{project}/tracker`)
//!
//! A project has at most one tracker and it is always named `system`, so the
//! tracker name doubles as the resource id. The modify call replaces the whole
//! tracker, which is why updates read the current tracker first and overlay
//! the changed attributes.

use crate::client::{
    ServiceClient, payload_string, payload_string_or_cleared, payload_strings,
    payload_strings_or_cleared,
};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use stratus_cloud::{
    AttributeKind, AttributeSpec, Attributes, Lifecycle, ListFilter, Lookup, RemoteClient,
    RemoteLister, RemoteObject, RequestPayload, Resource, ResourceDescriptor, Timeouts,
    TransportError, Validator, Value,
};

pub const RESOURCE_TYPE: &str = "opentelekomcloud_cts_tracker_v1";

/// Name of the only tracker a project can have
pub const TRACKER_NAME: &str = "system";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    #[serde(default)]
    pub is_support_smn: bool,
    #[serde(default)]
    pub topic_id: String,
    #[serde(default)]
    pub operations: Vec<String>,
    #[serde(default)]
    pub is_send_all_key_operation: bool,
    #[serde(default)]
    pub need_notify_user_list: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tracker {
    pub tracker_name: String,
    #[serde(default)]
    pub bucket_name: String,
    #[serde(default)]
    pub file_prefix_name: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub smn: Notification,
}

impl RemoteObject for Tracker {
    fn id(&self) -> &str {
        &self.tracker_name
    }

    fn status(&self) -> &str {
        &self.status
    }
}

impl Tracker {
    /// Overlay the attributes present in `payload`
    fn apply(&mut self, payload: &RequestPayload) {
        if let Some(bucket) = payload_string(payload, "bucket_name") {
            self.bucket_name = bucket;
        }
        if let Some(prefix) = payload_string_or_cleared(payload, "file_prefix_name") {
            self.file_prefix_name = prefix;
        }
        if let Some(status) = payload_string(payload, "status") {
            self.status = status;
        }
        if let Some(enabled) = payload.get_bool("is_support_smn") {
            self.smn.is_support_smn = enabled;
        }
        if let Some(topic) = payload_string(payload, "topic_id") {
            self.smn.topic_id = topic;
        }
        if let Some(operations) = payload_strings(payload, "operations") {
            self.smn.operations = operations;
        }
        if let Some(all) = payload.get_bool("is_send_all_key_operation") {
            self.smn.is_send_all_key_operation = all;
        }
        if let Some(users) = payload_strings_or_cleared(payload, "need_notify_user_list") {
            self.smn.need_notify_user_list = users;
        }
    }
}

// ============ API Types ============

#[derive(Debug, Serialize)]
struct CreateTrackerRequest<'a> {
    bucket_name: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    file_prefix_name: Option<&'a str>,
    smn: &'a Notification,
}

#[derive(Debug, Serialize)]
struct UpdateTrackerRequest<'a> {
    bucket_name: &'a str,
    file_prefix_name: &'a str,
    status: &'a str,
    smn: &'a Notification,
}

impl<'a> From<&'a Tracker> for UpdateTrackerRequest<'a> {
    fn from(tracker: &'a Tracker) -> Self {
        Self {
            bucket_name: &tracker.bucket_name,
            file_prefix_name: &tracker.file_prefix_name,
            status: &tracker.status,
            smn: &tracker.smn,
        }
    }
}

/// Tracker API client
pub struct TrackerClient {
    service: ServiceClient,
}

impl TrackerClient {
    pub fn new(service: ServiceClient) -> Self {
        Self { service }
    }

    fn path(&self) -> String {
        format!("/v1.0/{}/tracker", self.service.project_id())
    }

    async fn modify(&self, tracker: &Tracker) -> Result<(), TransportError> {
        self.service
            .put_empty(
                &format!("{}/{}", self.path(), tracker.tracker_name),
                &UpdateTrackerRequest::from(tracker),
            )
            .await
    }
}

#[async_trait]
impl RemoteLister for TrackerClient {
    type Object = Tracker;

    async fn list(&self, filter: &ListFilter) -> Result<Vec<Tracker>, TransportError> {
        let name = filter
            .id()
            .or_else(|| filter.get("tracker_name"))
            .unwrap_or(TRACKER_NAME);

        let trackers: Vec<Tracker> = self
            .service
            .get(&self.path(), &[("tracker_name", name)])
            .await?;

        Ok(trackers
            .into_iter()
            .filter(|t| t.tracker_name == name)
            .filter(|t| filter.get("status").is_none_or(|s| t.status == s))
            .collect())
    }
}

#[async_trait]
impl RemoteClient for TrackerClient {
    async fn get(&self, id: &str) -> Result<Tracker, TransportError> {
        self.list(&ListFilter::by_id(id))
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| TransportError::NotFound(format!("tracker {} not found", id)))
    }

    async fn create(&self, payload: &RequestPayload) -> Result<Tracker, TransportError> {
        let mut desired = Tracker {
            tracker_name: TRACKER_NAME.to_string(),
            bucket_name: String::new(),
            file_prefix_name: String::new(),
            status: String::new(),
            smn: Notification::default(),
        };
        desired.apply(payload);

        let request = CreateTrackerRequest {
            bucket_name: &desired.bucket_name,
            file_prefix_name: Some(desired.file_prefix_name.as_str()).filter(|p| !p.is_empty()),
            smn: &desired.smn,
        };
        let mut created: Tracker = self.service.post(&self.path(), &request).await?;

        // new trackers always start enabled
        if !desired.status.is_empty() && desired.status != created.status {
            tracing::debug!("Setting tracker {} status to {}", created.tracker_name, desired.status);
            created.status = desired.status;
            self.modify(&created).await?;
        }
        Ok(created)
    }

    async fn update(&self, id: &str, payload: &RequestPayload) -> Result<Tracker, TransportError> {
        let mut tracker = self.get(id).await?;
        tracker.apply(payload);
        self.modify(&tracker).await?;
        Ok(tracker)
    }

    async fn delete(&self, id: &str) -> Result<(), TransportError> {
        self.service
            .delete(&self.path(), &[("tracker_name", id)])
            .await
    }
}

/// Managed CTS tracker
pub struct TrackerResource {
    descriptor: ResourceDescriptor,
    lifecycle: Lifecycle,
}

impl TrackerResource {
    pub fn new() -> Self {
        let descriptor = ResourceDescriptor::new(RESOURCE_TYPE)
            .with(AttributeSpec::string("region").optional_computed().force_new())
            .with(AttributeSpec::string("bucket_name").required())
            .with(
                AttributeSpec::string("file_prefix_name")
                    .optional()
                    .validate(Validator::length(0, 64)),
            )
            .with(
                AttributeSpec::string("status")
                    .optional_computed()
                    .validate(Validator::one_of(["enabled", "disabled"])),
            )
            .with(AttributeSpec::bool("is_support_smn").required())
            .with(AttributeSpec::string("topic_id").required())
            .with(AttributeSpec::list("operations", AttributeKind::String).required())
            .with(AttributeSpec::bool("is_send_all_key_operation").required())
            .with(AttributeSpec::list("need_notify_user_list", AttributeKind::String).optional())
            .with(AttributeSpec::string("tracker_name").computed());

        let lifecycle = Lifecycle::new(["enabled", "disabled"])
            .lookup(Lookup::List)
            .pending_create(Vec::<String>::new())
            .timeouts(Timeouts::minutes(5));

        Self {
            descriptor,
            lifecycle,
        }
    }

    pub fn timeouts(mut self, timeouts: Timeouts) -> Self {
        self.lifecycle.timeouts = timeouts;
        self
    }
}

impl Default for TrackerResource {
    fn default() -> Self {
        Self::new()
    }
}

impl Resource for TrackerResource {
    type Object = Tracker;

    fn descriptor(&self) -> &ResourceDescriptor {
        &self.descriptor
    }

    fn lifecycle(&self) -> &Lifecycle {
        &self.lifecycle
    }

    fn extract(&self, tracker: &Tracker) -> Attributes {
        let smn = &tracker.smn;
        let mut attrs = Attributes::new();
        attrs.insert("tracker_name".to_string(), Value::from(&tracker.tracker_name));
        attrs.insert("bucket_name".to_string(), Value::from(&tracker.bucket_name));
        attrs.insert(
            "file_prefix_name".to_string(),
            Value::from(&tracker.file_prefix_name),
        );
        attrs.insert("status".to_string(), Value::from(&tracker.status));
        attrs.insert("is_support_smn".to_string(), Value::from(smn.is_support_smn));
        attrs.insert("topic_id".to_string(), Value::from(&smn.topic_id));
        attrs.insert("operations".to_string(), Value::from(smn.operations.clone()));
        attrs.insert(
            "is_send_all_key_operation".to_string(),
            Value::from(smn.is_send_all_key_operation),
        );
        attrs.insert(
            "need_notify_user_list".to_string(),
            Value::from(smn.need_notify_user_list.clone()),
        );
        attrs
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use stratus_cloud::{DesiredChange, LocalState, Reconciler};
    use wiremock::matchers::{body_json, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const TRACKERS: &str = "/v1.0/proj/tracker";

    fn tracker_json(bucket: &str, status: &str) -> serde_json::Value {
        serde_json::json!({
            "tracker_name": "system",
            "bucket_name": bucket,
            "file_prefix_name": "yO8Q",
            "status": status,
            "smn": {
                "is_support_smn": true,
                "topic_id": "urn:smn:topic",
                "operations": ["login"],
                "is_send_all_key_operation": false,
                "need_notify_user_list": ["user1"]
            }
        })
    }

    fn config() -> LocalState {
        LocalState::new()
            .with("bucket_name", "tf-test-bucket")
            .with("file_prefix_name", "yO8Q")
            .with("is_support_smn", true)
            .with("topic_id", "urn:smn:topic")
            .with("operations", vec!["login"])
            .with("is_send_all_key_operation", false)
            .with("need_notify_user_list", vec!["user1"])
    }

    fn reconciler(server: &MockServer) -> Reconciler<TrackerResource, TrackerClient> {
        let service = ServiceClient::new(server.uri(), "proj", "token").unwrap();
        Reconciler::new(
            Arc::new(TrackerResource::new()),
            Arc::new(TrackerClient::new(service)),
        )
    }

    #[test]
    fn test_status_validation() {
        let resource = TrackerResource::new();
        let errors = resource
            .descriptor()
            .validate(&config().with("status", "paused"));
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].attribute, "status");
    }

    #[tokio::test]
    async fn test_create_uses_tracker_name_as_id() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(TRACKERS))
            .and(body_json(serde_json::json!({
                "bucket_name": "tf-test-bucket",
                "file_prefix_name": "yO8Q",
                "smn": {
                    "is_support_smn": true,
                    "topic_id": "urn:smn:topic",
                    "operations": ["login"],
                    "is_send_all_key_operation": false,
                    "need_notify_user_list": ["user1"]
                }
            })))
            .respond_with(
                ResponseTemplate::new(201).set_body_json(tracker_json("tf-test-bucket", "enabled")),
            )
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path(TRACKERS))
            .and(query_param("tracker_name", "system"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
                tracker_json("tf-test-bucket", "enabled")
            ])))
            .mount(&server)
            .await;

        let mut state = config();
        reconciler(&server)
            .create(&mut state, &Timeouts::minutes(5))
            .await
            .unwrap();

        assert_eq!(state.id(), Some("system"));
        assert_eq!(state.get_str("status"), Some("enabled"));
        assert_eq!(state.get_str("tracker_name"), Some("system"));
    }

    #[tokio::test]
    async fn test_update_sends_whole_tracker() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(TRACKERS))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
                tracker_json("tf-test-bucket", "enabled")
            ])))
            .mount(&server)
            .await;
        Mock::given(method("PUT"))
            .and(path(format!("{}/system", TRACKERS)))
            .and(body_json(serde_json::json!({
                "bucket_name": "tf-test-bucket-update",
                "file_prefix_name": "yO8Q",
                "status": "enabled",
                "smn": {
                    "is_support_smn": true,
                    "topic_id": "urn:smn:topic",
                    "operations": ["login"],
                    "is_send_all_key_operation": false,
                    "need_notify_user_list": ["user1"]
                }
            })))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let client = TrackerClient::new(ServiceClient::new(server.uri(), "proj", "token").unwrap());
        let payload = RequestPayload::new().with("bucket_name", "tf-test-bucket-update");

        let updated = client.update("system", &payload).await.unwrap();
        assert_eq!(updated.bucket_name, "tf-test-bucket-update");
    }

    #[tokio::test]
    async fn test_update_clears_removed_attributes() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(TRACKERS))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
                tracker_json("tf-test-bucket", "enabled")
            ])))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path(TRACKERS))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([{
                "tracker_name": "system",
                "bucket_name": "tf-test-bucket",
                "file_prefix_name": "",
                "status": "enabled",
                "smn": {
                    "is_support_smn": true,
                    "topic_id": "urn:smn:topic",
                    "operations": ["login"],
                    "is_send_all_key_operation": false,
                    "need_notify_user_list": []
                }
            }])))
            .mount(&server)
            .await;
        Mock::given(method("PUT"))
            .and(path(format!("{}/system", TRACKERS)))
            .and(body_json(serde_json::json!({
                "bucket_name": "tf-test-bucket",
                "file_prefix_name": "",
                "status": "enabled",
                "smn": {
                    "is_support_smn": true,
                    "topic_id": "urn:smn:topic",
                    "operations": ["login"],
                    "is_send_all_key_operation": false,
                    "need_notify_user_list": []
                }
            })))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let old = config()
            .with_id("system")
            .with("status", "enabled")
            .with("tracker_name", "system");
        let mut desired = config();
        desired.remove("file_prefix_name");
        desired.remove("need_notify_user_list");

        let reconciler = reconciler(&server);
        let updated = reconciler.update(&old, &desired).await.unwrap();

        assert_eq!(updated.get_str("file_prefix_name"), Some(""));
        let change = DesiredChange::compute(reconciler.descriptor(), &updated, &desired);
        assert!(change.is_empty(), "{:?}", change);
    }

    #[tokio::test]
    async fn test_missing_tracker_is_a_tombstone() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(TRACKERS))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([])))
            .mount(&server)
            .await;

        let outcome = reconciler(&server).read("system").await.unwrap();
        assert!(outcome.is_tombstone());
    }

    #[tokio::test]
    async fn test_delete_by_name() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path(TRACKERS))
            .and(query_param("tracker_name", "system"))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        let client = TrackerClient::new(ServiceClient::new(server.uri(), "proj", "token").unwrap());
        client.delete("system").await.unwrap();
    }
}
