//! VBS backup policies (`/v2/{project}/backuppolicy`)
//!
//! The policy API cannot fetch a single policy, so lookups list all policies
//! and match the id locally. Tags live behind a separate endpoint and are
//! replaced wholesale (batch delete, then batch create) on update.

use crate::client::{ServiceClient, payload_string};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use stratus_cloud::{
    AttributeKind, AttributeSpec, Attributes, Lifecycle, ListFilter, Lookup, RemoteClient,
    RemoteLister, RemoteObject, RequestPayload, Resource, ResourceDescriptor, Timeouts,
    TransportError, Validator, Value,
};

pub const RESOURCE_TYPE: &str = "opentelekomcloud_vbs_backup_policy_v2";

const POLICY_FIELDS: [&str; 6] = [
    "name",
    "start_time",
    "frequency",
    "rentention_num",
    "retain_first_backup",
    "status",
];

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    pub key: String,
    #[serde(default)]
    pub value: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScheduledPolicy {
    #[serde(default)]
    pub start_time: String,
    #[serde(default)]
    pub frequency: i64,
    #[serde(default)]
    pub rentention_num: i64,
    #[serde(default)]
    pub remain_first_backup: String,
    #[serde(default)]
    pub status: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct BackupPolicy {
    #[serde(rename = "backup_policy_id")]
    pub id: String,
    #[serde(rename = "backup_policy_name", default)]
    pub name: String,
    #[serde(default)]
    pub scheduled_policy: ScheduledPolicy,
    #[serde(default)]
    pub policy_resource_count: i64,
    /// Filled from the tag endpoint
    #[serde(skip)]
    pub tags: Vec<Tag>,
}

impl RemoteObject for BackupPolicy {
    fn id(&self) -> &str {
        &self.id
    }

    fn status(&self) -> &str {
        &self.scheduled_policy.status
    }
}

fn tags_to_value(tags: &[Tag]) -> Value {
    Value::List(
        tags.iter()
            .map(|tag| {
                let mut block = Attributes::new();
                block.insert("key".to_string(), Value::from(&tag.key));
                block.insert("value".to_string(), Value::from(&tag.value));
                Value::Block(block)
            })
            .collect(),
    )
}

fn tags_from_payload(payload: &RequestPayload) -> Vec<Tag> {
    payload
        .get("tags")
        .and_then(Value::as_list)
        .unwrap_or_default()
        .iter()
        .filter_map(Value::as_block)
        .map(|block| Tag {
            key: block
                .get("key")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
            value: block
                .get("value")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
        })
        .collect()
}

// ============ API Types ============

#[derive(Debug, Deserialize)]
struct PolicyList {
    #[serde(default)]
    backup_policies: Vec<BackupPolicy>,
}

#[derive(Debug, Default, Deserialize)]
struct TagList {
    #[serde(default)]
    tags: Vec<Tag>,
}

#[derive(Debug, Serialize)]
struct CreatePolicyRequest {
    backup_policy_name: String,
    scheduled_policy: ScheduledPolicy,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tags: Vec<Tag>,
}

#[derive(Debug, Default, Serialize)]
struct UpdatePolicyRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    backup_policy_name: Option<String>,
    scheduled_policy: UpdateScheduledPolicy,
}

#[derive(Debug, Default, Serialize)]
struct UpdateScheduledPolicy {
    #[serde(skip_serializing_if = "Option::is_none")]
    start_time: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    frequency: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    rentention_num: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    remain_first_backup: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    status: Option<String>,
}

#[derive(Debug, Serialize)]
struct TagAction<'a> {
    action: &'static str,
    tags: &'a [Tag],
}

/// Backup policy API client
pub struct BackupPolicyClient {
    service: ServiceClient,
}

impl BackupPolicyClient {
    pub fn new(service: ServiceClient) -> Self {
        Self { service }
    }

    fn path(&self) -> String {
        format!("/v2/{}/backuppolicy", self.service.project_id())
    }

    /// Current tags; a policy without a tag record has none
    async fn tags(&self, id: &str) -> Result<Vec<Tag>, TransportError> {
        match self
            .service
            .get::<TagList>(&format!("{}/{}/tags", self.path(), id), &[])
            .await
        {
            Ok(list) => Ok(list.tags),
            Err(e) if e.is_not_found() => Ok(Vec::new()),
            Err(e) => Err(e),
        }
    }

    async fn tag_action(&self, id: &str, action: &'static str, tags: &[Tag]) -> Result<(), TransportError> {
        if tags.is_empty() {
            return Ok(());
        }
        tracing::debug!("Tag {} on backup policy {}: {} tags", action, id, tags.len());
        self.service
            .post_empty(
                &format!("{}/{}/tags/action", self.path(), id),
                &TagAction { action, tags },
            )
            .await
    }

    async fn replace_tags(&self, id: &str, tags: &[Tag]) -> Result<(), TransportError> {
        let old = self.tags(id).await?;
        self.tag_action(id, "delete", &old).await?;
        self.tag_action(id, "create", tags).await
    }
}

#[async_trait]
impl RemoteLister for BackupPolicyClient {
    type Object = BackupPolicy;

    async fn list(&self, filter: &ListFilter) -> Result<Vec<BackupPolicy>, TransportError> {
        let list: PolicyList = self.service.get(&self.path(), &[]).await?;

        let mut policies: Vec<BackupPolicy> = list
            .backup_policies
            .into_iter()
            .filter(|p| {
                filter.iter().all(|(key, expected)| match key {
                    "id" => p.id == expected,
                    "name" => p.name == expected,
                    _ => true,
                })
            })
            .collect();

        for policy in &mut policies {
            policy.tags = self.tags(&policy.id).await?;
        }
        Ok(policies)
    }
}

#[async_trait]
impl RemoteClient for BackupPolicyClient {
    async fn get(&self, id: &str) -> Result<BackupPolicy, TransportError> {
        self.list(&ListFilter::by_id(id))
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| TransportError::NotFound(format!("backup policy {} not found", id)))
    }

    async fn create(&self, payload: &RequestPayload) -> Result<BackupPolicy, TransportError> {
        let request = CreatePolicyRequest {
            backup_policy_name: payload_string(payload, "name").unwrap_or_default(),
            scheduled_policy: ScheduledPolicy {
                start_time: payload_string(payload, "start_time").unwrap_or_default(),
                frequency: payload.get_int("frequency").unwrap_or_default(),
                rentention_num: payload.get_int("rentention_num").unwrap_or_default(),
                remain_first_backup: payload_string(payload, "retain_first_backup")
                    .unwrap_or_default(),
                status: payload_string(payload, "status").unwrap_or_default(),
            },
            tags: tags_from_payload(payload),
        };

        let mut created: BackupPolicy = self.service.post(&self.path(), &request).await?;
        created.tags = request.tags;
        Ok(created)
    }

    /// Only the attributes that were sent are filled in on the returned
    /// policy; the caller confirms the result with its own read.
    async fn update(&self, id: &str, payload: &RequestPayload) -> Result<BackupPolicy, TransportError> {
        let request = UpdatePolicyRequest {
            backup_policy_name: payload_string(payload, "name"),
            scheduled_policy: UpdateScheduledPolicy {
                start_time: payload_string(payload, "start_time"),
                frequency: payload.get_int("frequency"),
                rentention_num: payload.get_int("rentention_num"),
                remain_first_backup: payload_string(payload, "retain_first_backup"),
                status: payload_string(payload, "status"),
            },
        };

        if POLICY_FIELDS.iter().any(|f| payload.contains(f)) {
            let _: serde_json::Value = self
                .service
                .put(&format!("{}/{}", self.path(), id), &request)
                .await?;
        }

        let tags = tags_from_payload(payload);
        if payload.contains("tags") {
            self.replace_tags(id, &tags).await?;
        }

        let scheduled = request.scheduled_policy;
        Ok(BackupPolicy {
            id: id.to_string(),
            name: request.backup_policy_name.unwrap_or_default(),
            scheduled_policy: ScheduledPolicy {
                start_time: scheduled.start_time.unwrap_or_default(),
                frequency: scheduled.frequency.unwrap_or_default(),
                rentention_num: scheduled.rentention_num.unwrap_or_default(),
                remain_first_backup: scheduled.remain_first_backup.unwrap_or_default(),
                status: scheduled.status.unwrap_or_default(),
            },
            policy_resource_count: 0,
            tags,
        })
    }

    async fn delete(&self, id: &str) -> Result<(), TransportError> {
        self.service
            .delete(&format!("{}/{}", self.path(), id), &[])
            .await
    }
}

/// Managed VBS backup policy
pub struct BackupPolicyResource {
    descriptor: ResourceDescriptor,
    lifecycle: Lifecycle,
}

impl BackupPolicyResource {
    pub fn new() -> Self {
        let tag = AttributeKind::Block(vec![
            AttributeSpec::string("key")
                .required()
                .validate(Validator::length(1, 36))
                .validate(Validator::pattern(r"^[A-Za-z0-9_\-]*$")),
            AttributeSpec::string("value")
                .required()
                .validate(Validator::length(0, 43))
                .validate(Validator::pattern(r"^[A-Za-z0-9_.\-]*$")),
        ]);

        let descriptor = ResourceDescriptor::new(RESOURCE_TYPE)
            .with(AttributeSpec::string("region").optional_computed().force_new())
            .with(
                AttributeSpec::string("name")
                    .required()
                    .validate(Validator::length(1, 64))
                    .validate(Validator::pattern(r"^[A-Za-z0-9_\-]*$"))
                    .validate(Validator::not_prefixed("default")),
            )
            .with(AttributeSpec::string("start_time").required())
            .with(
                AttributeSpec::int("frequency")
                    .required()
                    .validate(Validator::range(1, 14)),
            )
            .with(
                AttributeSpec::int("rentention_num")
                    .required()
                    .validate(Validator::range(2, 99_999)),
            )
            .with(
                AttributeSpec::string("retain_first_backup")
                    .required()
                    .validate(Validator::one_of(["Y", "N"])),
            )
            .with(
                AttributeSpec::string("status")
                    .required()
                    .validate(Validator::one_of(["ON", "OFF"])),
            )
            .with(AttributeSpec::list("tags", tag).optional())
            .with(AttributeSpec::int("policy_resource_count").computed());

        let lifecycle = Lifecycle::new(["ON", "OFF"])
            .lookup(Lookup::List)
            .pending_create(Vec::<String>::new())
            .pending_delete(["available"])
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

impl Default for BackupPolicyResource {
    fn default() -> Self {
        Self::new()
    }
}

impl Resource for BackupPolicyResource {
    type Object = BackupPolicy;

    fn descriptor(&self) -> &ResourceDescriptor {
        &self.descriptor
    }

    fn lifecycle(&self) -> &Lifecycle {
        &self.lifecycle
    }

    fn extract(&self, policy: &BackupPolicy) -> Attributes {
        let schedule = &policy.scheduled_policy;
        let mut attrs = Attributes::new();
        attrs.insert("name".to_string(), Value::from(&policy.name));
        attrs.insert("start_time".to_string(), Value::from(&schedule.start_time));
        attrs.insert("frequency".to_string(), Value::from(schedule.frequency));
        attrs.insert(
            "rentention_num".to_string(),
            Value::from(schedule.rentention_num),
        );
        attrs.insert(
            "retain_first_backup".to_string(),
            Value::from(&schedule.remain_first_backup),
        );
        attrs.insert("status".to_string(), Value::from(&schedule.status));
        attrs.insert(
            "policy_resource_count".to_string(),
            Value::from(policy.policy_resource_count),
        );
        attrs.insert("tags".to_string(), tags_to_value(&policy.tags));
        attrs
    }
}
