//! Block storage volumes (`/v1/{project}/volumes`)

use crate::client::{ServiceClient, payload_string, payload_string_or_cleared};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use stratus_cloud::{
    AttributeKind, AttributeSpec, Attributes, Lifecycle, ListFilter, RemoteClient, RemoteLister,
    RemoteObject, RequestPayload, Resource, ResourceDescriptor, Timeouts, TransportError, Value,
};

pub const RESOURCE_TYPE: &str = "opentelekomcloud_blockstorage_volume_v1";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Attachment {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub server_id: String,
    #[serde(default)]
    pub device: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Volume {
    pub id: String,
    pub status: String,
    #[serde(default)]
    pub size: i64,
    #[serde(default, rename = "display_name")]
    pub name: Option<String>,
    #[serde(default, rename = "display_description")]
    pub description: Option<String>,
    #[serde(default)]
    pub availability_zone: String,
    #[serde(default)]
    pub volume_type: Option<String>,
    #[serde(default)]
    pub snapshot_id: Option<String>,
    #[serde(default, rename = "source_volid")]
    pub source_vol_id: Option<String>,
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
    #[serde(default)]
    pub attachments: Vec<Attachment>,
}

impl RemoteObject for Volume {
    fn id(&self) -> &str {
        &self.id
    }

    fn status(&self) -> &str {
        &self.status
    }
}

fn metadata_from_payload(payload: &RequestPayload) -> Option<BTreeMap<String, String>> {
    payload.get("metadata").and_then(Value::as_block).map(|block| {
        block
            .iter()
            .filter_map(|(k, v)| v.as_str().map(|v| (k.clone(), v.to_string())))
            .collect()
    })
}

// ============ API Types ============

#[derive(Debug, Deserialize)]
struct VolumeEnvelope {
    volume: Volume,
}

#[derive(Debug, Deserialize)]
struct VolumeList {
    #[serde(default)]
    volumes: Vec<Volume>,
}

#[derive(Debug, Serialize)]
struct CreateVolumeRequest {
    volume: CreateVolume,
}

#[derive(Debug, Default, Serialize)]
struct CreateVolume {
    size: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    availability_zone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    display_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    display_description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    metadata: Option<BTreeMap<String, String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    snapshot_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    source_volid: Option<String>,
    #[serde(rename = "imageRef", skip_serializing_if = "Option::is_none")]
    image_ref: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    volume_type: Option<String>,
}

#[derive(Debug, Serialize)]
struct UpdateVolumeRequest {
    volume: UpdateVolume,
}

#[derive(Debug, Serialize)]
struct UpdateVolume {
    #[serde(skip_serializing_if = "Option::is_none")]
    display_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    display_description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    metadata: Option<BTreeMap<String, String>>,
}

/// Volume API client
pub struct VolumeClient {
    service: ServiceClient,
}

impl VolumeClient {
    pub fn new(service: ServiceClient) -> Self {
        Self { service }
    }

    fn path(&self) -> String {
        format!("/v1/{}/volumes", self.service.project_id())
    }
}

#[async_trait]
impl RemoteLister for VolumeClient {
    type Object = Volume;

    async fn list(&self, filter: &ListFilter) -> Result<Vec<Volume>, TransportError> {
        let query: Vec<(&str, &str)> = filter
            .iter()
            .filter_map(|(key, value)| match key {
                "name" => Some(("display_name", value)),
                "status" => Some(("status", value)),
                _ => None,
            })
            .collect();

        let list: VolumeList = self
            .service
            .get(&format!("{}/detail", self.path()), &query)
            .await?;
        Ok(list
            .volumes
            .into_iter()
            .filter(|v| filter.id().is_none_or(|id| v.id == id))
            .collect())
    }
}

#[async_trait]
impl RemoteClient for VolumeClient {
    async fn get(&self, id: &str) -> Result<Volume, TransportError> {
        let envelope: VolumeEnvelope = self
            .service
            .get(&format!("{}/{}", self.path(), id), &[])
            .await?;
        Ok(envelope.volume)
    }

    async fn create(&self, payload: &RequestPayload) -> Result<Volume, TransportError> {
        let request = CreateVolumeRequest {
            volume: CreateVolume {
                size: payload.get_int("size").unwrap_or_default(),
                availability_zone: payload_string(payload, "availability_zone"),
                display_name: payload_string(payload, "name"),
                display_description: payload_string(payload, "description"),
                metadata: metadata_from_payload(payload),
                snapshot_id: payload_string(payload, "snapshot_id"),
                source_volid: payload_string(payload, "source_vol_id"),
                image_ref: payload_string(payload, "image_id"),
                volume_type: payload_string(payload, "volume_type"),
            },
        };
        let envelope: VolumeEnvelope = self.service.post(&self.path(), &request).await?;
        Ok(envelope.volume)
    }

    async fn update(&self, id: &str, payload: &RequestPayload) -> Result<Volume, TransportError> {
        let request = UpdateVolumeRequest {
            volume: UpdateVolume {
                display_name: payload_string_or_cleared(payload, "name"),
                display_description: payload_string_or_cleared(payload, "description"),
                // an emptied map must still be sent to clear the remote metadata
                metadata: metadata_from_payload(payload)
                    .or_else(|| payload.contains("metadata").then(BTreeMap::new)),
            },
        };
        let envelope: VolumeEnvelope = self
            .service
            .put(&format!("{}/{}", self.path(), id), &request)
            .await?;
        Ok(envelope.volume)
    }

    async fn delete(&self, id: &str) -> Result<(), TransportError> {
        self.service
            .delete(&format!("{}/{}", self.path(), id), &[])
            .await
    }
}

/// Managed block storage volume
pub struct VolumeResource {
    descriptor: ResourceDescriptor,
    lifecycle: Lifecycle,
}

impl VolumeResource {
    pub fn new() -> Self {
        let attachment = AttributeKind::Block(vec![
            AttributeSpec::string("id").computed(),
            AttributeSpec::string("instance_id").computed(),
            AttributeSpec::string("device").computed(),
        ]);

        let descriptor = ResourceDescriptor::new(RESOURCE_TYPE)
            .with(AttributeSpec::string("region").optional_computed().force_new())
            .with(AttributeSpec::int("size").required().force_new())
            .with(AttributeSpec::string("name").optional())
            .with(AttributeSpec::string("description").optional())
            .with(AttributeSpec::map("metadata").optional_computed())
            .with(
                AttributeSpec::string("availability_zone")
                    .optional_computed()
                    .force_new(),
            )
            .with(AttributeSpec::string("volume_type").optional_computed().force_new())
            .with(AttributeSpec::string("snapshot_id").optional().force_new())
            .with(AttributeSpec::string("source_vol_id").optional().force_new())
            .with(AttributeSpec::string("image_id").optional().force_new())
            .with(AttributeSpec::list("attachment", attachment).computed())
            .with(AttributeSpec::string("status").computed());

        let lifecycle = Lifecycle::new(["available"])
            .pending_create(["downloading", "creating"])
            .pending_delete(["deleting", "downloading", "available"])
            .timeouts(Timeouts::minutes(10));

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

impl Default for VolumeResource {
    fn default() -> Self {
        Self::new()
    }
}

impl Resource for VolumeResource {
    type Object = Volume;

    fn descriptor(&self) -> &ResourceDescriptor {
        &self.descriptor
    }

    fn lifecycle(&self) -> &Lifecycle {
        &self.lifecycle
    }

    fn extract(&self, volume: &Volume) -> Attributes {
        let attachments = volume
            .attachments
            .iter()
            .map(|a| {
                let mut block = Attributes::new();
                block.insert("id".to_string(), Value::from(&a.id));
                block.insert("instance_id".to_string(), Value::from(&a.server_id));
                block.insert("device".to_string(), Value::from(&a.device));
                Value::Block(block)
            })
            .collect::<Vec<_>>();

        let mut attrs = Attributes::new();
        attrs.insert("size".to_string(), Value::from(volume.size));
        attrs.insert("name".to_string(), Value::from(volume.name.clone()));
        attrs.insert(
            "description".to_string(),
            Value::from(volume.description.clone()),
        );
        attrs.insert("metadata".to_string(), Value::from(volume.metadata.clone()));
        attrs.insert(
            "availability_zone".to_string(),
            Value::from(&volume.availability_zone),
        );
        attrs.insert(
            "volume_type".to_string(),
            Value::from(volume.volume_type.clone()),
        );
        attrs.insert(
            "snapshot_id".to_string(),
            Value::from(volume.snapshot_id.clone()),
        );
        attrs.insert(
            "source_vol_id".to_string(),
            Value::from(volume.source_vol_id.clone()),
        );
        attrs.insert("attachment".to_string(), Value::List(attachments));
        attrs.insert("status".to_string(), Value::from(&volume.status));
        attrs
    }

    /// The real status, so `error_deleting` aborts the wait
    fn delete_status(&self, volume: &Volume) -> String {
        volume.status.clone()
    }
}
