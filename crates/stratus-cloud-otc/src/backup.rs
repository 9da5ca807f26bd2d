//! VBS backup lookup (`/v2/{project}/backups/detail`)

use crate::client::ServiceClient;
use async_trait::async_trait;
use serde::Deserialize;
use stratus_cloud::{
    AttributeSpec, Attributes, DataSourceKind, ListFilter, LocalState, RemoteLister, RemoteObject,
    ResourceDescriptor, TransportError, Value,
};

pub const DATA_SOURCE_TYPE: &str = "opentelekomcloud_vbs_backup_v2";

const FILTERS: [&str; 5] = ["id", "name", "status", "volume_id", "snapshot_id"];

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Backup {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub status: String,
    #[serde(default)]
    pub availability_zone: String,
    #[serde(default)]
    pub volume_id: String,
    #[serde(default)]
    pub snapshot_id: Option<String>,
    #[serde(default)]
    pub fail_reason: Option<String>,
    #[serde(default)]
    pub size: i64,
    #[serde(default)]
    pub object_count: i64,
    #[serde(default)]
    pub container: Option<String>,
    #[serde(default, rename = "os-bak-tenant-attr:tenant_id")]
    pub tenant_id: String,
    #[serde(default)]
    pub service_metadata: Option<String>,
}

impl RemoteObject for Backup {
    fn id(&self) -> &str {
        &self.id
    }

    fn status(&self) -> &str {
        &self.status
    }
}

#[derive(Debug, Deserialize)]
struct BackupList {
    #[serde(default)]
    backups: Vec<Backup>,
}

/// Backup listing client
pub struct BackupClient {
    service: ServiceClient,
}

impl BackupClient {
    pub fn new(service: ServiceClient) -> Self {
        Self { service }
    }
}

#[async_trait]
impl RemoteLister for BackupClient {
    type Object = Backup;

    async fn list(&self, filter: &ListFilter) -> Result<Vec<Backup>, TransportError> {
        // the API filters on everything except the id
        let query: Vec<(&str, &str)> = filter.iter().filter(|(key, _)| *key != "id").collect();
        let path = format!("/v2/{}/backups/detail", self.service.project_id());

        let list: BackupList = self.service.get(&path, &query).await?;
        Ok(list
            .backups
            .into_iter()
            .filter(|b| filter.id().is_none_or(|id| b.id == id))
            .collect())
    }
}

/// Backup lookup by id, name, status, volume or snapshot
pub struct BackupLookup {
    descriptor: ResourceDescriptor,
}

impl BackupLookup {
    pub fn new() -> Self {
        let mut descriptor = ResourceDescriptor::new(DATA_SOURCE_TYPE)
            .with(AttributeSpec::string("region").optional_computed());
        for name in FILTERS {
            descriptor = descriptor.with(AttributeSpec::string(name).optional_computed());
        }
        for name in [
            "description",
            "availability_zone",
            "fail_reason",
            "container",
            "tenant_id",
            "service_metadata",
        ] {
            descriptor = descriptor.with(AttributeSpec::string(name).computed());
        }
        descriptor = descriptor
            .with(AttributeSpec::int("size").computed())
            .with(AttributeSpec::int("object_count").computed());

        Self { descriptor }
    }
}

impl Default for BackupLookup {
    fn default() -> Self {
        Self::new()
    }
}

impl DataSourceKind for BackupLookup {
    type Object = Backup;

    fn descriptor(&self) -> &ResourceDescriptor {
        &self.descriptor
    }

    fn extract(&self, backup: &Backup) -> Attributes {
        let mut attrs = Attributes::new();
        attrs.insert("id".to_string(), Value::from(&backup.id));
        attrs.insert("name".to_string(), Value::from(&backup.name));
        attrs.insert("description".to_string(), Value::from(backup.description.clone()));
        attrs.insert("status".to_string(), Value::from(&backup.status));
        attrs.insert(
            "availability_zone".to_string(),
            Value::from(&backup.availability_zone),
        );
        attrs.insert("volume_id".to_string(), Value::from(&backup.volume_id));
        attrs.insert("snapshot_id".to_string(), Value::from(backup.snapshot_id.clone()));
        attrs.insert("fail_reason".to_string(), Value::from(backup.fail_reason.clone()));
        attrs.insert("size".to_string(), Value::from(backup.size));
        attrs.insert("object_count".to_string(), Value::from(backup.object_count));
        attrs.insert("container".to_string(), Value::from(backup.container.clone()));
        attrs.insert("tenant_id".to_string(), Value::from(&backup.tenant_id));
        attrs.insert(
            "service_metadata".to_string(),
            Value::from(backup.service_metadata.clone()),
        );
        attrs
    }

    fn filter(&self, config: &LocalState) -> ListFilter {
        FILTERS.into_iter().fold(ListFilter::new(), |filter, key| {
            filter.with(key, config.get_str(key).unwrap_or_default())
        })
    }
}
