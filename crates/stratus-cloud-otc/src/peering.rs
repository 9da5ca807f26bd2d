//! VPC peering connections (`/v2.0/vpc/peerings`)

use crate::client::{ServiceClient, payload_string};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use stratus_cloud::{
    AttributeSpec, Attributes, DataSourceKind, Lifecycle, ListFilter, LocalState, RemoteClient,
    RemoteLister, RemoteObject, RequestPayload, Resource, ResourceDescriptor, Timeouts,
    TransportError, Validator, Value,
};

pub const RESOURCE_TYPE: &str = "opentelekomcloud_vpc_peering_connection_v2";

const PATH: &str = "/v2.0/vpc/peerings";
const NAME_PATTERN: &str = r"^[A-Za-z0-9_.\-]*$";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VpcInfo {
    pub vpc_id: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub tenant_id: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Peering {
    pub id: String,
    #[serde(default)]
    pub name: String,
    pub status: String,
    #[serde(default)]
    pub request_vpc_info: VpcInfo,
    #[serde(default)]
    pub accept_vpc_info: VpcInfo,
}

impl RemoteObject for Peering {
    fn id(&self) -> &str {
        &self.id
    }

    fn status(&self) -> &str {
        &self.status
    }
}

impl Peering {
    fn attributes(&self) -> Attributes {
        let mut attrs = Attributes::new();
        attrs.insert("name".to_string(), Value::from(&self.name));
        attrs.insert("status".to_string(), Value::from(&self.status));
        attrs.insert(
            "vpc_id".to_string(),
            Value::from(&self.request_vpc_info.vpc_id),
        );
        attrs.insert(
            "peer_vpc_id".to_string(),
            Value::from(&self.accept_vpc_info.vpc_id),
        );
        if !self.accept_vpc_info.tenant_id.is_empty() {
            attrs.insert(
                "peer_tenant_id".to_string(),
                Value::from(&self.accept_vpc_info.tenant_id),
            );
        }
        attrs
    }

    fn matches(&self, filter: &ListFilter) -> bool {
        filter.iter().all(|(key, expected)| match key {
            "id" => self.id == expected,
            "name" => self.name == expected,
            "status" => self.status == expected,
            "vpc_id" => self.request_vpc_info.vpc_id == expected,
            "peer_vpc_id" => self.accept_vpc_info.vpc_id == expected,
            "peer_tenant_id" => self.accept_vpc_info.tenant_id == expected,
            _ => true,
        })
    }
}

// ============ API Types ============

#[derive(Debug, Deserialize)]
struct PeeringEnvelope {
    peering: Peering,
}

#[derive(Debug, Deserialize)]
struct PeeringList {
    #[serde(default)]
    peerings: Vec<Peering>,
}

#[derive(Debug, Serialize)]
struct CreatePeeringRequest {
    peering: CreatePeering,
}

#[derive(Debug, Serialize)]
struct CreatePeering {
    name: String,
    request_vpc_info: VpcInfo,
    accept_vpc_info: VpcInfo,
}

#[derive(Debug, Serialize)]
struct UpdatePeeringRequest {
    peering: UpdatePeering,
}

#[derive(Debug, Serialize)]
struct UpdatePeering {
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<String>,
}

/// Peering API client
pub struct PeeringClient {
    service: ServiceClient,
}

impl PeeringClient {
    pub fn new(service: ServiceClient) -> Self {
        Self { service }
    }
}

#[async_trait]
impl RemoteLister for PeeringClient {
    type Object = Peering;

    async fn list(&self, filter: &ListFilter) -> Result<Vec<Peering>, TransportError> {
        // the API has no peer-VPC filter; that one is applied locally with the rest
        let query: Vec<(&str, &str)> = filter
            .iter()
            .filter_map(|(key, value)| match key {
                "id" | "name" | "status" | "vpc_id" => Some((key, value)),
                "peer_tenant_id" => Some(("tenant_id", value)),
                _ => None,
            })
            .collect();

        let list: PeeringList = self.service.get(PATH, &query).await?;
        Ok(list
            .peerings
            .into_iter()
            .filter(|p| p.matches(filter))
            .collect())
    }
}

#[async_trait]
impl RemoteClient for PeeringClient {
    async fn get(&self, id: &str) -> Result<Peering, TransportError> {
        let envelope: PeeringEnvelope = self.service.get(&format!("{}/{}", PATH, id), &[]).await?;
        Ok(envelope.peering)
    }

    async fn create(&self, payload: &RequestPayload) -> Result<Peering, TransportError> {
        let request = CreatePeeringRequest {
            peering: CreatePeering {
                name: payload_string(payload, "name").unwrap_or_default(),
                request_vpc_info: VpcInfo {
                    vpc_id: payload_string(payload, "vpc_id").unwrap_or_default(),
                    tenant_id: String::new(),
                },
                accept_vpc_info: VpcInfo {
                    vpc_id: payload_string(payload, "peer_vpc_id").unwrap_or_default(),
                    tenant_id: payload_string(payload, "peer_tenant_id").unwrap_or_default(),
                },
            },
        };
        let envelope: PeeringEnvelope = self.service.post(PATH, &request).await?;
        Ok(envelope.peering)
    }

    async fn update(&self, id: &str, payload: &RequestPayload) -> Result<Peering, TransportError> {
        let request = UpdatePeeringRequest {
            peering: UpdatePeering {
                name: payload_string(payload, "name"),
            },
        };
        let envelope: PeeringEnvelope = self
            .service
            .put(&format!("{}/{}", PATH, id), &request)
            .await?;
        Ok(envelope.peering)
    }

    async fn delete(&self, id: &str) -> Result<(), TransportError> {
        self.service.delete(&format!("{}/{}", PATH, id), &[]).await
    }
}

/// Managed VPC peering connection
pub struct PeeringConnection {
    descriptor: ResourceDescriptor,
    lifecycle: Lifecycle,
}

impl PeeringConnection {
    pub fn new() -> Self {
        let descriptor = ResourceDescriptor::new(RESOURCE_TYPE)
            .with(AttributeSpec::string("region").optional_computed())
            .with(
                AttributeSpec::string("name")
                    .required()
                    .validate(Validator::length(1, 64))
                    .validate(Validator::pattern(NAME_PATTERN)),
            )
            .with(AttributeSpec::string("status").computed())
            .with(AttributeSpec::string("vpc_id").required().force_new())
            .with(AttributeSpec::string("peer_vpc_id").required().force_new())
            .with(AttributeSpec::string("peer_tenant_id").optional().force_new());

        let lifecycle = Lifecycle::new(["PENDING_ACCEPTANCE", "ACTIVE"])
            .pending_delete(["ACTIVE"])
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

impl Default for PeeringConnection {
    fn default() -> Self {
        Self::new()
    }
}

impl Resource for PeeringConnection {
    type Object = Peering;

    fn descriptor(&self) -> &ResourceDescriptor {
        &self.descriptor
    }

    fn lifecycle(&self) -> &Lifecycle {
        &self.lifecycle
    }

    fn extract(&self, object: &Peering) -> Attributes {
        object.attributes()
    }

    /// Anything short of a steady status counts as still creating
    fn create_status(&self, object: &Peering) -> String {
        if self.lifecycle.is_steady(&object.status) {
            object.status.clone()
        } else {
            "CREATING".to_string()
        }
    }
}

/// Peering connection lookup
pub struct PeeringLookup {
    descriptor: ResourceDescriptor,
}

impl PeeringLookup {
    pub fn new() -> Self {
        Self {
            descriptor: ResourceDescriptor::new(RESOURCE_TYPE)
                .with(AttributeSpec::string("region").optional_computed())
                .with(AttributeSpec::string("id").optional_computed())
                .with(
                    AttributeSpec::string("name")
                        .optional_computed()
                        .validate(Validator::length(1, 64))
                        .validate(Validator::pattern(NAME_PATTERN)),
                )
                .with(AttributeSpec::string("status").optional_computed())
                .with(AttributeSpec::string("vpc_id").optional_computed())
                .with(AttributeSpec::string("peer_vpc_id").optional_computed())
                .with(AttributeSpec::string("peer_tenant_id").optional_computed()),
        }
    }
}

impl Default for PeeringLookup {
    fn default() -> Self {
        Self::new()
    }
}

impl DataSourceKind for PeeringLookup {
    type Object = Peering;

    fn descriptor(&self) -> &ResourceDescriptor {
        &self.descriptor
    }

    fn extract(&self, object: &Peering) -> Attributes {
        let mut attrs = object.attributes();
        attrs.insert("id".to_string(), Value::from(&object.id));
        attrs
    }

    fn filter(&self, config: &LocalState) -> ListFilter {
        ["id", "name", "status", "vpc_id", "peer_vpc_id", "peer_tenant_id"]
            .into_iter()
            .fold(ListFilter::new(), |filter, key| {
                filter.with(key, config.get_str(key).unwrap_or_default())
            })
    }
}
