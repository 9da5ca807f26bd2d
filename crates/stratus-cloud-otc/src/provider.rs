//! Provider registry wiring for every OTC resource and data source

use crate::backup::{BackupClient, BackupLookup};
use crate::backup_policy::{self, BackupPolicyClient, BackupPolicyResource};
use crate::client::ServiceClient;
use crate::cts_tracker::{self, TrackerClient, TrackerResource};
use crate::error::Result;
use crate::peering::{self, PeeringClient, PeeringConnection, PeeringLookup};
use crate::volume::{self, VolumeClient, VolumeResource};
use std::sync::Arc;
use stratus_cloud::{DataSource, DataSourceKind, Provider, Reconciler, Resource, ResourceDescriptor, Timeouts};
use stratus_config::ProviderConfig;

pub const PROVIDER_NAME: &str = "opentelekomcloud";

/// Service endpoints the provider talks to
const VPC: &str = "vpc";
const VBS: &str = "vbs";
const CTS: &str = "cts";
const EVS: &str = "evs";

/// Build the provider with every resource type registered
pub fn provider(config: &ProviderConfig) -> Result<Provider> {
    config.validate()?;

    let service = |name: &str| -> Result<ServiceClient> {
        let endpoint = config.endpoint(name);
        tracing::debug!("{} endpoint: {}", name, endpoint);
        ServiceClient::new(
            endpoint,
            config.project_id.clone(),
            config.auth_token.clone().unwrap_or_default(),
        )
    };

    let vpc = service(VPC)?;
    let vbs = service(VBS)?;
    let cts = service(CTS)?;
    let evs = service(EVS)?;

    let mut provider = Provider::new(PROVIDER_NAME);

    let peering_client = Arc::new(PeeringClient::new(vpc));
    let resource = PeeringConnection::new();
    let timeouts = configured_timeouts(config, peering::RESOURCE_TYPE, &resource);
    provider.register_resource(Arc::new(Reconciler::new(
        Arc::new(resource.timeouts(timeouts)),
        Arc::clone(&peering_client),
    )));
    provider.register_data_source(Arc::new(DataSource::new(
        Arc::new(PeeringLookup::new()),
        peering_client,
    )));

    let resource = BackupPolicyResource::new();
    let timeouts = configured_timeouts(config, backup_policy::RESOURCE_TYPE, &resource);
    provider.register_resource(Arc::new(Reconciler::new(
        Arc::new(resource.timeouts(timeouts)),
        Arc::new(BackupPolicyClient::new(vbs.clone())),
    )));
    provider.register_data_source(Arc::new(DataSource::new(
        Arc::new(BackupLookup::new()),
        Arc::new(BackupClient::new(vbs)),
    )));

    let resource = TrackerResource::new();
    let timeouts = configured_timeouts(config, cts_tracker::RESOURCE_TYPE, &resource);
    provider.register_resource(Arc::new(Reconciler::new(
        Arc::new(resource.timeouts(timeouts)),
        Arc::new(TrackerClient::new(cts)),
    )));

    let resource = VolumeResource::new();
    let timeouts = configured_timeouts(config, volume::RESOURCE_TYPE, &resource);
    provider.register_resource(Arc::new(Reconciler::new(
        Arc::new(resource.timeouts(timeouts)),
        Arc::new(VolumeClient::new(evs)),
    )));

    tracing::debug!(
        "Registered {} resource types for region {}",
        provider.resource_types().count(),
        config.region
    );
    Ok(provider)
}

/// Descriptors of every resource type, available without credentials
pub fn resource_schemas() -> Vec<ResourceDescriptor> {
    vec![
        PeeringConnection::new().descriptor().clone(),
        BackupPolicyResource::new().descriptor().clone(),
        TrackerResource::new().descriptor().clone(),
        VolumeResource::new().descriptor().clone(),
    ]
}

pub fn data_source_schemas() -> Vec<ResourceDescriptor> {
    vec![
        PeeringLookup::new().descriptor().clone(),
        BackupLookup::new().descriptor().clone(),
    ]
}

/// Resource defaults with the per-type overrides from the config applied
fn configured_timeouts<R: Resource>(config: &ProviderConfig, resource_type: &str, resource: &R) -> Timeouts {
    let mut timeouts = resource.lifecycle().timeouts;
    if let Some(overrides) = config.timeouts_for(resource_type) {
        if let Some(create) = overrides.create() {
            timeouts.create = create;
        }
        if let Some(delete) = overrides.delete() {
            timeouts.delete = delete;
        }
    }
    timeouts
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use stratus_config::{ConfigError, TimeoutOverrides};

    fn config() -> ProviderConfig {
        ProviderConfig {
            region: "eu-de".to_string(),
            project_id: "proj".to_string(),
            auth_token: Some("token".to_string()),
            ..ProviderConfig::default()
        }
    }

    #[test]
    fn test_registers_all_types() {
        let provider = provider(&config()).unwrap();

        let mut resources: Vec<&str> = provider.resource_types().collect();
        resources.sort_unstable();
        assert_eq!(
            resources,
            vec![
                volume::RESOURCE_TYPE,
                cts_tracker::RESOURCE_TYPE,
                backup_policy::RESOURCE_TYPE,
                peering::RESOURCE_TYPE,
            ]
        );

        let mut data_sources: Vec<&str> = provider.data_source_types().collect();
        data_sources.sort_unstable();
        assert_eq!(
            data_sources,
            vec![crate::backup::DATA_SOURCE_TYPE, peering::RESOURCE_TYPE]
        );
    }

    #[test]
    fn test_timeout_overrides() {
        let mut config = config();
        config.timeouts.insert(
            volume::RESOURCE_TYPE.to_string(),
            TimeoutOverrides {
                create: Some(30),
                delete: None,
            },
        );

        let provider = provider(&config).unwrap();
        let timeouts = provider
            .resource(volume::RESOURCE_TYPE)
            .unwrap()
            .default_timeouts();

        assert_eq!(timeouts.create, Duration::from_secs(1800));
        assert_eq!(timeouts.delete, Duration::from_secs(600));

        let timeouts = provider
            .resource(backup_policy::RESOURCE_TYPE)
            .unwrap()
            .default_timeouts();
        assert_eq!(timeouts, Timeouts::minutes(5));
    }

    #[test]
    fn test_schemas_match_registered_types() {
        let provider = provider(&config()).unwrap();

        for schema in resource_schemas() {
            assert!(provider.resource(schema.name()).is_ok(), "{}", schema.name());
        }
        for schema in data_source_schemas() {
            assert!(provider.data_source(schema.name()).is_ok(), "{}", schema.name());
        }
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let mut config = config();
        config.auth_token = None;

        let err = provider(&config).unwrap_err();
        assert!(matches!(
            err,
            crate::OtcError::Config(ConfigError::MissingField { field: "auth_token", .. })
        ));
    }
}
