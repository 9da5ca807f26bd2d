//! Open Telekom Cloud resources for Stratus
//!
//! Each resource type is a descriptor, a typed remote object, an API client
//! and a [`Resource`](stratus_cloud::Resource) implementation that plugs into
//! the generic [`Reconciler`](stratus_cloud::Reconciler).
//!
//! # Resources
//!
//! - `opentelekomcloud_vpc_peering_connection_v2` (also a data source)
//! - `opentelekomcloud_vbs_backup_policy_v2`
//! - `opentelekomcloud_cts_tracker_v1`
//! - `opentelekomcloud_blockstorage_volume_v1`
//!
//! # Data sources
//!
//! - `opentelekomcloud_vbs_backup_v2`
//!
//! # Example
//!
//! ```ignore
//! use stratus_config::ProviderConfig;
//! use stratus_cloud::{LocalState, Timeouts};
//!
//! let config = ProviderConfig::load()?;
//! let provider = stratus_cloud_otc::provider(&config)?;
//!
//! let peering = provider.resource("opentelekomcloud_vpc_peering_connection_v2")?;
//! let mut state = LocalState::new()
//!     .with("name", "peer")
//!     .with("vpc_id", "v1")
//!     .with("peer_vpc_id", "v2");
//! peering.create(&mut state, &peering.default_timeouts()).await?;
//! ```

pub mod backup;
pub mod backup_policy;
pub mod client;
pub mod cts_tracker;
pub mod error;
pub mod peering;
pub mod provider;
pub mod volume;

pub use backup::{Backup, BackupClient, BackupLookup};
pub use backup_policy::{BackupPolicy, BackupPolicyClient, BackupPolicyResource};
pub use client::ServiceClient;
pub use cts_tracker::{Tracker, TrackerClient, TrackerResource};
pub use error::{OtcError, Result};
pub use peering::{Peering, PeeringClient, PeeringConnection, PeeringLookup};
pub use provider::{PROVIDER_NAME, data_source_schemas, provider, resource_schemas};
pub use volume::{Volume, VolumeClient, VolumeResource};
