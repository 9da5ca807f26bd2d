//! Stratus Cloud Reconciler Core
//!
//! This crate provides the resource-agnostic half of a declarative cloud
//! provider: attribute schemas, local state, the projector between remote
//! objects and local state, a bounded poll driver, and one generic
//! lifecycle reconciler shared by every resource type.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────┐
//! │                  Orchestrator                    │
//! │           (stratus CLI / plugin host)            │
//! └─────────────────┬───────────────────────────────┘
//!                   │  ResourceHandler / DataSourceHandler
//! ┌─────────────────▼───────────────────────────────┐
//! │                stratus-cloud                     │
//! │  ┌──────────────────────────────────────────┐   │
//! │  │   Reconciler<R: Resource, C: RemoteClient> │   │
//! │  └──────────────────────────────────────────┘   │
//! │  ┌────────────┐ ┌────────────┐ ┌────────────┐   │
//! │  │  Schema    │ │ Projector  │ │ Poll driver│   │
//! │  └────────────┘ └────────────┘ └────────────┘   │
//! └───────┬─────────────────────────────────────────┘
//!         │  RemoteClient
//! ┌───────▼───────────────┐
//! │   stratus-cloud-otc   │
//! │  (REST service client)│
//! └───────────────────────┘
//! ```

pub mod action;
pub mod client;
pub mod error;
pub mod poll;
pub mod projector;
pub mod provider;
pub mod reconciler;
pub mod resource;
pub mod schema;
pub mod state;
pub mod value;

// Re-exports
pub use action::{ChangeKind, ChangeSummary, DesiredChange, Operation};
pub use client::{ListFilter, RemoteClient, RemoteLister, RemoteObject};
pub use error::{CloudError, Result, TransportError, ValidationError};
pub use poll::{Observation, PollConfig, Refresh, Settled, StateChangeConf, WaitError, wait_for};
pub use projector::{Projector, RequestPayload};
pub use provider::{DataSource, DataSourceHandler, DataSourceKind, Provider, ResourceHandler};
pub use reconciler::{ReadOutcome, Reconciler};
pub use resource::{DELETED, Lifecycle, Lookup, Resource, Timeouts};
pub use schema::{AttributeKind, AttributeSpec, Presence, ResourceDescriptor, Validator};
pub use state::{LocalState, StateFile, StateLock, StateStore, StoredResource};
pub use value::{Attributes, Value};
