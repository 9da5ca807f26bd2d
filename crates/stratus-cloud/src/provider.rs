//! Orchestrator boundary
//!
//! The host drives resource types through object-safe handlers looked up by
//! type name in a [`Provider`] registry.

use crate::action::Operation;
use crate::client::{ListFilter, RemoteClient, RemoteLister, RemoteObject};
use crate::error::{CloudError, Result, ValidationError};
use crate::projector::Projector;
use crate::reconciler::Reconciler;
use crate::resource::{Resource, Timeouts};
use crate::schema::ResourceDescriptor;
use crate::state::LocalState;
use crate::value::Attributes;
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Entry points for one managed resource type
#[async_trait]
pub trait ResourceHandler: Send + Sync {
    /// Type name, e.g. "opentelekomcloud_vpc_peering_connection_v2"
    fn type_name(&self) -> &str;

    fn descriptor(&self) -> &ResourceDescriptor;

    fn default_timeouts(&self) -> Timeouts;

    fn validate(&self, config: &LocalState) -> Vec<ValidationError> {
        self.descriptor().validate(config)
    }

    async fn create(&self, state: &mut LocalState, timeouts: &Timeouts) -> Result<()>;

    /// Refresh tracked state; a vanished object leaves `state` untracked
    async fn read(&self, state: &mut LocalState) -> Result<()>;

    async fn update(&self, old: &LocalState, new: &LocalState) -> Result<LocalState>;

    async fn delete(&self, state: &mut LocalState, timeouts: &Timeouts) -> Result<()>;

    async fn import(&self, id: &str) -> Result<LocalState>;
}

#[async_trait]
impl<R, C> ResourceHandler for Reconciler<R, C>
where
    R: Resource,
    C: RemoteClient<Object = R::Object> + 'static,
{
    fn type_name(&self) -> &str {
        Reconciler::descriptor(self).name()
    }

    fn descriptor(&self) -> &ResourceDescriptor {
        Reconciler::descriptor(self)
    }

    fn default_timeouts(&self) -> Timeouts {
        self.resource().lifecycle().timeouts
    }

    async fn create(&self, state: &mut LocalState, timeouts: &Timeouts) -> Result<()> {
        Reconciler::create(self, state, timeouts).await
    }

    async fn read(&self, state: &mut LocalState) -> Result<()> {
        Reconciler::refresh(self, state).await
    }

    async fn update(&self, old: &LocalState, new: &LocalState) -> Result<LocalState> {
        Reconciler::update(self, old, new).await
    }

    async fn delete(&self, state: &mut LocalState, timeouts: &Timeouts) -> Result<()> {
        Reconciler::delete(self, state, timeouts).await
    }

    async fn import(&self, id: &str) -> Result<LocalState> {
        Reconciler::import(self, id).await
    }
}

/// A read-only lookup type
pub trait DataSourceKind: Send + Sync + 'static {
    type Object: RemoteObject;

    fn descriptor(&self) -> &ResourceDescriptor;

    fn extract(&self, object: &Self::Object) -> Attributes;

    /// List filter built from the lookup arguments
    fn filter(&self, config: &LocalState) -> ListFilter;
}

/// Entry points for one data source type
#[async_trait]
pub trait DataSourceHandler: Send + Sync {
    fn type_name(&self) -> &str;

    fn descriptor(&self) -> &ResourceDescriptor;

    /// Resolve `config` to exactly one remote object
    async fn read(&self, config: &LocalState) -> Result<LocalState>;
}

/// Generic data source over a list endpoint
pub struct DataSource<D, L> {
    kind: Arc<D>,
    lister: Arc<L>,
}

impl<D, L> DataSource<D, L>
where
    D: DataSourceKind,
    L: RemoteLister<Object = D::Object>,
{
    pub fn new(kind: Arc<D>, lister: Arc<L>) -> Self {
        Self { kind, lister }
    }
}

#[async_trait]
impl<D, L> DataSourceHandler for DataSource<D, L>
where
    D: DataSourceKind,
    L: RemoteLister<Object = D::Object> + 'static,
{
    fn type_name(&self) -> &str {
        self.kind.descriptor().name()
    }

    fn descriptor(&self) -> &ResourceDescriptor {
        self.kind.descriptor()
    }

    async fn read(&self, config: &LocalState) -> Result<LocalState> {
        let descriptor = self.kind.descriptor();
        descriptor.check(config)?;

        let filter = self.kind.filter(config);
        tracing::debug!("Looking up {} ({})", descriptor.name(), filter);

        let mut matches = self
            .lister
            .list(&filter)
            .await
            .map_err(|source| CloudError::Transport {
                operation: Operation::Lookup,
                resource: descriptor.name().to_string(),
                id: filter.id().map(str::to_string),
                source,
            })?;

        let object = match matches.len() {
            0 => {
                return Err(CloudError::NoResults {
                    resource: descriptor.name().to_string(),
                    filter: filter.to_string(),
                });
            }
            1 => matches.remove(0),
            n => {
                return Err(CloudError::AmbiguousResult {
                    resource: descriptor.name().to_string(),
                    filter: filter.to_string(),
                    matches: n,
                });
            }
        };

        Ok(Projector::new(descriptor).to_local(
            object.id(),
            self.kind.extract(&object),
            Some(config),
        ))
    }
}

/// Registry of the resource and data source types a provider serves
pub struct Provider {
    name: String,
    resources: BTreeMap<String, Arc<dyn ResourceHandler>>,
    data_sources: BTreeMap<String, Arc<dyn DataSourceHandler>>,
}

impl Provider {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            resources: BTreeMap::new(),
            data_sources: BTreeMap::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn register_resource(&mut self, handler: Arc<dyn ResourceHandler>) {
        tracing::debug!("Registering resource {}", handler.type_name());
        self.resources
            .insert(handler.type_name().to_string(), handler);
    }

    pub fn register_data_source(&mut self, handler: Arc<dyn DataSourceHandler>) {
        tracing::debug!("Registering data source {}", handler.type_name());
        self.data_sources
            .insert(handler.type_name().to_string(), handler);
    }

    pub fn resource(&self, type_name: &str) -> Result<&Arc<dyn ResourceHandler>> {
        self.resources
            .get(type_name)
            .ok_or_else(|| CloudError::UnknownResource(type_name.to_string()))
    }

    pub fn data_source(&self, type_name: &str) -> Result<&Arc<dyn DataSourceHandler>> {
        self.data_sources
            .get(type_name)
            .ok_or_else(|| CloudError::UnknownResource(type_name.to_string()))
    }

    pub fn resource_types(&self) -> impl Iterator<Item = &str> {
        self.resources.keys().map(String::as_str)
    }

    pub fn data_source_types(&self) -> impl Iterator<Item = &str> {
        self.data_sources.keys().map(String::as_str)
    }
}

impl std::fmt::Debug for Provider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Provider")
            .field("name", &self.name)
            .field("resources", &self.resources.keys().collect::<Vec<_>>())
            .field("data_sources", &self.data_sources.keys().collect::<Vec<_>>())
            .finish()
    }
}
